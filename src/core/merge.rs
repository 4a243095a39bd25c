//! CSV-driven merge of raw assets into an existing asset.
//!
//! Each row names a primary raw asset, the raw assets to merge and the
//! destination asset, plus the name, types, tags and address the merged
//! asset should end up with. `Validate` reports what would change;
//! `Update` applies it.

use crate::domain::model::{is_blank, Asset, Id, LocationFields, LookupKind, NewLocation, RawAsset};
use crate::domain::ports::Registry;
use crate::utils::error::{RegistryError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const MAX_UPLOAD_BYTES: usize = 2_500_000;
pub const MERGE_CHANGE_REASON: &str = "Merged from CSV upload";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    Validate,
    Update,
}

impl MergeMode {
    fn verb(self) -> &'static str {
        match self {
            MergeMode::Validate => "will be ",
            MergeMode::Update => "",
        }
    }
}

#[derive(Debug, Deserialize)]
struct MergeRow {
    id: String,
    ids_to_merge: String,
    asset_id: String,
    name: String,
    #[serde(default)]
    asset_type: String,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    street_address: String,
    #[serde(default)]
    city: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    zip_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeReport {
    pub mode: MergeMode,
    pub rows_processed: usize,
    /// An unknown asset type stops the whole file.
    pub aborted: bool,
    pub messages: Vec<String>,
}

pub struct MergeUploader<'a> {
    registry: &'a dyn Registry,
}

impl<'a> MergeUploader<'a> {
    pub fn new(registry: &'a dyn Registry) -> Self {
        Self { registry }
    }

    pub async fn process(&self, data: &[u8], mode: MergeMode) -> Result<MergeReport> {
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(RegistryError::FileTooLarge {
                size: data.len(),
                limit: MAX_UPLOAD_BYTES,
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(data);

        let mut report = MergeReport {
            mode,
            rows_processed: 0,
            aborted: false,
            messages: Vec::new(),
        };

        for result in reader.deserialize::<MergeRow>() {
            let row = result?;
            let completed = self.merge_row(&row, mode, &mut report.messages).await?;
            report.rows_processed += 1;
            if !completed {
                report.aborted = true;
                tracing::warn!("Merge aborted at destination asset {}", row.asset_id);
                break;
            }
        }

        tracing::info!(
            "Merge upload ({:?}) processed {} rows",
            mode,
            report.rows_processed
        );
        Ok(report)
    }

    /// Returns `false` when the row hit an unknown asset type.
    async fn merge_row(&self, row: &MergeRow, mode: MergeMode, messages: &mut Vec<String>) -> Result<bool> {
        let verb = mode.verb();

        let primary_id = parse_id("id", &row.id)?;
        self.registry.get_raw_asset(primary_id).await?;

        let raw_ids = parse_id_list(&row.ids_to_merge)?;
        let raw_assets = self.registry.raw_assets_by_ids(&raw_ids).await?;
        if raw_assets.is_empty() {
            return Err(RegistryError::validation(format!(
                "none of the raw assets {:?} exist",
                raw_ids
            )));
        }

        let mut asset = self
            .registry
            .get_asset(parse_id("asset_id", &row.asset_id)?)
            .await?;

        messages.push(format!(
            "Preparing to link raw assets with IDs {:?} and names [{}] to asset with PREVIOUS name {}.",
            raw_assets.iter().map(|r| r.id).collect::<Vec<_>>(),
            raw_assets
                .iter()
                .map(|r| format!("'{}'", r.name))
                .collect::<Vec<_>>()
                .join(", "),
            asset.name
        ));
        if mode == MergeMode::Validate {
            messages.push("(Just validating stuff here.)".to_string());
        }

        if row.name != asset.name {
            messages.push(format!(
                "asset_name {verb}changed from {} to {}.",
                asset.name, row.name
            ));
            asset.name = row.name.clone();
        }

        let new_types = split_names(&row.asset_type);
        let old_types = self.names_of(LookupKind::AssetType, &asset.asset_type_ids).await?;
        if new_types != old_types {
            messages.push(format!(
                "asset_type {verb}changed from {} to {}.",
                format_set(&old_types),
                format_set(&new_types)
            ));
            let mut type_ids = Vec::with_capacity(new_types.len());
            for name in &new_types {
                match self
                    .registry
                    .find_lookup_by_name(LookupKind::AssetType, name)
                    .await?
                {
                    Some(entry) => type_ids.push(entry.id),
                    None => {
                        messages.push(format!(
                            "Unable to find one of these asset types: {}.\n ABORTING!!!",
                            format_set(&new_types)
                        ));
                        return Ok(false);
                    }
                }
            }
            asset.asset_type_ids = type_ids;
        }

        let new_tags = split_names(&row.tags);
        let old_tags = self.names_of(LookupKind::Tag, &asset.tag_ids).await?;
        if new_tags != old_tags {
            messages.push(format!(
                "tags {verb}changed from {} to {}.",
                format_set(&old_tags),
                format_set(&new_tags)
            ));
            if mode == MergeMode::Update {
                let mut tag_ids = Vec::with_capacity(new_tags.len());
                for name in &new_tags {
                    tag_ids.push(self.registry.get_or_create_lookup(LookupKind::Tag, name).await?.id);
                }
                asset.tag_ids = tag_ids;
            }
        }

        self.merge_address(row, mode, &mut asset, messages).await?;

        if mode == MergeMode::Update {
            self.registry.update_asset(&asset, MERGE_CHANGE_REASON).await?;
            self.link_raw_assets(raw_assets, asset.id).await?;
            messages.push("Remember to verify that the Location updates.".to_string());
        }

        Ok(true)
    }

    async fn merge_address(
        &self,
        row: &MergeRow,
        mode: MergeMode,
        asset: &mut Asset,
        messages: &mut Vec<String>,
    ) -> Result<()> {
        let verb = mode.verb();
        let incoming = [
            ("street_address", non_empty(&row.street_address)),
            ("city", non_empty(&row.city)),
            ("state", non_empty(&row.state)),
            ("zip_code", non_empty(&row.zip_code)),
        ];

        let Some(location_id) = asset.location_id else {
            if incoming.iter().all(|(_, value)| value.is_none()) {
                return Ok(());
            }
            messages.push(format!("location {verb}created for asset {}.", asset.id));
            if mode == MergeMode::Update {
                let mut fields = LocationFields::default();
                for (field, value) in incoming {
                    *address_field(&mut fields, field) = value;
                }
                let location = self
                    .registry
                    .insert_location(NewLocation::from(fields), MERGE_CHANGE_REASON)
                    .await?;
                asset.location_id = Some(location.id);
            }
            return Ok(());
        };

        let mut location = self.registry.get_location(location_id).await?;
        let mut changed = false;
        for (field, new_value) in incoming {
            let slot = address_field(&mut location.fields, field);
            if *slot != new_value {
                messages.push(format!(
                    "{field} {verb}changed from {} to {}.",
                    display_option(slot.as_deref()),
                    display_option(new_value.as_deref())
                ));
                *slot = new_value;
                changed = true;
            }
        }

        if changed && mode == MergeMode::Update {
            self.registry
                .update_location(&location, MERGE_CHANGE_REASON)
                .await?;
        }
        Ok(())
    }

    async fn link_raw_assets(&self, raw_assets: Vec<RawAsset>, asset_id: Id) -> Result<()> {
        for mut raw in raw_assets {
            if raw.asset_id != Some(asset_id) {
                raw.asset_id = Some(asset_id);
                self.registry
                    .update_raw_asset(&raw, MERGE_CHANGE_REASON)
                    .await?;
            }
        }
        Ok(())
    }

    async fn names_of(&self, kind: LookupKind, ids: &[Id]) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for id in ids {
            names.insert(self.registry.get_lookup(kind, *id).await?.name);
        }
        Ok(names)
    }
}

fn address_field<'f>(fields: &'f mut LocationFields, name: &str) -> &'f mut Option<String> {
    match name {
        "street_address" => &mut fields.street_address,
        "city" => &mut fields.city,
        "state" => &mut fields.state,
        _ => &mut fields.zip_code,
    }
}

fn parse_id(column: &str, value: &str) -> Result<Id> {
    value.trim().parse().map_err(|_| {
        RegistryError::validation(format!("column '{column}' holds '{value}', not an ID"))
    })
}

/// `"12+15+40"` -> `[12, 15, 40]`
fn parse_id_list(value: &str) -> Result<Vec<Id>> {
    value
        .split('+')
        .map(|part| parse_id("ids_to_merge", part))
        .collect()
}

fn split_names(value: &str) -> BTreeSet<String> {
    value
        .split('|')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(value: &str) -> Option<String> {
    (!is_blank(Some(value))).then(|| value.trim().to_string())
}

fn display_option(value: Option<&str>) -> &str {
    value.unwrap_or("None")
}

/// Set rendering used in merge messages, e.g. `{'food', 'shelter'}`.
pub fn format_set(values: &BTreeSet<String>) -> String {
    if values.is_empty() {
        return "set()".to_string();
    }
    let items: Vec<String> = values.iter().map(|v| format!("'{v}'")).collect();
    format!("{{{}}}", items.join(", "))
}
