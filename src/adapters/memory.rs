use crate::core::matching::find_matching;
use crate::domain::model::{
    Asset, AssetFilter, ChangeRecord, Id, IdSequences, Location, LocationMatch, LocationQuery, LookupEntry,
    LookupKind, NewAsset, NewLocation, NewLookup, NewOrganization, NewRawAsset, Organization,
    Page, PageRequest, RawAsset, RegistrySnapshot,
};
use crate::domain::ports::Registry;
use crate::utils::error::{RegistryError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

fn next(seq: &mut Id) -> Id {
    *seq += 1;
    *seq
}

#[derive(Debug, Default)]
struct Tables {
    locations: BTreeMap<Id, Location>,
    assets: BTreeMap<Id, Asset>,
    raw_assets: BTreeMap<Id, RawAsset>,
    organizations: BTreeMap<Id, Organization>,
    lookups: BTreeMap<LookupKind, BTreeMap<Id, LookupEntry>>,
    history: Vec<ChangeRecord>,
    sequences: IdSequences,
}

impl Tables {
    fn record(&mut self, entity: &str, entity_id: Id, reason: &str) {
        self.history.push(ChangeRecord {
            entity: entity.to_string(),
            entity_id,
            reason: reason.to_string(),
            recorded_at: Utc::now(),
        });
    }

    fn lookup_table(&self, kind: LookupKind) -> Option<&BTreeMap<Id, LookupEntry>> {
        self.lookups.get(&kind)
    }

    fn check_asset_references(&self, asset: &Asset) -> Result<()> {
        if asset.name.trim().is_empty() {
            return Err(RegistryError::validation("asset name cannot be empty"));
        }
        if let Some(location_id) = asset.location_id {
            if !self.locations.contains_key(&location_id) {
                return Err(RegistryError::validation(format!(
                    "location {location_id} does not exist"
                )));
            }
        }
        if let Some(organization_id) = asset.organization_id {
            if !self.organizations.contains_key(&organization_id) {
                return Err(RegistryError::validation(format!(
                    "organization {organization_id} does not exist"
                )));
            }
        }

        let references = [
            (LookupKind::AssetType, asset.asset_type_ids.as_slice()),
            (LookupKind::Tag, asset.tag_ids.as_slice()),
            (LookupKind::ProvidedService, asset.service_ids.as_slice()),
            (LookupKind::TargetPopulation, asset.population_ids.as_slice()),
        ];
        for (kind, ids) in references {
            self.check_lookup_ids(kind, ids)?;
        }
        if let Some(id) = asset.data_source_id {
            self.check_lookup_ids(LookupKind::DataSource, &[id])?;
        }
        Ok(())
    }

    fn check_lookup_ids(&self, kind: LookupKind, ids: &[Id]) -> Result<()> {
        let table = self.lookup_table(kind);
        for id in ids {
            if !table.is_some_and(|t| t.contains_key(id)) {
                return Err(RegistryError::validation(format!(
                    "{} {id} does not exist",
                    kind.entity_name()
                )));
            }
        }
        Ok(())
    }

    fn check_lookup_name(&self, kind: LookupKind, name: &str, own_id: Option<Id>) -> Result<()> {
        if name.trim().is_empty() {
            return Err(RegistryError::validation(format!(
                "{} name cannot be empty",
                kind.entity_name()
            )));
        }
        let taken = self.lookup_table(kind).is_some_and(|table| {
            table
                .values()
                .any(|entry| entry.name == name && Some(entry.id) != own_id)
        });
        if taken {
            return Err(RegistryError::Conflict {
                message: format!("{} '{name}' already exists", kind.entity_name()),
            });
        }
        Ok(())
    }

    fn insert_lookup(&mut self, kind: LookupKind, new: NewLookup) -> Result<LookupEntry> {
        self.check_lookup_name(kind, &new.name, None)?;
        let id = next(self.sequences.lookups.entry(kind).or_insert(0));
        let entry = LookupEntry {
            id,
            name: new.name,
            title: new.title,
            category_id: new.category_id,
            url: new.url,
        };
        self.lookups
            .entry(kind)
            .or_default()
            .insert(id, entry.clone());
        Ok(entry)
    }
}

fn paginate<T: Clone>(items: Vec<T>, page: PageRequest) -> Page<T> {
    let count = items.len();
    let results = items
        .into_iter()
        .skip(page.offset)
        .take(page.limit)
        .collect();
    Page {
        count,
        limit: page.limit,
        offset: page.offset,
        results,
    }
}

/// Registry kept entirely in memory; persisted through [`SnapshotStore`].
///
/// [`SnapshotStore`]: crate::adapters::snapshot::SnapshotStore
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    tables: RwLock<Tables>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: RegistrySnapshot) -> Self {
        let mut tables = Tables {
            sequences: snapshot.sequences,
            ..Tables::default()
        };

        for location in snapshot.locations {
            tables.sequences.location = tables.sequences.location.max(location.id);
            tables.locations.insert(location.id, location);
        }
        for asset in snapshot.assets {
            tables.sequences.asset = tables.sequences.asset.max(asset.id);
            tables.assets.insert(asset.id, asset);
        }
        for raw in snapshot.raw_assets {
            tables.sequences.raw_asset = tables.sequences.raw_asset.max(raw.id);
            tables.raw_assets.insert(raw.id, raw);
        }
        for organization in snapshot.organizations {
            tables.sequences.organization = tables.sequences.organization.max(organization.id);
            tables.organizations.insert(organization.id, organization);
        }
        for (kind, entries) in snapshot.lookups {
            let seq = tables.sequences.lookups.entry(kind).or_insert(0);
            let table = tables.lookups.entry(kind).or_default();
            for entry in entries {
                *seq = (*seq).max(entry.id);
                table.insert(entry.id, entry);
            }
        }
        tables.history = snapshot.history;

        Self {
            tables: RwLock::new(tables),
        }
    }
}

#[async_trait]
impl Registry for InMemoryRegistry {
    async fn get_location(&self, id: Id) -> Result<Location> {
        let tables = self.tables.read().await;
        tables
            .locations
            .get(&id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("Location", id))
    }

    async fn list_locations(&self, page: PageRequest) -> Result<Page<Location>> {
        let tables = self.tables.read().await;
        Ok(paginate(tables.locations.values().cloned().collect(), page))
    }

    async fn insert_location(&self, new: NewLocation, reason: &str) -> Result<Location> {
        let mut tables = self.tables.write().await;
        let id = next(&mut tables.sequences.location);
        let location = Location {
            id,
            name: new.name,
            fields: new.fields,
        };
        tables.locations.insert(id, location.clone());
        tables.record("Location", id, reason);
        tracing::debug!(location_id = id, "Location created");
        Ok(location)
    }

    async fn update_location(&self, location: &Location, reason: &str) -> Result<Location> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .locations
            .get_mut(&location.id)
            .ok_or_else(|| RegistryError::not_found("Location", location.id))?;
        *slot = location.clone();
        tables.record("Location", location.id, reason);
        Ok(location.clone())
    }

    async fn delete_location(&self, id: Id, reason: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.locations.remove(&id).is_none() {
            return Err(RegistryError::not_found("Location", id));
        }

        let unlinked: Vec<Id> = tables
            .assets
            .values_mut()
            .filter(|asset| asset.location_id == Some(id))
            .map(|asset| {
                asset.location_id = None;
                asset.id
            })
            .collect();
        for asset_id in unlinked {
            tables.record("Asset", asset_id, reason);
        }
        tables.record("Location", id, reason);
        Ok(())
    }

    async fn find_location(&self, query: &LocationQuery) -> Result<LocationMatch> {
        let tables = self.tables.read().await;
        Ok(find_matching(tables.locations.values(), query))
    }

    async fn assets_at_location(&self, location_id: Id) -> Result<Vec<Asset>> {
        let tables = self.tables.read().await;
        Ok(tables
            .assets
            .values()
            .filter(|asset| asset.location_id == Some(location_id))
            .cloned()
            .collect())
    }

    async fn get_asset(&self, id: Id) -> Result<Asset> {
        let tables = self.tables.read().await;
        tables
            .assets
            .get(&id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("Asset", id))
    }

    async fn list_assets(&self, filter: &AssetFilter) -> Result<Page<Asset>> {
        let tables = self.tables.read().await;
        let needle = filter
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let matching: Vec<Asset> = tables
            .assets
            .values()
            .filter(|asset| {
                needle
                    .as_deref()
                    .map_or(true, |n| asset.name.to_lowercase().contains(n))
            })
            .cloned()
            .collect();
        Ok(paginate(matching, filter.page))
    }

    async fn insert_asset(&self, new: NewAsset, reason: &str) -> Result<Asset> {
        let mut tables = self.tables.write().await;
        let candidate = new.into_asset(0);
        tables.check_asset_references(&candidate)?;

        let id = next(&mut tables.sequences.asset);
        let asset = Asset { id, ..candidate };
        tables.assets.insert(id, asset.clone());
        tables.record("Asset", id, reason);
        Ok(asset)
    }

    async fn update_asset(&self, asset: &Asset, reason: &str) -> Result<Asset> {
        let mut tables = self.tables.write().await;
        if !tables.assets.contains_key(&asset.id) {
            return Err(RegistryError::not_found("Asset", asset.id));
        }
        tables.check_asset_references(asset)?;
        tables.assets.insert(asset.id, asset.clone());
        tables.record("Asset", asset.id, reason);
        Ok(asset.clone())
    }

    async fn delete_asset(&self, id: Id, reason: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.assets.remove(&id).is_none() {
            return Err(RegistryError::not_found("Asset", id));
        }
        for raw in tables.raw_assets.values_mut() {
            if raw.asset_id == Some(id) {
                raw.asset_id = None;
            }
        }
        tables.record("Asset", id, reason);
        Ok(())
    }

    async fn get_raw_asset(&self, id: Id) -> Result<RawAsset> {
        let tables = self.tables.read().await;
        tables
            .raw_assets
            .get(&id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("RawAsset", id))
    }

    async fn raw_assets_for_asset(&self, asset_id: Id) -> Result<Vec<RawAsset>> {
        let tables = self.tables.read().await;
        Ok(tables
            .raw_assets
            .values()
            .filter(|raw| raw.asset_id == Some(asset_id))
            .cloned()
            .collect())
    }

    async fn raw_assets_by_ids(&self, ids: &[Id]) -> Result<Vec<RawAsset>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.raw_assets.get(id).cloned())
            .collect())
    }

    async fn insert_raw_asset(&self, new: NewRawAsset, reason: &str) -> Result<RawAsset> {
        let mut tables = self.tables.write().await;
        if let Some(asset_id) = new.asset_id {
            if !tables.assets.contains_key(&asset_id) {
                return Err(RegistryError::validation(format!(
                    "asset {asset_id} does not exist"
                )));
            }
        }
        let id = next(&mut tables.sequences.raw_asset);
        let raw = RawAsset {
            id,
            name: new.name,
            asset_id: new.asset_id,
            asset_type: new.asset_type,
            location: new.location,
        };
        tables.raw_assets.insert(id, raw.clone());
        tables.record("RawAsset", id, reason);
        Ok(raw)
    }

    async fn update_raw_asset(&self, raw: &RawAsset, reason: &str) -> Result<RawAsset> {
        let mut tables = self.tables.write().await;
        if !tables.raw_assets.contains_key(&raw.id) {
            return Err(RegistryError::not_found("RawAsset", raw.id));
        }
        if let Some(asset_id) = raw.asset_id {
            if !tables.assets.contains_key(&asset_id) {
                return Err(RegistryError::validation(format!(
                    "asset {asset_id} does not exist"
                )));
            }
        }
        tables.raw_assets.insert(raw.id, raw.clone());
        tables.record("RawAsset", raw.id, reason);
        Ok(raw.clone())
    }

    async fn list_lookup(&self, kind: LookupKind) -> Result<Vec<LookupEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .lookup_table(kind)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_lookup(&self, kind: LookupKind, id: Id) -> Result<LookupEntry> {
        let tables = self.tables.read().await;
        tables
            .lookup_table(kind)
            .and_then(|table| table.get(&id))
            .cloned()
            .ok_or_else(|| RegistryError::not_found(kind.entity_name(), id))
    }

    async fn find_lookup_by_name(
        &self,
        kind: LookupKind,
        name: &str,
    ) -> Result<Option<LookupEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .lookup_table(kind)
            .and_then(|table| table.values().find(|entry| entry.name == name))
            .cloned())
    }

    async fn get_or_create_lookup(&self, kind: LookupKind, name: &str) -> Result<LookupEntry> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .lookup_table(kind)
            .and_then(|table| table.values().find(|entry| entry.name == name))
            .cloned();
        match existing {
            Some(entry) => Ok(entry),
            None => tables.insert_lookup(kind, NewLookup::named(name)),
        }
    }

    async fn insert_lookup(&self, kind: LookupKind, new: NewLookup) -> Result<LookupEntry> {
        let mut tables = self.tables.write().await;
        tables.insert_lookup(kind, new)
    }

    async fn update_lookup(&self, kind: LookupKind, entry: &LookupEntry) -> Result<LookupEntry> {
        let mut tables = self.tables.write().await;
        if !tables
            .lookup_table(kind)
            .is_some_and(|table| table.contains_key(&entry.id))
        {
            return Err(RegistryError::not_found(kind.entity_name(), entry.id));
        }
        tables.check_lookup_name(kind, &entry.name, Some(entry.id))?;
        tables
            .lookups
            .entry(kind)
            .or_default()
            .insert(entry.id, entry.clone());
        Ok(entry.clone())
    }

    async fn delete_lookup(&self, kind: LookupKind, id: Id) -> Result<()> {
        let mut tables = self.tables.write().await;
        let removed = tables
            .lookups
            .get_mut(&kind)
            .and_then(|table| table.remove(&id));
        if removed.is_none() {
            return Err(RegistryError::not_found(kind.entity_name(), id));
        }

        for asset in tables.assets.values_mut() {
            match kind {
                LookupKind::AssetType => asset.asset_type_ids.retain(|t| *t != id),
                LookupKind::Tag => asset.tag_ids.retain(|t| *t != id),
                LookupKind::ProvidedService => asset.service_ids.retain(|t| *t != id),
                LookupKind::TargetPopulation => asset.population_ids.retain(|t| *t != id),
                LookupKind::DataSource => {
                    if asset.data_source_id == Some(id) {
                        asset.data_source_id = None;
                    }
                }
                LookupKind::Category => {}
            }
        }
        if kind == LookupKind::Category {
            if let Some(types) = tables.lookups.get_mut(&LookupKind::AssetType) {
                for asset_type in types.values_mut() {
                    if asset_type.category_id == Some(id) {
                        asset_type.category_id = None;
                    }
                }
            }
        }
        Ok(())
    }

    async fn get_organization(&self, id: Id) -> Result<Organization> {
        let tables = self.tables.read().await;
        tables
            .organizations
            .get(&id)
            .cloned()
            .ok_or_else(|| RegistryError::not_found("Organization", id))
    }

    async fn insert_organization(&self, new: NewOrganization) -> Result<Organization> {
        if new.name.trim().is_empty() {
            return Err(RegistryError::validation("organization name cannot be empty"));
        }
        let mut tables = self.tables.write().await;
        let id = next(&mut tables.sequences.organization);
        let organization = Organization {
            id,
            name: new.name,
            email: new.email,
            phone: new.phone,
            url: new.url,
        };
        tables.organizations.insert(id, organization.clone());
        Ok(organization)
    }

    async fn history(&self, entity: &str, id: Id) -> Result<Vec<ChangeRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .history
            .iter()
            .filter(|record| record.entity == entity && record.entity_id == id)
            .cloned()
            .collect())
    }

    async fn snapshot(&self) -> Result<RegistrySnapshot> {
        let tables = self.tables.read().await;
        Ok(RegistrySnapshot {
            locations: tables.locations.values().cloned().collect(),
            assets: tables.assets.values().cloned().collect(),
            raw_assets: tables.raw_assets.values().cloned().collect(),
            organizations: tables.organizations.values().cloned().collect(),
            lookups: tables
                .lookups
                .iter()
                .map(|(kind, table)| (*kind, table.values().cloned().collect()))
                .collect(),
            history: tables.history.clone(),
            sequences: tables.sequences.clone(),
        })
    }
}
