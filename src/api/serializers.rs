//! Response shapes for assets: compact list items, full details and GeoJSON.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::model::{Asset, Id, Location, LookupEntry, LookupKind, Organization};
use crate::domain::ports::Registry;
use crate::utils::error::Result;

/// All lookup tables, indexed for name resolution.
pub struct LookupNames {
    entries: HashMap<LookupKind, HashMap<Id, LookupEntry>>,
}

impl LookupNames {
    pub async fn load(registry: &dyn Registry) -> Result<Self> {
        let mut entries = HashMap::new();
        for kind in LookupKind::ALL {
            let table = registry
                .list_lookup(kind)
                .await?
                .into_iter()
                .map(|entry| (entry.id, entry))
                .collect();
            entries.insert(kind, table);
        }
        Ok(Self { entries })
    }

    fn entry(&self, kind: LookupKind, id: Id) -> Option<&LookupEntry> {
        self.entries.get(&kind).and_then(|table| table.get(&id))
    }

    fn names(&self, kind: LookupKind, ids: &[Id]) -> Vec<String> {
        ids.iter()
            .filter_map(|id| self.entry(kind, *id))
            .map(|entry| entry.name.clone())
            .collect()
    }

    /// Category of the asset's first type.
    fn category(&self, asset: &Asset) -> Option<String> {
        let first_type = asset.asset_type_ids.first()?;
        let category_id = self.entry(LookupKind::AssetType, *first_type)?.category_id?;
        self.entry(LookupKind::Category, category_id)
            .map(|entry| entry.name.clone())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetListItem {
    pub id: Id,
    pub name: String,
    pub asset_types: Vec<String>,
    pub category: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetDetail {
    pub id: Id,
    pub name: String,
    pub localizability: Option<String>,
    pub url: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub hours_of_operation: Option<String>,
    pub notes: Option<String>,
    pub organization: Option<Organization>,
    pub location: Option<Location>,
    pub asset_types: Vec<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub services: Vec<String>,
    pub target_populations: Vec<String>,
    pub data_source: Option<LookupEntry>,
    pub do_not_display: bool,
}

impl AssetDetail {
    fn coordinates(&self) -> Option<(f64, f64)> {
        let fields = &self.location.as_ref()?.fields;
        Some((fields.longitude?, fields.latitude?))
    }
}

async fn location_of(registry: &dyn Registry, asset: &Asset) -> Result<Option<Location>> {
    match asset.location_id {
        Some(id) => Ok(Some(registry.get_location(id).await?)),
        None => Ok(None),
    }
}

pub async fn list_item(
    registry: &dyn Registry,
    names: &LookupNames,
    asset: Asset,
) -> Result<AssetListItem> {
    let location = location_of(registry, &asset).await?;
    Ok(AssetListItem {
        category: names.category(&asset),
        asset_types: names.names(LookupKind::AssetType, &asset.asset_type_ids),
        latitude: location.as_ref().and_then(|l| l.fields.latitude),
        longitude: location.as_ref().and_then(|l| l.fields.longitude),
        id: asset.id,
        name: asset.name,
    })
}

pub async fn detail(registry: &dyn Registry, asset: Asset) -> Result<AssetDetail> {
    let names = LookupNames::load(registry).await?;
    let location = location_of(registry, &asset).await?;
    let organization = match asset.organization_id {
        Some(id) => Some(registry.get_organization(id).await?),
        None => None,
    };

    Ok(AssetDetail {
        organization,
        location,
        category: names.category(&asset),
        asset_types: names.names(LookupKind::AssetType, &asset.asset_type_ids),
        tags: names.names(LookupKind::Tag, &asset.tag_ids),
        services: names.names(LookupKind::ProvidedService, &asset.service_ids),
        target_populations: names.names(LookupKind::TargetPopulation, &asset.population_ids),
        data_source: asset
            .data_source_id
            .and_then(|id| names.entry(LookupKind::DataSource, id))
            .cloned(),
        id: asset.id,
        name: asset.name,
        localizability: asset.localizability,
        url: asset.url,
        email: asset.email,
        phone: asset.phone,
        hours_of_operation: asset.hours_of_operation,
        notes: asset.notes,
        do_not_display: asset.do_not_display,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct Point {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
}

#[derive(Debug, Clone, Serialize)]
pub struct Feature<P: Serialize> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: Id,
    pub geometry: Option<Point>,
    pub properties: P,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureCollection<P: Serialize> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub features: Vec<Feature<P>>,
}

fn feature<P: Serialize>(id: Id, coordinates: Option<(f64, f64)>, properties: P) -> Feature<P> {
    Feature {
        kind: "Feature",
        id,
        geometry: coordinates.map(|(lon, lat)| Point {
            kind: "Point",
            coordinates: [lon, lat],
        }),
        properties,
    }
}

impl From<AssetListItem> for Feature<AssetListItem> {
    fn from(item: AssetListItem) -> Self {
        let coordinates = item.longitude.zip(item.latitude);
        feature(item.id, coordinates, item)
    }
}

impl From<AssetDetail> for Feature<AssetDetail> {
    fn from(detail: AssetDetail) -> Self {
        let coordinates = detail.coordinates();
        feature(detail.id, coordinates, detail)
    }
}

impl<P: Serialize> FromIterator<Feature<P>> for FeatureCollection<P> {
    fn from_iter<I: IntoIterator<Item = Feature<P>>>(iter: I) -> Self {
        Self {
            kind: "FeatureCollection",
            features: iter.into_iter().collect(),
        }
    }
}
