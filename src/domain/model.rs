use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Id = i64;

/// Address and geocoding columns shared by `Location` and `RawAsset`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationFields {
    #[serde(default)]
    pub street_address: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub unit_type: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub parcel_id: Option<String>,
    #[serde(default)]
    pub residence: Option<bool>,
    #[serde(default)]
    pub available_transportation: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub geocoding_properties: Option<String>,
}

impl LocationFields {
    pub fn has_street_address(&self) -> bool {
        !is_blank(self.street_address.as_deref())
    }

    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: Id,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub fields: LocationFields,
}

impl Location {
    /// Single-line label, e.g. `1501 Buena Vista Road Pittsburgh, PA`.
    pub fn label(&self) -> String {
        let street = self.fields.street_address.as_deref().unwrap_or_default();
        let city = self.fields.city.as_deref().unwrap_or_default();
        let state = self.fields.state.as_deref().unwrap_or_default();
        format!("{street} {city}, {state}").trim().to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewLocation {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub fields: LocationFields,
}

impl From<LocationFields> for NewLocation {
    fn from(fields: LocationFields) -> Self {
        Self { name: None, fields }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub localizability: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub hours_of_operation: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub organization_id: Option<Id>,
    #[serde(default)]
    pub location_id: Option<Id>,
    #[serde(default)]
    pub asset_type_ids: Vec<Id>,
    #[serde(default)]
    pub tag_ids: Vec<Id>,
    #[serde(default)]
    pub service_ids: Vec<Id>,
    #[serde(default)]
    pub population_ids: Vec<Id>,
    #[serde(default)]
    pub data_source_id: Option<Id>,
    #[serde(default)]
    pub do_not_display: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewAsset {
    pub name: String,
    #[serde(default)]
    pub localizability: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub hours_of_operation: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub organization_id: Option<Id>,
    #[serde(default)]
    pub location_id: Option<Id>,
    #[serde(default)]
    pub asset_type_ids: Vec<Id>,
    #[serde(default)]
    pub tag_ids: Vec<Id>,
    #[serde(default)]
    pub service_ids: Vec<Id>,
    #[serde(default)]
    pub population_ids: Vec<Id>,
    #[serde(default)]
    pub data_source_id: Option<Id>,
    #[serde(default)]
    pub do_not_display: bool,
}

impl NewAsset {
    pub fn into_asset(self, id: Id) -> Asset {
        Asset {
            id,
            name: self.name,
            localizability: self.localizability,
            url: self.url,
            email: self.email,
            phone: self.phone,
            hours_of_operation: self.hours_of_operation,
            notes: self.notes,
            organization_id: self.organization_id,
            location_id: self.location_id,
            asset_type_ids: self.asset_type_ids,
            tag_ids: self.tag_ids,
            service_ids: self.service_ids,
            population_ids: self.population_ids,
            data_source_id: self.data_source_id,
            do_not_display: self.do_not_display,
        }
    }
}

/// Unreconciled source row backing one Asset's location fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAsset {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub asset_id: Option<Id>,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(flatten)]
    pub location: LocationFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRawAsset {
    pub name: String,
    #[serde(default)]
    pub asset_id: Option<Id>,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(flatten)]
    pub location: LocationFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// The name-keyed lookup tables hanging off an Asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
    AssetType,
    Category,
    Tag,
    ProvidedService,
    TargetPopulation,
    DataSource,
}

impl LookupKind {
    pub const ALL: [LookupKind; 6] = [
        LookupKind::AssetType,
        LookupKind::Category,
        LookupKind::Tag,
        LookupKind::ProvidedService,
        LookupKind::TargetPopulation,
        LookupKind::DataSource,
    ];

    pub fn entity_name(self) -> &'static str {
        match self {
            LookupKind::AssetType => "AssetType",
            LookupKind::Category => "Category",
            LookupKind::Tag => "Tag",
            LookupKind::ProvidedService => "ProvidedService",
            LookupKind::TargetPopulation => "TargetPopulation",
            LookupKind::DataSource => "DataSource",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupEntry {
    pub id: Id,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Only meaningful for asset types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Id>,
    /// Only meaningful for data sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewLookup {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category_id: Option<Id>,
    #[serde(default)]
    pub url: Option<String>,
}

impl NewLookup {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub entity: String,
    pub entity_id: Id,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
}

/// Columns a `LocationQuery` can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationField {
    Name,
    StreetAddress,
    Municipality,
    City,
    State,
    ZipCode,
    ParcelId,
}

impl LocationField {
    pub fn value_of(self, location: &Location) -> Option<&str> {
        let fields = &location.fields;
        match self {
            LocationField::Name => location.name.as_deref(),
            LocationField::StreetAddress => fields.street_address.as_deref(),
            LocationField::Municipality => fields.municipality.as_deref(),
            LocationField::City => fields.city.as_deref(),
            LocationField::State => fields.state.as_deref(),
            LocationField::ZipCode => fields.zip_code.as_deref(),
            LocationField::ParcelId => fields.parcel_id.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Exact,
    IExact,
    StartsWith,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: LocationField,
    pub lookup: Lookup,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationQuery {
    pub conditions: Vec<Condition>,
}

impl LocationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: LocationField, lookup: Lookup, value: Option<&str>) -> Self {
        self.conditions.push(Condition {
            field,
            lookup,
            value: value.map(str::to_string),
        });
        self
    }

    /// Street, city and state compared case-insensitively, zip by prefix.
    pub fn by_address(fields: &LocationFields) -> Self {
        Self::new()
            .with(
                LocationField::StreetAddress,
                Lookup::IExact,
                fields.street_address.as_deref(),
            )
            .with(LocationField::City, Lookup::IExact, fields.city.as_deref())
            .with(LocationField::State, Lookup::IExact, fields.state.as_deref())
            .with(
                LocationField::ZipCode,
                Lookup::StartsWith,
                fields.zip_code.as_deref(),
            )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocationMatch {
    None,
    Unique(Location),
    Ambiguous(Vec<Location>),
}

impl LocationMatch {
    pub fn unique(self) -> Option<Location> {
        match self {
            LocationMatch::Unique(location) => Some(location),
            LocationMatch::None | LocationMatch::Ambiguous(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub limit: usize,
    pub offset: usize,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: usize = 100;
    pub const MAX_LIMIT: usize = 1000;

    pub fn new(limit: Option<usize>, offset: Option<usize>) -> Self {
        Self {
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetFilter {
    /// Case-insensitive substring of the asset name.
    pub search: Option<String>,
    pub page: PageRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: usize,
    pub limit: usize,
    pub offset: usize,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            limit: self.limit,
            offset: self.offset,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

/// Coordinates returned by a geocoding service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geocode {
    pub latitude: f64,
    pub longitude: f64,
    pub properties: String,
}

/// Everything the registry holds, as persisted on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    #[serde(default)]
    pub locations: Vec<Location>,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub raw_assets: Vec<RawAsset>,
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub lookups: BTreeMap<LookupKind, Vec<LookupEntry>>,
    #[serde(default)]
    pub history: Vec<ChangeRecord>,
    #[serde(default)]
    pub sequences: IdSequences,
}

/// Last ID handed out per table. IDs of deleted rows are never reused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdSequences {
    #[serde(default)]
    pub location: Id,
    #[serde(default)]
    pub asset: Id,
    #[serde(default)]
    pub raw_asset: Id,
    #[serde(default)]
    pub organization: Id,
    #[serde(default)]
    pub lookups: BTreeMap<LookupKind, Id>,
}
