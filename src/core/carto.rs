//! SQL statements for mirroring assets onto a hosted Carto table.

use crate::domain::model::{Asset, Id, LookupKind};
use crate::domain::ports::Registry;
use crate::utils::error::{RegistryError, Result};

/// Carto's SQL API rejects longer queries.
pub const MAX_QUERY_LENGTH: usize = 16384;

/// Columns of the Carto asset table, in publishing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartoField {
    Id,
    Name,
    AssetType,
    AssetTypeTitle,
    Category,
    CategoryTitle,
    Latitude,
    Longitude,
}

impl CartoField {
    pub const ALL: [CartoField; 8] = [
        CartoField::Id,
        CartoField::Name,
        CartoField::AssetType,
        CartoField::AssetTypeTitle,
        CartoField::Category,
        CartoField::CategoryTitle,
        CartoField::Latitude,
        CartoField::Longitude,
    ];

    pub fn column(self) -> &'static str {
        match self {
            CartoField::Id => "id",
            CartoField::Name => "name",
            CartoField::AssetType => "asset_type",
            CartoField::AssetTypeTitle => "asset_type_title",
            CartoField::Category => "category",
            CartoField::CategoryTitle => "category_title",
            CartoField::Latitude => "latitude",
            CartoField::Longitude => "longitude",
        }
    }
}

/// Flattened view of an asset as published to Carto. Only the first asset
/// type (and its category) is published.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartoRecord {
    pub id: Id,
    pub name: String,
    pub asset_type: Option<String>,
    pub asset_type_title: Option<String>,
    pub category: Option<String>,
    pub category_title: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl CartoRecord {
    pub async fn load(registry: &dyn Registry, asset_id: Id) -> Result<Self> {
        let asset = registry.get_asset(asset_id).await?;
        Self::from_asset(registry, &asset).await
    }

    pub async fn from_asset(registry: &dyn Registry, asset: &Asset) -> Result<Self> {
        let mut record = CartoRecord {
            id: asset.id,
            name: asset.name.clone(),
            ..CartoRecord::default()
        };

        if let Some(type_id) = asset.asset_type_ids.first() {
            let asset_type = registry.get_lookup(LookupKind::AssetType, *type_id).await?;
            if let Some(category_id) = asset_type.category_id {
                let category = registry.get_lookup(LookupKind::Category, category_id).await?;
                record.category = Some(category.name);
                record.category_title = category.title;
            }
            record.asset_type = Some(asset_type.name);
            record.asset_type_title = asset_type.title;
        }

        if let Some(location_id) = asset.location_id {
            let location = registry.get_location(location_id).await?;
            record.latitude = location.fields.latitude;
            record.longitude = location.fields.longitude;
        }

        Ok(record)
    }

    fn literal(&self, field: CartoField) -> String {
        match field {
            CartoField::Id => self.id.to_string(),
            CartoField::Name => quote(&self.name),
            CartoField::AssetType => quote_option(self.asset_type.as_deref()),
            CartoField::AssetTypeTitle => quote_option(self.asset_type_title.as_deref()),
            CartoField::Category => quote_option(self.category.as_deref()),
            CartoField::CategoryTitle => quote_option(self.category_title.as_deref()),
            CartoField::Latitude => number_option(self.latitude),
            CartoField::Longitude => number_option(self.longitude),
        }
    }

    fn geometries(&self) -> (String, String) {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => {
                let point = format!("ST_SetSRID(ST_MakePoint({lon}, {lat}), 4326)");
                let mercator = format!("ST_Transform({point}, 3857)");
                (point, mercator)
            }
            _ => ("NULL".to_string(), "NULL".to_string()),
        }
    }

    fn values_tuple(&self, fields: &[CartoField]) -> String {
        let (geom, mercator) = self.geometries();
        let mut values: Vec<String> = fields.iter().map(|f| self.literal(*f)).collect();
        values.push(geom);
        values.push(mercator);
        format!("({})", values.join(", "))
    }
}

/// Builds statements against one Carto table.
#[derive(Debug, Clone)]
pub struct CartoSql {
    table: String,
}

impl CartoSql {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn delete_statement(&self, asset_id: Id) -> Result<String> {
        checked(format!("DELETE FROM {} WHERE id = {};", self.table, asset_id))
    }

    pub fn insert_statement(&self, records: &[CartoRecord], fields: &[CartoField]) -> Result<String> {
        if records.is_empty() {
            return Err(RegistryError::validation("nothing to insert into Carto"));
        }
        let mut columns: Vec<&str> = fields.iter().map(|f| f.column()).collect();
        columns.extend(["the_geom", "the_geom_webmercator"]);

        let tuples: Vec<String> = records.iter().map(|r| r.values_tuple(fields)).collect();
        checked(format!(
            "INSERT INTO {} ({}) VALUES {};",
            self.table,
            columns.join(", "),
            tuples.join(", ")
        ))
    }

    /// `id` is the row key and is never part of the SET list.
    pub fn update_statement(&self, record: &CartoRecord, fields: &[CartoField]) -> Result<String> {
        let (geom, mercator) = record.geometries();
        let mut assignments: Vec<String> = fields
            .iter()
            .filter(|f| **f != CartoField::Id)
            .map(|f| format!("{} = {}", f.column(), record.literal(*f)))
            .collect();
        assignments.push(format!("the_geom = {geom}"));
        assignments.push(format!("the_geom_webmercator = {mercator}"));

        checked(format!(
            "UPDATE {} SET {} WHERE id = {};",
            self.table,
            assignments.join(", "),
            record.id
        ))
    }
}

fn checked(query: String) -> Result<String> {
    if query.len() >= MAX_QUERY_LENGTH {
        return Err(RegistryError::QueryTooLong {
            length: query.len(),
            limit: MAX_QUERY_LENGTH,
        });
    }
    Ok(query)
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn quote_option(value: Option<&str>) -> String {
    value.map_or_else(|| "NULL".to_string(), quote)
}

fn number_option(value: Option<f64>) -> String {
    value.map_or_else(|| "NULL".to_string(), |v| v.to_string())
}
