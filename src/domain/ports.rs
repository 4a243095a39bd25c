use crate::domain::model::{
    Asset, AssetFilter, ChangeRecord, Geocode, Id, Location, LocationMatch, LocationQuery,
    LookupEntry, LookupKind, NewAsset, NewLocation, NewLookup, NewOrganization, NewRawAsset,
    Organization, Page, PageRequest, RawAsset, RegistrySnapshot,
};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

/// Relational store for assets, locations and their lookup tables.
///
/// Writes to assets, raw assets and locations take a change reason, which is
/// kept in the registry's history.
#[async_trait]
pub trait Registry: Send + Sync {
    async fn get_location(&self, id: Id) -> Result<Location>;
    async fn list_locations(&self, page: PageRequest) -> Result<Page<Location>>;
    async fn insert_location(&self, new: NewLocation, reason: &str) -> Result<Location>;
    async fn update_location(&self, location: &Location, reason: &str) -> Result<Location>;
    /// Removes the location and unlinks every asset that pointed at it.
    async fn delete_location(&self, id: Id, reason: &str) -> Result<()>;
    async fn find_location(&self, query: &LocationQuery) -> Result<LocationMatch>;
    async fn assets_at_location(&self, location_id: Id) -> Result<Vec<Asset>>;

    async fn get_asset(&self, id: Id) -> Result<Asset>;
    async fn list_assets(&self, filter: &AssetFilter) -> Result<Page<Asset>>;
    async fn insert_asset(&self, new: NewAsset, reason: &str) -> Result<Asset>;
    async fn update_asset(&self, asset: &Asset, reason: &str) -> Result<Asset>;
    async fn delete_asset(&self, id: Id, reason: &str) -> Result<()>;

    async fn get_raw_asset(&self, id: Id) -> Result<RawAsset>;
    async fn raw_assets_for_asset(&self, asset_id: Id) -> Result<Vec<RawAsset>>;
    /// Existing raw assets among `ids`; unknown IDs are skipped.
    async fn raw_assets_by_ids(&self, ids: &[Id]) -> Result<Vec<RawAsset>>;
    async fn insert_raw_asset(&self, new: NewRawAsset, reason: &str) -> Result<RawAsset>;
    async fn update_raw_asset(&self, raw: &RawAsset, reason: &str) -> Result<RawAsset>;

    async fn list_lookup(&self, kind: LookupKind) -> Result<Vec<LookupEntry>>;
    async fn get_lookup(&self, kind: LookupKind, id: Id) -> Result<LookupEntry>;
    async fn find_lookup_by_name(&self, kind: LookupKind, name: &str)
        -> Result<Option<LookupEntry>>;
    async fn get_or_create_lookup(&self, kind: LookupKind, name: &str) -> Result<LookupEntry>;
    async fn insert_lookup(&self, kind: LookupKind, new: NewLookup) -> Result<LookupEntry>;
    async fn update_lookup(&self, kind: LookupKind, entry: &LookupEntry) -> Result<LookupEntry>;
    /// Removes the entry and detaches it from every asset.
    async fn delete_lookup(&self, kind: LookupKind, id: Id) -> Result<()>;

    async fn get_organization(&self, id: Id) -> Result<Organization>;
    async fn insert_organization(&self, new: NewOrganization) -> Result<Organization>;

    async fn history(&self, entity: &str, id: Id) -> Result<Vec<ChangeRecord>>;
    async fn snapshot(&self) -> Result<RegistrySnapshot>;
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Short provider name used in geocoding provenance, e.g. `Geocodio`.
    fn provider(&self) -> &str;

    /// `Ok(None)` when the service found no acceptable match.
    async fn geocode(&self, full_address: &str) -> Result<Option<Geocode>>;
}
