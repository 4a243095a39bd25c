//! Repair of Locations that were wrongly shared by several Assets.
//!
//! Each Asset linked to the overloaded Location gets its address back from
//! its single RawAsset and is re-linked to a matching Location, a fresh one
//! built from raw coordinates, nothing at all, or (when nothing matches) the
//! original Location. Missing or low-confidence coordinates are re-geocoded.

use crate::config::RepairConfig;
use crate::core::address::{form_full_address, is_low_confidence, needs_geocoding};
use crate::domain::model::{
    Asset, Id, Location, LocationFields, LocationMatch, LocationQuery, NewLocation, RawAsset,
};
use crate::domain::ports::{Geocoder, Registry};
use crate::utils::error::{RegistryError, Result};
use serde::Serialize;

/// How an asset's new location was chosen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "location_id", rename_all = "snake_case")]
pub enum Resolution {
    /// An existing location with the raw asset's address.
    Matched(Id),
    /// Built from the raw asset's coordinates; no id in a dry run.
    CreatedFromCoordinates(Option<Id>),
    /// The raw asset has no usable location information.
    Unlinked,
    /// Nothing matched, so the asset stays on the overloaded location.
    FellBackToOriginal(Id),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocodingOutcome {
    NotNeeded,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetOutcome {
    pub asset_id: Id,
    pub raw_asset_id: Id,
    pub resolution: Resolution,
    pub geocoding: GeocodingOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitReport {
    pub location_id: Id,
    pub dry_run: bool,
    pub total: usize,
    pub handled: usize,
    /// Hidden (`do_not_display`) assets that were left alone.
    pub skipped: Vec<Id>,
    pub outcomes: Vec<AssetOutcome>,
}

#[derive(Debug, Clone)]
pub struct SplitOptions {
    pub default_state: String,
    pub change_reason: String,
}

impl From<&RepairConfig> for SplitOptions {
    fn from(config: &RepairConfig) -> Self {
        Self {
            default_state: config.default_state.clone(),
            change_reason: config.change_reason.clone(),
        }
    }
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self::from(&RepairConfig::default())
    }
}

/// The location picked for one asset. `persisted` is false for a location
/// that only exists because of a dry run.
struct Chosen {
    location: Location,
    persisted: bool,
}

pub struct LocationSplitter<'a> {
    registry: &'a dyn Registry,
    geocoder: &'a dyn Geocoder,
    options: SplitOptions,
}

impl<'a> LocationSplitter<'a> {
    pub fn new(registry: &'a dyn Registry, geocoder: &'a dyn Geocoder, options: SplitOptions) -> Self {
        Self {
            registry,
            geocoder,
            options,
        }
    }

    /// Splits the location `location_id` across the assets linked to it.
    ///
    /// Stops at the first asset without exactly one raw asset; writes made
    /// for earlier assets are kept. With `dry_run` nothing is written.
    pub async fn split_location(&self, location_id: Id, dry_run: bool) -> Result<SplitReport> {
        let mut overloaded = self.registry.get_location(location_id).await?;
        let assets = self.registry.assets_at_location(location_id).await?;
        let total = assets.len();
        tracing::info!("Attempting to generate better Locations for {} Assets.", total);

        let mut report = SplitReport {
            location_id,
            dry_run,
            total,
            handled: 0,
            skipped: Vec::new(),
            outcomes: Vec::new(),
        };

        for asset in assets {
            // Hidden assets may lack raw assets and are not shown anyway.
            if asset.do_not_display {
                report.skipped.push(asset.id);
                continue;
            }

            let asset_id = asset.id;
            let raw = self.single_raw_asset(&asset).await?;
            let row = &raw.location;

            let (chosen, resolution) = self.resolve(&overloaded, row, total, dry_run).await?;

            let (chosen, geocoding) = match chosen {
                Some(mut chosen) => {
                    let outcome = self.refresh_coordinates(&mut chosen, row, dry_run).await?;
                    if chosen.location.id == overloaded.id {
                        overloaded = chosen.location.clone();
                    }
                    (Some(chosen), outcome)
                }
                None => (None, GeocodingOutcome::NotNeeded),
            };

            let new_location_id = chosen
                .as_ref()
                .filter(|c| c.persisted)
                .map(|c| c.location.id);
            self.relink(asset, new_location_id, dry_run).await?;

            report.handled += 1;
            report.outcomes.push(AssetOutcome {
                asset_id,
                raw_asset_id: raw.id,
                resolution,
                geocoding,
            });
        }

        tracing::info!(
            "Handled {}/{} asset locations. (Some may have been pre-existing.)",
            report.handled,
            report.total
        );
        Ok(report)
    }

    async fn single_raw_asset(&self, asset: &Asset) -> Result<RawAsset> {
        let mut raw_assets = self.registry.raw_assets_for_asset(asset.id).await?;
        match raw_assets.len() {
            0 => Err(RegistryError::NoRawAsset { asset_id: asset.id }),
            1 => Ok(raw_assets.remove(0)),
            _ => Err(RegistryError::MultipleRawAssets { asset_id: asset.id }),
        }
    }

    async fn resolve(
        &self,
        overloaded: &Location,
        row: &LocationFields,
        total: usize,
        dry_run: bool,
    ) -> Result<(Option<Chosen>, Resolution)> {
        if !row.has_street_address() {
            let trusted_coordinates = row.latitude.is_some()
                && !is_low_confidence(row.geocoding_properties.as_deref());

            if !trusted_coordinates {
                tracing::debug!("Raw asset has no usable location information; unlinking");
                return Ok((None, Resolution::Unlinked));
            }

            let new = NewLocation::from(row.clone());
            let chosen = if dry_run {
                Chosen {
                    location: Location {
                        id: 0,
                        name: new.name,
                        fields: new.fields,
                    },
                    persisted: false,
                }
            } else {
                let location = self
                    .registry
                    .insert_location(new, &self.options.change_reason)
                    .await?;
                tracing::info!(location_id = location.id, "Created Location from raw coordinates");
                Chosen {
                    location,
                    persisted: true,
                }
            };
            let id = chosen.persisted.then_some(chosen.location.id);
            return Ok((Some(chosen), Resolution::CreatedFromCoordinates(id)));
        }

        match self
            .registry
            .find_location(&LocationQuery::by_address(row))
            .await?
        {
            LocationMatch::Unique(location) => {
                let id = location.id;
                Ok((
                    Some(Chosen {
                        location,
                        persisted: true,
                    }),
                    Resolution::Matched(id),
                ))
            }
            LocationMatch::None | LocationMatch::Ambiguous(_) => {
                // The Location's address may have been hand-edited away from the raw asset's.
                tracing::info!(
                    "No unique Location matches '{}'; keeping Location {}",
                    form_full_address(row, &self.options.default_state),
                    overloaded.id
                );
                if total > 1 {
                    tracing::warn!(
                        "  Check whether the Assets at location ID {} should really be together.",
                        overloaded.id
                    );
                }
                Ok((
                    Some(Chosen {
                        location: overloaded.clone(),
                        persisted: true,
                    }),
                    Resolution::FellBackToOriginal(overloaded.id),
                ))
            }
        }
    }

    async fn refresh_coordinates(
        &self,
        chosen: &mut Chosen,
        row: &LocationFields,
        dry_run: bool,
    ) -> Result<GeocodingOutcome> {
        if !needs_geocoding(&chosen.location.fields) || !row.has_street_address() {
            return Ok(GeocodingOutcome::NotNeeded);
        }

        let full_address = form_full_address(row, &self.options.default_state);
        let fields = &mut chosen.location.fields;
        let outcome = match self.geocoder.geocode(&full_address).await? {
            Some(geocode) => {
                fields.latitude = Some(geocode.latitude);
                fields.longitude = Some(geocode.longitude);
                fields.geocoding_properties = Some(geocode.properties);
                GeocodingOutcome::Succeeded
            }
            None => {
                tracing::warn!(
                    "Geocoordinates for Location ID {} are being set to (None, None).",
                    chosen.location.id
                );
                fields.latitude = None;
                fields.longitude = None;
                fields.geocoding_properties = Some(format!(
                    "Unsuccessfully geocoded by {}",
                    self.geocoder.provider()
                ));
                GeocodingOutcome::Failed
            }
        };

        if !dry_run && chosen.persisted {
            self.registry
                .update_location(&chosen.location, &self.options.change_reason)
                .await?;
        }
        Ok(outcome)
    }

    async fn relink(&self, mut asset: Asset, location_id: Option<Id>, dry_run: bool) -> Result<()> {
        tracing::debug!(
            asset_id = asset.id,
            from = ?asset.location_id,
            to = ?location_id,
            "Relinking asset"
        );
        if dry_run {
            return Ok(());
        }
        asset.location_id = location_id;
        self.registry
            .update_asset(&asset, &self.options.change_reason)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryRegistry;
    use crate::config::toml_config::DEFAULT_CHANGE_REASON;
    use crate::domain::model::{Geocode, NewAsset, NewRawAsset};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Geocoder answering from a fixed table and remembering what it was asked.
    #[derive(Default)]
    struct ScriptedGeocoder {
        answers: HashMap<String, (f64, f64)>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedGeocoder {
        fn with(address: &str, lat: f64, lng: f64) -> Self {
            let mut geocoder = Self::default();
            geocoder.answers.insert(address.to_string(), (lat, lng));
            geocoder
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Geocoder for ScriptedGeocoder {
        fn provider(&self) -> &str {
            "Geocodio"
        }

        async fn geocode(&self, full_address: &str) -> Result<Option<Geocode>> {
            self.calls.lock().unwrap().push(full_address.to_string());
            Ok(self
                .answers
                .get(full_address)
                .map(|(latitude, longitude)| Geocode {
                    latitude: *latitude,
                    longitude: *longitude,
                    properties: r#"{"accuracy":1.0,"geocoder":"geocodio"}"#.to_string(),
                }))
        }
    }

    fn street(street: &str, zip: &str) -> LocationFields {
        LocationFields {
            street_address: Some(street.to_string()),
            city: Some("Pittsburgh".to_string()),
            state: Some("PA".to_string()),
            zip_code: Some(zip.to_string()),
            ..LocationFields::default()
        }
    }

    fn geocoded(mut fields: LocationFields, props: &str) -> LocationFields {
        fields.latitude = Some(40.44);
        fields.longitude = Some(-79.99);
        fields.geocoding_properties = Some(props.to_string());
        fields
    }

    async fn add_asset(
        registry: &InMemoryRegistry,
        name: &str,
        location_id: Id,
        raw: Option<LocationFields>,
    ) -> Id {
        let asset = registry
            .insert_asset(
                NewAsset {
                    name: name.to_string(),
                    location_id: Some(location_id),
                    ..NewAsset::default()
                },
                "seed",
            )
            .await
            .unwrap();
        if let Some(location) = raw {
            registry
                .insert_raw_asset(
                    NewRawAsset {
                        name: name.to_string(),
                        asset_id: Some(asset.id),
                        asset_type: None,
                        location,
                    },
                    "seed",
                )
                .await
                .unwrap();
        }
        asset.id
    }

    async fn add_location(registry: &InMemoryRegistry, fields: LocationFields) -> Location {
        registry
            .insert_location(NewLocation::from(fields), "seed")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_assets_are_moved_to_their_own_matching_locations() {
        let registry = InMemoryRegistry::new();
        let shared = add_location(
            &registry,
            geocoded(street("100 Grant Street", "15219"), r#"{"accuracy":1}"#),
        )
        .await;
        let pantry_home = add_location(
            &registry,
            geocoded(street("1501 Buena Vista Road", "15212-4410"), r#"{"accuracy":1}"#),
        )
        .await;

        let courthouse = add_asset(
            &registry,
            "Courthouse",
            shared.id,
            Some(street("100 GRANT STREET", "15219")),
        )
        .await;
        let pantry = add_asset(
            &registry,
            "Pantry",
            shared.id,
            Some(street("1501 buena vista road", "15212")),
        )
        .await;

        let geocoder = ScriptedGeocoder::default();
        let splitter = LocationSplitter::new(&registry, &geocoder, SplitOptions::default());
        let report = splitter.split_location(shared.id, false).await.unwrap();

        assert_eq!((report.handled, report.total), (2, 2));
        assert_eq!(report.outcomes[0].resolution, Resolution::Matched(shared.id));
        assert_eq!(
            report.outcomes[1].resolution,
            Resolution::Matched(pantry_home.id)
        );
        assert!(geocoder.calls().is_empty());

        assert_eq!(
            registry.get_asset(courthouse).await.unwrap().location_id,
            Some(shared.id)
        );
        assert_eq!(
            registry.get_asset(pantry).await.unwrap().location_id,
            Some(pantry_home.id)
        );
        let history = registry.history("Asset", pantry).await.unwrap();
        assert_eq!(history.last().unwrap().reason, DEFAULT_CHANGE_REASON);
    }

    #[tokio::test]
    async fn test_low_confidence_match_is_regeocoded() {
        let registry = InMemoryRegistry::new();
        let shared = add_location(
            &registry,
            geocoded(
                street("1501 Buena Vista Road", "15212"),
                "{'confidence': 0.6, 'layer': 'street'}",
            ),
        )
        .await;
        add_asset(
            &registry,
            "Pantry",
            shared.id,
            Some(street("1501 Buena Vista Road", "15212")),
        )
        .await;

        let geocoder = ScriptedGeocoder::with(
            "1501 Buena Vista Road, Pittsburgh, PA 15212",
            40.4565,
            -80.0123,
        );
        let splitter = LocationSplitter::new(&registry, &geocoder, SplitOptions::default());
        let report = splitter.split_location(shared.id, false).await.unwrap();

        assert_eq!(report.outcomes[0].geocoding, GeocodingOutcome::Succeeded);
        let location = registry.get_location(shared.id).await.unwrap();
        assert_eq!(location.fields.latitude, Some(40.4565));
        assert_eq!(location.fields.longitude, Some(-80.0123));
        assert!(!is_low_confidence(location.fields.geocoding_properties.as_deref()));
    }

    #[tokio::test]
    async fn test_failed_geocoding_clears_coordinates() {
        let registry = InMemoryRegistry::new();
        let shared = add_location(&registry, street("9 Nowhere Lane", "15000")).await;
        add_asset(
            &registry,
            "Mystery",
            shared.id,
            Some(street("9 Nowhere Lane", "15000")),
        )
        .await;

        let geocoder = ScriptedGeocoder::default();
        let splitter = LocationSplitter::new(&registry, &geocoder, SplitOptions::default());
        let report = splitter.split_location(shared.id, false).await.unwrap();

        assert_eq!(report.outcomes[0].geocoding, GeocodingOutcome::Failed);
        let location = registry.get_location(shared.id).await.unwrap();
        assert_eq!(location.fields.latitude, None);
        assert_eq!(
            location.fields.geocoding_properties.as_deref(),
            Some("Unsuccessfully geocoded by Geocodio")
        );
    }

    #[tokio::test]
    async fn test_raw_coordinates_without_street_create_a_location() {
        let registry = InMemoryRegistry::new();
        let shared = add_location(&registry, street("100 Grant Street", "15219")).await;
        let mut raw = LocationFields {
            latitude: Some(40.47),
            longitude: Some(-79.95),
            geocoding_properties: Some("From the county parcel layer".to_string()),
            ..LocationFields::default()
        };
        raw.city = Some("Pittsburgh".to_string());
        let park = add_asset(&registry, "Park", shared.id, Some(raw)).await;

        let geocoder = ScriptedGeocoder::default();
        let splitter = LocationSplitter::new(&registry, &geocoder, SplitOptions::default());
        let report = splitter.split_location(shared.id, false).await.unwrap();

        let Resolution::CreatedFromCoordinates(Some(new_id)) = report.outcomes[0].resolution
        else {
            panic!("unexpected resolution {:?}", report.outcomes[0].resolution);
        };
        assert_ne!(new_id, shared.id);
        let created = registry.get_location(new_id).await.unwrap();
        assert_eq!(created.fields.latitude, Some(40.47));
        assert_eq!(
            registry.get_asset(park).await.unwrap().location_id,
            Some(new_id)
        );
    }

    #[tokio::test]
    async fn test_raw_asset_without_usable_location_is_unlinked() {
        let registry = InMemoryRegistry::new();
        let shared = add_location(&registry, street("100 Grant Street", "15219")).await;
        let raw = LocationFields {
            latitude: Some(40.0),
            longitude: Some(-80.0),
            geocoding_properties: Some("{'confidence': 0.3}".to_string()),
            ..LocationFields::default()
        };
        let hotline = add_asset(&registry, "Hotline", shared.id, Some(raw)).await;

        let geocoder = ScriptedGeocoder::default();
        let splitter = LocationSplitter::new(&registry, &geocoder, SplitOptions::default());
        let report = splitter.split_location(shared.id, false).await.unwrap();

        assert_eq!(report.outcomes[0].resolution, Resolution::Unlinked);
        assert_eq!(registry.get_asset(hotline).await.unwrap().location_id, None);
    }

    #[tokio::test]
    async fn test_unmatched_address_falls_back_and_is_geocoded_once() {
        let registry = InMemoryRegistry::new();
        let shared = add_location(&registry, street("1501 Buena Vista  Road", "15212")).await;
        add_asset(
            &registry,
            "Pantry",
            shared.id,
            Some(street("1501 Buena Vista Road", "15212")),
        )
        .await;
        add_asset(
            &registry,
            "Pantry annex",
            shared.id,
            Some(street("1501 Buena Vista Road", "15212")),
        )
        .await;

        let geocoder = ScriptedGeocoder::with(
            "1501 Buena Vista Road, Pittsburgh, PA 15212",
            40.4565,
            -80.0123,
        );
        let splitter = LocationSplitter::new(&registry, &geocoder, SplitOptions::default());
        let report = splitter.split_location(shared.id, false).await.unwrap();

        assert!(report
            .outcomes
            .iter()
            .all(|o| o.resolution == Resolution::FellBackToOriginal(shared.id)));
        assert_eq!(geocoder.calls().len(), 1);
        assert_eq!(report.outcomes[1].geocoding, GeocodingOutcome::NotNeeded);
    }

    #[tokio::test]
    async fn test_hidden_assets_are_skipped() {
        let registry = InMemoryRegistry::new();
        let shared = add_location(
            &registry,
            geocoded(street("100 Grant Street", "15219"), r#"{"accuracy":1}"#),
        )
        .await;
        let hidden = registry
            .insert_asset(
                NewAsset {
                    name: "Closed shelter".to_string(),
                    location_id: Some(shared.id),
                    do_not_display: true,
                    ..NewAsset::default()
                },
                "seed",
            )
            .await
            .unwrap();

        let geocoder = ScriptedGeocoder::default();
        let splitter = LocationSplitter::new(&registry, &geocoder, SplitOptions::default());
        let report = splitter.split_location(shared.id, false).await.unwrap();

        assert_eq!(report.total, 1);
        assert_eq!(report.handled, 0);
        assert_eq!(report.skipped, vec![hidden.id]);
    }

    #[tokio::test]
    async fn test_missing_and_multiple_raw_assets_are_errors() {
        let registry = InMemoryRegistry::new();
        let shared = add_location(&registry, street("100 Grant Street", "15219")).await;
        let orphan = add_asset(&registry, "Orphan", shared.id, None).await;

        let geocoder = ScriptedGeocoder::default();
        let splitter = LocationSplitter::new(&registry, &geocoder, SplitOptions::default());
        let err = splitter.split_location(shared.id, false).await.unwrap_err();
        assert!(matches!(err, RegistryError::NoRawAsset { asset_id } if asset_id == orphan));

        let other = add_location(&registry, street("1 Market Square", "15222")).await;
        let doubled = add_asset(
            &registry,
            "Doubled",
            other.id,
            Some(street("1 Market Square", "15222")),
        )
        .await;
        registry
            .insert_raw_asset(
                NewRawAsset {
                    name: "Doubled (second source)".to_string(),
                    asset_id: Some(doubled),
                    asset_type: None,
                    location: street("1 Market Square", "15222"),
                },
                "seed",
            )
            .await
            .unwrap();

        let err = splitter.split_location(other.id, false).await.unwrap_err();
        assert!(matches!(err, RegistryError::MultipleRawAssets { asset_id } if asset_id == doubled));
    }

    #[tokio::test]
    async fn test_writes_before_a_failing_asset_remain() {
        let registry = InMemoryRegistry::new();
        let shared = add_location(&registry, street("100 Grant Street", "15219")).await;
        let park = add_asset(
            &registry,
            "Park",
            shared.id,
            Some(LocationFields {
                latitude: Some(40.47),
                longitude: Some(-79.95),
                ..LocationFields::default()
            }),
        )
        .await;
        let doubled = add_asset(
            &registry,
            "Doubled",
            shared.id,
            Some(street("100 Grant Street", "15219")),
        )
        .await;
        registry
            .insert_raw_asset(
                NewRawAsset {
                    name: "Doubled (second source)".to_string(),
                    asset_id: Some(doubled),
                    asset_type: None,
                    location: street("100 Grant Street", "15219"),
                },
                "seed",
            )
            .await
            .unwrap();

        let geocoder = ScriptedGeocoder::default();
        let splitter = LocationSplitter::new(&registry, &geocoder, SplitOptions::default());
        let err = splitter.split_location(shared.id, false).await.unwrap_err();
        assert!(matches!(err, RegistryError::MultipleRawAssets { asset_id } if asset_id == doubled));

        let moved_to = registry.get_asset(park).await.unwrap().location_id;
        assert!(moved_to.is_some_and(|id| id != shared.id));
        assert_eq!(
            registry.get_asset(doubled).await.unwrap().location_id,
            Some(shared.id)
        );
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let registry = InMemoryRegistry::new();
        let shared = add_location(&registry, street("100 Grant Street", "15219")).await;
        add_asset(
            &registry,
            "Courthouse",
            shared.id,
            Some(street("100 Grant Street", "15219")),
        )
        .await;
        let park = add_asset(
            &registry,
            "Park",
            shared.id,
            Some(LocationFields {
                latitude: Some(40.47),
                longitude: Some(-79.95),
                ..LocationFields::default()
            }),
        )
        .await;
        let before = registry.snapshot().await.unwrap();

        let geocoder = ScriptedGeocoder::with("100 Grant Street, Pittsburgh, PA 15219", 40.43, -79.99);
        let splitter = LocationSplitter::new(&registry, &geocoder, SplitOptions::default());
        let report = splitter.split_location(shared.id, true).await.unwrap();

        assert!(report.dry_run);
        assert_eq!(report.handled, 2);
        assert_eq!(report.outcomes[0].geocoding, GeocodingOutcome::Succeeded);
        assert_eq!(
            report.outcomes[1].resolution,
            Resolution::CreatedFromCoordinates(None)
        );
        assert_eq!(registry.snapshot().await.unwrap(), before);
        assert_eq!(
            registry.get_asset(park).await.unwrap().location_id,
            Some(shared.id)
        );
    }

    #[tokio::test]
    async fn test_unknown_location() {
        let registry = InMemoryRegistry::new();
        let geocoder = ScriptedGeocoder::default();
        let splitter = LocationSplitter::new(&registry, &geocoder, SplitOptions::default());

        assert!(matches!(
            splitter.split_location(404, false).await,
            Err(RegistryError::NotFound { entity: "Location", id: 404 })
        ));
    }
}
