//! End-to-end location repair: snapshot on disk, Geocodio over HTTP (mocked),
//! split, save, reload.

use httpmock::prelude::*;
use tempfile::TempDir;

use asset_registry::config::{AppConfig, StorageConfig};
use asset_registry::core::split::{GeocodingOutcome, Resolution};
use asset_registry::domain::model::{LocationFields, NewAsset, NewLocation, NewRawAsset};
use asset_registry::domain::ports::Registry;
use asset_registry::{
    GeocodioClient, InMemoryRegistry, LocationSplitter, SnapshotStore, SplitOptions,
};

fn address(street: &str, zip: &str) -> LocationFields {
    LocationFields {
        street_address: Some(street.to_string()),
        city: Some("Pittsburgh".to_string()),
        state: Some("PA".to_string()),
        zip_code: Some(zip.to_string()),
        ..LocationFields::default()
    }
}

/// Location 1 is shared by three assets:
/// - asset 1 whose raw address matches Location 2 (which lacks coordinates),
/// - asset 2 whose raw asset only has trusted coordinates,
/// - asset 3, hidden, which must be left alone.
async fn seed(registry: &InMemoryRegistry) {
    let shared = registry
        .insert_location(NewLocation::from(address("1 Wrong Way", "15201")), "import")
        .await
        .unwrap();
    registry
        .insert_location(
            NewLocation::from(address("200 Penn Avenue", "15222-1234")),
            "import",
        )
        .await
        .unwrap();

    let assets = [
        ("Penn Avenue Pantry", false),
        ("Mobile Clinic", false),
        ("Retired Shelter", true),
    ];
    for (name, hidden) in assets {
        registry
            .insert_asset(
                NewAsset {
                    name: name.to_string(),
                    location_id: Some(shared.id),
                    do_not_display: hidden,
                    ..NewAsset::default()
                },
                "import",
            )
            .await
            .unwrap();
    }

    registry
        .insert_raw_asset(
            NewRawAsset {
                name: "Penn Avenue Pantry".to_string(),
                asset_id: Some(1),
                location: address("200 Penn Avenue", "15222"),
                ..NewRawAsset::default()
            },
            "import",
        )
        .await
        .unwrap();
    registry
        .insert_raw_asset(
            NewRawAsset {
                name: "Mobile Clinic".to_string(),
                asset_id: Some(2),
                location: LocationFields {
                    latitude: Some(40.4433),
                    longitude: Some(-79.9436),
                    geocoding_properties: Some("{\"source\": \"survey\"}".to_string()),
                    ..LocationFields::default()
                },
                ..NewRawAsset::default()
            },
            "import",
        )
        .await
        .unwrap();
}

fn config(dir: &TempDir, geocodio_url: String) -> AppConfig {
    let mut config = AppConfig {
        storage: StorageConfig {
            data_dir: dir.path().to_string_lossy().into_owned(),
            snapshot_file: "registry.json".to_string(),
        },
        ..AppConfig::default()
    };
    config.geocoder.base_url = geocodio_url;
    config.geocoder.api_key = Some("test-key".to_string());
    config
}

#[tokio::test]
async fn split_persists_through_snapshot() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let geocode_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/geocode")
            .query_param("q", "200 Penn Avenue, Pittsburgh, PA 15222")
            .query_param("api_key", "test-key");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({
                "results": [{
                    "location": {"lat": 40.4432, "lng": -79.9987},
                    "accuracy": 1,
                    "accuracy_type": "rooftop"
                }]
            }));
    });

    let config = config(&dir, server.base_url());
    let store = SnapshotStore::from_config(&config.storage);
    {
        let registry = InMemoryRegistry::new();
        seed(&registry).await;
        store.save_registry(&registry).await.unwrap();
    }

    let registry = store.load_registry().await.unwrap();
    let geocoder = GeocodioClient::new(&config.geocoder).unwrap();
    let splitter = LocationSplitter::new(&registry, &geocoder, SplitOptions::from(&config.repair));
    let report = splitter.split_location(1, false).await.unwrap();
    store.save_registry(&registry).await.unwrap();

    geocode_mock.assert();
    assert_eq!(report.total, 3);
    assert_eq!(report.handled, 2);
    assert_eq!(report.skipped, vec![3]);
    assert_eq!(report.outcomes[0].resolution, Resolution::Matched(2));
    assert_eq!(report.outcomes[0].geocoding, GeocodingOutcome::Succeeded);
    assert_eq!(
        report.outcomes[1].resolution,
        Resolution::CreatedFromCoordinates(Some(3))
    );

    let reloaded = store.load_registry().await.unwrap();
    assert_eq!(reloaded.get_asset(1).await.unwrap().location_id, Some(2));
    assert_eq!(reloaded.get_asset(2).await.unwrap().location_id, Some(3));
    assert_eq!(reloaded.get_asset(3).await.unwrap().location_id, Some(1));

    let penn = reloaded.get_location(2).await.unwrap();
    assert_eq!(penn.fields.latitude, Some(40.4432));
    assert_eq!(penn.fields.longitude, Some(-79.9987));
    assert!(penn
        .fields
        .geocoding_properties
        .unwrap()
        .contains("geocodio"));

    let created = reloaded.get_location(3).await.unwrap();
    assert_eq!(created.fields.latitude, Some(40.4433));

    let history = reloaded.history("Asset", 1).await.unwrap();
    assert_eq!(
        history.last().unwrap().reason,
        "Regenerating locations (bad initial Location assignment)"
    );
}

#[tokio::test]
async fn dry_run_leaves_snapshot_unchanged() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/geocode");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({"results": []}));
    });

    let config = config(&dir, server.base_url());
    let store = SnapshotStore::from_config(&config.storage);
    let registry = InMemoryRegistry::new();
    seed(&registry).await;
    store.save_registry(&registry).await.unwrap();
    let before = store.load().await.unwrap();

    let geocoder = GeocodioClient::new(&config.geocoder).unwrap();
    let report = LocationSplitter::new(&registry, &geocoder, SplitOptions::from(&config.repair))
        .split_location(1, true)
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.outcomes[0].geocoding, GeocodingOutcome::Failed);
    assert_eq!(
        report.outcomes[1].resolution,
        Resolution::CreatedFromCoordinates(None)
    );
    assert_eq!(registry.snapshot().await.unwrap(), before);
}

#[tokio::test]
async fn geocoder_outage_is_an_error() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/geocode");
        then.status(500).body("upstream unavailable");
    });

    let config = config(&dir, server.base_url());
    let registry = InMemoryRegistry::new();
    seed(&registry).await;

    let geocoder = GeocodioClient::new(&config.geocoder).unwrap();
    let err = LocationSplitter::new(&registry, &geocoder, SplitOptions::default())
        .split_location(1, false)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn failed_split_still_saves_earlier_assets() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir, "http://127.0.0.1:9".to_string());
    let store = SnapshotStore::from_config(&config.storage);

    let registry = InMemoryRegistry::new();
    seed(&registry).await;
    // Location 2 is already geocoded, so asset 1 needs no network call.
    // Asset 2 gets a second raw asset and fails after asset 1 is moved.
    registry
        .insert_raw_asset(
            NewRawAsset {
                name: "Mobile Clinic (second source)".to_string(),
                asset_id: Some(2),
                location: address("3 Forbes Avenue", "15213"),
                ..NewRawAsset::default()
            },
            "import",
        )
        .await
        .unwrap();
    let mut penn = registry.get_location(2).await.unwrap();
    penn.fields.latitude = Some(40.4432);
    penn.fields.longitude = Some(-79.9987);
    penn.fields.geocoding_properties = Some("{\"accuracy\": 1}".to_string());
    registry.update_location(&penn, "import").await.unwrap();
    store.save_registry(&registry).await.unwrap();

    let registry = store.load_registry().await.unwrap();
    let geocoder = GeocodioClient::new(&config.geocoder).unwrap();
    let result = LocationSplitter::new(&registry, &geocoder, SplitOptions::from(&config.repair))
        .split_location(1, false)
        .await;
    store.save_registry(&registry).await.unwrap();

    assert!(result.is_err());
    let reloaded = store.load_registry().await.unwrap();
    assert_eq!(reloaded.get_asset(1).await.unwrap().location_id, Some(2));
    assert_eq!(reloaded.get_asset(2).await.unwrap().location_id, Some(1));
}
