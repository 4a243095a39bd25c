// Adapters layer: concrete implementations of the domain ports (storage, registry, http services)
pub mod carto;
pub mod geocodio;
pub mod memory;
pub mod snapshot;
pub mod storage;
