pub mod address;
pub mod carto;
pub mod matching;
pub mod merge;
pub mod split;

pub use crate::domain::ports::{Geocoder, Registry, Storage};
pub use crate::utils::error::Result;
