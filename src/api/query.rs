//! Query parameter types shared by the handlers.

use serde::Deserialize;

use crate::domain::model::PageRequest;

/// `?limit=&offset=`, clamped by [`PageRequest::new`].
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl PaginationParams {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.limit, self.offset)
    }
}

/// `?fmt=geojson` (or `geo`) switches asset responses to GeoJSON.
#[derive(Debug, Default, Deserialize)]
pub struct FormatParams {
    pub fmt: Option<String>,
}

impl FormatParams {
    pub fn wants_geojson(&self) -> bool {
        matches!(self.fmt.as_deref(), Some("geojson" | "geo"))
    }
}

/// Query string of `GET /api/v1/assets`.
#[derive(Debug, Default, Deserialize)]
pub struct AssetListParams {
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub fmt: Option<String>,
}

impl AssetListParams {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.limit, self.offset)
    }

    pub fn wants_geojson(&self) -> bool {
        FormatParams {
            fmt: self.fmt.clone(),
        }
        .wants_geojson()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SplitParams {
    #[serde(default)]
    pub dry_run: bool,
}
