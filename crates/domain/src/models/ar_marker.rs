//! Stored AR markers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Row of `ar_markers`: one marker per entity id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArMarkerRecord {
    pub id: i64,
    pub entity_id: i64,
    /// 64 lowercase hex characters.
    pub pattern: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateArMarkerRequest {
    #[validate(range(min = 0, message = "Entity id must not be negative"))]
    pub entity_id: i64,
}

/// Query string of the marker image endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MarkerImageQuery {
    pub size: Option<u32>,
}

impl MarkerImageQuery {
    pub const DEFAULT_SIZE: u32 = 400;

    pub fn size(&self) -> u32 {
        self.size.unwrap_or(Self::DEFAULT_SIZE)
    }
}
