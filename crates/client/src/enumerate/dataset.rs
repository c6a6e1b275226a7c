//! Zone and marker datasets published by the map.

use std::collections::HashSet;

use mapmirror_core::Error;
use serde::Deserialize;

/// Marker type whose zone is drawn with an island image instead of an icon.
pub const ISLAND_TYPE: &str = "island";

/// A point of interest on the world map or inside a zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    /// Zone this marker leads to, if any.
    #[serde(default)]
    pub zone: Option<String>,

    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    /// Popup media (image or video) path.
    #[serde(default)]
    pub media: Option<String>,

    /// Rapport icon name.
    #[serde(default)]
    pub rapport: Option<String>,
}

impl Marker {
    pub fn is_island(&self) -> bool {
        self.kind.as_deref() == Some(ISLAND_TYPE)
    }
}

/// The world/overview document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldDataset {
    #[serde(default)]
    pub markers: Vec<Marker>,
}

impl WorldDataset {
    pub fn parse(path: &str, bytes: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(bytes).map_err(|e| Error::Dataset { path: path.to_string(), reason: e.to_string() })
    }

    /// Markers leading to a zone, one per zone id, in document order.
    ///
    /// Ids that cannot be used as a path segment are dropped.
    pub fn zone_markers(&self) -> Vec<&Marker> {
        let mut seen = HashSet::new();
        self.markers
            .iter()
            .filter(|m| match m.zone.as_deref() {
                Some(id) if is_path_segment(id) => seen.insert(id),
                Some(id) => {
                    tracing::warn!(zone = id, "ignoring zone with unusable id");
                    false
                }
                None => false,
            })
            .collect()
    }

    pub fn zone_ids(&self) -> Vec<String> {
        self.zone_markers()
            .into_iter()
            .filter_map(|m| m.zone.clone())
            .collect()
    }
}

/// A zone document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneDataset {
    #[serde(default)]
    pub markers: Vec<Marker>,

    /// Number of zoom levels of the zone's tile pyramid.
    #[serde(default)]
    pub max_zoom: Option<u8>,
}

impl ZoneDataset {
    pub fn parse(path: &str, bytes: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(bytes).map_err(|e| Error::Dataset { path: path.to_string(), reason: e.to_string() })
    }
}

/// Whether `id` can be substituted into a path template as one segment.
pub fn is_path_segment(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains(['/', '\\'])
}
