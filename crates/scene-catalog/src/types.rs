//! Wire types for the STAC catalog endpoints.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// POST body for a catalog search: at most `limit` scenes of the named
/// collections captured on `datetime`, intersecting the given geometry.
#[derive(Debug, Clone, Serialize)]
pub struct SearchBody {
    pub limit: u32,
    pub collections: Vec<String>,
    /// Day-start instant, "YYYY-MM-DDT00:00:00Z".
    pub datetime: String,
    pub intersects: Intersects,
}

impl SearchBody {
    /// Build a single-result search for one calendar day.
    pub fn for_day(collection: &str, day: NaiveDate, corners: [[f64; 2]; 2]) -> Self {
        Self {
            limit: 1,
            collections: vec![collection.to_string()],
            datetime: format!("{}T00:00:00Z", day.format("%Y-%m-%d")),
            intersects: Intersects::multi_point(corners),
        }
    }
}

/// GeoJSON geometry carrying the bbox corner points.
#[derive(Debug, Clone, Serialize)]
pub struct Intersects {
    #[serde(rename = "type")]
    pub geometry_type: String,
    pub coordinates: [[f64; 2]; 2],
}

impl Intersects {
    fn multi_point(coordinates: [[f64; 2]; 2]) -> Self {
        Self {
            geometry_type: "MultiPoint".to_string(),
            coordinates,
        }
    }
}

/// Search response: a GeoJSON feature collection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// One catalog feature returned by a search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Feature {
    /// The feature's self-referencing item URL, if present.
    pub fn self_link(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.rel == "self")
            .map(|link| link.href.as_str())
    }
}

/// A hyperlink attached to a feature.
#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

/// A full catalog item document fetched from a feature's self link.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogItem {
    #[serde(default)]
    pub properties: ItemProperties,
    #[serde(default)]
    pub assets: HashMap<String, AssetRef>,
    /// West, south, east, north in degrees.
    #[serde(default)]
    pub bbox: Vec<f64>,
}

impl CatalogItem {
    /// Cloud cover as a 0-100 percentage rounded to two decimals, if the
    /// catalog reported the fraction.
    pub fn cloud_cover_pct(&self) -> Option<f64> {
        self.properties
            .eo_cloud_cover
            .map(|fraction| (fraction * 10_000.0).round() / 100.0)
    }

    /// Item bbox as two corner points, lower-left then upper-right, each in
    /// longitude/latitude order.
    pub fn corner_bbox(&self) -> Option<[[f64; 2]; 2]> {
        if self.bbox.len() < 4 {
            return None;
        }
        Some([
            [self.bbox[0], self.bbox[1]],
            [self.bbox[2], self.bbox[3]],
        ])
    }

    /// Href of a named asset.
    pub fn asset_href(&self, name: &str) -> Option<&str> {
        self.assets.get(name).map(|asset| asset.href.as_str())
    }
}

/// Item properties; only the cloud-cover figure is consumed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemProperties {
    #[serde(rename = "eo:cloud_cover")]
    pub eo_cloud_cover: Option<f64>,
}

/// An asset reference inside a catalog item.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetRef {
    pub href: String,
}

/// A located scene: the catalog item URL plus the calendar day whose search
/// produced it. Consumed once per run, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneReference {
    pub item_url: String,
    pub day: NaiveDate,
}
