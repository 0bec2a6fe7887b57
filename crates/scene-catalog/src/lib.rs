//! Scene-catalog access: STAC search, catalog item retrieval, and asset
//! downloads against the HLS archive.

pub mod client;
pub mod finder;
pub mod types;

pub use client::{CatalogConfig, HttpSceneCatalog, SceneCatalog};
pub use finder::{find_scene, SearchPolicy};
pub use types::{CatalogItem, Feature, Link, SceneReference, SearchResponse};
