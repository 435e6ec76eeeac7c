// src/components/mod.rs
pub mod location_map;
pub mod metadata_viewer;
