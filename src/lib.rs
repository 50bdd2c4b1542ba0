//! Data access and models shared by the screening pipeline.
//!
//! `core::io` reads cached price histories and fundamental snapshots; `models`
//! holds the random forest, grid search and feature scaler.

pub mod core;
pub mod models;
