// src/lib.rs

//! Rank Tracker Library
//!
//! Syncs Search Console keyword rankings into a local time-series store.

#[cfg(feature = "server")]
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
