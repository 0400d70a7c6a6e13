//! Maintenance tooling for the video-hosting database.
//!
//! - [`purge::VideoPurgeJob`] deletes every video and the rows referencing
//!   it, children first, then resets the cached channel counters.
//! - [`report::CountReport`] summarises videos per channel.
//! - [`api::app`] serves the stats endpoint.
//!
//! All three go through the [`store::VideoStore`] trait, so a store handle
//! is built once per process and passed in explicitly.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod db;
pub mod logging;
pub mod purge;
pub mod report;
pub mod store;

use crate::store::VideoStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn VideoStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn VideoStore>) -> Self {
        Self { store }
    }
}
