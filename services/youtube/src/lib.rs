//! HTTP service for reading and editing YouTube video metadata on behalf of one authorized
//! channel owner.
//!
//! The pieces, bottom up:
//!
//! - [`oauth::AuthorizationContext`] holds the single active OAuth credential and refreshes it
//!   before it expires.
//! - [`youtube_api::YouTubeClient`] talks to the YouTube Data API v3.
//! - [`bulk::BulkUpdater`] applies one update to many videos with bounded concurrency.
//! - [`routes`] exposes all of the above over JSON.

pub mod bulk;
pub mod config;
pub mod error;
pub mod oauth;
pub mod routes;
pub mod youtube_api;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use routes::{AppState, app};
