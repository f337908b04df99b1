//! Release manifest handling.
//!
//! The manifest is a JSON document listing every published server version, newest
//! first. This crate decodes it, picks the version to run for a channel, and fetches
//! version artifacts over HTTP.

mod error;
mod feed;
mod http;
mod types;

pub use error::{FetchError, FetchResult};
pub use feed::ReleaseFeed;
pub use http::HttpFeed;
pub use types::{Channel, Latest, Manifest, Version, VersionType};
