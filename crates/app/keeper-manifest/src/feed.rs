use std::path::Path;

use async_trait::async_trait;

use crate::{FetchResult, Manifest};

/// Source of the version manifest and of version artifacts.
#[async_trait]
pub trait ReleaseFeed: Send + Sync {
    async fn manifest(&self) -> FetchResult<Manifest>;

    /// Fetch the artifact for `version_id` into `dest`.
    ///
    /// Implementations must only make `dest` appear once the artifact is complete.
    /// Returns the number of bytes written.
    async fn download(&self, version_id: &str, dest: &Path) -> FetchResult<u64>;
}
