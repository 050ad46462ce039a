//! Traits for TFS API operations.
//!
//! The build waiter only needs "fetch the current status of resource X".
//! Abstracting that capability lets tests drive the waiter with scripted
//! responses instead of a server.

use async_trait::async_trait;

use super::client::TfsClient;
use crate::error::ApiResult;

/// Something that can report the status of a resource by id.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetches the current status string (e.g. `inProgress`, `completed`).
    async fn fetch_status(&self, id: &str) -> ApiResult<String>;
}

/// Build status via `GET {project}/_apis/build/builds/{id}`.
#[async_trait]
impl StatusSource for TfsClient {
    async fn fetch_status(&self, id: &str) -> ApiResult<String> {
        self.get_build_status(id).await
    }
}
