//! TFS REST API client module.
//!
//! Stateless wrappers over the Team Foundation Server REST API. Each wrapper
//! builds one URL, sends one request with Basic authentication and narrows
//! the decoded JSON to the value a script actually needs.
//!
//! ## Features
//!
//! - Builds: status, result, number, latest build, queueing, artifacts
//! - Build definitions: listing and name lookup
//! - TFVC: changesets, their changes and work items, shelvesets
//! - Work items: fields, title, state and updates
//! - Projects and teams
//! - Test plans, suites and runs
//!
//! ## Example
//!
//! ```rust,no_run
//! use tfs_tools::TfsClient;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = TfsClient::new(
//!     "https://tfs.example.com/tfs/DefaultCollection".to_string(),
//!     "Fabrikam".to_string(),
//!     "my-pat".to_string(),
//! )?;
//!
//! if let Some(id) = client.get_build_definition_id("CI").await? {
//!     let build = client.queue_build(id, None, &[]).await?;
//!     println!("Queued build {}", build.id);
//! }
//! # Ok(())
//! # }
//! ```

mod builds;
mod client;
mod credential;
mod teams;
mod test_plans;
mod tfvc;
pub mod traits;
mod work_items;

pub use client::{ConnectionSettings, DEFAULT_API_VERSION, Scope, TfsClient};
pub use credential::BasicCredential;
pub use traits::StatusSource;
