//! # TFS Tools Library
//!
//! Script-friendly access to an on-premises Team Foundation Server:
//!
//! - Stateless REST wrappers for builds, TFVC, work items, teams and tests
//! - A poll-until-complete waiter for queued builds
//! - Layered configuration (CLI, environment, config file, defaults)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tfs_tools::TfsClient;
//! use tfs_tools::wait::{WaitOptions, wait_for_build};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = TfsClient::new(
//!     "https://tfs.example.com/tfs/DefaultCollection".to_string(),
//!     "Fabrikam".to_string(),
//!     "my-pat".to_string(),
//! )?;
//!
//! let summary = wait_for_build(&client, "4711", WaitOptions::default(), |event| {
//!     println!("{}", event);
//! })
//! .await;
//! std::process::exit(summary.outcome.exit_code().into());
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod output;
pub mod parsed_property;
pub mod wait;

pub use api::{BasicCredential, ConnectionSettings, StatusSource, TfsClient};
pub use config::{Config, ResolvedConfig};
pub use error::{ApiError, ConfigError, TfsError};
pub use wait::{PollOutcome, WaitOptions, WaitSummary};

/// Core result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
