//! Finds accounts in a credential export whose password hash appears in the
//! Have I Been Pwned Pwned Passwords corpus.
//!
//! Full hashes never leave the machine. Hashes are grouped by their first 5
//! hex characters and only those prefixes are sent to the range API; every
//! returned suffix is compared locally against the [`HashIndex`].
//!
//! # Pipeline
//!
//! 1. [`loader`] parses `account:hash` lines.
//! 2. [`HashIndex`] drops machine accounts (`NAME$`) and unusable hashes,
//!    groups accounts by uppercase hash and collects distinct prefixes.
//! 3. [`pool::run`] queries each prefix once across a bounded set of tokio
//!    tasks.
//! 4. [`MatchingEngine`] matches each response and marks accounts exposed
//!    exactly once, even when several workers find the same hash.
//! 5. [`ResultSink`] streams newly exposed accounts as they are found, so an
//!    interrupted run keeps its partial results.
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use hibp_checker::{CheckOptions, Checker, ResultSink};
//! use hibp_range_client::HttpRangeClient;
//!
//! # async fn run() -> Result<(), hibp_checker::Error> {
//! let client = HttpRangeClient::builder().build()?;
//! let sink = Arc::new(ResultSink::create(Path::new("exposed.txt"))?);
//!
//! let report = Checker::new(client)
//!     .check_file(Path::new("ntds.txt"), &CheckOptions::default(), sink)
//!     .await?;
//! println!("Total exposed accounts: {}", report.exposed);
//! # Ok(())
//! # }
//! ```

pub mod checker;
pub mod engine;
pub mod error;
pub mod index;
pub mod loader;
pub mod pool;
pub mod progress;
pub mod sink;

pub use checker::{CheckOptions, CheckReport, Checker};
pub use engine::MatchingEngine;
pub use error::Error;
pub use index::{HashIndex, MACHINE_ACCOUNT_MARKER, SkipCounts, is_machine_account};
pub use loader::{LoadOptions, Record, load_file, parse_records};
pub use pool::{DEFAULT_WORKERS, PoolSummary};
pub use progress::{ConsoleProgress, Progress, ProgressUpdate, Silent};
pub use sink::ResultSink;
