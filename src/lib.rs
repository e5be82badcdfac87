//! edudata_rs
//!
//! A Rust client library for the Urban Institute **Education Data Portal**
//! API. Pairs with the `edudata` CLI.
//!
//! ### Features
//! - Build endpoint URLs from level/source/topic/subtopic/filters, with the
//!   `year` filter placed in the path when the API expects it there
//! - Retrying transport (503, timeouts, network errors) with exponential backoff
//! - Automatic pagination into a single combined table
//! - Server-side summaries, CSV bulk download with local filtering, metadata
//!   pre-flight checks and label mapping
//! - Save results as CSV or JSON
//!
//! ### Example
//! ```no_run
//! use edudata_rs::{Client, ClientConfig, EndpointDescriptor};
//!
//! let client = Client::new(ClientConfig::default())?;
//! let d = EndpointDescriptor::builder("schools", "ccd", "enrollment")
//!     .subtopic(["grade-9"])
//!     .filter("year", 2020)
//!     .build()?;
//! let table = client.fetch(&d)?;
//! edudata_rs::storage::save_csv(&table, "enrollment_2020.csv")?;
//! # Ok::<(), edudata_rs::Error>(())
//! ```

pub mod api;
pub mod constants;
pub mod error;
pub mod filter;
pub mod labels;
pub mod models;
pub mod pagination;
pub mod storage;
pub mod table;
pub mod transport;
pub mod url;
pub mod validation;

pub use api::{Client, MetadataKind, with_client};
pub use error::{Error, ErrorKind, Result};
pub use models::{EndpointDescriptor, FilterValue, Filters, Level, Scalar, Stat, SummaryDescriptor};
pub use pagination::CancelToken;
pub use table::Table;
pub use transport::ClientConfig;
