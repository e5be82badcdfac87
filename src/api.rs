//! Synchronous client for the **Urban Institute Education Data Portal API**.
//!
//! The façade ties the pieces together: a validated [`EndpointDescriptor`] is
//! turned into a URL, the first page is fetched through the retrying
//! [`Transport`], and the remaining pages are walked by the paginator. The
//! result is one combined [`Table`].
//!
//! ### Notes
//! - Each `Client` owns its own connection pool. Drop it (or call
//!   [`Client::close`]) to release it, or use [`with_client`] for scoped use.
//! - A single `year` filter becomes a path segment; several years stay in the
//!   query string, which the live API may reject.
//! - The CSV path ([`Client::fetch_csv`]) downloads the whole file and filters
//!   locally; it does not go through the paginator.
//!
//! Typical usage:
//! ```no_run
//! # use edudata_rs::{Client, ClientConfig, EndpointDescriptor};
//! let client = Client::new(ClientConfig::default())?;
//! let d = EndpointDescriptor::builder("schools", "ccd", "enrollment")
//!     .subtopic(["grade-9"])
//!     .filter("year", 2020)
//!     .filter("fips", 6)
//!     .build()?;
//! let table = client.fetch(&d)?;
//! println!("{} rows, columns {:?}", table.len(), table.columns());
//! # Ok::<(), edudata_rs::Error>(())
//! ```
use crate::error::{Error, Result};
use crate::filter::apply_filters;
use crate::labels::LabelMapper;
use crate::models::{EndpointDescriptor, EndpointInfo, SummaryDescriptor};
use crate::pagination::{CancelToken, paginate_from};
use crate::storage::read_csv;
use crate::table::Table;
use crate::transport::{ClientConfig, HttpBackend, ReqwestBackend, Transport};
use crate::url::{build_csv_url, build_endpoint_url, build_summary_url};
use crate::validation::{EndpointValidator, ValidationOutcome};
use serde_json::Value;

/// Metadata listings published next to the data endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKind {
    Endpoints,
    Variables,
    EndpointVarlist,
    Downloads,
    Changes,
}

impl MetadataKind {
    pub fn path(&self) -> &'static str {
        match self {
            MetadataKind::Endpoints => "api-endpoints",
            MetadataKind::Variables => "api-variables",
            MetadataKind::EndpointVarlist => "api-endpoint-varlist",
            MetadataKind::Downloads => "api-downloads",
            MetadataKind::Changes => "api-changes",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Client<B = ReqwestBackend> {
    transport: Transport<B>,
}

impl Client<ReqwestBackend> {
    /// Create a client with its own `reqwest` connection pool.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self {
            transport: Transport::new(config)?,
        })
    }
}

impl<B: HttpBackend> Client<B> {
    /// Create a client on top of any [`HttpBackend`].
    pub fn with_backend(backend: B, config: ClientConfig) -> Self {
        Self {
            transport: Transport::with_backend(backend, config),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        self.transport.config()
    }

    pub fn transport(&self) -> &Transport<B> {
        &self.transport
    }

    /// Fetch every record of a data endpoint.
    ///
    /// ### Errors
    /// - `EndpointNotFound` when the first page returns 404
    /// - connection errors (`Server`, `HttpStatus`, `RetriesExhausted`) for the first page
    /// - `Pagination` when a later page fails, with the page number and
    ///   how many records had already been retrieved
    /// - `DataProcessing` for malformed responses
    pub fn fetch(&self, d: &EndpointDescriptor) -> Result<Table> {
        self.fetch_cancellable(d, &CancelToken::new())
    }

    /// Like [`Client::fetch`], stopping before the next page once `cancel` is set.
    ///
    /// A token already set before the first request gives a bare
    /// `Error::Cancelled`; later pages report it inside `Error::Pagination`.
    pub fn fetch_cancellable(
        &self,
        d: &EndpointDescriptor,
        cancel: &CancelToken,
    ) -> Result<Table> {
        let url = build_endpoint_url(&self.config().base_url, d);
        self.fetch_url(&url, cancel)
    }

    /// Fetch a server-side summary (`.../summaries/?stat=..&var=..&by=..`).
    pub fn fetch_summary(&self, s: &SummaryDescriptor) -> Result<Table> {
        let url = build_summary_url(&self.config().base_url, s);
        self.fetch_url(&url, &CancelToken::new())
    }

    fn fetch_url(&self, url: &str, cancel: &CancelToken) -> Result<Table> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled {
                stage: format!("fetching {}", url),
            });
        }
        let first = self.transport.get_page(url)?;
        paginate_from(url, first, |next| self.transport.get_page(next), cancel)
    }

    /// Download the endpoint's full CSV file and apply the descriptor's
    /// filters locally.
    pub fn fetch_csv(&self, d: &EndpointDescriptor) -> Result<Table> {
        let url = build_csv_url(
            &self.config().csv_base_url,
            d.level(),
            d.source(),
            d.topic(),
            d.subtopic(),
        );
        log::info!("Downloading CSV file: {}", url);
        let body = self.transport.get_text(&url, &[])?;
        let table = read_csv(body.as_bytes())?;
        log::info!("Downloaded {} records", table.len());

        if d.filters().is_empty() {
            return Ok(table);
        }
        let filtered = apply_filters(&table, d.filters());
        log::info!("After filtering: {} records", filtered.len());
        Ok(filtered)
    }

    /// Fetch a metadata listing as a table.
    pub fn metadata(&self, kind: MetadataKind) -> Result<Table> {
        let url = format!(
            "{}/{}/",
            self.config().base_url.trim_end_matches('/'),
            kind.path()
        );
        self.fetch_url(&url, &CancelToken::new())
    }

    /// The `api-endpoints` listing, parsed. Rows that do not have the
    /// expected shape are skipped with a warning.
    pub fn endpoint_metadata(&self) -> Result<Vec<EndpointInfo>> {
        let rows = self.metadata(MetadataKind::Endpoints)?.into_rows();
        let mut endpoints = Vec::with_capacity(rows.len());
        for (i, row) in rows.into_iter().enumerate() {
            match serde_json::from_value::<EndpointInfo>(Value::Object(row)) {
                Ok(info) => endpoints.push(info),
                Err(e) => log::warn!("skipping endpoint metadata row {}: {}", i, e),
            }
        }
        Ok(endpoints)
    }

    /// Best-effort pre-flight check against the endpoint metadata. Metadata
    /// failures become warnings; they never fail the request.
    pub fn validate(&self, d: &EndpointDescriptor) -> ValidationOutcome {
        match self.endpoint_metadata() {
            Ok(endpoints) => EndpointValidator::new(endpoints).validate(d),
            Err(e) => {
                let mut outcome = EndpointValidator::without_metadata().validate(d);
                outcome
                    .warnings
                    .push(format!("endpoint metadata lookup failed: {}", e));
                outcome
            }
        }
    }

    /// Label mapper built from the `api-variables` listing.
    pub fn label_mapper(&self) -> Result<LabelMapper> {
        let vars: Vec<Value> = self
            .metadata(MetadataKind::Variables)?
            .into_rows()
            .into_iter()
            .map(Value::Object)
            .collect();
        Ok(LabelMapper::from_metadata(&vars))
    }

    /// Release the connection pool.
    pub fn close(self) {
        log::debug!("closing client for {}", self.config().base_url);
    }
}

/// Run `f` with a freshly created client and release it afterwards, whether
/// `f` succeeds or not.
pub fn with_client<T, F>(config: ClientConfig, f: F) -> Result<T>
where
    F: FnOnce(&Client) -> Result<T>,
{
    let client = Client::new(config)?;
    let out = f(&client);
    client.close();
    out
}
