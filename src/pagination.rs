//! Sequential pagination over `next` cursors.
//!
//! The API only exposes a forward cursor, so pages are fetched one after
//! another. A failure part-way through is reported as [`Error::Pagination`];
//! partial data is never returned as if it were complete.

use crate::constants::{CSV_SUGGESTION_THRESHOLD, PAGE_SIZE_LIMIT};
use crate::error::{Error, Result};
use crate::models::PageResponse;
use crate::table::Table;
use num_format::{Locale, ToFormattedString};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag a caller can set to stop a pagination walk before its next
/// page fetch. Requests already in flight run until their timeout.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Walk `next` links starting at `initial` and combine every page's records.
pub fn paginate<F>(initial: PageResponse, fetch_next: F) -> Result<Table>
where
    F: FnMut(&str) -> Result<PageResponse>,
{
    paginate_cancellable(initial, fetch_next, &CancelToken::new())
}

/// Like [`paginate`], checking `cancel` before each page fetch.
pub fn paginate_cancellable<F>(
    initial: PageResponse,
    fetch_next: F,
    cancel: &CancelToken,
) -> Result<Table>
where
    F: FnMut(&str) -> Result<PageResponse>,
{
    walk(None, initial, fetch_next, cancel)
}

/// Like [`paginate_cancellable`] for a walk whose first page was fetched from
/// `first_url`; a `next` link pointing back at it counts as a cycle.
pub fn paginate_from<F>(
    first_url: &str,
    initial: PageResponse,
    fetch_next: F,
    cancel: &CancelToken,
) -> Result<Table>
where
    F: FnMut(&str) -> Result<PageResponse>,
{
    walk(Some(first_url), initial, fetch_next, cancel)
}

fn walk<F>(
    first_url: Option<&str>,
    initial: PageResponse,
    mut fetch_next: F,
    cancel: &CancelToken,
) -> Result<Table>
where
    F: FnMut(&str) -> Result<PageResponse>,
{
    let mut progress = PaginationProgress::new(initial.count);
    progress.start();

    let mut table = Table::new();
    let mut next = initial.next_url().map(str::to_string);
    progress.update(initial.results.len());
    table.extend(initial.results);

    let mut seen: HashSet<String> = first_url.map(str::to_string).into_iter().collect();
    let mut page = 1usize;

    while let Some(url) = next.take() {
        page += 1;
        let fail = |source: Error, records: usize| Error::Pagination {
            page,
            records,
            source: Box::new(source),
        };

        if cancel.is_cancelled() {
            let err = Error::Cancelled {
                stage: format!("fetching {}", url),
            };
            return Err(fail(err, table.len()));
        }
        if !seen.insert(url.clone()) {
            let err = Error::data("pagination", format!("cursor {} was already visited", url));
            return Err(fail(err, table.len()));
        }

        let resp = fetch_next(&url).map_err(|e| fail(e, table.len()))?;
        if resp.results.is_empty() && resp.next_url().is_some() && resp.count != Some(0) {
            log::warn!("page {} is empty but reports a further page", page);
        }
        next = resp.next_url().map(str::to_string);
        progress.update(resp.results.len());
        table.extend(resp.results);
    }

    progress.finish();
    Ok(table)
}

/// Number of pages needed for `total_records` at the API page size.
pub fn calculate_total_pages(total_records: u64) -> u64 {
    total_records.div_ceil(PAGE_SIZE_LIMIT)
}

/// Human-readable size estimate, assuming `avg_record_kb` per record.
pub fn estimate_download_size(total_records: u64, avg_record_kb: f64) -> String {
    let kb = total_records as f64 * avg_record_kb;
    if kb < 1024.0 {
        return format!("{:.1} KB", kb);
    }
    let mb = kb / 1024.0;
    if mb < 1024.0 {
        format!("{:.1} MB", mb)
    } else {
        format!("{:.1} GB", mb / 1024.0)
    }
}

/// Whether a CSV bulk download is likely faster than paging through JSON.
pub fn suggest_csv_download(total_records: u64) -> bool {
    total_records > CSV_SUGGESTION_THRESHOLD
}

/// `Page 2/5 (20,000/45,000 records, 44%)`
pub fn format_progress_message(
    current_page: u64,
    total_pages: u64,
    records_so_far: u64,
    total_records: u64,
) -> String {
    let pct = if total_records > 0 {
        records_so_far as f64 / total_records as f64 * 100.0
    } else {
        0.0
    };
    format!(
        "Page {}/{} ({}/{} records, {:.0}%)",
        current_page,
        total_pages,
        records_so_far.to_formatted_string(&Locale::en),
        total_records.to_formatted_string(&Locale::en),
        pct
    )
}

/// Progress reporting through the `log` facade.
#[derive(Debug, Clone)]
pub struct PaginationProgress {
    total_records: Option<u64>,
    total_pages: Option<u64>,
    current_page: u64,
    records_retrieved: u64,
}

impl PaginationProgress {
    pub fn new(total_records: Option<u64>) -> Self {
        Self {
            total_records,
            total_pages: total_records.map(calculate_total_pages),
            current_page: 0,
            records_retrieved: 0,
        }
    }

    pub fn start(&self) {
        let Some(total) = self.total_records.filter(|t| *t > 0) else {
            return;
        };
        let pages = self.total_pages.unwrap_or(1);
        log::info!(
            "Fetching {} records ({} pages)",
            total.to_formatted_string(&Locale::en),
            pages
        );
        if pages > 1 && suggest_csv_download(total) {
            log::info!(
                "For large datasets (~{}), consider the CSV download for faster retrieval",
                estimate_download_size(total, 0.5)
            );
        }
    }

    pub fn update(&mut self, records_in_page: usize) {
        self.current_page += 1;
        self.records_retrieved += records_in_page as u64;
        if let Some(pages) = self.total_pages.filter(|p| *p > 1) {
            log::info!(
                "{}",
                format_progress_message(
                    self.current_page,
                    pages,
                    self.records_retrieved,
                    self.total_records.unwrap_or(self.records_retrieved),
                )
            );
        }
    }

    pub fn finish(&self) {
        log::info!(
            "Retrieved {} records",
            self.records_retrieved.to_formatted_string(&Locale::en)
        );
    }

    pub fn records_retrieved(&self) -> u64 {
        self.records_retrieved
    }

    pub fn current_page(&self) -> u64 {
        self.current_page
    }
}
