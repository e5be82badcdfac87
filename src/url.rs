//! URL construction for data, summary and CSV endpoints.
//!
//! Paths follow `{base}/{level}/{source}/{topic}[/{year}][/{subtopic...}]/`.
//! A single `year` filter lives in the path; a list of several years cannot be
//! path-encoded and stays in the query string. The live API may reject that
//! multi-year form, but it is passed through unchanged.

use crate::models::{EndpointDescriptor, FilterValue, Filters, Level, SummaryDescriptor};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

// RFC 3986 unreserved characters pass through unescaped
const QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn enc(s: &str) -> String {
    percent_encoding::utf8_percent_encode(s, QUERY).to_string()
}

/// Path segments and residual query parameters derived from a descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedQuery {
    /// Segments after the base URL, in order.
    pub segments: Vec<String>,
    /// Filters that were not consumed by the path.
    pub query: Filters,
}

impl ResolvedQuery {
    pub fn resolve(d: &EndpointDescriptor) -> Self {
        let mut segments = vec![
            d.level().as_str().to_string(),
            d.source().to_string(),
            d.topic().to_string(),
        ];
        let mut query = Filters::with_capacity(d.filters().len());

        for (key, value) in d.filters() {
            if key == "year" {
                match value {
                    FilterValue::Null => {}
                    v => match v.single() {
                        Some(year) => segments.push(year.to_string()),
                        None => {
                            query.insert(key.clone(), v.clone());
                        }
                    },
                }
            } else {
                query.insert(key.clone(), value.clone());
            }
        }

        // subtopic always follows the year segment
        segments.extend(d.subtopic().iter().cloned());
        Self { segments, query }
    }

    /// The path part of the URL, with a trailing slash.
    pub fn path(&self, base: &str) -> String {
        let mut url = base.trim_end_matches('/').to_string();
        for s in &self.segments {
            url.push('/');
            url.push_str(s);
        }
        url.push('/');
        url
    }

    pub fn to_url(&self, base: &str) -> String {
        with_query(self.path(base), &build_query_string(&self.query))
    }
}

fn with_query(mut url: String, query: &str) -> String {
    if !query.is_empty() {
        url.push('?');
        url.push_str(query);
    }
    url
}

/// Build the URL for a data endpoint.
///
/// ```
/// # use edudata_rs::{EndpointDescriptor, url::build_endpoint_url};
/// let d = EndpointDescriptor::builder("schools", "ccd", "enrollment")
///     .subtopic(["grade-9"])
///     .filter("year", 2020)
///     .filter("fips", 6)
///     .build()?;
/// assert_eq!(
///     build_endpoint_url("https://educationdata.urban.org/api/v1", &d),
///     "https://educationdata.urban.org/api/v1/schools/ccd/enrollment/2020/grade-9/?fips=6"
/// );
/// # Ok::<(), edudata_rs::Error>(())
/// ```
pub fn build_endpoint_url(base: &str, d: &EndpointDescriptor) -> String {
    ResolvedQuery::resolve(d).to_url(base)
}

/// Build the URL for a summary endpoint: the data path plus `summaries/`,
/// with `stat`, `var` and `by` ahead of the remaining filters.
pub fn build_summary_url(base: &str, s: &SummaryDescriptor) -> String {
    let mut resolved = ResolvedQuery::resolve(s.endpoint());
    resolved.segments.push("summaries".into());

    let mut params = Filters::with_capacity(resolved.query.len() + 3);
    params.insert("stat".into(), s.stat().as_str().into());
    params.insert("var".into(), s.var().into());
    if !s.by().is_empty() {
        params.insert("by".into(), s.by().join(",").into());
    }
    for (k, v) in resolved.query.iter() {
        params.entry(k.clone()).or_insert_with(|| v.clone());
    }

    with_query(resolved.path(base), &build_query_string(&params))
}

/// Encode filters as a query string (no leading `?`).
///
/// Lists become repeated `key=value` pairs in order; `Null` entries are
/// dropped entirely.
pub fn build_query_string(params: &Filters) -> String {
    params
        .iter()
        .flat_map(|(k, v)| v.values().iter().map(move |x| (k, x)))
        .map(|(k, x)| format!("{}={}", enc(k), enc(&x.to_string())))
        .collect::<Vec<_>>()
        .join("&")
}

/// URL of the bulk CSV file for an endpoint
/// (`{csv_base}/{level}_{source}_{topic}[_{subtopic}...].csv`).
pub fn build_csv_url(
    csv_base: &str,
    level: Level,
    source: &str,
    topic: &str,
    subtopic: &[String],
) -> String {
    let mut parts = vec![level.as_str(), source, topic];
    parts.extend(subtopic.iter().map(String::as_str));
    format!("{}/{}.csv", csv_base.trim_end_matches('/'), parts.join("_"))
}

/// Components recovered from an endpoint URL or path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointPath {
    pub level: Option<String>,
    pub source: Option<String>,
    pub topic: Option<String>,
    pub subtopic: Vec<String>,
}

/// Split an endpoint URL into level/source/topic/subtopic.
///
/// Accepts full URLs or bare paths such as `/api/v1/schools/ccd/enrollment/race/`.
/// Any query string is ignored.
pub fn parse_endpoint_path(url: &str) -> EndpointPath {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let path = match path.find("://") {
        Some(i) => {
            let rest = &path[i + 3..];
            rest.find('/').map_or("", |j| &rest[j..])
        }
        None => path,
    };

    let mut parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    if parts.first() == Some(&"api") {
        parts.remove(0);
    }
    if parts
        .first()
        .is_some_and(|p| p.starts_with('v') && p[1..].chars().all(|c| c.is_ascii_digit()))
    {
        parts.remove(0);
    }

    let mut it = parts.into_iter().map(str::to_string);
    EndpointPath {
        level: it.next(),
        source: it.next(),
        topic: it.next(),
        subtopic: it.collect(),
    }
}

/// Grade values in the `grade-{x}` form used by subtopic paths.
pub fn normalize_grade(grade: &str) -> String {
    let g = grade.trim().to_lowercase();
    if g.starts_with("grade-") {
        g
    } else {
        format!("grade-{}", g)
    }
}
