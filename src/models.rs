use crate::error::{Error, Result};
use crate::validation;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// One record as returned by the API: column name -> value.
pub type Record = Map<String, Value>;

/// Query filters in caller order.
pub type Filters = IndexMap<String, FilterValue>;

/// API data level (first path segment after the base URL).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Level {
    Schools,
    SchoolDistricts,
    CollegeUniversity,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Schools => "schools",
            Level::SchoolDistricts => "school-districts",
            Level::CollegeUniversity => "college-university",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "schools" => Ok(Level::Schools),
            "school-districts" => Ok(Level::SchoolDistricts),
            "college-university" => Ok(Level::CollegeUniversity),
            other => Err(Error::validation(format!(
                "invalid level '{}'. Must be one of: {}",
                other,
                crate::constants::VALID_LEVELS.join(", ")
            ))),
        }
    }
}

/// A single filter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    fn as_f64(&self) -> Option<f64> {
        match *self {
            Scalar::Int(i) => Some(i as f64),
            Scalar::Float(f) => Some(f),
            _ => None,
        }
    }

    /// Whether a record cell holds this value. Numbers compare numerically,
    /// everything else by its text form. Nulls never match.
    pub fn matches(&self, cell: &Value) -> bool {
        match cell {
            Value::Null => false,
            Value::Number(n) => match (self.as_f64(), n.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => self.to_string() == n.to_string(),
            },
            Value::String(s) => *s == self.to_string(),
            Value::Bool(b) => matches!(self, Scalar::Bool(x) if x == b),
            other => self.to_string() == other.to_string(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v.into())
    }
}

impl From<u32> for Scalar {
    fn from(v: u32) -> Self {
        Scalar::Int(v.into())
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

/// A filter entry: absent (`Null`), a single value, or a list of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Null,
    One(Scalar),
    Many(Vec<Scalar>),
}

impl FilterValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FilterValue::Null)
    }

    /// The value when it is a scalar or a one-element list.
    pub fn single(&self) -> Option<&Scalar> {
        match self {
            FilterValue::One(s) => Some(s),
            FilterValue::Many(v) if v.len() == 1 => v.first(),
            _ => None,
        }
    }

    /// All values in order; empty for `Null`.
    pub fn values(&self) -> &[Scalar] {
        match self {
            FilterValue::Null => &[],
            FilterValue::One(s) => std::slice::from_ref(s),
            FilterValue::Many(v) => v,
        }
    }

    pub fn matches(&self, cell: &Value) -> bool {
        self.values().iter().any(|s| s.matches(cell))
    }
}

macro_rules! filter_value_from_scalar {
    ($($t:ty),*) => {
        $(
            impl From<$t> for FilterValue {
                fn from(v: $t) -> Self {
                    FilterValue::One(v.into())
                }
            }
        )*
    };
}

filter_value_from_scalar!(i64, i32, u32, f64, bool, &str, String, Scalar);

impl<T: Into<Scalar>> From<Vec<T>> for FilterValue {
    fn from(v: Vec<T>) -> Self {
        FilterValue::Many(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Scalar>, const N: usize> From<[T; N]> for FilterValue {
    fn from(v: [T; N]) -> Self {
        FilterValue::Many(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Scalar>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FilterValue::Null, |x| FilterValue::One(x.into()))
    }
}

/// A validated, case-folded request for a data endpoint.
///
/// Build one with [`EndpointDescriptor::builder`]; invalid input is rejected
/// by [`EndpointBuilder::build`] before anything touches the network.
///
/// ```
/// # use edudata_rs::EndpointDescriptor;
/// let d = EndpointDescriptor::builder("Schools", "CCD", "Enrollment")
///     .subtopic(["grade-9"])
///     .filter("Year", 2020)
///     .filter("fips", [6, 8])
///     .build()?;
/// assert_eq!(d.source(), "ccd");
/// assert!(d.filters().contains_key("year"));
/// # Ok::<(), edudata_rs::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointDescriptor {
    level: Level,
    source: String,
    topic: String,
    subtopic: Vec<String>,
    filters: Filters,
}

impl EndpointDescriptor {
    pub fn builder(
        level: impl Into<String>,
        source: impl Into<String>,
        topic: impl Into<String>,
    ) -> EndpointBuilder {
        EndpointBuilder {
            level: level.into(),
            source: source.into(),
            topic: topic.into(),
            subtopic: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn subtopic(&self) -> &[String] {
        &self.subtopic
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }
}

#[derive(Debug, Clone)]
pub struct EndpointBuilder {
    level: String,
    source: String,
    topic: String,
    subtopic: Vec<String>,
    filters: Vec<(String, FilterValue)>,
}

impl EndpointBuilder {
    /// Append subtopic path segments (e.g. `["race", "sex"]`).
    pub fn subtopic<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subtopic.extend(items.into_iter().map(Into::into));
        self
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.push((key.into(), value.into()));
        self
    }

    pub fn filters<I, K>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = (K, FilterValue)>,
        K: Into<String>,
    {
        self.filters
            .extend(items.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    pub fn build(self) -> Result<EndpointDescriptor> {
        let level = validation::validate_level(&self.level)?;
        let source = validation::validate_source(&self.source)?;
        let topic = validation::validate_segment("topic", &self.topic, 2)?;
        let subtopic = self
            .subtopic
            .iter()
            .map(|s| validation::validate_segment("subtopic", s, 1))
            .collect::<Result<Vec<_>>>()?;

        let mut filters = Filters::with_capacity(self.filters.len());
        for (key, value) in self.filters {
            let folded = key.trim().to_lowercase();
            if folded.is_empty() {
                return Err(Error::validation("filter names must not be empty"));
            }
            for v in value.values() {
                match folded.as_str() {
                    "year" => {
                        validation::validate_year(v)?;
                    }
                    "fips" => {
                        validation::fips_code(v)?;
                    }
                    _ => {}
                }
            }
            if filters.contains_key(&folded) {
                return Err(Error::validation(format!(
                    "filter '{}' given more than once",
                    folded
                )));
            }
            filters.insert(folded, value);
        }

        Ok(EndpointDescriptor {
            level,
            source,
            topic,
            subtopic,
            filters,
        })
    }
}

/// Statistic computed by a summary endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stat {
    Sum,
    Avg,
    Median,
    Max,
    Min,
    Count,
    Stddev,
    Variance,
}

impl Stat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stat::Sum => "sum",
            Stat::Avg => "avg",
            Stat::Median => "median",
            Stat::Max => "max",
            Stat::Min => "min",
            Stat::Count => "count",
            Stat::Stddev => "stddev",
            Stat::Variance => "variance",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stat {
    type Err = Error;

    /// `mean` is accepted as an alias for `avg`.
    fn from_str(s: &str) -> Result<Self> {
        match validation::validate_statistic(s)?.as_str() {
            "sum" => Ok(Stat::Sum),
            "avg" => Ok(Stat::Avg),
            "median" => Ok(Stat::Median),
            "max" => Ok(Stat::Max),
            "min" => Ok(Stat::Min),
            "count" => Ok(Stat::Count),
            "stddev" => Ok(Stat::Stddev),
            _ => Ok(Stat::Variance),
        }
    }
}

/// A validated request for a server-side summary (`.../summaries/`).
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryDescriptor {
    endpoint: EndpointDescriptor,
    stat: Stat,
    var: String,
    by: Vec<String>,
}

impl SummaryDescriptor {
    pub fn builder(
        level: impl Into<String>,
        source: impl Into<String>,
        topic: impl Into<String>,
        stat: impl Into<String>,
        var: impl Into<String>,
    ) -> SummaryBuilder {
        SummaryBuilder {
            endpoint: EndpointDescriptor::builder(level, source, topic),
            stat: stat.into(),
            var: var.into(),
            by: Vec::new(),
        }
    }

    pub fn endpoint(&self) -> &EndpointDescriptor {
        &self.endpoint
    }

    pub fn stat(&self) -> Stat {
        self.stat
    }

    pub fn var(&self) -> &str {
        &self.var
    }

    pub fn by(&self) -> &[String] {
        &self.by
    }
}

#[derive(Debug, Clone)]
pub struct SummaryBuilder {
    endpoint: EndpointBuilder,
    stat: String,
    var: String,
    by: Vec<String>,
}

impl SummaryBuilder {
    pub fn subtopic<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoint = self.endpoint.subtopic(items);
        self
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.endpoint = self.endpoint.filter(key, value);
        self
    }

    /// Grouping variables, joined with commas in the query string.
    pub fn by<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.by.extend(items.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<SummaryDescriptor> {
        let endpoint = self.endpoint.build()?;
        let stat: Stat = self.stat.parse()?;
        let var = self.var.trim().to_lowercase();
        if var.is_empty() {
            return Err(Error::validation("summary variable must not be empty"));
        }
        let by = self
            .by
            .iter()
            .map(|b| b.trim().to_lowercase())
            .collect::<Vec<_>>();
        if by.iter().any(|b| b.is_empty()) {
            return Err(Error::validation("grouping variables must not be empty"));
        }
        Ok(SummaryDescriptor {
            endpoint,
            stat,
            var,
            by,
        })
    }
}

/// One page of a list response.
///
/// Unknown top-level fields are kept in `extra` and otherwise ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageResponse {
    pub results: Vec<Record>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PageResponse {
    /// The cursor for the following page, ignoring blank strings.
    pub fn next_url(&self) -> Option<&str> {
        self.next.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Endpoint entry from the `api-endpoints` metadata listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointInfo {
    #[serde(default)]
    pub endpoint_id: Option<i64>,
    pub level: String,
    pub source: String,
    pub topic: String,
    #[serde(default, deserialize_with = "lenient")]
    pub subtopic: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub years_available: Option<Vec<i64>>,
    #[serde(default, deserialize_with = "lenient")]
    pub optional_vars: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub required_vars: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub main_filters: Option<Vec<String>>,
    #[serde(default)]
    pub csv_available: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// Optional listing fields vary in shape between endpoints; anything that is
// not the expected list becomes `None`.
fn lenient<'de, D, T>(d: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = Value::deserialize(d)?;
    Ok(serde_json::from_value(v).ok())
}

impl EndpointInfo {
    pub fn is_for(&self, d: &EndpointDescriptor) -> bool {
        self.level == d.level().as_str() && self.source == d.source() && self.topic == d.topic()
    }

    /// Every filter name this endpoint advertises.
    pub fn known_filters(&self) -> Vec<&str> {
        self.optional_vars
            .iter()
            .chain(self.required_vars.iter())
            .chain(self.main_filters.iter())
            .flatten()
            .map(String::as_str)
            .collect()
    }
}
