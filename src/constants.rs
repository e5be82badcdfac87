//! Fixed values for the Education Data Portal API: URLs, request defaults,
//! the enumerated parameter sets and the FIPS reference table.

use std::time::Duration;

pub const API_BASE_URL: &str = "https://educationdata.urban.org";
pub const API_ENDPOINT: &str = "https://educationdata.urban.org/api/v1";
pub const CSV_DOWNLOAD_URL: &str = "https://educationdata.urban.org/csv";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_UNIT: Duration = Duration::from_secs(1);

/// Maximum number of records the API returns per page.
pub const PAGE_SIZE_LIMIT: u64 = 10_000;

/// Above this many records a CSV bulk download is usually faster.
pub const CSV_SUGGESTION_THRESHOLD: u64 = 100_000;

pub const VALID_LEVELS: &[&str] = &["schools", "school-districts", "college-university"];

pub const SCHOOL_SOURCES: &[&str] = &["ccd", "crdc", "edfacts", "nhgis", "meps"];
pub const DISTRICT_SOURCES: &[&str] = &["ccd", "edfacts", "saipe"];
pub const COLLEGE_SOURCES: &[&str] = &[
    "ipeds",
    "scorecard",
    "fsa",
    "eada",
    "nacubo",
    "nccs",
    "campus-crime",
    "nhgis",
];

pub const VALID_STATISTICS: &[&str] = &[
    "sum", "avg", "median", "max", "min", "count", "stddev", "variance",
];

/// Filters most endpoints accept.
pub const MAIN_FILTERS: &[&str] = &["year", "grade", "fips", "ncessch", "leaid", "unitid"];

/// Earliest academic year covered by the portal.
pub const MIN_YEAR: i64 = 1980;

/// State and territory FIPS codes.
pub const STATE_FIPS: &[(i64, &str)] = &[
    (1, "Alabama"),
    (2, "Alaska"),
    (4, "Arizona"),
    (5, "Arkansas"),
    (6, "California"),
    (8, "Colorado"),
    (9, "Connecticut"),
    (10, "Delaware"),
    (11, "District of Columbia"),
    (12, "Florida"),
    (13, "Georgia"),
    (15, "Hawaii"),
    (16, "Idaho"),
    (17, "Illinois"),
    (18, "Indiana"),
    (19, "Iowa"),
    (20, "Kansas"),
    (21, "Kentucky"),
    (22, "Louisiana"),
    (23, "Maine"),
    (24, "Maryland"),
    (25, "Massachusetts"),
    (26, "Michigan"),
    (27, "Minnesota"),
    (28, "Mississippi"),
    (29, "Missouri"),
    (30, "Montana"),
    (31, "Nebraska"),
    (32, "Nevada"),
    (33, "New Hampshire"),
    (34, "New Jersey"),
    (35, "New Mexico"),
    (36, "New York"),
    (37, "North Carolina"),
    (38, "North Dakota"),
    (39, "Ohio"),
    (40, "Oklahoma"),
    (41, "Oregon"),
    (42, "Pennsylvania"),
    (44, "Rhode Island"),
    (45, "South Carolina"),
    (46, "South Dakota"),
    (47, "Tennessee"),
    (48, "Texas"),
    (49, "Utah"),
    (50, "Vermont"),
    (51, "Virginia"),
    (53, "Washington"),
    (54, "West Virginia"),
    (55, "Wisconsin"),
    (56, "Wyoming"),
    (60, "American Samoa"),
    (66, "Guam"),
    (69, "Northern Mariana Islands"),
    (72, "Puerto Rico"),
    (78, "Virgin Islands"),
];

/// Look up the state or territory name for a FIPS code.
pub fn state_name(fips: i64) -> Option<&'static str> {
    STATE_FIPS
        .iter()
        .find(|(code, _)| *code == fips)
        .map(|(_, name)| *name)
}
