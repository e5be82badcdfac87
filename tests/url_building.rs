use edudata_rs::url::{
    ResolvedQuery, build_csv_url, build_endpoint_url, build_query_string, build_summary_url,
};
use edudata_rs::{EndpointDescriptor, FilterValue, Filters, Level, SummaryDescriptor};

const BASE: &str = "https://educationdata.urban.org/api/v1";

#[test]
fn single_year_goes_into_path_before_subtopic() {
    let d = EndpointDescriptor::builder("schools", "ccd", "enrollment")
        .subtopic(["grade-9"])
        .filter("year", 2020)
        .build()
        .unwrap();
    assert_eq!(
        build_endpoint_url(BASE, &d),
        "https://educationdata.urban.org/api/v1/schools/ccd/enrollment/2020/grade-9/"
    );
}

#[test]
fn one_element_year_list_is_a_single_year() {
    let d = EndpointDescriptor::builder("schools", "ccd", "directory")
        .filter("year", vec![2019])
        .build()
        .unwrap();
    assert_eq!(
        build_endpoint_url(BASE, &d),
        "https://educationdata.urban.org/api/v1/schools/ccd/directory/2019/"
    );
}

#[test]
fn multiple_years_stay_in_query() {
    let d = EndpointDescriptor::builder("schools", "ccd", "enrollment")
        .filter("year", vec![2019, 2020])
        .filter("fips", 6)
        .build()
        .unwrap();
    assert_eq!(
        build_endpoint_url(BASE, &d),
        "https://educationdata.urban.org/api/v1/schools/ccd/enrollment/?year=2019&year=2020&fips=6"
    );
}

#[test]
fn null_year_is_dropped() {
    let d = EndpointDescriptor::builder("college-university", "ipeds", "directory")
        .filter("year", FilterValue::Null)
        .filter("unitid", 100654)
        .build()
        .unwrap();
    let r = ResolvedQuery::resolve(&d);
    assert_eq!(r.segments, ["college-university", "ipeds", "directory"]);
    assert_eq!(
        r.to_url(BASE),
        "https://educationdata.urban.org/api/v1/college-university/ipeds/directory/?unitid=100654"
    );
}

#[test]
fn inputs_are_case_folded_and_trailing_slash_on_base_is_ignored() {
    let d = EndpointDescriptor::builder("Schools", "CCD", "Enrollment")
        .subtopic(["Race", "Sex"])
        .filter("Year", 2018)
        .build()
        .unwrap();
    assert_eq!(
        build_endpoint_url("https://x.test/api/v1/", &d),
        "https://x.test/api/v1/schools/ccd/enrollment/2018/race/sex/"
    );
}

#[test]
fn query_string_encoding() {
    assert_eq!(build_query_string(&Filters::new()), "");

    let mut f = Filters::new();
    f.insert("year".into(), 2020.into());
    f.insert("fips".into(), None::<i64>.into());
    assert_eq!(build_query_string(&f), "year=2020");

    let mut f = Filters::new();
    f.insert("grade".into(), vec![9, 10].into());
    f.insert("fips".into(), FilterValue::Null);
    f.insert("school_name".into(), "a b,c".into());
    assert_eq!(build_query_string(&f), "grade=9&grade=10&school_name=a%20b%2Cc");
}

#[test]
fn summary_url_puts_stat_var_and_by_first() {
    let s = SummaryDescriptor::builder("schools", "ccd", "enrollment", "sum", "enrollment")
        .filter("year", 2020)
        .filter("fips", 6)
        .by(["fips", "grade"])
        .build()
        .unwrap();
    assert_eq!(
        build_summary_url(BASE, &s),
        "https://educationdata.urban.org/api/v1/schools/ccd/enrollment/2020/summaries/\
         ?stat=sum&var=enrollment&by=fips%2Cgrade&fips=6"
    );
}

#[test]
fn mean_is_sent_as_avg() {
    let s = SummaryDescriptor::builder("school-districts", "ccd", "finance", "mean", "rev_total")
        .build()
        .unwrap();
    assert!(build_summary_url(BASE, &s).ends_with("/summaries/?stat=avg&var=rev_total"));
}

#[test]
fn csv_url_joins_parts_with_underscores() {
    assert_eq!(
        build_csv_url(
            "https://educationdata.urban.org/csv",
            Level::Schools,
            "ccd",
            "enrollment",
            &["race".to_string()]
        ),
        "https://educationdata.urban.org/csv/schools_ccd_enrollment_race.csv"
    );
}

#[test]
fn invalid_descriptors_are_rejected_at_build_time() {
    assert!(EndpointDescriptor::builder("universities", "ccd", "enrollment").build().is_err());
    assert!(EndpointDescriptor::builder("schools", "c", "enrollment").build().is_err());
    assert!(EndpointDescriptor::builder("schools", "ccd", "en/rollment").build().is_err());
    assert!(
        EndpointDescriptor::builder("schools", "ccd", "enrollment")
            .filter("year", 1900)
            .build()
            .is_err()
    );
    assert!(
        EndpointDescriptor::builder("schools", "ccd", "enrollment")
            .filter("fips", "CA")
            .build()
            .is_err()
    );
    assert!(
        EndpointDescriptor::builder("schools", "ccd", "enrollment")
            .filter("year", 2020)
            .filter("YEAR", 2019)
            .build()
            .is_err()
    );
}

#[test]
fn fips_codes_outside_the_state_table_still_build() {
    for code in [3, 58, 59] {
        let d = EndpointDescriptor::builder("schools", "ccd", "directory")
            .filter("year", 2020)
            .filter("fips", code)
            .build()
            .unwrap();
        assert_eq!(
            build_endpoint_url(BASE, &d),
            format!("https://educationdata.urban.org/api/v1/schools/ccd/directory/2020/?fips={}", code)
        );
    }
}
