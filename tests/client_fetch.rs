mod common;

use common::{BASE, config, ok, page, status};
use edudata_rs::{
    CancelToken, Client, EndpointDescriptor, Error, ErrorKind, MetadataKind, SummaryDescriptor,
};
use serde_json::json;

fn enrollment_2020() -> EndpointDescriptor {
    EndpointDescriptor::builder("schools", "ccd", "enrollment")
        .subtopic(["grade-9"])
        .filter("year", 2020)
        .filter("fips", 6)
        .build()
        .unwrap()
}

#[test]
fn fetch_combines_all_pages() {
    let next = "https://api.test/api/v1/schools/ccd/enrollment/2020/grade-9/?fips=6&page=2";
    let backend = common::ScriptedBackend::new(vec![
        ok(page(0, 3, 5, Some(next))),
        ok(page(3, 2, 5, None)),
    ]);
    let client = Client::with_backend(backend.clone(), config());
    let table = client.fetch(&enrollment_2020()).unwrap();

    assert_eq!(table.len(), 5);
    assert_eq!(
        backend.calls(),
        [
            "https://api.test/api/v1/schools/ccd/enrollment/2020/grade-9/?fips=6",
            next,
        ]
    );
}

#[test]
fn first_page_not_found_is_not_a_pagination_error() {
    let backend = common::ScriptedBackend::new(vec![status(404, "")]);
    let client = Client::with_backend(backend, config());
    let err = client.fetch(&enrollment_2020()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EndpointNotFound);
    assert!(err.to_string().contains("/schools/ccd/enrollment/2020/grade-9/"));
}

#[test]
fn already_cancelled_fetch_makes_no_request() {
    let backend = common::ScriptedBackend::new(vec![]);
    let client = Client::with_backend(backend.clone(), config());
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = client.fetch_cancellable(&enrollment_2020(), &cancel).unwrap_err();
    assert!(matches!(err, Error::Cancelled { .. }));
    assert!(backend.calls().is_empty());
}

#[test]
fn next_link_back_to_the_first_page_is_a_cycle() {
    let first = "https://api.test/api/v1/schools/ccd/enrollment/2020/grade-9/?fips=6";
    let next = "https://api.test/api/v1/schools/ccd/enrollment/2020/grade-9/?fips=6&page=2";
    let backend = common::ScriptedBackend::new(vec![
        ok(page(0, 3, 9, Some(next))),
        ok(page(3, 3, 9, Some(first))),
        ok(page(0, 3, 9, Some(next))),
    ]);
    let client = Client::with_backend(backend.clone(), config());
    let err = client.fetch(&enrollment_2020()).unwrap_err();

    assert!(matches!(err, Error::Pagination { page: 3, records: 6, .. }));
    assert_eq!(err.root().kind(), ErrorKind::DataProcessing);
    assert_eq!(backend.calls(), [first, next]);
}

#[test]
fn summary_hits_the_summaries_path() {
    let backend = common::ScriptedBackend::new(vec![ok(json!({
        "count": 2,
        "next": null,
        "results": [
            {"fips": 6, "enrollment": 1200},
            {"fips": 8, "enrollment": 300}
        ]
    }))]);
    let client = Client::with_backend(backend.clone(), config());
    let s = SummaryDescriptor::builder("schools", "ccd", "enrollment", "sum", "enrollment")
        .filter("year", 2020)
        .by(["fips"])
        .build()
        .unwrap();
    let table = client.fetch_summary(&s).unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.get(1, "enrollment"), Some(&json!(300)));
    assert_eq!(
        backend.calls(),
        ["https://api.test/api/v1/schools/ccd/enrollment/2020/summaries/?stat=sum&var=enrollment&by=fips"]
    );
}

#[test]
fn csv_download_is_filtered_locally() {
    let csv = "ncessch,year,grade,enrollment\n\
               010000100277,2020,9,120\n\
               010000100278,2020,11,80\n\
               010000100279,2019,9,95\n";
    let backend = common::ScriptedBackend::new(vec![status(200, csv)]);
    let client = Client::with_backend(backend.clone(), config());
    let d = EndpointDescriptor::builder("schools", "ccd", "enrollment")
        .filter("year", 2020)
        .filter("grade", vec![9, 10])
        .build()
        .unwrap();
    let table = client.fetch_csv(&d).unwrap();

    assert_eq!(backend.calls(), ["https://api.test/csv/schools_ccd_enrollment.csv"]);
    assert_eq!(table.len(), 1);
    assert_eq!(table.get(0, "ncessch"), Some(&json!("010000100277")));
    assert_eq!(table.columns(), ["ncessch", "year", "grade", "enrollment"]);
}

#[test]
fn csv_download_retries_like_json() {
    let backend = common::ScriptedBackend::new(vec![status(503, ""), status(200, "a,b\n1,2\n")]);
    let client = Client::with_backend(backend.clone(), config());
    let d = EndpointDescriptor::builder("schools", "ccd", "directory")
        .build()
        .unwrap();
    assert_eq!(client.fetch_csv(&d).unwrap().len(), 1);
    assert_eq!(backend.calls().len(), 2);
}

fn endpoints_listing() -> serde_json::Value {
    json!({
        "count": 1,
        "next": null,
        "results": [{
            "endpoint_id": 1,
            "level": "schools",
            "source": "ccd",
            "topic": "enrollment",
            "optional_vars": ["grade", "race", "sex"],
            "csv_available": true
        }]
    })
}

#[test]
fn validate_warns_about_unknown_filters() {
    let backend = common::ScriptedBackend::new(vec![ok(endpoints_listing())]);
    let client = Client::with_backend(backend.clone(), config());
    let d = EndpointDescriptor::builder("schools", "ccd", "enrollment")
        .filter("year", 2020)
        .filter("colour", "blue")
        .build()
        .unwrap();
    let outcome = client.validate(&d);

    assert!(outcome.ok);
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("colour"));
    assert_eq!(backend.calls(), [format!("{}/api-endpoints/", BASE)]);
}

#[test]
fn malformed_metadata_rows_are_skipped() {
    let backend = common::ScriptedBackend::new(vec![ok(json!({
        "next": null,
        "results": [
            {"level": "schools", "source": "ccd", "years_available": [2019, 2020]},
            {"level": "schools", "source": "ccd", "topic": "enrollment", "years_available": "1986-2022"}
        ]
    }))]);
    let client = Client::with_backend(backend, config());
    let outcome = client.validate(&enrollment_2020());

    assert!(outcome.ok);
    assert!(outcome.warnings.iter().all(|w| !w.contains("lookup failed")));
}

#[test]
fn validate_fails_for_unlisted_endpoint() {
    let backend = common::ScriptedBackend::new(vec![ok(endpoints_listing())]);
    let client = Client::with_backend(backend, config());
    let d = EndpointDescriptor::builder("schools", "ccd", "finance")
        .build()
        .unwrap();
    let outcome = client.validate(&d);
    assert!(!outcome.ok);
    assert_eq!(outcome.into_result(&d).unwrap_err().kind(), ErrorKind::EndpointNotFound);
}

#[test]
fn validate_proceeds_when_metadata_is_unavailable() {
    let backend = common::ScriptedBackend::new(vec![status(500, "")]);
    let client = Client::with_backend(backend, config());
    let outcome = client.validate(&enrollment_2020());
    assert!(outcome.ok);
    assert!(outcome.warnings.iter().any(|w| w.contains("metadata lookup failed")));
}

#[test]
fn labels_come_from_variable_metadata() {
    let backend = common::ScriptedBackend::new(vec![
        ok(json!({
            "next": null,
            "results": [
                {"variable": "race", "labels": {"1": "White", "2": "Black"}},
                {"variable": "enrollment"}
            ]
        })),
        ok(json!({"next": null, "results": [{"race": 2, "enrollment": 40}]})),
    ]);
    let client = Client::with_backend(backend.clone(), config());
    let mapper = client.label_mapper().unwrap();
    let d = EndpointDescriptor::builder("schools", "ccd", "enrollment")
        .subtopic(["race"])
        .filter("year", 2020)
        .build()
        .unwrap();
    let mut table = client.fetch(&d).unwrap();
    mapper.apply_labels_to_table(&mut table, None).unwrap();

    assert_eq!(table.get(0, "race"), Some(&json!("Black")));
    assert_eq!(backend.calls()[0], format!("{}/api-variables/", BASE));
}

#[test]
fn metadata_paths() {
    assert_eq!(MetadataKind::Endpoints.path(), "api-endpoints");
    assert_eq!(MetadataKind::Downloads.path(), "api-downloads");
}

#[test]
fn invalid_input_never_reaches_the_network() {
    let err = EndpointDescriptor::builder("schools", "ccd", "enrollment")
        .filter("year", 1950)
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn client_can_be_shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Client>();
    assert_send_sync::<Client<std::sync::Arc<common::ScriptedBackend>>>();
}
