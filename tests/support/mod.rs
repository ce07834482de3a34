//! Shared fixtures for the integration tests: a scripted Startup India API
//! served by wiremock and pipeline wiring pointed at it.

#![allow(dead_code, clippy::unwrap_used)]

use std::path::Path;
use std::time::Duration;

use harvester_core::{CheckpointStore, Endpoints, PhaseRunner, PipelineConfig, StartupIndiaApi};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// CIN the registry mock answers with full contact data.
pub const CIN_WITH_CONTACT: &str = "U72900CT2020PTC010000";
/// CIN the registry mock reports as unknown.
pub const CIN_NO_MATCH: &str = "L17110MH1973PLC019786";

/// A profile body with the fields the extractor reads.
pub fn profile(name: &str, cin: Option<&str>) -> Value {
    json!({
        "user": {
            "name": name,
            "role": "Startup",
            "badges": ["Recognised"],
            "createdOn": 1_600_000_000_000_i64,
            "startup": {
                "legalName": format!("{name} Private Limited"),
                "cin": cin,
                "stage": "Validation",
                "website": format!("https://{}.example.in", name.to_lowercase()),
                "location": {
                    "country": {"countryName": "India"},
                    "state": {"stateName": "Chhattisgarh"},
                    "city": {"districtName": "Raipur"}
                },
                "focusArea": {
                    "industry": {"industryName": "Robotics"},
                    "sectors": [{"sectionName": "Automation"}]
                }
            }
        }
    })
}

/// Serves `pages` as listing pages 0.. followed by one empty page.
pub async fn mount_listing(server: &MockServer, pages: &[&[&str]]) {
    for (number, ids) in pages.iter().enumerate() {
        let content: Vec<Value> = ids
            .iter()
            .map(|id| json!({"id": id, "name": format!("Startup {id}")}))
            .collect();
        Mock::given(method("POST"))
            .and(path("/search/profiles"))
            .and(body_partial_json(json!({"page": number})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": content})))
            .mount(server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/search/profiles"))
        .and(body_partial_json(json!({"page": pages.len()})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": []})))
        .mount(server)
        .await;
}

pub async fn mount_profile(server: &MockServer, id: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/profile/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Registry answers: full contact for [`CIN_WITH_CONTACT`], no match for
/// [`CIN_NO_MATCH`].
pub async fn mount_registry(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/cin/info"))
        .and(query_param("cin", CIN_WITH_CONTACT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "data": {
                "email": "founders@acme.example.in",
                "registeredContactNo": "+91 98765 43210",
                "registeredAddress": "12 MG Road, Raipur",
                "companyStatus": "Active",
                "incorpdate": "2020-01-15"
            }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cin/info"))
        .and(query_param("cin", CIN_NO_MATCH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": false, "data": null})),
        )
        .mount(server)
        .await;
}

/// Three startups on one listing page: one with a registry match, one the
/// registry does not know, one without a CIN.
pub async fn mount_standard_dataset(server: &MockServer) {
    mount_listing(server, &[&["a1", "b2", "c3"]]).await;
    mount_profile(server, "a1", profile("Acme", Some(CIN_WITH_CONTACT))).await;
    mount_profile(server, "b2", profile("Bolt", Some(CIN_NO_MATCH))).await;
    mount_profile(server, "c3", profile("Crux", None)).await;
    mount_registry(server).await;
}

/// Pipeline settings aimed at `server` with pacing off and a flush after
/// every item.
pub fn test_config(server: &MockServer, data_dir: &Path) -> PipelineConfig {
    PipelineConfig {
        endpoints: Endpoints::with_base(&server.uri()),
        rate_limit_delay: Duration::ZERO,
        retry_attempts: 1,
        checkpoint_interval: 1,
        request_timeout: Duration::from_secs(5),
        data_dir: data_dir.to_path_buf(),
        ..PipelineConfig::default()
    }
}

pub fn runner(config: PipelineConfig) -> PhaseRunner {
    let store = CheckpointStore::open(&config.data_dir)
        .unwrap()
        .with_results_path(config.results_path());
    let api = StartupIndiaApi::new(config.build_client().unwrap(), config.endpoints.clone());
    PhaseRunner::new(config, Box::new(api), store)
}

/// Counts the requests the server received on `route`.
pub async fn hits(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == route)
        .count()
}
