//! Shared harness: a navigator pointed at a wiremock portal.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use sagres_navigator::{Endpoint, Institution, Navigator, NavigatorConfig, PersistentCookieJar};
use wiremock::MockServer;

pub const INSTITUTION_ID: &str = "TEST";

pub fn institution(server: &MockServer) -> Institution {
    Institution {
        id: INSTITUTION_ID.to_string(),
        base_url: format!("{}/Portal", server.uri()),
        api_url: Some(format!("{}/Api", server.uri())),
        view_state: "cold-view-state".to_string(),
        view_state_generator: "C2EE9ABB".to_string(),
        event_validation: "cold-event-validation".to_string(),
        captcha: None,
    }
}

pub fn config() -> NavigatorConfig {
    NavigatorConfig::default()
        .with_cookie_file(None)
        .with_timeout(Duration::from_secs(10))
}

pub fn navigator(server: &MockServer) -> Navigator {
    navigator_with_jar(server, PersistentCookieJar::in_memory())
}

pub fn navigator_with_jar(server: &MockServer, jar: PersistentCookieJar) -> Navigator {
    Navigator::with_parts(config(), institution(server), Arc::new(jar)).unwrap()
}

/// Request path of `endpoint` on the mock portal, without its query.
pub fn portal_path(endpoint: Endpoint) -> String {
    let path = endpoint.path();
    let path = path.split('?').next().unwrap_or(path);
    format!("/Portal{path}")
}

pub fn fixture(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("fixture {path}: {e}"))
}

pub fn html(body: &str) -> wiremock::ResponseTemplate {
    wiremock::ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}
