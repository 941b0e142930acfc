//! Cookie persistence across navigators sharing a cookie file.

mod common;

use std::sync::Arc;

use common::{html, navigator_with_jar, portal_path};
use sagres_navigator::{Endpoint, JsonFileCookiePersistor, PersistentCookieJar, Status};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn file_jar(path: &std::path::Path) -> PersistentCookieJar {
    PersistentCookieJar::with_persistor(Arc::new(JsonFileCookiePersistor::new(path)))
}

#[tokio::test]
async fn test_persistent_cookies_survive_a_restart() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(portal_path(Endpoint::Diary)))
        .respond_with(
            html("<p>ok</p>")
                .append_header("set-cookie", "ASP.NET_SessionId=abc123; path=/; HttpOnly")
                .append_header("set-cookie", "SagresLembrar=maria; Max-Age=3600; path=/"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(portal_path(Endpoint::RequestedServices)))
        .and(header("cookie", "SagresLembrar=maria"))
        .respond_with(html("<p>servicos</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cookie_file = dir.path().join("cookies.json");

    let first = navigator_with_jar(&server, file_jar(&cookie_file));
    assert_eq!(first.start_page().await.status(), Status::Success);
    let jar = first.session().jar();
    assert_eq!(jar.value_of("ASP.NET_SessionId").as_deref(), Some("abc123"));
    assert_eq!(jar.len(), 2);
    assert!(cookie_file.exists());

    first.clear_session();
    assert!(jar.value_of("ASP.NET_SessionId").is_none());
    assert_eq!(jar.value_of("SagresLembrar").as_deref(), Some("maria"));

    let restarted = navigator_with_jar(&server, file_jar(&cookie_file));
    assert_eq!(restarted.session().jar().len(), 1);
    assert_eq!(restarted.requested_services().await.status(), Status::Success);
}

#[tokio::test]
async fn test_logout_wipes_the_cookie_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(portal_path(Endpoint::Diary)))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "SagresLembrar=maria; Max-Age=3600; path=/"),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cookie_file = dir.path().join("cookies.json");
    let navigator = navigator_with_jar(&server, file_jar(&cookie_file));
    navigator.start_page().await;
    assert!(cookie_file.exists());

    navigator.logout();

    assert!(navigator.session().jar().is_empty());
    assert!(!cookie_file.exists());
}
