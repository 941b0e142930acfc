//! Tag-based cancellation of in-flight requests.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{html, navigator, portal_path};
use sagres_navigator::{Endpoint, Status};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer};

async fn slow_start_page(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(portal_path(Endpoint::Diary)))
        .respond_with(html("<p>tarde demais</p>").set_delay(Duration::from_secs(5)))
        .mount(server)
        .await;
}

async fn wait_in_flight(navigator: &sagres_navigator::Navigator) {
    for _ in 0..100 {
        if navigator.session().http().registry().in_flight() > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("request never started");
}

#[tokio::test]
async fn test_stop_tags_resolves_pending_request_as_network_error() {
    let server = MockServer::start().await;
    slow_start_page(&server).await;
    let navigator = Arc::new(navigator(&server));

    let task = tokio::spawn({
        let navigator = navigator.clone();
        async move { navigator.start_page().await }
    });
    wait_in_flight(&navigator).await;

    assert_eq!(navigator.stop_tags(&["grades"]), 0);
    assert_eq!(navigator.stop_tags(&["page"]), 1);

    let result = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("cancelled request must resolve")
        .unwrap();
    assert_eq!(result.status(), Status::NetworkError);
    assert!(result.cause().unwrap().is_cancelled());
}

#[tokio::test]
async fn test_logout_cancels_everything_and_forgets_credentials() {
    let server = MockServer::start().await;
    slow_start_page(&server).await;
    let navigator = Arc::new(navigator(&server));
    navigator.put_credentials(Some(sagres_navigator::Credential::new("maria", "s3nha")));

    let task = tokio::spawn({
        let navigator = navigator.clone();
        async move { navigator.start_page().await }
    });
    wait_in_flight(&navigator).await;
    navigator.logout();

    let result = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("logout must release pending requests")
        .unwrap();
    assert_eq!(result.status(), Status::NetworkError);
    assert!(navigator.session().http().credential().is_none());
    assert_eq!(navigator.session().http().registry().in_flight(), 0);
}
