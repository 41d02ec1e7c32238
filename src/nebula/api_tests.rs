//! Tests for `NebulaFetcher`.

use super::{
    API_KEY_HEADER, AuthError, ClientFetcher, DEFAULT_PERIOD, FetchError, NebulaFetcher, SiteId,
};
use crate::transport::{HttpClient, HttpError, HttpRequest, HttpResponse};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Mock HTTP client that replays queued responses and records requests.
#[derive(Debug, Default)]
struct MockClient {
    responses: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockClient {
    fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn responding(status: http::StatusCode, body: &str) -> Arc<Self> {
        Self::new(vec![Ok(HttpResponse::new(
            status,
            http::HeaderMap::new(),
            body.as_bytes().to_vec(),
        ))])
    }

    fn captured(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpClient for MockClient {
    async fn request(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.requests.lock().unwrap().push(req);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(HttpError::Timeout))
    }
}

fn api_url() -> url::Url {
    url::Url::parse("https://api.example.com").unwrap()
}

fn fetcher(client: Arc<MockClient>) -> NebulaFetcher<Arc<MockClient>> {
    NebulaFetcher::new(client, api_url(), Some("secret".to_string()))
}

const ROSTER: &str = r#"{
    "data": [
        {"macAddress": "aa:aa:aa:aa:aa:aa", "status": "ONLINE", "description": "Phone"},
        {"macAddress": "bb:bb:bb:bb:bb:bb", "status": "OFFLINE"}
    ]
}"#;

mod request {
    use super::*;

    #[tokio::test]
    async fn posts_to_site_clients_endpoint() {
        let client = MockClient::responding(http::StatusCode::OK, ROSTER);
        fetcher(client.clone())
            .fetch_clients(&SiteId::from("site-1"))
            .await
            .unwrap();

        let requests = client.captured();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, http::Method::POST);
        assert_eq!(
            requests[0].url.as_str(),
            "https://api.example.com/v2/nebula/site-1/clients"
        );
    }

    #[tokio::test]
    async fn sends_api_key_header() {
        let client = MockClient::responding(http::StatusCode::OK, ROSTER);
        fetcher(client.clone())
            .fetch_clients(&SiteId::from("site-1"))
            .await
            .unwrap();

        let request = &client.captured()[0];
        assert_eq!(request.headers.get(API_KEY_HEADER).unwrap(), "secret");
    }

    #[tokio::test]
    async fn body_carries_period_and_features() {
        let client = MockClient::responding(http::StatusCode::OK, ROSTER);
        fetcher(client.clone())
            .with_period("24h")
            .fetch_clients(&SiteId::from("site-1"))
            .await
            .unwrap();

        let body: serde_json::Value =
            serde_json::from_slice(client.captured()[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(body["period"], "24h");
        assert_eq!(
            body["features"],
            serde_json::json!(["mac_address", "os_hostname"])
        );
    }

    #[tokio::test]
    async fn base_url_with_path_is_extended() {
        let client = MockClient::responding(http::StatusCode::OK, ROSTER);
        let url = url::Url::parse("https://proxy.example.com/nebula/").unwrap();
        NebulaFetcher::new(client.clone(), url, Some("k".to_string()))
            .fetch_clients(&SiteId::from("S1"))
            .await
            .unwrap();

        assert_eq!(
            client.captured()[0].url.as_str(),
            "https://proxy.example.com/nebula/v2/nebula/S1/clients"
        );
    }

    #[test]
    fn default_period_is_two_hours() {
        let fetcher = NebulaFetcher::new(MockClient::new(vec![]), api_url(), None);
        assert_eq!(fetcher.period(), DEFAULT_PERIOD);
        assert_eq!(DEFAULT_PERIOD, "2h");
    }
}

mod response {
    use super::*;

    #[tokio::test]
    async fn parses_records_in_order() {
        let client = MockClient::responding(http::StatusCode::OK, ROSTER);
        let records = fetcher(client)
            .fetch_clients(&SiteId::from("S1"))
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key.as_str(), "aa:aa:aa:aa:aa:aa");
        assert!(records[0].is_online());
        assert_eq!(records[1].key.as_str(), "bb:bb:bb:bb:bb:bb");
        assert!(!records[1].is_online());
    }

    #[tokio::test]
    async fn missing_data_is_empty_roster() {
        let client = MockClient::responding(http::StatusCode::OK, "{}");
        let records = fetcher(client)
            .fetch_clients(&SiteId::from("S1"))
            .await
            .unwrap();

        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn entry_without_mac_is_skipped() {
        let body = r#"{"data": [
            {"status": "ONLINE", "description": "printer"},
            {"macAddress": null, "status": "ONLINE"},
            {"macAddress": "aa:aa:aa:aa:aa:aa", "status": "ONLINE"}
        ]}"#;
        let client = MockClient::responding(http::StatusCode::OK, body);
        let records = fetcher(client)
            .fetch_clients(&SiteId::from("S1"))
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key.as_str(), "aa:aa:aa:aa:aa:aa");
        assert!(records[0].is_online());
    }

    #[tokio::test]
    async fn null_or_missing_status_is_not_online() {
        let body = r#"{"data": [
            {"macAddress": "aa:aa:aa:aa:aa:aa", "status": null},
            {"macAddress": "bb:bb:bb:bb:bb:bb"},
            {"macAddress": "cc:cc:cc:cc:cc:cc", "status": "ONLINE"}
        ]}"#;
        let client = MockClient::responding(http::StatusCode::OK, body);
        let records = fetcher(client)
            .fetch_clients(&SiteId::from("S1"))
            .await
            .unwrap();

        assert_eq!(records.len(), 3);
        assert!(!records[0].is_online());
        assert!(!records[1].is_online());
        assert!(records[2].is_online());
    }

    #[tokio::test]
    async fn null_data_is_empty_roster() {
        let client = MockClient::responding(http::StatusCode::OK, r#"{"data": null}"#);
        let records = fetcher(client)
            .fetch_clients(&SiteId::from("S1"))
            .await
            .unwrap();

        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_parse_error() {
        let client = MockClient::responding(http::StatusCode::OK, "not json");
        let result = fetcher(client).fetch_clients(&SiteId::from("S1")).await;

        assert!(matches!(result, Err(FetchError::Parse(_))));
    }

    #[tokio::test]
    async fn unauthorized_is_auth_error() {
        let client = MockClient::responding(http::StatusCode::UNAUTHORIZED, "");
        let result = fetcher(client).fetch_clients(&SiteId::from("S1")).await;

        assert!(matches!(
            result,
            Err(FetchError::Auth(AuthError::Rejected { status })) if status == http::StatusCode::UNAUTHORIZED
        ));
    }

    #[tokio::test]
    async fn server_error_is_status_error() {
        let client = MockClient::responding(http::StatusCode::BAD_GATEWAY, "upstream down");
        let result = fetcher(client).fetch_clients(&SiteId::from("S1")).await;

        match result {
            Err(FetchError::Status { status, body }) => {
                assert_eq!(status, http::StatusCode::BAD_GATEWAY);
                assert_eq!(body.as_deref(), Some("upstream down"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_failure_is_http_error() {
        let client = MockClient::new(vec![Err(HttpError::Timeout)]);
        let result = fetcher(client).fetch_clients(&SiteId::from("S1")).await;

        assert!(matches!(result, Err(FetchError::Http(HttpError::Timeout))));
    }
}

mod credentials {
    use super::*;

    #[tokio::test]
    async fn missing_api_key_fails_without_request() {
        let client = MockClient::new(vec![]);
        let fetcher = NebulaFetcher::new(client.clone(), api_url(), None);

        let result = fetcher.fetch_clients(&SiteId::from("S1")).await;

        assert!(matches!(
            result,
            Err(FetchError::Auth(AuthError::MissingApiKey))
        ));
        assert!(client.captured().is_empty());
    }

    #[tokio::test]
    async fn malformed_api_key_fails_without_request() {
        let client = MockClient::new(vec![]);
        let fetcher = NebulaFetcher::new(client.clone(), api_url(), Some("bad\nkey".to_string()));

        let result = fetcher.fetch_clients(&SiteId::from("S1")).await;

        assert!(matches!(
            result,
            Err(FetchError::Auth(AuthError::MalformedApiKey))
        ));
        assert!(client.captured().is_empty());
    }
}
