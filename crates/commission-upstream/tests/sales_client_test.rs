//! Contract tests for UpstreamClient against a mocked sales service.
//!
//! | Method | Path | Test |
//! |--------|------|------|
//! | GET    | `/api/v1/sales` | `fetch_*` |

use commission_core::Period;
use commission_upstream::{fetch_line_items, UpstreamClient, UpstreamConfig, UpstreamError};
use rust_decimal::Decimal;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(mock_server: &MockServer) -> UpstreamClient {
    let config = UpstreamConfig::local_mock(&mock_server.uri(), "test-token").unwrap();
    UpstreamClient::new(config).unwrap()
}

fn march() -> Period {
    Period::new(3, 2025).unwrap()
}

#[tokio::test]
async fn fetch_sends_period_query_and_bearer_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/sales"))
        .and(query_param("month", "3"))
        .and(query_param("year", "2025"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "seller_id": 83,
                "seller_name": "Michelle",
                "product_code": "4711",
                "product_desc": "Cola 2L",
                "branch_id": "1",
                "revenue": "50000.00",
                "return_value": 100,
                "open_invoice_value": "50",
                "prior_surcharge_value": 30
            },
            {
                "seller_id": 12,
                "seller_name": "Bruno",
                "product_code": 815,
                "product_desc": "Water",
                "branch_id": 2,
                "revenue": 1200.5
            }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let items = fetch_line_items(&client, march()).await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].seller_id.get(), 83);
    assert_eq!(items[0].revenue, Decimal::new(5000000, 2));
    assert_eq!(items[0].prior_surcharge_value, Decimal::new(30, 0));
    assert_eq!(items[1].product_code.as_str(), "815");
    assert_eq!(items[1].branch_id.as_str(), "2");
    assert_eq!(items[1].return_value, Decimal::ZERO);
    assert!(items.iter().all(|i| i.period == march()));
}

#[tokio::test]
async fn fetch_returns_empty_batch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/sales"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;

    let rows = test_client(&mock_server).fetch_sales(march()).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn fetch_maps_non_2xx_to_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/sales"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&mock_server)
        .await;

    let err = test_client(&mock_server)
        .fetch_sales(march())
        .await
        .unwrap_err();
    match err {
        UpstreamError::Api { status, body, .. } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn fetch_maps_bad_body_to_deserialization_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/sales"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let err = test_client(&mock_server)
        .fetch_sales(march())
        .await
        .unwrap_err();
    assert!(matches!(err, UpstreamError::Deserialization { .. }));
}

#[tokio::test]
async fn invalid_seller_id_fails_the_fetch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/sales"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"seller_id": -5, "product_code": "A", "branch_id": "1", "revenue": 1}
        ])))
        .mount(&mock_server)
        .await;

    let err = fetch_line_items(&test_client(&mock_server), march())
        .await
        .unwrap_err();
    assert!(matches!(err, UpstreamError::InvalidRow { index: 0, .. }));
}
