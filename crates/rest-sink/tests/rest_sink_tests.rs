use chrono::NaiveDate;
use rest_sink::{RestSink, RestSinkConfig};
use serde_json::json;
use std::time::Duration;
use sync_core::{Record, SyncRunRecord, SyncStatus, Watermark};
use table_sink::{SinkError, TableSink};
use wiremock::{
    matchers::{body_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const API_KEY: &str = "test-anon-key";

fn sink(server: &MockServer) -> RestSink {
    RestSink::new(RestSinkConfig::new(server.uri(), API_KEY)).unwrap()
}

fn record(value: serde_json::Value) -> Record {
    Record::try_from(value).unwrap()
}

fn run_at() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(9, 30, 15)
        .unwrap()
}

#[tokio::test]
async fn test_insert_sends_page_with_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/tblcity"))
        .and(header("apikey", API_KEY))
        .and(header("authorization", "Bearer test-anon-key"))
        .and(header("prefer", "return=minimal"))
        .and(body_json(json!([
            {"cityid_pk": 1, "cityname": "Karachi"},
            {"cityid_pk": 2, "cityname": "Lahore"}
        ])))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let page = vec![
        record(json!({"cityid_pk": 1, "cityname": "Karachi"})),
        record(json!({"cityid_pk": 2, "cityname": "Lahore"})),
    ];

    sink(&server).insert_records("tblcity", &page).await.unwrap();
}

#[tokio::test]
async fn test_rejected_insert_carries_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/tblcity"))
        .respond_with(ResponseTemplate::new(409).set_body_string(
            r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#,
        ))
        .mount(&server)
        .await;

    let err = sink(&server)
        .insert_records("tblcity", &[record(json!({"cityid_pk": 1}))])
        .await
        .unwrap_err();

    match err {
        SinkError::Rejected { status, body } => {
            assert_eq!(status, 409);
            assert!(body.contains("duplicate key"));
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_truncate_calls_rpc() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/truncate_table"))
        .and(body_json(json!({"table_name": "tblsales"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    sink(&server).truncate_table("tblsales").await.unwrap();
}

#[tokio::test]
async fn test_truncate_missing_procedure_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/truncate_table"))
        .respond_with(ResponseTemplate::new(404).set_body_string("function not found"))
        .mount(&server)
        .await;

    let err = sink(&server).truncate_table("tblsales").await.unwrap_err();
    assert_eq!(
        err,
        SinkError::Rejected {
            status: 404,
            body: "function not found".to_string()
        }
    );
}

#[tokio::test]
async fn test_append_sync_run_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/tblsynctablelogs"))
        .and(body_json(json!({
            "tablename": "tblsales",
            "last_sync": "2024-01-01 09:30:15",
            "total_records_synced": 420,
            "status": "partial"
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let run = SyncRunRecord {
        table: "tblsales".to_string(),
        run_at: run_at(),
        rows_synced: 420,
        status: SyncStatus::Partial,
    };

    sink(&server).append_sync_run(&run).await.unwrap();
}

#[tokio::test]
async fn test_upsert_watermark_merges_on_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/tblsynclogs"))
        .and(query_param("on_conflict", "id"))
        .and(body_json(json!({"id": 1, "last_sync": "2024-01-01 09:30:15"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    sink(&server)
        .upsert_watermark(&Watermark::new(run_at()))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let prefer = requests[0].headers.get("prefer").unwrap().to_str().unwrap();
    assert_eq!(prefer, "resolution=merge-duplicates,return=minimal");
}

#[tokio::test]
async fn test_read_watermark() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/tblsynclogs"))
        .and(query_param("select", "last_sync"))
        .and(query_param("id", "eq.1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"last_sync": "2024-01-01 09:30:15"}])),
        )
        .mount(&server)
        .await;

    let watermark = sink(&server).read_watermark().await.unwrap();
    assert_eq!(watermark, Some(Watermark::new(run_at())));
}

#[tokio::test]
async fn test_read_watermark_converts_rfc3339_into_zone() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/tblsynclogs"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"last_sync": "2024-01-01T04:30:15+00:00"}])),
        )
        .mount(&server)
        .await;

    let config = RestSinkConfig::new(server.uri(), API_KEY).with_timezone(chrono_tz::Asia::Karachi);
    let watermark = RestSink::new(config).unwrap().read_watermark().await.unwrap();

    assert_eq!(watermark, Some(Watermark::new(run_at())));
}

#[tokio::test]
async fn test_read_watermark_missing_row() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/tblsynclogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert_eq!(sink(&server).read_watermark().await.unwrap(), None);
}

#[tokio::test]
async fn test_read_watermark_garbage_is_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/tblsynclogs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"last_sync": "yesterday"}])))
        .mount(&server)
        .await;

    let err = sink(&server).read_watermark().await.unwrap_err();
    assert!(matches!(err, SinkError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_slow_destination_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/tblcity"))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let config =
        RestSinkConfig::new(server.uri(), API_KEY).with_timeout(Duration::from_millis(100));
    let err = RestSink::new(config)
        .unwrap()
        .insert_records("tblcity", &[record(json!({"cityid_pk": 1}))])
        .await
        .unwrap_err();

    assert!(matches!(err, SinkError::Timeout(_)));
}

#[tokio::test]
async fn test_unreachable_destination() {
    // Nothing listens on port 9 of the loopback interface.
    let sink = RestSink::new(RestSinkConfig::new("http://127.0.0.1:9", API_KEY)).unwrap();

    let err = sink.truncate_table("tblcity").await.unwrap_err();
    assert!(matches!(err, SinkError::Unreachable(_)));
}
