use std::net::SocketAddr;
use std::sync::Arc;

use garden_monitor::scheduler::ManualScheduler;
use garden_monitor::server;
use garden_monitor::store::LatencyProfile;
use garden_monitor::{MockSensorStore, PollingSession, SessionOptions};
use reqwest::StatusCode;
use serde_json::Value;
use tokio::net::TcpListener;

struct TestServer {
    addr: SocketAddr,
    store: Arc<MockSensorStore>,
    client: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let store = Arc::new(MockSensorStore::seeded(LatencyProfile::instant()));
        let session = Arc::new(PollingSession::new(
            store.clone(),
            Arc::new(ManualScheduler::new()),
            SessionOptions::default(),
        ));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(server::serve(listener, session, std::future::pending()));

        Self {
            addr,
            store,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    async fn refresh(&self) -> Value {
        self.client
            .post(self.url("/api/dashboard/refresh"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap()
    }
}

#[tokio::test]
async fn test_dashboard_is_empty_before_first_refresh() {
    let server = TestServer::start().await;

    let (status, body) = server.get("/api/dashboard").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loading"], false);
    assert!(body["lastError"].is_null());
    assert!(body["snapshot"]["environment"]["temperature"].is_null());
    assert!(body["snapshot"]["waterPH"].is_null());
    assert!(body["indicators"]["tankFillPercent"].is_null());
}

#[tokio::test]
async fn test_refresh_fills_dashboard_and_indicators() {
    let server = TestServer::start().await;

    assert_eq!(server.refresh().await["outcome"], "applied");
    let (_, body) = server.get("/api/dashboard").await;

    let temperature = &body["snapshot"]["environment"]["temperature"];
    assert_eq!(temperature["value"], 24.0);
    assert_eq!(temperature["unit"], "°C");
    assert_eq!(temperature["minValue"], 15.0);
    assert_eq!(body["snapshot"]["soilHumidity"]["sensorId"], "SOIL_HUM");
    assert_eq!(body["snapshot"]["waterLevel"]["value"], 85.0);

    assert_eq!(body["indicators"]["temperatureProgress"], 45.0);
    assert_eq!(body["indicators"]["soilMoisture"], "optimal");
    assert_eq!(body["indicators"]["soilMoistureLabel"], "Optimal level");
    assert_eq!(body["indicators"]["waterPH"], "optimal");
    assert_eq!(body["indicators"]["waterPHLabel"], "Optimal");
    assert_eq!(body["indicators"]["tankFillPercent"], 17.0);
}

#[tokio::test]
async fn test_failed_refresh_keeps_snapshot_and_reports_error() {
    let server = TestServer::start().await;
    server.refresh().await;
    let (_, before) = server.get("/api/dashboard").await;

    server.store.set_offline(true);
    assert_eq!(server.refresh().await["outcome"], "failed");
    let (_, after) = server.get("/api/dashboard").await;

    assert_eq!(after["snapshot"], before["snapshot"]);
    assert_eq!(after["lastError"]["message"], "Unable to load sensor data");
    assert!(after["lastError"]["occurredAt"].is_string());
}

#[tokio::test]
async fn test_snapshot_sensor_lookup() {
    let server = TestServer::start().await;

    let (status, _) = server.get("/api/dashboard/sensors/WATER_PH").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    server.refresh().await;
    let (status, body) = server.get("/api/dashboard/sensors/WATER_PH").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unit"], "pH");

    let (status, body) = server.get("/api/dashboard/sensors/BOGUS").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Sensor with ID BOGUS not found");
}

#[tokio::test]
async fn test_history_endpoint_bounds_and_errors() {
    let server = TestServer::start().await;

    let (status, body) = server
        .get("/api/dashboard/sensors/ENV_TEMP/history?limit=2")
        .await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["timestamp"], "2025-03-29T12:00:00Z");
    assert_eq!(entries[1]["timestamp"], "2025-03-29T11:00:00Z");

    let (_, body) = server.get("/api/dashboard/sensors/ENV_HUM/history").await;
    assert_eq!(body.as_array().unwrap().len(), 4);

    let (status, _) = server.get("/api/dashboard/sensors/BOGUS/history").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    server.store.set_offline(true);
    let (status, body) = server.get("/api/dashboard/sensors/ENV_TEMP/history").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("unavailable"));

    // a broken history request is not a broken feed
    let (_, dashboard) = server.get("/api/dashboard").await;
    assert!(dashboard["lastError"].is_null());
}

#[tokio::test]
async fn test_put_updates_value_and_history() {
    let server = TestServer::start().await;

    let response = server
        .client
        .put(server.url("/api/sensors/ENV_TEMP"))
        .json(&serde_json::json!({ "value": 30.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (_, reading) = server.get("/api/sensors/ENV_TEMP").await;
    assert_eq!(reading["value"], 30.0);

    let (_, history) = server.get("/api/sensors/ENV_TEMP/readings?limit=1").await;
    assert_eq!(history[0]["value"], 30.0);
}
