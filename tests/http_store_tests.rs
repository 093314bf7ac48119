//! `HttpSensorStore` against the crate's own rest surface.

use std::sync::Arc;

use garden_monitor::scheduler::ManualScheduler;
use garden_monitor::server;
use garden_monitor::store::LatencyProfile;
use garden_monitor::{
    FetchOutcome, HttpSensorStore, MockSensorStore, PollingSession, SensorId, SensorStore,
    SessionOptions, StoreError,
};
use tokio::net::TcpListener;

async fn backend() -> (HttpSensorStore, Arc<MockSensorStore>) {
    let mock = Arc::new(MockSensorStore::seeded(LatencyProfile::instant()));
    let session = Arc::new(PollingSession::new(
        mock.clone(),
        Arc::new(ManualScheduler::new()),
        SessionOptions::default(),
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, session, std::future::pending()));

    let store = HttpSensorStore::new(&format!("http://{addr}/api")).unwrap();
    (store, mock)
}

#[tokio::test]
async fn test_bulk_read_over_http_keeps_order() {
    let (store, _) = backend().await;

    let readings = store.all_readings().await.unwrap();
    let ids: Vec<_> = readings.iter().map(|r| r.sensor_id).collect();

    assert_eq!(ids, SensorId::ALL.to_vec());
}

#[tokio::test]
async fn test_point_read_and_unknown_sensor() {
    let (store, _) = backend().await;

    let reading = store.reading("ENV_TEMP").await.unwrap();
    assert_eq!(reading.value, 24.0);
    assert_eq!(reading.unit, "°C");

    assert_eq!(
        store.reading("BOGUS").await.unwrap_err(),
        StoreError::NotFound("BOGUS".to_string())
    );
    assert!(store.history("BOGUS", 5).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_update_then_read_back() {
    let (store, _) = backend().await;

    let updated = store.update_sensor_value("ENV_TEMP", 30.0).await.unwrap();
    assert_eq!(updated.value, 30.0);

    assert_eq!(store.reading("ENV_TEMP").await.unwrap().value, 30.0);
    let history = store.history("ENV_TEMP", 1).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].value, 30.0);
}

#[tokio::test]
async fn test_backend_failure_is_transport_error() {
    let (store, mock) = backend().await;
    mock.set_offline(true);

    assert!(matches!(
        store.all_readings().await,
        Err(StoreError::Transport(_))
    ));
}

#[tokio::test]
async fn test_session_over_http_store() {
    let (store, mock) = backend().await;
    let session = PollingSession::new(
        Arc::new(store),
        Arc::new(ManualScheduler::new()),
        SessionOptions::default(),
    );

    assert_eq!(session.refresh_now().await, FetchOutcome::Applied);
    assert!(session.snapshot().is_complete());

    mock.set_offline(true);
    assert_eq!(session.refresh_now().await, FetchOutcome::Failed);
    assert!(session.snapshot().is_complete());
    assert!(session.last_error().is_some());
}
