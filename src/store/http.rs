//! ==============================================================================
//! store/http.rs - rest-backed sensor store
//! ==============================================================================
//!
//! purpose:
//!     the production counterpart of mock.rs. the same four operations,
//!     answered by a garden backend over http:
//!
//!         GET  {base}/sensors                       -> [reading]
//!         GET  {base}/sensors/{id}                  -> reading
//!         GET  {base}/sensors/{id}/readings?limit=n -> [history entry]
//!         PUT  {base}/sensors/{id}  {"value": n}    -> reading
//!
//! error mapping:
//!     404 on a per-sensor route is `NotFound`; every other non-2xx status,
//!     connection failure or undecodable body is `Transport`.
//!
//! ==============================================================================

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::SensorStore;
use crate::domain::{SensorHistoryEntry, SensorReading};
use crate::error::{Result, StoreError};

#[derive(Clone)]
pub struct HttpSensorStore {
    client: Client,
    base_url: Url,
}

impl HttpSensorStore {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| StoreError::Transport(format!("invalid base url {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Transport(format!("invalid base url {base_url}")));
        }
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // checked in the constructor
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// decode a response, mapping a 404 to `NotFound` when the route names a sensor
async fn decode<T: DeserializeOwned>(response: Response, sensor_id: Option<&str>) -> Result<T> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        if let Some(id) = sensor_id {
            return Err(StoreError::NotFound(id.to_string()));
        }
    }
    if !status.is_success() {
        return Err(StoreError::Transport(format!(
            "{} answered {}",
            response.url(),
            status
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| StoreError::Transport(format!("invalid response body: {e}")))
}

#[async_trait]
impl SensorStore for HttpSensorStore {
    async fn reading(&self, sensor_id: &str) -> Result<SensorReading> {
        let response = self
            .client
            .get(self.endpoint(&["sensors", sensor_id]))
            .send()
            .await?;
        decode(response, Some(sensor_id)).await
    }

    async fn all_readings(&self) -> Result<Vec<SensorReading>> {
        let response = self.client.get(self.endpoint(&["sensors"])).send().await?;
        decode(response, None).await
    }

    async fn history(&self, sensor_id: &str, limit: usize) -> Result<Vec<SensorHistoryEntry>> {
        let response = self
            .client
            .get(self.endpoint(&["sensors", sensor_id, "readings"]))
            .query(&[("limit", limit)])
            .send()
            .await?;
        decode(response, Some(sensor_id)).await
    }

    async fn update_sensor_value(&self, sensor_id: &str, value: f64) -> Result<SensorReading> {
        let response = self
            .client
            .put(self.endpoint(&["sensors", sensor_id]))
            .json(&serde_json::json!({ "value": value }))
            .send()
            .await?;
        decode(response, Some(sensor_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_segments_onto_base_path() {
        let store = HttpSensorStore::new("http://garden.local:8080/api/").unwrap();
        assert_eq!(
            store.endpoint(&["sensors", "ENV_TEMP", "readings"]).as_str(),
            "http://garden.local:8080/api/sensors/ENV_TEMP/readings"
        );

        let store = HttpSensorStore::new("http://garden.local:8080/v1").unwrap();
        assert_eq!(
            store.endpoint(&["sensors"]).as_str(),
            "http://garden.local:8080/v1/sensors"
        );
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        assert!(HttpSensorStore::new("not a url").is_err());
        assert!(HttpSensorStore::new("mailto:garden@example.com").is_err());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // port 9 (discard) on localhost is not expected to accept http
        let store = HttpSensorStore::new("http://127.0.0.1:9/api").unwrap();
        let err = store.all_readings().await.unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
    }
}
