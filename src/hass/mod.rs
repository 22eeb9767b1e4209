use crate::config::HomeAssistantConfig;
use crate::http::HttpClient;
use crate::sensor::SensorState;
use anyhow::Result;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tracing::{debug, error, instrument};

/// Write side of the bridge: pushes sensor state into Home Assistant through
/// its REST state API. Posting to an unknown entity id creates the entity,
/// so first publish and update are the same call.
pub struct HassClient {
    http: HttpClient,
    config: HomeAssistantConfig,
}

impl HassClient {
    pub fn new(http: HttpClient, config: HomeAssistantConfig) -> Self {
        Self { http, config }
    }

    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {}", self.config.token))?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    #[instrument(skip(self))]
    pub async fn status(&self) -> Result<()> {
        let url = format!("{}/api/", self.config.base_url());
        let body: serde_json::Value = self.http.get_json(&url, self.auth_headers()?).await?;
        debug!(
            "Home Assistant API reachable: {}",
            body.get("message").unwrap_or(&body)
        );
        Ok(())
    }

    #[instrument(skip(self, state), fields(entity_id = %entity_id))]
    pub async fn publish_sensor(&self, entity_id: &str, state: &SensorState) -> Result<()> {
        let url = self.state_url(entity_id);

        match self
            .http
            .post_json::<serde_json::Value, _>(&url, self.auth_headers()?, state)
            .await
        {
            Ok(_) => {
                debug!("Published sensor state: {}", state.state);
                Ok(())
            }
            Err(e) => {
                error!("Failed to publish sensor '{}': {}", entity_id, e);
                Err(e)
            }
        }
    }

    fn state_url(&self, entity_id: &str) -> String {
        format!("{}/api/states/sensor.{}", self.config.base_url(), entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> HassClient {
        HassClient::new(
            HttpClient::new(),
            HomeAssistantConfig {
                base_url: "http://ha:8123/".to_string(),
                token: "abc123".to_string(),
            },
        )
    }

    #[test]
    fn sensors_live_under_the_sensor_domain() {
        assert_eq!(
            client().state_url("plex_recommendations_daniel"),
            "http://ha:8123/api/states/sensor.plex_recommendations_daniel"
        );
    }

    #[test]
    fn token_is_sent_as_bearer_auth() {
        let headers = client().auth_headers().unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc123");
    }

    #[test]
    fn sensor_state_serializes_to_the_states_body() {
        let mut attributes = serde_json::Map::new();
        attributes.insert("user_id".to_string(), json!("u1"));

        let state = SensorState {
            state: "1".to_string(),
            attributes,
        };

        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({"state": "1", "attributes": {"user_id": "u1"}})
        );
    }
}
