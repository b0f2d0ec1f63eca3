use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::hub::transport::Transport;

/// REST client for the external pub-sub delivery service. Covers the two
/// calls the hub needs: issuing client access tokens at negotiation time and
/// pushing messages to individual connections.
#[derive(Debug)]
pub struct PubSubClient {
    client: Client,
    endpoint: String,
    access_key: String,
    hub: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    aud: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    roles: Vec<String>,
    exp: usize,
}

impl PubSubClient {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to build reqwest client");

        let access_key = config.pubsub_access_key.clone().unwrap_or_else(|| {
            warn!("No pub-sub access key configured, the delivery service will reject sends");
            String::new()
        });

        Self {
            client,
            endpoint: config.pubsub_endpoint.trim_end_matches('/').to_string(),
            access_key,
            hub: config.pubsub_hub.clone(),
        }
    }

    fn generate_token(
        &self,
        audience: &str,
        subject: Option<String>,
        roles: Vec<String>,
        ttl_seconds: i64,
    ) -> String {
        let expiration = Utc::now()
            .checked_add_signed(Duration::seconds(ttl_seconds))
            .expect("valid timestamp")
            .timestamp();

        let claims = Claims {
            aud: audience.to_string(),
            sub: subject,
            roles,
            exp: expiration as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.access_key.as_bytes()),
        )
        .expect("Failed to generate JWT")
    }

    /// Build the connection URL a negotiating client uses to reach the
    /// pub-sub service, with an access token scoped to its group.
    pub fn client_access_url(&self, group: &str, user: &str) -> String {
        let audience = format!("{}/client/hubs/{}", self.endpoint, self.hub);
        let roles = vec![
            format!("pubsub.sendToGroup.{}", group),
            format!("pubsub.joinLeaveGroup.{}", group),
        ];
        let token = self.generate_token(&audience, Some(user.to_string()), roles, 3600);

        let ws_endpoint = self.endpoint.replacen("http", "ws", 1);
        format!(
            "{}/client/hubs/{}?access_token={}",
            ws_endpoint, self.hub, token
        )
    }
}

impl Transport for PubSubClient {
    /// Fire-and-forget delivery: the REST call runs on its own task so relay
    /// code never blocks on the transport, and a failed send is only logged.
    fn send_to_connection(&self, connection_id: &str, payload: Vec<u8>) {
        let url = format!(
            "{}/api/hubs/{}/connections/{}/:send?api-version=2024-01-01",
            self.endpoint, self.hub, connection_id
        );
        let token = self.generate_token(&url, None, Vec::new(), 60);
        let client = self.client.clone();
        let connection_id = connection_id.to_string();

        tokio::spawn(async move {
            let result = client
                .post(&url)
                .bearer_auth(token)
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(payload)
                .send()
                .await;
            match result {
                Ok(response) if response.status().is_success() => {
                    debug!("Sent message to connection {}", connection_id);
                }
                Ok(response) => {
                    warn!(
                        "Pub-sub send to {} failed: {}",
                        connection_id,
                        response.status()
                    );
                }
                Err(e) => {
                    warn!("Pub-sub send to {} failed: {}", connection_id, e);
                }
            }
        });
    }
}
