use std::{sync::Arc, time::Duration};

use {
    reqwest::StatusCode,
    secrecy::{ExposeSecret, Secret},
    tokio::time::Instant,
    tracing::{debug, info, warn},
};

use youtuply_config::OAuthClientConfig;

use crate::{
    Error, Result,
    storage::TokenStore,
    types::{RefreshCredentials, TokenRecord},
};

/// RFC 8628 grant type for the device-code exchange.
const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Response from the device code request.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DeviceCodeResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_url: String,
    #[serde(default = "default_interval")]
    pub interval: u64,
    pub expires_in: u64,
}

fn default_interval() -> u64 {
    5
}

#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct RefreshResponse {
    access_token: String,
}

/// How a device flow concluded.
///
/// These are expected outcomes, not errors; only transport-level failures
/// surface as `Err` from [`DeviceAuthFlow::authorize`].
#[derive(Debug)]
pub enum DeviceFlowOutcome {
    Authorized(TokenRecord),
    /// The user explicitly denied the authorization request.
    Denied,
    /// The verification window elapsed before the user acted.
    Expired,
    /// Unexpected auth-service response, carrying the server payload.
    Failed(String),
}

/// Runs the OAuth 2.0 device authorization grant and the refresh-token
/// exchange against the configured endpoints.
pub struct DeviceAuthFlow {
    config: OAuthClientConfig,
    client: reqwest::Client,
    store: Arc<TokenStore>,
}

impl DeviceAuthFlow {
    pub fn new(config: OAuthClientConfig, store: Arc<TokenStore>) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            store,
        }
    }

    /// Request a device code scoped to playlist management.
    pub async fn request_device_code(&self) -> Result<DeviceCodeResponse> {
        let resp = self
            .client
            .post(&self.config.device_code_url)
            .header("Accept", "application/json")
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("scope", self.config.scope.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::AuthService(format!(
                "device code request failed: {body}"
            )));
        }

        Ok(resp.json().await?)
    }

    /// Run the full device flow for `user_id`.
    ///
    /// `notify` is invoked once with the verification URL and user code so
    /// the host can prompt the human. The token endpoint is then polled at
    /// the server-specified interval until the user acts, denies, or the
    /// server-specified window expires. On success the record is persisted
    /// through the token store before it is returned.
    pub async fn authorize<F, Fut>(&self, user_id: &str, notify: F) -> Result<DeviceFlowOutcome>
    where
        F: FnOnce(String, String) -> Fut,
        Fut: Future<Output = ()>,
    {
        let code = self.request_device_code().await?;
        info!(
            user_id,
            interval = code.interval,
            expires_in = code.expires_in,
            "device flow started"
        );
        notify(code.verification_url.clone(), code.user_code.clone()).await;

        let deadline = Instant::now() + Duration::from_secs(code.expires_in);

        loop {
            tokio::time::sleep(Duration::from_secs(code.interval)).await;
            debug!(user_id, "polling token endpoint");

            let resp = self
                .client
                .post(&self.config.token_url)
                .header("Accept", "application/json")
                .form(&[
                    ("client_id", self.config.client_id.as_str()),
                    ("client_secret", self.config.client_secret.expose_secret().as_str()),
                    ("device_code", code.device_code.as_str()),
                    ("grant_type", DEVICE_GRANT_TYPE),
                ])
                .send()
                .await?;

            let status = resp.status();
            if status.is_success() {
                let token: TokenResponse = resp.json().await?;
                let Some(refresh_token) = token.refresh_token else {
                    return Ok(DeviceFlowOutcome::Failed(
                        "token response missing refresh_token".into(),
                    ));
                };
                let record = TokenRecord {
                    access_token: Secret::new(token.access_token),
                    refresh: RefreshCredentials {
                        client_id: self.config.client_id.clone(),
                        client_secret: self.config.client_secret.clone(),
                        refresh_token: Secret::new(refresh_token),
                    },
                };
                self.store.put(user_id, &record)?;
                info!(user_id, "device flow authorized");
                return Ok(DeviceFlowOutcome::Authorized(record));
            }

            if status == StatusCode::FORBIDDEN {
                info!(user_id, "device flow denied by user");
                return Ok(DeviceFlowOutcome::Denied);
            }

            // 428 means the user hasn't entered the code yet; keep polling.
            if status != StatusCode::PRECONDITION_REQUIRED {
                let body = resp.text().await.unwrap_or_default();
                warn!(user_id, status = status.as_u16(), "device flow poll failed");
                return Ok(DeviceFlowOutcome::Failed(body));
            }

            if Instant::now() >= deadline {
                info!(user_id, "device flow expired before authorization");
                return Ok(DeviceFlowOutcome::Expired);
            }
        }
    }

    /// Exchange refresh credentials for a new access token.
    ///
    /// A rejected exchange means the stored credentials are no longer good
    /// for anything; the caller must run the full device flow again.
    pub async fn refresh_access_token(
        &self,
        refresh: &RefreshCredentials,
    ) -> Result<Secret<String>> {
        let resp = self
            .client
            .post(&self.config.token_url)
            .header("Accept", "application/json")
            .form(&[
                ("client_id", refresh.client_id.as_str()),
                ("client_secret", refresh.client_secret.expose_secret().as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh.refresh_token.expose_secret().as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            warn!(status = resp.status().as_u16(), "refresh token exchange rejected");
            return Err(Error::RefreshFailed);
        }

        let body: RefreshResponse = resp.json().await?;
        debug!("access token refreshed");
        Ok(Secret::new(body.access_token))
    }
}
