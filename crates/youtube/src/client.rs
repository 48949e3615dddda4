use std::sync::Arc;

use {
    secrecy::ExposeSecret,
    tracing::{debug, info, warn},
};

use {
    youtuply_oauth::{DeviceAuthFlow, TokenStore},
    youtuply_parsing::VideoRef,
};

use crate::{Error, Result};

/// Authorized client for the playlist-item endpoint of the YouTube Data API.
pub struct PlaylistClient {
    api_base: String,
    http: reqwest::Client,
    tokens: Arc<TokenStore>,
    auth: Arc<DeviceAuthFlow>,
}

impl PlaylistClient {
    pub fn new(api_base: String, tokens: Arc<TokenStore>, auth: Arc<DeviceAuthFlow>) -> Self {
        Self {
            api_base,
            http: reqwest::Client::new(),
            tokens,
            auth,
        }
    }

    /// Public watch URL for a playlist, used in chat replies.
    pub fn playlist_url(playlist_id: &str) -> String {
        format!("https://www.youtube.com/playlist?list={playlist_id}")
    }

    /// Append `video` to `playlist_id` on behalf of `user_id`.
    ///
    /// On a 401/403 the access token is refreshed exactly once and the
    /// insert retried exactly once; a second auth failure surfaces as
    /// `NotAuthorized` rather than looping.
    pub async fn add_video(
        &self,
        user_id: &str,
        playlist_id: &str,
        video: &VideoRef,
    ) -> Result<()> {
        let record = self.tokens.get(user_id)?;

        let resp = self
            .insert_playlist_item(record.access_token.expose_secret(), playlist_id, video)
            .await?;
        let status = resp.status();
        if status.is_success() {
            info!(user_id, playlist_id, video_id = %video.video_id, "video added to playlist");
            return Ok(());
        }

        if !is_auth_failure(status) {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        // Stale access token: refresh once, retry once.
        debug!(user_id, status = status.as_u16(), "access token rejected, refreshing");
        let access_token = self.auth.refresh_access_token(&record.refresh).await?;
        self.tokens.update_access_token(user_id, access_token.clone())?;

        let retry = self
            .insert_playlist_item(access_token.expose_secret(), playlist_id, video)
            .await?;
        let status = retry.status();
        if status.is_success() {
            info!(user_id, playlist_id, video_id = %video.video_id, "video added after refresh");
            return Ok(());
        }

        if is_auth_failure(status) {
            // Freshly refreshed token still rejected; the stored grant is
            // unusable and the user has to authorize from scratch.
            warn!(user_id, status = status.as_u16(), "refreshed token rejected");
            return Err(Error::Auth(youtuply_oauth::Error::NotAuthorized {
                user_id: user_id.to_string(),
            }));
        }

        let body = retry.text().await.unwrap_or_default();
        Err(Error::RequestFailed {
            status: status.as_u16(),
            body,
        })
    }

    async fn insert_playlist_item(
        &self,
        access_token: &str,
        playlist_id: &str,
        video: &VideoRef,
    ) -> Result<reqwest::Response> {
        let url = format!("{}/playlistItems?part=snippet", self.api_base);
        let body = serde_json::json!({
            "snippet": {
                "playlistId": playlist_id,
                "resourceId": {
                    "kind": "youtube#video",
                    "videoId": video.video_id,
                },
            },
        });

        Ok(self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await?)
    }
}

fn is_auth_failure(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use {
        axum::{Router, extract::State, http::StatusCode, response::IntoResponse, routing::post},
        secrecy::Secret,
    };

    use {
        youtuply_config::OAuthClientConfig,
        youtuply_oauth::{RefreshCredentials, TokenRecord},
    };

    use super::*;

    #[derive(Default)]
    struct ApiState {
        inserts: AtomicUsize,
        refreshes: AtomicUsize,
        /// How many times to reject an insert with 401 before succeeding.
        reject_first: usize,
    }

    fn seeded_store(dir: &std::path::Path) -> Arc<TokenStore> {
        let store = Arc::new(TokenStore::new(dir));
        store
            .put("U1", &TokenRecord {
                access_token: Secret::new("at_old".into()),
                refresh: RefreshCredentials {
                    client_id: "cid".into(),
                    client_secret: Secret::new("cs".into()),
                    refresh_token: Secret::new("rt".into()),
                },
            })
            .unwrap();
        store
    }

    async fn start_mock(state: Arc<ApiState>) -> String {
        let app = Router::new()
            .route(
                "/playlistItems",
                post(|State(s): State<Arc<ApiState>>| async move {
                    let n = s.inserts.fetch_add(1, Ordering::SeqCst);
                    if n < s.reject_first {
                        (
                            StatusCode::UNAUTHORIZED,
                            axum::Json(serde_json::json!({"error": "authError"})),
                        )
                            .into_response()
                    } else {
                        axum::Json(serde_json::json!({"kind": "youtube#playlistItem"}))
                            .into_response()
                    }
                }),
            )
            .route(
                "/token",
                post(|State(s): State<Arc<ApiState>>| async move {
                    s.refreshes.fetch_add(1, Ordering::SeqCst);
                    axum::Json(serde_json::json!({"access_token": "at_new"}))
                }),
            )
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client_for(base: &str, store: Arc<TokenStore>) -> PlaylistClient {
        let auth = Arc::new(DeviceAuthFlow::new(
            OAuthClientConfig {
                client_id: "cid".into(),
                client_secret: Secret::new("cs".into()),
                device_code_url: String::new(),
                token_url: format!("{base}/token"),
                scope: String::new(),
            },
            Arc::clone(&store),
        ));
        PlaylistClient::new(base.to_string(), store, auth)
    }

    fn video() -> VideoRef {
        VideoRef {
            url: "https://youtu.be/4UuY8XdXHjg".into(),
            video_id: "4UuY8XdXHjg".into(),
        }
    }

    #[tokio::test]
    async fn add_video_succeeds_first_try() {
        let state = Arc::new(ApiState::default());
        let dir = tempfile::tempdir().unwrap();
        let base = start_mock(Arc::clone(&state)).await;
        let client = client_for(&base, seeded_store(dir.path()));

        client.add_video("U1", "PL123", &video()).await.unwrap();
        assert_eq!(state.inserts.load(Ordering::SeqCst), 1);
        assert_eq!(state.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stale_token_refreshes_once_and_retries_once() {
        let state = Arc::new(ApiState {
            reject_first: 1,
            ..Default::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let base = start_mock(Arc::clone(&state)).await;
        let store = seeded_store(dir.path());
        let client = client_for(&base, Arc::clone(&store));

        client.add_video("U1", "PL123", &video()).await.unwrap();
        assert_eq!(state.inserts.load(Ordering::SeqCst), 2);
        assert_eq!(state.refreshes.load(Ordering::SeqCst), 1);

        // The refreshed token is visible to subsequent in-process reads.
        assert_eq!(
            store.get("U1").unwrap().access_token.expose_secret(),
            "at_new"
        );
    }

    #[tokio::test]
    async fn second_auth_failure_stops_after_two_attempts() {
        let state = Arc::new(ApiState {
            reject_first: 2,
            ..Default::default()
        });
        let dir = tempfile::tempdir().unwrap();
        let base = start_mock(Arc::clone(&state)).await;
        let client = client_for(&base, seeded_store(dir.path()));

        let err = client.add_video("U1", "PL123", &video()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Auth(youtuply_oauth::Error::NotAuthorized { .. })
        ));
        // Exactly two insert attempts, never a third.
        assert_eq!(state.inserts.load(Ordering::SeqCst), 2);
        assert_eq!(state.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_credentials_never_hit_the_network() {
        let state = Arc::new(ApiState::default());
        let dir = tempfile::tempdir().unwrap();
        let base = start_mock(Arc::clone(&state)).await;
        let store = Arc::new(TokenStore::new(dir.path()));
        let client = client_for(&base, store);

        let err = client.add_video("U9", "PL123", &video()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Auth(youtuply_oauth::Error::NotAuthorized { .. })
        ));
        assert_eq!(state.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_auth_failure_is_request_failed_with_body() {
        let app = Router::new().route(
            "/playlistItems",
            post(|| async {
                (
                    StatusCode::NOT_FOUND,
                    axum::Json(serde_json::json!({"error": "playlistNotFound"})),
                )
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let base = format!("http://{addr}");

        let dir = tempfile::tempdir().unwrap();
        let client = client_for(&base, seeded_store(dir.path()));

        let err = client.add_video("U1", "PL404", &video()).await.unwrap_err();
        match err {
            Error::RequestFailed { status, body } => {
                assert_eq!(status, 404);
                assert!(body.contains("playlistNotFound"));
            },
            other => panic!("expected RequestFailed, got {other:?}"),
        }
    }
}
