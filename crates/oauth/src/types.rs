use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Stored OAuth credentials for one user.
///
/// Either fully absent (user never authorized) or fully usable; callers
/// never observe a partially-initialized record. `access_token` is replaced
/// in place by the refresh sub-routine; everything else is immutable once
/// issued.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    #[serde(serialize_with = "serialize_secret")]
    pub access_token: Secret<String>,
    pub refresh: RefreshCredentials,
}

/// Everything needed to exchange a refresh token for a new access token.
#[derive(Clone, Serialize, Deserialize)]
pub struct RefreshCredentials {
    pub client_id: String,
    #[serde(serialize_with = "serialize_secret")]
    pub client_secret: Secret<String>,
    #[serde(serialize_with = "serialize_secret")]
    pub refresh_token: Secret<String>,
}

impl std::fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &"[REDACTED]")
            .field("refresh", &self.refresh)
            .finish()
    }
}

impl std::fmt::Debug for RefreshCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

/// Serialize a `Secret<String>` by exposing its inner value.
/// Use only for fields that must round-trip through token storage.
pub fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}
