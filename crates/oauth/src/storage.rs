use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::RwLock,
};

use tracing::{debug, info, warn};

use crate::{
    Error, Result,
    types::TokenRecord,
};

/// Per-user token storage: one JSON file per user under the tokens
/// directory, with an in-memory cache in front.
///
/// `put` writes the file before touching the cache, so a failed write never
/// leaves the cache ahead of disk. `update_access_token` is cache-only; the
/// next process simply refreshes again on first use.
#[derive(Debug)]
pub struct TokenStore {
    dir: PathBuf,
    cache: RwLock<HashMap<String, TokenRecord>>,
}

impl TokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{user_id}.json"))
    }

    /// Fetch the record for `user_id`, loading it from disk on a cache miss.
    ///
    /// `NotAuthorized` when no record exists; the message tells the user to
    /// run `!ytp setup`.
    pub fn get(&self, user_id: &str) -> Result<TokenRecord> {
        if let Some(record) = self
            .cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(user_id)
        {
            return Ok(record.clone());
        }

        let record = self.load_from_disk(user_id)?;
        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user_id.to_string(), record.clone());
        debug!(user_id, "token record loaded from disk");
        Ok(record)
    }

    /// Store a freshly issued record, overwriting any previous one.
    pub fn put(&self, user_id: &str, record: &TokenRecord) -> Result<()> {
        let path = self.path_for(user_id);
        std::fs::create_dir_all(&self.dir)?;

        let data = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, &data)?;
        restrict_permissions(&path)?;

        // Disk write succeeded; only now is the cache allowed to see it.
        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user_id.to_string(), record.clone());

        info!(user_id, path = %path.display(), "token record saved");
        Ok(())
    }

    /// Replace the cached access token in place after a refresh.
    ///
    /// Not persisted synchronously; in-process `get` calls observe the new
    /// token immediately.
    pub fn update_access_token(
        &self,
        user_id: &str,
        access_token: secrecy::Secret<String>,
    ) -> Result<()> {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        if let Some(record) = cache.get_mut(user_id) {
            record.access_token = access_token;
            debug!(user_id, "access token updated in cache");
            return Ok(());
        }
        drop(cache);

        // Not cached yet: load the stored record so the update isn't lost
        // for the next `get`.
        let mut record = self.load_from_disk(user_id)?;
        record.access_token = access_token;
        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user_id.to_string(), record);
        debug!(user_id, "access token updated in cache");
        Ok(())
    }

    fn load_from_disk(&self, user_id: &str) -> Result<TokenRecord> {
        let path = self.path_for(user_id);
        let data = match std::fs::read_to_string(&path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(user_id, path = %path.display(), "no token record on disk");
                return Err(Error::NotAuthorized {
                    user_id: user_id.to_string(),
                });
            },
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&data) {
            Ok(record) => Ok(record),
            Err(e) => {
                // An unreadable record is as good as no record.
                warn!(user_id, path = %path.display(), error = %e, "token record parse failed");
                Err(Error::NotAuthorized {
                    user_id: user_id.to_string(),
                })
            },
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use secrecy::{ExposeSecret, Secret};

    use super::*;
    use crate::types::RefreshCredentials;

    fn record(token: &str) -> TokenRecord {
        TokenRecord {
            access_token: Secret::new(token.into()),
            refresh: RefreshCredentials {
                client_id: "cid".into(),
                client_secret: Secret::new("cs".into()),
                refresh_token: Secret::new("rt".into()),
            },
        }
    }

    #[test]
    fn get_without_record_is_not_authorized() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        let err = store.get("U1").unwrap_err();
        assert!(matches!(err, Error::NotAuthorized { ref user_id } if user_id == "U1"));
        assert!(err.to_string().contains("!ytp setup"));
    }

    #[test]
    fn put_then_get_from_fresh_store_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        store.put("U1", &record("at_1")).unwrap();

        // A second store over the same directory has a cold cache.
        let fresh = TokenStore::new(dir.path());
        let got = fresh.get("U1").unwrap();
        assert_eq!(got.access_token.expose_secret(), "at_1");
    }

    #[test]
    fn update_access_token_visible_to_subsequent_gets() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path());
        store.put("U1", &record("old")).unwrap();

        store
            .update_access_token("U1", Secret::new("new".into()))
            .unwrap();
        assert_eq!(store.get("U1").unwrap().access_token.expose_secret(), "new");

        // The update is cache-only; disk still has the old token.
        let fresh = TokenStore::new(dir.path());
        assert_eq!(fresh.get("U1").unwrap().access_token.expose_secret(), "old");
    }

    #[test]
    fn update_access_token_loads_record_on_cold_cache() {
        let dir = tempfile::tempdir().unwrap();
        TokenStore::new(dir.path()).put("U1", &record("old")).unwrap();

        let fresh = TokenStore::new(dir.path());
        fresh
            .update_access_token("U1", Secret::new("new".into()))
            .unwrap();
        assert_eq!(fresh.get("U1").unwrap().access_token.expose_secret(), "new");
    }

    #[test]
    fn failed_put_does_not_touch_cache() {
        let dir = tempfile::tempdir().unwrap();
        // Make the "directory" an existing file so create_dir_all fails.
        let blocker = dir.path().join("tokens");
        std::fs::write(&blocker, b"not a dir").unwrap();

        let store = TokenStore::new(&blocker);
        assert!(store.put("U1", &record("at")).is_err());
        // Nothing made it into the cache.
        assert!(store.get("U1").is_err());
    }

    #[test]
    fn corrupt_record_reads_as_not_authorized() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("U1.json"), b"{ nope").unwrap();
        let store = TokenStore::new(dir.path());
        assert!(matches!(
            store.get("U1").unwrap_err(),
            Error::NotAuthorized { .. }
        ));
    }
}
