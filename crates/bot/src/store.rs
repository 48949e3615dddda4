use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{Result, settings::BotSettings};

/// Result of reading one settings file off disk.
#[derive(Debug)]
pub struct LoadedSettings {
    /// User id recovered from the filename, usable even when the file body
    /// is unreadable.
    pub user_hint: String,
    /// Server id recovered from the filename; empty for the bare legacy
    /// form.
    pub server_hint: String,
    pub result: Result<BotSettings>,
}

/// One JSON file per instance under the instances directory.
///
/// Current files are named `{server_id}_{user_id}.json`; instances set up
/// over DM (no server) and files from older deployments use the bare
/// `{user_id}.json` form. Both load.
#[derive(Debug)]
pub struct SettingsStore {
    dir: PathBuf,
}

impl SettingsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, settings: &BotSettings) -> PathBuf {
        let stem = if settings.server_id.is_empty() {
            settings.user_id.clone()
        } else {
            format!("{}_{}", settings.server_id, settings.user_id)
        };
        self.dir.join(format!("{stem}.json"))
    }

    /// Persist the full snapshot, overwriting the previous file.
    pub fn save(&self, settings: &BotSettings) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(settings);
        let data = serde_json::to_string_pretty(settings)?;
        std::fs::write(&path, &data)?;
        info!(user_id = %settings.user_id, path = %path.display(), "instance settings saved");
        Ok(())
    }

    /// Read every `*.json` file in the directory.
    ///
    /// Unreadable files are reported per entry rather than aborting the
    /// whole load; a missing directory is an empty deployment, not an
    /// error.
    pub fn load_all(&self) -> Result<Vec<LoadedSettings>> {
        if !self.dir.exists() {
            debug!(dir = %self.dir.display(), "no instances directory yet");
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut out = Vec::with_capacity(paths.len());
        for path in paths {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default();
            let (server_hint, user_hint) = split_stem(stem);
            let result = std::fs::read_to_string(&path)
                .map_err(crate::Error::from)
                .and_then(|data| Ok(serde_json::from_str(&data)?));
            out.push(LoadedSettings {
                user_hint,
                server_hint,
                result,
            });
        }
        Ok(out)
    }
}

/// Best-effort split of a settings filename stem into (server, user).
fn split_stem(stem: &str) -> (String, String) {
    match stem.split_once('_') {
        Some((server, user)) => (server.to_string(), user.to_string()),
        None => (String::new(), stem.to_string()),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn settings(user: &str, server: &str) -> BotSettings {
        let mut s = BotSettings::new(user);
        s.server_id = server.to_string();
        s.server_name = if server.is_empty() {
            String::new()
        } else {
            format!("guild {server}")
        };
        s
    }

    #[test]
    fn save_uses_server_and_user_in_filename() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        store.save(&settings("U1", "S1")).unwrap();
        assert!(dir.path().join("S1_U1.json").exists());
    }

    #[test]
    fn save_without_server_uses_bare_user_filename() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        store.save(&settings("U1", "")).unwrap();
        assert!(dir.path().join("U1.json").exists());
    }

    #[test]
    fn load_all_roundtrips_and_accepts_legacy_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());

        let mut a = settings("U1", "S1");
        a.connections.insert("C1".into(), "PL1".into());
        store.save(&a).unwrap();

        // Legacy bare-user file written by an older deployment.
        std::fs::write(
            dir.path().join("U2.json"),
            serde_json::to_string(&settings("U2", "")).unwrap(),
        )
        .unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 2);

        let s1 = loaded
            .iter()
            .find(|l| l.user_hint == "U1")
            .expect("S1_U1 entry");
        assert_eq!(s1.server_hint, "S1");
        let parsed = s1.result.as_ref().unwrap();
        assert_eq!(parsed.connections.get("C1").map(String::as_str), Some("PL1"));

        let s2 = loaded
            .iter()
            .find(|l| l.user_hint == "U2")
            .expect("legacy U2 entry");
        assert_eq!(s2.server_hint, "");
        assert!(s2.result.is_ok());
    }

    #[test]
    fn load_all_reports_corrupt_files_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        store.save(&settings("U1", "S1")).unwrap();
        std::fs::write(dir.path().join("S9_U9.json"), b"{ nope").unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
        let bad = loaded.iter().find(|l| l.user_hint == "U9").unwrap();
        assert_eq!(bad.server_hint, "S9");
        assert!(bad.result.is_err());
        // The well-formed neighbor still loads.
        assert!(loaded.iter().any(|l| l.user_hint == "U1" && l.result.is_ok()));
    }

    #[test]
    fn load_all_on_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("never-created"));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn load_all_ignores_non_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        std::fs::write(dir.path().join("README.txt"), b"notes").unwrap();
        assert!(store.load_all().unwrap().is_empty());
    }
}
