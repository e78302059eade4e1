use std::{
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A logged in session, as captured from the browser or app cookies
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub session_id: String,
    pub csrf_token: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub install_id: Option<String>,
    #[serde(default)]
    pub cookie_blob: String,
}

impl Credentials {
    /// Both the session id and the CSRF token have to be present
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.session_id.trim().is_empty() && !self.csrf_token.trim().is_empty()
    }

    /// Parse a `name=value; name=value` cookie header
    #[must_use]
    pub fn from_cookie_blob(blob: &str) -> Self {
        let mut creds = Self {
            cookie_blob: blob.trim().to_string(),
            ..Self::default()
        };

        for (name, value) in blob
            .split(';')
            .filter_map(|x| x.split_once('='))
            .map(|(k, v)| (k.trim(), v.trim().trim_matches('"')))
        {
            match name {
                "sessionid" => creds.session_id = value.to_string(),
                "csrftoken" => creds.csrf_token = value.to_string(),
                "ds_user_id" => creds.user_id = Some(value.to_string()),
                "ig_did" => creds.device_id = Some(value.to_string()),
                "mid" => creds.install_id = Some(value.to_string()),
                _ => {}
            }
        }

        creds
    }

    /// Value for the `Cookie` header
    #[must_use]
    pub fn cookie_header(&self) -> String {
        if !self.cookie_blob.is_empty() {
            return self.cookie_blob.clone();
        }

        let mut parts = vec![
            format!("sessionid={}", self.session_id),
            format!("csrftoken={}", self.csrf_token),
        ];

        if let Some(user_id) = &self.user_id {
            parts.push(format!("ds_user_id={user_id}"));
        }

        if let Some(device_id) = &self.device_id {
            parts.push(format!("ig_did={device_id}"));
        }

        if let Some(install_id) = &self.install_id {
            parts.push(format!("mid={install_id}"));
        }

        parts.join("; ")
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("session_id", &"<redacted>")
            .field("csrf_token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("device_id", &self.device_id)
            .field("install_id", &self.install_id)
            .finish_non_exhaustive()
    }
}

/// Where the resolver reads the current session from.
///
/// The resolver only ever calls [`CredentialStore::get`], once per resolve.
pub trait CredentialStore: Debug + Send + Sync {
    fn get(&self) -> Option<Credentials>;

    fn set(&self, credentials: Credentials);

    fn clear(&self);

    /// The stored credentials, if there are any and they are usable
    fn valid(&self) -> Option<Credentials> {
        self.get().filter(Credentials::is_valid)
    }
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credentials: RwLock<Option<Credentials>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new(credentials: Option<Credentials>) -> Self {
        Self {
            credentials: RwLock::new(credentials),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<Credentials> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, credentials: Credentials) {
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(credentials);
    }

    fn clear(&self) {
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Keeps the session in a JSON file so it survives restarts
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    cached: RwLock<Option<Credentials>>,
}

impl FileCredentialStore {
    #[must_use]
    pub fn new(path: &Path) -> Self {
        let cached = Self::read_file(path);

        Self {
            path: path.to_path_buf(),
            cached: RwLock::new(cached),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(path: &Path) -> Option<Credentials> {
        if !path.exists() {
            debug!(?path, "No credentials file");
            return None;
        }

        let contents = match fs::read_to_string(path) {
            Ok(x) => x,
            Err(e) => {
                warn!(?path, ?e, "Failed to read credentials file");
                return None;
            }
        };

        match serde_json::from_str::<Credentials>(&contents) {
            Ok(x) => Some(x),
            Err(e) => {
                warn!(?path, ?e, "Failed to parse credentials file");
                None
            }
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<Credentials> {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set(&self, credentials: Credentials) {
        match serde_json::to_string_pretty(&credentials) {
            Ok(json) => {
                if let Some(parent) = self.path.parent() {
                    if let Err(e) = fs::create_dir_all(parent) {
                        warn!(path = ?self.path, ?e, "Failed to create credentials directory");
                    }
                }

                if let Err(e) = fs::write(&self.path, json) {
                    warn!(path = ?self.path, ?e, "Failed to write credentials file");
                }
            }
            Err(e) => warn!(?e, "Failed to serialize credentials"),
        }

        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(credentials);
    }

    fn clear(&self) {
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!(path = ?self.path, ?e, "Failed to remove credentials file");
            }
        }

        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_needs_session_and_csrf() {
        let mut creds = Credentials::from_cookie_blob("sessionid=abc; csrftoken=def");
        assert!(creds.is_valid());

        creds.csrf_token = "   ".to_string();
        assert!(!creds.is_valid());

        assert!(!Credentials::default().is_valid());
    }

    #[test]
    fn cookie_blob_is_parsed() {
        let creds = Credentials::from_cookie_blob(
            "mid=M1; ig_did=\"D1\"; csrftoken=C1; ds_user_id=42; sessionid=S1; rur=X",
        );

        assert_eq!(creds.session_id, "S1");
        assert_eq!(creds.csrf_token, "C1");
        assert_eq!(creds.user_id.as_deref(), Some("42"));
        assert_eq!(creds.device_id.as_deref(), Some("D1"));
        assert_eq!(creds.install_id.as_deref(), Some("M1"));
        assert!(creds.cookie_header().contains("rur=X"));
    }

    #[test]
    fn cookie_header_is_rebuilt_without_blob() {
        let creds = Credentials {
            session_id: "S".to_string(),
            csrf_token: "C".to_string(),
            user_id: Some("1".to_string()),
            ..Credentials::default()
        };

        assert_eq!(creds.cookie_header(), "sessionid=S; csrftoken=C; ds_user_id=1");
    }

    #[test]
    fn debug_output_hides_secrets() {
        let creds = Credentials::from_cookie_blob("sessionid=topsecret; csrftoken=alsosecret");
        let out = format!("{creds:?}");

        assert!(!out.contains("topsecret"));
        assert!(!out.contains("alsosecret"));
    }

    #[test]
    fn memory_store_get_set_clear() {
        let store = MemoryCredentialStore::default();
        assert!(store.get().is_none());

        store.set(Credentials::from_cookie_blob("sessionid=a; csrftoken=b"));
        assert!(store.valid().is_some());

        store.set(Credentials::from_cookie_blob("sessionid=a"));
        assert!(store.get().is_some());
        assert!(store.valid().is_none());

        store.clear();
        assert!(store.get().is_none());
    }

    #[test]
    fn file_store_persists_between_instances() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("session.json");

        let store = FileCredentialStore::new(&path);
        assert!(store.get().is_none());

        store.set(Credentials::from_cookie_blob("sessionid=a; csrftoken=b"));
        assert!(path.exists());

        let reopened = FileCredentialStore::new(&path);
        assert_eq!(reopened.get().map(|x| x.session_id), Some("a".to_string()));

        reopened.clear();
        assert!(!path.exists());
        assert!(reopened.get().is_none());
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("session.json");
        fs::write(&path, "{ not json").expect("write");

        assert!(FileCredentialStore::new(&path).get().is_none());
    }
}
