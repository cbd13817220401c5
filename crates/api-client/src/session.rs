use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::{AuthResponse, User};

/// Key the bearer token is stored under between sessions.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, ApiError>;
    fn save(&self, token: &str) -> Result<(), ApiError>;
    fn clear(&self) -> Result<(), ApiError>;
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<String>, ApiError> {
        Ok(self.token.lock().clone())
    }

    fn save(&self, token: &str) -> Result<(), ApiError> {
        *self.token.lock() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), ApiError> {
        *self.token.lock() = None;
        Ok(())
    }
}

/// Keeps credentials in a small JSON object on disk, e.g. `{"auth_token": "..."}`.
/// Other keys in the file are left alone.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<HashMap<String, String>, ApiError> {
        match fs::read(&self.path) {
            Ok(raw) if raw.is_empty() => Ok(HashMap::new()),
            Ok(raw) => serde_json::from_slice(&raw).map_err(|e| ApiError::Storage(e.to_string())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(err) => Err(ApiError::Storage(err.to_string())),
        }
    }

    fn write_entries(&self, entries: &HashMap<String, String>) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                create_private_dir(parent).map_err(|e| ApiError::Storage(e.to_string()))?;
            }
        }

        let raw = serde_json::to_vec_pretty(entries).map_err(|e| ApiError::Storage(e.to_string()))?;
        write_private_file(&self.path, &raw).map_err(|e| ApiError::Storage(e.to_string()))
    }
}

/// The credentials file holds a bearer token: owner-only on unix.
#[cfg(unix)]
fn create_private_dir(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path)
}

#[cfg(unix)]
fn write_private_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation.
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    fs::write(path, contents)
}

/// Keeps the bearer token in the OS keychain under `(service, AUTH_TOKEN_KEY)`.
pub struct KeyringCredentialStore {
    entry: keyring::Entry,
}

impl KeyringCredentialStore {
    pub fn new(service: &str) -> Result<Self, ApiError> {
        let entry = keyring::Entry::new(service, AUTH_TOKEN_KEY)
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        Ok(Self { entry })
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn load(&self) -> Result<Option<String>, ApiError> {
        match self.entry.get_password() {
            Ok(token) => Ok(Some(token).filter(|t| !t.is_empty())),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(ApiError::Storage(err.to_string())),
        }
    }

    fn save(&self, token: &str) -> Result<(), ApiError> {
        self.entry
            .set_password(token)
            .map_err(|e| ApiError::Storage(e.to_string()))
    }

    fn clear(&self) -> Result<(), ApiError> {
        match self.entry.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(ApiError::Storage(err.to_string())),
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<String>, ApiError> {
        Ok(self
            .read_entries()?
            .remove(AUTH_TOKEN_KEY)
            .filter(|t| !t.is_empty()))
    }

    fn save(&self, token: &str) -> Result<(), ApiError> {
        let mut entries = self.read_entries()?;
        entries.insert(AUTH_TOKEN_KEY.to_string(), token.to_string());
        self.write_entries(&entries)
    }

    fn clear(&self) -> Result<(), ApiError> {
        let mut entries = self.read_entries()?;
        if entries.remove(AUTH_TOKEN_KEY).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

/// Ties a client to a credential store and tracks the signed-in user.
pub struct AuthSession<S: CredentialStore> {
    client: ApiClient,
    store: S,
    user: Option<User>,
}

impl<S: CredentialStore> AuthSession<S> {
    pub fn new(client: ApiClient, store: S) -> Self {
        Self {
            client,
            store,
            user: None,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Resumes a stored session. A rejected token is dropped and `Ok(None)` returned.
    pub async fn restore(&mut self) -> Result<Option<User>, ApiError> {
        let Some(token) = self.store.load()? else {
            return Ok(None);
        };

        self.client.set_auth_token(Some(token));

        match self.client.get_user().await {
            Ok(user) => {
                self.user = Some(user.clone());
                Ok(Some(user))
            }
            Err(err) if err.is_unauthenticated() => {
                tracing::info!("Stored credentials were rejected, clearing them");
                self.drop_credentials()?;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<User, ApiError> {
        let response = self.client.login(email, password).await?;
        self.accept(response)
    }

    pub async fn register(&mut self, email: &str, password: &str) -> Result<User, ApiError> {
        let response = self.client.register(email, password).await?;
        self.accept(response)
    }

    pub fn logout(&mut self) -> Result<(), ApiError> {
        self.drop_credentials()
    }

    fn accept(&mut self, response: AuthResponse) -> Result<User, ApiError> {
        self.store.save(&response.token)?;
        self.client.set_auth_token(Some(response.token));
        self.user = Some(response.user.clone());
        Ok(response.user)
    }

    fn drop_credentials(&mut self) -> Result<(), ApiError> {
        self.client.set_auth_token(None);
        self.user = None;
        self.store.clear()
    }
}
