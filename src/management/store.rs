use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{config, error::StoreError, types::StoredAuth};

/// Key-value boundary holding the client id and the latest refresh token.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<StoredAuth, StoreError>;

    async fn save_refresh_token(&self, refresh_token: &str) -> Result<(), StoreError>;

    async fn save_client_id(&self, client_id: &str) -> Result<(), StoreError>;
}

/// JSON file store, by default `<data_local_dir>/spotauth/auth.json`.
pub struct FileStore {
    path: PathBuf,
    // serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        FileStore {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn default_path() -> PathBuf {
        config::data_dir().join("auth.json")
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn read(&self) -> Result<StoredAuth, StoreError> {
        match async_fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(StoredAuth::default()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoredAuth::default()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn write(&self, auth: &StoredAuth) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(auth)?;
        async_fs::write(&self.path, json).await?;
        Ok(())
    }

    async fn update<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut StoredAuth) + Send,
    {
        let _guard = self.lock.lock().await;
        let mut auth = self.read().await?;
        change(&mut auth);
        self.write(&auth).await
    }
}

impl Default for FileStore {
    fn default() -> Self {
        FileStore::new(Self::default_path())
    }
}

#[async_trait]
impl CredentialStore for FileStore {
    async fn load(&self) -> Result<StoredAuth, StoreError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    async fn save_refresh_token(&self, refresh_token: &str) -> Result<(), StoreError> {
        let refresh_token = refresh_token.to_string();
        self.update(move |auth| auth.refresh_token = refresh_token)
            .await
    }

    async fn save_client_id(&self, client_id: &str) -> Result<(), StoreError> {
        let client_id = client_id.to_string();
        self.update(move |auth| auth.client_id = client_id).await
    }
}

/// Store that lives only as long as the process.
#[derive(Default)]
pub struct MemoryStore {
    auth: Mutex<StoredAuth>,
}

impl MemoryStore {
    pub fn new(auth: StoredAuth) -> Self {
        MemoryStore {
            auth: Mutex::new(auth),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn load(&self) -> Result<StoredAuth, StoreError> {
        Ok(self.auth.lock().await.clone())
    }

    async fn save_refresh_token(&self, refresh_token: &str) -> Result<(), StoreError> {
        self.auth.lock().await.refresh_token = refresh_token.to_string();
        Ok(())
    }

    async fn save_client_id(&self, client_id: &str) -> Result<(), StoreError> {
        self.auth.lock().await.client_id = client_id.to_string();
        Ok(())
    }
}
