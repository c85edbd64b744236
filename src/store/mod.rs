pub mod defaults;
pub mod record;
pub mod sanitize;

use std::borrow::Cow;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::StoreError;
pub use record::{Prompt, PromptPatch};
use sanitize::{Sanitized, sanitize};

/// Handle used by the servers; the lock is held across each write.
pub type SharedStore = Arc<Mutex<PromptStore>>;

/// The prompt collection and the file it is persisted to.
///
/// Every mutation rewrites the whole file. When that write fails the
/// in-memory change is kept and [`StoreError::Persistence`] is returned,
/// so memory is ahead of disk until the next successful write.
#[derive(Debug)]
pub struct PromptStore {
    path: PathBuf,
    prompts: Vec<Prompt>,
}

impl PromptStore {
    /// Open the store at `path`, creating its directory and seeding the
    /// default prompts when the file is absent or blank.
    pub async fn initialize(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| StoreError::StorageInit {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        let mut store = Self {
            path,
            prompts: Vec::new(),
        };
        match tokio::fs::read(&store.path).await {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes);
                if content.trim().is_empty() {
                    tracing::info!("{} is empty, writing defaults", store.path.display());
                    store.seed().await?;
                } else {
                    if let Cow::Owned(_) = content {
                        tracing::warn!(
                            "{} is not valid UTF-8, invalid bytes replaced",
                            store.path.display()
                        );
                    }
                    store.load(&content)?;
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("Creating {} with default prompts", store.path.display());
                store.seed().await?;
            }
            Err(source) => {
                return Err(StoreError::StorageInit {
                    path: store.path,
                    source,
                });
            }
        }
        Ok(store)
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot in insertion order.
    pub fn list(&self) -> Vec<Prompt> {
        self.prompts.clone()
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Prompt> {
        self.prompts.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub async fn add(&mut self, prompt: Prompt) -> Result<(), StoreError> {
        if let Some(field) = prompt.first_empty_field() {
            return Err(StoreError::InvalidRecord(format!("{field} must not be empty")));
        }
        if self.get_by_id(&prompt.id).is_some() {
            return Err(StoreError::DuplicateId(prompt.id));
        }
        tracing::debug!("Adding prompt {}", prompt.id);
        self.prompts.push(prompt);
        self.save().await
    }

    /// Overwrite the supplied fields and return the updated record.
    pub async fn update(&mut self, id: &str, patch: PromptPatch) -> Result<Prompt, StoreError> {
        let pos = self.position(id)?;
        patch.validate()?;
        patch.apply(&mut self.prompts[pos]);
        let updated = self.prompts[pos].clone();
        self.save().await?;
        Ok(updated)
    }

    /// Remove a record, returning it.
    pub async fn delete(&mut self, id: &str) -> Result<Prompt, StoreError> {
        let pos = self.position(id)?;
        let removed = self.prompts.remove(pos);
        self.save().await?;
        Ok(removed)
    }

    fn position(&self, id: &str) -> Result<usize, StoreError> {
        self.prompts
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn load(&mut self, content: &str) -> Result<(), StoreError> {
        let raw = parse_array(content).map_err(|reason| StoreError::MalformedStorage {
            path: self.path.clone(),
            reason,
        })?;
        let Sanitized { prompts, dropped } = sanitize(raw);
        for d in &dropped {
            tracing::warn!("Skipping prompt in {}: {d}", self.path.display());
        }
        tracing::debug!("Loaded {} prompts from {}", prompts.len(), self.path.display());
        self.prompts = prompts;
        Ok(())
    }

    async fn seed(&mut self) -> Result<(), StoreError> {
        self.prompts = defaults::default_prompts();
        self.write_file()
            .await
            .map_err(|source| StoreError::StorageInit {
                path: self.path.clone(),
                source,
            })
    }

    async fn save(&self) -> Result<(), StoreError> {
        self.write_file().await.map_err(|source| {
            tracing::error!("Failed to save {}: {source}", self.path.display());
            StoreError::Persistence {
                path: self.path.clone(),
                source,
            }
        })
    }

    async fn write_file(&self) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&self.prompts).map_err(std::io::Error::other)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        let written = match tokio::fs::write(&tmp, json).await {
            Ok(()) => tokio::fs::rename(&tmp, &self.path).await,
            Err(e) => Err(e),
        };
        if written.is_err() {
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        written
    }
}

fn parse_array(content: &str) -> Result<Vec<Value>, String> {
    match serde_json::from_str::<Value>(content).map_err(|e| e.to_string())? {
        Value::Array(items) => Ok(items),
        other => Err(format!("expected a JSON array, found {}", json_kind(&other))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
