use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "~/.prompt-vault/config.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub mcp: McpConfig,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_storage_file")]
    pub file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            file: default_storage_file(),
        }
    }
}

impl StorageConfig {
    /// Full path of the prompts file, with `~/` expanded.
    pub fn file_path(&self) -> PathBuf {
        expand_tilde(&self.dir.to_string_lossy()).join(&self.file)
    }
}

fn default_storage_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".prompt-vault")
}

fn default_storage_file() -> String {
    "prompts.json".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Bearer token required on every request when set.
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            api_key: None,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

#[derive(Debug, Deserialize)]
pub struct McpConfig {
    #[serde(default = "default_mcp_name")]
    pub name: String,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            name: default_mcp_name(),
        }
    }
}

fn default_mcp_name() -> String {
    "prompt-vault".to_string()
}

/// Load the config file. A missing file means all defaults.
pub fn load(path: &str) -> Result<Config> {
    let path = expand_tilde(path);
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn parse(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

const DEFAULT_CONFIG: &str = r#"[storage]
dir = "~/.prompt-vault"
file = "prompts.json"

[server]
bind = "127.0.0.1:3000"
# Required when binding to a non-localhost address.
# api_key = "YOUR_API_KEY"

[mcp]
name = "prompt-vault"
"#;

/// Write a commented default config if none exists. Returns whether it wrote one.
pub async fn write_default_config(path: &str) -> Result<bool> {
    let path = expand_tilde(path);
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, DEFAULT_CONFIG)
        .await
        .with_context(|| format!("Failed to write config: {}", path.display()))?;
    Ok(true)
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

pub fn display_path(path: &Path) -> String {
    match dirs::home_dir().and_then(|home| path.strip_prefix(home).ok().map(Path::to_path_buf)) {
        Some(rel) => format!("~/{}", rel.display()),
        None => path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let cfg = parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(cfg.storage.file, "prompts.json");
        assert_eq!(cfg.server.bind, "127.0.0.1:3000");
        assert!(cfg.server.api_key.is_none());
        assert_eq!(cfg.mcp.name, "prompt-vault");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg.storage.file, "prompts.json");
        assert!(cfg.storage.file_path().ends_with(".prompt-vault/prompts.json"));
    }

    #[test]
    fn test_partial_sections() {
        let cfg = parse(
            r#"
            [storage]
            dir = "/srv/vault"

            [server]
            api_key = "secret"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.storage.file_path(), PathBuf::from("/srv/vault/prompts.json"));
        assert_eq!(cfg.server.api_key.as_deref(), Some("secret"));
        assert_eq!(cfg.server.bind, "127.0.0.1:3000");
    }

    #[test]
    fn test_invalid_config_is_error() {
        assert!(parse("[storage]\ndir = 5").is_err());
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_tilde("relative"), PathBuf::from("relative"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/x/y"), home.join("x/y"));
        }
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("absent.toml");
        let cfg = load(&path.to_string_lossy()).unwrap();
        assert_eq!(cfg.mcp.name, "prompt-vault");
    }

    #[tokio::test]
    async fn test_write_default_config_once() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.toml");
        let path = path.to_string_lossy().to_string();
        assert!(write_default_config(&path).await.unwrap());
        assert!(!write_default_config(&path).await.unwrap());
        assert_eq!(load(&path).unwrap().server.bind, "127.0.0.1:3000");
    }
}
