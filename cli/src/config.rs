use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::env;
use std::path::PathBuf;

use smartfridge_core::models::anonymous_principal;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const PRINCIPAL_ENV: &str = "SMARTFRIDGE_PRINCIPAL";

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let proj_dirs = ProjectDirs::from("", "", "smartfridge")
            .context("Could not determine home directory")?;

        let mut config = Self::with_data_dir(proj_dirs.data_dir().to_path_buf())?;
        config.gemini_api_key = env::var("GEMINI_API_KEY")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        if let Ok(model) = env::var("GEMINI_MODEL") {
            if !model.trim().is_empty() {
                config.gemini_model = model.trim().to_string();
            }
        }
        Ok(config)
    }

    pub fn with_data_dir(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("smartfridge.db");

        Ok(Config {
            db_path,
            data_dir,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
        })
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.gemini_api_key
            .as_deref()
            .context("GEMINI_API_KEY is not set. Export it or add it to a .env file")
    }

    /// Resolve the principal that scopes every stored record.
    ///
    /// Returns `(principal, newly_created)`.
    pub fn load_or_create_principal(&self) -> Result<(String, bool)> {
        self.resolve_principal(env::var(PRINCIPAL_ENV).ok())
    }

    fn resolve_principal(&self, from_env: Option<String>) -> Result<(String, bool)> {
        if let Some(principal) = from_env.map(|p| p.trim().to_string()) {
            if !principal.is_empty() {
                return Ok((principal, false));
            }
        }

        let path = self.data_dir.join("principal");

        if path.exists() {
            let principal =
                std::fs::read_to_string(&path).context("Failed to read principal file")?;
            let principal = principal.trim().to_string();
            if !principal.is_empty() {
                return Ok((principal, false));
            }
        }

        let principal = anonymous_principal();
        std::fs::write(&path, &principal).context("Failed to write principal file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to set principal file permissions")?;
        }
        tracing::info!(%principal, "created anonymous principal");
        Ok((principal, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_data_dir(dir.path().to_path_buf()).unwrap();

        let (first, created) = config.resolve_principal(None).unwrap();
        assert!(created);
        assert!(uuid_like(&first));

        let (second, created) = config.resolve_principal(None).unwrap();
        assert!(!created);
        assert_eq!(first, second);
    }

    #[test]
    fn test_principal_env_override() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::with_data_dir(dir.path().to_path_buf()).unwrap();

        let (principal, created) = config
            .resolve_principal(Some(" kitchen-tablet ".to_string()))
            .unwrap();
        assert_eq!(principal, "kitchen-tablet");
        assert!(!created);
        assert!(!dir.path().join("principal").exists());

        let (_, created) = config.resolve_principal(Some(String::new())).unwrap();
        assert!(created);
    }

    #[test]
    fn test_db_path_inside_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        let config = Config::with_data_dir(nested.clone()).unwrap();
        assert!(nested.is_dir());
        assert_eq!(config.db_path, nested.join("smartfridge.db"));
        assert_eq!(config.gemini_model, DEFAULT_GEMINI_MODEL);
        assert!(config.require_api_key().is_err());
    }

    fn uuid_like(s: &str) -> bool {
        s.len() == 36 && s.chars().filter(|c| *c == '-').count() == 4
    }
}
