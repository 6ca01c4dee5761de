use std::path::PathBuf;

use anyhow::{Context, bail};

use univia_storage::FolderMap;

const DEFAULT_MAX_UPLOAD_MB: usize = 50;

/// Secrets that must never reach a running server.
const PLACEHOLDER_SECRETS: &[&str] = &["dev-secret-change-me", "change-me", "changeme", "secret"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Local { dir: PathBuf, public_url: String },
    Drive { credentials: PathBuf },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub teacher_code: Option<String>,
    pub storage: StorageBackend,
    pub folders: FolderMap,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| get(key).filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string());

        let jwt_secret = get("UNIVIA_JWT_SECRET").context("UNIVIA_JWT_SECRET must be set")?;
        if jwt_secret.len() < 16 || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("UNIVIA_JWT_SECRET is a placeholder or shorter than 16 characters");
        }

        let port = var("UNIVIA_PORT", "3000").parse().context("UNIVIA_PORT is not a port number")?;
        let max_upload_mb: usize = var("UNIVIA_MAX_UPLOAD_MB", &DEFAULT_MAX_UPLOAD_MB.to_string())
            .parse()
            .context("UNIVIA_MAX_UPLOAD_MB is not a number")?;

        let public_url = var("UNIVIA_PUBLIC_URL", &format!("http://localhost:{}", port));
        let storage = match var("UNIVIA_STORAGE", "local").as_str() {
            "local" => StorageBackend::Local {
                dir: PathBuf::from(var("UNIVIA_STORAGE_DIR", "documents")),
                public_url,
            },
            "drive" => StorageBackend::Drive {
                credentials: get("UNIVIA_DRIVE_CREDENTIALS")
                    .map(PathBuf::from)
                    .context("UNIVIA_DRIVE_CREDENTIALS must be set for drive storage")?,
            },
            other => bail!("UNIVIA_STORAGE must be 'local' or 'drive', got '{}'", other),
        };

        let defaults = FolderMap::default();
        let folders = FolderMap {
            certificate: var("UNIVIA_DRIVE_FOLDER_CERTIFICATE", &defaults.certificate),
            eca: var("UNIVIA_DRIVE_FOLDER_ECA", &defaults.eca),
            leave: var("UNIVIA_DRIVE_FOLDER_LEAVE", &defaults.leave),
        };

        Ok(Self {
            host: var("UNIVIA_HOST", "0.0.0.0"),
            port,
            db_path: PathBuf::from(var("UNIVIA_DB_PATH", "univia.db")),
            jwt_secret,
            teacher_code: get("UNIVIA_TEACHER_CODE").filter(|c| !c.trim().is_empty()),
            storage,
            folders,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
        })
    }
}
