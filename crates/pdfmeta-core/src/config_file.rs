use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Config;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub extraction: Option<ExtractionConfig>,
    pub ingest: Option<IngestConfig>,
    pub catalog: Option<CatalogConfig>,
    pub sessions: Option<SessionsConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub max_pages: Option<usize>,
    pub min_text_chars: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestConfig {
    pub max_workers: Option<usize>,
    pub max_files_per_batch: Option<usize>,
    pub max_upload_mb: Option<u64>,
    pub allowed_extensions: Option<Vec<String>>,
    pub upload_dir: Option<String>,
    pub database_path: Option<String>,
    pub per_file_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub production_type: Option<String>,
    pub status: Option<String>,
    pub status_color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionsConfig {
    pub max_age_hours: Option<u64>,
}

/// Platform config directory path: `<config_dir>/pdfmeta/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pdfmeta").join("config.toml"))
}

/// Load config by cascading CWD `.pdfmeta.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".pdfmeta.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
            None
        }
    }
}

fn pick<S, T>(overlay: Option<&S>, base: Option<&S>, get: impl Fn(&S) -> Option<T>) -> Option<T> {
    overlay.and_then(&get).or_else(|| base.and_then(&get))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let (be, oe) = (base.extraction.as_ref(), overlay.extraction.as_ref());
    let (bi, oi) = (base.ingest.as_ref(), overlay.ingest.as_ref());
    let (bc, oc) = (base.catalog.as_ref(), overlay.catalog.as_ref());
    let (bs, os) = (base.sessions.as_ref(), overlay.sessions.as_ref());

    ConfigFile {
        extraction: Some(ExtractionConfig {
            max_pages: pick(oe, be, |e| e.max_pages),
            min_text_chars: pick(oe, be, |e| e.min_text_chars),
        }),
        ingest: Some(IngestConfig {
            max_workers: pick(oi, bi, |i| i.max_workers),
            max_files_per_batch: pick(oi, bi, |i| i.max_files_per_batch),
            max_upload_mb: pick(oi, bi, |i| i.max_upload_mb),
            allowed_extensions: pick(oi, bi, |i| i.allowed_extensions.clone()),
            upload_dir: pick(oi, bi, |i| i.upload_dir.clone()),
            database_path: pick(oi, bi, |i| i.database_path.clone()),
            per_file_timeout_secs: pick(oi, bi, |i| i.per_file_timeout_secs),
        }),
        catalog: Some(CatalogConfig {
            production_type: pick(oc, bc, |c| c.production_type.clone()),
            status: pick(oc, bc, |c| c.status.clone()),
            status_color: pick(oc, bc, |c| c.status_color.clone()),
        }),
        sessions: Some(SessionsConfig {
            max_age_hours: pick(os, bs, |s| s.max_age_hours),
        }),
    }
}

/// Apply every value present in `file` onto `config`, leaving the rest alone.
pub fn apply(file: &ConfigFile, config: &mut Config) {
    if let Some(e) = &file.extraction {
        if let Some(v) = e.max_pages {
            config.max_pages = v;
        }
        if let Some(v) = e.min_text_chars {
            config.min_text_chars = v;
        }
    }
    if let Some(i) = &file.ingest {
        if let Some(v) = i.max_workers {
            config.max_workers = v.max(1);
        }
        if let Some(v) = i.max_files_per_batch {
            config.max_files_per_batch = v;
        }
        if let Some(v) = i.max_upload_mb {
            config.max_upload_bytes = v * 1024 * 1024;
        }
        if let Some(v) = &i.allowed_extensions {
            config.allowed_extensions = v.iter().map(|ext| ext.to_lowercase()).collect();
        }
        if let Some(v) = &i.upload_dir {
            config.upload_dir = PathBuf::from(v);
        }
        if let Some(v) = &i.database_path {
            config.database_path = PathBuf::from(v);
        }
        if let Some(v) = i.per_file_timeout_secs {
            config.per_file_timeout = Duration::from_secs(v);
        }
    }
    if let Some(c) = &file.catalog {
        if let Some(v) = &c.production_type {
            config.catalog.production_type = v.clone();
        }
        if let Some(v) = &c.status {
            config.catalog.status = v.clone();
        }
        if let Some(v) = &c.status_color {
            config.catalog.status_color = v.clone();
        }
    }
    if let Some(s) = &file.sessions
        && let Some(v) = s.max_age_hours
    {
        config.session_max_age = Duration::from_secs(v * 3600);
    }
}

/// Environment variables that override file configuration.
pub const ENV_UPLOAD_DIR: &str = "PDFMETA_UPLOAD_DIR";
pub const ENV_DATABASE: &str = "PDFMETA_DATABASE";
pub const ENV_MAX_WORKERS: &str = "PDFMETA_MAX_WORKERS";

/// Apply `PDFMETA_*` overrides. `lookup` is `std::env::var` in the binaries.
/// Unparseable values are ignored with a warning.
pub fn apply_env(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup(ENV_UPLOAD_DIR).filter(|v| !v.is_empty()) {
        config.upload_dir = PathBuf::from(v);
    }
    if let Some(v) = lookup(ENV_DATABASE).filter(|v| !v.is_empty()) {
        config.database_path = PathBuf::from(v);
    }
    if let Some(v) = lookup(ENV_MAX_WORKERS) {
        match v.trim().parse::<usize>() {
            Ok(n) => config.max_workers = n.max(1),
            Err(_) => tracing::warn!(value = %v, "ignoring invalid {ENV_MAX_WORKERS}"),
        }
    }
}

/// Defaults, then the config file cascade, then environment overrides.
pub fn resolve_config() -> Config {
    let mut config = Config::default();
    apply(&load_config(), &mut config);
    apply_env(&mut config, |key| std::env::var(key).ok());
    config
}

impl From<&Config> for ConfigFile {
    /// A fully populated file describing `config`, e.g. to seed a new
    /// config file with the defaults.
    fn from(config: &Config) -> Self {
        Self {
            extraction: Some(ExtractionConfig {
                max_pages: Some(config.max_pages),
                min_text_chars: Some(config.min_text_chars),
            }),
            ingest: Some(IngestConfig {
                max_workers: Some(config.max_workers),
                max_files_per_batch: Some(config.max_files_per_batch),
                max_upload_mb: Some(config.max_upload_bytes / (1024 * 1024)),
                allowed_extensions: Some(config.allowed_extensions.clone()),
                upload_dir: Some(config.upload_dir.to_string_lossy().into_owned()),
                database_path: Some(config.database_path.to_string_lossy().into_owned()),
                per_file_timeout_secs: Some(config.per_file_timeout.as_secs()),
            }),
            catalog: Some(CatalogConfig {
                production_type: Some(config.catalog.production_type.clone()),
                status: Some(config.catalog.status.clone()),
                status_color: Some(config.catalog.status_color.clone()),
            }),
            sessions: Some(SessionsConfig {
                max_age_hours: Some(config.session_max_age.as_secs() / 3600),
            }),
        }
    }
}

/// Save the config to the platform config directory.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, String> {
    let path = config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(&path, content).map_err(|e| format!("Failed to write config: {}", e))?;
    Ok(path)
}
