use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app::error::AppError;

pub const DEFAULT_INSPECTION_TOOL: &str = "aapt-arm-pie";
pub const DEFAULT_REMOTE_DIR: &str = "/data/local/tmp";
pub const DEFAULT_CACHE_FILE: &str = "AppNames.tab";
pub const MAX_WORKERS: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdbSettings {
    pub command_path: String,
    pub command_timeout_secs: u64,
}

impl Default for AdbSettings {
    fn default() -> Self {
        Self {
            command_path: String::new(),
            command_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InspectionSettings {
    pub tool_name: String,
    pub local_tool_path: String,
    pub remote_dir: String,
    pub locale: String,
    pub timeout_secs: u64,
}

impl Default for InspectionSettings {
    fn default() -> Self {
        Self {
            tool_name: DEFAULT_INSPECTION_TOOL.to_string(),
            local_tool_path: String::new(),
            remote_dir: DEFAULT_REMOTE_DIR.to_string(),
            locale: "zh-CN".to_string(),
            timeout_secs: 30,
        }
    }
}

impl InspectionSettings {
    pub fn remote_tool_path(&self) -> String {
        format!("{}/{}", self.remote_dir.trim_end_matches('/'), self.tool_name)
    }

    pub fn resolved_local_tool_path(&self) -> PathBuf {
        if self.local_tool_path.trim().is_empty() {
            base_dir().join(&self.tool_name)
        } else {
            PathBuf::from(self.local_tool_path.trim())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolverSettings {
    pub worker_count: usize,
    pub retry_empty_names: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            worker_count: 12,
            retry_empty_names: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CacheSettings {
    pub file_path: String,
}

impl CacheSettings {
    pub fn resolved_file_path(&self) -> PathBuf {
        if self.file_path.trim().is_empty() {
            base_dir().join(DEFAULT_CACHE_FILE)
        } else {
            PathBuf::from(self.file_path.trim())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    pub log_level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub adb: AdbSettings,
    #[serde(default)]
    pub inspection: InspectionSettings,
    #[serde(default)]
    pub resolver: ResolverSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Directory of the running executable; falls back to the working directory.
pub fn base_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("ANDROID_PACKAGE_MANAGER_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(base_dir)
        .join("android_package_manager")
        .join("config.json")
}

pub fn load_config(trace_id: &str) -> Result<AppConfig, AppError> {
    load_config_from_path(&config_path(), trace_id)
}

pub fn save_config(config: &AppConfig, trace_id: &str) -> Result<(), AppError> {
    save_config_to_path(config, &config_path(), trace_id)
}

pub fn load_config_from_path(path: &Path, trace_id: &str) -> Result<AppConfig, AppError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|err| AppError::system(format!("Failed to read config: {err}"), trace_id))?;
    let config: AppConfig = serde_json::from_str(&raw)
        .map_err(|err| AppError::system(format!("Failed to parse config: {err}"), trace_id))?;
    Ok(validate_config(config))
}

pub fn save_config_to_path(
    config: &AppConfig,
    path: &Path,
    trace_id: &str,
) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let payload = serde_json::to_string_pretty(config)
        .map_err(|err| AppError::system(format!("Failed to serialize config: {err}"), trace_id))?;
    fs::write(path, payload)
        .map_err(|err| AppError::system(format!("Failed to write config: {err}"), trace_id))?;
    Ok(())
}

fn validate_config(mut config: AppConfig) -> AppConfig {
    if config.adb.command_timeout_secs == 0 {
        config.adb.command_timeout_secs = 30;
    }
    if config.inspection.timeout_secs == 0 {
        config.inspection.timeout_secs = 30;
    }
    if config.inspection.tool_name.trim().is_empty() {
        config.inspection.tool_name = DEFAULT_INSPECTION_TOOL.to_string();
    }
    if !config.inspection.remote_dir.starts_with('/') {
        config.inspection.remote_dir = DEFAULT_REMOTE_DIR.to_string();
    }
    config.resolver.worker_count = config.resolver.worker_count.clamp(1, MAX_WORKERS);
    if config.logging.log_level.trim().is_empty() {
        config.logging.log_level = "info".to_string();
    }
    config
}
