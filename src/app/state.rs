use std::sync::{Mutex, MutexGuard};

use tracing::{info, warn};

use crate::app::adb::client::AdbClient;
use crate::app::adb::locator::{resolve_adb_program, validate_adb_program};
use crate::app::config::AppConfig;
use crate::app::error::AppError;
use crate::app::name_cache::NameCache;

/// Everything a command needs, built once at startup and passed by reference.
pub struct AppState {
    pub config: AppConfig,
    pub client: AdbClient,
    cache: Mutex<NameCache>,
}

impl AppState {
    /// Resolves the adb program and loads the name cache from disk.
    pub fn new(config: AppConfig, trace_id: &str) -> Result<Self, AppError> {
        let program = resolve_adb_program(&config.adb.command_path);
        if let Err(message) = validate_adb_program(&program) {
            warn!(trace_id = %trace_id, program = %program, error = %message, "adb validation failed");
            return Err(AppError::validation(message, trace_id));
        }
        let client = AdbClient::from_config(program, &config);
        let mut cache = NameCache::new(config.cache.resolved_file_path());
        cache.load(trace_id)?;
        info!(
            trace_id = %trace_id,
            adb = %client.program(),
            cache_path = %cache.path().display(),
            "app state ready"
        );
        Ok(Self::with_parts(config, client, cache))
    }

    pub fn with_parts(config: AppConfig, client: AdbClient, cache: NameCache) -> Self {
        Self {
            config,
            client,
            cache: Mutex::new(cache),
        }
    }

    pub fn cache(&self, trace_id: &str) -> Result<MutexGuard<'_, NameCache>, AppError> {
        self.cache.lock().map_err(|_| {
            warn!(trace_id = %trace_id, "name cache lock poisoned");
            AppError::system("Failed to access the name cache. Please try again.", trace_id)
        })
    }
}
