use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::app::error::AppError;
use crate::app::models::AppName;

/// Package -> [`AppName`] map backed by a tab-separated file
/// (`package\tdefault_name\tlocal_name`, one record per line, no header).
#[derive(Debug, Clone)]
pub struct NameCache {
    path: PathBuf,
    order: Vec<String>,
    names: HashMap<String, AppName>,
}

impl NameCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            order: Vec::new(),
            names: HashMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, package_name: &str) -> bool {
        self.names.contains_key(package_name)
    }

    pub fn get(&self, package_name: &str) -> Option<&AppName> {
        self.names.get(package_name)
    }

    pub fn set(&mut self, package_name: impl Into<String>, name: AppName) {
        let package_name = package_name.into();
        if self.names.insert(package_name.clone(), name).is_none() {
            self.order.push(package_name);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AppName)> {
        self.order.iter().filter_map(|package_name| {
            self.names
                .get(package_name)
                .map(|name| (package_name.as_str(), name))
        })
    }

    /// Replaces the in-memory state with the backing file. A missing file leaves the cache empty.
    /// Lines that do not have exactly three fields are skipped; a repeated package is an error.
    pub fn load(&mut self, trace_id: &str) -> Result<(), AppError> {
        self.order.clear();
        self.names.clear();

        if !self.path.exists() {
            debug!(trace_id = %trace_id, path = %self.path.display(), "name cache file absent");
            return Ok(());
        }
        let raw = fs::read_to_string(&self.path).map_err(|err| {
            AppError::system(format!("Failed to read name cache: {err}"), trace_id)
        })?;

        let mut skipped = 0usize;
        for (index, line) in raw.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let &[package_name, default_name, local_name] = fields.as_slice() else {
                skipped += 1;
                continue;
            };
            if self.names.contains_key(package_name) {
                return Err(AppError::cache_corrupt(
                    format!(
                        "Duplicate package {package_name} on line {} of {}",
                        index + 1,
                        self.path.display()
                    ),
                    trace_id,
                ));
            }
            self.set(package_name, AppName::new(default_name, local_name));
        }

        info!(
            trace_id = %trace_id,
            path = %self.path.display(),
            entries = self.order.len(),
            skipped,
            "name cache loaded"
        );
        Ok(())
    }

    /// Rewrites the whole backing file.
    pub fn save(&self, trace_id: &str) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                let _ = fs::create_dir_all(parent);
            }
        }
        let file = fs::File::create(&self.path).map_err(|err| {
            AppError::system(format!("Failed to write name cache: {err}"), trace_id)
        })?;
        let mut writer = BufWriter::new(file);
        for (package_name, name) in self.iter() {
            writeln!(
                writer,
                "{package_name}\t{}\t{}",
                name.default_name, name.local_name
            )
            .map_err(|err| AppError::system(format!("Failed to write name cache: {err}"), trace_id))?;
        }
        writer
            .flush()
            .map_err(|err| AppError::system(format!("Failed to write name cache: {err}"), trace_id))?;

        debug!(
            trace_id = %trace_id,
            path = %self.path.display(),
            entries = self.order.len(),
            "name cache saved"
        );
        Ok(())
    }
}
