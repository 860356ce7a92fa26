use serde::{Deserialize, Serialize};

/// Resolved application label pair for one package.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppName {
    pub default_name: String,
    pub local_name: String,
}

impl AppName {
    pub fn new(default_name: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            default_name: default_name.into(),
            local_name: local_name.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.default_name.is_empty() && self.local_name.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PackageCategory {
    #[default]
    All,
    System,
    User,
}

impl PackageCategory {
    pub fn pm_flag(self) -> Option<&'static str> {
        match self {
            PackageCategory::All => None,
            PackageCategory::System => Some("-s"),
            PackageCategory::User => Some("-3"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    #[default]
    All,
    Enabled,
    Disabled,
}

impl PackageStatus {
    pub fn pm_flag(self) -> Option<&'static str> {
        match self {
            PackageStatus::All => None,
            PackageStatus::Enabled => Some("-e"),
            PackageStatus::Disabled => Some("-d"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePath {
    pub package_name: String,
    pub apk_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageListing {
    pub package_name: String,
    pub display_name: String,
    pub app_name: Option<AppName>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolveProgress {
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolveReport {
    pub serial: String,
    pub total: usize,
    pub resolved: usize,
    pub per_worker_completed: Vec<usize>,
    pub elapsed_ms: u128,
    pub cancelled: bool,
    pub finished_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandResponse<T> {
    pub trace_id: String,
    pub data: T,
}
