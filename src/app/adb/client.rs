use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::app::adb::badging::parse_badging;
use crate::app::adb::parse::{parse_device_list, parse_package_list, parse_package_paths};
use crate::app::adb::runner::{CommandExecutor, ProcessExecutor};
use crate::app::config::{AppConfig, InspectionSettings};
use crate::app::models::{AppName, PackageCategory, PackagePath, PackageStatus};

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}

/// Builds bridge command lines and hands their output to the parsers.
///
/// Failures to run the bridge are logged and collapse to empty output.
pub struct AdbClient {
    program: String,
    executor: Arc<dyn CommandExecutor>,
    command_timeout: Duration,
    inspection: InspectionSettings,
}

impl AdbClient {
    pub fn new(
        program: impl Into<String>,
        executor: Arc<dyn CommandExecutor>,
        command_timeout: Duration,
        inspection: InspectionSettings,
    ) -> Self {
        Self {
            program: program.into(),
            executor,
            command_timeout,
            inspection,
        }
    }

    pub fn from_config(program: impl Into<String>, config: &AppConfig) -> Self {
        Self::new(
            program,
            Arc::new(ProcessExecutor),
            Duration::from_secs(config.adb.command_timeout_secs),
            config.inspection.clone(),
        )
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn inspection(&self) -> &InspectionSettings {
        &self.inspection
    }

    fn run(
        &self,
        serial: Option<&str>,
        command: Vec<String>,
        timeout: Duration,
        cancel_flag: Option<&AtomicBool>,
        trace_id: &str,
    ) -> Vec<String> {
        let mut full = Vec::with_capacity(command.len() + 2);
        if let Some(serial) = serial {
            full.push("-s".to_string());
            full.push(serial.to_string());
        }
        full.extend(command);

        match self
            .executor
            .execute(&self.program, &full, timeout, cancel_flag, trace_id)
        {
            Ok(output) => {
                if output.exit_code.unwrap_or_default() != 0 {
                    debug!(
                        trace_id = %trace_id,
                        args = ?full,
                        exit_code = ?output.exit_code,
                        stderr = %output.stderr.trim(),
                        "adb exited with non-zero status"
                    );
                }
                output.lines()
            }
            Err(err) => {
                warn!(
                    trace_id = %trace_id,
                    args = ?full,
                    code = %err.code,
                    error = %err.error,
                    "adb command produced no output"
                );
                Vec::new()
            }
        }
    }

    pub fn list_devices(&self, trace_id: &str) -> Vec<String> {
        let lines = self.run(None, args(&["devices"]), self.command_timeout, None, trace_id);
        parse_device_list(&lines)
    }

    pub fn list_packages(
        &self,
        serial: &str,
        category: PackageCategory,
        status: PackageStatus,
        trace_id: &str,
    ) -> Vec<String> {
        let mut command = args(&["shell", "pm", "list", "package"]);
        command.extend(category.pm_flag().map(str::to_string));
        command.extend(status.pm_flag().map(str::to_string));
        let lines = self.run(Some(serial), command, self.command_timeout, None, trace_id);
        parse_package_list(&lines)
    }

    pub fn list_packages_with_paths(&self, serial: &str, trace_id: &str) -> Vec<PackagePath> {
        let lines = self.run(
            Some(serial),
            args(&["shell", "pm", "list", "package", "-f"]),
            self.command_timeout,
            None,
            trace_id,
        );
        parse_package_paths(&lines)
    }

    pub fn set_package_enabled(
        &self,
        serial: &str,
        package_name: &str,
        enabled: bool,
        trace_id: &str,
    ) {
        let verb = if enabled { "enable" } else { "disable-user" };
        self.run(
            Some(serial),
            args(&["shell", "pm", verb, package_name]),
            self.command_timeout,
            None,
            trace_id,
        );
    }

    /// Pushes the inspection binary to the remote dir and marks it executable.
    pub fn push_inspection_tool(&self, serial: &str, trace_id: &str) {
        let local = self.inspection.resolved_local_tool_path();
        if !local.is_file() {
            warn!(
                trace_id = %trace_id,
                local_path = %local.display(),
                "inspection tool not found locally; push will fail"
            );
        }
        let local = local.to_string_lossy().to_string();
        self.run(
            Some(serial),
            args(&["push", local.as_str(), self.inspection.remote_dir.as_str()]),
            self.command_timeout,
            None,
            trace_id,
        );
        let remote = self.inspection.remote_tool_path();
        self.run(
            Some(serial),
            args(&["shell", "chmod", "0755", remote.as_str()]),
            self.command_timeout,
            None,
            trace_id,
        );
    }

    pub fn inspect_apk(
        &self,
        serial: &str,
        apk_path: &str,
        cancel_flag: Option<&AtomicBool>,
        trace_id: &str,
    ) -> Option<AppName> {
        let remote = self.inspection.remote_tool_path();
        let lines = self.run(
            Some(serial),
            args(&["shell", remote.as_str(), "d", "badging", apk_path]),
            Duration::from_secs(self.inspection.timeout_secs),
            cancel_flag,
            trace_id,
        );
        parse_badging(&lines, &self.inspection.locale)
    }
}
