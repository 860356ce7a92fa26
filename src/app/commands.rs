use tracing::info;
use uuid::Uuid;

use crate::app::error::AppError;
use crate::app::models::{
    CommandResponse, PackageCategory, PackageListing, PackageStatus, ResolveProgress,
    ResolveReport,
};
use crate::app::packages::{filter_packages, package_from_display};
use crate::app::resolver::{NameResolver, ResolveOptions};
use crate::app::state::AppState;

pub fn resolve_trace_id(input: Option<String>) -> String {
    input
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn ensure_non_empty(value: &str, field: &str, trace_id: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} is required"), trace_id));
    }
    Ok(())
}

pub fn list_devices(
    state: &AppState,
    trace_id: Option<String>,
) -> Result<CommandResponse<Vec<String>>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    info!(trace_id = %trace_id, "list_devices");
    let devices = state.client.list_devices(&trace_id);
    Ok(CommandResponse {
        trace_id,
        data: devices,
    })
}

/// The requested serial, or the only attached device when none was given.
pub fn select_device(
    state: &AppState,
    serial: Option<String>,
    trace_id: Option<String>,
) -> Result<CommandResponse<String>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    if let Some(serial) = serial.filter(|value| !value.trim().is_empty()) {
        return Ok(CommandResponse {
            trace_id,
            data: serial.trim().to_string(),
        });
    }
    let mut devices = state.client.list_devices(&trace_id);
    match devices.len() {
        0 => Err(AppError::validation("No adb devices found.", &trace_id)),
        1 => Ok(CommandResponse {
            data: devices.remove(0),
            trace_id,
        }),
        _ => Err(AppError::validation(
            format!(
                "Multiple devices found ({}). Set ANDROID_SERIAL or pass --serial.",
                devices.join(", ")
            ),
            &trace_id,
        )),
    }
}

pub fn list_packages(
    state: &AppState,
    serial: String,
    category: PackageCategory,
    status: PackageStatus,
    filter: Option<String>,
    trace_id: Option<String>,
) -> Result<CommandResponse<Vec<PackageListing>>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    ensure_non_empty(&serial, "serial", &trace_id)?;
    info!(trace_id = %trace_id, serial = %serial, ?category, ?status, "list_packages");

    let packages = state
        .client
        .list_packages(&serial, category, status, &trace_id);
    let cache = state.cache(&trace_id)?;
    let listings = filter_packages(&packages, &cache, filter.as_deref().unwrap_or_default());
    drop(cache);
    Ok(CommandResponse {
        trace_id,
        data: listings,
    })
}

/// `package_name` may also be a full listing line (`pkg=local=default`).
pub fn set_package_enabled(
    state: &AppState,
    serial: String,
    package_name: String,
    enabled: bool,
    trace_id: Option<String>,
) -> Result<CommandResponse<String>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    ensure_non_empty(&serial, "serial", &trace_id)?;
    ensure_non_empty(&package_name, "package_name", &trace_id)?;
    let package_name = package_from_display(package_name.trim()).to_string();
    ensure_non_empty(&package_name, "package_name", &trace_id)?;
    info!(
        trace_id = %trace_id,
        serial = %serial,
        package_name = %package_name,
        enabled,
        "set_package_enabled"
    );
    state
        .client
        .set_package_enabled(&serial, &package_name, enabled, &trace_id);
    Ok(CommandResponse {
        trace_id,
        data: package_name,
    })
}

pub fn push_inspection_tool(
    state: &AppState,
    serial: String,
    trace_id: Option<String>,
) -> Result<CommandResponse<String>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    ensure_non_empty(&serial, "serial", &trace_id)?;
    state.client.push_inspection_tool(&serial, &trace_id);
    Ok(CommandResponse {
        trace_id,
        data: state.client.inspection().remote_tool_path(),
    })
}

/// Runs one resolution pass with the configured worker count.
pub fn resolve_app_names(
    state: &AppState,
    serial: String,
    options: Option<ResolveOptions>,
    on_progress: impl FnMut(ResolveProgress),
    trace_id: Option<String>,
) -> Result<CommandResponse<ResolveReport>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    ensure_non_empty(&serial, "serial", &trace_id)?;
    let options = options.unwrap_or_else(|| ResolveOptions::from(&state.config.resolver));

    let mut cache = state.cache(&trace_id)?;
    let report = NameResolver::new(&state.client, options).resolve(
        &mut cache,
        &serial,
        &trace_id,
        on_progress,
    )?;
    Ok(CommandResponse {
        trace_id,
        data: report,
    })
}
