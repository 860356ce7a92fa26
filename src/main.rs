use std::io::Write;
use std::process::ExitCode;

use android_package_manager_lib::app::commands::{
    list_devices, list_packages, push_inspection_tool, resolve_app_names, resolve_trace_id,
    select_device, set_package_enabled,
};
use android_package_manager_lib::app::config::{config_path, load_config, save_config, AppConfig};
use android_package_manager_lib::app::error::AppError;
use android_package_manager_lib::app::logging::init_logging;
use android_package_manager_lib::app::models::{
    CommandResponse, PackageCategory, PackageListing, PackageStatus,
};
use android_package_manager_lib::app::state::AppState;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "android_package_manager",
    version,
    about = "List, enable/disable and name Android packages over adb"
)]
struct Cli {
    /// Device serial; defaults to the only attached device
    #[arg(long, global = true, env = "ANDROID_SERIAL")]
    serial: Option<String>,
    /// Print the full JSON response instead of plain text
    #[arg(long, global = true)]
    json: bool,
    #[arg(long, global = true)]
    trace_id: Option<String>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// List attached devices
    Devices,
    /// List packages with their cached app names
    Packages {
        #[arg(long, value_enum, default_value_t = Category::All)]
        category: Category,
        #[arg(long, value_enum, default_value_t = Status::All)]
        status: Status,
        /// Only show packages whose id or app name contains this text
        #[arg(long)]
        filter: Option<String>,
    },
    /// Enable a package (a package id or a line from `packages`)
    Enable { package: String },
    /// Disable a package for the current user (a package id or a line from `packages`)
    Disable { package: String },
    /// Push the badging dump tool to the device
    PushTool,
    /// Resolve app names for every package not yet in the name cache
    ResolveNames {
        /// Print the refreshed package listing afterwards
        #[arg(long)]
        list: bool,
    },
    /// Write the effective configuration to the config file
    InitConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum Category {
    All,
    System,
    User,
}

impl From<Category> for PackageCategory {
    fn from(value: Category) -> Self {
        match value {
            Category::All => PackageCategory::All,
            Category::System => PackageCategory::System,
            Category::User => PackageCategory::User,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Status {
    All,
    Enabled,
    Disabled,
}

impl From<Status> for PackageStatus {
    fn from(value: Status) -> Self {
        match value {
            Status::All => PackageStatus::All,
            Status::Enabled => PackageStatus::Enabled,
            Status::Disabled => PackageStatus::Disabled,
        }
    }
}

fn emit<T: Serialize>(json: bool, response: &CommandResponse<T>, text: impl FnOnce(&T)) {
    if json {
        match serde_json::to_string_pretty(response) {
            Ok(payload) => println!("{payload}"),
            Err(err) => eprintln!("failed to serialize response: {err}"),
        }
    } else {
        text(&response.data);
    }
}

fn print_listing(listings: &[PackageListing]) {
    for listing in listings {
        println!("{}", listing.display_name);
    }
}

fn run(cli: Cli, trace_id: String) -> Result<(), AppError> {
    let config = load_config(&trace_id)?;
    init_logging(&config.logging.log_level);
    let trace = Some(trace_id.clone());
    let json = cli.json;
    let open = |config: AppConfig| AppState::new(config, &trace_id);

    match cli.cmd {
        Cmd::InitConfig => {
            save_config(&config, &trace_id)?;
            let response = CommandResponse {
                trace_id: trace_id.clone(),
                data: config_path().display().to_string(),
            };
            emit(json, &response, |path| println!("wrote {path}"));
        }
        Cmd::Devices => {
            let state = open(config)?;
            let response = list_devices(&state, trace)?;
            emit(json, &response, |devices| {
                for device in devices {
                    println!("{device}");
                }
            });
        }
        Cmd::Packages {
            category,
            status,
            filter,
        } => {
            let state = open(config)?;
            let serial = select_device(&state, cli.serial, trace.clone())?.data;
            let response = list_packages(
                &state,
                serial,
                category.into(),
                status.into(),
                filter,
                trace,
            )?;
            emit(json, &response, |listings| print_listing(listings));
        }
        Cmd::Enable { package } => {
            let state = open(config)?;
            let serial = select_device(&state, cli.serial, trace.clone())?.data;
            let response = set_package_enabled(&state, serial, package, true, trace)?;
            emit(json, &response, |package| println!("enabled {package}"));
        }
        Cmd::Disable { package } => {
            let state = open(config)?;
            let serial = select_device(&state, cli.serial, trace.clone())?.data;
            let response = set_package_enabled(&state, serial, package, false, trace)?;
            emit(json, &response, |package| println!("disabled {package}"));
        }
        Cmd::PushTool => {
            let state = open(config)?;
            let serial = select_device(&state, cli.serial, trace.clone())?.data;
            let response = push_inspection_tool(&state, serial, trace)?;
            emit(json, &response, |remote| println!("pushed {remote}"));
        }
        Cmd::ResolveNames { list } => {
            let state = open(config)?;
            let serial = select_device(&state, cli.serial, trace.clone())?.data;
            let response = resolve_app_names(
                &state,
                serial.clone(),
                None,
                |progress| {
                    if !json {
                        eprint!(
                            "\rGetting app names: {} / {}",
                            progress.completed, progress.total
                        );
                        let _ = std::io::stderr().flush();
                    }
                },
                trace.clone(),
            )?;
            if !json {
                eprintln!();
            }
            emit(json, &response, |report| {
                println!(
                    "Got {} of {} app names in {:.1}s.",
                    report.resolved,
                    report.total,
                    report.elapsed_ms as f64 / 1000.0
                );
            });
            if list {
                let response = list_packages(
                    &state,
                    serial,
                    PackageCategory::All,
                    PackageStatus::All,
                    None,
                    trace,
                )?;
                emit(json, &response, |listings| print_listing(listings));
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let trace_id = resolve_trace_id(cli.trace_id.clone());
    let json = cli.json;
    match run(cli, trace_id) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if json {
                match serde_json::to_string_pretty(&err) {
                    Ok(payload) => eprintln!("{payload}"),
                    Err(_) => eprintln!("{err}"),
                }
            } else {
                eprintln!("error: {err} [trace_id={}]", err.trace_id);
            }
            ExitCode::FAILURE
        }
    }
}
