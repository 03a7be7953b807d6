mod config;
mod extensions;
mod project;
mod staleness;
mod task;
mod tools;

pub(crate) use extensions::*;
pub(crate) use project::*;
pub(crate) use staleness::StalenessError;
pub(crate) use task::*;

use clap::{Arg, ArgAction, Command};
use config::{BuildConfiguration, ToolchainConfiguration};
use eyre::{eyre, WrapErr};
use std::{
    env,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};
use tracing_subscriber::EnvFilter;

pub const BUILD_CONFIGURATION_FILE: &str = "vbmidl.toml";
pub const TOOLCHAIN_CONFIGURATION_FILE: &str = "config.toml";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TaskSelection {
    All,
    Midl,
    Vb6,
}

fn main() -> eyre::Result<()> {
    let matches = Command::new("vbmidl")
        .version("0.1")
        .about("Incremental MIDL and Visual Basic 6 builds")
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .global(true)
                .value_name("PATH")
                .help("Build file to read")
                .default_value(BUILD_CONFIGURATION_FILE),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Increase log verbosity"),
        )
        .subcommand_required(true)
        .subcommand(Command::new("build").about("Run every task in the build file"))
        .subcommand(Command::new("midl").about("Run only the MIDL tasks"))
        .subcommand(Command::new("vb6").about("Run only the VB6 tasks"))
        .get_matches();

    let log_level = match matches.get_count("verbose") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| log_level.into()))
        .with_target(false)
        .init();

    let selection = match matches.subcommand_name() {
        Some("midl") => TaskSelection::Midl,
        Some("vb6") => TaskSelection::Vb6,
        _ => TaskSelection::All,
    };

    let build_configuration_path = matches
        .get_one::<String>("file")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(BUILD_CONFIGURATION_FILE));

    let toolchain_configuration = deserialize_toolchain_configuration()
        .wrap_err("Failed to deserialize toolchain configuration")?;

    let build_configuration = deserialize_build_configuration(&build_configuration_path)
        .wrap_err_with(|| format!("Failed to read {}", build_configuration_path.display()))?;

    let context = TaskContext {
        base_path: base_path_of(&build_configuration_path)?,
        toolchain_configuration,
    };

    let tasks = create_tasks(build_configuration, selection);

    if tasks.is_empty() {
        tracing::warn!("No tasks to run");
    }

    for task in &tasks {
        execute_with_toolchain(task.as_ref(), &context)
            .wrap_err_with(|| format!("{} task for {} failed", task.id(), task.target()))?;
    }

    Ok(())
}

fn create_tasks(
    build_configuration: BuildConfiguration,
    selection: TaskSelection,
) -> Vec<Box<dyn Task>> {
    let mut tasks: Vec<Box<dyn Task>> = Vec::new();

    if selection != TaskSelection::Vb6 {
        for configuration in build_configuration.midl {
            tasks.push(Box::new(Midl::new(configuration)));
        }
    }

    if selection != TaskSelection::Midl {
        for configuration in build_configuration.vb6 {
            tasks.push(Box::new(Vb6::new(configuration)));
        }
    }

    tasks
}

fn base_path_of(build_configuration_path: &Path) -> eyre::Result<PathBuf> {
    let parent = match build_configuration_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    parent
        .canonicalize()
        .wrap_err_with(|| format!("Failed to resolve {}", parent.display()))
}

fn deserialize_build_configuration(path: &Path) -> eyre::Result<BuildConfiguration> {
    if !path.is_file() {
        return Err(eyre!("There is no build file at {}", path.display()));
    }

    let build_configuration_content = fs::read_to_string(path)?;
    let build_configuration = toml::from_str::<BuildConfiguration>(&build_configuration_content)?;

    Ok(build_configuration)
}

fn deserialize_toolchain_configuration() -> eyre::Result<ToolchainConfiguration> {
    let toolchain_configuration_path = {
        let mut executable_path = env::current_exe()?;
        executable_path.pop();
        executable_path.push(TOOLCHAIN_CONFIGURATION_FILE);
        executable_path
    };

    if !toolchain_configuration_path.exists() {
        let toolchain_configuration = ToolchainConfiguration::default();
        let toolchain_configuration_toml = toml::to_string_pretty(&toolchain_configuration)?;

        if let Err(error) = File::options()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&toolchain_configuration_path)
            .and_then(|mut file| file.write_all(toolchain_configuration_toml.as_bytes()))
        {
            tracing::debug!(
                "Could not write default {}: {}",
                toolchain_configuration_path.display(),
                error
            );
        }

        return Ok(toolchain_configuration);
    }

    let toolchain_configuration_content = fs::read_to_string(&toolchain_configuration_path)?;
    let toolchain_configuration =
        toml::from_str::<ToolchainConfiguration>(&toolchain_configuration_content)?;

    Ok(toolchain_configuration)
}
