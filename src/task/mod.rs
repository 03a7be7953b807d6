mod midl;
mod vb6;

pub use midl::*;
pub use vb6::*;

use crate::{
    config::ToolchainConfiguration,
    tools::{Arguments, Compiler, CompilerError},
    PathExtension, ProjectFileError, StalenessError,
};
use std::{io, path::PathBuf};
use thiserror::Error;

pub struct TaskContext {
    /// Directory containing the build file; relative task paths resolve against it.
    pub base_path: PathBuf,
    pub toolchain_configuration: ToolchainConfiguration,
}

pub trait Task {
    fn id(&self) -> &'static str;

    /// Human-readable name of what the task compiles.
    fn target(&self) -> &str;

    fn needs_rebuild(&self, context: &TaskContext) -> Result<bool, TaskError>;

    fn arguments(&self, context: &TaskContext) -> Result<Arguments, TaskError>;

    fn locate_compiler(&self, context: &TaskContext) -> Option<Box<dyn Compiler>>;

    /// Runs right before the compiler is invoked.
    fn prepare(&self, _context: &TaskContext) -> Result<(), TaskError> {
        Ok(())
    }

    /// Extra diagnostics to attach when the compiler fails.
    fn diagnostics(&self, _context: &TaskContext) -> Result<Option<String>, TaskError> {
        Ok(None)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    UpToDate,
    Compiled,
}

/// Skips the task when its outputs are current, otherwise runs the compiler.
pub fn execute(
    task: &dyn Task,
    compiler: &dyn Compiler,
    context: &TaskContext,
) -> Result<TaskOutcome, TaskError> {
    if !task.needs_rebuild(context)? {
        tracing::info!("{} is up to date", task.target());

        return Ok(TaskOutcome::UpToDate);
    }

    task.prepare(context)?;

    let arguments = task.arguments(context)?;

    tracing::info!("Compiling {}", task.target());
    tracing::debug!("{} {}", compiler.name(), arguments.to_command_line());

    let output = compiler.compile(&arguments, &context.base_path)?;

    if !output.output.trim().is_empty() {
        tracing::info!("{}", output.output.trim_end());
    }

    if !output.success() {
        let mut message = output.output;

        if let Some(diagnostics) = task.diagnostics(context)? {
            if !message.is_empty() && !message.ends_with('\n') {
                message.push('\n');
            }

            message.push_str(&diagnostics);
        }

        return Err(TaskError::CompilerFailed {
            compiler: String::from(compiler.name()),
            code: output.code,
            output: message,
        });
    }

    tracing::info!("Compiled {}", task.target());

    Ok(TaskOutcome::Compiled)
}

/// Locates the task's compiler and runs it through [`execute`].
pub fn execute_with_toolchain(
    task: &dyn Task,
    context: &TaskContext,
) -> Result<TaskOutcome, TaskError> {
    let compiler = task
        .locate_compiler(context)
        .ok_or(TaskError::CompilerNotFound(task.id()))?;

    execute(task, compiler.as_ref(), context)
}

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("{0} compiler not found; set its location in config.toml or add it to PATH")]
    CompilerNotFound(&'static str),
    #[error("{compiler} exited with {}:\n{output}", .code.map_or_else(|| String::from("a signal"), |code| format!("code {}", code)))]
    CompilerFailed {
        compiler: String,
        code: Option<i32>,
        output: String,
    },
    #[error(transparent)]
    Compiler(#[from] CompilerError),
    #[error(transparent)]
    ProjectFile(#[from] ProjectFileError),
    #[error(transparent)]
    Staleness(#[from] StalenessError),
    #[error("failed to create directory {0}: {1}")]
    CreateDirectory(PathBuf, io::Error),
    #[error("failed to create error file: {0}")]
    CreateErrorFile(io::Error),
    #[error("failed to remove stale error file {0}: {1}")]
    RemoveErrorFile(PathBuf, io::Error),
    #[error("failed to read error file {0}: {1}")]
    ReadErrorFile(PathBuf, io::Error),
}

impl TaskContext {
    pub fn resolve(&self, path: &str) -> PathBuf {
        PathBuf::from(path).resolve_against(&self.base_path)
    }
}
