use super::{Arguments, Compiler, CompilerError, CompilerOutput};
use std::{io::Write, path::Path, process::Command};
use tempfile::NamedTempFile;

/// A compiler executable launched as a child process.
pub(crate) struct ExternalCompiler {
    name: &'static str,
    location: String,
}

impl ExternalCompiler {
    pub(crate) fn new(name: &'static str, location: String) -> ExternalCompiler {
        ExternalCompiler { name, location }
    }

    /// Uses the configured location, or searches `PATH` for `executable`.
    pub(crate) fn locate(
        name: &'static str,
        configured_location: Option<&String>,
        executable: &str,
    ) -> Option<ExternalCompiler> {
        if let Some(location) = configured_location {
            Some(ExternalCompiler::new(name, location.clone()))
        } else {
            let executable = if cfg!(target_os = "windows") {
                format!("{}.exe", executable)
            } else {
                String::from(executable)
            };

            Some(ExternalCompiler::new(
                name,
                which::which(executable).ok()?.to_string_lossy().into_owned(),
            ))
        }
    }
}

impl Compiler for ExternalCompiler {
    fn name(&self) -> &str {
        self.name
    }

    fn compile(
        &self,
        arguments: &Arguments,
        working_directory: &Path,
    ) -> Result<CompilerOutput, CompilerError> {
        let mut command = Command::new(&self.location);

        command.current_dir(working_directory);

        // Kept alive until the compiler exits; removed on drop.
        let _response_file = match arguments {
            Arguments::Direct(arguments) => {
                command.args(arguments);

                None
            }
            Arguments::ResponseFile(lines) => {
                let response_file = write_response_file(lines)?;

                command.arg(format!("@{}", response_file.path().display()));

                Some(response_file)
            }
        };

        let output = command
            .output()
            .map_err(|error| CompilerError::Spawn(self.location.clone(), error))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CompilerOutput {
            code: output.status.code(),
            output: text,
        })
    }
}

fn write_response_file(lines: &[String]) -> Result<NamedTempFile, CompilerError> {
    let mut response_file = tempfile::Builder::new()
        .suffix(".rsp")
        .tempfile()
        .map_err(CompilerError::ResponseFile)?;

    for line in lines {
        writeln!(response_file, "{}", line).map_err(CompilerError::ResponseFile)?;
    }

    response_file.flush().map_err(CompilerError::ResponseFile)?;

    Ok(response_file)
}
