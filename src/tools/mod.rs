mod external;

pub(crate) use external::*;

use itertools::Itertools;
use std::{io, path::Path};
use thiserror::Error;

/// How the argument sequence reaches the compiler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Arguments {
    /// Each element is passed as its own argument.
    Direct(Vec<String>),
    /// Each element becomes one line of a response file passed as `@file`.
    ResponseFile(Vec<String>),
}

impl Arguments {
    pub fn lines(&self) -> &[String] {
        match self {
            Arguments::Direct(arguments) | Arguments::ResponseFile(arguments) => arguments,
        }
    }

    /// Single-line rendering used in log output.
    pub fn to_command_line(&self) -> String {
        self.lines()
            .iter()
            .map(|argument| {
                if argument.contains(' ') && !argument.contains('"') {
                    format!("\"{}\"", argument)
                } else {
                    argument.clone()
                }
            })
            .join(" ")
    }
}

pub struct CompilerOutput {
    pub code: Option<i32>,
    pub output: String,
}

impl CompilerOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

pub trait Compiler {
    fn name(&self) -> &str;

    fn compile(
        &self,
        arguments: &Arguments,
        working_directory: &Path,
    ) -> Result<CompilerOutput, CompilerError>;
}

#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("failed to start {0}: {1}")]
    Spawn(String, io::Error),
    #[error("failed to write response file: {0}")]
    ResponseFile(io::Error),
}
