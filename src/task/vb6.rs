use super::{Task, TaskContext, TaskError};
use crate::{
    config::Vb6Configuration,
    normalize_separators,
    staleness::{InputFileSet, OutputFileSet, StalenessChecker},
    tools::{Arguments, Compiler, ExternalCompiler},
    ParsePolicy, PathExtension, ProjectFileReader,
};
use std::{
    cell::OnceCell,
    fs, io,
    path::{Path, PathBuf},
};
use tempfile::TempPath;

/// Compiles a VB6 project (`.vbp`) or project group (`.vbg`).
pub struct Vb6 {
    configuration: Vb6Configuration,
    temporary_error_file: OnceCell<TempPath>,
}

impl Vb6 {
    pub(crate) fn new(configuration: Vb6Configuration) -> Self {
        Self {
            configuration,
            temporary_error_file: OnceCell::new(),
        }
    }

    fn reader(&self) -> ProjectFileReader {
        ProjectFileReader::new(if self.configuration.strict {
            ParsePolicy::Strict
        } else {
            ParsePolicy::Lenient
        })
    }

    fn is_group(&self) -> bool {
        Path::new(&self.configuration.project).has_extension("vbg")
    }

    /// VB6 reports compile errors only through the `/out` file, so one is
    /// always passed; a temporary file stands in when none is configured.
    fn error_file(&self, context: &TaskContext) -> Result<PathBuf, TaskError> {
        if let Some(ref error_file) = self.configuration.error_file {
            return Ok(context.resolve(error_file));
        }

        if let Some(error_file) = self.temporary_error_file.get() {
            return Ok(error_file.to_path_buf());
        }

        let error_file = tempfile::Builder::new()
            .prefix("vb6-")
            .suffix(".log")
            .tempfile()
            .map_err(TaskError::CreateErrorFile)?
            .into_temp_path();
        let path = error_file.to_path_buf();

        // Only unset when reached, so this cannot fail.
        let _ = self.temporary_error_file.set(error_file);

        Ok(path)
    }

    fn project_needs_rebuild(
        &self,
        reader: &ProjectFileReader,
        project_path: &Path,
        context: &TaskContext,
    ) -> Result<bool, TaskError> {
        let descriptor = reader.read_project(project_path)?;
        let project_directory = project_path.parent().unwrap_or(context.base_path.as_path());

        let output_directory = match self.configuration.outdir {
            Some(ref outdir) => context.resolve(outdir),
            None => project_directory.to_path_buf(),
        };
        let output_file = output_directory.join(normalize_separators(&descriptor.output_file_name()?));

        let sources = std::iter::once(project_path.to_path_buf())
            .chain(descriptor.sources.iter().map(|source| normalize_separators(source)))
            .collect::<Vec<_>>();
        let references = descriptor
            .references
            .iter()
            .map(|reference| normalize_separators(reference))
            .collect::<Vec<_>>();

        tracing::debug!(
            "{}: {} sources, {} references, output {}",
            project_path.relative_to(&context.base_path).display(),
            sources.len(),
            references.len(),
            output_file.relative_to(&context.base_path).display()
        );

        let checker = StalenessChecker::new(project_directory)
            .check_references(self.configuration.check_references);

        Ok(checker.needs_rebuild(
            &OutputFileSet::new(vec![output_file]),
            &InputFileSet::new(sources, references),
        )?)
    }
}

impl Task for Vb6 {
    fn id(&self) -> &'static str {
        "vb6"
    }

    fn target(&self) -> &str {
        &self.configuration.project
    }

    fn needs_rebuild(&self, context: &TaskContext) -> Result<bool, TaskError> {
        let reader = self.reader();
        let project_path = context.resolve(&self.configuration.project);

        if !self.is_group() {
            return self.project_needs_rebuild(&reader, &project_path, context);
        }

        let group_directory = project_path.parent().unwrap_or(context.base_path.as_path());

        for project in reader.read_group(&project_path)? {
            let member_path = normalize_separators(&project).resolve_against(group_directory);

            if self.project_needs_rebuild(&reader, &member_path, context)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn arguments(&self, context: &TaskContext) -> Result<Arguments, TaskError> {
        let mut arguments = vec![String::from("/make"), self.configuration.project.clone()];

        if let Some(ref outdir) = self.configuration.outdir {
            arguments.push(String::from("/outdir"));
            arguments.push(outdir.clone());
        }

        arguments.push(String::from("/out"));
        arguments.push(self.error_file(context)?.to_string_lossy().into_owned());

        if let Some(ref conditionals) = self.configuration.conditionals {
            arguments.push(String::from("/d"));
            arguments.push(conditionals.clone());
        }

        Ok(Arguments::Direct(arguments))
    }

    fn locate_compiler(&self, context: &TaskContext) -> Option<Box<dyn Compiler>> {
        ExternalCompiler::locate(
            "vb6",
            context.toolchain_configuration.vb6_location.as_ref(),
            "vb6",
        )
        .map(|compiler| Box::new(compiler) as Box<dyn Compiler>)
    }

    fn prepare(&self, context: &TaskContext) -> Result<(), TaskError> {
        if let Some(ref outdir) = self.configuration.outdir {
            let outdir = context.resolve(outdir);

            if !outdir.is_dir() {
                tracing::debug!("Creating {}", outdir.display());

                fs::create_dir_all(&outdir)
                    .map_err(|error| TaskError::CreateDirectory(outdir, error))?;
            }
        }

        // A log left by an earlier run must not be reported as this run's diagnostics.
        if let Some(ref error_file) = self.configuration.error_file {
            let error_file = context.resolve(error_file);

            match fs::remove_file(&error_file) {
                Ok(()) => tracing::debug!("Removed stale {}", error_file.display()),
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(error) => return Err(TaskError::RemoveErrorFile(error_file, error)),
            }
        }

        Ok(())
    }

    fn diagnostics(&self, context: &TaskContext) -> Result<Option<String>, TaskError> {
        let error_file = self.error_file(context)?;

        match fs::read(&error_file) {
            Ok(content) => Ok(Some(String::from_utf8_lossy(&content).into_owned())),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(TaskError::ReadErrorFile(error_file, error)),
        }
    }
}
