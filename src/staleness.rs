use crate::PathExtension;
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::SystemTime,
};
use thiserror::Error;

/// Files a task is expected to produce.
#[derive(Debug, Default)]
pub(crate) struct OutputFileSet {
    pub(crate) files: Vec<PathBuf>,
}

impl OutputFileSet {
    pub(crate) fn new(files: Vec<PathBuf>) -> OutputFileSet {
        OutputFileSet { files }
    }
}

/// Files whose modification invalidates the outputs.
#[derive(Debug, Default)]
pub(crate) struct InputFileSet {
    pub(crate) sources: Vec<PathBuf>,
    pub(crate) references: Vec<PathBuf>,
}

impl InputFileSet {
    pub(crate) fn new(sources: Vec<PathBuf>, references: Vec<PathBuf>) -> InputFileSet {
        InputFileSet {
            sources,
            references,
        }
    }
}

pub(crate) struct StalenessChecker {
    base_directory: PathBuf,
    check_references: bool,
}

impl StalenessChecker {
    pub(crate) fn new(base_directory: impl Into<PathBuf>) -> StalenessChecker {
        StalenessChecker {
            base_directory: base_directory.into(),
            check_references: true,
        }
    }

    pub(crate) fn check_references(mut self, check_references: bool) -> StalenessChecker {
        self.check_references = check_references;
        self
    }

    /// Returns true when an output is missing or an input is newer than the
    /// oldest output. Every source must exist, even when an output is missing.
    pub(crate) fn needs_rebuild(
        &self,
        outputs: &OutputFileSet,
        inputs: &InputFileSet,
    ) -> Result<bool, StalenessError> {
        let mut oldest_output: Option<SystemTime> = None;
        let mut output_missing = false;

        for output in &outputs.files {
            let output = output.resolve_against(&self.base_directory);

            match self.modified(&output)? {
                Some(modified) => {
                    oldest_output = Some(match oldest_output {
                        Some(oldest) if oldest <= modified => oldest,
                        _ => modified,
                    });
                }
                None => {
                    tracing::debug!("Output {} does not exist", self.display(&output));

                    output_missing = true;
                }
            }
        }

        let oldest_output = oldest_output.filter(|_| !output_missing);
        let mut stale = oldest_output.is_none();

        for source in &inputs.sources {
            let source = source.resolve_against(&self.base_directory);
            let modified = self
                .modified(&source)?
                .ok_or_else(|| StalenessError::MissingInputFile(source.clone()))?;

            if let Some(oldest_output) = oldest_output {
                if !stale && modified > oldest_output {
                    tracing::debug!("{} is newer than its outputs", self.display(&source));

                    stale = true;
                }
            }
        }

        let oldest_output = match oldest_output {
            Some(oldest_output) if !stale => oldest_output,
            _ => return Ok(true),
        };

        if self.check_references {
            for reference in &inputs.references {
                let reference = reference.resolve_against(&self.base_directory);

                match self.modified(&reference)? {
                    Some(modified) if modified > oldest_output => {
                        tracing::debug!("{} is newer than its outputs", self.display(&reference));

                        return Ok(true);
                    }
                    Some(_) => {}
                    None => {
                        tracing::debug!(
                            "Reference {} not found, ignoring it",
                            self.display(&reference)
                        );
                    }
                }
            }
        }

        Ok(false)
    }

    fn modified(&self, path: &Path) -> Result<Option<SystemTime>, StalenessError> {
        match fs::metadata(path).and_then(|metadata| metadata.modified()) {
            Ok(modified) => Ok(Some(modified)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(StalenessError::FilesystemAccess(path.to_path_buf(), error)),
        }
    }

    fn display(&self, path: &Path) -> String {
        path.relative_to(&self.base_directory)
            .display()
            .to_string()
    }
}

#[derive(Error, Debug)]
pub enum StalenessError {
    #[error("input file does not exist: {0}")]
    MissingInputFile(PathBuf),
    #[error("failed to access {0}: {1}")]
    FilesystemAccess(PathBuf, io::Error),
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::{fs::File, time::Duration};
    use tempfile::TempDir;

    /// Creates `name` under `directory` with a modification time `age` seconds in the past.
    pub(crate) fn touch(directory: &Path, name: &str, age: u64) -> PathBuf {
        let path = directory.join(name);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }

        let file = File::create(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age))
            .unwrap();

        path
    }

    #[test]
    fn test_missing_output_needs_rebuild() {
        let directory = TempDir::new().unwrap();
        touch(directory.path(), "api.idl", 0);

        let checker = StalenessChecker::new(directory.path());
        let outputs = OutputFileSet::new(vec![PathBuf::from("api.tlb")]);
        let inputs = InputFileSet::new(vec![PathBuf::from("api.idl")], vec![]);

        assert!(checker.needs_rebuild(&outputs, &inputs).unwrap());
    }

    #[test]
    fn test_missing_source_is_an_error_even_without_outputs() {
        let directory = TempDir::new().unwrap();

        let checker = StalenessChecker::new(directory.path());
        let outputs = OutputFileSet::new(vec![PathBuf::from("api.tlb")]);
        let inputs = InputFileSet::new(vec![PathBuf::from("missing.idl")], vec![]);

        assert!(matches!(
            checker.needs_rebuild(&outputs, &inputs),
            Err(StalenessError::MissingInputFile(path)) if path.ends_with("missing.idl")
        ));
    }

    #[test]
    fn test_every_source_is_checked_after_a_newer_one() {
        let directory = TempDir::new().unwrap();
        touch(directory.path(), "api.tlb", 100);
        touch(directory.path(), "api.idl", 10);

        let checker = StalenessChecker::new(directory.path());
        let outputs = OutputFileSet::new(vec![PathBuf::from("api.tlb")]);
        let inputs = InputFileSet::new(
            vec![PathBuf::from("api.idl"), PathBuf::from("missing.acf")],
            vec![],
        );

        assert!(matches!(
            checker.needs_rebuild(&outputs, &inputs),
            Err(StalenessError::MissingInputFile(_))
        ));
    }

    #[test]
    fn test_newer_input_flips_result() {
        let directory = TempDir::new().unwrap();
        touch(directory.path(), "api.idl", 200);
        touch(directory.path(), "api.tlb", 100);
        touch(directory.path(), "api.h", 100);

        let checker = StalenessChecker::new(directory.path());
        let outputs = OutputFileSet::new(vec![PathBuf::from("api.tlb"), PathBuf::from("api.h")]);
        let mut inputs = InputFileSet::new(vec![PathBuf::from("api.idl")], vec![]);

        assert!(!checker.needs_rebuild(&outputs, &inputs).unwrap());

        touch(directory.path(), "api.acf", 10);
        inputs.sources.push(PathBuf::from("api.acf"));

        assert!(checker.needs_rebuild(&outputs, &inputs).unwrap());
    }

    #[test]
    fn test_oldest_output_is_compared() {
        let directory = TempDir::new().unwrap();
        touch(directory.path(), "api.tlb", 300);
        touch(directory.path(), "api.idl", 200);
        touch(directory.path(), "api.h", 100);

        let checker = StalenessChecker::new(directory.path());
        let outputs = OutputFileSet::new(vec![PathBuf::from("api.h"), PathBuf::from("api.tlb")]);
        let inputs = InputFileSet::new(vec![PathBuf::from("api.idl")], vec![]);

        assert!(checker.needs_rebuild(&outputs, &inputs).unwrap());
    }

    #[test]
    fn test_empty_inputs_are_up_to_date() {
        let directory = TempDir::new().unwrap();
        touch(directory.path(), "App.exe", 0);

        let checker = StalenessChecker::new(directory.path());
        let outputs = OutputFileSet::new(vec![PathBuf::from("App.exe")]);

        assert!(!checker
            .needs_rebuild(&outputs, &InputFileSet::default())
            .unwrap());
    }

    #[test]
    fn test_references_can_be_ignored() {
        let directory = TempDir::new().unwrap();
        touch(directory.path(), "Main.bas", 200);
        touch(directory.path(), "App.exe", 100);
        touch(directory.path(), "lib/x.dll", 10);

        let outputs = OutputFileSet::new(vec![PathBuf::from("App.exe")]);
        let inputs = InputFileSet::new(
            vec![PathBuf::from("Main.bas")],
            vec![PathBuf::from("lib/x.dll")],
        );

        assert!(StalenessChecker::new(directory.path())
            .needs_rebuild(&outputs, &inputs)
            .unwrap());
        assert!(!StalenessChecker::new(directory.path())
            .check_references(false)
            .needs_rebuild(&outputs, &inputs)
            .unwrap());
    }

    #[test]
    fn test_missing_reference_is_ignored() {
        let directory = TempDir::new().unwrap();
        touch(directory.path(), "App.exe", 0);

        let outputs = OutputFileSet::new(vec![PathBuf::from("App.exe")]);
        let inputs = InputFileSet::new(vec![], vec![PathBuf::from("stdole2.tlb")]);

        assert!(!StalenessChecker::new(directory.path())
            .needs_rebuild(&outputs, &inputs)
            .unwrap());
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let directory = TempDir::new().unwrap();
        touch(directory.path(), "App.exe", 0);

        let outputs = OutputFileSet::new(vec![PathBuf::from("App.exe")]);
        let inputs = InputFileSet::new(vec![PathBuf::from("Gone.bas")], vec![]);

        let result = StalenessChecker::new(directory.path()).needs_rebuild(&outputs, &inputs);

        assert!(matches!(result, Err(StalenessError::MissingInputFile(path)) if path.ends_with("Gone.bas")));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_an_access_error() {
        use std::os::unix::fs::PermissionsExt;

        let directory = TempDir::new().unwrap();
        touch(directory.path(), "locked/api.tlb", 0);
        let locked = directory.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not apply to privileged users.
        if fs::metadata(locked.join("api.tlb")).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

            return;
        }

        let checker = StalenessChecker::new(directory.path());
        let outputs = OutputFileSet::new(vec![PathBuf::from("locked/api.tlb")]);

        let result = checker.needs_rebuild(&outputs, &InputFileSet::default());

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(
            result,
            Err(StalenessError::FilesystemAccess(path, _)) if path.ends_with("locked/api.tlb")
        ));
    }
}
