use lazy_static::lazy_static;
use regex::Regex;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

lazy_static! {
    static ref KEY_VALUE_PATTERN: Regex = Regex::new(r"^\s*(\w+)\s*=\s*(.*?)\s*$").unwrap();
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ProjectType {
    Exe,
    OleExe,
    OleDll,
    Control,
}

impl ProjectType {
    fn parse(value: &str) -> Option<ProjectType> {
        match value {
            "Exe" => Some(ProjectType::Exe),
            "OleExe" => Some(ProjectType::OleExe),
            "OleDll" => Some(ProjectType::OleDll),
            "Control" => Some(ProjectType::Control),
            _ => None,
        }
    }

    pub(crate) fn extension(&self) -> &'static str {
        match self {
            ProjectType::Exe | ProjectType::OleExe => "exe",
            ProjectType::OleDll => "dll",
            ProjectType::Control => "ocx",
        }
    }
}

/// How a recognized key with an unusable value is treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum ParsePolicy {
    /// Log a warning and skip the line.
    #[default]
    Lenient,
    /// Fail with [`ProjectFileError::MalformedEntry`].
    Strict,
}

/// What a `.vbp` file declares. Paths are kept exactly as written.
#[derive(Debug, Default)]
pub(crate) struct ProjectDescriptor {
    pub(crate) path: PathBuf,
    pub(crate) name: Option<String>,
    pub(crate) project_type: Option<ProjectType>,
    /// `Type` exactly as written; `project_type` is `None` when it is not a known type.
    pub(crate) type_name: Option<String>,
    pub(crate) sources: Vec<String>,
    pub(crate) references: Vec<String>,
    pub(crate) output_name: Option<String>,
}

impl ProjectDescriptor {
    /// The explicit `ExeName32`, or `<Name>.<ext>` derived from the project type.
    pub(crate) fn output_file_name(&self) -> Result<String, ProjectFileError> {
        if let Some(ref output_name) = self.output_name {
            return Ok(output_name.clone());
        }

        match (&self.name, &self.project_type) {
            (Some(name), Some(project_type)) => {
                Ok(format!("{}.{}", name, project_type.extension()))
            }
            _ => {
                tracing::debug!(
                    "{}: no ExeName32, Name {:?}, Type {:?}",
                    self.path.display(),
                    self.name,
                    self.type_name
                );

                Err(ProjectFileError::UnresolvedOutputName(self.path.clone()))
            }
        }
    }
}

pub(crate) struct ProjectFileReader {
    policy: ParsePolicy,
}

impl ProjectFileReader {
    pub(crate) fn new(policy: ParsePolicy) -> ProjectFileReader {
        ProjectFileReader { policy }
    }

    pub(crate) fn read_project(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<ProjectDescriptor, ProjectFileError> {
        let path = path.as_ref();
        let content = read_lines(path)?;

        let mut descriptor = ProjectDescriptor {
            path: path.to_path_buf(),
            ..ProjectDescriptor::default()
        };

        for (index, key, value) in key_values(&content) {
            let line = index + 1;

            match key {
                "Class" | "Module" => match value.split_once(';') {
                    Some((_, source)) if !unquote(source).is_empty() => {
                        descriptor.sources.push(String::from(unquote(source)));
                    }
                    _ => self.malformed(path, line, key, value)?,
                },
                "Form" | "UserControl" | "PropertyPage" => {
                    let source = unquote(value);

                    if source.is_empty() {
                        self.malformed(path, line, key, value)?;
                    } else {
                        descriptor.sources.push(String::from(source));
                    }
                }
                "Reference" => match parse_reference(value) {
                    Some(reference) => descriptor.references.push(reference),
                    None => self.malformed(path, line, key, value)?,
                },
                "ExeName32" => descriptor.output_name = Some(String::from(unquote(value))),
                "Type" => {
                    let type_name = unquote(value);

                    descriptor.project_type = ProjectType::parse(type_name);
                    descriptor.type_name = Some(String::from(type_name));
                }
                "Name" => descriptor.name = Some(String::from(unquote(value))),
                _ => tracing::trace!("{}:{}: ignoring key {}", path.display(), line, key),
            }
        }

        Ok(descriptor)
    }

    /// Member project paths of a `.vbg` file, in file order.
    pub(crate) fn read_group(&self, path: impl AsRef<Path>) -> Result<Vec<String>, ProjectFileError> {
        let path = path.as_ref();
        let content = read_lines(path)?;

        let mut projects = Vec::new();

        for (index, key, value) in key_values(&content) {
            match key {
                "Project" | "StartupProject" => {
                    let project = unquote(value);

                    if project.is_empty() {
                        self.malformed(path, index + 1, key, value)?;
                    } else {
                        projects.push(String::from(project));
                    }
                }
                _ => tracing::trace!("{}:{}: ignoring key {}", path.display(), index + 1, key),
            }
        }

        Ok(projects)
    }

    fn malformed(
        &self,
        path: &Path,
        line: usize,
        key: &str,
        value: &str,
    ) -> Result<(), ProjectFileError> {
        match self.policy {
            ParsePolicy::Lenient => {
                tracing::warn!(
                    "{}:{}: skipping malformed {} entry: {}",
                    path.display(),
                    line,
                    key,
                    value
                );

                Ok(())
            }
            ParsePolicy::Strict => Err(ProjectFileError::MalformedEntry {
                path: path.to_path_buf(),
                line,
                key: String::from(key),
            }),
        }
    }
}

fn read_lines(path: &Path) -> Result<String, ProjectFileError> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => {}
        Ok(_) => return Err(ProjectFileError::MissingInputFile(path.to_path_buf())),
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            return Err(ProjectFileError::MissingInputFile(path.to_path_buf()))
        }
        Err(error) => return Err(ProjectFileError::FilesystemAccess(path.to_path_buf(), error)),
    }

    let content = fs::read(path)
        .map_err(|error| ProjectFileError::FilesystemAccess(path.to_path_buf(), error))?;

    // VB6 writes these files in the ANSI code page; non-UTF-8 bytes only ever
    // show up in descriptions, never in the keys read here.
    Ok(String::from_utf8_lossy(&content).into_owned())
}

fn key_values(content: &str) -> impl Iterator<Item = (usize, &str, &str)> {
    content.lines().enumerate().filter_map(|(index, line)| {
        KEY_VALUE_PATTERN.captures(line).map(|captures| {
            let key = captures.get(1).map_or("", |key| key.as_str());
            let value = captures.get(2).map_or("", |value| value.as_str());

            (index, key, value)
        })
    })
}

fn unquote(value: &str) -> &str {
    let value = value.trim();

    value
        .strip_prefix('"')
        .and_then(|value| value.strip_suffix('"'))
        .unwrap_or(value)
}

/// `*\G{guid}#major.minor#lcid#path#description` yields `path`; a project
/// reference inside a group, `*\A<path>`, yields `<path>`.
fn parse_reference(value: &str) -> Option<String> {
    let path = match value.strip_prefix("*\\A") {
        Some(project) => unquote(project),
        None => value.split('#').nth(3)?.trim(),
    };

    if path.is_empty() {
        None
    } else {
        Some(String::from(path))
    }
}

#[derive(Error, Debug)]
pub enum ProjectFileError {
    #[error("project file does not exist: {0}")]
    MissingInputFile(PathBuf),
    #[error("failed to read {0}: {1}")]
    FilesystemAccess(PathBuf, io::Error),
    #[error("{}:{line}: malformed {key} entry", .path.display())]
    MalformedEntry {
        path: PathBuf,
        line: usize,
        key: String,
    },
    #[error("cannot determine the output file name of {0}: set ExeName32 or Name and Type")]
    UnresolvedOutputName(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(directory: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = directory.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_read_sources_and_references() {
        let directory = TempDir::new().unwrap();
        let path = write(
            &directory,
            "App.vbp",
            "Type=Exe\r\n\
             Reference=*\\G{00000000-0000-0000-0000-000000000000}#1.0#0#C:\\lib\\x.dll#\r\n\
             Class=Foo;Foo.cls\r\n\
             Module=modMain; modMain.bas\r\n\
             Form=frmMain.frm\r\n\
             UserControl=\"ctlGrid.ctl\"\r\n\
             PropertyPage=ppGrid.pag\r\n\
             Name=\"App\"\r\n",
        );

        let descriptor = ProjectFileReader::new(ParsePolicy::Lenient)
            .read_project(&path)
            .unwrap();

        assert_eq!(
            descriptor.sources,
            vec![
                "Foo.cls",
                "modMain.bas",
                "frmMain.frm",
                "ctlGrid.ctl",
                "ppGrid.pag"
            ]
        );
        assert_eq!(descriptor.references, vec!["C:\\lib\\x.dll"]);
        assert_eq!(descriptor.project_type, Some(ProjectType::Exe));
        assert_eq!(descriptor.output_file_name().unwrap(), "App.exe");
    }

    #[test]
    fn test_explicit_output_name() {
        let directory = TempDir::new().unwrap();
        let path = write(
            &directory,
            "App.vbp",
            "Type=OleDll\nName=\"App\"\nExeName32=\"Custom.dll\"\n",
        );

        let descriptor = ProjectFileReader::new(ParsePolicy::Lenient)
            .read_project(&path)
            .unwrap();

        assert_eq!(descriptor.output_file_name().unwrap(), "Custom.dll");
    }

    #[test]
    fn test_output_name_fallback() {
        let directory = TempDir::new().unwrap();
        let reader = ProjectFileReader::new(ParsePolicy::Lenient);

        for (project_type, expected) in [
            ("Exe", "MyLib.exe"),
            ("OleExe", "MyLib.exe"),
            ("OleDll", "MyLib.dll"),
            ("Control", "MyLib.ocx"),
        ] {
            let path = write(
                &directory,
                "MyLib.vbp",
                &format!("Type={}\nName=\"MyLib\"\n", project_type),
            );

            let descriptor = reader.read_project(&path).unwrap();

            assert_eq!(descriptor.output_file_name().unwrap(), expected);
        }
    }

    #[test]
    fn test_unresolved_output_name() {
        let directory = TempDir::new().unwrap();
        let reader = ProjectFileReader::new(ParsePolicy::Lenient);

        let unknown_type = write(&directory, "A.vbp", "Type=Wizard\nName=\"A\"\n");
        let no_name = write(&directory, "B.vbp", "Type=Exe\n");

        for path in [unknown_type, no_name] {
            let descriptor = reader.read_project(&path).unwrap();

            assert!(matches!(
                descriptor.output_file_name(),
                Err(ProjectFileError::UnresolvedOutputName(_))
            ));
        }
    }

    #[test]
    fn test_unknown_type_with_explicit_output_name() {
        let directory = TempDir::new().unwrap();
        let path = write(
            &directory,
            "App.vbp",
            "Type=Wizard\nExeName32=\"App.exe\"\n",
        );

        let descriptor = ProjectFileReader::new(ParsePolicy::Strict)
            .read_project(&path)
            .unwrap();

        assert_eq!(descriptor.project_type, None);
        assert_eq!(descriptor.type_name.as_deref(), Some("Wizard"));
        assert_eq!(descriptor.output_file_name().unwrap(), "App.exe");
    }

    #[test]
    fn test_project_reference_in_group() {
        let directory = TempDir::new().unwrap();
        let path = write(
            &directory,
            "App.vbp",
            "Type=Exe\r\nReference=*\\A..\\Lib\\Lib.vbp\r\nName=\"App\"\r\n",
        );

        let descriptor = ProjectFileReader::new(ParsePolicy::Strict)
            .read_project(&path)
            .unwrap();

        assert_eq!(descriptor.references, vec!["..\\Lib\\Lib.vbp"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_project_file() {
        use std::os::unix::fs::PermissionsExt;

        let directory = TempDir::new().unwrap();
        let path = write(&directory, "App.vbp", "Type=Exe\n");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not apply to privileged users.
        if fs::read(&path).is_ok() {
            return;
        }

        assert!(matches!(
            ProjectFileReader::new(ParsePolicy::Lenient).read_project(&path),
            Err(ProjectFileError::FilesystemAccess(ref failed, _)) if *failed == path
        ));
    }

    #[test]
    fn test_unmatched_lines_are_skipped() {
        let directory = TempDir::new().unwrap();
        let path = write(
            &directory,
            "App.vbp",
            "[MS Transaction Server]\nAutoRefresh=1\nnot a key value line\nModule=modMain; modMain.bas\n",
        );

        let descriptor = ProjectFileReader::new(ParsePolicy::Strict)
            .read_project(&path)
            .unwrap();

        assert_eq!(descriptor.sources, vec!["modMain.bas"]);
    }

    #[test]
    fn test_malformed_entries() {
        let directory = TempDir::new().unwrap();
        let path = write(
            &directory,
            "App.vbp",
            "Class=NoPath\nReference=*\\G{0}#1.0\nModule=modMain; modMain.bas\n",
        );

        let descriptor = ProjectFileReader::new(ParsePolicy::Lenient)
            .read_project(&path)
            .unwrap();

        assert_eq!(descriptor.sources, vec!["modMain.bas"]);
        assert!(descriptor.references.is_empty());

        let result = ProjectFileReader::new(ParsePolicy::Strict).read_project(&path);

        assert!(matches!(
            result,
            Err(ProjectFileError::MalformedEntry { line: 1, ref key, .. }) if key == "Class"
        ));
    }

    #[test]
    fn test_read_group() {
        let directory = TempDir::new().unwrap();
        let path = write(
            &directory,
            "All.vbg",
            "VBGROUP 5.0\r\nStartupProject=App\\App.vbp\r\nProject=Lib\\Lib.vbp\r\nProject=Lib\\Lib.vbp\r\n",
        );

        let projects = ProjectFileReader::new(ParsePolicy::Lenient)
            .read_group(&path)
            .unwrap();

        assert_eq!(
            projects,
            vec!["App\\App.vbp", "Lib\\Lib.vbp", "Lib\\Lib.vbp"]
        );
    }

    #[test]
    fn test_missing_file() {
        let directory = TempDir::new().unwrap();
        let reader = ProjectFileReader::new(ParsePolicy::Lenient);

        assert!(matches!(
            reader.read_project(directory.path().join("Missing.vbp")),
            Err(ProjectFileError::MissingInputFile(_))
        ));
        assert!(matches!(
            reader.read_group(directory.path().join("Missing.vbg")),
            Err(ProjectFileError::MissingInputFile(_))
        ));
    }
}
