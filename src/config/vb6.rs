use serde::{Deserialize, Serialize};

/// Parameters of a single `[[vb6]]` task.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Vb6Configuration {
    pub(crate) project: String,
    pub(crate) outdir: Option<String>,
    pub(crate) error_file: Option<String>,
    pub(crate) conditionals: Option<String>,
    #[serde(default = "default_check_references")]
    pub(crate) check_references: bool,
    #[serde(default)]
    pub(crate) strict: bool,
}

fn default_check_references() -> bool {
    true
}

#[cfg(test)]
impl Vb6Configuration {
    pub(crate) fn new(project: &str) -> Vb6Configuration {
        Vb6Configuration {
            project: String::from(project),
            outdir: None,
            error_file: None,
            conditionals: None,
            check_references: default_check_references(),
            strict: false,
        }
    }
}
