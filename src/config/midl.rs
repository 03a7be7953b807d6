use serde::{Deserialize, Serialize};

/// Parameters of a single `[[midl]]` task.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MidlConfiguration {
    pub(crate) filename: String,
    pub(crate) tlb: String,
    pub(crate) header: String,
    pub(crate) iid: String,
    pub(crate) acf: Option<String>,
    pub(crate) align: Option<String>,
    #[serde(default)]
    pub(crate) app_config: bool,
    pub(crate) char: Option<String>,
    pub(crate) client: Option<String>,
    pub(crate) cstub: Option<String>,
    pub(crate) dlldata: Option<String>,
    pub(crate) env: Option<String>,
    pub(crate) oi: Option<String>,
    pub(crate) proxy: Option<String>,
    #[serde(default)]
    pub(crate) options: Vec<NamedValue>,
    #[serde(default)]
    pub(crate) defines: Vec<NamedValue>,
    #[serde(default)]
    pub(crate) undefines: Vec<String>,
    #[serde(default)]
    pub(crate) include_dirs: Vec<String>,
}

/// An entry of an open-ended switch list, e.g. `{ name = "DEBUG", value = "1" }`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub(crate) struct NamedValue {
    pub(crate) name: String,
    pub(crate) value: Option<String>,
}

impl NamedValue {
    #[cfg(test)]
    pub(crate) fn new(name: &str, value: Option<&str>) -> NamedValue {
        NamedValue {
            name: String::from(name),
            value: value.map(String::from),
        }
    }

    pub(crate) fn to_argument(&self) -> String {
        match self.value {
            Some(ref value) => format!("{}={}", self.name, value),
            None => self.name.clone(),
        }
    }
}
