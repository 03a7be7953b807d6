use crate::config::{MidlConfiguration, Vb6Configuration};
use serde::{Deserialize, Serialize};

/// Contents of `vbmidl.toml`. Tasks of each kind run in declaration order.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BuildConfiguration {
    #[serde(default)]
    pub(crate) midl: Vec<MidlConfiguration>,
    #[serde(default)]
    pub(crate) vb6: Vec<Vb6Configuration>,
}
