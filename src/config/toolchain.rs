use serde::{Deserialize, Serialize};

#[derive(Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolchainConfiguration {
    pub midl_location: Option<String>,
    pub vb6_location: Option<String>,
}
