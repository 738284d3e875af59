use serde::Deserialize;
use serde_json::Value;

/// Error body shape shared by the backend's JSON error responses.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Detail>,
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default)]
    pub table_name: Option<Value>,
    #[serde(default)]
    pub item_id: Option<Value>,
    #[serde(default)]
    pub item_name: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Detail {
    Text(String),
    Issues(Vec<ValidationIssue>),
    Other(Value),
}

/// One entry of a validation-error array.
#[derive(Debug, Deserialize)]
pub struct ValidationIssue {
    #[serde(default)]
    pub loc: Vec<Value>,
    pub msg: String,
}
