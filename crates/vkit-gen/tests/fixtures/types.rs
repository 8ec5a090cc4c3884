//! Request types used by the generation tests. Parsed, never compiled.

use std::collections::HashMap;

use serde::Deserialize;

/// A nested payload with an open label map.
#[derive(Debug, Deserialize)]
pub struct NestedType {
    pub value: String,
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Union {
    Text(String),
    Number(f64),
    Nested(NestedType),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestType {
    pub string: String,
    pub number: f64,
    pub boolean: bool,
    pub nested: NestedType,
    pub nested_array: Vec<NestedType>,
    pub union: Union,
    pub record: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaOutputType {
    Say,
    Play,
    MakeCall,
    Hangup,
}

#[derive(Debug, Deserialize)]
pub struct MediaOutput {
    #[serde(rename = "type")]
    pub kind: MediaOutputType,
    pub result: String,
}

/// The next step of a call flow.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextStepRequest {
    pub media_output: MediaOutput,
    pub seq: u32,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Tally {
    pub count: u32,
    pub note: String,
}

/// A transfer with an optional tally and an untagged payload.
#[derive(Debug, Deserialize)]
pub struct Transfer {
    pub tally: Option<Tally>,
    pub payload: Union,
}
