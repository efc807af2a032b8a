use std::fmt;

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{NetworkError, Result};

/// One entry of an envelope's `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<GraphQLLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: None,
            extensions: None,
        }
    }
}

/// `message (at a.b.[0])` when a path is present.
impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        let Some(path) = &self.path else {
            return Ok(());
        };
        let rendered: Vec<String> = path.iter().map(PathSegment::to_string).collect();
        write!(f, " (at {})", rendered.join("."))
    }
}

impl std::error::Error for GraphQLError {}

/// 1-based position in the request document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQLLocation {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// The `{data, errors, extensions}` object a GraphQL server answers with.
///
/// `errors` and `extensions` read as empty when absent or `null`; `data`
/// stays `None` in both cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub errors: Vec<GraphQLError>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Map::is_empty"
    )]
    pub extensions: Map<String, Value>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl GraphQLResponse {
    /// What the test adapter answers when no stub matches.
    pub fn placeholder() -> Self {
        Self {
            data: Some(Value::Object(Map::new())),
            errors: Vec::new(),
            extensions: Map::new(),
        }
    }

    /// `data: null` plus a single error. Used for unexpected HTTP statuses.
    pub fn from_error_message(message: impl Into<String>) -> Self {
        Self {
            data: None,
            errors: vec![GraphQLError::new(message)],
            extensions: Map::new(),
        }
    }

    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| NetworkError::Json(format!("not a GraphQL response: {e}")))
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Data present and no errors.
    pub fn is_success(&self) -> bool {
        self.data.is_some() && !self.has_errors()
    }

    /// Every error message joined with `"; "`.
    pub fn error_message(&self) -> Option<String> {
        if !self.has_errors() {
            return None;
        }
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        Some(messages.join("; "))
    }

    pub fn raw_data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Decode `data` into `T`. Fails when the envelope carries errors.
    pub fn data<T: DeserializeOwned>(&self) -> Result<T> {
        let data = self.checked_data()?;
        T::deserialize(data).map_err(|e| NetworkError::Json(format!("cannot decode data: {e}")))
    }

    /// Decode `data[name]` into `T`. Fails when the envelope carries
    /// errors or the field is missing.
    ///
    /// ```ignore
    /// let repository: Repository = response.field("repository")?;
    /// ```
    pub fn field<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self
            .checked_data()?
            .as_object()
            .ok_or_else(|| NetworkError::Json("data is not an object".into()))?
            .get(name)
            .ok_or_else(|| NetworkError::Json(format!("no `{name}` in data")))?;
        T::deserialize(value)
            .map_err(|e| NetworkError::Json(format!("cannot decode `{name}`: {e}")))
    }

    fn checked_data(&self) -> Result<&Value> {
        if let Some(message) = self.error_message() {
            return Err(NetworkError::Request(format!("GraphQL errors: {message}")));
        }
        self.data
            .as_ref()
            .ok_or_else(|| NetworkError::Json("response has no data".into()))
    }
}
