//! Operation definitions loaded from `.graphql` files.
//!
//! Each service owns a directory under one of the query roots. A file
//! `<root>/<service>/<operation>.graphql` holds one operation (plus any
//! local fragments). Loading renames the operation to
//! `<Service>__<Operation>`, prefixes every fragment with the same
//! namespace and appends the definitions of fragments that live in
//! sibling files.

mod document;
mod store;

pub use store::{FRAGMENT_SUFFIX, OperationStore};

use std::fmt;
use std::path::{Path, PathBuf};

use apollo_compiler::ast;
use serde_json::Value;

use switchyard_net::graphql::Variables;

/// What kind of definition a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
    /// Fragment-only file; never sent on its own.
    Fragment,
}

impl OperationKind {
    /// Whether the framework can send this kind over HTTP.
    pub fn is_executable(self) -> bool {
        matches!(self, Self::Query | Self::Mutation)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
            Self::Fragment => "fragment",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ast::OperationType> for OperationKind {
    fn from(ty: ast::OperationType) -> Self {
        match ty {
            ast::OperationType::Query => Self::Query,
            ast::OperationType::Mutation => Self::Mutation,
            ast::OperationType::Subscription => Self::Subscription,
        }
    }
}

/// A variable declared by an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDefinition {
    name: String,
    type_name: String,
    default_value: Option<String>,
    required: bool,
}

impl VariableDefinition {
    pub(crate) fn from_ast(variable: &ast::VariableDefinition) -> Self {
        Self {
            name: variable.name.to_string(),
            type_name: variable.ty.to_string(),
            default_value: variable.default_value.as_ref().map(|value| value.to_string()),
            required: variable.ty.is_non_null() && variable.default_value.is_none(),
        }
    }

    /// Name without the `$`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type as written, e.g. `[String!]!`.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// Non-null and without a default.
    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// A loaded, namespaced operation ready to be sent.
///
/// Definitions are immutable and shared; the store hands out the same
/// `Arc` for every lookup of the same `(service, operation)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDefinition {
    client: String,
    name: String,
    kind: OperationKind,
    variables: Vec<VariableDefinition>,
    query: String,
    path: PathBuf,
}

impl OperationDefinition {
    /// Type-style service name, e.g. `Github`.
    pub fn client(&self) -> &str {
        &self.client
    }

    /// Canonical operation name, e.g. `Github__UserRepositories`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn variables(&self) -> &[VariableDefinition] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&VariableDefinition> {
        self.variables.iter().find(|variable| variable.name == name)
    }

    /// Document text sent to the server, including appended fragments.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Source file the operation was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_executable(&self) -> bool {
        self.kind.is_executable()
    }

    pub fn required_variables(&self) -> impl Iterator<Item = &str> {
        self.variables
            .iter()
            .filter(|variable| variable.required)
            .map(|variable| variable.name.as_str())
    }

    /// Required variables absent (or null) in `variables`.
    pub fn missing_variables(&self, variables: &Variables) -> Vec<String> {
        self.required_variables()
            .filter(|name| matches!(variables.get(*name), None | Some(Value::Null)))
            .map(str::to_string)
            .collect()
    }
}
