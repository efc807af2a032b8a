//! Parsing and namespacing of operation files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use apollo_compiler::Name;
use apollo_compiler::ast;

use super::{OperationKind, VariableDefinition};
use crate::error::{Error, Result};

/// One `.graphql` file after parsing and renaming.
///
/// The operation is renamed to its canonical name; fragments and spreads
/// carry the `<Namespace>__` prefix. Fragments spread here but defined
/// elsewhere are listed in `external_fragments` by their unprefixed name.
#[derive(Debug)]
pub(crate) struct ParsedFile {
    pub(crate) name: String,
    pub(crate) path: PathBuf,
    pub(crate) document: ast::Document,
    pub(crate) kind: OperationKind,
    pub(crate) variables: Vec<VariableDefinition>,
    pub(crate) fragments: Vec<String>,
    pub(crate) external_fragments: Vec<String>,
}

pub(crate) fn parse_operation_file(
    source: &str,
    path: &Path,
    namespace: &str,
    canonical_name: &str,
) -> Result<ParsedFile> {
    let mut document = ast::Document::parse(source, path)
        .map_err(|invalid| Error::parse(path, invalid.errors.to_string()))?;

    let prefix = format!("{namespace}__");
    let fragments: Vec<String> = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            ast::Definition::FragmentDefinition(fragment) => {
                Some(unprefixed(fragment.name.as_str(), &prefix).to_string())
            }
            _ => None,
        })
        .collect();
    let local: HashSet<&str> = fragments.iter().map(String::as_str).collect();

    let mut kind = None;
    let mut variables = Vec::new();
    let mut external_fragments = Vec::new();

    for definition in &mut document.definitions {
        match definition {
            ast::Definition::OperationDefinition(operation) => {
                if kind.is_some() {
                    return Err(Error::parse(
                        path,
                        "expected a single operation per file, found several",
                    ));
                }

                let operation = operation.make_mut();
                operation.name = Some(graphql_name(path, canonical_name)?);
                kind = Some(OperationKind::from(operation.operation_type));
                variables = operation
                    .variables
                    .iter()
                    .map(|variable| VariableDefinition::from_ast(variable))
                    .collect();
                rewrite_spreads(
                    &mut operation.selection_set,
                    &prefix,
                    &local,
                    &mut external_fragments,
                    path,
                )?;
            }
            ast::Definition::FragmentDefinition(fragment) => {
                let fragment = fragment.make_mut();
                let name = format!("{prefix}{}", unprefixed(fragment.name.as_str(), &prefix));
                fragment.name = graphql_name(path, &name)?;
                rewrite_spreads(
                    &mut fragment.selection_set,
                    &prefix,
                    &local,
                    &mut external_fragments,
                    path,
                )?;
            }
            _ => {
                return Err(Error::parse(
                    path,
                    "only operations and fragments may appear in an operation file",
                ));
            }
        }
    }

    let kind = match kind {
        Some(kind) => kind,
        None if !fragments.is_empty() => OperationKind::Fragment,
        None => return Err(Error::parse(path, "document defines no operation")),
    };

    Ok(ParsedFile {
        name: canonical_name.to_string(),
        path: path.to_path_buf(),
        document,
        kind,
        variables,
        fragments,
        external_fragments,
    })
}

fn rewrite_spreads(
    selections: &mut [ast::Selection],
    prefix: &str,
    local: &HashSet<&str>,
    external: &mut Vec<String>,
    path: &Path,
) -> Result<()> {
    for selection in selections.iter_mut() {
        match selection {
            ast::Selection::Field(field) => {
                rewrite_spreads(&mut field.make_mut().selection_set, prefix, local, external, path)?;
            }
            ast::Selection::InlineFragment(inline) => {
                rewrite_spreads(&mut inline.make_mut().selection_set, prefix, local, external, path)?;
            }
            ast::Selection::FragmentSpread(spread) => {
                let spread = spread.make_mut();
                let original = unprefixed(spread.fragment_name.as_str(), prefix).to_string();
                spread.fragment_name = graphql_name(path, &format!("{prefix}{original}"))?;
                if !local.contains(original.as_str()) && !external.contains(&original) {
                    external.push(original);
                }
            }
        }
    }
    Ok(())
}

pub(crate) fn unprefixed<'a>(name: &'a str, prefix: &str) -> &'a str {
    name.strip_prefix(prefix).unwrap_or(name)
}

fn graphql_name(path: &Path, name: &str) -> Result<Name> {
    Name::new(name).map_err(|_| Error::parse(path, format!("`{name}` is not a valid GraphQL name")))
}
