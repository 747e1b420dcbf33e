//! Partial path and local variable derivation.
//!
//! A partial rendered for an object binds that object to a local named after
//! the partial: `posts/_post` binds `post`, `_item.html` binds `item`. In a
//! collection render it also binds `post_counter` and `post_iteration`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::RenderConfig;
use crate::error::{IdentifierKind, RenderError};
use crate::lookup::LookupContext;
use crate::template::variable_from_path;

use super::Renderable;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\A[a-z_][a-zA-Z0-9_]*\z").expect("identifier pattern is a valid regex")
});

/// Local names bound for each element rendered through one partial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationNames {
    /// Partial path the element renders through.
    pub path: String,
    /// Local bound to the element.
    pub variable: String,
    /// Local bound to the element's index.
    pub counter: String,
    /// Local bound to the [`PartialIteration`](super::PartialIteration).
    pub iteration: String,
}

/// Checks `name` against the local variable grammar `[a-z_][a-zA-Z0-9_]*`.
pub fn validate_identifier(name: &str, kind: IdentifierKind) -> Result<(), RenderError> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(RenderError::InvalidIdentifier {
            name: name.to_string(),
            kind,
        })
    }
}

/// Local variable a partial path binds: `as_variable` when given, otherwise
/// the basename without its leading underscore and dotted suffixes.
pub fn local_variable(path: &str, as_variable: Option<&str>) -> Result<String, RenderError> {
    if let Some(name) = as_variable {
        validate_identifier(name, IdentifierKind::AsOption)?;
        return Ok(name.to_string());
    }
    let variable = variable_from_path(path).ok_or_else(|| RenderError::InvalidIdentifier {
        name: path.to_string(),
        kind: IdentifierKind::PartialName,
    })?;
    validate_identifier(variable, IdentifierKind::PartialName)?;
    Ok(variable.to_string())
}

/// The variable, counter and iteration names for `path`.
pub fn retrieve_variables(
    path: &str,
    as_variable: Option<&str>,
) -> Result<IterationNames, RenderError> {
    let variable = local_variable(path, as_variable)?;
    Ok(IterationNames {
        path: path.to_string(),
        counter: format!("{}_counter", variable),
        iteration: format!("{}_iteration", variable),
        variable,
    })
}

/// Nests an object's partial path under the namespace of the current prefix.
///
/// `("admin/posts", "posts/post")` → `admin/posts/post`. Directories shared by
/// both sides are not repeated, and either side without a `/` leaves the
/// object path unchanged.
pub fn merge_prefix_into_object_path(prefix: &str, object_path: &str) -> String {
    if !(prefix.contains('/') && object_path.contains('/')) {
        return object_path.to_string();
    }

    let namespace: Vec<&str> = match prefix.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    let object_dirs: Vec<&str> = object_path.split('/').collect();
    let object_dirs = &object_dirs[..object_dirs.len().saturating_sub(2)];

    let mut merged: Vec<&str> = Vec::new();
    for (index, dir) in namespace.iter().enumerate() {
        if object_dirs.get(index) == Some(dir) {
            break;
        }
        merged.push(*dir);
    }
    merged.push(object_path);
    merged.join("/")
}

/// Partial path an object renders through in the given lookup context.
///
/// # Errors
///
/// [`RenderError::NotRenderable`] if the object carries no partial path.
pub fn partial_path(
    object: &Renderable,
    context: &LookupContext,
    config: &RenderConfig,
) -> Result<String, RenderError> {
    let path = object.to_partial_path()?;

    if !config.prefix_partial_path_with_namespace {
        return Ok(path.to_string());
    }
    match context.prefixes().first() {
        Some(prefix) => Ok(context
            .prefixed_paths()
            .fetch(prefix, path, || merge_prefix_into_object_path(prefix, path))),
        None => Ok(path.to_string()),
    }
}
