//! Named selector tables
//!
//! A [`SelectorRegistry`] maps logical element names (`"save_button"`) to
//! Playwright selector expressions. Templates may carry `{param}`
//! placeholders that are filled on every lookup; nothing is cached because
//! the page underneath is dynamic.
//!
//! Lookups never fail. An unknown name, or a template whose placeholder was
//! not supplied, resolves to [`UNRESOLVED`], which the driver refuses to send.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{E2eError, E2eResult};

/// Expression returned for names that are not registered
pub const UNRESOLVED: &str = "";

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectorRegistry {
    entries: BTreeMap<String, String>,
}

impl SelectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a static table
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> E2eResult<Self> {
        let mut registry = Self::new();
        for (name, template) in pairs {
            registry.insert(name, template)?;
        }
        Ok(registry)
    }

    /// Parse a registry from a YAML mapping of name to template
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let entries: BTreeMap<String, String> = serde_yaml::from_str(yaml)?;
        let mut registry = Self::new();
        for (name, template) in entries {
            registry.insert(name, template)?;
        }
        Ok(registry)
    }

    /// Register a template; names are unique
    pub fn insert(&mut self, name: impl Into<String>, template: impl Into<String>) -> E2eResult<()> {
        let name = name.into();
        let template = template.into();

        if name.trim().is_empty() {
            return Err(E2eError::Config("selector name is empty".to_string()));
        }
        if is_unresolved(&template) {
            return Err(E2eError::Config(format!("selector '{}' has an empty expression", name)));
        }
        if self.entries.contains_key(&name) {
            return Err(E2eError::Config(format!("selector '{}' registered twice", name)));
        }

        self.entries.insert(name, template);
        Ok(())
    }

    /// Merge another table into this one
    pub fn extend(&mut self, other: &SelectorRegistry) -> E2eResult<()> {
        for (name, template) in &other.entries {
            self.insert(name.clone(), template.clone())?;
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Resolve a name with parameters
    pub fn resolve(&self, name: &str, params: &[(&str, &str)]) -> String {
        let Some(template) = self.entries.get(name) else {
            warn!("Selector '{}' is not registered", name);
            return UNRESOLVED.to_string();
        };

        let mut missing = None;
        let resolved = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
            let key = &caps[1];
            match params.iter().find(|(k, _)| *k == key) {
                Some((_, value)) => escape_param(value),
                None => {
                    missing.get_or_insert_with(|| key.to_string());
                    String::new()
                }
            }
        });

        if let Some(key) = missing {
            warn!("Selector '{}' needs parameter '{}'", name, key);
            return UNRESOLVED.to_string();
        }

        resolved.into_owned()
    }

    /// Resolve a name without parameters
    pub fn get(&self, name: &str) -> String {
        self.resolve(name, &[])
    }

    /// Resolve, turning an unresolved lookup into a configuration error
    pub fn require(&self, name: &str, params: &[(&str, &str)]) -> E2eResult<String> {
        let expr = self.resolve(name, params);
        if is_unresolved(&expr) {
            return Err(E2eError::UnknownSelector(name.to_string()));
        }
        Ok(expr)
    }

    /// Placeholder names used by a registered template
    pub fn placeholders(&self, name: &str) -> Vec<String> {
        self.entries
            .get(name)
            .map(|t| PLACEHOLDER.captures_iter(t).map(|c| c[1].to_string()).collect())
            .unwrap_or_default()
    }
}

/// Whether an expression is the unresolved marker
pub fn is_unresolved(expr: &str) -> bool {
    expr.trim().is_empty()
}

/// The `index`-th match of `selector`
pub fn nth(selector: &str, index: usize) -> String {
    format!("{} >> nth={}", selector, index)
}

pub fn first(selector: &str) -> String {
    nth(selector, 0)
}

/// `child` searched inside `parent`
pub fn within(parent: &str, child: &str) -> String {
    format!("{} >> {}", parent, child)
}

/// `selector` restricted to elements containing `text`
pub fn has_text(selector: &str, text: &str) -> String {
    format!("{}:has-text(\"{}\")", selector, escape_param(text))
}

/// Parameter values land inside quoted selector strings
fn escape_param(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
