//! Declarative fixture catalogs
//!
//! A catalog lists the form fields (filters) and table columns a page is
//! expected to have, with their kind and validation flags. Suites expand each
//! entry into its own scenario. Catalogs are YAML or JSON:
//!
//! ```yaml
//! functionality:
//!   filters:
//!     - { name: Select Stream, type: dropdown, mandatory: true }
//!   tableColumns:
//!     - { name: Created By, readonly: true }
//! ```
//!
//! Loading fails on the first entry without a name, with a duplicate name or
//! with a kind that is not recognized, so a broken catalog never runs.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Dropdown,
    DatePicker,
    FreeText,
    TextArea,
    Checkbox,
    File,
}

impl FromStr for FieldKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "dropdown" | "select" => Ok(FieldKind::Dropdown),
            "datepicker" | "date" => Ok(FieldKind::DatePicker),
            "freetext" | "text" | "input" => Ok(FieldKind::FreeText),
            "textarea" => Ok(FieldKind::TextArea),
            "checkbox" => Ok(FieldKind::Checkbox),
            "file" | "upload" => Ok(FieldKind::File),
            _ => Err(s.to_string()),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Dropdown => "dropdown",
            FieldKind::DatePicker => "date-picker",
            FieldKind::FreeText => "free-text",
            FieldKind::TextArea => "text-area",
            FieldKind::Checkbox => "checkbox",
            FieldKind::File => "file",
        };
        f.write_str(name)
    }
}

/// One checkable UI feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub mandatory: bool,
    pub read_only: bool,
}

impl FixtureDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            mandatory: false,
            read_only: false,
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Form control name: the display name without whitespace
    pub fn control_name(&self) -> String {
        self.name.split_whitespace().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Filter,
    TableColumn,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Filter => f.write_str("filters"),
            Category::TableColumn => f.write_str("tableColumns"),
        }
    }
}

/// Parameters for one generated scenario
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioParams {
    pub title: String,
    #[serde(default)]
    pub fixture: Option<FixtureDescriptor>,
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl ScenarioParams {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn for_fixture(title: impl Into<String>, fixture: FixtureDescriptor) -> Self {
        Self {
            title: title.into(),
            fixture: Some(fixture),
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct RawDescriptor {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "type")]
    kind: Option<String>,
    #[serde(default)]
    mandatory: bool,
    #[serde(default, alias = "readonly", alias = "readOnly")]
    read_only: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFunctionality {
    #[serde(default)]
    filters: Vec<RawDescriptor>,
    #[serde(default)]
    table_columns: Vec<RawDescriptor>,
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    functionality: RawFunctionality,
}

/// Validated fields and columns of one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureCatalog {
    /// Where the catalog came from, for error messages
    pub source: String,
    pub filters: Vec<FixtureDescriptor>,
    pub table_columns: Vec<FixtureDescriptor>,
}

impl FixtureCatalog {
    /// Parse a YAML or JSON catalog
    pub fn parse(source: &str, text: &str) -> E2eResult<Self> {
        let raw: RawCatalog = serde_yaml::from_str(text)
            .map_err(|e| E2eError::fixture(source, e.to_string()))?;

        Ok(Self {
            source: source.to_string(),
            filters: validate(source, Category::Filter, raw.functionality.filters)?,
            table_columns: validate(source, Category::TableColumn, raw.functionality.table_columns)?,
        })
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&path.display().to_string(), &text)
    }

    /// Load every `.yaml`, `.yml` and `.json` catalog under a directory
    ///
    /// A directory that cannot be read is an error, not an empty list.
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut catalogs = Vec::new();

        for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| E2eError::fixture(dir.display().to_string(), e.to_string()))?;
            let is_catalog = entry
                .path()
                .extension()
                .map(|ext| ext == "yaml" || ext == "yml" || ext == "json")
                .unwrap_or(false);
            if !is_catalog || !entry.file_type().is_file() {
                continue;
            }

            debug!("Loading fixture catalog {}", entry.path().display());
            catalogs.push(Self::from_file(entry.path())?);
        }

        Ok(catalogs)
    }

    pub fn entries(&self, category: Category) -> &[FixtureDescriptor] {
        match category {
            Category::Filter => &self.filters,
            Category::TableColumn => &self.table_columns,
        }
    }

    pub fn find(&self, category: Category, name: &str) -> Option<&FixtureDescriptor> {
        self.entries(category).iter().find(|d| d.name == name)
    }

    /// One parameter set per entry of a category
    pub fn scenario_params(
        &self,
        category: Category,
        title: impl Fn(&FixtureDescriptor) -> String,
    ) -> Vec<ScenarioParams> {
        self.entries(category)
            .iter()
            .map(|d| ScenarioParams::for_fixture(title(d), d.clone()))
            .collect()
    }

    /// Parameter sets for the entries matching `keep`
    pub fn scenario_params_where(
        &self,
        category: Category,
        keep: impl Fn(&FixtureDescriptor) -> bool,
        title: impl Fn(&FixtureDescriptor) -> String,
    ) -> Vec<ScenarioParams> {
        self.entries(category)
            .iter()
            .filter(|d| keep(d))
            .map(|d| ScenarioParams::for_fixture(title(d), d.clone()))
            .collect()
    }
}

fn validate(source: &str, category: Category, raw: Vec<RawDescriptor>) -> E2eResult<Vec<FixtureDescriptor>> {
    let mut seen = HashSet::new();
    let mut descriptors = Vec::with_capacity(raw.len());

    for (index, entry) in raw.into_iter().enumerate() {
        let name = match entry.name.map(|n| n.trim().to_string()) {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Err(E2eError::fixture(
                    source,
                    format!("{} entry #{} has no name", category, index + 1),
                ))
            }
        };

        if !seen.insert(name.clone()) {
            return Err(E2eError::fixture(
                source,
                format!("{} entry '{}' is declared twice", category, name),
            ));
        }

        let kind = match entry.kind.as_deref() {
            None => FieldKind::FreeText,
            Some(kind) => kind.parse::<FieldKind>().map_err(|unknown| {
                E2eError::fixture(
                    source,
                    format!("{} entry '{}' has unrecognized kind '{}'", category, name, unknown),
                )
            })?,
        };

        descriptors.push(FixtureDescriptor {
            name,
            kind,
            mandatory: entry.mandatory,
            read_only: entry.read_only,
        });
    }

    Ok(descriptors)
}
