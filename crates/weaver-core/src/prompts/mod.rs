//! Instruction-template store.
//!
//! Eight fixed templates drive the pipeline, one per stage. Defaults are
//! defined in `defaults.toml` and embedded in the binary at compile time;
//! a host may override any of them with `<name>.txt` files in a directory.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Names of the instruction templates the engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PromptName {
    Guardrail,
    Planner,
    Table,
    List,
    Formatting,
    FlowChart,
    TableEdit,
    FinalTemplate,
}

impl PromptName {
    /// Every template name, in pipeline order.
    pub const ALL: [PromptName; 8] = [
        PromptName::Guardrail,
        PromptName::Planner,
        PromptName::Table,
        PromptName::List,
        PromptName::Formatting,
        PromptName::FlowChart,
        PromptName::TableEdit,
        PromptName::FinalTemplate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guardrail => "guardrail",
            Self::Planner => "planner",
            Self::Table => "table",
            Self::List => "list",
            Self::Formatting => "formatting",
            Self::FlowChart => "flow_chart",
            Self::TableEdit => "table_edit",
            Self::FinalTemplate => "final_template",
        }
    }
}

impl fmt::Display for PromptName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptName {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| PromptError::UnknownName(s.to_owned()))
    }
}

/// Errors from loading template overrides.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("unknown prompt name: {0:?}")]
    UnknownName(String),

    #[error("failed to read prompt override {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("prompt override directory {0} does not exist")]
    MissingDir(PathBuf),
}

/// The embedded template defaults.
static DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Resolved set of instruction templates, one per [`PromptName`].
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    templates: HashMap<PromptName, String>,
}

impl PromptLibrary {
    /// Load the built-in templates.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed or lacks a template. Both are
    /// compile-time invariants: if the test suite passes, the file is valid.
    pub fn builtin() -> Self {
        let raw: HashMap<String, String> =
            toml::from_str(DEFAULTS_TOML).expect("embedded defaults.toml is invalid");
        let templates = PromptName::ALL
            .into_iter()
            .map(|name| {
                let text = raw
                    .get(name.as_str())
                    .unwrap_or_else(|| panic!("embedded defaults.toml lacks {name}"));
                (name, text.trim().to_owned())
            })
            .collect();
        Self { templates }
    }

    /// Load the built-in templates, then replace each one for which
    /// `dir/<name>.txt` exists.
    pub fn with_overrides(dir: &Path) -> Result<Self, PromptError> {
        if !dir.is_dir() {
            return Err(PromptError::MissingDir(dir.to_path_buf()));
        }

        let mut library = Self::builtin();
        for name in PromptName::ALL {
            let path = dir.join(format!("{name}.txt"));
            if !path.exists() {
                continue;
            }
            let text = std::fs::read_to_string(&path).map_err(|source| PromptError::Io {
                path: path.clone(),
                source,
            })?;
            tracing::debug!(prompt = %name, path = %path.display(), "loaded prompt override");
            library.templates.insert(name, text.trim().to_owned());
        }
        Ok(library)
    }

    /// Replace a single template. Builder-style, mostly for tests and hosts
    /// that keep templates elsewhere.
    pub fn with_template(mut self, name: PromptName, text: impl Into<String>) -> Self {
        self.templates.insert(name, text.into());
        self
    }

    /// Return the template text for `name`.
    pub fn get(&self, name: PromptName) -> &str {
        self.templates.get(&name).map(String::as_str).unwrap_or_default()
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_every_template() {
        let library = PromptLibrary::builtin();
        for name in PromptName::ALL {
            assert!(!library.get(name).is_empty(), "{name} is empty");
        }
    }

    #[test]
    fn final_template_mentions_aggregate_token() {
        let library = PromptLibrary::builtin();
        assert!(library.get(PromptName::FinalTemplate).contains("{artifacts}"));
    }

    #[test]
    fn names_round_trip_through_strings() {
        for name in PromptName::ALL {
            assert_eq!(name.as_str().parse::<PromptName>().unwrap(), name);
        }
        assert!(matches!(
            "summary".parse::<PromptName>(),
            Err(PromptError::UnknownName(ref n)) if n == "summary"
        ));
    }

    #[test]
    fn overrides_replace_only_present_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("table.txt"), "  custom table prompt \n").unwrap();

        let library = PromptLibrary::with_overrides(dir.path()).unwrap();
        assert_eq!(library.get(PromptName::Table), "custom table prompt");
        assert_eq!(
            library.get(PromptName::List),
            PromptLibrary::builtin().get(PromptName::List)
        );
    }

    #[test]
    fn missing_override_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = PromptLibrary::with_overrides(&missing).unwrap_err();
        assert!(matches!(err, PromptError::MissingDir(_)));
    }

    #[test]
    fn with_template_replaces_text() {
        let library = PromptLibrary::builtin().with_template(PromptName::Guardrail, "G");
        assert_eq!(library.get(PromptName::Guardrail), "G");
    }
}
