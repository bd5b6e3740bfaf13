//! Lazily rendered text documents
//!
//! A [`DocumentHolder`] defers reading files and expanding templates until the
//! text is needed, so tasks can be built and planned without touching disk.

use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("hardcoded regex pattern is valid")
});

/// Errors raised while rendering a document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// A file-backed document could not be read.
    #[error("could not read {path}: {source}")]
    Read {
        /// File that failed to read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// A template references a variable that was not supplied.
    #[error("template variable `{0}` is not defined")]
    MissingVariable(String),
}

/// A textual payload that is materialized on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentHolder {
    /// Literal text
    Text(String),
    /// Contents of a file, read at render time
    File(PathBuf),
    /// Another document with `{{ name }}` placeholders substituted
    Template {
        /// Document holding the template text
        source: Box<DocumentHolder>,
        /// Values for the placeholders
        vars: BTreeMap<String, String>,
    },
}

impl DocumentHolder {
    /// Wrap literal text.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Read from a file when rendered.
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }

    /// Treat this document as a template over `vars`.
    pub fn with_vars(self, vars: BTreeMap<String, String>) -> Self {
        Self::Template {
            source: Box::new(self),
            vars,
        }
    }

    /// Render the document to text.
    pub fn as_string(&self) -> Result<String, DocumentError> {
        match self {
            Self::Text(text) => Ok(text.clone()),
            Self::File(path) => std::fs::read_to_string(path).map_err(|source| DocumentError::Read {
                path: path.clone(),
                source,
            }),
            Self::Template { source, vars } => expand(&source.as_string()?, vars),
        }
    }

    /// Short description of where the text comes from.
    pub fn origin(&self) -> String {
        match self {
            Self::Text(_) => "inline".to_string(),
            Self::File(path) => path.display().to_string(),
            Self::Template { source, .. } => format!("template({})", source.origin()),
        }
    }
}

impl From<&str> for DocumentHolder {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for DocumentHolder {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

fn expand(template: &str, vars: &BTreeMap<String, String>) -> Result<String, DocumentError> {
    if let Some(missing) = VARIABLE
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .find(|name| !vars.contains_key(name))
    {
        return Err(DocumentError::MissingVariable(missing));
    }

    let expanded = VARIABLE.replace_all(template, |caps: &Captures| {
        vars.get(&caps[1]).cloned().unwrap_or_default()
    });
    Ok(expanded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_text_renders_verbatim() {
        let doc = DocumentHolder::text(r#"{"Version":"2012-10-17"}"#);
        assert_eq!(doc.as_string().unwrap(), r#"{"Version":"2012-10-17"}"#);
        assert_eq!(doc.origin(), "inline");
    }

    #[test]
    fn test_file_is_read_lazily() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("policy.json");
        let doc = DocumentHolder::file(&path);

        // Not there yet: rendering fails, construction did not.
        assert!(matches!(doc.as_string(), Err(DocumentError::Read { .. })));

        std::fs::write(&path, "{}").unwrap();
        assert_eq!(doc.as_string().unwrap(), "{}");
    }

    #[test]
    fn test_template_substitution() {
        let vars = BTreeMap::from([("bucket".to_string(), "logs".to_string())]);
        let doc = DocumentHolder::text(r#"{"Resource":"arn:aws:s3:::{{ bucket }}/*"}"#).with_vars(vars);
        assert_eq!(
            doc.as_string().unwrap(),
            r#"{"Resource":"arn:aws:s3:::logs/*"}"#
        );
        assert_eq!(doc.origin(), "template(inline)");
    }

    #[test]
    fn test_template_missing_variable() {
        let doc = DocumentHolder::text("{{region}}").with_vars(BTreeMap::new());
        match doc.as_string() {
            Err(DocumentError::MissingVariable(name)) => assert_eq!(name, "region"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_plain_braces_untouched() {
        let doc = DocumentHolder::text(r#"{"Statement":[{}]}"#).with_vars(BTreeMap::new());
        assert_eq!(doc.as_string().unwrap(), r#"{"Statement":[{}]}"#);
    }
}
