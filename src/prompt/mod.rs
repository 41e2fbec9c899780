//! Prompt templates: flat text files with `{slot}` interpolation markers.
//! Read once per request; no caching.

use std::fs;
use std::path::PathBuf;

use crate::core::errors::PipelineError;

#[derive(Clone)]
pub struct PromptStore {
    dir: PathBuf,
}

impl PromptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Loads `<dir>/<name>.txt`. Missing or unreadable files are a
    /// `Template` failure.
    pub fn load(&self, name: &str) -> Result<PromptTemplate, PipelineError> {
        let path = self.dir.join(format!("{}.txt", name));
        let text = fs::read_to_string(&path)
            .map_err(|e| PipelineError::Template(format!("{}: {}", path.display(), e)))?;
        Ok(PromptTemplate { text })
    }
}

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn raw(&self) -> &str {
        &self.text
    }

    /// Replaces each `{slot}` marker with its value. Slots the template does
    /// not mention are ignored.
    pub fn render(&self, slots: &[(&str, &str)]) -> String {
        let mut out = self.text.clone();
        for (slot, value) in slots {
            out = out.replace(&format!("{{{}}}", slot), value);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn render_fills_named_slots() {
        let template = PromptTemplate {
            text: "Q: {question}\nC: {context}".to_string(),
        };
        let rendered = template.render(&[("question", "왜?"), ("context", "문서")]);
        assert_eq!(rendered, "Q: 왜?\nC: 문서");
    }

    #[test]
    fn load_reads_template_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = fs::File::create(dir.path().join("template_test.txt")).unwrap();
        write!(file, "hello {{question}}").unwrap();

        let store = PromptStore::new(dir.path());
        let template = store.load("template_test").unwrap();
        assert_eq!(template.render(&[("question", "world")]), "hello world");
    }

    #[test]
    fn missing_template_is_a_template_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = PromptStore::new(dir.path());
        let err = store.load("nope").unwrap_err();
        assert!(matches!(err, PipelineError::Template(_)));
    }
}
