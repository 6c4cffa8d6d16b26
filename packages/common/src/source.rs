use crate::error::CommonError;
use crate::result::CommonResult;
use petal_parser::{parse_markup, MarkupDocument};
use std::path::{Path, PathBuf};

/// A template file read from disk together with its parsed markup
#[derive(Debug, Clone)]
pub struct TemplateSource {
    pub path: PathBuf,
    pub text: String,
    pub document: MarkupDocument,
}

impl TemplateSource {
    pub fn load(path: &Path) -> CommonResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_text(path, text)
    }

    pub fn from_text(path: &Path, text: String) -> CommonResult<Self> {
        let document =
            parse_markup(&text).map_err(|e| CommonError::parse(path.display().to_string(), e))?;
        Ok(Self {
            path: path.to_path_buf(),
            text,
            document,
        })
    }

    pub fn display_name(&self) -> String {
        self.path.display().to_string()
    }
}

/// Read a JSON file of initial root data. A missing path yields `{}`.
pub fn load_data(path: Option<&Path>) -> CommonResult<serde_json::Value> {
    match path {
        None => Ok(serde_json::Value::Object(Default::default())),
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_template() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"<div v-scope="{{ n: 1 }}">{{{{ n }}}}</div>"#).unwrap();

        let source = TemplateSource::load(file.path()).unwrap();
        assert_eq!(source.document.nodes.len(), 1);
        assert!(source.text.contains("v-scope"));
    }

    #[test]
    fn test_parse_error_keeps_location() {
        let err = TemplateSource::from_text(Path::new("broken.html"), "<div".to_string())
            .unwrap_err();
        assert!(err.to_string().contains("broken.html"));
        assert!(err.parse_error().is_some());
    }

    #[test]
    fn test_load_data_defaults_to_empty_object() {
        let value = load_data(None).unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[test]
    fn test_load_data_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ nope").unwrap();
        assert!(matches!(
            load_data(Some(file.path())),
            Err(CommonError::Data(_))
        ));
    }
}
