use petal_parser::ParseError;
use thiserror::Error;

/// Errors raised while loading templates and their initial data
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Parse error in {location}: {source}")]
    Parse {
        location: String,
        #[source]
        source: ParseError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON data: {0}")]
    Data(#[from] serde_json::Error),

    #[error("{0}")]
    Generic(String),
}

impl CommonError {
    pub fn parse(location: impl Into<String>, source: ParseError) -> Self {
        CommonError::Parse {
            location: location.into(),
            source,
        }
    }

    /// The underlying parse error, when there is one to render with source context
    pub fn parse_error(&self) -> Option<&ParseError> {
        match self {
            CommonError::Parse { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<String> for CommonError {
    fn from(s: String) -> Self {
        CommonError::Generic(s)
    }
}

impl From<&str> for CommonError {
    fn from(s: &str) -> Self {
        CommonError::Generic(s.to_string())
    }
}
