use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Runtime options, read from the `runtime` section of `petal.config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Opening and closing text interpolation markers
    #[serde(default = "default_delimiters")]
    pub delimiters: [String; 2],

    /// Compiled expressions kept per application (0 disables the cache)
    #[serde(default = "default_cache_capacity")]
    pub expression_cache_capacity: usize,

    /// How often one job may run within a single flush before it is
    /// dropped as runaway recursion
    #[serde(default = "default_max_job_runs")]
    pub max_job_runs: usize,
}

fn default_delimiters() -> [String; 2] {
    ["{{".to_string(), "}}".to_string()]
}

fn default_cache_capacity() -> usize {
    512
}

fn default_max_job_runs() -> usize {
    100
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            delimiters: default_delimiters(),
            expression_cache_capacity: default_cache_capacity(),
            max_job_runs: default_max_job_runs(),
        }
    }
}

impl AppConfig {
    /// Pattern matching one interpolation, capturing the expression between
    /// the delimiters
    pub fn interpolation_pattern(&self) -> Regex {
        let [open, close] = &self.delimiters;
        if open.is_empty() || close.is_empty() {
            return DEFAULT_INTERPOLATION.clone();
        }
        Regex::new(&format!(
            "{}([\\s\\S]+?){}",
            regex::escape(open),
            regex::escape(close)
        ))
        .unwrap_or_else(|_| DEFAULT_INTERPOLATION.clone())
    }
}

static DEFAULT_INTERPOLATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([\s\S]+?)\}\}").expect("default interpolation pattern is valid")
});
