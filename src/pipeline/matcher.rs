use std::path::Path;

use glob::{MatchOptions, Pattern};
use thiserror::Error;

use super::Format;

/// Plain globs only: `*`, `?` and character classes. Extended-glob
/// operators, brace sets, negation and comment syntax are rejected when the
/// configuration is loaded, not silently mis-matched at runtime.
const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

const EXTENDED_GLOB_MARKERS: [&str; 5] = ["@(", "!(", "+(", "*(", "?("];

#[derive(Error, Debug)]
pub enum PatternError {
    #[error("invalid match pattern '{pattern}'")]
    Invalid {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("unsupported match pattern '{0}': only plain glob syntax is allowed")]
    Unsupported(String),
    #[error("output path '{0}' has no file name to derive a match pattern from")]
    NoBaseName(String),
}

/// How a rule decides whether an uploaded file name is its business.
pub enum Matcher {
    /// Case-insensitive glob over the uploaded file name
    Glob(Pattern),
    /// Exact prefix over the uploaded file name
    Prefix(String),
}

impl Matcher {
    pub fn glob(pattern: &str) -> Result<Self, PatternError> {
        if pattern.starts_with('!')
            || pattern.starts_with('#')
            || pattern.contains(['{', '}'])
            || EXTENDED_GLOB_MARKERS.iter().any(|m| pattern.contains(m))
        {
            return Err(PatternError::Unsupported(pattern.to_string()));
        }

        let compiled = Pattern::new(pattern).map_err(|source| PatternError::Invalid {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Matcher::Glob(compiled))
    }

    /// Matcher for a rule with no explicit input pattern. Structured outputs
    /// match any upload sharing the output path's base name (sans
    /// extension); copy outputs match the exact base file name.
    pub fn derived(output_path: &str, format: Format) -> Result<Self, PatternError> {
        let path = Path::new(output_path);

        match format {
            Format::Yaml => {
                let stem = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| PatternError::NoBaseName(output_path.to_string()))?;
                Ok(Matcher::Prefix(stem.to_string()))
            }
            Format::Copy => {
                let name = path
                    .file_name()
                    .and_then(|s| s.to_str())
                    .ok_or_else(|| PatternError::NoBaseName(output_path.to_string()))?;
                Self::glob(name)
            }
        }
    }

    pub fn matches(&self, file_name: &str) -> bool {
        match self {
            Matcher::Glob(pattern) => pattern.matches_with(file_name, GLOB_OPTIONS),
            Matcher::Prefix(prefix) => file_name.starts_with(prefix.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_matches_case_insensitively() {
        let matcher = Matcher::glob("*.xlsx").unwrap();

        assert!(matcher.matches("report.xlsx"));
        assert!(matcher.matches("Report.XLSX"));
        assert!(!matcher.matches("report.txt"));
        assert!(!matcher.matches("xlsx"));
    }

    #[test]
    fn glob_rejects_extended_syntax() {
        for pattern in ["!(a|b)", "!negated", "#comment", "{a,b}.xlsx", "+(x)", "@(y)"] {
            let result = Matcher::glob(pattern);
            assert!(
                matches!(result, Err(PatternError::Unsupported(_))),
                "pattern '{pattern}' should be rejected"
            );
        }
    }

    #[test]
    fn glob_rejects_malformed_patterns() {
        assert!(matches!(
            Matcher::glob("[unclosed"),
            Err(PatternError::Invalid { .. })
        ));
    }

    #[test]
    fn derived_yaml_matcher_is_a_prefix_on_the_stem() {
        let matcher = Matcher::derived("config/data.yml", Format::Yaml).unwrap();

        assert!(matcher.matches("data.xlsx"));
        assert!(matcher.matches("data-2024-05.xlsx"));
        assert!(!matcher.matches("otherdata.xlsx"));
        assert!(!matcher.matches("Data.xlsx"));
    }

    #[test]
    fn derived_copy_matcher_is_the_exact_base_name() {
        let matcher = Matcher::derived("assets/logo.png", Format::Copy).unwrap();

        assert!(matcher.matches("logo.png"));
        assert!(matcher.matches("LOGO.PNG"));
        assert!(!matcher.matches("logo.svg"));
        assert!(!matcher.matches("logo.png.bak"));
    }

    #[test]
    fn derived_matcher_needs_a_base_name() {
        assert!(matches!(
            Matcher::derived("..", Format::Copy),
            Err(PatternError::NoBaseName(_))
        ));
    }
}
