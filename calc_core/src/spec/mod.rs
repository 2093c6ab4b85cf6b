//! # Calculator Documentation Specs
//!
//! Each calculator carries one documentation block that is both the human
//! documentation and its machine-readable contract. The block is split
//! into `[section]`s:
//!
//! - `[inputs]` - field sub-blocks, see [`parse_inputs`]
//! - `[dependencies]` - requirement strings, see [`parse_dependencies`]
//! - anything else (`[result]`, `[working]`, `[metadata]`, ...) is
//!   documentation only
//!
//! Parsing never fails. Malformed or partial blocks degrade to empty lists
//! so one broken document cannot break listing of the others.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::spec::{parse_dependencies, read_top_block, title};
//!
//! let source = "+++\n# Demo\n\n[dependencies]\n- foo\n- bar>=1.0\n+++\nbody";
//! let doc = read_top_block(source);
//!
//! assert_eq!(title("demo", &doc), "# Demo");
//! assert_eq!(parse_dependencies(&doc), vec!["foo", "bar>=1.0"]);
//! ```

mod dependencies;
mod inputs;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use dependencies::{format_dependencies, parse_dependencies};
pub use inputs::{parse_inputs, FieldType, InputField};

/// A calculator's name and raw documentation block.
///
/// Built fresh on every lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatorSpec {
    /// Unique lookup key
    pub name: String,
    /// Raw documentation block (may be empty)
    pub doc_config: String,
}

impl CalculatorSpec {
    pub fn new(name: impl Into<String>, doc_config: impl Into<String>) -> Self {
        CalculatorSpec {
            name: name.into(),
            doc_config: doc_config.into(),
        }
    }

    pub fn title(&self) -> String {
        title(&self.name, &self.doc_config)
    }

    pub fn dependencies(&self) -> Vec<String> {
        parse_dependencies(&self.doc_config)
    }

    pub fn inputs(&self) -> Vec<InputField> {
        parse_inputs(&self.doc_config)
    }
}

static TOP_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(?:"""([\s\S]*?)"""|'''([\s\S]*?)'''|\+\+\+([\s\S]*?)\+\+\+)"#)
        .expect("top block pattern is valid")
});

static SECTION_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[[^\]]+\]").expect("section header pattern is valid"));

/// Extract the first fenced block at the top of a document.
///
/// Fences are `"""`, `'''` or `+++`; only whitespace may precede the opening
/// fence. Returns the trimmed content, or an empty string.
pub fn read_top_block(source: &str) -> String {
    TOP_BLOCK
        .captures(source)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// First non-empty line of the block, or `name` when the block is empty.
pub fn title(name: &str, doc_config: &str) -> String {
    doc_config
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| name.to_string())
}

/// True if a trimmed line opens a new `[section]`.
pub(crate) fn is_section_header(line: &str) -> bool {
    SECTION_HEADER.is_match(line)
}

/// True if a trimmed line opens the named section (case-insensitive).
pub(crate) fn opens_section(line: &str, section: &str) -> bool {
    let header = format!("[{}]", section);
    line.get(..header.len())
        .map(|prefix| prefix.eq_ignore_ascii_case(&header))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_top_block_fences() {
        assert_eq!(read_top_block("\"\"\"\n# BMI\n\"\"\"\nrest"), "# BMI");
        assert_eq!(read_top_block("'''  Title '''"), "Title");
        assert_eq!(read_top_block("\n\n+++\n# DCCT\n[inputs]\n+++"), "# DCCT\n[inputs]");
    }

    #[test]
    fn test_read_top_block_missing() {
        assert_eq!(read_top_block(""), "");
        assert_eq!(read_top_block("no block here\n+++\nlate\n+++"), "");
        assert_eq!(read_top_block("+++ unterminated"), "");
    }

    #[test]
    fn test_title() {
        assert_eq!(title("bmi", "\n\n  # BMI Calculator  \nmore"), "# BMI Calculator");
        assert_eq!(title("bmi", ""), "bmi");
        assert_eq!(title("bmi", "   \n  "), "bmi");
    }

    #[test]
    fn test_title_matches_first_line_of_block() {
        let spec = CalculatorSpec::new("x", read_top_block("+++\n# X Calc\n\n[inputs]\n+++"));
        assert_eq!(spec.doc_config.lines().next().unwrap(), spec.title());
    }

    #[test]
    fn test_section_helpers() {
        assert!(is_section_header("[result]"));
        assert!(!is_section_header("unit: lb (UCUM: [lb_av])"));
        assert!(!is_section_header("[]"));
        assert!(opens_section("[Dependencies]", "dependencies"));
        assert!(opens_section("[INPUTS] trailing", "inputs"));
        assert!(!opens_section("[input]", "inputs"));
        assert!(!opens_section("[dé", "dependencies"));
    }
}
