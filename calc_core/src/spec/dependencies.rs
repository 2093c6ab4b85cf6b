//! `[dependencies]` section parsing.
//!
//! Supported forms inside the section:
//!
//! ```text
//! [dependencies]
//! - numpy
//! * pydantic>=1.10
//! scipy, pandas
//! ```
//!
//! The section ends at the next `[section]` header, or at the first blank
//! line once something has been collected.

use super::{is_section_header, opens_section};

/// Parse the `[dependencies]` section into requirement strings.
///
/// Order is preserved and duplicates are dropped.
pub fn parse_dependencies(doc_config: &str) -> Vec<String> {
    let mut deps: Vec<String> = Vec::new();
    let mut in_block = false;

    for raw in doc_config.lines() {
        let line = raw.trim();
        if !in_block {
            in_block = opens_section(line, "dependencies");
            continue;
        }
        if line.is_empty() {
            if deps.is_empty() {
                continue;
            }
            break;
        }
        if is_section_header(line) {
            break;
        }

        for part in strip_bullet(line).split(',') {
            let part = part.trim();
            if !part.is_empty() && !deps.iter().any(|d| d == part) {
                deps.push(part.to_string());
            }
        }
    }

    deps
}

/// Render requirements back into a `[dependencies]` block.
pub fn format_dependencies(deps: &[String]) -> String {
    let mut block = String::from("[dependencies]\n");
    for dep in deps {
        block.push_str("- ");
        block.push_str(dep);
        block.push('\n');
    }
    block
}

/// Drop a leading `-` or `*` bullet followed by whitespace.
fn strip_bullet(line: &str) -> &str {
    let mut chars = line.chars();
    match (chars.next(), chars.next()) {
        (Some('-' | '*'), Some(c)) if c.is_whitespace() => line[1..].trim_start(),
        _ => line,
    }
}
