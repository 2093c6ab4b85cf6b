//! # Calculator Namespace
//!
//! Locates each calculator's documentation source by name, without
//! instantiating the calculator. Sources are `<name>.md` files whose leading
//! fenced block holds the documentation (see [`crate::spec`]).
//!
//! Two locations are consulted, in order:
//!
//! 1. an optional on-disk directory (`docs_dir` in [`Settings`]),
//! 2. the documentation embedded into the binary from `calc_core/calculators/`.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use rust_embed::RustEmbed;

use crate::config::Settings;
use crate::spec::read_top_block;

const DOC_EXTENSION: &str = "md";

#[derive(RustEmbed)]
#[folder = "calculators/"]
#[include = "*.md"]
struct EmbeddedDocs;

/// Where calculator documentation is read from.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    dir: Option<PathBuf>,
    embedded: bool,
}

impl Namespace {
    /// Embedded documentation only
    pub fn embedded() -> Self {
        Namespace {
            dir: None,
            embedded: true,
        }
    }

    /// On-disk directory first, embedded documentation as fallback
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Namespace {
            dir: Some(dir.into()),
            embedded: true,
        }
    }

    /// On-disk directory only
    pub fn dir_only(dir: impl Into<PathBuf>) -> Self {
        Namespace {
            dir: Some(dir.into()),
            embedded: false,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        match &settings.docs_dir {
            Some(dir) => Namespace::with_dir(dir),
            None => Namespace::embedded(),
        }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Raw documentation source for `name`, if one exists.
    pub fn read_source(&self, name: &str) -> Option<String> {
        if !is_valid_name(name) {
            return None;
        }
        let file_name = format!("{}.{}", name, DOC_EXTENSION);

        if let Some(dir) = &self.dir {
            let path = dir.join(&file_name);
            if path.is_file() {
                match fs::read_to_string(&path) {
                    Ok(source) => return Some(source),
                    Err(e) => {
                        tracing::warn!(calculator = name, path = %path.display(), error = %e, "unreadable documentation file");
                    }
                }
            }
        }

        if self.embedded {
            return EmbeddedDocs::get(&file_name)
                .map(|file| String::from_utf8_lossy(&file.data).into_owned());
        }
        None
    }

    /// The documentation block for `name`, or an empty string when the
    /// source is missing or has no leading block.
    pub fn read_doc_config(&self, name: &str) -> String {
        self.read_source(name)
            .map(|source| read_top_block(&source))
            .unwrap_or_default()
    }

    /// Names that have a documentation source, sorted.
    pub fn documented(&self) -> Vec<String> {
        let mut names = BTreeSet::new();

        if let Some(dir) = &self.dir {
            if let Ok(entries) = fs::read_dir(dir) {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if let Some(name) = doc_stem(&path.to_string_lossy()) {
                        names.insert(name);
                    }
                }
            }
        }

        if self.embedded {
            for file in EmbeddedDocs::iter() {
                if let Some(name) = doc_stem(&file) {
                    names.insert(name);
                }
            }
        }

        names.into_iter().collect()
    }
}

/// Calculator names are plain identifiers; anything else could escape the
/// documentation directory.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn doc_stem(path: &str) -> Option<String> {
    let path = Path::new(path);
    if path.extension().and_then(|e| e.to_str()) != Some(DOC_EXTENSION) {
        return None;
    }
    let stem: Cow<'_, str> = path.file_stem()?.to_string_lossy();
    is_valid_name(&stem).then(|| stem.into_owned())
}
