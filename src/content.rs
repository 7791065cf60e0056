//! Read-only quote and deed collections.
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::model::{Deed, Quote};

const BUILTIN_CONTENT: &str = include_str!("../data/content.yaml");

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("content parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("content has no {0}")]
    Empty(&'static str),
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ContentStore {
    quotes: Vec<Quote>,
    deeds: Vec<Deed>,
}

impl ContentStore {
    pub fn new(quotes: Vec<Quote>, deeds: Vec<Deed>) -> Result<Self, ContentError> {
        let store = Self { quotes, deeds };
        store.validate()?;
        Ok(store)
    }

    /// Content bundled into the binary from `data/content.yaml`.
    pub fn builtin() -> Result<Self, ContentError> {
        Self::parse(BUILTIN_CONTENT)
    }

    /// Load a YAML (or JSON) content file with `quotes` and `deeds` lists.
    pub fn load(path: &Path) -> Result<Self, ContentError> {
        let raw = fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// `path` when given, otherwise the bundled content.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, ContentError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ContentError> {
        let store: ContentStore = serde_yaml::from_str(raw)?;
        store.validate()?;
        Ok(store)
    }

    fn validate(&self) -> Result<(), ContentError> {
        if self.quotes.is_empty() {
            return Err(ContentError::Empty("quotes"));
        }
        if self.deeds.is_empty() {
            return Err(ContentError::Empty("deeds"));
        }
        Ok(())
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn deeds(&self) -> &[Deed] {
        &self.deeds
    }

    /// Quote and deed for the given day, each rotating independently.
    pub fn pick(&self, day_count: i64) -> (&Quote, &Deed) {
        let quote = &self.quotes[rotation_index(day_count, self.quotes.len())];
        let deed = &self.deeds[rotation_index(day_count, self.deeds.len())];
        (quote, deed)
    }
}

/// `(day_count - 1) mod len`, always in `0..len`. Day 1 maps to 0; zero and
/// negative counts wrap from the end rather than panicking.
pub fn rotation_index(day_count: i64, len: usize) -> usize {
    debug_assert!(len > 0, "rotation over an empty collection");
    let len = len as i64;
    (day_count.wrapping_sub(1)).rem_euclid(len) as usize
}
