use regex::{Regex, RegexBuilder};
use serde_json::Value;

use crate::{
    collection::{StoreError, StoreResult},
    model::document::Document,
};

#[derive(Clone, Copy, Debug, Default)]
pub struct RegexOptions {
    pub case_insensitive: bool,
}

#[derive(Clone, Debug)]
pub enum Filter {
    /// Matches every document in the collection
    All,
    /// Matches documents whose `field` is a string matching `pattern`
    Regex { field: String, pattern: Regex },
}

impl Filter {
    pub fn regex(field: &str, pattern: &str, options: RegexOptions) -> StoreResult<Filter> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(options.case_insensitive)
            .build()
            .map_err(|err| StoreError::InvalidFilter(err.to_string()))?;

        Ok(Filter::Regex {
            field: field.to_string(),
            pattern,
        })
    }

    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Regex { field, pattern } => match document.get(field) {
                Some(Value::String(value)) => pattern.is_match(value),
                // Non string and missing fields never match a regex
                _ => false,
            },
        }
    }
}
