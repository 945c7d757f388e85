use regex::{Regex, RegexBuilder};

use crate::error::{PlannerError, Result};
use crate::model::CatalogItem;

/// Case-insensitive substring matcher over a set of exclusion terms
/// (allergies, disliked foods). An empty term list matches nothing.
#[derive(Debug, Clone)]
pub struct ExclusionMatcher {
    pattern: Option<Regex>,
}

impl ExclusionMatcher {
    pub fn new<S: AsRef<str>>(terms: &[S]) -> Result<Self> {
        let escaped: Vec<String> = terms
            .iter()
            .map(|t| t.as_ref().trim())
            .filter(|t| !t.is_empty())
            .map(regex::escape)
            .collect();
        if escaped.is_empty() {
            return Ok(Self { pattern: None });
        }
        let pattern = RegexBuilder::new(&escaped.join("|"))
            .case_insensitive(true)
            .build()
            .map_err(|e| PlannerError::validation(format!("Unusable exclusion terms: {}", e)))?;
        Ok(Self { pattern: Some(pattern) })
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
    }

    pub fn matches_text(&self, text: &str) -> bool {
        self.pattern.as_ref().is_some_and(|p| p.is_match(text))
    }

    /// True when the item's name or any of its ingredients contains a term.
    pub fn matches_item(&self, item: &CatalogItem) -> bool {
        self.matches_text(&item.name) || item.ingredients.iter().any(|i| self.matches_text(i))
    }
}
