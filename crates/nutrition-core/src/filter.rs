//! Search query model
//!
//! A search is a conjunction of clauses. Text clauses (`food_name`,
//! `maker_name`) use analyzed matching; exact clauses (`research_year`,
//! `food_cd`) use term matching. A query without clauses matches everything.
//!
//! ## Example
//!
//! ```rust
//! use nutrition_core::SearchQuery;
//!
//! let query = SearchQuery::default()
//!     .with_food_name("rice")
//!     .with_research_year("2024")
//!     .page(0, 20);
//! assert_eq!(query.clauses().len(), 2);
//! ```

use serde::{Deserialize, Serialize};

use crate::record::IndexDocument;

/// Default and maximum page size for list and search requests
pub const MAX_PAGE_SIZE: u64 = 100;

/// How a clause value is compared against a document field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Analyzed full-text match
    Text,
    /// Exact keyword term
    Exact,
}

/// A single filter over one index field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchClause {
    pub field: &'static str,
    pub value: String,
    pub kind: MatchKind,
}

impl SearchClause {
    pub fn text(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            kind: MatchKind::Text,
        }
    }

    pub fn exact(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            kind: MatchKind::Exact,
        }
    }

    /// Evaluate the clause against a document held in memory
    ///
    /// Text clauses follow the standard analyzer's default `match` semantics:
    /// lowercase whitespace/punctuation tokens, any query token matching any
    /// field token passes.
    pub fn matches(&self, doc: &IndexDocument) -> bool {
        let Some(field) = field_value(doc, self.field) else {
            return false;
        };

        match self.kind {
            MatchKind::Exact => field == self.value,
            MatchKind::Text => {
                let field_tokens = tokenize(field);
                tokenize(&self.value)
                    .iter()
                    .any(|q| field_tokens.contains(q))
            }
        }
    }
}

fn field_value<'a>(doc: &'a IndexDocument, field: &str) -> Option<&'a str> {
    match field {
        "food_cd" => Some(doc.food_cd.as_str()),
        "food_name" => Some(doc.food_name.as_str()),
        "research_year" => doc.research_year.as_deref(),
        "maker_name" => doc.maker_name.as_deref(),
        "group_name" => doc.group_name.as_deref(),
        "ref_name" => doc.ref_name.as_deref(),
        _ => None,
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Filtered, paginated search request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub food_name: Option<String>,
    #[serde(default)]
    pub research_year: Option<String>,
    #[serde(default)]
    pub maker_name: Option<String>,
    #[serde(default)]
    pub food_code: Option<String>,
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    MAX_PAGE_SIZE
}

impl Default for SearchQuery {
    /// No filters, first page at the full page size
    fn default() -> Self {
        Self {
            food_name: None,
            research_year: None,
            maker_name: None,
            food_code: None,
            skip: 0,
            limit: default_limit(),
        }
    }
}

impl SearchQuery {
    pub fn with_food_name(mut self, v: impl Into<String>) -> Self {
        self.food_name = Some(v.into());
        self
    }

    pub fn with_research_year(mut self, v: impl Into<String>) -> Self {
        self.research_year = Some(v.into());
        self
    }

    pub fn with_maker_name(mut self, v: impl Into<String>) -> Self {
        self.maker_name = Some(v.into());
        self
    }

    pub fn with_food_code(mut self, v: impl Into<String>) -> Self {
        self.food_code = Some(v.into());
        self
    }

    /// Set the page window
    pub fn page(mut self, skip: u64, limit: u64) -> Self {
        self.skip = skip;
        self.limit = limit;
        self
    }

    /// Cap the page size at `MAX_PAGE_SIZE`
    pub fn capped(mut self) -> Self {
        self.limit = self.limit.min(MAX_PAGE_SIZE);
        self
    }

    /// ANDed clauses; blank filter values are ignored
    pub fn clauses(&self) -> Vec<SearchClause> {
        let mut clauses = Vec::new();
        let mut push = |value: &Option<String>, make: fn(String) -> SearchClause| {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                clauses.push(make(v.to_string()));
            }
        };

        push(&self.food_name, |v| SearchClause::text("food_name", v));
        push(&self.research_year, |v| SearchClause::exact("research_year", v));
        push(&self.maker_name, |v| SearchClause::text("maker_name", v));
        push(&self.food_code, |v| SearchClause::exact("food_cd", v));
        clauses
    }

    /// Evaluate all clauses against an in-memory document
    pub fn matches(&self, doc: &IndexDocument) -> bool {
        self.clauses().iter().all(|c| c.matches(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::NewRecord;

    fn doc(code: &str, name: &str, maker: Option<&str>, year: Option<&str>) -> IndexDocument {
        NewRecord {
            maker_name: maker.map(Into::into),
            research_year: year.map(Into::into),
            ..NewRecord::new(code, name)
        }
        .into_record(1)
        .to_document()
    }

    #[test]
    fn test_empty_query_is_match_all() {
        let q = SearchQuery::default().with_food_name("   ");
        assert!(q.clauses().is_empty());
        assert!(q.matches(&doc("A1", "Rice", None, None)));
        assert_eq!((q.skip, q.limit), (0, MAX_PAGE_SIZE));
    }

    #[test]
    fn test_default_matches_deserialized_empty_query() {
        let parsed: SearchQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, SearchQuery::default());
    }

    #[test]
    fn test_text_clause_is_analyzed() {
        let d = doc("A1", "Brown Rice, cooked", Some("Seoul Farm"), None);
        assert!(SearchQuery::default().with_food_name("rice").matches(&d));
        assert!(SearchQuery::default().with_food_name("RICE noodles").matches(&d));
        assert!(SearchQuery::default().with_maker_name("seoul").matches(&d));
        assert!(!SearchQuery::default().with_food_name("bread").matches(&d));
    }

    #[test]
    fn test_exact_clause_needs_full_value() {
        let d = doc("A100", "Rice", None, Some("2024"));
        assert!(SearchQuery::default().with_food_code("A100").matches(&d));
        assert!(!SearchQuery::default().with_food_code("A10").matches(&d));
        assert!(SearchQuery::default().with_research_year("2024").matches(&d));
        assert!(!SearchQuery::default().with_research_year("2023").matches(&d));
    }

    #[test]
    fn test_clauses_are_anded() {
        let d = doc("A1", "Rice", Some("Farm"), Some("2024"));
        let q = SearchQuery::default()
            .with_food_name("rice")
            .with_research_year("2023");
        assert_eq!(q.clauses().len(), 2);
        assert!(!q.matches(&d));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let d = doc("A1", "Rice", None, None);
        assert!(!SearchQuery::default().with_maker_name("farm").matches(&d));
    }

    #[test]
    fn test_capped_limit() {
        let q = SearchQuery::default().page(5, 1000).capped();
        assert_eq!((q.skip, q.limit), (5, MAX_PAGE_SIZE));
    }
}
