// Filter engine for the explorer
//
// A search is the conjunction of the predicates that were supplied; a reset
// ignores them and previews the head of the table. Searches never return
// more than RESULT_LIMIT rows, and a truncated result says so.

use crate::catalog::CatalogEntry;
use serde::Serialize;
use tracing::debug;

/// Maximum rows returned by a search
pub const RESULT_LIMIT: usize = 1000;

/// Rows shown after a reset
pub const RESET_PREVIEW_ROWS: usize = 10;

/// Wildcard accepted for the confidentiality selector
pub const CONFIDENTIALITY_WILDCARD: &str = "all";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfidentialityFilter {
    #[default]
    All,
    Only(String),
}

impl ConfidentialityFilter {
    /// "all" (any case) and empty input mean no restriction
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim();
        if value.is_empty() || value.eq_ignore_ascii_case(CONFIDENTIALITY_WILDCARD) {
            ConfidentialityFilter::All
        } else {
            ConfidentialityFilter::Only(value.to_string())
        }
    }
}

/// Predicates for a search. `None` (or an empty string) means "not supplied".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery {
    pub mnemonic: Option<String>,
    pub item_code: Option<String>,
    pub item_type: Option<String>,
    pub reporting_form: Option<String>,
    pub confidentiality: ConfidentialityFilter,
}

impl FilterQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mnemonic(mut self, value: impl Into<String>) -> Self {
        self.mnemonic = Some(value.into());
        self
    }

    pub fn item_code(mut self, value: impl Into<String>) -> Self {
        self.item_code = Some(value.into());
        self
    }

    pub fn item_type(mut self, value: impl Into<String>) -> Self {
        self.item_type = Some(value.into());
        self
    }

    pub fn reporting_form(mut self, value: impl Into<String>) -> Self {
        self.reporting_form = Some(value.into());
        self
    }

    pub fn confidentiality(mut self, value: &str) -> Self {
        self.confidentiality = ConfidentialityFilter::parse(value);
        self
    }

    /// True when every supplied predicate holds for `entry`
    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        if let Some(mnemonic) = supplied(&self.mnemonic) {
            if entry.mnemonic != mnemonic {
                return false;
            }
        }

        if let Some(needle) = supplied(&self.item_code) {
            // missing item codes never match a substring search
            let Some(code) = entry.item_code.as_deref() else {
                return false;
            };
            if !code.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }

        if let Some(item_type) = supplied(&self.item_type) {
            if entry.item_type.code() != item_type {
                return false;
            }
        }

        if let Some(form) = supplied(&self.reporting_form) {
            if entry.reporting_form.as_deref() != Some(form) {
                return false;
            }
        }

        if let ConfidentialityFilter::Only(code) = &self.confidentiality {
            if entry.confidentiality.code() != code {
                return false;
            }
        }

        true
    }

    pub fn is_empty(&self) -> bool {
        supplied(&self.mnemonic).is_none()
            && supplied(&self.item_code).is_none()
            && supplied(&self.item_type).is_none()
            && supplied(&self.reporting_form).is_none()
            && self.confidentiality == ConfidentialityFilter::All
    }
}

fn supplied(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterMode {
    Search(FilterQuery),
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Search,
    Reset,
}

/// Rows selected by the engine, in input order.
#[derive(Debug, Clone)]
pub struct FilterResult<'a> {
    pub rows: Vec<&'a CatalogEntry>,
    /// Matches before truncation (search) or size of the input (reset)
    pub total_matches: usize,
    pub truncated: bool,
    pub kind: ResultKind,
}

impl FilterResult<'_> {
    /// Human-readable count line for the results panel
    pub fn summary(&self) -> String {
        match self.kind {
            ResultKind::Reset => format!(
                "Showing first {} rows (total dataset: {} rows)",
                RESET_PREVIEW_ROWS, self.total_matches
            ),
            ResultKind::Search if self.truncated => format!(
                "Found {} rows (showing first {})",
                self.total_matches, RESULT_LIMIT
            ),
            ResultKind::Search => format!("Found {} rows", self.total_matches),
        }
    }
}

/// Apply `mode` to `rows`.
///
/// Accepts any sequence of entry references so a previous result can be
/// filtered again.
pub fn apply<'a, I>(rows: I, mode: &FilterMode) -> FilterResult<'a>
where
    I: IntoIterator<Item = &'a CatalogEntry>,
{
    match mode {
        FilterMode::Reset => {
            let mut total = 0;
            let mut preview = Vec::with_capacity(RESET_PREVIEW_ROWS);
            for entry in rows {
                if preview.len() < RESET_PREVIEW_ROWS {
                    preview.push(entry);
                }
                total += 1;
            }

            FilterResult {
                rows: preview,
                total_matches: total,
                truncated: false,
                kind: ResultKind::Reset,
            }
        }
        FilterMode::Search(query) => {
            let mut total = 0;
            let mut kept = Vec::new();
            for entry in rows.into_iter().filter(|e| query.matches(e)) {
                if kept.len() < RESULT_LIMIT {
                    kept.push(entry);
                }
                total += 1;
            }

            let truncated = total > RESULT_LIMIT;
            debug!(matches = total, truncated, "Applied filter");

            FilterResult {
                rows: kept,
                total_matches: total,
                truncated,
                kind: ResultKind::Search,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::entry;
    use crate::catalog::Catalog;

    fn two_rows() -> Catalog {
        Catalog::from_entries(vec![
            entry("AAAA", "1000", "F", "FormA", "N", "2000-01-01", "9999-12-31"),
            entry("AAAA", "1001", "D", "FormA", "Y", "2001-01-01", "2010-01-01"),
        ])
    }

    fn numbered(n: usize) -> Catalog {
        Catalog::from_entries(
            (0..n)
                .map(|i| entry("SYNT", &format!("{:04}", i), "F", "Form", "N", "", ""))
                .collect(),
        )
    }

    fn search(query: FilterQuery) -> FilterMode {
        FilterMode::Search(query)
    }

    #[test]
    fn test_no_predicates_returns_full_table_in_order() {
        let catalog = numbered(25);
        let result = apply(&catalog, &search(FilterQuery::new()));

        assert_eq!(result.rows.len(), 25);
        assert!(!result.truncated);
        for (row, original) in result.rows.iter().zip(catalog.iter()) {
            assert_eq!(*row, original);
        }
        assert_eq!(result.summary(), "Found 25 rows");
    }

    #[test]
    fn test_item_type_filter_from_scenario() {
        let catalog = two_rows();
        let result = apply(&catalog, &search(FilterQuery::new().item_type("F")));

        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0], &catalog.entries()[0]);
    }

    #[test]
    fn test_confidentiality_all_equals_no_predicate() {
        let catalog = two_rows();
        let with_all = apply(&catalog, &search(FilterQuery::new().confidentiality("all")));
        let without = apply(&catalog, &search(FilterQuery::new()));

        assert_eq!(with_all.rows, without.rows);
        assert!(FilterQuery::new().confidentiality("ALL").is_empty());
    }

    #[test]
    fn test_confidentiality_is_case_sensitive() {
        let catalog = Catalog::from_entries(vec![
            entry("AAAA", "1", "F", "", "N", "", ""),
            entry("AAAA", "2", "F", "", "n", "", ""),
        ]);

        let upper = apply(&catalog, &search(FilterQuery::new().confidentiality("N")));
        assert_eq!(upper.rows.len(), 1);
        assert_eq!(upper.rows[0].item_code.as_deref(), Some("1"));

        let lower = apply(&catalog, &search(FilterQuery::new().confidentiality("n")));
        assert_eq!(lower.rows.len(), 1);
        assert_eq!(lower.rows[0].item_code.as_deref(), Some("2"));
    }

    #[test]
    fn test_item_code_substring_case_insensitive() {
        let catalog = Catalog::from_entries(vec![
            entry("AAAA", "A123", "F", "", "N", "", ""),
            entry("AAAA", "b234", "F", "", "N", "", ""),
            entry("AAAA", "", "F", "", "N", "", ""),
        ]);

        let result = apply(&catalog, &search(FilterQuery::new().item_code("a1")));
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].item_code.as_deref(), Some("A123"));

        let result = apply(&catalog, &search(FilterQuery::new().item_code("23")));
        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn test_null_item_code_never_matches_substring() {
        let catalog = Catalog::from_entries(vec![entry("AAAA", "", "F", "", "N", "", "")]);
        let result = apply(&catalog, &search(FilterQuery::new().item_code("1")));
        assert!(result.rows.is_empty());
    }

    #[test]
    fn test_null_reporting_form_never_matches() {
        let catalog = Catalog::from_entries(vec![
            entry("AAAA", "1", "F", "", "N", "", ""),
            entry("AAAA", "2", "F", "FormA", "N", "", ""),
        ]);
        let result = apply(&catalog, &search(FilterQuery::new().reporting_form("FormA")));
        assert_eq!(result.rows.len(), 1);
    }

    #[test]
    fn test_empty_strings_are_not_predicates() {
        let catalog = two_rows();
        let query = FilterQuery::new().mnemonic("").item_code("").item_type("").reporting_form("");

        assert!(query.is_empty());
        assert_eq!(apply(&catalog, &search(query)).rows.len(), 2);
    }

    #[test]
    fn test_conjunction_of_predicates() {
        let catalog = Catalog::from_entries(vec![
            entry("AAAA", "1000", "F", "FormA", "N", "", ""),
            entry("AAAA", "1000", "F", "FormB", "N", "", ""),
            entry("BBBB", "1000", "F", "FormA", "N", "", ""),
            entry("AAAA", "1000", "D", "FormA", "N", "", ""),
        ]);
        let query = FilterQuery::new()
            .mnemonic("AAAA")
            .item_type("F")
            .reporting_form("FormA")
            .confidentiality("N");

        let result = apply(&catalog, &search(query));
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0], &catalog.entries()[0]);
    }

    #[test]
    fn test_filtering_twice_is_idempotent() {
        let catalog = numbered(40);
        let mode = search(FilterQuery::new().item_code("1"));

        let once = apply(&catalog, &mode);
        let twice = apply(once.rows.iter().copied(), &mode);

        assert_eq!(once.rows, twice.rows);
    }

    #[test]
    fn test_truncates_to_limit_and_signals() {
        let catalog = numbered(1500);
        let result = apply(&catalog, &search(FilterQuery::new().mnemonic("SYNT")));

        assert_eq!(result.rows.len(), RESULT_LIMIT);
        assert_eq!(result.total_matches, 1500);
        assert!(result.truncated);
        assert_eq!(result.rows[0].item_code.as_deref(), Some("0000"));
        assert_eq!(result.rows[999].item_code.as_deref(), Some("0999"));
        assert_eq!(result.summary(), "Found 1500 rows (showing first 1000)");
    }

    #[test]
    fn test_exactly_limit_is_not_truncated() {
        let catalog = numbered(RESULT_LIMIT);
        let result = apply(&catalog, &search(FilterQuery::new()));

        assert_eq!(result.rows.len(), RESULT_LIMIT);
        assert!(!result.truncated);
    }

    #[test]
    fn test_reset_returns_head_of_table() {
        let catalog = numbered(50);
        let result = apply(&catalog, &FilterMode::Reset);

        assert_eq!(result.rows.len(), 10);
        for (i, row) in result.rows.iter().enumerate() {
            assert_eq!(*row, &catalog.entries()[i]);
        }
        assert_eq!(result.total_matches, 50);
        assert_eq!(
            result.summary(),
            "Showing first 10 rows (total dataset: 50 rows)"
        );
    }

    #[test]
    fn test_reset_on_small_table() {
        let catalog = two_rows();
        let result = apply(&catalog, &FilterMode::Reset);
        assert_eq!(result.rows.len(), 2);
    }
}
