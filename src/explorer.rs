// Explorer handlers
//
// Each user interaction maps to one call here: the caller passes the current
// control values, gets back the whole view state. Nothing is cached between
// calls and the catalog is only read.

use crate::aggregate::Aggregator;
use crate::catalog::{Catalog, CatalogEntry, Column, Confidentiality, ItemType};
use crate::charts::{self, ChartSeries};
use crate::filter::{self, ConfidentialityFilter, FilterMode, FilterQuery, ResultKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Shown in the detail panel until a row is selected
pub const NO_SELECTION_MESSAGE: &str = "Select a row from the results table to view details";

/// Raw values of the filter controls, as submitted by a form or query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExplorerInput {
    pub mnemonic: Option<String>,
    pub item_code: Option<String>,
    pub item_type: Option<String>,
    pub reporting_form: Option<String>,
    /// "all" or a confidentiality code
    pub confidentiality: Option<String>,
}

impl ExplorerInput {
    pub fn to_query(&self) -> FilterQuery {
        let clean = |v: &Option<String>| {
            v.as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        FilterQuery {
            mnemonic: clean(&self.mnemonic),
            item_code: clean(&self.item_code),
            item_type: clean(&self.item_type),
            reporting_form: clean(&self.reporting_form),
            confidentiality: self
                .confidentiality
                .as_deref()
                .map(ConfidentialityFilter::parse)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// First render, before any button was pressed
    Initial,
    Search,
    Reset,
}

/// Table projection of a catalog entry; absent values are empty strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub mnemonic: String,
    pub item_code: String,
    pub item_name: String,
    pub item_type: String,
    pub reporting_form: String,
    pub confidentiality: String,
    pub start_date: String,
    pub end_date: String,
}

impl From<&CatalogEntry> for ResultRow {
    fn from(entry: &CatalogEntry) -> Self {
        let date = |d: Option<chrono::NaiveDate>| {
            d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
        };
        Self {
            mnemonic: entry.mnemonic.clone(),
            item_code: entry.item_code.clone().unwrap_or_default(),
            item_name: entry.item_name.clone(),
            item_type: entry.item_type.code().to_string(),
            reporting_form: entry.reporting_form.clone().unwrap_or_default(),
            confidentiality: entry.confidentiality.code().to_string(),
            start_date: date(entry.start_date),
            end_date: date(entry.end_date),
        }
    }
}

/// The three always-on charts, computed from the full catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionCharts {
    pub mnemonics: ChartSeries,
    pub item_types: ChartSeries,
    pub confidentiality: ChartSeries,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplorerView {
    pub rows: Vec<ResultRow>,
    pub count_text: String,
    pub total_matches: usize,
    pub truncated: bool,
    pub kind: ResultKind,
    pub charts: DistributionCharts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

impl SelectOption {
    fn plain(value: &str) -> Self {
        Self {
            label: value.to_string(),
            value: value.to_string(),
        }
    }
}

/// Choices offered by the selector controls
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub mnemonics: Vec<SelectOption>,
    pub item_types: Vec<SelectOption>,
    pub reporting_forms: Vec<SelectOption>,
    pub confidentiality: Vec<SelectOption>,
}

pub fn distribution_charts(catalog: &Catalog) -> DistributionCharts {
    let agg = Aggregator::new(catalog);
    DistributionCharts {
        mnemonics: charts::mnemonic_chart(&agg),
        item_types: charts::item_type_chart(&agg),
        confidentiality: charts::confidentiality_chart(&agg),
    }
}

/// Handle a search/reset/initial render.
///
/// Reset ignores `input`. Charts always describe the whole catalog, not the
/// filtered rows.
pub fn handle(catalog: &Catalog, action: Action, input: &ExplorerInput) -> ExplorerView {
    let mode = match action {
        Action::Reset => FilterMode::Reset,
        Action::Initial | Action::Search => FilterMode::Search(input.to_query()),
    };
    let result = filter::apply(catalog, &mode);

    ExplorerView {
        count_text: result.summary(),
        rows: result.rows.iter().map(|e| ResultRow::from(*e)).collect(),
        total_matches: result.total_matches,
        truncated: result.truncated,
        kind: result.kind,
        charts: distribution_charts(catalog),
    }
}

/// Full record text for a selected `(mnemonic, item_code)` pair.
pub fn item_details(catalog: &Catalog, selection: Option<(&str, &str)>) -> String {
    selection
        .and_then(|(mnemonic, item_code)| catalog.find(mnemonic, item_code))
        .map(format_details)
        .unwrap_or_else(|| NO_SELECTION_MESSAGE.to_string())
}

fn format_details(entry: &CatalogEntry) -> String {
    let date = |d: Option<chrono::NaiveDate>| {
        d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
    };
    format!(
        "MDRM Identifier: {}\n\
         Item Name: {}\n\
         Reporting Form: {}\n\
         Item Type: {}\n\
         Confidentiality: {}\n\
         Start Date: {}\n\
         End Date: {}\n\
         \n\
         Description:\n{}\n\
         \n\
         Series Glossary:\n{}\n",
        entry.mdrm_identifier(),
        entry.item_name,
        entry.reporting_form.as_deref().unwrap_or(""),
        entry.item_type.code(),
        entry.confidentiality.code(),
        date(entry.start_date),
        date(entry.end_date),
        entry.description.as_deref().unwrap_or(""),
        entry.series_glossary.as_deref().unwrap_or(""),
    )
}

pub fn filter_options(catalog: &Catalog) -> FilterOptions {
    let sorted = |column: Column| -> Vec<SelectOption> {
        catalog
            .iter()
            .filter_map(|e| e.value(column))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(SelectOption::plain)
            .collect()
    };

    FilterOptions {
        mnemonics: sorted(Column::Mnemonic),
        reporting_forms: sorted(Column::ReportingForm),
        item_types: ItemType::KNOWN
            .iter()
            .map(|t| SelectOption {
                label: t.label(),
                value: t.code().to_string(),
            })
            .collect(),
        confidentiality: vec![
            SelectOption {
                label: "All".to_string(),
                value: filter::CONFIDENTIALITY_WILDCARD.to_string(),
            },
            SelectOption {
                label: Confidentiality::Public.label(),
                value: Confidentiality::Public.code().to_string(),
            },
            SelectOption {
                label: Confidentiality::Confidential.label(),
                value: Confidentiality::Confidential.code().to_string(),
            },
        ],
    }
}
