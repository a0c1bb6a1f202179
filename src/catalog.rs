use crate::error::CatalogError;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Year used by the catalog to mark open-ended validity ("still in effect")
pub const ACTIVE_SENTINEL_YEAR: i32 = 9999;

// ============================================================================
// ITEM TYPE
// ============================================================================

/// Kind of data item, keyed by the one-letter code used in the export.
///
/// Codes outside the documented set are kept verbatim in `Other` so that
/// counts and filters never lose information.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum ItemType {
    Financial,
    Derived,
    Percentage,
    Rate,
    Structure,
    Projected,
    Other(String),
}

impl ItemType {
    pub const KNOWN: [ItemType; 6] = [
        ItemType::Financial,
        ItemType::Derived,
        ItemType::Percentage,
        ItemType::Rate,
        ItemType::Structure,
        ItemType::Projected,
    ];

    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "F" => ItemType::Financial,
            "D" => ItemType::Derived,
            "P" => ItemType::Percentage,
            "R" => ItemType::Rate,
            "S" => ItemType::Structure,
            "J" => ItemType::Projected,
            other => ItemType::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            ItemType::Financial => "F",
            ItemType::Derived => "D",
            ItemType::Percentage => "P",
            ItemType::Rate => "R",
            ItemType::Structure => "S",
            ItemType::Projected => "J",
            ItemType::Other(code) => code,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ItemType::Financial => "Financial/reported",
            ItemType::Derived => "Derived",
            ItemType::Percentage => "Percentage",
            ItemType::Rate => "Rate",
            ItemType::Structure => "Structure",
            ItemType::Projected => "Projected",
            ItemType::Other(_) => "Other",
        }
    }

    /// Selector label, e.g. "Financial/reported (F)"
    pub fn label(&self) -> String {
        format!("{} ({})", self.name(), self.code())
    }
}

impl Default for ItemType {
    fn default() -> Self {
        ItemType::Other(String::new())
    }
}

impl From<String> for ItemType {
    fn from(code: String) -> Self {
        ItemType::from_code(&code)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// CONFIDENTIALITY
// ============================================================================

/// Confidentiality flag: `N` public, `Y` confidential.
///
/// The published export also contains a lowercase `n`. It is not folded into
/// `Public`; it stays a category of its own under `Other("n")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum Confidentiality {
    Public,
    Confidential,
    Other(String),
}

impl Confidentiality {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "N" => Confidentiality::Public,
            "Y" => Confidentiality::Confidential,
            other => Confidentiality::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Confidentiality::Public => "N",
            Confidentiality::Confidential => "Y",
            Confidentiality::Other(code) => code,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Confidentiality::Public => "Public",
            Confidentiality::Confidential => "Confidential",
            Confidentiality::Other(_) => "Unclassified",
        }
    }

    pub fn label(&self) -> String {
        format!("{} ({})", self.name(), self.code())
    }
}

impl Default for Confidentiality {
    fn default() -> Self {
        Confidentiality::Other(String::new())
    }
}

impl From<String> for Confidentiality {
    fn from(code: String) -> Self {
        Confidentiality::from_code(&code)
    }
}

impl fmt::Display for Confidentiality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// CATALOG ENTRY
// ============================================================================

/// One row of the MDRM export.
///
/// Dates are `None` when the cell was empty or could not be read as a
/// calendar date; that is the "unknown" state, never an error.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CatalogEntry {
    #[serde(rename = "Mnemonic")]
    pub mnemonic: String,

    #[serde(rename = "Item Code")]
    pub item_code: Option<String>,

    #[serde(rename = "Item Name")]
    pub item_name: String,

    #[serde(rename = "ItemType", alias = "Item Type")]
    pub item_type: ItemType,

    #[serde(rename = "Reporting Form")]
    pub reporting_form: Option<String>,

    #[serde(rename = "Confidentiality")]
    pub confidentiality: Confidentiality,

    #[serde(rename = "Start Date", deserialize_with = "lenient_date")]
    pub start_date: Option<NaiveDate>,

    #[serde(rename = "End Date", deserialize_with = "lenient_date")]
    pub end_date: Option<NaiveDate>,

    #[serde(rename = "Description")]
    pub description: Option<String>,

    #[serde(rename = "SeriesGlossary", alias = "Series Glossary")]
    pub series_glossary: Option<String>,
}

impl CatalogEntry {
    /// Mnemonic and item code concatenated, e.g. "SVGL2170"
    pub fn mdrm_identifier(&self) -> String {
        format!("{}{}", self.mnemonic, self.item_code.as_deref().unwrap_or(""))
    }

    /// Still in effect: end date carries the 9999 sentinel year
    pub fn is_active(&self) -> bool {
        self.end_date
            .map(|d| d.year() == ACTIVE_SENTINEL_YEAR)
            .unwrap_or(false)
    }

    /// Cell value for a categorical column; `None` for null/empty cells.
    pub fn value(&self, column: Column) -> Option<&str> {
        let raw = match column {
            Column::Mnemonic => Some(self.mnemonic.as_str()),
            Column::ItemCode => self.item_code.as_deref(),
            Column::ItemName => Some(self.item_name.as_str()),
            Column::ItemType => Some(self.item_type.code()),
            Column::ReportingForm => self.reporting_form.as_deref(),
            Column::Confidentiality => Some(self.confidentiality.code()),
        };
        raw.filter(|v| !v.is_empty())
    }
}

/// Categorical columns the aggregator and filters can address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Mnemonic,
    ItemCode,
    ItemName,
    ItemType,
    ReportingForm,
    Confidentiality,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::Mnemonic,
        Column::ItemCode,
        Column::ItemName,
        Column::ItemType,
        Column::ReportingForm,
        Column::Confidentiality,
    ];

    /// Header name as it appears in the export
    pub fn header(&self) -> &'static str {
        match self {
            Column::Mnemonic => "Mnemonic",
            Column::ItemCode => "Item Code",
            Column::ItemName => "Item Name",
            Column::ItemType => "ItemType",
            Column::ReportingForm => "Reporting Form",
            Column::Confidentiality => "Confidentiality",
        }
    }
}

// ============================================================================
// LENIENT DATES
// ============================================================================

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

const DATETIME_FORMATS: [&str; 5] = [
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parse a calendar date from any of the shapes seen in MDRM exports.
///
/// Returns `None` for anything unrecognised.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_date))
}

// ============================================================================
// CATALOG
// ============================================================================

/// The loaded export: ordered, read-only for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    source: Option<PathBuf>,
}

impl Catalog {
    /// Load the export at `path`, skipping its one-line banner.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let file = File::open(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => CatalogError::Missing {
                path: path.to_path_buf(),
            },
            _ => CatalogError::Unreadable {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let mut catalog = Self::from_reader(BufReader::new(file), path)?;
        catalog.source = Some(path.to_path_buf());

        info!(
            rows = catalog.len(),
            path = %path.display(),
            "Loaded MDRM catalog"
        );

        Ok(catalog)
    }

    /// Parse an export from any buffered reader. `origin` is only used in
    /// error messages.
    pub fn from_reader<R: BufRead>(mut reader: R, origin: &Path) -> Result<Self, CatalogError> {
        // Banner line ("PUBLIC") precedes the header row
        let mut banner = String::new();
        reader
            .read_line(&mut banner)
            .map_err(|source| CatalogError::Unreadable {
                path: origin.to_path_buf(),
                source,
            })?;
        debug!(banner = banner.trim(), "Skipped banner line");

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let csv_error = |source: csv::Error| CatalogError::Csv {
            path: origin.to_path_buf(),
            // +1 for the banner consumed above
            line: source.position().map(|p| p.line() + 1).unwrap_or(0),
            source,
        };

        let headers = rdr.headers().map_err(csv_error)?.clone();

        let mut entries = Vec::new();
        let mut padded_rows = 0usize;
        for result in rdr.records() {
            let mut record = result.map_err(csv_error)?;
            // Short rows: missing trailing cells are empty
            if record.len() < headers.len() {
                padded_rows += 1;
                while record.len() < headers.len() {
                    record.push_field("");
                }
            }
            let entry: CatalogEntry = record.deserialize(Some(&headers)).map_err(csv_error)?;
            entries.push(entry);
        }

        if padded_rows > 0 {
            warn!(padded_rows, "Some rows were shorter than the header and were padded");
        }

        let unknown_start = entries.iter().filter(|e| e.start_date.is_none()).count();
        let unknown_end = entries.iter().filter(|e| e.end_date.is_none()).count();
        if unknown_start > 0 || unknown_end > 0 {
            warn!(
                unknown_start,
                unknown_end, "Some dates could not be parsed and are treated as unknown"
            );
        }

        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries,
            source: None,
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CatalogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Path the catalog was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// First entry with the given mnemonic and item code
    pub fn find(&self, mnemonic: &str, item_code: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|e| e.mnemonic == mnemonic && e.item_code.as_deref() == Some(item_code))
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a CatalogEntry;
    type IntoIter = std::slice::Iter<'a, CatalogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
