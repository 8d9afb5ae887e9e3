use std::collections::HashSet;

use chrono::NaiveDate;
use ipo_core::{IpoRecord, ParsedListings, RowRejection};
use ipo_logging::{ipo_debug, ipo_info};
use scraper::{ElementRef, Html, Selector};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListingParseError {
    #[error("invalid selector {selector:?}")]
    InvalidSelector { selector: String },
    #[error("no IPO listing table found on the page")]
    TableNotFound,
}

pub trait ListingParser: Send + Sync {
    /// Extracts listings in document order. Malformed rows are reported in
    /// [`ParsedListings::rejected`]; only a missing table is an error.
    fn parse(&self, markup: &str) -> Result<ParsedListings, ListingParseError>;
}

#[derive(Debug, Clone)]
pub struct ParserSettings {
    /// Element holding the listing table.
    pub section_selector: String,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            section_selector: "#eipo".to_string(),
        }
    }
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const COMPANY_HEADERS: &[&str] = &["company name", "company", "name of company", "issuer"];
const UNITS_HEADERS: &[&str] = &[
    "units",
    "units issued",
    "no of units",
    "issued units",
    "total units",
];
const PRICE_HEADERS: &[&str] = &["price", "price per unit", "issue price", "price rs"];
const OPEN_HEADERS: &[&str] = &["open date", "opening date", "issue open date", "open"];
const CLOSE_HEADERS: &[&str] = &["close date", "closing date", "issue close date", "close"];
const STATUS_HEADERS: &[&str] = &["status"];

/// Column positions used by the source site when a table has no header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    status: Option<usize>,
    company: usize,
    units: Option<usize>,
    price: Option<usize>,
    open: usize,
    close: usize,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            status: Some(1),
            company: 2,
            units: Some(3),
            price: Some(4),
            open: 5,
            close: 6,
        }
    }
}

impl ColumnMap {
    fn from_headers(headers: &[String]) -> Self {
        let find = |aliases: &[&str]| {
            headers
                .iter()
                .position(|h| aliases.contains(&normalize_header(h).as_str()))
        };
        let fallback = Self::default();
        Self {
            status: find(STATUS_HEADERS),
            company: find(COMPANY_HEADERS).unwrap_or(fallback.company),
            units: find(UNITS_HEADERS),
            price: find(PRICE_HEADERS),
            open: find(OPEN_HEADERS).unwrap_or(fallback.open),
            close: find(CLOSE_HEADERS).unwrap_or(fallback.close),
        }
    }
}

/// Parser for the HTML table of public issues.
#[derive(Debug, Default)]
pub struct TableListingParser {
    settings: ParserSettings,
}

impl TableListingParser {
    pub fn new(settings: ParserSettings) -> Self {
        Self { settings }
    }
}

impl ListingParser for TableListingParser {
    fn parse(&self, markup: &str) -> Result<ParsedListings, ListingParseError> {
        let doc = Html::parse_document(markup);
        let section_sel = compile(&self.settings.section_selector)?;
        let table_sel = compile("table")?;
        let row_sel = compile("tr")?;

        let scope = match doc.select(&section_sel).next() {
            Some(section) if section.value().name() == "table" => section,
            Some(section) => section.select(&table_sel).next().unwrap_or(section),
            None => doc
                .select(&table_sel)
                .find(|table| has_company_header(table, &row_sel))
                .ok_or(ListingParseError::TableNotFound)?,
        };

        let mut headers: Option<Vec<String>> = None;
        let mut data_rows: Vec<Vec<String>> = Vec::new();
        for row in scope.select(&row_sel) {
            let (header_cells, data_cells) = row_cells(&row);
            if data_cells.is_empty() {
                if headers.is_none() && !header_cells.is_empty() {
                    headers = Some(header_cells);
                }
                continue;
            }
            data_rows.push(data_cells);
        }

        let columns = headers
            .as_deref()
            .map(ColumnMap::from_headers)
            .unwrap_or_default();
        ipo_debug!("Listing columns {:?} from headers {:?}", columns, headers);

        let mut listings = ParsedListings::default();
        let mut seen = HashSet::new();
        for (index, cells) in data_rows.iter().enumerate() {
            let row = index + 1;
            if is_unrelated_row(cells) {
                ipo_debug!("Ignoring row {} without listing data: {:?}", row, cells);
                continue;
            }
            match build_record(cells, &columns) {
                Ok(record) => {
                    if seen.insert(record.id().clone()) {
                        listings.records.push(record);
                    } else {
                        ipo_debug!(
                            "Row {} repeats listing {}; keeping the first",
                            row,
                            record.id()
                        );
                    }
                }
                Err(reason) => listings.rejected.push(RowRejection { row, reason }),
            }
        }

        ipo_info!(
            "Parsed {} listing(s), rejected {} row(s)",
            listings.records.len(),
            listings.rejected.len()
        );
        Ok(listings)
    }
}

fn compile(css: &str) -> Result<Selector, ListingParseError> {
    Selector::parse(css).map_err(|_| ListingParseError::InvalidSelector {
        selector: css.to_string(),
    })
}

fn row_cells(row: &ElementRef<'_>) -> (Vec<String>, Vec<String>) {
    let mut header_cells = Vec::new();
    let mut data_cells = Vec::new();
    for child in row.children().filter_map(ElementRef::wrap) {
        let text = clean_text(&child.text().collect::<String>());
        match child.value().name() {
            "th" => header_cells.push(text),
            "td" => data_cells.push(text),
            _ => {}
        }
    }
    (header_cells, data_cells)
}

fn has_company_header(table: &ElementRef<'_>, row_sel: &Selector) -> bool {
    table.select(row_sel).any(|row| {
        row_cells(&row)
            .0
            .iter()
            .any(|h| COMPANY_HEADERS.contains(&normalize_header(h).as_str()))
    })
}

/// Banner rows ("No record found") and spacer rows carry no listing.
fn is_unrelated_row(cells: &[String]) -> bool {
    cells.len() < 2 || cells.iter().all(|cell| cell.is_empty())
}

fn build_record(cells: &[String], columns: &ColumnMap) -> Result<IpoRecord, String> {
    let cell = |index: usize| cells.get(index).map(String::as_str).filter(|c| !c.is_empty());
    let optional = |index: Option<usize>| index.and_then(cell).map(ToOwned::to_owned);

    let company = cell(columns.company).ok_or("missing company name")?;
    let open = required_date(cell(columns.open), "open date")?;
    let close = required_date(cell(columns.close), "close date")?;

    let record = IpoRecord::new(company, open, close).map_err(|err| err.to_string())?;
    Ok(record
        .with_units(optional(columns.units))
        .with_price_per_unit(optional(columns.price))
        .with_status(optional(columns.status)))
}

fn required_date(raw: Option<&str>, field: &str) -> Result<NaiveDate, String> {
    let raw = raw.ok_or_else(|| format!("missing {field}"))?;
    parse_date(raw).ok_or_else(|| format!("invalid {field} {raw:?}"))
}

/// Accepts the date layouts seen on listing pages, optionally bracketed or
/// followed by a time.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = raw.trim().trim_matches(['[', ']', '(', ')']).trim();
    let try_all = |text: &str| {
        DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
    };
    try_all(cleaned).or_else(|| {
        let first = cleaned.split_whitespace().next()?;
        (first != cleaned).then(|| try_all(first)).flatten()
    })
}

fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_header(text: &str) -> String {
    let alnum: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect();
    clean_text(&alnum)
}
