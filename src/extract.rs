use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{info, warn};

use crate::record::Record;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

#[derive(Error, Debug)]
#[error("no table element found in document")]
pub struct TableNotFound;

/// Extract the first table of the document into records.
///
/// The header row's `th` texts define that run's column names. Every `tr`
/// after the first becomes a record only if its `td` count exactly matches
/// the header count; mismatched rows are logged and skipped. A table with
/// zero header cells yields an empty snapshot, not an error.
///
/// Pure computation: no I/O, no store access.
pub fn extract_table(html: &str) -> Result<Vec<Record>, TableNotFound> {
    let table_sel = Selector::parse("table").expect("Invalid selector");
    let th_sel = Selector::parse("th").expect("Invalid selector");
    let tr_sel = Selector::parse("tr").expect("Invalid selector");
    let td_sel = Selector::parse("td").expect("Invalid selector");

    let document = Html::parse_document(html);
    let table = document.select(&table_sel).next().ok_or(TableNotFound)?;

    let headers: Vec<String> = table.select(&th_sel).map(cell_text).collect();
    if headers.is_empty() {
        warn!("Table has no header cells; dropping all rows");
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    // First tr is the header row.
    for (i, row) in table.select(&tr_sel).skip(1).enumerate() {
        let cells: Vec<String> = row.select(&td_sel).map(cell_text).collect();
        if cells.len() != headers.len() {
            warn!(
                "Skipping row {}: {} cells vs {} headers",
                i + 1,
                cells.len(),
                headers.len()
            );
            continue;
        }
        let fields = headers.iter().cloned().zip(cells).collect();
        records.push(Record::new(fields));
    }

    info!("Extracted {} records ({} columns)", records.len(), headers.len());
    Ok(records)
}

/// Element text with runs of whitespace collapsed and ends trimmed.
fn cell_text(el: ElementRef) -> String {
    let raw: String = el.text().collect();
    WHITESPACE.replace_all(&raw, " ").trim().to_string()
}

// ── Tests ──
