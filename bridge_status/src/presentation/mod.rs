//! Rendering of search outcomes for the CLI and the JSON API.

use alloy::primitives::U256;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::search::{AnnotatedEvent, SearchResult, SearchState};

/// Decimals of the dYdX token base unit.
pub const TOKEN_DECIMALS: usize = 18;
pub const DISPLAY_DENOM: &str = "dydx";

const TABLE_CAPTION: &str = "A list of your bridged events.";
const ADDRESS_PLACEHOLDER: &str = "dydx1deadbeef...";

/// Exact decimal rendering of a base-unit amount with trailing fractional
/// zeros removed, e.g. `500000000000000000` with 18 decimals is `0.5`.
pub fn format_units(amount: &U256, decimals: usize) -> String {
    let digits = amount.to_string();
    if decimals == 0 {
        return digits;
    }

    let padded = format!(
        "{:0>width$}",
        digits,
        width = decimals.saturating_add(1)
    );
    let (whole, fraction) = padded.split_at(padded.len().saturating_sub(decimals));
    let fraction = fraction.trim_end_matches('0');

    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    }
}

pub fn format_amount(amount: &U256) -> String {
    format!("{} {}", format_units(amount, TOKEN_DECIMALS), DISPLAY_DENOM)
}

/// ISO-8601 in UTC with millisecond precision, e.g. `2023-11-14T22:13:20.000Z`.
pub fn format_release_time(unix_sec: i64) -> String {
    DateTime::<Utc>::from_timestamp(unix_sec, 0).map_or_else(
        || format!("unix {unix_sec}"),
        |time| time.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseRow {
    pub id: u32,
    pub amount: String,
    pub amount_base_units: String,
    pub denom: String,
    pub release_time: String,
    pub release_timestamp: i64,
    pub release_block: u64,
}

impl From<&AnnotatedEvent> for ReleaseRow {
    fn from(annotated: &AnnotatedEvent) -> Self {
        let event = &annotated.event;
        Self {
            id: event.event_id,
            amount: format_amount(&event.coin_amount),
            amount_base_units: event.coin_amount.to_string(),
            denom: event.coin_denom.clone(),
            release_time: format_release_time(annotated.estimated_release_time),
            release_timestamp: annotated.estimated_release_time,
            release_block: event.release_block_height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainHeadView {
    pub height: u64,
    pub time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResponse {
    pub address: String,
    pub chain_head: ChainHeadView,
    pub events: Vec<ReleaseRow>,
}

impl From<&SearchResult> for SearchResponse {
    fn from(result: &SearchResult) -> Self {
        Self {
            address: result.address.clone(),
            chain_head: ChainHeadView {
                height: result.chain_head.height,
                time: result.chain_head.time,
            },
            events: result.events.iter().map(ReleaseRow::from).collect(),
        }
    }
}

pub fn render_table(result: &SearchResult) -> String {
    if result.is_empty() {
        return format!("No delayed bridge events found for {}", result.address);
    }

    let headers = ["ID", "Amount", "Release Time", "Release Block"];
    let rows: Vec<[String; 4]> = result
        .events
        .iter()
        .map(ReleaseRow::from)
        .map(|row| {
            [
                row.id.to_string(),
                row.amount,
                row.release_time,
                row.release_block.to_string(),
            ]
        })
        .collect();

    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    let header_cells: Vec<&str> = headers.to_vec();
    write_row(&mut out, &header_cells, &widths);
    let separators: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    let separator_cells: Vec<&str> = separators.iter().map(String::as_str).collect();
    write_row(&mut out, &separator_cells, &widths);
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        write_row(&mut out, &cells, &widths);
    }
    out.push_str(TABLE_CAPTION);
    out
}

fn write_row(out: &mut String, cells: &[&str], widths: &[usize; 4]) {
    let line = cells
        .iter()
        .zip(widths.iter())
        .map(|(cell, width)| format!("{:>width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join(" | ");
    out.push_str(line.trim_end());
    out.push('\n');
}

pub fn render_state(state: &SearchState) -> String {
    match state {
        SearchState::NotSearched => {
            format!("Search dYdX bridge status: enter an address ({ADDRESS_PLACEHOLDER})")
        }
        SearchState::Pending { address } => format!("Searching {address}..."),
        SearchState::Completed(result) => render_table(result),
        SearchState::Failed { address, error } => {
            format!("Search for {address} failed: {error}. Enter the address again to retry.")
        }
    }
}
