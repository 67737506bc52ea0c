//! Spreadsheet CSV reading and column lookup.

use std::collections::HashMap;

use serde::Deserialize;

/// Parses CSV text into trimmed cells. Handles quoted fields with embedded
/// commas and newlines and doubled quotes; blank lines are dropped.
pub fn parse_csv(input: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut value = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    fn push_value(row: &mut Vec<String>, value: &mut String) {
        row.push(value.trim().to_string());
        value.clear();
    }

    fn push_row(rows: &mut Vec<Vec<String>>, row: &mut Vec<String>) {
        let taken = std::mem::take(row);
        if !(taken.len() == 1 && taken[0].is_empty()) {
            rows.push(taken);
        }
    }

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                value.push('"');
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => push_value(&mut row, &mut value),
            '\n' | '\r' if !in_quotes => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                push_value(&mut row, &mut value);
                push_row(&mut rows, &mut row);
            }
            _ => value.push(c),
        }
    }

    if !value.is_empty() || !row.is_empty() {
        push_value(&mut row, &mut value);
        push_row(&mut rows, &mut row);
    }

    rows
}

/// Trimmed, lowercased, inner whitespace collapsed.
pub fn normalize_header(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Rounded positive integer, or `fallback` for anything below 1 or unparseable.
pub fn parse_positive_int(value: &str, fallback: i32) -> i32 {
    match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 1.0 => n.round().min(i32::MAX as f64) as i32,
        _ => fallback,
    }
}

/// Cell of `row` at `index`, trimmed, or empty.
pub fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|c| c.trim()).unwrap_or_default()
}

/// A mapped column: zero-based index or header text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(i64),
    Header(String),
}

/// Field name to column, as sent by the import form.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping(HashMap<String, Option<ColumnRef>>);

impl FieldMapping {
    pub fn get(&self, key: &str) -> Option<&ColumnRef> {
        self.0.get(key).and_then(Option::as_ref)
    }

    pub fn with(mut self, key: &str, column: ColumnRef) -> Self {
        self.0.insert(key.to_string(), Some(column));
        self
    }

    /// Index for `key`: an in-range mapped index, else a mapped header name,
    /// else `fallback`.
    pub fn column_index(&self, headers: &[String], key: &str, fallback: usize) -> usize {
        match self.get(key) {
            Some(ColumnRef::Index(i)) if *i >= 0 && (*i as usize) < headers.len() => *i as usize,
            Some(ColumnRef::Header(name)) => {
                let wanted = normalize_header(name);
                if wanted.is_empty() {
                    return fallback;
                }
                headers
                    .iter()
                    .position(|h| *h == wanted)
                    .unwrap_or(fallback)
            }
            _ => fallback,
        }
    }

    /// Cell for `key` in `row`. Unmapped keys look for a header equal to the
    /// key itself.
    pub fn cell<'a>(&self, row: &'a [String], headers: &[String], key: &str) -> &'a str {
        let header = match self.get(key) {
            Some(ColumnRef::Index(i)) if *i >= 0 && (*i as usize) < row.len() => {
                return cell(row, *i as usize);
            }
            Some(ColumnRef::Index(i)) => i.to_string(),
            Some(ColumnRef::Header(name)) => name.clone(),
            None => key.to_string(),
        };
        let wanted = normalize_header(&header);
        if wanted.is_empty() {
            return "";
        }
        headers
            .iter()
            .position(|h| *h == wanted)
            .map(|i| cell(row, i))
            .unwrap_or_default()
    }
}
