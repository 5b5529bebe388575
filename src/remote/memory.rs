// In-process tabular service
//
// Behaves like the spreadsheet API for a handful of sheets: ragged rows,
// A1 ranges, append after the last non-empty row. Can be switched to
// unreachable or to reject reads or writes. Clones share the same sheets.

use super::TabularService;
use crate::error::{FundError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    sheets: HashMap<String, Vec<Vec<String>>>,
    unreachable: bool,
    reject_reads: bool,
    reject_writes: bool,
    writes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MemorySheets {
    state: Arc<Mutex<MemoryState>>,
}

/// Parsed `Sheet!A5:H9`: sheet, first column, first/last row (1-based, None = open)
#[derive(Debug, PartialEq, Eq)]
struct ParsedRange {
    sheet: String,
    column: usize,
    row: Option<usize>,
    last_row: Option<usize>,
}

/// `B7` → (1, Some(7)), `E` → (4, None)
fn parse_cell(cell: &str, range: &str) -> Result<(usize, Option<usize>)> {
    let letters: String = cell.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let digits: String = cell.chars().skip(letters.len()).collect();
    if letters.is_empty() {
        return Err(FundError::remote("parse range", format!("bad cell in '{}'", range)));
    }

    let column = letters
        .to_ascii_uppercase()
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize)
        - 1;
    let row = if digits.is_empty() {
        None
    } else {
        Some(
            digits
                .parse::<usize>()
                .map_err(|e| FundError::remote("parse range", e))?,
        )
    };
    Ok((column, row))
}

fn parse_range(range: &str) -> Result<ParsedRange> {
    let (sheet, cells) = range
        .split_once('!')
        .ok_or_else(|| FundError::remote("parse range", format!("missing sheet in '{}'", range)))?;

    let (start, end) = match cells.split_once(':') {
        Some((start, end)) => (start, Some(end)),
        None => (cells, None),
    };
    let (column, row) = parse_cell(start, range)?;
    let last_row = match end {
        Some(end) => parse_cell(end, range)?.1,
        None => row,
    };

    Ok(ParsedRange {
        sheet: sheet.to_string(),
        column,
        row,
        last_row,
    })
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|c| c.is_empty())
}

impl MemorySheets {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| FundError::remote("lock", "memory sheets poisoned"))
    }

    /// Seed a sheet with rows, replacing whatever was there
    pub fn set_rows(&self, sheet: &str, rows: Vec<Vec<String>>) {
        if let Ok(mut state) = self.lock() {
            state.sheets.insert(sheet.to_string(), rows);
        }
    }

    pub fn rows(&self, sheet: &str) -> Vec<Vec<String>> {
        self.lock()
            .ok()
            .and_then(|state| state.sheets.get(sheet).cloned())
            .unwrap_or_default()
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        if let Ok(mut state) = self.lock() {
            state.unreachable = unreachable;
        }
    }

    /// Session opens, but every read fails
    pub fn set_reject_reads(&self, reject: bool) {
        if let Ok(mut state) = self.lock() {
            state.reject_reads = reject;
        }
    }

    pub fn set_reject_writes(&self, reject: bool) {
        if let Ok(mut state) = self.lock() {
            state.reject_writes = reject;
        }
    }

    /// Number of accepted update/append calls
    pub fn write_count(&self) -> usize {
        self.lock().map(|state| state.writes).unwrap_or(0)
    }

    fn writable(&self) -> Result<MutexGuard<'_, MemoryState>> {
        let state = self.lock()?;
        if state.unreachable {
            return Err(FundError::remote("write", "service unreachable"));
        }
        if state.reject_writes {
            return Err(FundError::remote("write", "write rejected by service"));
        }
        Ok(state)
    }
}

#[async_trait]
impl TabularService for MemorySheets {
    async fn open_session(&self) -> Result<()> {
        if self.lock()?.unreachable {
            Err(FundError::Unavailable("service unreachable".to_string()))
        } else {
            Ok(())
        }
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let parsed = parse_range(range)?;
        let state = self.lock()?;
        if state.unreachable {
            return Err(FundError::remote("read", "service unreachable"));
        }
        if state.reject_reads {
            return Err(FundError::remote("read", "read rejected by service"));
        }

        let rows = state.sheets.get(&parsed.sheet).cloned().unwrap_or_default();
        let skip = parsed.row.map(|r| r.saturating_sub(1)).unwrap_or(0);
        let take = parsed
            .last_row
            .map(|last| last.saturating_sub(skip))
            .unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|row| row.into_iter().skip(parsed.column).collect())
            .collect())
    }

    async fn update_values(&self, range: &str, rows: Vec<Vec<String>>) -> Result<()> {
        let parsed = parse_range(range)?;
        let mut state = self.writable()?;
        state.writes += 1;

        let sheet = state.sheets.entry(parsed.sheet).or_default();
        let first = parsed.row.unwrap_or(1).max(1) - 1;

        for (offset, values) in rows.into_iter().enumerate() {
            let index = first + offset;
            if sheet.len() <= index {
                sheet.resize(index + 1, Vec::new());
            }
            let target = &mut sheet[index];
            if target.len() < parsed.column + values.len() {
                target.resize(parsed.column + values.len(), String::new());
            }
            for (col, value) in values.into_iter().enumerate() {
                target[parsed.column + col] = value;
            }
        }
        Ok(())
    }

    async fn append_values(&self, range: &str, rows: Vec<Vec<String>>) -> Result<()> {
        let parsed = parse_range(range)?;
        let mut state = self.writable()?;
        state.writes += 1;

        let sheet = state.sheets.entry(parsed.sheet).or_default();
        while sheet.last().map_or(false, |row| is_blank(row)) {
            sheet.pop();
        }
        let pad = vec![String::new(); parsed.column];
        for values in rows {
            let mut row = pad.clone();
            row.extend(values);
            sheet.push(row);
        }
        Ok(())
    }
}
