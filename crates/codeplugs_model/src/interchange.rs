//! CSV formats channels and filter lists are exchanged in.

pub mod chirp;
pub mod filter_list;

use std::collections::HashMap;

use csv::StringRecord;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("could not find an ID column in {0:?}")]
    MissingIdColumn(Vec<String>),

    #[error("no IDs found")]
    Empty,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, ToSchema)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Looks up fields of a record by the name of their header column.
struct Row<'a> {
    columns: &'a HashMap<String, usize>,
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    fn columns(headers: &StringRecord) -> HashMap<String, usize> {
        headers
            .iter()
            .enumerate()
            .map(|(index, name)| (name.trim().to_string(), index))
            .collect()
    }

    /// Missing columns and short records read as empty.
    fn get(&self, column: &str) -> &'a str {
        self.columns
            .get(column)
            .and_then(|index| self.record.get(*index))
            .unwrap_or_default()
            .trim()
    }
}
