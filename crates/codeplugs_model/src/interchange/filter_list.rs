//! Contact filter lists: a CSV with one DMR ID per row.

use std::collections::HashSet;
use std::io::Read;

use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use super::ImportError;

fn is_id_column(name: &str) -> bool {
    let name = name.trim().to_lowercase();

    name == "id" || name.contains("radio id") || name.contains("dmr id")
}

fn positive_id(field: &str) -> Option<i64> {
    field.trim().parse().ok().filter(|id| *id > 0)
}

/// Finds the column holding the IDs, and whether the first record is a header.
fn locate(first: &StringRecord) -> Result<(usize, bool), ImportError> {
    if let Some(column) = first.iter().position(is_id_column) {
        return Ok((column, true));
    }

    if first.get(0).and_then(positive_id).is_some() {
        return Ok((0, false));
    }

    Err(ImportError::MissingIdColumn(
        first.iter().map(str::to_string).collect(),
    ))
}

/// Reads the DMR IDs of a filter list, in file order and without duplicates.
/// Rows without a positive ID are skipped.
pub fn read(reader: impl Read) -> Result<Vec<i64>, ImportError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = reader.records();
    let Some(first) = records.next().transpose()? else {
        return Err(ImportError::Empty);
    };

    let (column, header) = locate(&first)?;

    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    let mut take = |record: &StringRecord| {
        if let Some(id) = record.get(column).and_then(positive_id)
            && seen.insert(id)
        {
            ids.push(id);
        }
    };

    if !header {
        take(&first);
    }

    for record in records {
        take(&record?);
    }

    if ids.is_empty() {
        return Err(ImportError::Empty);
    }

    debug!(count = ids.len(), column, "Read filter list");

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_radio_id_header() {
        let csv = "Radio ID,Callsign,Name\n3100001,K1ABC,Alice\n3100002,K1DEF,Bob\n";

        assert_eq!(read(csv.as_bytes()).unwrap(), vec![3100001, 3100002]);
    }

    #[test]
    fn test_read_id_column_anywhere() {
        let csv = "foo,id,bar\nx,123,y\nz,456,w\nq,123,r\n";

        assert_eq!(read(csv.as_bytes()).unwrap(), vec![123, 456]);
    }

    #[test]
    fn test_read_without_header() {
        let csv = "111\n222\n-5\nnot a number\n333\n";

        assert_eq!(read(csv.as_bytes()).unwrap(), vec![111, 222, 333]);
    }

    #[test]
    fn test_read_rejects_unknown_layout() {
        assert!(matches!(
            read("Callsign,Name\nK1ABC,Alice\n".as_bytes()),
            Err(ImportError::MissingIdColumn(_))
        ));
        assert!(matches!(
            read("Radio ID\n0\n".as_bytes()),
            Err(ImportError::Empty)
        ));
        assert!(matches!(read("".as_bytes()), Err(ImportError::Empty)));
    }
}
