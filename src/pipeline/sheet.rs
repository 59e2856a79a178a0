//! Structured-table formatting: the first worksheet of an uploaded workbook
//! becomes a YAML mapping keyed by its first column.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use serde_yaml::{Mapping, Value};

use super::FormatError;

/// Render the first worksheet of `raw` as a serialized YAML mapping.
///
/// Cell parsing is calamine's business; this function only enforces the
/// table shape: the first row with a non-empty key cell is the header row,
/// later rows become entries keyed by their first cell.
pub fn sheet_to_yaml(raw: &[u8]) -> Result<Vec<u8>, FormatError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(raw))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(FormatError::NoWorksheet)??;

    let rows = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>());

    let items = rows_to_mapping(rows)?;
    let yaml = serde_yaml::to_string(&Value::Mapping(items))?;

    Ok(yaml.into_bytes())
}

/// A cell's display string, or `None` for an empty cell.
fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        other => Some(other.to_string()),
    }
}

/// Fold rows into a mapping-of-mappings.
///
/// Rows whose key cell (the first column) is empty are skipped entirely.
/// The first surviving row is the header row: its remaining cells label the
/// columns, unlabeled columns stay anonymous and are dropped from every
/// entry. Every later surviving row becomes one entry; empty cells are
/// omitted rather than written as empty strings. Duplicate header labels
/// and duplicate keys are fatal.
pub fn rows_to_mapping<I>(rows: I) -> Result<Mapping, FormatError>
where
    I: IntoIterator<Item = Vec<Option<String>>>,
{
    let mut header: Option<Vec<Option<String>>> = None;
    let mut items = Mapping::new();

    for row in rows {
        let Some(key) = row.first().cloned().flatten() else {
            continue;
        };

        let fields = row.get(1..).unwrap_or(&[]);

        match &header {
            None => {
                let mut seen: Vec<&String> = Vec::new();
                for label in fields.iter().flatten() {
                    if seen.contains(&label) {
                        return Err(FormatError::DuplicateHeader(label.clone()));
                    }
                    seen.push(label);
                }
                header = Some(fields.to_vec());
            }
            Some(labels) => {
                if items.contains_key(Value::String(key.clone())) {
                    return Err(FormatError::DuplicateKey(key));
                }

                let mut item = Mapping::new();
                for (label, value) in labels.iter().zip(fields.iter()) {
                    if let (Some(label), Some(value)) = (label, value) {
                        item.insert(
                            Value::String(label.clone()),
                            Value::String(value.clone()),
                        );
                    }
                }

                items.insert(Value::String(key), Value::Mapping(item));
            }
        }
    }

    Ok(items)
}
