//! Spreadsheet parsing: file -> sheets -> ordered (row_index, header -> value)
//! pairs.
//!
//! Excel workbooks go through calamine, CSV files through the csv crate (a
//! CSV file becomes a single sheet named after the file stem). Cell values
//! keep their dynamic types: string, number, bool, or null. No business
//! transformation happens here.

use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::ParseError;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// One parsed data row. `row_index` is 1-based within the sheet with the
/// header row excluded; blank rows consume an index but produce no row, so
/// indices line up with the source file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub row_index: i64,
    pub values: Map<String, Value>,
}

/// One parsed sheet with its data rows in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSheet {
    pub name: String,
    pub rows: Vec<ParsedRow>,
}

/// Parse a spreadsheet file into sheets of header -> value rows.
///
/// Fails with [`ParseError`] on a missing or unreadable file, an unsupported
/// extension, or a workbook with no usable data rows at all. Sheets without
/// usable rows are skipped, not fatal.
pub fn parse_workbook(path: &Path) -> Result<Vec<ParsedSheet>, ParseError> {
    if !path.exists() {
        return Err(ParseError::FileNotFound(path.display().to_string()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let sheets = if ext == "csv" {
        parse_csv(path)?
    } else if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
        parse_spreadsheet(path)?
    } else {
        return Err(ParseError::UnsupportedFormat(ext));
    };

    if sheets.iter().all(|s| s.rows.is_empty()) {
        return Err(ParseError::Empty);
    }

    Ok(sheets)
}

fn parse_spreadsheet(path: &Path) -> Result<Vec<ParsedSheet>, ParseError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| ParseError::Workbook(e.to_string()))?;

    let sheet_names = workbook.sheet_names().to_owned();
    let mut sheets = Vec::new();

    for name in sheet_names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| ParseError::Workbook(e.to_string()))?;

        let mut rows_iter = range.rows();
        let headers: Vec<String> = match rows_iter.next() {
            Some(header_row) => header_row
                .iter()
                .map(|cell| cell.to_string().trim().to_string())
                .collect(),
            None => {
                tracing::warn!(sheet = %name, "Sheet is empty, skipping");
                continue;
            }
        };

        if headers.iter().all(|h| h.is_empty()) {
            tracing::warn!(sheet = %name, "Sheet has no headers, skipping");
            continue;
        }

        let mut rows = Vec::new();
        for (i, data_row) in rows_iter.enumerate() {
            let mut values = Map::new();
            for (col, cell) in data_row.iter().enumerate() {
                match headers.get(col) {
                    Some(header) if !header.is_empty() => {
                        values.insert(header.clone(), cell_to_value(cell));
                    }
                    _ => {}
                }
            }

            if values.values().all(is_blank) {
                continue;
            }

            rows.push(ParsedRow {
                row_index: (i + 1) as i64,
                values,
            });
        }

        tracing::debug!(sheet = %name, rows = rows.len(), "Parsed sheet");
        sheets.push(ParsedSheet { name, rows });
    }

    Ok(sheets)
}

fn parse_csv(path: &Path) -> Result<Vec<ParsedSheet>, ParseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ParseError::Workbook(e.to_string()))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ParseError::Workbook(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| ParseError::Workbook(e.to_string()))?;

        let mut values = Map::new();
        for (col, value) in record.iter().enumerate() {
            match headers.get(col) {
                Some(header) if !header.is_empty() => {
                    values.insert(header.clone(), Value::String(value.trim().to_string()));
                }
                _ => {}
            }
        }

        if values.values().all(is_blank) {
            continue;
        }

        rows.push(ParsedRow {
            row_index: (i + 1) as i64,
            values,
        });
    }

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Sheet1")
        .to_string();

    Ok(vec![ParsedSheet { name, rows }])
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => Value::String(s.trim().to_string()),
        Data::Int(i) => Value::Number((*i).into()),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        Data::Error(_) => Value::Null,
        // DateTime and duration cells keep their display form.
        other => Value::String(other.to_string()),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn csv_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_csv_rows() {
        let file = csv_file("name,qty,unit\nwidget,2,kg\ngadget,3,t\n");
        let sheets = parse_workbook(file.path()).unwrap();

        assert_eq!(sheets.len(), 1);
        let rows = &sheets[0].rows;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_index, 1);
        assert_eq!(rows[0].values.get("name"), Some(&json!("widget")));
        assert_eq!(rows[0].values.get("qty"), Some(&json!("2")));
        assert_eq!(rows[1].row_index, 2);
        assert_eq!(rows[1].values.get("unit"), Some(&json!("t")));
    }

    #[test]
    fn test_parse_csv_preserves_header_order() {
        let file = csv_file("b,a,c\n1,2,3\n");
        let sheets = parse_workbook(file.path()).unwrap();
        let keys: Vec<&String> = sheets[0].rows[0].values.keys().collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn test_blank_rows_skipped_but_keep_indices() {
        let file = csv_file("name,qty\nwidget,2\n,\ngadget,3\n");
        let sheets = parse_workbook(file.path()).unwrap();
        let rows = &sheets[0].rows;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_index, 1);
        assert_eq!(rows[1].row_index, 3);
    }

    #[test]
    fn test_headers_only_is_empty() {
        let file = csv_file("name,qty\n");
        assert!(matches!(
            parse_workbook(file.path()),
            Err(ParseError::Empty)
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            parse_workbook(Path::new("does_not_exist.csv")),
            Err(ParseError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        assert!(matches!(
            parse_workbook(file.path()),
            Err(ParseError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_cell_to_value_types() {
        assert_eq!(cell_to_value(&Data::Empty), Value::Null);
        assert_eq!(
            cell_to_value(&Data::String(" spaced ".to_string())),
            json!("spaced")
        );
        assert_eq!(cell_to_value(&Data::Int(42)), json!(42));
        assert_eq!(cell_to_value(&Data::Float(2.5)), json!(2.5));
        assert_eq!(cell_to_value(&Data::Bool(true)), json!(true));
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(&Value::Null));
        assert!(is_blank(&json!("")));
        assert!(!is_blank(&json!("x")));
        assert!(!is_blank(&json!(0)));
        assert!(!is_blank(&json!(false)));
    }
}
