//! Generic tabular file reader for user-supplied evidence tables (§6,
//! "Tabular files").
//!
//! Delimiter is inferred from the file extension (`.tsv`/`.txt` → tab,
//! anything else → comma); the first row is the header and columns are
//! addressed by name rather than position, since the protein/site table
//! schemas are user-configurable via the CLI's column-mapping flags.

use crate::error::{CoreError, Result};
use std::collections::HashMap;
use std::path::Path;

/// A tabular file loaded fully into memory: a header name -> column
/// index map, plus rows as raw string cells.
#[derive(Debug, Clone)]
pub struct Table {
    columns: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some("tsv") | Some("txt") => b'\t',
        _ => b',',
    }
}

impl Table {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(CoreError::Io)?;
        Self::from_reader(file, delimiter_for(path))
    }

    pub fn from_reader<R: std::io::Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns: HashMap<String, usize> = rdr
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_string(), i))
            .collect();

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            rows.push(record.iter().map(|cell| cell.to_string()).collect());
        }
        Ok(Self { columns, rows })
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell at `(row, column_name)`. Returns `""` for a missing column
    /// or a row shorter than expected, per §6: "missing cells are empty
    /// strings; downstream transforms treat empty/non-numeric as zero
    /// contribution."
    pub fn cell(&self, row: usize, column_name: &str) -> &str {
        self.columns
            .get(column_name)
            .and_then(|&idx| self.rows.get(row).and_then(|r| r.get(idx)))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn rows(&self) -> impl Iterator<Item = usize> {
        0..self.rows.len()
    }
}

/// Parse a cell as `f64`; empty or non-numeric cells are `None` rather
/// than an error, per the graceful-degradation rule in §6/§4.G.
pub fn parse_numeric(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// A cell is "truthy" for the regulatory-annotation flag if it is a
/// nonzero number or one of a small set of affirmative tokens
/// (case-insensitive): `true`, `yes`, `y`, `1`.
pub fn parse_truthy(cell: &str) -> bool {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return false;
    }
    if let Ok(n) = trimmed.parse::<f64>() {
        return n != 0.0;
    }
    matches!(trimmed.to_ascii_lowercase().as_str(), "true" | "yes" | "y")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_inferred_from_extension() {
        assert_eq!(delimiter_for(Path::new("x.tsv")), b'\t');
        assert_eq!(delimiter_for(Path::new("x.txt")), b'\t');
        assert_eq!(delimiter_for(Path::new("x.csv")), b',');
        assert_eq!(delimiter_for(Path::new("x")), b',');
    }

    #[test]
    fn missing_column_is_empty_cell() {
        let t = Table::from_reader("a,b\n1,2\n".as_bytes(), b',').unwrap();
        assert_eq!(t.cell(0, "a"), "1");
        assert_eq!(t.cell(0, "missing"), "");
    }

    #[test]
    fn numeric_and_truthy_parsing() {
        assert_eq!(parse_numeric("3.5"), Some(3.5));
        assert_eq!(parse_numeric(""), None);
        assert_eq!(parse_numeric("not-a-number"), None);
        assert!(parse_truthy("yes"));
        assert!(parse_truthy("1"));
        assert!(!parse_truthy("0"));
        assert!(!parse_truthy(""));
    }
}
