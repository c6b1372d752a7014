//! Tabular file ingestion for the bulk orchestrators.
//!
//! Every input file (CSV, Excel, or a ZIP of those) is read into a plain
//! string table. Cells keep the text form the spreadsheet produced; the
//! orchestrators decide per column how to interpret it.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use brohub_core::AppError;
use calamine::{open_workbook_auto_from_rs, Data, Reader as _};
use chrono::{Duration, NaiveDate};

/// Days between the Excel serial epoch (1899-12-30) and a serial value.
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// An in-memory table with named columns and string cells.
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Table { columns, rows }
    }

    /// Reads a file by extension: csv, xls, xlsx or zip.
    pub fn from_bytes(extension: &str, bytes: &[u8]) -> Result<Table, AppError> {
        match extension {
            "csv" => Table::from_csv(bytes),
            "xls" | "xlsx" => Table::from_excel(bytes),
            "zip" => Table::from_zip(bytes),
            other => Err(AppError::Internal(format!(
                "Unsupported file type '{}'. Only CSV, Excel or ZIP files are supported.",
                other
            ))),
        }
    }

    /// CSV with a sniffed delimiter: Dutch exports use `;` as often as `,`.
    pub fn from_csv(bytes: &[u8]) -> Result<Table, AppError> {
        let head = String::from_utf8_lossy(bytes);
        let first_line = head.lines().next().unwrap_or_default();
        let delimiter = if first_line.matches(';').count() > first_line.matches(',').count() {
            b';'
        } else {
            b','
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(bytes);
        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::Internal(format!("Failed to read CSV header: {}", e)))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| AppError::Internal(format!("Failed to read CSV row: {}", e)))?;
            let mut row: Vec<String> =
                record.iter().map(|cell| cell.trim().to_string()).collect();
            row.resize(columns.len(), String::new());
            rows.push(row);
        }
        Ok(Table { columns, rows })
    }

    /// First worksheet of an xls/xlsx workbook; first row is the header.
    pub fn from_excel(bytes: &[u8]) -> Result<Table, AppError> {
        let cursor = Cursor::new(bytes.to_vec());
        let mut workbook = open_workbook_auto_from_rs(cursor)
            .map_err(|e| AppError::Internal(format!("Failed to open workbook: {}", e)))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| AppError::Internal("Workbook has no worksheets".to_string()))?
            .map_err(|e| AppError::Internal(format!("Failed to read worksheet: {}", e)))?;

        let mut row_iter = range.rows();
        let columns: Vec<String> = match row_iter.next() {
            Some(header) => header.iter().map(format_cell).collect(),
            None => Vec::new(),
        };
        let rows = row_iter
            .map(|cells| {
                let mut row: Vec<String> = cells.iter().map(format_cell).collect();
                row.resize(columns.len(), String::new());
                row
            })
            .collect();
        Ok(Table { columns, rows })
    }

    /// Concatenation of every CSV and Excel file inside a ZIP archive. All
    /// members must share the header of the first.
    pub fn from_zip(bytes: &[u8]) -> Result<Table, AppError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec()))
            .map_err(|e| AppError::Internal(format!("Failed to open zip archive: {}", e)))?;

        let mut combined: Option<Table> = None;
        for index in 0..archive.len() {
            let mut file = archive
                .by_index(index)
                .map_err(|e| AppError::Internal(format!("Failed to read zip member: {}", e)))?;
            let name = file.name().to_lowercase();
            let extension = name.rsplit('.').next().unwrap_or_default().to_string();
            if !matches!(extension.as_str(), "csv" | "xls" | "xlsx") {
                continue;
            }
            let mut content = Vec::new();
            file.read_to_end(&mut content)
                .map_err(|e| AppError::Internal(format!("Failed to read zip member: {}", e)))?;
            let table = Table::from_bytes(&extension, &content)?;
            combined = Some(match combined {
                None => table,
                Some(mut base) => {
                    if table.columns.len() != base.columns.len() {
                        return Err(AppError::Internal(
                            "Files in the zip archive do not share the same columns".to_string(),
                        ));
                    }
                    base.rows.extend(table.rows);
                    base
                }
            });
        }
        combined.ok_or_else(|| {
            AppError::Internal("No CSV or Excel files found in the zip archive.".to_string())
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_columns(&self, names: &[&str]) -> bool {
        names.iter().all(|name| self.column_index(name).is_some())
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |cells| Row { table: self, cells })
    }

    /// Renames columns by name; unknown names are ignored.
    pub fn rename(&mut self, mapping: &[(&str, &str)]) {
        for column in &mut self.columns {
            if let Some((_, to)) = mapping.iter().find(|(from, _)| from == column) {
                *column = to.to_string();
            }
        }
    }

    /// Assigns the given names to the leading columns, keeping any extras.
    pub fn rename_positional(&mut self, names: &[&str]) {
        for (column, name) in self.columns.iter_mut().zip(names) {
            *column = name.to_string();
        }
    }

    /// Drops every column whose name contains one of the substrings.
    pub fn drop_columns_containing(&mut self, substrings: &[&str]) {
        let keep: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| !substrings.iter().any(|s| column.contains(s)))
            .map(|(index, _)| index)
            .collect();
        self.columns = keep.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.rows {
            *row = keep.iter().map(|&i| row[i].clone()).collect();
        }
    }

    /// Inner join on a composite key. Rows without a partner on the other
    /// side are dropped; key columns appear once.
    pub fn inner_join(&self, other: &Table, keys: &[&str]) -> Result<Table, AppError> {
        let left_keys: Vec<usize> = keys
            .iter()
            .map(|key| {
                self.column_index(key)
                    .ok_or_else(|| AppError::Internal(format!("Missing join column: {}", key)))
            })
            .collect::<Result<_, _>>()?;
        let right_keys: Vec<usize> = keys
            .iter()
            .map(|key| {
                other
                    .column_index(key)
                    .ok_or_else(|| AppError::Internal(format!("Missing join column: {}", key)))
            })
            .collect::<Result<_, _>>()?;

        let right_extra: Vec<usize> = (0..other.columns.len())
            .filter(|index| !right_keys.contains(index))
            .collect();

        let mut lookup: HashMap<Vec<String>, Vec<&Vec<String>>> = HashMap::new();
        for row in &other.rows {
            let key: Vec<String> = right_keys.iter().map(|&i| row[i].clone()).collect();
            lookup.entry(key).or_default().push(row);
        }

        let mut columns = self.columns.clone();
        columns.extend(right_extra.iter().map(|&i| other.columns[i].clone()));

        let mut rows = Vec::new();
        for row in &self.rows {
            let key: Vec<String> = left_keys.iter().map(|&i| row[i].clone()).collect();
            if let Some(partners) = lookup.get(&key) {
                for partner in partners {
                    let mut joined = row.clone();
                    joined.extend(right_extra.iter().map(|&i| partner[i].clone()));
                    rows.push(joined);
                }
            }
        }
        Ok(Table { columns, rows })
    }

    pub fn sort_by_column(&mut self, name: &str) -> Result<(), AppError> {
        let index = self
            .column_index(name)
            .ok_or_else(|| AppError::Internal(format!("Missing column: {}", name)))?;
        self.rows.sort_by(|a, b| a[index].cmp(&b[index]));
        Ok(())
    }
}

/// Borrowed view on one table row, addressed by column name.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a Table,
    cells: &'a Vec<String>,
}

impl<'a> Row<'a> {
    /// Cell content, or `None` for unknown columns and empty cells.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let index = self.table.column_index(column)?;
        let value = self.cells[index].as_str();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    pub fn columns(&self) -> &'a [String] {
        &self.table.columns
    }

    /// The cell under the first column whose name matches the predicate.
    pub fn find(&self, mut predicate: impl FnMut(&str) -> bool) -> Option<&'a str> {
        let index = self
            .table
            .columns
            .iter()
            .position(|column| predicate(column))?;
        let value = self.cells[index].as_str();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

fn format_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            match excel_serial_to_date(serial) {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => serial.to_string(),
            }
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}

/// Excel stores dates as days since 1899-12-30; serial 44927 is 2023-01-01.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=200_000.0).contains(&serial) {
        return None;
    }
    let (year, month, day) = EXCEL_EPOCH;
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|epoch| epoch.checked_add_signed(Duration::days(serial.trunc() as i64)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn veldwerk() -> Table {
        Table::from_csv(
            b"GMW BRO ID;Datum bemonsterd;Filternummer;pH\n\
              GMW000000000001;2024-05-13;1;7,2\n\
              GMW000000000002;2024-05-14;2;6,9\n",
        )
        .unwrap()
    }

    #[test]
    fn csv_delimiter_is_sniffed() {
        let semicolon = veldwerk();
        assert_eq!(semicolon.columns()[0], "GMW BRO ID");
        assert_eq!(semicolon.len(), 2);

        let comma = Table::from_csv(b"a,b\n1,2\n").unwrap();
        assert_eq!(comma.columns(), &["a", "b"]);
        assert_eq!(comma.rows().next().unwrap().get("b"), Some("2"));
    }

    #[test]
    fn ragged_rows_are_padded() {
        let table = Table::from_csv(b"a;b;c\n1;2\n").unwrap();
        let row = table.rows().next().unwrap();
        assert_eq!(row.get("a"), Some("1"));
        assert_eq!(row.get("c"), None);
    }

    #[test]
    fn inner_join_keeps_only_shared_keys() {
        let field = veldwerk();
        let lab = Table::from_csv(
            b"GMW BRO ID;Datum bemonsterd;Filternummer;HCO3 (mg/l)\n\
              GMW000000000001;2024-05-13;1;120\n\
              GMW000000000009;2024-05-13;1;95\n",
        )
        .unwrap();

        let merged = field
            .inner_join(&lab, &["GMW BRO ID", "Datum bemonsterd", "Filternummer"])
            .unwrap();
        assert_eq!(merged.len(), 1);
        let row = merged.rows().next().unwrap();
        assert_eq!(row.get("pH"), Some("7,2"));
        assert_eq!(row.get("HCO3 (mg/l)"), Some("120"));
    }

    #[test]
    fn drop_columns_matches_on_substring() {
        let mut table = Table::from_csv(b"Putcode intern;bro_id\nP1;GMW1\n").unwrap();
        table.drop_columns_containing(&["Putcode"]);
        assert_eq!(table.columns(), &["bro_id"]);
    }

    #[test]
    fn positional_rename_keeps_extras() {
        let mut table = Table::from_csv(b"kolom1;kolom2;extra\na;b;c\n").unwrap();
        table.rename_positional(&["eventType", "measuringPointCode"]);
        assert_eq!(table.columns(), &["eventType", "measuringPointCode", "extra"]);
    }

    #[test]
    fn excel_serial_date_conversion() {
        assert_eq!(
            excel_serial_to_date(44927.0),
            NaiveDate::from_ymd_opt(2023, 1, 1)
        );
        assert_eq!(excel_serial_to_date(0.5), None);
    }

    #[test]
    fn zip_concatenates_csv_members() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options: zip::write::FileOptions = Default::default();
            writer.start_file("deel1.csv", options).unwrap();
            writer.write_all(b"a;b\n1;2\n").unwrap();
            writer.start_file("deel2.csv", options).unwrap();
            writer.write_all(b"a;b\n3;4\n").unwrap();
            writer.start_file("leesmij.txt", options).unwrap();
            writer.write_all(b"genegeerd").unwrap();
            writer.finish().unwrap();
        }

        let table = Table::from_zip(buffer.get_ref()).unwrap();
        assert_eq!(table.len(), 2);

        let empty = zip::ZipWriter::new(Cursor::new(Vec::new()))
            .finish()
            .unwrap();
        assert!(Table::from_zip(empty.get_ref()).is_err());
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        assert!(Table::from_bytes("pdf", b"").is_err());
    }
}
