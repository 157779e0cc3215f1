//! Spreadsheet and CSV loading into a [`DistrictTable`].

use calamine::{Data, Reader, open_workbook_auto};
use std::path::Path;
use tracing::{debug, info};

use crate::config::ColumnMapping;
use crate::error::DataLoadError;
use crate::table::{Column, DistrictRecord, DistrictTable};

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Sheet name and header row, as shown by `inspect`.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetSummary {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: usize,
}

enum InputFormat {
    Workbook,
    Csv,
}

fn input_format(path: &Path) -> Result<InputFormat, DataLoadError> {
    if !path.exists() {
        return Err(DataLoadError::NotFound(path.to_path_buf()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if ext == "csv" {
        Ok(InputFormat::Csv)
    } else if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
        Ok(InputFormat::Workbook)
    } else {
        Err(DataLoadError::UnsupportedFormat(ext))
    }
}

/// Loads `sheet` from the file at `path` and maps its headers to canonical columns.
///
/// CSV files have a single implicit sheet, so `sheet` is ignored for them.
///
/// # Errors
///
/// Returns a [`DataLoadError`] if the file, sheet or a required column is missing,
/// or if a numeric column holds text that is not a number.
#[tracing::instrument(skip(path, mapping), fields(path = %path.display()))]
pub fn load_table(
    path: &Path,
    sheet: &str,
    mapping: &ColumnMapping,
) -> Result<DistrictTable, DataLoadError> {
    let (headers, rows) = match input_format(path)? {
        InputFormat::Csv => read_csv(path)?,
        InputFormat::Workbook => read_sheet(path, sheet)?,
    };

    let table = table_from_rows(&headers, &rows, mapping)?;
    info!(rows = table.len(), "Input table loaded");
    Ok(table)
}

/// Lists the sheets of a workbook (or the single sheet of a CSV file) with their headers.
pub fn list_sheets(path: &Path) -> Result<Vec<SheetSummary>, DataLoadError> {
    match input_format(path)? {
        InputFormat::Csv => {
            let (headers, rows) = read_csv(path)?;
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("csv")
                .to_string();
            Ok(vec![SheetSummary {
                name,
                headers,
                rows: rows.len(),
            }])
        }
        InputFormat::Workbook => {
            let mut workbook = open_workbook_auto(path).map_err(|source| DataLoadError::Workbook {
                path: path.to_path_buf(),
                source,
            })?;

            let mut summaries = Vec::new();
            for name in workbook.sheet_names() {
                let range =
                    workbook
                        .worksheet_range(&name)
                        .map_err(|source| DataLoadError::Workbook {
                            path: path.to_path_buf(),
                            source,
                        })?;
                let mut rows = range
                    .rows()
                    .map(|row| row.iter().map(cell_text).collect::<Vec<String>>());
                let headers = rows.next().map(normalize_headers).unwrap_or_default();
                summaries.push(SheetSummary {
                    name,
                    headers,
                    rows: rows.count(),
                });
            }
            Ok(summaries)
        }
    }
}

fn read_sheet(path: &Path, sheet: &str) -> Result<(Vec<String>, Vec<Vec<String>>), DataLoadError> {
    let mut workbook = open_workbook_auto(path).map_err(|source| DataLoadError::Workbook {
        path: path.to_path_buf(),
        source,
    })?;

    let available = workbook.sheet_names();
    if !available.iter().any(|name| name == sheet) {
        return Err(DataLoadError::MissingSheet {
            sheet: sheet.to_string(),
            available,
        });
    }

    let range = workbook
        .worksheet_range(sheet)
        .map_err(|source| DataLoadError::Workbook {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(sheet, rows = range.height(), cols = range.width(), "Sheet range read");

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let headers = rows.next().ok_or(DataLoadError::Empty)?;

    Ok((normalize_headers(headers), rows.collect()))
}

fn read_csv(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>), DataLoadError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    if headers.is_empty() {
        return Err(DataLoadError::Empty);
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok((normalize_headers(headers), rows))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Names blank headers `Unnamed: <index>`, matching what the source data's
/// headerless district column was known as.
fn normalize_headers(headers: Vec<String>) -> Vec<String> {
    headers
        .into_iter()
        .enumerate()
        .map(|(i, h)| {
            let h = h.trim();
            if h.is_empty() {
                format!("Unnamed: {i}")
            } else {
                h.to_string()
            }
        })
        .collect()
}

/// Builds a table from a header row and text cells.
///
/// Empty numeric cells become `NaN`. Fully blank rows are skipped.
pub fn table_from_rows(
    headers: &[String],
    rows: &[Vec<String>],
    mapping: &ColumnMapping,
) -> Result<DistrictTable, DataLoadError> {
    let mut positions: [Option<usize>; 4] = [None; 4];
    let mut passthrough = Vec::new();

    for (i, header) in headers.iter().enumerate() {
        match mapping.resolve(header) {
            Some(column) if positions[column as usize].is_none() => {
                positions[column as usize] = Some(i);
            }
            _ => passthrough.push(i),
        }
    }

    let mut resolved = [0usize; 4];
    for column in Column::ALL {
        resolved[column as usize] =
            positions[column as usize].ok_or(DataLoadError::MissingColumn(column.name()))?;
    }

    fn cell(row: &[String], i: usize) -> &str {
        row.get(i).map(String::as_str).unwrap_or("")
    }

    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        // header occupies sheet row 1
        let sheet_row = index + 2;

        let number = |column: Column| {
            parse_number(cell(row, resolved[column as usize])).ok_or_else(|| {
                DataLoadError::InvalidNumber {
                    row: sheet_row,
                    column: column.name(),
                    value: cell(row, resolved[column as usize]).to_string(),
                }
            })
        };

        let mut record = DistrictRecord::new(
            cell(row, resolved[Column::District as usize]).trim(),
            number(Column::AreaM2)?,
            number(Column::GreenAreaM2)?,
            number(Column::AvgTemp)?,
        );
        record.passthrough = passthrough
            .iter()
            .map(|&i| cell(row, i).to_string())
            .collect();
        records.push(record);
    }

    Ok(DistrictTable {
        passthrough_headers: passthrough.iter().map(|&i| headers[i].clone()).collect(),
        rows: records,
    })
}

/// Parses a numeric cell. Blank cells are missing values (`NaN`).
fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return Some(f64::NAN);
    }
    text.replace(',', "").parse().ok()
}
