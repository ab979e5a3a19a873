use crate::InputError;
use calamine::{open_workbook_auto, Data, Reader};
use std::fs;
use std::path::Path;

/// Loads one axis of search terms
///
/// CSV files and spreadsheets (`.xlsx`, `.xls`, `.ods`) are read from the
/// column named after the file (`what.csv` -> `what`), falling back to the
/// first column not named `index`. Spreadsheets use their first sheet. Text
/// files hold one term per line. Blank cells and lines are skipped.
///
/// # Errors
///
/// * `InputError::NotFound` - The file does not exist
/// * `InputError::Unsupported` - Unknown extension
/// * `InputError::Empty` - No terms in the file
pub fn load_terms(path: &Path) -> Result<Vec<String>, InputError> {
    let shown = path.display().to_string();
    if !path.exists() {
        return Err(InputError::NotFound(shown));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let terms = match extension.as_str() {
        "csv" => load_csv_terms(path)?,
        "xlsx" | "xlsm" | "xls" | "ods" => load_sheet_terms(path)?,
        "txt" => load_text_terms(path)?,
        _ => return Err(InputError::Unsupported(shown)),
    };

    if terms.is_empty() {
        return Err(InputError::Empty(shown));
    }

    tracing::info!("Loaded {} term(s) from {}", terms.len(), shown);
    Ok(terms)
}

/// Index of the term column: the one named after the file, else the first
/// column not named `index`
fn term_column(headers: &[String], path: &Path) -> Option<usize> {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();

    let column = headers
        .iter()
        .position(|header| header.trim() == stem)
        .or_else(|| {
            headers
                .iter()
                .position(|header| !header.trim().eq_ignore_ascii_case("index"))
        });

    match column {
        Some(column) => tracing::debug!(
            "Reading terms from column '{}' of {}",
            headers[column].trim(),
            path.display()
        ),
        None => tracing::warn!("No usable column in {}", path.display()),
    }
    column
}

fn push_term(terms: &mut Vec<String>, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        terms.push(value.to_string());
    }
}

fn load_csv_terms(path: &Path) -> Result<Vec<String>, InputError> {
    let csv_error = |source: csv::Error| InputError::Csv {
        path: path.display().to_string(),
        source,
    };

    let content = fs::read_to_string(path)?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(str::to_string)
        .collect();

    let Some(column) = term_column(&headers, path) else {
        return Ok(Vec::new());
    };

    let mut terms = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_error)?;
        push_term(&mut terms, row.get(column));
    }
    Ok(terms)
}

fn load_sheet_terms(path: &Path) -> Result<Vec<String>, InputError> {
    let sheet_error = |source: calamine::Error| InputError::Spreadsheet {
        path: path.display().to_string(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(sheet_error)?;
    let Some(range) = workbook.worksheet_range_at(0) else {
        tracing::warn!("No worksheet in {}", path.display());
        return Ok(Vec::new());
    };
    let range = range.map_err(sheet_error)?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(cell_text).collect(),
        None => return Ok(Vec::new()),
    };

    let Some(column) = term_column(&headers, path) else {
        return Ok(Vec::new());
    };

    let mut terms = Vec::new();
    for row in rows {
        let value = row.get(column).map(cell_text);
        push_term(&mut terms, value.as_deref());
    }
    Ok(terms)
}

/// Cell text as a spreadsheet shows it; whole numbers lose their `.0`
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        Data::Float(number) if number.fract() == 0.0 => format!("{}", *number as i64),
        other => other.to_string(),
    }
}

fn load_text_terms(path: &Path) -> Result<Vec<String>, InputError> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
