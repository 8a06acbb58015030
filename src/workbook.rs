//! Upload parsing: multi-tab workbooks and single-table delimited text.
//!
//! Produces [`ParsedSheet`]s whose rows map every header to an explicit
//! nullable value. Formula cells keep their cached result (or lack of one)
//! so the resolver in [`crate::cell`] can apply its priority order; nothing
//! here evaluates a formula.

use std::collections::BTreeMap;
use std::io::Cursor;

use calamine::{Data, Reader, Xls, Xlsx};
use encoding_rs::{Encoding, UTF_8};
use log::{debug, info, warn};

use crate::{
    cell::{Cell, CellValue, resolve_cell},
    error::ParseError,
    headers::{self, HeaderLocation},
};

/// Upload budget, enforced before any parsing begins.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// One tab of an uploaded workbook, immutable once constructed.
#[derive(Debug, Clone)]
pub struct ParsedSheet {
    pub name: String,
    pub index: usize,
    /// Ordered, distinct column labels.
    pub headers: Vec<String>,
    /// Every record carries every header as a key; absent values are
    /// explicit `None`s, never missing keys.
    pub rows: Vec<BTreeMap<String, Option<String>>>,
}

impl ParsedSheet {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Build a sheet from a grid of resolved cell values: locate the header
    /// row, discard everything above it, and key each remaining row by the
    /// final header labels.
    pub fn from_grid(name: &str, index: usize, grid: Vec<Vec<Option<String>>>) -> Self {
        let HeaderLocation {
            header_row,
            headers,
        } = headers::locate_header_row(&grid);
        let data_start = header_row.map_or(0, |row| row + 1);
        debug!(
            "Sheet '{name}': header row {:?}, {} column(s)",
            header_row,
            headers.len()
        );

        let rows = grid
            .into_iter()
            .skip(data_start)
            .filter(|row| row.iter().any(Option::is_some))
            .map(|row| {
                headers
                    .iter()
                    .enumerate()
                    .map(|(idx, header)| (header.clone(), row.get(idx).cloned().flatten()))
                    .collect()
            })
            .collect();

        ParsedSheet {
            name: name.to_string(),
            index,
            headers,
            rows,
        }
    }

    /// Non-empty values of one column, in row order.
    pub fn column_values<'a>(&'a self, header: &str) -> impl Iterator<Item = &'a str> {
        self.rows
            .iter()
            .filter_map(move |row| row.get(header).and_then(|v| v.as_deref()))
    }
}

/// The parsed upload: all tabs, first tab first.
#[derive(Debug, Clone)]
pub struct ParsedWorkbook {
    pub filename: String,
    pub sheets: Vec<ParsedSheet>,
}

impl ParsedWorkbook {
    /// The first sheet, kept for callers that predate multi-tab support.
    pub fn primary(&self) -> &ParsedSheet {
        &self.sheets[0]
    }
}

/// Parse an uploaded file into sheets of resolved values.
///
/// Fails with [`ParseError::UnsupportedFormat`] for unknown extensions,
/// [`ParseError::TooLarge`] past the byte budget, and [`ParseError::Empty`]
/// when no sheet yields a single data row.
pub fn parse_bytes(bytes: &[u8], filename: &str) -> Result<ParsedWorkbook, ParseError> {
    parse_bytes_with_encoding(bytes, filename, UTF_8)
}

/// As [`parse_bytes`], decoding delimited text with the given encoding.
/// Workbook formats carry their own encoding and ignore the parameter.
pub fn parse_bytes_with_encoding(
    bytes: &[u8],
    filename: &str,
    encoding: &'static Encoding,
) -> Result<ParsedWorkbook, ParseError> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ParseError::TooLarge {
            size: bytes.len(),
            limit: MAX_UPLOAD_BYTES,
        });
    }

    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let sheets = match extension.as_str() {
        "xlsx" | "xlsm" => read_xlsx(bytes)?,
        "xls" => read_xls(bytes)?,
        "csv" | "txt" => read_delimited(bytes, filename, b',', encoding)?,
        "tsv" => read_delimited(bytes, filename, b'\t', encoding)?,
        _ => return Err(ParseError::UnsupportedFormat { extension }),
    };

    if sheets.iter().all(|sheet| sheet.rows.is_empty()) {
        return Err(ParseError::Empty);
    }
    info!(
        "Parsed '{filename}': {} sheet(s), {} data row(s)",
        sheets.len(),
        sheets.iter().map(ParsedSheet::row_count).sum::<usize>()
    );
    Ok(ParsedWorkbook {
        filename: filename.to_string(),
        sheets,
    })
}

fn read_xlsx(bytes: &[u8]) -> Result<Vec<ParsedSheet>, ParseError> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| ParseError::Workbook(e.to_string()))?;
    let names = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(names.len());
    for (index, name) in names.iter().enumerate() {
        let values = workbook
            .worksheet_range(name)
            .map_err(|e| ParseError::Workbook(e.to_string()))?;
        // Formula source text lives in a parallel range; cells present there
        // become Formula variants with the value range as the cached result.
        let formulas = workbook.worksheet_formula(name).ok();

        let start = values.start().unwrap_or((0, 0));
        let grid = values
            .rows()
            .enumerate()
            .map(|(row_idx, row)| {
                row.iter()
                    .enumerate()
                    .map(|(col_idx, data)| {
                        let abs = (start.0 + row_idx as u32, start.1 + col_idx as u32);
                        let source = formulas
                            .as_ref()
                            .and_then(|range| range.get_value(abs))
                            .filter(|text| !text.is_empty());
                        let cell = match source {
                            Some(source) => {
                                let cached = match literal_from_data(data) {
                                    CellValue::Empty => None,
                                    literal => Some(Box::new(literal)),
                                };
                                Cell::new(CellValue::Formula {
                                    source: source.clone(),
                                    cached,
                                })
                            }
                            None => Cell::new(literal_from_data(data)),
                        };
                        resolve_cell(&cell)
                    })
                    .collect()
            })
            .collect();
        sheets.push(ParsedSheet::from_grid(name, index, grid));
    }
    Ok(sheets)
}

fn read_xls(bytes: &[u8]) -> Result<Vec<ParsedSheet>, ParseError> {
    let mut workbook: Xls<_> =
        Xls::new(Cursor::new(bytes)).map_err(|e| ParseError::Workbook(e.to_string()))?;
    let names = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(names.len());
    for (index, name) in names.iter().enumerate() {
        let values = workbook
            .worksheet_range(name)
            .map_err(|e| ParseError::Workbook(e.to_string()))?;
        let grid = values
            .rows()
            .map(|row| {
                row.iter()
                    .map(|data| resolve_cell(&Cell::new(literal_from_data(data))))
                    .collect()
            })
            .collect();
        sheets.push(ParsedSheet::from_grid(name, index, grid));
    }
    Ok(sheets)
}

fn literal_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Error(e.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(parsed) => CellValue::Date(parsed),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

fn read_delimited(
    bytes: &[u8],
    filename: &str,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Vec<ParsedSheet>, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(bytes);

    let mut grid: Vec<Vec<Option<String>>> = Vec::new();
    let mut record = csv::ByteRecord::new();
    while reader.read_byte_record(&mut record)? {
        let row = record
            .iter()
            .map(|field| decode_field(field, encoding))
            .collect::<Result<Vec<_>, _>>()?;
        grid.push(row);
    }

    let name = filename
        .rsplit('/')
        .next()
        .and_then(|base| base.rsplit_once('.'))
        .map(|(stem, _)| stem.to_string())
        .unwrap_or_else(|| filename.to_string());
    if grid.is_empty() {
        warn!("Delimited file '{filename}' contains no records");
    }
    Ok(vec![ParsedSheet::from_grid(&name, 0, grid)])
}

fn decode_field(field: &[u8], encoding: &'static Encoding) -> Result<Option<String>, ParseError> {
    if field.is_empty() {
        return Ok(None);
    }
    let (text, _, had_errors) = encoding.decode(field);
    if had_errors {
        return Err(ParseError::Decode {
            encoding: encoding.name().to_string(),
        });
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}
