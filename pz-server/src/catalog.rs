//! In-memory tabular data loaded from product main files.

use std::io::Read;

use crate::models::{MainFileInfo, ProductMetadata, UCD_DEC, UCD_RA, UCD_REDSHIFT};

/// Errors building or reading a [`Catalog`].
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Column '{0}' not found")]
    MissingColumn(String),
    #[error("Column '{column}', row {row}: cannot parse '{value}' as a number")]
    NotNumeric {
        column: String,
        row: usize,
        value: String,
    },
    #[error("Row {row} has {found} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unsupported file format '{0}': only delimited text (csv, tsv, txt) can be loaded")]
    UnsupportedFormat(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// How to split a delimited text file into columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelimitedOptions {
    pub delimiter: u8,
    pub has_header: bool,
    /// Column names used when the file has no header row
    pub column_names: Vec<String>,
}

impl Default for DelimitedOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            column_names: Vec::new(),
        }
    }
}

impl DelimitedOptions {
    /// Options described by a product's main file record.
    ///
    /// Only formats readable as delimited text are accepted.
    pub fn from_main_file(info: &MainFileInfo) -> Result<Self, CatalogError> {
        let extension = info.extension().unwrap_or_default();
        let default_delimiter = match extension.as_str() {
            ".csv" | "" => b',',
            ".tsv" => b'\t',
            ".txt" | ".dat" => b' ',
            other => return Err(CatalogError::UnsupportedFormat(other.to_string())),
        };

        let delimiter = match info.delimiter.as_deref() {
            Some("\\t") | Some("\t") => b'\t',
            Some(d) if d.len() == 1 => d.as_bytes()[0],
            Some(d) if !d.is_empty() && d.trim().is_empty() => b' ',
            _ => default_delimiter,
        };

        Ok(Self {
            delimiter,
            has_header: info.has_header,
            column_names: info.columns.clone(),
        })
    }
}

/// Table of named columns holding the raw text cells of a product file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Catalog {
    /// Build a catalog from column names and rows of the same width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, CatalogError> {
        for (row, fields) in rows.iter().enumerate() {
            if fields.len() != columns.len() {
                return Err(CatalogError::RaggedRow {
                    row,
                    expected: columns.len(),
                    found: fields.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// Build a catalog from numeric columns, truncated to the shortest one.
    pub fn from_f64_columns<S: AsRef<str>>(columns: &[(S, Vec<f64>)]) -> Self {
        let n_rows = columns
            .iter()
            .map(|(_, values)| values.len())
            .min()
            .unwrap_or(0);
        let names = columns
            .iter()
            .map(|(name, _)| name.as_ref().to_string())
            .collect();
        let rows = (0..n_rows)
            .map(|row| {
                columns
                    .iter()
                    .map(|(_, values)| values[row].to_string())
                    .collect()
            })
            .collect();
        Self {
            columns: names,
            rows,
        }
    }

    /// Parse delimited text.
    ///
    /// With no header and no column names the first row is used as header.
    pub fn from_delimited<R: Read>(
        reader: R,
        options: &DelimitedOptions,
    ) -> Result<Self, CatalogError> {
        let use_first_row = options.has_header || options.column_names.is_empty();
        // Space-separated files may pad columns with runs of spaces
        let space_delimited = options.delimiter == b' ';
        let split = |record: &csv::StringRecord| -> Vec<String> {
            record
                .iter()
                .filter(|field| !(space_delimited && field.is_empty()))
                .map(str::to_string)
                .collect()
        };

        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(use_first_row)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let columns: Vec<String> = if use_first_row {
            split(csv_reader.headers()?)
        } else {
            options.column_names.clone()
        };

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let fields = split(&record?);
            if fields.len() != columns.len() {
                return Err(CatalogError::RaggedRow {
                    row: rows.len(),
                    expected: columns.len(),
                    found: fields.len(),
                });
            }
            rows.push(fields);
        }

        Ok(Self { columns, rows })
    }

    /// Parse the bytes of a product main file.
    pub fn from_main_file(bytes: &[u8], info: &MainFileInfo) -> Result<Self, CatalogError> {
        let options = DelimitedOptions::from_main_file(info)?;
        Self::from_delimited(bytes, &options)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Raw cells of a column.
    pub fn column(&self, name: &str) -> Result<Vec<&str>, CatalogError> {
        let index = self
            .column_index(name)
            .ok_or_else(|| CatalogError::MissingColumn(name.to_string()))?;
        Ok(self.rows.iter().map(|row| row[index].as_str()).collect())
    }

    /// Column parsed as numbers; empty cells become NaN.
    pub fn column_f64(&self, name: &str) -> Result<Vec<f64>, CatalogError> {
        self.column(name)?
            .into_iter()
            .enumerate()
            .map(|(row, cell)| {
                let cell = cell.trim();
                if cell.is_empty() {
                    return Ok(f64::NAN);
                }
                cell.parse::<f64>().map_err(|_| CatalogError::NotNumeric {
                    column: name.to_string(),
                    row,
                    value: cell.to_string(),
                })
            })
            .collect()
    }
}

/// Look up a column by UCD, logging when the association is missing.
fn ucd_column(metadata: &ProductMetadata, ucd: &str) -> Option<String> {
    let column = metadata
        .main_file()
        .and_then(|info| info.column_for_ucd(ucd).map(str::to_string));
    if column.is_none() {
        log::warn!(
            "Product {} has no column associated with UCD '{ucd}'",
            metadata.id().map(|id| id.to_string()).unwrap_or_default()
        );
    }
    column
}

/// Spectroscopic redshift catalog with its product metadata.
#[derive(Debug, Clone)]
pub struct SpeczCatalog {
    pub data: Catalog,
    pub metadata: ProductMetadata,
}

impl SpeczCatalog {
    pub fn new(data: Catalog, metadata: ProductMetadata) -> Self {
        Self { data, metadata }
    }

    pub fn ra_column(&self) -> Option<String> {
        ucd_column(&self.metadata, UCD_RA)
    }

    pub fn dec_column(&self) -> Option<String> {
        ucd_column(&self.metadata, UCD_DEC)
    }

    pub fn redshift_column(&self) -> Option<String> {
        ucd_column(&self.metadata, UCD_REDSHIFT)
    }
}

/// Training set with its product metadata.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub data: Catalog,
    pub metadata: ProductMetadata,
}

impl TrainingSet {
    pub fn new(data: Catalog, metadata: ProductMetadata) -> Self {
        Self { data, metadata }
    }

    pub fn redshift_column(&self) -> Option<String> {
        ucd_column(&self.metadata, UCD_REDSHIFT)
    }
}
