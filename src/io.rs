//! Delimited-file helpers shared by the readers. Everything is loaded as
//! String dtype first and parsed explicitly so errors can name the file.

use std::path::{Path, PathBuf};

use polars::prelude::*;

use crate::error::AssemblyError;

/// Read a delimited file with all columns as String dtype and trimmed names.
pub(crate) fn read_csv_as_strings(path: &Path, separator: u8) -> Result<DataFrame, AssemblyError> {
    let load = || -> PolarsResult<DataFrame> {
        let mut df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0)) // all columns as String
            .map_parse_options(|opts| opts.with_separator(separator))
            .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
            .finish()?;

        let trimmed: Vec<String> = df
            .get_column_names_str()
            .iter()
            .map(|c| c.trim().to_string())
            .collect();
        df.set_column_names(trimmed.as_slice())?;
        Ok(df)
    };
    load().map_err(|e| AssemblyError::config_load(path, e.to_string()))
}

/// Read everything below the descriptive preamble as strings.
pub(crate) fn read_numeric_block(path: &Path, skip_rows: usize, separator: u8) -> Result<DataFrame, AssemblyError> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_skip_rows(skip_rows)
        .with_infer_schema_length(Some(0)) // all columns as String
        .map_parse_options(|opts| opts.with_separator(separator))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| AssemblyError::config_load(path, e.to_string()))
}

pub(crate) fn parse_numeric(column: &Column, origin: &Path) -> Result<Vec<f64>, AssemblyError> {
    let cells = column
        .str()
        .map_err(|e| AssemblyError::config_load(origin, e.to_string()))?;
    cells
        .into_iter()
        .enumerate()
        .map(|(row, cell)| {
            cell.map(str::trim)
                .and_then(|v| v.parse::<f64>().ok())
                .ok_or_else(|| {
                    AssemblyError::config_load(
                        origin,
                        format!(
                            "column '{}', data row {}: '{}' is not a number",
                            column.name(),
                            row + 1,
                            cell.unwrap_or_default()
                        ),
                    )
                })
        })
        .collect()
}
