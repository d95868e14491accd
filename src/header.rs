//! The PERSEE output document: four descriptive header rows above the numeric
//! body, written without a polars header line.
//!
//! Row 1 names the columns, row 2 carries the start date then each semantic
//! type, row 3 the time unit `s` then each unit, row 4 a `true` flag per column.

use std::io::Cursor;
use std::path::Path;

use polars::prelude::*;
use tracing::info;

use crate::error::AssemblyError;
use crate::registry::{ColumnMeta, ColumnRegistry, SemanticType};
use crate::schema;
use crate::table::{Assembly, WorkingTable};

/// Significant digits of the `%3g` float format the optimizer inputs use.
pub const DEFAULT_PRECISION: usize = 6;

/// Build the four header rows for `table`.
///
/// Every value column must be registered; the first one that is not is
/// reported as `MissingMetadata`.
pub fn build_header(
    table: &WorkingTable,
    registry: &ColumnRegistry,
    start_date: &str,
) -> Result<[Vec<String>; 4], AssemblyError> {
    let names = table.column_names();
    let mut types = vec![start_date.to_string()];
    let mut units = vec![schema::header::TIME_UNIT.to_string()];

    for name in names.iter().skip(1) {
        let meta = registry
            .get(name)
            .ok_or_else(|| AssemblyError::MissingMetadata(name.clone()))?;
        types.push(meta.semantic_type.to_string());
        units.push(meta.unit.clone());
    }

    let flags = vec![schema::header::FLAG.to_string(); names.len()];
    Ok([names, types, units, flags])
}

/// Serialized form of a finished run, stored column-major as text cells.
#[derive(Debug, Clone, PartialEq)]
pub struct PerseeDocument {
    columns: Vec<Vec<String>>,
}

impl PerseeDocument {
    pub fn build(
        table: &WorkingTable,
        registry: &ColumnRegistry,
        start_date: &str,
        precision: usize,
    ) -> Result<Self, AssemblyError> {
        let header = build_header(table, registry, start_date)?;
        let mut columns: Vec<Vec<String>> = (0..table.width())
            .map(|j| header.iter().map(|row| row[j].clone()).collect())
            .collect();

        columns[0].extend(table.timestamps()?.into_iter().map(|t| t.to_string()));
        for (j, column) in columns.iter_mut().enumerate().skip(1) {
            let values = table.values_at(j)?;
            column.extend(values.into_iter().map(|v| format_general(v, precision)));
        }

        Ok(Self { columns })
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Header rows plus data rows.
    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn row(&self, i: usize) -> Option<Vec<&str>> {
        if i >= self.row_count() {
            return None;
        }
        Some(self.columns.iter().map(|c| c[i].as_str()).collect())
    }

    pub fn header(&self) -> [Vec<&str>; 4] {
        std::array::from_fn(|i| self.row(i).unwrap_or_default())
    }

    /// Render the whole document in memory.
    ///
    /// Cells are never quoted, so a header cell holding the delimiter, a quote
    /// or a line break is a `Shape` error.
    pub fn to_bytes(&self, delimiter: u8) -> Result<Vec<u8>, AssemblyError> {
        check_delimiter(delimiter)?;
        let sep = char::from(delimiter);
        if let Some(cell) = self
            .columns
            .iter()
            .flat_map(|c| c.iter().take(schema::header::ROWS))
            .find(|cell| cell.contains([sep, '"', '\n', '\r']))
        {
            return Err(AssemblyError::Shape(format!(
                "header cell '{}' contains the delimiter '{sep}', a quote or a line break",
                cell.escape_debug()
            )));
        }

        let frame_columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(j, cells)| {
                // Nulls render as bare empty fields; empty strings would be quoted.
                let cells: Vec<Option<&str>> = cells
                    .iter()
                    .map(|c| (!c.is_empty()).then_some(c.as_str()))
                    .collect();
                Column::new(format!("c{j}").into(), cells)
            })
            .collect::<Vec<_>>();
        let mut df = DataFrame::new(frame_columns)?;

        let mut buf = Vec::new();
        CsvWriter::new(&mut buf)
            .include_header(false)
            .with_separator(delimiter)
            .with_quote_style(QuoteStyle::Never)
            .finish(&mut df)?;
        Ok(buf)
    }

    /// Write the rendered document in one call so a failure leaves no partial file.
    pub fn write(&self, path: &Path, delimiter: u8) -> Result<(), AssemblyError> {
        let bytes = self.to_bytes(delimiter)?;
        std::fs::write(path, bytes)?;
        info!(
            path = %path.display(),
            columns = self.width(),
            rows = self.row_count(),
            "wrote PERSEE series"
        );
        Ok(())
    }
}

/// Reject delimiters that can occur inside a `%g` number or break a line.
pub fn check_delimiter(delimiter: u8) -> Result<(), AssemblyError> {
    if delimiter.is_ascii_alphanumeric() || b".+-\"\r\n".contains(&delimiter) {
        return Err(AssemblyError::Config(format!(
            "'{}' cannot delimit numeric output",
            char::from(delimiter).escape_debug()
        )));
    }
    Ok(())
}

/// A document read back from disk.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub start_date: String,
    pub assembly: Assembly,
}

/// Parse a document produced by [`PerseeDocument::to_bytes`], rebuilding the
/// working table from rows 5+ and the registry from rows 1-3.
pub fn parse_document(bytes: &[u8], delimiter: u8) -> Result<ParsedDocument, AssemblyError> {
    let origin = Path::new("<document>");
    let df = CsvReadOptions::default()
        .with_has_header(false)
        .with_infer_schema_length(Some(0)) // all columns as String
        .map_parse_options(|opts| opts.with_separator(delimiter))
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()?;

    if df.height() < schema::header::ROWS {
        return Err(AssemblyError::config_load(
            origin,
            format!("{} rows is shorter than the header block", df.height()),
        ));
    }

    let cell = |column: &Column, row: usize| -> Result<String, AssemblyError> {
        Ok(column.str()?.get(row).map(str::to_string).unwrap_or_default())
    };

    let columns = df.get_columns();
    let time = columns
        .first()
        .ok_or_else(|| AssemblyError::config_load(origin, "document has no columns"))?;
    if cell(time, 0)? != schema::table::TIME {
        return Err(AssemblyError::config_load(
            origin,
            format!("first column must be '{}'", schema::table::TIME),
        ));
    }
    let start_date = cell(time, 1)?;

    let body = df.slice(schema::header::ROWS as i64, df.height() - schema::header::ROWS);
    let timestamps = crate::io::parse_numeric(&body.get_columns()[0], origin)?
        .into_iter()
        .map(|t| t as i64)
        .collect::<Vec<_>>();

    let mut assembly = Assembly {
        table: WorkingTable::from_timestamps(timestamps)?,
        registry: ColumnRegistry::new(),
    };
    for (j, column) in columns.iter().enumerate().skip(1) {
        let name = cell(column, 0)?;
        if name.is_empty() {
            return Err(AssemblyError::config_load(
                origin,
                format!("column {} has no name", j + 1),
            ));
        }
        let meta = ColumnMeta::new(SemanticType::parse(&cell(column, 1)?), cell(column, 2)?);
        let values = crate::io::parse_numeric(&body.get_columns()[j], origin)?;
        assembly.table.set_column(&name, values, "document body")?;
        assembly.registry.register(name, meta);
    }

    Ok(ParsedDocument {
        start_date,
        assembly,
    })
}

/// C `%g` style general formatting with `precision` significant digits.
pub fn format_general(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let p = precision.max(1);
    let sci = format!("{:.*e}", p - 1, value);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= p as i32 {
        let mantissa = trim_fraction(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    } else {
        let decimals = (p as i32 - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_axis::TimeAxis;

    fn assembly() -> Assembly {
        let axis = TimeAxis::new("2025-01-01 00:00", 3600, 2, 2).unwrap();
        let mut assembly = Assembly::new(&axis).unwrap();
        assembly.table.set_column("PV", vec![0.5, 1.25], "test").unwrap();
        assembly.table.set_column("Load", vec![12.0, 1234567.0], "test").unwrap();
        assembly
            .registry
            .register("PV", ColumnMeta::new(SemanticType::Other("Generation".into()), "MW"));
        assembly
            .registry
            .register("Load", ColumnMeta::new(SemanticType::Load, "kW"));
        assembly
    }

    #[test]
    fn header_rows_follow_table_order() {
        let a = assembly();
        let [names, types, units, flags] =
            build_header(&a.table, &a.registry, "2025-01-01 00:00").unwrap();

        assert_eq!(names, vec!["Time", "PV", "Load"]);
        assert_eq!(types, vec!["2025-01-01 00:00", "Generation", "load"]);
        assert_eq!(units, vec!["s", "MW", "kW"]);
        assert_eq!(flags, vec!["true"; 3]);
    }

    #[test]
    fn unregistered_column_is_reported() {
        let mut a = assembly();
        a.table.set_column("Orphan", vec![1.0, 2.0], "test").unwrap();
        let err = build_header(&a.table, &a.registry, "2025-01-01 00:00").unwrap_err();
        assert!(matches!(err, AssemblyError::MissingMetadata(name) if name == "Orphan"));
    }

    #[test]
    fn renders_semicolon_document() {
        let a = assembly();
        let doc = PerseeDocument::build(&a.table, &a.registry, "2025-01-01 00:00", 6).unwrap();
        let text = String::from_utf8(doc.to_bytes(b';').unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            vec![
                "Time;PV;Load",
                "2025-01-01 00:00;Generation;load",
                "s;MW;kW",
                "true;true;true",
                "3600;0.5;12",
                "7200;1.25;1.23457e+06",
            ]
        );
    }

    #[test]
    fn header_cell_with_delimiter_is_rejected() {
        let mut a = assembly();
        a.registry
            .register("PV", ColumnMeta::new(SemanticType::Load, "MW;h"));
        let doc = PerseeDocument::build(&a.table, &a.registry, "2025-01-01 00:00", 6).unwrap();
        assert!(matches!(doc.to_bytes(b';'), Err(AssemblyError::Shape(_))));
    }

    #[test]
    fn header_cell_with_quote_or_line_break_is_rejected() {
        for unit in ["in\"", "MW\nh"] {
            let mut a = assembly();
            a.registry
                .register("Load", ColumnMeta::new(SemanticType::Load, unit));
            let doc = PerseeDocument::build(&a.table, &a.registry, "2025-01-01 00:00", 6).unwrap();
            assert!(matches!(doc.to_bytes(b';'), Err(AssemblyError::Shape(_))), "{unit:?}");
        }
    }

    #[test]
    fn numeric_delimiters_are_refused_before_rendering() {
        let a = assembly();
        let doc = PerseeDocument::build(&a.table, &a.registry, "2025-01-01 00:00", 6).unwrap();
        for delimiter in [b'.', b'-', b'+', b'e', b'7'] {
            assert!(matches!(doc.to_bytes(delimiter), Err(AssemblyError::Config(_))));
        }
        assert!(check_delimiter(b',').is_ok());
        assert!(check_delimiter(b'\t').is_ok());
    }

    #[test]
    fn cells_are_never_quoted() {
        let mut a = assembly();
        a.registry
            .register("PV", ColumnMeta::new(SemanticType::Other("Generation".into()), "kW h'"));
        let doc = PerseeDocument::build(&a.table, &a.registry, "2025-01-01 00:00", 6).unwrap();
        let text = String::from_utf8(doc.to_bytes(b',').unwrap()).unwrap();
        assert_eq!(text.lines().nth(1).unwrap(), "2025-01-01 00:00,Generation,load");
        assert_eq!(text.lines().nth(2).unwrap(), "s,kW h',kW");
        assert!(!text.contains('"'));
    }

    #[test]
    fn parse_recovers_table_and_registry() {
        let a = assembly();
        let doc = PerseeDocument::build(&a.table, &a.registry, "2025-01-01 00:00", 6).unwrap();
        let parsed = parse_document(&doc.to_bytes(b';').unwrap(), b';').unwrap();

        assert_eq!(parsed.start_date, "2025-01-01 00:00");
        assert_eq!(parsed.assembly.table.column_names(), a.table.column_names());
        assert_eq!(parsed.assembly.table.timestamps().unwrap(), vec![3600, 7200]);
        assert_eq!(parsed.assembly.table.values("PV").unwrap(), vec![0.5, 1.25]);
        assert_eq!(parsed.assembly.registry.get("Load").unwrap().unit, "kW");
        assert_eq!(
            parsed.assembly.registry.get("PV").unwrap().semantic_type,
            SemanticType::Other("Generation".into())
        );
    }

    #[test]
    fn general_format_matches_printf() {
        let cases = [
            (0.0, "0"),
            (1.0, "1"),
            (0.1, "0.1"),
            (123456.0, "123456"),
            (1234567.0, "1.23457e+06"),
            (0.0001, "0.0001"),
            (0.00001234, "1.234e-05"),
            (-2.5, "-2.5"),
            (1.0 / 3.0, "0.333333"),
            (99999.95, "99999.9"),
            (999999.5, "1e+06"),
        ];
        for (value, expected) in cases {
            assert_eq!(format_general(value, 6), expected, "formatting {value}");
        }
        assert_eq!(format_general(1234.5678, 3), "1.23e+03");
        assert_eq!(format_general(12.345, 3), "12.3");
    }
}
