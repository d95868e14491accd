//! Sensitivity-analysis tables derived from a baseline PERSEE results plan.
//!
//! For each constraint target the baseline sub-objective value is stepped down
//! from 100 % to 0 % and written as max/min bus-value bounds that PERSEE reads
//! back as a parameter sweep.

use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::info;

use crate::error::AssemblyError;
use crate::io::{parse_numeric, read_csv_as_strings};
use crate::schema::plan;

/// Percentage levels, highest first.
pub const LEVELS: [(&str, f64); 12] = [
    ("PERC100", 1.0),
    ("PERC090", 0.9),
    ("PERC080", 0.8),
    ("PERC070", 0.7),
    ("PERC060", 0.6),
    ("PERC050", 0.5),
    ("PERC040", 0.4),
    ("PERC030", 0.3),
    ("PERC020", 0.2),
    ("PERC010", 0.1),
    ("PERC005", 0.05),
    ("PERC000", 0.0),
];

const BOUND_STEP: i64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct SensitivityRow {
    pub label: &'static str,
    pub max: i64,
    pub min: i64,
}

/// Read the `Subobjective` value of `target` from a `;` separated PLAN file.
pub fn load_plan_value(path: &Path, target: &str) -> Result<f64, AssemblyError> {
    let df = read_csv_as_strings(path, b';')?;
    for required in [plan::MODEL, plan::INDICATOR, plan::VALUE] {
        if df.column(required).is_err() {
            return Err(AssemblyError::config_load(
                path,
                format!("missing column '{required}'"),
            ));
        }
    }

    let hits = df
        .lazy()
        .filter(
            col(plan::MODEL)
                .str()
                .strip_chars(lit(" \t\r\n"))
                .eq(lit(target))
                .and(
                    col(plan::INDICATOR)
                        .str()
                        .strip_chars(lit(" \t\r\n"))
                        .eq(lit(plan::SUBOBJECTIVE)),
                ),
        )
        .select([col(plan::VALUE)])
        .collect()?;

    let value = hits
        .get_columns()
        .first()
        .map(|c| parse_numeric(c, path))
        .transpose()?
        .and_then(|values| values.first().copied())
        .ok_or_else(|| {
            AssemblyError::config_load(
                path,
                format!("no '{}' row for model '{target}'", plan::SUBOBJECTIVE),
            )
        })?;
    Ok(value)
}

/// Bounds for every level. `max` is rounded to the nearest ten, ties to even.
pub fn sensitivity_rows(value: f64) -> Vec<SensitivityRow> {
    LEVELS
        .iter()
        .map(|&(label, percent)| {
            let max = ((value * percent) / BOUND_STEP as f64).round_ties_even() as i64 * BOUND_STEP;
            let min = if percent == 0.0 { 0 } else { max - BOUND_STEP };
            SensitivityRow { label, max, min }
        })
        .collect()
}

pub fn max_column(target: &str) -> String {
    format!("{target}__paramListJson__MaxConstraintBusValue")
}

pub fn min_column(target: &str) -> String {
    format!("{target}__paramListJson__MinConstraintBusValue")
}

/// Render the table with its header row; the label column has an empty name,
/// written as a null so the cell stays bare.
pub fn render_table(target: &str, rows: &[SensitivityRow]) -> Result<Vec<u8>, AssemblyError> {
    let labels: Vec<Option<&str>> = std::iter::once(None)
        .chain(rows.iter().map(|r| Some(r.label)))
        .collect();
    let maxes: Vec<String> = std::iter::once(max_column(target))
        .chain(rows.iter().map(|r| r.max.to_string()))
        .collect();
    let mins: Vec<String> = std::iter::once(min_column(target))
        .chain(rows.iter().map(|r| r.min.to_string()))
        .collect();

    let mut df = DataFrame::new(vec![
        Column::new("label".into(), labels),
        Column::new("max".into(), maxes),
        Column::new("min".into(), mins),
    ])?;

    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(false)
        .with_separator(b';')
        .finish(&mut df)?;
    Ok(buf)
}

/// Write `<location>_<target>_tabech.csv` for each target into `out_dir`.
pub fn write_tables(
    plan_path: &Path,
    targets: &[String],
    location: &str,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, AssemblyError> {
    let mut rendered = Vec::with_capacity(targets.len());
    for target in targets {
        let value = load_plan_value(plan_path, target)?;
        info!(%target, value, "baseline sub-objective");
        let bytes = render_table(target, &sensitivity_rows(value))?;
        rendered.push((out_dir.join(format!("{location}_{target}_tabech.csv")), bytes));
    }

    std::fs::create_dir_all(out_dir)?;
    let mut written = Vec::with_capacity(rendered.len());
    for (path, bytes) in rendered {
        std::fs::write(&path, bytes)?;
        info!(path = %path.display(), "wrote sensitivity table");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_step_down_to_zero() {
        let rows = sensitivity_rows(1234.0);
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[0], SensitivityRow { label: "PERC100", max: 1230, min: 1220 });
        assert_eq!(rows[1], SensitivityRow { label: "PERC090", max: 1110, min: 1100 });
        assert_eq!(rows[10], SensitivityRow { label: "PERC005", max: 60, min: 50 });
        assert_eq!(rows[11], SensitivityRow { label: "PERC000", max: 0, min: 0 });
    }

    #[test]
    fn rounding_ties_go_to_even_tens() {
        assert_eq!(sensitivity_rows(25.0)[0].max, 20);
        assert_eq!(sensitivity_rows(35.0)[0].max, 40);
    }

    #[test]
    fn renders_header_and_rows() {
        let text = String::from_utf8(render_table("CO2_Constraint", &sensitivity_rows(100.0)).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            ";CO2_Constraint__paramListJson__MaxConstraintBusValue;CO2_Constraint__paramListJson__MinConstraintBusValue"
        );
        assert_eq!(lines[1], "PERC100;100;90");
        assert_eq!(lines[12], "PERC000;0;0");
    }

    #[test]
    fn reads_subobjective_from_plan() {
        let dir = tempfile::tempdir().unwrap();
        let plan = dir.path().join("plan.csv");
        std::fs::write(
            &plan,
            "Model;Indicator;Value\n\
             CO2_Constraint;Cost;12\n\
             CO2_Constraint;Subobjective;4520.5\n\
             LandFootprint_Constraint;Subobjective;88\n",
        )
        .unwrap();

        assert_eq!(load_plan_value(&plan, "CO2_Constraint").unwrap(), 4520.5);
        assert!(matches!(
            load_plan_value(&plan, "FuelLogistics_Constraint"),
            Err(AssemblyError::ConfigLoad { .. })
        ));

        let written = write_tables(
            &plan,
            &["LandFootprint_Constraint".to_string()],
            "HS",
            &dir.path().join("tab_ech"),
        )
        .unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("HS_LandFootprint_Constraint_tabech.csv"));
        let text = std::fs::read_to_string(&written[0]).unwrap();
        assert!(text.lines().nth(1).unwrap().starts_with("PERC100;90;80"));
    }
}
