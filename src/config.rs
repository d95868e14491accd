//! Run configuration, loaded from TOML.
//!
//! ```toml
//! [calendar]
//! start_date = "2025-01-01 00:00"
//!
//! [output]
//! path = "INDY_dataseries.csv"
//!
//! [profiles]
//! shapes = "Loads_LJ.csv"
//! reference = "profiles.csv"
//! jitter = [0.9, 1.1]
//! seed = 42
//!
//! [[merges]]
//! drop_originals = false
//! [[merges.rules]]
//! name = "Elec_Central"
//! columns_idx = [1, 2, 3]
//! load_type = "load"
//! units = "MW"
//!
//! [[imports]]
//! path = "ninja_pv.csv"
//! columns = ["PV"]
//! positions = [2]
//! divisor = 1000000
//! load_type = "Generation"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AssemblyError;
use crate::heat_pump::DerivedCop;
use crate::importer::{SeriesImport, DEFAULT_SKIP_ROWS};
use crate::merge::MergeRule;
use crate::registry::SemanticType;
use crate::sampler::{Jitter, MissingProfilePolicy, PartialDayPolicy, SamplerOptions};
use crate::schema::calendar;
use crate::time_axis::TimeAxis;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub calendar: CalendarConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub profiles: Option<ProfileConfig>,
    #[serde(default)]
    pub imports: Vec<ImportConfig>,
    #[serde(default)]
    pub merges: Vec<MergeStage>,
    #[serde(default)]
    pub derived_cop: Vec<DerivedCop>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalendarConfig {
    pub start_date: String,
    pub sec_interval: i64,
    pub steps_per_day: usize,
    pub nb_steps: usize,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            start_date: calendar::START_DATE.to_string(),
            sec_interval: calendar::SEC_INTERVAL,
            steps_per_day: calendar::STEPS_PER_DAY,
            nb_steps: calendar::NB_STEPS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    pub path: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_precision")]
    pub precision: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    pub shapes: PathBuf,
    pub reference: PathBuf,
    #[serde(default = "default_input_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_jitter")]
    pub jitter: [f64; 2],
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub missing_profile: MissingProfilePolicy,
    #[serde(default)]
    pub partial_day: PartialDayPolicy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportConfig {
    pub path: PathBuf,
    pub columns: Vec<String>,
    pub positions: Vec<usize>,
    pub divisor: f64,
    #[serde(default = "default_load_type")]
    pub load_type: SemanticType,
    #[serde(default = "default_units")]
    pub units: String,
    #[serde(default = "default_skip_rows")]
    pub skip_rows: usize,
    #[serde(default = "default_input_delimiter")]
    pub delimiter: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeStage {
    #[serde(default = "default_drop_originals")]
    pub drop_originals: bool,
    pub rules: Vec<MergeRule>,
}

fn default_delimiter() -> String {
    ";".to_string()
}

fn default_input_delimiter() -> String {
    ",".to_string()
}

fn default_precision() -> usize {
    crate::header::DEFAULT_PRECISION
}

fn default_jitter() -> [f64; 2] {
    [1.0, 1.0]
}

fn default_load_type() -> SemanticType {
    SemanticType::Load
}

fn default_units() -> String {
    "MW".to_string()
}

fn default_skip_rows() -> usize {
    DEFAULT_SKIP_ROWS
}

fn default_drop_originals() -> bool {
    true
}

impl RunConfig {
    /// Parse a TOML file; relative paths inside it resolve against its directory.
    pub fn load(path: &Path) -> Result<Self, AssemblyError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AssemblyError::config_load(path, e.to_string()))?;
        let mut config: RunConfig = toml::from_str(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, AssemblyError> {
        Ok(toml::from_str(text)?)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.output.path);
        if let Some(profiles) = self.profiles.as_mut() {
            resolve(&mut profiles.shapes);
            resolve(&mut profiles.reference);
        }
        for import in &mut self.imports {
            resolve(&mut import.path);
        }
        for cop in &mut self.derived_cop {
            resolve(&mut cop.weather);
        }
    }

    pub fn time_axis(&self) -> Result<TimeAxis, AssemblyError> {
        let c = &self.calendar;
        TimeAxis::new(&c.start_date, c.sec_interval, c.steps_per_day, c.nb_steps)
    }

    pub fn output_delimiter(&self) -> Result<u8, AssemblyError> {
        let delimiter = single_byte(&self.output.delimiter, "output.delimiter")?;
        crate::header::check_delimiter(delimiter)?;
        Ok(delimiter)
    }
}

impl ProfileConfig {
    pub fn sampler_options(&self) -> Result<SamplerOptions, AssemblyError> {
        Ok(SamplerOptions {
            jitter: Jitter::new(self.jitter[0], self.jitter[1])?,
            missing_profile: self.missing_profile,
            partial_day: self.partial_day,
        })
    }

    pub fn input_delimiter(&self) -> Result<u8, AssemblyError> {
        single_byte(&self.delimiter, "profiles.delimiter")
    }
}

impl ImportConfig {
    pub fn to_import(&self) -> Result<SeriesImport, AssemblyError> {
        Ok(SeriesImport::new(
            self.path.clone(),
            self.columns.clone(),
            self.positions.clone(),
            self.divisor,
        )
        .with_semantic_type(self.load_type.clone())
        .with_unit(self.units.clone())
        .with_skip_rows(self.skip_rows)
        .with_separator(single_byte(&self.delimiter, "imports.delimiter")?))
    }
}

fn single_byte(value: &str, field: &str) -> Result<u8, AssemblyError> {
    match value.as_bytes() {
        [b] => Ok(*b),
        _ => Err(AssemblyError::Config(format!(
            "{field} must be a single byte, got '{value}'"
        ))),
    }
}
