use chrono::NaiveDateTime;

use crate::error::AssemblyError;
use crate::schema::calendar;

/// Fixed calendar axis shared by every column of a run.
///
/// Position `i` holds `(i + 1) * sec_interval` seconds after `start_date`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    start_date: String,
    sec_interval: i64,
    steps_per_day: usize,
    nb_steps: usize,
}

impl Default for TimeAxis {
    fn default() -> Self {
        Self {
            start_date: calendar::START_DATE.to_string(),
            sec_interval: calendar::SEC_INTERVAL,
            steps_per_day: calendar::STEPS_PER_DAY,
            nb_steps: calendar::NB_STEPS,
        }
    }
}

impl TimeAxis {
    pub fn new(
        start_date: &str,
        sec_interval: i64,
        steps_per_day: usize,
        nb_steps: usize,
    ) -> Result<Self, AssemblyError> {
        NaiveDateTime::parse_from_str(start_date, calendar::START_DATE_FORMAT).map_err(|e| {
            AssemblyError::Config(format!(
                "start_date '{start_date}' does not match {}: {e}",
                calendar::START_DATE_FORMAT
            ))
        })?;
        if sec_interval <= 0 {
            return Err(AssemblyError::Config(format!(
                "sec_interval must be positive, got {sec_interval}"
            )));
        }
        if steps_per_day == 0 || nb_steps == 0 {
            return Err(AssemblyError::Config(
                "steps_per_day and nb_steps must be non-zero".into(),
            ));
        }
        Ok(Self {
            start_date: start_date.to_string(),
            sec_interval,
            steps_per_day,
            nb_steps,
        })
    }

    pub fn start_date(&self) -> &str {
        &self.start_date
    }

    pub fn sec_interval(&self) -> i64 {
        self.sec_interval
    }

    pub fn steps_per_day(&self) -> usize {
        self.steps_per_day
    }

    pub fn len(&self) -> usize {
        self.nb_steps
    }

    pub fn is_empty(&self) -> bool {
        self.nb_steps == 0
    }

    /// Number of whole days covered; a trailing partial day is not counted.
    pub fn whole_days(&self) -> usize {
        self.nb_steps / self.steps_per_day
    }

    pub fn has_partial_day(&self) -> bool {
        self.nb_steps % self.steps_per_day != 0
    }

    pub fn timestamps(&self) -> Vec<i64> {
        (0..self.nb_steps as i64)
            .map(|i| (i + 1) * self.sec_interval)
            .collect()
    }
}
