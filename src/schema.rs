/// Column-name and header-token constants for the PERSEE series layout.
/// Single source of truth for every literal the readers and writers share.

// ── Working table ───────────────────────────────────────────────────────────
pub mod table {
    pub const TIME: &str = "Time";
}

// ── Shape table columns ─────────────────────────────────────────────────────
pub mod shape {
    pub const NAME: &str = "Name";
    pub const MAX_POWER: &str = "Max Power";
    pub const PROFILE: &str = "Profile";
    pub const LOAD_TYPE: &str = "Load Type";
    pub const UNITS: &str = "Units";

    pub const ALL: [&str; 5] = [NAME, MAX_POWER, PROFILE, LOAD_TYPE, UNITS];
}

// ── Header block tokens ─────────────────────────────────────────────────────
pub mod header {
    pub const TIME_UNIT: &str = "s";
    pub const FLAG: &str = "true";
    pub const ROWS: usize = 4;
}

// ── Semantic types ──────────────────────────────────────────────────────────
pub mod semantic {
    pub const LOAD: &str = "load";
    pub const GENERATION: &str = "generation";
    pub const MASSFLOW: &str = "massflow";
    pub const TEMPERATURE: &str = "temperature";
    pub const DERIVED: &str = "derived";
}

// ── Weather export columns ──────────────────────────────────────────────────
pub mod weather {
    pub const TIME: &str = "time";
    pub const T2M: &str = "t2m";
    pub const COMMENT_PREFIX: &str = "#";
}

// ── Results PLAN columns ────────────────────────────────────────────────────
pub mod plan {
    pub const MODEL: &str = "Model";
    pub const INDICATOR: &str = "Indicator";
    pub const VALUE: &str = "Value";
    pub const SUBOBJECTIVE: &str = "Subobjective";
}

// ── Calendar defaults ───────────────────────────────────────────────────────
pub mod calendar {
    pub const START_DATE: &str = "2025-01-01 00:00";
    pub const START_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";
    pub const SEC_INTERVAL: i64 = 3600;
    pub const STEPS_PER_DAY: usize = 24;
    pub const NB_STEPS: usize = 8760;
}
