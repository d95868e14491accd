//! Assembles the hourly PERSEE input series: synthetic load profiles,
//! imported renewable and demand series, merged and derived columns, written
//! under the four-row descriptive header the optimizer expects.

pub mod assembly;
pub mod config;
pub mod error;
pub mod header;
pub mod heat_pump;
pub mod importer;
mod io;
pub mod merge;
pub mod registry;
pub mod sampler;
pub mod schema;
pub mod sensitivity;
pub mod table;
pub mod time_axis;

pub use assembly::{assemble, run};
pub use config::RunConfig;
pub use error::AssemblyError;
pub use header::{parse_document, PerseeDocument};
pub use registry::{ColumnMeta, ColumnRegistry, SemanticType};
pub use table::{Assembly, WorkingTable};
pub use time_axis::TimeAxis;
