//! daoweave Core
//!
//! Configuration, generation planning and the batch driver.
//!
//! - [`WeaveConfig`]: `daoweave.toml` with defaults for every field
//! - [`GenerationPlanner`]: decides which members each entity needs
//! - [`BatchDriver`]: discover, extract, reconcile and write
//! - [`BatchReport`]: per-file outcomes and the `@Keep` summary
//!
//! # Example
//!
//! ```rust,no_run
//! use daoweave_core::{BatchDriver, WeaveConfig};
//!
//! let config = WeaveConfig::new().with_source_dirs(["src/main/java".into()]);
//! let report = BatchDriver::new(config).run().unwrap();
//! print!("{}", report.render_text());
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod batch;
pub mod config;
pub mod error;
pub mod planner;
pub mod report;

pub use batch::{reconcile_source, BatchDriver};
pub use config::{SchemaOptions, WeaveConfig, CONFIG_FILE, DEFAULT_SCHEMA};
pub use error::{WeaveError, WeaveResult};
pub use planner::{EntityIndex, GenerationPlanner, Reconciled, DAO_EXCEPTION_IMPORT, GENERATED_IMPORT};
pub use report::{BatchReport, FileOutcome, FileReport};

/// Commonly used items
pub mod prelude {
    pub use crate::{BatchDriver, BatchReport, FileOutcome, WeaveConfig, WeaveError, WeaveResult};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
