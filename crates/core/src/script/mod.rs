//! Migration scripts: model, directory discovery, statement splitting and scaffolding.

pub mod discovery;
pub mod error;
pub mod scaffold;
pub mod statements;
pub mod types;

pub use discovery::{discover, normalize_location, parse_file_name};
pub use error::{DiscoveryError, ScaffoldError};
pub use scaffold::{ScaffoldPlan, plan_next, slugify, write_plan};
pub use statements::split_statements;
pub use types::{Direction, MigrationScript, MigrationSet, NO_TRANSACTION_DIRECTIVE, ScriptPair};
