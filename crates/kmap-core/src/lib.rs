pub mod hierarchy;
pub mod id;
pub mod lint;
pub mod model;
pub mod record;

pub use hierarchy::{ancestors, descendant_ids, descendants, would_create_cycle};
pub use id::ElementId;
pub use lint::{LintDiagnostic, lint_snapshot};
pub use model::*;
