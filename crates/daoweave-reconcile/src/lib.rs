//! daoweave Reconciliation
//!
//! Brings the generated members of one entity source in line with what the
//! generator asks for, without touching anything the developer owns.
//!
//! # Core Concepts
//!
//! - [`ReconcileSession`]: define calls, then one [`ReconcileSession::commit`]
//! - [`Decision`]: what a define call did with the existing member
//! - [`ReconcileError`]: ownership conflicts and edit failures
//!
//! Members marked `@Keep` are never modified. Unmarked members with the
//! identity of a generated member are a conflict. `@Generated` members the
//! generator no longer asks for are removed on commit.

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod error;
mod session;

pub use error::{ReconcileError, ReconcileResult};
pub use session::{Decision, ReconcileSession};

/// Commonly used items
pub mod prelude {
    pub use crate::{Decision, ReconcileError, ReconcileResult, ReconcileSession};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
