//! Dead-code-elimination analysis and stub synthesis.
//!
//! Scans a source tree for preprocessor-guarded references to
//! project-prefixed symbols, resolves each guard against the resolved
//! option store, and synthesizes stub definitions for symbols that are
//! unreachable in the current configuration yet still referenced from
//! reachable code.

mod analyze;
mod error;
mod expr;
mod stubs;
mod usage;

pub use analyze::{project_idents, DceAnalysis, Preprocessor};
pub use error::{DceError, Result};
pub use expr::{combine_defines, parse_expr, resolve_define, Expr};
pub use stubs::{find_declaration, render_stub_file, StubEntry};
pub use usage::{clean_define, find_usages, DceUsage, UsageScan, DCE_TAGS};
