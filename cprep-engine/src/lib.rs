//! The preprocessing engine: macro table (C3), expansion rewriter (C4),
//! conditional state machine (C5) and the directive dispatcher / engine loop
//! (C6) that drives a pass over an [`cprep_foundation::source::InputStream`]
//! to completion.
//!
//! [`Engine`] is the single entry point: construct one with a root input
//! stream and an [`IncludeResolver`], call [`Engine::process`], and collect
//! the expanded output string plus whatever diagnostics were emitted along
//! the way.

pub mod conditional;
pub mod engine;
pub mod expand;
pub mod macros;

pub use conditional::{ConditionalError, ConditionalFrame, ConditionalStack};
pub use engine::{Engine, IncludeResolver, NoIncludes};
pub use macros::{Definition, MacroKind, MacroTable};
