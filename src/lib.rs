//! sedmcp: regex-based text transformation engine
//!
//! The library holds the engine and its operation model. The binary at
//! src/main.rs adds a sed-expression command line and a JSON-RPC tool server.

pub mod cli;
pub mod config;
pub mod diff_formatter;
pub mod engine;
pub mod error;
pub mod expression;
pub mod logger;
pub mod operation;
pub mod outcome;
pub mod regex_error;
pub mod rpc;

// Re-export commonly used types for convenience
pub use engine::{Engine, RegexLimits};
pub use error::{BuildError, EngineError};
pub use operation::{Flags, Operation, OperationBuilder, OperationKind, Selector};
pub use outcome::OutcomeReport;
pub use regex_error::PatternError;
