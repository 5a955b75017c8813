//! # code-covered: coverage gaps to test suggestions
//!
//! Given a coverage report and the Python sources it describes, the engine
//! finds every uncovered region, attributes it to the construct it belongs to
//! (exception handler, raise, branch, loop, function body or module-level
//! code), ranks it by risk, and writes a pytest skeleton for it.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    API Layer (GapEngine)                   │
//! ├────────────────────────────────────────────────────────────┤
//! │  Core          │  Detectors        │  Language  │  I/O     │
//! │ • Config       │ • Report adapter  │ • Python   │ • Text   │
//! │ • Errors       │ • Blocks / gaps   │            │ • JSON   │
//! │                │ • Priority, hints │            │ • pytest │
//! │                │ • Templates       │            │          │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use code_covered::{find_gaps, RootResolver};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let report: serde_json::Value =
//!         serde_json::from_str(&std::fs::read_to_string("coverage.json")?)?;
//!     let analysis = find_gaps(&report, &RootResolver::new("."))?;
//!
//!     for suggestion in &analysis.suggestions {
//!         println!("{} {}", suggestion.priority, suggestion.test_name);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "mimalloc")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

// Configuration and error handling
pub mod core {
    //! Configuration and error types.

    pub mod config;
    pub mod errors;
}

// Coverage gap detection
pub mod detectors {
    //! Coverage gap detection.

    pub mod coverage;
}

// Language-specific parsing
pub mod lang {
    //! Language-specific parsing.

    pub mod python;
}

// Rendering
pub mod io {
    //! Rendering of analysis results.

    pub mod reports;
}

// Public API and engine interface
pub mod api {
    //! High-level API and engine interface.

    pub mod engine;
    pub mod results;
}

// Re-export primary types for convenience
pub use api::engine::{find_gaps, GapEngine, RootResolver, SourceResolver};
pub use api::results::{GapAnalysis, GapSummary};
pub use core::config::CoveredConfig;
pub use core::errors::{CoveredError, Result};
pub use detectors::coverage::{
    BlockType, CoverageReport, FileCoverage, Gap, Priority, Suggestion, Warning,
};
pub use tokio_util::sync::CancellationToken;

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
