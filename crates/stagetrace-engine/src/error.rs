//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup and the simulation
//! thread so `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: stagetrace_core::config::ConfigError,
    },

    /// The stage tree rejected an operation.
    #[error("stage tree error: {source}")]
    Tree {
        /// The underlying tree error.
        #[from]
        source: stagetrace_core::TreeError,
    },

    /// A breakpoint could not interpret an event.
    #[error("breakpoint error: {source}")]
    Breakpoint {
        /// The underlying match error.
        #[from]
        source: stagetrace_breakpoints::BreakpointMatchError,
    },

    /// Reading controller input failed.
    #[error("stdin error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The simulation thread could not be started or did not exit cleanly.
    #[error("simulation thread error: {message}")]
    Simulation {
        /// Description of the failure.
        message: String,
    },
}
