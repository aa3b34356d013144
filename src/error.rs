use std::fmt;

/// Recoverable failures surfaced at the public API boundary (spec §7).
///
/// Panics raised by a host-supplied `f`/`g` are a separate, unrecoverable-by-
/// the-engine category and are propagated as panics rather than represented
/// here (see [`crate::runtime::Runtime::read_expression`] and friends).
#[derive(Debug)]
pub enum RuntimeError {
    /// A handle referred to a slot that has since been released and,
    /// possibly, reused by a different node.
    StaleHandle,
    /// An expression tried to read itself while its own tracking frame was
    /// still on the stack, and it has never completed a successful
    /// evaluation to fall back on.
    CyclicReadNotYetComputed,
    /// `flush()` exceeded the configured iteration ceiling without reaching
    /// a fixed point (see `RuntimeConfig::max_flush_iterations`).
    FlushDidNotConverge { iterations: u32 },
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::StaleHandle => {
                write!(f, "handle refers to a node that has been released")
            }
            RuntimeError::CyclicReadNotYetComputed => write!(
                f,
                "expression read itself while evaluating and has no previous cached value"
            ),
            RuntimeError::FlushDidNotConverge { iterations } => write!(
                f,
                "flush() did not converge after {} iterations",
                iterations
            ),
        }
    }
}

impl std::error::Error for RuntimeError {}
