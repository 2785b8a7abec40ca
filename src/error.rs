//! Application error type.
//!
//! Every fallible operation returns `AppError`, which carries the process exit code
//! the binary should terminate with. Codes are grouped by failure class:
//!
//! - [`EXIT_IO`]: configuration, filesystem and serialization failures
//! - [`EXIT_INSUFFICIENT_HISTORY`]: not enough yields to build a single training window
//! - [`EXIT_DATA`]: invalid price data or a failed fetch with no fallback allowed

/// Configuration, filesystem or (de)serialization failure.
pub const EXIT_IO: u8 = 2;
/// The yield series is too short to produce any training window.
pub const EXIT_INSUFFICIENT_HISTORY: u8 = 3;
/// Price data is unusable (fetch failure in live-only mode, non-positive prices, ...).
pub const EXIT_DATA: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(EXIT_IO, message)
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::new(EXIT_DATA, message)
    }

    /// Raised before fitting when windowing produced zero examples.
    pub fn insufficient_history(yields: usize, seq_len: usize) -> Self {
        Self::new(
            EXIT_INSUFFICIENT_HISTORY,
            format!(
                "Insufficient history: {yields} yields cannot fill a window of {seq_len} plus a target \
                 (need at least {} yields, i.e. days > seq_len + 1).",
                seq_len + 1
            ),
        )
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_insufficient_history(&self) -> bool {
        self.exit_code == EXIT_INSUFFICIENT_HISTORY
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
