// Error types for the android sink library
//
// This module defines the sink error type with numeric error codes suitable
// for reporting across the JNI boundary.

mod sink;

pub use sink::{log_sink_error, SinkError, SinkErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the JNI boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
