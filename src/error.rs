//! Error types for simulator construction and configuration
//!
//! Only construction and validation go through [`MemoryError`]. Runtime
//! operations (allocation, deallocation, memory access) report failure
//! through their result structs and booleans so a rejected request never
//! unwinds the simulator.

use thiserror::Error;

use crate::types::Size;

/// Result type for fallible construction and configuration.
pub type Result<T> = std::result::Result<T, MemoryError>;

/// Errors raised while building or reconfiguring the simulator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// A size parameter that must be positive was zero.
    #[error("{what} must be positive")]
    ZeroSize {
        /// Which parameter was zero.
        what: &'static str,
    },

    /// The buddy allocator needs a power-of-two domain.
    #[error("buddy domain of {size} bytes is not a power of two")]
    NotPowerOfTwo {
        /// Offending size.
        size: Size,
    },

    /// A size must divide another evenly (memory by page size, cache size
    /// by line size times associativity).
    #[error("{what}: {dividend} is not divisible by {divisor}")]
    NotDivisible {
        /// What was being divided.
        what: &'static str,
        /// The quantity being split.
        dividend: Size,
        /// The required divisor.
        divisor: Size,
    },

    /// A configuration field failed validation.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Human-readable description.
        message: String,
    },

    /// A CLI keyword did not match any known variant.
    #[error("unknown {what} '{token}'")]
    UnknownKeyword {
        /// The option family being parsed.
        what: &'static str,
        /// The rejected token.
        token: String,
    },
}

impl MemoryError {
    /// A zero where a positive size was required.
    pub fn zero_size(what: &'static str) -> Self {
        Self::ZeroSize { what }
    }

    /// A buddy domain that is not a power of two.
    pub fn not_power_of_two(size: Size) -> Self {
        Self::NotPowerOfTwo { size }
    }

    /// A divisibility constraint violation.
    pub fn not_divisible(what: &'static str, dividend: Size, divisor: Size) -> Self {
        Self::NotDivisible { what, dividend, divisor }
    }

    /// A configuration error with a free-form message.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig { message: message.into() }
    }

    /// An unrecognized CLI keyword.
    pub fn unknown_keyword(what: &'static str, token: impl Into<String>) -> Self {
        Self::UnknownKeyword { what, token: token.into() }
    }
}
