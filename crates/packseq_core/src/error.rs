use crate::compat::*;

/// Main error type for packseq_core.
///
/// Every variant represents a broken caller contract rather than a runtime
/// condition: given masks with consistent lengths that respect the reduce
/// and expand preconditions, no operation in this crate can fail.
#[derive(Clone, PartialEq, Eq)]
pub enum PackSeqError {
    // ===== Mask Errors =====
    /// Presence masks have different lengths where equal lengths are required.
    PresentLengthMismatch { expected: usize, got: usize },
    /// Reduce was asked to keep a slot that is absent in the source batch.
    CannotReAddSequences { slot: usize },
    /// Expand was given a mask that is not a superset of the source mask.
    ExpandNotSuperset { slot: usize },

    // ===== Batch Errors =====
    /// The packed vector length is not a multiple of the number of present slots.
    InvalidPackedLength { len: usize, num_present: usize },
    /// The operation requires at least one present slot in the batch.
    EmptyBatch,

    // ===== Propagation Errors =====
    /// The upstream gradient list does not have one batch per output timestep.
    UpstreamLengthMismatch { expected: usize, got: usize },
    /// An upstream gradient batch's mask differs from the output mask at that timestep.
    UpstreamMaskMismatch { timestep: usize },

    // ===== Vector Errors =====
    /// Two vectors have different lengths where equal lengths are required.
    SizeMismatch { expected: usize, got: usize },
}

impl fmt::Display for PackSeqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Mask Errors
            Self::PresentLengthMismatch { expected, got } => {
                write!(f, "present mask length mismatch: expected {}, got {}", expected, got)
            },
            Self::CannotReAddSequences { slot } => {
                write!(f, "cannot re-add sequences: slot {} is absent in the source batch", slot)
            },
            Self::ExpandNotSuperset { slot } => {
                write!(f, "argument to expand must be a superset: slot {} would be dropped", slot)
            },

            // Batch Errors
            Self::InvalidPackedLength { len, num_present } => {
                write!(
                    f,
                    "invalid packed length: {} elements across {} present slots",
                    len, num_present
                )
            },
            Self::EmptyBatch => {
                write!(f, "batch has no present slots")
            },

            // Propagation Errors
            Self::UpstreamLengthMismatch { expected, got } => {
                write!(f, "upstream batch count mismatch: expected {}, got {}", expected, got)
            },
            Self::UpstreamMaskMismatch { timestep } => {
                write!(f, "upstream mask differs from output mask at timestep {}", timestep)
            },

            // Vector Errors
            Self::SizeMismatch { expected, got } => {
                write!(f, "size mismatch: expected {}, got {}", expected, got)
            },
        }
    }
}

impl fmt::Debug for PackSeqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PackSeqError {}

/// Result type alias for packseq_core operations.
pub type PackSeqResult<T> = Result<T, PackSeqError>;
