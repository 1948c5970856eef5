use core::fmt;

/// Result alias for `multidendro`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by matrix construction and clustering.
///
/// Everything here is detected eagerly, at matrix construction or at the
/// start of [`build`](crate::AgglomerativeClustering::build): clustering is
/// a total function of its validated inputs and either fully succeeds or
/// fails before any merge round executes. NaN results from ill-conditioned
/// quality measures (e.g. a zero-variance cophenetic correlation) are
/// defined *outputs*, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Proximity matrix has no rows.
    EmptyMatrix,

    /// Input rows do not form a square matrix.
    NotSquare {
        /// Offending row index.
        row: usize,
        /// Expected row length.
        expected: usize,
        /// Actual row length.
        found: usize,
    },

    /// Mirrored entries disagree.
    Asymmetric {
        /// Row of the offending entry.
        row: usize,
        /// Column of the offending entry.
        col: usize,
    },

    /// An off-diagonal proximity is NaN or infinite.
    NonFiniteProximity {
        /// Row of the offending entry.
        row: usize,
        /// Column of the offending entry.
        col: usize,
    },

    /// Label count does not match the matrix size.
    LabelMismatch {
        /// Number of labels supplied.
        labels: usize,
        /// Number of matrix rows.
        rows: usize,
    },

    /// Requested decimal precision exceeds what f64 can express.
    InvalidPrecision {
        /// Requested number of decimal digits.
        requested: u32,
        /// Largest supported number of decimal digits.
        maximum: u32,
    },

    /// Linkage method is not defined for the requested proximity polarity.
    IncompatibleMethod {
        /// Name of the rejected linkage method.
        method: &'static str,
    },

    /// A linkage recurrence produced a non-finite aggregate.
    DegenerateAggregate {
        /// Name of the linkage method that degenerated.
        method: &'static str,
    },

    /// Invalid parameter value.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyMatrix => write!(f, "proximity matrix has no rows"),
            Error::NotSquare {
                row,
                expected,
                found,
            } => {
                write!(
                    f,
                    "matrix is not square: row {row} has {found} entries, expected {expected}"
                )
            }
            Error::Asymmetric { row, col } => {
                write!(f, "matrix entries ({row},{col}) and ({col},{row}) disagree")
            }
            Error::NonFiniteProximity { row, col } => {
                write!(f, "proximity ({row},{col}) is not finite")
            }
            Error::LabelMismatch { labels, rows } => {
                write!(f, "{labels} labels supplied for a {rows}-row matrix")
            }
            Error::InvalidPrecision { requested, maximum } => {
                write!(
                    f,
                    "precision of {requested} decimals exceeds the supported maximum of {maximum}"
                )
            }
            Error::IncompatibleMethod { method } => {
                write!(f, "{method} linkage requires distance-based proximities")
            }
            Error::DegenerateAggregate { method } => {
                write!(f, "{method} linkage produced a non-finite proximity")
            }
            Error::InvalidParameter { name, message } => {
                write!(f, "invalid parameter '{name}': {message}")
            }
        }
    }
}

impl std::error::Error for Error {}
