//! Listing-file error types.

use std::path::PathBuf;

use gw_core::{BcType, CoreError, Reach2dId, ReachId, Snapshot, StressPeriod};

pub type ListingResult<T> = Result<T, ListingError>;

/// Coarse classification so callers can tell a bad input file from a stale
/// or mismatched lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A line or side-channel file does not have the expected shape.
    Malformed,
    /// Inputs are individually well formed but disagree with each other.
    Consistency,
    /// The file system refused a read.
    Io,
}

#[derive(thiserror::Error, Debug)]
pub enum ListingError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load reach lookup {path}: {reason}")]
    LookupLoad { path: PathBuf, reason: String },

    #[error("Malformed {field} at line {line_no} ({context}): '{line}'")]
    InvalidField {
        field: &'static str,
        context: String,
        line_no: usize,
        line: String,
    },

    #[error("Reached end of file while reading {what}")]
    UnexpectedEof { what: String },

    #[error(
        "{bc_type} record numbered {found} at line {line_no} is out of sequence in the {snapshot} block (expected {expected})"
    )]
    SequenceMismatch {
        bc_type: BcType,
        snapshot: Snapshot,
        expected: usize,
        found: usize,
        line_no: usize,
    },

    #[error("Reach lookup has no {bc_type} sequence for stress period {stress_period}")]
    MissingLookupSequence {
        bc_type: BcType,
        stress_period: StressPeriod,
    },

    #[error(
        "Reach lookup lists {len} {bc_type} reaches for stress period {stress_period} but the listing has record #{ordinal}"
    )]
    LookupTooShort {
        bc_type: BcType,
        stress_period: StressPeriod,
        ordinal: usize,
        len: usize,
    },

    #[error(
        "Reach lookup lists {expected} {bc_type} reaches but the {snapshot} block has {found} records"
    )]
    LookupLengthMismatch {
        bc_type: BcType,
        snapshot: Snapshot,
        expected: usize,
        found: usize,
    },

    #[error("Stable reach id {reach_id} appears twice in the {bc_type} sequence for stress period {stress_period}")]
    DuplicateStableId {
        bc_type: BcType,
        stress_period: StressPeriod,
        reach_id: ReachId,
    },

    #[error("2D reach id {reach_2d} has no {bc_type} members for stress period {stress_period}")]
    Missing2dId {
        bc_type: BcType,
        stress_period: StressPeriod,
        reach_2d: Reach2dId,
    },

    #[error(
        "2D reach id {reach_2d} maps to {bc_type} reach {reach_id}, which is not in the stress period {stress_period} sequence"
    )]
    Dangling3dId {
        bc_type: BcType,
        stress_period: StressPeriod,
        reach_2d: Reach2dId,
        reach_id: ReachId,
    },

    #[error("Reach lookup has no stress period {source_period} data for {bc_type}")]
    MissingSourcePeriod {
        bc_type: BcType,
        source_period: StressPeriod,
    },

    #[error("Duplicate flux record for {bc_type} reach {reach_id} at {snapshot}")]
    DuplicateFluxRecord {
        bc_type: BcType,
        reach_id: ReachId,
        snapshot: Snapshot,
    },

    #[error("Listing file has no volumetric budget for {snapshot}")]
    MissingBudgetSnapshot { snapshot: Snapshot },

    #[error(
        "Budget categories differ between {t1} and {t2}: only in {t1}: {only_in_first:?}; only in {t2}: {only_in_second:?}"
    )]
    ActiveTermMismatch {
        t1: Snapshot,
        t2: Snapshot,
        only_in_first: Vec<String>,
        only_in_second: Vec<String>,
    },

    #[error("Budget item '{category}' ({direction}) missing at {snapshot}")]
    MissingBudgetItem {
        snapshot: Snapshot,
        direction: &'static str,
        category: String,
    },

    #[error("Normalization category '{category}' missing from the {t1} -> {t2} budget difference")]
    MissingNormalizationCategory {
        category: String,
        t1: Snapshot,
        t2: Snapshot,
    },

    #[error("Invalid value: {0}")]
    Core(#[from] CoreError),
}

impl ListingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ListingError::Io { .. } => ErrorKind::Io,
            ListingError::LookupLoad { .. }
            | ListingError::InvalidField { .. }
            | ListingError::UnexpectedEof { .. }
            | ListingError::SequenceMismatch { .. }
            | ListingError::Core(_) => ErrorKind::Malformed,
            ListingError::MissingLookupSequence { .. }
            | ListingError::LookupTooShort { .. }
            | ListingError::LookupLengthMismatch { .. }
            | ListingError::DuplicateStableId { .. }
            | ListingError::Missing2dId { .. }
            | ListingError::Dangling3dId { .. }
            | ListingError::MissingSourcePeriod { .. }
            | ListingError::DuplicateFluxRecord { .. }
            | ListingError::MissingBudgetSnapshot { .. }
            | ListingError::ActiveTermMismatch { .. }
            | ListingError::MissingBudgetItem { .. }
            | ListingError::MissingNormalizationCategory { .. } => ErrorKind::Consistency,
        }
    }

    pub fn is_consistency(&self) -> bool {
        self.kind() == ErrorKind::Consistency
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ListingError::Io {
            path: path.into(),
            source,
        }
    }
}
