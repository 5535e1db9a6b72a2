use std::path::PathBuf;

use gw_core::{BcType, CoreError, GagedReachId, ReachId, Snapshot, StationId};
use gw_listing::{ErrorKind, ListingError};

pub type ReachResult<T> = Result<T, ReachError>;

#[derive(thiserror::Error, Debug)]
pub enum ReachError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed gaged-reach definition at {path}:{line_no}: {reason}")]
    Definition {
        path: PathBuf,
        line_no: usize,
        reason: String,
    },

    #[error("Malformed upstream network row at {path}:{line_no}: {reason}")]
    Network {
        path: PathBuf,
        line_no: usize,
        reason: String,
    },

    #[error("Malformed station flux report at {path}:{line_no}: {reason}")]
    Report {
        path: PathBuf,
        line_no: usize,
        reason: String,
    },

    #[error("Malformed withdrawal file {path}: {reason}")]
    Withdrawal { path: PathBuf, reason: String },

    #[error("Station {station} is listed more than once")]
    DuplicateStation { station: StationId },

    #[error(
        "Gaged reach {gaged_reach} references {bc_type} reach {reach_id}, which has no flux at {snapshot}"
    )]
    MissingFlux {
        gaged_reach: GagedReachId,
        bc_type: BcType,
        reach_id: ReachId,
        snapshot: Snapshot,
    },

    #[error("Station {downstream} lists upstream station {station}, which is not in the flux report")]
    MissingStation {
        downstream: StationId,
        station: StationId,
    },

    #[error("Station flux report has no '{field}' column")]
    MissingReportField { field: String },

    #[error(transparent)]
    Lookup(#[from] ListingError),

    #[error("Invalid value: {0}")]
    Core(#[from] CoreError),
}

impl ReachError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReachError::Io { .. } => ErrorKind::Io,
            ReachError::Definition { .. }
            | ReachError::Network { .. }
            | ReachError::Report { .. }
            | ReachError::Withdrawal { .. }
            | ReachError::DuplicateStation { .. }
            | ReachError::Core(_) => ErrorKind::Malformed,
            ReachError::MissingFlux { .. }
            | ReachError::MissingStation { .. }
            | ReachError::MissingReportField { .. } => ErrorKind::Consistency,
            ReachError::Lookup(inner) => inner.kind(),
        }
    }

    pub fn is_consistency(&self) -> bool {
        self.kind() == ErrorKind::Consistency
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReachError::Io {
            path: path.into(),
            source,
        }
    }
}
