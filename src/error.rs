//! Error taxonomy shared by both engines.

use std::fmt;

/// The stage of a run in which an error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SupplyResolution,
    DemandResolution,
    PointResolution,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::SupplyResolution => "supply resolution",
            Stage::DemandResolution => "demand resolution",
            Stage::PointResolution => "point resolution",
        };
        f.write_str(name)
    }
}

/// Fatal errors. Any of these aborts the whole run; no partial output is returned.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("point {point} has no usable coordinate ({stage})")]
    InvalidCoordinate { point: String, stage: Stage },

    #[error("point {point}: attribute '{attribute}' {reason} ({stage})")]
    InvalidAttribute {
        point: String,
        attribute: String,
        stage: Stage,
        reason: &'static str,
    },

    #[error("nearest neighbor query for point {point} returned {returned}, which is not a qualifying point")]
    InconsistentIndex { point: String, returned: String },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed allocation table at line {line}: {reason}")]
    MalformedTable { line: u64, reason: String },
}
