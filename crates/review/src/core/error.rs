use thiserror::Error;

/// Fatal input errors. Gateway and parse failures never reach this type;
/// they degrade to heuristic reviews inside the pipeline.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("invalid findings report: {0}")]
    InvalidReport(String),

    #[error("unsupported findings schema version: {0}")]
    UnsupportedSchema(String),

    #[error("unknown review depth: {0} (expected quick, standard, or deep)")]
    InvalidDepth(String),
}
