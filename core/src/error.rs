use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScreenError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Applicant {applicant_id} not found")]
    ApplicantNotFound { applicant_id: i64 },

    #[error("Fraud rule '{code}' not found")]
    RuleNotFound { code: String },

    #[error("Registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("Registry lookup timed out after {timeout_ms}ms")]
    RegistryTimeout { timeout_ms: u64 },

    #[error("Screening worker failed: {0}")]
    WorkerFailed(String),

    #[error("Store lock poisoned")]
    StorePoisoned,

    #[error("Invalid value '{value}' for {field}")]
    InvalidValue { field: &'static str, value: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ScreenResult<T> = Result<T, ScreenError>;

/// How a fault is treated by the screening pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The applicant or rule does not exist. Ends that lookup only.
    NotFound,
    /// A data source could not be reached in time.
    UpstreamFault,
    /// Anything else escaping an aggregator.
    IrrecoverableFault,
}

impl ScreenError {
    pub fn fault_kind(&self) -> FaultKind {
        match self {
            Self::ApplicantNotFound { .. } | Self::RuleNotFound { .. } => FaultKind::NotFound,
            Self::RegistryUnavailable(_) | Self::RegistryTimeout { .. } => FaultKind::UpstreamFault,
            Self::Database(e) if is_busy(e) => FaultKind::UpstreamFault,
            _ => FaultKind::IrrecoverableFault,
        }
    }

    /// Whether a registry call that failed with this error may be attempted again.
    pub fn is_transient(&self) -> bool {
        self.fault_kind() == FaultKind::UpstreamFault
    }
}

fn is_busy(e: &rusqlite::Error) -> bool {
    matches!(
        e.sqlite_error_code(),
        Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked)
    )
}
