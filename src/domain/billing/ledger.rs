//! Webhook event ledger entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, Timestamp, ValidationError};

/// Processing state of a ledger entry.
///
/// Created as `Processing` at admission; moves exactly once to either
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(ProcessingStatus::Processing),
            "completed" => Ok(ProcessingStatus::Completed),
            "failed" => Ok(ProcessingStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "processing_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl StateMachine for ProcessingStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        matches!(
            (self, target),
            (ProcessingStatus::Processing, ProcessingStatus::Completed)
                | (ProcessingStatus::Processing, ProcessingStatus::Failed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        match self {
            ProcessingStatus::Processing => {
                vec![ProcessingStatus::Completed, ProcessingStatus::Failed]
            }
            ProcessingStatus::Completed | ProcessingStatus::Failed => vec![],
        }
    }
}

/// One received webhook, keyed by the provider's event id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub provider_event_id: String,
    pub event_type: String,
    pub raw_payload: Value,
    pub received_at: Timestamp,
    pub processing_status: ProcessingStatus,
    pub processed_at: Option<Timestamp>,
    pub error_message: Option<String>,
}

impl LedgerEntry {
    /// A freshly admitted entry.
    pub fn admitted(
        provider_event_id: impl Into<String>,
        event_type: impl Into<String>,
        raw_payload: Value,
        received_at: Timestamp,
    ) -> Self {
        Self {
            provider_event_id: provider_event_id.into(),
            event_type: event_type.into(),
            raw_payload,
            received_at,
            processing_status: ProcessingStatus::Processing,
            processed_at: None,
            error_message: None,
        }
    }

    /// Moves to `Completed`.
    pub fn complete(&mut self, at: Timestamp) -> Result<(), ValidationError> {
        self.processing_status = self
            .processing_status
            .transition_to(ProcessingStatus::Completed)?;
        self.processed_at = Some(at);
        Ok(())
    }

    /// Moves to `Failed`, recording why.
    pub fn fail(&mut self, at: Timestamp, error: impl Into<String>) -> Result<(), ValidationError> {
        self.processing_status = self
            .processing_status
            .transition_to(ProcessingStatus::Failed)?;
        self.processed_at = Some(at);
        self.error_message = Some(error.into());
        Ok(())
    }
}
