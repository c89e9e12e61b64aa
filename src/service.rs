//! Reconciling replies from the external enrollment/recognition service.
//!
//! The service itself is out of process; the host forwards its reply and we only
//! decide what, if anything, to write.

use crate::attendance::{AttendanceRecorder, MarkOutcome};
use crate::db::{Store, StoreError, Student};
use serde::{Deserialize, Serialize};

/// Reply shape of both the enroll and recognize calls.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub roll: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ServiceReply {
    fn message_or(&self, fallback: &str) -> String {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum EnrollOutcome {
    Enrolled { roll: String },
    Rejected { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RecognizeOutcome {
    NotRecognized { message: String },
    Recognized { roll: String, outcome: MarkOutcome },
}

/// Store `student` only if the service accepted the enrollment.
pub async fn enroll(
    store: &Store,
    student: Student,
    reply: &ServiceReply,
) -> Result<EnrollOutcome, StoreError> {
    if !reply.success {
        let message = reply.message_or("Enrollment failed");
        tracing::info!(roll = %student.roll, message = %message, "enrollment rejected");
        return Ok(EnrollOutcome::Rejected { message });
    }
    let roll = store.put(student).await?;
    tracing::info!(roll = %roll, "student enrolled");
    Ok(EnrollOutcome::Enrolled { roll })
}

/// Mark the recognized roll; a failed or empty reply never reaches the store.
pub async fn recognize(
    recorder: &AttendanceRecorder<'_>,
    reply: &ServiceReply,
) -> Result<RecognizeOutcome, StoreError> {
    let roll = reply
        .roll
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    let (true, Some(roll)) = (reply.success, roll) else {
        return Ok(RecognizeOutcome::NotRecognized {
            message: reply.message_or("No match found"),
        });
    };
    let outcome = recorder.mark_attendance(roll).await?;
    Ok(RecognizeOutcome::Recognized {
        roll: roll.to_string(),
        outcome,
    })
}
