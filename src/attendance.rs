use crate::db::{insert_if_absent, AttendanceRecord, Entity, Inserted, Store, StoreError, Student};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// What happened to one marking attempt. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "name", rename_all = "camelCase")]
pub enum MarkOutcome {
    NotEnrolled,
    /// Carries the name stored on the record that was already there.
    AlreadyMarked(String),
    MarkedNew(String),
}

impl MarkOutcome {
    pub fn message(&self, roll: &str) -> String {
        match self {
            MarkOutcome::NotEnrolled => format!("Roll {} is not enrolled", roll),
            MarkOutcome::AlreadyMarked(name) => format!("{} is already marked present today", name),
            MarkOutcome::MarkedNew(name) => format!("Attendance marked for {}", name),
        }
    }
}

pub struct AttendanceRecorder<'a> {
    store: &'a Store,
}

impl<'a> AttendanceRecorder<'a> {
    pub fn new(store: &'a Store) -> Self {
        AttendanceRecorder { store }
    }

    /// Mark `roll` present for today's local date.
    pub async fn mark_attendance(&self, roll: &str) -> Result<MarkOutcome, StoreError> {
        self.mark_attendance_at(roll, Local::now().naive_local()).await
    }

    /// Student lookup, duplicate check and insert all run in one transaction, so
    /// two calls racing for the same roll and day cannot both insert.
    pub async fn mark_attendance_at(
        &self,
        roll: &str,
        now: NaiveDateTime,
    ) -> Result<MarkOutcome, StoreError> {
        let roll = roll.trim().to_string();
        let date = now.format(DATE_FORMAT).to_string();
        let time = now.format(TIME_FORMAT).to_string();

        let key = roll.clone();
        let outcome = self
            .store
            .write_transaction(move |tx| {
                let Some(student) = Student::select_by_key(&key, tx)? else {
                    return Ok(MarkOutcome::NotEnrolled);
                };
                let record = AttendanceRecord::for_student(&student, date, time);
                Ok(match insert_if_absent(&record, tx)? {
                    Inserted::New(_) => MarkOutcome::MarkedNew(student.name),
                    Inserted::Existing(existing) => MarkOutcome::AlreadyMarked(existing.name),
                })
            })
            .await?;

        tracing::info!(roll = %roll, outcome = ?outcome, "attendance mark");
        Ok(outcome)
    }
}
