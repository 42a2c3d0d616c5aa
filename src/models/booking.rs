use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::session::{FinishedIntake, PhoneNumber};

/// A confirmed appointment as persisted once the caller says "confirm".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub call_sid: String,
    pub patient_name: String,
    pub reason: String,
    pub date_time: NaiveDateTime,
    pub date_of_birth: NaiveDate,
    pub phone: PhoneNumber,
    pub duration_minutes: i32,
    pub created_at: NaiveDateTime,
}

impl Booking {
    pub fn from_intake(call_sid: &str, intake: FinishedIntake) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            call_sid: call_sid.to_string(),
            patient_name: intake.full_name,
            reason: intake.reason,
            date_time: intake.appointment_time,
            date_of_birth: intake.date_of_birth,
            phone: intake.phone,
            duration_minutes: 60,
            created_at: now,
        }
    }
}
