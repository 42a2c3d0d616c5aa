use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// The five intake fields, in the order the dialog collects them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Reason,
    When,
    Dob,
    Phone,
}

impl Field {
    pub const ORDER: [Field; 5] = [
        Field::Name,
        Field::Reason,
        Field::When,
        Field::Dob,
        Field::Phone,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Reason => "reason",
            Field::When => "when",
            Field::Dob => "dob",
            Field::Phone => "phone",
        }
    }
}

/// Where the dialog currently is. Derived from the session contents so the
/// stage can never disagree with the filled fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Collecting(Field),
    Confirm,
    Done,
}

/// A validated phone number: canonical E.164 plus a digit-grouped form for
/// reading back over the voice channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhoneNumber {
    pub e164: String,
    pub spoken: String,
}

/// A parsed field value. Typed per field so a committed value never needs
/// re-parsing at booking time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Phone(PhoneNumber),
}

/// A parsed-but-unconfirmed value held until the caller says yes or no.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub field: Field,
    pub value: FieldValue,
    /// How the value is read back in the confirmation prompt.
    pub spoken: String,
}

/// Per-call intake state. Created on the first turn of a call, mutated turn
/// by turn, removed from the store once the booking is handed off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSession {
    pub call_sid: String,
    pub full_name: Option<String>,
    pub reason: Option<String>,
    pub appointment_time: Option<NaiveDateTime>,
    pub date_of_birth: Option<NaiveDate>,
    pub phone: Option<PhoneNumber>,
    pub pending: Option<Candidate>,
    /// Consecutive parse failures per still-unfilled field.
    pub retries: HashMap<Field, u32>,
    pub done: bool,
    pub last_activity: NaiveDateTime,
}

/// All five fields of a finished session, cloned out before the session is
/// reset so the caller of the engine can persist the booking.
#[derive(Debug, Clone)]
pub struct FinishedIntake {
    pub full_name: String,
    pub reason: String,
    pub appointment_time: NaiveDateTime,
    pub date_of_birth: NaiveDate,
    pub phone: PhoneNumber,
}

impl BookingSession {
    pub fn new(call_sid: &str) -> Self {
        Self {
            call_sid: call_sid.to_string(),
            full_name: None,
            reason: None,
            appointment_time: None,
            date_of_birth: None,
            phone: None,
            pending: None,
            retries: HashMap::new(),
            done: false,
            last_activity: Utc::now().naive_utc(),
        }
    }

    pub fn is_filled(&self, field: Field) -> bool {
        match field {
            Field::Name => self.full_name.is_some(),
            Field::Reason => self.reason.is_some(),
            Field::When => self.appointment_time.is_some(),
            Field::Dob => self.date_of_birth.is_some(),
            Field::Phone => self.phone.is_some(),
        }
    }

    /// First unfilled field in collection order.
    pub fn next_unfilled(&self) -> Option<Field> {
        Field::ORDER.iter().copied().find(|f| !self.is_filled(*f))
    }

    pub fn stage(&self) -> Stage {
        if self.done {
            Stage::Done
        } else {
            match self.next_unfilled() {
                Some(f) => Stage::Collecting(f),
                None => Stage::Confirm,
            }
        }
    }

    /// Commit a confirmed candidate into its field and drop its retry entry.
    /// Retry entries only exist for unfilled fields.
    pub fn commit(&mut self, candidate: Candidate) {
        match (candidate.field, candidate.value) {
            (Field::Name, FieldValue::Text(v)) => self.full_name = Some(v),
            (Field::Reason, FieldValue::Text(v)) => self.reason = Some(v),
            (Field::When, FieldValue::DateTime(v)) => self.appointment_time = Some(v),
            (Field::Dob, FieldValue::Date(v)) => self.date_of_birth = Some(v),
            (Field::Phone, FieldValue::Phone(v)) => self.phone = Some(v),
            // A candidate is only ever built by the parser for its own field,
            // so a type mismatch means a bug upstream; drop it rather than
            // store a wrong value.
            (field, value) => {
                tracing::error!(field = field.as_str(), ?value, "candidate type mismatch");
                return;
            }
        }
        self.retries.remove(&candidate.field);
    }

    /// Clear a filled field so the dialog re-collects it (CONFIRM correction).
    pub fn clear(&mut self, field: Field) {
        match field {
            Field::Name => self.full_name = None,
            Field::Reason => self.reason = None,
            Field::When => self.appointment_time = None,
            Field::Dob => self.date_of_birth = None,
            Field::Phone => self.phone = None,
        }
    }

    pub fn retry_count(&self, field: Field) -> u32 {
        self.retries.get(&field).copied().unwrap_or(0)
    }

    pub fn bump_retry(&mut self, field: Field) -> u32 {
        let count = self.retries.entry(field).or_insert(0);
        *count += 1;
        *count
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now().naive_utc();
    }

    /// Returns the completed intake once every field is filled.
    pub fn finished(&self) -> Option<FinishedIntake> {
        Some(FinishedIntake {
            full_name: self.full_name.clone()?,
            reason: self.reason.clone()?,
            appointment_time: self.appointment_time?,
            date_of_birth: self.date_of_birth?,
            phone: self.phone.clone()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_starts_at_name() {
        let s = BookingSession::new("CA123");
        assert_eq!(s.stage(), Stage::Collecting(Field::Name));
        assert!(s.pending.is_none());
        assert!(s.finished().is_none());
    }

    #[test]
    fn test_commit_advances_in_fixed_order() {
        let mut s = BookingSession::new("CA123");
        s.commit(Candidate {
            field: Field::Name,
            value: FieldValue::Text("John Smith".to_string()),
            spoken: "John Smith".to_string(),
        });
        assert_eq!(s.stage(), Stage::Collecting(Field::Reason));
        assert_eq!(s.full_name.as_deref(), Some("John Smith"));
    }

    #[test]
    fn test_commit_clears_retry_entry() {
        let mut s = BookingSession::new("CA123");
        s.bump_retry(Field::Name);
        s.bump_retry(Field::Name);
        assert_eq!(s.retry_count(Field::Name), 2);
        s.commit(Candidate {
            field: Field::Name,
            value: FieldValue::Text("Ann".to_string()),
            spoken: "Ann".to_string(),
        });
        assert_eq!(s.retry_count(Field::Name), 0);
        assert!(!s.retries.contains_key(&Field::Name));
    }

    #[test]
    fn test_clear_reopens_field() {
        let mut s = BookingSession::new("CA123");
        s.full_name = Some("Ann".to_string());
        s.reason = Some("Cleaning".to_string());
        s.clear(Field::Name);
        assert_eq!(s.stage(), Stage::Collecting(Field::Name));
    }
}
