//! Call-scoped slot-filling dialog for phone appointment intake.
//!
//! One turn is one recognized utterance in, one prompt out. The engine fills
//! the intake fields in a fixed order, holds each parsed value as a pending
//! candidate until the caller confirms it, and finishes with a full summary
//! the caller must confirm or correct. Speech recognition is not trusted for
//! names, dates, or numbers, which is why parsing success alone never
//! commits a field.

pub mod parsers;
pub mod prompts;
pub mod store;

use chrono::Local;

use crate::models::{BookingSession, Candidate, Field, FieldValue, Stage};

use prompts::{PromptSet, Vocabulary};

/// Behavior knobs. Wording and keyword tables live in `PromptSet` /
/// `Vocabulary`; this covers the thresholds and per-field policy.
#[derive(Debug, Clone)]
pub struct DialogConfig {
    /// Consecutive failures on one field before the prompt escalates to the
    /// explicit-example wording.
    pub escalate_after: u32,
    /// Hour of day used when an appointment date arrives without a time.
    pub default_hour: u32,
    /// Fields that require a yes/no checkpoint before committing. The reason
    /// field is keyword-classified and low risk, so it commits directly by
    /// default.
    pub confirm_fields: [bool; 5],
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            escalate_after: 3,
            default_hour: 10,
            confirm_fields: [true, false, true, true, true],
        }
    }
}

impl DialogConfig {
    fn confirm_required(&self, field: Field) -> bool {
        let idx = Field::ORDER.iter().position(|f| *f == field).unwrap_or(0);
        self.confirm_fields[idx]
    }
}

/// What one turn produced. `ready_to_book` implies all five fields are set
/// and individually valid; the caller persists the booking and resets the
/// session before the next turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub prompt: String,
    pub is_terminal: bool,
    pub ready_to_book: bool,
}

impl TurnOutcome {
    fn ask(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            is_terminal: false,
            ready_to_book: false,
        }
    }
}

pub struct DialogEngine {
    config: DialogConfig,
    prompts: PromptSet,
    vocab: Vocabulary,
}

impl DialogEngine {
    pub fn new(config: DialogConfig) -> Self {
        Self {
            config,
            prompts: PromptSet::english(),
            vocab: Vocabulary::english(),
        }
    }

    pub fn with_tables(config: DialogConfig, prompts: PromptSet, vocab: Vocabulary) -> Self {
        Self {
            config,
            prompts,
            vocab,
        }
    }

    pub fn prompts(&self) -> &PromptSet {
        &self.prompts
    }

    /// Opening line for the very first turn of a call, before any speech.
    pub fn greeting(&self) -> &str {
        &self.prompts.greeting
    }

    /// Process one utterance for this session. Never fails: unparseable or
    /// empty input re-prompts, it does not error.
    pub fn handle(&self, session: &mut BookingSession, utterance: &str) -> TurnOutcome {
        let text = utterance.trim();

        tracing::debug!(
            call_sid = %session.call_sid,
            stage = ?session.stage(),
            pending = session.pending.as_ref().map(|c| c.field.as_str()),
            "dialog turn"
        );

        if session.done {
            // The router resets on ready_to_book, so this only fires on a
            // duplicate delivery of the final turn.
            return TurnOutcome {
                prompt: self.prompts.closing.clone(),
                is_terminal: true,
                ready_to_book: false,
            };
        }

        if let Some(candidate) = session.pending.take() {
            return self.confirm_candidate_turn(session, candidate, text);
        }

        match session.stage() {
            Stage::Collecting(field) => self.value_turn(session, field, text),
            Stage::Confirm => self.final_confirm_turn(session, text),
            Stage::Done => unreachable!("done handled above"),
        }
    }

    /// Yes/no turn on a pending candidate.
    fn confirm_candidate_turn(
        &self,
        session: &mut BookingSession,
        candidate: Candidate,
        text: &str,
    ) -> TurnOutcome {
        if self.vocab.is_negative(text) {
            // Discarded. The caller lands back on the exact prompt they saw
            // before the candidate was proposed.
            let field = candidate.field;
            return TurnOutcome::ask(self.value_prompt(session, field));
        }
        if self.vocab.is_affirmative(text) {
            session.commit(candidate);
            return self.advance(session);
        }
        let prompt = self.prompts.yes_no(&candidate.spoken);
        session.pending = Some(candidate);
        TurnOutcome::ask(prompt)
    }

    /// Fresh-value turn for the first unfilled field.
    fn value_turn(&self, session: &mut BookingSession, field: Field, text: &str) -> TurnOutcome {
        if text.is_empty() {
            session.bump_retry(field);
            return TurnOutcome::ask(self.value_prompt(session, field));
        }

        match self.parse_field(field, text) {
            Some((value, spoken)) => {
                if self.config.confirm_required(field) {
                    let prompt = self.prompts.heard(&spoken);
                    session.pending = Some(Candidate {
                        field,
                        value,
                        spoken,
                    });
                    TurnOutcome::ask(prompt)
                } else {
                    session.commit(Candidate {
                        field,
                        value,
                        spoken,
                    });
                    self.advance(session)
                }
            }
            None => {
                let failures = session.bump_retry(field);
                if failures >= self.config.escalate_after {
                    TurnOutcome::ask(self.prompts.ask_escalated(field))
                } else {
                    TurnOutcome::ask(format!(
                        "{} {}",
                        self.prompts.not_understood(field),
                        self.prompts.ask(field)
                    ))
                }
            }
        }
    }

    /// CONFIRM stage: all fields filled, waiting for "confirm" or a named
    /// correction.
    fn final_confirm_turn(&self, session: &mut BookingSession, text: &str) -> TurnOutcome {
        if self.vocab.is_confirm(text) {
            session.done = true;
            return TurnOutcome {
                prompt: self.prompts.closing.clone(),
                is_terminal: true,
                ready_to_book: true,
            };
        }
        if let Some(field) = self.vocab.correction_target(text) {
            session.clear(field);
            return TurnOutcome::ask(self.value_prompt(session, field));
        }
        TurnOutcome::ask(self.prompts.confirm(session))
    }

    /// After a commit: next field's prompt, or the summary once everything
    /// is filled.
    fn advance(&self, session: &mut BookingSession) -> TurnOutcome {
        match session.next_unfilled() {
            Some(field) => TurnOutcome::ask(self.value_prompt(session, field)),
            None => TurnOutcome::ask(self.prompts.confirm(session)),
        }
    }

    /// Base prompt for a field, escalating to the explicit-example wording
    /// once the caller has failed it repeatedly.
    fn value_prompt(&self, session: &BookingSession, field: Field) -> String {
        if session.retry_count(field) >= self.config.escalate_after {
            self.prompts.ask_escalated(field).to_string()
        } else {
            self.prompts.ask(field).to_string()
        }
    }

    fn parse_field(&self, field: Field, text: &str) -> Option<(FieldValue, String)> {
        let now = Local::now().naive_local();
        match field {
            Field::Name => {
                let name = parsers::parse_name(text)?;
                let spoken = name.clone();
                Some((FieldValue::Text(name), spoken))
            }
            Field::Reason => {
                let reason = self
                    .vocab
                    .classify_reason(text)
                    .or_else(|| parsers::capitalize(text))?;
                let spoken = reason.clone();
                Some((FieldValue::Text(reason), spoken))
            }
            Field::When => {
                let when = parsers::parse_appointment(text, now, self.config.default_hour)?;
                let spoken = when.format("%A, %B %d at %H:%M").to_string();
                Some((FieldValue::DateTime(when), spoken))
            }
            Field::Dob => {
                let dob = parsers::parse_dob(text, now.date())?;
                let spoken = dob.format("%B %d, %Y").to_string();
                Some((FieldValue::Date(dob), spoken))
            }
            Field::Phone => {
                let phone = parsers::parse_phone(text)?;
                let spoken = phone.spoken.clone();
                Some((FieldValue::Phone(phone), spoken))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingSession;

    fn engine() -> DialogEngine {
        DialogEngine::new(DialogConfig::default())
    }

    fn session() -> BookingSession {
        BookingSession::new("CA-test")
    }

    #[test]
    fn test_success_proposes_candidate_without_committing() {
        let e = engine();
        let mut s = session();
        let out = e.handle(&mut s, "John Smith");
        assert!(out.prompt.contains("John Smith"));
        assert!(out.prompt.to_lowercase().contains("correct"));
        assert!(s.full_name.is_none());
        let pending = s.pending.as_ref().expect("candidate pending");
        assert_eq!(pending.field, Field::Name);
    }

    #[test]
    fn test_affirmation_commits_and_advances() {
        let e = engine();
        let mut s = session();
        e.handle(&mut s, "John Smith");
        let out = e.handle(&mut s, "yes");
        assert_eq!(s.full_name.as_deref(), Some("John Smith"));
        assert!(s.pending.is_none());
        assert_eq!(s.stage(), Stage::Collecting(Field::Reason));
        assert_eq!(out.prompt, e.prompts.ask(Field::Reason));
    }

    #[test]
    fn test_negation_is_idempotent() {
        let e = engine();
        let mut s = session();
        let before = e.handle(&mut s, "");
        // empty turn bumped the retry count; remember the re-prompt wording
        e.handle(&mut s, "John Smith");
        let after = e.handle(&mut s, "no");
        assert_eq!(after.prompt, before.prompt);
        assert!(s.full_name.is_none());
        assert!(s.pending.is_none());
    }

    #[test]
    fn test_unrecognized_yes_no_keeps_candidate() {
        let e = engine();
        let mut s = session();
        e.handle(&mut s, "John Smith");
        let out = e.handle(&mut s, "banana");
        assert!(out.prompt.contains("yes or no"));
        assert!(out.prompt.contains("John Smith"));
        assert!(s.pending.is_some());
        assert!(s.full_name.is_none());
    }

    #[test]
    fn test_empty_utterance_bumps_retry_without_mutation() {
        let e = engine();
        let mut s = session();
        let out = e.handle(&mut s, "");
        assert_eq!(s.retry_count(Field::Name), 1);
        assert!(s.full_name.is_none());
        assert_eq!(s.stage(), Stage::Collecting(Field::Name));
        assert_eq!(out.prompt, e.prompts.ask(Field::Name));
    }

    #[test]
    fn test_prompt_escalates_after_threshold() {
        let e = engine();
        let mut s = session();
        // dob stage: fill earlier fields directly
        s.full_name = Some("John Smith".to_string());
        s.reason = Some("Cleaning".to_string());
        s.appointment_time = Some(
            chrono::Local::now().naive_local() + chrono::Duration::days(1),
        );
        let first = e.handle(&mut s, "mumble");
        assert!(first.prompt.contains("didn't catch"));
        e.handle(&mut s, "mumble");
        let third = e.handle(&mut s, "mumble");
        assert_eq!(s.retry_count(Field::Dob), 3);
        assert_eq!(third.prompt, e.prompts.ask_escalated(Field::Dob));
    }

    #[test]
    fn test_reason_commits_without_checkpoint() {
        let e = engine();
        let mut s = session();
        s.full_name = Some("John Smith".to_string());
        let out = e.handle(&mut s, "cleaning");
        assert_eq!(s.reason.as_deref(), Some("Cleaning"));
        assert!(s.pending.is_none());
        assert_eq!(out.prompt, e.prompts.ask(Field::When));
    }

    #[test]
    fn test_unmatched_reason_accepted_verbatim() {
        let e = engine();
        let mut s = session();
        s.full_name = Some("John Smith".to_string());
        e.handle(&mut s, "my crown fell off");
        assert_eq!(s.reason.as_deref(), Some("My crown fell off"));
    }

    fn filled_session() -> BookingSession {
        let mut s = session();
        s.full_name = Some("John Smith".to_string());
        s.reason = Some("Cleaning".to_string());
        s.appointment_time = Some(
            chrono::Local::now().naive_local() + chrono::Duration::days(1),
        );
        s.date_of_birth = chrono::NaiveDate::from_ymd_opt(1980, 5, 15);
        s.phone = Some(crate::models::PhoneNumber {
            e164: "+17188441007".to_string(),
            spoken: "718 844 1007".to_string(),
        });
        s
    }

    #[test]
    fn test_confirm_books() {
        let e = engine();
        let mut s = filled_session();
        let out = e.handle(&mut s, "confirm");
        assert!(out.ready_to_book);
        assert!(out.is_terminal);
        assert!(s.done);
        assert!(s.finished().is_some());
    }

    #[test]
    fn test_confirm_correction_round_trip() {
        let e = engine();
        let mut s = filled_session();
        let out = e.handle(&mut s, "the phone number is wrong");
        assert!(s.phone.is_none());
        assert_eq!(out.prompt, e.prompts.ask(Field::Phone));
        assert_eq!(s.stage(), Stage::Collecting(Field::Phone));

        // refill: parse, confirm, and we land straight back on the summary
        e.handle(&mut s, "212 555 0182");
        let out = e.handle(&mut s, "yes");
        assert_eq!(s.phone.as_ref().unwrap().e164, "+12125550182");
        assert!(out.prompt.contains("Say confirm"));
        assert!(out.prompt.contains("John Smith"));
    }

    #[test]
    fn test_confirm_unrecognized_repeats_summary() {
        let e = engine();
        let mut s = filled_session();
        let out = e.handle(&mut s, "hmm let me think");
        assert!(out.prompt.contains("John Smith"));
        assert!(out.prompt.contains("718 844 1007"));
        assert!(!out.ready_to_book);
        assert_eq!(s.stage(), Stage::Confirm);
    }

    #[test]
    fn test_monotonic_progress_end_to_end() {
        let e = engine();
        let mut s = session();
        let turns = [
            "John Smith",
            "yes",
            "cleaning",
            "tomorrow at 10 am",
            "yes",
            "May 15 1980",
            "yes",
            "718 844 1007",
            "yes",
        ];
        let mut last = TurnOutcome::ask("");
        for turn in turns {
            last = e.handle(&mut s, turn);
            assert!(!last.ready_to_book);
        }
        // all five fields filled, now at the summary
        assert!(last.prompt.contains("John Smith"));
        assert_eq!(s.stage(), Stage::Confirm);

        let done = e.handle(&mut s, "confirm");
        assert!(done.ready_to_book && done.is_terminal);

        let intake = s.finished().unwrap();
        assert_eq!(intake.full_name, "John Smith");
        assert_eq!(intake.reason, "Cleaning");
        assert_eq!(intake.phone.e164, "+17188441007");
        assert_eq!(
            intake.date_of_birth,
            chrono::NaiveDate::from_ymd_opt(1980, 5, 15).unwrap()
        );
        assert_eq!(intake.appointment_time.time().format("%H:%M").to_string(), "10:00");
    }

    #[test]
    fn test_done_session_does_not_rebook() {
        let e = engine();
        let mut s = filled_session();
        e.handle(&mut s, "confirm");
        let again = e.handle(&mut s, "confirm");
        assert!(again.is_terminal);
        assert!(!again.ready_to_book);
    }
}
