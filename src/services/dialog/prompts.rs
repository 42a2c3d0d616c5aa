use crate::models::{BookingSession, Field};

/// Everything the engine says, as one swappable table. A different locale or
/// clinic ships a different `PromptSet`; the engine never hard-codes wording.
#[derive(Debug, Clone)]
pub struct PromptSet {
    pub greeting: String,
    /// Base prompt per field, in `Field::ORDER` order.
    pub ask: [String; 5],
    /// More explicit wording used after repeated failures on a field.
    pub ask_escalated: [String; 5],
    /// "Didn't understand" re-prompt per field.
    pub not_understood: [String; 5],
    /// `{value}` is replaced with the candidate read-back.
    pub heard: String,
    /// Re-prompt when a yes/no answer was expected but not recognized.
    pub yes_no: String,
    /// `{summary}` is replaced with the field summary.
    pub confirm: String,
    pub closing: String,
    pub save_failed: String,
}

impl PromptSet {
    pub fn english() -> Self {
        Self {
            greeting: "Welcome to the clinic. Let's book your appointment. \
                       Please tell me your full name."
                .to_string(),
            ask: [
                "Please tell me your full name.".to_string(),
                "Briefly, what is the reason for your visit: cleaning, consultation, \
                 or something urgent?"
                    .to_string(),
                "When would you like to come in? Name a day and time, for example: \
                 tomorrow at 10 am."
                    .to_string(),
                "Please tell me your date of birth.".to_string(),
                "Please say the phone number we should use to confirm your booking."
                    .to_string(),
            ],
            ask_escalated: [
                "I still need your name. Please say your first and last name, for \
                 example: John Smith."
                    .to_string(),
                "Please describe the reason for your visit in a few words, for \
                 example: cleaning, consultation, or tooth pain."
                    .to_string(),
                "Please name a specific day and time, for example: Monday at 2 pm, \
                 or tomorrow at 10 am."
                    .to_string(),
                "Please say your date of birth as day, month, and year, for \
                 example: May 15, 1980."
                    .to_string(),
                "Please say your phone number digit by digit, ten digits including \
                 the area code."
                    .to_string(),
            ],
            not_understood: [
                "Sorry, I didn't catch your name.".to_string(),
                "Sorry, I didn't catch the reason for your visit.".to_string(),
                "Sorry, I didn't catch the date and time. Say, for example: \
                 tomorrow at 10 am."
                    .to_string(),
                "Sorry, I didn't catch your date of birth. Please repeat it as \
                 day, month, and year."
                    .to_string(),
                "Sorry, I didn't catch the number. Please repeat your phone number."
                    .to_string(),
            ],
            heard: "I heard {value}. Is that correct?".to_string(),
            yes_no: "Please say yes or no: is {value} correct?".to_string(),
            confirm: "Let me confirm your booking: {summary}. Say confirm to book, \
                      or name what to change: name, reason, time, birth date, or phone."
                .to_string(),
            closing: "You're all set! Your appointment is booked and a confirmation \
                      SMS is on its way. Goodbye."
                .to_string(),
            save_failed: "Sorry, I couldn't save your booking right now. Please call \
                          back in a few minutes."
                .to_string(),
        }
    }

    fn field_index(field: Field) -> usize {
        Field::ORDER.iter().position(|f| *f == field).unwrap_or(0)
    }

    pub fn ask(&self, field: Field) -> &str {
        &self.ask[Self::field_index(field)]
    }

    pub fn ask_escalated(&self, field: Field) -> &str {
        &self.ask_escalated[Self::field_index(field)]
    }

    pub fn not_understood(&self, field: Field) -> &str {
        &self.not_understood[Self::field_index(field)]
    }

    pub fn heard(&self, spoken: &str) -> String {
        self.heard.replace("{value}", spoken)
    }

    pub fn yes_no(&self, spoken: &str) -> String {
        self.yes_no.replace("{value}", spoken)
    }

    pub fn confirm(&self, session: &BookingSession) -> String {
        self.confirm.replace("{summary}", &summarize(session))
    }
}

/// Read-back line for the CONFIRM stage. Only called once all fields are
/// filled; missing fields fall back to placeholders rather than panicking.
pub fn summarize(session: &BookingSession) -> String {
    let name = session.full_name.as_deref().unwrap_or("no name");
    let reason = session.reason.as_deref().unwrap_or("no reason");
    let when = session
        .appointment_time
        .map(|dt| dt.format("%A, %B %d at %H:%M").to_string())
        .unwrap_or_else(|| "no time".to_string());
    let dob = session
        .date_of_birth
        .map(|d| d.format("%B %d, %Y").to_string())
        .unwrap_or_else(|| "no date of birth".to_string());
    let phone = session
        .phone
        .as_ref()
        .map(|p| p.spoken.clone())
        .unwrap_or_else(|| "no phone".to_string());
    format!("{name}, {reason}, {when}, born {dob}, phone {phone}")
}

/// Keyword tables for intent-less classification: yes/no detection, the final
/// confirm vocabulary, CONFIRM-stage field corrections, and the canonical
/// visit reasons. Declarative so a locale swap replaces data, not code.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    pub affirmative: Vec<String>,
    pub negative: Vec<String>,
    pub confirm: Vec<String>,
    /// Checked in order; earlier entries win (so "birth date" hits Dob
    /// before "date" could hit When).
    pub corrections: Vec<(Field, Vec<String>)>,
    /// Canonical reason per keyword set.
    pub reasons: Vec<(String, Vec<String>)>,
}

impl Vocabulary {
    pub fn english() -> Self {
        let words = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            affirmative: words(&[
                "yes", "yeah", "yep", "correct", "right", "sure", "ok", "okay", "exactly",
            ]),
            negative: words(&["no", "nope", "nah", "wrong", "incorrect", "not"]),
            confirm: words(&["confirm", "yes", "correct", "book", "right"]),
            corrections: vec![
                (Field::Dob, words(&["birth", "born", "dob"])),
                (Field::When, words(&["time", "date", "when", "appointment", "day"])),
                (Field::Name, words(&["name"])),
                (Field::Reason, words(&["reason", "visit"])),
                (Field::Phone, words(&["phone", "number"])),
            ],
            reasons: vec![
                (
                    "Cleaning".to_string(),
                    words(&["cleaning", "clean", "hygiene", "polish"]),
                ),
                (
                    "Consultation".to_string(),
                    words(&["consult", "checkup", "check-up", "check up", "exam", "advice"]),
                ),
                (
                    "Urgent".to_string(),
                    words(&["pain", "urgent", "ache", "hurt", "emergency", "broken"]),
                ),
                (
                    "Treatment".to_string(),
                    words(&["treatment", "filling", "cavity", "root canal"]),
                ),
            ],
        }
    }

    pub fn is_affirmative(&self, text: &str) -> bool {
        // Negatives win: "no, that's not right" must not read as a yes.
        !self.matches_any(text, &self.negative) && self.matches_any(text, &self.affirmative)
    }

    pub fn is_negative(&self, text: &str) -> bool {
        self.matches_any(text, &self.negative)
    }

    pub fn is_confirm(&self, text: &str) -> bool {
        !self.matches_any(text, &self.negative) && self.matches_any(text, &self.confirm)
    }

    /// Which field, if any, a CONFIRM-stage utterance asks to fix.
    pub fn correction_target(&self, text: &str) -> Option<Field> {
        let lowered = text.to_lowercase();
        for (field, keywords) in &self.corrections {
            if keywords.iter().any(|kw| contains_term(&lowered, kw)) {
                return Some(*field);
            }
        }
        None
    }

    pub fn classify_reason(&self, text: &str) -> Option<String> {
        let lowered = text.to_lowercase();
        for (canonical, keywords) in &self.reasons {
            if keywords.iter().any(|kw| lowered.contains(kw.as_str())) {
                return Some(canonical.clone());
            }
        }
        None
    }

    fn matches_any(&self, text: &str, keywords: &[String]) -> bool {
        let lowered = text.to_lowercase();
        keywords.iter().any(|kw| contains_term(&lowered, kw))
    }
}

/// Whole-word match for single words, substring match for phrases. Plain
/// substring search would read "no" inside "know" as a negation.
fn contains_term(lowered: &str, term: &str) -> bool {
    if term.contains(' ') {
        return lowered.contains(term);
    }
    lowered
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .any(|word| word == term)
}
