use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub clinic_name: String,
    /// Public base URL, used for the ICS link in confirmation texts.
    pub base_url: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_phone_number: String,
    /// Consecutive failures on one field before the prompt wording escalates.
    pub retry_escalate_after: u32,
    /// Hour of day assumed when a caller names a date without a time.
    pub default_appointment_hour: u32,
    /// Abandoned-call sessions are evicted after this many idle minutes.
    pub session_idle_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "medvoice.db".to_string()),
            clinic_name: env::var("CLINIC_NAME")
                .unwrap_or_else(|_| "MedVoice Clinic".to_string()),
            base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID").unwrap_or_default(),
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN").unwrap_or_default(),
            twilio_phone_number: env::var("TWILIO_PHONE_NUMBER").unwrap_or_default(),
            retry_escalate_after: env::var("RETRY_ESCALATE_AFTER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            default_appointment_hour: env::var("DEFAULT_APPOINTMENT_HOUR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            session_idle_minutes: env::var("SESSION_IDLE_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }
}
