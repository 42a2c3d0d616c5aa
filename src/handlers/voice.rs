use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Form;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha1::Sha1;

use crate::db::queries;
use crate::models::{Booking, FinishedIntake};
use crate::services::voice;
use crate::state::AppState;

pub const WEBHOOK_PATH: &str = "/twilio-voice";

#[derive(Deserialize)]
pub struct TwilioVoiceForm {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "From", default)]
    pub from: Option<String>,
    #[serde(rename = "To", default)]
    pub to: Option<String>,
    #[serde(rename = "SpeechResult", default)]
    pub speech_result: Option<String>,
}

/// GET probe: Twilio only POSTs, so this just answers with the greeting
/// Gather for manual checks.
pub async fn voice_entry(State(state): State<Arc<AppState>>) -> Response {
    twiml(voice::gather_prompt(state.dialog.greeting(), WEBHOOK_PATH))
}

/// One dialog turn per webhook delivery: recognized speech in, TwiML out.
pub async fn voice_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<TwilioVoiceForm>,
) -> Response {
    let call_sid = form.call_sid.trim().to_string();
    let caller = form.from.as_deref().unwrap_or("").trim().to_string();
    let speech = form
        .speech_result
        .as_deref()
        .unwrap_or("")
        .trim()
        .to_string();

    tracing::info!(call_sid = %call_sid, from = %caller, speech = %speech, "incoming voice turn");

    // Signature check is skipped when no auth token is configured (dev mode).
    if !state.config.twilio_auth_token.is_empty()
        && !verify_signature(&state, &headers, &form, &call_sid, &caller, &speech)
    {
        return (axum::http::StatusCode::FORBIDDEN, "Invalid signature").into_response();
    }

    // First contact: no speech and no session yet. Greet and listen.
    // A later empty result (silence timeout) goes through the engine so the
    // field's retry count advances.
    if speech.is_empty() && !state.sessions.contains(&call_sid) {
        // Materialize the session so a later silence timeout re-prompts the
        // current field instead of greeting again.
        state.sessions.with_session(&call_sid, |_| ());
        return twiml(voice::gather_prompt(state.dialog.greeting(), WEBHOOK_PATH));
    }

    let (outcome, intake) = state.sessions.with_session(&call_sid, |session| {
        let outcome = state.dialog.handle(session, &speech);
        let intake = if outcome.ready_to_book {
            session.finished()
        } else {
            None
        };
        (outcome, intake)
    });

    if let Some(intake) = intake {
        let reply = finalize_booking(&state, &call_sid, intake).await;
        state.sessions.reset(&call_sid);
        return twiml(voice::say_and_hangup(&reply));
    }

    if outcome.is_terminal {
        state.sessions.reset(&call_sid);
        return twiml(voice::say_and_hangup(&outcome.prompt));
    }

    twiml(voice::gather_prompt(&outcome.prompt, WEBHOOK_PATH))
}

/// Persist the confirmed intake and text the patient. SMS failure is logged
/// but never breaks the booking.
async fn finalize_booking(state: &Arc<AppState>, call_sid: &str, intake: FinishedIntake) -> String {
    let booking = Booking::from_intake(call_sid, intake);

    let saved = {
        let db = state.db.lock().unwrap();
        queries::create_booking(&db, &booking)
    };
    if let Err(e) = saved {
        tracing::error!(error = %e, call_sid = %call_sid, "failed to save booking");
        return state.dialog.prompts().save_failed.clone();
    }

    tracing::info!(
        booking_id = %booking.id,
        patient = %booking.patient_name,
        at = %booking.date_time,
        "booking created"
    );

    let sms = format!(
        "{}: {} on {}, {}. Calendar: {}/calendar/{}.ics",
        state.config.clinic_name,
        booking.patient_name,
        booking.date_time.format("%A, %B %d at %H:%M"),
        booking.reason,
        state.config.base_url,
        booking.id,
    );
    if let Err(e) = state.messaging.send_message(&booking.phone.e164, &sms).await {
        tracing::error!(error = %e, booking_id = %booking.id, "failed to send confirmation SMS");
    }

    state.dialog.prompts().closing.clone()
}

fn verify_signature(
    state: &Arc<AppState>,
    headers: &HeaderMap,
    form: &TwilioVoiceForm,
    call_sid: &str,
    caller: &str,
    speech: &str,
) -> bool {
    let signature = headers
        .get("x-twilio-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if signature.is_empty() {
        tracing::warn!("missing X-Twilio-Signature header");
        return false;
    }

    // Reconstruct the public webhook URL; the proxy headers win when present.
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("https");
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get("host"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let url = format!("{proto}://{host}{WEBHOOK_PATH}");

    let params = [
        ("CallSid", call_sid),
        ("From", caller),
        ("To", form.to.as_deref().unwrap_or("")),
        ("SpeechResult", speech),
    ];

    let valid = validate_twilio_signature(&state.config.twilio_auth_token, signature, &url, &params);
    if !valid {
        tracing::warn!("invalid Twilio signature");
    }
    valid
}

fn validate_twilio_signature(
    auth_token: &str,
    signature: &str,
    url: &str,
    params: &[(&str, &str)],
) -> bool {
    // Data to sign: URL followed by the params concatenated in key order.
    let mut data = url.to_string();
    let mut sorted_params = params.to_vec();
    sorted_params.sort_by(|a, b| a.0.cmp(b.0));
    for (key, value) in &sorted_params {
        data.push_str(key);
        data.push_str(value);
    }

    let mut mac = match Hmac::<Sha1>::new_from_slice(auth_token.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(data.as_bytes());
    let expected = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

    expected == signature
}

fn twiml(xml: String) -> Response {
    ([(header::CONTENT_TYPE, "application/xml")], xml).into_response()
}
