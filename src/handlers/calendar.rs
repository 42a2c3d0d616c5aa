use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use crate::db::queries;
use crate::errors::AppError;
use crate::services::calendar::{generate_feed, generate_ics};
use crate::state::AppState;

/// `GET /calendar/:booking_id(.ics)` serves one booking as a downloadable
/// event; the link is texted to the patient after booking.
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    let booking_id = raw_id.strip_suffix(".ics").unwrap_or(&raw_id);

    let booking = {
        let db = state.db.lock().unwrap();
        queries::get_booking_by_id(&db, booking_id)?
    }
    .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

    let ics = generate_ics(&booking, &state.config.clinic_name);
    let filename = format!("booking-{booking_id}.ics");

    Ok(ics_response(ics, &filename))
}

/// `GET /calendar/feed.ics` is the clinic-side subscription of everything
/// upcoming.
pub async fn calendar_feed(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let bookings = {
        let db = state.db.lock().unwrap();
        queries::list_upcoming_bookings(&db, &Utc::now().naive_utc())?
    };

    let ics = generate_feed(&bookings, &state.config.clinic_name);
    Ok(ics_response(ics, "feed.ics"))
}

fn ics_response(ics: String, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response()
}
