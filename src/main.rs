use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use medvoice::config::AppConfig;
use medvoice::db;
use medvoice::handlers;
use medvoice::services::dialog::store::SessionStore;
use medvoice::services::dialog::{DialogConfig, DialogEngine};
use medvoice::services::messaging::twilio::TwilioSmsProvider;
use medvoice::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    let messaging = TwilioSmsProvider::new(
        config.twilio_account_sid.clone(),
        config.twilio_auth_token.clone(),
        config.twilio_phone_number.clone(),
    );

    let dialog = DialogEngine::new(DialogConfig {
        escalate_after: config.retry_escalate_after,
        default_hour: config.default_appointment_hour,
        ..DialogConfig::default()
    });

    let state = Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: config.clone(),
        dialog,
        sessions: SessionStore::new(),
        messaging: Box::new(messaging),
    });

    // Abandoned calls never signal completion; sweep their sessions so the
    // store stays bounded.
    let sweeper_state = Arc::clone(&state);
    let idle = chrono::Duration::minutes(config.session_idle_minutes);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(60));
        loop {
            tick.tick().await;
            let evicted = sweeper_state.sessions.evict_idle(idle);
            if evicted > 0 {
                tracing::info!(evicted, "evicted idle call sessions");
            }
        }
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            handlers::voice::WEBHOOK_PATH,
            get(handlers::voice::voice_entry).post(handlers::voice::voice_webhook),
        )
        .route("/calendar/feed.ics", get(handlers::calendar::calendar_feed))
        .route("/calendar/:booking_id", get(handlers::calendar::download_ics))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(clinic = %config.clinic_name, "starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
