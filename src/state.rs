use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::dialog::store::SessionStore;
use crate::services::dialog::DialogEngine;
use crate::services::messaging::MessagingProvider;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub dialog: DialogEngine,
    pub sessions: SessionStore,
    pub messaging: Box<dyn MessagingProvider>,
}
