use carebase_core::{AccountManager, PatientStore};
use std::sync::Arc;

/// Shared application state for handlers.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountManager>,
    pub patients: Arc<PatientStore>,
}
