use crate::config::DeleteScope;
use crate::services::{auth_service::AuthService, storage_service::StorageService};

/// Shared state handed to every handler. Constructed once at startup and
/// passed by reference through the router; no component reads a global.
#[derive(Clone)]
pub struct AppState {
    pub storage: StorageService,
    pub auth: AuthService,
    pub delete_scope: DeleteScope,
}
