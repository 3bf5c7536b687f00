//! Shared application state.

use std::sync::Arc;

use clinic_core::DataService;

use crate::auth::SessionManager;
use crate::config::ApiConfig;

/// How sign-in treats an identity asserted by an upstream proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPolicy {
    /// Whether the proxy header is believed at all.
    pub trust_forwarded: bool,
    /// Lowercased header name.
    pub header: String,
}

/// State handed to every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn DataService>,
    pub sessions: Arc<SessionManager>,
    pub identity: IdentityPolicy,
}

impl AppState {
    pub fn new(service: Arc<dyn DataService>, config: &ApiConfig) -> Self {
        AppState {
            service,
            sessions: Arc::new(SessionManager::new(
                &config.jwt_secret,
                config.session_lifetime_secs,
            )),
            identity: IdentityPolicy {
                trust_forwarded: config.trust_forwarded_identity,
                header: config.identity_header.clone(),
            },
        }
    }
}
