//! Application state and shared resources.

use std::sync::Arc;

use warden_common::WardenError;
use warden_common::crypto::gen_uuid;

use crate::captcha::Pool;
use crate::config::AppConfig;
use crate::render::Pages;
use crate::store::RecordStore;

/// Source of authentication cookie values
pub type TokenSource = fn() -> Result<String, WardenError>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,

    /// Pre-generated CAPTCHA pool, read-only after startup
    pub pool: Arc<Pool>,

    /// Pending challenges and issued authentications
    pub records: RecordStore,

    /// Parsed challenge pages
    pub pages: Arc<Pages>,

    /// Authentication token generator, the OS RNG outside tests
    pub tokens: TokenSource,
}

impl AppState {
    pub fn new(config: AppConfig, pool: Pool, pages: Pages) -> Self {
        Self {
            config: Arc::new(config),
            pool: Arc::new(pool),
            records: RecordStore::new(),
            pages: Arc::new(pages),
            tokens: gen_uuid,
        }
    }
}
