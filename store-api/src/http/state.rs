use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::config::RateLimit;
use crate::db::Database;

#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub tokens: Arc<TokenIssuer>,
    pub rate_limit: RateLimit,
}
