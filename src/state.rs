use std::time::Duration;

use crate::{
    cache::TtlCache, config::WhatsAppConfig, db::OrmConn, dto::dashboard::DashboardSummary,
    whatsapp::WhatsAppClient,
};

/// Dashboard summaries are cached per reporting period and cleared either by
/// TTL expiry or the explicit cache-clear endpoint.
pub const DASHBOARD_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub whatsapp: WhatsAppClient,
    pub whatsapp_config: WhatsAppConfig,
    pub dashboard_cache: TtlCache<String, DashboardSummary>,
}

impl AppState {
    pub fn new(orm: OrmConn, whatsapp_config: WhatsAppConfig) -> Self {
        Self {
            orm,
            whatsapp: WhatsAppClient::new(&whatsapp_config),
            whatsapp_config,
            dashboard_cache: TtlCache::new(DASHBOARD_CACHE_TTL),
        }
    }
}
