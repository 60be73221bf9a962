use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub whatsapp: WhatsAppConfig,
}

/// WhatsApp Cloud API settings. The token may be empty in environments that
/// never dispatch messages; sends will then fail with a provider error.
#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    pub api_base_url: String,
    pub access_token: String,
    pub phone_number_id: String,
    pub business_account_id: String,
    pub country_code: String,
    pub send_interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);

        let whatsapp = WhatsAppConfig {
            api_base_url: env::var("WHATSAPP_API_URL")
                .unwrap_or_else(|_| "https://graph.facebook.com/v18.0".to_string()),
            access_token: env::var("WHATSAPP_ACCESS_TOKEN").unwrap_or_default(),
            phone_number_id: env::var("WHATSAPP_PHONE_NUMBER_ID").unwrap_or_default(),
            business_account_id: env::var("WHATSAPP_BUSINESS_ACCOUNT_ID").unwrap_or_default(),
            country_code: env::var("WHATSAPP_COUNTRY_CODE").unwrap_or_else(|_| "90".to_string()),
            // A zero interval would make the dispatch pacer panic; floor at 1ms.
            send_interval: env::var("WHATSAPP_SEND_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(|ms| Duration::from_millis(ms.max(1)))
                .unwrap_or(Duration::from_secs(1)),
        };

        Ok(Self {
            port,
            database_url,
            host,
            whatsapp,
        })
    }
}
