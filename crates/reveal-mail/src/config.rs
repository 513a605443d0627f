use std::collections::HashMap;

use crate::provider::MailProvider;

/// Where and as whom one transport sends.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub endpoint: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Base URL the reset link points at, without trailing slash.
    pub frontend_url: String,
    pub default_transport: TransportConfig,
    /// Optional per-provider overrides; providers absent here use the default.
    pub provider_transports: HashMap<MailProvider, TransportConfig>,
    pub token_ttl_minutes: i64,
}
