use std::collections::HashMap;
use std::sync::Arc;

use crate::config::MailConfig;
use crate::provider::MailProvider;
use crate::transport::{HttpMailTransport, MailTransport};

/// Provider to transport table, built once at startup and injected.
#[derive(Clone)]
pub struct MailRoutes {
    default: Arc<dyn MailTransport>,
    by_provider: HashMap<MailProvider, Arc<dyn MailTransport>>,
}

impl MailRoutes {
    pub fn new(default: Arc<dyn MailTransport>) -> Self {
        Self {
            default,
            by_provider: HashMap::new(),
        }
    }

    pub fn with(mut self, provider: MailProvider, transport: Arc<dyn MailTransport>) -> Self {
        self.by_provider.insert(provider, transport);
        self
    }

    pub fn from_config(config: &MailConfig) -> anyhow::Result<Self> {
        let mut routes = Self::new(Arc::new(HttpMailTransport::new(
            config.default_transport.clone(),
        )?));
        for (provider, transport) in &config.provider_transports {
            routes = routes.with(*provider, Arc::new(HttpMailTransport::new(transport.clone())?));
        }
        Ok(routes)
    }

    pub fn default_transport(&self) -> &Arc<dyn MailTransport> {
        &self.default
    }

    /// Falls back to the default transport when the provider has none.
    pub fn resolve(&self, provider: MailProvider) -> &Arc<dyn MailTransport> {
        self.by_provider.get(&provider).unwrap_or(&self.default)
    }
}
