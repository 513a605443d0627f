use reveal_core::ResetNotifier;
use reveal_types::models::User;
use tokio::runtime::Handle;
use tracing::{error, info, warn};

use crate::config::MailConfig;
use crate::provider::{self, MailProvider};
use crate::routes::MailRoutes;
use crate::template;
use crate::transport::{MailTransport, OutboundMail};

/// What happened to one reset email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent(MailProvider),
    /// The first attempt failed and the retry through the default transport succeeded.
    SentViaFallback(MailProvider),
    Failed,
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    routes: MailRoutes,
    frontend_url: String,
    validity_minutes: i64,
}

impl NotificationDispatcher {
    pub fn new(routes: MailRoutes, frontend_url: impl Into<String>, validity_minutes: i64) -> Self {
        Self {
            routes,
            frontend_url: frontend_url.into(),
            validity_minutes,
        }
    }

    pub fn from_config(config: &MailConfig) -> anyhow::Result<Self> {
        Ok(Self::new(
            MailRoutes::from_config(config)?,
            config.frontend_url.clone(),
            config.token_ttl_minutes,
        ))
    }

    /// Never fails; every error is logged and folded into the returned [`Delivery`].
    pub async fn send_password_reset_email(&self, user: &User, token: &str) -> Delivery {
        let provider = provider::detect(&user.email);
        let transport = self.routes.resolve(provider);

        let link = template::reset_link(&self.frontend_url, token);
        let mut mail = OutboundMail {
            from: transport.sender().to_string(),
            to: user.email.clone(),
            subject: template::RESET_SUBJECT.to_string(),
            html: template::render_reset_email(&user.name, &link, self.validity_minutes),
        };

        let err = match transport.send(&mail).await {
            Ok(()) => {
                info!(user_id = %user.id, provider = %provider, "Password reset email sent");
                return Delivery::Sent(provider);
            }
            Err(e) => e,
        };

        if provider == MailProvider::Default {
            error!(user_id = %user.id, provider = %provider, "Password reset email failed: {:#}", err);
            return Delivery::Failed;
        }

        warn!(
            user_id = %user.id,
            provider = %provider,
            "Provider send failed, retrying with default: {:#}", err
        );
        let fallback = self.routes.default_transport();
        mail.from = fallback.sender().to_string();
        match fallback.send(&mail).await {
            Ok(()) => {
                info!(user_id = %user.id, "Password reset email sent through default transport");
                Delivery::SentViaFallback(provider)
            }
            Err(e) => {
                error!(user_id = %user.id, "Default transport also failed: {:#}", e);
                Delivery::Failed
            }
        }
    }
}

impl ResetNotifier for NotificationDispatcher {
    /// Fire-and-forget: the send runs on the Tokio runtime after the caller returns.
    fn reset_requested(&self, user: &User, token: &str) {
        let Ok(runtime) = Handle::try_current() else {
            error!(user_id = %user.id, "No async runtime available, reset email not sent");
            return;
        };

        let dispatcher = self.clone();
        let user = user.clone();
        let token = token.to_string();
        runtime.spawn(async move {
            dispatcher.send_password_reset_email(&user, &token).await;
        });
    }
}
