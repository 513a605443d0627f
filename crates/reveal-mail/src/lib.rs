//! Password reset email delivery. The transport is picked from the
//! recipient's domain, with a single retry through the default transport.

pub mod config;
pub mod dispatcher;
pub mod provider;
pub mod routes;
pub mod template;
pub mod transport;

pub use config::{MailConfig, TransportConfig};
pub use dispatcher::{Delivery, NotificationDispatcher};
pub use provider::MailProvider;
pub use routes::MailRoutes;
pub use transport::{HttpMailTransport, MailTransport, OutboundMail};
