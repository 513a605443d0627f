use std::fmt;

/// Mail provider inferred from the recipient's domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MailProvider {
    Gmail,
    Outlook,
    Hotmail,
    ICloud,
    Default,
}

impl MailProvider {
    pub const ALL: [MailProvider; 5] = [
        MailProvider::Gmail,
        MailProvider::Outlook,
        MailProvider::Hotmail,
        MailProvider::ICloud,
        MailProvider::Default,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MailProvider::Gmail => "gmail",
            MailProvider::Outlook => "outlook",
            MailProvider::Hotmail => "hotmail",
            MailProvider::ICloud => "icloud",
            MailProvider::Default => "default",
        }
    }
}

impl fmt::Display for MailProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure function of the address. Anything unrecognised, including an
/// address without `@`, maps to [`MailProvider::Default`].
pub fn detect(email: &str) -> MailProvider {
    let Some((_, domain)) = email.trim().rsplit_once('@') else {
        return MailProvider::Default;
    };
    let domain = domain.to_ascii_lowercase();

    if domain.contains("gmail") {
        MailProvider::Gmail
    } else if ["outlook", "office365", "live"].iter().any(|p| domain.contains(p)) {
        MailProvider::Outlook
    } else if domain.contains("hotmail") {
        MailProvider::Hotmail
    } else if ["icloud", "me.com", "mac.com"].iter().any(|p| domain.contains(p)) {
        MailProvider::ICloud
    } else {
        MailProvider::Default
    }
}
