pub const RESET_SUBJECT: &str = "Password reset - Reveal";

/// Minimal HTML escaping for text interpolated into the template.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn reset_link(frontend_url: &str, token: &str) -> String {
    format!("{}/reset-password?token={}", frontend_url.trim_end_matches('/'), token)
}

pub fn render_reset_email(name: &str, link: &str, validity_minutes: i64) -> String {
    let name = escape_html(name);
    let link = escape_html(link);
    format!(
        r#"<!DOCTYPE html>
<html>
  <body style="font-family: Arial, sans-serif; color: #333;">
    <h2>Password reset</h2>
    <p>Hi {name},</p>
    <p>We received a request to reset your password. Click the button below to choose a new one.</p>
    <p>
      <a href="{link}" style="background: #e91e63; color: #fff; padding: 10px 18px; border-radius: 4px; text-decoration: none;">Reset password</a>
    </p>
    <p>Or paste this link into your browser:<br>{link}</p>
    <p>This link is valid for {validity_minutes} minutes. If you did not ask for a reset, ignore this message.</p>
  </body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_escaped() {
        let html = render_reset_email("<script>alert(1)</script>", "https://app/x", 30);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("valid for 30 minutes"));
    }

    #[test]
    fn link_ignores_trailing_slash() {
        assert_eq!(
            reset_link("http://localhost:4200/", "abc"),
            "http://localhost:4200/reset-password?token=abc"
        );
    }
}
