/// Per-recipient placeholder rendering
///
/// Supported placeholders: `{coach_name}`, `{coach_last_name}`,
/// `{school_name}`, `{sender_name}`. Anything else in braces is left as is.
use crate::models::{CoachContact, EmailIdentity};
use crate::services::SchoolDirectory;

/// Values substituted into one recipient's copy of the draft
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    pub coach_name: &'a str,
    pub coach_last_name: &'a str,
    pub school_name: &'a str,
    pub sender_name: &'a str,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        contact: &'a CoachContact,
        sender: &'a EmailIdentity,
        schools: &'a SchoolDirectory,
    ) -> Self {
        Self {
            coach_name: contact.coach_name.as_str(),
            coach_last_name: contact.last_name(),
            school_name: schools.name_for(&contact.school_id),
            sender_name: sender.display_name.as_str(),
        }
    }

    fn lookup(&self, key: &str) -> Option<&'a str> {
        match key {
            "coach_name" => Some(self.coach_name),
            "coach_last_name" => Some(self.coach_last_name),
            "school_name" => Some(self.school_name),
            "sender_name" => Some(self.sender_name),
            _ => None,
        }
    }
}

/// Substitute known placeholders in a single pass.
///
/// Substituted values are never re-scanned, so a coach named `{school_name}`
/// stays literal.
pub fn render(template: &str, ctx: &RenderContext<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match ctx.lookup(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// HTML alternative for a plain-text body: escaped, newlines as `<br>`
pub fn html_alternative(text: &str) -> String {
    let mut html = String::with_capacity(text.len() + 64);
    html.push_str("<html><body><p>");
    for ch in text.chars() {
        match ch {
            '&' => html.push_str("&amp;"),
            '<' => html.push_str("&lt;"),
            '>' => html.push_str("&gt;"),
            '"' => html.push_str("&quot;"),
            '\'' => html.push_str("&#39;"),
            '\n' => html.push_str("<br>\n"),
            '\r' => {}
            other => html.push(other),
        }
    }
    html.push_str("</p></body></html>");
    html
}
