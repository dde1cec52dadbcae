//! Parsed email structures.

use std::fmt;

/// A single address pair from an address-list header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Display name, when the header carried one.
    pub name: Option<String>,
    /// The bare email address.
    pub address: String,
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) if !name.is_empty() => write!(f, "{} <{}>", name, self.address),
            _ => write!(f, "{}", self.address),
        }
    }
}

/// Relevant headers of a parsed email.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailHeaders {
    pub from: Vec<Mailbox>,
    pub to: Vec<Mailbox>,
    pub cc: Vec<Mailbox>,
    pub bcc: Vec<Mailbox>,
    pub subject: String,
    /// Transport-level sender, used as a fallback when `From` is empty.
    pub return_path: Option<String>,
}

/// Dual-format body. Both fields are always present; either may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailBody {
    pub plain: String,
    pub html: String,
}

/// A fully parsed inbound email. Constructed once per notification,
/// read-only afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEmail {
    pub headers: EmailHeaders,
    pub body: EmailBody,
}

impl ParsedEmail {
    /// The body text used downstream: plain when non-empty, else HTML.
    pub fn preferred_body(&self) -> &str {
        if self.body.plain.is_empty() {
            &self.body.html
        } else {
            &self.body.plain
        }
    }

    /// Combined `From / To / Subject / Body` representation published
    /// to the downstream queue.
    pub fn combined(&self) -> String {
        format!(
            "From: {}\nTo: {}\nSubject: {}\n\n{}",
            join_mailboxes(&self.headers.from),
            join_mailboxes(&self.headers.to),
            self.headers.subject,
            self.preferred_body(),
        )
    }
}

fn join_mailboxes(mailboxes: &[Mailbox]) -> String {
    mailboxes
        .iter()
        .map(Mailbox::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
