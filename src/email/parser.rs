//! MIME parsing via `mail-parser`.
//!
//! Encoding problems never abort the pipeline: undecodable content
//! degrades to replacement characters or an empty string, with a
//! logged warning.

use mail_parser::{Address, Message, MessageParser, PartType};
use tracing::{debug, info, warn};

use crate::email::types::{EmailBody, EmailHeaders, Mailbox, ParsedEmail};
use crate::error::{Error, ParseError};
use crate::notification::RawEmailLocation;
use crate::store::traits::ObjectStore;

/// Parse raw bytes into a [`ParsedEmail`].
pub fn parse_email(raw: &[u8]) -> Result<ParsedEmail, ParseError> {
    if raw.is_empty() {
        return Err(ParseError::InvalidMime);
    }
    let message = MessageParser::default()
        .parse(raw)
        .ok_or(ParseError::InvalidMime)?;

    Ok(ParsedEmail {
        headers: extract_headers(&message),
        body: extract_body(&message),
    })
}

/// Fetch an email from object storage and parse it.
pub async fn fetch_and_parse(
    objects: &dyn ObjectStore,
    location: &RawEmailLocation,
) -> Result<ParsedEmail, Error> {
    let raw = objects.get(&location.container, &location.key).await?;
    let parsed = parse_email(&raw)?;

    info!(
        key = %location.key,
        from = %join_addresses(&parsed.headers.from),
        subject = %parsed.headers.subject,
        "Parsed inbound email"
    );
    debug!(
        plain_preview = %preview(&parsed.body.plain),
        html_preview = %preview(&parsed.body.html),
        "Email body"
    );

    Ok(parsed)
}

/// Normalize an address-list header into (display-name, address) pairs.
fn mailboxes(address: Option<&Address<'_>>) -> Vec<Mailbox> {
    address
        .map(|list| {
            list.iter()
                .filter_map(|addr| {
                    addr.address().map(|a| Mailbox {
                        name: addr.name().map(str::to_string),
                        address: a.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn extract_headers(message: &Message<'_>) -> EmailHeaders {
    EmailHeaders {
        from: mailboxes(message.from()),
        to: mailboxes(message.to()),
        cc: mailboxes(message.cc()),
        bcc: mailboxes(message.bcc()),
        subject: message.subject().unwrap_or_default().to_string(),
        return_path: return_path(message),
    }
}

/// Bare address from the `Return-Path` header, if the transport set one.
fn return_path(message: &Message<'_>) -> Option<String> {
    message
        .header("Return-Path")
        .and_then(|value| value.as_text())
        .map(|raw| raw.trim().trim_matches(['<', '>']).trim().to_string())
        .filter(|addr| !addr.is_empty())
}

/// Walk every part, concatenating text/plain parts into `plain` and
/// text/html parts into `html`. A non-multipart message has a single
/// part and populates exactly one of the two.
fn extract_body(message: &Message<'_>) -> EmailBody {
    let mut plain = String::new();
    let mut html = String::new();

    for part in &message.parts {
        if part.is_encoding_problem {
            warn!("Email part could not be fully decoded; kept with replacement characters");
        }
        match &part.body {
            PartType::Text(text) => plain.push_str(text),
            PartType::Html(markup) => html.push_str(markup),
            _ => {}
        }
    }

    EmailBody { plain, html }
}

fn join_addresses(mailboxes: &[Mailbox]) -> String {
    mailboxes
        .iter()
        .map(|m| m.address.clone())
        .collect::<Vec<_>>()
        .join(", ")
}

/// First 500 chars, for log lines.
fn preview(text: &str) -> &str {
    let end = text
        .char_indices()
        .nth(500)
        .map_or(text.len(), |(idx, _)| idx);
    &text[..end]
}
