//! Email fetch & parse — raw bytes to structured headers and body.

pub mod parser;
pub mod types;

pub use parser::{fetch_and_parse, parse_email};
pub use types::{EmailBody, EmailHeaders, Mailbox, ParsedEmail};
