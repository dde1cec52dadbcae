//! Relevance verdict — pure sender-address matching against the
//! allow-list. No side effects; the natural unit-test surface.

use crate::allowlist::AllowList;
use crate::email::ParsedEmail;

/// The address a relevance decision is based on: the first `From`
/// mailbox, falling back to the transport's `Return-Path`.
pub fn sender_address(email: &ParsedEmail) -> Option<&str> {
    email
        .headers
        .from
        .first()
        .map(|mailbox| mailbox.address.as_str())
        .or(email.headers.return_path.as_deref())
}

/// Exact, case-sensitive membership test after trimming surrounding
/// whitespace. No sender at all means not relevant.
pub fn is_relevant(email: &ParsedEmail, allow_list: &AllowList) -> bool {
    match sender_address(email) {
        Some(sender) => allow_list.contains(sender.trim()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::{EmailBody, EmailHeaders, Mailbox, ParsedEmail};

    fn email_from(address: Option<&str>, return_path: Option<&str>) -> ParsedEmail {
        ParsedEmail {
            headers: EmailHeaders {
                from: address
                    .map(|a| {
                        vec![Mailbox {
                            name: None,
                            address: a.to_string(),
                        }]
                    })
                    .unwrap_or_default(),
                to: vec![],
                cc: vec![],
                bcc: vec![],
                subject: String::new(),
                return_path: return_path.map(str::to_string),
            },
            body: EmailBody::default(),
        }
    }

    fn allow(addresses: &[&str]) -> AllowList {
        addresses.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn known_sender_is_relevant() {
        let email = email_from(Some("a@b.com"), None);
        assert!(is_relevant(&email, &allow(&["a@b.com", "x@y.z"])));
    }

    #[test]
    fn unknown_sender_is_not_relevant() {
        let email = email_from(Some("c@d.com"), None);
        assert!(!is_relevant(&email, &allow(&["a@b.com"])));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let email = email_from(Some("A@B.com"), None);
        assert!(!is_relevant(&email, &allow(&["a@b.com"])));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let email = email_from(Some("  a@b.com "), None);
        assert!(is_relevant(&email, &allow(&["a@b.com"])));
    }

    #[test]
    fn no_sender_fails_closed() {
        let email = email_from(None, None);
        assert!(!is_relevant(&email, &allow(&["a@b.com"])));
    }

    #[test]
    fn return_path_is_the_fallback_sender() {
        let email = email_from(None, Some("bounce@b.com"));
        assert_eq!(sender_address(&email), Some("bounce@b.com"));
        assert!(is_relevant(&email, &allow(&["bounce@b.com"])));
    }

    #[test]
    fn from_wins_over_return_path() {
        let email = email_from(Some("a@b.com"), Some("bounce@b.com"));
        assert_eq!(sender_address(&email), Some("a@b.com"));
    }

    #[test]
    fn decision_ignores_allow_list_insertion_order() {
        let email = email_from(Some("a@b.com"), None);
        let forward = allow(&["a@b.com", "b@c.com", "c@d.com"]);
        let reverse = allow(&["c@d.com", "b@c.com", "a@b.com"]);
        assert_eq!(
            is_relevant(&email, &forward),
            is_relevant(&email, &reverse)
        );
    }

    #[test]
    fn empty_allow_list_archives_everything() {
        let email = email_from(Some("a@b.com"), None);
        assert!(!is_relevant(&email, &AllowList::new()));
    }
}
