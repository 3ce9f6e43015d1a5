//! Hostname canonicalisation.
//!
//! Every boundary that handles a domain (rule creation, import, the
//! rule-list endpoint and navigation-time lookup) goes through
//! [`normalize`]. If two of them disagree, blocking silently stops
//! working, so there is exactly one implementation.

use url::Url;

/// Canonicalise a raw URL or bare domain into a comparable hostname.
///
/// Lowercases, strips scheme, port, path, query and fragment, drops the
/// trailing root dot and any leading `www.` labels. Input that cannot be parsed
/// as a URL comes back trimmed and lowercased, never as an error.
pub fn normalize(input: &str) -> String {
    let trimmed = input.trim().to_lowercase();
    if trimmed.is_empty() {
        return trimmed;
    }

    let candidate = if trimmed.contains("://") {
        trimmed.clone()
    } else {
        format!("https://{trimmed}")
    };

    let host = match Url::parse(&candidate) {
        Ok(url) => match url.host_str() {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => return trimmed,
        },
        Err(_) => return trimmed,
    };

    let mut host = host.trim_end_matches('.');
    while let Some(rest) = host.strip_prefix("www.") {
        host = rest;
    }
    host.to_string()
}

/// Longest hostname the DNS allows.
const MAX_HOSTNAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Whether an already-normalized string is a hostname that may be written
/// into a rule or the hosts file.
///
/// Only ASCII letters, digits, `-` and `_` are allowed inside dot-separated
/// labels. Internationalised names pass once [`normalize`] has turned them
/// into punycode. Whitespace and control characters never pass.
pub fn is_valid_hostname(host: &str) -> bool {
    if host.is_empty() || host.len() > MAX_HOSTNAME_LEN {
        return false;
    }
    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    })
}

/// Subdomain-aware match: `hostname` equals `domain` or ends with
/// `"." + domain`. Both sides must already be normalized.
pub fn matches(hostname: &str, domain: &str) -> bool {
    if domain.is_empty() {
        return false;
    }
    if hostname == domain {
        return true;
    }
    hostname.len() > domain.len()
        && hostname.ends_with(domain)
        && hostname.as_bytes()[hostname.len() - domain.len() - 1] == b'.'
}
