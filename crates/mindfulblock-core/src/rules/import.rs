//! CSV import.
//!
//! Accepted shape, one rule per line:
//!
//! ```text
//! Domain,Group,Mode
//! facebook.com,Social,hard
//! reddit.com,,friction
//! ```
//!
//! The header row is optional and matched case-insensitively. Blank lines
//! and lines starting with `#` are ignored. An empty group means
//! `General`, an empty mode means `hard`. Any malformed line fails the
//! whole file so nothing is half-imported.

use super::mode::BlockMode;
use super::store::ImportEntry;
use crate::domain::{is_valid_hostname, normalize};
use crate::error::{CoreError, Result};

/// Parse CSV text into import entries.
pub fn parse_csv(text: &str) -> Result<Vec<ImportEntry>> {
    let mut entries = Vec::new();
    let mut header_seen = false;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim().trim_start_matches('\u{feff}');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields = split_line(line).map_err(|message| CoreError::InvalidImport {
            line: line_no,
            message,
        })?;

        if !header_seen && entries.is_empty() && is_header(&fields) {
            header_seen = true;
            continue;
        }

        if fields.len() > 3 {
            return Err(CoreError::InvalidImport {
                line: line_no,
                message: format!("expected at most 3 columns, found {}", fields.len()),
            });
        }

        let domain = normalize(&fields[0]);
        if domain.is_empty() {
            return Err(CoreError::InvalidImport {
                line: line_no,
                message: "domain is empty".to_string(),
            });
        }
        if !is_valid_hostname(&domain) {
            return Err(CoreError::InvalidImport {
                line: line_no,
                message: format!("{domain:?} is not a valid hostname"),
            });
        }

        let group = fields
            .get(1)
            .map(|g| g.trim())
            .filter(|g| !g.is_empty())
            .map(String::from);

        let mode = match fields.get(2).map(|m| m.trim()) {
            None | Some("") => BlockMode::Hard,
            Some(m) => BlockMode::migrate(m).map_err(|e| CoreError::InvalidImport {
                line: line_no,
                message: e.to_string(),
            })?,
        };

        entries.push(ImportEntry {
            domain,
            group,
            mode,
        });
    }

    Ok(entries)
}

fn is_header(fields: &[String]) -> bool {
    fields
        .first()
        .is_some_and(|f| f.trim().eq_ignore_ascii_case("domain"))
}

/// Split one CSV record. Supports double-quoted fields with `""` escapes.
fn split_line(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current).trim().to_string());
            }
            _ => current.push(c),
        }
    }
    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(current.trim().to_string());
    Ok(fields)
}
