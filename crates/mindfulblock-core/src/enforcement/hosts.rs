//! Hosts-file enforcement.
//!
//! Owns a section of the hosts file between two marker lines and rewrites
//! only that section; everything outside it is preserved byte for byte
//! (modulo trailing blank lines).

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{EnforcementRequest, EnforcementSink};
use crate::domain::{is_valid_hostname, normalize};
use crate::error::{CoreError, Result};

pub const SECTION_START: &str = "# MINDFULBLOCK_START";
pub const SECTION_END: &str = "# MINDFULBLOCK_END";

pub struct HostsFileSink {
    path: PathBuf,
    flush_dns: bool,
}

impl HostsFileSink {
    /// Sink for the platform hosts file.
    pub fn system() -> Self {
        Self {
            path: system_hosts_path(),
            flush_dns: cfg!(target_os = "windows"),
        }
    }

    /// Sink for an arbitrary file (tests, custom setups). Never flushes DNS.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            flush_dns: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Domains currently inside the managed section.
    pub fn applied_domains(&self) -> Result<Vec<String>> {
        let content = self.read_existing()?;
        let mut domains = Vec::new();
        let mut in_section = false;
        for line in content.lines() {
            if line.contains(SECTION_START) {
                in_section = true;
            } else if line.contains(SECTION_END) {
                in_section = false;
            } else if in_section && line.starts_with("127.0.0.1 ") {
                if let Some(host) = line.split_whitespace().nth(1) {
                    if !host.starts_with("www.") {
                        domains.push(host.to_string());
                    }
                }
            }
        }
        Ok(domains)
    }

    fn read_existing(&self) -> Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(self.map_io(e)),
        }
    }

    fn write(&self, content: &str) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| self.map_io(e))?;
        file.write_all(content.as_bytes()).map_err(|e| self.map_io(e))?;
        file.sync_all().map_err(|e| self.map_io(e))?;
        if self.flush_dns {
            flush_dns_cache();
        }
        Ok(())
    }

    fn map_io(&self, e: io::Error) -> CoreError {
        if e.kind() == io::ErrorKind::PermissionDenied {
            CoreError::AdminPrivilegeRequired {
                path: self.path.clone(),
            }
        } else {
            CoreError::Io(e)
        }
    }
}

impl EnforcementSink for HostsFileSink {
    fn apply(&self, request: &EnforcementRequest) -> Result<()> {
        let existing = self.read_existing()?;
        let mut content = strip_section(&existing);

        content.push_str("\n\n");
        content.push_str(SECTION_START);
        content.push('\n');
        for rule in request.rules.iter().filter(|r| r.is_active) {
            let domain = normalize(&rule.domain);
            if !is_valid_hostname(&domain) {
                warn!(domain = ?domain, "not a hostname; left out of the hosts file");
                continue;
            }
            content.push_str(&format!("127.0.0.1 {domain}\n"));
            content.push_str(&format!("127.0.0.1 www.{domain}\n"));
            content.push_str(&format!("::1 {domain}\n"));
            content.push_str(&format!("::1 www.{domain}\n"));
        }
        content.push_str(SECTION_END);
        content.push('\n');

        self.write(&content)?;
        info!(path = %self.path.display(), active = request.active_count(), "hosts file updated");
        Ok(())
    }

    fn clean(&self) -> Result<()> {
        let existing = self.read_existing()?;
        if !existing.contains(SECTION_START) {
            debug!(path = %self.path.display(), "no managed section to remove");
            return Ok(());
        }
        let mut content = strip_section(&existing);
        content.push('\n');
        self.write(&content)?;
        info!(path = %self.path.display(), "managed hosts section removed");
        Ok(())
    }
}

/// Content with the managed section removed and trailing whitespace trimmed.
fn strip_section(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut in_section = false;
    for line in content.lines() {
        if line.contains(SECTION_START) {
            in_section = true;
            continue;
        }
        if line.contains(SECTION_END) {
            in_section = false;
            continue;
        }
        if !in_section {
            out.push_str(line);
            out.push('\n');
        }
    }
    out.trim_end().to_string()
}

fn system_hosts_path() -> PathBuf {
    if cfg!(target_os = "windows") {
        let win_dir = std::env::var("WinDir").unwrap_or_else(|_| "C:\\Windows".to_string());
        let sysnative = PathBuf::from(&win_dir).join("sysnative\\drivers\\etc\\hosts");
        if sysnative.exists() {
            sysnative
        } else {
            PathBuf::from(win_dir).join("System32\\drivers\\etc\\hosts")
        }
    } else {
        PathBuf::from("/etc/hosts")
    }
}

fn flush_dns_cache() {
    match std::process::Command::new("ipconfig").arg("/flushdns").status() {
        Ok(status) if status.success() => debug!("DNS cache flushed"),
        Ok(status) => warn!(%status, "ipconfig /flushdns failed"),
        Err(e) => warn!(error = %e, "could not run ipconfig /flushdns"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enforcement::EnforcedRule;
    use crate::language::Language;
    use tempfile::TempDir;

    fn request(rules: &[(&str, bool)]) -> EnforcementRequest {
        EnforcementRequest {
            rules: rules
                .iter()
                .map(|(d, a)| EnforcedRule {
                    domain: d.to_string(),
                    is_active: *a,
                })
                .collect(),
            language: Language::Vi,
        }
    }

    #[test]
    fn apply_writes_managed_section_and_preserves_rest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hosts");
        fs::write(&path, "127.0.0.1 localhost\n10.0.0.2 nas.lan\n").unwrap();
        let sink = HostsFileSink::at(&path);

        sink.apply(&request(&[("www.YouTube.com", true), ("reddit.com", false)]))
            .unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("127.0.0.1 localhost\n10.0.0.2 nas.lan\n"));
        assert!(content.contains("127.0.0.1 youtube.com\n"));
        assert!(content.contains("127.0.0.1 www.youtube.com\n"));
        assert!(content.contains("::1 youtube.com\n"));
        assert!(content.contains("::1 www.youtube.com\n"));
        assert!(!content.contains("reddit.com"));
        assert_eq!(sink.applied_domains().unwrap(), vec!["youtube.com"]);
    }

    #[test]
    fn invalid_domains_never_reach_the_hosts_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hosts");
        fs::write(&path, "127.0.0.1 localhost\n").unwrap();
        let sink = HostsFileSink::at(&path);

        sink.apply(&request(&[
            ("evil.com\n10.6.6.6 bank.com", true),
            ("not a domain", true),
            ("ok.com", true),
        ]))
        .unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("bank.com"), "injected hosts line:\n{content}");
        assert!(!content.contains("not a domain"));
        let section: Vec<&str> = content
            .lines()
            .skip_while(|l| *l != SECTION_START)
            .skip(1)
            .take_while(|l| *l != SECTION_END)
            .collect();
        assert_eq!(
            section,
            vec!["127.0.0.1 ok.com", "127.0.0.1 www.ok.com", "::1 ok.com", "::1 www.ok.com"]
        );
    }

    #[test]
    fn reapply_replaces_section_instead_of_appending() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hosts");
        let sink = HostsFileSink::at(&path);

        sink.apply(&request(&[("a.com", true)])).unwrap();
        sink.apply(&request(&[("b.com", true)])).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches(SECTION_START).count(), 1);
        assert!(!content.contains("a.com"));
        assert_eq!(sink.applied_domains().unwrap(), vec!["b.com"]);
    }

    #[test]
    fn clean_removes_only_managed_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hosts");
        fs::write(&path, "127.0.0.1 localhost\n").unwrap();
        let sink = HostsFileSink::at(&path);
        sink.apply(&request(&[("a.com", true)])).unwrap();
        sink.clean().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "127.0.0.1 localhost\n");
        sink.clean().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn read_only_file_maps_to_admin_required() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hosts");
        fs::write(&path, "").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o444)).unwrap();

        // root ignores file permissions; nothing to assert then
        if fs::OpenOptions::new().write(true).open(&path).is_ok() {
            return;
        }
        let err = HostsFileSink::at(&path)
            .apply(&request(&[("a.com", true)]))
            .unwrap_err();
        assert!(err.is_admin_required());
        assert!(err.to_string().starts_with("ADMIN_REQUIRED"));
    }
}
