//! Wire formats shared by the companion endpoint and the extension side.
//!
//! - rule list (`GET /rules`): legacy `["a.com", ...]` or
//!   `{ "rules": [{ "domain", "mode" }], "language" }`
//! - block page query: `url=<base64 target>&mode=<mode>&lang=<lang>`

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::domain::normalize;
use crate::language::Language;
use crate::rules::{BlockMode, RuleStore};

/// Path of the static block page, relative to the extension root.
pub const BLOCK_PAGE_PATH: &str = "blocked.html";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub domain: String,
    #[serde(default = "legacy_mode")]
    pub mode: BlockMode,
}

fn legacy_mode() -> BlockMode {
    BlockMode::FrictionMath
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleList {
    pub rules: Vec<RuleEntry>,
    #[serde(default)]
    pub language: Language,
}

impl RuleList {
    /// Build the endpoint payload: active rules only, nothing at all when
    /// blocking is switched off.
    pub fn from_store(store: &RuleStore, blocking_enabled: bool, language: Language) -> Self {
        let rules = if blocking_enabled {
            store
                .active_rules()
                .map(|r| RuleEntry {
                    domain: r.domain.clone(),
                    mode: r.mode,
                })
                .collect()
        } else {
            Vec::new()
        };
        Self { rules, language }
    }
}

/// Either shape the rule-list endpoint has ever returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleListResponse {
    Legacy(Vec<String>),
    Structured(RuleList),
}

impl RuleListResponse {
    /// Canonical form. Legacy entries become `friction_math` rules and the
    /// language defaults to Vietnamese. Domains are re-normalized and
    /// empty ones dropped.
    pub fn into_rule_list(self) -> RuleList {
        let mut list = match self {
            RuleListResponse::Legacy(domains) => RuleList {
                rules: domains
                    .into_iter()
                    .map(|domain| RuleEntry {
                        domain,
                        mode: legacy_mode(),
                    })
                    .collect(),
                language: Language::default(),
            },
            RuleListResponse::Structured(list) => list,
        };
        for rule in &mut list.rules {
            rule.domain = normalize(&rule.domain);
        }
        list.rules.retain(|r| !r.domain.is_empty());
        list
    }
}

/// Query parameters handed to the block page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPageParams {
    pub target_url: String,
    pub mode: BlockMode,
    pub language: Language,
}

impl BlockPageParams {
    pub fn to_query(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("url", &STANDARD.encode(self.target_url.as_bytes()))
            .append_pair("mode", self.mode.as_str())
            .append_pair("lang", self.language.as_str())
            .finish()
    }

    /// `blocked.html?url=...`, relative to the extension root.
    pub fn to_page_url(&self) -> String {
        format!("{BLOCK_PAGE_PATH}?{}", self.to_query())
    }

    /// Parse a block page query string (leading `?` optional).
    ///
    /// `url` that is not valid base64 is taken verbatim, a missing or
    /// unknown `mode` means `friction_math`, a missing `lang` means
    /// Vietnamese and an unknown one English.
    pub fn from_query(query: &str) -> Self {
        let mut target_url = String::new();
        let mut mode = None;
        let mut language = None;

        for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match key.as_ref() {
                "url" => target_url = decode_target(&value),
                "mode" => mode = BlockMode::migrate(&value).ok(),
                "lang" => language = Some(Language::from_code(&value)),
                _ => {}
            }
        }

        Self {
            target_url,
            mode: mode.unwrap_or(BlockMode::FrictionMath),
            language: language.unwrap_or_default(),
        }
    }

    /// Hostname the override will be granted for.
    pub fn hostname(&self) -> String {
        normalize(&self.target_url)
    }
}

fn decode_target(raw: &str) -> String {
    STANDARD
        .decode(raw.as_bytes())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| raw.to_string())
}
