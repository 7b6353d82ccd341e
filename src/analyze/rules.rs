//! Severity keyword tiers (hot-reloaded from `config/severity_tiers.json`).
//!
//! The tables are data, evaluated in a fixed precedence:
//! CRITICAL > HIGH > MEDIUM > AI-provided severity. Matching is a
//! case-insensitive substring test. Tiers only ever raise severity.
//!
//! JSON shape (every field optional, missing ones keep the built-in list):
//! `{"critical": [..], "high": [..], "medium": [..], "breaking": [..],
//!   "head_of_state": [..], "action_verbs": [..]}`

use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::RwLock,
    time::SystemTime,
};

use crate::model::Severity;

const CRITICAL: &[&str] = &[
    "coup",
    "military action",
    "war",
    "armed conflict",
    "assassination",
    "regime change",
    "martial law",
    "state of emergency",
    "invasion",
    "terrorist attack",
    "major violence",
    "civil war",
];

const HIGH: &[&str] = &[
    "crisis",
    "major protest",
    "riot",
    "government collapse",
    "diplomatic crisis",
    "oil embargo",
    "border closure",
    "airport closure",
    "mass arrests",
    "humanitarian crisis",
    "food shortage",
    "power outage",
];

const MEDIUM: &[&str] = &[
    "election",
    "protest",
    "sanctions",
    "policy change",
    "economic reform",
    "trade restrictions",
    "diplomatic tension",
    "opposition leader",
    "international pressure",
    "human rights",
    "corruption investigation",
    "oil production",
    "inflation",
    "currency devaluation",
];

const BREAKING: &[&str] = &[
    "breaking",
    "just in",
    "developing",
    "urgent",
    "alert",
    "announced",
    "confirmed",
    "reports of",
    "happening now",
];

const HEAD_OF_STATE: &[&str] = &["maduro", "president"];

const ACTION_VERBS: &[&str] = &["announce", "order", "decree"];

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordTiers {
    pub critical: Vec<String>,
    pub high: Vec<String>,
    pub medium: Vec<String>,
    /// Breaking indicators; matched against the title only.
    pub breaking: Vec<String>,
    pub head_of_state: Vec<String>,
    pub action_verbs: Vec<String>,
}

impl Default for KeywordTiers {
    fn default() -> Self {
        Self {
            critical: owned(CRITICAL),
            high: owned(HIGH),
            medium: owned(MEDIUM),
            breaking: owned(BREAKING),
            head_of_state: owned(HEAD_OF_STATE),
            action_verbs: owned(ACTION_VERBS),
        }
    }
}

impl KeywordTiers {
    /// Highest tier whose keywords appear in `text`, if any.
    pub fn matched_tier(&self, text: &str) -> Option<Severity> {
        let t = text.to_lowercase();
        if contains_any(&t, &self.critical) {
            Some(Severity::Critical)
        } else if contains_any(&t, &self.high) {
            Some(Severity::High)
        } else if contains_any(&t, &self.medium) {
            Some(Severity::Medium)
        } else {
            None
        }
    }

    /// Escalate `ai` by the tier matched in `text`. Never lowers.
    pub fn escalate(&self, ai: Severity, text: &str) -> Severity {
        match self.matched_tier(text) {
            Some(tier) => ai.max(tier),
            None => ai,
        }
    }

    pub fn has_breaking_marker(&self, title: &str) -> bool {
        contains_any(&title.to_lowercase(), &self.breaking)
    }

    /// Title names the head of state (or "president") together with an action verb.
    pub fn head_of_state_action(&self, title: &str) -> bool {
        let t = title.to_lowercase();
        contains_any(&t, &self.head_of_state) && contains_any(&t, &self.action_verbs)
    }
}

fn contains_any(lowered: &str, keywords: &[String]) -> bool {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .any(|k| !k.is_empty() && lowered.contains(k.as_str()))
}

#[derive(Debug)]
pub struct HotReloadTiers {
    path: PathBuf,
    inner: RwLock<State>,
}

#[derive(Debug)]
struct State {
    tiers: KeywordTiers,
    last_modified: Option<SystemTime>,
}

impl HotReloadTiers {
    pub fn new(path: Option<&Path>) -> Self {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("config/severity_tiers.json"));
        Self {
            path,
            inner: RwLock::new(State {
                tiers: KeywordTiers::default(),
                last_modified: None,
            }),
        }
    }

    /// Current tables; re-reads the file when its mtime changed. A missing
    /// or invalid file keeps the previous (initially built-in) tables.
    pub fn current(&self) -> KeywordTiers {
        let mtime = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(m) => m,
            Err(_) => return self.snapshot(),
        };

        let stale = match self.inner.read() {
            Ok(g) => g.last_modified != Some(mtime),
            Err(_) => return KeywordTiers::default(),
        };
        if !stale {
            return self.snapshot();
        }

        let Ok(mut guard) = self.inner.write() else {
            return KeywordTiers::default();
        };
        if guard.last_modified != Some(mtime) {
            match load_tiers_file(&self.path) {
                Ok(tiers) => {
                    tracing::info!(target: "classify", path = %self.path.display(), "severity tiers reloaded");
                    guard.tiers = tiers;
                }
                Err(e) => {
                    tracing::warn!(target: "classify", error = %e, path = %self.path.display(), "invalid severity tiers file; keeping previous tables");
                }
            }
            guard.last_modified = Some(mtime);
        }
        guard.tiers.clone()
    }

    fn snapshot(&self) -> KeywordTiers {
        self.inner
            .read()
            .map(|g| g.tiers.clone())
            .unwrap_or_default()
    }
}

pub fn load_tiers_file(path: &Path) -> io::Result<KeywordTiers> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
