// src/ai_bootstrap.rs
use crate::analyze::ai_adapter::{build_ai_service, DynAi};
use crate::config::ai::AiConfig;
use tracing::{info, warn};

pub struct AiRuntime {
    pub cfg: AiConfig,
    pub service: DynAi,
}

impl AiRuntime {
    pub fn from_config(cfg: AiConfig) -> Self {
        // Safe diagnostics: only provider + enabled + key length
        info!(
            "AI cfg loaded: provider={}, model={}, enabled={}, key_len={}",
            cfg.provider,
            cfg.model,
            cfg.enabled,
            cfg.api_key.len()
        );
        let service = build_ai_service(&cfg);
        Self { cfg, service }
    }

    /// Missing or unreadable config falls back to AI disabled.
    pub fn from_path(path: &str) -> Self {
        Self::from_config(AiConfig::load_or_disabled(path))
    }

    /// One categorize call on a canned headline; logs the outcome, never fails.
    pub async fn quick_probe(&self) {
        if !self.cfg.enabled {
            warn!("AI quick_probe skipped: AI is disabled in config");
            return;
        }
        let out = self
            .service
            .categorize(
                "Government announces new currency controls",
                "The central bank said exchange limits take effect next week.",
            )
            .await;
        match out {
            Ok(a) => info!(category = ?a.category, severity = ?a.severity, "AI quick_probe ok"),
            Err(e) => warn!(error = %e, provider = self.service.provider_name(), "AI quick_probe failed"),
        }
    }
}
