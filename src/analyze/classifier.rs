//! Hybrid classifier: AI categorization, then deterministic keyword rules.
//!
//! Order per item:
//! 1) AI categorize (failure => empty analysis: LOW / OTHER / not breaking)
//! 2) keyword tier escalation over title + content
//! 3) breaking = AI flag || breaking marker in title || severity >= HIGH
//! 4) head-of-state action in title bumps LOW to MEDIUM
//! 5) translate content when it looks non-English (failure => keep original)
//! 6) summary = AI summary, else first 200 chars of content

use chrono::{DateTime, Utc};
use metrics::counter;
use uuid::Uuid;

use crate::analyze::ai_adapter::{AiAnalysis, DynAi};
use crate::analyze::language::needs_translation;
use crate::analyze::rules::{HotReloadTiers, KeywordTiers};
use crate::model::{ClassifiedItem, RawItem, Severity};

const SUMMARY_FALLBACK_CHARS: usize = 200;

enum TierSource {
    Fixed(KeywordTiers),
    Hot(HotReloadTiers),
}

pub struct Classifier {
    ai: DynAi,
    tiers: TierSource,
}

impl Classifier {
    /// Tables come from a hot-reloaded file (built-ins while it is absent).
    pub fn new(ai: DynAi, tiers: HotReloadTiers) -> Self {
        Self {
            ai,
            tiers: TierSource::Hot(tiers),
        }
    }

    pub fn with_tiers(ai: DynAi, tiers: KeywordTiers) -> Self {
        Self {
            ai,
            tiers: TierSource::Fixed(tiers),
        }
    }

    fn tiers(&self) -> KeywordTiers {
        match &self.tiers {
            TierSource::Fixed(t) => t.clone(),
            TierSource::Hot(h) => h.current(),
        }
    }

    /// Never fails: AI problems degrade to rule-only results.
    pub async fn classify(&self, item: RawItem, now: DateTime<Utc>) -> ClassifiedItem {
        let tiers = self.tiers();

        let analysis = match self.ai.categorize(&item.title, &item.content).await {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(target: "classify", error = %e, provider = self.ai.provider_name(), url = %item.source_url, "AI categorize failed; rules only");
                counter!("classify_ai_fallback_total").increment(1);
                AiAnalysis::default()
            }
        };

        let combined = format!("{} {}", item.title, item.content);
        let mut severity = tiers.escalate(analysis.severity.unwrap_or_default(), &combined);

        let is_breaking = analysis.is_breaking
            || tiers.has_breaking_marker(&item.title)
            || severity >= Severity::High;

        if severity == Severity::Low && tiers.head_of_state_action(&item.title) {
            severity = Severity::Medium;
        }

        let content = self.normalize_language(&item).await;

        let summary = analysis
            .summary
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| fallback_summary(&item.content));

        ClassifiedItem {
            id: Uuid::new_v4(),
            title: item.title,
            content,
            summary,
            category: analysis.category.unwrap_or_default(),
            severity,
            is_breaking,
            platform: item.platform,
            source_url: item.source_url,
            source_name: item.source_name,
            published_at: item.published_at,
            image_url: item.image_url,
            sentiment: analysis.sentiment.unwrap_or_default(),
            keywords: analysis.keywords,
            entities: analysis.entities,
            created_at: now,
        }
    }

    async fn normalize_language(&self, item: &RawItem) -> String {
        if !needs_translation(&item.content) {
            return item.content.clone();
        }
        match self.ai.translate(&item.content).await {
            Ok(t) if !t.trim().is_empty() => {
                counter!("classify_translations_total").increment(1);
                t
            }
            Ok(_) => item.content.clone(),
            Err(e) => {
                tracing::warn!(target: "classify", error = %e, url = %item.source_url, "translation failed; keeping original content");
                item.content.clone()
            }
        }
    }
}

fn fallback_summary(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(SUMMARY_FALLBACK_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
