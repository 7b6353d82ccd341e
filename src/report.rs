//! # Daily report synthesis
//! Aggregates one calendar day (UTC) of classified items into a
//! [`DailyReport`]: category buckets, AI trend analysis with a fixed
//! fallback, and per-enum statistics over the whole eligible set.
//!
//! Regenerate-on-request: an existing report for the date is replaced, but
//! only once a new one has been computed. An empty window writes nothing.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analyze::ai_adapter::{DynAi, TrendAnalysis, TrendInput};
use crate::model::{Analysis, Category, ClassifiedItem, DailyReport, Statistics};
use crate::store::{Store, StoreError};

/// Below this many items in the day window, the trailing 24h is considered too.
const MIN_WINDOW_ITEMS: usize = 10;
const TRAILING_LIMIT: usize = 50;
const BUCKET_CAP: usize = 10;
const TREND_INPUT_CAP: usize = 50;
pub const DEFAULT_RECENT_REPORTS: usize = 7;

const FALLBACK_TRENDS: &[&str] = &[
    "Ongoing political tensions and government actions",
    "International sanctions and their economic impact",
    "Social movements and civil society activities",
    "Regional and international diplomatic developments",
    "Economic challenges and humanitarian concerns",
];

const FALLBACK_IMPLICATIONS: &[&str] = &[
    "Continued political instability affecting business operations",
    "Economic sanctions impacting trade and investment",
    "Humanitarian situation requiring monitoring",
    "Regional security considerations",
    "International relations affecting diplomatic engagement",
];

const FALLBACK_RECOMMENDATIONS: &[&str] = &[
    "Monitor political developments closely for operational impacts",
    "Assess economic sanctions compliance requirements",
    "Maintain situational awareness of security conditions",
];

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("reports_generated_total", "Daily reports written.");
        describe_counter!(
            "reports_ai_fallback_total",
            "Reports that used the templated analysis."
        );
    });
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no report for {0}")]
    NotFound(NaiveDate),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A stored report with its bucket references resolved to items.
#[derive(Debug, Clone, Serialize)]
pub struct PopulatedReport {
    #[serde(flatten)]
    pub report: DailyReport,
    pub key_event_items: Vec<ClassifiedItem>,
    pub political_update_items: Vec<ClassifiedItem>,
    pub economic_situation_items: Vec<ClassifiedItem>,
    pub social_issue_items: Vec<ClassifiedItem>,
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Last representable instant of `date`; the window is inclusive. Built
/// from the date itself so `NaiveDate::MAX` does not overflow.
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN);
    date.and_time(last).and_utc()
}

/// Templated analysis used when the AI call fails. Reproducible for the
/// same inputs.
pub fn fallback_analysis(topic: &str, date: NaiveDate, item_count: usize) -> TrendAnalysis {
    let own = |l: &[&str]| l.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    TrendAnalysis {
        summary: format!(
            "Daily intelligence report for {}. Collected {} items from multiple sources \
including news agencies, social media, and RSS feeds. Key focus areas include political \
developments, economic indicators, and social movements in {}.",
            date.format("%a %b %d %Y"),
            item_count,
            topic
        ),
        trends: own(FALLBACK_TRENDS),
        implications: own(FALLBACK_IMPLICATIONS),
        recommendations: own(FALLBACK_RECOMMENDATIONS),
    }
}

fn bucket(items: &[ClassifiedItem], category: Category) -> Vec<Uuid> {
    items
        .iter()
        .filter(|it| it.category == category)
        .take(BUCKET_CAP)
        .map(|it| it.id)
        .collect()
}

pub struct ReportSynthesizer {
    store: Arc<dyn Store>,
    ai: DynAi,
    topic: String,
}

impl ReportSynthesizer {
    pub fn new(store: Arc<dyn Store>, ai: DynAi, topic: impl Into<String>) -> Self {
        Self {
            store,
            ai,
            topic: topic.into(),
        }
    }

    pub async fn generate(&self, date: NaiveDate) -> Result<Option<DailyReport>, ReportError> {
        self.generate_at(date, Utc::now()).await
    }

    /// `now` anchors the trailing-24h fallback window.
    pub async fn generate_at(
        &self,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Option<DailyReport>, ReportError> {
        ensure_metrics_described();
        info!(target: "report", %date, "generating daily report");

        let items = self.eligible_items(date, now).await?;
        if items.is_empty() {
            info!(target: "report", %date, "no items for this date; no report");
            return Ok(None);
        }

        let trend_inputs: Vec<TrendInput> = items
            .iter()
            .take(TREND_INPUT_CAP)
            .map(|it| TrendInput {
                title: it.title.clone(),
                summary: it.summary.clone(),
                category: it.category,
                severity: it.severity,
            })
            .collect();

        let analysis = match self.ai.analyze_trends(&trend_inputs).await {
            Ok(a) => a,
            Err(e) => {
                warn!(target: "report", error = %e, "AI analysis failed, using fallback");
                counter!("reports_ai_fallback_total").increment(1);
                fallback_analysis(&self.topic, date, items.len())
            }
        };

        let report = DailyReport {
            id: Uuid::new_v4(),
            date,
            summary: analysis.summary,
            key_events: bucket(&items, Category::KeyEvents),
            political_updates: bucket(&items, Category::Political),
            economic_situation: bucket(&items, Category::Economic),
            social_issues: bucket(&items, Category::Social),
            analysis: Analysis {
                trends: analysis.trends,
                implications: analysis.implications,
                recommendations: analysis.recommendations,
            },
            statistics: Statistics::from_items(&items),
            created_at: now,
        };

        self.store.replace_report(report.clone()).await?;
        counter!("reports_generated_total").increment(1);
        info!(target: "report", %date, items = items.len(), "daily report generated");
        Ok(Some(report))
    }

    /// Day window by publication time; if thin, the trailing 24h by creation
    /// time. Whichever set is larger wins (no union).
    async fn eligible_items(
        &self,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<ClassifiedItem>, StoreError> {
        let window = self
            .store
            .items_published_between(start_of_day(date), end_of_day(date))
            .await?;
        if window.len() >= MIN_WINDOW_ITEMS {
            return Ok(window);
        }

        let recent = self
            .store
            .items_created_since(now - Duration::hours(24), TRAILING_LIMIT)
            .await?;
        Ok(if recent.len() > window.len() {
            recent
        } else {
            window
        })
    }

    /// Lookup only; a miss is [`ReportError::NotFound`].
    pub async fn get_report(&self, date: NaiveDate) -> Result<PopulatedReport, ReportError> {
        let report = self
            .store
            .find_report_by_date(date)
            .await?
            .ok_or(ReportError::NotFound(date))?;
        self.populate(report).await
    }

    pub async fn recent_reports(&self, limit: usize) -> Result<Vec<PopulatedReport>, ReportError> {
        let mut out = Vec::new();
        for r in self.store.recent_reports(limit).await? {
            out.push(self.populate(r).await?);
        }
        Ok(out)
    }

    async fn populate(&self, report: DailyReport) -> Result<PopulatedReport, ReportError> {
        Ok(PopulatedReport {
            key_event_items: self.store.items_by_ids(&report.key_events).await?,
            political_update_items: self.store.items_by_ids(&report.political_updates).await?,
            economic_situation_items: self.store.items_by_ids(&report.economic_situation).await?,
            social_issue_items: self.store.items_by_ids(&report.social_issues).await?,
            report,
        })
    }
}
