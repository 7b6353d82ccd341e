//! AI adapter: capability trait + OpenAI provider + file cache + daily limit.
//!
//! Every method may fail. Callers own the deterministic fallback; nothing in
//! here retries or substitutes defaults on their behalf.

use std::fs;
use std::future::Future;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::ai::AiConfig;
use crate::model::{Category, Entities, Sentiment, Severity};

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Per-item categorization returned by the AI capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AiAnalysis {
    pub summary: Option<String>,
    pub category: Option<Category>,
    pub severity: Option<Severity>,
    pub is_breaking: bool,
    pub sentiment: Option<Sentiment>,
    pub keywords: Vec<String>,
    pub entities: Entities,
}

/// Compact item view sent for daily trend analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrendInput {
    pub title: String,
    pub summary: String,
    pub category: Category,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrendAnalysis {
    pub summary: String,
    #[serde(default)]
    pub trends: Vec<String>,
    #[serde(default)]
    pub implications: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[async_trait]
pub trait AiService: Send + Sync {
    async fn categorize(&self, title: &str, content: &str) -> Result<AiAnalysis>;
    /// Translate `text` into English.
    async fn translate(&self, text: &str) -> Result<String>;
    async fn analyze_trends(&self, items: &[TrendInput]) -> Result<TrendAnalysis>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynAi = Arc<dyn AiService>;

/// Factory: build the AI service according to config and environment.
///
/// * `AI_TEST_MODE=mock` returns the deterministic [`MockAi`].
/// * `enabled == false`, an unknown provider or a missing key yields [`DisabledAi`].
/// * Otherwise OpenAI wrapped with caching + daily limit.
pub fn build_ai_service(config: &AiConfig) -> DynAi {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockAi::default());
    }

    if !config.enabled {
        return Arc::new(DisabledAi);
    }

    match config.provider.as_str() {
        "openai" if !config.api_key.is_empty() => {
            match OpenAiProvider::new(config.api_key.clone(), &config.model) {
                Ok(provider) => Arc::new(CachingClient::new(
                    provider,
                    config.cache_dir.clone(),
                    config.daily_limit,
                )),
                Err(e) => {
                    tracing::warn!(error = ?e, "openai client init failed; AI disabled");
                    Arc::new(DisabledAi)
                }
            }
        }
        "openai" => {
            tracing::warn!("OPENAI_API_KEY missing; AI disabled");
            Arc::new(DisabledAi)
        }
        other => {
            tracing::warn!(provider = other, "unsupported AI provider; AI disabled");
            Arc::new(DisabledAi)
        }
    }
}

// ------------------------------------------------------------
// OpenAI provider
// ------------------------------------------------------------

const CATEGORIZE_PROMPT: &str = "You are an intelligence analyst. Classify the news item. \
Respond with a JSON object only: {\"summary\": string (<= 2 sentences, English), \
\"category\": \"KEY_EVENTS\"|\"POLITICAL\"|\"ECONOMIC\"|\"SOCIAL\"|\"OTHER\", \
\"severity\": \"LOW\"|\"MEDIUM\"|\"HIGH\"|\"CRITICAL\", \"isBreaking\": boolean, \
\"sentiment\": \"positive\"|\"negative\"|\"neutral\", \"keywords\": [string], \
\"entities\": {\"people\": [string], \"organizations\": [string], \"locations\": [string]}}";

const TRANSLATE_PROMPT: &str =
    "Translate the user's text into English. Output only the translation, no commentary.";

const TRENDS_PROMPT: &str = "You are an intelligence analyst writing a daily briefing. \
The user sends a JSON array of classified news items. Respond with a JSON object only: \
{\"summary\": string (one paragraph), \"trends\": [string], \"implications\": [string], \
\"recommendations\": [string]}";

/// OpenAI Chat Completions provider.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("situation-monitor/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building openai http client")?;
        Ok(Self {
            http,
            api_key,
            model: model.to_string(),
        })
    }

    async fn chat(&self, system: &str, user: &str, json_mode: bool) -> Result<String> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct ResponseFormat {
            #[serde(rename = "type")]
            kind: &'static str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            #[serde(skip_serializing_if = "Option::is_none")]
            response_format: Option<ResponseFormat>,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: Option<String>,
        }

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: system,
                },
                Msg {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.2,
            response_format: json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("openai request")?
            .error_for_status()
            .context("openai non-2xx")?;

        let body: Resp = resp.json().await.context("openai response body")?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("openai returned no content"))
    }
}

/// Shape the model is asked to produce; enum values are parsed leniently.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct WireAnalysis {
    summary: Option<String>,
    category: Option<String>,
    severity: Option<String>,
    is_breaking: bool,
    sentiment: Option<String>,
    keywords: Vec<String>,
    entities: Entities,
}

fn parse_category(s: &str) -> Option<Category> {
    match s.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
        "KEY_EVENTS" => Some(Category::KeyEvents),
        "POLITICAL" => Some(Category::Political),
        "ECONOMIC" => Some(Category::Economic),
        "SOCIAL" => Some(Category::Social),
        "OTHER" => Some(Category::Other),
        _ => None,
    }
}

fn parse_severity(s: &str) -> Option<Severity> {
    match s.trim().to_ascii_uppercase().as_str() {
        "LOW" => Some(Severity::Low),
        "MEDIUM" => Some(Severity::Medium),
        "HIGH" => Some(Severity::High),
        "CRITICAL" => Some(Severity::Critical),
        _ => None,
    }
}

fn parse_sentiment(s: &str) -> Option<Sentiment> {
    match s.trim().to_ascii_lowercase().as_str() {
        "positive" => Some(Sentiment::Positive),
        "negative" => Some(Sentiment::Negative),
        "neutral" => Some(Sentiment::Neutral),
        _ => None,
    }
}

/// Parse the model's JSON answer into an [`AiAnalysis`].
pub fn parse_analysis(json: &str) -> Result<AiAnalysis> {
    let w: WireAnalysis = serde_json::from_str(json).context("categorize: invalid JSON")?;
    Ok(AiAnalysis {
        summary: w.summary.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        category: w.category.as_deref().and_then(parse_category),
        severity: w.severity.as_deref().and_then(parse_severity),
        is_breaking: w.is_breaking,
        sentiment: w.sentiment.as_deref().and_then(parse_sentiment),
        keywords: w.keywords,
        entities: w.entities,
    })
}

#[async_trait]
impl AiService for OpenAiProvider {
    async fn categorize(&self, title: &str, content: &str) -> Result<AiAnalysis> {
        let user = format!("Title: {title}\n\nContent: {content}");
        let raw = self.chat(CATEGORIZE_PROMPT, &user, true).await?;
        parse_analysis(&raw)
    }

    async fn translate(&self, text: &str) -> Result<String> {
        self.chat(TRANSLATE_PROMPT, text, false).await
    }

    async fn analyze_trends(&self, items: &[TrendInput]) -> Result<TrendAnalysis> {
        let user = serde_json::to_string(items)?;
        let raw = self.chat(TRENDS_PROMPT, &user, true).await?;
        let out: TrendAnalysis = serde_json::from_str(&raw).context("trends: invalid JSON")?;
        if out.summary.trim().is_empty() {
            bail!("trends: empty summary");
        }
        Ok(out)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Disabled + mock
// ------------------------------------------------------------

/// Fails every call; the pipeline runs on deterministic fallbacks.
pub struct DisabledAi;

#[async_trait]
impl AiService for DisabledAi {
    async fn categorize(&self, _title: &str, _content: &str) -> Result<AiAnalysis> {
        bail!("AI disabled")
    }
    async fn translate(&self, _text: &str) -> Result<String> {
        bail!("AI disabled")
    }
    async fn analyze_trends(&self, _items: &[TrendInput]) -> Result<TrendAnalysis> {
        bail!("AI disabled")
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic AI for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct MockAi {
    pub analysis: AiAnalysis,
    pub trends: TrendAnalysis,
    /// When set, every call fails.
    pub fail: bool,
}

impl MockAi {
    pub fn new(analysis: AiAnalysis) -> Self {
        Self {
            analysis,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn with_trends(mut self, trends: TrendAnalysis) -> Self {
        self.trends = trends;
        self
    }
}

#[async_trait]
impl AiService for MockAi {
    async fn categorize(&self, _title: &str, _content: &str) -> Result<AiAnalysis> {
        if self.fail {
            bail!("mock AI failure");
        }
        Ok(self.analysis.clone())
    }
    async fn translate(&self, text: &str) -> Result<String> {
        if self.fail {
            bail!("mock AI failure");
        }
        Ok(format!("[EN] {text}"))
    }
    async fn analyze_trends(&self, items: &[TrendInput]) -> Result<TrendAnalysis> {
        if self.fail {
            bail!("mock AI failure");
        }
        let mut out = self.trends.clone();
        if out.summary.is_empty() {
            out.summary = format!("Mock analysis of {} items.", items.len());
        }
        Ok(out)
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Caching client wrapper (file cache + daily limit)
// ------------------------------------------------------------

/// Counter state is guarded by a `Mutex`; the cache is plain JSON files.
pub struct CachingClient<P: AiService> {
    inner: P,
    cache_dir: PathBuf,
    daily_limit_max: u32,
    counter: Arc<Mutex<DailyCounter>>,
}

impl<P: AiService> CachingClient<P> {
    pub fn new(inner: P, cache_dir: PathBuf, daily_limit_max: u32) -> Self {
        let _ = fs::create_dir_all(&cache_dir); // best-effort
        let counter = Arc::new(Mutex::new(
            load_daily_counter(&cache_dir).unwrap_or_default(),
        ));
        Self {
            inner,
            cache_dir,
            daily_limit_max,
            counter,
        }
    }

    /// Cache hits never count against the limit; successful real calls do.
    /// A slot is reserved under the lock before the call and handed back if
    /// the call fails, so concurrent callers cannot overshoot the limit.
    async fn cached<T, F>(&self, kind: &str, input: &str, call: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: Future<Output = Result<T>>,
    {
        let key = cache_key(kind, input);
        if let Some(hit) = read_cache_file::<T>(&self.cache_dir, &key) {
            return Ok(hit);
        }

        self.reserve_slot()?;
        match call.await {
            Ok(fresh) => {
                let _ = write_cache_file(&self.cache_dir, &key, &fresh);
                Ok(fresh)
            }
            Err(e) => {
                self.release_slot();
                Err(e)
            }
        }
    }

    fn reserve_slot(&self) -> Result<()> {
        let mut g = self
            .counter
            .lock()
            .map_err(|_| anyhow!("AI daily counter poisoned"))?;
        if g.is_expired() {
            g.reset_to_today();
        }
        if g.count >= self.daily_limit_max {
            bail!("daily AI limit of {} calls reached", self.daily_limit_max);
        }
        g.count += 1;
        let _ = save_daily_counter(&self.cache_dir, &g);
        Ok(())
    }

    fn release_slot(&self) {
        if let Ok(mut g) = self.counter.lock() {
            g.count = g.count.saturating_sub(1);
            let _ = save_daily_counter(&self.cache_dir, &g);
        }
    }
}

#[async_trait]
impl<P: AiService> AiService for CachingClient<P> {
    async fn categorize(&self, title: &str, content: &str) -> Result<AiAnalysis> {
        let input = format!("{title}\n{content}");
        self.cached("categorize", &input, self.inner.categorize(title, content))
            .await
    }

    async fn translate(&self, text: &str) -> Result<String> {
        self.cached("translate", text, self.inner.translate(text))
            .await
    }

    async fn analyze_trends(&self, items: &[TrendInput]) -> Result<TrendAnalysis> {
        let input = serde_json::to_string(items)?;
        self.cached("trends", &input, self.inner.analyze_trends(items))
            .await
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }
}

// ------------------------------------------------------------
// File cache helpers
// ------------------------------------------------------------

fn cache_key(kind: &str, input: &str) -> String {
    let mut h = Sha256::new();
    h.update(kind.as_bytes());
    h.update([0u8]);
    h.update(input.as_bytes());
    h.finalize()
        .iter()
        .take(16)
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file<T: DeserializeOwned>(dir: &Path, key: &str) -> Option<T> {
    let buf = fs::read_to_string(cache_path(dir, key)).ok()?;
    serde_json::from_str(&buf).ok()
}

fn write_cache_file<T: Serialize>(dir: &Path, key: &str, value: &T) -> io::Result<()> {
    let path = cache_path(dir, key);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut f = fs::File::create(&tmp)?;
    f.write_all(json.as_bytes())?;
    fs::rename(tmp, path)?;
    Ok(())
}

// ------------------------------------------------------------
// Daily counter helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCounter {
    date: String,
    count: u32,
}
impl Default for DailyCounter {
    fn default() -> Self {
        Self {
            date: today(),
            count: 0,
        }
    }
}
impl DailyCounter {
    fn is_expired(&self) -> bool {
        self.date != today()
    }
    fn reset_to_today(&mut self) {
        self.date = today();
        self.count = 0;
    }
}

fn today() -> String {
    chrono::Utc::now().date_naive().to_string()
}

fn counter_path(dir: &Path) -> PathBuf {
    dir.join("daily_count.json")
}

fn load_daily_counter(dir: &Path) -> io::Result<DailyCounter> {
    let s = fs::read_to_string(counter_path(dir))?;
    serde_json::from_str(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn save_daily_counter(dir: &Path, dc: &DailyCounter) -> io::Result<()> {
    let p = counter_path(dir);
    let tmp = p.with_extension("json.tmp");
    let s = serde_json::to_string(dc).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut f = fs::File::create(&tmp)?;
    f.write_all(s.as_bytes())?;
    fs::rename(tmp, p)?;
    Ok(())
}
