//! Situation Monitor: binary entrypoint
//! Boots the Axum HTTP server, wires the monitoring pipeline, and starts the
//! cycle scheduler plus the daily report task.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use situation_monitor::ai_bootstrap::AiRuntime;
use situation_monitor::config::{ai::DEFAULT_AI_CONFIG_PATH, MonitorConfig};
use situation_monitor::metrics::Metrics;
use situation_monitor::App;

/// `RUST_LOG` wins; otherwise crate logs at info, everything else at warn.
/// `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("situation_monitor=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    // Shuttle may have installed a subscriber already; ignore that case.
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = MonitorConfig::load_default()?;
    tracing::info!(
        topic = %config.topic,
        interval_secs = config.cycle_interval_secs,
        report_hour_utc = config.report_hour_utc,
        "monitor config loaded"
    );

    let ai_path =
        std::env::var("AI_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_AI_CONFIG_PATH.to_string());
    let ai = AiRuntime::from_path(&ai_path);
    if std::env::var("AI_QUICK_PROBE").is_ok_and(|v| v == "1") {
        ai.quick_probe().await;
    }

    let metrics = Metrics::init(config.cycle_interval_secs)?;

    let app = App::build(config, ai.service.clone())?;
    app.spawn_background();

    let router = app.router().merge(metrics.router());
    Ok(router.into())
}
