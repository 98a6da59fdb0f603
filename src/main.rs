use std::sync::Arc;

use ad_gate::bots::BotDetector;
use ad_gate::config::{Command, Config, QuotaAction};
use ad_gate::consent::{ConsentGate, CookieJar};
use ad_gate::metrics::GateMetrics;
use ad_gate::persistence::FileStore;
use ad_gate::quota::{current_timestamp_secs, QuotaCounter};
use ad_gate::settings::SettingsStore;
use ad_gate::types::{Group, SettingValue};
use ad_gate::Error;

use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration
    let config = Config::parse_args();

    // Initialize tracing
    let log_level = match config.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    debug!("adgate v{}", env!("CARGO_PKG_VERSION"));

    let metrics = Arc::new(GateMetrics::new());
    metrics.init_start_time();

    let store = Arc::new(FileStore::open(config.persistence_config())?);
    let now = config.now.unwrap_or_else(current_timestamp_secs);

    match &config.command {
        Command::Quota { action } => {
            let policy = config.entitlement_policy();
            info!("Entitlement tier: {}", policy.tier());
            let counter = QuotaCounter::new(store.clone(), policy).with_metrics(metrics.clone());

            if *action == QuotaAction::Consume {
                match counter.try_consume(now) {
                    Ok(record) => info!("Consumed 1 call ({} of {})", record.calls, record.max),
                    Err(e @ Error::QuotaExhausted { .. }) => {
                        println!("{}", e);
                        std::process::exit(2);
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            let status = counter.status(now);
            println!("max:{}", status.max);
            println!("calls:{}", status.calls);
            println!("remaining:{}", status.remaining);
            println!("window_start:{}", format_ts(status.window_start));
            println!("resets_at:{}", format_ts(status.resets_at));
        }
        Command::Consent {
            header,
            cookies,
            force_skip,
        } => {
            let mut jar = header
                .as_deref()
                .map(CookieJar::parse_header)
                .unwrap_or_default();
            for pair in cookies {
                let (name, value) = pair.split_once('=').ok_or_else(|| {
                    Error::InvalidArgument(format!("cookie must be name=value: {}", pair))
                })?;
                jar.insert(name.trim(), value);
            }

            let gate = ConsentGate::new(store.clone()).with_metrics(metrics.clone());
            println!("rule:{}", gate.rule());
            println!("requires_consent:{}", gate.requires_consent());
            println!("needs_consent:{}", gate.needs_consent(&jar, *force_skip));
        }
        Command::Bot {
            user_agent,
            patterns,
        } => {
            let detector = BotDetector::with_patterns(patterns)?.with_metrics(metrics.clone());
            println!("bot:{}", detector.is_bot(user_agent));
        }
        Command::Get { group, key } => {
            let group: Group = group.parse()?;
            match store.get(key, group, true, None) {
                Some(value) => println!("{}", value),
                None => println!("(not set)"),
            }
        }
        Command::Set { group, key, value } => {
            let group: Group = group.parse()?;
            let changed = store.update(key, group, SettingValue::parse_loose(value));
            info!("{}/{} {}", group, key, if changed { "updated" } else { "unchanged" });
        }
        Command::List => {
            for (key, value) in store.entries() {
                println!("{} = {}", key, value);
            }
        }
    }

    debug!("{}", metrics.snapshot().to_info_string(None));
    Ok(())
}

fn format_ts(ts: Option<i64>) -> String {
    ts.map_or_else(|| "-".to_string(), |t| t.to_string())
}
