//! User-agent based crawler detection.
//!
//! Ads and tracking skip visitors classified as bots so impressions and
//! clicks are not inflated by crawlers, uptime monitors and scripts.

use std::sync::Arc;

use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};
use crate::metrics::GateMetrics;

/// Case-insensitive substrings that mark a user agent as automated.
pub const DEFAULT_BOT_PATTERNS: &[&str] = &[
    "bot",
    "crawl",
    "spider",
    "slurp",
    "scraper",
    "archiver",
    "mediapartners-google",
    "adsbot",
    "facebookexternalhit",
    "embedly",
    "quora link preview",
    "whatsapp",
    "skypeuripreview",
    "bingpreview",
    "headlesschrome",
    "phantomjs",
    "lighthouse",
    "pingdom",
    "uptimerobot",
    "statuscake",
    "gtmetrix",
    "curl/",
    "wget/",
    "python-requests",
    "python-urllib",
    "go-http-client",
    "java/",
    "okhttp",
    "libwww-perl",
    "httpclient",
    "feedfetcher",
    "feedburner",
];

/// Classifies user agents as bots.
#[derive(Debug, Clone)]
pub struct BotDetector {
    pattern: Regex,
    metrics: Arc<GateMetrics>,
}

impl BotDetector {
    /// Detector using [`DEFAULT_BOT_PATTERNS`].
    pub fn new() -> Self {
        Self::with_patterns(std::iter::empty::<&str>())
            .unwrap_or_else(|_| unreachable!("default bot patterns compile"))
    }

    /// Default patterns plus `extra`, each matched as a literal substring.
    pub fn with_patterns<I, P>(extra: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let alternation = DEFAULT_BOT_PATTERNS
            .iter()
            .map(|p| regex::escape(p))
            .chain(
                extra
                    .into_iter()
                    .map(|p| p.as_ref().trim().to_string())
                    .filter(|p| !p.is_empty())
                    .map(|p| regex::escape(&p)),
            )
            .collect::<Vec<_>>()
            .join("|");

        let pattern = RegexBuilder::new(&alternation)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::InvalidArgument(format!("bot pattern: {}", e)))?;

        Ok(Self {
            pattern,
            metrics: Arc::new(GateMetrics::new()),
        })
    }

    /// Share a metrics instance with other gates.
    pub fn with_metrics(mut self, metrics: Arc<GateMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// A missing or blank user agent counts as a bot.
    pub fn is_bot(&self, user_agent: &str) -> bool {
        let user_agent = user_agent.trim();
        let is_bot = user_agent.is_empty() || self.pattern.is_match(user_agent);
        self.metrics.record_bot_check(is_bot);
        is_bot
    }
}

impl Default for BotDetector {
    fn default() -> Self {
        Self::new()
    }
}
