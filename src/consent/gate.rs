use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::consent::{ConsentRule, VisitorCookies};
use crate::metrics::GateMetrics;
use crate::settings::SettingsStore;

/// Decides whether a visitor still has to be asked for consent.
///
/// The rule is read from settings on first use and then fixed for the life
/// of the gate, so build one gate per request (or per context whose
/// settings cannot change underneath it).
pub struct ConsentGate<S: SettingsStore + ?Sized> {
    store: Arc<S>,
    rule: OnceLock<ConsentRule>,
    metrics: Arc<GateMetrics>,
}

impl<S: SettingsStore + ?Sized> ConsentGate<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            rule: OnceLock::new(),
            metrics: Arc::new(GateMetrics::new()),
        }
    }

    /// Share a metrics instance with other gates.
    pub fn with_metrics(mut self, metrics: Arc<GateMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The consent rule, built from settings once.
    pub fn rule(&self) -> &ConsentRule {
        self.rule.get_or_init(|| {
            let rule = ConsentRule::from_settings(&*self.store);
            debug!("Consent rule: {}", rule);
            rule
        })
    }

    /// Whether the site is configured to require consent at all.
    /// Does not look at any visitor's cookies.
    pub fn requires_consent(&self) -> bool {
        self.rule().enabled
    }

    /// Whether this visitor still has to consent. `force_skip` lets callers
    /// bypass the check (e.g. previews and admin screens).
    pub fn needs_consent<C: VisitorCookies + ?Sized>(&self, cookies: &C, force_skip: bool) -> bool {
        if force_skip {
            self.metrics.inc(&self.metrics.consent_skipped);
            return false;
        }
        let needed = self.rule().is_unsatisfied_by(cookies);
        self.metrics.record_consent(needed);
        needed
    }
}
