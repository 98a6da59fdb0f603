//! Consent cookie gating.

mod cookies;
mod gate;
mod rule;
mod sanitize;

pub use cookies::{CookieJar, VisitorCookies};
pub use gate::ConsentGate;
pub use rule::{Comparison, ComparisonMode, ConsentRule};
pub use sanitize::sanitize_text_field;
