// src/core/config.rs

use std::time::Duration;

/// Common DKIM selectors probed when the caller does not supply its own list.
pub const DEFAULT_DKIM_SELECTORS: &[&str] = &[
    "default",
    "google",
    "k1",
    "dkim",
    "mail",
    "email",
    "selector1",
    "selector2",
    "amazonses",
    "mailchimp",
];

/// Configuration knobs of the analysis engine.
///
/// Every field has a sensible default; callers that only want the standard
/// behavior can use [`AnalyzerConfig::default`].
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// DKIM selector labels probed at `{selector}._domainkey.{domain}`.
    pub selectors: Vec<String>,
    /// Ceiling for a single DNS query.
    pub per_query_timeout: Duration,
    /// Ceiling for a whole component analysis. A component that exceeds it
    /// is marked as errored; the other components are unaffected.
    pub overall_timeout: Duration,
    /// Maximum number of DKIM selector probes in flight at once.
    pub dkim_concurrency: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            selectors: DEFAULT_DKIM_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            per_query_timeout: Duration::from_secs(10),
            overall_timeout: Duration::from_secs(30),
            dkim_concurrency: 6,
        }
    }
}
