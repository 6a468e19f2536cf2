// src/core/resolver.rs

use std::time::Duration;

use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::config::AnalyzerConfig;
use crate::core::models::MxHost;

/// Closed taxonomy of transport-level DNS failures. An authoritative
/// negative answer is not an error; lookups return `Ok` with an empty list
/// in that case.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DnsError {
    #[error("DNS query timed out")]
    Timeout,
    #[error("DNS resolver failure: {0}")]
    ServerFailure(String),
}

/// Thin adapter over the system resolver used by every analyzer.
///
/// Each query is bounded by the configured per-query timeout, and a single
/// retry is attempted when the transport fails before surfacing
/// [`DnsError::ServerFailure`]. Results are never cached here.
pub struct DnsClient {
    resolver: TokioAsyncResolver,
    per_query_timeout: Duration,
}

impl DnsClient {
    pub fn new(config: &AnalyzerConfig) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = config.per_query_timeout;
        // The retry policy lives in this adapter, not in the resolver.
        opts.attempts = 1;
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), opts),
            per_query_timeout: config.per_query_timeout,
        }
    }

    /// Looks up all TXT records at `name`. Multi-part TXT answers are joined
    /// into one string per record, since DKIM keys are routinely split
    /// across several character-strings.
    pub async fn lookup_txt(&self, name: &str) -> Result<Vec<String>, DnsError> {
        match self.txt_once(name).await {
            Err(DnsError::ServerFailure(reason)) => {
                warn!(name, error = %reason, "TXT lookup failed, retrying once.");
                self.txt_once(name).await
            }
            other => other,
        }
    }

    /// Looks up the MX records for `name`, sorted by preference.
    pub async fn lookup_mx(&self, name: &str) -> Result<Vec<MxHost>, DnsError> {
        match self.mx_once(name).await {
            Err(DnsError::ServerFailure(reason)) => {
                warn!(name, error = %reason, "MX lookup failed, retrying once.");
                self.mx_once(name).await
            }
            other => other,
        }
    }

    async fn txt_once(&self, name: &str) -> Result<Vec<String>, DnsError> {
        debug!(name, "Querying TXT records.");
        let lookup = tokio::time::timeout(self.per_query_timeout, self.resolver.txt_lookup(name))
            .await
            .map_err(|_| DnsError::Timeout)?;
        match lookup {
            Ok(records) => Ok(records
                .iter()
                .map(|txt| {
                    txt.txt_data()
                        .iter()
                        .map(|part| String::from_utf8_lossy(part))
                        .collect::<String>()
                })
                .collect()),
            Err(e) => classify(e),
        }
    }

    async fn mx_once(&self, name: &str) -> Result<Vec<MxHost>, DnsError> {
        debug!(name, "Querying MX records.");
        let lookup = tokio::time::timeout(self.per_query_timeout, self.resolver.mx_lookup(name))
            .await
            .map_err(|_| DnsError::Timeout)?;
        match lookup {
            Ok(records) => {
                let mut hosts: Vec<MxHost> = records
                    .iter()
                    .map(|mx| {
                        let text = mx.exchange().to_utf8();
                        // Keep the bare root label intact: "." is a null MX.
                        let exchange = if text == "." {
                            text
                        } else {
                            text.trim_end_matches('.').to_string()
                        };
                        MxHost {
                            preference: mx.preference(),
                            exchange,
                        }
                    })
                    .collect();
                hosts.sort_by_key(|h| h.preference);
                Ok(hosts)
            }
            Err(e) => classify(e),
        }
    }
}

/// Maps a resolver error into the closed taxonomy. `NoRecordsFound` covers
/// both NXDOMAIN and empty answers and is surfaced as an empty `Ok`.
fn classify<T>(error: ResolveError) -> Result<Vec<T>, DnsError> {
    match error.kind() {
        ResolveErrorKind::NoRecordsFound { .. } => {
            debug!("Authoritative negative answer.");
            Ok(Vec::new())
        }
        ResolveErrorKind::Timeout => Err(DnsError::Timeout),
        _ => Err(DnsError::ServerFailure(error.to_string())),
    }
}
