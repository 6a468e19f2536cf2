// src/core/analyzer/mx.rs

use tracing::{debug, info, warn};

use crate::core::models::{
    AnalysisFinding, ComponentResult, MxHost, ParsedRecord, RecordKind, ResolutionStatus, Severity,
};
use crate::core::resolver::DnsClient;
use crate::core::scoring;

/// Analyzes the MX posture of a domain: full points for at least one valid
/// exchange, zero when absent or when a null MX explicitly rejects email.
pub async fn analyze_mx(client: &DnsClient, domain: &str) -> ComponentResult {
    info!(domain, "Checking MX records.");
    match client.lookup_mx(domain).await {
        Ok(hosts) => evaluate_mx(hosts),
        Err(e) => {
            warn!(domain, error = %e, "MX lookup failed.");
            ComponentResult::lookup_error(RecordKind::Mx, &e)
        }
    }
}

/// Pure evaluation of already-resolved MX answers.
pub(crate) fn evaluate_mx(mut hosts: Vec<MxHost>) -> ComponentResult {
    let mut result = ComponentResult::new(RecordKind::Mx);

    if hosts.is_empty() {
        debug!("No MX records found.");
        result.status = ResolutionStatus::NotFound;
        result
            .findings
            .push(AnalysisFinding::new(Severity::Critical, "MX_MISSING"));
        result.finalize();
        return result;
    }

    hosts.sort_by_key(|h| h.preference);
    result.status = ResolutionStatus::Found;
    result.raw_records = hosts
        .iter()
        .map(|h| format!("{} {}", h.preference, h.exchange))
        .collect();

    // RFC 7505: a single "." exchange advertises that the domain takes no mail.
    if hosts.iter().any(|h| h.exchange == ".") {
        debug!("Null MX record present.");
        result
            .findings
            .push(AnalysisFinding::new(Severity::Warning, "MX_NULL"));
    }

    result.parsed = Some(ParsedRecord::Mx { hosts });
    result.score = scoring::points_for(&result);
    result.finalize();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(preference: u16, exchange: &str) -> MxHost {
        MxHost {
            preference,
            exchange: exchange.to_string(),
        }
    }

    #[test]
    fn two_records_give_full_score_sorted_by_preference() {
        let result = evaluate_mx(vec![host(20, "alt.example.com"), host(10, "mail.example.com")]);
        assert_eq!(result.status, ResolutionStatus::Found);
        assert_eq!(result.score, 20);
        assert!(result.issues.is_empty());
        let Some(ParsedRecord::Mx { hosts }) = &result.parsed else {
            panic!("expected MX parse");
        };
        assert_eq!(hosts[0].exchange, "mail.example.com");
        assert_eq!(hosts[1].exchange, "alt.example.com");
    }

    #[test]
    fn missing_records_zero_the_component() {
        let result = evaluate_mx(Vec::new());
        assert_eq!(result.status, ResolutionStatus::NotFound);
        assert_eq!(result.score, 0);
        assert!(result.issues.iter().any(|i| i.contains("No MX records")));
        assert!(!result.recommendations.is_empty());
    }

    #[test]
    fn null_mx_is_found_but_scores_zero() {
        let result = evaluate_mx(vec![host(0, ".")]);
        assert_eq!(result.status, ResolutionStatus::Found);
        assert_eq!(result.score, 0);
        assert!(result.has_finding("MX_NULL"));
    }
}
