// src/core/analyzer/mod.rs

// Public interface of the analysis engine: the four per-record analyzers
// and the aggregator that fans them out and merges the report.
pub mod dkim;
pub mod dmarc;
pub mod mx;
pub mod spf;

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::config::AnalyzerConfig;
use crate::core::knowledge_base;
use crate::core::models::{
    AnalysisFinding, ComponentResult, DomainAnalysisReport, RecordKind, ResolutionStatus,
};
use crate::core::resolver::{DnsClient, DnsError};
use crate::core::scoring;

/// The only hard precondition failure of the engine. Everything else
/// degrades into per-component statuses instead of failing the call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("domain must be a non-empty label without whitespace: {0:?}")]
    InvalidDomain(String),
}

/// Analyzes a domain with the default configuration.
pub async fn analyze(domain: &str) -> Result<DomainAnalysisReport, AnalysisError> {
    analyze_with_config(domain, &AnalyzerConfig::default()).await
}

/// Analyzes the email-authentication DNS posture of `domain`.
///
/// The four component analyses run concurrently, each bounded by the overall
/// deadline. A slow or failed component degrades to `status: error` without
/// aborting the other three (bulkhead isolation); the report is then marked
/// partial and that component's points leave both sides of the score.
pub async fn analyze_with_config(
    domain: &str,
    config: &AnalyzerConfig,
) -> Result<DomainAnalysisReport, AnalysisError> {
    let target = domain.trim();
    if target.is_empty() || target.contains(char::is_whitespace) {
        return Err(AnalysisError::InvalidDomain(domain.to_string()));
    }
    // Query the root domain; these record types live at the zone apex.
    let target = target.strip_prefix("www.").unwrap_or(target);

    info!(domain = target, "Starting email-auth posture analysis.");
    let client = DnsClient::new(config);
    let deadline = config.overall_timeout;

    let (mx, spf, dkim, dmarc) = tokio::join!(
        with_deadline(RecordKind::Mx, deadline, mx::analyze_mx(&client, target)),
        with_deadline(RecordKind::Spf, deadline, spf::analyze_spf(&client, target)),
        with_deadline(
            RecordKind::Dkim,
            deadline,
            dkim::analyze_dkim(&client, target, config)
        ),
        with_deadline(
            RecordKind::Dmarc,
            deadline,
            dmarc::analyze_dmarc(&client, target)
        ),
    );

    let report = assemble_report(target, mx, spf, dkim, dmarc);
    info!(
        domain = target,
        score = ?report.total_score,
        grade = ?report.grade,
        partial = report.partial,
        "Analysis finished."
    );
    Ok(report)
}

/// Caps one component analysis at the overall operation deadline. On expiry
/// the still-running component is abandoned and reported as a timeout error;
/// already-completed components are unaffected.
async fn with_deadline(
    kind: RecordKind,
    deadline: Duration,
    analysis: impl Future<Output = ComponentResult>,
) -> ComponentResult {
    match tokio::time::timeout(deadline, analysis).await {
        Ok(result) => result,
        Err(_) => {
            warn!(kind = %kind, "Component analysis exceeded the overall deadline.");
            ComponentResult::lookup_error(kind, &DnsError::Timeout)
        }
    }
}

/// Merges the four component results into the final report. Pure, so the
/// partial-failure and scoring behavior is testable without any DNS.
pub fn assemble_report(
    domain: &str,
    mx: ComponentResult,
    spf: ComponentResult,
    dkim: ComponentResult,
    dmarc: ComponentResult,
) -> DomainAnalysisReport {
    let components = [&mx, &spf, &dkim, &dmarc];
    let tally = scoring::tally(&components);
    let grade = tally.total_score.map(scoring::grade_for);

    let mut issues: Vec<String> = Vec::new();
    for component in &components {
        for issue in &component.issues {
            if !issues.contains(issue) {
                issues.push(issue.clone());
            }
        }
    }

    let merged_findings: Vec<AnalysisFinding> = components
        .iter()
        .flat_map(|c| c.findings.iter().cloned())
        .collect();
    let mut recommendations = knowledge_base::remediations_for(&merged_findings);

    let configured = components
        .iter()
        .filter(|c| c.status == ResolutionStatus::Found)
        .count();
    if configured < 3 {
        if let Some(detail) = knowledge_base::get_finding_detail("SETUP_INCOMPLETE") {
            let text = detail.remediation.to_string();
            if !recommendations.contains(&text) {
                recommendations.push(text);
            }
        }
    }

    let priority_actions = recommendations.iter().take(3).cloned().collect();
    let summary = scoring::build_summary(tally.total_score, grade, &components, priority_actions);

    DomainAnalysisReport {
        domain: domain.to_string(),
        generated_at: Utc::now(),
        mx,
        spf,
        dkim,
        dmarc,
        points: tally.points,
        max_points: tally.max_points,
        total_score: tally.total_score,
        grade,
        partial: tally.partial,
        issues,
        recommendations,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::dkim::SelectorProbe;
    use super::*;
    use crate::core::models::{Grade, MxHost, SecurityLevel};

    fn mx_found() -> ComponentResult {
        mx::evaluate_mx(vec![
            MxHost {
                preference: 10,
                exchange: "mail.example.com".to_string(),
            },
            MxHost {
                preference: 20,
                exchange: "alt.example.com".to_string(),
            },
        ])
    }

    fn dkim_not_found() -> ComponentResult {
        dkim::evaluate_dkim(vec![SelectorProbe {
            selector: "default".to_string(),
            outcome: Ok(Vec::new()),
        }])
    }

    fn dkim_strong_single() -> ComponentResult {
        dkim::evaluate_dkim(vec![SelectorProbe {
            selector: "default".to_string(),
            outcome: Ok(vec![format!("v=DKIM1; k=rsa; p={}", "A".repeat(392))]),
        }])
    }

    #[test]
    fn mixed_scenario_sums_deterministically() {
        let spf = spf::evaluate_spf(&["v=spf1 include:_spf.example.com ~all".to_string()]);
        let dmarc = dmarc::evaluate_dmarc(&["v=DMARC1; p=quarantine; pct=50".to_string()]);
        let report = assemble_report("example.com", mx_found(), spf, dkim_not_found(), dmarc);

        assert_eq!(report.mx.score, 20);
        assert_eq!(report.spf.score, 22);
        assert!(!report.spf.has_finding("SPF_ALL_PASS"));
        assert!(!report.spf.has_finding("SPF_POLICY_NEUTRAL"));
        assert_eq!(report.dkim.status, ResolutionStatus::NotFound);
        assert!(report.dkim.has_finding("DKIM_MISSING"));
        assert!(report.dmarc.has_finding("DMARC_PARTIAL_PCT"));
        assert_eq!(report.dmarc.score, 14);

        assert!(!report.partial);
        assert_eq!(report.points, 56);
        assert_eq!(report.max_points, 100);
        assert_eq!(report.total_score, Some(56));
        assert_eq!(report.grade, Some(Grade::C));
    }

    #[test]
    fn component_error_marks_report_partial_and_shrinks_denominator() {
        let mx = ComponentResult::lookup_error(RecordKind::Mx, &DnsError::Timeout);
        let spf = spf::evaluate_spf(&["v=spf1 include:_spf.example.com -all".to_string()]);
        let dmarc =
            dmarc::evaluate_dmarc(&["v=DMARC1; p=reject; rua=mailto:d@example.com".to_string()]);
        let report = assemble_report("example.com", mx, spf, dkim_strong_single(), dmarc);

        assert!(report.partial);
        assert_eq!(report.mx.status, ResolutionStatus::Error);
        assert_eq!(report.points, 80);
        assert_eq!(report.max_points, 80);
        assert_eq!(report.total_score, Some(100));
        assert_eq!(report.grade, Some(Grade::APlus));
        assert!(report.issues.iter().any(|i| i.contains("DNS lookup failed")));

        // Delivery is unverifiable, but the auth components still read well.
        assert_eq!(report.summary.protection_status.email_delivery, "Broken");
        assert_eq!(report.summary.protection_status.spoofing_protection, "Protected");
        assert_eq!(report.summary.protection_status.authentication, "Strong");
    }

    #[test]
    fn all_components_erroring_leaves_no_score() {
        let errored = |kind| ComponentResult::lookup_error(kind, &DnsError::Timeout);
        let report = assemble_report(
            "example.com",
            errored(RecordKind::Mx),
            errored(RecordKind::Spf),
            errored(RecordKind::Dkim),
            errored(RecordKind::Dmarc),
        );
        assert_eq!(report.total_score, None);
        assert_eq!(report.grade, None);
        assert!(report.partial);
        assert_eq!(report.summary.security_level, SecurityLevel::Unknown);
    }

    #[test]
    fn incomplete_setup_adds_the_catch_all_recommendation() {
        let spf = spf::evaluate_spf(&[]);
        let dmarc = dmarc::evaluate_dmarc(&[]);
        let report = assemble_report("example.com", mx_found(), spf, dkim_not_found(), dmarc);
        assert!(
            report
                .recommendations
                .iter()
                .any(|r| r.contains("all four components"))
        );
        assert_eq!(report.summary.priority_actions.len(), 3);
    }

    #[test]
    fn report_serializes_to_plain_json() {
        let spf = spf::evaluate_spf(&["v=spf1 -all".to_string()]);
        let dmarc = dmarc::evaluate_dmarc(&["v=DMARC1; p=reject; rua=mailto:d@e.com".to_string()]);
        let report = assemble_report("example.com", mx_found(), spf, dkim_strong_single(), dmarc);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["domain"], "example.com");
        assert_eq!(json["grade"], "A+");
        assert_eq!(json["spf"]["status"], "found");
        assert!(
            json["summary"]["grade_meaning"]
                .as_str()
                .unwrap()
                .contains("Outstanding")
        );
        assert!(
            json["mx"]["explanation"]["what_is"]
                .as_str()
                .unwrap()
                .contains("Mail Exchange")
        );
    }

    #[tokio::test]
    async fn empty_domain_is_rejected_before_any_query() {
        assert_eq!(
            analyze("   ").await.unwrap_err(),
            AnalysisError::InvalidDomain("   ".to_string())
        );
        assert!(matches!(
            analyze("two words").await.unwrap_err(),
            AnalysisError::InvalidDomain(_)
        ));
    }
}
