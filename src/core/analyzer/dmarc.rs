// src/core/analyzer/dmarc.rs

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::models::{
    AlignmentMode, AnalysisFinding, ComponentResult, DmarcAction, DmarcPolicy, ParsedRecord,
    RecordKind, ResolutionStatus, Severity,
};
use crate::core::resolver::DnsClient;
use crate::core::scoring;

/// A DMARC record that is present but does not parse. The component is
/// reported with status `error`, never as a thrown failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct DmarcParseError(String);

/// Analyzes the DMARC posture from the TXT record at `_dmarc.{domain}`.
pub async fn analyze_dmarc(client: &DnsClient, domain: &str) -> ComponentResult {
    let name = format!("_dmarc.{domain}");
    info!(name, "Checking DMARC record.");
    match client.lookup_txt(&name).await {
        Ok(records) => evaluate_dmarc(&records),
        Err(e) => {
            warn!(name, error = %e, "DMARC lookup failed.");
            ComponentResult::lookup_error(RecordKind::Dmarc, &e)
        }
    }
}

/// Pure evaluation of already-resolved `_dmarc` TXT answers.
pub(crate) fn evaluate_dmarc(txt_records: &[String]) -> ComponentResult {
    let mut result = ComponentResult::new(RecordKind::Dmarc);

    let Some(raw) = txt_records.iter().find(|r| r.starts_with("v=DMARC1")) else {
        debug!("No TXT record starts with v=DMARC1.");
        result.status = ResolutionStatus::NotFound;
        result
            .findings
            .push(AnalysisFinding::new(Severity::Critical, "DMARC_MISSING"));
        result.finalize();
        return result;
    };

    result.raw_records = vec![raw.clone()];
    match parse_dmarc(raw) {
        Ok(policy) => {
            result.status = ResolutionStatus::Found;
            detect_dmarc_issues(&policy, &mut result.findings);
            result.parsed = Some(ParsedRecord::Dmarc(policy));
            result.score = scoring::points_for(&result);
        }
        Err(e) => {
            warn!(error = %e, "DMARC record is malformed.");
            result.status = ResolutionStatus::Error;
            result.findings.push(AnalysisFinding::with_detail(
                Severity::Warning,
                "DMARC_MALFORMED",
                e.to_string(),
            ));
        }
    }
    result.finalize();
    result
}

fn detect_dmarc_issues(policy: &DmarcPolicy, findings: &mut Vec<AnalysisFinding>) {
    match policy.policy {
        DmarcAction::None => {
            findings.push(AnalysisFinding::new(Severity::Warning, "DMARC_POLICY_NONE"));
        }
        DmarcAction::Quarantine => {
            findings.push(AnalysisFinding::new(
                Severity::Info,
                "DMARC_POLICY_QUARANTINE",
            ));
        }
        DmarcAction::Reject => {}
    }
    if policy.percentage < 100 {
        findings.push(AnalysisFinding::with_detail(
            Severity::Warning,
            "DMARC_PARTIAL_PCT",
            format!("pct={}", policy.percentage),
        ));
    }
    if policy.report_uri.is_empty() {
        findings.push(AnalysisFinding::new(Severity::Warning, "DMARC_NO_RUA"));
    }
}

/// Parses a `v=DMARC1` record into a [`DmarcPolicy`], applying the RFC 7489
/// defaults for omitted tags. Unknown tags are ignored; an invalid required
/// tag makes the whole record malformed.
pub(crate) fn parse_dmarc(raw: &str) -> Result<DmarcPolicy, DmarcParseError> {
    let mut policy = None;
    let mut subdomain_policy = None;
    let mut alignment_spf = None;
    let mut alignment_dkim = None;
    let mut percentage = None;
    let mut report_uri = Vec::new();
    let mut forensic_uri = Vec::new();

    for part in raw.split(';') {
        let Some((tag, value)) = part.split_once('=') else {
            continue;
        };
        let (tag, value) = (tag.trim(), value.trim());
        match tag {
            "v" => {
                if value != "DMARC1" {
                    return Err(DmarcParseError(format!("invalid version: '{value}'")));
                }
            }
            "p" => {
                policy = Some(
                    DmarcAction::parse(value)
                        .ok_or_else(|| DmarcParseError(format!("invalid p= value: '{value}'")))?,
                );
            }
            "sp" => {
                subdomain_policy = Some(
                    DmarcAction::parse(value)
                        .ok_or_else(|| DmarcParseError(format!("invalid sp= value: '{value}'")))?,
                );
            }
            "aspf" => {
                alignment_spf = Some(AlignmentMode::parse(value).ok_or_else(|| {
                    DmarcParseError(format!("invalid aspf= value: '{value}'"))
                })?);
            }
            "adkim" => {
                alignment_dkim = Some(AlignmentMode::parse(value).ok_or_else(|| {
                    DmarcParseError(format!("invalid adkim= value: '{value}'"))
                })?);
            }
            "pct" => {
                let pct: u8 = value
                    .parse()
                    .ok()
                    .filter(|p| *p <= 100)
                    .ok_or_else(|| DmarcParseError(format!("invalid pct= value: '{value}'")))?;
                percentage = Some(pct);
            }
            "rua" => report_uri = split_uri_list(value),
            "ruf" => forensic_uri = split_uri_list(value),
            _ => {}
        }
    }

    let policy = policy.ok_or_else(|| DmarcParseError("missing required p= tag".to_string()))?;
    Ok(DmarcPolicy {
        version: "DMARC1".to_string(),
        policy,
        // sp defaults to the domain policy when absent.
        subdomain_policy: subdomain_policy.unwrap_or(policy),
        alignment_spf: alignment_spf.unwrap_or(AlignmentMode::Relaxed),
        alignment_dkim: alignment_dkim.unwrap_or(AlignmentMode::Relaxed),
        percentage: percentage.unwrap_or(100),
        report_uri,
        forensic_uri,
    })
}

fn split_uri_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}
