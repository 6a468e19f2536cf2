// src/core/analyzer/spf.rs

use tracing::{debug, info, warn};

use crate::core::models::{
    AnalysisFinding, ComponentResult, ParsedRecord, RecordKind, ResolutionStatus, Severity,
    SpfMechanism, SpfMechanismKind, SpfQualifier, SpfRecord,
};
use crate::core::resolver::DnsClient;
use crate::core::scoring::{self, SPF_LOOKUP_LIMIT};

/// Analyzes the SPF posture of a domain from its TXT records.
pub async fn analyze_spf(client: &DnsClient, domain: &str) -> ComponentResult {
    info!(domain, "Checking SPF record.");
    match client.lookup_txt(domain).await {
        Ok(records) => evaluate_spf(&records),
        Err(e) => {
            warn!(domain, error = %e, "SPF lookup failed.");
            ComponentResult::lookup_error(RecordKind::Spf, &e)
        }
    }
}

/// Pure evaluation of already-resolved TXT answers. The first record
/// starting with `v=spf1` (case-sensitive) is the SPF record.
pub(crate) fn evaluate_spf(txt_records: &[String]) -> ComponentResult {
    let mut result = ComponentResult::new(RecordKind::Spf);

    let Some(raw) = txt_records.iter().find(|r| r.starts_with("v=spf1")) else {
        debug!("No TXT record starts with v=spf1.");
        result.status = ResolutionStatus::NotFound;
        result
            .findings
            .push(AnalysisFinding::new(Severity::Warning, "SPF_MISSING"));
        result.finalize();
        return result;
    };

    result.status = ResolutionStatus::Found;
    result.raw_records = vec![raw.clone()];
    let record = parse_spf(raw);
    debug!(
        mechanisms = record.mechanisms.len(),
        unknown = record.unknown_terms.len(),
        "SPF record tokenized."
    );

    detect_spf_issues(&record, &mut result.findings);

    result.parsed = Some(ParsedRecord::Spf(record));
    result.score = scoring::points_for(&result);
    result.finalize();
    result
}

/// Tokenizes an SPF record body into typed mechanisms, preserving order.
pub(crate) fn parse_spf(raw: &str) -> SpfRecord {
    let mut mechanisms = Vec::new();
    let mut unknown_terms = Vec::new();
    for token in raw.split_whitespace() {
        if token == "v=spf1" {
            continue;
        }
        match parse_term(token) {
            Some(mechanism) => mechanisms.push(mechanism),
            // "exp=" is a valid modifier but carries no posture signal.
            None if token.starts_with("exp=") => {}
            None => unknown_terms.push(token.to_string()),
        }
    }
    SpfRecord {
        mechanisms,
        unknown_terms,
    }
}

fn parse_term(token: &str) -> Option<SpfMechanism> {
    // "redirect" is a modifier: no qualifier, '=' separator.
    if let Some(value) = token.strip_prefix("redirect=") {
        return Some(SpfMechanism {
            kind: SpfMechanismKind::Redirect,
            qualifier: SpfQualifier::Pass,
            value: value.to_string(),
        });
    }

    let (qualifier, rest) = match token.chars().next().and_then(SpfQualifier::from_char) {
        Some(q) => (q, &token[1..]),
        None => (SpfQualifier::Pass, token),
    };

    let (kind, value) = if rest.eq_ignore_ascii_case("all") {
        (SpfMechanismKind::All, String::new())
    } else if let Some(v) = split_mechanism(rest, "include") {
        (SpfMechanismKind::Include, v)
    } else if let Some(v) = split_mechanism(rest, "ip4") {
        (SpfMechanismKind::Ip4, v)
    } else if let Some(v) = split_mechanism(rest, "ip6") {
        (SpfMechanismKind::Ip6, v)
    } else if let Some(v) = split_mechanism(rest, "exists") {
        (SpfMechanismKind::Exists, v)
    } else if let Some(v) = split_mechanism(rest, "ptr") {
        (SpfMechanismKind::Ptr, v)
    } else if let Some(v) = split_mechanism(rest, "mx") {
        (SpfMechanismKind::Mx, v)
    } else if let Some(v) = split_mechanism(rest, "a") {
        (SpfMechanismKind::A, v)
    } else {
        return None;
    };

    Some(SpfMechanism {
        kind,
        qualifier,
        value,
    })
}

/// Matches `name`, `name:domain-spec` or `name/cidr` case-insensitively and
/// returns the remainder (empty for the bare form).
fn split_mechanism(rest: &str, name: &str) -> Option<String> {
    if rest.eq_ignore_ascii_case(name) {
        return Some(String::new());
    }
    // TXT data is attacker-controlled and arrives via lossy UTF-8 decoding,
    // so the prefix cut must stay on a char boundary; `get` rejects a cut
    // inside a multi-byte character and the token falls through as unknown.
    let prefix = rest.get(..name.len())?;
    if !prefix.eq_ignore_ascii_case(name) {
        return None;
    }
    let tail = &rest[name.len()..];
    if let Some(stripped) = tail.strip_prefix(':') {
        return Some(stripped.to_string());
    }
    if tail.starts_with('/') {
        return Some(tail.to_string());
    }
    None
}

fn detect_spf_issues(record: &SpfRecord, findings: &mut Vec<AnalysisFinding>) {
    let all_qualifiers: Vec<SpfQualifier> = record
        .mechanisms
        .iter()
        .filter(|m| m.kind == SpfMechanismKind::All)
        .map(|m| m.qualifier)
        .collect();
    let has_redirect = record
        .mechanisms
        .iter()
        .any(|m| m.kind == SpfMechanismKind::Redirect);

    // "+all" dominates; otherwise the strictest terminal present decides.
    if all_qualifiers.contains(&SpfQualifier::Pass) {
        findings.push(AnalysisFinding::new(Severity::Critical, "SPF_ALL_PASS"));
    } else if all_qualifiers.contains(&SpfQualifier::Fail) {
        // Hard fail: the strongest policy, nothing to flag.
    } else if all_qualifiers.contains(&SpfQualifier::SoftFail) {
        findings.push(AnalysisFinding::new(Severity::Info, "SPF_POLICY_SOFTFAIL"));
    } else if all_qualifiers.contains(&SpfQualifier::Neutral) {
        findings.push(AnalysisFinding::new(Severity::Warning, "SPF_POLICY_NEUTRAL"));
    } else if !has_redirect {
        findings.push(AnalysisFinding::new(Severity::Warning, "SPF_NO_TERMINAL"));
    }

    let lookups = record
        .mechanisms
        .iter()
        .filter(|m| m.kind.triggers_lookup())
        .count();
    if lookups > SPF_LOOKUP_LIMIT {
        findings.push(AnalysisFinding::with_detail(
            Severity::Warning,
            "SPF_TOO_MANY_LOOKUPS",
            format!("{lookups} lookup mechanisms"),
        ));
    }

    if !record.unknown_terms.is_empty() {
        findings.push(AnalysisFinding::with_detail(
            Severity::Info,
            "SPF_UNKNOWN_TERM",
            record.unknown_terms.join(", "),
        ));
    }
}
