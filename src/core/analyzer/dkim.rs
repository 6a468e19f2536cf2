// src/core/analyzer/dkim.rs

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::core::config::AnalyzerConfig;
use crate::core::models::{
    AnalysisFinding, ComponentResult, DkimSelectorRecord, ParsedRecord, RecordKind,
    ResolutionStatus, Severity,
};
use crate::core::resolver::{DnsClient, DnsError};
use crate::core::scoring::{self, DKIM_MIN_KEY_BITS, DKIM_RECOMMENDED_KEY_BITS};

/// Outcome of probing one selector at `{selector}._domainkey.{domain}`.
pub(crate) struct SelectorProbe {
    pub selector: String,
    pub outcome: Result<Vec<String>, DnsError>,
}

/// Probes the configured DKIM selectors with a bounded concurrent fan-out
/// and evaluates whatever key records were found. Selector identity is
/// carried through each probe, so the completion order never matters.
pub async fn analyze_dkim(
    client: &DnsClient,
    domain: &str,
    config: &AnalyzerConfig,
) -> ComponentResult {
    info!(
        domain,
        selectors = config.selectors.len(),
        "Probing DKIM selectors."
    );
    let probes = stream::iter(config.selectors.iter().cloned())
        .map(move |selector| {
            let name = format!("{selector}._domainkey.{domain}");
            async move {
                let outcome = client.lookup_txt(&name).await;
                if let Err(e) = &outcome {
                    warn!(selector = %selector, error = %e, "DKIM selector probe failed.");
                }
                SelectorProbe { selector, outcome }
            }
        })
        .buffer_unordered(config.dkim_concurrency.max(1))
        .collect::<Vec<_>>()
        .await;
    evaluate_dkim(probes)
}

/// Pure evaluation of the selector probe outcomes.
pub(crate) fn evaluate_dkim(probes: Vec<SelectorProbe>) -> ComponentResult {
    let mut result = ComponentResult::new(RecordKind::Dkim);
    let probe_count = probes.len();
    let mut failures = 0usize;
    let mut selectors: Vec<DkimSelectorRecord> = Vec::new();

    for probe in probes {
        match probe.outcome {
            Ok(texts) => {
                // A selector hits if any of its TXT answers carries a p= tag.
                if let Some(raw) = texts.iter().find(|t| has_public_key_tag(t)) {
                    debug!(selector = %probe.selector, "DKIM key record found.");
                    result
                        .raw_records
                        .push(format!("{}: {}", probe.selector, raw));
                    selectors.push(parse_dkim_record(&probe.selector, raw));
                }
            }
            Err(_) => failures += 1,
        }
    }

    if selectors.is_empty() {
        if probe_count > 0 && failures == probe_count {
            result.status = ResolutionStatus::Error;
            result.findings.push(AnalysisFinding::with_detail(
                Severity::Warning,
                "DNS_LOOKUP_FAILED",
                "all DKIM selector probes failed",
            ));
        } else {
            result.status = ResolutionStatus::NotFound;
            result
                .findings
                .push(AnalysisFinding::new(Severity::Warning, "DKIM_MISSING"));
        }
        result.finalize();
        return result;
    }

    // Stable output independent of probe completion order.
    selectors.sort_by(|a, b| a.selector.cmp(&b.selector));
    result.raw_records.sort();
    result.status = ResolutionStatus::Found;

    detect_dkim_issues(&selectors, &mut result.findings);

    result.parsed = Some(ParsedRecord::Dkim { selectors });
    result.score = scoring::points_for(&result);
    result.finalize();
    result
}

fn detect_dkim_issues(selectors: &[DkimSelectorRecord], findings: &mut Vec<AnalysisFinding>) {
    for record in selectors {
        match record.public_key_length_estimate {
            None => findings.push(AnalysisFinding::with_detail(
                Severity::Warning,
                "DKIM_KEY_REVOKED",
                record.selector.clone(),
            )),
            Some(bits) if bits < DKIM_MIN_KEY_BITS => {
                findings.push(AnalysisFinding::with_detail(
                    Severity::Warning,
                    "DKIM_WEAK_KEY",
                    format!("{}: ~{bits}-bit", record.selector),
                ));
            }
            Some(bits) if bits < DKIM_RECOMMENDED_KEY_BITS => {
                findings.push(AnalysisFinding::with_detail(
                    Severity::Info,
                    "DKIM_KEY_BELOW_2048",
                    format!("{}: ~{bits}-bit", record.selector),
                ));
            }
            Some(_) => {}
        }
        if record.flags.iter().any(|f| f == "y") {
            findings.push(AnalysisFinding::with_detail(
                Severity::Info,
                "DKIM_TEST_MODE",
                record.selector.clone(),
            ));
        }
    }
    if selectors.len() == 1 {
        findings.push(AnalysisFinding::new(Severity::Info, "DKIM_SINGLE_SELECTOR"));
    }
}

fn has_public_key_tag(record: &str) -> bool {
    record.split(';').any(|part| part.trim_start().starts_with("p="))
}

/// Parses a DKIM key record (`tag=value; ...`) for one selector.
pub(crate) fn parse_dkim_record(selector: &str, raw: &str) -> DkimSelectorRecord {
    let mut version = None;
    let mut key_type = "rsa".to_string();
    let mut hash_algorithms = Vec::new();
    let mut flags = Vec::new();
    let mut services = Vec::new();
    let mut public_key = String::new();

    for part in raw.split(';') {
        let Some((tag, value)) = part.split_once('=') else {
            continue;
        };
        let (tag, value) = (tag.trim(), value.trim());
        match tag {
            "v" => version = Some(value.to_string()),
            "k" if !value.is_empty() => key_type = value.to_string(),
            "h" => hash_algorithms = split_colon_list(value),
            "t" => flags = split_colon_list(value),
            "s" => services = split_colon_list(value),
            "p" => public_key = value.to_string(),
            _ => {}
        }
    }

    let public_key_length_estimate = if public_key.is_empty() {
        None
    } else {
        Some(estimate_key_bits(&public_key))
    };

    DkimSelectorRecord {
        selector: selector.to_string(),
        version,
        key_type,
        hash_algorithms,
        public_key_length_estimate,
        flags,
        services,
    }
}

fn split_colon_list(value: &str) -> Vec<String> {
    value
        .split(':')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Rough key-size estimate from the base64 `p=` payload: six bits per
/// character, floored to whole bytes. A 2048-bit RSA SPKI comes out around
/// 2350 bits, comfortably above the 2048 threshold.
pub(crate) fn estimate_key_bits(b64: &str) -> u32 {
    let len = b64.chars().filter(|c| !c.is_whitespace()).count() as u32;
    len * 6 / 8 * 8
}

#[cfg(test)]
mod tests {
    use super::*;

    // Roughly the base64 lengths of 2048-bit and 1024-bit RSA SPKI blobs.
    const STRONG_KEY_LEN: usize = 392;
    const MID_KEY_LEN: usize = 216;

    fn hit(selector: &str, key_len: usize) -> SelectorProbe {
        SelectorProbe {
            selector: selector.to_string(),
            outcome: Ok(vec![format!("v=DKIM1; k=rsa; p={}", "A".repeat(key_len))]),
        }
    }

    fn miss(selector: &str) -> SelectorProbe {
        SelectorProbe {
            selector: selector.to_string(),
            outcome: Ok(Vec::new()),
        }
    }

    fn failed(selector: &str) -> SelectorProbe {
        SelectorProbe {
            selector: selector.to_string(),
            outcome: Err(DnsError::Timeout),
        }
    }

    #[test]
    fn key_bits_estimate_tracks_payload_length() {
        assert_eq!(estimate_key_bits(&"A".repeat(STRONG_KEY_LEN)), 2352);
        assert_eq!(estimate_key_bits(&"A".repeat(MID_KEY_LEN)), 1296);
        assert_eq!(estimate_key_bits("AAAA BBBB"), 48);
    }

    #[test]
    fn record_fields_parse() {
        let record = parse_dkim_record(
            "default",
            "v=DKIM1; k=rsa; h=sha256; t=y; s=email; p=AAAA",
        );
        assert_eq!(record.version.as_deref(), Some("DKIM1"));
        assert_eq!(record.key_type, "rsa");
        assert_eq!(record.hash_algorithms, vec!["sha256"]);
        assert_eq!(record.flags, vec!["y"]);
        assert_eq!(record.services, vec!["email"]);
        assert!(record.public_key_length_estimate.is_some());
    }

    #[test]
    fn no_hits_is_not_found_with_issue() {
        let result = evaluate_dkim(vec![miss("default"), miss("google")]);
        assert_eq!(result.status, ResolutionStatus::NotFound);
        assert_eq!(result.score, 0);
        assert!(result.issues.iter().any(|i| i.contains("No DKIM records")));
    }

    #[test]
    fn all_probes_failing_is_a_component_error() {
        let result = evaluate_dkim(vec![failed("default"), failed("google")]);
        assert_eq!(result.status, ResolutionStatus::Error);
        assert!(result.has_finding("DNS_LOOKUP_FAILED"));
    }

    #[test]
    fn partial_probe_failures_still_count_hits() {
        let result = evaluate_dkim(vec![failed("default"), hit("google", STRONG_KEY_LEN)]);
        assert_eq!(result.status, ResolutionStatus::Found);
        assert_eq!(result.score, 25);
    }

    #[test]
    fn single_selector_gets_redundancy_note_without_deduction() {
        let result = evaluate_dkim(vec![hit("default", STRONG_KEY_LEN), miss("google")]);
        assert_eq!(result.status, ResolutionStatus::Found);
        assert_eq!(result.score, 25);
        assert!(result.has_finding("DKIM_SINGLE_SELECTOR"));
        assert!(result.recommendations.iter().any(|r| r.contains("second DKIM selector")));
    }

    #[test]
    fn best_key_governs_when_weak_and_strong_coexist() {
        let result = evaluate_dkim(vec![hit("weak", 100), hit("strong", STRONG_KEY_LEN)]);
        assert_eq!(result.status, ResolutionStatus::Found);
        // Best available key scores, with the weak selector still flagged.
        assert_eq!(result.score, 25);
        assert!(result.has_finding("DKIM_WEAK_KEY"));
        assert!(!result.has_finding("DKIM_SINGLE_SELECTOR"));
    }

    #[test]
    fn revoked_key_is_flagged() {
        let probe = SelectorProbe {
            selector: "old".to_string(),
            outcome: Ok(vec!["v=DKIM1; p=".to_string()]),
        };
        let result = evaluate_dkim(vec![probe]);
        assert_eq!(result.status, ResolutionStatus::Found);
        assert!(result.has_finding("DKIM_KEY_REVOKED"));
    }

    #[test]
    fn selectors_are_sorted_for_stable_output() {
        let result = evaluate_dkim(vec![hit("zeta", MID_KEY_LEN), hit("alpha", MID_KEY_LEN)]);
        let Some(ParsedRecord::Dkim { selectors }) = &result.parsed else {
            panic!("expected DKIM parse");
        };
        assert_eq!(selectors[0].selector, "alpha");
        assert_eq!(selectors[1].selector, "zeta");
    }
}
