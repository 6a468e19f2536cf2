//! This module is the static, read-only database of every finding the
//! engine can emit, complete with human-readable issue summaries and
//! remediation steps. Keeping it data-driven makes the detectors small and
//! the report text easy to maintain.

use crate::core::models::{
    AnalysisFinding, ComponentExplanation, ComponentResult, RecordKind, ResolutionStatus, Severity,
};

/// All the detail attached to a finding code.
pub struct FindingDetail {
    /// A unique, machine-readable identifier (e.g. "DMARC_POLICY_NONE").
    pub code: &'static str,
    /// A short, human-readable title.
    pub title: &'static str,
    /// The severity level of the finding.
    pub severity: Severity,
    /// The issue sentence surfaced in the report.
    pub summary: &'static str,
    /// Actionable steps to fix the issue.
    pub remediation: &'static str,
}

/// The centralized knowledge base driving issue and recommendation text.
static FINDINGS: &[FindingDetail] = &[
    // --- MX ---
    FindingDetail {
        code: "MX_MISSING",
        title: "MX Records Missing",
        severity: Severity::Critical,
        summary: "No MX records found - email delivery will fail",
        remediation: "Configure MX records pointing at your mail provider to enable email delivery for the domain.",
    },
    FindingDetail {
        code: "MX_NULL",
        title: "Null MX Record",
        severity: Severity::Warning,
        summary: "Null MX record found - domain explicitly rejects email",
        remediation: "Remove the null MX record (exchange '.') if the domain is meant to receive email.",
    },
    // --- SPF ---
    FindingDetail {
        code: "SPF_MISSING",
        title: "SPF Record Missing",
        severity: Severity::Warning,
        summary: "No SPF record found - any server can claim to send for this domain",
        remediation: "Add an SPF TXT record listing your authorized senders, e.g. 'v=spf1 include:_spf.example.com -all'.",
    },
    FindingDetail {
        code: "SPF_ALL_PASS",
        title: "SPF Allows All Senders",
        severity: Severity::Critical,
        summary: "'+all' allows all senders - highly insecure",
        remediation: "Remove '+all' from the SPF record and end it with '-all' so unauthorized senders fail authentication.",
    },
    FindingDetail {
        code: "SPF_POLICY_NEUTRAL",
        title: "SPF Policy is Neutral",
        severity: Severity::Warning,
        summary: "'?all' is a neutral policy and offers minimal protection",
        remediation: "Strengthen the SPF policy by changing '?all' to '-all' for better security.",
    },
    FindingDetail {
        code: "SPF_POLICY_SOFTFAIL",
        title: "SPF Policy is Softfail",
        severity: Severity::Info,
        summary: "'~all' softfail suggests, but does not enforce, rejection",
        remediation: "Once all legitimate mail sources are listed, change '~all' to '-all' for stricter enforcement.",
    },
    FindingDetail {
        code: "SPF_NO_TERMINAL",
        title: "SPF Terminal Mechanism Missing",
        severity: Severity::Warning,
        summary: "SPF record has no terminal 'all' or 'redirect' - policy is ambiguous",
        remediation: "Append a terminal mechanism, preferably '-all', so receivers get a definitive policy.",
    },
    FindingDetail {
        code: "SPF_TOO_MANY_LOOKUPS",
        title: "SPF Lookup Limit At Risk",
        severity: Severity::Warning,
        summary: "Too many lookup mechanisms - risks exceeding SPF's 10-lookup limit",
        remediation: "Flatten 'include' chains or drop unused mechanisms; SPF evaluation fails permanently past 10 DNS lookups.",
    },
    FindingDetail {
        code: "SPF_UNKNOWN_TERM",
        title: "Unrecognized SPF Terms",
        severity: Severity::Info,
        summary: "SPF record contains unrecognized terms",
        remediation: "Review the unrecognized SPF terms for typos; receivers ignore or reject invalid mechanisms.",
    },
    // --- DKIM ---
    FindingDetail {
        code: "DKIM_MISSING",
        title: "DKIM Records Missing",
        severity: Severity::Warning,
        summary: "No DKIM records found - authentication may fail",
        remediation: "Enable DKIM signing at your email provider and publish the public key as a TXT record under '_domainkey'.",
    },
    FindingDetail {
        code: "DKIM_SINGLE_SELECTOR",
        title: "Single DKIM Selector",
        severity: Severity::Info,
        summary: "Only one DKIM selector published - no key-rotation redundancy",
        remediation: "Add a second DKIM selector so keys can be rotated without an authentication gap.",
    },
    FindingDetail {
        code: "DKIM_WEAK_KEY",
        title: "Weak DKIM Key",
        severity: Severity::Warning,
        summary: "DKIM public key appears to be shorter than 1024 bits",
        remediation: "Replace DKIM keys shorter than 1024 bits with 2048-bit RSA keys.",
    },
    FindingDetail {
        code: "DKIM_KEY_BELOW_2048",
        title: "DKIM Key Below Recommended Size",
        severity: Severity::Info,
        summary: "DKIM key is below the recommended 2048-bit size",
        remediation: "Upgrade the DKIM key to 2048-bit RSA at the next rotation.",
    },
    FindingDetail {
        code: "DKIM_KEY_REVOKED",
        title: "Revoked DKIM Key",
        severity: Severity::Warning,
        summary: "DKIM record has an empty public key - the key is revoked",
        remediation: "Publish a valid public key for the selector or remove the stale record.",
    },
    FindingDetail {
        code: "DKIM_TEST_MODE",
        title: "DKIM Test Mode",
        severity: Severity::Info,
        summary: "DKIM record is in test mode (t=y)",
        remediation: "Remove the 't=y' flag once signing is verified so receivers fully enforce DKIM.",
    },
    // --- DMARC ---
    FindingDetail {
        code: "DMARC_MISSING",
        title: "DMARC Record Missing",
        severity: Severity::Critical,
        summary: "No DMARC record found - spoofing protection disabled",
        remediation: "Publish a DMARC record at '_dmarc'; start with 'v=DMARC1; p=none; rua=mailto:...' for monitoring, then enforce.",
    },
    FindingDetail {
        code: "DMARC_MALFORMED",
        title: "DMARC Record Malformed",
        severity: Severity::Warning,
        summary: "DMARC record present but does not parse",
        remediation: "Fix the DMARC record syntax; receivers ignore records that fail to parse, leaving the domain unprotected.",
    },
    FindingDetail {
        code: "DMARC_POLICY_NONE",
        title: "DMARC Policy is 'none'",
        severity: Severity::Warning,
        summary: "DMARC policy is 'none' - no enforcement action taken",
        remediation: "Upgrade the DMARC policy from 'none' to 'quarantine' or 'reject' for active protection.",
    },
    FindingDetail {
        code: "DMARC_POLICY_QUARANTINE",
        title: "DMARC Policy is 'quarantine'",
        severity: Severity::Info,
        summary: "DMARC policy quarantines, but does not reject, failing mail",
        remediation: "Consider upgrading to 'p=reject' for maximum protection once quarantine causes no false positives.",
    },
    FindingDetail {
        code: "DMARC_PARTIAL_PCT",
        title: "DMARC Applies to Part of the Mail Stream",
        severity: Severity::Warning,
        summary: "DMARC policy only applies to a percentage of mail",
        remediation: "Raise 'pct' to 100 so the DMARC policy covers the whole mail stream.",
    },
    FindingDetail {
        code: "DMARC_NO_RUA",
        title: "DMARC Aggregate Reporting Missing",
        severity: Severity::Warning,
        summary: "No aggregate reporting (rua) configured - no visibility into abuse",
        remediation: "Add a 'rua=mailto:...' URI to receive aggregate reports and gain visibility into authentication failures.",
    },
    // --- Cross-component ---
    FindingDetail {
        code: "DNS_LOOKUP_FAILED",
        title: "DNS Lookup Failed",
        severity: Severity::Warning,
        summary: "DNS lookup failed - transient resolver or network error",
        remediation: "Retry the analysis; if the failure persists, check the domain's nameservers.",
    },
    FindingDetail {
        code: "SETUP_INCOMPLETE",
        title: "Email Security Setup Incomplete",
        severity: Severity::Warning,
        summary: "Fewer than three of the four email security components are configured",
        remediation: "Complete the email security setup with all four components: MX, SPF, DKIM, and DMARC.",
    },
];

/// Retrieves the full detail for a finding code.
pub fn get_finding_detail(code: &str) -> Option<&'static FindingDetail> {
    FINDINGS.iter().find(|f| f.code == code)
}

/// One state a component can land in, with its non-technical reading.
struct StatusExplanation {
    label: &'static str,
    current_status: &'static str,
    /// Empty for healthy states.
    risk: &'static str,
}

/// Per-record-kind explainer backing the report's `explanation` blocks.
struct ComponentExplainer {
    kind: RecordKind,
    what_is: &'static str,
    statuses: &'static [StatusExplanation],
}

static EXPLAINERS: &[ComponentExplainer] = &[
    ComponentExplainer {
        kind: RecordKind::Mx,
        what_is: "MX (Mail Exchange) records tell other mail servers where to deliver email for the domain - effectively its postal address for email.",
        statuses: &[
            StatusExplanation {
                label: "valid",
                current_status: "✅ The domain is properly configured to receive email; mail servers know where to deliver messages for it.",
                risk: "",
            },
            StatusExplanation {
                label: "missing",
                current_status: "❌ The domain cannot receive email because no MX records are configured.",
                risk: "Mail sent to addresses at the domain will bounce and business communication will fail.",
            },
            StatusExplanation {
                label: "null_mx",
                current_status: "⚠️ The domain is explicitly configured to reject all email (null MX).",
                risk: "Every message sent to the domain is rejected, which may not be intended.",
            },
            StatusExplanation {
                label: "error",
                current_status: "❌ The MX lookup failed, so the delivery configuration could not be assessed.",
                risk: "Email delivery problems cannot be ruled out until the lookup succeeds.",
            },
        ],
    },
    ComponentExplainer {
        kind: RecordKind::Spf,
        what_is: "SPF (Sender Policy Framework) is a guest list for the domain: it tells receiving servers which mail servers are allowed to send on its behalf.",
        statuses: &[
            StatusExplanation {
                label: "valid",
                current_status: "✅ The SPF record is properly configured and helps prevent others from spoofing mail from the domain.",
                risk: "",
            },
            StatusExplanation {
                label: "warning",
                current_status: "⚠️ The SPF record works but could be strengthened for better protection.",
                risk: "Some receivers may not trust mail from the domain as much as they should.",
            },
            StatusExplanation {
                label: "missing",
                current_status: "❌ No SPF record found - anyone can send mail claiming to be from the domain.",
                risk: "Scammers can easily impersonate the domain, and its legitimate mail may be marked as spam.",
            },
            StatusExplanation {
                label: "error",
                current_status: "❌ The SPF lookup failed, so the sending policy could not be assessed.",
                risk: "Spoofing protection cannot be confirmed until the lookup succeeds.",
            },
        ],
    },
    ComponentExplainer {
        kind: RecordKind::Dkim,
        what_is: "DKIM (DomainKeys Identified Mail) puts a digital signature on outgoing mail, proving it really came from the domain and was not tampered with.",
        statuses: &[
            StatusExplanation {
                label: "valid",
                current_status: "✅ DKIM is properly configured; outgoing mail carries verifiable signatures.",
                risk: "",
            },
            StatusExplanation {
                label: "basic",
                current_status: "⚠️ DKIM is working, but a single published key leaves no rotation redundancy.",
                risk: "If the one DKIM key fails, all mail from the domain could be rejected until it is fixed.",
            },
            StatusExplanation {
                label: "missing",
                current_status: "❌ No DKIM keys found - mail from the domain cannot be verified as authentic.",
                risk: "Unsigned mail may be marked as spam or rejected outright.",
            },
            StatusExplanation {
                label: "error",
                current_status: "❌ The DKIM selector probes failed, so signing could not be assessed.",
                risk: "Authentication problems cannot be ruled out until the probes succeed.",
            },
        ],
    },
    ComponentExplainer {
        kind: RecordKind::Dmarc,
        what_is: "DMARC (Domain-based Message Authentication) is the security policy that tells receiving servers what to do with mail that fails the SPF and DKIM checks.",
        statuses: &[
            StatusExplanation {
                label: "valid",
                current_status: "✅ DMARC is properly configured and actively protecting the domain from spoofing.",
                risk: "",
            },
            StatusExplanation {
                label: "monitoring",
                current_status: "⚠️ DMARC is in monitoring mode only: it collects reports but does not block spoofed mail.",
                risk: "Spoofed mail may still reach recipients while the policy stays at 'none'.",
            },
            StatusExplanation {
                label: "missing",
                current_status: "❌ No DMARC policy found - receivers get no instruction for mail that fails authentication.",
                risk: "Even with SPF and DKIM in place, spoofed mail may still be delivered.",
            },
            StatusExplanation {
                label: "invalid",
                current_status: "❌ The DMARC record has syntax errors and will be ignored by receivers.",
                risk: "The authentication policy is not enforced at all.",
            },
            StatusExplanation {
                label: "error",
                current_status: "❌ The DMARC lookup failed, so the enforcement policy could not be assessed.",
                risk: "Spoofing protection cannot be confirmed until the lookup succeeds.",
            },
        ],
    },
];

/// Collapses a component result onto the explanation label it reads as.
pub(crate) fn status_label(component: &ComponentResult) -> &'static str {
    match component.status {
        ResolutionStatus::Error => {
            if component.has_finding("DMARC_MALFORMED") {
                "invalid"
            } else {
                "error"
            }
        }
        ResolutionStatus::NotFound => "missing",
        ResolutionStatus::Found => match component.kind {
            RecordKind::Mx => {
                if component.has_finding("MX_NULL") {
                    "null_mx"
                } else {
                    "valid"
                }
            }
            RecordKind::Spf => {
                let degraded = component
                    .findings
                    .iter()
                    .any(|f| f.severity <= Severity::Warning);
                if degraded { "warning" } else { "valid" }
            }
            RecordKind::Dkim => {
                if component.has_finding("DKIM_SINGLE_SELECTOR") {
                    "basic"
                } else {
                    "valid"
                }
            }
            RecordKind::Dmarc => {
                if component.has_finding("DMARC_POLICY_NONE") {
                    "monitoring"
                } else {
                    "valid"
                }
            }
        },
    }
}

/// Builds the non-technical explanation block for a component result.
pub fn explain_component(component: &ComponentResult) -> ComponentExplanation {
    let label = status_label(component);
    let Some(explainer) = EXPLAINERS.iter().find(|e| e.kind == component.kind) else {
        return ComponentExplanation::default();
    };
    let status = explainer.statuses.iter().find(|s| s.label == label);
    ComponentExplanation {
        what_is: explainer.what_is.to_string(),
        current_status: status.map(|s| s.current_status).unwrap_or_default().to_string(),
        risk_if_misconfigured: status.map(|s| s.risk).unwrap_or_default().to_string(),
    }
}

/// Turns findings into a prioritized, de-duplicated remediation list.
/// Findings are ordered by severity before their remediation text is
/// looked up, so critical fixes come first.
pub fn remediations_for(findings: &[AnalysisFinding]) -> Vec<String> {
    let mut ordered: Vec<&AnalysisFinding> = findings.iter().collect();
    ordered.sort_by_key(|f| f.severity);

    let mut recommendations = Vec::new();
    for finding in ordered {
        if let Some(detail) = get_finding_detail(&finding.code) {
            let text = detail.remediation.to_string();
            if !recommendations.contains(&text) {
                recommendations.push(text);
            }
        }
    }
    recommendations
}
