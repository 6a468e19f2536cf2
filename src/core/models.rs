// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::core::knowledge_base;
use crate::core::resolver::DnsError;
use crate::core::scoring;

// --- Core data models ---

/// The four record kinds the engine analyzes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecordKind {
    Mx,
    Spf,
    Dkim,
    Dmarc,
}

/// Outcome of resolving a record. "Not found" is an expected, normal finding,
/// kept distinct from a transport or parse error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Found,
    NotFound,
    Error,
}

/// Severity level of a finding. Ordering follows declaration order, so
/// sorting puts `Critical` first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

/// An analysis finding: a severity, a machine-readable code and an optional
/// detail string carrying record-specific context (e.g. `pct=50`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisFinding {
    pub severity: Severity,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AnalysisFinding {
    pub fn new(severity: Severity, code: &str) -> Self {
        Self {
            severity,
            code: code.to_string(),
            detail: None,
        }
    }

    pub fn with_detail(severity: Severity, code: &str, detail: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.to_string(),
            detail: Some(detail.into()),
        }
    }

    /// Renders the finding as a human-readable issue string, using the issue
    /// summary from the knowledge base and appending the detail when present.
    pub fn render(&self) -> String {
        let summary = knowledge_base::get_finding_detail(&self.code)
            .map(|d| d.summary)
            .unwrap_or(self.code.as_str());
        match &self.detail {
            Some(detail) => format!("{} ({})", summary, detail),
            None => summary.to_string(),
        }
    }
}

// --- MX models ---

/// A single mail exchange host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MxHost {
    pub preference: u16,
    pub exchange: String,
}

// --- SPF models ---

/// Mechanism (and modifier) kinds of an SPF record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpfMechanismKind {
    All,
    Include,
    A,
    Mx,
    Ip4,
    Ip6,
    Exists,
    Ptr,
    Redirect,
}

impl SpfMechanismKind {
    /// Whether evaluating this mechanism costs one of SPF's 10 DNS lookups.
    pub fn triggers_lookup(self) -> bool {
        matches!(
            self,
            SpfMechanismKind::Include
                | SpfMechanismKind::A
                | SpfMechanismKind::Mx
                | SpfMechanismKind::Exists
                | SpfMechanismKind::Redirect
        )
    }
}

/// The `{+,-,~,?}` prefix of an SPF mechanism.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SpfQualifier {
    #[serde(rename = "+")]
    Pass,
    #[serde(rename = "-")]
    Fail,
    #[serde(rename = "~")]
    SoftFail,
    #[serde(rename = "?")]
    Neutral,
}

impl SpfQualifier {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(SpfQualifier::Pass),
            '-' => Some(SpfQualifier::Fail),
            '~' => Some(SpfQualifier::SoftFail),
            '?' => Some(SpfQualifier::Neutral),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            SpfQualifier::Pass => '+',
            SpfQualifier::Fail => '-',
            SpfQualifier::SoftFail => '~',
            SpfQualifier::Neutral => '?',
        }
    }
}

/// One SPF term. SPF evaluates left to right and the first match wins, so
/// the position inside [`SpfRecord::mechanisms`] is significant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpfMechanism {
    pub kind: SpfMechanismKind,
    pub qualifier: SpfQualifier,
    pub value: String,
}

/// A parsed SPF record: the ordered mechanism list plus any terms the
/// tokenizer did not recognize.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpfRecord {
    pub mechanisms: Vec<SpfMechanism>,
    pub unknown_terms: Vec<String>,
}

// --- DKIM models ---

/// A DKIM key record found at `{selector}._domainkey.{domain}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DkimSelectorRecord {
    pub selector: String,
    pub version: Option<String>,
    pub key_type: String,
    pub hash_algorithms: Vec<String>,
    /// Rough key size in bits, estimated from the length of the base64
    /// `p=` payload. `None` when the key is empty (revoked).
    pub public_key_length_estimate: Option<u32>,
    pub flags: Vec<String>,
    pub services: Vec<String>,
}

// --- DMARC models ---

/// The disposition a DMARC policy requests for unaligned mail.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DmarcAction {
    None,
    Quarantine,
    Reject,
}

impl DmarcAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Some(DmarcAction::None),
            "quarantine" => Some(DmarcAction::Quarantine),
            "reject" => Some(DmarcAction::Reject),
            _ => Option::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DmarcAction::None => "none",
            DmarcAction::Quarantine => "quarantine",
            DmarcAction::Reject => "reject",
        }
    }
}

/// DMARC identifier alignment mode (`aspf`/`adkim`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentMode {
    Relaxed,
    Strict,
}

impl AlignmentMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "r" => Some(AlignmentMode::Relaxed),
            "s" => Some(AlignmentMode::Strict),
            _ => None,
        }
    }

    pub fn as_tag(self) -> &'static str {
        match self {
            AlignmentMode::Relaxed => "r",
            AlignmentMode::Strict => "s",
        }
    }
}

/// A parsed DMARC policy, with RFC 7489 defaults applied for omitted tags
/// (`pct=100`, relaxed alignment, `sp` inheriting `p`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DmarcPolicy {
    pub version: String,
    pub policy: DmarcAction,
    pub subdomain_policy: DmarcAction,
    pub alignment_spf: AlignmentMode,
    pub alignment_dkim: AlignmentMode,
    pub percentage: u8,
    pub report_uri: Vec<String>,
    pub forensic_uri: Vec<String>,
}

impl DmarcPolicy {
    /// Serializes the policy back to `key=value; ...` form. Re-parsing the
    /// output yields an identical structure.
    pub fn to_record_string(&self) -> String {
        let mut parts = vec![
            format!("v={}", self.version),
            format!("p={}", self.policy.as_str()),
            format!("sp={}", self.subdomain_policy.as_str()),
            format!("adkim={}", self.alignment_dkim.as_tag()),
            format!("aspf={}", self.alignment_spf.as_tag()),
            format!("pct={}", self.percentage),
        ];
        if !self.report_uri.is_empty() {
            parts.push(format!("rua={}", self.report_uri.join(",")));
        }
        if !self.forensic_uri.is_empty() {
            parts.push(format!("ruf={}", self.forensic_uri.join(",")));
        }
        parts.join("; ")
    }
}

// --- Component result ---

/// The parsed structure of a component, tagged by record kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ParsedRecord {
    Mx { hosts: Vec<MxHost> },
    Spf(SpfRecord),
    Dkim { selectors: Vec<DkimSelectorRecord> },
    Dmarc(DmarcPolicy),
}

/// Non-technical explanation of a component, for readers who do not know
/// what the record kind is or why its state matters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentExplanation {
    pub what_is: String,
    pub current_status: String,
    /// Empty when the component is in good shape.
    pub risk_if_misconfigured: String,
}

/// Per-record-kind analysis outcome.
///
/// `score` is in `[0, max_score]` when the status is `found` and 0
/// otherwise; errored components are additionally excluded from the report
/// denominator by the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentResult {
    pub kind: RecordKind,
    pub status: ResolutionStatus,
    pub raw_records: Vec<String>,
    pub parsed: Option<ParsedRecord>,
    pub score: u8,
    pub max_score: u8,
    pub findings: Vec<AnalysisFinding>,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub explanation: ComponentExplanation,
}

impl ComponentResult {
    /// An empty result for `kind`, starting as `not_found` with score 0.
    pub fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            status: ResolutionStatus::NotFound,
            raw_records: Vec::new(),
            parsed: None,
            score: 0,
            max_score: scoring::max_points(kind),
            findings: Vec::new(),
            issues: Vec::new(),
            recommendations: Vec::new(),
            explanation: ComponentExplanation::default(),
        }
    }

    /// A result for a component whose lookup failed outright. The transport
    /// error is preserved in the finding detail so the report keeps "lookup
    /// error" distinguishable from "record not configured".
    pub fn lookup_error(kind: RecordKind, error: &DnsError) -> Self {
        let mut result = Self::new(kind);
        result.status = ResolutionStatus::Error;
        result.findings.push(AnalysisFinding::with_detail(
            Severity::Warning,
            "DNS_LOOKUP_FAILED",
            error.to_string(),
        ));
        result.finalize();
        result
    }

    /// Sorts findings by severity and renders the issue, recommendation and
    /// explanation text from the knowledge base. Analyzers call this last.
    pub fn finalize(&mut self) {
        self.findings.sort_by_key(|f| f.severity);
        self.issues = self.findings.iter().map(|f| f.render()).collect();
        self.recommendations = knowledge_base::remediations_for(&self.findings);
        self.explanation = knowledge_base::explain_component(self);
    }

    pub fn has_finding(&self, code: &str) -> bool {
        self.findings.iter().any(|f| f.code == code)
    }
}

// --- Report ---

/// Letter grade derived from the total score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
pub enum Grade {
    #[serde(rename = "A+")]
    #[strum(serialize = "A+")]
    APlus,
    #[serde(rename = "A")]
    #[strum(serialize = "A")]
    A,
    #[serde(rename = "A-")]
    #[strum(serialize = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    #[strum(serialize = "B+")]
    BPlus,
    #[serde(rename = "B")]
    #[strum(serialize = "B")]
    B,
    #[serde(rename = "B-")]
    #[strum(serialize = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    #[strum(serialize = "C+")]
    CPlus,
    #[serde(rename = "C")]
    #[strum(serialize = "C")]
    C,
    #[serde(rename = "C-")]
    #[strum(serialize = "C-")]
    CMinus,
    #[serde(rename = "D+")]
    #[strum(serialize = "D+")]
    DPlus,
    #[serde(rename = "D")]
    #[strum(serialize = "D")]
    D,
    #[serde(rename = "F")]
    #[strum(serialize = "F")]
    F,
}

/// Overall security level used in the plain-English summary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
pub enum SecurityLevel {
    Excellent,
    Good,
    Fair,
    Poor,
    Unknown,
}

/// At-a-glance answers to the three questions a domain owner actually has:
/// can others spoof us, does our mail get delivered, is our mail verifiable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProtectionStatus {
    /// "Protected" or "Vulnerable".
    pub spoofing_protection: String,
    /// "Working" or "Broken".
    pub email_delivery: String,
    /// "Strong" or "Weak".
    pub authentication: String,
}

/// Plain-English wrap-up of the analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecuritySummary {
    pub security_level: SecurityLevel,
    pub overall_message: String,
    pub components_configured: String,
    pub grade_meaning: String,
    pub priority_actions: Vec<String>,
    pub protection_status: ProtectionStatus,
}

/// The top-level report returned to the caller. Immutable once built; the
/// engine holds no state across calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainAnalysisReport {
    pub domain: String,
    pub generated_at: DateTime<Utc>,
    pub mx: ComponentResult,
    pub spf: ComponentResult,
    pub dkim: ComponentResult,
    pub dmarc: ComponentResult,
    /// Raw points earned across the components that resolved.
    pub points: u8,
    /// Sum of the maxima of the components that resolved (100 unless the
    /// report is partial).
    pub max_points: u8,
    /// Total score normalized to 0-100, `None` if no component resolved.
    pub total_score: Option<u8>,
    pub grade: Option<Grade>,
    /// True when at least one component errored; its points are excluded
    /// from both `points` and `max_points`.
    pub partial: bool,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub summary: SecuritySummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spf_qualifier_chars_round_trip() {
        for c in ['+', '-', '~', '?'] {
            let q = SpfQualifier::from_char(c).unwrap();
            assert_eq!(q.as_char(), c);
        }
        assert!(SpfQualifier::from_char('x').is_none());
    }

    #[test]
    fn finding_render_appends_detail() {
        let finding =
            AnalysisFinding::with_detail(Severity::Warning, "DMARC_PARTIAL_PCT", "pct=50");
        let rendered = finding.render();
        assert!(rendered.contains("(pct=50)"), "got: {rendered}");
    }

    #[test]
    fn severity_orders_critical_first() {
        let mut severities = vec![Severity::Info, Severity::Critical, Severity::Warning];
        severities.sort();
        assert_eq!(
            severities,
            vec![Severity::Critical, Severity::Warning, Severity::Info]
        );
    }

    #[test]
    fn parsed_record_serializes_with_kind_tag() {
        let parsed = ParsedRecord::Mx {
            hosts: vec![MxHost {
                preference: 10,
                exchange: "mail.example.com".to_string(),
            }],
        };
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["kind"], "mx");
        assert_eq!(json["hosts"][0]["preference"], 10);
    }
}
