// src/core/scoring.rs

use tracing::debug;

use crate::core::knowledge_base;
use crate::core::models::{
    ComponentResult, DmarcAction, Grade, ParsedRecord, ProtectionStatus, RecordKind,
    ResolutionStatus, SecurityLevel, SecuritySummary,
};

// Point maxima per component. They sum to 100.
pub const MX_MAX_POINTS: u8 = 20;
pub const SPF_MAX_POINTS: u8 = 25;
pub const DKIM_MAX_POINTS: u8 = 25;
pub const DMARC_MAX_POINTS: u8 = 30;

// SPF deductions. Chosen so terminal-qualifier strictness stays monotonic:
// -all (25) > ~all (22) > ?all (10) > +all (0).
const SPF_SOFTFAIL_PENALTY: i16 = 3;
const SPF_NEUTRAL_PENALTY: i16 = 15;
const SPF_NO_TERMINAL_PENALTY: i16 = 10;
const SPF_LOOKUP_PENALTY: i16 = 5;

/// SPF's protocol-level ceiling on lookup-triggering mechanisms.
pub const SPF_LOOKUP_LIMIT: usize = 10;

// DKIM key thresholds, in estimated bits.
pub const DKIM_MIN_KEY_BITS: u32 = 1024;
pub const DKIM_RECOMMENDED_KEY_BITS: u32 = 2048;
const DKIM_WEAK_KEY_POINTS: u8 = 15;
const DKIM_REVOKED_ONLY_POINTS: u8 = 5;

// DMARC bases and deductions.
const DMARC_REJECT_POINTS: i16 = 30;
const DMARC_QUARANTINE_POINTS: i16 = 22;
const DMARC_NONE_POINTS: i16 = 12;
const DMARC_PCT_PENALTY: i16 = 4;
const DMARC_NO_RUA_PENALTY: i16 = 4;
// A record that parses at all never scores below this.
const DMARC_PARSED_FLOOR: i16 = 5;

pub fn max_points(kind: RecordKind) -> u8 {
    match kind {
        RecordKind::Mx => MX_MAX_POINTS,
        RecordKind::Spf => SPF_MAX_POINTS,
        RecordKind::Dkim => DKIM_MAX_POINTS,
        RecordKind::Dmarc => DMARC_MAX_POINTS,
    }
}

/// Converts a component's structured findings into its bounded point value.
/// Only `found` components earn points.
pub fn points_for(component: &ComponentResult) -> u8 {
    if component.status != ResolutionStatus::Found {
        return 0;
    }
    let points = match component.kind {
        RecordKind::Mx => {
            if component.has_finding("MX_NULL") {
                0
            } else {
                MX_MAX_POINTS
            }
        }
        RecordKind::Spf => spf_points(component),
        RecordKind::Dkim => dkim_points(component),
        RecordKind::Dmarc => dmarc_points(component),
    };
    debug!(kind = %component.kind, points, "Component scored.");
    points
}

fn spf_points(component: &ComponentResult) -> u8 {
    // "+all" defeats the whole record regardless of anything else.
    if component.has_finding("SPF_ALL_PASS") {
        return 0;
    }
    let mut points = SPF_MAX_POINTS as i16;
    if component.has_finding("SPF_POLICY_NEUTRAL") {
        points -= SPF_NEUTRAL_PENALTY;
    }
    if component.has_finding("SPF_POLICY_SOFTFAIL") {
        points -= SPF_SOFTFAIL_PENALTY;
    }
    if component.has_finding("SPF_NO_TERMINAL") {
        points -= SPF_NO_TERMINAL_PENALTY;
    }
    if component.has_finding("SPF_TOO_MANY_LOOKUPS") {
        points -= SPF_LOOKUP_PENALTY;
    }
    points.max(0) as u8
}

fn dkim_points(component: &ComponentResult) -> u8 {
    let Some(ParsedRecord::Dkim { selectors }) = &component.parsed else {
        return 0;
    };
    // Score the best available key, never an average: one strong selector
    // means the domain signs with a strong key.
    let best = selectors
        .iter()
        .filter_map(|s| s.public_key_length_estimate)
        .max();
    match best {
        Some(bits) if bits >= DKIM_MIN_KEY_BITS => DKIM_MAX_POINTS,
        Some(_) => DKIM_WEAK_KEY_POINTS,
        None => DKIM_REVOKED_ONLY_POINTS,
    }
}

fn dmarc_points(component: &ComponentResult) -> u8 {
    let Some(ParsedRecord::Dmarc(policy)) = &component.parsed else {
        return 0;
    };
    let mut points = match policy.policy {
        DmarcAction::Reject => DMARC_REJECT_POINTS,
        DmarcAction::Quarantine => DMARC_QUARANTINE_POINTS,
        DmarcAction::None => DMARC_NONE_POINTS,
    };
    if component.has_finding("DMARC_PARTIAL_PCT") {
        points -= DMARC_PCT_PENALTY;
    }
    if component.has_finding("DMARC_NO_RUA") {
        points -= DMARC_NO_RUA_PENALTY;
    }
    points.max(DMARC_PARSED_FLOOR) as u8
}

/// Totals across the four components. Errored components are excluded from
/// both the numerator and the denominator and flag the tally as partial.
#[derive(Debug, Clone, Copy)]
pub struct ScoreTally {
    pub points: u8,
    pub max_points: u8,
    pub total_score: Option<u8>,
    pub partial: bool,
}

pub fn tally(components: &[&ComponentResult]) -> ScoreTally {
    let mut points = 0u16;
    let mut max = 0u16;
    let mut partial = false;
    for component in components {
        if component.status == ResolutionStatus::Error {
            partial = true;
            continue;
        }
        points += component.score as u16;
        max += component.max_score as u16;
    }
    let total_score = if max > 0 {
        Some(((points * 100 + max / 2) / max) as u8)
    } else {
        None
    };
    ScoreTally {
        points: points as u8,
        max_points: max as u8,
        total_score,
        partial,
    }
}

/// Fixed, monotonic score-to-grade ladder.
pub fn grade_for(score: u8) -> Grade {
    match score {
        95.. => Grade::APlus,
        85.. => Grade::A,
        80.. => Grade::AMinus,
        75.. => Grade::BPlus,
        70.. => Grade::B,
        65.. => Grade::BMinus,
        60.. => Grade::CPlus,
        55.. => Grade::C,
        50.. => Grade::CMinus,
        45.. => Grade::DPlus,
        40.. => Grade::D,
        _ => Grade::F,
    }
}

/// Plain-English meaning of each grade.
pub fn grade_meaning(grade: Grade) -> &'static str {
    match grade {
        Grade::APlus => "Outstanding email security. The domain is extremely well-protected.",
        Grade::A => "Excellent email security. The configuration is very strong.",
        Grade::AMinus => "Very good email security with minor areas for improvement.",
        Grade::BPlus => "Good email security, but some important components need attention.",
        Grade::B => "Decent email security with several areas that should be improved.",
        Grade::BMinus => "Below average email security. Several important issues need fixing.",
        Grade::CPlus => "Poor email security. The domain is vulnerable to various email attacks.",
        Grade::C => "Poor email security with significant gaps in protection.",
        Grade::CMinus => "Very poor email security. Immediate action needed.",
        Grade::DPlus => "Dangerously poor email security. Only fragments are configured.",
        Grade::D => "Dangerously poor email security. The domain is highly vulnerable.",
        Grade::F => "Failed email security. Critical immediate action required.",
    }
}

/// Builds the plain-English summary block of the report.
pub fn build_summary(
    total_score: Option<u8>,
    grade: Option<Grade>,
    components: &[&ComponentResult],
    priority_actions: Vec<String>,
) -> SecuritySummary {
    let configured = components
        .iter()
        .filter(|c| c.status == ResolutionStatus::Found)
        .count();
    let (security_level, overall_message) = match total_score {
        Some(score) if score >= 85 => (
            SecurityLevel::Excellent,
            "The domain has strong email security configured and is well-protected against most email-based attacks.",
        ),
        Some(score) if score >= 70 => (
            SecurityLevel::Good,
            "The domain has decent email security, with room for improvement against spoofing and phishing.",
        ),
        Some(score) if score >= 50 => (
            SecurityLevel::Fair,
            "The domain has basic email security, but significant gaps leave it vulnerable to spoofing and deliverability issues.",
        ),
        Some(_) => (
            SecurityLevel::Poor,
            "The domain has serious email security gaps and is highly vulnerable to spoofing attacks.",
        ),
        None => (
            SecurityLevel::Unknown,
            "No component could be resolved, so the email security posture could not be assessed.",
        ),
    };
    // Status labels drive the yes/no protection verdicts; "warning",
    // "monitoring" and friends all count against the stricter buckets.
    let label = |kind: RecordKind| {
        components
            .iter()
            .find(|c| c.kind == kind)
            .map(|c| knowledge_base::status_label(c))
            .unwrap_or("missing")
    };
    let (mx, spf, dkim, dmarc) = (
        label(RecordKind::Mx),
        label(RecordKind::Spf),
        label(RecordKind::Dkim),
        label(RecordKind::Dmarc),
    );
    let protection_status = ProtectionStatus {
        spoofing_protection: if spf == "valid" && dmarc == "valid" {
            "Protected"
        } else {
            "Vulnerable"
        }
        .to_string(),
        email_delivery: if mx == "valid" { "Working" } else { "Broken" }.to_string(),
        authentication: if matches!(dkim, "valid" | "basic") && spf == "valid" {
            "Strong"
        } else {
            "Weak"
        }
        .to_string(),
    };

    SecuritySummary {
        security_level,
        overall_message: overall_message.to_string(),
        components_configured: format!("{configured}/4 email security components configured"),
        grade_meaning: grade
            .map(grade_meaning)
            .unwrap_or("No grade could be assigned because no component resolved.")
            .to_string(),
        priority_actions,
        protection_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{AnalysisFinding, Severity};

    #[test]
    fn grade_ladder_matches_every_boundary() {
        let cases = [
            (100, Grade::APlus),
            (95, Grade::APlus),
            (94, Grade::A),
            (85, Grade::A),
            (84, Grade::AMinus),
            (80, Grade::AMinus),
            (79, Grade::BPlus),
            (75, Grade::BPlus),
            (74, Grade::B),
            (70, Grade::B),
            (69, Grade::BMinus),
            (65, Grade::BMinus),
            (64, Grade::CPlus),
            (60, Grade::CPlus),
            (59, Grade::C),
            (55, Grade::C),
            (54, Grade::CMinus),
            (50, Grade::CMinus),
            (49, Grade::DPlus),
            (45, Grade::DPlus),
            (44, Grade::D),
            (40, Grade::D),
            (39, Grade::F),
            (0, Grade::F),
        ];
        for (score, expected) in cases {
            assert_eq!(grade_for(score), expected, "score {score}");
        }
    }

    #[test]
    fn maxima_sum_to_one_hundred() {
        assert_eq!(
            MX_MAX_POINTS + SPF_MAX_POINTS + DKIM_MAX_POINTS + DMARC_MAX_POINTS,
            100
        );
    }

    #[test]
    fn errored_component_is_excluded_from_both_sides() {
        let mut good = ComponentResult::new(RecordKind::Spf);
        good.status = ResolutionStatus::Found;
        good.score = 25;
        let errored = {
            let mut c = ComponentResult::new(RecordKind::Mx);
            c.status = ResolutionStatus::Error;
            c.findings
                .push(AnalysisFinding::new(Severity::Warning, "DNS_LOOKUP_FAILED"));
            c
        };
        let tally = tally(&[&good, &errored]);
        assert!(tally.partial);
        assert_eq!(tally.points, 25);
        assert_eq!(tally.max_points, 25);
        assert_eq!(tally.total_score, Some(100));
    }

    #[test]
    fn no_resolved_component_means_no_score() {
        let mut mx = ComponentResult::new(RecordKind::Mx);
        mx.status = ResolutionStatus::Error;
        let tally = tally(&[&mx]);
        assert_eq!(tally.total_score, None);
        let summary = build_summary(tally.total_score, None, &[&mx], Vec::new());
        assert_eq!(summary.security_level, SecurityLevel::Unknown);
        assert!(summary.grade_meaning.contains("No grade"));
    }

    #[test]
    fn every_grade_has_a_meaning() {
        let grades = [
            Grade::APlus,
            Grade::A,
            Grade::AMinus,
            Grade::BPlus,
            Grade::B,
            Grade::BMinus,
            Grade::CPlus,
            Grade::C,
            Grade::CMinus,
            Grade::DPlus,
            Grade::D,
            Grade::F,
        ];
        for grade in grades {
            assert!(!grade_meaning(grade).is_empty(), "grade {grade}");
        }
    }

    #[test]
    fn protection_status_reflects_component_health() {
        let found = |kind| {
            let mut c = ComponentResult::new(kind);
            c.status = ResolutionStatus::Found;
            c
        };
        let mx = found(RecordKind::Mx);
        let spf = found(RecordKind::Spf);
        let dkim = found(RecordKind::Dkim);
        let dmarc = found(RecordKind::Dmarc);
        let summary =
            build_summary(Some(100), Some(Grade::APlus), &[&mx, &spf, &dkim, &dmarc], Vec::new());
        assert_eq!(summary.protection_status.spoofing_protection, "Protected");
        assert_eq!(summary.protection_status.email_delivery, "Working");
        assert_eq!(summary.protection_status.authentication, "Strong");
        assert!(summary.grade_meaning.contains("Outstanding"));

        // A monitoring-only DMARC policy downgrades the spoofing verdict.
        let mut monitoring = found(RecordKind::Dmarc);
        monitoring
            .findings
            .push(AnalysisFinding::new(Severity::Warning, "DMARC_POLICY_NONE"));
        let summary =
            build_summary(Some(80), Some(Grade::AMinus), &[&mx, &spf, &dkim, &monitoring], Vec::new());
        assert_eq!(summary.protection_status.spoofing_protection, "Vulnerable");

        // No MX at all means delivery is broken even when the rest is fine.
        let missing_mx = ComponentResult::new(RecordKind::Mx);
        let summary = build_summary(
            Some(80),
            Some(Grade::AMinus),
            &[&missing_mx, &spf, &dkim, &dmarc],
            Vec::new(),
        );
        assert_eq!(summary.protection_status.email_delivery, "Broken");
    }
}
