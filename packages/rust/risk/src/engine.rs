//! Jurisdiction risk scoring.
//!
//! Combines per-clause risk scores with the jurisdiction's weight table into
//! an overall 1–10 rating, and scans the clause set for jurisdiction-mandated
//! topics. Advisory recommendations attach to clause entries but never move
//! the numeric score.

use tracing::debug;

use clauseforge_shared::{
    ClauseRisk, ComplianceIssue, CountryLegalProfile, PreferredDispute, RiskAssessment,
    ScoredClause, Severity,
};

use crate::profiles::ProfileRegistry;

/// Weight applied to categories absent from the profile's weight table.
const DEFAULT_WEIGHT: f64 = 0.5;

/// Overall risk reported when no weight mass exists (e.g. empty clause set).
const NEUTRAL_RISK: u8 = 5;

/// Topic keyword tables, matched case-insensitively against clause contents.
const GOVERNING_LAW_KEYWORDS: &[&str] = &["governing law", "applicable law", "준거법", "관할"];
const DATA_PROTECTION_KEYWORDS: &[&str] = &["data protection", "gdpr", "개인정보"];
const ARBITRATION_KEYWORDS: &[&str] = &["arbitration", "중재"];

/// Scores contracts for a target jurisdiction.
pub struct RiskEngine {
    registry: ProfileRegistry,
}

impl RiskEngine {
    pub fn new(registry: ProfileRegistry) -> Self {
        Self { registry }
    }

    /// Assess a clause set for `country_code`. Recomputed on demand; nothing
    /// is cached across inputs.
    pub fn assess(&self, clauses: &[ScoredClause], country_code: &str) -> RiskAssessment {
        let profile = self.registry.get(country_code);

        let clause_risks: Vec<ClauseRisk> = clauses
            .iter()
            .map(|clause| {
                let weight = profile
                    .risk_weights
                    .get(&clause.category)
                    .copied()
                    .unwrap_or(DEFAULT_WEIGHT);
                ClauseRisk {
                    category: clause.category.clone(),
                    risk_score: clause.risk_score,
                    weight,
                    weighted_risk: clause.risk_score * weight,
                    recommendations: advisories(&profile, clause),
                }
            })
            .collect();

        let weight_sum: f64 = clause_risks.iter().map(|r| r.weight).sum();
        let overall_risk = if weight_sum == 0.0 {
            NEUTRAL_RISK
        } else {
            let weighted_sum: f64 = clause_risks.iter().map(|r| r.weighted_risk).sum();
            (weighted_sum / weight_sum).round().clamp(1.0, 10.0) as u8
        };

        let country_specific_issues = mandated_topic_issues(&profile, clauses);

        debug!(
            country_code,
            overall_risk,
            issues = country_specific_issues.len(),
            "risk assessment computed"
        );

        RiskAssessment {
            overall_risk,
            clause_risks,
            country_specific_issues,
        }
    }
}

fn contains_any(haystack_lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| haystack_lower.contains(kw))
}

/// One `missing_required_clause` issue per mandated topic absent from the set.
fn mandated_topic_issues(
    profile: &CountryLegalProfile,
    clauses: &[ScoredClause],
) -> Vec<ComplianceIssue> {
    let combined = clauses
        .iter()
        .map(|c| c.content.to_lowercase())
        .collect::<Vec<_>>()
        .join("\n");

    let mut issues = Vec::new();

    if profile.governing_law_required && !contains_any(&combined, GOVERNING_LAW_KEYWORDS) {
        issues.push(ComplianceIssue {
            issue_type: "missing_required_clause".into(),
            severity: Severity::High,
            description: format!(
                "no governing-law clause found; {} requires an explicit choice of law",
                profile.country_code
            ),
        });
    }

    if profile.data_protection_required && !contains_any(&combined, DATA_PROTECTION_KEYWORDS) {
        issues.push(ComplianceIssue {
            issue_type: "missing_required_clause".into(),
            severity: Severity::High,
            description: format!(
                "no data-protection clause found; {} mandates one for personal data handling",
                profile.country_code
            ),
        });
    }

    issues
}

/// Jurisdiction-specific textual heuristics. Advisory only.
fn advisories(profile: &CountryLegalProfile, clause: &ScoredClause) -> Vec<String> {
    let mut recommendations = Vec::new();
    let content = clause.content.to_lowercase();

    if profile.preferred_dispute == PreferredDispute::Arbitration {
        if clause.category == "dispute_resolution" && !contains_any(&content, ARBITRATION_KEYWORDS)
        {
            recommendations.push(format!(
                "{} parties commonly resolve disputes through arbitration; consider an arbitration clause",
                profile.country_code
            ));
        }
        if clause.category == "governing_law" && !content.contains("state") {
            recommendations.push(
                "consider naming an explicit state for choice of law and arbitration venue".into(),
            );
        }
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> RiskEngine {
        RiskEngine::new(ProfileRegistry::new())
    }

    fn clause(category: &str, risk_score: f64, content: &str) -> ScoredClause {
        ScoredClause {
            category: category.into(),
            risk_score,
            content: content.into(),
        }
    }

    #[test]
    fn overall_risk_is_integer_in_range() {
        let cases: Vec<Vec<ScoredClause>> = vec![
            vec![clause("payment", 10.0, "준거법은 대한민국 법으로 하며 개인정보를 보호한다")],
            vec![clause("payment", 1.0, "a"), clause("liability", 10.0, "b")],
            vec![clause("unknown_category", 7.3, "c")],
            vec![clause("purpose", 0.5, "d"); 20],
        ];
        let engine = engine();
        for clauses in cases {
            let assessment = engine.assess(&clauses, "KR");
            assert!((1..=10).contains(&assessment.overall_risk));
        }
    }

    #[test]
    fn empty_clause_set_defaults_to_neutral() {
        let assessment = engine().assess(&[], "KR");
        assert_eq!(assessment.overall_risk, 5);
        assert!(assessment.clause_risks.is_empty());
        // Empty contracts are missing everything KR mandates
        assert_eq!(assessment.country_specific_issues.len(), 2);
    }

    #[test]
    fn unknown_category_weighs_half() {
        let assessment = engine().assess(&[clause("exotic", 8.0, "x")], "KR");
        assert_eq!(assessment.clause_risks[0].weight, 0.5);
        assert_eq!(assessment.clause_risks[0].weighted_risk, 4.0);
        assert_eq!(assessment.overall_risk, 8);
    }

    #[test]
    fn weighted_average_rounds() {
        // (2*0.9 + 8*0.9) / 1.8 = 5.0
        let clauses = vec![
            clause("payment", 2.0, "준거법은 대한민국 법으로 한다. 개인정보 보호 조항 포함"),
            clause("liability", 8.0, "손해배상"),
        ];
        let assessment = engine().assess(&clauses, "KR");
        assert_eq!(assessment.overall_risk, 5);
        assert!(assessment.country_specific_issues.is_empty());
    }

    #[test]
    fn missing_data_protection_is_single_high_issue() {
        // Governing law present, data protection absent, KR requires both.
        let clauses = vec![clause(
            "governing_law",
            3.0,
            "본 계약의 준거법은 대한민국 법으로 한다.",
        )];
        let assessment = engine().assess(&clauses, "KR");

        let issues: Vec<_> = assessment
            .country_specific_issues
            .iter()
            .filter(|i| i.issue_type == "missing_required_clause")
            .collect();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::High);
        assert!(issues[0].description.contains("data-protection"));
    }

    #[test]
    fn gdpr_keyword_satisfies_data_protection() {
        let clauses = vec![clause(
            "data_protection",
            4.0,
            "The parties shall comply with GDPR. Governing law is German law.",
        )];
        let assessment = engine().assess(&clauses, "DE");
        assert!(assessment.country_specific_issues.is_empty());
    }

    #[test]
    fn advisories_attach_but_never_move_the_score() {
        let without_arbitration = vec![clause(
            "dispute_resolution",
            6.0,
            "All disputes shall be resolved in court. Governing law applies.",
        )];
        let with_arbitration = vec![clause(
            "dispute_resolution",
            6.0,
            "All disputes shall be resolved by arbitration. Governing law applies.",
        )];

        let engine = engine();
        let a = engine.assess(&without_arbitration, "US");
        let b = engine.assess(&with_arbitration, "US");

        assert!(!a.clause_risks[0].recommendations.is_empty());
        assert!(b.clause_risks[0].recommendations.is_empty());
        assert_eq!(a.overall_risk, b.overall_risk);
    }

    #[test]
    fn unknown_jurisdiction_still_assesses() {
        let assessment = engine().assess(
            &[clause("payment", 5.0, "governing law of the contract is agreed")],
            "ZZ",
        );
        assert!((1..=10).contains(&assessment.overall_risk));
    }
}
