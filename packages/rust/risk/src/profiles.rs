//! Country legal-profile registry.
//!
//! Profiles for KR, US, DE, and JP ship built in; any other country code
//! lazily materializes the generic default with that code, so a missing
//! profile is never fatal.

use std::collections::HashMap;

use clauseforge_shared::{
    CountryLegalProfile, DEFAULT_COUNTRY, LegalSystem, PreferredDispute, default_taxonomy,
};

/// Serves per-jurisdiction legal profiles, explicit upserts first.
#[derive(Default)]
pub struct ProfileRegistry {
    overrides: HashMap<String, CountryLegalProfile>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a profile (e.g. one loaded from storage).
    pub fn upsert(&mut self, profile: CountryLegalProfile) {
        self.overrides
            .insert(profile.country_code.clone(), profile);
    }

    /// Resolve a profile: override → built-in → generic default carrying the
    /// requested code.
    pub fn get(&self, country_code: &str) -> CountryLegalProfile {
        if let Some(profile) = self.overrides.get(country_code) {
            return profile.clone();
        }
        builtin_profile(country_code).unwrap_or_else(|| {
            tracing::debug!(country_code, "no profile found, materializing default");
            generic_profile(country_code)
        })
    }
}

fn weights(entries: &[(&str, f64)]) -> HashMap<String, f64> {
    entries.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
}

fn builtin_profile(country_code: &str) -> Option<CountryLegalProfile> {
    match country_code {
        "KR" => Some(CountryLegalProfile {
            country_code: "KR".into(),
            legal_system: LegalSystem::CivilLaw,
            preferred_dispute: PreferredDispute::Litigation,
            governing_law_required: true,
            data_protection_required: true,
            risk_weights: weights(&[
                ("payment", 0.9),
                ("liability", 0.9),
                ("data_protection", 0.9),
                ("termination", 0.7),
                ("confidentiality", 0.7),
                ("dispute_resolution", 0.7),
                ("governing_law", 0.6),
                ("intellectual_property", 0.8),
                ("term", 0.5),
                ("purpose", 0.3),
            ]),
            prompt_template: "대한민국 법률(민법, 상법, 개인정보 보호법)을 기준으로 분석하십시오."
                .into(),
        }),
        "US" => Some(CountryLegalProfile {
            country_code: "US".into(),
            legal_system: LegalSystem::CommonLaw,
            preferred_dispute: PreferredDispute::Arbitration,
            governing_law_required: true,
            data_protection_required: false,
            risk_weights: weights(&[
                ("liability", 1.0),
                ("dispute_resolution", 0.9),
                ("payment", 0.8),
                ("intellectual_property", 0.9),
                ("termination", 0.7),
                ("confidentiality", 0.7),
                ("governing_law", 0.8),
                ("term", 0.5),
                ("purpose", 0.3),
            ]),
            prompt_template:
                "Analyze under U.S. common-law doctrine; state-level choice of law matters.".into(),
        }),
        "DE" => Some(CountryLegalProfile {
            country_code: "DE".into(),
            legal_system: LegalSystem::CivilLaw,
            preferred_dispute: PreferredDispute::Litigation,
            governing_law_required: true,
            data_protection_required: true,
            risk_weights: weights(&[
                ("data_protection", 1.0),
                ("liability", 0.9),
                ("payment", 0.8),
                ("termination", 0.8),
                ("confidentiality", 0.7),
                ("dispute_resolution", 0.7),
                ("governing_law", 0.6),
                ("term", 0.5),
                ("purpose", 0.3),
            ]),
            prompt_template: "Nach deutschem Recht (BGB, DSGVO) analysieren.".into(),
        }),
        "JP" => Some(CountryLegalProfile {
            country_code: "JP".into(),
            legal_system: LegalSystem::CivilLaw,
            preferred_dispute: PreferredDispute::Mediation,
            governing_law_required: true,
            data_protection_required: true,
            risk_weights: weights(&[
                ("payment", 0.8),
                ("liability", 0.8),
                ("data_protection", 0.8),
                ("termination", 0.7),
                ("confidentiality", 0.8),
                ("dispute_resolution", 0.6),
                ("governing_law", 0.6),
                ("term", 0.5),
                ("purpose", 0.3),
            ]),
            prompt_template: "日本法（民法、個人情報保護法）に基づいて分析してください。".into(),
        }),
        _ => None,
    }
}

/// Generic fallback profile; weights come from the default taxonomy.
fn generic_profile(country_code: &str) -> CountryLegalProfile {
    let code = if country_code.is_empty() {
        DEFAULT_COUNTRY
    } else {
        country_code
    };
    CountryLegalProfile {
        country_code: code.into(),
        legal_system: LegalSystem::Mixed,
        preferred_dispute: PreferredDispute::Litigation,
        governing_law_required: true,
        data_protection_required: false,
        risk_weights: default_taxonomy()
            .into_iter()
            .map(|c| (c.key, c.risk_weight))
            .collect(),
        prompt_template: "Analyze as a neutral cross-border commercial contract.".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_profiles_resolve() {
        let registry = ProfileRegistry::new();
        let kr = registry.get("KR");
        assert_eq!(kr.legal_system, LegalSystem::CivilLaw);
        assert!(kr.data_protection_required);

        let us = registry.get("US");
        assert_eq!(us.preferred_dispute, PreferredDispute::Arbitration);
        assert!(!us.data_protection_required);
    }

    #[test]
    fn unknown_country_materializes_default_with_code() {
        let registry = ProfileRegistry::new();
        let profile = registry.get("BR");
        assert_eq!(profile.country_code, "BR");
        assert_eq!(profile.legal_system, LegalSystem::Mixed);
        assert!(profile.risk_weights.contains_key("payment"));
    }

    #[test]
    fn upsert_overrides_builtin() {
        let mut registry = ProfileRegistry::new();
        let mut custom = registry.get("KR");
        custom.data_protection_required = false;
        registry.upsert(custom);

        assert!(!registry.get("KR").data_protection_required);
        // Other codes are untouched
        assert!(registry.get("DE").data_protection_required);
    }
}
