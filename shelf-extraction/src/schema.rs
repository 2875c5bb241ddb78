//! Validation of raw model output against the extraction schema

use std::collections::HashMap;

use serde::Deserialize;
use shelf_core::{CandidateMatch, ExtractedMatch};
use tracing::{debug, warn};

/// Outcome of checking one model response
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedExtraction {
    Valid(ExtractionPayload),
    /// Response did not satisfy the schema; carries the reason
    Invalid(String),
}

/// A schema-conforming response restricted to the supplied candidates
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionPayload {
    /// Candidate matches in response order, one per product id
    pub matches: Vec<ExtractedMatch>,
    pub competitor_advantage_mentioned: bool,
    pub bad_placement_mentioned: bool,
    /// Ids the model returned that were not among the candidates
    pub dropped_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawExtraction {
    #[serde(alias = "matched_products")]
    matches: Vec<RawMatch>,
    competitor_advantage_mentioned: bool,
    bad_placement_mentioned: bool,
}

#[derive(Debug, Deserialize)]
struct RawMatch {
    product_id: String,
    confidence: f64,
    #[serde(alias = "context")]
    context_snippet: String,
}

/// Extract JSON from a string that might contain markdown code blocks
pub fn extract_json(content: &str) -> Option<&str> {
    if let Some(start) = content.find("```json") {
        let start = start + 7;
        if let Some(end) = content[start..].find("```") {
            return Some(content[start..start + end].trim());
        }
    }

    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (start < end).then(|| &content[start..=end])
}

/// Check a raw response and keep only matches naming a supplied candidate
///
/// Unknown ids are dropped rather than failing the response, whatever else
/// they carry. Kept matches need a confidence in `[0, 1]` and a non-blank
/// snippet. Repeated ids collapse to the entry with the highest confidence.
pub fn validate_response(raw: &str, candidates: &[CandidateMatch]) -> ValidatedExtraction {
    let Some(json) = extract_json(raw) else {
        return ValidatedExtraction::Invalid("No JSON object found in response".to_string());
    };

    let parsed: RawExtraction = match serde_json::from_str(json) {
        Ok(parsed) => parsed,
        Err(e) => return ValidatedExtraction::Invalid(format!("Schema mismatch: {}", e)),
    };

    let names: HashMap<&str, &str> = candidates
        .iter()
        .map(|c| (c.product_id.as_str(), c.product_name.as_str()))
        .collect();

    let mut matches: Vec<ExtractedMatch> = Vec::new();
    let mut dropped_ids = Vec::new();

    for m in parsed.matches {
        let Some(name) = names.get(m.product_id.as_str()) else {
            warn!("Model returned id outside candidate set: {}", m.product_id);
            dropped_ids.push(m.product_id);
            continue;
        };

        if !m.confidence.is_finite() || !(0.0..=1.0).contains(&m.confidence) {
            return ValidatedExtraction::Invalid(format!(
                "confidence for {} must be within 0.0 - 1.0, got {}",
                m.product_id, m.confidence
            ));
        }
        if m.context_snippet.trim().is_empty() {
            return ValidatedExtraction::Invalid(format!(
                "context_snippet for {} is empty",
                m.product_id
            ));
        }

        match matches.iter_mut().find(|e| e.product_id == m.product_id) {
            Some(existing) => {
                debug!("Duplicate match for {}", m.product_id);
                if m.confidence > existing.confidence {
                    existing.confidence = m.confidence;
                    existing.context_snippet = m.context_snippet;
                }
            }
            None => matches.push(ExtractedMatch {
                product_id: m.product_id,
                product_name: name.to_string(),
                confidence: m.confidence,
                context_snippet: m.context_snippet,
            }),
        }
    }

    ValidatedExtraction::Valid(ExtractionPayload {
        matches,
        competitor_advantage_mentioned: parsed.competitor_advantage_mentioned,
        bad_placement_mentioned: parsed.bad_placement_mentioned,
        dropped_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<CandidateMatch> {
        vec![
            CandidateMatch {
                product_id: "P001".to_string(),
                product_name: "CASTROL MAGNATEC 5W-30 A5 5 lt".to_string(),
                similarity_score: 0.9,
            },
            CandidateMatch {
                product_id: "P002".to_string(),
                product_name: "SHERON Celoroční ostřikovač eMotion -5 °C 4 lt".to_string(),
                similarity_score: 0.6,
            },
        ]
    }

    fn expect_valid(raw: &str) -> ExtractionPayload {
        match validate_response(raw, &candidates()) {
            ValidatedExtraction::Valid(payload) => payload,
            ValidatedExtraction::Invalid(reason) => panic!("unexpected invalid: {}", reason),
        }
    }

    #[test]
    fn test_extract_json_variants() {
        assert_eq!(extract_json("```json\n{\"a\":1}\n```"), Some("{\"a\":1}"));
        assert_eq!(extract_json("Here you go: {\"a\":1} done"), Some("{\"a\":1}"));
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_valid_response_takes_names_from_candidates() {
        let payload = expect_valid(
            r#"{"matches":[{"product_id":"P001","confidence":0.92,"context_snippet":"Castrol Magnatec"}],
                "competitor_advantage_mentioned":false,"bad_placement_mentioned":true}"#,
        );

        assert_eq!(payload.matches.len(), 1);
        assert_eq!(payload.matches[0].product_name, "CASTROL MAGNATEC 5W-30 A5 5 lt");
        assert!(payload.bad_placement_mentioned);
        assert!(!payload.competitor_advantage_mentioned);
    }

    #[test]
    fn test_unknown_ids_are_dropped() {
        let payload = expect_valid(
            r#"{"matches":[{"product_id":"X999","confidence":0.99,"context_snippet":"?"},
                           {"product_id":"P002","confidence":0.8,"context_snippet":"Sheron"}],
                "competitor_advantage_mentioned":true,"bad_placement_mentioned":false}"#,
        );

        assert_eq!(payload.matches.len(), 1);
        assert_eq!(payload.matches[0].product_id, "P002");
        assert_eq!(payload.dropped_ids, vec!["X999".to_string()]);
    }

    #[test]
    fn test_unknown_ids_are_dropped_before_range_check() {
        let payload = expect_valid(
            r#"{"matches":[{"product_id":"X9","confidence":1.3,"context_snippet":"?"},
                           {"product_id":"P001","confidence":0.9,"context":"Castrol Magnatec"}],
                "competitor_advantage_mentioned":false,"bad_placement_mentioned":false}"#,
        );

        assert_eq!(payload.dropped_ids, vec!["X9".to_string()]);
        assert_eq!(payload.matches.len(), 1);
        assert_eq!(payload.matches[0].context_snippet, "Castrol Magnatec");
    }

    #[test]
    fn test_duplicate_ids_keep_highest_confidence() {
        let payload = expect_valid(
            r#"{"matches":[{"product_id":"P001","confidence":0.6,"context_snippet":"a"},
                           {"product_id":"P001","confidence":0.9,"context_snippet":"b"}],
                "competitor_advantage_mentioned":false,"bad_placement_mentioned":false}"#,
        );

        assert_eq!(payload.matches.len(), 1);
        assert_eq!(payload.matches[0].confidence, 0.9);
        assert_eq!(payload.matches[0].context_snippet, "b");
    }

    #[test]
    fn test_invalid_responses() {
        let cases = [
            "I could not find anything.",
            r#"{"matches":[]}"#,
            r#"{"matches":[{"product_id":"P001","confidence":1.4}],"competitor_advantage_mentioned":false,"bad_placement_mentioned":false}"#,
            r#"{"matches":[{"product_id":"P001","confidence":"high"}],"competitor_advantage_mentioned":false,"bad_placement_mentioned":false}"#,
            r#"{"matches":[{"product_id":"P001","confidence":0.9}],"competitor_advantage_mentioned":false,"bad_placement_mentioned":false}"#,
            r#"{"matches":[{"product_id":"P001","confidence":0.9,"context_snippet":"  "}],"competitor_advantage_mentioned":false,"bad_placement_mentioned":false}"#,
            r#"{"matches":[{"product_id":"P001","confidence":-0.1,"context_snippet":"Castrol"}],"competitor_advantage_mentioned":false,"bad_placement_mentioned":false}"#,
        ];

        for raw in cases {
            assert!(
                matches!(validate_response(raw, &candidates()), ValidatedExtraction::Invalid(_)),
                "expected invalid for {}",
                raw
            );
        }
    }

    #[test]
    fn test_empty_matches_are_valid() {
        let payload = expect_valid(
            "```json\n{\"matches\":[],\"competitor_advantage_mentioned\":true,\"bad_placement_mentioned\":false}\n```",
        );
        assert!(payload.matches.is_empty());
        assert!(payload.competitor_advantage_mentioned);
    }
}
