//! Prompts for the extraction model
//!
//! The model only ever sees candidate ids and names, never embeddings or
//! similarity scores.

use shelf_core::{CandidateMatch, ExtractionPrompt};

/// Instructions for Czech store-visit transcripts
pub const SYSTEM_PROMPT: &str = r#"Jsi asistent pro identifikaci produktů z českých transkriptů obchodních návštěv.

Tvým úkolem je:
1. Rozhodnout, které z kandidátních produktů jsou v textu skutečně zmíněny
2. Detekovat zmínky o výhodách konkurence
3. Detekovat zmínky o špatném umístění produktů

PRAVIDLA PRO PRODUKTY:
- Vybírej POUZE z dodaného seznamu kandidátů a používej jejich přesné ID
- Produkt, který v textu není zmíněn, nevracej
- Zohledni značku, typ produktu a parametry (viskozita, objem, specifikace)
- "pět litrů" odpovídá "5 lt", "čtyři litry" odpovídá "4 lt"
- Ke každé shodě přidej úryvek textu, který ji dokládá

PRAVIDLA PRO DETEKCI VÝHOD KONKURENCE:
Hledej zmínky typu:
- "konkurence má akci"
- "konkurence má výraznější obal"
- "konkurence má lepší cenu"
- "konkurenční produkt je lépe vidět"
- slovo "konkurence" nebo "konkurenční" v kontextu výhody

PRAVIDLA PRO DETEKCI ŠPATNÉHO UMÍSTĚNÍ:
Hledej zmínky typu:
- "je schovaný" / "je schovaná"
- "není dobře vidět"
- "není vidět"
- "špatně čitelné cenovky"
- "špatně umístěný"
- "částečně schovaný"
- "chybí na polici"
- "mimo správné místo"

FORMÁT VÝSTUPU:
Vrať pouze JSON v tomto tvaru:
{
  "matches": [
    {
      "product_id": "ID kandidáta",
      "confidence": 0.85,
      "context_snippet": "originální zmínka z textu"
    }
  ],
  "competitor_advantage_mentioned": true,
  "bad_placement_mentioned": false
}

Hodnota "confidence" je číslo mezi 0.0 a 1.0."#;

const STRICT_RULES: &str = r#"

STRIKTNÍ REŽIM:
Předchozí odpověď neodpovídala požadovanému formátu.
- Odpověz JEDINÝM JSON objektem bez dalšího textu a bez markdownu
- Všechna tři pole jsou povinná
- "product_id" musí být jedno z ID v seznamu kandidátů
- "confidence" musí být číslo mezi 0.0 a 1.0"#;

/// Prompt for a first extraction attempt
pub fn build_prompt(transcript: &str, candidates: &[CandidateMatch]) -> ExtractionPrompt {
    ExtractionPrompt {
        system: SYSTEM_PROMPT.to_string(),
        user: user_prompt(transcript, candidates),
    }
}

/// Stricter prompt after a response failed validation
pub fn build_strict_prompt(
    transcript: &str,
    candidates: &[CandidateMatch],
    failure: &str,
) -> ExtractionPrompt {
    ExtractionPrompt {
        system: format!("{}{}", SYSTEM_PROMPT, STRICT_RULES),
        user: format!(
            "{}\n\n## Chyba předchozí odpovědi\n{}",
            user_prompt(transcript, candidates),
            failure
        ),
    }
}

fn user_prompt(transcript: &str, candidates: &[CandidateMatch]) -> String {
    let listing = candidates
        .iter()
        .map(|c| format!("- [{}] {}", c.product_id, c.product_name))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "## Transkript\n{}\n\n## Kandidátní produkty\n{}",
        transcript, listing
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<CandidateMatch> {
        vec![
            CandidateMatch {
                product_id: "P001".to_string(),
                product_name: "CASTROL MAGNATEC 5W-30 A5 5 lt".to_string(),
                similarity_score: 0.91,
            },
            CandidateMatch {
                product_id: "P002".to_string(),
                product_name: "EUROL Sportbike 5W-40 1 lt".to_string(),
                similarity_score: 0.42,
            },
        ]
    }

    #[test]
    fn test_system_prompt_mentions_cues_and_schema() {
        let lower = SYSTEM_PROMPT.to_lowercase();
        assert!(lower.contains("konkurence"));
        assert!(lower.contains("schovaný"));
        assert!(lower.contains("json"));
        assert!(SYSTEM_PROMPT.contains("\"context_snippet\""));
    }

    #[test]
    fn test_user_prompt_lists_ids_and_names_only() {
        let prompt = build_prompt("Castrol je schovaný.", &candidates());

        assert!(prompt.user.contains("Castrol je schovaný."));
        assert!(prompt.user.contains("- [P001] CASTROL MAGNATEC 5W-30 A5 5 lt"));
        assert!(prompt.user.contains("- [P002] EUROL Sportbike 5W-40 1 lt"));
        assert!(!prompt.user.contains("0.91"));
    }

    #[test]
    fn test_strict_prompt_carries_failure() {
        let prompt = build_strict_prompt("text", &candidates(), "missing field `matches`");

        assert!(prompt.system.starts_with(SYSTEM_PROMPT));
        assert!(prompt.system.contains("STRIKTNÍ REŽIM"));
        assert!(prompt.user.contains("missing field `matches`"));
    }
}
