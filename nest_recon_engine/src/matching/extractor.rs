//! Candidate-token extraction from bank transaction narratives.
//!
//! Bank feeds bury the payer's name inside boilerplate ("PAYMENT FROM ...", reference digits,
//! branch codes). This module reduces a raw description + payee pair to a small bounded set of
//! tokens worth comparing against invoice names. Pure and deterministic; all fuzziness lives in
//! [`super::similarity`].

/// Known bank-boilerplate lead-ins, stripped by case-insensitive prefix match before
/// tokenisation. Order matters only in that stripping repeats until no prefix applies.
const BOILERPLATE_PREFIXES: &[&str] = &[
    "payment from",
    "payment received",
    "transfer from",
    "deposit from",
    "cash deposit",
    "eft from",
    "internet banking",
];

/// Fragments this short ("a", "jv", initials) carry no matching signal on their own.
const MIN_FRAGMENT_LEN: usize = 3;

/// Extract the candidate name tokens for a transaction.
///
/// In order: boilerplate prefixes are stripped, digits removed, and the remainder split on
/// whitespace with fragments shorter than [`MIN_FRAGMENT_LEN`] discarded. The full cleaned string
/// is kept as one candidate (a multi-word narrative often *is* the payer's full name), and the
/// payee field rides along verbatim when the bank supplied one. Duplicates are dropped by exact
/// string equality only.
pub fn extract_candidates(description: &str, payee: Option<&str>) -> Vec<String> {
    let stripped = strip_boilerplate(description);
    let cleaned = stripped.chars().filter(|c| !c.is_ascii_digit()).collect::<String>();
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut candidates: Vec<String> =
        cleaned.split_whitespace().filter(|w| w.len() >= MIN_FRAGMENT_LEN).map(str::to_string).collect();
    if !cleaned.is_empty() {
        push_unique(&mut candidates, cleaned);
    }
    if let Some(payee) = payee {
        if !payee.trim().is_empty() {
            push_unique(&mut candidates, payee.to_string());
        }
    }
    candidates
}

fn strip_boilerplate(description: &str) -> String {
    let mut rest = description.trim();
    loop {
        let lower = rest.to_lowercase();
        let Some(prefix) = BOILERPLATE_PREFIXES.iter().find(|p| lower.starts_with(*p)) else {
            break;
        };
        rest = rest[prefix.len()..].trim_start_matches([' ', ':', '-']);
    }
    rest.to_string()
}

fn push_unique(candidates: &mut Vec<String>, value: String) {
    if !candidates.contains(&value) {
        candidates.push(value);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn strips_boilerplate_prefixes_case_insensitively() {
        assert_eq!(strip_boilerplate("PAYMENT FROM: T MOKOENA"), "T MOKOENA");
        assert_eq!(strip_boilerplate("transfer from J Smith"), "J Smith");
        assert_eq!(strip_boilerplate("Cash Deposit - Branch 4401"), "Branch 4401");
        // No prefix leaves the narrative untouched
        assert_eq!(strip_boilerplate("T MOKOENA FEES"), "T MOKOENA FEES");
    }

    #[test]
    fn stacked_prefixes_are_all_stripped() {
        assert_eq!(strip_boilerplate("Payment from cash deposit S Pillay"), "S Pillay");
    }

    #[test]
    fn digits_and_short_fragments_are_dropped() {
        let tokens = extract_candidates("PAYMENT FROM S NAIDOO 4401992", None);
        // "S" is too short to be a token, but survives inside the full cleaned string
        assert_eq!(tokens, vec!["NAIDOO".to_string(), "S NAIDOO".to_string()]);
    }

    #[test]
    fn full_cleaned_string_is_a_candidate() {
        let tokens = extract_candidates("Thandi van der Merwe", None);
        assert!(tokens.contains(&"Thandi".to_string()));
        assert!(tokens.contains(&"Merwe".to_string()));
        assert!(tokens.contains(&"Thandi van der Merwe".to_string()));
    }

    #[test]
    fn payee_rides_along_verbatim_when_distinct() {
        let tokens = extract_candidates("EFT FROM 66120", Some("P. Dlamini"));
        assert_eq!(tokens, vec!["P. Dlamini".to_string()]);

        // Identical payee is not duplicated
        let tokens = extract_candidates("Mokoena", Some("Mokoena"));
        assert_eq!(tokens, vec!["Mokoena".to_string()]);
    }

    #[test]
    fn empty_inputs_yield_no_candidates() {
        assert!(extract_candidates("", None).is_empty());
        assert!(extract_candidates("  12345 67 ", Some("   ")).is_empty());
    }
}
