//! Registration mark normalization and listing predicates shared by the
//! sync engine and the lookup path.

use serde_json::Value;

/// Lifecycle states that keep a listing visible on the public stock list.
const ACTIVE_STATES: [&str; 2] = ["FORECOURT", "SALE_IN_PROGRESS"];

/// Canonical form of a registration mark: whitespace stripped, uppercased.
/// "AB12 CDE", "ab12cde" and "AB12CDE" all map to the same key.
pub fn normalize_registration(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

/// Registration of a listing, if the payload carries one.
pub fn listing_registration(listing: &Value) -> Option<&str> {
    listing
        .get("vehicle")
        .and_then(|v| v.get("registration"))
        .and_then(Value::as_str)
}

/// Lifecycle state of a listing. The feed usually nests it under
/// `metadata.lifecycleState` but some payloads carry it at the top level.
pub fn lifecycle_state(listing: &Value) -> Option<&str> {
    listing
        .get("metadata")
        .and_then(|m| m.get("lifecycleState"))
        .and_then(Value::as_str)
        .or_else(|| listing.get("lifecycleState").and_then(Value::as_str))
}

/// A listing with no lifecycle state at all is kept; only an explicit
/// non-active state filters it out.
pub fn is_active_listing(listing: &Value) -> bool {
    match lifecycle_state(listing) {
        Some(state) => ACTIVE_STATES
            .iter()
            .any(|active| active.eq_ignore_ascii_case(state)),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalization_collapses_spacing_and_case() {
        assert_eq!(normalize_registration("AB12 CDE"), "AB12CDE");
        assert_eq!(normalize_registration("ab12cde"), "AB12CDE");
        assert_eq!(normalize_registration(" a b 1 2 c d e "), "AB12CDE");
        assert_eq!(
            normalize_registration("AB12 CDE"),
            normalize_registration("ab12cde")
        );
    }

    #[test]
    fn forecourt_and_sale_in_progress_are_active() {
        for state in ["FORECOURT", "SALE_IN_PROGRESS", "forecourt"] {
            let listing = json!({"metadata": {"lifecycleState": state}});
            assert!(is_active_listing(&listing), "state {state} should be active");
        }
    }

    #[test]
    fn sold_and_wastebin_are_inactive() {
        for state in ["SOLD", "WASTEBIN", "DELETED"] {
            let listing = json!({"metadata": {"lifecycleState": state}});
            assert!(!is_active_listing(&listing), "state {state} should drop");
        }
    }

    #[test]
    fn missing_state_is_retained() {
        assert!(is_active_listing(&json!({"vehicle": {}})));
    }

    #[test]
    fn top_level_state_is_read_as_fallback() {
        let listing = json!({"lifecycleState": "SOLD"});
        assert_eq!(lifecycle_state(&listing), Some("SOLD"));
        assert!(!is_active_listing(&listing));
    }

    #[test]
    fn registration_extraction() {
        let listing = json!({"vehicle": {"registration": "AB12CDE"}});
        assert_eq!(listing_registration(&listing), Some("AB12CDE"));
        assert_eq!(listing_registration(&json!({})), None);
    }
}
