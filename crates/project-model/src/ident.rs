//! Identifier normalization.
//!
//! The editing tool writes the same logical identifier in two spellings:
//! hyphenated (`09A9D66C-2A9C-452B-B1FE-5AA6EBD72927`) and compact
//! (`8B3DF940F26B065CB67321254910507F`). All identifier comparisons go
//! through [`normalize_uuid`] so the two spellings compare equal.

/// Canonicalize a resource or instance identifier: strip hyphens, uppercase.
///
/// Idempotent: `normalize_uuid(&normalize_uuid(x)) == normalize_uuid(x)`.
pub fn normalize_uuid(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_hyphenated_and_compact_spellings_normalize_equal() {
        let hyphenated = "09a9d66c-2a9c-452b-b1fe-5aa6ebd72927";
        let compact = "09A9D66C2A9C452BB1FE5AA6EBD72927";
        assert_eq!(normalize_uuid(hyphenated), normalize_uuid(compact));
        assert_eq!(normalize_uuid(hyphenated), compact);
    }

    #[test]
    fn test_normalize_strips_hyphens_and_uppercases() {
        let normalized = normalize_uuid("a1b2c3d4-e5f6-7890-abcd-ef1234567890");
        assert_eq!(normalized, "A1B2C3D4E5F67890ABCDEF1234567890");
        assert!(!normalized.contains('-'));
    }

    #[test]
    fn test_normalize_already_normalized_is_identity() {
        let compact = "A1B2C3D4E5F67890ABCDEF1234567890";
        assert_eq!(normalize_uuid(compact), compact);
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(raw in "[0-9a-fA-F-]{0,64}") {
            let once = normalize_uuid(&raw);
            prop_assert_eq!(normalize_uuid(&once), once);
        }
    }
}
