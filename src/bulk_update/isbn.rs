//! ISBN normalization for catalog matching.

/// Canonicalize an ISBN for matching: strip hyphens and whitespace, uppercase.
///
/// Both the incoming CSV identifier and the persisted identifier go through
/// this before comparison, so hyphen placement, surrounding whitespace and
/// case never cause a false mismatch.
pub fn normalize_isbn(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_hyphens_and_whitespace() {
        assert_eq!(normalize_isbn("978-0-7432-7356-5"), "9780743273565");
        assert_eq!(normalize_isbn("978 0 7432 7356 5"), "9780743273565");
        assert_eq!(normalize_isbn(" 9780743273565 "), "9780743273565");
    }

    #[test]
    fn test_formatting_variants_are_equivalent() {
        let variants = ["978-0-7432-7356-5", "978 0 7432 7356 5", " 9780743273565 "];
        let canonical = normalize_isbn(variants[0]);
        for v in &variants[1..] {
            assert_eq!(normalize_isbn(v), canonical);
        }
    }

    #[test]
    fn test_uppercases_check_digit() {
        // ISBN-10 check digit can be a lowercase x
        assert_eq!(normalize_isbn("0-8044-2957-x"), "080442957X");
    }

    #[test]
    fn test_idempotent() {
        for raw in ["978-0-7432-7356-5", "  97 8-x ", "", "plain"] {
            let once = normalize_isbn(raw);
            assert_eq!(normalize_isbn(&once), once);
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize_isbn(""), "");
        assert_eq!(normalize_isbn("  -- "), "");
    }
}
