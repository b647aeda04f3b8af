//! Tuple text codec: splitting a CSV-of-strings tuple into fields and
//! matching two tuples under the `?` wildcard rule (spec §4.4).
//!
//! The wildcard test is a first-character check, not exact equality —
//! matching `examples/original_source/tuple.c`'s `v[i][0] == '?'`, which
//! assumes no real attribute value starts with `?` rather than requiring
//! the whole field to be exactly `?`.

use anyhow::{anyhow, Result};

/// The leading byte that marks an unspecified attribute in a query
/// template. Never valid as the first byte of a stored field.
pub const WILDCARD: char = '?';

/// Split a tuple string into exactly `nattrs` comma-separated fields.
/// Wrong arity is a fatal format error, reported cleanly to the caller.
pub fn tuple_vals(tuple: &str, nattrs: usize) -> Result<Vec<String>> {
    let fields: Vec<String> = tuple.split(',').map(|s| s.to_string()).collect();
    if fields.len() != nattrs {
        return Err(anyhow!(
            "malformed tuple {tuple:?}: expected {nattrs} fields, got {}",
            fields.len()
        ));
    }
    Ok(fields)
}

/// Reject a tuple meant for storage (never allowed to start with the
/// wildcard byte).
pub fn validate_stored_tuple(fields: &[String]) -> Result<()> {
    if let Some(pos) = fields.iter().position(|f| f.starts_with(WILDCARD)) {
        return Err(anyhow!(
            "stored tuple cannot start a field with '?' (attribute {pos})"
        ));
    }
    Ok(())
}

/// True iff, for every attribute position, either field starts with `?` or
/// the two fields are byte-equal. Symmetric: either side may carry the
/// wildcard, which is what lets the query scanner reuse it defensively on
/// stored data.
pub fn tuple_match(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .all(|(x, y)| x.starts_with(WILDCARD) || y.starts_with(WILDCARD) || x == y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_comma() {
        let v = tuple_vals("1,a,x,10", 4).unwrap();
        assert_eq!(v, vec!["1", "a", "x", "10"]);
    }

    #[test]
    fn wrong_arity_is_an_error() {
        assert!(tuple_vals("1,a,x", 4).is_err());
        assert!(tuple_vals("1,a,x,10,20", 4).is_err());
    }

    #[test]
    fn wildcard_matches_anything() {
        let template = tuple_vals("?,b,?,?", 4).unwrap();
        let record = tuple_vals("2,b,y,20", 4).unwrap();
        assert!(tuple_match(&template, &record));

        let mismatch = tuple_vals("2,c,y,20", 4).unwrap();
        assert!(!tuple_match(&template, &mismatch));
    }

    #[test]
    fn stored_tuple_rejects_wildcard() {
        let fields = tuple_vals("1,?,x,10", 4).unwrap();
        assert!(validate_stored_tuple(&fields).is_err());
    }

    #[test]
    fn wildcard_is_a_first_character_rule_not_exact_equality() {
        // "?x" is a wildcard field too (only the leading byte is checked),
        // so it must be rejected from stored data just like a bare "?".
        let fields = tuple_vals("1,?x,x,10", 4).unwrap();
        assert!(validate_stored_tuple(&fields).is_err());

        let template = tuple_vals("?x,b,?,?", 4).unwrap();
        let record = tuple_vals("2,b,y,20", 4).unwrap();
        assert!(tuple_match(&template, &record));
    }
}
