//! Identifier syntax shared by cache keys and scope bindings.

/// Returns `true` if `s` is a plain identifier: an ASCII letter or `_`
/// followed by ASCII letters, digits, or `_`.
///
/// Identifiers are safe to use both as a binding name in a scope and as a
/// file name segment under the cache root.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("result_1")]
    #[case("x")]
    #[case("_private")]
    #[case("CamelCase2")]
    fn accepts_identifiers(#[case] s: &str) {
        assert!(is_identifier(s));
    }

    #[rstest]
    #[case("")]
    #[case("1abc")]
    #[case("has space")]
    #[case("../escape")]
    #[case("a/b")]
    #[case("dotted.name")]
    #[case("ünïcode")]
    fn rejects_non_identifiers(#[case] s: &str) {
        assert!(!is_identifier(s));
    }
}
