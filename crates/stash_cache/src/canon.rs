//! Source canonicalization ahead of hashing.
//!
//! The fingerprint digests canonical text rather than raw source, so edits
//! that only touch formatting do not invalidate a stash.

/// Turns source text into a stable textual form.
pub trait Canonicalizer {
    /// Returns the canonical form of `code`.
    fn canonicalize(&self, code: &str) -> String;
}

impl<F> Canonicalizer for F
where
    F: Fn(&str) -> String,
{
    fn canonicalize(&self, code: &str) -> String {
        self(code)
    }
}

/// Default canonicalizer that normalizes whitespace.
///
/// Each line is trimmed, blank lines are dropped, and runs of whitespace
/// outside quoted literals collapse to a single space. Quoted literals are
/// kept verbatim, including line breaks and indentation inside literals that
/// span several lines. An unterminated quote keeps the rest of the text
/// verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceCanonicalizer;

impl Canonicalizer for WhitespaceCanonicalizer {
    fn canonicalize(&self, code: &str) -> String {
        let mut out = String::with_capacity(code.len());
        let mut quote: Option<char> = None;
        let mut escaped = false;
        let mut pending_space = false;
        let mut pending_newline = false;

        for c in code.chars() {
            if let Some(q) = quote {
                out.push(c);
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            if c == '\n' {
                pending_space = false;
                pending_newline = !out.is_empty();
                continue;
            }
            if c.is_whitespace() {
                pending_space = true;
                continue;
            }
            if pending_newline {
                out.push('\n');
            } else if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_newline = false;
            pending_space = false;
            if c == '"' || c == '\'' {
                quote = Some(c);
            }
            out.push(c);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(code: &str) -> String {
        WhitespaceCanonicalizer.canonicalize(code)
    }

    #[test]
    fn formatting_only_changes_are_equal() {
        let a = "r1 = 10 + dep";
        let b = "  r1   =  10\t+ dep   \n\n";
        assert_eq!(canon(a), canon(b));
    }

    #[test]
    fn blank_lines_are_dropped() {
        assert_eq!(canon("a = 1\n\n\n  \nb = 2"), "a = 1\nb = 2");
    }

    #[test]
    fn whitespace_inside_literals_is_kept() {
        assert_eq!(canon("x = \"a    b\""), "x = \"a    b\"");
        assert_eq!(canon("x = 'a  \\' b'   + 1"), "x = 'a  \\' b' + 1");
    }

    #[test]
    fn multi_line_literals_keep_their_indentation() {
        let a = "doc = \"first\n    indented\"\nx = 1";
        let b = "doc = \"first\nindented\"\nx = 1";
        assert_ne!(canon(a), canon(b));
        assert_eq!(canon(a), a);
    }

    #[test]
    fn code_after_multi_line_literal_is_normalized() {
        let code = "  doc = \"a\n  b\"  \n\n   x  =  1  ";
        assert_eq!(canon(code), "doc = \"a\n  b\"\nx = 1");
    }

    #[test]
    fn semantic_changes_differ() {
        assert_ne!(canon("r1 = 10 + dep"), canon("r1 = 11 + dep"));
    }

    #[test]
    fn whitespace_only_code_is_empty() {
        assert!(canon("   \n\t\n").is_empty());
    }

    #[test]
    fn closures_are_canonicalizers() {
        let upper = |code: &str| code.to_uppercase();
        assert_eq!(upper.canonicalize("abc"), "ABC");
    }
}
