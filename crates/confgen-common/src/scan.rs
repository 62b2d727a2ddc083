//! Byte-offset scanning primitives over descriptor and source text.
//!
//! All delimiters of interest are ASCII, so positions are byte offsets and
//! class checks operate on bytes. Returned offsets always land on ASCII
//! bytes and are therefore valid `&str` slice boundaries.

/// Whitespace as treated by the descriptor grammar (includes vertical tab
/// and form feed, which shell here-docs can contain).
pub const WHITESPACE: &str = " \t\n\r\x0b\x0c";

/// Operator characters that terminate a bare name.
pub const OPERATORS: &str = "+-*/=<>;()[]{}!^%|&~'\"#";

/// Characters that cannot appear inside an identifier.
pub const NON_NAME: &str = "+-*/=<>;()[]{}!^%|&~'\"# \t\n\r\x0b\x0c";

/// The operator set of preprocessor guard expressions.
pub const PREPROC_OPS: &str = "&|()!";

/// True if `b` can appear inside an identifier.
pub fn is_name_char(b: u8) -> bool {
    !NON_NAME.as_bytes().contains(&b)
}

/// First offset at or after `from` whose byte is in `class`.
pub fn find_first_of(s: &str, from: usize, class: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    (from..bytes.len()).find(|&i| class.as_bytes().contains(&bytes[i]))
}

/// First offset at or after `from` whose byte is not in `class`.
pub fn find_first_not_of(s: &str, from: usize, class: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    (from..bytes.len()).find(|&i| !class.as_bytes().contains(&bytes[i]))
}

/// Last offset at or before `upto` whose byte is in `class`.
pub fn find_last_of(s: &str, upto: usize, class: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return None;
    }
    let upto = upto.min(bytes.len() - 1);
    (0..=upto).rev().find(|&i| class.as_bytes().contains(&bytes[i]))
}

/// Last offset at or before `upto` whose byte is not in `class`.
pub fn find_last_not_of(s: &str, upto: usize, class: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return None;
    }
    let upto = upto.min(bytes.len() - 1);
    (0..=upto).rev().find(|&i| !class.as_bytes().contains(&bytes[i]))
}

/// Offset of the delimiter closing the group that `from` is inside of.
///
/// `from` points just past the opening delimiter. Nested groups are
/// skipped; returns `None` when the text ends unbalanced.
pub fn close_delim(s: &str, from: usize, open: u8, close: u8) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    for i in from..bytes.len() {
        if bytes[i] == open {
            depth += 1;
        } else if bytes[i] == close {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
        }
    }
    None
}

/// The identifier-like token starting at `from`, ended by any non-name byte.
pub fn token_at(s: &str, from: usize) -> &str {
    let end = find_first_of(s, from, NON_NAME).unwrap_or(s.len());
    &s[from..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_scans() {
        let s = "  foo_bar(baz)";
        let start = find_first_not_of(s, 0, WHITESPACE).unwrap();
        assert_eq!(start, 2);
        assert_eq!(token_at(s, start), "foo_bar");
        assert_eq!(find_first_of(s, start, NON_NAME), Some(9));
        assert_eq!(find_last_of(s, s.len() - 1, "("), Some(9));
    }

    #[test]
    fn balanced_close() {
        let s = "if (CONFIG_A && f(x, g(y))) { }";
        let open = s.find('(').unwrap();
        assert_eq!(close_delim(s, open + 1, b'(', b')'), Some(26));
        assert_eq!(close_delim("(unbalanced", 1, b'(', b')'), None);
    }

    #[test]
    fn reverse_scans() {
        let s = "a = b;";
        assert_eq!(find_last_not_of(s, 3, WHITESPACE), Some(2));
        assert_eq!(find_last_of(s, 5, ";"), Some(5));
    }
}
