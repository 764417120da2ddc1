use std::collections::BTreeSet;

/// Removes `//` and `/* */` comments. Newlines are kept (including those inside
/// block comments) so line-anchored patterns still see the original layout.
/// String and character literals are copied through untouched.
pub fn strip_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];

        if b == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
            i += 2;
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }

        if b == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'*' {
            i += 2;
            let mut closed = false;
            while i < bytes.len() {
                if bytes[i] == b'\n' {
                    out.push(b'\n');
                }
                if bytes[i] == b'*' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
                    i += 2;
                    closed = true;
                    break;
                }
                i += 1;
            }
            if closed {
                out.push(b' ');
            }
            continue;
        }

        if b == b'"' || (b == b'\'' && !is_digit_separator(bytes, i)) {
            let quote = b;
            out.push(b);
            i += 1;
            while i < bytes.len() {
                let c = bytes[i];
                out.push(c);
                i += 1;
                if c == b'\\' && i < bytes.len() {
                    out.push(bytes[i]);
                    i += 1;
                    continue;
                }
                if c == quote || c == b'\n' {
                    break;
                }
            }
            continue;
        }

        out.push(b);
        i += 1;
    }

    // Only ASCII bytes were dropped or inserted, so the result stays valid UTF-8.
    String::from_utf8(out)
        .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned())
}

// `1'000'000` in C++14 and later.
fn is_digit_separator(bytes: &[u8], i: usize) -> bool {
    i > 0
        && bytes[i - 1].is_ascii_alphanumeric()
        && bytes.get(i + 1).is_some_and(|b| b.is_ascii_alphanumeric())
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Distinct whitespace-delimited tokens of already comment-stripped text.
pub fn token_set(stripped: &str) -> BTreeSet<String> {
    stripped.split_whitespace().map(str::to_string).collect()
}

pub(crate) fn count_code_lines(stripped: &str) -> usize {
    stripped.lines().filter(|l| !l.trim().is_empty()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_line_and_block_comments() {
        let input = "int a; // trailing\n/* block\n spans */int b;\n";
        let out = strip_comments(input);
        assert_eq!(out, "int a; \n\n int b;\n");
    }

    #[test]
    fn keeps_comment_markers_inside_strings() {
        let input = "auto url = \"http://example\"; // gone\n";
        assert_eq!(strip_comments(input), "auto url = \"http://example\"; \n");
    }

    #[test]
    fn handles_escaped_quotes_and_char_literals() {
        let input = "s = \"a\\\"//b\"; c = '/'; // x\n";
        assert_eq!(strip_comments(input), "s = \"a\\\"//b\"; c = '/'; \n");
    }

    #[test]
    fn digit_separators_do_not_open_char_literals() {
        let input = "int n = 1'000'000; // million\n";
        assert_eq!(strip_comments(input), "int n = 1'000'000; \n");
    }

    #[test]
    fn unterminated_block_comment_swallows_rest() {
        assert_eq!(strip_comments("a /* never closed\nb"), "a \n");
    }

    #[test]
    fn collapse_and_tokenize() {
        assert_eq!(collapse_whitespace("  a \t b\n\nc "), "a b c");
        let tokens = token_set("x = x + 1;\n x");
        assert_eq!(
            tokens.into_iter().collect::<Vec<_>>(),
            vec!["+", "1;", "=", "x"]
        );
    }

    #[test]
    fn counts_non_blank_lines() {
        assert_eq!(count_code_lines("a\n\n  \nb\n"), 2);
    }
}
