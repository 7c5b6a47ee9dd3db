// src/glob.rs
// =============================================================================
// Translates shell-style glob patterns into regular expressions.
//
// Exclusion patterns (like `*.pdf` or `http://intranet/*`) are written as
// globs by whoever configures the scan. The collector needs them as regexes
// that match a whole URL, so this module does the translation once when the
// configuration is built.
//
// Supported syntax:
//   *        any run of characters        (literal inside [...])
//   ?        any single character          (literal inside [...])
//   [abc]    character class
//   [!a-z]   negated class (also [^a-z])
//   []x]     a leading ] inside a class is a literal ]
//   \*       escapes one of * ? [ ]; any other backslash is a literal \
//
// Everything else is matched literally.
// =============================================================================

use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};

// Compiles a glob into a regex that must match the WHOLE input.
//
// Parameters:
//   glob: the glob pattern as written in the configuration
//   case_insensitive: whether letters match regardless of case
//
// Returns: the compiled regex, or Error::Pattern when the translated
// expression is rejected by the regex engine (e.g. an unterminated `[`)
pub fn compile(glob: &str, case_insensitive: bool) -> Result<Regex> {
    let translated = translate(glob);
    RegexBuilder::new(&format!("^(?:{translated})$"))
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|source| Error::Pattern {
            pattern: glob.to_string(),
            source,
        })
}

/// Produces the (unanchored) regex source for a glob.
pub fn translate(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::with_capacity(glob.len() * 2);
    let mut in_class = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => {
                // Only glob metacharacters can be escaped. Otherwise the
                // backslash itself is a literal and the next character is
                // handled on the following iteration.
                match chars.get(i + 1) {
                    Some(&next) if is_glob_meta(next) => {
                        out.push('\\');
                        out.push(next);
                        i += 1;
                    }
                    _ => out.push_str(r"\\"),
                }
            }
            '*' if !in_class => out.push_str(".*"),
            '?' if !in_class => out.push('.'),
            '[' if !in_class => {
                in_class = true;
                out.push('[');
                match chars.get(i + 1) {
                    Some('!') | Some('^') => {
                        out.push('^');
                        i += 1;
                    }
                    Some(']') => {
                        out.push_str(r"\]");
                        i += 1;
                    }
                    _ => {}
                }
            }
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            // Inside a class, only characters that would open a nested class
            // or form a set operation need escaping for the regex crate.
            '[' | '&' | '~' if in_class => {
                out.push('\\');
                out.push(c);
            }
            _ if in_class => out.push(c),
            _ => out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
        i += 1;
    }

    out
}

fn is_glob_meta(c: char) -> bool {
    matches!(c, '*' | '?' | '[' | ']')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_suffix_only_when_anchored() {
        let re = compile("*.pdf", true).unwrap();
        assert!(re.is_match("report.pdf"));
        assert!(re.is_match("REPORT.PDF"));
        assert!(!re.is_match("report.pdf.bak"));

        let trailing = compile("*.pdf*", true).unwrap();
        assert!(trailing.is_match("report.pdf.bak"));
    }

    #[test]
    fn negated_class() {
        let re = compile("file[!0-9].txt", true).unwrap();
        assert!(!re.is_match("file5.txt"));
        assert!(re.is_match("fileA.txt"));

        let caret = compile("file[^0-9].txt", true).unwrap();
        assert!(!caret.is_match("file5.txt"));
        assert!(caret.is_match("fileB.txt"));
    }

    #[test]
    fn question_mark_is_single_char() {
        let re = compile("http://host/?.html", false).unwrap();
        assert!(re.is_match("http://host/a.html"));
        assert!(!re.is_match("http://host/ab.html"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let re = compile("http://a.com/x(1)+$", false).unwrap();
        assert!(re.is_match("http://a.com/x(1)+$"));
        assert!(!re.is_match("http://aXcom/x(1)+$"));
        assert!(!re.is_match("http://a.com/x1$"));
    }

    #[test]
    fn wildcards_are_literal_inside_class() {
        let re = compile("a[*?]b", false).unwrap();
        assert!(re.is_match("a*b"));
        assert!(re.is_match("a?b"));
        assert!(!re.is_match("axb"));
    }

    #[test]
    fn leading_bracket_in_class_is_literal() {
        let re = compile("x[]y]z", false).unwrap();
        assert!(re.is_match("x]z"));
        assert!(re.is_match("xyz"));
    }

    #[test]
    fn backslash_escapes_only_glob_meta() {
        let star = compile(r"a\*b", false).unwrap();
        assert!(star.is_match("a*b"));
        assert!(!star.is_match("axxb"));

        let plain = compile(r"a\nb", false).unwrap();
        assert!(plain.is_match(r"a\nb"));
    }

    #[test]
    fn unterminated_class_is_an_error() {
        let err = compile("file[abc", true).unwrap_err();
        assert!(matches!(err, Error::Pattern { .. }));
    }

    #[test]
    fn case_sensitivity_is_honoured() {
        let re = compile("*.PDF", false).unwrap();
        assert!(!re.is_match("a.pdf"));
    }
}
