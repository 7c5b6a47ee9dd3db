// src/checker/html.rs
// =============================================================================
// This module extracts links from rich-text HTML fields.
//
// Field content in a repository is rarely a complete, well-formed document:
// it is a fragment typed into an editor, pasted from Word, or mangled by an
// old migration. Instead of building a DOM we scan the text for two things:
//
//   <a ... href=VALUE ...>     (anchors)
//   <img ... src=VALUE ...>    (images)
//
// How it works:
// 1. Lowercase a copy of the text so tag and attribute names match in any
//    case, but cut the value out of the ORIGINAL text so the URL keeps its case
// 2. Do one pass for anchors, then one pass for images
// 3. For every tag, find the attribute after the tag start and read its value
//    - quoted: up to the nearest quote character of EITHER kind
//    - unquoted: up to the next space or '>'
// 4. Keep the value only if it ends before the tag's closing '>'
// 5. Return each distinct URL once, in the order we found it
//
// Malformed markup never produces an error - the tag is just skipped.
// =============================================================================

use std::collections::HashSet;

use crate::error::{Error, Result};

// One scan pass: the tag that opens an element and the attribute we want.
struct TagPass {
    tag: &'static str,
    attribute: &'static str,
}

const PASSES: [TagPass; 2] = [
    TagPass { tag: "<a", attribute: "href=" },
    TagPass { tag: "<img", attribute: "src=" },
];

// Extracts all href/src values from anchor and image tags
//
// Parameters:
//   text: the raw field content (borrowed as &str)
//
// Returns: distinct URLs in encounter order (anchors first, then images)
//
// Example:
//   text = r#"<a href="http://x.com">x</a><img src='http://y.com'/>"#
//   result = ["http://x.com", "http://y.com"]
//
// Errors: Error::ExtractionDefect if an offset lands inside a multi-byte
// character. Every delimiter we search for is ASCII, so this signals a bug in
// the scanner rather than bad input.
pub fn extract_links(text: &str) -> Result<Vec<String>> {
    // to_ascii_lowercase keeps every byte offset identical to the original,
    // which is what lets us search in one string and slice the other
    let lower = text.to_ascii_lowercase();

    let mut links = Vec::new();
    let mut seen = HashSet::new();

    for pass in &PASSES {
        scan_pass(text, &lower, pass, |url| {
            if seen.insert(url.to_string()) {
                links.push(url.to_string());
            }
        })?;
    }

    Ok(links)
}

fn scan_pass(text: &str, lower: &str, pass: &TagPass, mut found: impl FnMut(&str)) -> Result<()> {
    let mut pos = 0;

    while let Some(tag_start) = find_from(lower, pass.tag, pos) {
        let Some(attr_start) = find_from(lower, pass.attribute, tag_start) else {
            // no attribute anywhere after this tag, so none after later tags either
            break;
        };
        let value_start = attr_start + pass.attribute.len();

        let Some(tag_end) = find_from(lower, ">", tag_start) else {
            // no closing '>' left in the text; nothing can be inside a tag
            break;
        };

        if let Some(value) = read_value(text, value_start, tag_end)? {
            if !value.is_empty() {
                found(value);
            }
        }

        pos = tag_end + 1;
    }

    Ok(())
}

// Reads an attribute value starting at `value_start`.
//
// Returns: Ok(None) when the value is malformed (runs off the end of the text
// or past the tag's closing '>').
fn read_value(text: &str, value_start: usize, tag_end: usize) -> Result<Option<&str>> {
    let bytes = text.as_bytes();
    let Some(&first) = bytes.get(value_start) else {
        return Ok(None);
    };

    let (start, end, consumed_to) = if first == b'"' || first == b'\'' {
        // Takes whichever quote comes first, not necessarily the one that
        // opened the value: href="it's.html" yields "it".
        let after = value_start + 1;
        let nearest = [find_from(text, "\"", after), find_from(text, "'", after)]
            .into_iter()
            .flatten()
            .min();
        let Some(close) = nearest else {
            return Ok(None);
        };
        // the closing quote itself must be inside the tag
        (after, close, close + 1)
    } else {
        let nearest = [find_from(text, " ", value_start), find_from(text, ">", value_start)]
            .into_iter()
            .flatten()
            .min();
        let Some(stop) = nearest else {
            return Ok(None);
        };
        (value_start, stop, stop)
    };

    if consumed_to > tag_end {
        return Ok(None);
    }

    text.get(start..end)
        .map(Some)
        .ok_or(Error::ExtractionDefect { offset: start })
}

// str::find starting at a byte offset; the offset must be a char boundary.
fn find_from(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    haystack.get(from..)?.find(needle).map(|i| i + from)
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why not use an HTML parser?
//    - A parser would "fix" broken markup and might drop or invent links
//    - Reports must match what earlier scans produced, so the scanner's exact
//      (sometimes lenient) behaviour is part of the contract
//
// 2. Why to_ascii_lowercase instead of to_lowercase?
//    - to_lowercase can change the byte length of some Unicode characters
//    - Then an index found in the lowercase copy would point somewhere else
//      in the original; ASCII-only lowercasing keeps both strings aligned
//
// 3. What does .get(a..b) do on a &str?
//    - Like &text[a..b], but returns None instead of panicking when a or b
//      is not on a character boundary
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_and_image_in_order() {
        let html = r#"<a href="http://x.com">x</a><img src='http://y.com'/>"#;
        let links = extract_links(html).unwrap();
        assert_eq!(links, vec!["http://x.com", "http://y.com"]);
    }

    #[test]
    fn test_anchors_come_before_images() {
        let html = r#"<img src="pic.png"><a href="page.html">p</a>"#;
        let links = extract_links(html).unwrap();
        assert_eq!(links, vec!["page.html", "pic.png"]);
    }

    #[test]
    fn test_tag_names_are_case_insensitive_but_urls_keep_case() {
        let html = r#"<A HREF="http://Example.com/Path">x</A><IMG SRC=Pic.JPG>"#;
        let links = extract_links(html).unwrap();
        assert_eq!(links, vec!["http://Example.com/Path", "Pic.JPG"]);
    }

    #[test]
    fn test_duplicates_are_removed() {
        let html = r#"<a href="a.html">1</a><a href="b.html">2</a><a href="a.html">3</a>"#;
        let links = extract_links(html).unwrap();
        assert_eq!(links, vec!["a.html", "b.html"]);
    }

    #[test]
    fn test_unquoted_values_stop_at_space_or_bracket() {
        let html = r#"<a href=one.html title="t">x</a><a href=two.html>y</a>"#;
        let links = extract_links(html).unwrap();
        assert_eq!(links, vec!["one.html", "two.html"]);
    }

    #[test]
    fn test_nearest_quote_wins() {
        let html = r#"<a href="it's.html">x</a>"#;
        let links = extract_links(html).unwrap();
        assert_eq!(links, vec!["it"]);
    }

    #[test]
    fn test_empty_attribute_is_skipped() {
        let html = r#"<a href="">x</a><a href="ok.html">y</a>"#;
        let links = extract_links(html).unwrap();
        assert_eq!(links, vec!["ok.html"]);
    }

    #[test]
    fn test_anchor_without_href_does_not_steal_a_later_value() {
        // the first tag has no href; the href found belongs to the next tag
        // and lies past the first '>', so it's only picked up once, from its own tag
        let html = r#"<a name="top">t</a><a href="later.html">l</a>"#;
        let links = extract_links(html).unwrap();
        assert_eq!(links, vec!["later.html"]);
    }

    #[test]
    fn test_value_running_off_the_end_is_skipped() {
        assert!(extract_links(r#"<a href="http://never-closed"#).unwrap().is_empty());
        assert!(extract_links("<a href=").unwrap().is_empty());
        assert!(extract_links("<img src=x").unwrap().is_empty());
    }

    #[test]
    fn test_value_past_closing_bracket_is_skipped() {
        let html = r#"<a href="a>b">x</a>"#;
        assert!(extract_links(html).unwrap().is_empty());
    }

    #[test]
    fn test_non_ascii_text_is_handled() {
        let html = r#"<p>Grüße</p><a href="http://例え.jp/ß">ü</a>"#;
        let links = extract_links(html).unwrap();
        assert_eq!(links, vec!["http://例え.jp/ß"]);
    }

    #[test]
    fn test_deterministic() {
        let html = r#"<a href="1">a</a><img src="2"><a href='3'>b</a>"#;
        assert_eq!(extract_links(html).unwrap(), extract_links(html).unwrap());
    }
}
