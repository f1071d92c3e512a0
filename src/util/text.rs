use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

/// Ellipsis marker appended to excerpts
pub const ELLIPSIS: char = '…';

/// Longest entity `escape_text` can emit is `&quot;`; anything longer is plain text.
const MAX_ENTITY_LEN: usize = 10;

static TAG_PATTERN: OnceLock<Regex> = OnceLock::new();

fn tag_pattern() -> &'static Regex {
    TAG_PATTERN.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag pattern is a valid regex"))
}

/// Escapes text for insertion between HTML tags.
///
/// Only `&`, `<` and `>` are replaced, matching what a browser produces when
/// text is assigned as text content and read back as markup. Quotes are left
/// alone; use [`quote_attr`] before placing the result inside an attribute.
///
/// # Examples
///
/// ```
/// use castpage::util::escape_text;
///
/// assert_eq!(escape_text("<script>"), "&lt;script&gt;");
/// assert_eq!(escape_text("Q&A"), "Q&amp;A");
/// ```
pub fn escape_text(s: &str) -> Cow<'_, str> {
    html_escape::encode_text(s)
}

/// Escapes a raw (unescaped) value for a double-quoted attribute.
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(s)
}

/// Makes already text-escaped content safe inside a double-quoted attribute.
///
/// The input must have been through [`escape_text`]; only the quote characters
/// that text escaping leaves behind are replaced, so `&amp;` is never escaped twice.
pub fn quote_attr(escaped: &str) -> Cow<'_, str> {
    if !escaped.contains(['"', '\'']) {
        return Cow::Borrowed(escaped);
    }
    Cow::Owned(escaped.replace('"', "&quot;").replace('\'', "&#39;"))
}

/// Removes anything that looks like a markup tag (`<...>`).
///
/// This is a textual pass, not an HTML parser: a lone `<` without a closing
/// `>` is kept, and the contents of `<script>` elements survive as text.
pub fn strip_tags(s: &str) -> Cow<'_, str> {
    tag_pattern().replace_all(s, "")
}

/// Decodes HTML entities (`&amp;`, `&nbsp;`, `&#8217;`, ...) into characters.
pub fn decode_entities(s: &str) -> Cow<'_, str> {
    html_escape::decode_html_entities(s)
}

/// Cuts escaped text to at most `limit` characters and appends [`ELLIPSIS`].
///
/// Text of `limit` characters or fewer is returned unchanged (borrowed).
/// Character references such as `&amp;` count as a single character and are
/// never split, so the result stays well-formed markup.
///
/// # Examples
///
/// ```
/// use castpage::util::excerpt;
///
/// assert_eq!(excerpt("Hello world", 5), "Hello…");
/// assert_eq!(excerpt("Hello", 5), "Hello");
/// assert_eq!(excerpt("a&amp;b", 2), "a&amp;…");
/// ```
pub fn excerpt(s: &str, limit: usize) -> Cow<'_, str> {
    let mut units = 0;
    let mut idx = 0;
    let bytes = s.as_bytes();

    while idx < s.len() {
        if units == limit {
            let mut out = String::with_capacity(idx + ELLIPSIS.len_utf8());
            out.push_str(&s[..idx]);
            out.push(ELLIPSIS);
            return Cow::Owned(out);
        }

        let step = if bytes[idx] == b'&' {
            entity_len(&s[idx..]).unwrap_or(1)
        } else {
            // Safe: idx always sits on a char boundary
            s[idx..].chars().next().map_or(1, char::len_utf8)
        };
        idx += step;
        units += 1;
    }

    Cow::Borrowed(s)
}

/// Byte length of a character reference at the start of `s`, if there is one.
fn entity_len(s: &str) -> Option<usize> {
    let end = s
        .bytes()
        .take(MAX_ENTITY_LEN)
        .position(|b| b == b';')?;
    let body = &s[1..end];
    if body.is_empty() {
        return None;
    }
    let valid = match body.strip_prefix('#') {
        Some(num) => {
            let digits = num.strip_prefix(['x', 'X']).unwrap_or(num);
            !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit())
        }
        None => body.bytes().all(|b| b.is_ascii_alphanumeric()),
    };
    valid.then_some(end + 1)
}
