use once_cell::sync::Lazy;
use regex::Regex;

static TAG_MATCH: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("Invalid regex"));
static WHITESPACE_MATCH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex"));

/// Undo the escaping a URL picks up when it sits in JSON inside a JS string
/// inside HTML: `\/`, `\\/`, `&` and `&amp;`
#[must_use]
pub fn unescape_url(raw: &str) -> String {
    let mut out = raw.to_string();

    while out.contains("\\/") {
        out = out.replace("\\/", "/");
    }

    let out = out
        .replace("\\\\u0026", "&")
        .replace("\\u0026", "&")
        .replace("\\u003d", "=")
        .replace("\\u003D", "=");

    unescape_html(out.trim_end_matches('\\'))
}

#[must_use]
pub fn unescape_html(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Visible text of an HTML fragment, whitespace collapsed
#[must_use]
pub fn text_content(fragment: &str) -> String {
    let without_tags = TAG_MATCH.replace_all(fragment, " ");
    let collapsed = WHITESPACE_MATCH.replace_all(&without_tags, " ");

    unescape_html(collapsed.trim())
}

/// The JSON object starting at byte `start` (which must be a `{`), found by
/// brace matching that respects string literals
#[must_use]
pub fn json_object_at(text: &str, start: usize) -> Option<&str> {
    let bytes = text.as_bytes();

    if bytes.get(start) != Some(&b'{') {
        return None;
    }

    let mut depth = 0_usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return text.get(start..=i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Contents of every `<script>` element
#[must_use]
pub fn script_bodies(html: &str) -> Vec<String> {
    let dom = match tl::parse(html, tl::ParserOptions::default()) {
        Ok(x) => x,
        Err(e) => {
            tracing::debug!(?e, "Failed to parse HTML");
            return Vec::new();
        }
    };
    let parser = dom.parser();

    dom.nodes()
        .iter()
        .filter_map(tl::Node::as_tag)
        .filter(|x| x.name().as_utf8_str().eq_ignore_ascii_case("script"))
        .map(|x| x.inner_text(parser).into_owned())
        .collect()
}
