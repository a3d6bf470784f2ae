//! HTML whitespace collapsing and comment removal.
//!
//! Conditional comments and the bodies of `pre`, `textarea`, `script` and
//! `style` elements are copied unchanged. Malformed markup (an unclosed tag or
//! comment) is copied through as-is rather than rejected.

const RAW_TEXT_ELEMENTS: &[&str] = &["pre", "textarea", "script", "style"];

/// Minify an HTML document or fragment.
pub fn minify_html(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut rest = src;

    while !rest.is_empty() {
        if rest.starts_with("<!--") {
            let conditional = rest.starts_with("<!--[if") || rest.starts_with("<!--<![endif]");
            match rest.find("-->") {
                Some(end) => {
                    if conditional {
                        out.push_str(&rest[..end + 3]);
                    }
                    rest = &rest[end + 3..];
                }
                None => {
                    out.push_str(rest);
                    break;
                }
            }
        } else if rest.starts_with('<') {
            let Some(end) = tag_end(rest) else {
                out.push_str(rest);
                break;
            };
            let tag = &rest[..end];
            out.push_str(&collapse_tag(tag));
            rest = &rest[end..];

            if let Some(name) = raw_text_element(tag) {
                let closing = format!("</{}", name);
                match rest.to_ascii_lowercase().find(&closing) {
                    Some(body_end) => {
                        out.push_str(&rest[..body_end]);
                        rest = &rest[body_end..];
                    }
                    None => {
                        out.push_str(rest);
                        break;
                    }
                }
            }
        } else {
            let end = rest.find('<').unwrap_or(rest.len());
            push_text(&mut out, &rest[..end]);
            rest = &rest[end..];
        }
    }

    out
}

/// Byte offset just past the `>` closing the tag at the start of `s`, honoring quoted attributes.
fn tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (index, ch) in s.char_indices().skip(1) {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '>' => return Some(index + 1),
                _ => {}
            },
        }
    }
    None
}

/// Collapse whitespace runs between attributes and drop whitespace before `>`.
fn collapse_tag(tag: &str) -> String {
    let mut out = String::with_capacity(tag.len());
    let mut quote: Option<char> = None;
    let mut pending_space = false;

    for ch in tag.chars() {
        if quote.is_none() && ch.is_ascii_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            pending_space = false;
            if ch != '>' {
                out.push(' ');
            }
        }
        match quote {
            Some(q) if ch == q => quote = None,
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            _ => {}
        }
        out.push(ch);
    }
    out
}

/// Name of the raw-text element opened by `tag`, if any.
fn raw_text_element(tag: &str) -> Option<String> {
    let inner = tag.strip_prefix('<')?;
    if inner.starts_with('/') || tag.ends_with("/>") {
        return None;
    }
    let name: String = inner
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    RAW_TEXT_ELEMENTS.contains(&name.as_str()).then_some(name)
}

fn push_text(out: &mut String, text: &str) {
    if text.chars().all(|ch| ch.is_ascii_whitespace()) {
        return;
    }
    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_ascii_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(ch);
    }
    if pending_space {
        out.push(' ');
    }
}
