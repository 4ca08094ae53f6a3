use regex::Regex;
use std::sync::OnceLock;

/// Inline font size the toolbar's "Titre" preset applies. Text carrying it names the newsletter.
pub(crate) const TITLE_FONT_SIZE: &str = "28px";

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("static regex"))
}

fn invisible_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)>").expect("static regex")
    })
}

fn ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn title_open_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r#"(?i)<([a-z][a-z0-9]*)\b[^>]*style\s*=\s*"[^"]*font-size:\s*{}[^"]*"[^>]*>"#,
            regex::escape(TITLE_FONT_SIZE)
        ))
        .expect("static regex")
    })
}

fn heading_open_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<h([1-6])\b[^>]*>").expect("static regex"))
}

fn white_bg_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)background(?:-color)?\s*:\s*(?:#fff(?:fff)?|white|rgb\(\s*255\s*,\s*255\s*,\s*255\s*\))\s*;?",
        )
        .expect("static regex")
    })
}

/// Visible text of a markup fragment: tags dropped, entities decoded, whitespace collapsed.
pub fn strip_tags(html: &str) -> String {
    let no_code = invisible_re().replace_all(html, " ");
    let no_tags = tag_re().replace_all(&no_code, " ");
    let decoded = html_escape::decode_html_entities(&no_tags);
    ws_re().replace_all(decoded.trim(), " ").into_owned()
}

/// Text between an opening tag match and the first matching close tag.
fn element_text(html: &str, open_end: usize, tag: &str) -> Option<String> {
    let rest = &html[open_end..];
    let lower = rest.to_ascii_lowercase();
    let close = format!("</{}", tag.to_ascii_lowercase());
    let end = lower.find(&close)?;
    let text = strip_tags(&rest[..end]);
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// First non-empty element styled with [`TITLE_FONT_SIZE`].
pub fn find_title_sized_text(html: &str) -> Option<String> {
    title_open_re().captures_iter(html).find_map(|c| {
        let whole = c.get(0)?;
        let tag = c.get(1)?.as_str();
        element_text(html, whole.end(), tag)
    })
}

/// Text of the first non-empty `<h1>`..`<h6>`.
pub fn find_first_heading_text(html: &str) -> Option<String> {
    heading_open_re().captures_iter(html).find_map(|c| {
        let whole = c.get(0)?;
        let level = c.get(1)?.as_str();
        element_text(html, whole.end(), &format!("h{level}"))
    })
}

/// Remove inline white backgrounds so nested regions don't paint over a coloured section.
pub fn clear_white_backgrounds(html: &str) -> String {
    white_bg_re().replace_all(html, "").into_owned()
}
