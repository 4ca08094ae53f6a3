use super::{clamp_pct, Direction};
use crate::models::{Alignment, BlockId, ColumnItem, Document, Node, SectionBody, SectionNode};
use crate::render::clear_white_backgrounds;

/// Swap with the nearest section above or below, skipping other blocks.
pub fn move_section(doc: &mut Document, id: BlockId, dir: Direction) -> bool {
    let Some(idx) = doc.index_of(id) else {
        return false;
    };
    let is_section = |i: &usize| matches!(doc.blocks[*i].node, Node::Section(_));
    let other = match dir {
        Direction::Up => (0..idx).rev().find(is_section),
        Direction::Down => (idx + 1..doc.len()).find(is_section),
    };
    match other {
        Some(j) => {
            doc.blocks.swap(idx, j);
            true
        }
        None => false,
    }
}

pub fn set_width(s: &mut SectionNode, pct: Option<u8>) {
    s.style.width_pct = clamp_pct(pct);
}

pub fn set_alignment(s: &mut SectionNode, alignment: Option<Alignment>) {
    s.style.alignment = alignment;
}

/// Persist the colour and drop inline white backgrounds from inner markup so
/// nested regions don't show as white bars over it.
pub fn set_background(s: &mut SectionNode, color: Option<String>) {
    s.style.background = color.filter(|c| !c.trim().is_empty());
    if s.style.background.is_none() {
        return;
    }
    for html in inner_html_mut(&mut s.body) {
        *html = clear_white_backgrounds(html);
    }
}

fn inner_html_mut(body: &mut SectionBody) -> Vec<&mut String> {
    match body {
        SectionBody::Article { title, body } => vec![title, body],
        SectionBody::Gallery { title, items } => {
            let mut out = vec![title];
            out.extend(items.iter_mut().map(|i| &mut i.caption));
            out
        }
        SectionBody::Quote { text, author } => vec![text, author],
        SectionBody::CallToAction {
            title,
            text,
            button_label,
            ..
        } => vec![title, text, button_label],
        SectionBody::Contact { title, lines } => {
            let mut out = vec![title];
            out.extend(lines.iter_mut());
            out
        }
        SectionBody::TwoColumn {
            left_title,
            left_body,
            right,
        } => {
            let mut out = vec![&mut left_title.html, &mut left_body.html];
            out.extend(right.iter_mut().filter_map(|item| match item {
                ColumnItem::Placeholder { html } => Some(html),
                ColumnItem::Image(_) => None,
            }));
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insert::section_node;
    use crate::models::SectionKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_move_skips_non_section_blocks() {
        let mut doc = Document::new();
        let a = doc.push(Node::Section(section_node(SectionKind::Article)));
        doc.push(Node::paragraph("between"));
        let q = doc.push(Node::Section(section_node(SectionKind::Quote)));

        assert!(move_section(&mut doc, q, Direction::Up));
        assert_eq!(doc.index_of(q), Some(0));
        assert_eq!(doc.index_of(a), Some(2));
        assert_eq!(doc.blocks[1].node, Node::paragraph("between"));

        assert!(!move_section(&mut doc, q, Direction::Up));
    }

    #[test]
    fn test_width_is_clamped() {
        let mut s = section_node(SectionKind::Article);
        set_width(&mut s, Some(150));
        assert_eq!(s.style.width_pct, Some(100));
        set_width(&mut s, None);
        assert_eq!(s.style.width_pct, None);
    }

    #[test]
    fn test_background_clears_white_inline_backgrounds() {
        let mut s = section_node(SectionKind::Article);
        if let SectionBody::Article { body, .. } = &mut s.body {
            *body = r#"<p style="background-color: #ffffff;">Texte</p>"#.to_string();
        }
        set_background(&mut s, Some("#e8f4ff".to_string()));
        assert_eq!(s.style.background.as_deref(), Some("#e8f4ff"));
        let SectionBody::Article { body, .. } = &s.body else {
            panic!("article body");
        };
        assert!(!body.contains("#ffffff"));
        assert!(body.contains("Texte"));
    }
}
