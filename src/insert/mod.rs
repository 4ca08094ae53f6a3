//! Builders for insertable blocks and the splice that puts them in the document.

use crate::messages;
use crate::models::{
    Alignment, BlockId, Cell, ColumnItem, Document, GalleryItem, ImageRef, Node, PlaceholderText,
    Region, SectionBody, SectionKind, SectionNode, SectionStyle, TableNode, VideoNode,
    VideoProvider, VideoSource,
};
use crate::render::strip_tags;
use crate::selection::InsertionPoint;

pub const DEFAULT_TABLE_SIZE: usize = 3;
const MAX_TABLE_SIZE: usize = 50;

pub const TWO_COLUMN_TITLE: &str = "Titre de la colonne";
pub const TWO_COLUMN_BODY: &str = "Ajoutez votre texte ici...";
pub const TWO_COLUMN_DROP: &str = "Glissez une image ici";

/// Result of a splice: the inserted block and the empty paragraph that follows it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Spliced {
    pub block: BlockId,
    pub caret: BlockId,
}

/// Insert `node` at `point`, followed by an empty paragraph for the caret.
pub fn splice(doc: &mut Document, point: InsertionPoint, node: Node) -> Spliced {
    let index = point.index_in(doc);
    let block = doc.insert(index, node);
    let caret = doc.insert(index + 1, Node::empty_paragraph());
    Spliced { block, caret }
}

/// Row/column count typed into a prompt. `None` when the prompt was dismissed.
pub fn parse_dimension(answer: Option<&str>) -> Option<usize> {
    let answer = answer?;
    let n = answer
        .trim()
        .parse::<usize>()
        .unwrap_or(DEFAULT_TABLE_SIZE);
    Some(n.clamp(1, MAX_TABLE_SIZE))
}

/// Grid with header cells in the first row.
pub fn table_node(rows: usize, cols: usize) -> TableNode {
    let rows = rows.clamp(1, MAX_TABLE_SIZE);
    let cols = cols.clamp(1, MAX_TABLE_SIZE);
    let mut grid = Vec::with_capacity(rows);
    for r in 0..rows {
        let row = (0..cols)
            .map(|c| {
                if r == 0 {
                    Cell {
                        html: format!("En-tête {}", c + 1),
                        ..Cell::header()
                    }
                } else {
                    Cell::body()
                }
            })
            .collect();
        grid.push(row);
    }
    TableNode { rows: grid }
}

pub fn section_node(kind: SectionKind) -> SectionNode {
    let body = match kind {
        SectionKind::Article => SectionBody::Article {
            title: "Titre de l'article".to_string(),
            body: "<p>Rédigez votre article ici...</p>".to_string(),
        },
        SectionKind::Gallery => SectionBody::Gallery {
            title: "Galerie photos".to_string(),
            items: vec![],
        },
        SectionKind::Quote => SectionBody::Quote {
            text: "« Votre citation ici »".to_string(),
            author: "Auteur de la citation".to_string(),
        },
        SectionKind::CallToAction => SectionBody::CallToAction {
            title: "Passez à l'action".to_string(),
            text: "Décrivez votre offre en quelques mots.".to_string(),
            button_label: "En savoir plus".to_string(),
            button_href: "#".to_string(),
        },
        SectionKind::Contact => SectionBody::Contact {
            title: "Contactez-nous".to_string(),
            lines: vec![
                "Téléphone : 01 23 45 67 89".to_string(),
                "Email : contact@exemple.fr".to_string(),
                "Adresse : 1 rue de l'Exemple, Paris".to_string(),
            ],
        },
        SectionKind::TwoColumn => SectionBody::TwoColumn {
            left_title: PlaceholderText::pristine(TWO_COLUMN_TITLE),
            left_body: PlaceholderText::pristine(TWO_COLUMN_BODY),
            right: vec![ColumnItem::Placeholder {
                html: TWO_COLUMN_DROP.to_string(),
            }],
        },
    };
    let style = match kind {
        SectionKind::CallToAction => SectionStyle {
            alignment: Some(Alignment::Center),
            ..SectionStyle::default()
        },
        _ => SectionStyle::default(),
    };
    SectionNode { kind, style, body }
}

fn youtube_id(url: &str) -> Option<&str> {
    let tail = if let Some(pos) = url.find("youtu.be/") {
        &url[pos + "youtu.be/".len()..]
    } else if let Some(pos) = url.find("v=") {
        &url[pos + 2..]
    } else if let Some(pos) = url.find("/embed/") {
        &url[pos + "/embed/".len()..]
    } else if let Some(pos) = url.find("/shorts/") {
        &url[pos + "/shorts/".len()..]
    } else {
        return None;
    };
    let id = tail
        .split(|c| c == '?' || c == '&' || c == '#' || c == '/')
        .next()
        .unwrap_or_default();
    (!id.is_empty()).then_some(id)
}

fn vimeo_id(url: &str) -> Option<&str> {
    url.split(|c| c == '/' || c == '?' || c == '#')
        .filter(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_digit()))
        .last()
}

/// Build a video block from a pasted URL. `None` for an empty answer.
pub fn video_from_url(url: &str) -> Option<VideoNode> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    let source = if url.contains("youtube.com") || url.contains("youtu.be") {
        youtube_id(url).map(|id| VideoSource::Embed {
            provider: VideoProvider::Youtube,
            embed_url: format!("https://www.youtube.com/embed/{id}"),
        })
    } else if url.contains("vimeo.com") {
        vimeo_id(url).map(|id| VideoSource::Embed {
            provider: VideoProvider::Vimeo,
            embed_url: format!("https://player.vimeo.com/video/{id}"),
        })
    } else {
        None
    };

    Some(VideoNode {
        source: source.unwrap_or_else(|| VideoSource::Native {
            url: url.to_string(),
        }),
        width_pct: None,
        alignment: Alignment::Center,
    })
}

/// Local files are referenced by an object URL instead of being inlined.
pub fn video_from_file(object_url: impl Into<String>, name: impl Into<String>) -> VideoNode {
    VideoNode {
        source: VideoSource::LocalFile {
            object_url: object_url.into(),
            name: name.into(),
        },
        width_pct: None,
        alignment: Alignment::Center,
    }
}

fn gallery_items(section: &mut SectionNode) -> Option<&mut Vec<GalleryItem>> {
    match &mut section.body {
        SectionBody::Gallery { items, .. } => Some(items),
        _ => None,
    }
}

/// Append images to a gallery. Returns how many were added.
pub fn add_gallery_images(section: &mut SectionNode, images: Vec<ImageRef>) -> usize {
    let Some(items) = gallery_items(section) else {
        return 0;
    };
    let added = images.len();
    items.extend(images.into_iter().map(|image| GalleryItem {
        image,
        caption: messages::CAPTION_PLACEHOLDER.to_string(),
        caption_placeholder: true,
    }));
    added
}

pub fn move_gallery_item(section: &mut SectionNode, from: usize, to: usize) -> bool {
    let Some(items) = gallery_items(section) else {
        return false;
    };
    if from >= items.len() || from == to {
        return false;
    }
    let item = items.remove(from);
    let to = to.min(items.len());
    items.insert(to, item);
    true
}

pub fn remove_gallery_item(section: &mut SectionNode, index: usize) -> Option<GalleryItem> {
    let items = gallery_items(section)?;
    (index < items.len()).then(|| items.remove(index))
}

/// First focus on a caption or a pristine two-column region empties it.
pub fn focus_region(section: &mut SectionNode, region: Region) -> bool {
    match (&mut section.body, region) {
        (SectionBody::Gallery { items, .. }, Region::Caption(i)) => match items.get_mut(i) {
            Some(item) if item.caption_placeholder => {
                item.caption.clear();
                item.caption_placeholder = false;
                true
            }
            _ => false,
        },
        (SectionBody::TwoColumn { left_title, .. }, Region::LeftTitle) => clear_pristine(left_title),
        (SectionBody::TwoColumn { left_body, .. }, Region::LeftBody) => clear_pristine(left_body),
        _ => false,
    }
}

fn clear_pristine(text: &mut PlaceholderText) -> bool {
    if !text.pristine {
        return false;
    }
    text.html.clear();
    text.pristine = false;
    true
}

/// A caption left empty goes back to the placeholder.
pub fn blur_caption(section: &mut SectionNode, index: usize) -> bool {
    let Some(item) = gallery_items(section).and_then(|items| items.get_mut(index)) else {
        return false;
    };
    if item.caption_placeholder || !strip_tags(&item.caption).is_empty() {
        return false;
    }
    item.caption = messages::CAPTION_PLACEHOLDER.to_string();
    item.caption_placeholder = true;
    true
}

/// Drop an image into the right column of a two-column section.
///
/// The image takes the place of the first placeholder; placeholders below it go away.
pub fn populate_two_column(section: &mut SectionNode, image: ImageRef) -> bool {
    let SectionBody::TwoColumn { right, .. } = &mut section.body else {
        return false;
    };
    let at = right
        .iter()
        .position(|i| matches!(i, ColumnItem::Placeholder { .. }));
    match at {
        Some(at) => {
            right[at] = ColumnItem::Image(image);
            let mut idx = 0;
            right.retain(|item| {
                let keep = idx <= at || !matches!(item, ColumnItem::Placeholder { .. });
                idx += 1;
                keep
            });
        }
        None => right.push(ColumnItem::Image(image)),
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn img(src: &str) -> ImageRef {
        ImageRef {
            src: src.to_string(),
            width: 400,
            height: 300,
        }
    }

    #[test]
    fn test_splice_between_paragraphs_adds_caret_paragraph() {
        let mut doc = Document::new();
        let a = doc.push(Node::paragraph("a"));
        let b = doc.push(Node::paragraph("b"));
        let out = splice(
            &mut doc,
            InsertionPoint::After(a),
            Node::Table(table_node(2, 2)),
        );
        assert_eq!(doc.index_of(out.block), Some(1));
        assert_eq!(doc.index_of(out.caret), Some(2));
        assert_eq!(doc.index_of(b), Some(3));
        assert_eq!(doc.get(out.caret).map(|b| &b.node), Some(&Node::empty_paragraph()));
    }

    #[test]
    fn test_table_first_row_is_header() {
        let t = table_node(3, 4);
        assert_eq!((t.row_count(), t.column_count()), (3, 4));
        assert!(t.rows[0].iter().all(|c| c.header));
        assert!(t.rows[1..].iter().flatten().all(|c| !c.header));
    }

    #[rstest]
    #[case(None, None)]
    #[case(Some("4"), Some(4))]
    #[case(Some(""), Some(3))]
    #[case(Some("abc"), Some(3))]
    #[case(Some("0"), Some(1))]
    #[case(Some("999"), Some(50))]
    fn test_parse_dimension(#[case] answer: Option<&str>, #[case] expected: Option<usize>) {
        assert_eq!(parse_dimension(answer), expected);
    }

    #[rstest]
    #[case("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=1", "https://www.youtube.com/embed/dQw4w9WgXcQ")]
    #[case("https://youtu.be/dQw4w9WgXcQ", "https://www.youtube.com/embed/dQw4w9WgXcQ")]
    #[case("https://vimeo.com/76979871", "https://player.vimeo.com/video/76979871")]
    fn test_hosted_video_becomes_embed(#[case] url: &str, #[case] embed: &str) {
        let v = video_from_url(url).expect("video");
        match v.source {
            VideoSource::Embed { embed_url, .. } => assert_eq!(embed_url, embed),
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn test_other_video_url_is_native() {
        let v = video_from_url(" https://cdn.example.com/clip.mp4 ").expect("video");
        assert_eq!(
            v.source,
            VideoSource::Native {
                url: "https://cdn.example.com/clip.mp4".to_string()
            }
        );
        assert!(video_from_url("   ").is_none());
    }

    #[test]
    fn test_gallery_caption_placeholder_cycle() {
        let mut s = section_node(SectionKind::Gallery);
        assert_eq!(add_gallery_images(&mut s, vec![img("a"), img("b")]), 2);

        assert!(focus_region(&mut s, Region::Caption(0)));
        assert!(!focus_region(&mut s, Region::Caption(0)));
        assert!(blur_caption(&mut s, 0));

        let SectionBody::Gallery { items, .. } = &s.body else {
            panic!("gallery body");
        };
        assert_eq!(items[0].caption, messages::CAPTION_PLACEHOLDER);
        assert!(items[0].caption_placeholder);
    }

    #[test]
    fn test_gallery_reorder_and_remove() {
        let mut s = section_node(SectionKind::Gallery);
        add_gallery_images(&mut s, vec![img("a"), img("b"), img("c")]);
        assert!(move_gallery_item(&mut s, 0, 2));
        assert_eq!(remove_gallery_item(&mut s, 0).map(|i| i.image.src), Some("b".to_string()));
        let SectionBody::Gallery { items, .. } = &s.body else {
            panic!("gallery body");
        };
        let order: Vec<_> = items.iter().map(|i| i.image.src.as_str()).collect();
        assert_eq!(order, vec!["c", "a"]);
    }

    #[test]
    fn test_two_column_placeholders() {
        let mut s = section_node(SectionKind::TwoColumn);
        assert!(focus_region(&mut s, Region::LeftTitle));
        assert!(!focus_region(&mut s, Region::LeftTitle));

        if let SectionBody::TwoColumn { right, .. } = &mut s.body {
            right.push(ColumnItem::Placeholder {
                html: "(format conseillé : 600px)".to_string(),
            });
        }
        assert!(populate_two_column(&mut s, img("x")));
        let SectionBody::TwoColumn {
            left_title, right, ..
        } = &s.body
        else {
            panic!("two-column body");
        };
        assert_eq!(left_title.html, "");
        assert_eq!(right, &vec![ColumnItem::Image(img("x"))]);
    }
}
