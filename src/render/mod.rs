//! Document -> presentation markup.
//!
//! Editing markup carries `data-block-id` / `data-kind` / `data-region` hooks,
//! `contenteditable` markers and affordances (delete buttons, handles, gallery
//! "add more"). Export markup carries none of them.

mod export;
mod text;

pub use export::{export_html, import_html, ExportError, EXPORT_STYLESHEET};
pub use text::{
    clear_white_backgrounds, find_first_heading_text, find_title_sized_text, strip_tags,
};

use crate::manipulate::image::{CropRect, ResizeHandle};
use crate::messages;
use crate::models::{
    Alignment, Block, BlockId, ColumnItem, Document, ImageNode, Node, Positioning, Region,
    SectionBody, SectionNode, SectionStyle, TableNode, VideoNode, VideoSource,
};
use html_escape::encode_double_quoted_attribute as attr;

/// Transient editing state that shows up in the markup but never in the model.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EditingView {
    pub active_image: Option<BlockId>,
    pub crop: Option<CropRect>,
    /// On-screen size of the image being cropped; the crop rectangle lives in these pixels.
    pub crop_bounds: (u32, u32),
}

#[derive(Clone, Copy, Debug)]
pub enum RenderMode<'a> {
    Editing(&'a EditingView),
    Export,
}

impl RenderMode<'_> {
    fn editing(&self) -> bool {
        matches!(self, RenderMode::Editing(_))
    }
}

pub fn render_document(doc: &Document, mode: RenderMode<'_>) -> String {
    let mut out = String::new();
    for block in &doc.blocks {
        render_block(&mut out, block, mode);
    }
    out
}

/// Visible text of the document as a reader of the exported file sees it.
pub fn visible_text(doc: &Document) -> String {
    strip_tags(&render_document(doc, RenderMode::Export))
}

fn hooks(mode: RenderMode<'_>, id: BlockId, kind: &str, editable: bool) -> String {
    if !mode.editing() {
        return String::new();
    }
    let ce = if editable { "true" } else { "false" };
    format!(r#" data-block-id="{id}" data-kind="{kind}" contenteditable="{ce}""#)
}

fn region(mode: RenderMode<'_>, region: Region) -> String {
    if mode.editing() {
        format!(r#" data-region="{region}" contenteditable="true""#)
    } else {
        String::new()
    }
}

fn render_block(out: &mut String, block: &Block, mode: RenderMode<'_>) {
    let id = block.id;
    match &block.node {
        Node::Paragraph { html } => {
            let body = if html.is_empty() && mode.editing() {
                "<br>"
            } else {
                html.as_str()
            };
            out.push_str(&format!(
                "<p{}>{body}</p>",
                hooks(mode, id, "paragraph", true)
            ));
        }
        Node::Heading { level, html } => {
            out.push_str(&format!(
                "<h{level}{}>{html}</h{level}>",
                hooks(mode, id, "heading", true)
            ));
        }
        Node::Image(img) => render_image(out, id, img, mode),
        Node::Video(v) => render_video(out, id, v, mode),
        Node::Table(t) => render_table(out, id, t, mode),
        Node::Section(s) => render_section(out, id, s, mode),
    }
}

fn image_wrapper_style(img: &ImageNode) -> String {
    match img.positioning {
        Positioning::Inline => "display:block;text-align:center;margin:10px auto;".to_string(),
        Positioning::FloatLeft => "float:left;margin:0 15px 10px 0;".to_string(),
        Positioning::FloatRight => "float:right;margin:0 0 10px 15px;".to_string(),
        Positioning::Absolute => format!(
            "position:absolute;left:{}px;top:{}px;z-index:10;",
            img.offset_x, img.offset_y
        ),
    }
}

fn image_style(img: &ImageNode) -> String {
    let mut style = String::from("max-width:100%;");
    if let Some(w) = img.width {
        style.push_str(&format!("width:{w}px;"));
    }
    if let Some(h) = img.height {
        style.push_str(&format!("height:{h}px;"));
    }
    if img.rotation_deg != 0.0 {
        style.push_str(&format!("transform:rotate({}deg);", img.rotation_deg));
    }
    style
}

fn render_image(out: &mut String, id: BlockId, img: &ImageNode, mode: RenderMode<'_>) {
    let active = match mode {
        RenderMode::Editing(view) => view.active_image == Some(id),
        RenderMode::Export => false,
    };
    let class = if active {
        format!("image-wrapper pos-{} active", img.positioning)
    } else {
        format!("image-wrapper pos-{}", img.positioning)
    };
    out.push_str(&format!(
        r#"<div class="{class}"{} style="{}">"#,
        hooks(mode, id, "image", false),
        image_wrapper_style(img)
    ));
    out.push_str(&format!(
        r#"<img src="{}" alt="{}" style="{}">"#,
        attr(&img.src),
        attr(&img.alt),
        image_style(img)
    ));

    if let RenderMode::Editing(view) = mode {
        out.push_str(r#"<button type="button" class="image-delete" data-action="delete-image" title="Supprimer">×</button>"#);
        if active {
            for h in ResizeHandle::ALL {
                out.push_str(&format!(
                    r#"<span class="resize-handle handle-{h}" data-handle="{h}"></span>"#
                ));
            }
            out.push_str(r#"<span class="rotate-handle" data-handle="rotate"></span>"#);
            if let Some(c) = view.crop {
                out.push_str(&format!(
                    r#"<div class="crop-overlay" data-crop="body" style="left:{}px;top:{}px;width:{}px;height:{}px;">"#,
                    c.x, c.y, c.width, c.height
                ));
                for corner in ["nw", "ne", "sw", "se"] {
                    out.push_str(&format!(
                        r#"<span class="crop-handle crop-{corner}" data-crop="{corner}"></span>"#
                    ));
                }
                out.push_str("</div>");
            }
        }
    }
    out.push_str("</div>");
}

fn alignment_css(a: Alignment) -> &'static str {
    match a {
        Alignment::Left => "margin-left:0;margin-right:auto;text-align:left;",
        Alignment::Center => "margin-left:auto;margin-right:auto;text-align:center;",
        Alignment::Right => "margin-left:auto;margin-right:0;text-align:right;",
    }
}

fn render_video(out: &mut String, id: BlockId, v: &VideoNode, mode: RenderMode<'_>) {
    let width = v
        .width_pct
        .map(|p| format!("width:{p}%;"))
        .unwrap_or_else(|| "width:100%;".to_string());
    out.push_str(&format!(
        r#"<div class="video-wrapper"{} style="{}">"#,
        hooks(mode, id, "video", false),
        alignment_css(v.alignment)
    ));
    match &v.source {
        VideoSource::Embed { embed_url, .. } => out.push_str(&format!(
            r#"<iframe src="{}" style="{width}aspect-ratio:16/9;border:0;" allowfullscreen></iframe>"#,
            attr(embed_url)
        )),
        VideoSource::Native { url } => out.push_str(&format!(
            r#"<video controls style="{width}"><source src="{}">{}</video>"#,
            attr(url),
            messages::VIDEO_FALLBACK
        )),
        VideoSource::LocalFile { object_url, name } => out.push_str(&format!(
            r#"<video controls title="{}" style="{width}"><source src="{}">{}</video>"#,
            attr(name),
            attr(object_url),
            messages::VIDEO_FALLBACK
        )),
    }
    out.push_str("</div>");
}

fn render_table(out: &mut String, id: BlockId, t: &TableNode, mode: RenderMode<'_>) {
    out.push_str(&format!(
        r#"<table class="nl-table"{}>"#,
        hooks(mode, id, "table", false)
    ));
    for (r, row) in t.rows.iter().enumerate() {
        out.push_str("<tr>");
        for (c, cell) in row.iter().enumerate() {
            let tag = if cell.header { "th" } else { "td" };
            let style = cell
                .background
                .as_ref()
                .map(|bg| format!(r#" style="background-color:{};""#, attr(bg)))
                .unwrap_or_default();
            out.push_str(&format!(
                "<{tag}{}{style}>{}</{tag}>",
                region(mode, Region::Cell(r, c)),
                cell.html
            ));
        }
        out.push_str("</tr>");
    }
    out.push_str("</table>");
}

fn section_style(style: &SectionStyle) -> String {
    let mut css = String::new();
    if let Some(w) = style.width_pct {
        css.push_str(&format!("width:{w}%;"));
    }
    if let Some(a) = style.alignment {
        css.push_str(alignment_css(a));
    }
    if let Some(bg) = &style.background {
        css.push_str(&format!("background-color:{};", attr(bg)));
    }
    css
}

/// Inner containers repeat the section colour; editable regions stay transparent.
fn inner_bg(style: &SectionStyle) -> String {
    style
        .background
        .as_ref()
        .map(|bg| format!(r#" style="background-color:{};""#, attr(bg)))
        .unwrap_or_default()
}

fn transparent(style: &SectionStyle) -> &'static str {
    if style.background.is_some() {
        r#" style="background-color:transparent;""#
    } else {
        ""
    }
}

fn render_section(out: &mut String, id: BlockId, s: &SectionNode, mode: RenderMode<'_>) {
    let data_bg = match (&s.style.background, mode.editing()) {
        (Some(bg), true) => format!(r#" data-bg="{}""#, attr(bg)),
        _ => String::new(),
    };
    let data_section = if mode.editing() {
        format!(r#" data-section="{}""#, s.kind)
    } else {
        String::new()
    };
    out.push_str(&format!(
        r#"<section class="nl-section nl-section--{}"{}{data_section}{data_bg} style="{}">"#,
        s.kind,
        hooks(mode, id, "section", false),
        section_style(&s.style)
    ));

    let tr = transparent(&s.style);
    match &s.body {
        SectionBody::Article { title, body } => {
            out.push_str(&format!("<h2{}{tr}>{title}</h2>", region(mode, Region::Title)));
            out.push_str(&format!(
                r#"<div class="section-body"{}{tr}>{body}</div>"#,
                region(mode, Region::Body)
            ));
        }
        SectionBody::Gallery { title, items } => {
            out.push_str(&format!("<h2{}{tr}>{title}</h2>", region(mode, Region::Title)));
            out.push_str(r#"<div class="gallery-grid">"#);
            for (i, item) in items.iter().enumerate() {
                let index_attr = if mode.editing() {
                    format!(r#" data-gallery-index="{i}""#)
                } else {
                    String::new()
                };
                out.push_str(&format!(
                    r#"<figure class="gallery-item"{index_attr} style="aspect-ratio:{:.4};">"#,
                    item.image.aspect_ratio()
                ));
                if mode.editing() {
                    out.push_str(&format!(
                        r#"<span class="gallery-drag" draggable="true" data-gallery-index="{i}">⋮⋮</span><button type="button" class="gallery-remove" data-action="gallery-remove" data-gallery-index="{i}">×</button>"#
                    ));
                }
                out.push_str(&format!(
                    r#"<img src="{}" alt="" style="width:100%;height:100%;object-fit:cover;">"#,
                    attr(&item.image.src)
                ));
                let placeholder_class = if item.caption_placeholder && mode.editing() {
                    " placeholder"
                } else {
                    ""
                };
                // Placeholder captions are instructions, not content.
                if mode.editing() || !item.caption_placeholder {
                    out.push_str(&format!(
                        r#"<figcaption class="gallery-caption{placeholder_class}"{}{tr}>{}</figcaption>"#,
                        region(mode, Region::Caption(i)),
                        item.caption
                    ));
                }
                out.push_str("</figure>");
            }
            out.push_str("</div>");
            if mode.editing() {
                out.push_str(r#"<div class="gallery-add" contenteditable="false"><button type="button" data-action="gallery-add">+ Ajouter des images</button></div>"#);
            }
        }
        SectionBody::Quote { text, author } => {
            out.push_str(&format!(
                "<blockquote{}{tr}>{text}</blockquote>",
                region(mode, Region::Text)
            ));
            out.push_str(&format!(
                r#"<p class="quote-author"{}{tr}>{author}</p>"#,
                region(mode, Region::Author)
            ));
        }
        SectionBody::CallToAction {
            title,
            text,
            button_label,
            button_href,
        } => {
            out.push_str(&format!("<h2{}{tr}>{title}</h2>", region(mode, Region::Title)));
            out.push_str(&format!("<p{}{tr}>{text}</p>", region(mode, Region::Text)));
            out.push_str(&format!(
                r#"<p class="cta-wrap"><a class="cta-button" href="{}"{}>{button_label}</a></p>"#,
                attr(button_href),
                region(mode, Region::ButtonLabel)
            ));
        }
        SectionBody::Contact { title, lines } => {
            out.push_str(&format!("<h3{}{tr}>{title}</h3>", region(mode, Region::Title)));
            for (i, line) in lines.iter().enumerate() {
                out.push_str(&format!(
                    r#"<p class="contact-line"{}{tr}>{line}</p>"#,
                    region(mode, Region::Line(i))
                ));
            }
        }
        SectionBody::TwoColumn {
            left_title,
            left_body,
            right,
        } => {
            let bg = inner_bg(&s.style);
            out.push_str(r#"<div class="two-column">"#);
            out.push_str(&format!(r#"<div class="two-col-left"{bg}>"#));
            if mode.editing() || !left_title.pristine {
                out.push_str(&format!(
                    "<h3{}{tr}>{}</h3>",
                    region(mode, Region::LeftTitle),
                    left_title.html
                ));
            }
            if mode.editing() || !left_body.pristine {
                out.push_str(&format!(
                    "<div{}{tr}>{}</div>",
                    region(mode, Region::LeftBody),
                    left_body.html
                ));
            }
            out.push_str("</div>");
            out.push_str(&format!(r#"<div class="two-col-right"{bg}"#));
            if mode.editing() {
                out.push_str(r#" data-drop="two-column" contenteditable="false""#);
            }
            out.push('>');
            for item in right {
                match item {
                    ColumnItem::Image(r) => out.push_str(&format!(
                        r#"<img src="{}" alt="" style="max-width:100%;">"#,
                        attr(&r.src)
                    )),
                    ColumnItem::Placeholder { html } if mode.editing() => out.push_str(
                        &format!(r#"<div class="column-placeholder"{bg}>{html}</div>"#),
                    ),
                    ColumnItem::Placeholder { .. } => {}
                }
            }
            out.push_str("</div></div>");
        }
    }
    out.push_str("</section>");
}
