use super::{render_document, RenderMode};
use crate::models::Document;
use html_escape::encode_text;
use regex::Regex;
use std::sync::OnceLock;

const DATA_ISLAND_ID: &str = "newsletter-data";

/// Layout rules the exported file needs without the editor's own stylesheet.
pub const EXPORT_STYLESHEET: &str = r#"
body { font-family: Arial, Helvetica, sans-serif; margin: 0; padding: 20px; background: #f4f4f4; color: #333; }
.newsletter { max-width: 800px; margin: 0 auto; background: #fff; padding: 30px; position: relative; overflow: hidden; }
.newsletter img { max-width: 100%; height: auto; }
.image-wrapper.pos-inline { display: block; text-align: center; margin: 10px auto; }
.image-wrapper.pos-float-left { float: left; margin: 0 15px 10px 0; }
.image-wrapper.pos-float-right { float: right; margin: 0 0 10px 15px; }
.nl-section { display: block; clear: both; padding: 20px; margin: 20px 0; border-radius: 6px; box-sizing: border-box; }
.nl-section--quote blockquote { font-style: italic; font-size: 1.2em; border-left: 4px solid #ccc; margin: 0; padding-left: 15px; }
.nl-section--call-to-action { text-align: center; }
.cta-button { display: inline-block; padding: 12px 24px; background: #0066cc; color: #fff; text-decoration: none; border-radius: 4px; }
.two-column { display: flex; gap: 20px; flex-wrap: wrap; }
.two-col-left, .two-col-right { flex: 1 1 300px; min-width: 0; }
.nl-table { width: 100%; border-collapse: collapse; margin: 15px 0; }
.nl-table th, .nl-table td { border: 1px solid #ddd; padding: 8px; text-align: left; }
.nl-table th { background: #f2f2f2; font-weight: bold; }
.gallery-grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(180px, 1fr)); gap: 10px; }
.gallery-item { margin: 0; overflow: hidden; }
.gallery-caption { font-size: 0.9em; color: #666; text-align: center; padding: 4px 0; }
.video-wrapper { margin: 15px 0; }
.video-wrapper iframe, .video-wrapper video { display: block; max-width: 100%; margin: inherit; }
"#;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("the file does not contain newsletter data")]
    MissingData,
    #[error("newsletter data is corrupted: {0}")]
    Corrupted(#[from] serde_json::Error),
}

fn island_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r#"(?s)<script type="application/json" id="{DATA_ISLAND_ID}">(.*?)</script>"#
        ))
        .expect("static regex")
    })
}

/// Standalone HTML file: cleaned content, inlined stylesheet, and the model as a
/// JSON data island so the file can be opened again in the editor.
pub fn export_html(doc: &Document, title: &str) -> Result<String, serde_json::Error> {
    // `<` is escaped so the payload can never close the script element.
    let data = doc.to_json()?.replace('<', "\\u003c");
    let body = render_document(doc, RenderMode::Export);
    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="fr">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{EXPORT_STYLESHEET}</style>
</head>
<body>
<div class="newsletter">
{body}
</div>
<script type="application/json" id="{DATA_ISLAND_ID}">{data}</script>
</body>
</html>
"#,
        title = encode_text(title),
    ))
}

pub fn import_html(html: &str) -> Result<Document, ExportError> {
    let caps = island_re()
        .captures(html)
        .ok_or(ExportError::MissingData)?;
    let payload = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    Ok(Document::from_json(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insert;
    use crate::models::{ImageNode, Node, SectionKind};
    use crate::render::visible_text;
    use pretty_assertions::assert_eq;

    fn sample() -> Document {
        let mut doc = Document::new();
        doc.push(Node::heading(1, "Actus &amp; l'été"));
        doc.push(Node::paragraph("Texte <b>gras</b> et &lt;/script&gt; piège"));
        doc.push(Node::Image(ImageNode::new("data:image/png;base64,AAAA", 2, 2)));
        doc.push(Node::Table(insert::table_node(2, 3)));
        doc.push(Node::Section(insert::section_node(SectionKind::Quote)));
        doc
    }

    #[test]
    fn test_export_import_preserves_visible_text_and_images() {
        let doc = sample();
        let html = export_html(&doc, "Actus").expect("export");
        let back = import_html(&html).expect("import");
        assert_eq!(visible_text(&back), visible_text(&doc));
        assert_eq!(back.image_sources(), doc.image_sources());
    }

    #[test]
    fn test_export_is_standalone_and_clean() {
        let html = export_html(&sample(), "A & B").expect("export");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(".two-column"));
        assert!(html.contains("<title>A &amp; B</title>"));
        assert!(!html.contains("contenteditable"));
        assert!(!html.contains("data-block-id"));
        // Only the closing tag of the data island itself.
        assert_eq!(html.matches("</script>").count(), 1);
    }

    #[test]
    fn test_import_without_data_island() {
        assert!(matches!(
            import_html("<html><body>hi</body></html>"),
            Err(ExportError::MissingData)
        ));
    }
}
