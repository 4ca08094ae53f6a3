mod region;

pub use region::{ParseRegionError, Region};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Stable identifier of a top-level block inside a [`Document`].
///
/// Ids are allocated by the document and never reused, so a stale id held by
/// a toolbar or a gesture simply fails to resolve instead of hitting another block.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct BlockId(pub u64);

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Block {
    pub id: BlockId,
    pub node: Node,
}

/// Content of one block. Inline formatting (bold, links, font sizes, ...) lives
/// inside the `html` strings and belongs to the browser's formatting engine.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Node {
    Paragraph { html: String },
    Heading { level: u8, html: String },
    Image(ImageNode),
    Video(VideoNode),
    Table(TableNode),
    Section(SectionNode),
}

impl Node {
    pub fn empty_paragraph() -> Self {
        Node::Paragraph {
            html: String::new(),
        }
    }

    pub fn paragraph(html: impl Into<String>) -> Self {
        Node::Paragraph { html: html.into() }
    }

    pub fn heading(level: u8, html: impl Into<String>) -> Self {
        Node::Heading {
            level: level.clamp(1, 6),
            html: html.into(),
        }
    }

    /// Store markup typed into `region`. Returns false when the block has no such region.
    ///
    /// Typing into a placeholder makes it real content.
    pub fn set_region_html(&mut self, region: Region, value: String) -> bool {
        let slot = match (self, region) {
            (Node::Paragraph { html } | Node::Heading { html, .. }, Region::Body) => html,
            (Node::Table(t), Region::Cell(r, c)) => match t.cell_mut(r, c) {
                Some(cell) => &mut cell.html,
                None => return false,
            },
            (Node::Section(s), region) => match (&mut s.body, region) {
                (SectionBody::Article { title, .. }, Region::Title)
                | (SectionBody::Gallery { title, .. }, Region::Title)
                | (SectionBody::CallToAction { title, .. }, Region::Title)
                | (SectionBody::Contact { title, .. }, Region::Title) => title,
                (SectionBody::Article { body, .. }, Region::Body) => body,
                (SectionBody::Quote { text, .. }, Region::Text)
                | (SectionBody::CallToAction { text, .. }, Region::Text) => text,
                (SectionBody::Quote { author, .. }, Region::Author) => author,
                (SectionBody::CallToAction { button_label, .. }, Region::ButtonLabel) => {
                    button_label
                }
                (SectionBody::Contact { lines, .. }, Region::Line(i)) => match lines.get_mut(i) {
                    Some(line) => line,
                    None => return false,
                },
                (SectionBody::Gallery { items, .. }, Region::Caption(i)) => {
                    match items.get_mut(i) {
                        Some(item) => {
                            item.caption_placeholder = false;
                            &mut item.caption
                        }
                        None => return false,
                    }
                }
                (SectionBody::TwoColumn { left_title, .. }, Region::LeftTitle) => {
                    left_title.pristine = false;
                    &mut left_title.html
                }
                (SectionBody::TwoColumn { left_body, .. }, Region::LeftBody) => {
                    left_body.pristine = false;
                    &mut left_body.html
                }
                _ => return false,
            },
            _ => return false,
        };
        *slot = value;
        true
    }
}

#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Positioning {
    /// Block-level, horizontally centered.
    #[default]
    Inline,
    FloatLeft,
    FloatRight,
    /// Free placement inside the surface, offset from its top-left corner.
    Absolute,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ImageNode {
    pub src: String,
    #[serde(default)]
    pub alt: String,
    /// Source captured the first time the image was edited; `reset` goes back to it.
    #[serde(default)]
    pub original_src: Option<String>,
    #[serde(default)]
    pub positioning: Positioning,
    /// Displayed size in CSS pixels. `None` means "natural size".
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    pub natural_width: u32,
    pub natural_height: u32,
    /// Live rotation (degrees) while the rotate handle is held. Always 0 once baked.
    #[serde(default)]
    pub rotation_deg: f64,
    /// Offsets for [`Positioning::Absolute`].
    #[serde(default)]
    pub offset_x: i32,
    #[serde(default)]
    pub offset_y: i32,
}

impl ImageNode {
    pub fn new(src: impl Into<String>, natural_width: u32, natural_height: u32) -> Self {
        Self {
            src: src.into(),
            alt: String::new(),
            original_src: None,
            positioning: Positioning::Inline,
            width: None,
            height: None,
            natural_width,
            natural_height,
            rotation_deg: 0.0,
            offset_x: 0,
            offset_y: 0,
        }
    }

    /// Size as currently displayed.
    pub fn displayed_size(&self) -> (u32, u32) {
        (
            self.width.unwrap_or(self.natural_width),
            self.height.unwrap_or(self.natural_height),
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum VideoProvider {
    Youtube,
    Vimeo,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum VideoSource {
    /// Hosted video rendered through the provider's embeddable frame.
    Embed {
        provider: VideoProvider,
        embed_url: String,
    },
    /// Any other URL, played by the native video element.
    Native { url: String },
    /// Local file referenced by an ephemeral object URL (valid for this session only).
    LocalFile { object_url: String, name: String },
}

#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VideoNode {
    pub source: VideoSource,
    /// Width in percent of the surface. `None` = automatic.
    #[serde(default)]
    pub width_pct: Option<u8>,
    #[serde(default)]
    pub alignment: Alignment,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Cell {
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub header: bool,
    #[serde(default)]
    pub background: Option<String>,
}

impl Cell {
    pub fn body() -> Self {
        Self::default()
    }

    pub fn header() -> Self {
        Self {
            header: true,
            ..Self::default()
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TableNode {
    pub rows: Vec<Vec<Cell>>,
}

impl TableNode {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        self.rows.get_mut(row).and_then(|r| r.get_mut(col))
    }
}

#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SectionKind {
    Article,
    Gallery,
    Quote,
    CallToAction,
    Contact,
    TwoColumn,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct SectionStyle {
    /// Width in percent. `None` = automatic.
    #[serde(default)]
    pub width_pct: Option<u8>,
    #[serde(default)]
    pub alignment: Option<Alignment>,
    /// Persisted background colour, reapplied to inner containers on every render.
    #[serde(default)]
    pub background: Option<String>,
}

/// Image reference used inside sections (gallery items, two-column).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ImageRef {
    pub src: String,
    pub width: u32,
    pub height: u32,
}

impl ImageRef {
    /// Width/height ratio, used to keep gallery tiles proportional.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f64 / self.height as f64
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GalleryItem {
    pub image: ImageRef,
    pub caption: String,
    /// True while the caption still shows the placeholder text.
    #[serde(default)]
    pub caption_placeholder: bool,
}

/// A region that shows instructional text until the user types into it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlaceholderText {
    pub html: String,
    #[serde(default)]
    pub pristine: bool,
}

impl PlaceholderText {
    pub fn pristine(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            pristine: true,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "item", rename_all = "kebab-case")]
pub enum ColumnItem {
    Image(ImageRef),
    Placeholder { html: String },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SectionBody {
    Article {
        title: String,
        body: String,
    },
    Gallery {
        title: String,
        items: Vec<GalleryItem>,
    },
    Quote {
        text: String,
        author: String,
    },
    CallToAction {
        title: String,
        text: String,
        button_label: String,
        button_href: String,
    },
    Contact {
        title: String,
        lines: Vec<String>,
    },
    TwoColumn {
        left_title: PlaceholderText,
        left_body: PlaceholderText,
        right: Vec<ColumnItem>,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SectionNode {
    pub kind: SectionKind,
    #[serde(default)]
    pub style: SectionStyle,
    pub body: SectionBody,
}

/// The newsletter being composed: an ordered list of top-level blocks.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Document {
    #[serde(default)]
    next_id: u64,
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut doc = Self::new();
        for n in nodes {
            doc.push(n);
        }
        doc
    }

    fn allocate_id(&mut self) -> BlockId {
        // Documents deserialized from older content may lack the counter.
        let floor = self.blocks.iter().map(|b| b.id.0 + 1).max().unwrap_or(0);
        self.next_id = self.next_id.max(floor);
        let id = BlockId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn push(&mut self, node: Node) -> BlockId {
        let id = self.allocate_id();
        self.blocks.push(Block { id, node });
        id
    }

    /// Insert at `index` (clamped to the block count).
    pub fn insert(&mut self, index: usize, node: Node) -> BlockId {
        let id = self.allocate_id();
        let index = index.min(self.blocks.len());
        self.blocks.insert(index, Block { id, node });
        id
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn index_of(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn node_mut(&mut self, id: BlockId) -> Option<&mut Node> {
        self.blocks
            .iter_mut()
            .find(|b| b.id == id)
            .map(|b| &mut b.node)
    }

    pub fn remove(&mut self, id: BlockId) -> Option<Block> {
        let idx = self.index_of(id)?;
        Some(self.blocks.remove(idx))
    }

    pub fn image(&self, id: BlockId) -> Option<&ImageNode> {
        match self.get(id).map(|b| &b.node) {
            Some(Node::Image(img)) => Some(img),
            _ => None,
        }
    }

    pub fn image_mut(&mut self, id: BlockId) -> Option<&mut ImageNode> {
        match self.node_mut(id) {
            Some(Node::Image(img)) => Some(img),
            _ => None,
        }
    }

    pub fn table_mut(&mut self, id: BlockId) -> Option<&mut TableNode> {
        match self.node_mut(id) {
            Some(Node::Table(t)) => Some(t),
            _ => None,
        }
    }

    pub fn section_mut(&mut self, id: BlockId) -> Option<&mut SectionNode> {
        match self.node_mut(id) {
            Some(Node::Section(s)) => Some(s),
            _ => None,
        }
    }

    pub fn video_mut(&mut self, id: BlockId) -> Option<&mut VideoNode> {
        match self.node_mut(id) {
            Some(Node::Video(v)) => Some(v),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Every image source in document order, section images included.
    pub fn image_sources(&self) -> Vec<String> {
        let mut out = vec![];
        for b in &self.blocks {
            match &b.node {
                Node::Image(img) => out.push(img.src.clone()),
                Node::Section(s) => match &s.body {
                    SectionBody::Gallery { items, .. } => {
                        out.extend(items.iter().map(|i| i.image.src.clone()))
                    }
                    SectionBody::TwoColumn { right, .. } => {
                        for item in right {
                            if let ColumnItem::Image(r) = item {
                                out.push(r.src.clone());
                            }
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_block_ids_are_never_reused() {
        let mut doc = Document::new();
        let a = doc.push(Node::paragraph("a"));
        let b = doc.push(Node::paragraph("b"));
        doc.remove(b);
        let c = doc.push(Node::paragraph("c"));
        assert_ne!(b, c);
        assert_eq!(doc.index_of(a), Some(0));
        assert_eq!(doc.index_of(c), Some(1));
    }

    #[test]
    fn test_insert_clamps_index() {
        let mut doc = Document::from_nodes([Node::paragraph("a")]);
        let id = doc.insert(99, Node::paragraph("z"));
        assert_eq!(doc.index_of(id), Some(1));
    }

    #[test]
    fn test_id_counter_recovers_when_missing_from_json() {
        let json = r#"{"blocks":[{"id":7,"node":{"type":"paragraph","html":"x"}}]}"#;
        let mut doc = Document::from_json(json).expect("legacy content should parse");
        let id = doc.push(Node::empty_paragraph());
        assert_eq!(id, BlockId(8));
    }

    #[test]
    fn test_node_json_contract() {
        let doc = Document::from_nodes([Node::heading(2, "Actus")]);
        let v: serde_json::Value =
            serde_json::from_str(&doc.to_json().expect("serialize")).expect("json");
        assert_eq!(v["blocks"][0]["node"]["type"], "heading");
        assert_eq!(v["blocks"][0]["node"]["level"], 2);
    }

    #[test]
    fn test_set_region_html() {
        let mut p = Node::paragraph("a");
        assert!(p.set_region_html(Region::Body, "b".to_string()));
        assert_eq!(p, Node::paragraph("b"));
        assert!(!p.set_region_html(Region::Title, "x".to_string()));

        let mut quote = Node::Section(SectionNode {
            kind: SectionKind::Quote,
            style: SectionStyle::default(),
            body: SectionBody::Quote {
                text: "t".to_string(),
                author: "a".to_string(),
            },
        });
        assert!(quote.set_region_html(Region::Author, "Victor Hugo".to_string()));
        assert!(!quote.set_region_html(Region::Line(0), "x".to_string()));
    }

    #[test]
    fn test_section_kind_strings() {
        assert_eq!(SectionKind::CallToAction.to_string(), "call-to-action");
        assert_eq!(
            "two-column".parse::<SectionKind>().ok(),
            Some(SectionKind::TwoColumn)
        );
    }

    #[test]
    fn test_image_sources_include_sections() {
        let mut doc = Document::new();
        doc.push(Node::Image(ImageNode::new("a.png", 10, 10)));
        doc.push(Node::Section(SectionNode {
            kind: SectionKind::Gallery,
            style: SectionStyle::default(),
            body: SectionBody::Gallery {
                title: "G".to_string(),
                items: vec![GalleryItem {
                    image: ImageRef {
                        src: "b.png".to_string(),
                        width: 4,
                        height: 3,
                    },
                    caption: String::new(),
                    caption_placeholder: true,
                }],
            },
        }));
        assert_eq!(doc.image_sources(), vec!["a.png", "b.png"]);
    }
}
