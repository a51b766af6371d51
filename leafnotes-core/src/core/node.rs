//! Node model for the structured document tree.
//!
//! Every node is one variant of the closed [`Node`] enum; block elements carry
//! an [`ElementKind`] so that navigation and reorder logic can match
//! exhaustively over the kinds they handle.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of an element across edits.
///
/// Paths change whenever the tree is restructured; the id of an element does
/// not. The code sub-editor registry and the search highlight cache are keyed
/// by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Inline formatting carried by a text leaf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marks {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub code: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub highlight: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Marks {
    pub fn bold() -> Self {
        Marks {
            bold: true,
            ..Default::default()
        }
    }

    pub fn code() -> Self {
        Marks {
            code: true,
            ..Default::default()
        }
    }

    /// True when typing at this leaf's boundary would not inherit any format.
    pub fn is_plain(&self) -> bool {
        *self == Marks::default()
    }
}

/// A run of text with uniform formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

impl Text {
    pub fn plain(text: impl Into<String>) -> Self {
        Text {
            text: text.into(),
            marks: Marks::default(),
        }
    }

    pub fn marked(text: impl Into<String>, marks: Marks) -> Self {
        Text {
            text: text.into(),
            marks,
        }
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// An inline formula, rendered as one opaque unit around its source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    pub tex: String,
}

/// Reference to a file stored outside the document (image or attachment).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub id: String,
    pub size: u64,
}

impl FileRef {
    pub fn new(id: impl Into<String>, size: u64) -> Self {
        FileRef { id: id.into(), size }
    }
}

/// Block-level element kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ElementKind {
    Paragraph,
    Heading { level: u8 },
    Blockquote,
    List { ordered: bool, task: bool },
    ListItem { checked: Option<bool> },
    Table,
    TableRow,
    TableCell { header: bool },
    /// The code text lives in the block's sub-editor, never in the tree.
    Code { language: Option<String> },
}

impl ElementKind {
    /// Elements whose children are inline content (text, formulas, inline media).
    pub fn holds_inline(&self) -> bool {
        matches!(
            self,
            ElementKind::Paragraph | ElementKind::Heading { .. } | ElementKind::TableCell { .. }
        )
    }

    /// Elements whose children are further blocks.
    pub fn holds_blocks(&self) -> bool {
        matches!(self, ElementKind::Blockquote | ElementKind::ListItem { .. })
    }

    /// Short kind name, matching the serialised tag.
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Paragraph => "paragraph",
            ElementKind::Heading { .. } => "heading",
            ElementKind::Blockquote => "blockquote",
            ElementKind::List { .. } => "list",
            ElementKind::ListItem { .. } => "list-item",
            ElementKind::Table => "table",
            ElementKind::TableRow => "table-row",
            ElementKind::TableCell { .. } => "table-cell",
            ElementKind::Code { .. } => "code",
        }
    }
}

/// A block element with its ordered children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(default)]
    pub id: NodeId,
    #[serde(flatten)]
    pub kind: ElementKind,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(kind: ElementKind, children: Vec<Node>) -> Self {
        Element {
            id: NodeId::new(),
            kind,
            children,
        }
    }

    /// Concatenated text of every descendant leaf.
    pub fn string(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.collect_text(&mut out);
        }
        out
    }
}

/// One node of the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Node {
    Element(Element),
    Text(Text),
    Formula(Formula),
    Media(FileRef),
    Attachment(FileRef),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Node {
        Node::Text(Text::plain(text))
    }

    pub fn marked(text: impl Into<String>, marks: Marks) -> Node {
        Node::Text(Text::marked(text, marks))
    }

    pub fn formula(tex: impl Into<String>) -> Node {
        Node::Formula(Formula { tex: tex.into() })
    }

    pub fn media(id: impl Into<String>, size: u64) -> Node {
        Node::Media(FileRef::new(id, size))
    }

    pub fn attachment(id: impl Into<String>, size: u64) -> Node {
        Node::Attachment(FileRef::new(id, size))
    }

    pub fn element(kind: ElementKind, children: Vec<Node>) -> Node {
        Node::Element(Element::new(kind, children))
    }

    /// A paragraph holding a single plain text run.
    pub fn paragraph(text: impl Into<String>) -> Node {
        Node::element(ElementKind::Paragraph, vec![Node::text(text)])
    }

    pub fn paragraph_with(children: Vec<Node>) -> Node {
        Node::element(ElementKind::Paragraph, children)
    }

    pub fn heading(level: u8, text: impl Into<String>) -> Node {
        Node::element(
            ElementKind::Heading {
                level: level.clamp(1, 6),
            },
            vec![Node::text(text)],
        )
    }

    pub fn blockquote(children: Vec<Node>) -> Node {
        Node::element(ElementKind::Blockquote, children)
    }

    pub fn list(ordered: bool, items: Vec<Node>) -> Node {
        Node::element(
            ElementKind::List {
                ordered,
                task: false,
            },
            items,
        )
    }

    pub fn list_item(children: Vec<Node>) -> Node {
        Node::element(ElementKind::ListItem { checked: None }, children)
    }

    /// A table whose rows are given as rows of cell texts.
    pub fn table(rows: &[&[&str]]) -> Node {
        let rows = rows
            .iter()
            .enumerate()
            .map(|(r, cells)| {
                let cells = cells
                    .iter()
                    .map(|text| {
                        Node::element(ElementKind::TableCell { header: r == 0 }, vec![Node::text(*text)])
                    })
                    .collect();
                Node::element(ElementKind::TableRow, cells)
            })
            .collect();
        Node::element(ElementKind::Table, rows)
    }

    pub fn code(language: Option<&str>) -> Node {
        Node::element(
            ElementKind::Code {
                language: language.map(str::to_string),
            },
            Vec::new(),
        )
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<&ElementKind> {
        self.as_element().map(|el| &el.kind)
    }

    pub fn id(&self) -> Option<NodeId> {
        self.as_element().map(|el| el.id)
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(el) => &el.children,
            _ => &[],
        }
    }

    /// Nodes with no editable text of their own that occupy one cursor slot.
    pub fn is_void(&self) -> bool {
        match self {
            Node::Formula(_) | Node::Media(_) | Node::Attachment(_) => true,
            Node::Element(_) | Node::Text(_) => false,
        }
    }

    /// Media and attachments: selected as a whole, never entered.
    pub fn is_file_void(&self) -> bool {
        matches!(self, Node::Media(_) | Node::Attachment(_))
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, Node::Formula(_))
    }

    /// A text leaf carrying formatting that would bleed into text typed at
    /// its boundary.
    pub fn is_dirty_leaf(&self) -> bool {
        match self {
            Node::Text(t) => !t.marks.is_plain(),
            _ => false,
        }
    }

    pub fn is_plain_text(&self) -> bool {
        matches!(self, Node::Text(t) if t.marks.is_plain())
    }

    pub fn is_table_cell(&self) -> bool {
        matches!(self.kind(), Some(ElementKind::TableCell { .. }))
    }

    pub fn is_code_block(&self) -> bool {
        matches!(self.kind(), Some(ElementKind::Code { .. }))
    }

    pub fn is_list_item(&self) -> bool {
        matches!(self.kind(), Some(ElementKind::ListItem { .. }))
    }

    pub fn is_paragraph(&self) -> bool {
        matches!(self.kind(), Some(ElementKind::Paragraph))
    }

    pub fn is_heading(&self) -> bool {
        matches!(self.kind(), Some(ElementKind::Heading { .. }))
    }

    /// Whether the caret can land on this node directly: an element holding
    /// inline content, a code block (via its sub-editor), or a file void.
    ///
    /// Structural containers such as lists, rows and blockquotes are never
    /// enterable; their descendants are.
    pub fn is_enterable(&self) -> bool {
        match self {
            Node::Element(el) => match el.kind {
                ElementKind::Paragraph
                | ElementKind::Heading { .. }
                | ElementKind::TableCell { .. }
                | ElementKind::Code { .. } => true,
                ElementKind::Blockquote
                | ElementKind::List { .. }
                | ElementKind::ListItem { .. }
                | ElementKind::Table
                | ElementKind::TableRow => false,
            },
            Node::Media(_) | Node::Attachment(_) => true,
            Node::Text(_) | Node::Formula(_) => false,
        }
    }

    /// Concatenated text content, formulas included.
    pub fn string(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text(t) => out.push_str(&t.text),
            Node::Formula(f) => out.push_str(&f.tex),
            Node::Element(el) => {
                for child in &el.children {
                    child.collect_text(out);
                }
            }
            Node::Media(_) | Node::Attachment(_) => {}
        }
    }

    /// Length of the caret-addressable text inside a leaf.
    pub fn leaf_len(&self) -> usize {
        match self {
            Node::Text(t) => t.len(),
            Node::Formula(f) => f.tex.len(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirty_leaf_is_any_marked_text() {
        assert!(Node::marked("x", Marks::bold()).is_dirty_leaf());
        assert!(!Node::text("x").is_dirty_leaf());
        assert!(!Node::formula("x^2").is_dirty_leaf());
        let link = Marks {
            url: Some("https://example.org".into()),
            ..Default::default()
        };
        assert!(Node::marked("", link).is_dirty_leaf());
    }

    #[test]
    fn test_void_classification() {
        assert!(Node::media("a.png", 10).is_void());
        assert!(Node::attachment("a.pdf", 10).is_file_void());
        assert!(Node::formula("e=mc^2").is_void());
        assert!(!Node::formula("e=mc^2").is_file_void());
        assert!(!Node::paragraph("x").is_void());
    }

    #[test]
    fn test_enterable_kinds() {
        assert!(Node::paragraph("a").is_enterable());
        assert!(Node::code(Some("rust")).is_enterable());
        assert!(Node::media("a.png", 1).is_enterable());
        assert!(!Node::list(false, vec![]).is_enterable());
        assert!(!Node::table(&[&["a"]]).is_enterable());
        assert!(!Node::text("a").is_enterable());
    }

    #[test]
    fn test_string_includes_formula_text() {
        let p = Node::paragraph_with(vec![Node::text("a "), Node::formula("x"), Node::text(" b")]);
        assert_eq!(p.string(), "a x b");
    }

    #[test]
    fn test_node_serializes_with_type_tag() {
        let json = serde_json::to_string(&Node::heading(2, "Title")).unwrap();
        assert!(json.contains(r#""type":"element""#), "{json}");
        assert!(json.contains(r#""kind":"heading""#), "{json}");
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back.string(), "Title");
    }
}
