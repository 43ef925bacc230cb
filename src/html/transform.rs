//! HTML import: turns an HTML file into a document stream through the
//! same [`FrameStack`] the wire protocol drives.
//!
//! The DOM is parsed by the `scraper` crate; this module only decides
//! what each node class becomes in the stream:
//! - paragraphs become "obj" frames holding an embedded rich-text blob
//! - lists, tables and preformatted blocks are re-emitted as a cleaned
//!   HTML fragment cell
//! - headings open nested "obj" frames tracked on a level stack

use std::path::{Path, PathBuf};

use ego_tree::NodeRef;
use scraper::node::{Element, Node};
use scraper::Html;

use crate::error::{EtlError, Result};
use crate::html::text::{collapse, escape, find_number, simplify};
use crate::stream::FrameStack;

/// Character formatting bits carried through the rich-text recursion.
const ITALIC: u8 = 1 << 0;
const BOLD: u8 = 1 << 1;
const UNDERLINE: u8 = 1 << 2;
const STRIKEOUT: u8 = 1 << 3;
const SUPER: u8 = 1 << 4;
const SUB: u8 = 1 << 5;
const FIXED: u8 = 1 << 6;

/// Attributes stripped when a block is re-emitted as an HTML fragment.
const BLOCKED_ATTRS: [&str; 8] = [
    "width", "height", "lang", "class", "size", "style", "align", "valign",
];

/// What a block-level element contributes to the document stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    /// Structural wrapper; only its children matter.
    Container,
    /// Plain paragraph content, emitted as rich-text runs.
    Paragraph,
    /// Block re-emitted verbatim as a cleaned HTML fragment.
    Literal,
    /// Section heading of the given level (1..=6).
    Heading(u8),
    /// Handled separately during the envelope phase.
    Title,
    /// Only meaningful inside a Literal subtree; ignored elsewhere.
    Skipped,
}

/// Classify a block-level tag. Unknown tags act as containers so content
/// inside unanticipated wrappers is still found.
pub fn classify(tag: &str) -> NodeClass {
    match tag {
        "p" | "address" | "a" => NodeClass::Paragraph,
        "ul" | "ol" | "table" | "dl" | "pre" => NodeClass::Literal,
        "h1" => NodeClass::Heading(1),
        "h2" => NodeClass::Heading(2),
        "h3" => NodeClass::Heading(3),
        "h4" => NodeClass::Heading(4),
        "h5" => NodeClass::Heading(5),
        "h6" => NodeClass::Heading(6),
        "title" => NodeClass::Title,
        "dt" | "dd" | "li" | "tr" | "td" | "th" | "thead" | "tbody" | "tfoot" => {
            NodeClass::Skipped
        }
        _ => NodeClass::Container,
    }
}

/// Formatting bit set by an inline tag, if any. `big`, `small` and `nobr`
/// carry no equivalent and map to nothing.
fn format_bit(tag: &str) -> Option<u8> {
    match tag {
        "em" | "i" | "cite" | "var" | "dfn" => Some(ITALIC),
        "strong" | "b" => Some(BOLD),
        "u" => Some(UNDERLINE),
        "s" => Some(STRIKEOUT),
        "sup" => Some(SUPER),
        "sub" => Some(SUB),
        "code" | "tt" | "kbd" | "samp" => Some(FIXED),
        _ => None,
    }
}

/// Imports one HTML file as a complete `.dsdx` module stream.
pub struct HtmlImporter {
    agent: FrameStack,
    next_id: i32,
}

impl HtmlImporter {
    pub fn new(agent: FrameStack) -> Self {
        Self { agent, next_id: 1 }
    }

    pub fn agent(&self) -> &FrameStack {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut FrameStack {
        &mut self.agent
    }

    /// Run the import. The output stream is named after the file's stem
    /// and created in the configured output directory.
    pub fn import(&mut self, path: &Path) -> Result<()> {
        let source = std::fs::read_to_string(path)?;
        if source.trim().is_empty() {
            return Err(EtlError::Import(format!(
                "HTML stream {} has no contents",
                path.display()
            )));
        }
        let doc = Html::parse_document(&source);

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "import".to_string());
        let base = path.parent().unwrap_or(Path::new(".")).to_path_buf();

        if !self.agent.open(&name) {
            return Err(EtlError::Import(format!(
                "cannot create output stream for {name}"
            )));
        }

        self.agent.write_str("DsdxExport", None);
        self.agent.write_str("0.3", None);
        self.agent.write_date(chrono::Local::now().naive_local(), None);
        self.agent.start_frame(Some("mod"));

        self.agent
            .write_str(&uuid::Uuid::new_v4().to_string(), Some("~moduleID"));
        self.std_atts();
        self.agent.write_str(&name, Some("~modulePath"));
        let title = find_title(doc.tree.root());
        self.agent
            .write_str(title.as_deref().unwrap_or(&name), Some("Name"));

        // Sentinel level 0 keeps the outermost heading frame from being
        // popped by any real heading.
        let mut trace: Vec<u8> = vec![0];
        self.walk(doc.tree.root(), &mut trace, &base);

        // Close whatever heading frames are still open, then the module.
        for _ in 1..trace.len() {
            self.agent.end_frame();
        }
        self.agent.end_frame();
        self.agent.close();
        Ok(())
    }

    fn std_atts(&mut self) {
        self.agent.write_str("ReqBridge", Some("Created By"));
        self.agent
            .write_date(chrono::Local::now().naive_local(), Some("Created On"));
        self.agent.write_str("HTML Import", Some("Created Thru"));
    }

    fn walk(&mut self, node: NodeRef<'_, Node>, trace: &mut Vec<u8>, base: &Path) {
        match node.value() {
            Node::Document | Node::Fragment => {
                for child in node.children() {
                    self.walk(child, trace, base);
                }
            }
            Node::Element(el) => match classify(el.name()) {
                NodeClass::Container => {
                    for child in node.children() {
                        self.walk(child, trace, base);
                    }
                }
                NodeClass::Paragraph => self.read_paragraph_obj(node, base),
                NodeClass::Literal => self.read_literal_obj(node),
                NodeClass::Heading(level) => self.read_heading(node, level, trace),
                NodeClass::Title | NodeClass::Skipped => {}
            },
            _ => {}
        }
    }

    /// Paragraph object: sequential id, creation attributes, then the
    /// rich-text content as an embedded "Object Text" blob. Paragraphs
    /// without any text (images excluded) produce nothing.
    fn read_paragraph_obj(&mut self, node: NodeRef<'_, Node>, base: &Path) {
        if collect_text(node).is_empty() {
            return;
        }
        self.agent.start_frame(Some("obj"));
        let id = self.take_id();
        self.agent.write_int(id, Some("Absolute Number"));
        self.std_atts();

        self.agent.start_embed();
        self.agent.start_frame(Some("par"));
        let mut format = 0u8;
        for child in node.children() {
            self.read_frag(child, &mut format, base);
        }
        self.agent.end_frame();
        self.agent.end_embed(Some("Object Text"));

        self.agent.end_frame();
    }

    /// Literal object: the subtree is regenerated as one HTML fragment
    /// cell instead of rich-text runs.
    fn read_literal_obj(&mut self, node: NodeRef<'_, Node>) {
        self.agent.start_frame(Some("obj"));
        let id = self.take_id();
        self.agent.write_int(id, Some("Absolute Number"));
        self.std_atts();
        self.agent
            .write_html(&generate_html(node), Some("Object Text"));
        self.agent.end_frame();
    }

    /// Heading object: pops every open heading at the same or a deeper
    /// level, then opens a new "obj" frame that stays open for the
    /// section's content. The leading dotted numeral, when present, is
    /// split off into its own cell.
    fn read_heading(&mut self, node: NodeRef<'_, Node>, level: u8, trace: &mut Vec<u8>) {
        let title = simplify(&collect_text(node));
        if title.is_empty() {
            return;
        }
        while trace.len() > 1 && level <= *trace.last().expect("sentinel present") {
            trace.pop();
            self.agent.end_frame();
        }
        self.agent.start_frame(Some("obj"));
        self.std_atts();
        let id = self.take_id();
        self.agent.write_int(id, Some("Absolute Number"));
        match find_number(&title) {
            Some(split) => {
                self.agent.write_str(&title[..split], Some("~number"));
                self.agent.write_str(&title[split..], Some("Object Heading"));
            }
            None => self.agent.write_str(&title, Some("Object Heading")),
        }
        trace.push(level);
    }

    /// One rich-text fragment. The formatting mask accumulates while
    /// descending into inline tags and is restored when their scope ends.
    fn read_frag(&mut self, node: NodeRef<'_, Node>, format: &mut u8, base: &Path) {
        match node.value() {
            Node::Text(text) => {
                let run = simplify(&text);
                if !run.is_empty() {
                    self.write_run(*format, &run);
                }
            }
            Node::Element(el) => {
                let tag = el.name();
                if tag == "img" {
                    self.read_img(&el, base);
                    return;
                }
                if tag == "br" {
                    self.write_run(*format, "\n");
                    return;
                }
                let bit = format_bit(tag);
                if let Some(b) = bit {
                    *format |= b;
                }
                for child in node.children() {
                    self.read_frag(child, format, base);
                }
                if let Some(b) = bit {
                    *format &= !b;
                }
            }
            _ => {}
        }
    }

    /// One "rt" frame: active format chars followed by the text.
    fn write_run(&mut self, format: u8, text: &str) {
        self.agent.start_frame(Some("rt"));
        for (bit, ch) in [
            (ITALIC, b'i'),
            (BOLD, b'b'),
            (UNDERLINE, b'u'),
            (STRIKEOUT, b'k'),
            (SUPER, b'p'),
            (SUB, b's'),
            (FIXED, b'f'),
        ] {
            if format & bit != 0 {
                self.agent.write_char(ch, None);
            }
        }
        self.agent.write_str(text, None);
        self.agent.end_frame();
    }

    /// Inline image: percent-decoded source, relative paths resolved
    /// against the HTML file's directory, optional width/height downscale.
    fn read_img(&mut self, el: &Element, base: &Path) {
        let src = el.attr("src").unwrap_or_default();
        let decoded = urlencoding::decode(src)
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| src.to_string());
        let local = decoded.strip_prefix("file://").unwrap_or(&decoded);
        let mut path = PathBuf::from(local);
        if path.is_relative() {
            path = base.join(path);
        }
        let w = attr_i32(el, "width");
        let h = attr_i32(el, "height");

        self.agent.start_frame(Some("rt"));
        self.agent
            .read_image(&path.to_string_lossy(), w, h, Some("ole"));
        self.agent.end_frame();
    }

    fn take_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

fn attr_i32(el: &Element, name: &str) -> i32 {
    el.attr(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0)
}

/// Flatten a subtree's text, formatting ignored; images contribute an
/// `<img>` marker so image-only paragraphs still count as content.
fn collect_text(node: NodeRef<'_, Node>) -> String {
    let mut out = String::new();
    collect_into(node, &mut out);
    out
}

fn collect_into(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(&collapse(&text)),
        Node::Element(el) => {
            if el.name() == "img" {
                out.push_str("<img>");
            }
            for child in node.children() {
                collect_into(child, out);
            }
        }
        _ => {}
    }
}

/// First non-empty `<title>` text anywhere in the document.
fn find_title(node: NodeRef<'_, Node>) -> Option<String> {
    if let Node::Element(el) = node.value() {
        if el.name() == "title" {
            let text = collapse(&collect_text(node));
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    node.children().find_map(find_title)
}

/// Regenerate a subtree as an HTML fragment: layout attributes stripped,
/// `font` tags unwrapped, text escaped.
fn generate_html(node: NodeRef<'_, Node>) -> String {
    let mut out = String::new();
    match node.value() {
        Node::Text(text) => out.push_str(&escape(&text)),
        Node::Element(el) => {
            let tag = el.name();
            let unwrap = tag == "font";
            if !unwrap {
                out.push('<');
                out.push_str(tag);
                for (name, value) in el.attrs() {
                    if !BLOCKED_ATTRS.contains(&name) {
                        out.push_str(&format!(" {name}=\"{value}\""));
                    }
                }
                out.push('>');
            }
            for child in node.children() {
                out.push_str(&generate_html(child));
            }
            if !unwrap {
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
        _ => {}
    }
    out
}
