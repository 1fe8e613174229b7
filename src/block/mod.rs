//! Paragraph blocks.
//!
//! A [`Block`] is the structured form of one paragraph: a list of chunks
//! whose first element is the paragraph start markup (optionally followed by
//! the paragraph properties) and whose last element is the paragraph end
//! markup. Writing the chunks back out yields the paragraph's events.

mod field;
mod merge;
pub mod parser;

pub use parser::BlockParser;

use crate::classify::{ContainerKind, FieldCharType};
use crate::styles::{BlockProperties, RunProperties};
use crate::xml::{StartTag, XmlEvent};
use smallvec::SmallVec;

/// What a markup chunk stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupKind {
    /// Opaque content: drawings, symbols, unknown elements, paragraph boundaries.
    General,
    /// `w:proofErr` and `w:lastRenderedPageBreak`.
    Inert,
    /// Bookmark, comment and permission range markers.
    RangeMarker,
    /// A complex field character.
    FieldCharacter(FieldCharType),
    /// Complex field instruction text.
    FieldInstruction,
    /// A whole field: `w:fldSimple`, or a complex field folded into one piece.
    Field,
    /// Start or end of an accepted insertion wrapper.
    RevisionBoundary,
    /// Content removed by accepting a revision.
    DeletedRevision,
    /// Content dropped from extracted text, such as ignored soft hyphens.
    Ignored,
    /// Whitespace-only character data between elements.
    Whitespace,
}

impl MarkupKind {
    /// Whether markup of this kind is dropped from translated output and gets no code.
    pub fn is_silent(self) -> bool {
        matches!(
            self,
            MarkupKind::RevisionBoundary | MarkupKind::DeletedRevision | MarkupKind::Ignored | MarkupKind::Whitespace
        )
    }

    /// Whether markup of this kind may be moved past a run during merging.
    pub fn is_relocatable(self) -> bool {
        matches!(self, MarkupKind::Inert | MarkupKind::Whitespace)
    }
}

/// A paragraph nested inside markup, such as a text box paragraph inside a drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedBlock {
    pub block: Block,
    /// Identifier of the unit extracted from this block, once mapped.
    pub unit_id: Option<String>,
}

/// An element carrying a translatable attribute value (`wp:docPr/@name`, `v:textpath/@string`).
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatableAttribute {
    pub start: StartTag,
    /// Qualified name of the translatable attribute.
    pub attribute: String,
    pub unit_id: Option<String>,
}

impl TranslatableAttribute {
    pub fn value(&self) -> &str {
        self.start.qualified_attribute(&self.attribute).unwrap_or_default()
    }
}

/// A piece of a markup chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupComponent {
    Events(Vec<XmlEvent>),
    NestedBlock(Box<NestedBlock>),
    TranslatableAttribute(TranslatableAttribute),
}

/// Non-textual content.
#[derive(Debug, Clone, PartialEq)]
pub struct Markup {
    kind: MarkupKind,
    components: Vec<MarkupComponent>,
}

impl Markup {
    pub fn new(kind: MarkupKind) -> Self {
        Self {
            kind,
            components: Vec::new(),
        }
    }

    pub fn from_events(kind: MarkupKind, events: Vec<XmlEvent>) -> Self {
        let mut markup = Self::new(kind);
        markup.components.push(MarkupComponent::Events(events));
        markup
    }

    #[inline]
    pub fn kind(&self) -> MarkupKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: MarkupKind) {
        self.kind = kind;
    }

    #[inline]
    pub fn components(&self) -> &[MarkupComponent] {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut [MarkupComponent] {
        &mut self.components
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn push_event(&mut self, event: XmlEvent) {
        if let Some(MarkupComponent::Events(events)) = self.components.last_mut() {
            events.push(event);
        } else {
            self.components.push(MarkupComponent::Events(vec![event]));
        }
    }

    pub fn push_events(&mut self, events: impl IntoIterator<Item = XmlEvent>) {
        for event in events {
            self.push_event(event);
        }
    }

    pub fn push_component(&mut self, component: MarkupComponent) {
        match component {
            MarkupComponent::Events(events) => self.push_events(events),
            other => self.components.push(other),
        }
    }

    /// Appends all components of `other`.
    pub fn append(&mut self, other: Markup) {
        for component in other.components {
            self.push_component(component);
        }
    }

    /// Whether any nested block or translatable attribute is carried.
    pub fn has_nested_items(&self) -> bool {
        self.components
            .iter()
            .any(|c| !matches!(c, MarkupComponent::Events(_)))
    }

    /// Concatenated character data, used for field instructions.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for component in &self.components {
            if let MarkupComponent::Events(events) = component {
                for event in events {
                    if let XmlEvent::Text(t) = event {
                        text.push_str(t);
                    }
                }
            }
        }
        text
    }

    pub fn write_events(&self, out: &mut Vec<XmlEvent>) {
        for component in &self.components {
            match component {
                MarkupComponent::Events(events) => out.extend(events.iter().cloned()),
                MarkupComponent::NestedBlock(nested) => nested.block.write_events(out),
                MarkupComponent::TranslatableAttribute(attr) => {
                    out.push(XmlEvent::Start(attr.start.clone()))
                },
            }
        }
    }

    pub fn events(&self) -> Vec<XmlEvent> {
        let mut out = Vec::new();
        self.write_events(&mut out);
        out
    }
}

/// A piece of a text element's content.
#[derive(Debug, Clone, PartialEq)]
pub enum TextPiece<'a> {
    Text(&'a str),
    Events(Vec<XmlEvent>),
}

/// Text inside a run's text element (`w:t`, `a:t`, `t`).
#[derive(Debug, Clone, PartialEq)]
pub struct RunText {
    pub start: StartTag,
    pub text: String,
    /// Comments, processing instructions and stray elements found inside the
    /// text element, keyed by the byte offset in `text` where they occur.
    pub embedded: Vec<(usize, XmlEvent)>,
}

impl RunText {
    pub fn new(start: StartTag, text: impl Into<String>) -> Self {
        Self {
            start,
            text: text.into(),
            embedded: Vec::new(),
        }
    }

    /// The text split at its embedded events, in document order.
    pub fn pieces(&self) -> Vec<TextPiece<'_>> {
        let mut pieces = Vec::new();
        let mut from = 0;
        let mut pending: Vec<XmlEvent> = Vec::new();
        for (offset, event) in &self.embedded {
            if *offset > from {
                if !pending.is_empty() {
                    pieces.push(TextPiece::Events(std::mem::take(&mut pending)));
                }
                pieces.push(TextPiece::Text(&self.text[from..*offset]));
                from = *offset;
            }
            pending.push(event.clone());
        }
        if !pending.is_empty() {
            pieces.push(TextPiece::Events(pending));
        }
        if from < self.text.len() {
            pieces.push(TextPiece::Text(&self.text[from..]));
        }
        pieces
    }

    /// Appends `other`, shifting its embedded offsets past this text.
    pub fn append(&mut self, other: RunText) {
        let shift = self.text.len();
        self.text.push_str(&other.text);
        self.embedded
            .extend(other.embedded.into_iter().map(|(offset, event)| (offset + shift, event)));
    }

    pub fn write_events(&self, out: &mut Vec<XmlEvent>) {
        let mut start = self.start.clone();
        if self.text.is_empty() && self.embedded.is_empty() {
            out.push(XmlEvent::Start(start.clone()));
        } else {
            start.set_self_closing(false);
            out.push(XmlEvent::Start(start.clone()));
            let mut from = 0;
            for (offset, event) in &self.embedded {
                if *offset > from {
                    out.push(XmlEvent::Text(self.text[from..*offset].to_string()));
                    from = *offset;
                }
                out.push(event.clone());
            }
            if from < self.text.len() {
                out.push(XmlEvent::Text(self.text[from..].to_string()));
            }
        }
        out.push(XmlEvent::End(start.end()));
    }
}

/// An element extracted as a character (tab, line break, non-breaking hyphen).
#[derive(Debug, Clone, PartialEq)]
pub struct RunCharacter {
    pub character: char,
    pub events: Vec<XmlEvent>,
}

/// One item of a run's body.
#[derive(Debug, Clone, PartialEq)]
pub enum RunBodyItem {
    Text(RunText),
    Character(RunCharacter),
    Markup(Markup),
}

/// A field character or instruction found in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMark {
    Char(FieldCharType),
    Instruction(String),
}

/// A text run.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    start: StartTag,
    /// Whitespace between the run start and its properties.
    leading: Vec<XmlEvent>,
    properties: RunProperties,
    body: Vec<RunBodyItem>,
    hidden: bool,
}

impl Run {
    pub fn new(start: StartTag, properties: RunProperties) -> Self {
        Self {
            start,
            leading: Vec::new(),
            properties,
            body: Vec::new(),
            hidden: false,
        }
    }

    pub(crate) fn push_leading(&mut self, event: XmlEvent) {
        self.leading.push(event);
    }

    #[inline]
    pub fn start(&self) -> &StartTag {
        &self.start
    }

    pub fn start_mut(&mut self) -> &mut StartTag {
        &mut self.start
    }

    #[inline]
    pub fn properties(&self) -> &RunProperties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut RunProperties {
        &mut self.properties
    }

    pub fn set_properties(&mut self, properties: RunProperties) {
        self.properties = properties;
    }

    #[inline]
    pub fn body(&self) -> &[RunBodyItem] {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Vec<RunBodyItem> {
        &mut self.body
    }

    #[inline]
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    /// Extracted text: text elements plus elements extracted as characters.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for item in &self.body {
            match item {
                RunBodyItem::Text(t) => text.push_str(&t.text),
                RunBodyItem::Character(c) => text.push(c.character),
                RunBodyItem::Markup(_) => {},
            }
        }
        text
    }

    /// Whether the run has any text or extracted characters.
    pub fn has_text(&self) -> bool {
        self.body.iter().any(|item| match item {
            RunBodyItem::Text(t) => !t.text.is_empty(),
            RunBodyItem::Character(_) => true,
            RunBodyItem::Markup(_) => false,
        })
    }

    /// Whether the run contributes translatable text.
    #[inline]
    pub fn has_visible_text(&self) -> bool {
        !self.hidden && self.has_text()
    }

    /// Whether the run carries text boxes or translatable attributes.
    pub fn has_nested_items(&self) -> bool {
        self.body.iter().any(|item| match item {
            RunBodyItem::Markup(m) => m.has_nested_items(),
            _ => false,
        })
    }

    /// Field characters and instructions, in order.
    pub fn field_marks(&self) -> SmallVec<[FieldMark; 2]> {
        self.body
            .iter()
            .filter_map(|item| match item {
                RunBodyItem::Markup(m) => match m.kind() {
                    MarkupKind::FieldCharacter(kind) => Some(FieldMark::Char(kind)),
                    MarkupKind::FieldInstruction => Some(FieldMark::Instruction(m.text())),
                    _ => None,
                },
                _ => None,
            })
            .collect()
    }

    pub fn has_field_markup(&self) -> bool {
        self.body.iter().any(|item| {
            matches!(
                item,
                RunBodyItem::Markup(m)
                    if matches!(m.kind(), MarkupKind::FieldCharacter(_) | MarkupKind::FieldInstruction)
            )
        })
    }

    pub fn write_events(&self, out: &mut Vec<XmlEvent>) {
        let mut start = self.start.clone();
        let empty = self.body.is_empty() && self.leading.is_empty() && !self.properties.is_present();
        if !empty {
            start.set_self_closing(false);
        }
        out.push(XmlEvent::Start(start.clone()));
        out.extend(self.leading.iter().cloned());
        self.properties.write_events(out);
        for item in &self.body {
            match item {
                RunBodyItem::Text(text) => text.write_events(out),
                RunBodyItem::Character(c) => out.extend(c.events.iter().cloned()),
                RunBodyItem::Markup(m) => m.write_events(out),
            }
        }
        out.push(XmlEvent::End(start.end()));
    }

    pub fn events(&self) -> Vec<XmlEvent> {
        let mut out = Vec::new();
        self.write_events(&mut out);
        out
    }
}

/// Text directly inside a paragraph, as in SpreadsheetML `<si><t>...</t></si>`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub text: RunText,
}

/// A wrapper element holding runs: hyperlinks, smart tags, content controls,
/// translatable complex fields and moved ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContainer {
    kind: ContainerKind,
    start: Markup,
    chunks: Vec<Chunk>,
    end: Markup,
}

impl RunContainer {
    pub fn new(kind: ContainerKind, start: Markup, chunks: Vec<Chunk>, end: Markup) -> Self {
        Self {
            kind,
            start,
            chunks,
            end,
        }
    }

    #[inline]
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    #[inline]
    pub fn start(&self) -> &Markup {
        &self.start
    }

    #[inline]
    pub fn end(&self) -> &Markup {
        &self.end
    }

    #[inline]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunks_mut(&mut self) -> &mut Vec<Chunk> {
        &mut self.chunks
    }

    /// Properties of the first run inside, used as the container's default formatting.
    pub fn default_properties(&self) -> Option<&RunProperties> {
        self.chunks.iter().find_map(|chunk| match chunk {
            Chunk::Run(run) => Some(run.properties()),
            Chunk::Container(container) => container.default_properties(),
            _ => None,
        })
    }

    pub fn has_visible_text(&self) -> bool {
        self.chunks.iter().any(Chunk::has_visible_text)
    }

    pub fn write_events(&self, out: &mut Vec<XmlEvent>) {
        self.start.write_events(out);
        for chunk in &self.chunks {
            chunk.write_events(out);
        }
        self.end.write_events(out);
    }
}

/// One piece of a paragraph.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    Markup(Markup),
    BlockProperties(BlockProperties),
    Run(Run),
    Text(TextChunk),
    Container(RunContainer),
}

impl Chunk {
    /// Whether the chunk contributes translatable text.
    pub fn has_visible_text(&self) -> bool {
        match self {
            Chunk::Run(run) => run.has_visible_text(),
            Chunk::Text(text) => !text.text.text.is_empty(),
            Chunk::Container(container) => container.has_visible_text(),
            Chunk::Markup(_) | Chunk::BlockProperties(_) => false,
        }
    }

    pub fn write_events(&self, out: &mut Vec<XmlEvent>) {
        match self {
            Chunk::Markup(markup) => markup.write_events(out),
            Chunk::BlockProperties(properties) => properties.write_events(out),
            Chunk::Run(run) => run.write_events(out),
            Chunk::Text(text) => text.text.write_events(out),
            Chunk::Container(container) => container.write_events(out),
        }
    }

    pub fn events(&self) -> Vec<XmlEvent> {
        let mut out = Vec::new();
        self.write_events(&mut out);
        out
    }
}

/// A parsed paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    chunks: Vec<Chunk>,
    run_name: String,
    text_name: String,
    hidden: bool,
    paragraph_style: Option<String>,
    paragraph_level: Option<u8>,
}

impl Block {
    pub(crate) fn new(
        chunks: Vec<Chunk>,
        run_name: String,
        text_name: String,
        hidden: bool,
        paragraph_style: Option<String>,
        paragraph_level: Option<u8>,
    ) -> Self {
        Self {
            chunks,
            run_name,
            text_name,
            hidden,
            paragraph_style,
            paragraph_level,
        }
    }

    #[inline]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunks_mut(&mut self) -> &mut Vec<Chunk> {
        &mut self.chunks
    }

    /// Qualified name of this block's run element (`w:r`, `a:r`, `r`).
    #[inline]
    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    /// Qualified name of this block's text element (`w:t`, `a:t`, `t`).
    #[inline]
    pub fn text_name(&self) -> &str {
        &self.text_name
    }

    #[inline]
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    #[inline]
    pub fn paragraph_style(&self) -> Option<&str> {
        self.paragraph_style.as_deref()
    }

    /// Zero-based level of a DrawingML paragraph (`a:pPr/@lvl`).
    #[inline]
    pub fn paragraph_level(&self) -> Option<u8> {
        self.paragraph_level
    }

    /// The paragraph properties, if present.
    pub fn properties(&self) -> Option<&BlockProperties> {
        match self.chunks.get(1) {
            Some(Chunk::BlockProperties(properties)) => Some(properties),
            _ => None,
        }
    }

    /// Index of the first chunk after the start markup and paragraph properties.
    pub fn content_start(&self) -> usize {
        match self.chunks.get(1) {
            Some(Chunk::BlockProperties(_)) => 2,
            _ => 1,
        }
    }

    /// Index of the end markup.
    pub fn content_end(&self) -> usize {
        self.chunks.len().saturating_sub(1).max(self.content_start())
    }

    /// Extracted text of all visible runs, in document order.
    pub fn plain_text(&self) -> String {
        fn collect(chunks: &[Chunk], out: &mut String) {
            for chunk in chunks {
                match chunk {
                    Chunk::Run(run) if run.has_visible_text() => out.push_str(&run.text()),
                    Chunk::Text(text) => out.push_str(&text.text.text),
                    Chunk::Container(container) => collect(container.chunks(), out),
                    _ => {},
                }
            }
        }
        let mut text = String::new();
        collect(&self.chunks, &mut text);
        text
    }

    pub fn write_events(&self, out: &mut Vec<XmlEvent>) {
        for chunk in &self.chunks {
            chunk.write_events(out);
        }
    }

    pub fn events(&self) -> Vec<XmlEvent> {
        let mut out = Vec::new();
        self.write_events(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(text: &str) -> XmlEvent {
        XmlEvent::Comment(text.to_string())
    }

    #[test]
    fn test_text_pieces_in_order() {
        let mut text = RunText::new(StartTag::new("w:t"), "Hello world");
        text.embedded = vec![(0, comment("a")), (5, comment("b")), (5, comment("c")), (11, comment("d"))];
        let pieces = text.pieces();
        assert_eq!(pieces.len(), 5);
        assert!(matches!(&pieces[0], TextPiece::Events(events) if events == &[comment("a")]));
        assert!(matches!(pieces[1], TextPiece::Text("Hello")));
        assert!(matches!(&pieces[2], TextPiece::Events(events) if events.len() == 2));
        assert!(matches!(pieces[3], TextPiece::Text(" world")));
        assert!(matches!(&pieces[4], TextPiece::Events(events) if events == &[comment("d")]));
    }

    #[test]
    fn test_append_shifts_embedded_events() {
        let mut left = RunText::new(StartTag::new("w:t"), "one");
        let mut right = RunText::new(StartTag::new("w:t"), "two");
        right.embedded.push((1, comment("x")));
        left.append(right);
        assert_eq!(left.text, "onetwo");
        assert_eq!(left.embedded, [(4, comment("x"))]);

        let mut out = Vec::new();
        left.write_events(&mut out);
        assert_eq!(out[1], XmlEvent::Text("onet".to_string()));
        assert_eq!(out[2], comment("x"));
        assert_eq!(out[3], XmlEvent::Text("wo".to_string()));
    }
}
