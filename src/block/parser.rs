/// Block parser - turns the events of one paragraph into a [`Block`].
use crate::block::field::fold_complex_fields;
use crate::block::{
    Block, Chunk, Markup, MarkupComponent, MarkupKind, NestedBlock, Run, RunBodyItem,
    RunCharacter, RunContainer, RunText, TextChunk, TranslatableAttribute,
};
use crate::classify::{self, ContainerKind, RevisionKind};
use crate::error::Result;
use crate::options::ExtractionOptions;
use crate::styles::{PropertySet, Provenance, StyleContext, StyleHierarchy};
use crate::xml::{EndTag, EventCursor, StartTag, XmlEvent, qualify};
use phf::phf_set;

/// Run properties dropped by aggressive cleanup.
static CLEANUP_PROPERTIES: phf::Set<&'static str> = phf_set! {
    "lang", "noProof", "spacing", "kern", "w", "szCs", "bCs", "iCs",
};

/// Deepest nesting of containers, revisions and nested paragraphs accepted
/// inside one paragraph.
const MAX_NESTING: usize = 128;

/// Collects chunks, coalescing consecutive markup of the same kind.
#[derive(Debug, Default)]
struct ChunkSink {
    chunks: Vec<Chunk>,
    pending: Option<Markup>,
}

impl ChunkSink {
    fn push_markup(&mut self, markup: Markup) {
        match &mut self.pending {
            Some(pending) if pending.kind() == markup.kind() => pending.append(markup),
            _ => {
                self.flush();
                self.pending = Some(markup);
            },
        }
    }

    fn push_markup_event(&mut self, kind: MarkupKind, event: XmlEvent) {
        self.push_markup(Markup::from_events(kind, vec![event]));
    }

    fn push_chunk(&mut self, chunk: Chunk) {
        self.flush();
        self.chunks.push(chunk);
    }

    fn flush(&mut self) {
        if let Some(markup) = self.pending.take() {
            self.chunks.push(Chunk::Markup(markup));
        }
    }

    fn is_empty(&self) -> bool {
        self.chunks.is_empty() && self.pending.is_none()
    }

    fn finish(mut self) -> Vec<Chunk> {
        self.flush();
        self.chunks
    }
}

/// Per-paragraph state shared by everything parsed inside it.
#[derive(Debug)]
struct ParagraphState {
    hidden: bool,
    paragraph_style: Option<String>,
    /// Level of a DrawingML paragraph.
    paragraph_level: Option<u8>,
    /// Nesting level of the item being parsed.
    depth: usize,
}

impl ParagraphState {
    fn context(&self) -> StyleContext<'_> {
        StyleContext::new(self.paragraph_style.as_deref()).with_paragraph_level(self.paragraph_level)
    }

    fn enter(&mut self, cursor: &EventCursor<'_>, open: &StartTag) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            log::warn!("<{}> nested deeper than {MAX_NESTING} levels in {}", open.name(), cursor.part());
            return Err(cursor.corruption(open.name()));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }
}

/// Parses paragraphs into blocks.
///
/// # Examples
///
/// ```rust
/// use weft::block::BlockParser;
/// use weft::styles::StyleHierarchy;
/// use weft::xml::{EventCursor, read_events};
/// use weft::ExtractionOptions;
///
/// let events = read_events(br#"<w:p><w:r><w:t>Hello</w:t></w:r></w:p>"#).unwrap();
/// let styles = StyleHierarchy::new();
/// let options = ExtractionOptions::default();
/// let parser = BlockParser::new(&styles, &options);
/// let block = parser.parse(&mut EventCursor::new("word/document.xml", &events)).unwrap();
/// assert_eq!(block.plain_text(), "Hello");
/// assert_eq!(block.events(), events);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct BlockParser<'a> {
    styles: &'a StyleHierarchy,
    options: &'a ExtractionOptions,
}

impl<'a> BlockParser<'a> {
    pub fn new(styles: &'a StyleHierarchy, options: &'a ExtractionOptions) -> Self {
        Self { styles, options }
    }

    /// Parses the paragraph starting at the cursor's next event.
    pub fn parse(&self, cursor: &mut EventCursor<'_>) -> Result<Block> {
        match cursor.next() {
            Some(XmlEvent::Start(open)) if classify::is_paragraph(open) => self.parse_from(cursor, open),
            Some(XmlEvent::Start(open)) => Err(cursor.corruption(open.name())),
            Some(XmlEvent::End(end)) => Err(cursor.corruption(end.name())),
            _ => Err(cursor.corruption("paragraph")),
        }
    }

    /// Parses a paragraph whose start event was already consumed.
    pub fn parse_from(&self, cursor: &mut EventCursor<'_>, open: &StartTag) -> Result<Block> {
        self.parse_nested(cursor, open, 0)
    }

    fn parse_nested(&self, cursor: &mut EventCursor<'_>, open: &StartTag, depth: usize) -> Result<Block> {
        let prefix = open.prefix();
        let mut state = ParagraphState {
            hidden: false,
            paragraph_style: None,
            paragraph_level: (prefix == "a").then_some(0),
            depth,
        };
        state.enter(cursor, open)?;
        let mut sink = ChunkSink::default();
        let mut start = Markup::from_events(MarkupKind::General, vec![XmlEvent::Start(open.clone())]);
        while let Some(event) = cursor.peek()
            && event.is_interstitial()
        {
            start.push_event(event.clone());
            cursor.next();
        }
        sink.push_chunk(Chunk::Markup(start));

        if let Some(XmlEvent::Start(tag)) = cursor.peek()
            && classify::is_paragraph_properties(tag)
        {
            cursor.next();
            let events = cursor.take_subtree(tag)?;
            self.check_property_revisions(cursor, &events)?;
            let properties = PropertySet::from_events(&events, Provenance::Direct);
            state.paragraph_style = properties.style_id().map(str::to_string);
            if state.paragraph_level.is_some() {
                state.paragraph_level = properties
                    .value("lvl")
                    .and_then(|value| value.val())
                    .and_then(|level| level.parse().ok())
                    .or(Some(0));
            }
            state.hidden = state
                .paragraph_style
                .as_deref()
                .is_some_and(|style| self.is_style_excluded(style));
            sink.push_chunk(Chunk::BlockProperties(properties));
        }

        let end = self.parse_content(cursor, open, &mut sink, &mut state)?;
        sink.push_chunk(Chunk::Markup(Markup::from_events(
            MarkupKind::General,
            vec![XmlEvent::End(end)],
        )));

        let chunks = fold_complex_fields(sink.finish(), self.options);
        Ok(Block::new(
            chunks,
            qualify(prefix, "r"),
            qualify(prefix, "t"),
            state.hidden,
            state.paragraph_style,
            state.paragraph_level,
        ))
    }

    fn is_style_excluded(&self, style: &str) -> bool {
        self.options
            .is_style_excluded(style, self.styles.style_name(style))
    }

    /// Parses items until the end of `open`, returning that end tag.
    fn parse_content(
        &self,
        cursor: &mut EventCursor<'_>,
        open: &StartTag,
        sink: &mut ChunkSink,
        state: &mut ParagraphState,
    ) -> Result<EndTag> {
        loop {
            let event = cursor.next_within(open)?;
            match event {
                XmlEvent::End(end) if end.name() == open.name() => return Ok(end.clone()),
                XmlEvent::End(end) => return Err(cursor.corruption(end.name())),
                _ => self.parse_item(cursor, event, sink, state)?,
            }
        }
    }

    fn parse_item(
        &self,
        cursor: &mut EventCursor<'_>,
        event: &XmlEvent,
        sink: &mut ChunkSink,
        state: &mut ParagraphState,
    ) -> Result<()> {
        let tag = match event {
            XmlEvent::Start(tag) => tag,
            XmlEvent::Text(_) if event.is_whitespace() => {
                sink.push_markup_event(MarkupKind::Whitespace, event.clone());
                return Ok(());
            },
            other => {
                sink.push_markup_event(MarkupKind::General, other.clone());
                return Ok(());
            },
        };

        if classify::is_run(tag) {
            let run = self.parse_run(cursor, tag, state)?;
            sink.push_chunk(Chunk::Run(run));
        } else if classify::is_text(tag) {
            let text = self.parse_text(cursor, tag)?;
            sink.push_chunk(Chunk::Text(TextChunk { text }));
        } else if let Some(kind) = classify::container_kind(tag) {
            let container = self.parse_container(cursor, tag, kind, state)?;
            sink.push_chunk(Chunk::Container(container));
        } else if let Some(revision) = classify::revision_kind(tag) {
            self.parse_revision(cursor, tag, revision, sink, state)?;
        } else if classify::is_simple_field(tag) {
            let markup = self.parse_markup(cursor, tag, MarkupKind::Field, state)?;
            sink.push_chunk(Chunk::Markup(markup));
        } else if classify::is_inert(tag) {
            sink.push_markup(Markup::from_events(MarkupKind::Inert, cursor.take_subtree(tag)?));
        } else if classify::is_range_marker(tag) {
            sink.push_markup(Markup::from_events(
                MarkupKind::RangeMarker,
                cursor.take_subtree(tag)?,
            ));
        } else {
            let markup = self.parse_markup(cursor, tag, MarkupKind::General, state)?;
            sink.push_markup(markup);
        }
        Ok(())
    }

    fn parse_revision(
        &self,
        cursor: &mut EventCursor<'_>,
        open: &StartTag,
        revision: RevisionKind,
        sink: &mut ChunkSink,
        state: &mut ParagraphState,
    ) -> Result<()> {
        if self.options.accept_revisions {
            if revision.removes_content() {
                let events = cursor.take_subtree(open)?;
                sink.push_markup(Markup::from_events(MarkupKind::DeletedRevision, events));
            } else {
                sink.push_markup_event(MarkupKind::RevisionBoundary, XmlEvent::Start(open.clone()));
                state.enter(cursor, open)?;
                let end = self.parse_content(cursor, open, sink, state)?;
                state.leave();
                sink.push_markup_event(MarkupKind::RevisionBoundary, XmlEvent::End(end));
            }
            return Ok(());
        }

        match revision {
            RevisionKind::MoveFrom | RevisionKind::MoveTo => {
                let start = Markup::from_events(MarkupKind::General, vec![XmlEvent::Start(open.clone())]);
                let mut inner = ChunkSink::default();
                state.enter(cursor, open)?;
                let end = self.parse_content(cursor, open, &mut inner, state)?;
                state.leave();
                let chunks = fold_complex_fields(inner.finish(), self.options);
                let end = Markup::from_events(MarkupKind::General, vec![XmlEvent::End(end)]);
                sink.push_chunk(Chunk::Container(RunContainer::new(
                    ContainerKind::MovedRange,
                    start,
                    chunks,
                    end,
                )));
                Ok(())
            },
            RevisionKind::Insert | RevisionKind::Delete => Err(cursor.unsupported_revision(open.name())),
        }
    }

    fn parse_container(
        &self,
        cursor: &mut EventCursor<'_>,
        open: &StartTag,
        kind: ContainerKind,
        state: &mut ParagraphState,
    ) -> Result<RunContainer> {
        state.enter(cursor, open)?;
        let mut start = Markup::from_events(MarkupKind::General, vec![XmlEvent::Start(open.clone())]);
        let mut end = Markup::new(MarkupKind::General);
        let mut sink = ChunkSink::default();
        let mut content_closed = false;

        loop {
            let event = cursor.next_within(open)?;
            match event {
                XmlEvent::End(tag) if tag.name() == open.name() => {
                    end.push_event(event.clone());
                    break;
                },
                XmlEvent::End(tag) => return Err(cursor.corruption(tag.name())),
                _ if event.is_interstitial() && sink.is_empty() && !content_closed => start.push_event(event.clone()),
                XmlEvent::Start(tag)
                    if classify::is_container_properties(tag) && sink.is_empty() && !content_closed =>
                {
                    start.push_events(cursor.take_subtree(tag)?);
                },
                XmlEvent::Start(tag) if classify::is_container_content(tag) && !content_closed => {
                    start.push_event(event.clone());
                    let content_end = self.parse_content(cursor, tag, &mut sink, state)?;
                    end.push_event(XmlEvent::End(content_end));
                    content_closed = true;
                },
                XmlEvent::Start(tag) if content_closed => end.push_events(cursor.take_subtree(tag)?),
                _ if content_closed => end.push_event(event.clone()),
                _ => self.parse_item(cursor, event, &mut sink, state)?,
            }
        }

        state.leave();
        let chunks = fold_complex_fields(sink.finish(), self.options);
        Ok(RunContainer::new(kind, start, chunks, end))
    }

    fn parse_run(&self, cursor: &mut EventCursor<'_>, open: &StartTag, state: &ParagraphState) -> Result<Run> {
        let mut run = Run::new(open.clone(), PropertySet::absent(qualify(open.prefix(), "rPr")));

        loop {
            let event = cursor.next_within(open)?;
            match event {
                XmlEvent::End(end) if end.name() == open.name() => break,
                XmlEvent::End(end) => return Err(cursor.corruption(end.name())),
                _ if event.is_interstitial() && run.body().is_empty() && !run.properties().is_present() => {
                    run.push_leading(event.clone());
                },
                XmlEvent::Text(_) if event.is_whitespace() => push_body(
                    &mut run,
                    RunBodyItem::Markup(Markup::from_events(MarkupKind::Whitespace, vec![event.clone()])),
                ),
                XmlEvent::Start(tag)
                    if classify::is_run_properties(tag)
                        && run.body().is_empty()
                        && !run.properties().is_present() =>
                {
                    let events = cursor.take_subtree(tag)?;
                    self.check_property_revisions(cursor, &events)?;
                    run.set_properties(PropertySet::from_events(&events, Provenance::Direct));
                },
                XmlEvent::Start(tag) if classify::is_text(tag) => {
                    let text = self.parse_text(cursor, tag)?;
                    push_body(&mut run, RunBodyItem::Text(text));
                },
                XmlEvent::Start(tag) => {
                    let item = self.parse_run_element(cursor, tag, state)?;
                    push_body(&mut run, item);
                },
                other => push_body(
                    &mut run,
                    RunBodyItem::Markup(Markup::from_events(MarkupKind::General, vec![other.clone()])),
                ),
            }
        }

        run.set_hidden(self.is_run_hidden(&run, state));
        if self.options.aggressive_cleanup {
            cleanup_run_properties(&mut run);
        }
        Ok(run)
    }

    fn parse_run_element(
        &self,
        cursor: &mut EventCursor<'_>,
        tag: &StartTag,
        state: &ParagraphState,
    ) -> Result<RunBodyItem> {
        let options = self.options;
        let character = if classify::is_tab(tag) && options.tab_as_character {
            Some('\t')
        } else if options.line_separator_as_character
            && ((classify::is_break(tag) && !classify::is_page_break(tag)) || classify::is_carriage_return(tag))
        {
            Some(options.line_separator_replacement)
        } else if classify::is_no_break_hyphen(tag) && options.replace_no_break_hyphen {
            Some('-')
        } else {
            None
        };
        if let Some(character) = character {
            return Ok(RunBodyItem::Character(RunCharacter {
                character,
                events: cursor.take_subtree(tag)?,
            }));
        }

        let kind = if classify::is_soft_hyphen(tag) && options.ignore_soft_hyphen {
            MarkupKind::Ignored
        } else if let Some(kind) = classify::field_char_type(tag) {
            MarkupKind::FieldCharacter(kind)
        } else if classify::is_field_instruction(tag) {
            MarkupKind::FieldInstruction
        } else if classify::is_inert(tag) {
            MarkupKind::Inert
        } else {
            MarkupKind::General
        };
        Ok(RunBodyItem::Markup(self.parse_markup(cursor, tag, kind, state)?))
    }

    fn parse_text(&self, cursor: &mut EventCursor<'_>, open: &StartTag) -> Result<RunText> {
        let mut text = RunText::new(open.clone(), String::new());
        loop {
            let event = cursor.next_within(open)?;
            match event {
                XmlEvent::End(end) if end.name() == open.name() => break,
                XmlEvent::End(end) => return Err(cursor.corruption(end.name())),
                XmlEvent::Text(t) | XmlEvent::CData(t) => text.text.push_str(t),
                XmlEvent::Start(tag) => {
                    log::debug!(
                        "Keeping <{}> inside <{}> in {} at event {} as markup",
                        tag.name(),
                        open.name(),
                        cursor.part(),
                        cursor.offset()
                    );
                    let offset = text.text.len();
                    for event in cursor.take_subtree(tag)? {
                        text.embedded.push((offset, event));
                    }
                },
                other => text.embedded.push((text.text.len(), other.clone())),
            }
        }
        Ok(text)
    }

    /// Captures the subtree of `open` as markup, parsing nested paragraphs
    /// into blocks and lifting translatable attributes.
    fn parse_markup(
        &self,
        cursor: &mut EventCursor<'_>,
        open: &StartTag,
        kind: MarkupKind,
        state: &ParagraphState,
    ) -> Result<Markup> {
        let mut markup = Markup::new(kind);
        if classify::is_paragraph(open) {
            let block = self.parse_nested(cursor, open, state.depth)?;
            markup.push_component(MarkupComponent::NestedBlock(Box::new(NestedBlock {
                block,
                unit_id: None,
            })));
            return Ok(markup);
        }

        self.push_markup_start(&mut markup, open);
        let mut stack: Vec<&StartTag> = Vec::new();
        loop {
            let event = cursor.next_within(open)?;
            match event {
                XmlEvent::Start(tag) if classify::is_paragraph(tag) => {
                    let block = self.parse_nested(cursor, tag, state.depth)?;
                    markup.push_component(MarkupComponent::NestedBlock(Box::new(NestedBlock {
                        block,
                        unit_id: None,
                    })));
                },
                XmlEvent::Start(tag) => {
                    stack.push(tag);
                    self.push_markup_start(&mut markup, tag);
                },
                XmlEvent::End(end) => match stack.pop() {
                    Some(tag) if tag.name() == end.name() => markup.push_event(event.clone()),
                    None if end.name() == open.name() => {
                        markup.push_event(event.clone());
                        return Ok(markup);
                    },
                    _ => return Err(cursor.corruption(end.name())),
                },
                other => markup.push_event(other.clone()),
            }
        }
    }

    fn push_markup_start(&self, markup: &mut Markup, tag: &StartTag) {
        if self.options.translate_graphic_metadata
            && let Some(attribute) = translatable_attribute(tag)
        {
            markup.push_component(MarkupComponent::TranslatableAttribute(TranslatableAttribute {
                start: tag.clone(),
                attribute,
                unit_id: None,
            }));
        } else {
            markup.push_event(XmlEvent::Start(tag.clone()));
        }
    }

    fn check_property_revisions(&self, cursor: &EventCursor<'_>, events: &[XmlEvent]) -> Result<()> {
        if self.options.accept_revisions {
            return Ok(());
        }
        for event in events {
            if let XmlEvent::Start(tag) = event
                && (classify::revision_kind(tag).is_some() || classify::is_property_change(tag))
            {
                return Err(cursor.unsupported_revision(tag.name()));
            }
        }
        Ok(())
    }

    fn is_run_hidden(&self, run: &Run, state: &ParagraphState) -> bool {
        if state.hidden {
            return true;
        }
        let properties = run.properties();
        if let Some(style) = properties.style_id()
            && self.is_style_excluded(style)
        {
            return true;
        }
        let effective = self.styles.effective_run_properties(state.context(), properties);
        let highlight = effective.value("highlight").and_then(|v| v.val());
        if self.options.is_highlight_excluded(highlight) {
            return true;
        }
        if let Some(color) = effective.value("color").and_then(|v| v.val())
            && self.options.is_color_excluded(color)
        {
            return true;
        }
        !self.options.translate_hidden_text && effective.is_on("vanish")
    }
}

/// The qualified name of a translatable attribute on this element, if any.
fn translatable_attribute(tag: &StartTag) -> Option<String> {
    let local = if classify::is_graphics_properties(tag) {
        "name"
    } else if classify::is_text_path(tag) {
        "string"
    } else {
        return None;
    };
    tag.attributes()
        .iter()
        .find(|attr| attr.local_name() == local && !attr.value.trim().is_empty())
        .map(|attr| attr.name.clone())
}

fn push_body(run: &mut Run, item: RunBodyItem) {
    let body = run.body_mut();
    match item {
        RunBodyItem::Markup(markup) => {
            if markup.kind() == MarkupKind::General
                && let Some(RunBodyItem::Markup(last)) = body.last_mut()
                && last.kind() == MarkupKind::General
            {
                last.append(markup);
            } else {
                body.push(RunBodyItem::Markup(markup));
            }
        },
        other => body.push(other),
    }
}

fn cleanup_run_properties(run: &mut Run) {
    let has_text = run.text().chars().any(|c| !c.is_whitespace());
    run.properties_mut().retain(|property| {
        let local = property.local_name();
        !CLEANUP_PROPERTIES.contains(local) && (has_text || local != "vertAlign")
    });
}
