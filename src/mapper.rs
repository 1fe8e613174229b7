//! Block to translation unit mapping.
//!
//! A block yields at most one main unit plus one referent unit for every
//! text box paragraph and translatable attribute it carries. Leading and
//! trailing content without visible text stays in the skeleton, so only the
//! stretch from the first to the last visible text is coded.
//!
//! Runs whose formatting matches the block's base formatting contribute bare
//! text. A run with other formatting opens a `run` code that stays open for
//! following runs whose formatting includes it:
//!
//! ```text
//! This <run1>document has <run2>overlapping styles</run2></run1>.
//! ```

use crate::block::{Block, Chunk, Markup, MarkupComponent, MarkupKind, Run, RunBodyItem, RunText, TextPiece};
use crate::styles::RunProperties;
use crate::unit::{Code, CodeClass, CodeOrigin, CodeShape, CodeTable, CodedText, TagType, TranslationUnit};
use crate::xml::{prefix_part, qualify};
use std::ops::Range;

/// Caller-owned source of unit identifiers.
///
/// Ids increase monotonically. Parts processed in parallel use distinct
/// prefixes so their ids never collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdCounter {
    prefix: Option<String>,
    next: u64,
}

impl Default for IdCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl IdCounter {
    pub fn new() -> Self {
        Self { prefix: None, next: 1 }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            next: 1,
        }
    }

    pub fn next_id(&mut self) -> String {
        let mut buffer = itoa::Buffer::new();
        let number = buffer.format(self.next);
        self.next += 1;
        match &self.prefix {
            Some(prefix) => format!("{prefix}-{number}"),
            None => number.to_string(),
        }
    }
}

/// The translatable stretch of a block.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Layout {
    /// Chunks from the first to the last one with visible text.
    pub content: Range<usize>,
    /// Formatting of text outside any run code. `None` for bare text elements.
    pub base: Option<RunProperties>,
}

impl Layout {
    /// Returns `None` when the block has no visible text.
    pub fn of(block: &Block) -> Option<Self> {
        let inner = block.content_start()..block.content_end();
        let chunks = block.chunks();
        let first = inner.clone().find(|&i| chunks[i].has_visible_text())?;
        let last = inner.rev().find(|&i| chunks[i].has_visible_text())?;
        let content = first..last + 1;

        let runs = chunks[content.clone()].iter().filter_map(|chunk| match chunk {
            Chunk::Run(run) if run.has_visible_text() => Some(run.properties()),
            _ => None,
        });
        let fewest = runs.fold(None::<&RunProperties>, |best, properties| match best {
            Some(best) if best.len() <= properties.len() => Some(best),
            _ => Some(properties),
        });
        let has_bare_text = chunks[content.clone()].iter().any(|c| matches!(c, Chunk::Text(_)));
        let base = match fewest {
            Some(properties) => Some(properties.clone()),
            None if has_bare_text => None,
            None => Some(RunProperties::absent(qualify(prefix_part(block.run_name()), "rPr"))),
        };
        Some(Self { content, base })
    }
}

/// A block with the ids of the units extracted from it.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSkeleton {
    block: Block,
    unit_id: Option<String>,
}

impl BlockSkeleton {
    pub fn new(block: Block, unit_id: Option<String>) -> Self {
        Self { block, unit_id }
    }

    #[inline]
    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Id of the block's main unit; `None` when nothing was translatable.
    #[inline]
    pub fn unit_id(&self) -> Option<&str> {
        self.unit_id.as_deref()
    }
}

/// Units extracted from one block, referents first.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedBlock {
    pub units: Vec<TranslationUnit>,
    pub skeleton: BlockSkeleton,
}

/// Maps blocks to translation units.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextUnitMapper;

impl TextUnitMapper {
    pub fn new() -> Self {
        Self
    }

    pub fn map(&self, mut block: Block, counter: &mut IdCounter) -> MappedBlock {
        let mut units = Vec::new();
        let unit_id = self.map_block(&mut block, counter, &mut units, false);
        MappedBlock {
            units,
            skeleton: BlockSkeleton::new(block, unit_id),
        }
    }

    fn map_block(
        &self,
        block: &mut Block,
        counter: &mut IdCounter,
        units: &mut Vec<TranslationUnit>,
        referent: bool,
    ) -> Option<String> {
        self.map_referents(block.chunks_mut(), counter, units);

        let layout = Layout::of(block)?;
        let mut builder = UnitBuilder::default();
        builder.map_chunks(&block.chunks()[layout.content.clone()], layout.base.as_ref());
        if !builder.text.has_text() {
            log::debug!("Block without translatable text demoted to skeleton");
            return None;
        }

        let id = counter.next_id();
        units.push(TranslationUnit::new(id.clone(), builder.text, builder.codes).with_referent(referent));
        Some(id)
    }

    fn map_referents(&self, chunks: &mut [Chunk], counter: &mut IdCounter, units: &mut Vec<TranslationUnit>) {
        for chunk in chunks {
            match chunk {
                Chunk::Markup(markup) => self.map_markup_referents(markup, counter, units),
                Chunk::Run(run) => {
                    for item in run.body_mut() {
                        if let RunBodyItem::Markup(markup) = item {
                            self.map_markup_referents(markup, counter, units);
                        }
                    }
                },
                Chunk::Container(container) => self.map_referents(container.chunks_mut(), counter, units),
                Chunk::Text(_) | Chunk::BlockProperties(_) => {},
            }
        }
    }

    fn map_markup_referents(&self, markup: &mut Markup, counter: &mut IdCounter, units: &mut Vec<TranslationUnit>) {
        for component in markup.components_mut() {
            match component {
                MarkupComponent::NestedBlock(nested) => {
                    nested.unit_id = self.map_block(&mut nested.block, counter, units, true);
                },
                MarkupComponent::TranslatableAttribute(attribute) => {
                    let value = attribute.value();
                    if value.trim().is_empty() {
                        continue;
                    }
                    let id = counter.next_id();
                    let text = CodedText::from_text(value);
                    units.push(TranslationUnit::new(id.clone(), text, CodeTable::new()).with_referent(true));
                    attribute.unit_id = Some(id);
                },
                MarkupComponent::Events(_) => {},
            }
        }
    }
}

#[derive(Debug, Default)]
struct UnitBuilder {
    text: CodedText,
    codes: CodeTable,
    last_code: u32,
}

impl UnitBuilder {
    fn add_code(&mut self, shape: CodeShape, class: CodeClass, origin: CodeOrigin) -> u32 {
        self.last_code += 1;
        self.codes.insert(Code::new(self.last_code, shape, class, origin));
        self.last_code
    }

    fn placeholder(&mut self, class: CodeClass, origin: CodeOrigin) {
        let id = self.add_code(CodeShape::Placeholder, class, origin);
        self.text.push_code(id, TagType::Placeholder);
    }

    /// Text of a text element; comments and other events inside it become placeholders.
    fn push_run_text(&mut self, text: &RunText) {
        for piece in text.pieces() {
            match piece {
                TextPiece::Text(text) => self.text.push_text(text),
                TextPiece::Events(events) => self.placeholder(
                    CodeClass::Run,
                    CodeOrigin::RunMarkup(Markup::from_events(MarkupKind::General, events)),
                ),
            }
        }
    }

    fn close_all(&mut self, open: &mut Vec<(u32, &RunProperties)>) {
        while let Some((id, _)) = open.pop() {
            self.text.push_code(id, TagType::Closing);
        }
    }

    fn map_chunks<'c>(&mut self, chunks: &'c [Chunk], base: Option<&'c RunProperties>) {
        let mut open: Vec<(u32, &'c RunProperties)> = Vec::new();
        for chunk in chunks {
            match chunk {
                Chunk::Run(run) if run.has_visible_text() => self.map_run(run, base, &mut open),
                Chunk::Text(text) => self.push_run_text(&text.text),
                Chunk::Container(container) if container.has_visible_text() => {
                    self.close_all(&mut open);
                    let default = container.default_properties().or(base);
                    let id = self.add_code(
                        CodeShape::Paired,
                        CodeClass::for_container(container.kind()),
                        CodeOrigin::Container {
                            kind: container.kind(),
                            start: container.start().clone(),
                            end: container.end().clone(),
                            default_properties: default.cloned(),
                        },
                    );
                    self.text.push_code(id, TagType::Opening);
                    self.map_chunks(container.chunks(), default);
                    self.text.push_code(id, TagType::Closing);
                },
                Chunk::Markup(markup) if markup.kind().is_silent() => {},
                Chunk::Run(_) => self.placeholder(CodeClass::Run, CodeOrigin::Skeleton(chunk.clone())),
                Chunk::Container(container) => self.placeholder(
                    CodeClass::for_container(container.kind()),
                    CodeOrigin::Skeleton(chunk.clone()),
                ),
                Chunk::Markup(_) | Chunk::BlockProperties(_) => {
                    self.placeholder(CodeClass::Tags, CodeOrigin::Skeleton(chunk.clone()))
                },
            }
        }
        self.close_all(&mut open);
    }

    fn map_run<'c>(&mut self, run: &'c Run, base: Option<&'c RunProperties>, open: &mut Vec<(u32, &'c RunProperties)>) {
        let properties = run.properties();
        while let Some(&(id, top)) = open.last() {
            if top.is_subset_of(properties) {
                break;
            }
            open.pop();
            self.text.push_code(id, TagType::Closing);
        }

        let current = open.last().map(|&(_, top)| top).or(base);
        let differs = match current {
            Some(current) => !properties.same_values(current),
            None => !properties.is_empty(),
        };
        if differs {
            let id = self.add_code(CodeShape::Paired, CodeClass::Run, CodeOrigin::Formatting(properties.clone()));
            self.text.push_code(id, TagType::Opening);
            open.push((id, properties));
        }

        for item in run.body() {
            match item {
                RunBodyItem::Text(text) => self.push_run_text(text),
                RunBodyItem::Character(c) => self.text.push_char(c.character),
                RunBodyItem::Markup(markup) if markup.kind().is_silent() => {},
                RunBodyItem::Markup(markup) => {
                    self.placeholder(CodeClass::Run, CodeOrigin::RunMarkup(markup.clone()))
                },
            }
        }
    }
}
