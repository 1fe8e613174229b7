//! Write-back of blocks from their skeletons and translation units.
//!
//! Untranslated blocks are replayed as parsed. A block whose unit has a
//! target is regenerated: its leading and trailing skeleton chunks are
//! replayed, and the coded target is turned back into runs, using the code
//! table to restore formatting, containers and markup. Font mappings and
//! text direction for the target locale are applied to regenerated runs only.

pub mod bidi;
pub mod fonts;

pub use bidi::Direction;
pub use fonts::ApplicableFontMappings;

use crate::block::{Block, Chunk, Markup, MarkupComponent, MarkupKind, RunBodyItem};
use crate::classify::needs_preserve;
use crate::error::{Result, WeftError};
use crate::mapper::{BlockSkeleton, Layout};
use crate::options::ExtractionOptions;
use crate::styles::{BlockProperties, RunProperties};
use crate::unit::{Code, CodeOrigin, CodeShape, Fragment, TagType, TranslationUnit};
use crate::xml::{EndTag, StartTag, XmlEvent, prefix_part, qualify};
use std::collections::{BTreeSet, HashMap};

/// Translation units by id.
#[derive(Debug, Clone, Default)]
pub struct UnitIndex<'u> {
    units: HashMap<&'u str, &'u TranslationUnit>,
}

impl<'u> UnitIndex<'u> {
    pub fn new(units: impl IntoIterator<Item = &'u TranslationUnit>) -> Self {
        Self {
            units: units.into_iter().map(|unit| (unit.id(), unit)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&'u TranslationUnit> {
        self.units.get(id).copied()
    }
}

/// Regenerates block events from skeletons and units.
#[derive(Debug, Clone)]
pub struct SkeletonWriter<'a> {
    options: &'a ExtractionOptions,
    fonts: ApplicableFontMappings,
    direction: Option<Direction>,
}

impl<'a> SkeletonWriter<'a> {
    /// A writer that applies no locale-specific adjustments.
    pub fn new(options: &'a ExtractionOptions) -> Self {
        Self {
            options,
            fonts: ApplicableFontMappings::default(),
            direction: None,
        }
    }

    /// A writer for one source and target locale pair.
    pub fn for_locales(options: &'a ExtractionOptions, source_locale: &str, target_locale: &str) -> Result<Self> {
        Ok(Self {
            options,
            fonts: ApplicableFontMappings::new(&options.font_mappings, source_locale, target_locale)?,
            direction: Some(Direction::of_locale(target_locale)),
        })
    }

    /// Events of one block.
    pub fn write(&self, skeleton: &BlockSkeleton, units: &UnitIndex<'_>) -> Result<Vec<XmlEvent>> {
        let mut out = Vec::new();
        self.write_block(skeleton.block(), skeleton.unit_id(), units, &mut out)?;
        Ok(out)
    }

    fn write_block(
        &self,
        block: &Block,
        unit_id: Option<&str>,
        units: &UnitIndex<'_>,
        out: &mut Vec<XmlEvent>,
    ) -> Result<()> {
        let unit = unit_id.and_then(|id| {
            let unit = units.get(id);
            if unit.is_none() {
                log::warn!("Unit {id} not supplied; replaying its block unchanged");
            }
            unit
        });
        match (unit, Layout::of(block)) {
            (Some(unit), Some(layout)) if unit.target().is_some() => self.regenerate(block, &layout, unit, units, out),
            _ => self.replay(block, units, out),
        }
    }

    fn replay(&self, block: &Block, units: &UnitIndex<'_>, out: &mut Vec<XmlEvent>) -> Result<()> {
        for chunk in block.chunks() {
            self.write_chunk(chunk, units, out)?;
        }
        Ok(())
    }

    fn write_chunk(&self, chunk: &Chunk, units: &UnitIndex<'_>, out: &mut Vec<XmlEvent>) -> Result<()> {
        if !chunk_has_nested_items(chunk) {
            chunk.write_events(out);
            return Ok(());
        }
        let mut chunk = chunk.clone();
        self.resolve_chunk(&mut chunk, units)?;
        chunk.write_events(out);
        Ok(())
    }

    /// Replaces nested blocks and translatable attributes with their written form.
    fn resolve_chunk(&self, chunk: &mut Chunk, units: &UnitIndex<'_>) -> Result<()> {
        match chunk {
            Chunk::Markup(markup) => self.resolve_markup(markup, units),
            Chunk::Run(run) => {
                for item in run.body_mut() {
                    if let RunBodyItem::Markup(markup) = item {
                        self.resolve_markup(markup, units)?;
                    }
                }
                Ok(())
            },
            Chunk::Container(container) => {
                for inner in container.chunks_mut() {
                    self.resolve_chunk(inner, units)?;
                }
                Ok(())
            },
            Chunk::Text(_) | Chunk::BlockProperties(_) => Ok(()),
        }
    }

    fn resolve_markup(&self, markup: &mut Markup, units: &UnitIndex<'_>) -> Result<()> {
        for component in markup.components_mut() {
            match component {
                MarkupComponent::NestedBlock(nested) => {
                    let mut events = Vec::new();
                    self.write_block(&nested.block, nested.unit_id.as_deref(), units, &mut events)?;
                    *component = MarkupComponent::Events(events);
                },
                MarkupComponent::TranslatableAttribute(attribute) => {
                    let target = attribute
                        .unit_id
                        .as_deref()
                        .and_then(|id| units.get(id))
                        .and_then(TranslationUnit::target);
                    if let Some(target) = target {
                        attribute.start.set_attribute(&attribute.attribute, target.plain_text());
                    }
                },
                MarkupComponent::Events(_) => {},
            }
        }
        Ok(())
    }

    fn regenerate(
        &self,
        block: &Block,
        layout: &Layout,
        unit: &TranslationUnit,
        units: &UnitIndex<'_>,
        out: &mut Vec<XmlEvent>,
    ) -> Result<()> {
        let content = unit.content();
        let text = content.plain_text();
        let chunks = block.chunks();

        for (index, chunk) in chunks[..layout.content.start].iter().enumerate() {
            match chunk {
                Chunk::Markup(markup) if markup.kind().is_silent() && markup.kind() != MarkupKind::Whitespace => {},
                Chunk::BlockProperties(properties) => {
                    let mut properties = properties.clone();
                    if let Some(direction) = self.direction {
                        bidi::adjust_paragraph(&mut properties, direction, &text);
                    }
                    properties.write_events(out);
                },
                _ => self.write_chunk(chunk, units, out)?,
            }
            if index == 0 && block.properties().is_none() {
                self.write_missing_paragraph_properties(block, &text, out);
            }
        }

        let mut regenerator = Regenerator {
            writer: self,
            units,
            unit,
            block,
            base: layout.base.as_ref(),
            frames: Vec::new(),
            run: None,
            out,
        };
        regenerator.write_fragments(content.fragments())?;
        regenerator.finish()?;

        for chunk in &chunks[layout.content.end..] {
            match chunk {
                Chunk::Markup(markup) if markup.kind().is_silent() && markup.kind() != MarkupKind::Whitespace => {},
                _ => self.write_chunk(chunk, units, out)?,
            }
        }
        Ok(())
    }

    /// Adds `w:pPr` holding `w:bidi` to a right-to-left paragraph that has no properties.
    fn write_missing_paragraph_properties(&self, block: &Block, text: &str, out: &mut Vec<XmlEvent>) {
        let Some(direction) = self.direction else { return };
        let prefix = prefix_part(block.run_name());
        if prefix != "w" {
            return;
        }
        let mut properties = BlockProperties::absent(qualify(prefix, "pPr"));
        bidi::adjust_paragraph(&mut properties, direction, text);
        properties.write_events(out);
    }

    fn adjust_run_properties(&self, properties: &mut RunProperties, text: &str) {
        self.fonts.apply(properties);
        if let Some(direction) = self.direction {
            bidi::adjust_run(properties, direction, text);
        }
    }
}

fn chunk_has_nested_items(chunk: &Chunk) -> bool {
    match chunk {
        Chunk::Markup(markup) => markup.has_nested_items(),
        Chunk::Run(run) => run.has_nested_items(),
        Chunk::Container(container) => container.chunks().iter().any(chunk_has_nested_items),
        Chunk::Text(_) | Chunk::BlockProperties(_) => false,
    }
}

/// An open run or container code during regeneration.
#[derive(Debug)]
enum Frame<'a> {
    Format {
        id: u32,
        properties: &'a RunProperties,
    },
    Container {
        id: u32,
        end: &'a Markup,
        default: Option<&'a RunProperties>,
    },
}

impl Frame<'_> {
    fn id(&self) -> u32 {
        match self {
            Frame::Format { id, .. } | Frame::Container { id, .. } => *id,
        }
    }
}

/// A run being regenerated; written once its text is known.
#[derive(Debug)]
struct OpenRun {
    properties: RunProperties,
    body: Vec<XmlEvent>,
    text: String,
}

struct Regenerator<'a> {
    writer: &'a SkeletonWriter<'a>,
    units: &'a UnitIndex<'a>,
    unit: &'a TranslationUnit,
    block: &'a Block,
    base: Option<&'a RunProperties>,
    frames: Vec<Frame<'a>>,
    run: Option<OpenRun>,
    out: &'a mut Vec<XmlEvent>,
}

impl<'a> Regenerator<'a> {
    fn write_fragments(&mut self, fragments: &[Fragment]) -> Result<()> {
        for fragment in fragments {
            match fragment {
                Fragment::Text(text) => self.write_text(text),
                Fragment::Code { id, tag_type } => match tag_type {
                    TagType::Opening => self.open_code(*id)?,
                    TagType::Closing => self.close_code(*id)?,
                    TagType::Placeholder => self.placeholder(*id)?,
                },
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.close_run();
        while let Some(frame) = self.frames.pop() {
            log::warn!("Code {} of unit {} left open; closing it", frame.id(), self.unit.id());
            self.close_frame(frame);
        }

        let used: BTreeSet<u32> = self.unit.content().code_markers().map(|(id, _)| id).collect();
        for code in self.unit.codes().iter().filter(|code| !used.contains(&code.id())) {
            log::warn!("Code {} of unit {} missing from its target; its content is dropped", code.id(), self.unit.id());
        }
        Ok(())
    }

    fn code(&self, id: u32) -> Result<&'a Code> {
        self.unit.codes().get(id).ok_or_else(|| WeftError::UnresolvableCodeReference {
            unit: self.unit.id().to_string(),
            code: id,
        })
    }

    fn misused(&self, id: u32, tag_type: TagType) -> WeftError {
        WeftError::InvalidCodedText(format!(
            "code {id} of unit {} cannot be used as {tag_type:?}",
            self.unit.id()
        ))
    }

    fn current_properties(&self) -> Option<&'a RunProperties> {
        for frame in self.frames.iter().rev() {
            match frame {
                Frame::Format { properties, .. } => return Some(*properties),
                Frame::Container { default, .. } => return *default,
            }
        }
        self.base
    }

    fn open_code(&mut self, id: u32) -> Result<()> {
        let code = self.code(id)?;
        if code.shape() != CodeShape::Paired {
            return Err(self.misused(id, TagType::Opening));
        }
        self.close_run();
        match code.origin() {
            CodeOrigin::Formatting(properties) => self.frames.push(Frame::Format { id, properties }),
            CodeOrigin::Container {
                start,
                end,
                default_properties,
                ..
            } => {
                self.write_markup(start)?;
                self.frames.push(Frame::Container {
                    id,
                    end,
                    default: default_properties.as_ref(),
                });
            },
            CodeOrigin::RunMarkup(_) | CodeOrigin::Skeleton(_) => return Err(self.misused(id, TagType::Opening)),
        }
        Ok(())
    }

    fn close_code(&mut self, id: u32) -> Result<()> {
        self.code(id)?;
        let Some(position) = self.frames.iter().rposition(|frame| frame.id() == id) else {
            return Err(self.misused(id, TagType::Closing));
        };
        self.close_run();
        while self.frames.len() > position {
            if let Some(frame) = self.frames.pop() {
                self.close_frame(frame);
            }
        }
        Ok(())
    }

    fn close_frame(&mut self, frame: Frame<'a>) {
        if let Frame::Container { end, .. } = frame {
            end.write_events(self.out);
        }
    }

    fn placeholder(&mut self, id: u32) -> Result<()> {
        let code = self.code(id)?;
        match code.origin() {
            CodeOrigin::RunMarkup(markup) => {
                let mut markup = markup.clone();
                self.writer.resolve_markup(&mut markup, self.units)?;
                match self.ensure_run() {
                    Some(run) => markup.write_events(&mut run.body),
                    None => markup.write_events(self.out),
                }
                Ok(())
            },
            CodeOrigin::Skeleton(chunk) => {
                self.close_run();
                self.writer.write_chunk(chunk, self.units, self.out)
            },
            CodeOrigin::Formatting(_) | CodeOrigin::Container { .. } => Err(self.misused(id, TagType::Placeholder)),
        }
    }

    fn write_markup(&mut self, markup: &Markup) -> Result<()> {
        if markup.has_nested_items() {
            let mut markup = markup.clone();
            self.writer.resolve_markup(&mut markup, self.units)?;
            markup.write_events(self.out);
        } else {
            markup.write_events(self.out);
        }
        Ok(())
    }

    fn ensure_run(&mut self) -> Option<&mut OpenRun> {
        if self.run.is_none() {
            let properties = self.current_properties()?;
            self.run = Some(OpenRun {
                properties: properties.clone(),
                body: Vec::new(),
                text: String::new(),
            });
        }
        self.run.as_mut()
    }

    fn close_run(&mut self) {
        let Some(mut run) = self.run.take() else { return };
        self.writer.adjust_run_properties(&mut run.properties, &run.text);
        let name = self.block.run_name();
        self.out.push(XmlEvent::Start(StartTag::new(name)));
        run.properties.write_events(self.out);
        self.out.extend(run.body);
        self.out.push(XmlEvent::End(EndTag::new(name)));
    }

    /// Writes text, turning characters extracted from elements back into those elements.
    fn write_text(&mut self, text: &str) {
        let prefix = prefix_part(self.block.run_name());
        let options = self.writer.options;
        let word = prefix == "w";
        let mut pending = String::new();
        for c in text.chars() {
            let element = match c {
                '\t' if word && options.tab_as_character => "tab",
                c if word && options.line_separator_as_character && c == options.line_separator_replacement => "br",
                _ => {
                    pending.push(c);
                    continue;
                },
            };
            self.write_text_element(&std::mem::take(&mut pending));
            let tag = StartTag::new(qualify(prefix, element)).self_closing(true);
            let end = tag.end();
            let events = [XmlEvent::Start(tag), XmlEvent::End(end)];
            match self.ensure_run() {
                Some(run) => {
                    run.body.extend(events);
                    run.text.push(c);
                },
                None => self.out.extend(events),
            }
        }
        self.write_text_element(&pending);
    }

    fn write_text_element(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut start = StartTag::new(self.block.text_name());
        if prefix_part(self.block.text_name()) != "a" && needs_preserve(text) {
            start.set_attribute("xml:space", "preserve");
        }
        let end = start.end();
        let events = [XmlEvent::Start(start), XmlEvent::Text(text.to_string()), XmlEvent::End(end)];
        match self.ensure_run() {
            Some(run) => {
                run.body.extend(events);
                run.text.push_str(text);
            },
            None => self.out.extend(events),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockParser;
    use crate::mapper::{IdCounter, MappedBlock, TextUnitMapper};
    use crate::options::FontMapping;
    use crate::styles::{StyleHierarchy, optimizer_for};
    use crate::unit::CodedText;
    use crate::xml::{EventCursor, read_events, write_events};

    fn map_with(xml: &str, options: &ExtractionOptions) -> MappedBlock {
        let styles = StyleHierarchy::new();
        let events = read_events(xml.as_bytes()).unwrap();
        let mut block = BlockParser::new(&styles, options)
            .parse(&mut EventCursor::new("word/document.xml", &events))
            .unwrap();
        block.optimize(optimizer_for(options, &styles).as_ref());
        TextUnitMapper::new().map(block, &mut IdCounter::new())
    }

    fn translate(mapped: &mut MappedBlock, targets: &[(&str, &str)]) {
        for (id, target) in targets {
            let unit = mapped.units.iter_mut().find(|unit| unit.id() == *id).unwrap();
            unit.set_target(CodedText::parse(target).unwrap());
        }
    }

    fn written(writer: &SkeletonWriter<'_>, mapped: &MappedBlock) -> Result<String> {
        let events = writer.write(&mapped.skeleton, &UnitIndex::new(&mapped.units))?;
        Ok(String::from_utf8(write_events(&events)?).unwrap())
    }

    const OVERLAPPING: &str = r#"<w:p><w:r><w:t xml:space="preserve">This </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">document has </w:t></w:r><w:r><w:rPr><w:b/><w:i/></w:rPr><w:t>overlapping styles</w:t></w:r><w:r><w:t>.</w:t></w:r></w:p>"#;

    #[test]
    fn test_untranslated_block_is_replayed() {
        let options = ExtractionOptions::default();
        let mapped = map_with(OVERLAPPING, &options);
        assert_eq!(written(&SkeletonWriter::new(&options), &mapped).unwrap(), OVERLAPPING);
    }

    #[test]
    fn test_overlapping_formatting_regenerated() {
        let options = ExtractionOptions::default();
        let mut mapped = map_with(OVERLAPPING, &options);
        translate(&mut mapped, &[("1", "Ceci <run1>est un <run2>document</run2></run1>.")]);
        assert_eq!(
            written(&SkeletonWriter::new(&options), &mapped).unwrap(),
            r#"<w:p><w:r><w:t xml:space="preserve">Ceci </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">est un </w:t></w:r><w:r><w:rPr><w:b/><w:i/></w:rPr><w:t>document</w:t></w:r><w:r><w:t>.</w:t></w:r></w:p>"#
        );
    }

    #[test]
    fn test_source_as_target_round_trips() {
        let options = ExtractionOptions::default();
        let mut mapped = map_with(OVERLAPPING, &options);
        let source = mapped.units[0].render_source();
        translate(&mut mapped, &[("1", &source)]);
        assert_eq!(written(&SkeletonWriter::new(&options), &mapped).unwrap(), OVERLAPPING);
    }

    #[test]
    fn test_hidden_run_restored_from_placeholder() {
        let options = ExtractionOptions::default();
        let mut mapped = map_with(
            r#"<w:p><w:r><w:t xml:space="preserve">Visible </w:t></w:r><w:r><w:rPr><w:vanish/></w:rPr><w:t>secret</w:t></w:r><w:r><w:t xml:space="preserve"> end</w:t></w:r></w:p>"#,
            &options,
        );
        translate(&mut mapped, &[("1", "Visible <run1/> fin")]);
        let xml = written(&SkeletonWriter::new(&options), &mapped).unwrap();
        assert!(xml.contains(r#"<w:r><w:rPr><w:vanish/></w:rPr><w:t>secret</w:t></w:r>"#), "{xml}");
        assert!(xml.contains(r#"<w:t xml:space="preserve"> fin</w:t>"#), "{xml}");
    }

    #[test]
    fn test_containers_regenerated() {
        let options = ExtractionOptions::default();
        let mut mapped = map_with(
            r#"<w:p><w:r><w:t xml:space="preserve">Go </w:t></w:r><w:hyperlink r:id="rId1"><w:r><w:rPr><w:rStyle w:val="Hyperlink"/></w:rPr><w:t>here</w:t></w:r></w:hyperlink><w:r><w:t xml:space="preserve"> or </w:t></w:r><w:sdt><w:sdtContent><w:r><w:t>there</w:t></w:r></w:sdtContent></w:sdt></w:p>"#,
            &options,
        );
        translate(&mut mapped, &[("1", "<sdt2>Aller</sdt2> ou <hyperlink1>ici</hyperlink1>")]);
        let xml = written(&SkeletonWriter::new(&options), &mapped).unwrap();
        let hyperlink = xml
            .find(r#"<w:hyperlink r:id="rId1"><w:r><w:rPr><w:rStyle w:val="Hyperlink"/></w:rPr><w:t>ici</w:t></w:r></w:hyperlink>"#)
            .unwrap();
        let sdt = xml.find("<w:t>Aller</w:t>").unwrap();
        assert!(sdt < hyperlink, "{xml}");
        assert!(xml.contains("</w:sdtContent></w:sdt>"), "{xml}");
    }

    #[test]
    fn test_markup_placeholder_stays_in_run() {
        let xml = r#"<w:p><w:r><w:t xml:space="preserve">Tab </w:t><w:tab/><w:t>here</w:t></w:r></w:p>"#;
        let expected = r#"<w:p><w:r><w:t xml:space="preserve">Onglet </w:t><w:tab/><w:t>ici</w:t></w:r></w:p>"#;

        let options = ExtractionOptions::default();
        let mut mapped = map_with(xml, &options);
        translate(&mut mapped, &[("1", "Onglet <run1/>ici")]);
        assert_eq!(written(&SkeletonWriter::new(&options), &mapped).unwrap(), expected);

        let tabs = ExtractionOptions::new().with_tab_as_character(true);
        let mut mapped = map_with(xml, &tabs);
        translate(&mut mapped, &[("1", "Onglet \tici")]);
        assert_eq!(written(&SkeletonWriter::new(&tabs), &mapped).unwrap(), expected);
    }

    #[test]
    fn test_unknown_code_is_an_error() {
        let options = ExtractionOptions::default();
        let mut mapped = map_with(OVERLAPPING, &options);
        translate(&mut mapped, &[("1", "Broken <run9/>")]);
        let err = written(&SkeletonWriter::new(&options), &mapped).unwrap_err();
        assert!(matches!(err, WeftError::UnresolvableCodeReference { ref unit, code: 9 } if unit == "1"));
    }

    #[test]
    fn test_closing_code_without_opening_is_an_error() {
        let options = ExtractionOptions::default();
        let mut mapped = map_with(OVERLAPPING, &options);
        translate(&mut mapped, &[("1", "Broken </run1>")]);
        let err = written(&SkeletonWriter::new(&options), &mapped).unwrap_err();
        assert!(matches!(err, WeftError::InvalidCodedText(_)));
    }

    #[test]
    fn test_right_to_left_target() {
        let options = ExtractionOptions::default();
        let mut mapped = map_with(r#"<w:p><w:r><w:t>Hello</w:t></w:r></w:p>"#, &options);
        translate(&mut mapped, &[("1", "مرحبا")]);
        let writer = SkeletonWriter::for_locales(&options, "en-US", "ar-SA").unwrap();
        assert_eq!(
            written(&writer, &mapped).unwrap(),
            r#"<w:p><w:pPr><w:bidi/></w:pPr><w:r><w:rPr><w:rtl/></w:rPr><w:t>مرحبا</w:t></w:r></w:p>"#
        );
    }

    #[test]
    fn test_left_to_right_target_clears_direction() {
        let options = ExtractionOptions::default();
        let mut mapped = map_with(
            r#"<w:p><w:pPr><w:bidi/><w:jc w:val="right"/></w:pPr><w:r><w:rPr><w:rtl/></w:rPr><w:t>نص</w:t></w:r></w:p>"#,
            &options,
        );
        translate(&mut mapped, &[("1", "Text")]);
        let writer = SkeletonWriter::for_locales(&options, "ar", "en").unwrap();
        assert_eq!(
            written(&writer, &mapped).unwrap(),
            r#"<w:p><w:pPr><w:jc w:val="right"/></w:pPr><w:r><w:t>Text</w:t></w:r></w:p>"#
        );
    }

    #[test]
    fn test_font_mapping_applied_to_regenerated_runs() {
        let options = ExtractionOptions::new().with_font_mapping(FontMapping::new("en.*", "ja.*", "Arial", "Meiryo"));
        let mut mapped = map_with(
            r#"<w:p><w:r><w:rPr><w:rFonts w:ascii="Arial" w:hAnsi="Arial"/></w:rPr><w:t>Hello</w:t></w:r></w:p>"#,
            &options,
        );
        translate(&mut mapped, &[("1", "こんにちは")]);
        let writer = SkeletonWriter::for_locales(&options, "en-US", "ja-JP").unwrap();
        assert_eq!(
            written(&writer, &mapped).unwrap(),
            r#"<w:p><w:r><w:rPr><w:rFonts w:ascii="Meiryo" w:hAnsi="Meiryo"/></w:rPr><w:t>こんにちは</w:t></w:r></w:p>"#
        );
    }

    #[test]
    fn test_referents_written_into_untranslated_block() {
        let options = ExtractionOptions::default();
        let mut mapped = map_with(
            r#"<w:p><w:r><w:t>Outer</w:t></w:r><w:r><w:drawing><wp:inline><wp:docPr id="1" name="Picture 1"/><a:graphic><wps:txbx><w:txbxContent><w:p><w:r><w:t>Inner</w:t></w:r></w:p></w:txbxContent></wps:txbx></a:graphic></wp:inline></w:drawing></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>after</w:t></w:r></w:p>"#,
            &options,
        );
        translate(&mut mapped, &[("1", "Image 1"), ("2", "Dedans")]);
        let xml = written(&SkeletonWriter::new(&options), &mapped).unwrap();
        assert!(xml.contains(r#"<wp:docPr id="1" name="Image 1"/>"#), "{xml}");
        assert!(xml.contains("<w:t>Dedans</w:t>"), "{xml}");
        assert!(xml.contains("<w:t>Outer</w:t>"), "{xml}");

        translate(&mut mapped, &[("3", "Dehors<run1/><run2>apres</run2>")]);
        let xml = written(&SkeletonWriter::new(&options), &mapped).unwrap();
        assert!(xml.contains("<w:t>Dedans</w:t>"), "{xml}");
        assert!(xml.contains(r#"<w:rPr><w:b/></w:rPr><w:t>apres</w:t>"#), "{xml}");
    }
}
