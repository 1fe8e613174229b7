//! Whole-part extraction and write-back.
//!
//! [`PartExtractor`] turns a part into an [`ExtractedPart`]: the events
//! outside paragraphs, interleaved with the skeletons of the paragraphs, plus
//! the translation units extracted from them. [`PartWriter`] reverses it.
//!
//! ```
//! use weft::{ExtractionOptions, PartExtractor, PartWriter, StyleHierarchy};
//!
//! # fn main() -> weft::Result<()> {
//! let styles = StyleHierarchy::new();
//! let options = ExtractionOptions::default();
//! let xml = br#"<w:body><w:p><w:r><w:t>Hello</w:t></w:r></w:p></w:body>"#;
//!
//! let mut part = PartExtractor::new(&styles, &options).extract("word/document.xml", xml)?;
//! assert_eq!(part.units[0].render_source(), "Hello");
//!
//! part.units[0].set_target(weft::CodedText::from_text("Bonjour"));
//! let translated = PartWriter::new(&options).write(&part, &part.units)?;
//! assert_eq!(translated, br#"<w:body><w:p><w:r><w:t>Bonjour</w:t></w:r></w:p></w:body>"#);
//! # Ok(())
//! # }
//! ```

use crate::block::BlockParser;
use crate::classify;
use crate::error::Result;
use crate::mapper::{BlockSkeleton, IdCounter, TextUnitMapper};
use crate::options::ExtractionOptions;
use crate::simplify::without_revision_ids;
use crate::styles::{StyleHierarchy, StyleOptimizer, optimizer_for};
use crate::unit::TranslationUnit;
use crate::writer::{SkeletonWriter, UnitIndex};
use crate::xml::{EventCursor, XmlEvent, read_events, write_events};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A piece of an extracted part, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum PartItem {
    /// Events outside any paragraph.
    Events(Vec<XmlEvent>),
    Block(BlockSkeleton),
}

/// A part split into pass-through events, block skeletons and units.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPart {
    pub name: String,
    pub items: Vec<PartItem>,
    pub units: Vec<TranslationUnit>,
}

impl ExtractedPart {
    pub fn block_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item, PartItem::Block(_)))
            .count()
    }
}

/// Extracts the translation units of whole parts.
#[derive(Debug)]
pub struct PartExtractor<'a> {
    options: &'a ExtractionOptions,
    parser: BlockParser<'a>,
    optimizer: Box<dyn StyleOptimizer + 'a>,
    mapper: TextUnitMapper,
}

impl<'a> PartExtractor<'a> {
    pub fn new(styles: &'a StyleHierarchy, options: &'a ExtractionOptions) -> Self {
        Self {
            options,
            parser: BlockParser::new(styles, options),
            optimizer: optimizer_for(options, styles),
            mapper: TextUnitMapper::new(),
        }
    }

    /// Extracts a part given as raw XML, numbering units from 1.
    pub fn extract(&self, name: &str, xml: &[u8]) -> Result<ExtractedPart> {
        self.extract_with(name, xml, &mut IdCounter::new())
    }

    /// Extracts a part given as raw XML, drawing unit ids from `counter`.
    pub fn extract_with(&self, name: &str, xml: &[u8], counter: &mut IdCounter) -> Result<ExtractedPart> {
        let events = read_events(xml)?;
        self.extract_events(name, &events, counter)
    }

    /// Extracts already-read events. Comment parts pass through untouched
    /// unless comments are translated.
    pub fn extract_events(&self, name: &str, events: &[XmlEvent], counter: &mut IdCounter) -> Result<ExtractedPart> {
        if !self.options.translate_comments && classify::is_comment_part(name) {
            log::debug!("Skipping comment part {name}");
            return Ok(ExtractedPart {
                name: name.to_string(),
                items: vec![PartItem::Events(events.to_vec())],
                units: Vec::new(),
            });
        }

        let mut cursor = EventCursor::new(name, events);
        let mut items = Vec::new();
        let mut units = Vec::new();
        let mut pending = Vec::new();

        while let Some(event) = cursor.next() {
            match event {
                XmlEvent::Start(tag) if classify::is_paragraph(tag) => {
                    if !pending.is_empty() {
                        items.push(PartItem::Events(std::mem::take(&mut pending)));
                    }
                    let mut block = self.parser.parse_from(&mut cursor, tag)?;
                    block.optimize(self.optimizer.as_ref());
                    let mapped = self.mapper.map(block, counter);
                    units.extend(mapped.units);
                    items.push(PartItem::Block(mapped.skeleton));
                },
                other => pending.push(without_revision_ids(other)),
            }
        }
        if !pending.is_empty() {
            items.push(PartItem::Events(pending));
        }

        log::debug!("Extracted {} units from {name}", units.len());
        Ok(ExtractedPart {
            name: name.to_string(),
            items,
            units,
        })
    }
}

/// Extracts several independent parts, in parallel with the `parallel`
/// feature. Unit ids are prefixed with the part name so they stay disjoint.
pub fn extract_parts<N, X>(
    parts: &[(N, X)],
    styles: &StyleHierarchy,
    options: &ExtractionOptions,
) -> Result<Vec<ExtractedPart>>
where
    N: AsRef<str> + Sync,
    X: AsRef<[u8]> + Sync,
{
    let extract = |(name, xml): &(N, X)| {
        let extractor = PartExtractor::new(styles, options);
        let name = name.as_ref();
        extractor.extract_with(name, xml.as_ref(), &mut IdCounter::with_prefix(name))
    };

    #[cfg(feature = "parallel")]
    let extracted: Vec<Result<ExtractedPart>> = parts.par_iter().map(extract).collect();
    #[cfg(not(feature = "parallel"))]
    let extracted: Vec<Result<ExtractedPart>> = parts.iter().map(extract).collect();

    extracted.into_iter().collect()
}

/// Writes extracted parts back with their units.
#[derive(Debug, Clone)]
pub struct PartWriter<'a> {
    writer: SkeletonWriter<'a>,
}

impl<'a> PartWriter<'a> {
    pub fn new(options: &'a ExtractionOptions) -> Self {
        Self {
            writer: SkeletonWriter::new(options),
        }
    }

    /// A writer applying the font mappings and text direction of a locale pair.
    pub fn for_locales(options: &'a ExtractionOptions, source_locale: &str, target_locale: &str) -> Result<Self> {
        Ok(Self {
            writer: SkeletonWriter::for_locales(options, source_locale, target_locale)?,
        })
    }

    /// Raw XML of the part.
    pub fn write(&self, part: &ExtractedPart, units: &[TranslationUnit]) -> Result<Vec<u8>> {
        write_events(&self.write_events(part, units)?)
    }

    pub fn write_events(&self, part: &ExtractedPart, units: &[TranslationUnit]) -> Result<Vec<XmlEvent>> {
        let index = UnitIndex::new(units);
        let mut out = Vec::new();
        for item in &part.items {
            match item {
                PartItem::Events(events) => out.extend_from_slice(events),
                PartItem::Block(skeleton) => out.extend(self.writer.write(skeleton, &index)?),
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::CodedText;
    use crate::xml::structurally_equal;
    use std::collections::HashSet;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t>Title</w:t></w:r></w:p>
<w:p><w:r><w:t xml:space="preserve">First </w:t></w:r><w:r><w:rPr><w:i/></w:rPr><w:t>paragraph</w:t></w:r></w:p>
<w:tbl><w:tr w:rsidR="00A1"><w:tc><w:p><w:r><w:t>Cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
<w:p/>
<w:sectPr><w:pgSz w:w="12240" w:h="15840"/></w:sectPr>
</w:body></w:document>"#;

    fn extract(xml: &str) -> ExtractedPart {
        let styles = StyleHierarchy::new();
        let options = ExtractionOptions::default();
        PartExtractor::new(&styles, &options)
            .extract("word/document.xml", xml.as_bytes())
            .unwrap()
    }

    fn write(part: &ExtractedPart) -> Vec<u8> {
        PartWriter::new(&ExtractionOptions::default())
            .write(part, &part.units)
            .unwrap()
    }

    #[test]
    fn test_untranslated_part_round_trips() {
        let part = extract(DOCUMENT);
        assert_eq!(part.block_count(), 4);
        let sources: Vec<String> = part.units.iter().map(TranslationUnit::render_source).collect();
        assert_eq!(sources, ["Title", "First <run1>paragraph</run1>", "Cell"]);

        let written = read_events(&write(&part)).unwrap();
        let expected = read_events(DOCUMENT.replace(r#" w:rsidR="00A1""#, "").as_bytes()).unwrap();
        assert!(structurally_equal(&written, &expected));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let once = write(&extract(DOCUMENT));
        let twice = write(&extract(std::str::from_utf8(&once).unwrap()));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_translated_part() {
        let mut part = extract(DOCUMENT);
        let targets = ["Titre", "Premier <run1>paragraphe</run1>", "Cellule"];
        for (unit, target) in part.units.iter_mut().zip(targets) {
            unit.set_target(CodedText::parse(target).unwrap());
        }
        let xml = String::from_utf8(write(&part)).unwrap();
        assert!(xml.contains(r#"<w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t>Titre</w:t></w:r>"#));
        assert!(xml.contains(r#"<w:r><w:rPr><w:i/></w:rPr><w:t>paragraphe</w:t></w:r>"#));
        assert!(xml.contains("<w:tr><w:tc><w:p><w:r><w:t>Cellule</w:t></w:r></w:p></w:tc></w:tr>"));
    }

    #[test]
    fn test_comments_and_formatting_whitespace_survive() {
        for xml in [
            r#"<w:body><w:p><w:r><w:t>Hello<!-- keep --> world</w:t></w:r></w:p></w:body>"#,
            r#"<w:body><w:p><w:r><w:rPr><!-- keep --><w:b/></w:rPr><w:t>Bold</w:t></w:r></w:p></w:body>"#,
            r#"<w:body><w:p><!-- before --><w:pPr><w:jc w:val="center"/></w:pPr><w:r><?render fast?><w:t>x</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>y</w:t></w:r></w:p></w:body>"#,
            "<w:body>\n<w:p>\n  <w:r>\n    <w:t>Indented</w:t>\n  </w:r>\n</w:p>\n</w:body>",
        ] {
            let part = extract(xml);
            assert_eq!(String::from_utf8(write(&part)).unwrap(), xml);
            assert!(structurally_equal(&read_events(&write(&part)).unwrap(), &read_events(xml.as_bytes()).unwrap()));
        }
    }

    #[test]
    fn test_comment_inside_translated_text() {
        let mut part = extract(r#"<w:body><w:p><w:r><w:t>Hello<!-- keep --> world</w:t></w:r></w:p></w:body>"#);
        assert_eq!(part.units[0].render_source(), "Hello<run1/> world");
        part.units[0].set_target(CodedText::parse("Bonjour<run1/> monde").unwrap());
        let xml = String::from_utf8(write(&part)).unwrap();
        assert!(xml.contains("Bonjour</w:t><!-- keep --><w:t"), "{xml}");
        assert!(xml.contains("> monde</w:t>"), "{xml}");
    }

    #[test]
    fn test_pretty_printed_part_translates() {
        let mut part = extract("<w:body>\n<w:p>\n  <w:r>\n    <w:t>Indented</w:t>\n  </w:r>\n</w:p>\n</w:body>");
        assert_eq!(part.units[0].render_source(), "Indented");
        part.units[0].set_target(CodedText::parse("Eingerückt").unwrap());
        let xml = String::from_utf8(write(&part)).unwrap();
        assert!(xml.starts_with("<w:body>\n<w:p>\n  "), "{xml}");
        assert!(xml.contains("<w:t>Eingerückt</w:t>"), "{xml}");
        assert!(xml.ends_with("\n</w:p>\n</w:body>"), "{xml}");
    }

    #[test]
    fn test_drawing_off_toggle_survives() {
        let xml = r#"<p:txBody><a:p><a:r><a:rPr lang="en-US" b="0"/><a:t>Plain </a:t></a:r><a:r><a:rPr lang="en-US"/><a:t>inherits bold</a:t></a:r></a:p></p:txBody>"#;
        let styles = StyleHierarchy::new();
        let options = ExtractionOptions::default();
        let part = PartExtractor::new(&styles, &options)
            .extract("ppt/slides/slide1.xml", xml.as_bytes())
            .unwrap();
        assert!(part.units[0].render_source().contains("<run1>"));
        let written = read_events(&write(&part)).unwrap();
        assert!(structurally_equal(&written, &read_events(xml.as_bytes()).unwrap()));
    }

    #[test]
    fn test_parts_get_disjoint_ids() {
        let parts = [
            ("word/document.xml", DOCUMENT.as_bytes()),
            ("word/footnotes.xml", DOCUMENT.as_bytes()),
        ];
        let extracted = extract_parts(&parts, &StyleHierarchy::new(), &ExtractionOptions::default()).unwrap();
        assert_eq!(extracted.len(), 2);
        assert_eq!(extracted[1].name, "word/footnotes.xml");
        assert_eq!(extracted[0].units[0].id(), "word/document.xml-1");

        let ids: HashSet<&str> = extracted
            .iter()
            .flat_map(|part| part.units.iter().map(TranslationUnit::id))
            .collect();
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn test_comment_parts_follow_options() {
        let comments = r#"<w:comments><w:comment w:id="0" w:author="A"><w:p><w:r><w:t>Check this</w:t></w:r></w:p></w:comment></w:comments>"#;
        let styles = StyleHierarchy::new();

        let translated = ExtractionOptions::default();
        let part = PartExtractor::new(&styles, &translated)
            .extract("word/comments.xml", comments.as_bytes())
            .unwrap();
        assert_eq!(part.units.len(), 1);

        let skipped = ExtractionOptions::new().with_translate_comments(false);
        let part = PartExtractor::new(&styles, &skipped)
            .extract("word/comments.xml", comments.as_bytes())
            .unwrap();
        assert!(part.units.is_empty());
        assert_eq!(part.block_count(), 0);
        let written = PartWriter::new(&skipped).write(&part, &part.units).unwrap();
        assert_eq!(written, comments.as_bytes());

        // other parts are unaffected
        let part = PartExtractor::new(&styles, &skipped)
            .extract("word/document.xml", comments.as_bytes())
            .unwrap();
        assert_eq!(part.units.len(), 1);
    }

    #[test]
    fn test_malformed_part_fails() {
        let styles = StyleHierarchy::new();
        let options = ExtractionOptions::default();
        let result = PartExtractor::new(&styles, &options).extract("word/document.xml", b"<w:body><w:p><w:r></w:p></w:body>");
        assert!(result.is_err());
    }
}
