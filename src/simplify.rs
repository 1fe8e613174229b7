//! Whole-part paragraph simplification.
//!
//! [`ParagraphSimplifier`] walks every event of a part. Paragraphs are parsed
//! into blocks, optimised and written back; everything else passes through,
//! except that section properties and table rows lose their revision-session
//! identifiers.

use crate::block::BlockParser;
use crate::classify;
use crate::error::Result;
use crate::options::ExtractionOptions;
use crate::styles::{StyleHierarchy, StyleOptimizer, optimizer_for};
use crate::xml::{EventCursor, XmlEvent, read_events, write_events};

/// Revision identifiers stripped from `w:sectPr`.
const SECTION_REVISION_ATTRIBUTES: [&str; 4] = ["rsidRPr", "rsidDel", "rsidR", "rsidSect"];

/// Revision identifiers stripped from `w:tr`.
const ROW_REVISION_ATTRIBUTES: [&str; 4] = ["rsidRPr", "rsidDel", "rsidR", "rsidTr"];

/// Parses, optimises and re-emits all paragraphs of a part.
#[derive(Debug)]
pub struct ParagraphSimplifier<'a> {
    parser: BlockParser<'a>,
    optimizer: Box<dyn StyleOptimizer + 'a>,
}

impl<'a> ParagraphSimplifier<'a> {
    pub fn new(styles: &'a StyleHierarchy, options: &'a ExtractionOptions) -> Self {
        Self {
            parser: BlockParser::new(styles, options),
            optimizer: optimizer_for(options, styles),
        }
    }

    /// Simplifies a part given as raw XML.
    pub fn simplify(&self, part: &str, xml: &[u8]) -> Result<Vec<u8>> {
        let events = read_events(xml)?;
        write_events(&self.simplify_events(part, &events)?)
    }

    /// Simplifies a part given as events.
    pub fn simplify_events(&self, part: &str, events: &[XmlEvent]) -> Result<Vec<XmlEvent>> {
        let mut cursor = EventCursor::new(part, events);
        let mut out = Vec::with_capacity(events.len());
        while let Some(event) = cursor.next() {
            match event {
                XmlEvent::Start(tag) if classify::is_paragraph(tag) => {
                    let mut block = self.parser.parse_from(&mut cursor, tag)?;
                    block.optimize(self.optimizer.as_ref());
                    block.write_events(&mut out);
                },
                other => out.push(without_revision_ids(other)),
            }
        }
        Ok(out)
    }
}

/// A copy of an event outside paragraphs, without the revision-session
/// identifiers of section properties and table rows.
pub(crate) fn without_revision_ids(event: &XmlEvent) -> XmlEvent {
    let names: &[&str] = match event {
        XmlEvent::Start(tag) if classify::is_section_properties(tag) => &SECTION_REVISION_ATTRIBUTES,
        XmlEvent::Start(tag) if classify::is_table_row(tag) => &ROW_REVISION_ATTRIBUTES,
        other => return other.clone(),
    };
    let mut event = event.clone();
    if let XmlEvent::Start(tag) = &mut event {
        tag.remove_attributes(|attr| names.contains(&attr.local_name()));
    }
    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles::{PropertySet, Provenance, StyleDefinition, StyleKind};
    use crate::xml::structurally_equal;

    fn simplify(xml: &str, styles: &StyleHierarchy, options: &ExtractionOptions) -> String {
        let simplifier = ParagraphSimplifier::new(styles, options);
        String::from_utf8(simplifier.simplify("word/document.xml", xml.as_bytes()).unwrap()).unwrap()
    }

    #[test]
    fn test_nothing_to_merge_is_identity() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t>Bold</w:t></w:r><w:r><w:t xml:space="preserve"> plain</w:t></w:r></w:p>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
</w:body></w:document>"#;
        let styles = StyleHierarchy::new();
        let output = simplify(xml, &styles, &ExtractionOptions::default());
        let expected = read_events(xml.as_bytes()).unwrap();
        let actual = read_events(output.as_bytes()).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_revision_ids_stripped_outside_paragraphs() {
        let xml = r#"<w:body><w:tbl><w:tr w:rsidR="001" w:rsidTr="002" w:rsidRPr="003"><w:tc><w:p/></w:tc></w:tr></w:tbl><w:sectPr w:rsidR="004" w:rsidSect="005" w:rsidDel="006"><w:pgSz w:w="12240"/></w:sectPr></w:body>"#;
        let styles = StyleHierarchy::new();
        let output = simplify(xml, &styles, &ExtractionOptions::default());
        assert_eq!(
            output,
            r#"<w:body><w:tbl><w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl><w:sectPr><w:pgSz w:w="12240"/></w:sectPr></w:body>"#
        );
    }

    #[test]
    fn test_equivalent_run_styles_merged() {
        let rpr = |xml: &str| PropertySet::from_events(&read_events(xml.as_bytes()).unwrap(), Provenance::Direct);
        let styles = StyleHierarchy::builder()
            .with_style(
                StyleDefinition::new("RunStyle1", StyleKind::Character)
                    .with_run_properties(rpr(r#"<w:rPr><w:rFonts w:ascii="Arial"/><w:b/><w:color w:val="FF0000"/></w:rPr>"#)),
            )
            .with_style(
                StyleDefinition::new("RunStyle2", StyleKind::Character)
                    .with_run_properties(rpr(r#"<w:rPr><w:b/><w:rFonts w:ascii="Arial"/><w:color w:val="FF0000"/></w:rPr>"#)),
            )
            .build();
        let xml = r#"<w:body><w:p><w:r><w:rPr><w:rStyle w:val="RunStyle1"/></w:rPr><w:t xml:space="preserve">Red </w:t></w:r><w:r><w:rPr><w:rStyle w:val="RunStyle2"/></w:rPr><w:t>text</w:t></w:r></w:p></w:body>"#;
        let output = simplify(xml, &styles, &ExtractionOptions::default());
        assert_eq!(
            output,
            r#"<w:body><w:p><w:r><w:rPr><w:rStyle w:val="RunStyle1"/></w:rPr><w:t xml:space="preserve">Red text</w:t></w:r></w:p></w:body>"#
        );

        let bypass = ExtractionOptions::default().with_optimise_styles(false);
        let unchanged = simplify(xml, &styles, &bypass);
        assert!(structurally_equal(
            &read_events(unchanged.as_bytes()).unwrap(),
            &read_events(xml.as_bytes()).unwrap()
        ));
    }

    #[test]
    fn test_simplification_is_idempotent() {
        let xml = r#"<w:body><w:p><w:r w:rsidR="00A"><w:t>Hel</w:t></w:r><w:proofErr w:type="spellStart"/><w:r w:rsidR="00B"><w:t>lo</w:t></w:r><w:r><w:rPr><w:i/></w:rPr><w:t xml:space="preserve"> there</w:t></w:r></w:p></w:body>"#;
        let styles = StyleHierarchy::new();
        let options = ExtractionOptions::default();
        let once = simplify(xml, &styles, &options);
        let twice = simplify(&once, &styles, &options);
        assert_eq!(once, twice);
        assert!(once.contains("<w:t>Hello</w:t>"));
    }

    #[test]
    fn test_structural_error_is_reported() {
        let xml = r#"<w:body><w:p><w:r><w:t>x</w:t></w:r></w:body>"#;
        let styles = StyleHierarchy::new();
        let options = ExtractionOptions::default();
        let simplifier = ParagraphSimplifier::new(&styles, &options);
        assert!(simplifier.simplify("word/document.xml", xml.as_bytes()).is_err());
    }
}
