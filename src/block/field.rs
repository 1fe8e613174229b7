/// Complex field folding.
///
/// A complex field spans several sibling runs:
///
/// ```text
/// begin [instruction runs] separate [result runs] end
/// ```
///
/// The runs up to and including `separate` form the field head and the run
/// holding `end` forms its tail. Heads and tails never carry translatable text.
/// Fields whose instruction keyword is whitelisted become a
/// [`ContainerKind::ComplexField`] container around their result; all other
/// fields keep their result runs inline between head and tail markup. Fields
/// without a result collapse into a single markup chunk.
use crate::block::{Chunk, FieldMark, Markup, MarkupKind, RunContainer};
use crate::classify::{ContainerKind, FieldCharType};
use crate::options::ExtractionOptions;

#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldSpan {
    begin: usize,
    separate: Option<usize>,
    end: usize,
    instruction: String,
}

impl FieldSpan {
    /// First word of the instruction, e.g. `HYPERLINK` or `PAGE`.
    fn keyword(&self) -> &str {
        self.instruction.split_whitespace().next().unwrap_or_default()
    }
}

fn starts_field(chunk: &Chunk) -> bool {
    match chunk {
        Chunk::Run(run) => {
            !run.has_text()
                && run
                    .field_marks()
                    .first()
                    .is_some_and(|mark| *mark == FieldMark::Char(FieldCharType::Begin))
        },
        _ => false,
    }
}

/// Finds the well-formed field starting at `begin`.
fn scan_field(chunks: &[Chunk], begin: usize) -> Option<FieldSpan> {
    let mut depth = 0usize;
    let mut separate = None;
    let mut instruction = String::new();

    for (index, chunk) in chunks.iter().enumerate().skip(begin) {
        match chunk {
            Chunk::Run(run) => {
                let in_head = separate.is_none();
                let mut closes_here = false;
                for mark in run.field_marks() {
                    if closes_here {
                        // Marks after the outermost end belong to another field.
                        return None;
                    }
                    match mark {
                        FieldMark::Char(FieldCharType::Begin) => depth += 1,
                        FieldMark::Char(FieldCharType::Separate) if depth == 1 => {
                            if separate.is_some() {
                                return None;
                            }
                            separate = Some(index);
                        },
                        FieldMark::Char(FieldCharType::Separate) => {},
                        FieldMark::Char(FieldCharType::End) => {
                            depth = depth.checked_sub(1)?;
                            closes_here = depth == 0;
                        },
                        FieldMark::Instruction(text) if depth == 1 && separate.is_none() => {
                            instruction.push_str(&text)
                        },
                        FieldMark::Instruction(_) => {},
                    }
                }
                let separates_here = separate == Some(index);
                if run.has_text() && (in_head || separates_here || closes_here) {
                    return None;
                }
                if closes_here {
                    return Some(FieldSpan {
                        begin,
                        separate,
                        end: index,
                        instruction,
                    });
                }
            },
            Chunk::Markup(_) => {},
            Chunk::Container(_) if separate.is_some() => {},
            Chunk::Container(_) | Chunk::Text(_) | Chunk::BlockProperties(_) => return None,
        }
    }
    None
}

fn find_spans(chunks: &[Chunk]) -> Vec<FieldSpan> {
    let mut spans = Vec::new();
    let mut index = 0;
    while index < chunks.len() {
        if starts_field(&chunks[index]) {
            if let Some(span) = scan_field(chunks, index) {
                index = span.end + 1;
                spans.push(span);
                continue;
            }
            log::warn!("Unterminated or malformed complex field; keeping its runs as plain runs");
        }
        index += 1;
    }
    spans
}

fn into_markup(chunks: impl IntoIterator<Item = Chunk>) -> Markup {
    let mut markup = Markup::new(MarkupKind::Field);
    for chunk in chunks {
        markup.push_events(chunk.events());
    }
    markup
}

fn build_field(chunks: Vec<Chunk>, span: &FieldSpan, options: &ExtractionOptions) -> Vec<Chunk> {
    let last = chunks.len() - 1;
    let separate = match span.separate {
        Some(separate) if separate - span.begin < last => separate - span.begin,
        _ => return vec![Chunk::Markup(into_markup(chunks))],
    };

    let mut chunks = chunks;
    let tail = chunks.split_off(last);
    let result = chunks.split_off(separate + 1);
    let head = into_markup(chunks);
    let tail = into_markup(tail);
    let result = fold_complex_fields(result, options);

    if options.is_translatable_field(span.keyword()) {
        vec![Chunk::Container(RunContainer::new(
            ContainerKind::ComplexField,
            head,
            result,
            tail,
        ))]
    } else {
        if span.keyword().is_empty() {
            log::debug!("Complex field without an instruction keyword");
        }
        let mut out = Vec::with_capacity(result.len() + 2);
        out.push(Chunk::Markup(head));
        out.extend(result);
        out.push(Chunk::Markup(tail));
        out
    }
}

/// Folds well-formed complex fields among sibling chunks.
///
/// Malformed or unterminated fields are left as plain runs whose field
/// characters stay run-level markup.
pub(crate) fn fold_complex_fields(chunks: Vec<Chunk>, options: &ExtractionOptions) -> Vec<Chunk> {
    let spans = find_spans(&chunks);
    if spans.is_empty() {
        return chunks;
    }

    let mut out = Vec::with_capacity(chunks.len());
    let mut spans = spans.into_iter().peekable();
    let mut iter = chunks.into_iter().enumerate();
    while let Some((index, chunk)) = iter.next() {
        match spans.next_if(|span| span.begin == index) {
            Some(span) => {
                let mut field = Vec::with_capacity(span.end - span.begin + 1);
                field.push(chunk);
                field.extend(iter.by_ref().take(span.end - span.begin).map(|(_, c)| c));
                out.extend(build_field(field, &span, options));
            },
            None => out.push(chunk),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, BlockParser};
    use crate::styles::StyleHierarchy;
    use crate::xml::{EventCursor, read_events};

    fn parse(xml: &str, options: &ExtractionOptions) -> Block {
        let events = read_events(xml.as_bytes()).unwrap();
        let styles = StyleHierarchy::new();
        BlockParser::new(&styles, options)
            .parse(&mut EventCursor::new("word/document.xml", &events))
            .unwrap()
    }

    fn field(instruction: &str, result: &str) -> String {
        format!(
            r#"<w:p><w:r><w:t xml:space="preserve">See </w:t></w:r><w:r><w:fldChar w:fldCharType="begin"/></w:r><w:r><w:instrText xml:space="preserve"> {instruction} </w:instrText></w:r><w:r><w:fldChar w:fldCharType="separate"/></w:r><w:r><w:t>{result}</w:t></w:r><w:r><w:fldChar w:fldCharType="end"/></w:r><w:r><w:t>.</w:t></w:r></w:p>"#
        )
    }

    #[test]
    fn test_whitelisted_field_becomes_container() {
        let xml = field(r#"HYPERLINK "https://example.com""#, "example");
        let block = parse(&xml, &ExtractionOptions::default());
        let containers: Vec<&RunContainer> = block
            .chunks()
            .iter()
            .filter_map(|c| match c {
                Chunk::Container(c) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].kind(), ContainerKind::ComplexField);
        assert_eq!(containers[0].chunks().len(), 1);
        assert_eq!(block.plain_text(), "See example.");
        assert_eq!(block.events(), read_events(xml.as_bytes()).unwrap());
    }

    #[test]
    fn test_other_fields_keep_result_inline() {
        let xml = field("PAGE", "3");
        let block = parse(&xml, &ExtractionOptions::default());
        let field_markups = block
            .chunks()
            .iter()
            .filter(|c| matches!(c, Chunk::Markup(m) if m.kind() == MarkupKind::Field))
            .count();
        assert_eq!(field_markups, 2);
        assert!(!block.chunks().iter().any(|c| matches!(c, Chunk::Container(_))));
        assert_eq!(block.plain_text(), "See 3.");
        assert!(!block.plain_text().contains("PAGE"));
    }

    #[test]
    fn test_field_without_result_is_one_markup() {
        let xml = r#"<w:p><w:r><w:fldChar w:fldCharType="begin"/></w:r><w:r><w:instrText>TOC</w:instrText></w:r><w:r><w:fldChar w:fldCharType="end"/></w:r></w:p>"#;
        let block = parse(xml, &ExtractionOptions::default());
        assert_eq!(block.chunks().len(), 3);
        assert!(matches!(&block.chunks()[1], Chunk::Markup(m) if m.kind() == MarkupKind::Field));
    }

    #[test]
    fn test_unterminated_field_degrades() {
        let xml = r#"<w:p><w:r><w:fldChar w:fldCharType="begin"/></w:r><w:r><w:instrText>PAGE</w:instrText></w:r><w:r><w:t>text</w:t></w:r></w:p>"#;
        let block = parse(xml, &ExtractionOptions::default());
        assert_eq!(
            block.chunks().iter().filter(|c| matches!(c, Chunk::Run(_))).count(),
            3
        );
        assert_eq!(block.events(), read_events(xml.as_bytes()).unwrap());
    }

    #[test]
    fn test_nested_field_in_result() {
        let xml = r#"<w:p><w:r><w:fldChar w:fldCharType="begin"/></w:r><w:r><w:instrText>HYPERLINK "x"</w:instrText></w:r><w:r><w:fldChar w:fldCharType="separate"/></w:r><w:r><w:t>Page </w:t></w:r><w:r><w:fldChar w:fldCharType="begin"/></w:r><w:r><w:instrText>PAGE</w:instrText></w:r><w:r><w:fldChar w:fldCharType="separate"/></w:r><w:r><w:t>2</w:t></w:r><w:r><w:fldChar w:fldCharType="end"/></w:r><w:r><w:fldChar w:fldCharType="end"/></w:r></w:p>"#;
        let block = parse(xml, &ExtractionOptions::default());
        let Chunk::Container(container) = &block.chunks()[1] else {
            panic!("expected a field container");
        };
        assert_eq!(container.chunks().len(), 4);
        assert_eq!(block.plain_text(), "Page 2");
    }

    #[test]
    fn test_keyword() {
        let span = FieldSpan {
            begin: 0,
            separate: None,
            end: 0,
            instruction: "  HYPERLINK \\l \"top\"".to_string(),
        };
        assert_eq!(span.keyword(), "HYPERLINK");
    }
}
