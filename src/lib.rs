//! Weft - Paragraph and run engine for translating Office Open XML content
//!
//! This library turns the paragraphs of WordprocessingML, DrawingML and
//! SpreadsheetML parts into translation units, and writes translated units
//! back into the part without losing formatting or markup.
//!
//! # Features
//!
//! - **Block Parser**: Parse `w:p`, `a:p`, `si` and `is` paragraphs into runs, containers and markup
//! - **Style Hierarchy**: Resolve run properties through paragraph and character styles
//! - **Run Merging**: Merge adjacent runs whose effective formatting is the same
//! - **Text Units**: Map a paragraph to coded text with balanced `<runN>` markers
//! - **Write-back**: Regenerate paragraphs from translated units, with font and direction adjustments
//! - **Parallel parts**: Extract independent parts in parallel (`parallel` feature)
//!
//! # Example - Extracting and translating a part
//!
//! ```
//! use weft::{CodedText, ExtractionOptions, PartExtractor, PartWriter, StyleHierarchy};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let styles = StyleHierarchy::new();
//! let options = ExtractionOptions::default();
//! let xml = br#"<w:body><w:p><w:r><w:t xml:space="preserve">Some </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>bold</w:t></w:r><w:r><w:t xml:space="preserve"> text</w:t></w:r></w:p></w:body>"#;
//!
//! let mut part = PartExtractor::new(&styles, &options).extract("word/document.xml", xml)?;
//! assert_eq!(part.units[0].render_source(), "Some <run1>bold</run1> text");
//!
//! // Translate the coded text, keeping its markers
//! part.units[0].set_target(CodedText::parse("Du texte <run1>gras</run1>")?);
//! let translated = PartWriter::new(&options).write(&part, &part.units)?;
//! println!("{}", String::from_utf8(translated)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Simplifying paragraphs in place
//!
//! ```
//! use weft::{ExtractionOptions, ParagraphSimplifier, StyleHierarchy};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let styles = StyleHierarchy::new();
//! let options = ExtractionOptions::default();
//! let simplifier = ParagraphSimplifier::new(&styles, &options);
//!
//! let xml = br#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">Split </w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>run</w:t></w:r></w:p>"#;
//! let simplified = simplifier.simplify("word/document.xml", xml)?;
//! assert_eq!(
//!     simplified,
//!     br#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">Split run</w:t></w:r></w:p>"#
//! );
//! # Ok(())
//! # }
//! ```

/// Paragraph blocks and their parser
///
/// A block is an ordered list of chunks: markup, paragraph properties, runs,
/// bare text and run containers such as hyperlinks.
pub mod block;

/// Element classification for the WordprocessingML, DrawingML and SpreadsheetML vocabularies
pub mod classify;

pub mod error;

/// Mapping of blocks to translation units
pub mod mapper;

pub mod options;

/// Part-level extraction and write-back
pub mod pipeline;

pub mod simplify;

/// Run property sets, the style hierarchy and style optimizers
pub mod styles;

/// Translation units, code tables and coded text
pub mod unit;

/// Regeneration of blocks from skeletons and units
pub mod writer;

/// Owned XML events with a reader, writer and cursor
pub mod xml;

// Re-export commonly used types for convenience
pub use block::{Block, BlockParser, Chunk};
pub use error::{Result, WeftError};
pub use mapper::{BlockSkeleton, IdCounter, MappedBlock, TextUnitMapper};
pub use options::{ExtractionOptions, FontMapping};
pub use pipeline::{ExtractedPart, PartExtractor, PartItem, PartWriter, extract_parts};
pub use simplify::ParagraphSimplifier;
pub use styles::{StyleHierarchy, StyleOptimizer};
pub use unit::{CodedText, TranslationUnit};
pub use writer::{SkeletonWriter, UnitIndex};
