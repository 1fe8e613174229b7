//! Element classification for WordprocessingML, DrawingML and SpreadsheetML
//! paragraph content.
//!
//! All predicates work on qualified names as they appear in the part. The
//! prefixes are the conventional ones (`w`, `a`, `x` or none); parts that bind
//! the same namespaces to other prefixes are not recognised.

use crate::xml::{StartTag, XmlEvent};
use phf::phf_set;

/// Prefixes under which paragraph and run elements are recognised.
static CONTENT_PREFIXES: phf::Set<&'static str> = phf_set! { "w", "a", "x", "" };

/// Run-level elements that carry no content and never influence rendering.
static INERT_ELEMENTS: phf::Set<&'static str> = phf_set! {
    "proofErr",
    "lastRenderedPageBreak",
};

/// Range markers that may sit between runs without affecting them.
static RANGE_MARKERS: phf::Set<&'static str> = phf_set! {
    "bookmarkStart",
    "bookmarkEnd",
    "commentRangeStart",
    "commentRangeEnd",
    "moveFromRangeStart",
    "moveFromRangeEnd",
    "moveToRangeStart",
    "moveToRangeEnd",
    "permStart",
    "permEnd",
};

/// Properties whose value is a boolean toggle (`<w:b/>`, `<w:b w:val="0"/>`, `b="1"`).
pub(crate) static TOGGLE_PROPERTIES: phf::Set<&'static str> = phf_set! {
    "b", "bCs", "i", "iCs", "caps", "smallCaps", "strike", "dstrike",
    "outline", "shadow", "emboss", "imprint", "noProof", "snapToGrid",
    "vanish", "webHidden", "specVanish", "rtl", "cs", "oMath",
    "kumimoji", "normalizeH", "dirty", "err", "smtClean",
};

/// The structural role of a paragraph's nested wrapper element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Hyperlink,
    SmartTag,
    StructuredDocumentTag,
    /// `w:dir` / `w:bdo` bidirectional embedding and override.
    BidiOverride,
    /// A complex field whose instruction keyword is translatable.
    ComplexField,
    /// `w:moveFrom` / `w:moveTo` kept as wrappers when revisions are not accepted.
    MovedRange,
}

/// Tracked-change wrapper elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RevisionKind {
    Insert,
    Delete,
    MoveTo,
    MoveFrom,
}

impl RevisionKind {
    /// Whether accepting the revision removes its content.
    pub fn removes_content(self) -> bool {
        matches!(self, RevisionKind::Delete | RevisionKind::MoveFrom)
    }
}

/// The value of `w:fldChar/@w:fldCharType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldCharType {
    Begin,
    Separate,
    End,
}

#[inline]
fn is(tag: &StartTag, local: &str) -> bool {
    tag.local_name() == local
}

#[inline]
fn is_word(tag: &StartTag, local: &str) -> bool {
    tag.prefix() == "w" && tag.local_name() == local
}

#[inline]
fn in_content_vocabulary(prefix: &str) -> bool {
    CONTENT_PREFIXES.contains(prefix)
}

/// `w:p`, `a:p`, `si` or `is`.
pub fn is_paragraph(tag: &StartTag) -> bool {
    match tag.local_name() {
        "p" => matches!(tag.prefix(), "w" | "a"),
        "si" | "is" => matches!(tag.prefix(), "" | "x"),
        _ => false,
    }
}

pub fn is_paragraph_start(event: &XmlEvent) -> bool {
    event.as_start().is_some_and(is_paragraph)
}

/// `w:pPr` or `a:pPr`.
pub fn is_paragraph_properties(tag: &StartTag) -> bool {
    is(tag, "pPr") && matches!(tag.prefix(), "w" | "a")
}

/// A text run. Math runs (`m:r`) are deliberately excluded.
pub fn is_run(tag: &StartTag) -> bool {
    is(tag, "r") && in_content_vocabulary(tag.prefix())
}

/// Math runs share the local name of text runs but are never merged or mapped as runs.
pub fn is_math_run(tag: &StartTag) -> bool {
    is(tag, "r") && tag.prefix() == "m"
}

pub fn is_run_properties(tag: &StartTag) -> bool {
    is(tag, "rPr") && in_content_vocabulary(tag.prefix())
}

/// `w:t`, `a:t` or SpreadsheetML `t`.
pub fn is_text(tag: &StartTag) -> bool {
    is(tag, "t") && in_content_vocabulary(tag.prefix())
}

pub fn is_tab(tag: &StartTag) -> bool {
    is_word(tag, "tab")
}

pub fn is_break(tag: &StartTag) -> bool {
    is_word(tag, "br")
}

/// A `w:br` that starts a new page or column rather than a new line.
pub fn is_page_break(tag: &StartTag) -> bool {
    is_break(tag) && matches!(tag.attribute("type"), Some("page" | "column"))
}

pub fn is_carriage_return(tag: &StartTag) -> bool {
    is_word(tag, "cr")
}

pub fn is_no_break_hyphen(tag: &StartTag) -> bool {
    is_word(tag, "noBreakHyphen")
}

pub fn is_soft_hyphen(tag: &StartTag) -> bool {
    is_word(tag, "softHyphen")
}

pub fn field_char_type(tag: &StartTag) -> Option<FieldCharType> {
    if !is_word(tag, "fldChar") {
        return None;
    }
    match tag.attribute("fldCharType")? {
        "begin" => Some(FieldCharType::Begin),
        "separate" => Some(FieldCharType::Separate),
        "end" => Some(FieldCharType::End),
        _ => None,
    }
}

pub fn is_field_instruction(tag: &StartTag) -> bool {
    is_word(tag, "instrText")
}

pub fn is_simple_field(tag: &StartTag) -> bool {
    is_word(tag, "fldSimple")
}

/// Maps wrapper elements that hold runs to their container kind.
pub fn container_kind(tag: &StartTag) -> Option<ContainerKind> {
    if tag.prefix() != "w" {
        return None;
    }
    match tag.local_name() {
        "hyperlink" => Some(ContainerKind::Hyperlink),
        "smartTag" | "customXml" => Some(ContainerKind::SmartTag),
        "sdt" => Some(ContainerKind::StructuredDocumentTag),
        "dir" | "bdo" => Some(ContainerKind::BidiOverride),
        _ => None,
    }
}

/// `w:sdtPr`, `w:sdtEndPr`, `w:smartTagPr` and `w:customXmlPr`.
pub fn is_container_properties(tag: &StartTag) -> bool {
    tag.prefix() == "w"
        && matches!(
            tag.local_name(),
            "sdtPr" | "sdtEndPr" | "smartTagPr" | "customXmlPr"
        )
}

pub fn is_container_content(tag: &StartTag) -> bool {
    is_word(tag, "sdtContent")
}

pub fn revision_kind(tag: &StartTag) -> Option<RevisionKind> {
    if tag.prefix() != "w" {
        return None;
    }
    match tag.local_name() {
        "ins" => Some(RevisionKind::Insert),
        "del" => Some(RevisionKind::Delete),
        "moveTo" => Some(RevisionKind::MoveTo),
        "moveFrom" => Some(RevisionKind::MoveFrom),
        _ => None,
    }
}

/// `w:rPrChange` and `w:pPrChange`.
pub fn is_property_change(tag: &StartTag) -> bool {
    tag.prefix() == "w" && matches!(tag.local_name(), "rPrChange" | "pPrChange")
}

/// Elements that may sit between two runs without preventing their merge.
pub fn is_inert(tag: &StartTag) -> bool {
    tag.prefix() == "w" && INERT_ELEMENTS.contains(tag.local_name())
}

pub fn is_range_marker(tag: &StartTag) -> bool {
    tag.prefix() == "w" && RANGE_MARKERS.contains(tag.local_name())
}

pub fn is_section_properties(tag: &StartTag) -> bool {
    is_word(tag, "sectPr")
}

pub fn is_table_row(tag: &StartTag) -> bool {
    is_word(tag, "tr")
}

/// DrawingML non-visual drawing properties carrying a translatable `name`.
pub fn is_graphics_properties(tag: &StartTag) -> bool {
    is(tag, "docPr") && tag.prefix() == "wp"
}

/// VML text path carrying a translatable `string`.
pub fn is_text_path(tag: &StartTag) -> bool {
    is(tag, "textpath") && tag.prefix() == "v"
}

/// DrawingML end-of-paragraph run properties.
pub fn is_end_paragraph_properties(tag: &StartTag) -> bool {
    is(tag, "endParaRPr") && tag.prefix() == "a"
}

/// Whether a part holds review comments: `word/comments.xml`,
/// `ppt/comments/comment1.xml`, `xl/comments1.xml` and their extended forms.
pub fn is_comment_part(name: &str) -> bool {
    let file = name.rsplit('/').next().unwrap_or(name);
    file.starts_with("comment") || name.split('/').any(|segment| segment == "comments")
}

/// Whether `xml:space="preserve"` is set.
pub fn preserves_space(tag: &StartTag) -> bool {
    tag.qualified_attribute("xml:space") == Some("preserve")
}

/// Parses an OOXML boolean (`true`/`1`/`on`, `false`/`0`/`off`).
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "1" | "on" => Some(true),
        "false" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Whether text must be marked `xml:space="preserve"` to survive a round trip.
pub fn needs_preserve(text: &str) -> bool {
    let starts = text.chars().next().is_some_and(char::is_whitespace);
    let ends = text.chars().next_back().is_some_and(char::is_whitespace);
    starts || ends || text.contains("  ") || text.contains(['\t', '\n', '\r'])
}
