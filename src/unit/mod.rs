//! Translation units.
//!
//! A [`TranslationUnit`] is the translatable projection of a block: coded
//! text plus a [`CodeTable`] that remembers where every code came from, so
//! the block can be regenerated around translated text.

pub mod coded_text;

pub use coded_text::{CodedText, Fragment};

use crate::block::{Chunk, Markup};
use crate::classify::ContainerKind;
use crate::styles::RunProperties;
use std::collections::BTreeMap;

/// Role of a code marker in coded text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagType {
    Opening,
    Closing,
    Placeholder,
}

/// Label class of a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeClass {
    Run,
    Hyperlink,
    Sdt,
    SmartTag,
    Tags,
}

impl CodeClass {
    /// The marker label, e.g. `run` in `<run1>`.
    pub fn label(self) -> &'static str {
        match self {
            CodeClass::Run => "run",
            CodeClass::Hyperlink => "hyperlink",
            CodeClass::Sdt => "sdt",
            CodeClass::SmartTag => "smartTag",
            CodeClass::Tags => "tags",
        }
    }

    pub fn for_container(kind: ContainerKind) -> Self {
        match kind {
            ContainerKind::Hyperlink => CodeClass::Hyperlink,
            ContainerKind::StructuredDocumentTag => CodeClass::Sdt,
            ContainerKind::SmartTag => CodeClass::SmartTag,
            ContainerKind::BidiOverride | ContainerKind::ComplexField | ContainerKind::MovedRange => {
                CodeClass::Tags
            },
        }
    }
}

/// Whether a code appears as an opening/closing pair or alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeShape {
    Paired,
    Placeholder,
}

/// What a code stands for when the block is regenerated.
#[derive(Debug, Clone, PartialEq)]
pub enum CodeOrigin {
    /// Formatting of the text between an opening and closing run code.
    Formatting(RunProperties),
    /// A container whose start and end markup wrap the coded content.
    Container {
        kind: ContainerKind,
        start: Markup,
        end: Markup,
        /// Formatting of text inside the container when no run code is open.
        default_properties: Option<RunProperties>,
    },
    /// Markup written inside the surrounding text run.
    RunMarkup(Markup),
    /// A chunk replayed as-is between text runs.
    Skeleton(Chunk),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Code {
    id: u32,
    shape: CodeShape,
    class: CodeClass,
    origin: CodeOrigin,
}

impl Code {
    pub fn new(id: u32, shape: CodeShape, class: CodeClass, origin: CodeOrigin) -> Self {
        Self {
            id,
            shape,
            class,
            origin,
        }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn shape(&self) -> CodeShape {
        self.shape
    }

    #[inline]
    pub fn class(&self) -> CodeClass {
        self.class
    }

    #[inline]
    pub fn origin(&self) -> &CodeOrigin {
        &self.origin
    }
}

/// Codes of one unit by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeTable {
    codes: BTreeMap<u32, Code>,
}

impl CodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: Code) {
        self.codes.insert(code.id, code);
    }

    pub fn get(&self, id: u32) -> Option<&Code> {
        self.codes.get(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Code> {
        self.codes.values()
    }
}

/// One translatable segment of a part.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationUnit {
    id: String,
    source: CodedText,
    target: Option<CodedText>,
    codes: CodeTable,
    is_referent: bool,
}

impl TranslationUnit {
    pub fn new(id: impl Into<String>, source: CodedText, codes: CodeTable) -> Self {
        Self {
            id: id.into(),
            source,
            target: None,
            codes,
            is_referent: false,
        }
    }

    /// Marks the unit as referenced from another unit's placeholder.
    pub fn with_referent(mut self, is_referent: bool) -> Self {
        self.is_referent = is_referent;
        self
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn source(&self) -> &CodedText {
        &self.source
    }

    #[inline]
    pub fn target(&self) -> Option<&CodedText> {
        self.target.as_ref()
    }

    pub fn set_target(&mut self, target: CodedText) {
        self.target = Some(target);
    }

    /// The target when translated, else the source.
    pub fn content(&self) -> &CodedText {
        self.target.as_ref().unwrap_or(&self.source)
    }

    #[inline]
    pub fn codes(&self) -> &CodeTable {
        &self.codes
    }

    #[inline]
    pub fn is_referent(&self) -> bool {
        self.is_referent
    }

    /// Source coded text in marker syntax.
    pub fn render_source(&self) -> String {
        self.source.render(&self.codes)
    }
}
