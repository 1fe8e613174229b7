/// Coded text: plain text interleaved with inline code markers.
///
/// The textual form uses `<labelN>` for opening codes, `</labelN>` for
/// closing codes and `<labelN/>` for placeholders. Literal `&`, `<` and `>`
/// in the text are written as `&amp;`, `&lt;` and `&gt;`.
use crate::error::{Result, WeftError};
use crate::unit::{CodeClass, CodeTable, TagType};
use aho_corasick::{AhoCorasick, MatchKind};
use once_cell::sync::Lazy;
use regex::Regex;

static TEXT_ESCAPER: Lazy<Option<AhoCorasick>> = Lazy::new(|| AhoCorasick::new(["&", "<", ">"]).ok());

static TEXT_UNESCAPER: Lazy<Option<AhoCorasick>> = Lazy::new(|| {
    AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostLongest)
        .build(["&amp;", "&lt;", "&gt;"])
        .ok()
});

static MARKER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"<(/?)(run|hyperlink|sdt|smartTag|tags)([0-9]+)(/?)>").ok());

fn escape(text: &str) -> String {
    match TEXT_ESCAPER.as_ref() {
        Some(escaper) => escaper.replace_all(text, &["&amp;", "&lt;", "&gt;"]),
        None => text.to_string(),
    }
}

fn unescape(text: &str) -> String {
    match TEXT_UNESCAPER.as_ref() {
        Some(unescaper) => unescaper.replace_all(text, &["&", "<", ">"]),
        None => text.to_string(),
    }
}

/// One piece of coded text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    Code { id: u32, tag_type: TagType },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodedText {
    fragments: Vec<Fragment>,
}

impl CodedText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coded text holding only `text`.
    pub fn from_text(text: impl Into<String>) -> Self {
        let mut coded = Self::new();
        coded.push_text(&text.into());
        coded
    }

    #[inline]
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Appends text, joining it with preceding text.
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Fragment::Text(last)) = self.fragments.last_mut() {
            last.push_str(text);
        } else {
            self.fragments.push(Fragment::Text(text.to_string()));
        }
    }

    pub fn push_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.push_text(c.encode_utf8(&mut buf));
    }

    pub fn push_code(&mut self, id: u32, tag_type: TagType) {
        self.fragments.push(Fragment::Code { id, tag_type });
    }

    /// The text without codes.
    pub fn plain_text(&self) -> String {
        self.fragments
            .iter()
            .filter_map(|f| match f {
                Fragment::Text(text) => Some(text.as_str()),
                Fragment::Code { .. } => None,
            })
            .collect()
    }

    /// Whether any text other than whitespace is present.
    pub fn has_text(&self) -> bool {
        self.fragments.iter().any(|f| match f {
            Fragment::Text(text) => !text.trim().is_empty(),
            Fragment::Code { .. } => false,
        })
    }

    /// Ids of codes in order of appearance, one entry per marker.
    pub fn code_markers(&self) -> impl Iterator<Item = (u32, TagType)> + '_ {
        self.fragments.iter().filter_map(|f| match f {
            Fragment::Code { id, tag_type } => Some((*id, *tag_type)),
            Fragment::Text(_) => None,
        })
    }

    /// Renders the textual form, labelling each code by its class in `codes`.
    /// Codes missing from the table are labelled `tags`.
    pub fn render(&self, codes: &CodeTable) -> String {
        let mut out = String::new();
        let mut ids = itoa::Buffer::new();
        for fragment in &self.fragments {
            match fragment {
                Fragment::Text(text) => out.push_str(&escape(text)),
                Fragment::Code { id, tag_type } => {
                    let label = codes.get(*id).map_or(CodeClass::Tags, |code| code.class()).label();
                    out.push('<');
                    if *tag_type == TagType::Closing {
                        out.push('/');
                    }
                    out.push_str(label);
                    out.push_str(ids.format(*id));
                    if *tag_type == TagType::Placeholder {
                        out.push('/');
                    }
                    out.push('>');
                },
            }
        }
        out
    }

    /// Parses the textual form. Code labels are not checked against a table.
    pub fn parse(input: &str) -> Result<Self> {
        let marker = MARKER
            .as_ref()
            .ok_or_else(|| WeftError::InvalidCodedText("marker pattern unavailable".to_string()))?;
        let mut coded = Self::new();
        let mut last = 0;
        for captures in marker.captures_iter(input) {
            let Some(whole) = captures.get(0) else { continue };
            let text = &input[last..whole.start()];
            if text.contains('<') {
                return Err(WeftError::InvalidCodedText(format!("unrecognised marker in {text:?}")));
            }
            coded.push_text(&unescape(text));
            last = whole.end();

            let closing = !captures[1].is_empty();
            let placeholder = !captures[4].is_empty();
            let tag_type = match (closing, placeholder) {
                (false, false) => TagType::Opening,
                (true, false) => TagType::Closing,
                (false, true) => TagType::Placeholder,
                (true, true) => {
                    return Err(WeftError::InvalidCodedText(format!("malformed marker {}", whole.as_str())));
                },
            };
            let id = captures[3]
                .parse::<u32>()
                .map_err(|_| WeftError::InvalidCodedText(format!("code id out of range in {}", whole.as_str())))?;
            coded.push_code(id, tag_type);
        }
        let rest = &input[last..];
        if rest.contains('<') {
            return Err(WeftError::InvalidCodedText(format!("unrecognised marker in {rest:?}")));
        }
        coded.push_text(&unescape(rest));
        Ok(coded)
    }

    /// Checks that paired codes open before they close, close exactly once
    /// and nest properly, and that placeholders appear once.
    pub fn check_balance(&self) -> Result<()> {
        let mut open: Vec<u32> = Vec::new();
        let mut seen = std::collections::BTreeSet::new();
        for (id, tag_type) in self.code_markers() {
            match tag_type {
                TagType::Opening | TagType::Placeholder if !seen.insert(id) => {
                    return Err(WeftError::InvalidCodedText(format!("code {id} used more than once")));
                },
                TagType::Opening => open.push(id),
                TagType::Placeholder => {},
                TagType::Closing => {
                    if open.pop() != Some(id) {
                        return Err(WeftError::InvalidCodedText(format!("code {id} closed out of order")));
                    }
                },
            }
        }
        match open.last() {
            Some(id) => Err(WeftError::InvalidCodedText(format!("code {id} never closed"))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_markers() {
        let coded = CodedText::parse("This <run1>document has <run2>overlapping styles</run2></run1>.").unwrap();
        assert_eq!(coded.plain_text(), "This document has overlapping styles.");
        let markers: Vec<(u32, TagType)> = coded.code_markers().collect();
        assert_eq!(
            markers,
            [
                (1, TagType::Opening),
                (2, TagType::Opening),
                (2, TagType::Closing),
                (1, TagType::Closing)
            ]
        );
        assert!(coded.check_balance().is_ok());
    }

    #[test]
    fn test_render_escapes_text() {
        let mut coded = CodedText::new();
        coded.push_text("a < b & c");
        coded.push_code(1, TagType::Placeholder);
        let rendered = coded.render(&CodeTable::new());
        assert_eq!(rendered, "a &lt; b &amp; c<tags1/>");
        assert_eq!(CodedText::parse(&rendered).unwrap(), coded);
    }

    #[test]
    fn test_parse_rejects_malformed_markers() {
        assert!(CodedText::parse("x </run1/> y").is_err());
        assert!(CodedText::parse("x <bold1> y").is_err());
        assert!(CodedText::parse("x <run99999999999> y").is_err());
    }

    #[test]
    fn test_balance() {
        assert!(CodedText::parse("<run1>a<run2>b</run1></run2>").unwrap().check_balance().is_err());
        assert!(CodedText::parse("<run1>a").unwrap().check_balance().is_err());
        assert!(CodedText::parse("a</run1>").unwrap().check_balance().is_err());
        assert!(CodedText::parse("<tags1/>a<tags1/>").unwrap().check_balance().is_err());
        assert!(CodedText::parse("<tags1/>a<hyperlink2>b</hyperlink2>").unwrap().check_balance().is_ok());
    }

    #[test]
    fn test_has_text() {
        assert!(!CodedText::parse("<tags1/> ").unwrap().has_text());
        assert!(CodedText::from_text("x").has_text());
        assert!(CodedText::new().is_empty());
    }
}
