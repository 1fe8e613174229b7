//! Owned XML events and their conversion to and from quick-xml.
//!
//! Parts are read into a flat `Vec<XmlEvent>` so the block parser can walk
//! them with arbitrary lookahead and so skeletons can hold on to the exact
//! events they replay. Empty elements are normalised to a start/end pair whose
//! start remembers the self-closing form; entity references are resolved into
//! the surrounding text.

use crate::error::Result;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use smallvec::SmallVec;

/// Returns the part of a qualified name after the namespace prefix.
#[inline]
pub fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Returns the namespace prefix of a qualified name, or `""` when unprefixed.
#[inline]
pub fn prefix_part(name: &str) -> &str {
    name.split_once(':').map_or("", |(prefix, _)| prefix)
}

/// Builds `prefix:local`, or just `local` for an empty prefix.
pub fn qualify(prefix: &str, local: &str) -> String {
    if prefix.is_empty() {
        local.to_string()
    } else {
        let mut name = String::with_capacity(prefix.len() + local.len() + 1);
        name.push_str(prefix);
        name.push(':');
        name.push_str(local);
        name
    }
}

/// A single attribute with its value already unescaped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    #[inline]
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }
}

/// An element start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    name: String,
    attributes: SmallVec<[Attribute; 4]>,
    self_closing: bool,
}

impl StartTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: SmallVec::new(),
            self_closing: false,
        }
    }

    /// Builder-style attribute append.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(name, value));
        self
    }

    /// Builder-style self-closing flag.
    pub fn self_closing(mut self, self_closing: bool) -> Self {
        self.self_closing = self_closing;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    #[inline]
    pub fn prefix(&self) -> &str {
        prefix_part(&self.name)
    }

    #[inline]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    #[inline]
    pub fn is_self_closing(&self) -> bool {
        self.self_closing
    }

    pub fn set_self_closing(&mut self, self_closing: bool) {
        self.self_closing = self_closing;
    }

    /// Looks an attribute up by its local name, ignoring the prefix.
    ///
    /// `xml:space` and `w:val` are found as `space` and `val`.
    pub fn attribute(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.local_name() == local_name)
            .map(|attr| attr.value.as_str())
    }

    /// Looks an attribute up by its exact qualified name.
    pub fn qualified_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Replaces the value of the attribute with this qualified name, appending it if absent.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|attr| attr.name == name) {
            Some(attr) => attr.value = value,
            None => self.attributes.push(Attribute::new(name, value)),
        }
    }

    /// Removes every attribute matching the predicate. Returns whether anything was removed.
    pub fn remove_attributes(&mut self, mut predicate: impl FnMut(&Attribute) -> bool) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|attr| !predicate(attr));
        before != self.attributes.len()
    }

    /// The end tag closing this start tag.
    pub fn end(&self) -> EndTag {
        EndTag::new(self.name.clone())
    }

    fn to_bytes_start(&self) -> BytesStart<'_> {
        let mut start = BytesStart::new(self.name.as_str());
        for attr in &self.attributes {
            start.push_attribute((attr.name.as_str(), attr.value.as_str()));
        }
        start
    }
}

/// An element end tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndTag {
    name: String,
}

impl EndTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    #[inline]
    pub fn prefix(&self) -> &str {
        prefix_part(&self.name)
    }
}

/// An owned XML event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    Decl {
        version: String,
        encoding: Option<String>,
        standalone: Option<String>,
    },
    Start(StartTag),
    End(EndTag),
    /// Character data, unescaped.
    Text(String),
    CData(String),
    Comment(String),
    PI(String),
    DocType(String),
}

impl XmlEvent {
    #[inline]
    pub fn as_start(&self) -> Option<&StartTag> {
        match self {
            XmlEvent::Start(tag) => Some(tag),
            _ => None,
        }
    }

    #[inline]
    pub fn as_end(&self) -> Option<&EndTag> {
        match self {
            XmlEvent::End(tag) => Some(tag),
            _ => None,
        }
    }

    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            XmlEvent::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Whether this is character data made only of XML whitespace.
    pub fn is_whitespace(&self) -> bool {
        matches!(self, XmlEvent::Text(text) if is_xml_whitespace(text))
    }

    /// Whitespace, comments and processing instructions: events that may sit
    /// between elements without being content.
    pub fn is_interstitial(&self) -> bool {
        self.is_whitespace() || matches!(self, XmlEvent::Comment(_) | XmlEvent::PI(_))
    }

    /// Whether this is an end tag closing `start`.
    #[inline]
    pub fn closes(&self, start: &StartTag) -> bool {
        matches!(self, XmlEvent::End(end) if end.name() == start.name())
    }
}

#[inline]
pub(crate) fn is_xml_whitespace(text: &str) -> bool {
    text.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}

fn push_text(events: &mut Vec<XmlEvent>, text: &str) {
    if let Some(XmlEvent::Text(last)) = events.last_mut() {
        last.push_str(text);
    } else {
        events.push(XmlEvent::Text(text.to_string()));
    }
}

fn start_tag(reader: &Reader<&[u8]>, start: &BytesStart<'_>, self_closing: bool) -> Result<StartTag> {
    let decoder = reader.decoder();
    let name = decoder.decode(start.name().as_ref())?.into_owned();
    let mut tag = StartTag::new(name).self_closing(self_closing);
    for attr in start.attributes() {
        let attr = attr?;
        let key = decoder.decode(attr.key.as_ref())?.into_owned();
        let value = attr.decode_and_unescape_value(decoder)?.into_owned();
        tag.attributes.push(Attribute::new(key, value));
    }
    Ok(tag)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Reads a complete XML part into owned events.
///
/// Whitespace is kept verbatim; adjacent character data (including resolved
/// entity references) is coalesced into a single [`XmlEvent::Text`].
pub fn read_events(xml: &[u8]) -> Result<Vec<XmlEvent>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::with_capacity(1024);
    let mut entity = String::with_capacity(16);
    let mut events = Vec::with_capacity(xml.len() / 24 + 8);

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let tag = start_tag(&reader, &e, false)?;
                events.push(XmlEvent::Start(tag));
            },
            Event::Empty(e) => {
                let tag = start_tag(&reader, &e, true)?;
                let end = tag.end();
                events.push(XmlEvent::Start(tag));
                events.push(XmlEvent::End(end));
            },
            Event::End(e) => {
                let name = reader.decoder().decode(e.name().as_ref())?.into_owned();
                events.push(XmlEvent::End(EndTag::new(name)));
            },
            Event::Text(e) => {
                let text = reader.decoder().decode(&e)?;
                push_text(&mut events, &text);
            },
            Event::GeneralRef(e) => {
                let name = e.decode()?;
                entity.clear();
                entity.push('&');
                entity.push_str(&name);
                entity.push(';');
                let resolved = quick_xml::escape::unescape(&entity)?;
                push_text(&mut events, &resolved);
            },
            Event::CData(e) => {
                let text = reader.decoder().decode(&e)?.into_owned();
                events.push(XmlEvent::CData(text));
            },
            Event::Comment(e) => {
                let text = reader.decoder().decode(&e)?.into_owned();
                events.push(XmlEvent::Comment(text));
            },
            Event::PI(e) => {
                let text = reader.decoder().decode(&e)?.into_owned();
                events.push(XmlEvent::PI(text));
            },
            Event::DocType(e) => {
                let text = reader.decoder().decode(&e)?.into_owned();
                events.push(XmlEvent::DocType(text));
            },
            Event::Decl(e) => {
                let version = lossy(&e.version()?);
                let encoding = match e.encoding() {
                    Some(encoding) => Some(lossy(&encoding?)),
                    None => None,
                };
                let standalone = match e.standalone() {
                    Some(standalone) => Some(lossy(&standalone?)),
                    None => None,
                };
                events.push(XmlEvent::Decl {
                    version,
                    encoding,
                    standalone,
                });
            },
            Event::Eof => break,
        }
        buf.clear();
    }

    Ok(events)
}

/// Serialises events back to bytes.
///
/// A self-closing start immediately followed by its end is written as an
/// empty element, so a part that was read and written without changes keeps
/// its original element forms.
pub fn write_events(events: &[XmlEvent]) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::with_capacity(events.len() * 24));
    let mut iter = events.iter().peekable();

    while let Some(event) = iter.next() {
        match event {
            XmlEvent::Start(tag) => {
                let start = tag.to_bytes_start();
                if tag.is_self_closing() && iter.peek().is_some_and(|next| next.closes(tag)) {
                    iter.next();
                    writer.write_event(Event::Empty(start))?;
                } else {
                    writer.write_event(Event::Start(start))?;
                }
            },
            XmlEvent::End(tag) => writer.write_event(Event::End(BytesEnd::new(tag.name())))?,
            XmlEvent::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            XmlEvent::CData(text) => writer.write_event(Event::CData(BytesCData::new(text.as_str())))?,
            XmlEvent::Comment(text) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?
            },
            XmlEvent::PI(text) => writer.write_event(Event::PI(BytesPI::new(text.as_str())))?,
            XmlEvent::DocType(text) => {
                writer.write_event(Event::DocType(BytesText::from_escaped(text.as_str())))?
            },
            XmlEvent::Decl {
                version,
                encoding,
                standalone,
            } => writer.write_event(Event::Decl(BytesDecl::new(
                version,
                encoding.as_deref(),
                standalone.as_deref(),
            )))?,
        }
    }

    Ok(writer.into_inner())
}
