//! Structural comparison of event streams.

use crate::xml::event::{Attribute, StartTag, XmlEvent, local_part};
use phf::phf_set;

/// Elements whose character content is significant even when it is whitespace.
static TEXT_CONTENT_ELEMENTS: phf::Set<&'static str> = phf_set! {
    "t", "instrText", "delText", "delInstrText",
};

#[derive(Debug, PartialEq)]
enum Normalised<'a> {
    Start(&'a str, Vec<&'a Attribute>),
    End(&'a str),
    Text(String),
    Other(&'a XmlEvent),
}

fn normalise(events: &[XmlEvent]) -> Vec<Normalised<'_>> {
    let mut out = Vec::with_capacity(events.len());
    let mut open: Vec<&StartTag> = Vec::new();
    for event in events {
        match event {
            XmlEvent::Start(tag) => {
                let mut attributes: Vec<&Attribute> = tag.attributes().iter().collect();
                attributes.sort_by(|a, b| a.name.cmp(&b.name));
                out.push(Normalised::Start(tag.name(), attributes));
                open.push(tag);
            },
            XmlEvent::End(tag) => {
                open.pop();
                out.push(Normalised::End(tag.name()));
            },
            XmlEvent::Text(text) => {
                let significant = open
                    .last()
                    .is_some_and(|tag| TEXT_CONTENT_ELEMENTS.contains(local_part(tag.name())));
                if !significant && event.is_whitespace() {
                    continue;
                }
                if let Some(Normalised::Text(last)) = out.last_mut() {
                    last.push_str(text);
                } else {
                    out.push(Normalised::Text(text.clone()));
                }
            },
            other => out.push(Normalised::Other(other)),
        }
    }
    out
}

/// Compares two event streams for structural equality.
///
/// Attribute order, self-closing versus explicit end forms, and the splitting
/// of character data are ignored. Whitespace-only character data is ignored
/// everywhere except inside text-bearing elements.
pub fn structurally_equal(left: &[XmlEvent], right: &[XmlEvent]) -> bool {
    normalise(left) == normalise(right)
}
