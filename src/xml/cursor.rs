//! Forward cursor over a part's events.

use crate::error::{Result, WeftError};
use crate::xml::event::{StartTag, XmlEvent};

/// A forward-only cursor over borrowed events with single-event lookahead.
///
/// The cursor knows the name of the part it walks so that parsing errors can
/// point at the offending event.
#[derive(Debug, Clone)]
pub struct EventCursor<'a> {
    events: &'a [XmlEvent],
    position: usize,
    part: &'a str,
}

impl<'a> EventCursor<'a> {
    pub fn new(part: &'a str, events: &'a [XmlEvent]) -> Self {
        Self {
            events,
            position: 0,
            part,
        }
    }

    /// Returns the next event and advances.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<&'a XmlEvent> {
        let event = self.events.get(self.position)?;
        self.position += 1;
        Some(event)
    }

    /// Returns the next event without advancing.
    #[inline]
    pub fn peek(&self) -> Option<&'a XmlEvent> {
        self.events.get(self.position)
    }

    /// Index of the event most recently returned by [`next`](Self::next).
    #[inline]
    pub fn offset(&self) -> usize {
        self.position.saturating_sub(1)
    }

    #[inline]
    pub fn part(&self) -> &'a str {
        self.part
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.position >= self.events.len()
    }

    /// Returns the next event inside `open`, failing with
    /// [`WeftError::UnexpectedEof`] if the stream ends first.
    pub fn next_within(&mut self, open: &StartTag) -> Result<&'a XmlEvent> {
        match self.next() {
            Some(event) => Ok(event),
            None => Err(self.eof(open)),
        }
    }

    /// Consumes the subtree of `open` (whose start was already consumed) and
    /// returns it including the start and end events.
    pub fn take_subtree(&mut self, open: &StartTag) -> Result<Vec<XmlEvent>> {
        let mut events = vec![XmlEvent::Start(open.clone())];
        let mut stack: Vec<&'a StartTag> = Vec::new();
        loop {
            let event = self.next_within(open)?;
            match event {
                XmlEvent::Start(tag) => stack.push(tag),
                XmlEvent::End(end) => match stack.pop() {
                    Some(tag) if tag.name() == end.name() => {},
                    Some(_) => return Err(self.corruption(end.name())),
                    None if end.name() == open.name() => {
                        events.push(event.clone());
                        return Ok(events);
                    },
                    None => return Err(self.corruption(end.name())),
                },
                _ => {},
            }
            events.push(event.clone());
        }
    }

    pub fn eof(&self, open: &StartTag) -> WeftError {
        WeftError::UnexpectedEof {
            part: self.part.to_string(),
            offset: self.events.len(),
            expected: open.name().to_string(),
        }
    }

    /// A structural-corruption error located at the current event.
    pub fn corruption(&self, name: &str) -> WeftError {
        WeftError::StructuralCorruption {
            part: self.part.to_string(),
            offset: self.offset(),
            name: name.to_string(),
        }
    }

    /// A revision error located at the current event.
    pub fn unsupported_revision(&self, revision: &str) -> WeftError {
        WeftError::RevisionNotSupported {
            part: self.part.to_string(),
            offset: self.offset(),
            revision: revision.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::read_events;

    #[test]
    fn test_take_subtree() {
        let events = read_events(b"<a><b><c/>x</b><d/></a>").unwrap();
        let mut cursor = EventCursor::new("part.xml", &events);
        cursor.next();
        let b = cursor.next().unwrap().as_start().unwrap().clone();
        let subtree = cursor.take_subtree(&b).unwrap();
        assert_eq!(subtree.len(), 5);
        assert_eq!(cursor.peek().unwrap().as_start().unwrap().name(), "d");
    }

    #[test]
    fn test_unexpected_eof() {
        let events = vec![
            XmlEvent::Start(StartTag::new("a")),
            XmlEvent::Start(StartTag::new("b")),
        ];
        let mut cursor = EventCursor::new("part.xml", &events);
        cursor.next();
        let b = cursor.next().unwrap().as_start().unwrap().clone();
        match cursor.take_subtree(&b) {
            Err(WeftError::UnexpectedEof { expected, part, .. }) => {
                assert_eq!(expected, "b");
                assert_eq!(part, "part.xml");
            },
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_offset_tracks_last_event() {
        let events = read_events(b"<a><b/></a>").unwrap();
        let mut cursor = EventCursor::new("p", &events);
        assert_eq!(cursor.offset(), 0);
        cursor.next();
        cursor.next();
        assert_eq!(cursor.offset(), 1);
        assert!(!cursor.is_exhausted());
    }
}
