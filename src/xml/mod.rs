//! Owned XML event model shared by parsing, simplification and write-back.

pub mod compare;
pub mod cursor;
pub mod event;

pub use compare::structurally_equal;
pub use cursor::EventCursor;
pub use event::{
    Attribute, EndTag, StartTag, XmlEvent, local_part, prefix_part, qualify, read_events,
    write_events,
};
