//! DrawingML list styles.
//!
//! Presentations keep their text defaults per paragraph level instead of in
//! named styles. A list style element (`a:lstStyle` in a shape, or
//! `p:defaultTextStyle` and the master's `p:bodyStyle` and friends) holds
//! `a:defPPr` plus `a:lvl1pPr` through `a:lvl9pPr`; the `a:defRPr` child of
//! each gives the run defaults of that level.

use crate::error::Result;
use crate::styles::property::{PropertySet, Provenance};
use crate::xml::{EventCursor, StartTag, XmlEvent, read_events};

/// Number of paragraph levels a list style describes.
pub const LEVELS: usize = 9;

/// Run defaults per DrawingML paragraph level.
///
/// # Examples
///
/// ```rust
/// use weft::styles::ListStyles;
///
/// let xml = br#"<p:presentation><p:defaultTextStyle>
///   <a:defPPr><a:defRPr lang="en-US"/></a:defPPr>
///   <a:lvl2pPr><a:defRPr sz="1600" b="1"/></a:lvl2pPr>
/// </p:defaultTextStyle></p:presentation>"#;
/// let styles = ListStyles::from_xml(xml, "defaultTextStyle").unwrap().unwrap();
/// assert!(styles.run_properties(1).is_some_and(|p| p.is_on("b")));
/// assert!(!styles.run_properties(0).is_some_and(|p| p.is_on("b")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListStyles {
    defaults: Option<PropertySet>,
    levels: [Option<PropertySet>; LEVELS],
}

impl ListStyles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the first element named `local` from a part, such as
    /// `defaultTextStyle` in `ppt/presentation.xml`. Returns `None` when the
    /// part has no such element.
    pub fn from_xml(xml: &[u8], local: &str) -> Result<Option<Self>> {
        let events = read_events(xml)?;
        let mut cursor = EventCursor::new(local, &events);
        while let Some(event) = cursor.next() {
            if let XmlEvent::Start(tag) = event
                && tag.local_name() == local
            {
                return Self::read(&mut cursor, tag).map(Some);
            }
        }
        Ok(None)
    }

    /// Reads a list style element whose start was already consumed.
    pub fn read(cursor: &mut EventCursor<'_>, open: &StartTag) -> Result<Self> {
        let mut styles = Self::new();
        loop {
            let event = cursor.next_within(open)?;
            match event {
                XmlEvent::End(end) if end.name() == open.name() => return Ok(styles),
                XmlEvent::End(end) => return Err(cursor.corruption(end.name())),
                XmlEvent::Start(tag) => {
                    let events = cursor.take_subtree(tag)?;
                    let local = tag.local_name();
                    let slot = match local {
                        "defPPr" => &mut styles.defaults,
                        _ => match level_of(local) {
                            Some(level) => &mut styles.levels[level],
                            None => {
                                log::debug!("Ignoring <{}> in list style", tag.name());
                                continue;
                            },
                        },
                    };
                    *slot = default_run_properties(cursor.part(), &events, local)?;
                },
                _ => {},
            }
        }
    }

    /// Run defaults of a zero-based paragraph level (`a:pPr/@lvl`): that
    /// level's `a:defRPr`, or the `a:defPPr` defaults when the level has none.
    pub fn run_properties(&self, level: u8) -> Option<&PropertySet> {
        self.levels
            .get(usize::from(level))
            .and_then(Option::as_ref)
            .or(self.defaults.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_none() && self.levels.iter().all(Option::is_none)
    }

    /// Layers `other` over this list style. For each level, a property of
    /// `other` replaces the property of the same name.
    pub fn merged_with(&self, other: &ListStyles) -> ListStyles {
        ListStyles {
            defaults: merge(self.defaults.as_ref(), other.defaults.as_ref()),
            levels: std::array::from_fn(|i| merge(self.levels[i].as_ref(), other.levels[i].as_ref())),
        }
    }
}

/// Zero-based level of `lvl1pPr` through `lvl9pPr`.
fn level_of(local: &str) -> Option<usize> {
    let number: usize = local.strip_prefix("lvl")?.strip_suffix("pPr")?.parse().ok()?;
    (1..=LEVELS).contains(&number).then(|| number - 1)
}

/// The `a:defRPr` inside one level's paragraph properties.
fn default_run_properties(part: &str, events: &[XmlEvent], level: &str) -> Result<Option<PropertySet>> {
    let inner = &events[1..];
    let mut cursor = EventCursor::new(part, inner);
    while let Some(event) = cursor.next() {
        let XmlEvent::Start(tag) = event else { continue };
        let subtree = cursor.take_subtree(tag)?;
        if tag.local_name() == "defRPr" {
            return Ok(Some(PropertySet::from_events(
                &subtree,
                Provenance::Style(level.to_string()),
            )));
        }
    }
    Ok(None)
}

fn merge(base: Option<&PropertySet>, top: Option<&PropertySet>) -> Option<PropertySet> {
    match (base, top) {
        (Some(base), Some(top)) => {
            let mut merged = base.clone();
            for property in top.properties() {
                merged.remove(property.local_name());
                merged.push(property.clone());
            }
            Some(merged)
        },
        (base, top) => top.or(base).cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles::PropertyValue;

    const MASTER: &str = r#"<p:sldMaster><p:txStyles>
<p:titleStyle><a:lvl1pPr algn="l"><a:defRPr sz="4400" b="1"/></a:lvl1pPr></p:titleStyle>
<p:bodyStyle>
  <a:lvl1pPr marL="228600"><a:buFont typeface="Arial"/><a:defRPr sz="2800"><a:solidFill><a:schemeClr val="tx1"/></a:solidFill></a:defRPr></a:lvl1pPr>
  <a:lvl2pPr marL="685800"><a:defRPr sz="2400" i="1"/></a:lvl2pPr>
</p:bodyStyle>
</p:txStyles></p:sldMaster>"#;

    #[test]
    fn test_reads_levels() {
        let body = ListStyles::from_xml(MASTER.as_bytes(), "bodyStyle").unwrap().unwrap();
        let first = body.run_properties(0).unwrap();
        assert_eq!(first.value("sz").and_then(PropertyValue::val), Some("2800"));
        assert!(first.value("solidFill").is_some());
        assert!(body.run_properties(1).unwrap().is_on("i"));
        assert_eq!(body.run_properties(5), None);

        let title = ListStyles::from_xml(MASTER.as_bytes(), "titleStyle").unwrap().unwrap();
        assert!(title.run_properties(0).unwrap().is_on("b"));
        assert!(ListStyles::from_xml(MASTER.as_bytes(), "notesStyle").unwrap().is_none());
    }

    #[test]
    fn test_levels_fall_back_to_defaults() {
        let xml = r#"<a:lstStyle><a:defPPr><a:defRPr lang="en-US" b="0"/></a:defPPr><a:lvl3pPr><a:defRPr b="1"/></a:lvl3pPr></a:lstStyle>"#;
        let styles = ListStyles::from_xml(xml.as_bytes(), "lstStyle").unwrap().unwrap();
        assert_eq!(styles.run_properties(0).unwrap().value("b"), Some(&PropertyValue::Toggle(false)));
        assert!(styles.run_properties(2).unwrap().is_on("b"));
        assert_eq!(level_of("lvl10pPr"), None);
        assert_eq!(level_of("lvl9pPr"), Some(8));
    }

    #[test]
    fn test_merge_layers_shape_over_master() {
        let master = ListStyles::from_xml(MASTER.as_bytes(), "bodyStyle").unwrap().unwrap();
        let shape = ListStyles::from_xml(
            br#"<a:lstStyle><a:lvl1pPr><a:defRPr sz="1800"/></a:lvl1pPr></a:lstStyle>"#,
            "lstStyle",
        )
        .unwrap()
        .unwrap();
        let merged = master.merged_with(&shape);
        let first = merged.run_properties(0).unwrap();
        assert_eq!(first.value("sz").and_then(PropertyValue::val), Some("1800"));
        assert!(first.value("solidFill").is_some());
        assert!(merged.run_properties(1).unwrap().is_on("i"));
        assert!(!merged.is_empty());
        assert!(ListStyles::new().is_empty());
    }

    #[test]
    fn test_truncated_list_style_fails() {
        assert!(ListStyles::from_xml(b"<a:lstStyle><a:lvl1pPr>", "lstStyle").is_err());
    }
}
