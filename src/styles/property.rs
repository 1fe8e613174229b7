//! Run and paragraph property sets.
//!
//! A property is either a child element of `rPr`/`pPr` (WordprocessingML) or
//! an attribute of the properties element itself (DrawingML `a:rPr`). Both
//! forms normalise to the same [`PropertyValue`] keyed by local name, so `w:b`
//! and `b="1"` compare equal while each keeps the exact events it came from.

use crate::classify::{TOGGLE_PROPERTIES, parse_bool};
use crate::xml::{Attribute, EndTag, StartTag, XmlEvent, local_part};
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// Where an effective property value came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Provenance {
    Direct,
    Style(String),
    DocumentDefaults,
}

/// A normalised property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Boolean toggle; absence is equivalent to `Toggle(false)`.
    Toggle(bool),
    /// Attribute values keyed by local name, sorted.
    Attributes(SmallVec<[(String, String); 2]>),
    /// Property with child elements, compared structurally.
    Markup(Vec<XmlEvent>),
}

impl PropertyValue {
    fn from_attributes<'a>(attributes: impl Iterator<Item = &'a Attribute>) -> Self {
        let mut values: SmallVec<[(String, String); 2]> = attributes
            .map(|attr| (attr.local_name().to_string(), attr.value.clone()))
            .collect();
        values.sort();
        PropertyValue::Attributes(values)
    }

    /// The `val` attribute of an attribute-valued property.
    pub fn val(&self) -> Option<&str> {
        self.attribute("val")
    }

    pub fn attribute(&self, local: &str) -> Option<&str> {
        match self {
            PropertyValue::Attributes(values) => values
                .iter()
                .find(|(name, _)| name == local)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    #[inline]
    pub fn is_off(&self) -> bool {
        matches!(self, PropertyValue::Toggle(false))
    }
}

/// How a property is spelled in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyForm {
    /// A child element subtree, start through end.
    Element(Vec<XmlEvent>),
    /// An attribute on the properties element.
    Attribute(Attribute),
}

/// A single run or paragraph property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    name: String,
    value: PropertyValue,
    form: PropertyForm,
    provenance: Provenance,
}

impl Property {
    /// Builds a property from a child element subtree. Returns `None` when
    /// `events` does not start with an element.
    pub fn from_element(events: Vec<XmlEvent>, provenance: Provenance) -> Option<Self> {
        let start = events.first()?.as_start()?.clone();
        let value = element_value(&start, &events);
        Some(Self {
            name: start.name().to_string(),
            value,
            form: PropertyForm::Element(events),
            provenance,
        })
    }

    /// Builds a property from an attribute of the properties element.
    pub fn from_attribute(attribute: Attribute, provenance: Provenance) -> Self {
        let local = attribute.local_name();
        let value = if TOGGLE_PROPERTIES.contains(local) {
            PropertyValue::Toggle(parse_bool(&attribute.value).unwrap_or(true))
        } else {
            let mut values = SmallVec::new();
            values.push(("val".to_string(), attribute.value.clone()));
            PropertyValue::Attributes(values)
        };
        Self {
            name: attribute.name.clone(),
            value,
            form: PropertyForm::Attribute(attribute),
            provenance,
        }
    }

    /// An enabled toggle element such as `<w:rtl/>`.
    pub fn toggle_element(name: &str) -> Self {
        let start = StartTag::new(name).self_closing(true);
        let end = start.end();
        Self {
            name: name.to_string(),
            value: PropertyValue::Toggle(true),
            form: PropertyForm::Element(vec![XmlEvent::Start(start), XmlEvent::End(end)]),
            provenance: Provenance::Direct,
        }
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
    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    #[inline]
    pub fn form(&self) -> &PropertyForm {
        &self.form
    }

    #[inline]
    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    /// Whether the property has child elements.
    #[inline]
    pub fn is_complex(&self) -> bool {
        matches!(self.value, PropertyValue::Markup(_))
    }

    /// Whether both properties have the same local name and value.
    pub fn same_as(&self, other: &Property) -> bool {
        self.local_name() == other.local_name() && self.value == other.value
    }

    /// Rewrites attribute values on the property's element (or the attribute
    /// itself) and renormalises the value. `rewrite` receives the attribute's
    /// local name and value and returns a replacement. Returns whether anything changed.
    pub fn rewrite_attributes(&mut self, mut rewrite: impl FnMut(&str, &str) -> Option<String>) -> bool {
        let mut changed = false;
        match &mut self.form {
            PropertyForm::Attribute(attribute) => {
                if let Some(value) = rewrite(attribute.local_name(), &attribute.value) {
                    attribute.value = value;
                    changed = true;
                }
            },
            PropertyForm::Element(events) => {
                for event in events.iter_mut() {
                    let XmlEvent::Start(tag) = event else { continue };
                    let updates: Vec<(String, String)> = tag
                        .attributes()
                        .iter()
                        .filter_map(|attr| {
                            rewrite(attr.local_name(), &attr.value).map(|value| (attr.name.clone(), value))
                        })
                        .collect();
                    for (name, value) in updates {
                        tag.set_attribute(&name, value);
                        changed = true;
                    }
                }
            },
        }
        if changed {
            *self = match self.form.clone() {
                PropertyForm::Attribute(attribute) => {
                    Property::from_attribute(attribute, self.provenance.clone())
                },
                PropertyForm::Element(events) => {
                    let start = events.first().and_then(XmlEvent::as_start).cloned();
                    let value = start
                        .as_ref()
                        .map_or(PropertyValue::Markup(Vec::new()), |start| element_value(start, &events));
                    Property {
                        name: self.name.clone(),
                        value,
                        form: PropertyForm::Element(events),
                        provenance: self.provenance.clone(),
                    }
                },
            };
        }
        changed
    }
}

fn element_value(start: &StartTag, events: &[XmlEvent]) -> PropertyValue {
    let has_children = events.len() > 2;
    if !has_children && TOGGLE_PROPERTIES.contains(start.local_name()) {
        let on = start.attribute("val").and_then(parse_bool).unwrap_or(true);
        PropertyValue::Toggle(on)
    } else if !has_children {
        PropertyValue::from_attributes(start.attributes().iter())
    } else {
        PropertyValue::Markup(
            events
                .iter()
                .filter(|event| !event.is_whitespace())
                .cloned()
                .collect(),
        )
    }
}

/// The properties of a run (`rPr`) or paragraph (`pPr`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySet {
    start: StartTag,
    present: bool,
    properties: Vec<Property>,
    /// Whitespace, comments and processing instructions between properties,
    /// keyed by the name of the element property they precede. `None` keys
    /// trail the last property.
    interstitial: Vec<(Option<String>, XmlEvent)>,
}

/// Run properties (`w:rPr`, `a:rPr`, `rPr`).
pub type RunProperties = PropertySet;

/// Paragraph properties (`w:pPr`, `a:pPr`).
pub type BlockProperties = PropertySet;

impl PropertySet {
    /// A set for a properties element that does not occur in the document.
    pub fn absent(name: impl Into<String>) -> Self {
        Self {
            start: StartTag::new(name).self_closing(true),
            present: false,
            properties: Vec::new(),
            interstitial: Vec::new(),
        }
    }

    /// Builds a set from the full subtree of a properties element.
    pub fn from_events(events: &[XmlEvent], provenance: Provenance) -> Self {
        let Some(start) = events.first().and_then(XmlEvent::as_start) else {
            return Self::absent("rPr");
        };
        let mut properties: Vec<Property> = start
            .attributes()
            .iter()
            .map(|attr| Property::from_attribute(attr.clone(), provenance.clone()))
            .collect();

        let inner = &events[1..events.len().saturating_sub(1)];
        let mut depth = 0usize;
        let mut current: Vec<XmlEvent> = Vec::new();
        let mut interstitial = Vec::new();
        let mut pending: Vec<XmlEvent> = Vec::new();
        for event in inner {
            match event {
                XmlEvent::Start(tag) => {
                    if depth == 0 {
                        let key = Some(tag.name().to_string());
                        interstitial.extend(pending.drain(..).map(|event| (key.clone(), event)));
                    }
                    depth += 1;
                    current.push(event.clone());
                },
                XmlEvent::End(_) => {
                    current.push(event.clone());
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        let subtree = std::mem::take(&mut current);
                        properties.extend(Property::from_element(subtree, provenance.clone()));
                    }
                },
                _ if depth > 0 => current.push(event.clone()),
                _ => pending.push(event.clone()),
            }
        }
        interstitial.extend(pending.into_iter().map(|event| (None, event)));

        // Attributes are re-emitted from their properties.
        let template = StartTag::new(start.name()).self_closing(start.is_self_closing());
        Self {
            start: template,
            present: true,
            properties,
            interstitial,
        }
    }

    /// Qualified name of the properties element.
    #[inline]
    pub fn element_name(&self) -> &str {
        self.start.name()
    }

    #[inline]
    pub fn is_present(&self) -> bool {
        self.present
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Number of explicit properties.
    #[inline]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[inline]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// The last property with this local name.
    pub fn get(&self, local: &str) -> Option<&Property> {
        self.properties.iter().rev().find(|p| p.local_name() == local)
    }

    pub fn value(&self, local: &str) -> Option<&PropertyValue> {
        self.get(local).map(Property::value)
    }

    /// Whether a toggle property is explicitly on.
    pub fn is_on(&self, local: &str) -> bool {
        matches!(self.value(local), Some(PropertyValue::Toggle(true)))
    }

    /// The referenced style id (`rStyle` or `pStyle`).
    pub fn style_id(&self) -> Option<&str> {
        self.value("rStyle")
            .or_else(|| self.value("pStyle"))
            .and_then(PropertyValue::val)
    }

    /// Paragraph-mark run properties nested in a paragraph property set.
    pub fn nested(&self, local: &str) -> Option<PropertySet> {
        match self.get(local)?.form() {
            PropertyForm::Element(events) => Some(PropertySet::from_events(events, Provenance::Direct)),
            PropertyForm::Attribute(_) => None,
        }
    }

    /// Removes every property with this local name. Returns whether anything was removed.
    pub fn remove(&mut self, local: &str) -> bool {
        let before = self.properties.len();
        self.properties.retain(|p| p.local_name() != local);
        before != self.properties.len()
    }

    pub fn retain(&mut self, f: impl FnMut(&Property) -> bool) {
        self.properties.retain(f);
    }

    /// Whether comments or processing instructions sit between the properties.
    pub fn has_comments(&self) -> bool {
        self.interstitial.iter().any(|(_, event)| !event.is_whitespace())
    }

    /// Marks the set absent once no properties remain, so nothing is written.
    pub fn omit_if_empty(&mut self) {
        if self.properties.is_empty() && !self.has_comments() {
            self.present = false;
        }
    }

    pub fn push(&mut self, property: Property) {
        self.present = true;
        self.properties.push(property);
    }

    /// Inserts before the first property whose local name is in `before`, or appends.
    pub fn insert_before_any(&mut self, property: Property, before: &[&str]) {
        self.present = true;
        match self
            .properties
            .iter()
            .position(|p| before.contains(&p.local_name()))
        {
            Some(index) => self.properties.insert(index, property),
            None => self.properties.push(property),
        }
    }

    pub fn properties_mut(&mut self) -> &mut [Property] {
        &mut self.properties
    }

    /// Whether both sets hold the same local names with the same values, in any order.
    pub fn same_values(&self, other: &PropertySet) -> bool {
        self.properties.len() == other.properties.len()
            && self.is_subset_of(other)
            && other.is_subset_of(self)
    }

    /// Whether every property of `self` occurs with an equal value in `other`.
    pub fn is_subset_of(&self, other: &PropertySet) -> bool {
        self.properties
            .iter()
            .all(|p| other.properties.iter().any(|q| p.same_as(q)))
    }

    /// Appends the events of this set to `out`.
    pub fn write_events(&self, out: &mut Vec<XmlEvent>) {
        if !self.present && self.properties.is_empty() {
            return;
        }
        let mut start = self.start.clone();
        let mut has_children = false;
        for property in &self.properties {
            match property.form() {
                PropertyForm::Attribute(attr) => start.set_attribute(&attr.name, attr.value.clone()),
                PropertyForm::Element(_) => has_children = true,
            }
        }
        if has_children || !self.interstitial.is_empty() {
            start.set_self_closing(false);
        }
        let end = EndTag::new(start.name());
        out.push(XmlEvent::Start(start));
        let mut placed: SmallVec<[&str; 8]> = SmallVec::new();
        for property in &self.properties {
            if let PropertyForm::Element(events) = property.form() {
                if !placed.contains(&property.name()) {
                    placed.push(property.name());
                    out.extend(
                        self.interstitial
                            .iter()
                            .filter(|(key, _)| key.as_deref() == Some(property.name()))
                            .map(|(_, event)| event.clone()),
                    );
                }
                out.extend(events.iter().cloned());
            }
        }
        // Events whose property is gone are written at the end.
        out.extend(
            self.interstitial
                .iter()
                .filter(|(key, _)| key.as_deref().is_none_or(|name| !placed.contains(&name)))
                .map(|(_, event)| event.clone()),
        );
        out.push(XmlEvent::End(end));
    }

    pub fn events(&self) -> Vec<XmlEvent> {
        let mut out = Vec::with_capacity(self.properties.len() * 2 + 2);
        self.write_events(&mut out);
        out
    }
}

/// One resolved property with the layer it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveProperty {
    pub value: PropertyValue,
    pub provenance: Provenance,
}

/// Fully resolved run properties keyed by local name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveProperties {
    entries: BTreeMap<String, EffectiveProperty>,
}

impl EffectiveProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlays `properties`; later layers replace earlier values.
    pub fn overlay<'a>(&mut self, properties: impl IntoIterator<Item = &'a Property>, provenance: &Provenance) {
        for property in properties {
            self.entries.insert(
                property.local_name().to_string(),
                EffectiveProperty {
                    value: property.value().clone(),
                    provenance: provenance.clone(),
                },
            );
        }
    }

    pub fn get(&self, local: &str) -> Option<&EffectiveProperty> {
        self.entries.get(local)
    }

    pub fn value(&self, local: &str) -> Option<&PropertyValue> {
        self.entries.get(local).map(|p| &p.value)
    }

    pub fn is_on(&self, local: &str) -> bool {
        matches!(self.value(local), Some(PropertyValue::Toggle(true)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EffectiveProperty)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The values that affect rendering. Style references and names in
    /// `ignored` are left out, as are disabled toggles when `off_is_absent`.
    pub fn rendering_values(
        &self,
        ignored: &phf::Set<&'static str>,
        off_is_absent: bool,
    ) -> BTreeMap<&str, &PropertyValue> {
        self.entries
            .iter()
            .filter(|(name, property)| {
                !(off_is_absent && property.value.is_off())
                    && name.as_str() != "rStyle"
                    && !ignored.contains(name.as_str())
            })
            .map(|(name, property)| (name.as_str(), &property.value))
            .collect()
    }
}
