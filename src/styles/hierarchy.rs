/// Style hierarchy - document defaults and style inheritance chains.
use crate::error::Result;
use crate::styles::list::ListStyles;
use crate::styles::optimizer::StyleContext;
use crate::styles::property::{EffectiveProperties, PropertySet, Provenance};
use crate::xml::{EventCursor, StartTag, XmlEvent, read_events};
use std::collections::{HashMap, HashSet};

/// Style types defined in `w:style/@w:type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleKind {
    Paragraph,
    Character,
    Table,
    Numbering,
}

impl StyleKind {
    pub fn from_type_attr(value: &str) -> Option<Self> {
        match value {
            "paragraph" => Some(StyleKind::Paragraph),
            "character" => Some(StyleKind::Character),
            "table" => Some(StyleKind::Table),
            "numbering" => Some(StyleKind::Numbering),
            _ => None,
        }
    }
}

/// A single style definition.
#[derive(Debug, Clone)]
pub struct StyleDefinition {
    id: String,
    name: Option<String>,
    kind: StyleKind,
    based_on: Option<String>,
    is_default: bool,
    run_properties: PropertySet,
    paragraph_properties: PropertySet,
}

impl StyleDefinition {
    pub fn new(id: impl Into<String>, kind: StyleKind) -> Self {
        Self {
            id: id.into(),
            name: None,
            kind,
            based_on: None,
            is_default: false,
            run_properties: PropertySet::absent("w:rPr"),
            paragraph_properties: PropertySet::absent("w:pPr"),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_based_on(mut self, based_on: impl Into<String>) -> Self {
        self.based_on = Some(based_on.into());
        self
    }

    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    pub fn with_run_properties(mut self, properties: PropertySet) -> Self {
        self.run_properties = properties;
        self
    }

    pub fn with_paragraph_properties(mut self, properties: PropertySet) -> Self {
        self.paragraph_properties = properties;
        self
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn kind(&self) -> StyleKind {
        self.kind
    }

    #[inline]
    pub fn based_on(&self) -> Option<&str> {
        self.based_on.as_deref()
    }

    #[inline]
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    #[inline]
    pub fn run_properties(&self) -> &PropertySet {
        &self.run_properties
    }

    #[inline]
    pub fn paragraph_properties(&self) -> &PropertySet {
        &self.paragraph_properties
    }
}

/// Document defaults plus all style definitions of a document.
///
/// DrawingML paragraphs resolve through [`ListStyles`] instead, by paragraph
/// level. SpreadsheetML parts, and DrawingML parts whose list styles were not
/// supplied, only consider direct formatting.
///
/// # Examples
///
/// ```rust
/// use weft::styles::StyleHierarchy;
///
/// let xml = br#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
///   <w:style w:type="character" w:styleId="Strong"><w:rPr><w:b/></w:rPr></w:style>
/// </w:styles>"#;
/// let styles = StyleHierarchy::from_styles_xml(xml).unwrap();
/// assert!(styles.inherited_run_properties(None, Some("Strong")).is_on("b"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct StyleHierarchy {
    styles: HashMap<String, StyleDefinition>,
    document_run_defaults: Option<PropertySet>,
    document_paragraph_defaults: Option<PropertySet>,
    list_styles: Option<ListStyles>,
}

impl StyleHierarchy {
    /// An empty hierarchy.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> StyleHierarchyBuilder {
        StyleHierarchyBuilder::default()
    }

    /// Reads `word/styles.xml`.
    pub fn from_styles_xml(xml: &[u8]) -> Result<Self> {
        let events = read_events(xml)?;
        let mut cursor = EventCursor::new("styles.xml", &events);
        let mut builder = StyleHierarchy::builder();

        while let Some(event) = cursor.next() {
            let XmlEvent::Start(tag) = event else { continue };
            match tag.local_name() {
                "docDefaults" => read_document_defaults(&mut cursor, tag, &mut builder)?,
                "style" => {
                    if let Some(style) = read_style(&mut cursor, tag)? {
                        builder = builder.with_style(style);
                    }
                },
                _ => {},
            }
        }

        Ok(builder.build())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty() && self.document_run_defaults.is_none() && self.list_styles.is_none()
    }

    pub fn get(&self, id: &str) -> Option<&StyleDefinition> {
        self.styles.get(id)
    }

    /// The default style of a kind (`w:default="1"`).
    pub fn default_style(&self, kind: StyleKind) -> Option<&StyleDefinition> {
        self.styles
            .values()
            .find(|style| style.kind == kind && style.is_default)
    }

    /// Display name of a style, if it has one.
    pub fn style_name(&self, id: &str) -> Option<&str> {
        self.get(id).and_then(StyleDefinition::name)
    }

    pub fn document_run_defaults(&self) -> Option<&PropertySet> {
        self.document_run_defaults.as_ref()
    }

    pub fn document_paragraph_defaults(&self) -> Option<&PropertySet> {
        self.document_paragraph_defaults.as_ref()
    }

    pub fn list_styles(&self) -> Option<&ListStyles> {
        self.list_styles.as_ref()
    }

    /// The `basedOn` chain of a style, root first.
    ///
    /// Unknown bases end the chain; cycles are cut at the first repeated id.
    pub fn chain(&self, id: &str) -> Vec<&StyleDefinition> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.get(id);
        while let Some(style) = current {
            if !seen.insert(style.id.as_str()) {
                log::warn!("Style inheritance cycle through {}", style.id);
                break;
            }
            chain.push(style);
            current = style.based_on().and_then(|base| self.get(base));
        }
        chain.reverse();
        chain
    }

    fn paragraph_style_chain(&self, paragraph_style: Option<&str>) -> Vec<&StyleDefinition> {
        match paragraph_style.and_then(|id| self.get(id)) {
            Some(style) => self.chain(style.id()),
            None => self
                .default_style(StyleKind::Paragraph)
                .map(|style| self.chain(style.id()))
                .unwrap_or_default(),
        }
    }

    fn run_style_chain(&self, run_style: Option<&str>) -> Vec<&StyleDefinition> {
        match run_style.and_then(|id| self.get(id)) {
            Some(style) => self.chain(style.id()),
            None => self
                .default_style(StyleKind::Character)
                .map(|style| self.chain(style.id()))
                .unwrap_or_default(),
        }
    }

    /// Run properties a run inherits without any direct formatting.
    ///
    /// Layers, lowest first: document defaults, the paragraph style chain (or
    /// the default paragraph style), the run style chain (or the default
    /// character style). A later layer replaces a value from an earlier one.
    pub fn inherited_run_properties(
        &self,
        paragraph_style: Option<&str>,
        run_style: Option<&str>,
    ) -> EffectiveProperties {
        let mut effective = EffectiveProperties::new();
        if let Some(defaults) = &self.document_run_defaults {
            effective.overlay(defaults.properties(), &Provenance::DocumentDefaults);
        }
        for style in self.paragraph_style_chain(paragraph_style) {
            effective.overlay(
                style.run_properties.properties(),
                &Provenance::Style(style.id.clone()),
            );
        }
        for style in self.run_style_chain(run_style) {
            effective.overlay(
                style
                    .run_properties
                    .properties()
                    .iter()
                    .filter(|p| p.local_name() != "rStyle"),
                &Provenance::Style(style.id.clone()),
            );
        }
        effective
    }

    /// Run properties a run inherits in `context`: the list style defaults
    /// of its level in a DrawingML paragraph, its style layers otherwise.
    pub fn inherited_for(&self, context: StyleContext<'_>, run_style: Option<&str>) -> EffectiveProperties {
        let Some(level) = context.paragraph_level else {
            return self.inherited_run_properties(context.paragraph_style, run_style);
        };
        let mut effective = EffectiveProperties::new();
        if let Some(defaults) = self.list_styles.as_ref().and_then(|styles| styles.run_properties(level)) {
            // Level defaults carry the provenance of the level they were read from.
            for property in defaults.properties() {
                effective.overlay([property], property.provenance());
            }
        }
        effective
    }

    /// Whether anything is known about what runs in `context` inherit.
    pub fn knows_inheritance(&self, context: StyleContext<'_>) -> bool {
        match context.paragraph_level {
            Some(_) => self.list_styles.is_some(),
            None => true,
        }
    }

    /// Fully resolved run properties: inherited layers plus direct formatting.
    pub fn effective_run_properties(&self, context: StyleContext<'_>, direct: &PropertySet) -> EffectiveProperties {
        let mut effective = self.inherited_for(context, direct.style_id());
        effective.overlay(direct.properties(), &Provenance::Direct);
        effective
    }
}

/// Builder for [`StyleHierarchy`].
#[derive(Debug, Default)]
pub struct StyleHierarchyBuilder {
    hierarchy: StyleHierarchy,
}

impl StyleHierarchyBuilder {
    pub fn with_document_run_defaults(mut self, properties: PropertySet) -> Self {
        self.hierarchy.document_run_defaults = Some(properties);
        self
    }

    pub fn with_document_paragraph_defaults(mut self, properties: PropertySet) -> Self {
        self.hierarchy.document_paragraph_defaults = Some(properties);
        self
    }

    /// Adds DrawingML list styles, layered over any added before.
    pub fn with_list_styles(mut self, styles: ListStyles) -> Self {
        self.hierarchy.list_styles = Some(match self.hierarchy.list_styles.take() {
            Some(base) => base.merged_with(&styles),
            None => styles,
        });
        self
    }

    pub fn with_style(mut self, style: StyleDefinition) -> Self {
        self.hierarchy.styles.insert(style.id.clone(), style);
        self
    }

    pub fn build(self) -> StyleHierarchy {
        self.hierarchy
    }
}

fn read_document_defaults(
    cursor: &mut EventCursor<'_>,
    open: &StartTag,
    builder: &mut StyleHierarchyBuilder,
) -> Result<()> {
    loop {
        let event = cursor.next_within(open)?;
        match event {
            XmlEvent::End(end) if end.name() == open.name() => return Ok(()),
            XmlEvent::Start(tag) if tag.local_name() == "rPr" => {
                let events = cursor.take_subtree(tag)?;
                builder.hierarchy.document_run_defaults =
                    Some(PropertySet::from_events(&events, Provenance::DocumentDefaults));
            },
            XmlEvent::Start(tag) if tag.local_name() == "pPr" => {
                let events = cursor.take_subtree(tag)?;
                builder.hierarchy.document_paragraph_defaults =
                    Some(PropertySet::from_events(&events, Provenance::DocumentDefaults));
            },
            _ => {},
        }
    }
}

fn read_style(cursor: &mut EventCursor<'_>, open: &StartTag) -> Result<Option<StyleDefinition>> {
    let kind = open
        .attribute("type")
        .and_then(StyleKind::from_type_attr)
        .unwrap_or(StyleKind::Paragraph);
    let id = open.attribute("styleId").map(str::to_string);
    let is_default = open
        .attribute("default")
        .and_then(crate::classify::parse_bool)
        .unwrap_or(false);
    let mut style = StyleDefinition::new(id.clone().unwrap_or_default(), kind).with_default(is_default);

    loop {
        let event = cursor.next_within(open)?;
        match event {
            XmlEvent::End(end) if end.name() == open.name() => break,
            XmlEvent::Start(tag) => match tag.local_name() {
                "name" => {
                    if let Some(name) = tag.attribute("val") {
                        style.name = Some(name.to_string());
                    }
                    cursor.take_subtree(tag)?;
                },
                "basedOn" => {
                    style.based_on = tag.attribute("val").map(str::to_string);
                    cursor.take_subtree(tag)?;
                },
                "rPr" => {
                    let provenance = Provenance::Style(style.id.clone());
                    style.run_properties = PropertySet::from_events(&cursor.take_subtree(tag)?, provenance);
                },
                "pPr" => {
                    let provenance = Provenance::Style(style.id.clone());
                    style.paragraph_properties =
                        PropertySet::from_events(&cursor.take_subtree(tag)?, provenance);
                },
                _ => {
                    cursor.take_subtree(tag)?;
                },
            },
            _ => {},
        }
    }

    if id.is_none() {
        log::debug!("Skipping style without styleId");
    }
    Ok(id.map(|_| style))
}
