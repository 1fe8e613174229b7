//! Run property optimisation against the style hierarchy.
//!
//! Two optimisers exist. [`DefaultOptimizer`] resolves run properties through
//! the document's styles, so runs that look the same are recognised as equal
//! even when they reach that formatting through different styles.
//! [`BypassOptimizer`] only looks at direct formatting and never rewrites it.

use crate::options::ExtractionOptions;
use crate::styles::hierarchy::StyleHierarchy;
use crate::styles::property::{EffectiveProperties, Provenance, RunProperties};
use phf::phf_set;

/// Run properties that never change how text is rendered.
static RENDERING_NEUTRAL: phf::Set<&'static str> = phf_set! {
    "lang", "altLang", "dirty", "err", "smtClean", "noProof", "bmk",
};

/// What a run's formatting is resolved against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StyleContext<'a> {
    /// The containing paragraph's `pStyle`.
    pub paragraph_style: Option<&'a str>,
    /// Zero-based level of a DrawingML paragraph; `None` outside DrawingML.
    pub paragraph_level: Option<u8>,
}

impl<'a> StyleContext<'a> {
    pub fn new(paragraph_style: Option<&'a str>) -> Self {
        Self {
            paragraph_style,
            paragraph_level: None,
        }
    }

    /// Context of a DrawingML paragraph at `level`.
    pub fn drawing(level: u8) -> Self {
        Self {
            paragraph_style: None,
            paragraph_level: Some(level),
        }
    }

    pub fn with_paragraph_level(mut self, level: Option<u8>) -> Self {
        self.paragraph_level = level;
        self
    }

    /// DrawingML toggles are explicit overrides of inherited text defaults, so
    /// a disabled toggle is never the same as an absent one there.
    #[inline]
    pub fn off_is_absent(&self) -> bool {
        self.paragraph_level.is_none()
    }
}

/// Resolution and minimisation of run properties.
pub trait StyleOptimizer: std::fmt::Debug + Send + Sync {
    /// Fully resolved properties of a run.
    fn resolve(&self, properties: &RunProperties, context: StyleContext<'_>) -> EffectiveProperties;

    /// Drops explicit properties that restate what the run inherits.
    ///
    /// Must be idempotent.
    fn minimize(&self, properties: &RunProperties, context: StyleContext<'_>) -> RunProperties;

    /// Whether two runs render identically.
    ///
    /// Rendering-neutral properties such as `lang` are ignored, and outside
    /// DrawingML disabled toggles count as absent.
    fn effectively_equal(
        &self,
        left: &RunProperties,
        right: &RunProperties,
        context: StyleContext<'_>,
    ) -> bool {
        let left = self.resolve(left, context);
        let right = self.resolve(right, context);
        let off_is_absent = context.off_is_absent();
        left.rendering_values(&RENDERING_NEUTRAL, off_is_absent) == right.rendering_values(&RENDERING_NEUTRAL, off_is_absent)
    }
}

/// Optimiser used when style optimisation is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct BypassOptimizer;

impl StyleOptimizer for BypassOptimizer {
    fn resolve(&self, properties: &RunProperties, _context: StyleContext<'_>) -> EffectiveProperties {
        let mut effective = EffectiveProperties::new();
        effective.overlay(properties.properties(), &Provenance::Direct);
        effective
    }

    fn minimize(&self, properties: &RunProperties, _context: StyleContext<'_>) -> RunProperties {
        properties.clone()
    }

    /// Without the hierarchy, different style references cannot be proven equal.
    fn effectively_equal(
        &self,
        left: &RunProperties,
        right: &RunProperties,
        context: StyleContext<'_>,
    ) -> bool {
        let resolved_left = self.resolve(left, context);
        let resolved_right = self.resolve(right, context);
        let off_is_absent = context.off_is_absent();
        left.style_id() == right.style_id()
            && resolved_left.rendering_values(&RENDERING_NEUTRAL, off_is_absent)
                == resolved_right.rendering_values(&RENDERING_NEUTRAL, off_is_absent)
    }
}

/// Optimiser that resolves formatting through the style hierarchy.
#[derive(Debug, Clone, Copy)]
pub struct DefaultOptimizer<'a> {
    styles: &'a StyleHierarchy,
}

impl<'a> DefaultOptimizer<'a> {
    pub fn new(styles: &'a StyleHierarchy) -> Self {
        Self { styles }
    }
}

impl StyleOptimizer for DefaultOptimizer<'_> {
    fn resolve(&self, properties: &RunProperties, context: StyleContext<'_>) -> EffectiveProperties {
        self.styles.effective_run_properties(context, properties)
    }

    fn minimize(&self, properties: &RunProperties, context: StyleContext<'_>) -> RunProperties {
        let inherited = self.styles.inherited_for(context, properties.style_id());
        let off_is_absent = context.off_is_absent();
        let all = properties.properties();
        let keep: Vec<bool> = all
            .iter()
            .enumerate()
            .map(|(index, property)| {
                let local = property.local_name();
                if local == "rStyle" || property.is_complex() {
                    return true;
                }
                if all[index + 1..].iter().any(|later| later.local_name() == local) {
                    return false;
                }
                match inherited.value(local) {
                    Some(value) => value != property.value(),
                    None => !(off_is_absent && property.value().is_off()),
                }
            })
            .collect();

        let mut minimized = properties.clone();
        let mut flags = keep.into_iter();
        minimized.retain(|_| flags.next().unwrap_or(true));
        minimized
    }
}

/// Selects the optimiser once for a set of options.
pub fn optimizer_for<'a>(
    options: &ExtractionOptions,
    styles: &'a StyleHierarchy,
) -> Box<dyn StyleOptimizer + 'a> {
    if options.optimise_styles {
        Box::new(DefaultOptimizer::new(styles))
    } else {
        Box::new(BypassOptimizer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles::hierarchy::{StyleDefinition, StyleKind};
    use crate::styles::list::ListStyles;
    use crate::styles::property::{PropertySet, PropertyValue};
    use crate::xml::read_events;
    use proptest::prelude::*;

    fn props(xml: &str) -> RunProperties {
        PropertySet::from_events(&read_events(xml.as_bytes()).unwrap(), Provenance::Direct)
    }

    fn styles() -> StyleHierarchy {
        StyleHierarchy::builder()
            .with_document_run_defaults(props(r#"<w:rPr><w:sz w:val="22"/></w:rPr>"#))
            .with_style(
                StyleDefinition::new("RunStyle1", StyleKind::Character)
                    .with_run_properties(props(r#"<w:rPr><w:b/></w:rPr>"#)),
            )
            .with_style(
                StyleDefinition::new("RunStyle2", StyleKind::Character)
                    .with_run_properties(props(r#"<w:rPr><w:b w:val="1"/></w:rPr>"#)),
            )
            .build()
    }

    #[test]
    fn test_styles_resolving_to_same_formatting_are_equal() {
        let styles = styles();
        let optimizer = DefaultOptimizer::new(&styles);
        let one = props(r#"<w:rPr><w:rStyle w:val="RunStyle1"/></w:rPr>"#);
        let two = props(r#"<w:rPr><w:rStyle w:val="RunStyle2"/></w:rPr>"#);
        let direct = props(r#"<w:rPr><w:b/></w:rPr>"#);
        let context = StyleContext::default();
        assert!(optimizer.effectively_equal(&one, &two, context));
        assert!(optimizer.effectively_equal(&one, &direct, context));
        assert!(!BypassOptimizer.effectively_equal(&one, &two, context));
    }

    #[test]
    fn test_disabled_toggle_equals_absent() {
        let styles = styles();
        let optimizer = DefaultOptimizer::new(&styles);
        let off = props(r#"<w:rPr><w:i w:val="0"/></w:rPr>"#);
        let empty = props(r#"<w:rPr></w:rPr>"#);
        assert!(optimizer.effectively_equal(&off, &empty, StyleContext::default()));
        assert!(BypassOptimizer.effectively_equal(&off, &empty, StyleContext::default()));
    }

    #[test]
    fn test_neutral_properties_are_ignored() {
        let styles = StyleHierarchy::new();
        let optimizer = DefaultOptimizer::new(&styles);
        let en = props(r#"<a:rPr lang="en-US" b="1" dirty="0"/>"#);
        let de = props(r#"<a:rPr lang="de-DE" b="1"/>"#);
        assert!(optimizer.effectively_equal(&en, &de, StyleContext::default()));
    }

    #[test]
    fn test_drawing_off_toggle_is_explicit() {
        let styles = StyleHierarchy::new();
        let optimizer = DefaultOptimizer::new(&styles);
        let context = StyleContext::drawing(0);
        let off = props(r#"<a:rPr lang="en-US" b="0"/>"#);
        let plain = props(r#"<a:rPr lang="en-US"/>"#);
        assert!(!optimizer.effectively_equal(&off, &plain, context));
        assert!(!BypassOptimizer.effectively_equal(&off, &plain, context));
        assert!(optimizer.minimize(&off, context).value("b").is_some_and(PropertyValue::is_off));
    }

    #[test]
    fn test_drawing_level_defaults() {
        let list = ListStyles::from_xml(
            br#"<a:lstStyle><a:lvl1pPr><a:defRPr b="0"/></a:lvl1pPr><a:lvl2pPr><a:defRPr b="1"/></a:lvl2pPr></a:lstStyle>"#,
            "lstStyle",
        )
        .unwrap()
        .unwrap();
        let styles = StyleHierarchy::builder().with_list_styles(list).build();
        let optimizer = DefaultOptimizer::new(&styles);
        let off = props(r#"<a:rPr lang="en-US" b="0"/>"#);
        let plain = props(r#"<a:rPr lang="en-US"/>"#);

        // the first level is not bold, so the toggle restates it
        assert!(optimizer.effectively_equal(&off, &plain, StyleContext::drawing(0)));
        assert_eq!(optimizer.minimize(&off, StyleContext::drawing(0)).value("b"), None);
        // the second level is bold, so it overrides
        assert!(!optimizer.effectively_equal(&off, &plain, StyleContext::drawing(1)));
        assert!(optimizer.minimize(&off, StyleContext::drawing(1)).value("b").is_some());
    }

    #[test]
    fn test_minimize_drops_redundant_properties() {
        let styles = styles();
        let optimizer = DefaultOptimizer::new(&styles);
        let run = props(
            r#"<w:rPr><w:rStyle w:val="RunStyle1"/><w:b/><w:sz w:val="22"/><w:i w:val="0"/><w:color w:val="FF0000"/></w:rPr>"#,
        );
        let minimized = optimizer.minimize(&run, StyleContext::default());
        let names: Vec<&str> = minimized.properties().iter().map(|p| p.local_name()).collect();
        assert_eq!(names, ["rStyle", "color"]);
    }

    #[test]
    fn test_minimize_keeps_last_duplicate() {
        let styles = StyleHierarchy::new();
        let optimizer = DefaultOptimizer::new(&styles);
        let run = props(r#"<w:rPr><w:sz w:val="20"/><w:sz w:val="28"/></w:rPr>"#);
        let minimized = optimizer.minimize(&run, StyleContext::default());
        assert_eq!(minimized.len(), 1);
        assert_eq!(minimized.value("sz").and_then(|v| v.val()), Some("28"));
    }

    #[test]
    fn test_optimizer_selection() {
        let styles = styles();
        let run = props(r#"<w:rPr><w:b/></w:rPr>"#);
        let bypass = optimizer_for(&ExtractionOptions::new().with_optimise_styles(false), &styles);
        assert_eq!(bypass.minimize(&run, StyleContext::default()), run);
        let default = optimizer_for(&ExtractionOptions::new(), &styles);
        assert_eq!(default.resolve(&run, StyleContext::default()).len(), 2);
    }

    fn arbitrary_run_properties() -> impl Strategy<Value = String> {
        let property = prop_oneof![
            Just(r#"<w:b/>"#),
            Just(r#"<w:b w:val="0"/>"#),
            Just(r#"<w:i/>"#),
            Just(r#"<w:sz w:val="22"/>"#),
            Just(r#"<w:sz w:val="28"/>"#),
            Just(r#"<w:rStyle w:val="RunStyle1"/>"#),
            Just(r#"<w:color w:val="FF0000"/>"#),
            Just(r#"<w:shd w:val="clear"><w:extra/></w:shd>"#),
        ];
        prop::collection::vec(property, 0..6).prop_map(|parts| format!("<w:rPr>{}</w:rPr>", parts.concat()))
    }

    proptest! {
        #[test]
        fn minimize_is_idempotent(xml in arbitrary_run_properties()) {
            let styles = styles();
            let optimizer = DefaultOptimizer::new(&styles);
            let context = StyleContext::default();
            let once = optimizer.minimize(&props(&xml), context);
            let twice = optimizer.minimize(&once, context);
            prop_assert_eq!(&once, &twice);
            prop_assert!(optimizer.effectively_equal(&once, &props(&xml), context));
        }
    }
}
