//! Style hierarchy, run properties and style optimisation.

pub mod hierarchy;
pub mod list;
pub mod optimizer;
pub mod property;

pub use hierarchy::{StyleDefinition, StyleHierarchy, StyleHierarchyBuilder, StyleKind};
pub use list::ListStyles;
pub use optimizer::{BypassOptimizer, DefaultOptimizer, StyleContext, StyleOptimizer, optimizer_for};
pub use property::{
    BlockProperties, EffectiveProperties, EffectiveProperty, Property, PropertyForm, PropertySet,
    PropertyValue, Provenance, RunProperties,
};
