//! Semantic classes and dynamic/static classification.
//!
//! Two kinds of evidence carry semantics: LiDAR points carry an integer class
//! ID from the segmentation labels, and 3D boxes carry a dot-separated
//! category name. Both map onto the same question: does this evidence belong
//! to something that moves?

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Per-point semantic class ID (one byte per point in the label files).
pub type ClassId = u8;

// ============================================================================
// CLASS GROUPS
// ============================================================================

/// Disjoint groups the LiDAR segmentation classes fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassGroup {
    Vehicle,
    Human,
    Cycle,
    StaticBackground,
    MovableObject,
}

impl ClassGroup {
    /// Class IDs belonging to each group.
    pub fn members(self) -> &'static [ClassId] {
        match self {
            ClassGroup::Vehicle => &[17, 18, 19, 20, 21, 22, 23],
            ClassGroup::Human => &[2, 3, 4, 5, 6, 7],
            ClassGroup::Cycle => &[14, 15, 16],
            ClassGroup::StaticBackground => &[1, 8, 9, 10, 11, 12, 13],
            ClassGroup::MovableObject => &[24, 25, 26, 27, 28, 29, 30, 31],
        }
    }

    /// Group of a class ID; `None` for IDs outside every group (e.g. 0, noise).
    pub fn of(class: ClassId) -> Option<ClassGroup> {
        [
            ClassGroup::Vehicle,
            ClassGroup::Human,
            ClassGroup::Cycle,
            ClassGroup::StaticBackground,
            ClassGroup::MovableObject,
        ]
        .into_iter()
        .find(|group| group.members().contains(&class))
    }
}

/// The set of class IDs treated as dynamic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicClasses(BTreeSet<ClassId>);

impl DynamicClasses {
    /// Uses exactly the given IDs.
    pub fn from_ids(ids: impl IntoIterator<Item = ClassId>) -> Self {
        Self(ids.into_iter().collect())
    }

    /// Union of the members of the given groups.
    pub fn from_groups(groups: &[ClassGroup]) -> Self {
        Self::from_ids(groups.iter().flat_map(|g| g.members().iter().copied()))
    }

    pub fn contains(&self, class: ClassId) -> bool {
        self.0.contains(&class)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.0.iter().copied()
    }
}

impl Default for DynamicClasses {
    /// Vehicle, human and cycle classes.
    fn default() -> Self {
        Self::from_groups(&[ClassGroup::Vehicle, ClassGroup::Human, ClassGroup::Cycle])
    }
}

// ============================================================================
// CATEGORY CLASSIFIER (annotation names)
// ============================================================================

/// Motion tag assigned to an annotation category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionTag {
    Dynamic,
    Static,
    Unknown,
}

/// Maps category names to a `MotionTag` by prefix.
///
/// Dynamic prefixes are checked first, so a category matching both sets is
/// dynamic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryClassifier {
    dynamic_prefixes: Vec<String>,
    static_prefixes: Vec<String>,
}

impl CategoryClassifier {
    pub const DEFAULT_DYNAMIC_PREFIXES: [&'static str; 3] = ["vehicle.", "human.", "cycle."];
    pub const DEFAULT_STATIC_PREFIXES: [&'static str; 4] =
        ["movable_object.", "static_object.", "flat.", "static."];

    pub fn new(
        dynamic_prefixes: impl IntoIterator<Item = impl Into<String>>,
        static_prefixes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            dynamic_prefixes: dynamic_prefixes.into_iter().map(Into::into).collect(),
            static_prefixes: static_prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Default static prefixes with caller-supplied dynamic prefixes.
    pub fn with_dynamic_prefixes(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::new(prefixes, Self::DEFAULT_STATIC_PREFIXES)
    }

    pub fn classify(&self, category: &str) -> MotionTag {
        if self.dynamic_prefixes.iter().any(|p| category.starts_with(p.as_str())) {
            MotionTag::Dynamic
        } else if self.static_prefixes.iter().any(|p| category.starts_with(p.as_str())) {
            MotionTag::Static
        } else {
            MotionTag::Unknown
        }
    }

    pub fn is_dynamic(&self, category: &str) -> bool {
        self.classify(category) == MotionTag::Dynamic
    }

    pub fn dynamic_prefixes(&self) -> &[String] {
        &self.dynamic_prefixes
    }
}

impl Default for CategoryClassifier {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DYNAMIC_PREFIXES, Self::DEFAULT_STATIC_PREFIXES)
    }
}
