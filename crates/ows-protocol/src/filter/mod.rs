//! FES 2.0 filter predicate tree.
//!
//! A [`Filter`] holds at most one logical operator plus lists of comparison
//! and spatial predicates and resource identifiers. Filters are read from
//! and written to XML in [`xml`], and from the GetFeature KVP shorthands in
//! [`kvp`].

pub mod kvp;
pub mod sort;
pub mod xml;

use serde::{Deserialize, Serialize};

use ows_common::{Attr, BoundingBox};

pub use kvp::{selection_from_kvp, selection_to_kvp, SelectionClause};
pub use sort::{SortBy, SortOrder, SortProperty};

/// A filter, or one operand of a logical operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub logical: Option<LogicalOperator>,
    pub comparisons: Vec<ComparisonOperator>,
    pub spatials: Vec<SpatialOperator>,
    pub resource_ids: Vec<ResourceId>,
    /// Namespace declarations found inside the filter, written back on the
    /// `fes:Filter` element. Always empty on operands.
    #[serde(default)]
    pub namespaces: Vec<Attr>,
}

impl Filter {
    /// Filter selecting the given resources.
    pub fn from_resource_ids(resource_ids: Vec<ResourceId>) -> Self {
        Self {
            resource_ids,
            ..Default::default()
        }
    }

    /// Filter with a single BBOX predicate on the default geometry.
    pub fn from_bbox(envelope: BoundingBox) -> Self {
        Self {
            spatials: vec![SpatialOperator::BBox {
                value_reference: None,
                envelope,
            }],
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.logical.is_none()
            && self.comparisons.is_empty()
            && self.spatials.is_empty()
            && self.resource_ids.is_empty()
    }

    /// Whether the filter selects by resource identifiers only.
    pub fn is_resource_ids_only(&self) -> bool {
        !self.resource_ids.is_empty()
            && self.logical.is_none()
            && self.comparisons.is_empty()
            && self.spatials.is_empty()
    }

    /// The envelope when the filter is nothing but a BBOX on the default
    /// geometry.
    pub fn as_plain_bbox(&self) -> Option<&BoundingBox> {
        if self.logical.is_some() || !self.comparisons.is_empty() || !self.resource_ids.is_empty()
        {
            return None;
        }
        match self.spatials.as_slice() {
            [SpatialOperator::BBox {
                value_reference: None,
                envelope,
            }] => Some(envelope),
            _ => None,
        }
    }

    /// Number of predicates directly in this filter, a logical operator
    /// counting as one.
    pub fn predicate_count(&self) -> usize {
        usize::from(self.logical.is_some())
            + self.comparisons.len()
            + self.spatials.len()
            + self.resource_ids.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogicalOperator {
    /// Two or more operands.
    And(Vec<Filter>),
    /// Two or more operands.
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl LogicalOperator {
    pub fn element_name(&self) -> &'static str {
        match self {
            LogicalOperator::And(_) => "And",
            LogicalOperator::Or(_) => "Or",
            LogicalOperator::Not(_) => "Not",
        }
    }
}

/// A value reference (property path) or a literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expression {
    ValueReference(String),
    Literal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryComparisonKind {
    EqualTo,
    NotEqualTo,
    LessThan,
    GreaterThan,
    LessThanOrEqualTo,
    GreaterThanOrEqualTo,
}

impl BinaryComparisonKind {
    pub const ALL: [BinaryComparisonKind; 6] = [
        BinaryComparisonKind::EqualTo,
        BinaryComparisonKind::NotEqualTo,
        BinaryComparisonKind::LessThan,
        BinaryComparisonKind::GreaterThan,
        BinaryComparisonKind::LessThanOrEqualTo,
        BinaryComparisonKind::GreaterThanOrEqualTo,
    ];

    pub fn element_name(&self) -> &'static str {
        match self {
            BinaryComparisonKind::EqualTo => "PropertyIsEqualTo",
            BinaryComparisonKind::NotEqualTo => "PropertyIsNotEqualTo",
            BinaryComparisonKind::LessThan => "PropertyIsLessThan",
            BinaryComparisonKind::GreaterThan => "PropertyIsGreaterThan",
            BinaryComparisonKind::LessThanOrEqualTo => "PropertyIsLessThanOrEqualTo",
            BinaryComparisonKind::GreaterThanOrEqualTo => "PropertyIsGreaterThanOrEqualTo",
        }
    }

    pub fn from_element_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.element_name() == name)
    }
}

/// How a comparison treats multi-valued properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchAction {
    All,
    Any,
    One,
}

impl MatchAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchAction::All => "All",
            MatchAction::Any => "Any",
            MatchAction::One => "One",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "All" => Some(MatchAction::All),
            "Any" => Some(MatchAction::Any),
            "One" => Some(MatchAction::One),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    Binary {
        kind: BinaryComparisonKind,
        left: Expression,
        right: Expression,
        match_case: Option<bool>,
        match_action: Option<MatchAction>,
    },
    Like {
        expression: Expression,
        pattern: Expression,
        wild_card: String,
        single_char: String,
        escape_char: String,
        match_case: Option<bool>,
    },
    Nil {
        expression: Expression,
        nil_reason: Option<String>,
    },
    Null {
        expression: Expression,
    },
    Between {
        expression: Expression,
        lower: Expression,
        upper: Expression,
    },
}

impl ComparisonOperator {
    pub fn element_name(&self) -> &'static str {
        match self {
            ComparisonOperator::Binary { kind, .. } => kind.element_name(),
            ComparisonOperator::Like { .. } => "PropertyIsLike",
            ComparisonOperator::Nil { .. } => "PropertyIsNil",
            ComparisonOperator::Null { .. } => "PropertyIsNull",
            ComparisonOperator::Between { .. } => "PropertyIsBetween",
        }
    }
}

/// Geometry operand, kept as serialized GML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry(pub String);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distance {
    pub value: f64,
    pub uom: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpatialKind {
    Equals,
    Disjoint,
    Touches,
    Within,
    Overlaps,
    Crosses,
    Intersects,
    Contains,
}

impl SpatialKind {
    pub const ALL: [SpatialKind; 8] = [
        SpatialKind::Equals,
        SpatialKind::Disjoint,
        SpatialKind::Touches,
        SpatialKind::Within,
        SpatialKind::Overlaps,
        SpatialKind::Crosses,
        SpatialKind::Intersects,
        SpatialKind::Contains,
    ];

    pub fn element_name(&self) -> &'static str {
        match self {
            SpatialKind::Equals => "Equals",
            SpatialKind::Disjoint => "Disjoint",
            SpatialKind::Touches => "Touches",
            SpatialKind::Within => "Within",
            SpatialKind::Overlaps => "Overlaps",
            SpatialKind::Crosses => "Crosses",
            SpatialKind::Intersects => "Intersects",
            SpatialKind::Contains => "Contains",
        }
    }

    pub fn from_element_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.element_name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceKind {
    DWithin,
    Beyond,
}

impl DistanceKind {
    pub fn element_name(&self) -> &'static str {
        match self {
            DistanceKind::DWithin => "DWithin",
            DistanceKind::Beyond => "Beyond",
        }
    }

    pub fn from_element_name(name: &str) -> Option<Self> {
        match name {
            "DWithin" => Some(DistanceKind::DWithin),
            "Beyond" => Some(DistanceKind::Beyond),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpatialOperator {
    BBox {
        value_reference: Option<String>,
        envelope: BoundingBox,
    },
    Binary {
        kind: SpatialKind,
        value_reference: Option<String>,
        geometry: Geometry,
    },
    Distance {
        kind: DistanceKind,
        value_reference: Option<String>,
        geometry: Geometry,
        distance: Distance,
    },
}

impl SpatialOperator {
    pub fn element_name(&self) -> &'static str {
        match self {
            SpatialOperator::BBox { .. } => "BBOX",
            SpatialOperator::Binary { kind, .. } => kind.element_name(),
            SpatialOperator::Distance { kind, .. } => kind.element_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    pub rid: String,
}

impl ResourceId {
    pub fn new(rid: impl Into<String>) -> Self {
        Self { rid: rid.into() }
    }
}

/// Concatenate resource id groups.
///
/// Order inside and across groups is kept, and so are duplicates.
pub fn merge_resource_ids<I>(groups: I) -> Vec<ResourceId>
where
    I: IntoIterator<Item = Vec<ResourceId>>,
{
    groups.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rids(ids: &[&str]) -> Vec<ResourceId> {
        ids.iter().map(|id| ResourceId::new(*id)).collect()
    }

    #[test]
    fn test_merge_concatenates_groups() {
        let merged = merge_resource_ids(vec![rids(&["A"]), rids(&["B", "C"])]);
        assert_eq!(merged, rids(&["A", "B", "C"]));
    }

    #[test]
    fn test_merge_keeps_duplicates() {
        let merged = merge_resource_ids(vec![rids(&["A"]), rids(&["A"])]);
        assert_eq!(merged, rids(&["A", "A"]));
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge_resource_ids(Vec::<Vec<ResourceId>>::new()).is_empty());
    }

    #[test]
    fn test_plain_bbox_detection() {
        let filter = Filter::from_bbox(BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        assert!(filter.as_plain_bbox().is_some());

        let mut with_reference = filter.clone();
        with_reference.spatials = vec![SpatialOperator::BBox {
            value_reference: Some("geom".to_string()),
            envelope: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
        }];
        assert!(with_reference.as_plain_bbox().is_none());

        let mut with_rid = filter;
        with_rid.resource_ids.push(ResourceId::new("a"));
        assert!(with_rid.as_plain_bbox().is_none());
    }

    #[test]
    fn test_element_names_round_trip() {
        for kind in BinaryComparisonKind::ALL {
            assert_eq!(BinaryComparisonKind::from_element_name(kind.element_name()), Some(kind));
        }
        for kind in SpatialKind::ALL {
            assert_eq!(SpatialKind::from_element_name(kind.element_name()), Some(kind));
        }
        assert_eq!(DistanceKind::from_element_name("Beyond"), Some(DistanceKind::Beyond));
        assert_eq!(SpatialKind::from_element_name("BBOX"), None);
    }

    #[test]
    fn test_empty_filter() {
        assert!(Filter::default().is_empty());
        assert!(!Filter::from_resource_ids(rids(&["a"])).is_empty());
        assert!(Filter::from_resource_ids(rids(&["a"])).is_resource_ids_only());
    }
}
