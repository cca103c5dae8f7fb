//! Graph data models.
//!
//! Defines the complete type system for the family-tree graph:
//!
//! ## Nodes
//! - [`Node`] — a person or a family (union), addressed by UUID
//! - [`PersonAttributes`] / [`FamilyAttributes`] — tagged attribute variants
//! - [`Position`] — canvas coordinates
//!
//! ## Edges
//! - [`Edge`] — a connection between two connectors
//! - [`EdgeKind`] — bloodline / hidden / fake / partnership semantics
//! - [`Connector`] — the named attachment points on each node kind

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Birth year assumed when a person has no parseable birth date.
///
/// Used only for ordering computations; stored data is never mutated.
pub const DEFAULT_BIRTH_YEAR: i32 = 1950;

/// Assumed years between a family's establishment and a child's birth,
/// and between a parent's birth and the family they found.
pub const GENERATION_GAP: i32 = 25;

// ============================================================================
// Position
// ============================================================================

/// A point on the canvas, in canvas units. Node positions are the
/// top-left corner of the node's box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// ============================================================================
// Connectors
// ============================================================================

/// A named attachment point on a node.
///
/// Person nodes carry `Parent`, `Child`, `PartnerLeft` and `PartnerRight`.
/// Family nodes carry `FamilyParentSide`, `FamilyChildSide` and one
/// dynamically allocated `FamilyChild(n)` slot per connected child.
///
/// The wire representation (REST `sourceHandle`/`targetHandle` fields and
/// sync payloads) is the camelCase name, with dynamic child slots encoded
/// as `familyChild-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connector {
    /// Links a person up to the family they are a child of.
    Parent,
    /// Links a person down to a family they are a parent in.
    Child,
    PartnerLeft,
    PartnerRight,
    /// The side of a family node that its parents attach to.
    FamilyParentSide,
    /// The side of a family node that its children attach to.
    FamilyChildSide,
    /// A per-child slot on a family node.
    FamilyChild(u32),
}

impl Connector {
    /// True for the spousal connectors on person nodes.
    pub fn is_partner(&self) -> bool {
        matches!(self, Self::PartnerLeft | Self::PartnerRight)
    }

    /// True for the descent connectors on person nodes.
    pub fn is_person_descent(&self) -> bool {
        matches!(self, Self::Parent | Self::Child)
    }

    /// True for any connector that lives on a family node.
    pub fn is_family_side(&self) -> bool {
        matches!(
            self,
            Self::FamilyParentSide | Self::FamilyChildSide | Self::FamilyChild(_)
        )
    }

    /// Which side of a family node this connector sits on, if any.
    pub fn family_side(&self) -> Option<FamilySide> {
        match self {
            Self::FamilyParentSide => Some(FamilySide::Parents),
            Self::FamilyChildSide | Self::FamilyChild(_) => Some(FamilySide::Children),
            _ => None,
        }
    }

    /// Whether this connector exists on the given node kind.
    pub fn belongs_to(&self, kind: NodeKind) -> bool {
        match kind {
            NodeKind::Person => !self.is_family_side(),
            NodeKind::Family => self.is_family_side(),
        }
    }
}

/// The two sides of a family node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FamilySide {
    Parents,
    Children,
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parent => write!(f, "parent"),
            Self::Child => write!(f, "child"),
            Self::PartnerLeft => write!(f, "partnerLeft"),
            Self::PartnerRight => write!(f, "partnerRight"),
            Self::FamilyParentSide => write!(f, "familyParentSide"),
            Self::FamilyChildSide => write!(f, "familyChildSide"),
            Self::FamilyChild(n) => write!(f, "familyChild-{}", n),
        }
    }
}

impl FromStr for Connector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parent" => Ok(Self::Parent),
            "child" => Ok(Self::Child),
            "partnerLeft" => Ok(Self::PartnerLeft),
            "partnerRight" => Ok(Self::PartnerRight),
            "familyParentSide" => Ok(Self::FamilyParentSide),
            "familyChildSide" => Ok(Self::FamilyChildSide),
            other => match other.strip_prefix("familyChild-") {
                Some(n) => n
                    .parse::<u32>()
                    .map(Self::FamilyChild)
                    .map_err(|_| format!("invalid child connector: {}", other)),
                None => Err(format!("unknown connector: {}", other)),
            },
        }
    }
}

impl Serialize for Connector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Connector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ConnectorVisitor;

        impl Visitor<'_> for ConnectorVisitor {
            type Value = Connector;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a connector name")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Connector, E> {
                Connector::from_str(v).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(ConnectorVisitor)
    }
}

// ============================================================================
// Edges
// ============================================================================

/// Semantic classification of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeKind {
    /// A descent connection on the traced line.
    Bloodline,
    /// A compensating, normally invisible descent connection that keeps
    /// the traced line unbroken after a partner demotion.
    HiddenBloodline,
    /// A descent connection drawn for display continuity from a
    /// partner-only person; excluded from ancestry ordering.
    FakeBloodline,
    /// A spousal connection.
    Partnership,
}

impl EdgeKind {
    /// Bloodline and HiddenBloodline edges both carry the traced line.
    pub fn is_effective(&self) -> bool {
        matches!(self, Self::Bloodline | Self::HiddenBloodline)
    }

    /// Edges that contribute to intra-cluster family placement.
    pub fn is_descent_visible(&self) -> bool {
        matches!(self, Self::Bloodline | Self::FakeBloodline)
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bloodline => write!(f, "bloodline"),
            Self::HiddenBloodline => write!(f, "hiddenBloodline"),
            Self::FakeBloodline => write!(f, "fakeBloodline"),
            Self::Partnership => write!(f, "partnership"),
        }
    }
}

/// A connection between two node connectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: Uuid,
    pub source: Uuid,
    pub target: Uuid,
    pub source_connector: Connector,
    pub target_connector: Connector,
    pub kind: EdgeKind,
}

impl Edge {
    /// Build a new edge with a fresh id.
    pub fn new(
        source: Uuid,
        target: Uuid,
        source_connector: Connector,
        target_connector: Connector,
        kind: EdgeKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            target,
            source_connector,
            target_connector,
            kind,
        }
    }

    /// The endpoint opposite to `node`, if `node` is an endpoint at all.
    pub fn other_endpoint(&self, node: Uuid) -> Option<Uuid> {
        if self.source == node {
            Some(self.target)
        } else if self.target == node {
            Some(self.source)
        } else {
            None
        }
    }

    /// The connector this edge uses on `node`, if `node` is an endpoint.
    pub fn connector_on(&self, node: Uuid) -> Option<Connector> {
        if self.source == node {
            Some(self.source_connector)
        } else if self.target == node {
            Some(self.target_connector)
        } else {
            None
        }
    }

    pub fn touches(&self, node: Uuid) -> bool {
        self.source == node || self.target == node
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// Discriminant of the two node variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Person,
    Family,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Person => write!(f, "person"),
            Self::Family => write!(f, "family"),
        }
    }
}

/// Postal address fields shared by both node variants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Attributes of a person node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonAttributes {
    pub name: String,
    #[serde(default)]
    pub surname: String,
    /// ISO date string (`YYYY-MM-DD`) or a bare year; free-form input is
    /// tolerated and falls back to [`DEFAULT_BIRTH_YEAR`] for ordering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub death_date: Option<String>,
    #[serde(default)]
    pub address: Address,
    /// Whether this person sits on the traced line of descent.
    pub on_bloodline: bool,
    /// Connectors the user has switched off for this node.
    #[serde(default, skip_serializing_if = "HashSet::is_empty")]
    pub disabled_connectors: HashSet<Connector>,
}

impl PersonAttributes {
    /// A minimal on-bloodline person, used pervasively in tests.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            surname: String::new(),
            birth_date: None,
            death_date: None,
            address: Address::default(),
            on_bloodline: true,
            disabled_connectors: HashSet::new(),
        }
    }

    /// Same person with a birth date set.
    pub fn with_birth_date(mut self, date: impl Into<String>) -> Self {
        self.birth_date = Some(date.into());
        self
    }
}

/// Attributes of a family (union) node.
///
/// A family node is always considered on-bloodline: it represents the
/// union itself, not a descent choice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FamilyAttributes {
    #[serde(default)]
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub establishment_year: Option<i32>,
    #[serde(default)]
    pub address: Address,
}

/// The per-kind attribute payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeAttributes {
    Person(PersonAttributes),
    Family(FamilyAttributes),
}

impl NodeAttributes {
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Person(_) => NodeKind::Person,
            Self::Family(_) => NodeKind::Family,
        }
    }
}

/// A node in the family-tree graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: Uuid,
    pub position: Position,
    pub attributes: NodeAttributes,
}

impl Node {
    /// Build a person node with a fresh id.
    pub fn person(attributes: PersonAttributes, position: Position) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            attributes: NodeAttributes::Person(attributes),
        }
    }

    /// Build a family node with a fresh id.
    pub fn family(attributes: FamilyAttributes, position: Position) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            attributes: NodeAttributes::Family(attributes),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.attributes.kind()
    }

    pub fn as_person(&self) -> Option<&PersonAttributes> {
        match &self.attributes {
            NodeAttributes::Person(p) => Some(p),
            NodeAttributes::Family(_) => None,
        }
    }

    pub fn as_family(&self) -> Option<&FamilyAttributes> {
        match &self.attributes {
            NodeAttributes::Family(f) => Some(f),
            NodeAttributes::Person(_) => None,
        }
    }

    /// Whether this node carries the traced line. Family nodes always do.
    pub fn on_bloodline(&self) -> bool {
        match &self.attributes {
            NodeAttributes::Person(p) => p.on_bloodline,
            NodeAttributes::Family(_) => true,
        }
    }

    /// The birth year used for ordering computations.
    ///
    /// Parses the leading year of the person's birth date, falling back to
    /// [`DEFAULT_BIRTH_YEAR`]. Family nodes order by their establishment
    /// year with the same fallback.
    pub fn birth_year(&self) -> i32 {
        match &self.attributes {
            NodeAttributes::Person(p) => p
                .birth_date
                .as_deref()
                .and_then(parse_year)
                .unwrap_or(DEFAULT_BIRTH_YEAR),
            NodeAttributes::Family(f) => f.establishment_year.unwrap_or(DEFAULT_BIRTH_YEAR),
        }
    }
}

/// Extract the year from a date string.
///
/// Accepts full ISO dates and anything starting with a 4-digit year.
pub fn parse_year(date: &str) -> Option<i32> {
    let trimmed = date.trim();
    if let Ok(parsed) = chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        use chrono::Datelike;
        return Some(parsed.year());
    }
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() == 4 {
        digits.parse().ok()
    } else {
        None
    }
}

// ============================================================================
// Tests
// ============================================================================
