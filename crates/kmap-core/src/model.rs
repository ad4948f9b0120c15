//! Core data model for knowledge-map documents.
//!
//! A document is a flat list of concept nodes (optionally nested through a
//! `parent` pointer) and a flat list of relation edges between them. Both
//! lists together form a [`Snapshot`] — the whole document at one instant.
//! Style attributes are stored inline on every element, already resolved
//! to concrete values, so a snapshot can be redrawn without a style cascade.

use crate::id::ElementId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ─── Style values ────────────────────────────────────────────────────────

/// A single style attribute value. Persisted untagged: `"#666"` or `2`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    Text(String),
    Number(f64),
}

/// Largest magnitude below which every whole `f64` is an exact integer.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

impl Serialize for StyleValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StyleValue::Text(s) => serializer.serialize_str(s),
            // Whole numbers are written as `2`, not `2.0`.
            StyleValue::Number(n) if n.fract() == 0.0 && n.abs() < MAX_EXACT_INT => {
                serializer.serialize_i64(*n as i64)
            }
            StyleValue::Number(n) => serializer.serialize_f64(*n),
        }
    }
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleValue::Text(s) => f.write_str(s),
            StyleValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for StyleValue {
    fn from(s: &str) -> Self {
        StyleValue::Text(s.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(s: String) -> Self {
        StyleValue::Text(s)
    }
}

impl From<f64> for StyleValue {
    fn from(n: f64) -> Self {
        StyleValue::Number(n)
    }
}

impl From<u32> for StyleValue {
    fn from(n: u32) -> Self {
        StyleValue::Number(f64::from(n))
    }
}

// ─── Element kinds & style properties ────────────────────────────────────

/// Which collection an element lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Node,
    Edge,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ElementKind::Node => "node",
            ElementKind::Edge => "edge",
        })
    }
}

/// Every restylable attribute, named as it is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleProperty {
    BackgroundColor,
    Shape,
    BorderColor,
    BorderWidth,
    Width,
    Height,
    Padding,
    LineColor,
    ArrowShape,
    EdgeWidth,
    CurveStyle,
}

impl StyleProperty {
    pub const ALL: [StyleProperty; 11] = [
        StyleProperty::BackgroundColor,
        StyleProperty::Shape,
        StyleProperty::BorderColor,
        StyleProperty::BorderWidth,
        StyleProperty::Width,
        StyleProperty::Height,
        StyleProperty::Padding,
        StyleProperty::LineColor,
        StyleProperty::ArrowShape,
        StyleProperty::EdgeWidth,
        StyleProperty::CurveStyle,
    ];

    /// The persisted (camelCase) attribute name.
    pub fn as_str(self) -> &'static str {
        match self {
            StyleProperty::BackgroundColor => "backgroundColor",
            StyleProperty::Shape => "shape",
            StyleProperty::BorderColor => "borderColor",
            StyleProperty::BorderWidth => "borderWidth",
            StyleProperty::Width => "width",
            StyleProperty::Height => "height",
            StyleProperty::Padding => "padding",
            StyleProperty::LineColor => "lineColor",
            StyleProperty::ArrowShape => "arrowShape",
            StyleProperty::EdgeWidth => "edgeWidth",
            StyleProperty::CurveStyle => "curveStyle",
        }
    }

    /// The element kind that carries this attribute.
    pub fn applies_to(self) -> ElementKind {
        match self {
            StyleProperty::LineColor
            | StyleProperty::ArrowShape
            | StyleProperty::EdgeWidth
            | StyleProperty::CurveStyle => ElementKind::Edge,
            _ => ElementKind::Node,
        }
    }
}

impl fmt::Display for StyleProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown style property `{0}`")]
pub struct ParseStylePropertyError(pub String);

impl FromStr for StyleProperty {
    type Err = ParseStylePropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StyleProperty::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ParseStylePropertyError(s.to_string()))
    }
}

// ─── Edge direction ──────────────────────────────────────────────────────

/// Which end(s) of a relation carry an arrow head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    None,
    #[default]
    SourceToTarget,
    TargetToSource,
    Both,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::None => "none",
            Direction::SourceToTarget => "source-to-target",
            Direction::TargetToSource => "target-to-source",
            Direction::Both => "both",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown edge direction `{0}`")]
pub struct ParseDirectionError(pub String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Direction::None),
            "source-to-target" => Ok(Direction::SourceToTarget),
            "target-to-source" => Ok(Direction::TargetToSource),
            "both" => Ok(Direction::Both),
            other => Err(ParseDirectionError(other.to_string())),
        }
    }
}

/// Older records either omit `direction` or store `null`; both backfill
/// to the default.
fn direction_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<Direction, D::Error> {
    Ok(Option::<Direction>::deserialize(d)?.unwrap_or_default())
}

// ─── Styles ──────────────────────────────────────────────────────────────

pub const DEFAULT_NODE_BACKGROUND_COLOR: &str = "#666";
pub const DEFAULT_NODE_SHAPE: &str = "round-rectangle";
pub const DEFAULT_NODE_BORDER_COLOR: &str = "#000";
pub const DEFAULT_NODE_BORDER_WIDTH: f64 = 2.0;
pub const DEFAULT_NODE_WIDTH: &str = "label";
pub const DEFAULT_NODE_HEIGHT: &str = "label";
pub const DEFAULT_NODE_PADDING: &str = "10px";

pub const DEFAULT_EDGE_LINE_COLOR: &str = "#ccc";
pub const DEFAULT_EDGE_ARROW_SHAPE: &str = "triangle";
pub const DEFAULT_EDGE_WIDTH: f64 = 3.0;
pub const DEFAULT_EDGE_CURVE_STYLE: &str = "bezier";

/// Visual attributes of a concept node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeStyle {
    pub background_color: StyleValue,
    pub shape: StyleValue,
    pub border_color: StyleValue,
    pub border_width: StyleValue,
    pub width: StyleValue,
    pub height: StyleValue,
    pub padding: StyleValue,
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            background_color: DEFAULT_NODE_BACKGROUND_COLOR.into(),
            shape: DEFAULT_NODE_SHAPE.into(),
            border_color: DEFAULT_NODE_BORDER_COLOR.into(),
            border_width: DEFAULT_NODE_BORDER_WIDTH.into(),
            width: DEFAULT_NODE_WIDTH.into(),
            height: DEFAULT_NODE_HEIGHT.into(),
            padding: DEFAULT_NODE_PADDING.into(),
        }
    }
}

impl NodeStyle {
    /// The slot for `property`, or `None` for edge-only attributes.
    pub fn slot_mut(&mut self, property: StyleProperty) -> Option<&mut StyleValue> {
        match property {
            StyleProperty::BackgroundColor => Some(&mut self.background_color),
            StyleProperty::Shape => Some(&mut self.shape),
            StyleProperty::BorderColor => Some(&mut self.border_color),
            StyleProperty::BorderWidth => Some(&mut self.border_width),
            StyleProperty::Width => Some(&mut self.width),
            StyleProperty::Height => Some(&mut self.height),
            StyleProperty::Padding => Some(&mut self.padding),
            _ => None,
        }
    }
}

/// Visual attributes of a relation edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EdgeStyle {
    pub line_color: StyleValue,
    pub arrow_shape: StyleValue,
    pub edge_width: StyleValue,
    pub curve_style: StyleValue,
}

impl Default for EdgeStyle {
    fn default() -> Self {
        Self {
            line_color: DEFAULT_EDGE_LINE_COLOR.into(),
            arrow_shape: DEFAULT_EDGE_ARROW_SHAPE.into(),
            edge_width: DEFAULT_EDGE_WIDTH.into(),
            curve_style: DEFAULT_EDGE_CURVE_STYLE.into(),
        }
    }
}

impl EdgeStyle {
    /// The slot for `property`, or `None` for node-only attributes.
    pub fn slot_mut(&mut self, property: StyleProperty) -> Option<&mut StyleValue> {
        match property {
            StyleProperty::LineColor => Some(&mut self.line_color),
            StyleProperty::ArrowShape => Some(&mut self.arrow_shape),
            StyleProperty::EdgeWidth => Some(&mut self.edge_width),
            StyleProperty::CurveStyle => Some(&mut self.curve_style),
            _ => None,
        }
    }
}

// ─── Elements ────────────────────────────────────────────────────────────

/// A concept in the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: ElementId,

    /// Display label.
    #[serde(default)]
    pub name: String,

    /// Enclosing node, if this concept is nested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ElementId>,

    #[serde(flatten)]
    pub style: NodeStyle,
}

impl Node {
    pub fn new(id: ElementId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            style: NodeStyle::default(),
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: ElementId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// A relation between two concepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: ElementId,
    pub source: ElementId,
    pub target: ElementId,

    #[serde(default)]
    pub label: String,

    #[serde(default, deserialize_with = "direction_or_default")]
    pub direction: Direction,

    #[serde(flatten)]
    pub style: EdgeStyle,
}

impl Edge {
    pub fn new(
        id: ElementId,
        source: ElementId,
        target: ElementId,
        label: impl Into<String>,
        direction: Direction,
    ) -> Self {
        Self {
            id,
            source,
            target,
            label: label.into(),
            direction,
            style: EdgeStyle::default(),
        }
    }

    /// True if `node` is either endpoint.
    pub fn touches(&self, node: ElementId) -> bool {
        self.source == node || self.target == node
    }
}

/// Full payload of one element, as handed to selection consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ElementData {
    Node(Node),
    Edge(Edge),
}

impl ElementData {
    pub fn id(&self) -> ElementId {
        match self {
            ElementData::Node(n) => n.id,
            ElementData::Edge(e) => e.id,
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            ElementData::Node(_) => ElementKind::Node,
            ElementData::Edge(_) => ElementKind::Edge,
        }
    }
}

// ─── Snapshot ────────────────────────────────────────────────────────────

/// The whole document at one instant.
///
/// Snapshots own all of their data; cloning one yields a fully independent
/// structural copy, so published and historized snapshots never alias.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Snapshot {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn node(&self, id: ElementId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: ElementId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn has_node(&self, id: ElementId) -> bool {
        self.node(id).is_some()
    }

    /// Resolve an id against both collections, nodes first.
    pub fn element(&self, id: ElementId) -> Option<ElementData> {
        if let Some(node) = self.node(id) {
            return Some(ElementData::Node(node.clone()));
        }
        self.edge(id).map(|e| ElementData::Edge(e.clone()))
    }

    /// Edges with `node` as source or target.
    pub fn edges_touching(&self, node: ElementId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.touches(node))
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}
