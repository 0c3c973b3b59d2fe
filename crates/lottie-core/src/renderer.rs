//! Backend-agnostic scene produced for one frame.

use glam::{Mat3, Vec4};
use kurbo::BezPath;

/// Scene for one frame, in composition coordinates.
#[derive(Debug, Clone)]
pub struct RenderTree {
    pub width: f32,
    pub height: f32,
    pub root: RenderNode,
}

impl RenderTree {
    pub fn empty(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            root: RenderNode::group(Mat3::IDENTITY, 1.0, Vec::new()),
        }
    }

    /// Number of shape nodes anywhere in the tree.
    pub fn shape_count(&self) -> usize {
        fn count(node: &RenderNode) -> usize {
            match &node.content {
                NodeContent::Shape(_) => 1,
                NodeContent::Group(children) => children.iter().map(count).sum(),
            }
        }
        count(&self.root)
    }
}

#[derive(Debug, Clone)]
pub struct RenderNode {
    /// Local transform, relative to the parent node.
    pub transform: Mat3,
    /// Opacity in `[0, 1]`, applied to the whole subtree.
    pub alpha: f32,
    pub content: NodeContent,
}

impl RenderNode {
    pub fn group(transform: Mat3, alpha: f32, children: Vec<RenderNode>) -> Self {
        Self {
            transform,
            alpha,
            content: NodeContent::Group(children),
        }
    }

    pub fn shape(geometry: BezPath, paint: ShapePaint) -> Self {
        Self {
            transform: Mat3::IDENTITY,
            alpha: 1.0,
            content: NodeContent::Shape(ShapeNode { geometry, paint }),
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeContent {
    /// Children in paint order, bottom first.
    Group(Vec<RenderNode>),
    Shape(ShapeNode),
}

#[derive(Debug, Clone)]
pub struct ShapeNode {
    pub geometry: BezPath,
    pub paint: ShapePaint,
}

#[derive(Debug, Clone)]
pub enum ShapePaint {
    Fill(Fill),
    Stroke(Stroke),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    /// Straight RGBA in `[0, 1]`.
    pub color: Vec4,
    pub opacity: f32,
    pub rule: FillRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
    NonZero,
    EvenOdd,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Vec4,
    pub width: f32,
    pub opacity: f32,
    pub cap: LineCap,
    pub join: LineJoin,
    pub miter_limit: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineJoin {
    Miter,
    Round,
    Bevel,
}

impl LineCap {
    pub fn from_code(code: u8) -> Self {
        match code {
            2 => LineCap::Round,
            3 => LineCap::Square,
            _ => LineCap::Butt,
        }
    }
}

impl LineJoin {
    pub fn from_code(code: u8) -> Self {
        match code {
            2 => LineJoin::Round,
            3 => LineJoin::Bevel,
            _ => LineJoin::Miter,
        }
    }
}
