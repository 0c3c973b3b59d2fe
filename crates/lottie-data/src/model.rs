//! Serde model of a Lottie document.
//!
//! Only the parts of the format the player understands are typed; anything
//! else is skipped by serde. Layer and shape kinds the renderer does not draw
//! still deserialize (as `Shape::Unknown` or a layer with an unhandled `ty`) so
//! a document using them stays loadable.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

pub type Vec2 = [f32; 2];

/// Top-level composition.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LottieJson {
    #[serde(default)]
    pub v: Option<String>,
    #[serde(default)]
    pub nm: Option<String>,
    /// In point, in frames.
    pub ip: f32,
    /// Out point, in frames.
    pub op: f32,
    /// Frame rate.
    pub fr: f32,
    pub w: u32,
    pub h: u32,
    #[serde(default)]
    pub layers: Vec<Layer>,
}

/// Layer type codes as they appear in `ty`.
pub mod layer_type {
    pub const PRECOMP: u8 = 0;
    pub const SOLID: u8 = 1;
    pub const IMAGE: u8 = 2;
    pub const NULL: u8 = 3;
    pub const SHAPE: u8 = 4;
    pub const TEXT: u8 = 5;
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Layer {
    #[serde(default)]
    pub ty: u8,
    #[serde(default)]
    pub ind: Option<u32>,
    #[serde(default)]
    pub parent: Option<u32>,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub ip: f32,
    #[serde(default)]
    pub op: f32,
    #[serde(default)]
    pub st: f32,
    #[serde(default)]
    pub ks: Transform,
    #[serde(default)]
    pub hd: Option<bool>,

    // Solid
    #[serde(default, rename = "sc")]
    pub color: Option<String>,
    #[serde(default)]
    pub sw: Option<u32>,
    #[serde(default)]
    pub sh: Option<u32>,

    // Shape
    #[serde(default)]
    pub shapes: Option<Vec<Shape>>,
}

impl Layer {
    pub fn is_hidden(&self) -> bool {
        self.hd.unwrap_or(false)
    }

    /// Whether the layer is active at `frame` (in composition time).
    pub fn is_active_at(&self, frame: f32) -> bool {
        frame >= self.ip && frame < self.op
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Transform {
    /// Anchor point.
    #[serde(default)]
    pub a: Property<Vec<f32>>,
    #[serde(default)]
    pub p: PositionProperty,
    /// Scale in percent.
    #[serde(default)]
    pub s: Property<Vec<f32>>,
    /// Rotation in degrees.
    #[serde(default, alias = "r")]
    pub rz: Property<f32>,
    /// Opacity in percent.
    #[serde(default)]
    pub o: Property<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum PositionProperty {
    Split {
        x: Property<f32>,
        y: Property<f32>,
    },
    Unified(Property<Vec<f32>>),
}

impl Default for PositionProperty {
    fn default() -> Self {
        PositionProperty::Unified(Property::default())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "ty")]
pub enum Shape {
    #[serde(rename = "gr")]
    Group(GroupShape),
    #[serde(rename = "rc")]
    Rect(RectShape),
    #[serde(rename = "el")]
    Ellipse(EllipseShape),
    #[serde(rename = "sh")]
    Path(PathShape),
    #[serde(rename = "fl")]
    Fill(FillShape),
    #[serde(rename = "st")]
    Stroke(StrokeShape),
    #[serde(rename = "tr")]
    Transform(TransformShape),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GroupShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub it: Vec<Shape>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RectShape {
    #[serde(default)]
    pub nm: Option<String>,
    pub s: Property<Vec<f32>>,
    pub p: Property<Vec<f32>>,
    #[serde(default)]
    pub r: Property<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EllipseShape {
    #[serde(default)]
    pub nm: Option<String>,
    pub s: Property<Vec<f32>>,
    pub p: Property<Vec<f32>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PathShape {
    #[serde(default)]
    pub nm: Option<String>,
    pub ks: Property<BezierPath>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FillShape {
    #[serde(default)]
    pub nm: Option<String>,
    pub c: Property<Vec<f32>>,
    #[serde(default)]
    pub o: Property<f32>,
    /// Fill rule: 1 = non-zero, 2 = even-odd.
    #[serde(default)]
    pub r: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StrokeShape {
    #[serde(default)]
    pub nm: Option<String>,
    pub c: Property<Vec<f32>>,
    pub w: Property<f32>,
    #[serde(default)]
    pub o: Property<f32>,
    /// Line cap: 1 = butt, 2 = round, 3 = square.
    #[serde(default)]
    pub lc: u8,
    /// Line join: 1 = miter, 2 = round, 3 = bevel.
    #[serde(default)]
    pub lj: u8,
    #[serde(default)]
    pub ml: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransformShape {
    #[serde(flatten)]
    pub t: Transform,
}

/// A possibly animated value.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Property<T> {
    #[serde(default)]
    pub a: u8,
    #[serde(default)]
    #[serde(bound(deserialize = "T: DeserializeOwned"))]
    pub k: Value<T>,
    #[serde(default)]
    pub ix: Option<u32>,
}

impl<T> Default for Property<T> {
    fn default() -> Self {
        Property {
            a: 0,
            k: Value::Default,
            ix: None,
        }
    }
}

impl<T> Property<T> {
    pub fn fixed(value: T) -> Self {
        Property {
            a: 0,
            k: Value::Static(value),
            ix: None,
        }
    }

    pub fn is_animated(&self) -> bool {
        matches!(self.k, Value::Animated(_))
    }
}

#[derive(Debug, Serialize, Clone)]
pub enum Value<T> {
    Default,
    Static(T),
    Animated(Vec<Keyframe<T>>),
}

impl<T> Default for Value<T> {
    fn default() -> Self {
        Value::Default
    }
}

// `k` is either a keyframe list, a bare value, or a one-element array
// wrapping a bare value (common for scalars exported as `[100]`).
impl<'de, T: DeserializeOwned> Deserialize<'de> for Value<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = serde_json::Value::deserialize(deserializer)?;
        if raw.is_null() {
            return Ok(Value::Default);
        }

        let looks_keyframed = raw
            .as_array()
            .and_then(|items| items.first())
            .is_some_and(|first| first.get("t").is_some());
        if looks_keyframed {
            return serde_json::from_value::<Vec<Keyframe<T>>>(raw)
                .map(Value::Animated)
                .map_err(serde::de::Error::custom);
        }

        Ok(value_or_first(raw).map_or(Value::Default, Value::Static))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Keyframe<T> {
    pub t: f32,
    #[serde(default, deserialize_with = "keyframe_value")]
    pub s: Option<T>,
    #[serde(default, deserialize_with = "keyframe_value")]
    pub e: Option<T>,
    #[serde(default)]
    pub i: Option<BezierTangent>,
    #[serde(default)]
    pub o: Option<BezierTangent>,
    #[serde(default)]
    pub h: Option<u8>,
}

impl<T> Keyframe<T> {
    pub fn is_hold(&self) -> bool {
        self.h == Some(1)
    }
}

fn keyframe_value<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    if raw.is_null() {
        return Ok(None);
    }
    Ok(value_or_first(raw))
}

fn value_or_first<T: DeserializeOwned>(raw: serde_json::Value) -> Option<T> {
    if let Ok(value) = serde_json::from_value::<T>(raw.clone()) {
        return Some(value);
    }
    serde_json::from_value::<Vec<T>>(raw)
        .ok()
        .and_then(|items| items.into_iter().next())
}

/// Easing handle of a keyframe, e.g. `{"x": [0.33], "y": [0]}`.
///
/// Exporters write either arrays (one entry per dimension) or bare numbers.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BezierTangent {
    #[serde(deserialize_with = "number_or_list")]
    pub x: Vec<f32>,
    #[serde(deserialize_with = "number_or_list")]
    pub y: Vec<f32>,
}

fn number_or_list<'de, D>(deserializer: D) -> Result<Vec<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrList {
        One(f32),
        Many(Vec<f32>),
    }

    Ok(match NumberOrList::deserialize(deserializer)? {
        NumberOrList::One(v) => vec![v],
        NumberOrList::Many(v) => v,
    })
}

/// Cubic bezier outline: vertices with in/out tangents relative to them.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct BezierPath {
    #[serde(default)]
    pub c: bool,
    #[serde(default)]
    pub v: Vec<Vec2>,
    #[serde(default)]
    pub i: Vec<Vec2>,
    #[serde(default)]
    pub o: Vec<Vec2>,
}
