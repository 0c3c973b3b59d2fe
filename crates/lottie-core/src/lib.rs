pub mod animatable;
pub mod renderer;

use animatable::Animator;
use glam::{Mat3, Vec2, Vec4};
use kurbo::{Affine, BezPath, Point, Shape as _};
use lottie_data::model::{self as data, layer_type, LottieJson};
pub use renderer::*;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::warn;

/// Flattening tolerance for primitive shapes, in composition units.
const PATH_TOLERANCE: f64 = 0.1;

/// Parent chains deeper than this are treated as cycles and cut.
const MAX_PARENT_DEPTH: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("invalid Lottie JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid composition: {0}")]
    InvalidComposition(&'static str),
}

pub fn layer_type_supported(ty: u8) -> bool {
    matches!(ty, layer_type::SOLID | layer_type::NULL | layer_type::SHAPE)
}

fn log_unsupported_layer_once(ty: u8, name: Option<&str>) {
    static UNSUPPORTED_LAYERS: OnceLock<Mutex<HashSet<u8>>> = OnceLock::new();
    let store = UNSUPPORTED_LAYERS.get_or_init(|| Mutex::new(HashSet::new()));
    if let Ok(mut seen) = store.lock() {
        if seen.insert(ty) {
            warn!(
                layer_type = ty,
                "Layer type {ty} ({}) is parsed but not rendered",
                name.unwrap_or("unnamed")
            );
        }
    }
}

/// Immutable, shared data for a Lottie animation.
#[derive(Debug)]
pub struct LottieAsset {
    pub model: LottieJson,
    pub width: f32,
    pub height: f32,
    pub duration_frames: f32,
    pub frame_rate: f32,
}

impl LottieAsset {
    /// Parses and validates a Lottie document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AssetError> {
        let model: LottieJson = serde_json::from_slice(bytes)?;
        Self::from_model(model)
    }

    pub fn from_model(model: LottieJson) -> Result<Self, AssetError> {
        if !(model.fr.is_finite() && model.fr > 0.0) {
            return Err(AssetError::InvalidComposition("frame rate must be positive"));
        }
        if !(model.ip.is_finite() && model.op.is_finite() && model.op > model.ip) {
            return Err(AssetError::InvalidComposition("out point must follow in point"));
        }
        if model.w == 0 || model.h == 0 {
            return Err(AssetError::InvalidComposition("composition has no area"));
        }
        let duration_frames = model.op - model.ip;
        if !(duration_frames / model.fr).is_finite() {
            return Err(AssetError::InvalidComposition("duration is not finite"));
        }

        Ok(Self {
            width: model.w as f32,
            height: model.h as f32,
            duration_frames,
            frame_rate: model.fr,
            model,
        })
    }

    /// Duration of one loop in seconds.
    pub fn duration_secs(&self) -> f32 {
        self.duration_frames / self.frame_rate
    }
}

pub struct LottiePlayer {
    pub asset: Option<Arc<LottieAsset>>,
    pub current_frame: f32,
}

impl Default for LottiePlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl LottiePlayer {
    pub fn new() -> Self {
        Self {
            asset: None,
            current_frame: 0.0,
        }
    }

    pub fn load(&mut self, asset: Arc<LottieAsset>) {
        self.current_frame = asset.model.ip;
        self.asset = Some(asset);
    }

    /// Moves the playhead to `seconds` after the in point.
    ///
    /// The playhead never reaches the out point itself: layers are active on
    /// `[ip, op)`, so the last drawable frame sits just before it.
    pub fn seek_time(&mut self, seconds: f32) {
        if let Some(asset) = &self.asset {
            let ip = asset.model.ip;
            let last = (asset.model.op - 1e-3).max(ip);
            self.current_frame = (ip + seconds.max(0.0) * asset.frame_rate).min(last);
        }
    }

    pub fn render_tree(&self) -> RenderTree {
        match &self.asset {
            Some(asset) => SceneGraphBuilder::new(asset, self.current_frame).build(),
            None => RenderTree::empty(0.0, 0.0),
        }
    }
}

struct SceneGraphBuilder<'a> {
    asset: &'a LottieAsset,
    frame: f32,
    layers_by_index: HashMap<u32, &'a data::Layer>,
}

impl<'a> SceneGraphBuilder<'a> {
    fn new(asset: &'a LottieAsset, frame: f32) -> Self {
        let layers_by_index = asset
            .model
            .layers
            .iter()
            .filter_map(|layer| layer.ind.map(|ind| (ind, layer)))
            .collect();
        Self {
            asset,
            frame,
            layers_by_index,
        }
    }

    fn build(&self) -> RenderTree {
        // Layers are listed top first; paint bottom first.
        let children = self
            .asset
            .model
            .layers
            .iter()
            .rev()
            .filter_map(|layer| self.process_layer(layer))
            .collect();

        RenderTree {
            width: self.asset.width,
            height: self.asset.height,
            root: RenderNode::group(Mat3::IDENTITY, 1.0, children),
        }
    }

    fn process_layer(&self, layer: &data::Layer) -> Option<RenderNode> {
        if layer.is_hidden() || !layer.is_active_at(self.frame) {
            return None;
        }
        if !layer_type_supported(layer.ty) {
            log_unsupported_layer_once(layer.ty, layer.nm.as_deref());
            return None;
        }

        let content = match layer.ty {
            layer_type::SOLID => self.solid_content(layer),
            layer_type::SHAPE => layer
                .shapes
                .as_deref()
                .map(|shapes| self.process_shapes(shapes))
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        if content.is_empty() {
            return None;
        }

        let (_, alpha) = self.resolve_transform(&layer.ks);
        Some(RenderNode::group(self.world_transform(layer), alpha, content))
    }

    /// Layer transform including its parent chain. Parent opacity does not
    /// propagate, only the matrix.
    fn world_transform(&self, layer: &data::Layer) -> Mat3 {
        let (mut matrix, _) = self.resolve_transform(&layer.ks);
        let mut parent = layer.parent;
        let mut depth = 0;
        while let Some(ind) = parent {
            let Some(p) = self.layers_by_index.get(&ind) else {
                break;
            };
            depth += 1;
            if depth > MAX_PARENT_DEPTH {
                warn!(layer = ?layer.nm, "Parent chain too deep, ignoring remaining parents");
                break;
            }
            matrix = self.resolve_transform(&p.ks).0 * matrix;
            parent = p.parent;
        }
        matrix
    }

    fn resolve_transform(&self, ks: &data::Transform) -> (Mat3, f32) {
        let frame = self.frame;
        let anchor = to_vec2(&Animator::resolve(&ks.a, frame, vec![0.0, 0.0]), 0.0);
        let position = match &ks.p {
            data::PositionProperty::Unified(p) => {
                to_vec2(&Animator::resolve(p, frame, vec![0.0, 0.0]), 0.0)
            }
            data::PositionProperty::Split { x, y } => Vec2::new(
                Animator::resolve(x, frame, 0.0),
                Animator::resolve(y, frame, 0.0),
            ),
        };
        let scale = to_vec2(&Animator::resolve(&ks.s, frame, vec![100.0, 100.0]), 100.0) / 100.0;
        let rotation = Animator::resolve(&ks.rz, frame, 0.0).to_radians();
        let opacity = (Animator::resolve(&ks.o, frame, 100.0) / 100.0).clamp(0.0, 1.0);

        let matrix = Mat3::from_translation(position)
            * Mat3::from_angle(rotation)
            * Mat3::from_scale(scale)
            * Mat3::from_translation(-anchor);
        (matrix, opacity)
    }

    fn solid_content(&self, layer: &data::Layer) -> Vec<RenderNode> {
        let (Some(w), Some(h)) = (layer.sw, layer.sh) else {
            return Vec::new();
        };
        let Some(color) = layer.color.as_deref().and_then(parse_hex_color) else {
            return Vec::new();
        };
        let rect = kurbo::Rect::new(0.0, 0.0, w as f64, h as f64);
        vec![RenderNode::shape(
            rect.to_path(PATH_TOLERANCE),
            ShapePaint::Fill(Fill {
                color,
                opacity: 1.0,
                rule: FillRule::NonZero,
            }),
        )]
    }

    /// Builds paint nodes for one shape list. A fill or stroke paints every
    /// geometry listed before it in the same list, nested groups included.
    fn process_shapes(&self, items: &[data::Shape]) -> Vec<RenderNode> {
        let mut nodes = Vec::new();
        for (idx, item) in items.iter().enumerate().rev() {
            match item {
                data::Shape::Group(group) if !group.hd.unwrap_or(false) => {
                    let children = self.process_shapes(&group.it);
                    if !children.is_empty() {
                        let (transform, alpha) = self.group_transform(&group.it);
                        nodes.push(RenderNode::group(transform, alpha, children));
                    }
                }
                data::Shape::Fill(fill) => {
                    let geometry = self.collect_geometry(&items[..idx]);
                    if !geometry.elements().is_empty() {
                        nodes.push(RenderNode::shape(geometry, ShapePaint::Fill(self.fill(fill))));
                    }
                }
                data::Shape::Stroke(stroke) => {
                    let geometry = self.collect_geometry(&items[..idx]);
                    if !geometry.elements().is_empty() {
                        nodes.push(RenderNode::shape(
                            geometry,
                            ShapePaint::Stroke(self.stroke(stroke)),
                        ));
                    }
                }
                _ => {}
            }
        }
        nodes
    }

    fn group_transform(&self, items: &[data::Shape]) -> (Mat3, f32) {
        items
            .iter()
            .find_map(|item| match item {
                data::Shape::Transform(tr) => Some(self.resolve_transform(&tr.t)),
                _ => None,
            })
            .unwrap_or((Mat3::IDENTITY, 1.0))
    }

    fn collect_geometry(&self, items: &[data::Shape]) -> BezPath {
        let frame = self.frame;
        let mut path = BezPath::new();
        for item in items {
            match item {
                data::Shape::Rect(rect) => {
                    let size = to_vec2(&Animator::resolve(&rect.s, frame, vec![0.0, 0.0]), 0.0);
                    let center = to_vec2(&Animator::resolve(&rect.p, frame, vec![0.0, 0.0]), 0.0);
                    let bounds = kurbo::Rect::from_center_size(
                        Point::new(center.x as f64, center.y as f64),
                        (size.x as f64, size.y as f64),
                    );
                    let max_radius = bounds.width().abs().min(bounds.height().abs()) / 2.0;
                    let radius = (Animator::resolve(&rect.r, frame, 0.0) as f64).clamp(0.0, max_radius);
                    append(&mut path, bounds.to_rounded_rect(radius).to_path(PATH_TOLERANCE));
                }
                data::Shape::Ellipse(ellipse) => {
                    let size = to_vec2(&Animator::resolve(&ellipse.s, frame, vec![0.0, 0.0]), 0.0);
                    let center =
                        to_vec2(&Animator::resolve(&ellipse.p, frame, vec![0.0, 0.0]), 0.0);
                    let shape = kurbo::Ellipse::new(
                        Point::new(center.x as f64, center.y as f64),
                        (size.x as f64 / 2.0, size.y as f64 / 2.0),
                        0.0,
                    );
                    append(&mut path, shape.to_path(PATH_TOLERANCE));
                }
                data::Shape::Path(shape) => {
                    let outline = Animator::resolve(&shape.ks, frame, data::BezierPath::default());
                    append(&mut path, convert_bezier_path(&outline));
                }
                data::Shape::Group(group) if !group.hd.unwrap_or(false) => {
                    let (transform, _) = self.group_transform(&group.it);
                    let mut inner = self.collect_geometry(&group.it);
                    inner.apply_affine(mat3_to_affine(transform));
                    append(&mut path, inner);
                }
                _ => {}
            }
        }
        path
    }

    fn fill(&self, fill: &data::FillShape) -> Fill {
        Fill {
            color: to_color(&Animator::resolve(&fill.c, self.frame, vec![0.0, 0.0, 0.0, 1.0])),
            opacity: (Animator::resolve(&fill.o, self.frame, 100.0) / 100.0).clamp(0.0, 1.0),
            rule: if fill.r == Some(2) {
                FillRule::EvenOdd
            } else {
                FillRule::NonZero
            },
        }
    }

    fn stroke(&self, stroke: &data::StrokeShape) -> Stroke {
        Stroke {
            color: to_color(&Animator::resolve(&stroke.c, self.frame, vec![0.0, 0.0, 0.0, 1.0])),
            width: Animator::resolve(&stroke.w, self.frame, 1.0).max(0.0),
            opacity: (Animator::resolve(&stroke.o, self.frame, 100.0) / 100.0).clamp(0.0, 1.0),
            cap: LineCap::from_code(stroke.lc),
            join: LineJoin::from_code(stroke.lj),
            miter_limit: stroke.ml.unwrap_or(4.0),
        }
    }
}

fn append(path: &mut BezPath, other: BezPath) {
    path.extend(other.elements().iter().copied());
}

fn to_vec2(components: &[f32], fill: f32) -> Vec2 {
    Vec2::new(
        components.first().copied().unwrap_or(fill),
        components.get(1).copied().unwrap_or(fill),
    )
}

/// Lottie colors are usually `[0, 1]`; some exporters write `[0, 255]`.
fn to_color(components: &[f32]) -> Vec4 {
    let scale = if components.iter().take(3).any(|c| *c > 1.0) {
        255.0
    } else {
        1.0
    };
    let channel = |i: usize, default: f32| components.get(i).map_or(default, |c| c / scale);
    Vec4::new(
        channel(0, 0.0),
        channel(1, 0.0),
        channel(2, 0.0),
        components.get(3).map_or(1.0, |a| if *a > 1.0 { a / 255.0 } else { *a }),
    )
    .clamp(Vec4::ZERO, Vec4::ONE)
}

/// Parses `#rrggbb` (the solid layer color format).
fn parse_hex_color(raw: &str) -> Option<Vec4> {
    let hex = raw.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(hex.get(range)?, 16)
            .ok()
            .map(|v| v as f32 / 255.0)
    };
    Some(Vec4::new(channel(0..2)?, channel(2..4)?, channel(4..6)?, 1.0))
}

fn mat3_to_affine(m: Mat3) -> Affine {
    let c = m.to_cols_array();
    Affine::new([
        c[0] as f64,
        c[1] as f64,
        c[3] as f64,
        c[4] as f64,
        c[6] as f64,
        c[7] as f64,
    ])
}

fn convert_bezier_path(path_data: &data::BezierPath) -> BezPath {
    let mut bp = BezPath::new();
    let Some(start) = path_data.v.first() else {
        return bp;
    };
    let point = |p: [f32; 2]| Point::new(p[0] as f64, p[1] as f64);
    let offset = |list: &[[f32; 2]], i: usize| list.get(i).copied().unwrap_or([0.0, 0.0]);

    bp.move_to(point(*start));
    let count = path_data.v.len();
    for i in 0..count {
        let next = (i + 1) % count;
        if next == 0 && !path_data.c {
            break;
        }
        let p0 = path_data.v[i];
        let p1 = path_data.v[next];
        let out = offset(&path_data.o, i);
        let inn = offset(&path_data.i, next);
        bp.curve_to(
            point([p0[0] + out[0], p0[1] + out[1]]),
            point([p1[0] + inn[0], p1[1] + inn[1]]),
            point(p1),
        );
    }
    if path_data.c {
        bp.close_path();
    }
    bp
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn asset(value: serde_json::Value) -> Arc<LottieAsset> {
        let model: LottieJson = serde_json::from_value(value).expect("valid lottie json");
        Arc::new(LottieAsset::from_model(model).expect("valid composition"))
    }

    fn first_shape_world_transform(tree: &RenderTree) -> Option<Mat3> {
        fn visit(node: &RenderNode, parent: Mat3) -> Option<Mat3> {
            let world = parent * node.transform;
            match &node.content {
                NodeContent::Shape(_) => Some(world),
                NodeContent::Group(children) => {
                    children.iter().find_map(|child| visit(child, world))
                }
            }
        }
        visit(&tree.root, Mat3::IDENTITY)
    }

    fn shape_layer(shapes: serde_json::Value) -> serde_json::Value {
        json!({
            "fr": 30.0, "ip": 0.0, "op": 30.0, "w": 100, "h": 100,
            "layers": [{
                "ty": 4, "ind": 1, "ip": 0.0, "op": 30.0,
                "ks": {},
                "shapes": shapes
            }]
        })
    }

    #[test]
    fn rejects_degenerate_compositions() {
        let bad_rate = LottieAsset::from_slice(br#"{"fr":0,"ip":0,"op":10,"w":10,"h":10,"layers":[]}"#);
        assert!(matches!(bad_rate, Err(AssetError::InvalidComposition(_))));

        let bad_range = LottieAsset::from_slice(br#"{"fr":30,"ip":10,"op":10,"w":10,"h":10,"layers":[]}"#);
        assert!(matches!(bad_range, Err(AssetError::InvalidComposition(_))));

        let infinite_range = LottieAsset::from_slice(
            br#"{"fr":1,"ip":-3e38,"op":3e38,"w":10,"h":10,"layers":[]}"#,
        );
        assert!(matches!(infinite_range, Err(AssetError::InvalidComposition(_))));

        let not_json = LottieAsset::from_slice(b"not a lottie");
        assert!(matches!(not_json, Err(AssetError::Parse(_))));
    }

    #[test]
    fn duration_comes_from_frame_range() {
        let asset = asset(json!({ "fr": 60, "ip": 0, "op": 90, "w": 320, "h": 240, "layers": [] }));
        assert!((asset.duration_secs() - 1.5).abs() < 1e-6);
        assert_eq!((asset.width, asset.height), (320.0, 240.0));
    }

    #[test]
    fn seek_maps_seconds_to_frames_and_stays_drawable() {
        let mut player = LottiePlayer::new();
        player.load(asset(json!({ "fr": 30, "ip": 10, "op": 40, "w": 10, "h": 10, "layers": [] })));
        assert_eq!(player.current_frame, 10.0);

        player.seek_time(0.5);
        assert!((player.current_frame - 25.0).abs() < 1e-4);

        player.seek_time(1.0);
        assert!(player.current_frame < 40.0);
    }

    #[test]
    fn fill_paints_preceding_geometry() {
        let mut player = LottiePlayer::new();
        player.load(asset(shape_layer(json!([
            { "ty": "rc", "p": { "k": [50, 50] }, "s": { "k": [20, 20] }, "r": { "k": 0 } },
            { "ty": "el", "p": { "k": [10, 10] }, "s": { "k": [5, 5] } },
            { "ty": "fl", "c": { "k": [1, 0, 0, 1] }, "o": { "k": 100 } },
            { "ty": "st", "c": { "k": [0, 0, 1, 1] }, "w": { "k": 2 }, "o": { "k": 50 }, "lc": 2, "lj": 3 }
        ]))));

        let tree = player.render_tree();
        assert_eq!(tree.shape_count(), 2);

        let NodeContent::Group(layers) = &tree.root.content else {
            panic!("root must be a group");
        };
        let NodeContent::Group(paints) = &layers[0].content else {
            panic!("layer must be a group");
        };
        // Stroke is listed last, so it paints first (bottom).
        match &paints[0].content {
            NodeContent::Shape(ShapeNode {
                paint: ShapePaint::Stroke(stroke),
                ..
            }) => {
                assert_eq!(stroke.cap, LineCap::Round);
                assert_eq!(stroke.join, LineJoin::Bevel);
                assert!((stroke.opacity - 0.5).abs() < 1e-6);
            }
            other => panic!("expected stroke, got {:?}", other),
        }
        match &paints[1].content {
            NodeContent::Shape(ShapeNode {
                paint: ShapePaint::Fill(fill),
                ..
            }) => assert_eq!(fill.color, Vec4::new(1.0, 0.0, 0.0, 1.0)),
            other => panic!("expected fill, got {:?}", other),
        }
    }

    #[test]
    fn group_transform_applies_when_transform_follows_fill() {
        let mut player = LottiePlayer::new();
        player.load(asset(shape_layer(json!([{
            "ty": "gr",
            "it": [
                { "ty": "rc", "p": { "k": [0, 0] }, "s": { "k": [20, 20] }, "r": { "k": 0 } },
                { "ty": "fl", "c": { "k": [1, 0, 0, 1] }, "o": { "k": 100 } },
                { "ty": "tr", "p": { "k": [50, 50] }, "s": { "k": [100, 100] }, "r": { "k": 0 }, "o": { "k": 100 } }
            ]
        }]))));

        let tree = player.render_tree();
        let world = first_shape_world_transform(&tree).expect("shape node should exist");
        let m = world.to_cols_array();
        assert!((m[6] - 50.0).abs() < 0.01 && (m[7] - 50.0).abs() < 0.01);
    }

    #[test]
    fn parent_transform_is_inherited() {
        let mut player = LottiePlayer::new();
        player.load(asset(json!({
            "fr": 30, "ip": 0, "op": 30, "w": 100, "h": 100,
            "layers": [
                {
                    "ty": 1, "ind": 2, "parent": 1, "ip": 0, "op": 30,
                    "sc": "#00ff00", "sw": 10, "sh": 10,
                    "ks": { "p": { "k": [5, 0] } }
                },
                {
                    "ty": 3, "ind": 1, "ip": 0, "op": 30,
                    "ks": { "p": { "k": [20, 30] } }
                }
            ]
        })));

        let tree = player.render_tree();
        let world = first_shape_world_transform(&tree).expect("solid should render");
        let m = world.to_cols_array();
        assert!((m[6] - 25.0).abs() < 1e-4 && (m[7] - 30.0).abs() < 1e-4);
    }

    #[test]
    fn inactive_and_unsupported_layers_are_skipped() {
        let mut player = LottiePlayer::new();
        player.load(asset(json!({
            "fr": 30, "ip": 0, "op": 60, "w": 100, "h": 100,
            "layers": [
                { "ty": 1, "ip": 30, "op": 60, "sc": "#ff0000", "sw": 10, "sh": 10 },
                { "ty": 5, "ip": 0, "op": 60 }
            ]
        })));

        assert_eq!(player.render_tree().shape_count(), 0);
        player.seek_time(1.5);
        assert_eq!(player.render_tree().shape_count(), 1);
    }

    #[test]
    fn hex_and_byte_colors_are_normalised() {
        assert_eq!(parse_hex_color("#ff0000"), Some(Vec4::new(1.0, 0.0, 0.0, 1.0)));
        assert_eq!(parse_hex_color("ff00"), None);
        assert_eq!(to_color(&[255.0, 0.0, 0.0]), Vec4::new(1.0, 0.0, 0.0, 1.0));
    }
}
