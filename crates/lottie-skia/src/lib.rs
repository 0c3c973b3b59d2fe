//! Draws a [`RenderTree`] onto a Skia canvas.

use glam::{Mat3, Vec4};
use kurbo::{BezPath, PathEl};
use lottie_core::{
    Fill, FillRule, LineCap, LineJoin, NodeContent, RenderNode, RenderTree, ShapePaint, Stroke,
};
use skia_safe::{
    canvas::SaveLayerRec, Canvas, Color, Matrix, Paint, PaintCap, PaintJoin, PaintStyle, Path,
    PathFillType, Rect,
};

pub struct SkiaRenderer;

impl SkiaRenderer {
    /// Draws `tree` scaled uniformly to fit `dst` and centred in it.
    pub fn draw(canvas: &Canvas, tree: &RenderTree, dst: Rect, alpha: f32) {
        if tree.width <= 0.0 || tree.height <= 0.0 || dst.is_empty() {
            return;
        }

        let scale = (dst.width() / tree.width).min(dst.height() / tree.height);
        let tx = dst.left + (dst.width() - tree.width * scale) / 2.0;
        let ty = dst.top + (dst.height() - tree.height * scale) / 2.0;

        canvas.save();
        canvas.translate((tx, ty));
        canvas.scale((scale, scale));
        canvas.clip_rect(Rect::from_wh(tree.width, tree.height), None, true);
        Self::draw_node(canvas, &tree.root, alpha.clamp(0.0, 1.0));
        canvas.restore();
    }

    fn draw_node(canvas: &Canvas, node: &RenderNode, parent_alpha: f32) {
        if node.alpha <= 0.0 || parent_alpha <= 0.0 {
            return;
        }

        canvas.save();
        canvas.concat(&to_skia_matrix(node.transform));

        match &node.content {
            NodeContent::Group(children) => {
                let alpha = node.alpha * parent_alpha;
                if alpha < 1.0 && children.len() > 1 {
                    // Overlapping children must fade as one image.
                    let mut paint = Paint::default();
                    paint.set_alpha_f(alpha);
                    canvas.save_layer(&SaveLayerRec::default().paint(&paint));
                    for child in children {
                        Self::draw_node(canvas, child, 1.0);
                    }
                    canvas.restore();
                } else {
                    for child in children {
                        Self::draw_node(canvas, child, alpha);
                    }
                }
            }
            NodeContent::Shape(shape) => {
                let alpha = node.alpha * parent_alpha;
                let mut path = to_skia_path(&shape.geometry);
                let paint = match &shape.paint {
                    ShapePaint::Fill(fill) => {
                        path.set_fill_type(fill_type(fill));
                        fill_paint(fill, alpha)
                    }
                    ShapePaint::Stroke(stroke) => stroke_paint(stroke, alpha),
                };
                canvas.draw_path(&path, &paint);
            }
        }

        canvas.restore();
    }
}

pub fn to_skia_matrix(m: Mat3) -> Matrix {
    let c = m.to_cols_array();
    Matrix::new_all(c[0], c[3], c[6], c[1], c[4], c[7], 0.0, 0.0, 1.0)
}

pub fn to_skia_path(geometry: &BezPath) -> Path {
    let mut path = Path::new();
    for el in geometry.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                path.move_to((p.x as f32, p.y as f32));
            }
            PathEl::LineTo(p) => {
                path.line_to((p.x as f32, p.y as f32));
            }
            PathEl::QuadTo(p1, p2) => {
                path.quad_to((p1.x as f32, p1.y as f32), (p2.x as f32, p2.y as f32));
            }
            PathEl::CurveTo(p1, p2, p3) => {
                path.cubic_to(
                    (p1.x as f32, p1.y as f32),
                    (p2.x as f32, p2.y as f32),
                    (p3.x as f32, p3.y as f32),
                );
            }
            PathEl::ClosePath => {
                path.close();
            }
        }
    }
    path
}

fn fill_type(fill: &Fill) -> PathFillType {
    match fill.rule {
        FillRule::NonZero => PathFillType::Winding,
        FillRule::EvenOdd => PathFillType::EvenOdd,
    }
}

fn to_skia_color(color: Vec4, alpha: f32) -> Color {
    let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color::from_argb(byte(color.w * alpha), byte(color.x), byte(color.y), byte(color.z))
}

fn fill_paint(fill: &Fill, alpha: f32) -> Paint {
    let mut paint = Paint::default();
    paint.set_anti_alias(true);
    paint.set_style(PaintStyle::Fill);
    paint.set_color(to_skia_color(fill.color, fill.opacity * alpha));
    paint
}

fn stroke_paint(stroke: &Stroke, alpha: f32) -> Paint {
    let mut paint = Paint::default();
    paint.set_anti_alias(true);
    paint.set_style(PaintStyle::Stroke);
    paint.set_color(to_skia_color(stroke.color, stroke.opacity * alpha));
    paint.set_stroke_width(stroke.width);
    paint.set_stroke_cap(match stroke.cap {
        LineCap::Butt => PaintCap::Butt,
        LineCap::Round => PaintCap::Round,
        LineCap::Square => PaintCap::Square,
    });
    paint.set_stroke_join(match stroke.join {
        LineJoin::Miter => PaintJoin::Miter,
        LineJoin::Round => PaintJoin::Round,
        LineJoin::Bevel => PaintJoin::Bevel,
    });
    paint.set_stroke_miter(stroke.miter_limit);
    paint
}
