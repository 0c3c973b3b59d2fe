use glam::Vec2;
use lottie_data::model::{BezierPath, BezierTangent, Keyframe, Property, Value};

pub trait Interpolatable: Sized + Clone {
    fn lerp(&self, other: &Self, t: f32) -> Self;
}

impl Interpolatable for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

// Multi-dimensional values (positions, scales, colors). Components missing on
// one side keep the value of the side that has them.
impl Interpolatable for Vec<f32> {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        let len = self.len().max(other.len());
        (0..len)
            .map(|i| match (self.get(i), other.get(i)) {
                (Some(a), Some(b)) => a + (b - a) * t,
                (Some(a), None) => *a,
                (None, Some(b)) => *b,
                (None, None) => 0.0,
            })
            .collect()
    }
}

impl Interpolatable for BezierPath {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        if t <= 0.0 {
            return self.clone();
        }
        if t >= 1.0 {
            return other.clone();
        }

        // Morphing needs matching vertex counts; otherwise snap at the midpoint.
        if self.v.len() != other.v.len() {
            return if t < 0.5 { self.clone() } else { other.clone() };
        }

        let mix = |a: &[[f32; 2]], b: &[[f32; 2]]| -> Vec<[f32; 2]> {
            a.iter()
                .zip(b)
                .map(|(p, q)| [p[0] + (q[0] - p[0]) * t, p[1] + (q[1] - p[1]) * t])
                .collect()
        };

        BezierPath {
            c: self.c,
            v: mix(&self.v, &other.v),
            i: mix(&self.i, &other.i),
            o: mix(&self.o, &other.o),
        }
    }
}

/// Evaluates the y of a CSS-style cubic bezier easing curve at `x`.
pub fn solve_cubic_bezier(p1: Vec2, p2: Vec2, x: f32) -> f32 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    // Newton-Raphson on x(t), then sample y(t).
    let mut t = x;
    for _ in 0..8 {
        let one_minus_t = 1.0 - t;
        let x_est = 3.0 * one_minus_t * one_minus_t * t * p1.x
            + 3.0 * one_minus_t * t * t * p2.x
            + t * t * t;

        let err = x_est - x;
        if err.abs() < 1e-4 {
            break;
        }

        let dx_dt = 3.0 * one_minus_t * one_minus_t * p1.x
            + 6.0 * one_minus_t * t * (p2.x - p1.x)
            + 3.0 * t * t * (1.0 - p2.x);
        if dx_dt.abs() < 1e-6 {
            break;
        }
        t = (t - err / dx_dt).clamp(0.0, 1.0);
    }

    let one_minus_t = 1.0 - t;
    3.0 * one_minus_t * one_minus_t * t * p1.y + 3.0 * one_minus_t * t * t * p2.y + t * t * t
}

fn handle(tangent: Option<&BezierTangent>, fallback: Vec2) -> Vec2 {
    tangent
        .map(|h| {
            Vec2::new(
                h.x.first().copied().unwrap_or(fallback.x),
                h.y.first().copied().unwrap_or(fallback.y),
            )
        })
        .unwrap_or(fallback)
}

pub struct Animator;

impl Animator {
    /// Value of `prop` at `frame`, or `default` when the property is absent.
    pub fn resolve<T: Interpolatable>(prop: &Property<T>, frame: f32, default: T) -> T {
        match &prop.k {
            Value::Default => default,
            Value::Static(v) => v.clone(),
            Value::Animated(keyframes) => {
                Self::resolve_keyframes(keyframes, frame).unwrap_or(default)
            }
        }
    }

    fn resolve_keyframes<T: Interpolatable>(keyframes: &[Keyframe<T>], frame: f32) -> Option<T> {
        let first = keyframes.first()?;

        // First keyframe strictly after `frame`; the active segment ends there.
        let idx = keyframes.partition_point(|kf| kf.t <= frame);
        if idx == 0 {
            return first.s.clone();
        }

        let len = keyframes.len();
        if idx >= len {
            let last = &keyframes[len - 1];
            // Older exports close the list with a bare `{"t": ..}` and keep the
            // final value in the previous keyframe's `e`.
            return last
                .s
                .clone()
                .or_else(|| last.e.clone())
                .or_else(|| len.checked_sub(2).and_then(|i| keyframes[i].e.clone()));
        }

        let from = &keyframes[idx - 1];
        let to = &keyframes[idx];
        let start = from.s.clone().or_else(|| to.s.clone())?;
        if from.is_hold() {
            return Some(start);
        }
        let end = from
            .e
            .clone()
            .or_else(|| to.s.clone())
            .unwrap_or_else(|| start.clone());

        let span = to.t - from.t;
        let linear = if span > 0.0 {
            ((frame - from.t) / span).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let eased = match (&from.o, &from.i) {
            (None, None) => linear,
            (out, inn) => solve_cubic_bezier(
                handle(out.as_ref(), Vec2::ZERO),
                handle(inn.as_ref(), Vec2::ONE),
                linear,
            ),
        };

        Some(start.lerp(&end, eased))
    }
}
