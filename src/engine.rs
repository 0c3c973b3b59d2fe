//! The animation engine seam.
//!
//! A view only needs to create an animation from bytes, ask for its duration
//! and size, seek it and render it. [`SkottieFactory`] provides that on top of
//! the workspace's Lottie crates; tests and embedders can plug in their own.

use lottie_core::{LottieAsset, LottiePlayer};
use lottie_skia::SkiaRenderer;
use skia_safe::{Canvas, Rect, Size};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A decoded animation.
pub trait Animation {
    /// Length of one loop.
    fn duration(&self) -> Duration;

    /// Intrinsic size of the composition.
    fn size(&self) -> Size;

    /// Moves the playhead to `time` after the start.
    fn seek_frame_time(&mut self, time: Duration);

    /// Renders the current frame into `dst`.
    fn render(&self, canvas: &Canvas, dst: Rect);
}

/// Creates animations from raw bytes.
pub trait AnimationFactory {
    /// `None` when the bytes are not a valid animation.
    fn create(&self, data: &[u8]) -> Option<Box<dyn Animation>>;
}

/// Lottie animation rendered through Skia.
pub struct SkottieAnimation {
    player: LottiePlayer,
    duration: Duration,
    size: Size,
}

impl SkottieAnimation {
    pub fn from_data(data: &[u8]) -> Option<Self> {
        let asset = match LottieAsset::from_slice(data) {
            Ok(asset) => asset,
            Err(err) => {
                debug!(error = %err, "Rejected animation data");
                return None;
            }
        };
        Self::from_asset(Arc::new(asset))
    }

    /// `None` when the loop is too long to express as a [`Duration`].
    pub fn from_asset(asset: Arc<LottieAsset>) -> Option<Self> {
        let duration = match Duration::try_from_secs_f32(asset.duration_secs()) {
            Ok(duration) => duration,
            Err(err) => {
                debug!(error = %err, "Rejected animation duration");
                return None;
            }
        };
        let size = Size::new(asset.width, asset.height);
        let mut player = LottiePlayer::new();
        player.load(asset);
        Some(Self {
            player,
            duration,
            size,
        })
    }

    pub fn current_frame(&self) -> f32 {
        self.player.current_frame
    }
}

impl Animation for SkottieAnimation {
    fn duration(&self) -> Duration {
        self.duration
    }

    fn size(&self) -> Size {
        self.size
    }

    fn seek_frame_time(&mut self, time: Duration) {
        self.player.seek_time(time.as_secs_f32());
    }

    fn render(&self, canvas: &Canvas, dst: Rect) {
        let tree = self.player.render_tree();
        SkiaRenderer::draw(canvas, &tree, dst, 1.0);
    }
}

/// Default factory: Lottie JSON documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkottieFactory;

impl AnimationFactory for SkottieFactory {
    fn create(&self, data: &[u8]) -> Option<Box<dyn Animation>> {
        SkottieAnimation::from_data(data).map(|anim| Box::new(anim) as Box<dyn Animation>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SECONDS: &[u8] =
        br#"{"v":"5.7.0","fr":30,"ip":0,"op":60,"w":320,"h":180,"layers":[]}"#;

    #[test]
    fn test_metrics_come_from_composition() {
        let anim = SkottieFactory.create(TWO_SECONDS).expect("valid animation");
        assert_eq!(anim.duration(), Duration::from_secs(2));
        assert_eq!(anim.size(), Size::new(320.0, 180.0));
    }

    #[test]
    fn test_seek_moves_playhead() {
        let mut anim = SkottieAnimation::from_data(TWO_SECONDS).unwrap();
        anim.seek_frame_time(Duration::from_millis(500));
        assert!((anim.current_frame() - 15.0).abs() < 1e-3);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(SkottieFactory.create(b"\x89PNG").is_none());
        assert!(SkottieFactory.create(b"{}").is_none());
    }

    #[test]
    fn test_unrepresentable_duration_is_rejected() {
        let too_long = br#"{"fr":1e-30,"ip":0,"op":1,"w":10,"h":10,"layers":[]}"#;
        assert!(SkottieFactory.create(too_long).is_none());

        let infinite = br#"{"fr":1,"ip":-3e38,"op":3e38,"w":10,"h":10,"layers":[]}"#;
        assert!(SkottieFactory.create(infinite).is_none());
    }
}
