//! The Lottie view controller.
//!
//! `LottieView` owns at most one decoded animation and plays it by repainting
//! itself: every paint advances playback by the wall-clock time since the
//! previous paint, draws the frame, and asks the host for another paint
//! [`FRAME_DELAY`] later. Loading a new file, or clearing it, replaces the
//! animation and restarts playback from zero.

use crate::config::LottieViewConfig;
use crate::engine::{Animation, AnimationFactory, SkottieFactory};
use crate::error::{LoadError, LoadErrorKind, ResolveError};
use crate::host::{Invalidator, MeasureSpec};
use crate::resources::{self, RawResources};
use skia_safe::{Canvas, Color, IRect, ISize, Rect};
use std::io::Read;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Delay between paints: 60 frames per second, in whole milliseconds.
pub const FRAME_DELAY: Duration = Duration::from_millis(1000 / 60);

/// Size reported by [`LottieView::measure`] when nothing is loaded.
pub const FALLBACK_SIZE: ISize = ISize {
    width: 100,
    height: 100,
};

pub struct LottieView {
    factory: Box<dyn AnimationFactory>,
    resources: Option<Box<dyn RawResources>>,
    invalidator: Rc<dyn Invalidator>,

    file_name: Option<String>,
    animation: Option<Box<dyn Animation>>,
    progress: Duration,
    last_frame_time: Option<Instant>,
}

impl LottieView {
    /// A view with the default Lottie engine and no raw resource store.
    pub fn new(invalidator: Rc<dyn Invalidator>) -> Self {
        Self {
            factory: Box::new(SkottieFactory),
            resources: None,
            invalidator,
            file_name: None,
            animation: None,
            progress: Duration::ZERO,
            last_frame_time: None,
        }
    }

    pub fn with_factory(mut self, factory: impl AnimationFactory + 'static) -> Self {
        self.factory = Box::new(factory);
        self
    }

    pub fn with_resources(mut self, resources: impl RawResources + 'static) -> Self {
        self.resources = Some(Box::new(resources));
        self
    }

    /// Applies construction-time configuration. A configured file name is
    /// loaded immediately; nothing happens when none is configured.
    pub fn apply_config(&mut self, config: &LottieViewConfig) -> Result<(), LoadError> {
        match config.file_name.as_deref() {
            Some(file_name) => self.set_file_name(Some(file_name)),
            None => Ok(()),
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Replaces the animation with the one named `file_name`.
    ///
    /// `None`, an empty or a blank name clears the view. On error the view is
    /// left without an animation. Either way one repaint is requested, so a
    /// stale frame never stays on screen.
    pub fn set_file_name(&mut self, file_name: Option<&str>) -> Result<(), LoadError> {
        self.file_name = file_name.map(str::to_owned);
        let result = self.load_lottie_file();
        if let Err(err) = &result {
            warn!(file = %err.file_name, kind = ?err.kind, "Failed to load animation");
        }
        self.invalidator.invalidate();
        result
    }

    fn load_lottie_file(&mut self) -> Result<(), LoadError> {
        self.last_frame_time = None;
        self.progress = Duration::ZERO;
        // Release the previous handle before anything else is decoded.
        drop(self.animation.take());

        let Some(file) = self.file_name.as_deref().filter(|f| !f.trim().is_empty()) else {
            return Ok(());
        };

        let mut reader = match resources::open_file(self.resources.as_deref(), file) {
            Ok(Some(reader)) => reader,
            Ok(None) => return Err(LoadError::not_found(file)),
            // Unreachable: blank names return early above and clear the view.
            Err(ResolveError::BlankFileName) => return Err(LoadError::not_found(file)),
            Err(err @ ResolveError::Io { .. }) => {
                debug!(error = %err, "Animation source could not be opened");
                return Err(LoadError::new(file, LoadErrorKind::Unreadable));
            }
        };

        let mut data = Vec::new();
        if let Err(err) = reader.read_to_end(&mut data) {
            debug!(file, error = %err, "Animation source could not be read");
            return Err(LoadError::new(file, LoadErrorKind::Unreadable));
        }

        let animation = self
            .factory
            .create(&data)
            .ok_or_else(|| LoadError::parse(file))?;

        debug!(
            file,
            duration_ms = animation.duration().as_millis() as u64,
            width = animation.size().width,
            height = animation.size().height,
            "Loaded animation"
        );
        self.animation = Some(animation);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.animation.is_some()
    }

    pub fn animation(&self) -> Option<&dyn Animation> {
        self.animation.as_deref()
    }

    /// Elapsed playback time within the current loop.
    pub fn progress(&self) -> Duration {
        self.progress
    }

    /// Draws one frame into `bounds` and schedules the next paint.
    ///
    /// The canvas is always cleared. With no animation loaded nothing else
    /// happens and no further paint is scheduled.
    pub fn paint(&mut self, canvas: &Canvas, bounds: IRect, now: Instant) {
        canvas.clear(Color::TRANSPARENT);

        let Some(animation) = self.animation.as_mut() else {
            return;
        };

        // The first paint after a load only sets the baseline.
        let last = *self.last_frame_time.get_or_insert(now);
        let delta = now.saturating_duration_since(last);
        self.last_frame_time = Some(now);
        self.progress += delta;

        // Hard reset rather than wrap: a stall longer than a loop restarts at 0.
        if self.progress > animation.duration() {
            self.progress = Duration::ZERO;
        }

        trace!(progress_ms = self.progress.as_millis() as u64, "Paint tick");
        animation.seek_frame_time(self.progress);
        animation.render(canvas, Rect::from_irect(bounds));

        self.invalidator.post_invalidate_delayed(FRAME_DELAY);
    }

    /// Size for the layout pass: the animation's intrinsic size, or
    /// [`FALLBACK_SIZE`], resolved against each axis' constraint.
    pub fn measure(&self, width: MeasureSpec, height: MeasureSpec) -> ISize {
        let desired = self
            .animation
            .as_ref()
            .map(|animation| {
                let size = animation.size();
                ISize::new(size.width as i32, size.height as i32)
            })
            .unwrap_or(FALLBACK_SIZE);

        ISize::new(
            width.resolve_size(desired.width),
            height.resolve_size(desired.height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::FrameScheduler;
    use crate::resources::MemoryResources;
    use skia_safe::{surfaces, Paint, Size};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Probe {
        live: usize,
        created: usize,
        seeks: Vec<Duration>,
        renders: usize,
    }

    struct FakeAnimation {
        duration: Duration,
        size: Size,
        probe: Rc<RefCell<Probe>>,
    }

    impl Drop for FakeAnimation {
        fn drop(&mut self) {
            self.probe.borrow_mut().live -= 1;
        }
    }

    impl Animation for FakeAnimation {
        fn duration(&self) -> Duration {
            self.duration
        }

        fn size(&self) -> Size {
            self.size
        }

        fn seek_frame_time(&mut self, time: Duration) {
            self.probe.borrow_mut().seeks.push(time);
        }

        fn render(&self, canvas: &Canvas, dst: Rect) {
            self.probe.borrow_mut().renders += 1;
            canvas.draw_rect(dst, &Paint::default());
        }
    }

    /// Accepts `anim:<millis>x<w>x<h>`, rejects everything else.
    struct FakeFactory {
        probe: Rc<RefCell<Probe>>,
    }

    impl AnimationFactory for FakeFactory {
        fn create(&self, data: &[u8]) -> Option<Box<dyn Animation>> {
            let text = std::str::from_utf8(data).ok()?.strip_prefix("anim:")?;
            let mut parts = text.split('x').map(|p| p.trim().parse::<u64>());
            let millis = parts.next()?.ok()?;
            let w = parts.next()?.ok()?;
            let h = parts.next()?.ok()?;

            let mut probe = self.probe.borrow_mut();
            probe.live += 1;
            probe.created += 1;
            Some(Box::new(FakeAnimation {
                duration: Duration::from_millis(millis),
                size: Size::new(w as f32, h as f32),
                probe: self.probe.clone(),
            }))
        }
    }

    fn fixture() -> (LottieView, Rc<FrameScheduler>, Rc<RefCell<Probe>>) {
        let probe = Rc::new(RefCell::new(Probe::default()));
        let scheduler = Rc::new(FrameScheduler::new(Instant::now()));
        let resources = MemoryResources::new()
            .with("one_second", "anim:1000x320x180")
            .with("other", "anim:500x64x48")
            .with("broken", "not an animation");
        let view = LottieView::new(scheduler.clone())
            .with_factory(FakeFactory {
                probe: probe.clone(),
            })
            .with_resources(resources);
        (view, scheduler, probe)
    }

    fn tick(view: &mut LottieView, at: Instant) {
        let mut surface = surfaces::raster_n32_premul((32, 32)).expect("surface");
        view.paint(surface.canvas(), IRect::from_wh(32, 32), at);
    }

    #[test]
    fn test_progress_hard_resets_past_duration() {
        let (mut view, _, probe) = fixture();
        view.set_file_name(Some("one_second.json")).unwrap();

        let t0 = Instant::now();
        let mut seen = Vec::new();
        for at in [t0, t0 + Duration::from_millis(700), t0 + Duration::from_millis(1400)] {
            tick(&mut view, at);
            seen.push(view.progress());
        }

        let expected = [0, 700, 0].map(Duration::from_millis);
        assert_eq!(seen, expected);
        assert_eq!(probe.borrow().seeks, expected);
    }

    #[test]
    fn test_progress_reaching_duration_exactly_is_kept() {
        let (mut view, _, _) = fixture();
        view.set_file_name(Some("one_second")).unwrap();

        let t0 = Instant::now();
        tick(&mut view, t0);
        tick(&mut view, t0 + Duration::from_millis(1000));
        assert_eq!(view.progress(), Duration::from_millis(1000));
    }

    #[test]
    fn test_first_tick_after_load_has_zero_delta() {
        let (mut view, _, _) = fixture();
        let t0 = Instant::now();
        view.set_file_name(Some("one_second")).unwrap();
        tick(&mut view, t0 + Duration::from_millis(300));
        tick(&mut view, t0 + Duration::from_millis(400));
        assert_eq!(view.progress(), Duration::from_millis(100));

        // Reloading resets the baseline too.
        view.set_file_name(Some("other")).unwrap();
        assert_eq!(view.progress(), Duration::ZERO);
        tick(&mut view, t0 + Duration::from_secs(60));
        assert_eq!(view.progress(), Duration::ZERO);
    }

    #[test]
    fn test_paint_schedules_next_frame_only_when_loaded() {
        let (mut view, scheduler, probe) = fixture();
        let t0 = scheduler.now();

        tick(&mut view, t0);
        assert_eq!(scheduler.requests(), 0);
        assert_eq!(probe.borrow().renders, 0);

        view.set_file_name(Some("one_second")).unwrap();
        assert_eq!(scheduler.next_frame(), Some(t0));

        tick(&mut view, t0);
        assert_eq!(probe.borrow().renders, 1);
        assert_eq!(scheduler.pending().map(|r| r.due), Some(t0 + FRAME_DELAY));
    }

    #[test]
    fn test_only_one_animation_is_alive() {
        let (mut view, _, probe) = fixture();
        view.set_file_name(Some("one_second")).unwrap();
        view.set_file_name(Some("other")).unwrap();
        assert_eq!(probe.borrow().live, 1);
        assert_eq!(probe.borrow().created, 2);

        assert!(view.set_file_name(Some("broken")).is_err());
        assert_eq!(probe.borrow().live, 0);

        view.set_file_name(Some("other")).unwrap();
        drop(view);
        assert_eq!(probe.borrow().live, 0);
    }

    #[test]
    fn test_parse_failure_requests_exactly_one_repaint() {
        let (mut view, scheduler, _) = fixture();
        let err = view.set_file_name(Some("broken.json")).unwrap_err();
        assert_eq!(err, LoadError::parse("broken.json"));
        assert!(!view.is_loaded());
        assert_eq!(scheduler.requests(), 1);
        assert_eq!(view.file_name(), Some("broken.json"));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let (mut view, scheduler, _) = fixture();
        let err = view.set_file_name(Some("nowhere/missing.json")).unwrap_err();
        assert_eq!(err.kind, LoadErrorKind::NotFound);
        assert_eq!(err.file_name, "nowhere/missing.json");
        assert_eq!(scheduler.requests(), 1);
        assert_eq!(view.measure(MeasureSpec::UNSPECIFIED, MeasureSpec::UNSPECIFIED), FALLBACK_SIZE);
    }

    #[test]
    fn test_oversized_loop_is_a_parse_error() {
        let scheduler = Rc::new(FrameScheduler::new(Instant::now()));
        let resources = MemoryResources::new()
            .with("glacial", r#"{"fr":1e-30,"ip":0,"op":1,"w":10,"h":10,"layers":[]}"#)
            .with("endless", r#"{"fr":1,"ip":-3e38,"op":3e38,"w":10,"h":10,"layers":[]}"#);
        let mut view = LottieView::new(scheduler.clone()).with_resources(resources);

        for name in ["glacial", "endless"] {
            let err = view.set_file_name(Some(name)).unwrap_err();
            assert_eq!(err.kind, LoadErrorKind::Parse);
            assert!(!view.is_loaded());
        }
        assert_eq!(scheduler.requests(), 2);
    }

    #[test]
    fn test_clearing_is_not_an_error() {
        let (mut view, scheduler, probe) = fixture();
        view.set_file_name(Some("one_second")).unwrap();

        for name in [None, Some(""), Some("   ")] {
            assert!(view.set_file_name(name).is_ok());
            assert!(!view.is_loaded());
        }
        assert_eq!(probe.borrow().live, 0);
        assert_eq!(scheduler.requests(), 4);
    }

    #[test]
    fn test_measure_uses_intrinsic_size() {
        let (mut view, _, _) = fixture();
        let unspecified = MeasureSpec::UNSPECIFIED;
        assert_eq!(view.measure(unspecified, unspecified), ISize::new(100, 100));

        view.set_file_name(Some("one_second")).unwrap();
        assert_eq!(view.measure(unspecified, unspecified), ISize::new(320, 180));
        assert_eq!(
            view.measure(MeasureSpec::at_most(200), MeasureSpec::exactly(40)),
            ISize::new(200, 40)
        );
    }

    #[test]
    fn test_config_loads_file_name() {
        let (mut view, _, _) = fixture();
        view.apply_config(&LottieViewConfig::default()).unwrap();
        assert!(!view.is_loaded());

        view.apply_config(&LottieViewConfig::with_file_name("other.json"))
            .unwrap();
        assert_eq!(view.animation().map(|a| a.duration()), Some(Duration::from_millis(500)));
    }
}
