//! # skottie-view
//!
//! A Lottie animation view for hosts that drive painting themselves.
//!
//! [`LottieView`] is a plain controller: the host hands it a canvas on every
//! paint, asks it for a size during layout, and provides an [`Invalidator`] so
//! the view can request its next frame. Animations are looked up in a bundled
//! raw resource store first and on the filesystem second, then decoded by an
//! [`AnimationFactory`] (by default the Skia-backed Lottie engine from this
//! workspace).
//!
//! ```no_run
//! use skottie_view::{FrameScheduler, LottieView, MeasureSpec};
//! use skia_safe::{surfaces, IRect};
//! use std::rc::Rc;
//! use std::time::Instant;
//!
//! let scheduler = Rc::new(FrameScheduler::new(Instant::now()));
//! let mut view = LottieView::new(scheduler.clone());
//! view.set_file_name(Some("animations/pulse.json"))?;
//!
//! let size = view.measure(MeasureSpec::UNSPECIFIED, MeasureSpec::UNSPECIFIED);
//! let mut surface = surfaces::raster_n32_premul((size.width, size.height)).unwrap();
//! while let Some(now) = scheduler.next_frame() {
//!     view.paint(surface.canvas(), IRect::from_size(size), now);
//! #   break;
//! }
//! # Ok::<(), skottie_view::LoadError>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod resources;
pub mod view;

pub use config::LottieViewConfig;
pub use engine::{Animation, AnimationFactory, SkottieAnimation, SkottieFactory};
pub use error::{LoadError, LoadErrorKind, ResolveError};
pub use host::{FrameScheduler, Invalidator, MeasureMode, MeasureSpec};
pub use resources::{MemoryResources, RawResourceDir, RawResources};
pub use view::{LottieView, FALLBACK_SIZE, FRAME_DELAY};
