//! Overlay rendering primitives.
//!
//! Pipeline for one surface, driven by `core-session`:
//! 1. `measure`: derive border/padding/line-height from the surface style.
//! 2. `mirror`: lay the surface's text out off-screen and answer "which
//!    pixel boxes does UTF-16 range `[s, e)` occupy" (content-box-local).
//! 3. `issue`: turn corrections into stable-id issues and measured
//!    `RangeDescriptor`s (one per visual box).
//! 4. `underline`: virtualize descriptors against the viewport and reconcile
//!    them into overlay nodes through an `OverlaySink`.
//! 5. `frame`: coalesce invalidations into one flush per animation frame.
//!
//! `native` is the alternative target for hosts with range highlighting;
//! `target` picks between the two once per session. `headless` provides an
//! in-memory host for tests and the CLI.
//!
//! Everything here is single-threaded and host-agnostic: no method blocks,
//! and all host access goes through the traits re-exported below.

pub mod dirty;
pub mod frame;
pub mod headless;
pub mod issue;
pub mod measure;
pub mod mirror;
pub mod native;
pub mod target;
pub mod underline;

pub use dirty::DirtyFlags;
pub use frame::{FrameClock, FrameMetricsSnapshot, FrameScheduler, FrameToken, ManualFrameClock};
pub use headless::HeadlessOverlay;
pub use issue::{Issue, RangeDescriptor, build_descriptors, issue_id, issues_from_corrections};
pub use measure::{BoxMetrics, NORMAL_LINE_HEIGHT, line_height_px, measure};
pub use mirror::{LayoutMirror, Mirror};
pub use native::{HighlightRegistry, NativeHighlighter};
pub use target::{OverlayHost, RenderTarget};
pub use underline::{NODE_ROLE, OverlayNode, OverlaySink, RenderOptions, RenderStats, UnderlineRenderer};
