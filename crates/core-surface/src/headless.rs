//! In-memory surface used by the CLI and by tests across the workspace.
//!
//! Scroll offsets clamp against `content_size` (set by the caller; defaults to
//! the client size, i.e. nothing to scroll). `dispatch_input` invokes the
//! registered listeners synchronously, in registration order, after
//! releasing every internal borrow so listeners may read the surface back.

use crate::{Point, Rect, Size, Surface, SurfaceId, SurfaceKind, SurfaceStyle};
use core_text::{Utf16Range, clamp_offset, utf16_len};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

type InputListener = Rc<dyn Fn()>;

pub struct HeadlessSurface {
    id: SurfaceId,
    kind: SurfaceKind,
    text: RefCell<String>,
    selection: Cell<Utf16Range>,
    style: Cell<SurfaceStyle>,
    rect: Cell<Rect>,
    client: Cell<Size>,
    content: Cell<Size>,
    scroll: Cell<Point>,
    focus_count: Cell<u32>,
    input_count: Cell<u32>,
    normalize_count: Cell<u32>,
    listeners: RefCell<Vec<InputListener>>,
}

impl std::fmt::Debug for HeadlessSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessSurface")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("text_len", &utf16_len(&self.text.borrow()))
            .finish_non_exhaustive()
    }
}

impl HeadlessSurface {
    pub fn new(kind: SurfaceKind, text: &str) -> Self {
        let style = SurfaceStyle {
            wrap: !matches!(kind, SurfaceKind::TextInput),
            ..SurfaceStyle::default()
        };
        let client = Size::new(
            style.box_width_px - style.border.horizontal(),
            200.0 - style.border.vertical(),
        );
        let caret = utf16_len(text);
        Self {
            id: SurfaceId::allocate(),
            kind,
            text: RefCell::new(text.to_string()),
            selection: Cell::new(Utf16Range::new(caret, caret)),
            style: Cell::new(style),
            rect: Cell::new(Rect::new(0.0, 0.0, style.box_width_px, 200.0)),
            client: Cell::new(client),
            content: Cell::new(client),
            scroll: Cell::new(Point::default()),
            focus_count: Cell::new(0),
            input_count: Cell::new(0),
            normalize_count: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn text_area(text: &str) -> Self {
        Self::new(SurfaceKind::TextArea, text)
    }

    pub fn set_style(&self, style: SurfaceStyle) {
        self.style.set(style);
    }

    pub fn set_bounding_rect(&self, rect: Rect) {
        self.rect.set(rect);
    }

    pub fn set_client_size(&self, size: Size) {
        self.client.set(size);
    }

    /// Total scrollable extent; scroll offsets clamp to `content - client`.
    pub fn set_content_size(&self, size: Size) {
        self.content.set(size);
    }

    pub fn on_input(&self, listener: impl Fn() + 'static) {
        self.listeners.borrow_mut().push(Rc::new(listener));
    }

    /// Simulate a user edit: replace the value, move the caret, dispatch input.
    pub fn type_text(&self, text: &str) {
        self.set_text(text);
        let caret = utf16_len(text);
        self.selection.set(Utf16Range::new(caret, caret));
        self.dispatch_input();
    }

    pub fn focus_count(&self) -> u32 {
        self.focus_count.get()
    }

    pub fn input_count(&self) -> u32 {
        self.input_count.get()
    }

    pub fn normalize_count(&self) -> u32 {
        self.normalize_count.get()
    }
}

impl Surface for HeadlessSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn kind(&self) -> SurfaceKind {
        self.kind
    }

    fn text(&self) -> String {
        self.text.borrow().clone()
    }

    fn set_text(&self, text: &str) {
        *self.text.borrow_mut() = text.to_string();
        let sel = self.selection.get();
        self.selection.set(Utf16Range::new(
            clamp_offset(text, sel.start),
            clamp_offset(text, sel.end),
        ));
    }

    fn selection(&self) -> Utf16Range {
        self.selection.get()
    }

    fn set_selection(&self, range: Utf16Range) {
        let text = self.text.borrow();
        self.selection.set(Utf16Range::new(
            clamp_offset(&text, range.start),
            clamp_offset(&text, range.end),
        ));
    }

    fn style(&self) -> SurfaceStyle {
        self.style.get()
    }

    fn bounding_rect(&self) -> Rect {
        self.rect.get()
    }

    fn client_size(&self) -> Size {
        self.client.get()
    }

    fn scroll_offset(&self) -> Point {
        self.scroll.get()
    }

    fn set_scroll_offset(&self, offset: Point) {
        let client = self.client.get();
        let content = self.content.get();
        let max_x = (content.width - client.width).max(0.0);
        let max_y = (content.height - client.height).max(0.0);
        self.scroll.set(Point::new(
            offset.x.clamp(0.0, max_x),
            offset.y.clamp(0.0, max_y),
        ));
    }

    fn focus(&self) {
        self.focus_count.set(self.focus_count.get() + 1);
    }

    fn dispatch_input(&self) {
        self.input_count.set(self.input_count.get() + 1);
        let listeners: Vec<InputListener> = self.listeners.borrow().clone();
        tracing::trace!(target: "surface", id = self.id.0, listeners = listeners.len(), "dispatch_input");
        for listener in listeners {
            listener();
        }
    }

    fn normalize(&self) {
        self.normalize_count.set(self.normalize_count.get() + 1);
    }
}
