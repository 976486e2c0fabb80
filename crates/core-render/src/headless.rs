//! In-memory overlay host. Clones share state, so a test can keep a handle
//! while the session owns the boxed host.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use core_surface::{HostCapabilities, Rect};
use core_text::{CorrectionKind, Utf16Range};

use crate::native::HighlightRegistry;
use crate::target::OverlayHost;
use crate::underline::{OverlayNode, OverlaySink};

#[derive(Debug, Default)]
struct OverlayState {
    nodes: BTreeMap<String, OverlayNode>,
    attached: bool,
    frame: Rect,
    creates: u64,
    updates: u64,
    removes: u64,
    highlights: BTreeMap<CorrectionKind, Vec<Utf16Range>>,
}

#[derive(Debug, Clone)]
pub struct HeadlessOverlay {
    state: Rc<RefCell<OverlayState>>,
    caps: HostCapabilities,
}

impl Default for HeadlessOverlay {
    fn default() -> Self {
        Self::new(HostCapabilities::detect())
    }
}

impl HeadlessOverlay {
    pub fn new(caps: HostCapabilities) -> Self {
        Self {
            state: Rc::new(RefCell::new(OverlayState::default())),
            caps,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.state.borrow().attached
    }

    pub fn frame(&self) -> Rect {
        self.state.borrow().frame
    }

    /// Nodes sorted by key.
    pub fn nodes(&self) -> Vec<OverlayNode> {
        self.state.borrow().nodes.values().cloned().collect()
    }

    pub fn node(&self, key: &str) -> Option<OverlayNode> {
        self.state.borrow().nodes.get(key).cloned()
    }

    pub fn node_count(&self) -> usize {
        self.state.borrow().nodes.len()
    }

    /// `(creates, updates, removes)` received so far.
    pub fn op_counts(&self) -> (u64, u64, u64) {
        let s = self.state.borrow();
        (s.creates, s.updates, s.removes)
    }

    pub fn highlights(&self, kind: CorrectionKind) -> Vec<Utf16Range> {
        self.state
            .borrow()
            .highlights
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }
}

impl OverlaySink for HeadlessOverlay {
    fn create_node(&mut self, node: &OverlayNode) {
        let mut s = self.state.borrow_mut();
        s.creates += 1;
        s.nodes.insert(node.key.clone(), node.clone());
    }

    fn update_node(&mut self, node: &OverlayNode) {
        let mut s = self.state.borrow_mut();
        s.updates += 1;
        s.nodes.insert(node.key.clone(), node.clone());
    }

    fn remove_node(&mut self, key: &str) {
        let mut s = self.state.borrow_mut();
        s.removes += 1;
        s.nodes.remove(key);
    }
}

impl HighlightRegistry for HeadlessOverlay {
    fn set_highlights(&mut self, kind: CorrectionKind, ranges: &[Utf16Range]) {
        let mut s = self.state.borrow_mut();
        if ranges.is_empty() {
            s.highlights.remove(&kind);
        } else {
            s.highlights.insert(kind, ranges.to_vec());
        }
    }

    fn clear_highlights(&mut self) {
        self.state.borrow_mut().highlights.clear();
    }
}

impl OverlayHost for HeadlessOverlay {
    fn attach(&mut self) {
        self.state.borrow_mut().attached = true;
    }

    fn detach(&mut self) {
        let mut s = self.state.borrow_mut();
        s.attached = false;
        s.nodes.clear();
    }

    fn position(&mut self, frame: Rect) {
        self.state.borrow_mut().frame = frame;
    }

    fn capabilities(&self) -> HostCapabilities {
        self.caps
    }
}
