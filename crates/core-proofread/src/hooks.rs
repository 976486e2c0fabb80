use std::rc::Rc;

use core_session::TargetSession;
use core_text::Correction;

/// Host callbacks registered per surface. Called with no controller borrow
/// held, so implementations may query the controller.
pub trait ProofreadHooks {
    fn highlight(&self, corrections: &[Correction]);
    fn clear_highlights(&self);
    fn on_corrections_change(&self, _corrections: &[Correction]) {}
}

/// Hooks that ignore everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl ProofreadHooks for NoopHooks {
    fn highlight(&self, _corrections: &[Correction]) {}
    fn clear_highlights(&self) {}
}

/// Feeds corrections into a target session as issues.
#[derive(Debug, Clone)]
pub struct SessionHighlighter {
    session: Rc<TargetSession>,
}

impl SessionHighlighter {
    pub fn new(session: Rc<TargetSession>) -> Self {
        Self { session }
    }
}

impl ProofreadHooks for SessionHighlighter {
    fn highlight(&self, corrections: &[Correction]) {
        self.session.set_corrections(corrections);
    }

    fn clear_highlights(&self) {
        self.session.set_issues(Vec::new());
    }
}

/// Push a correction set to hooks: highlight (or clear when empty), then notify.
pub(crate) fn publish(hooks: &dyn ProofreadHooks, corrections: &[Correction]) {
    if corrections.is_empty() {
        hooks.clear_highlights();
    } else {
        hooks.highlight(corrections);
    }
    hooks.on_corrections_change(corrections);
}
