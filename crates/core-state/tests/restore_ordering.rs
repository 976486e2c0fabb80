//! Undo/redo against a live surface: restore callback runs before input fires.

use std::cell::RefCell;
use std::rc::Rc;

use core_events::{Key, KeyChord, ModMask};
use core_state::{RestoreHooks, UndoManager};
use core_surface::{HeadlessSurface, Platform, Surface};
use core_text::Utf16Range;
use pretty_assertions::assert_eq;

type Log = Rc<RefCell<Vec<String>>>;

struct Hooks {
    log: Log,
    surface: Rc<HeadlessSurface>,
    current: RefCell<Vec<&'static str>>,
}

impl RestoreHooks<Vec<&'static str>> for Hooks {
    fn current_metadata(&self) -> Vec<&'static str> {
        self.current.borrow().clone()
    }

    fn on_restore(&self, metadata: &Vec<&'static str>) {
        // The surface already holds the restored text at this point.
        self.log
            .borrow_mut()
            .push(format!("restore {:?} text={}", metadata, self.surface.text()));
        *self.current.borrow_mut() = metadata.clone();
    }
}

fn setup(text: &str) -> (Rc<HeadlessSurface>, Rc<Hooks>, UndoManager<Vec<&'static str>>, Log) {
    let surface = Rc::new(HeadlessSurface::text_area(text));
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let input_log = log.clone();
    surface.on_input(move || input_log.borrow_mut().push("input".into()));
    let hooks = Rc::new(Hooks {
        log: log.clone(),
        surface: surface.clone(),
        current: RefCell::new(Vec::new()),
    });
    let manager = UndoManager::new(surface.clone(), hooks.clone(), 100, Platform::Other);
    (surface, hooks, manager, log)
}

#[test]
fn undo_restores_metadata_before_input_event() {
    let (surface, hooks, manager, log) = setup("teh cat");
    *hooks.current.borrow_mut() = vec!["teh"];
    assert!(manager.capture(vec!["teh"]));
    surface.set_text("the cat");
    surface.set_selection(Utf16Range::new(3, 3));
    *hooks.current.borrow_mut() = vec![];

    assert!(manager.undo());
    assert_eq!(surface.text(), "teh cat");
    assert_eq!(
        *log.borrow(),
        vec!["restore [\"teh\"] text=teh cat".to_string(), "input".to_string()]
    );
    assert_eq!(manager.redo_depth(), 1);

    log.borrow_mut().clear();
    assert!(manager.redo());
    assert_eq!(surface.text(), "the cat");
    assert_eq!(surface.selection(), Utf16Range::new(3, 3));
    assert_eq!(
        *log.borrow(),
        vec!["restore [] text=the cat".to_string(), "input".to_string()]
    );
}

#[test]
fn identical_captures_produce_one_entry() {
    let (_surface, _hooks, manager, _log) = setup("abc");
    assert!(manager.capture(vec!["x"]));
    assert!(!manager.capture(vec!["x"]));
    assert_eq!(manager.undo_depth(), 1);
    assert_eq!(manager.snapshots_skipped(), 1);
}

#[test]
fn empty_stacks_do_nothing() {
    let (surface, _hooks, manager, log) = setup("abc");
    assert!(!manager.undo());
    assert!(!manager.redo());
    assert!(log.borrow().is_empty());
    assert_eq!(surface.input_count(), 0);
}

#[test]
fn shortcuts_drive_history_and_are_consumed() {
    let (surface, _hooks, manager, _log) = setup("one");
    manager.capture(vec![]);
    surface.set_text("two");
    assert!(manager.handle_key(&KeyChord::new(Key::Char('z'), ModMask::CTRL)));
    assert_eq!(surface.text(), "one");
    assert!(manager.handle_key(&KeyChord::new(Key::Char('y'), ModMask::CTRL)));
    assert_eq!(surface.text(), "two");
    assert!(!manager.handle_key(&KeyChord::plain(Key::Char('z'))));
    assert_eq!(manager.metadata_for_text("one"), Some(vec![]));
    manager.clear();
    assert_eq!(manager.undo_depth() + manager.redo_depth(), 0);
}
