//! # Editing surface
//!
//! The rich-text editor is an external collaborator. [`EditorSurface`] is the
//! slice of its API the fields engine relies on: read and replace content,
//! insert at the caret, take focus, and report change notifications.
//!
//! Host editors normally deliver notifications through callbacks registered
//! with `on("change keyup paste", handler)`. Here the surface queues events
//! for the kinds it was subscribed to and the owner drains them with
//! [`EditorSurface::take_events`], which keeps every reconciliation on the
//! caller's stack and avoids shared mutable handles.
//!
//! [`MemorySurface`] is the in-process implementation used by the terminal
//! front end and the tests. Its buffer is an `xi_rope::Rope`.

use std::fmt;
use std::ops::Range;

use xi_rope::Rope;

/// Content shown when the editor opens on a blank document
pub const DEFAULT_INITIAL_CONTENT: &str = "<p>Start typing your document here. Click on fields in the left panel to insert dynamic content.</p>";

/// Notification emitted by the editing surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    Change,
    KeyUp,
    Paste,
    /// A toolbar button was pressed; carries the button name
    Action(String),
}

impl EditorEvent {
    fn bit(&self) -> u8 {
        match self {
            EditorEvent::Change => EventSet::CHANGE.0,
            EditorEvent::KeyUp => EventSet::KEYUP.0,
            EditorEvent::Paste => EventSet::PASTE.0,
            EditorEvent::Action(_) => 0,
        }
    }
}

/// Set of content notification kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventSet(u8);

/// Notifications that trigger a field sync pass
pub const SYNC_EVENTS: EventSet = EventSet(EventSet::CHANGE.0 | EventSet::KEYUP.0 | EventSet::PASTE.0);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown editor event: {0}")]
pub struct UnknownEvent(pub String);

impl EventSet {
    pub const EMPTY: EventSet = EventSet(0);
    pub const CHANGE: EventSet = EventSet(1);
    pub const KEYUP: EventSet = EventSet(1 << 1);
    pub const PASTE: EventSet = EventSet(1 << 2);

    /// Parse a space separated list such as `"change keyup paste"`
    pub fn parse(names: &str) -> Result<Self, UnknownEvent> {
        names
            .split_whitespace()
            .try_fold(EventSet::EMPTY, |set, name| {
                let kind = match name.to_ascii_lowercase().as_str() {
                    "change" => EventSet::CHANGE,
                    "keyup" => EventSet::KEYUP,
                    "paste" => EventSet::PASTE,
                    _ => return Err(UnknownEvent(name.to_string())),
                };
                Ok(set.union(kind))
            })
    }

    pub fn union(self, other: EventSet) -> EventSet {
        EventSet(self.0 | other.0)
    }

    pub fn without(self, other: EventSet) -> EventSet {
        EventSet(self.0 & !other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether `event` is a content notification kind in this set
    pub fn matches(self, event: &EditorEvent) -> bool {
        self.0 & event.bit() != 0
    }
}

impl fmt::Display for EventSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (EventSet::CHANGE, "change"),
            (EventSet::KEYUP, "keyup"),
            (EventSet::PASTE, "paste"),
        ]
        .into_iter()
        .filter(|(kind, _)| self.0 & kind.0 != 0)
        .map(|(_, name)| name)
        .collect();
        f.write_str(&names.join(" "))
    }
}

/// A custom toolbar button registered with the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarButton {
    /// Registry name; reported back in [`EditorEvent::Action`]
    pub name: String,
    pub text: String,
    pub icon: String,
    pub tooltip: String,
}

/// The editor operations the fields engine consumes
pub trait EditorSurface {
    /// Full document content
    fn content(&self) -> String;

    /// Replace the whole document
    fn set_content(&mut self, content: &str);

    /// Insert at the caret, replacing any selection
    fn insert_content(&mut self, content: &str);

    /// Move input focus to the editing area
    fn focus(&mut self);

    /// Start queueing the given notification kinds
    fn subscribe(&mut self, events: EventSet);

    /// Stop queueing the given notification kinds
    fn unsubscribe(&mut self, events: EventSet);

    /// Drain queued notifications in the order they happened
    fn take_events(&mut self) -> Vec<EditorEvent>;

    /// Add a custom toolbar button
    fn add_button(&mut self, button: ToolbarButton);
}

/// In-memory editing surface backed by a rope
#[derive(Clone)]
pub struct MemorySurface {
    buffer: Rope,
    /// Byte range of the selection; an empty range is the caret
    selection: Range<usize>,
    focused: bool,
    subscribed: EventSet,
    pending: Vec<EditorEvent>,
    buttons: Vec<ToolbarButton>,
    version: u64,
}

impl MemorySurface {
    /// Surface holding `content` with the caret at the end
    pub fn new(content: &str) -> Self {
        let buffer = Rope::from(content);
        let len = buffer.len();
        Self {
            buffer,
            selection: len..len,
            focused: false,
            subscribed: EventSet::EMPTY,
            pending: Vec::new(),
            buttons: Vec::new(),
            version: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() == 0
    }

    pub fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    /// Edit counter, bumped on every content mutation
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn has_focus(&self) -> bool {
        self.focused
    }

    pub fn buttons(&self) -> &[ToolbarButton] {
        &self.buttons
    }

    pub fn subscribed(&self) -> EventSet {
        self.subscribed
    }

    /// Set the selection, clamped to the document and snapped back to char boundaries
    pub fn select(&mut self, range: Range<usize>) {
        let text = self.buffer.to_string();
        let start = floor_char_boundary(&text, range.start);
        let end = floor_char_boundary(&text, range.end.max(range.start));
        self.selection = start..end;
    }

    /// Simulate the user typing `text` at the caret: a key release, then the
    /// content change it caused
    pub fn type_text(&mut self, text: &str) {
        self.replace_selection(text);
        self.emit(EditorEvent::KeyUp);
        self.emit(EditorEvent::Change);
    }

    /// Simulate pasting `text` at the caret
    pub fn paste(&mut self, text: &str) {
        self.replace_selection(text);
        self.emit(EditorEvent::Paste);
    }

    /// Simulate a toolbar click; returns false for unknown buttons
    pub fn click_button(&mut self, name: &str) -> bool {
        if !self.buttons.iter().any(|b| b.name == name) {
            return false;
        }
        self.pending.push(EditorEvent::Action(name.to_string()));
        true
    }

    fn replace_selection(&mut self, text: &str) {
        let start = self.selection.start;
        self.buffer.edit(self.selection.clone(), text);
        let caret = start + text.len();
        self.selection = caret..caret;
        self.version += 1;
    }

    fn emit(&mut self, event: EditorEvent) {
        if self.subscribed.matches(&event) {
            self.pending.push(event);
        }
    }
}

impl fmt::Debug for MemorySurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySurface")
            .field("len", &self.buffer.len())
            .field("selection", &self.selection)
            .field("focused", &self.focused)
            .field("subscribed", &self.subscribed)
            .field("pending", &self.pending)
            .field("version", &self.version)
            .finish()
    }
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_CONTENT)
    }
}

impl EditorSurface for MemorySurface {
    fn content(&self) -> String {
        self.buffer.to_string()
    }

    fn set_content(&mut self, content: &str) {
        self.buffer = Rope::from(content);
        let len = self.buffer.len();
        self.selection = len..len;
        self.version += 1;
        self.emit(EditorEvent::Change);
    }

    fn insert_content(&mut self, content: &str) {
        self.replace_selection(content);
        self.emit(EditorEvent::Change);
    }

    fn focus(&mut self) {
        self.focused = true;
    }

    fn subscribe(&mut self, events: EventSet) {
        self.subscribed = self.subscribed.union(events);
    }

    fn unsubscribe(&mut self, events: EventSet) {
        self.subscribed = self.subscribed.without(events);
        self.pending.retain(|event| {
            matches!(event, EditorEvent::Action(_)) || self.subscribed.matches(event)
        });
    }

    fn take_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.pending)
    }

    fn add_button(&mut self, button: ToolbarButton) {
        self.buttons.retain(|b| b.name != button.name);
        self.buttons.push(button);
    }
}

fn floor_char_boundary(text: &str, at: usize) -> usize {
    let mut at = at.min(text.len());
    while !text.is_char_boundary(at) {
        at -= 1;
    }
    at
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("change keyup paste", SYNC_EVENTS)]
    #[case("change", EventSet::CHANGE)]
    #[case("  KeyUp   paste ", EventSet::KEYUP.union(EventSet::PASTE))]
    #[case("", EventSet::EMPTY)]
    fn test_event_set_parse(#[case] input: &str, #[case] expected: EventSet) {
        assert_eq!(EventSet::parse(input), Ok(expected));
    }

    #[test]
    fn test_event_set_parse_rejects_unknown() {
        assert_eq!(
            EventSet::parse("change blur"),
            Err(UnknownEvent("blur".to_string()))
        );
    }

    #[test]
    fn test_event_set_display() {
        assert_eq!(SYNC_EVENTS.to_string(), "change keyup paste");
        assert_eq!(SYNC_EVENTS.without(EventSet::KEYUP).to_string(), "change paste");
    }

    #[test]
    fn test_new_surface_caret_at_end() {
        let surface = MemorySurface::new("hello");
        assert_eq!(surface.selection(), 5..5);
        assert_eq!(surface.content(), "hello");
    }

    #[test]
    fn test_insert_replaces_selection() {
        let mut surface = MemorySurface::new("Hello world");
        surface.select(6..11);

        surface.insert_content("{{customer.name}}");

        assert_eq!(surface.content(), "Hello {{customer.name}}");
        assert_eq!(surface.selection(), 23..23);
    }

    #[test]
    fn test_events_only_queued_when_subscribed() {
        let mut surface = MemorySurface::new("");
        surface.type_text("a");
        assert!(surface.take_events().is_empty());

        surface.subscribe(SYNC_EVENTS);
        surface.type_text("b");
        surface.paste("c");
        surface.set_content("abc!");

        assert_eq!(
            surface.take_events(),
            vec![
                EditorEvent::KeyUp,
                EditorEvent::Change,
                EditorEvent::Paste,
                EditorEvent::Change
            ]
        );
        assert!(surface.take_events().is_empty());
    }

    #[test]
    fn test_typing_queues_only_subscribed_kinds() {
        // Given a surface listening for key releases only
        let mut surface = MemorySurface::new("");
        surface.subscribe(EventSet::KEYUP);

        // When text is typed
        surface.type_text("a");

        // Then the content change is filtered out
        assert_eq!(surface.take_events(), vec![EditorEvent::KeyUp]);
    }

    #[test]
    fn test_unsubscribe_drops_pending_content_events() {
        let mut surface = MemorySurface::new("");
        surface.subscribe(SYNC_EVENTS);
        surface.type_text("x");

        surface.unsubscribe(SYNC_EVENTS);

        assert!(surface.take_events().is_empty());
        assert!(surface.subscribed().is_empty());
    }

    #[test]
    fn test_select_snaps_to_char_boundary() {
        let mut surface = MemorySurface::new("héllo");
        surface.select(2..100);
        assert_eq!(surface.selection(), 1..6);
    }

    #[test]
    fn test_toolbar_button_clicks() {
        let mut surface = MemorySurface::new("");
        assert!(!surface.click_button("importdocx"));

        surface.add_button(ToolbarButton {
            name: "importdocx".to_string(),
            text: "Import".to_string(),
            icon: "new-document".to_string(),
            tooltip: "Import".to_string(),
        });

        assert!(surface.click_button("importdocx"));
        assert_eq!(
            surface.take_events(),
            vec![EditorEvent::Action("importdocx".to_string())]
        );
    }

    #[test]
    fn test_focus_and_version() {
        let mut surface = MemorySurface::new("");
        assert!(!surface.has_focus());
        surface.focus();
        assert!(surface.has_focus());

        surface.insert_content("x");
        surface.set_content("y");
        assert_eq!(surface.version(), 2);
    }
}
