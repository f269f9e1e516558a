//! # Fields panel
//!
//! Owned state behind the dynamic-fields sidebar and the operations that
//! keep it consistent with an [`EditorSurface`].
//!
//! Existence flows one way: [`FieldsPanel::sync`] derives the registry from
//! the document text. Structured edits flow the other way through explicit
//! text rewrites: insert, rename on save, and delete. Metadata never changes
//! the document without one of those calls.
//!
//! Every mutating operation is a silent no-op while no editor is attached.

use std::collections::BTreeSet;

use log::debug;

use crate::fields::{
    DEFAULT_NEW_FIELD_CATEGORY, Field, FieldId, FieldRegistry, FieldType, NewFieldDraft,
    ReconcileOutcome,
};
use crate::surface::{EditorEvent, EditorSurface, EventSet, SYNC_EVENTS};
use crate::tokens;

/// Panel behaviour that varies per deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSettings {
    /// Category pre-filled in the add form
    pub default_category: String,
    /// Categories shown expanded on first render
    pub expanded_categories: Vec<String>,
    /// Editor notifications that trigger a sync pass
    pub sync_events: EventSet,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            default_category: DEFAULT_NEW_FIELD_CATEGORY.to_string(),
            expanded_categories: vec!["customer".to_string(), "invoice".to_string()],
            sync_events: SYNC_EVENTS,
        }
    }
}

/// The row currently in the editing state.
///
/// Edits go straight into the live field; only the name the document last
/// saw is remembered so saving can find the tokens to rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EditSession {
    id: FieldId,
    original_name: String,
}

/// Owned sidebar state plus an optional attached editor
#[derive(Debug)]
pub struct FieldsPanel<S: EditorSurface> {
    registry: FieldRegistry,
    editing: Option<EditSession>,
    draft: Option<NewFieldDraft>,
    expanded: BTreeSet<String>,
    settings: PanelSettings,
    editor: Option<S>,
}

impl<S: EditorSurface> FieldsPanel<S> {
    pub fn new(settings: PanelSettings) -> Self {
        Self {
            registry: FieldRegistry::new(),
            editing: None,
            draft: None,
            expanded: settings.expanded_categories.iter().cloned().collect(),
            settings,
            editor: None,
        }
    }

    /// Attach the editor, subscribe to content notifications, and sync once
    pub fn attach(&mut self, mut editor: S) {
        editor.subscribe(self.settings.sync_events);
        self.editor = Some(editor);
        self.sync();
    }

    /// Unsubscribe and hand the editor back
    pub fn detach(&mut self) -> Option<S> {
        let mut editor = self.editor.take()?;
        editor.unsubscribe(self.settings.sync_events);
        Some(editor)
    }

    pub fn editor(&self) -> Option<&S> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut S> {
        self.editor.as_mut()
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    /// Reconcile the registry against the editor's current content
    pub fn sync(&mut self) -> ReconcileOutcome {
        let Some(editor) = self.editor.as_ref() else {
            return ReconcileOutcome::default();
        };

        let names = tokens::extract_field_names(&editor.content());
        let outcome = self.registry.reconcile(&names);
        if !outcome.is_unchanged() {
            debug!(
                "field sync: {} added, {} removed, {} total",
                outcome.added.len(),
                outcome.removed.len(),
                self.registry.len()
            );
        }
        outcome
    }

    /// Drain editor notifications.
    ///
    /// Each content notification runs a full sync against the content as it
    /// is now. Toolbar actions are returned for the host to route.
    pub fn pump(&mut self) -> Vec<String> {
        let Some(editor) = self.editor.as_mut() else {
            return Vec::new();
        };

        let sync_events = self.settings.sync_events;
        let mut actions = Vec::new();
        for event in editor.take_events() {
            match event {
                EditorEvent::Action(name) => actions.push(name),
                event if sync_events.matches(&event) => {
                    self.sync();
                }
                _ => {}
            }
        }
        actions
    }

    /// Insert a field's token at the caret and return focus to the editor
    pub fn insert_field(&mut self, id: FieldId) -> bool {
        let Some(field) = self.registry.get(id) else {
            return false;
        };
        let Some(editor) = self.editor.as_mut() else {
            return false;
        };

        editor.insert_content(&tokens::insertion_markup(field));
        editor.focus();
        true
    }

    /// Delete a field and strip its tokens from the document
    pub fn delete_field(&mut self, id: FieldId) -> Option<Field> {
        let name = self.registry.get(id)?.name.clone();
        let editor = self.editor.as_mut()?;

        let content = editor.content();
        editor.set_content(&tokens::strip_tokens(&content, &name));

        if self.editing.as_ref().is_some_and(|session| session.id == id) {
            self.editing = None;
        }
        self.registry.remove(id)
    }

    // Add flow

    pub fn begin_add(&mut self) {
        if self.draft.is_none() {
            self.draft = Some(NewFieldDraft::with_category(&self.settings.default_category));
        }
    }

    pub fn is_adding(&self) -> bool {
        self.draft.is_some()
    }

    pub fn draft(&self) -> Option<&NewFieldDraft> {
        self.draft.as_ref()
    }

    pub fn draft_mut(&mut self) -> Option<&mut NewFieldDraft> {
        self.draft.as_mut()
    }

    /// Create the drafted field and insert it, followed by a space.
    ///
    /// Nothing happens while the name or category is empty. Without an
    /// editor the field is still registered, but the next sync will drop it
    /// unless its token shows up in content.
    pub fn commit_add(&mut self) -> Option<FieldId> {
        let field = self.draft.as_ref()?.to_field()?;
        let id = field.id;

        if let Some(editor) = self.editor.as_mut() {
            editor.insert_content(&format!("{} ", tokens::insertion_markup(&field)));
            editor.focus();
        }
        self.registry.push(field);

        self.draft = None;
        Some(id)
    }

    pub fn cancel_add(&mut self) {
        self.draft = None;
    }

    // Edit flow

    pub fn begin_edit(&mut self, id: FieldId) -> bool {
        let Some(field) = self.registry.get(id) else {
            return false;
        };
        self.editing = Some(EditSession {
            id,
            original_name: field.name.clone(),
        });
        true
    }

    pub fn editing(&self) -> Option<FieldId> {
        self.editing.as_ref().map(|session| session.id)
    }

    pub fn is_editing(&self, id: FieldId) -> bool {
        self.editing() == Some(id)
    }

    /// The field being edited, for in-place changes
    pub fn editing_field_mut(&mut self) -> Option<&mut Field> {
        let id = self.editing()?;
        self.registry.get_mut(id)
    }

    pub fn edit_name(&mut self, name: &str) {
        if let Some(field) = self.editing_field_mut() {
            field.name = name.to_string();
        }
    }

    pub fn edit_type(&mut self, field_type: FieldType) {
        if let Some(field) = self.editing_field_mut() {
            field.field_type = field_type;
        }
    }

    pub fn edit_placeholder(&mut self, placeholder: &str) {
        if let Some(field) = self.editing_field_mut() {
            field.placeholder = Some(placeholder.to_string());
        }
    }

    /// Commit the row being edited and return to viewing.
    ///
    /// A changed name rewrites every `{{old}}` token in the document. If the
    /// field is gone or no editor is attached, editing simply ends.
    pub fn save_edit(&mut self) -> bool {
        let Some(session) = self.editing.take() else {
            return false;
        };
        let Some(field) = self.registry.get(session.id) else {
            return false;
        };
        let Some(editor) = self.editor.as_mut() else {
            return false;
        };

        if !field.name.is_empty() && field.name != session.original_name {
            let content = editor.content();
            editor.set_content(&tokens::rename_tokens(
                &content,
                &session.original_name,
                &field.name,
            ));
        }
        true
    }

    /// Leave editing without reverting in-place changes
    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    // Category expansion

    pub fn toggle_category(&mut self, category: &str) {
        if !self.expanded.remove(category) {
            self.expanded.insert(category.to_string());
        }
    }

    pub fn is_expanded(&self, category: &str) -> bool {
        self.expanded.contains(category)
    }

    /// Render-ready snapshot of the sidebar
    pub fn view(&self) -> PanelView {
        let categories = self
            .registry
            .grouped()
            .into_iter()
            .map(|group| CategoryView {
                expanded: self.is_expanded(group.category),
                count: group.fields.len(),
                rows: group
                    .fields
                    .iter()
                    .map(|field| FieldRow {
                        id: field.id,
                        name: field.name.clone(),
                        type_label: field.field_type.label(),
                        editing: self.is_editing(field.id),
                    })
                    .collect(),
                category: group.category.to_string(),
            })
            .collect::<Vec<_>>();

        PanelView {
            is_empty: categories.is_empty() && !self.is_adding(),
            categories,
            adding: self.is_adding(),
        }
    }
}

impl<S: EditorSurface> Default for FieldsPanel<S> {
    fn default() -> Self {
        Self::new(PanelSettings::default())
    }
}

/// Sidebar contents grouped by category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelView {
    pub categories: Vec<CategoryView>,
    pub adding: bool,
    /// True when the "no fields yet" hint should show
    pub is_empty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryView {
    pub category: String,
    pub count: usize,
    pub expanded: bool,
    pub rows: Vec<FieldRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRow {
    pub id: FieldId,
    pub name: String,
    pub type_label: &'static str,
    pub editing: bool,
}
