use std::collections::HashSet;

use super::{Field, FieldId};

/// In-memory list of field definitions.
///
/// Document content decides which fields exist; the registry only carries
/// their metadata. [`FieldRegistry::reconcile`] is the single place where
/// existence flows from content into the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRegistry {
    fields: Vec<Field>,
}

/// What a reconciliation pass changed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub removed: Vec<Field>,
    pub added: Vec<FieldId>,
}

impl ReconcileOutcome {
    pub fn is_unchanged(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Fields sharing a category, in registry order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup<'a> {
    pub category: &'a str,
    pub fields: Vec<&'a Field>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the next registry from the names present in content.
    ///
    /// Fields whose name is absent are dropped, then every name without a
    /// surviving field is adopted as a new string field. The next list is
    /// built aside and swapped in with a single assignment, so no caller can
    /// observe a half-pruned registry.
    pub fn reconcile<S: AsRef<str>>(&mut self, names: &[S]) -> ReconcileOutcome {
        let present: HashSet<&str> = names.iter().map(AsRef::as_ref).collect();

        let (mut next, removed): (Vec<Field>, Vec<Field>) = self
            .fields
            .drain(..)
            .partition(|field| present.contains(field.name.as_str()));

        let mut added = Vec::new();
        for name in names.iter().map(AsRef::as_ref) {
            if next.iter().any(|field| field.name == name) {
                continue;
            }
            let field = Field::discovered(name);
            added.push(field.id);
            next.push(field);
        }

        self.fields = next;
        ReconcileOutcome { removed, added }
    }

    /// Append a field without touching existing entries (names may repeat)
    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub fn get(&self, id: FieldId) -> Option<&Field> {
        self.fields.iter().find(|field| field.id == id)
    }

    pub fn get_mut(&mut self, id: FieldId) -> Option<&mut Field> {
        self.fields.iter_mut().find(|field| field.id == id)
    }

    /// First field carrying `name`
    pub fn find_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Remove a field by id, returning it if it existed
    pub fn remove(&mut self, id: FieldId) -> Option<Field> {
        let index = self.fields.iter().position(|field| field.id == id)?;
        Some(self.fields.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Group fields by category.
    ///
    /// Categories appear in the order their first field appears.
    pub fn grouped(&self) -> Vec<CategoryGroup<'_>> {
        let mut groups: Vec<CategoryGroup<'_>> = Vec::new();
        for field in &self.fields {
            match groups.iter_mut().find(|g| g.category == field.category) {
                Some(group) => group.fields.push(field),
                None => groups.push(CategoryGroup {
                    category: &field.category,
                    fields: vec![field],
                }),
            }
        }
        groups
    }
}
