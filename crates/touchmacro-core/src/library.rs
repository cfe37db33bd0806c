//! Ordered macro list with a weak selected-macro reference
//!
//! The selection is only an id. It is resolved against the list on demand and
//! is cleared when the macro it names is removed.

use crate::action::Action;
use crate::error::{Error, Result};
use crate::macros::{timestamp_id, Macro};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct MacroLibrary {
    macros: Vec<Macro>,
    selected: Option<String>,
}

impl MacroLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted parts. A selection naming no macro is dropped.
    pub fn from_parts(macros: Vec<Macro>, selected: Option<String>) -> Self {
        let selected = selected.filter(|id| {
            let known = macros.iter().any(|m| m.id() == id);
            if !known {
                debug!(id = %id, "dropping selection of unknown macro");
            }
            known
        });
        Self { macros, selected }
    }

    pub fn macros(&self) -> &[Macro] {
        &self.macros
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Macro> {
        self.macros.iter().find(|m| m.id() == id)
    }

    /// Create a macro with an id unique within this library and append it.
    pub fn create(&mut self, name: impl Into<String>, actions: Vec<Action>) -> &Macro {
        let id = self.allocate_id();
        self.macros.push(Macro::with_id(id, name, actions));
        &self.macros[self.macros.len() - 1]
    }

    /// Append an already-built macro.
    pub fn add(&mut self, macro_def: Macro) -> Result<()> {
        if self.get(macro_def.id()).is_some() {
            return Err(Error::duplicate_macro(macro_def.id()));
        }
        self.macros.push(macro_def);
        Ok(())
    }

    /// Replace name and actions of an existing macro in place.
    pub fn update(&mut self, id: &str, name: impl Into<String>, actions: Vec<Action>) -> Result<()> {
        let target = self
            .macros
            .iter_mut()
            .find(|m| m.id() == id)
            .ok_or_else(|| Error::macro_not_found(id))?;
        target.replace(name, actions);
        Ok(())
    }

    /// Remove a macro, clearing the selection if it pointed here.
    pub fn remove(&mut self, id: &str) -> Result<Macro> {
        let pos = self
            .macros
            .iter()
            .position(|m| m.id() == id)
            .ok_or_else(|| Error::macro_not_found(id))?;
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        Ok(self.macros.remove(pos))
    }

    pub fn select(&mut self, id: &str) -> Result<()> {
        if self.get(id).is_none() {
            return Err(Error::macro_not_found(id));
        }
        self.selected = Some(id.to_string());
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected(&self) -> Option<&Macro> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }

    fn allocate_id(&self) -> String {
        let mut id = timestamp_id();
        while self.get(&id).is_some() {
            id = match id.parse::<i64>() {
                Ok(n) => (n + 1).to_string(),
                Err(_) => format!("{}-1", id),
            };
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;

    fn sample() -> MacroLibrary {
        MacroLibrary::from_parts(
            vec![
                Macro::with_id("a", "first", vec![Action::tap(1, 1)]),
                Macro::with_id("b", "second", vec![Action::delay(5)]),
            ],
            Some("b".to_string()),
        )
    }

    #[test]
    fn create_allocates_unique_ids() {
        let mut lib = MacroLibrary::new();
        let first = lib.create("one", vec![]).id().to_string();
        let second = lib.create("two", vec![]).id().to_string();
        assert_ne!(first, second);
        assert_eq!(lib.len(), 2);
        assert_eq!(lib.macros()[0].name(), "one");
    }

    #[test]
    fn add_rejects_duplicate_id() {
        let mut lib = sample();
        let err = lib.add(Macro::with_id("a", "dup", vec![])).unwrap_err();
        assert_eq!(err.code, ErrorCode::DuplicateMacro);
    }

    #[test]
    fn remove_clears_matching_selection() {
        let mut lib = sample();
        assert_eq!(lib.selected().map(Macro::name), Some("second"));
        lib.remove("b").unwrap();
        assert_eq!(lib.selected_id(), None);
        assert!(lib.selected().is_none());
    }

    #[test]
    fn remove_keeps_other_selection() {
        let mut lib = sample();
        lib.remove("a").unwrap();
        assert_eq!(lib.selected_id(), Some("b"));
    }

    #[test]
    fn dangling_selection_is_dropped_on_load() {
        let lib = MacroLibrary::from_parts(vec![], Some("gone".to_string()));
        assert_eq!(lib.selected_id(), None);
    }

    #[test]
    fn update_replaces_in_place() {
        let mut lib = sample();
        lib.update("a", "renamed", vec![Action::delay(9)]).unwrap();
        let m = lib.get("a").unwrap();
        assert_eq!(m.name(), "renamed");
        assert_eq!(m.actions(), &[Action::delay(9)]);
        assert_eq!(lib.macros()[0].id(), "a");

        let err = lib.update("zzz", "x", vec![]).unwrap_err();
        assert_eq!(err.code, ErrorCode::MacroNotFound);
    }

    #[test]
    fn select_unknown_fails() {
        let mut lib = sample();
        assert!(lib.select("nope").is_err());
        assert_eq!(lib.selected_id(), Some("b"));
        lib.select("a").unwrap();
        assert_eq!(lib.selected_id(), Some("a"));
    }
}
