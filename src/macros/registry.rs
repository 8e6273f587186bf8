//! The macro table: the mapping an encoding context resolves invocation
//! addresses against.
//!
//! User macros are assigned sequential numeric addresses in registration
//! order and are also resolvable by name. References that match nothing in
//! the user space fall back to the built-in [`system`](crate::macros::system)
//! macros by name; system addresses live in their own space and are resolved
//! through [`crate::macros::system::system_macro_by_id`] directly.
//!
//! The table is deliberately plain: it is built up front by the encoding
//! context and handed to readers as a shared read-only reference. Nothing in
//! this crate mutates a table mid-stream.

use std::collections::HashMap;
use std::sync::Arc;

use crate::macros::definition::{Macro, MacroRef};
use crate::macros::system;
use crate::VellumError;

/// An address-ordered macro table with name lookup.
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    entries: Vec<Arc<Macro>>,
    by_name: HashMap<String, usize>,
}

impl MacroTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from macros in address order.
    pub fn with_macros(macros: impl IntoIterator<Item = Macro>) -> Result<Self, VellumError> {
        let mut table = MacroTable::new();
        for definition in macros {
            table.register(definition)?;
        }
        Ok(table)
    }

    /// Registers a macro at the next free address and returns that address.
    ///
    /// # Errors
    /// Fails if the macro's name is already taken; addresses never collide.
    pub fn register(&mut self, definition: Macro) -> Result<usize, VellumError> {
        let address = self.entries.len();
        if let Some(name) = definition.name() {
            if self.by_name.contains_key(name) {
                return Err(VellumError::invalid_macro(format!(
                    "macro '{}' is already registered",
                    name
                )));
            }
            self.by_name.insert(name.to_string(), address);
        }
        self.entries.push(Arc::new(definition));
        Ok(address)
    }

    /// Resolves a reference to a macro: the user space first, then the
    /// built-in system macros by name.
    pub fn resolve(&self, reference: &MacroRef) -> Option<Arc<Macro>> {
        let user = match reference {
            MacroRef::Id(address) => self.entries.get(*address).cloned(),
            MacroRef::Name(name) => {
                self.by_name.get(name).and_then(|address| self.entries.get(*address)).cloned()
            }
        };
        user.or_else(|| match reference {
            MacroRef::Name(name) => system::system_macro_by_name(name),
            MacroRef::Id(_) => None,
        })
    }

    /// The macro at a user-space address.
    pub fn get(&self, address: usize) -> Option<&Arc<Macro>> {
        self.entries.get(address)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates macros in address order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Macro>> {
        self.entries.iter()
    }
}
