//! Macro registry: storage and lookup of macro functions by short name.
//!
//! Names are stored without the macro namespace (`if_`, `let`, `mask`);
//! [`MacroRegistry::resolve`] strips the configured namespace from a head
//! symbol before looking it up. Registering a name twice replaces the old
//! macro and hands it back.

use std::collections::BTreeMap;

use crate::config::ReaderConfig;
use crate::macros::{std_macros, MacroFn};
use crate::{err_msg, HebiError};

#[derive(Clone, Default)]
pub struct MacroRegistry {
    macros: BTreeMap<String, MacroFn>,
}

impl MacroRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the standard vocabulary.
    pub fn with_std() -> Self {
        let mut registry = Self::new();
        std_macros::register_std_macros(&mut registry);
        registry
    }

    /// Registers `func` under `name`, returning the macro it replaces.
    pub fn register(&mut self, name: &str, func: MacroFn) -> Option<MacroFn> {
        self.macros.insert(name.to_string(), func)
    }

    /// Registers `func`, failing if `name` is taken.
    pub fn register_or_error(&mut self, name: &str, func: MacroFn) -> Result<(), HebiError> {
        if self.macros.contains_key(name) {
            return Err(err_msg!(Config, "macro '{}' is already registered", name));
        }
        self.macros.insert(name.to_string(), func);
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Option<MacroFn> {
        self.macros.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<MacroFn> {
        self.macros.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Looks up the macro a head symbol names, if it is in the configured
    /// macro namespace. Returns the short name with the function.
    pub fn resolve<'s>(
        &self,
        symbol: &'s str,
        config: &ReaderConfig,
    ) -> Option<(&'s str, MacroFn)> {
        let name = symbol
            .strip_prefix(config.macro_namespace.as_str())?
            .strip_prefix('.')?;
        Some((name, self.get(name)?))
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.macros.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for MacroRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Form;
    use crate::macros::ExpandContext;

    fn identity(args: &[Form], _: &ExpandContext<'_>) -> Result<Form, HebiError> {
        Ok(Form::List(args.to_vec()))
    }

    #[test]
    fn std_vocabulary_is_registered() {
        let registry = MacroRegistry::with_std();
        for name in ["if_", "for_", "try_", "let", "mask", "loop", "runtime"] {
            assert!(registry.contains(name), "missing {name}");
        }
    }

    #[test]
    fn resolve_requires_the_namespace() {
        let registry = MacroRegistry::with_std();
        let config = ReaderConfig::default();
        assert!(registry.resolve("hebi.basic.._macro_.if_", &config).is_some());
        assert!(registry.resolve("if_", &config).is_none());
        assert!(registry.resolve("hebi.basic.._macro_.nope", &config).is_none());
    }

    #[test]
    fn duplicate_registration() {
        let mut registry = MacroRegistry::new();
        assert!(registry.register("m", identity).is_none());
        assert!(registry.register("m", identity).is_some());
        assert!(registry.register_or_error("m", identity).is_err());
        assert!(registry.unregister("m").is_some());
        assert!(registry.is_empty());
    }
}
