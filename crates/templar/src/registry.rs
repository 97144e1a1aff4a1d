//! Implementation registry: name → adapter, populated at startup.

use templar_render::engines::builtin_adapters;
use templar_render::{Adapter, RenderingImplementation, TemplateEngine};

use crate::error::Result;

/// Adapters by implementation name, in registration order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    adapters: Vec<Adapter>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every bundled implementation.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        for adapter in builtin_adapters()? {
            registry.register(adapter);
        }
        Ok(registry)
    }

    /// Adds an adapter. An adapter with the same name is replaced in place.
    pub fn register(&mut self, adapter: Adapter) -> &mut Self {
        match self.adapters.iter_mut().find(|a| a.name() == adapter.name()) {
            Some(existing) => *existing = adapter,
            None => self.adapters.push(adapter),
        }
        self
    }

    /// Wraps and adds an implementation.
    pub fn register_implementation<I>(&mut self, implementation: I) -> Result<&mut Self>
    where
        I: RenderingImplementation + 'static,
    {
        Ok(self.register(Adapter::wrap(implementation)?))
    }

    pub fn get(&self, name: &str) -> Option<&Adapter> {
        self.adapters.iter().find(|a| a.name() == name)
    }

    /// Whether `name` is registered and can compile or render inline source.
    pub fn is_capable(&self, name: &str) -> bool {
        self.get(name)
            .is_some_and(|a| a.descriptor().can_compile_or_render())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.adapters.iter().map(|a| a.name())
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}
