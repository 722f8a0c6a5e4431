//! Option registries: where a command finds options it did not declare
//! itself.
//!
//! The core only knows the [`OptionRegistry`] interface. How a registry
//! discovers its options (explicit registration, a directory of manifests,
//! ...) is up to the implementation handed to [`Command`](crate::Command).

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::defaults::{HelpOption, VersionOption};
use crate::error::Result;
use crate::option::CliOption;

/// Namespace holding the built-in help and version options.
pub const DEFAULT_NAMESPACE: &str = "optloom.defaults";

/// Builds a fresh option instance.
pub type OptionFactory = Arc<dyn Fn() -> Result<Box<dyn CliOption>> + Send + Sync>;

/// Wrap a constructor into an [`OptionFactory`].
pub fn factory<F, O>(ctor: F) -> OptionFactory
where
    F: Fn() -> Result<O> + Send + Sync + 'static,
    O: CliOption + 'static,
{
    Arc::new(move || {
        let opt: Box<dyn CliOption> = Box::new(ctor()?);
        Ok(opt)
    })
}

pub trait OptionRegistry: Send + Sync {
    /// Factories for every option registered under `namespace`, in a stable
    /// order. An unknown namespace yields an empty list.
    fn load(&self, namespace: &str) -> Result<Vec<OptionFactory>>;
}

/// Registry filled by explicit registration calls.
#[derive(Clone, Default)]
pub struct StaticRegistry {
    namespaces: IndexMap<String, Vec<OptionFactory>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in help and version options.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(DEFAULT_NAMESPACE, factory(HelpOption::new))
            .register(DEFAULT_NAMESPACE, factory(VersionOption::new));
        registry
    }

    pub fn register(&mut self, namespace: impl Into<String>, factory: OptionFactory) -> &mut Self {
        self.namespaces
            .entry(namespace.into())
            .or_default()
            .push(factory);
        self
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.keys().map(String::as_str)
    }
}

impl OptionRegistry for StaticRegistry {
    fn load(&self, namespace: &str) -> Result<Vec<OptionFactory>> {
        Ok(self.namespaces.get(namespace).cloned().unwrap_or_default())
    }
}

impl fmt::Debug for StaticRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (ns, factories) in &self.namespaces {
            map.entry(ns, &factories.len());
        }
        map.finish()
    }
}

/// Concatenates the results of several registries, in layer order.
#[derive(Clone, Default)]
pub struct LayeredRegistry {
    layers: Vec<Arc<dyn OptionRegistry>>,
}

impl LayeredRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer(mut self, registry: Arc<dyn OptionRegistry>) -> Self {
        self.layers.push(registry);
        self
    }
}

impl OptionRegistry for LayeredRegistry {
    fn load(&self, namespace: &str) -> Result<Vec<OptionFactory>> {
        let mut out = Vec::new();
        for layer in &self.layers {
            out.extend(layer.load(namespace)?);
        }
        Ok(out)
    }
}
