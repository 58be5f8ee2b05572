//! Typed registry of named, pluggable capabilities.
//!
//! An [`ExtensionPoint`] is a named contract, typed by the trait object its implementations
//! provide. Plugins register implementations at startup; afterwards the registry is read-only
//! and shared across threads.

use std::{
    any::Any,
    collections::HashMap,
    fmt,
    marker::PhantomData,
    sync::Arc,
};

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::{
    doccomment::DocCommentParser,
    error::{ApiweaveError, Result},
    location::{LocationProviderFactory, fetch::IndexFetcher},
    render::OutputFormat,
    transform::ModelTransform,
};

/// How many implementations an extension point expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Exactly one implementation; use [`ExtensionRegistry::query_single`].
    Single,
    /// Any number of implementations, kept in registration order.
    Multiple,
}

/// A named contract whose implementations are `Arc<T>`.
pub struct ExtensionPoint<T: ?Sized> {
    /// Unique point name.
    name: &'static str,
    /// How many implementations the point accepts.
    cardinality: Cardinality,
    /// Ties the point to its implementation type.
    _marker: PhantomData<fn() -> Box<T>>,
}

impl<T: ?Sized> ExtensionPoint<T> {
    /// A point that requires exactly one implementation.
    pub const fn single(name: &'static str) -> Self {
        Self {
            name,
            cardinality: Cardinality::Single,
            _marker: PhantomData,
        }
    }

    /// A point that accepts any number of implementations.
    pub const fn multiple(name: &'static str) -> Self {
        Self {
            name,
            cardinality: Cardinality::Multiple,
            _marker: PhantomData,
        }
    }

    /// Name of the point.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Cardinality of the point.
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }
}

impl<T: ?Sized> fmt::Debug for ExtensionPoint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionPoint")
            .field("name", &self.name)
            .field("cardinality", &self.cardinality)
            .finish()
    }
}

/// Output formats, looked up by name (`html`, `json`).
pub static OUTPUT_FORMATS: ExtensionPoint<dyn OutputFormat> = ExtensionPoint::multiple("output_formats");
/// Model transforms, applied in registration order.
pub static MODEL_TRANSFORMS: ExtensionPoint<dyn ModelTransform> =
    ExtensionPoint::multiple("model_transforms");
/// Factory for the location provider used to resolve links.
pub static LOCATION_PROVIDER_FACTORY: ExtensionPoint<dyn LocationProviderFactory> =
    ExtensionPoint::single("location_provider_factory");
/// Parser for raw doc comment text.
pub static DOC_COMMENT_PARSER: ExtensionPoint<dyn DocCommentParser> =
    ExtensionPoint::single("doc_comment_parser");
/// Fetcher for external link indexes.
pub static INDEX_FETCHER: ExtensionPoint<dyn IndexFetcher> = ExtensionPoint::single("index_fetcher");

/// One registered implementation.
struct Registration {
    /// Name the implementation was registered under.
    name: String,
    /// An `Arc<T>` for the point's `T`.
    value: Box<dyn Any + Send + Sync>,
}

/// A pluggable bundle of extensions.
pub trait Plugin: Send + Sync {
    /// Plugin name, used in diagnostics.
    fn name(&self) -> &str;

    /// Register this plugin's extensions.
    fn install(&self, registry: &mut ExtensionRegistry) -> Result<()>;
}

/// Explicit table from (point, name) to implementation.
#[derive(Default)]
pub struct ExtensionRegistry {
    /// Registrations keyed by point name, in registration order.
    points: HashMap<&'static str, Vec<Registration>>,
    /// Names of installed plugins, in installation order.
    plugins: Vec<String>,
}

/// The process-wide registry, installed once at startup.
static GLOBAL: OnceCell<ExtensionRegistry> = OnceCell::new();

impl ExtensionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry populated from the given plugins, in order.
    pub fn with_plugins(plugins: &[Box<dyn Plugin>]) -> Result<Self> {
        let mut registry = Self::new();
        for plugin in plugins {
            registry.install(plugin.as_ref())?;
        }
        Ok(registry)
    }

    /// A registry populated from [`crate::plugins::builtin_plugins`].
    pub fn builtin() -> Result<Self> {
        Self::with_plugins(&crate::plugins::builtin_plugins())
    }

    /// Install a plugin's extensions.
    pub fn install(&mut self, plugin: &dyn Plugin) -> Result<()> {
        debug!(plugin = plugin.name(), "installing plugin");
        plugin.install(self)?;
        self.plugins.push(plugin.name().to_string());
        Ok(())
    }

    /// Names of installed plugins, in installation order.
    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }

    /// Associate a named implementation with a point. Names are unique per point.
    pub fn register<T>(
        &mut self,
        point: &ExtensionPoint<T>,
        name: impl Into<String>,
        implementation: Arc<T>,
    ) -> Result<()>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let name = name.into();
        let entries = self.points.entry(point.name).or_default();
        if entries.iter().any(|r| r.name == name) {
            return Err(ApiweaveError::config(format!(
                "'{name}' is already registered for extension point '{}'",
                point.name
            )));
        }
        entries.push(Registration {
            name,
            value: Box::new(implementation),
        });
        Ok(())
    }

    /// Every implementation of a point, in registration order.
    pub fn query<T>(&self, point: &ExtensionPoint<T>) -> Vec<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.entries(point)
            .filter_map(|r| r.value.downcast_ref::<Arc<T>>().cloned())
            .collect()
    }

    /// The implementation registered under `name`.
    pub fn query_named<T>(&self, point: &ExtensionPoint<T>, name: &str) -> Result<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.entries(point)
            .find(|r| r.name == name)
            .and_then(|r| r.value.downcast_ref::<Arc<T>>().cloned())
            .ok_or_else(|| {
                ApiweaveError::config(format!(
                    "no '{name}' registered for extension point '{}' (available: {})",
                    point.name,
                    self.names(point).join(", ")
                ))
            })
    }

    /// The single implementation of a point. Zero or several implementations is a
    /// configuration error.
    pub fn query_single<T>(&self, point: &ExtensionPoint<T>) -> Result<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        let mut found = self.query(point);
        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err(ApiweaveError::config(format!(
                "extension point '{}' has no implementation",
                point.name
            ))),
            n => Err(ApiweaveError::config(format!(
                "extension point '{}' requires exactly one implementation, found {n}: {}",
                point.name,
                self.names(point).join(", ")
            ))),
        }
    }

    /// Names registered for a point, in registration order.
    pub fn names<T: ?Sized>(&self, point: &ExtensionPoint<T>) -> Vec<&str> {
        self.entries(point).map(|r| r.name.as_str()).collect()
    }

    /// Raw registrations for a point.
    fn entries<T: ?Sized>(&self, point: &ExtensionPoint<T>) -> impl Iterator<Item = &Registration> {
        self.points.get(point.name).into_iter().flatten()
    }

    /// Install `registry` as the process-wide registry. Fails if one is already installed.
    pub fn install_global(registry: Self) -> Result<&'static Self> {
        GLOBAL
            .set(registry)
            .map_err(|_| ApiweaveError::config("the global extension registry is already installed"))?;
        Self::global()
    }

    /// The process-wide registry.
    pub fn global() -> Result<&'static Self> {
        GLOBAL
            .get()
            .ok_or_else(|| ApiweaveError::config("the global extension registry is not installed"))
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut points: Vec<(&str, Vec<&str>)> = self
            .points
            .iter()
            .map(|(k, v)| (*k, v.iter().map(|r| r.name.as_str()).collect()))
            .collect();
        points.sort();
        f.debug_struct("ExtensionRegistry")
            .field("plugins", &self.plugins)
            .field("points", &points)
            .finish()
    }
}
