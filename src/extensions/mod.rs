//! Extension plugin factory
//!
//! Optional capability modules (remote control, streaming) are decoupled
//! from the scene/camera core behind a per-frame `run` poll. Plugins are
//! best-effort accessories: a plugin whose constructor fails is recorded
//! as absent and the host continues, in contrast to the scene's
//! hard-fail commit policy.

use thiserror::Error;

use crate::params::ExtensionParameters;
use crate::scene::{Camera, Scene};

/// Failure kinds an extension plugin constructor may raise
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("plugin {plugin}: missing configuration: {missing}")]
    MissingConfiguration {
        plugin: &'static str,
        missing: &'static str,
    },
    #[error("plugin {plugin}: i/o error: {source}")]
    Io {
        plugin: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("plugin {plugin}: unsupported on this host: {reason}")]
    Unsupported {
        plugin: &'static str,
        reason: String,
    },
}

/// An optional extension module polled once per frame cycle.
///
/// `run` has side effects only: plugins mutate the scene and camera
/// through the ordinary mutation APIs, ahead of the next commit cycle.
pub trait ExtensionPlugin {
    /// Stable identity used for registration and deduplication
    fn name(&self) -> &str;

    fn run(&mut self, scene: &mut Scene, camera: &mut Camera);
}

/// Fallible plugin constructor; the factory treats a failure as "plugin
/// not present"
pub type PluginConstructor =
    Box<dyn FnOnce(&ExtensionParameters) -> Result<Box<dyn ExtensionPlugin>, PluginError>>;

/// Ordered, name-deduplicated registry of extension plugins.
///
/// Which modules to attempt is a runtime value: callers pass the
/// constructor list at factory construction.
#[derive(Default)]
pub struct ExtensionPluginFactory {
    plugins: Vec<Box<dyn ExtensionPlugin>>,
}

impl ExtensionPluginFactory {
    /// Attempt each constructor in order; failed constructions are logged
    /// at debug severity and the plugin is simply absent
    pub fn new(
        parameters: &ExtensionParameters,
        constructors: impl IntoIterator<Item = PluginConstructor>,
    ) -> Self {
        let mut factory = Self::empty();
        for constructor in constructors {
            match constructor(parameters) {
                Ok(plugin) => factory.add(plugin),
                Err(err) => log::debug!("extension plugin unavailable: {err}"),
            }
        }
        factory
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Register a plugin, replacing any prior occurrence of the same name
    /// so that re-registration never duplicates
    pub fn add(&mut self, plugin: Box<dyn ExtensionPlugin>) {
        let name = plugin.name().to_string();
        self.remove(&name);
        self.plugins.push(plugin);
    }

    /// Remove the plugin registered under `name`; a no-op when absent
    pub fn remove(&mut self, name: &str) {
        if let Some(position) = self.plugins.iter().position(|p| p.name() == name) {
            self.plugins.remove(position);
        }
    }

    pub fn clear(&mut self) {
        self.plugins.clear();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name() == name)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Invoke `run` on every registered plugin once, in registration order
    pub fn execute(&mut self, scene: &mut Scene, camera: &mut Camera) {
        for plugin in &mut self.plugins {
            plugin.run(scene, camera);
        }
    }
}
