//! Explicit name → constructor registration table.
//!
//! Hosts that schedule plugins by configuration string build them through
//! this registry. Registration is an ordinary function call made at
//! startup; there is no discovery mechanism.

use std::collections::HashMap;

use crate::apcorr::ApCorrRegistry;
use crate::schema::Schema;

use super::ksigmamom::{
    ForcedKSigmaMomFluxPlugin, KSigmaMomFluxConfig, SingleFrameKSigmaMomFluxPlugin,
    KSIGMAMOM_PLUGIN_NAME,
};
use super::ngmixmom::{
    ForcedNgmixMomFluxPlugin, NgmixMomFluxConfig, SingleFrameNgmixMomFluxPlugin,
    NGMIXMOM_PLUGIN_NAME,
};
use super::{ForcedPlugin, PluginError, SingleFramePlugin};

/// Factory for a single-frame plugin with its default configuration.
pub type SingleFrameFactory =
    fn(&str, &mut Schema, &mut ApCorrRegistry) -> Result<Box<dyn SingleFramePlugin>, PluginError>;

/// Factory for a forced plugin with its default configuration.
pub type ForcedFactory =
    fn(&str, &mut Schema, &mut ApCorrRegistry) -> Result<Box<dyn ForcedPlugin>, PluginError>;

/// Name-keyed plugin constructor table.
///
/// Factories build plugins with their default configurations; callers that
/// need custom configuration construct the plugin types directly.
#[derive(Default)]
pub struct PluginRegistry {
    single_frame: HashMap<String, SingleFrameFactory>,
    forced: HashMap<String, ForcedFactory>,
}

impl PluginRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with both moment-flux plugin families.
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        reg.register_single_frame(KSIGMAMOM_PLUGIN_NAME, |name, schema, apcorr| {
            SingleFrameKSigmaMomFluxPlugin::new(
                &KSigmaMomFluxConfig::default(),
                name,
                schema,
                apcorr,
            )
            .map(|p| Box::new(p) as Box<dyn SingleFramePlugin>)
        });
        reg.register_forced(KSIGMAMOM_PLUGIN_NAME, |name, schema, apcorr| {
            ForcedKSigmaMomFluxPlugin::new(&KSigmaMomFluxConfig::default(), name, schema, apcorr)
                .map(|p| Box::new(p) as Box<dyn ForcedPlugin>)
        });
        reg.register_single_frame(NGMIXMOM_PLUGIN_NAME, |name, schema, apcorr| {
            SingleFrameNgmixMomFluxPlugin::new(
                &NgmixMomFluxConfig::default(),
                name,
                schema,
                apcorr,
            )
            .map(|p| Box::new(p) as Box<dyn SingleFramePlugin>)
        });
        reg.register_forced(NGMIXMOM_PLUGIN_NAME, |name, schema, apcorr| {
            ForcedNgmixMomFluxPlugin::new(&NgmixMomFluxConfig::default(), name, schema, apcorr)
                .map(|p| Box::new(p) as Box<dyn ForcedPlugin>)
        });
        reg
    }

    /// Register a single-frame factory under `name`, replacing any previous
    /// registration.
    pub fn register_single_frame(&mut self, name: &str, factory: SingleFrameFactory) {
        self.single_frame.insert(name.to_string(), factory);
    }

    /// Register a forced factory under `name`, replacing any previous
    /// registration.
    pub fn register_forced(&mut self, name: &str, factory: ForcedFactory) {
        self.forced.insert(name.to_string(), factory);
    }

    /// Construct the single-frame plugin registered under `name`.
    pub fn make_single_frame(
        &self,
        name: &str,
        schema: &mut Schema,
        apcorr: &mut ApCorrRegistry,
    ) -> Result<Box<dyn SingleFramePlugin>, PluginError> {
        let factory = self
            .single_frame
            .get(name)
            .ok_or_else(|| PluginError::UnknownPlugin {
                name: name.to_string(),
            })?;
        factory(name, schema, apcorr)
    }

    /// Construct the forced plugin registered under `name`.
    pub fn make_forced(
        &self,
        name: &str,
        schema: &mut Schema,
        apcorr: &mut ApCorrRegistry,
    ) -> Result<Box<dyn ForcedPlugin>, PluginError> {
        let factory = self
            .forced
            .get(name)
            .ok_or_else(|| PluginError::UnknownPlugin {
                name: name.to_string(),
            })?;
        factory(name, schema, apcorr)
    }

    /// Sorted names with a single-frame registration.
    pub fn single_frame_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.single_frame.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Sorted names with a forced registration.
    pub fn forced_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.forced.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
