//! momflux — weighted-moment flux measurement plugins.
//!
//! Per-object flux photometry built around two plugin families:
//!
//! 1. **ksigmamom** – K-sigma weighted moment flux (fixed compact kernel).
//! 2. **ngmixmom** – selectable-kernel moment flux (`pgauss` or `ksigma`),
//!    measured through a multi-band composite view of the exposure.
//!
//! Each family comes in a single-frame variant (measure at the record's own
//! centroid) and a forced variant (measure at a coordinate propagated from a
//! reference detection). The adapters share one contract: fetch a position,
//! hand a postage stamp request to a [`MomentFluxFitter`], and write flux,
//! flux error, and a failure flag back into the record. Failures never
//! surface as errors; they are absorbed into NaN sentinels and the flag
//! field.
//!
//! # Public API
//! - [`plugin::registry::PluginRegistry`] as the entry point for hosts that
//!   construct plugins by name
//! - plugin types and configs under [`plugin`] for direct construction
//! - [`Schema`] / [`SourceRecord`] and the [`SkyWcs`] / [`MomentFluxFitter`]
//!   traits as the seams a host fills in

mod apcorr;
mod coord;
mod exposure;
mod fitter;
mod record;
mod schema;
mod wcs;

pub mod plugin;

pub use apcorr::ApCorrRegistry;
pub use coord::SkyCoord;
pub use exposure::{Exposure, ImageF32, MultibandExposure};
pub use fitter::{
    fit_flags, MomentFluxFitter, MomentFluxResult, MomentKernel, PrePsfMomFitter, UnknownKernel,
};
pub use plugin::base::{init_mom_flux_fields, MomFluxKeys};
pub use plugin::ksigmamom::{
    ForcedKSigmaMomFluxPlugin, KSigmaMomFluxConfig, SingleFrameKSigmaMomFluxPlugin,
    KSIGMAMOM_PLUGIN_NAME,
};
pub use plugin::ngmixmom::{
    ForcedNgmixMomFluxPlugin, NgmixMomFluxConfig, SingleFrameNgmixMomFluxPlugin,
    NGMIXMOM_PLUGIN_NAME,
};
pub use plugin::registry::PluginRegistry;
pub use plugin::{ForcedPlugin, PluginError, SingleFramePlugin, FLUX_ORDER};
pub use record::{FieldValue, SourceRecord};
pub use schema::{FieldDef, FieldType, FluxResultKey, Key, Schema, SchemaError};
pub use wcs::{SkyWcs, TanWcs};

#[cfg(test)]
mod test_utils;
