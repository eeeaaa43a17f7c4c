//! Measurement plugin surface: adapter traits, shared construction
//! helpers, the ksigmamom/ngmixmom plugin families, and the name-keyed
//! registry hosts construct plugins through.
//!
//! The adapter contract is the same across every plugin here: `measure`
//! never fails outward. Every outcome — clean measurement, advisory fit
//! flag, or no measurement at all — is written into the three record
//! fields the plugin registered (`<name>_instFlux`, `<name>_instFluxErr`,
//! `<name>_flag`), and exactly one of {numeric flux+error, NaN pair with
//! the flag raised} lands per call.

use std::fmt;

use crate::exposure::Exposure;
use crate::fitter::UnknownKernel;
use crate::record::SourceRecord;
use crate::schema::SchemaError;
use crate::wcs::SkyWcs;

pub mod base;
pub mod ksigmamom;
pub mod ngmixmom;
pub mod registry;

/// Execution-order hint for flux plugins: after centroiders (0) and shape
/// measurements (1).
pub const FLUX_ORDER: f64 = 2.0;

/// Errors from plugin construction and registry lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum PluginError {
    /// No plugin registered under this name.
    UnknownPlugin {
        /// The requested plugin name.
        name: String,
    },
    /// Schema field registration failed.
    Schema(SchemaError),
    /// The configured kernel string was not recognized.
    Kernel(UnknownKernel),
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPlugin { name } => write!(f, "unknown measurement plugin: {}", name),
            Self::Schema(e) => write!(f, "schema registration failed: {}", e),
            Self::Kernel(e) => write!(f, "bad kernel config: {}", e),
        }
    }
}

impl std::error::Error for PluginError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::UnknownPlugin { .. } => None,
            Self::Schema(e) => Some(e),
            Self::Kernel(e) => Some(e),
        }
    }
}

impl From<SchemaError> for PluginError {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e)
    }
}

impl From<UnknownKernel> for PluginError {
    fn from(e: UnknownKernel) -> Self {
        Self::Kernel(e)
    }
}

/// Plugin measuring a source at its own detected centroid.
pub trait SingleFramePlugin: std::fmt::Debug {
    /// Base name the plugin's output fields are registered under.
    fn name(&self) -> &str;

    /// Scheduling hint for the host pipeline.
    fn execution_order(&self) -> f64 {
        FLUX_ORDER
    }

    /// Measure one record against the exposure it was detected in.
    ///
    /// Infallible by contract; all failure is absorbed into the record's
    /// flag field. The record's sky coordinate is overwritten with the sky
    /// position of its centroid for the duration of the fit and restored
    /// before returning, on every path.
    fn measure(&self, record: &mut SourceRecord, exposure: &Exposure);
}

/// Plugin measuring a source at a position propagated from a reference
/// detection in another exposure.
pub trait ForcedPlugin {
    /// Base name the plugin's output fields are registered under.
    fn name(&self) -> &str;

    /// Scheduling hint for the host pipeline.
    fn execution_order(&self) -> f64 {
        FLUX_ORDER
    }

    /// Measure one record at its already-propagated sky coordinate.
    ///
    /// Precondition: the host has copied the reference detection's sky
    /// position into `record` before calling. The plugin validates that the
    /// coordinate is finite but never re-derives it from `ref_record` /
    /// `ref_wcs`; a violated precondition becomes the no-measurement
    /// outcome rather than a measurement at a garbage position.
    fn measure(
        &self,
        record: &mut SourceRecord,
        exposure: &Exposure,
        ref_record: &SourceRecord,
        ref_wcs: &dyn SkyWcs,
    );
}
