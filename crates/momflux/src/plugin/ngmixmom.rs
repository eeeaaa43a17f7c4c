//! Selectable-kernel (ngmixmom) moment flux plugins.
//!
//! Same adapter contract as the ksigmamom family, with two additions: the
//! weight kernel is chosen by configuration (`pgauss` or `ksigma`), and the
//! fit runs over a multi-band composite view of the exposure so that a host
//! can extend it with matched regions in other bands.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::apcorr::ApCorrRegistry;
use crate::exposure::{Exposure, MultibandExposure};
use crate::fitter::{MomentFluxFitter, MomentKernel, PrePsfMomFitter};
use crate::record::SourceRecord;
use crate::schema::Schema;
use crate::wcs::SkyWcs;

use super::base::{self, MomFluxKeys};
use super::{ForcedPlugin, PluginError, SingleFramePlugin};

/// Registered name of the ngmixmom plugins.
pub const NGMIXMOM_PLUGIN_NAME: &str = "ext_ngmixmom_NgmixMomFlux";

/// Configuration for the ngmixmom plugins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NgmixMomFluxConfig {
    /// Register measurements for aperture correction?
    pub register_for_ap_corr: bool,
    /// Moment FWHM (arcseconds).
    pub fwhm: f64,
    /// Type of moment kernel (`"pgauss"` or `"ksigma"`).
    pub kernel: String,
    /// Fitting stamp size (pixels).
    pub stamp_size: usize,
}

impl Default for NgmixMomFluxConfig {
    fn default() -> Self {
        Self {
            register_for_ap_corr: true,
            fwhm: 2.0,
            kernel: "pgauss".to_string(),
            stamp_size: 80,
        }
    }
}

impl NgmixMomFluxConfig {
    /// Load from a JSON config file.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Parse the configured kernel string.
    pub fn parse_kernel(&self) -> Result<MomentKernel, PluginError> {
        Ok(self.kernel.parse::<MomentKernel>()?)
    }
}

/// Ngmix moments in single-frame mode.
#[derive(Debug)]
pub struct SingleFrameNgmixMomFluxPlugin {
    name: String,
    keys: MomFluxKeys,
    stamp_size: usize,
    fitter: Box<dyn MomentFluxFitter>,
}

impl SingleFrameNgmixMomFluxPlugin {
    /// Construct with the built-in estimator for the configured kernel.
    pub fn new(
        config: &NgmixMomFluxConfig,
        name: &str,
        schema: &mut Schema,
        apcorr: &mut ApCorrRegistry,
    ) -> Result<Self, PluginError> {
        let kernel = config.parse_kernel()?;
        let fitter = PrePsfMomFitter::new(config.fwhm, kernel);
        Self::with_fitter(config, name, schema, apcorr, Box::new(fitter))
    }

    /// Construct with an externally supplied fitter.
    pub fn with_fitter(
        config: &NgmixMomFluxConfig,
        name: &str,
        schema: &mut Schema,
        apcorr: &mut ApCorrRegistry,
        fitter: Box<dyn MomentFluxFitter>,
    ) -> Result<Self, PluginError> {
        let keys = base::init_mom_flux_fields(
            name,
            "ngmixmom flux",
            config.register_for_ap_corr,
            schema,
            apcorr,
        )?;
        Ok(Self {
            name: name.to_string(),
            keys,
            stamp_size: config.stamp_size,
            fitter,
        })
    }

    /// The kernel this plugin measures with.
    pub fn kernel(&self) -> MomentKernel {
        self.fitter.kernel()
    }
}

impl SingleFramePlugin for SingleFrameNgmixMomFluxPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn measure(&self, record: &mut SourceRecord, exposure: &Exposure) {
        let center = record.centroid();
        // The fitter reads the record's coordinate field; it must reflect
        // the centroid being measured, not whatever the field held before.
        let Some(sky) = exposure.wcs().pixel_to_sky(center) else {
            tracing::debug!(id = record.id(), "centroid outside the WCS domain");
            base::write_result(record, &self.keys, None);
            return;
        };
        let coord_in = record.coord();
        record.set_coord(sky);

        let mbexp = MultibandExposure::single(exposure);
        let res = self
            .fitter
            .measure(&mbexp, std::slice::from_ref(&*record), self.stamp_size);

        record.set_coord(coord_in);
        base::write_result(record, &self.keys, res.as_ref());
    }
}

/// Ngmix moments in forced mode.
pub struct ForcedNgmixMomFluxPlugin {
    name: String,
    keys: MomFluxKeys,
    stamp_size: usize,
    fitter: Box<dyn MomentFluxFitter>,
}

impl ForcedNgmixMomFluxPlugin {
    /// Construct with the built-in estimator for the configured kernel.
    pub fn new(
        config: &NgmixMomFluxConfig,
        name: &str,
        schema: &mut Schema,
        apcorr: &mut ApCorrRegistry,
    ) -> Result<Self, PluginError> {
        let kernel = config.parse_kernel()?;
        let fitter = PrePsfMomFitter::new(config.fwhm, kernel);
        Self::with_fitter(config, name, schema, apcorr, Box::new(fitter))
    }

    /// Construct with an externally supplied fitter.
    pub fn with_fitter(
        config: &NgmixMomFluxConfig,
        name: &str,
        schema: &mut Schema,
        apcorr: &mut ApCorrRegistry,
        fitter: Box<dyn MomentFluxFitter>,
    ) -> Result<Self, PluginError> {
        let keys = base::init_mom_flux_fields(
            name,
            "ngmixmom flux",
            config.register_for_ap_corr,
            schema,
            apcorr,
        )?;
        Ok(Self {
            name: name.to_string(),
            keys,
            stamp_size: config.stamp_size,
            fitter,
        })
    }
}

impl ForcedPlugin for ForcedNgmixMomFluxPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn measure(
        &self,
        record: &mut SourceRecord,
        exposure: &Exposure,
        _ref_record: &SourceRecord,
        _ref_wcs: &dyn SkyWcs,
    ) {
        // The coordinate was propagated from the reference detection before
        // this plugin ran; it is validated, never re-derived.
        let coord_in = record.coord();
        if !coord_in.is_finite() {
            tracing::warn!(
                id = record.id(),
                "forced measurement without a propagated coordinate"
            );
            base::write_result(record, &self.keys, None);
            return;
        }

        let mbexp = MultibandExposure::single(exposure);
        let res = self
            .fitter
            .measure(&mbexp, std::slice::from_ref(&*record), self.stamp_size);

        record.set_coord(coord_in);
        base::write_result(record, &self.keys, res.as_ref());
    }
}
