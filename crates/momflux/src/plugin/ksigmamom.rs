//! K-sigma moment flux plugins (fixed compact kernel).

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

/// Registered name of the ksigmamom plugins.
pub const KSIGMAMOM_PLUGIN_NAME: &str = "ext_ksigmamom_KSigmaMomFlux";

/// Configuration for the ksigmamom plugins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KSigmaMomFluxConfig {
    /// Register measurements for aperture correction?
    pub register_for_ap_corr: bool,
    /// Moment FWHM (arcseconds).
    pub fwhm: f64,
    /// Fitting stamp size (pixels).
    pub stamp_size: usize,
}

impl Default for KSigmaMomFluxConfig {
    fn default() -> Self {
        Self {
            register_for_ap_corr: true,
            fwhm: 2.0,
            stamp_size: 80,
        }
    }
}

impl KSigmaMomFluxConfig {
    /// Load from a JSON config file.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// K-sigma moment flux in single-frame mode.
#[derive(Debug)]
pub struct SingleFrameKSigmaMomFluxPlugin {
    name: String,
    keys: MomFluxKeys,
    stamp_size: usize,
    fitter: Box<dyn MomentFluxFitter>,
}

impl SingleFrameKSigmaMomFluxPlugin {
    /// Construct with the built-in K-sigma estimator.
    pub fn new(
        config: &KSigmaMomFluxConfig,
        name: &str,
        schema: &mut Schema,
        apcorr: &mut ApCorrRegistry,
    ) -> Result<Self, PluginError> {
        let fitter = PrePsfMomFitter::new(config.fwhm, MomentKernel::KSigma);
        Self::with_fitter(config, name, schema, apcorr, Box::new(fitter))
    }

    /// Construct with an externally supplied fitter.
    pub fn with_fitter(
        config: &KSigmaMomFluxConfig,
        name: &str,
        schema: &mut Schema,
        apcorr: &mut ApCorrRegistry,
        fitter: Box<dyn MomentFluxFitter>,
    ) -> Result<Self, PluginError> {
        let keys = base::init_mom_flux_fields(
            name,
            "ksigmamom flux",
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

impl SingleFramePlugin for SingleFrameKSigmaMomFluxPlugin {
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

/// K-sigma moment flux in forced mode.
pub struct ForcedKSigmaMomFluxPlugin {
    name: String,
    keys: MomFluxKeys,
    stamp_size: usize,
    fitter: Box<dyn MomentFluxFitter>,
}

impl ForcedKSigmaMomFluxPlugin {
    /// Construct with the built-in K-sigma estimator.
    pub fn new(
        config: &KSigmaMomFluxConfig,
        name: &str,
        schema: &mut Schema,
        apcorr: &mut ApCorrRegistry,
    ) -> Result<Self, PluginError> {
        let fitter = PrePsfMomFitter::new(config.fwhm, MomentKernel::KSigma);
        Self::with_fitter(config, name, schema, apcorr, Box::new(fitter))
    }

    /// Construct with an externally supplied fitter.
    pub fn with_fitter(
        config: &KSigmaMomFluxConfig,
        name: &str,
        schema: &mut Schema,
        apcorr: &mut ApCorrRegistry,
        fitter: Box<dyn MomentFluxFitter>,
    ) -> Result<Self, PluginError> {
        let keys = base::init_mom_flux_fields(
            name,
            "ksigmamom flux",
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

impl ForcedPlugin for ForcedKSigmaMomFluxPlugin {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::SkyCoord;
    use crate::test_utils::{
        exposure_with_point_source, flat_exposure, ScriptedFitter, SeenCoord,
    };

    const NAME: &str = KSIGMAMOM_PLUGIN_NAME;

    fn setup_single(
        fitter: ScriptedFitter,
    ) -> (
        Schema,
        SingleFrameKSigmaMomFluxPlugin,
        SourceRecord,
        SeenCoord,
    ) {
        let seen = fitter.seen_coord();
        let mut schema = Schema::new();
        let mut apcorr = ApCorrRegistry::new();
        let plugin = SingleFrameKSigmaMomFluxPlugin::with_fitter(
            &KSigmaMomFluxConfig::default(),
            NAME,
            &mut schema,
            &mut apcorr,
            Box::new(fitter),
        )
        .unwrap();
        let mut record = SourceRecord::new(1, &schema);
        record.set_centroid([100.0, 100.0]);
        record.set_coord(SkyCoord::new(5.0, 5.0));
        (schema, plugin, record, seen)
    }

    #[test]
    fn clean_success_writes_values_and_leaves_flag_false() {
        let (schema, plugin, mut record, _) =
            setup_single(ScriptedFitter::returning(123.4, 5.6, vec![0]));
        // 200x200 image: pixel (100, 100) maps to sky (10, 20).
        let exposure = flat_exposure(200, 200, 1.0);
        plugin.measure(&mut record, &exposure);

        let flux = format!("{}_instFlux", NAME);
        let err = format!("{}_instFluxErr", NAME);
        let flag = format!("{}_flag", NAME);
        assert_eq!(record.float_by_name(&schema, &flux), Some(123.4));
        assert_eq!(record.float_by_name(&schema, &err), Some(5.6));
        assert_eq!(record.flag_by_name(&schema, &flag), Some(false));
    }

    #[test]
    fn fitter_sees_centroid_coordinate_and_original_is_restored() {
        let (_, plugin, mut record, seen) =
            setup_single(ScriptedFitter::returning(1.0, 0.1, vec![0]));
        let exposure = flat_exposure(200, 200, 1.0);
        let expected = exposure.wcs().pixel_to_sky([100.0, 100.0]).unwrap();

        plugin.measure(&mut record, &exposure);

        assert_eq!(seen.get(), Some(expected));
        // Transient override is reverted.
        assert_eq!(record.coord(), SkyCoord::new(5.0, 5.0));
    }

    #[test]
    fn failed_fit_writes_nan_and_flag_and_restores_coordinate() {
        let (schema, plugin, mut record, _) = setup_single(ScriptedFitter::failing());
        let exposure = flat_exposure(200, 200, 1.0);
        plugin.measure(&mut record, &exposure);

        assert!(record
            .float_by_name(&schema, &format!("{}_instFlux", NAME))
            .unwrap()
            .is_nan());
        assert!(record
            .float_by_name(&schema, &format!("{}_instFluxErr", NAME))
            .unwrap()
            .is_nan());
        assert_eq!(
            record.flag_by_name(&schema, &format!("{}_flag", NAME)),
            Some(true)
        );
        assert_eq!(record.coord(), SkyCoord::new(5.0, 5.0));
    }

    #[test]
    fn advisory_flag_keeps_numeric_values() {
        let (schema, plugin, mut record, _) =
            setup_single(ScriptedFitter::returning(77.0, 3.0, vec![8]));
        let exposure = flat_exposure(200, 200, 1.0);
        plugin.measure(&mut record, &exposure);

        assert_eq!(
            record.float_by_name(&schema, &format!("{}_instFlux", NAME)),
            Some(77.0)
        );
        assert_eq!(
            record.flag_by_name(&schema, &format!("{}_flag", NAME)),
            Some(true)
        );
    }

    #[test]
    fn unmappable_centroid_is_a_no_measurement() {
        let (schema, plugin, mut record, seen) =
            setup_single(ScriptedFitter::returning(1.0, 0.1, vec![0]));
        record.set_centroid([f64::NAN, 100.0]);
        let exposure = flat_exposure(200, 200, 1.0);
        plugin.measure(&mut record, &exposure);

        assert_eq!(
            record.flag_by_name(&schema, &format!("{}_flag", NAME)),
            Some(true)
        );
        // The fitter never ran and the coordinate was never touched.
        assert!(seen.get().is_none());
        assert_eq!(record.coord(), SkyCoord::new(5.0, 5.0));
    }

    #[test]
    fn measurement_is_idempotent() {
        let (schema, plugin, mut record, _) =
            setup_single(ScriptedFitter::returning(123.4, 5.6, vec![0]));
        let exposure = flat_exposure(200, 200, 1.0);
        plugin.measure(&mut record, &exposure);
        let first = record.clone();
        plugin.measure(&mut record, &exposure);

        let flux = format!("{}_instFlux", NAME);
        assert_eq!(
            record.float_by_name(&schema, &flux),
            first.float_by_name(&schema, &flux)
        );
        assert_eq!(record.coord(), first.coord());
    }

    #[test]
    fn end_to_end_with_builtin_fitter() {
        let mut schema = Schema::new();
        let mut apcorr = ApCorrRegistry::new();
        let plugin = SingleFrameKSigmaMomFluxPlugin::new(
            &KSigmaMomFluxConfig::default(),
            NAME,
            &mut schema,
            &mut apcorr,
        )
        .unwrap();
        assert!(apcorr.contains(NAME));

        let exposure = exposure_with_point_source(256, 256, [128, 128], 500.0);
        let mut record = SourceRecord::new(1, &schema);
        record.set_centroid([128.0, 128.0]);
        record.set_coord(SkyCoord::new(0.0, 0.0));
        plugin.measure(&mut record, &exposure);

        let flux = record
            .float_by_name(&schema, &format!("{}_instFlux", NAME))
            .unwrap();
        assert!(flux > 0.0);
        assert_eq!(
            record.flag_by_name(&schema, &format!("{}_flag", NAME)),
            Some(false)
        );
    }

    #[test]
    fn forced_mode_measures_at_propagated_coordinate() {
        let fitter = ScriptedFitter::returning(42.0, 1.0, vec![0]);
        let seen = fitter.seen_coord();
        let mut schema = Schema::new();
        let mut apcorr = ApCorrRegistry::new();
        let plugin = ForcedKSigmaMomFluxPlugin::with_fitter(
            &KSigmaMomFluxConfig::default(),
            NAME,
            &mut schema,
            &mut apcorr,
            Box::new(fitter),
        )
        .unwrap();

        let exposure = flat_exposure(200, 200, 1.0);
        let propagated = SkyCoord::new(10.001, 20.001);
        let mut record = SourceRecord::new(1, &schema);
        record.set_coord(propagated);
        // A reference record with a very different centroid must be ignored.
        let mut ref_record = SourceRecord::new(2, &schema);
        ref_record.set_centroid([3.0, 3.0]);
        ref_record.set_coord(SkyCoord::new(180.0, -45.0));
        let ref_wcs = crate::test_utils::test_wcs(200, 200);

        plugin.measure(&mut record, &exposure, &ref_record, &ref_wcs);

        assert_eq!(seen.get(), Some(propagated));
        assert_eq!(record.coord(), propagated);
        assert_eq!(
            record.float_by_name(&schema, &format!("{}_instFlux", NAME)),
            Some(42.0)
        );
    }
}
