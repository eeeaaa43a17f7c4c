//! Shared test utilities: synthetic exposures and a scripted fitter.

use image::Luma;
use rand::{Rng, SeedableRng};

use crate::coord::SkyCoord;
use crate::exposure::{Exposure, ImageF32, MultibandExposure};
use crate::fitter::{MomentFluxFitter, MomentFluxResult, MomentKernel};
use crate::record::SourceRecord;
use crate::wcs::TanWcs;

/// 0.2 arcsec/px WCS with the image center mapping to (10°, 20°).
pub(crate) fn test_wcs(w: u32, h: u32) -> TanWcs {
    TanWcs::with_pixel_scale(
        [w as f64 / 2.0, h as f64 / 2.0],
        SkyCoord::new(10.0, 20.0),
        0.2,
    )
    .expect("valid pixel scale")
}

/// Uniform exposure with a 2 px FWHM PSF.
pub(crate) fn flat_exposure(w: u32, h: u32, value: f32) -> Exposure {
    let image = ImageF32::from_pixel(w, h, Luma([value]));
    Exposure::new("i", image, Box::new(test_wcs(w, h)), 2.0)
}

/// Zero background with a single bright pixel of the given amplitude.
pub(crate) fn exposure_with_point_source(
    w: u32,
    h: u32,
    source_xy: [u32; 2],
    amplitude: f32,
) -> Exposure {
    let mut image = ImageF32::from_pixel(w, h, Luma([0.0]));
    image.put_pixel(source_xy[0], source_xy[1], Luma([amplitude]));
    Exposure::new("i", image, Box::new(test_wcs(w, h)), 2.0)
}

/// Seeded uniform-noise background.
pub(crate) fn noisy_exposure(w: u32, h: u32, seed: u64) -> Exposure {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let image = ImageF32::from_fn(w, h, |_, _| Luma([rng.gen_range(0.0f32..1.0)]));
    Exposure::new("i", image, Box::new(test_wcs(w, h)), 2.0)
}

/// Replace one pixel with NaN.
pub(crate) fn poison_pixel(exposure: Exposure, x: u32, y: u32) -> Exposure {
    let w = exposure.width();
    let h = exposure.height();
    let mut image = ImageF32::from_fn(w, h, |px, py| {
        Luma([exposure.pixel(px as i64, py as i64).unwrap()])
    });
    image.put_pixel(x, y, Luma([f32::NAN]));
    Exposure::new(
        exposure.band(),
        image,
        Box::new(test_wcs(w, h)),
        exposure.psf_fwhm_px(),
    )
}

/// Probe into a [`ScriptedFitter`] kept by the test after the fitter has
/// been boxed into a plugin: the sky coordinate of the first record at the
/// most recent call, for asserting the transient coordinate override.
pub(crate) type SeenCoord = std::rc::Rc<std::cell::Cell<Option<SkyCoord>>>;

/// Fitter that replays a canned result, recording what it saw.
///
/// Stands in for the external estimator in adapter-contract tests: the
/// plugins only ever observe the `Option<MomentFluxResult>` surface.
#[derive(Debug)]
pub(crate) struct ScriptedFitter {
    result: Option<MomentFluxResult>,
    seen_coord: SeenCoord,
}

impl ScriptedFitter {
    pub(crate) fn returning(flux: f64, flux_err: f64, flags: Vec<u32>) -> Self {
        Self {
            result: Some(MomentFluxResult {
                flux,
                flux_err,
                flags,
            }),
            seen_coord: SeenCoord::default(),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            result: None,
            seen_coord: SeenCoord::default(),
        }
    }

    /// Shared handle to the captured call coordinate.
    pub(crate) fn seen_coord(&self) -> SeenCoord {
        self.seen_coord.clone()
    }
}

impl MomentFluxFitter for ScriptedFitter {
    fn kernel(&self) -> MomentKernel {
        MomentKernel::PGauss
    }

    fn measure(
        &self,
        _mbexp: &MultibandExposure<'_>,
        records: &[SourceRecord],
        _stamp_size: usize,
    ) -> Option<MomentFluxResult> {
        self.seen_coord.set(records.first().map(|r| r.coord()));
        self.result.clone()
    }
}
