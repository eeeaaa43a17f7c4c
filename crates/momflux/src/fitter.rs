//! Moment-flux fitting seam and the built-in weighted-moment estimator.
//!
//! The plugins treat the fitter as opaque: it receives the records to
//! measure plus a stamp size and either yields a [`MomentFluxResult`] or
//! nothing at all. All failure is expressed through that surface — a fitter
//! implementation must not panic.

use std::fmt;
use std::str::FromStr;

use crate::exposure::{Exposure, MultibandExposure};
use crate::record::SourceRecord;

/// FWHM of a Gaussian in units of its sigma.
const FWHM_PER_SIGMA: f64 = 2.354820045;

/// Truncation radius of the K-sigma kernel, in units of sigma.
const KSIGMA_EXTENT: f64 = 3.0;

/// Fit failure bits carried in [`MomentFluxResult::flags`].
pub mod fit_flags {
    /// Stamp was clipped by the image bounds.
    pub const EDGE: u32 = 1 << 0;
    /// Weight normalization was degenerate (no usable pixels).
    pub const ZERO_WEIGHT: u32 = 1 << 1;
    /// Non-finite pixel values inside the stamp were skipped.
    pub const NONFINITE: u32 = 1 << 2;
}

/// Weight kernel used for the moment estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MomentKernel {
    /// Pre-PSF Gaussian weight.
    PGauss,
    /// Compact K-sigma weight (truncated cubic).
    KSigma,
}

impl MomentKernel {
    /// Canonical configuration string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PGauss => "pgauss",
            Self::KSigma => "ksigma",
        }
    }
}

impl fmt::Display for MomentKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized kernel configuration string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKernel {
    /// The rejected configuration value.
    pub value: String,
}

impl fmt::Display for UnknownKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown moment kernel {:?} (expected \"pgauss\" or \"ksigma\")",
            self.value
        )
    }
}

impl std::error::Error for UnknownKernel {}

impl FromStr for MomentKernel {
    type Err = UnknownKernel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pgauss" => Ok(Self::PGauss),
            "ksigma" => Ok(Self::KSigma),
            other => Err(UnknownKernel {
                value: other.to_string(),
            }),
        }
    }
}

/// Outcome of one fitter invocation.
///
/// `flags` carries one word per input record; a nonzero word marks that
/// record's measurement as unreliable without suppressing the numeric
/// values. `flux`/`flux_err` describe the first (primary) record.
#[derive(Debug, Clone, PartialEq)]
pub struct MomentFluxResult {
    /// Instrumental flux of the primary record.
    pub flux: f64,
    /// 1-sigma flux uncertainty of the primary record.
    pub flux_err: f64,
    /// Per-record failure words.
    pub flags: Vec<u32>,
}

impl MomentFluxResult {
    /// Flag word for the record at `index`; zero when absent.
    pub fn flag_word(&self, index: usize) -> u32 {
        self.flags.get(index).copied().unwrap_or(0)
    }
}

/// Per-object weighted-moment flux estimator.
///
/// Configured once at plugin construction, stateless per call, safe to
/// share across concurrently running plugin instances. `None` means no
/// measurement was possible at all; partial problems are reported through
/// the per-record flag words instead.
pub trait MomentFluxFitter: std::fmt::Debug {
    /// The weight kernel this fitter applies.
    fn kernel(&self) -> MomentKernel;

    /// Measure the records over the composite exposure with a square stamp
    /// of `stamp_size` pixels on a side.
    fn measure(
        &self,
        mbexp: &MultibandExposure<'_>,
        records: &[SourceRecord],
        stamp_size: usize,
    ) -> Option<MomentFluxResult>;
}

/// Built-in weighted-moment flux estimator.
///
/// Applies the configured kernel (scaled from the FWHM in arcseconds
/// through the exposure pixel scale, broadened in quadrature by the PSF
/// width) over a square stamp centered at each record's sky coordinate and
/// forms a matched-filter flux estimate from the weighted pixel sum. No
/// PSF deconvolution is attempted; the PSF only widens the weight.
#[derive(Debug, Clone, Copy)]
pub struct PrePsfMomFitter {
    fwhm_arcsec: f64,
    kernel: MomentKernel,
}

impl PrePsfMomFitter {
    /// Create with the weight FWHM in arcseconds and the kernel type.
    pub fn new(fwhm_arcsec: f64, kernel: MomentKernel) -> Self {
        Self {
            fwhm_arcsec,
            kernel,
        }
    }

    /// Configured weight FWHM in arcseconds.
    pub fn fwhm_arcsec(&self) -> f64 {
        self.fwhm_arcsec
    }

    fn weight(&self, r2: f64, sigma: f64) -> f64 {
        match self.kernel {
            MomentKernel::PGauss => (-0.5 * r2 / (sigma * sigma)).exp(),
            MomentKernel::KSigma => {
                let rmax2 = (KSIGMA_EXTENT * sigma) * (KSIGMA_EXTENT * sigma);
                if r2 >= rmax2 {
                    0.0
                } else {
                    let u = 1.0 - r2 / rmax2;
                    u * u * u
                }
            }
        }
    }

    /// Measure one record. `None` when the center cannot be placed on the
    /// image at all; otherwise flux, error, and the flag word.
    fn measure_one(
        &self,
        exposure: &Exposure,
        record: &SourceRecord,
        stamp_size: usize,
    ) -> Option<(f64, f64, u32)> {
        let center = exposure.wcs().sky_to_pixel(&record.coord())?;
        let cx = center[0].round() as i64;
        let cy = center[1].round() as i64;
        if !exposure.contains(cx, cy) {
            return None;
        }

        let scale = exposure.wcs().pixel_scale_arcsec();
        if !(scale > 0.0) || !scale.is_finite() {
            return None;
        }
        let sigma_weight = self.fwhm_arcsec / scale / FWHM_PER_SIGMA;
        let sigma_psf = exposure.psf_fwhm_px() / FWHM_PER_SIGMA;
        let sigma = (sigma_weight * sigma_weight + sigma_psf * sigma_psf).sqrt();
        if !(sigma > 0.0) || !sigma.is_finite() {
            return None;
        }

        let half = (stamp_size / 2) as i64;
        let mut word = 0u32;
        let mut wsum_flux = 0.0;
        let mut wsum_sq = 0.0;
        for y in (cy - half)..=(cy + half) {
            for x in (cx - half)..=(cx + half) {
                let Some(v) = exposure.pixel(x, y) else {
                    word |= fit_flags::EDGE;
                    continue;
                };
                let v = v as f64;
                if !v.is_finite() {
                    word |= fit_flags::NONFINITE;
                    continue;
                }
                let dx = x as f64 - center[0];
                let dy = y as f64 - center[1];
                let w = self.weight(dx * dx + dy * dy, sigma);
                wsum_flux += w * v;
                wsum_sq += w * w;
            }
        }

        if wsum_sq <= f64::EPSILON {
            return Some((f64::NAN, f64::NAN, word | fit_flags::ZERO_WEIGHT));
        }
        let flux = wsum_flux / wsum_sq;
        let flux_err = (1.0 / wsum_sq).sqrt();
        Some((flux, flux_err, word))
    }
}

impl MomentFluxFitter for PrePsfMomFitter {
    fn kernel(&self) -> MomentKernel {
        self.kernel
    }

    fn measure(
        &self,
        mbexp: &MultibandExposure<'_>,
        records: &[SourceRecord],
        stamp_size: usize,
    ) -> Option<MomentFluxResult> {
        let exposure = mbexp.primary();
        if records.is_empty() || stamp_size == 0 {
            return None;
        }

        let mut flags = Vec::with_capacity(records.len());
        let mut flux = f64::NAN;
        let mut flux_err = f64::NAN;
        for (i, record) in records.iter().enumerate() {
            match self.measure_one(exposure, record, stamp_size) {
                Some((f, e, word)) => {
                    if i == 0 {
                        flux = f;
                        flux_err = e;
                    }
                    flags.push(word);
                }
                // The primary record carries the result; if it cannot be
                // placed there is no measurement at all.
                None if i == 0 => {
                    tracing::debug!(id = records[0].id(), "no usable stamp for primary record");
                    return None;
                }
                None => flags.push(fit_flags::EDGE),
            }
        }

        Some(MomentFluxResult {
            flux,
            flux_err,
            flags,
        })
    }
}
