//! Image regions and the multi-band composite view.

use image::{ImageBuffer, Luma};

use crate::wcs::SkyWcs;

/// Float pixel buffer for astronomical image data.
pub type ImageF32 = ImageBuffer<Luma<f32>, Vec<f32>>;

/// A windowed image region with its coordinate mapping and PSF description.
///
/// The pixel buffer may be a sub-window of a larger parent image; `origin`
/// is the parent-frame position of the buffer's (0, 0) pixel, and all pixel
/// accessors take parent-frame coordinates. Read-only from the measurement
/// plugins' perspective.
pub struct Exposure {
    band: String,
    image: ImageF32,
    origin: [i64; 2],
    wcs: Box<dyn SkyWcs>,
    psf_fwhm_px: f64,
}

impl Exposure {
    /// Create a full-frame exposure (origin at (0, 0)).
    pub fn new(band: &str, image: ImageF32, wcs: Box<dyn SkyWcs>, psf_fwhm_px: f64) -> Self {
        Self {
            band: band.to_string(),
            image,
            origin: [0, 0],
            wcs,
            psf_fwhm_px,
        }
    }

    /// Set the parent-frame origin of this window.
    pub fn with_origin(mut self, origin: [i64; 2]) -> Self {
        self.origin = origin;
        self
    }

    /// Photometric band label.
    pub fn band(&self) -> &str {
        &self.band
    }

    /// Window width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Window height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Parent-frame origin of the window.
    pub fn origin(&self) -> [i64; 2] {
        self.origin
    }

    /// Coordinate mapping for this exposure.
    pub fn wcs(&self) -> &dyn SkyWcs {
        self.wcs.as_ref()
    }

    /// PSF full width at half maximum, in pixels.
    pub fn psf_fwhm_px(&self) -> f64 {
        self.psf_fwhm_px
    }

    /// Whether the parent-frame position is inside the window.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        let lx = x - self.origin[0];
        let ly = y - self.origin[1];
        lx >= 0 && ly >= 0 && (lx as u64) < self.image.width() as u64
            && (ly as u64) < self.image.height() as u64
    }

    /// Pixel value at a parent-frame position, `None` outside the window.
    pub fn pixel(&self, x: i64, y: i64) -> Option<f32> {
        if !self.contains(x, y) {
            return None;
        }
        let lx = (x - self.origin[0]) as u32;
        let ly = (y - self.origin[1]) as u32;
        Some(self.image.get_pixel(lx, ly).0[0])
    }
}

/// Composite view over one exposure per band covering the same region.
///
/// The first band is the primary: measurement geometry (WCS, stamp bounds)
/// is taken from it.
pub struct MultibandExposure<'a> {
    bands: Vec<&'a Exposure>,
}

impl<'a> MultibandExposure<'a> {
    /// Single-band composite.
    pub fn single(exposure: &'a Exposure) -> Self {
        Self {
            bands: vec![exposure],
        }
    }

    /// Composite over several bands. `None` for an empty list.
    pub fn from_exposures(exposures: &[&'a Exposure]) -> Option<Self> {
        if exposures.is_empty() {
            return None;
        }
        Some(Self {
            bands: exposures.to_vec(),
        })
    }

    /// The primary (first) band.
    pub fn primary(&self) -> &Exposure {
        self.bands[0]
    }

    /// Number of bands.
    pub fn n_bands(&self) -> usize {
        self.bands.len()
    }

    /// Iterate over the per-band exposures.
    pub fn bands(&self) -> impl Iterator<Item = &Exposure> {
        self.bands.iter().copied()
    }
}
