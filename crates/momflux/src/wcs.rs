//! Pixel ↔ sky coordinate mapping.

use nalgebra::{Matrix2, Vector2};

use crate::coord::SkyCoord;

/// Mapping between exposure pixel coordinates and sky coordinates.
///
/// Both directions return `None` when a point cannot be mapped (non-finite
/// input, or a position outside the valid projection domain). Implementations
/// must be approximate inverses of each other.
pub trait SkyWcs {
    /// Map a pixel position to a sky coordinate.
    fn pixel_to_sky(&self, pixel_xy: [f64; 2]) -> Option<SkyCoord>;
    /// Map a sky coordinate to a pixel position.
    fn sky_to_pixel(&self, coord: &SkyCoord) -> Option<[f64; 2]>;
    /// Mean pixel scale in arcseconds per pixel.
    fn pixel_scale_arcsec(&self) -> f64;
}

/// Linear tangent-plane WCS.
///
/// A reference pixel `crpix` maps to the reference sky position `crval`; the
/// 2×2 CD matrix (degrees per pixel) carries offsets into the tangent plane.
/// The RA offset is divided by `cos(dec)` so angular distances are preserved
/// near the reference declination. Exact round-trips by construction, which
/// is what the plugin coordinate-restoration tests rely on.
#[derive(Debug, Clone)]
pub struct TanWcs {
    crpix: [f64; 2],
    crval: SkyCoord,
    cd: Matrix2<f64>,
    cd_inv: Matrix2<f64>,
}

impl TanWcs {
    /// Create from a reference pixel, reference sky position, and CD matrix
    /// in degrees per pixel. `None` if the CD matrix is singular.
    pub fn new(crpix: [f64; 2], crval: SkyCoord, cd: Matrix2<f64>) -> Option<Self> {
        let cd_inv = cd.try_inverse()?;
        Some(Self {
            crpix,
            crval,
            cd,
            cd_inv,
        })
    }

    /// Square-pixel WCS with the given scale in arcseconds per pixel and the
    /// conventional flipped-RA axis. The scale must be positive.
    pub fn with_pixel_scale(crpix: [f64; 2], crval: SkyCoord, scale_arcsec: f64) -> Option<Self> {
        if !(scale_arcsec > 0.0) || !scale_arcsec.is_finite() {
            return None;
        }
        let s = scale_arcsec / 3600.0;
        Self::new(crpix, crval, Matrix2::new(-s, 0.0, 0.0, s))
    }

    fn cos_dec(&self) -> Option<f64> {
        let c = self.crval.dec_deg.to_radians().cos();
        if c.abs() < 1e-12 {
            return None;
        }
        Some(c)
    }
}

impl SkyWcs for TanWcs {
    fn pixel_to_sky(&self, pixel_xy: [f64; 2]) -> Option<SkyCoord> {
        if !pixel_xy[0].is_finite() || !pixel_xy[1].is_finite() {
            return None;
        }
        let cos_dec = self.cos_dec()?;
        let d = self.cd
            * Vector2::new(
                pixel_xy[0] - self.crpix[0],
                pixel_xy[1] - self.crpix[1],
            );
        let coord = SkyCoord::new(self.crval.ra_deg + d.x / cos_dec, self.crval.dec_deg + d.y);
        coord.is_finite().then_some(coord)
    }

    fn sky_to_pixel(&self, coord: &SkyCoord) -> Option<[f64; 2]> {
        if !coord.is_finite() {
            return None;
        }
        let cos_dec = self.cos_dec()?;
        let d = Vector2::new(
            (coord.ra_deg - self.crval.ra_deg) * cos_dec,
            coord.dec_deg - self.crval.dec_deg,
        );
        let p = self.cd_inv * d;
        let out = [self.crpix[0] + p.x, self.crpix[1] + p.y];
        (out[0].is_finite() && out[1].is_finite()).then_some(out)
    }

    fn pixel_scale_arcsec(&self) -> f64 {
        self.cd.determinant().abs().sqrt() * 3600.0
    }
}
