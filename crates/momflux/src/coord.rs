//! Sky coordinate value type.

use serde::{Deserialize, Serialize};

/// ICRS sky position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyCoord {
    /// Right ascension (degrees).
    pub ra_deg: f64,
    /// Declination (degrees).
    pub dec_deg: f64,
}

impl SkyCoord {
    /// Create from right ascension and declination in degrees.
    pub fn new(ra_deg: f64, dec_deg: f64) -> Self {
        Self { ra_deg, dec_deg }
    }

    /// Sentinel for a not-yet-populated coordinate.
    pub fn nan() -> Self {
        Self {
            ra_deg: f64::NAN,
            dec_deg: f64::NAN,
        }
    }

    /// Both components are finite.
    pub fn is_finite(&self) -> bool {
        self.ra_deg.is_finite() && self.dec_deg.is_finite()
    }

    /// Angular separation to `other` in arcseconds (haversine formula).
    pub fn separation_arcsec(&self, other: &SkyCoord) -> f64 {
        let ra1 = self.ra_deg.to_radians();
        let dec1 = self.dec_deg.to_radians();
        let ra2 = other.ra_deg.to_radians();
        let dec2 = other.dec_deg.to_radians();
        let sdd = ((dec2 - dec1) * 0.5).sin();
        let sdr = ((ra2 - ra1) * 0.5).sin();
        let a = sdd * sdd + dec1.cos() * dec2.cos() * sdr * sdr;
        2.0 * a.sqrt().asin().to_degrees() * 3600.0
    }
}
