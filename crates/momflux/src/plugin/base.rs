//! Construction and write-back logic shared by the plugin families.

use crate::apcorr::ApCorrRegistry;
use crate::fitter::MomentFluxResult;
use crate::record::SourceRecord;
use crate::schema::{FluxResultKey, Key, Schema, SchemaError};

/// Typed keys for the three fields a moment-flux plugin owns.
#[derive(Debug, Clone, Copy)]
pub struct MomFluxKeys {
    /// `<name>_instFlux`.
    pub flux: Key<f64>,
    /// `<name>_instFluxErr`.
    pub flux_err: Key<f64>,
    /// `<name>_flag` — set for any fatal failure.
    pub failure: Key<bool>,
}

/// Register the moment-flux output fields for `name` and optionally mark
/// the base name as aperture-correction eligible.
///
/// Shared by the single-frame and forced constructors of both plugin
/// families so the schema footprint stays identical across variants.
pub fn init_mom_flux_fields(
    name: &str,
    doc: &str,
    register_for_ap_corr: bool,
    schema: &mut Schema,
    apcorr: &mut ApCorrRegistry,
) -> Result<MomFluxKeys, SchemaError> {
    let flux_keys = FluxResultKey::add_fields(schema, name, doc)?;
    let failure = schema.add_flag_field(
        &format!("{}_flag", name),
        "Set for any fatal failure.",
    )?;
    if register_for_ap_corr {
        apcorr.register(name);
    }
    Ok(MomFluxKeys {
        flux: flux_keys.flux,
        flux_err: flux_keys.err,
        failure,
    })
}

/// Translate a fitter outcome into the record's output fields.
///
/// `None` is the hard-failure path: NaN sentinels plus the flag. A present
/// result always has its numeric values written; a nonzero flag word for
/// the primary record additionally raises the flag without suppressing
/// them.
pub(crate) fn write_result(
    record: &mut SourceRecord,
    keys: &MomFluxKeys,
    result: Option<&MomentFluxResult>,
) {
    match result {
        None => {
            record.set_float(keys.flux, f64::NAN);
            record.set_float(keys.flux_err, f64::NAN);
            record.set_flag(keys.failure, true);
        }
        Some(res) => {
            record.set_float(keys.flux, res.flux);
            record.set_float(keys.flux_err, res.flux_err);
            if res.flag_word(0) > 0 {
                record.set_flag(keys.failure, true);
            }
        }
    }
}
