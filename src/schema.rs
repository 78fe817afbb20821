//! Canonical layout of the coincidence event columns
//!
//! Every column that is read from the replay, filtered and written back out is
//! listed here exactly once, in output order. Dataset loading, cut variable
//! binding and the headers of all output tables are derived from this list.

use crate::numeric::Float;

/// Distance from the SHMS focal plane to the calorimeter (cm)
pub const D_CALO: Float = 292.64;

/// Distance from the SHMS focal plane to the dipole exit (cm)
pub const D_EXIT: Float = -307.0;

/// Name of the pion missing mass column, used by the missing-mass refinement
pub const MISSING_MASS: &str = "MMpi";

/// Where the values of a column come from
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColumnSource {
    /// Copied as-is from a replay tree branch
    Branch(&'static str),

    /// Per-event sum over an array branch with one entry per detector block
    BlockSum(&'static str),

    /// Straight track projection away from the focal plane, computed from two
    /// previously listed columns as `position + slope * distance`
    Projection {
        position: &'static str,
        slope: &'static str,
        distance: Float,
    },
}

/// A named column of the event table
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColumnSpec {
    /// Name used by cut expressions and output headers
    pub name: &'static str,

    /// How the column is obtained from the replay
    pub source: ColumnSource,
}

const fn branch(name: &'static str, branch: &'static str) -> ColumnSpec {
    ColumnSpec {
        name,
        source: ColumnSource::Branch(branch),
    }
}

const fn projection(
    name: &'static str,
    position: &'static str,
    slope: &'static str,
    distance: Float,
) -> ColumnSpec {
    ColumnSpec {
        name,
        source: ColumnSource::Projection {
            position,
            slope,
            distance,
        },
    }
}

/// Number of columns in a coincidence pion event
pub const NUM_COLUMNS: usize = 54;

/// The coincidence pion event columns, in canonical order
pub const COIN_PION_COLUMNS: [ColumnSpec; NUM_COLUMNS] = [
    // HMS
    branch("H_gtr_beta", "H.gtr.beta"),
    branch("H_gtr_xp", "H.gtr.th"),
    branch("H_gtr_yp", "H.gtr.ph"),
    branch("H_gtr_dp", "H.gtr.dp"),
    branch("H_dc_xfp", "H.dc.x_fp"),
    branch("H_dc_xpfp", "H.dc.xp_fp"),
    branch("H_dc_yfp", "H.dc.y_fp"),
    branch("H_dc_ypfp", "H.dc.yp_fp"),
    branch("H_hod_goodscinhit", "H.hod.goodscinhit"),
    branch("H_hod_goodstarttime", "H.hod.goodstarttime"),
    branch("H_cal_etotnorm", "H.cal.etotnorm"),
    branch("H_cal_etottracknorm", "H.cal.etottracknorm"),
    branch("H_cer_npeSum", "H.cer.npeSum"),
    branch("H_dc_InsideDipoleExit", "H.dc.InsideDipoleExit"),
    branch("P_dc_InsideDipoleExit", "P.dc.InsideDipoleExit"),
    branch("CTime_ePiCoinTime_ROC1", "CTime.ePiCoinTime_ROC1"),
    // SHMS
    branch("P_gtr_beta", "P.gtr.beta"),
    branch("P_gtr_xptar", "P.gtr.th"),
    branch("P_gtr_yptar", "P.gtr.ph"),
    branch("P_gtr_p", "P.gtr.p"),
    branch("P_gtr_dp", "P.gtr.dp"),
    branch("P_dc_xfp", "P.dc.x_fp"),
    branch("P_dc_xpfp", "P.dc.xp_fp"),
    branch("P_dc_yfp", "P.dc.y_fp"),
    branch("P_dc_ypfp", "P.dc.yp_fp"),
    branch("P_hod_goodscinhit", "P.hod.goodscinhit"),
    branch("P_hod_goodstarttime", "P.hod.goodstarttime"),
    branch("P_cal_etotnorm", "P.cal.etotnorm"),
    branch("P_cal_etottracknorm", "P.cal.etottracknorm"),
    branch("P_cal_fly_earray", "P.cal.fly.earray"),
    branch("P_cal_pr_eplane", "P.cal.pr.eplane"),
    ColumnSpec {
        name: "Cal_Adc_Hits",
        source: ColumnSource::BlockSum("P.cal.fly.numGoodAdcHits"),
    },
    branch("P_aero_npeSum", "P.aero.npeSum"),
    branch("P_aero_xAtAero", "P.aero.xAtAero"),
    branch("P_aero_yAtAero", "P.aero.yAtAero"),
    branch("P_hgcer_npeSum", "P.hgcer.npeSum"),
    branch("P_hgcer_xAtCer", "P.hgcer.xAtCer"),
    branch("P_hgcer_yAtCer", "P.hgcer.yAtCer"),
    branch("P_ngcer_npeSum", "P.ngcer.npeSum"),
    branch("P_ngcer_xAtCer", "P.ngcer.xAtCer"),
    branch("P_ngcer_yAtCer", "P.ngcer.yAtCer"),
    branch(MISSING_MASS, "P.kin.secondary.MMpi"),
    // RF timing
    branch("H_RF_Dist", "RFTime.HMS_RFtimeDist"),
    branch("P_RF_Dist", "RFTime.SHMS_RFtimeDist"),
    // Track projections
    projection("xCalo", "P_dc_xfp", "P_dc_xpfp", D_CALO),
    projection("yCalo", "P_dc_yfp", "P_dc_ypfp", D_CALO),
    projection("xExit", "P_dc_xfp", "P_dc_xpfp", D_EXIT),
    projection("yExit", "P_dc_yfp", "P_dc_ypfp", D_EXIT),
    // Kinematics
    branch("Q2", "H.kin.primary.Q2"),
    branch("W", "H.kin.primary.W"),
    branch("epsilon", "H.kin.primary.epsilon"),
    branch("th_q", "P.kin.secondary.th_xq"),
    branch("ph_q", "P.kin.secondary.ph_xq"),
    branch("MandelT", "P.kin.secondary.MandelT"),
];

/// Output header shared by every table, in canonical order
pub fn header() -> Vec<&'static str> {
    COIN_PION_COLUMNS.iter().map(|spec| spec.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn column_names_are_unique() {
        let names: BTreeSet<_> = COIN_PION_COLUMNS.iter().map(|spec| spec.name).collect();
        assert_eq!(names.len(), NUM_COLUMNS);
        assert_eq!(header().len(), NUM_COLUMNS);
    }

    #[test]
    fn projections_only_use_earlier_columns() {
        for (idx, spec) in COIN_PION_COLUMNS.iter().enumerate() {
            if let ColumnSource::Projection {
                position, slope, ..
            } = spec.source
            {
                let earlier = &COIN_PION_COLUMNS[..idx];
                assert!(earlier.iter().any(|s| s.name == position), "{}", spec.name);
                assert!(earlier.iter().any(|s| s.name == slope), "{}", spec.name);
            }
        }
    }

    #[test]
    fn missing_mass_is_part_of_the_schema() {
        assert!(header().contains(&MISSING_MASS));
    }
}
