//! Duan & Sun (2003) CO2 solubility in aqueous NaCl-type brines.
//!
//! ```text
//! ln m = ln(y·φ·P) − μ⁰/RT − 2λ(mNa + mK + 2mCa + 2mMg)
//!        − ζ·mCl·(mNa + mK + mMg + mCa) + 0.07·mSO4
//! ```
//!
//! P in bar, T in K. φ comes from the Duan, Møller & Weare (1992) CO2 equation
//! of state; y = (P − P_H2O)/P uses the Duan–Sun water pressure correlation.
//! Valid roughly for 273–533 K and 0–2000 bar; outside that the numbers are an
//! extrapolation.

use crate::composition::SolutionComposition;
use crate::error::{BrineError, BrineResult};
use crate::ions::Ion;
use crate::model::{ModelId, RunContext, SolubilityModel};
use crate::result::SimulationResult;
use crate::state::SimulationState;
use cs_core::{ATM_PER_MPA, BAR_PER_MPA};

/// Critical temperature of water [K].
pub const WATER_TC_K: f64 = 647.29;
/// Critical pressure of water [bar].
const WATER_PC_BAR: f64 = 220.85;
const WATER_PRESSURE_C: [f64; 5] = [-38.640844, 5.8948420, 59.876516, 26.654627, 10.637097];

/// Critical temperature of CO2 [K].
const CO2_TC_K: f64 = 304.1282;
/// Critical pressure of CO2 [bar].
const CO2_PC_BAR: f64 = 73.773;

/// Duan et al. (1992) EOS parameters a1..a15.
const EOS: [f64; 15] = [
    8.99288497e-2,
    -4.94783127e-1,
    4.77922245e-2,
    1.03808883e-2,
    -2.82516861e-2,
    9.49887563e-2,
    5.20600880e-4,
    -2.93540971e-4,
    -1.77265112e-3,
    -2.51101973e-5,
    8.93353441e-5,
    7.88998563e-5,
    -1.66727022e-2,
    1.398,
    2.96e-2,
];

const MU: [f64; 11] = [
    28.9447706,
    -0.0354581768,
    -4770.67077,
    1.02782768e-5,
    33.8126098,
    9.04037140e-3,
    -1.14934031e-3,
    -0.307405726,
    -0.0907301486,
    9.32713393e-4,
    0.0,
];

const LAMBDA: [f64; 11] = [
    -0.411370585,
    6.07632013e-4,
    97.5347708,
    0.0,
    0.0,
    0.0,
    0.0,
    -0.0237622469,
    0.0170656236,
    0.0,
    1.41335834e-5,
];

const ZETA: [f64; 11] = [
    3.36389723e-4,
    -1.98298980e-5,
    0.0,
    0.0,
    0.0,
    0.0,
    0.0,
    2.12220830e-3,
    -5.24873303e-3,
    0.0,
    0.0,
];

/// Geometric factor for the reduced-volume root scan.
const VR_SCAN_FACTOR: f64 = 0.97;
const VR_SCAN_MIN: f64 = 0.02;
const BISECTION_ITERATIONS: usize = 200;

/// Parameter polynomial Par(T, P), P in bar.
fn par(c: &[f64; 11], t: f64, p: f64) -> f64 {
    c[0] + c[1] * t
        + c[2] / t
        + c[3] * t * t
        + c[4] / (630.0 - t)
        + c[5] * p
        + c[6] * p * t.ln()
        + c[7] * p / t
        + c[8] * p / (630.0 - t)
        + c[9] * p * p / ((630.0 - t) * (630.0 - t))
        + c[10] * t * p.ln()
}

/// Water vapour pressure [bar] from the Duan–Sun correlation.
pub fn water_vapor_pressure_bar(t_k: f64) -> f64 {
    let t = (t_k - WATER_TC_K) / WATER_TC_K;
    let c = WATER_PRESSURE_C;
    WATER_PC_BAR * t_k / WATER_TC_K
        * (1.0 + c[0] * (-t).powf(1.9) + c[1] * t + c[2] * t * t + c[3] * t.powi(3) + c[4] * t.powi(4))
}

/// Virial-type coefficients at reduced temperature `tr`.
struct EosTerms {
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
    beta: f64,
    gamma: f64,
}

impl EosTerms {
    fn at(tr: f64) -> Self {
        let a = &EOS;
        let tr2 = tr * tr;
        let tr3 = tr2 * tr;
        Self {
            b: a[0] + a[1] / tr2 + a[2] / tr3,
            c: a[3] + a[4] / tr2 + a[5] / tr3,
            d: a[6] + a[7] / tr2 + a[8] / tr3,
            e: a[9] + a[10] / tr2 + a[11] / tr3,
            f: a[12] / tr3,
            beta: a[13],
            gamma: a[14],
        }
    }

    fn z(&self, vr: f64) -> f64 {
        let g = self.gamma / (vr * vr);
        1.0 + self.b / vr
            + self.c / vr.powi(2)
            + self.d / vr.powi(4)
            + self.e / vr.powi(5)
            + self.f / vr.powi(2) * (self.beta + g) * (-g).exp()
    }

    fn ln_phi(&self, vr: f64) -> f64 {
        let z = self.z(vr);
        let g = self.gamma / (vr * vr);
        let tail = self.f / (2.0 * self.gamma) * (self.beta + 1.0 - (self.beta + 1.0 + g) * (-g).exp());
        z - 1.0 - z.ln()
            + self.b / vr
            + self.c / (2.0 * vr.powi(2))
            + self.d / (4.0 * vr.powi(4))
            + self.e / (5.0 * vr.powi(5))
            + tail
    }
}

/// CO2 fugacity coefficient from the Duan et al. (1992) EOS.
///
/// Every root of `Z(Vr) = Pr·Vr/Tr` found by a geometric scan is refined by
/// bisection; the stable one (minimum ln φ) is returned.
pub fn co2_fugacity_coefficient(t_k: f64, p_bar: f64) -> BrineResult<f64> {
    if !(t_k > 0.0) {
        return Err(BrineError::OutOfRange {
            what: "temperature",
            value: t_k,
        });
    }
    if !(p_bar > 0.0) {
        return Err(BrineError::OutOfRange {
            what: "pressure",
            value: p_bar,
        });
    }
    let tr = t_k / CO2_TC_K;
    let pr = p_bar / CO2_PC_BAR;
    let terms = EosTerms::at(tr);
    let residual = |vr: f64| terms.z(vr) - pr * vr / tr;

    let mut roots = Vec::new();
    let mut hi = 2.0 * tr / pr + 2.0;
    let mut f_hi = residual(hi);
    while hi > VR_SCAN_MIN {
        let lo = hi * VR_SCAN_FACTOR;
        let f_lo = residual(lo);
        if (f_lo < 0.0) != (f_hi < 0.0) {
            roots.push(bisect(&residual, lo, hi));
        }
        hi = lo;
        f_hi = f_lo;
    }

    roots
        .into_iter()
        .map(|vr| terms.ln_phi(vr))
        .filter(|v| v.is_finite())
        .min_by(f64::total_cmp)
        .map(f64::exp)
        .ok_or(BrineError::OutOfRange {
            what: "CO2 equation of state (no volume root)",
            value: p_bar,
        })
}

fn bisect(f: &impl Fn(f64) -> f64, mut lo: f64, mut hi: f64) -> f64 {
    let lo_negative = f(lo) < 0.0;
    for _ in 0..BISECTION_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if (f(mid) < 0.0) == lo_negative {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// One evaluated point of the correlation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuanSunPoint {
    /// Dissolved CO2 [mol/kgw]
    pub molality: f64,
    /// CO2 fugacity coefficient
    pub phi: f64,
    /// CO2 mole fraction in the gas phase
    pub y_co2: f64,
    /// CO2 partial pressure [bar]
    pub partial_pressure_bar: f64,
}

/// CO2 solubility at `t_k` and `p_bar`.
///
/// Fails at or above the critical temperature of water and when the total
/// pressure does not exceed the water vapour pressure.
pub fn co2_solubility(
    t_k: f64,
    p_bar: f64,
    composition: &SolutionComposition,
) -> BrineResult<DuanSunPoint> {
    if !(t_k > 0.0 && t_k < WATER_TC_K) {
        return Err(BrineError::OutOfRange {
            what: "temperature (must be below the critical point of water)",
            value: t_k,
        });
    }
    let p_h2o = water_vapor_pressure_bar(t_k);
    if !(p_bar > p_h2o) {
        return Err(BrineError::OutOfRange {
            what: "pressure (must exceed water vapour pressure)",
            value: p_bar,
        });
    }

    let y_co2 = (p_bar - p_h2o) / p_bar;
    let phi = co2_fugacity_coefficient(t_k, p_bar)?;

    let m = |ion| composition.molality(ion);
    let cations = m(Ion::Na) + m(Ion::K) + 2.0 * m(Ion::Ca) + 2.0 * m(Ion::Mg);
    let chloride_pairs = m(Ion::Cl) * (m(Ion::Na) + m(Ion::K) + m(Ion::Mg) + m(Ion::Ca));

    let ln_m = (y_co2 * phi * p_bar).ln()
        - par(&MU, t_k, p_bar)
        - 2.0 * par(&LAMBDA, t_k, p_bar) * cations
        - par(&ZETA, t_k, p_bar) * chloride_pairs
        + 0.07 * m(Ion::So4);
    let molality = ln_m.exp();

    if !molality.is_finite() {
        return Err(BrineError::OutOfRange {
            what: "temperature (correlation diverges)",
            value: t_k,
        });
    }

    Ok(DuanSunPoint {
        molality,
        phi,
        y_co2,
        partial_pressure_bar: y_co2 * p_bar,
    })
}

/// Analytic correlation backend. Brine only.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuanSunModel;

impl SolubilityModel for DuanSunModel {
    fn id(&self) -> ModelId {
        ModelId::AnalyticCorrelation
    }

    fn single_state(
        &self,
        state: &SimulationState,
        _ctx: &RunContext,
    ) -> BrineResult<SimulationResult> {
        if state.is_brine_rock() {
            return Err(BrineError::UnsupportedCombination {
                model: self.id().canonical_name(),
                what: "mineral interaction",
            });
        }
        let point = co2_solubility(state.temperature_k, state.pressure_bar(), &state.composition)?;
        Ok(SimulationResult {
            ionic_strength: state.composition.ionic_strength(),
            partial_pressure_co2: point.partial_pressure_bar / BAR_PER_MPA * ATM_PER_MPA,
            fugacity_coefficient_co2: point.phi,
            dissolved_co2: point.molality,
            ..SimulationResult::default()
        })
    }
}
