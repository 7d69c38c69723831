// cs-core/src/units.rs

use uom::si::f64::{Pressure as UomPressure, ThermodynamicTemperature as UomThermodynamicTemperature};
use uom::si::pressure::{atmosphere, bar as bar_unit, kilopascal, megapascal, pascal, pound_force_per_square_inch};
use uom::si::thermodynamic_temperature::{degree_celsius, degree_fahrenheit, kelvin};

// Public canonical unit types (SI, f64)
pub type Pressure = UomPressure;
pub type Temperature = UomThermodynamicTemperature;

/// Atmospheres per megapascal, as the equilibrium solver decks expect it.
pub const ATM_PER_MPA: f64 = 9.869_23;

/// Bar per megapascal.
pub const BAR_PER_MPA: f64 = 10.0;

#[inline]
pub fn k(v: f64) -> Temperature {
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn degc(v: f64) -> Temperature {
    Temperature::new::<degree_celsius>(v)
}

#[inline]
pub fn degf(v: f64) -> Temperature {
    Temperature::new::<degree_fahrenheit>(v)
}

#[inline]
pub fn mpa(v: f64) -> Pressure {
    Pressure::new::<megapascal>(v)
}

#[inline]
pub fn kpa(v: f64) -> Pressure {
    Pressure::new::<kilopascal>(v)
}

#[inline]
pub fn pa(v: f64) -> Pressure {
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn bar(v: f64) -> Pressure {
    Pressure::new::<bar_unit>(v)
}

/// Standard atmospheres (101 325 Pa).
#[inline]
pub fn atm(v: f64) -> Pressure {
    Pressure::new::<atmosphere>(v)
}

/// Pounds-force per square inch, absolute.
#[inline]
pub fn psi(v: f64) -> Pressure {
    Pressure::new::<pound_force_per_square_inch>(v)
}

#[inline]
pub fn to_kelvin(t: Temperature) -> f64 {
    t.get::<kelvin>()
}

#[inline]
pub fn to_mpa(p: Pressure) -> f64 {
    p.get::<megapascal>()
}

/// Solver-native temperature.
#[inline]
pub fn kelvin_to_celsius(t_k: f64) -> f64 {
    t_k - 273.15
}

#[inline]
pub fn celsius_to_kelvin(t_c: f64) -> f64 {
    t_c + 273.15
}

/// Solver-native pressure.
#[inline]
pub fn mpa_to_atm(p_mpa: f64) -> f64 {
    p_mpa * ATM_PER_MPA
}

#[inline]
pub fn atm_to_mpa(p_atm: f64) -> f64 {
    p_atm / ATM_PER_MPA
}

#[inline]
pub fn mpa_to_bar(p_mpa: f64) -> f64 {
    p_mpa * BAR_PER_MPA
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_smoke() {
        let t = k(298.15);
        assert!((to_kelvin(t) - 298.15).abs() < 1e-9);
        let t = degc(25.0);
        assert!((to_kelvin(t) - 298.15).abs() < 1e-9);
        let t = degf(212.0);
        assert!((to_kelvin(t) - 373.15).abs() < 1e-9);
        let p = mpa(10.0);
        assert!((to_mpa(p) - 10.0).abs() < 1e-12);
        assert!((to_mpa(bar(100.0)) - 10.0).abs() < 1e-12);
        assert!((to_mpa(atm(1.0)) - 0.101_325).abs() < 1e-12);
        assert!((to_mpa(kpa(500.0)) - to_mpa(pa(5.0e5))).abs() < 1e-12);
    }

    #[test]
    fn native_conversions() {
        assert!((kelvin_to_celsius(298.15) - 25.0).abs() < 1e-9);
        assert!((mpa_to_atm(10.0) - 98.6923).abs() < 1e-9);
        assert!((mpa_to_bar(10.0) - 100.0).abs() < 1e-12);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn temperature_round_trip(t in 200.0_f64..700.0) {
            prop_assert!((celsius_to_kelvin(kelvin_to_celsius(t)) - t).abs() < 1e-9);
        }

        #[test]
        fn pressure_round_trip(p in 0.0_f64..200.0) {
            prop_assert!((atm_to_mpa(mpa_to_atm(p)) - p).abs() < 1e-9);
        }
    }
}
