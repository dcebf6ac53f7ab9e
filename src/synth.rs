//! Curve synthesis for the closure-energy figure
//!
//! Builds the time axis and the three closure-energy sequences from closed-form
//! expressions. No randomness: the same configuration always yields the same
//! arrays, bit for bit.

use serde::Serialize;

use crate::config::{BumpParams, FigureConfig, OscillationParams};

/// Closure index set an energy curve is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ClosureSet {
    /// {0}: baseline decay only
    Zero,
    /// {0,1}: baseline plus a bounded early oscillation
    ZeroOne,
    /// {0,1,2}: baseline plus oscillation and transient growth
    ZeroOneTwo,
}

impl ClosureSet {
    pub const ALL: [ClosureSet; 3] = [
        ClosureSet::Zero,
        ClosureSet::ZeroOne,
        ClosureSet::ZeroOneTwo,
    ];

    pub fn indices(self) -> &'static [u8] {
        match self {
            ClosureSet::Zero => &[0],
            ClosureSet::ZeroOne => &[0, 1],
            ClosureSet::ZeroOneTwo => &[0, 1, 2],
        }
    }

    /// Legend entry, e.g. `E_(0,1)(t)`.
    pub fn legend_label(self) -> String {
        let joined = self
            .indices()
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(",");
        format!("E_({joined})(t)")
    }
}

/// Time axis, intermediate terms and the three energy curves
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyCurves {
    /// Sampled (t - t0)/M axis
    pub t: Vec<f64>,
    /// Shifted time t - t0
    pub tau: Vec<f64>,
    /// Shared exponential decay baseline
    pub e_base: Vec<f64>,
    /// Logistic gate, ~1 before t* and ~0 after
    pub gate: Vec<f64>,
    pub e_0: Vec<f64>,
    pub e_01: Vec<f64>,
    pub e_012: Vec<f64>,
}

impl EnergyCurves {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn curve(&self, set: ClosureSet) -> &[f64] {
        match set {
            ClosureSet::Zero => &self.e_0,
            ClosureSet::ZeroOne => &self.e_01,
            ClosureSet::ZeroOneTwo => &self.e_012,
        }
    }

    /// Smallest and largest value over all three curves.
    pub fn value_range(&self) -> (f64, f64) {
        ClosureSet::ALL
            .iter()
            .flat_map(|&set| self.curve(set).iter().copied())
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            })
    }
}

/// `n` evenly spaced samples from `start` to `end`, both inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            // Pin the endpoint so accumulated rounding never overshoots it.
            values[n - 1] = end;
            values
        }
    }
}

/// Logistic smooth step from ~1 (x << x0) to ~0 (x >> x0).
pub fn smooth_step(x: f64, x0: f64, k: f64) -> f64 {
    1.0 / (1.0 + (k * (x - x0)).exp())
}

pub fn damped_oscillation(tau: f64, gate: f64, p: &OscillationParams) -> f64 {
    let envelope = p.amplitude * gate * (-p.decay * tau).exp();
    envelope * (1.0 + p.depth * (p.frequency * tau + p.phase).sin())
}

pub fn gaussian_bump(tau: f64, gate: f64, p: &BumpParams) -> f64 {
    let z = (tau - p.centre) / p.width;
    p.amplitude * (-0.5 * z * z).exp() * gate
}

/// Clamp every element to a minimum of zero in place.
pub fn clamp_non_negative(values: &mut [f64]) {
    for v in values.iter_mut() {
        *v = v.max(0.0);
    }
}

/// Index of the first element of a sorted slice that is `>= value`.
///
/// Returns `axis.len()` when every element is smaller.
pub fn search_sorted(axis: &[f64], value: f64) -> usize {
    axis.partition_point(|&x| x < value)
}

/// Maximum ignoring NaN entries; NaN if there is nothing else.
pub fn nan_max(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
        .unwrap_or(f64::NAN)
}

/// Build the time axis and the three closure-energy curves.
pub fn synthesize(cfg: &FigureConfig) -> EnergyCurves {
    let t = linspace(cfg.t_start, cfg.t_end, cfg.samples);
    let tau: Vec<f64> = t.iter().map(|&x| x - cfg.t0).collect();

    let e_base: Vec<f64> = tau
        .iter()
        .map(|&x| cfg.base_amplitude * (-cfg.decay_rate * x).exp())
        .collect();
    let gate: Vec<f64> = tau
        .iter()
        .map(|&x| smooth_step(x, cfg.t_star, cfg.gate_steepness))
        .collect();

    let mut e_0 = Vec::with_capacity(t.len());
    let mut e_01 = Vec::with_capacity(t.len());
    let mut e_012 = Vec::with_capacity(t.len());

    for ((&x, &base), &g) in tau.iter().zip(&e_base).zip(&gate) {
        let osc1 = damped_oscillation(x, g, &cfg.osc_01);
        let osc2 = damped_oscillation(x, g, &cfg.osc_012);
        let bump = gaussian_bump(x, g, &cfg.bump);

        e_0.push(base);
        // Upward excursions pass through, dips are bounded relative to baseline.
        e_01.push(base + osc1.max(-cfg.dip_floor_ratio * base));
        e_012.push(base + osc2 + bump);
    }

    clamp_non_negative(&mut e_0);
    clamp_non_negative(&mut e_01);
    clamp_non_negative(&mut e_012);

    EnergyCurves {
        t,
        tau,
        e_base,
        gate,
        e_0,
        e_01,
        e_012,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn default_curves() -> EnergyCurves {
        synthesize(&FigureConfig::default())
    }

    #[test]
    fn test_time_axis_shape() {
        let curves = default_curves();
        assert_eq!(curves.len(), 1200);
        assert_eq!(curves.t[0], 0.0);
        assert_eq!(curves.t[1199], 30.0);
        assert!(curves.t.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(curves.tau, curves.t);
    }

    #[test]
    fn test_curves_non_negative_and_aligned() {
        let curves = default_curves();
        for set in ClosureSet::ALL {
            let curve = curves.curve(set);
            assert_eq!(curve.len(), curves.len());
            assert!(curve.iter().all(|&v| v >= 0.0), "{set:?} has a negative sample");
        }
    }

    #[test]
    fn test_e0_is_pure_decay() {
        let curves = default_curves();
        for (&t, &e) in curves.t.iter().zip(&curves.e_0) {
            assert_eq!(e, 0.5 * (-0.12 * t).exp());
        }
    }

    #[test]
    fn test_e01_dip_is_bounded() {
        let curves = default_curves();
        for i in 0..curves.len() {
            let base = curves.e_base[i];
            assert!(curves.e_01[i] >= base - 0.02 * base);
        }
    }

    #[test]
    fn test_e012_is_not_monotone() {
        let curves = default_curves();
        assert!(curves.e_012.windows(2).any(|w| w[1] > w[0]));
        assert!(curves.e_0.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_gate_monotone_in_unit_interval() {
        let curves = default_curves();
        assert!(curves.gate.iter().all(|&g| g > 0.0 && g < 1.0));
        assert!(curves.gate.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_gate_boundaries() {
        let curves = default_curves();
        assert_relative_eq!(curves.gate[0], 1.0 / (1.0 + (-9.6_f64).exp()), max_relative = 1e-12);
        assert_relative_eq!(curves.gate[1199], 1.0 / (1.0 + 26.4_f64.exp()), max_relative = 1e-9);
        assert!(curves.gate[0] > 0.9999);
        assert!(curves.gate[1199] < 1e-10);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(default_curves(), default_curves());
    }

    #[test]
    fn test_linspace_edges() {
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_search_sorted_left() {
        let axis = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(search_sorted(&axis, -1.0), 0);
        assert_eq!(search_sorted(&axis, 1.0), 1);
        assert_eq!(search_sorted(&axis, 1.5), 2);
        assert_eq!(search_sorted(&axis, 9.0), 4);
    }

    #[test]
    fn test_nan_max_skips_nan() {
        assert_eq!(nan_max(&[1.0, f64::NAN, 3.0, 2.0]), 3.0);
        assert!(nan_max(&[f64::NAN]).is_nan());
        assert!(nan_max(&[]).is_nan());
    }

    #[test]
    fn test_clamp_non_negative() {
        let mut values = [-0.5, 0.0, 0.25];
        clamp_non_negative(&mut values);
        assert_eq!(values, [0.0, 0.0, 0.25]);
    }

    #[test]
    fn test_legend_labels() {
        assert_eq!(ClosureSet::Zero.legend_label(), "E_(0)(t)");
        assert_eq!(ClosureSet::ZeroOne.legend_label(), "E_(0,1)(t)");
        assert_eq!(ClosureSet::ZeroOneTwo.legend_label(), "E_(0,1,2)(t)");
    }
}
