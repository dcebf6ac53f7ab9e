use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Damped, gated oscillation
/// `amplitude * gate * exp(-decay*tau) * (1 + depth*sin(frequency*tau + phase))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OscillationParams {
    pub amplitude: f64,
    /// Envelope decay rate [1/M]
    pub decay: f64,
    /// Modulation depth of the sine term
    pub depth: f64,
    /// Angular frequency [rad/M]
    pub frequency: f64,
    /// Phase offset [rad]
    pub phase: f64,
}

/// Gated Gaussian lobe `amplitude * exp(-0.5*((tau-centre)/width)^2) * gate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BumpParams {
    pub amplitude: f64,
    pub centre: f64,
    pub width: f64,
}

/// Parameters of the closure-energy figure.
///
/// The defaults are the values the published figure is drawn with. The binary
/// never changes them; the library accepts other values mainly for tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureConfig {
    /// Reference time t0 subtracted from the axis
    pub t0: f64,
    /// First sample of the time axis [M]
    pub t_start: f64,
    /// Last sample of the time axis [M], inclusive
    pub t_end: f64,
    /// Number of samples on the time axis
    pub samples: usize,
    /// Ringdown onset relative to t0 [M]
    pub t_star: f64,
    /// Amplitude of the shared exponential decay
    pub base_amplitude: f64,
    /// Decay rate of the shared baseline [1/M]
    pub decay_rate: f64,
    /// Logistic gate steepness
    pub gate_steepness: f64,
    /// Perturbation added to the (0,1) curve
    pub osc_01: OscillationParams,
    /// Perturbation added to the (0,1,2) curve
    pub osc_012: OscillationParams,
    /// Transient growth lobe of the (0,1,2) curve
    pub bump: BumpParams,
    /// Largest downward excursion of the (0,1) curve, as a fraction of baseline
    pub dip_floor_ratio: f64,
    /// Horizontal offset of the t* label from the marker line [M]
    pub label_offset: f64,
    /// Output file, relative paths resolve against the working directory
    pub output_file: PathBuf,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            t0: 0.0,
            t_start: 0.0,
            t_end: 30.0,
            samples: 1200,
            t_star: 8.0,
            base_amplitude: 0.5,
            decay_rate: 0.12,
            gate_steepness: 1.2,
            osc_01: OscillationParams {
                amplitude: 0.08,
                decay: 0.25,
                depth: 0.7,
                frequency: 2.6,
                phase: 0.0,
            },
            osc_012: OscillationParams {
                amplitude: 0.14,
                decay: 0.18,
                depth: 1.1,
                frequency: 2.9,
                phase: 0.6,
            },
            bump: BumpParams {
                amplitude: 0.10,
                centre: 4.2,
                width: 1.2,
            },
            dip_floor_ratio: 0.02,
            label_offset: 0.3,
            output_file: PathBuf::from(crate::OUTPUT_FILE_NAME),
        }
    }
}

impl FigureConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.samples >= 2, "samples must be at least 2");
        anyhow::ensure!(
            self.t_start.is_finite() && self.t_end.is_finite(),
            "time range must be finite"
        );
        anyhow::ensure!(self.t_end > self.t_start, "t_end must be > t_start");
        anyhow::ensure!(
            self.t0.is_finite() && self.t_star.is_finite(),
            "t0 and t_star must be finite"
        );
        anyhow::ensure!(self.gate_steepness > 0.0, "gate_steepness must be > 0");
        anyhow::ensure!(self.bump.width > 0.0, "bump width must be > 0");
        anyhow::ensure!(
            self.dip_floor_ratio >= 0.0,
            "dip_floor_ratio must be non-negative"
        );
        anyhow::ensure!(
            self.output_file.file_name().is_some(),
            "output_file must name a file"
        );
        Ok(())
    }

    /// Absolute position of the ringdown marker on the time axis.
    pub fn t_star_abs(&self) -> f64 {
        self.t0 + self.t_star
    }
}
