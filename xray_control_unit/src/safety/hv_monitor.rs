//! HV monitor: ADC sampling, calibration and alarm detection.
//!
//! # Conversion
//!
//! ```text
//!   raw counts ──× lsb──► v_adc ──|v| < floor → 0──► v
//!   hv_estimate = (scale · v + offset) · multiplier
//!   alarm       = v ≥ alarm_threshold
//! ```
//!
//! A failed conversion is reported as an alarm with no voltage so that an
//! unreadable monitor never looks safe.

use crate::config::AdcConfig;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use xray_common::hal::driver::AnalogInput;

/// Position of the ADC voltage relative to the nominal band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HvBand {
    /// Below `band_low_v`.
    Low,
    /// Inside the band.
    Ok,
    /// Above `band_high_v`.
    High,
}

/// Alarm transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HvEdge {
    /// Alarm asserted.
    Raised,
    /// Alarm cleared.
    Cleared,
}

impl HvEdge {
    /// Operator message for this edge.
    pub const fn message(self) -> &'static str {
        match self {
            Self::Raised => "DANGER: HV ≥ threshold",
            Self::Cleared => "HV below threshold",
        }
    }
}

/// One HV monitor sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HvReading {
    /// Measured ADC voltage, `None` if the read failed.
    pub adc_volts: Option<f64>,
    /// Calibrated tube voltage estimate [V].
    pub estimated_hv_volts: Option<f64>,
    /// Alarm condition.
    pub alarm: bool,
    /// Band classification.
    pub band: Option<HvBand>,
}

impl HvReading {
    /// Reading produced by a failed conversion.
    pub const fn failed() -> Self {
        Self {
            adc_volts: None,
            estimated_hv_volts: None,
            alarm: true,
            band: None,
        }
    }

    /// Classify an ADC voltage.
    pub fn from_volts(v: f64, cfg: &AdcConfig) -> Self {
        Self {
            adc_volts: Some(v),
            estimated_hv_volts: Some(estimate_hv(v, cfg)),
            alarm: v >= cfg.alarm_threshold_v,
            band: Some(classify(v, cfg.band_low_v, cfg.band_high_v)),
        }
    }
}

/// Raw counts to volts, clamping the noise floor to zero.
pub fn counts_to_volts(raw: i32, lsb_volts: f64, noise_floor_v: f64) -> f64 {
    let v = f64::from(raw) * lsb_volts;
    if v.abs() < noise_floor_v { 0.0 } else { v }
}

/// Calibrated tube voltage estimate.
pub fn estimate_hv(v: f64, cfg: &AdcConfig) -> f64 {
    (cfg.scale * v + cfg.offset) * cfg.multiplier
}

/// Band classification. The band edges belong to the band.
pub fn classify(v: f64, low: f64, high: f64) -> HvBand {
    if v < low {
        HvBand::Low
    } else if v > high {
        HvBand::High
    } else {
        HvBand::Ok
    }
}

/// Periodic sampler over one ADC channel.
pub struct HvMonitor {
    adc: Arc<dyn AnalogInput>,
    cfg: AdcConfig,
    latest: Mutex<Option<HvReading>>,
}

impl HvMonitor {
    /// New monitor; no reading until the first [`sample`](Self::sample).
    pub fn new(adc: Arc<dyn AnalogInput>, cfg: AdcConfig) -> Self {
        Self {
            adc,
            cfg,
            latest: Mutex::new(None),
        }
    }

    /// Read the ADC once. Returns the reading and the alarm edge, if the
    /// alarm state differs from the previous sample (or this is the first).
    pub fn sample(&self) -> (HvReading, Option<HvEdge>) {
        let reading = match self.adc.read_raw() {
            Ok(raw) => HvReading::from_volts(
                counts_to_volts(raw, self.cfg.lsb_volts, self.cfg.noise_floor_v),
                &self.cfg,
            ),
            Err(e) => {
                warn!("HV ADC channel {} read failed: {}", self.adc.channel(), e);
                HvReading::failed()
            }
        };

        let mut latest = self.latest.lock();
        let edge = match *latest {
            Some(prev) if prev.alarm == reading.alarm => None,
            _ if reading.alarm => Some(HvEdge::Raised),
            _ => Some(HvEdge::Cleared),
        };
        *latest = Some(reading);
        (reading, edge)
    }

    /// Last reading, if any.
    pub fn latest(&self) -> Option<HvReading> {
        *self.latest.lock()
    }

    /// Last reading is in alarm.
    pub fn alarm_active(&self) -> bool {
        self.latest().is_some_and(|r| r.alarm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xray_common::hal::config::{HalConfig, PinMap};
    use xray_hal::{HardwareContext, SimulationDriver};

    #[test]
    fn noise_floor_clamps() {
        let lsb = 6.144 / 32767.0;
        assert_eq!(counts_to_volts(10, lsb, 0.01), 0.0);
        assert_eq!(counts_to_volts(-10, lsb, 0.01), 0.0);
        assert!((counts_to_volts(8800, lsb, 0.01) - 1.65).abs() < 1e-3);
    }

    #[test]
    fn band_edges_are_inside() {
        assert_eq!(classify(1.485, 1.485, 1.815), HvBand::Ok);
        assert_eq!(classify(1.815, 1.485, 1.815), HvBand::Ok);
        assert_eq!(classify(1.4, 1.485, 1.815), HvBand::Low);
        assert_eq!(classify(1.9, 1.485, 1.815), HvBand::High);
    }

    #[test]
    fn calibration_formula() {
        let cfg = AdcConfig::default();
        let hv = estimate_hv(1.0, &cfg);
        assert!((hv - 2.7 * cfg.multiplier).abs() < 1e-9);
    }

    #[test]
    fn alarm_at_threshold() {
        let cfg = AdcConfig::default();
        assert!(HvReading::from_volts(cfg.alarm_threshold_v, &cfg).alarm);
        assert!(!HvReading::from_volts(1.0, &cfg).alarm);
    }

    #[test]
    fn sampling_edges_and_failures() {
        let driver = SimulationDriver::new();
        let sim = driver.handle();
        let pins = PinMap::default();
        let hw = HardwareContext::open(Box::new(driver), &HalConfig::default(), &pins).unwrap();
        let mon = HvMonitor::new(hw.hv_adc.clone(), AdcConfig::default());
        assert!(mon.latest().is_none());

        sim.set_analog(pins.hv_adc_channel, 0);
        let (r, edge) = mon.sample();
        assert!(!r.alarm);
        assert_eq!(edge, Some(HvEdge::Cleared));
        assert_eq!(mon.sample().1, None);

        sim.set_analog(pins.hv_adc_channel, 12_000);
        let (r, edge) = mon.sample();
        assert!(r.alarm);
        assert_eq!(r.band, Some(HvBand::High));
        assert_eq!(edge, Some(HvEdge::Raised));

        sim.set_analog(pins.hv_adc_channel, 0);
        sim.fail_channel(pins.hv_adc_channel, true);
        let (r, edge) = mon.sample();
        assert_eq!(r, HvReading::failed());
        assert_eq!(edge, None);
        assert!(mon.alarm_active());
    }
}
