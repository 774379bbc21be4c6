//! Reading the best period and epoch back out of a periodogram result.
//!
//! Periodogram results come in several shapes: some expose peak accessors,
//! some only raw `period`/`power` arrays, and epochs may be plain BTJD numbers
//! or time-system-aware values that need converting. Results are modelled as a
//! capability trait whose methods all default to "not supported", and
//! extraction walks a fixed, ordered list of strategies until one yields a
//! finite number.
//!
//! Each strategy is tried at most once. Exhausting the list is an error; no
//! default value is ever substituted.

use thiserror::Error;
use tracing::debug;
use uom::si::f64::Time;
use uom::si::time::day;

use crate::domain::BTJD_OFFSET;
use crate::math::nanargmax;

/// A period as reported by a result: plain days or a unit-tagged quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PeriodValue {
    Days(f64),
    Quantity(Time),
}

impl PeriodValue {
    pub fn to_days(self) -> f64 {
        match self {
            PeriodValue::Days(v) => v,
            PeriodValue::Quantity(q) => q.get::<day>(),
        }
    }
}

impl From<f64> for PeriodValue {
    fn from(value: f64) -> Self {
        PeriodValue::Days(value)
    }
}

impl From<Time> for PeriodValue {
    fn from(value: Time) -> Self {
        PeriodValue::Quantity(value)
    }
}

/// Time representations an epoch may be converted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFormat {
    /// Barycentric TESS Julian Date (JD - 2457000).
    Btjd,
    /// Julian Date.
    Jd,
    /// Modified Julian Date (JD - 2400000.5).
    Mjd,
}

/// A time-system-aware epoch value.
pub trait TransitEpoch {
    /// Value in the requested format, or `None` if the conversion is unsupported.
    fn to_value(&self, format: TimeFormat) -> Option<f64>;

    /// Direct BTJD attribute, when the value carries one.
    fn btjd(&self) -> Option<f64> {
        None
    }
}

/// Plain numbers are taken to already be BTJD.
impl TransitEpoch for f64 {
    fn to_value(&self, format: TimeFormat) -> Option<f64> {
        match format {
            TimeFormat::Btjd => Some(*self),
            TimeFormat::Jd => Some(*self + BTJD_OFFSET),
            TimeFormat::Mjd => Some(*self + BTJD_OFFSET - 2_400_000.5),
        }
    }
}

/// A TDB timestamp stored as BTJD, convertible to any `TimeFormat`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TessTime {
    btjd: f64,
}

impl TessTime {
    pub fn from_btjd(btjd: f64) -> Self {
        Self { btjd }
    }

    pub fn from_jd(jd: f64) -> Self {
        Self { btjd: jd - BTJD_OFFSET }
    }
}

impl TransitEpoch for TessTime {
    fn to_value(&self, format: TimeFormat) -> Option<f64> {
        self.btjd.to_value(format)
    }

    fn btjd(&self) -> Option<f64> {
        Some(self.btjd)
    }
}

/// Capabilities a periodogram result may offer. Every method is optional.
pub trait PeriodogramResult {
    fn period_at_max_power(&self) -> Option<PeriodValue> {
        None
    }

    fn periods(&self) -> Option<Vec<PeriodValue>> {
        None
    }

    fn power(&self) -> Option<&[f64]> {
        None
    }

    fn transit_time_at_max_power(&self) -> Option<Box<dyn TransitEpoch + '_>> {
        None
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtractError {
    #[error("no period could be read (tried: {tried})")]
    PeriodExhausted { tried: String },

    #[error("result exposes no transit time at max power")]
    MissingEpoch,

    #[error("transit time could not be converted to BTJD (tried: {tried})")]
    EpochExhausted { tried: String },
}

/// A named period extraction step.
pub struct PeriodStrategy {
    pub name: &'static str,
    pub apply: fn(&dyn PeriodogramResult) -> Option<f64>,
}

/// A named epoch extraction step.
pub struct EpochStrategy {
    pub name: &'static str,
    pub apply: fn(&dyn TransitEpoch) -> Option<f64>,
}

/// Period strategies in order of preference.
pub const PERIOD_STRATEGIES: &[PeriodStrategy] = &[
    PeriodStrategy {
        name: "peak accessor",
        apply: period_from_peak_accessor,
    },
    PeriodStrategy {
        name: "argmax over power",
        apply: period_from_power_argmax,
    },
];

/// Epoch strategies in order of preference.
pub const EPOCH_STRATEGIES: &[EpochStrategy] = &[
    EpochStrategy {
        name: "btjd conversion",
        apply: epoch_from_btjd_conversion,
    },
    EpochStrategy {
        name: "btjd attribute",
        apply: epoch_from_btjd_attribute,
    },
    EpochStrategy {
        name: "julian date offset",
        apply: epoch_from_julian_date,
    },
];

fn period_from_peak_accessor(result: &dyn PeriodogramResult) -> Option<f64> {
    result.period_at_max_power().map(PeriodValue::to_days)
}

fn period_from_power_argmax(result: &dyn PeriodogramResult) -> Option<f64> {
    let power = result.power()?;
    let periods = result.periods()?;
    if periods.len() != power.len() {
        return None;
    }
    let idx = nanargmax(power)?;
    periods.get(idx).map(|p| p.to_days())
}

fn epoch_from_btjd_conversion(epoch: &dyn TransitEpoch) -> Option<f64> {
    epoch.to_value(TimeFormat::Btjd)
}

fn epoch_from_btjd_attribute(epoch: &dyn TransitEpoch) -> Option<f64> {
    epoch.btjd()
}

fn epoch_from_julian_date(epoch: &dyn TransitEpoch) -> Option<f64> {
    epoch.to_value(TimeFormat::Jd).map(|jd| jd - BTJD_OFFSET)
}

/// Best period in days.
pub fn extract_period(result: &dyn PeriodogramResult) -> Result<f64, ExtractError> {
    for strategy in PERIOD_STRATEGIES {
        if let Some(period) = (strategy.apply)(result).filter(|v| v.is_finite()) {
            debug!(period, via = strategy.name, "extracted best period");
            return Ok(period);
        }
    }
    Err(ExtractError::PeriodExhausted {
        tried: joined(PERIOD_STRATEGIES.iter().map(|s| s.name)),
    })
}

/// Best transit epoch in BTJD.
pub fn extract_epoch(result: &dyn PeriodogramResult) -> Result<f64, ExtractError> {
    let epoch = result.transit_time_at_max_power().ok_or(ExtractError::MissingEpoch)?;
    for strategy in EPOCH_STRATEGIES {
        if let Some(t0) = (strategy.apply)(&*epoch).filter(|v| v.is_finite()) {
            debug!(t0, via = strategy.name, "extracted transit epoch");
            return Ok(t0);
        }
    }
    Err(ExtractError::EpochExhausted {
        tried: joined(EPOCH_STRATEGIES.iter().map(|s| s.name)),
    })
}

fn joined<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

/// `(best_period_days, best_epoch_btjd)`.
pub fn extract_best(result: &dyn PeriodogramResult) -> Result<(f64, f64), ExtractError> {
    Ok((extract_period(result)?, extract_epoch(result)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uom::si::time::hour;

    /// Only raw arrays, no peak accessor and no epoch.
    struct RawArrays {
        period: Vec<f64>,
        power: Vec<f64>,
    }

    impl PeriodogramResult for RawArrays {
        fn periods(&self) -> Option<Vec<PeriodValue>> {
            Some(self.period.iter().map(|&p| PeriodValue::Days(p)).collect())
        }

        fn power(&self) -> Option<&[f64]> {
            Some(&self.power)
        }
    }

    /// Epoch whose BTJD conversion is unsupported but carries a `.btjd` attribute.
    #[derive(Clone, Copy)]
    struct AttrOnly(f64);

    impl TransitEpoch for AttrOnly {
        fn to_value(&self, _format: TimeFormat) -> Option<f64> {
            None
        }

        fn btjd(&self) -> Option<f64> {
            Some(self.0)
        }
    }

    /// Epoch that only converts to Julian Date.
    #[derive(Clone, Copy)]
    struct JdOnly(f64);

    impl TransitEpoch for JdOnly {
        fn to_value(&self, format: TimeFormat) -> Option<f64> {
            (format == TimeFormat::Jd).then_some(self.0)
        }
    }

    /// Peak accessors only, with a configurable epoch representation.
    struct PeakOnly<E: TransitEpoch + Copy> {
        period: PeriodValue,
        epoch: E,
    }

    impl<E: TransitEpoch + Copy + 'static> PeriodogramResult for PeakOnly<E> {
        fn period_at_max_power(&self) -> Option<PeriodValue> {
            Some(self.period)
        }

        fn transit_time_at_max_power(&self) -> Option<Box<dyn TransitEpoch + '_>> {
            Some(Box::new(self.epoch))
        }
    }

    struct Nothing;
    impl PeriodogramResult for Nothing {}

    #[test]
    fn argmax_picks_unique_maximum() {
        let result = RawArrays {
            period: vec![1.0, 2.0, 3.0, 4.0],
            power: vec![0.1, f64::NAN, 7.5, 2.0],
        };
        assert_eq!(extract_period(&result).unwrap(), 3.0);
    }

    #[test]
    fn argmax_rejects_mismatched_arrays() {
        let result = RawArrays {
            period: vec![1.0, 2.0],
            power: vec![0.1, 0.2, 0.3],
        };
        assert!(matches!(
            extract_period(&result),
            Err(ExtractError::PeriodExhausted { .. })
        ));
    }

    #[test]
    fn argmax_with_all_nan_power_fails() {
        let result = RawArrays {
            period: vec![1.0, 2.0],
            power: vec![f64::NAN, f64::NAN],
        };
        assert!(extract_period(&result).is_err());
    }

    #[test]
    fn peak_accessor_quantity_is_converted_to_days() {
        let result = PeakOnly {
            period: PeriodValue::Quantity(Time::new::<hour>(36.0)),
            epoch: 10.0_f64,
        };
        assert!((extract_period(&result).unwrap() - 1.5).abs() < 1e-12);
        assert_eq!(extract_epoch(&result).unwrap(), 10.0);
    }

    #[test]
    fn btjd_attribute_used_when_conversion_unsupported() {
        let result = PeakOnly {
            period: PeriodValue::Days(2.0),
            epoch: AttrOnly(1234.5),
        };
        assert_eq!(extract_epoch(&result).unwrap(), 1234.5);
    }

    #[test]
    fn julian_date_fallback_subtracts_offset() {
        let result = PeakOnly {
            period: PeriodValue::Days(2.0),
            epoch: JdOnly(2458234.5),
        };
        assert_eq!(extract_epoch(&result).unwrap(), 1234.5);
    }

    #[test]
    fn tess_time_prefers_direct_conversion() {
        let t = TessTime::from_jd(2_458_000.25);
        assert_eq!(epoch_from_btjd_conversion(&t), Some(1000.25));
        assert_eq!(t.to_value(TimeFormat::Mjd), Some(58_000.25 - 0.5));
    }

    #[test]
    fn exhaustion_is_an_error_not_a_default() {
        assert!(matches!(
            extract_period(&Nothing),
            Err(ExtractError::PeriodExhausted { .. })
        ));
        assert_eq!(extract_epoch(&Nothing), Err(ExtractError::MissingEpoch));

        #[derive(Clone, Copy)]
        struct Opaque;
        impl TransitEpoch for Opaque {
            fn to_value(&self, _format: TimeFormat) -> Option<f64> {
                None
            }
        }
        let result = PeakOnly {
            period: PeriodValue::Days(1.0),
            epoch: Opaque,
        };
        let err = extract_epoch(&result).unwrap_err();
        assert_eq!(
            err,
            ExtractError::EpochExhausted {
                tried: "btjd conversion, btjd attribute, julian date offset".to_string()
            }
        );
    }

    #[test]
    fn non_finite_values_fall_through_to_next_strategy() {
        struct NanPeak;
        impl PeriodogramResult for NanPeak {
            fn period_at_max_power(&self) -> Option<PeriodValue> {
                Some(PeriodValue::Days(f64::NAN))
            }
            fn periods(&self) -> Option<Vec<PeriodValue>> {
                Some(vec![PeriodValue::Days(5.0), PeriodValue::Days(6.0)])
            }
            fn power(&self) -> Option<&[f64]> {
                Some(&[3.0, 1.0])
            }
        }
        assert_eq!(extract_period(&NanPeak).unwrap(), 5.0);
    }
}
