//! FILENAME: engine/src/analytics.rs
//! PURPOSE: Series helpers for KPI reporting: moving average, period-over-period
//! growth, and percentiles.
//! CONTEXT: Operate on plain f64 slices, typically a column pulled out with
//! `Table::column` and `CellValue::as_number`.

use crate::error::{EngineError, EngineResult};

/// Mean of every full window, in order. A window longer than the series
/// yields an empty result.
pub fn moving_average(values: &[f64], window: usize) -> EngineResult<Vec<f64>> {
    if window == 0 {
        return Err(EngineError::InvalidArgument(
            "moving average window must be at least 1".to_string(),
        ));
    }
    Ok(values
        .windows(window)
        .map(|w| w.iter().sum::<f64>() / window as f64)
        .collect())
}

/// Percent change of each value against the value `period` steps earlier.
/// Result has `values.len() - period` entries; a zero base follows float
/// division (infinite or NaN growth).
pub fn year_over_year_growth(values: &[f64], period: usize) -> EngineResult<Vec<f64>> {
    if period == 0 {
        return Err(EngineError::InvalidArgument(
            "growth period must be at least 1".to_string(),
        ));
    }
    if values.len() <= period {
        return Ok(Vec::new());
    }
    Ok(values
        .iter()
        .zip(&values[period..])
        .map(|(base, current)| (current - base) / base * 100.0)
        .collect())
}

/// `p`-th percentile (0..=100) with linear interpolation between ranks.
pub fn percentile(values: &[f64], p: f64) -> EngineResult<f64> {
    if !(0.0..=100.0).contains(&p) {
        return Err(EngineError::InvalidArgument(format!(
            "percentile must be within 0..=100, got {}",
            p
        )));
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, p / 100.0).ok_or_else(|| {
        EngineError::InvalidArgument("percentile of an empty series".to_string())
    })
}

/// Quantile `q` (0..=1) of an ascending slice, None when empty.
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONTHLY: [f64; 24] = [
        100.0, 120.0, 150.0, 140.0, 160.0, 180.0, 200.0, 220.0, 240.0, 260.0, 280.0, 300.0,
        110.0, 130.0, 160.0, 150.0, 170.0, 190.0, 210.0, 230.0, 250.0, 270.0, 290.0, 310.0,
    ];

    #[test]
    fn moving_average_over_full_windows() {
        let ma = moving_average(&MONTHLY, 3).unwrap();
        assert_eq!(ma.len(), 22);
        assert!((ma[0] - 123.333_333).abs() < 1e-5);
        assert_eq!(ma[1], 410.0 / 3.0);
        assert!(moving_average(&MONTHLY[..2], 3).unwrap().is_empty());
        assert!(matches!(
            moving_average(&MONTHLY, 0),
            Err(EngineError::InvalidArgument(_))
        ));
    }

    #[test]
    fn growth_against_same_month_last_year() {
        let yoy = year_over_year_growth(&MONTHLY, 12).unwrap();
        assert_eq!(yoy.len(), 12);
        assert!((yoy[0] - 10.0).abs() < 1e-9);
        assert!((yoy[11] - 10.0 / 3.0).abs() < 1e-9);
        assert!(year_over_year_growth(&MONTHLY[..12], 12).unwrap().is_empty());
    }

    #[test]
    fn growth_from_zero_base_is_infinite() {
        let yoy = year_over_year_growth(&[0.0, 5.0], 1).unwrap();
        assert!(yoy[0].is_infinite());
    }

    #[test]
    fn percentile_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&data, 0.0).unwrap(), 1.0);
        assert_eq!(percentile(&data, 50.0).unwrap(), 2.5);
        assert_eq!(percentile(&data, 75.0).unwrap(), 3.25);
        assert_eq!(percentile(&data, 100.0).unwrap(), 4.0);
    }

    #[test]
    fn percentile_rejects_bad_input() {
        assert!(percentile(&[1.0], 101.0).is_err());
        assert!(percentile(&[1.0], f64::NAN).is_err());
        assert!(percentile(&[], 50.0).is_err());
    }
}
