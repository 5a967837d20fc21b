//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR uses Wilder smoothing (EMA with alpha = 1/period).
//! Lookback: period (TR[0] has no previous close and is excluded from the seed).

/// TR[0] = high[0] - low[0]; TR[t] uses the previous close.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let n = high.len().min(low.len()).min(close.len());
    let mut tr = vec![f64::NAN; n];
    if n == 0 {
        return tr;
    }
    tr[0] = high[0] - low[0];
    for i in 1..n {
        let (h, l, pc) = (high[i], low[i], close[i - 1]);
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }
    tr
}

/// Wilder smoothing, alpha = 1/period. Seeded with the mean of the first
/// `period` consecutive non-NaN values; a later NaN taints the remainder.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }

    let mut run = 0usize;
    let mut seed_end = None;
    for (i, v) in values.iter().enumerate() {
        if v.is_nan() {
            run = 0;
        } else {
            run += 1;
            if run == period {
                seed_end = Some(i + 1);
                break;
            }
        }
    }
    let Some(seed_end) = seed_end else {
        return result;
    };

    let seed = values[seed_end - period..seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = seed;

    let alpha = 1.0 / period as f64;
    let mut prev = seed;
    for i in seed_end..n {
        if values[i].is_nan() {
            break;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }
    result
}

pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let mut tr = true_range(high, low, close);
    if let Some(first) = tr.first_mut() {
        *first = f64::NAN;
    }
    wilder_smooth(&tr, period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn true_range_basic() {
        let high = [105.0, 108.0, 107.0];
        let low = [95.0, 100.0, 98.0];
        let close = [102.0, 106.0, 99.0];
        let tr = true_range(&high, &low, &close);
        assert_approx(tr[0], 10.0, DEFAULT_EPSILON);
        assert_approx(tr[1], 8.0, DEFAULT_EPSILON);
        assert_approx(tr[2], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let tr = true_range(&[102.0, 115.0], &[97.0, 108.0], &[100.0, 112.0]);
        assert_approx(tr[1], 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_period_3() {
        // TRs from bar 1: 8, 9, 6, then Wilder
        let high = [105.0, 108.0, 107.0, 104.0, 106.0];
        let low = [95.0, 100.0, 98.0, 98.0, 100.0];
        let close = [102.0, 106.0, 99.0, 101.0, 103.0];
        let result = atr(&high, &low, &close, 3);
        assert!(result[2].is_nan());
        let seed = (8.0 + 9.0 + 6.0) / 3.0;
        assert_approx(result[3], seed, DEFAULT_EPSILON);
        // TR[4] = max(6, |106-101|, |100-101|) = 6
        assert_approx(result[4], seed * 2.0 / 3.0 + 6.0 / 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn wilder_skips_leading_nan() {
        let result = wilder_smooth(&[f64::NAN, 2.0, 4.0, 6.0], 2);
        assert!(result[1].is_nan());
        assert_approx(result[2], 3.0, DEFAULT_EPSILON);
        assert_approx(result[3], 4.5, DEFAULT_EPSILON);
    }
}
