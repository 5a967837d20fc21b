//! Exponential Moving Average (EMA), span form with no bias adjustment.
//!
//! alpha = 2 / (span + 1)
//! EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1]
//! Seed: EMA at the first finite input equals that input, so output is valid
//! from the first finite bar. Strategies that need a converged average
//! declare their own warm-up.

/// EMA of `values` with the given span. NaN inputs produce NaN outputs and
/// leave the running average untouched.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if span == 0 {
        return result;
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut prev: Option<f64> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        let next = match prev {
            None => v,
            Some(p) => alpha * v + (1.0 - alpha) * p,
        };
        result[i] = next;
        prev = Some(next);
    }
    result
}
