//! Missing and Non-Finite Value Handling

/// Replacement for `+inf` cells
pub const POSITIVE_SENTINEL: f64 = 1e6;
/// Replacement for `-inf` cells
pub const NEGATIVE_SENTINEL: f64 = -1e6;

/// How a column's missing cells are filled
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Imputation {
    /// Spectral channel: missing means "no signal"
    Zero,
    /// Column median over finite present cells
    Median(f64),
}

impl Imputation {
    /// Fill value for a missing cell
    pub fn value(&self) -> f64 {
        match self {
            Imputation::Zero => 0.0,
            Imputation::Median(m) => *m,
        }
    }
}

/// A cell is missing when absent or NaN
pub fn is_missing(cell: Option<f64>) -> bool {
    cell.map_or(true, f64::is_nan)
}

/// Map infinities to the bounded sentinels, leave everything else untouched
pub fn bound_infinite(value: f64) -> f64 {
    if value == f64::INFINITY {
        POSITIVE_SENTINEL
    } else if value == f64::NEG_INFINITY {
        NEGATIVE_SENTINEL
    } else {
        value
    }
}

/// Median of the finite values, or `None` when there are none.
///
/// Even counts average the two middle values.
pub fn median<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut finite: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(f64::total_cmp);
    let mid = finite.len() / 2;
    if finite.len() % 2 == 0 {
        Some(finite[mid - 1] / 2.0 + finite[mid] / 2.0)
    } else {
        Some(finite[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(vec![3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(vec![4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn test_median_ignores_non_finite() {
        assert_eq!(median(vec![f64::NAN, 5.0, f64::INFINITY]), Some(5.0));
        assert_eq!(median(vec![f64::NAN]), None);
        assert_eq!(median(Vec::<f64>::new()), None);
    }

    #[test]
    fn test_bound_infinite() {
        assert_eq!(bound_infinite(f64::INFINITY), 1e6);
        assert_eq!(bound_infinite(f64::NEG_INFINITY), -1e6);
        assert_eq!(bound_infinite(12.5), 12.5);
        assert!(bound_infinite(f64::NAN).is_nan());
    }

    #[test]
    fn test_missing_detection() {
        assert!(is_missing(None));
        assert!(is_missing(Some(f64::NAN)));
        assert!(!is_missing(Some(0.0)));
        assert!(!is_missing(Some(f64::INFINITY)));
    }
}
