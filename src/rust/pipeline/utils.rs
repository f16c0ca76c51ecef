use ndarray::ArrayView1;

/// Index of the largest value, the earliest index winning ties.
pub(crate) fn first_argmax(values: ArrayView1<f64>) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Parses a number written with locale-specific separators.
///
/// Thousands separators are removed first, then the decimal separator is
/// normalized to `.`. Only finite numbers are accepted; spelled-out forms
/// such as `NaN` or `inf` are rejected.
pub(crate) fn parse_decimal(
    raw: &str,
    decimal_separator: char,
    thousands_separator: Option<char>,
) -> Option<f64> {
    let mut normalized: String = match thousands_separator {
        Some(sep) => raw.chars().filter(|c| *c != sep).collect(),
        None => raw.to_string(),
    };
    if decimal_separator != '.' {
        normalized = normalized.replace(decimal_separator, ".");
    }
    normalized.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_first_argmax() {
        assert_eq!(first_argmax(array![0.2, 0.8].view()), 1);
        assert_eq!(first_argmax(array![0.5, 0.5].view()), 0);
        assert_eq!(first_argmax(array![0.1, 0.7, 0.7].view()), 1);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("0.75", '.', None), Some(0.75));
        assert_eq!(parse_decimal("0,75", ',', None), Some(0.75));
        assert_eq!(parse_decimal("1.234,5", ',', Some('.')), Some(1234.5));
        assert_eq!(parse_decimal(" -2 ", '.', None), Some(-2.0));
        assert_eq!(parse_decimal("n/a", '.', None), None);
        assert_eq!(parse_decimal("NaN", '.', None), None);
        assert_eq!(parse_decimal("inf", '.', None), None);
        assert_eq!(parse_decimal("1e400", '.', None), None);
    }
}
