//! Number formatting
//!
//! Results are rounded to 13 significant digits, which hides binary
//! floating-point noise such as `0.1 + 0.2`, then printed the way JSON
//! producers in the expression language's ecosystem print numbers: integral
//! values without a fraction, exponent notation below `1e-6` and from `1e21`.

/// Significant digits kept in displayed numbers
pub const SIGNIFICANT_DIGITS: usize = 13;

/// Round `value` to `SIGNIFICANT_DIGITS` significant digits
pub fn round_significant(value: f64) -> f64 {
    if !value.is_finite() || value == 0.0 {
        return value;
    }
    format!("{:.*e}", SIGNIFICANT_DIGITS - 1, value)
        .parse()
        .unwrap_or(value)
}

/// Display text for a number; non-finite numbers have no JSON form and
/// render as `null`
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "null".to_string();
    }
    let rounded = round_significant(value);
    if rounded == 0.0 {
        return "0".to_string();
    }

    // Shortest round-trip digits and decimal exponent
    let scientific = format!("{:e}", rounded.abs());
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some(parts) => parts,
        None => return rounded.to_string(),
    };
    let exponent: i32 = match exponent.parse() {
        Ok(e) => e,
        Err(_) => return rounded.to_string(),
    };
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();

    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{}{}", sign, place_digits(&digits, exponent))
}

/// Lay out `digits` (d.ddd × 10^exponent) in fixed or exponent notation
fn place_digits(digits: &str, exponent: i32) -> String {
    let k = digits.len() as i32;
    // position of the decimal point relative to the first digit
    let n = exponent + 1;

    if k <= n && n <= 21 {
        format!("{}{}", digits, "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        format!("{}.{}", int, frac)
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let (first, rest) = digits.split_at(1);
        let exp_sign = if n - 1 < 0 { "-" } else { "+" };
        if rest.is_empty() {
            format!("{}e{}{}", first, exp_sign, (n - 1).abs())
        } else {
            format!("{}.{}e{}{}", first, rest, exp_sign, (n - 1).abs())
        }
    }
}
