//! Kubernetes resource quantity parsing.
//!
//! Quantities are compared exactly in nano-units, so `1Gi` < `1100Mi` < `2G`.

use std::cmp::Ordering;
use std::sync::LazyLock;

/// Parse a quantity into an exact count of nano-units.
///
/// Precision below one nano-unit rounds away from zero. Returns `None` for
/// malformed input or values that overflow `i128`.
pub fn parse_nanos(quantity: &str) -> Option<i128> {
    static QUANTITY_RE: LazyLock<Option<regex::Regex>> = LazyLock::new(|| {
        regex::Regex::new(
            r"^([+-]?)([0-9]+(?:\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+|Ki|Mi|Gi|Ti|Pi|Ei|n|u|m|k|M|G|T|P|E)?$",
        )
        .ok()
    });

    let captures = QUANTITY_RE.as_ref()?.captures(quantity.trim())?;
    let negative = captures.get(1).is_some_and(|m| m.as_str() == "-");
    let number = captures.get(2)?.as_str();
    let suffix = captures.get(3).map(|m| m.as_str()).unwrap_or("");

    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    let mut mantissa: i128 = 0;
    for digit in whole.bytes().chain(fraction.bytes()) {
        mantissa = mantissa
            .checked_mul(10)?
            .checked_add(i128::from(digit - b'0'))?;
    }

    // value = mantissa * 10^(decimal - fraction digits) * 1024^binary, in nanos
    let (decimal, binary): (i32, u32) = match suffix {
        "" => (0, 0),
        "n" => (-9, 0),
        "u" => (-6, 0),
        "m" => (-3, 0),
        "k" => (3, 0),
        "M" => (6, 0),
        "G" => (9, 0),
        "T" => (12, 0),
        "P" => (15, 0),
        "E" => (18, 0),
        "Ki" => (0, 1),
        "Mi" => (0, 2),
        "Gi" => (0, 3),
        "Ti" => (0, 4),
        "Pi" => (0, 5),
        "Ei" => (0, 6),
        exponent => (exponent.get(1..)?.parse().ok()?, 0),
    };
    let fraction_digits = i32::try_from(fraction.len()).ok()?;
    let shift = decimal.checked_add(9)?.checked_sub(fraction_digits)?;

    let mut nanos = mantissa.checked_mul(1024i128.checked_pow(binary)?)?;
    if shift >= 0 {
        nanos = nanos.checked_mul(10i128.checked_pow(shift.unsigned_abs())?)?;
    } else {
        let divisor = 10i128.checked_pow(shift.unsigned_abs()).unwrap_or(i128::MAX);
        let rounded_up = nanos % divisor != 0;
        nanos = nanos / divisor + i128::from(rounded_up);
    }

    Some(if negative { -nanos } else { nanos })
}

/// Parse a quantity (`10Gi`, `500m`, `1.5`, `2e3`) into its value in base units.
///
/// Returns `None` for malformed input.
pub fn parse_quantity(quantity: &str) -> Option<f64> {
    parse_nanos(quantity).map(|nanos| nanos as f64 / 1e9)
}

/// Compare two quantities exactly. `None` if either does not parse.
pub fn compare_quantities(a: &str, b: &str) -> Option<Ordering> {
    Some(parse_nanos(a)?.cmp(&parse_nanos(b)?))
}
