//! Fixed-point parsing for configuration values.
//!
//! Every ratio and limit handed to the protocol is a WAD: an 18-decimal
//! fixed-point `U256`, so `0.8` is `800000000000000000`. Values are parsed
//! from decimal strings exactly; floats never enter the path to a
//! constructor argument.

use alloy::primitives::utils::parse_units;
use alloy::primitives::U256;

/// Decimals of the WAD scale.
pub const WAD_DECIMALS: u8 = 18;

/// WAD constant: 1e18
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000u64, 0, 0, 0]);

/// Parse a non-negative decimal string into a fixed-point value with
/// `decimals` fractional digits. `parse_amount("1.5", 6)` is `1_500_000`.
/// More fractional digits than `decimals` is an error, never a truncation.
pub fn parse_amount(value: &str, decimals: u8) -> Result<U256, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("empty value".to_string());
    }
    if value.starts_with('-') {
        return Err(format!("{} is negative", value));
    }
    if let Some((_, fraction)) = value.split_once('.') {
        if fraction.len() > decimals as usize {
            return Err(format!(
                "{} has more than {} fractional digits",
                value, decimals
            ));
        }
    }
    parse_units(value, decimals)
        .map(|parsed| parsed.get_absolute())
        .map_err(|e| format!("{} is not a decimal number: {}", value, e))
}

/// Parse a decimal string on the WAD scale.
pub fn parse_wad(value: &str) -> Result<U256, String> {
    parse_amount(value, WAD_DECIMALS)
}

/// Parse an unscaled integer literal such as an oracle's initial price.
pub fn parse_integer(value: &str) -> Result<U256, String> {
    let value = value.trim().replace('_', "");
    value
        .parse::<U256>()
        .map_err(|e| format!("{} is not an unsigned integer: {}", value, e))
}

/// Convert WAD to f64. For logs only.
pub fn wad_to_f64(wad: U256) -> f64 {
    if wad <= U256::from(u128::MAX) {
        let value: u128 = wad.to();
        value as f64 / 1e18
    } else {
        let limbs = wad.as_limbs();
        let high = limbs[1] as f64 * (u64::MAX as f64 + 1.0);
        let low = limbs[0] as f64;
        (high + low) / 1e18
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wad_ratios() {
        assert_eq!(
            parse_wad("0.8").unwrap(),
            U256::from(800_000_000_000_000_000u64)
        );
        assert_eq!(
            parse_wad("0.93").unwrap(),
            U256::from(930_000_000_000_000_000u64)
        );
        assert_eq!(parse_wad("1").unwrap(), WAD);
        assert_eq!(parse_wad("0").unwrap(), U256::ZERO);
    }

    #[test]
    fn test_parse_wad_large_amounts() {
        // 1e9 tokens on the WAD scale
        let expected = U256::from(1_000_000_000u64) * WAD;
        assert_eq!(parse_wad("1000000000").unwrap(), expected);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_wad("-0.1").is_err());
        assert!(parse_wad("").is_err());
        assert!(parse_wad("abc").is_err());
        // More fractional digits than the scale holds
        assert!(parse_amount("0.1234567", 6).is_err());
    }

    #[test]
    fn test_parse_amount_respects_decimals() {
        assert_eq!(parse_amount("1.5", 6).unwrap(), U256::from(1_500_000u64));
        assert_eq!(parse_amount("0.123456", 6).unwrap(), U256::from(123_456u64));
        assert_eq!(parse_amount("7", 0).unwrap(), U256::from(7u64));
    }

    #[test]
    fn test_parse_never_truncates() {
        assert!(parse_amount("0.1234567", 6).is_err());
        assert!(parse_amount("1.5", 0).is_err());
        assert!(parse_wad("0.8000000000000000001").is_err());
        assert_eq!(
            parse_wad("0.800000000000000001").unwrap(),
            U256::from(800_000_000_000_000_001u64)
        );
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("100000000").unwrap(), U256::from(100_000_000u64));
        assert_eq!(
            parse_integer("1_000_000_000_000_000_000").unwrap(),
            WAD
        );
        assert!(parse_integer("0.5").is_err());
    }

    #[test]
    fn test_wad_to_f64() {
        assert_eq!(wad_to_f64(WAD), 1.0);
        assert!((wad_to_f64(parse_wad("0.02").unwrap()) - 0.02).abs() < 1e-12);
    }
}
