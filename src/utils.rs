//! Formatting and parsing helpers shared by the CLI and dump renderers

use crate::types::{Address, Size};

/// Format an address as `0x`-prefixed, zero-padded hex.
#[must_use]
pub fn format_address(addr: Address) -> String {
    format!("{addr:#010x}")
}

/// Human-readable size with binary units and two decimals, e.g. `1.50 KB`.
#[must_use]
pub fn format_size(size: Size) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = f64::from(size);
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Parse a size with an optional case-insensitive `b`/`kb`/`mb` suffix.
///
/// Returns `None` for malformed numbers, zero-multiplier overflow, or an
/// empty digit part.
#[must_use]
pub fn parse_size(token: &str) -> Option<Size> {
    let lower = token.to_ascii_lowercase();
    let (digits, multiplier) = if let Some(rest) = lower.strip_suffix("kb") {
        (rest, 1024u64)
    } else if let Some(rest) = lower.strip_suffix("mb") {
        (rest, 1024 * 1024)
    } else if let Some(rest) = lower.strip_suffix('b') {
        (rest, 1)
    } else {
        (lower.as_str(), 1)
    };

    let value: u64 = digits.parse().ok()?;
    let bytes = value.checked_mul(multiplier)?;
    Size::try_from(bytes).ok()
}

/// Parse a decimal or `0x`-prefixed hexadecimal address.
#[must_use]
pub fn parse_address(token: &str) -> Option<Address> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        Address::from_str_radix(hex, 16).ok()
    } else {
        token.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_render_as_padded_hex() {
        assert_eq!(format_address(0), "0x00000000");
        assert_eq!(format_address(0xdead), "0x0000dead");
    }

    #[test]
    fn sizes_scale_through_units() {
        assert_eq!(format_size(512), "512.00 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(2 * 1024 * 1024), "2.00 MB");
    }

    #[test]
    fn size_suffixes_are_case_insensitive() {
        assert_eq!(parse_size("4096"), Some(4096));
        assert_eq!(parse_size("4kb"), Some(4096));
        assert_eq!(parse_size("4KB"), Some(4096));
        assert_eq!(parse_size("1Mb"), Some(1024 * 1024));
        assert_eq!(parse_size("64b"), Some(64));
        assert_eq!(parse_size("garbage"), None);
        assert_eq!(parse_size(""), None);
    }

    #[test]
    fn addresses_parse_decimal_and_hex() {
        assert_eq!(parse_address("4096"), Some(4096));
        assert_eq!(parse_address("0x1000"), Some(4096));
        assert_eq!(parse_address("0X10"), Some(16));
        assert_eq!(parse_address("zzz"), None);
    }
}
