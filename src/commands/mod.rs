//! CLI command implementations
//!
//! Each command takes an opened [`cp2130_core::Cp2130`] (or, for `list`,
//! only the device filter) and prints its result to stdout.

pub mod clock;
pub mod gpio;
pub mod info;
pub mod list;
pub mod spi;

/// Format bytes as space-separated hex
pub fn hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex() {
        assert_eq!(hex(&[]), "");
        assert_eq!(hex(&[0x9f, 0x00, 0xEF]), "9f 00 ef");
    }
}
