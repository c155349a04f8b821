use std::fmt;

/// Displays bytes as space-separated lowercase hex pairs, e.g. `aa 00 01`.
#[derive(Debug, Clone, Copy)]
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_pairs() {
        assert_eq!(HexBytes(&[0xAA, 0x00, 0x0F]).to_string(), "aa 00 0f");
        assert_eq!(HexBytes(&[]).to_string(), "");
    }
}
