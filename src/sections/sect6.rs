use crate::error::{GribError, Result};
use crate::utils::is_missing;

/// Bit-map section: one bit per grid point, MSB first, 1 = value present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMap {
    /// Bit-map indicator (see Code Table 6.0): 0 = bit-map attached,
    /// 254 = previously defined bit-map applies, 255 = none
    pub bitmap_indicator: u8,
    pub bitmap: Box<[u8]>,
}

impl BitMap {
    pub fn none() -> Self {
        BitMap {
            bitmap_indicator: 255,
            bitmap: Box::new([]),
        }
    }

    pub(crate) fn from_slice(body: &[u8]) -> Result<Self> {
        if body.is_empty() {
            return Err(GribError::TruncatedMessage());
        }
        Ok(BitMap {
            bitmap_indicator: body[0],
            bitmap: body[1..].to_vec().into_boxed_slice(),
        })
    }

    pub(crate) fn write_body(&self, out: &mut Vec<u8>) -> Result<()> {
        out.push(self.bitmap_indicator);
        out.extend_from_slice(&self.bitmap);
        Ok(())
    }

    pub fn is_present(&self, index: usize) -> bool {
        (self.bitmap[index / 8] >> (7 - index % 8)) & 1 == 1
    }

    /// Build a bit map from a field, splitting off the present values.
    pub(crate) fn from_values(values: &[f64], missing: f64) -> (Self, Vec<f64>) {
        let mut bitmap = vec![0u8; (values.len() + 7) / 8];
        let mut present = Vec::with_capacity(values.len());
        for (index, value) in values.iter().enumerate() {
            if !is_missing(*value, missing) {
                bitmap[index / 8] |= 0x80 >> (index % 8);
                present.push(*value);
            }
        }
        (
            BitMap {
                bitmap_indicator: 0,
                bitmap: bitmap.into_boxed_slice(),
            },
            present,
        )
    }

    /// Expand a packed run of present values to the full grid length,
    /// filling absent points with the missing sentinel.
    pub(crate) fn expand(
        &self,
        packed: &[f64],
        num_points: usize,
        missing: f64,
    ) -> Result<Box<[f64]>> {
        if self.bitmap.len() * 8 < num_points {
            return Err(GribError::TruncatedMessage());
        }

        let mut expanded = Vec::with_capacity(num_points);
        let mut taken = 0;
        for index in 0..num_points {
            if self.is_present(index) {
                let value = packed.get(taken).ok_or_else(|| {
                    GribError::DecodeError(format!(
                        "bit map marks more than {} present points",
                        packed.len()
                    ))
                })?;
                expanded.push(*value);
                taken += 1;
            } else {
                expanded.push(missing);
            }
        }

        if taken != packed.len() {
            return Err(GribError::DecodeError(format!(
                "bit map marks {} present points, data section holds {}",
                taken,
                packed.len()
            )));
        }

        Ok(expanded.into_boxed_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_expands() {
        let values = [1.0, f64::NAN, 3.0, f64::NAN, 5.0];
        let (bitmap, present) = BitMap::from_values(&values, f64::NAN);

        assert_eq!(bitmap.bitmap_indicator, 0);
        assert_eq!(present, vec![1.0, 3.0, 5.0]);
        assert_eq!(bitmap.bitmap.as_ref(), &[0b10101_000]);

        let expanded = bitmap.expand(&present, values.len(), f64::NAN).unwrap();
        assert_eq!(expanded.len(), values.len());
        assert_eq!(expanded[0], 1.0);
        assert!(expanded[1].is_nan());
        assert_eq!(expanded[2], 3.0);
        assert!(expanded[3].is_nan());
        assert_eq!(expanded[4], 5.0);
    }

    #[test]
    fn expansion_preserves_order_and_length() {
        let bitmap = BitMap {
            bitmap_indicator: 0,
            bitmap: Box::new([0b01100100]),
        };
        let expanded = bitmap.expand(&[7.0, 8.0, 9.0], 8, -999.0).unwrap();
        assert_eq!(
            expanded.as_ref(),
            &[-999.0, 7.0, 8.0, -999.0, -999.0, 9.0, -999.0, -999.0]
        );
    }

    #[test]
    fn count_mismatch_is_reported() {
        let bitmap = BitMap {
            bitmap_indicator: 0,
            bitmap: Box::new([0b11110000]),
        };
        assert!(bitmap.expand(&[1.0, 2.0], 8, f64::NAN).is_err());
        assert!(bitmap.expand(&[1.0, 2.0, 3.0, 4.0, 5.0], 8, f64::NAN).is_err());
    }
}
