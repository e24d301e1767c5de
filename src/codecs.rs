//! External field compressors, injected at the Section 7 boundary.
//!
//! The JPEG 2000 and PNG packing templates hand the quantized integer plane
//! to an image codec instead of bit-packing it. The quantization itself
//! (reference value, scale factors, bit depth) is always chosen by this
//! crate; a codec only transforms the integer plane to and from an opaque
//! byte payload. Decoding a message that needs an unregistered codec fails
//! with `CodecUnavailable` - a configuration error, not a parse error.

use crate::error::{GribError, Result};

pub trait FieldCodec: Send + Sync {
    /// Compress a plane of quantized integers, each fitting `num_bits`.
    fn compress(
        &self,
        values: &[u32],
        num_bits: usize,
        width: usize,
        height: usize,
    ) -> Result<Vec<u8>>;

    /// Recover exactly `num_points` integers from an opaque payload.
    fn decompress(&self, data: &[u8], num_bits: usize, num_points: usize) -> Result<Vec<u32>>;
}

pub struct CodecRegistry {
    jpeg2000: Option<Box<dyn FieldCodec>>,
    png: Option<Box<dyn FieldCodec>>,
}

impl CodecRegistry {
    /// No codecs registered; JPEG 2000 and PNG packed messages fail with
    /// `CodecUnavailable`.
    pub fn empty() -> Self {
        Self {
            jpeg2000: None,
            png: None,
        }
    }

    /// The codecs this build carries: PNG when the `png-codec` feature is
    /// enabled, JPEG 2000 only ever by explicit registration.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::empty();
        #[cfg(feature = "png-codec")]
        {
            registry.png = Some(Box::new(PngFieldCodec::default()));
        }
        registry
    }

    pub fn register_jpeg2000(&mut self, codec: Box<dyn FieldCodec>) {
        self.jpeg2000 = Some(codec);
    }

    pub fn register_png(&mut self, codec: Box<dyn FieldCodec>) {
        self.png = Some(codec);
    }

    pub(crate) fn jpeg2000(&self) -> Result<&dyn FieldCodec> {
        self.jpeg2000
            .as_deref()
            .ok_or(GribError::CodecUnavailable("jpeg2000"))
    }

    pub(crate) fn png(&self) -> Result<&dyn FieldCodec> {
        self.png.as_deref().ok_or(GribError::CodecUnavailable("png"))
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// PNG transform over the `png` crate, with the depth ladder the packing
/// convention expects: up to 8 bits as 8-bit greyscale, up to 16 as 16-bit
/// greyscale, then RGB and RGBA planes for 24 and 32 bit samples.
#[cfg(feature = "png-codec")]
#[derive(Default)]
pub struct PngFieldCodec {}

#[cfg(feature = "png-codec")]
impl FieldCodec for PngFieldCodec {
    fn compress(
        &self,
        values: &[u32],
        num_bits: usize,
        width: usize,
        height: usize,
    ) -> Result<Vec<u8>> {
        if width * height != values.len() {
            return Err(GribError::EncodeError(format!(
                "{}x{} plane holds {} values, field has {}",
                width,
                height,
                width * height,
                values.len()
            )));
        }
        let (color_type, bit_depth, bytes_per_point) = match num_bits {
            1..=8 => (png::ColorType::Grayscale, png::BitDepth::Eight, 1),
            9..=16 => (png::ColorType::Grayscale, png::BitDepth::Sixteen, 2),
            17..=24 => (png::ColorType::Rgb, png::BitDepth::Eight, 3),
            25..=32 => (png::ColorType::Rgba, png::BitDepth::Eight, 4),
            n => {
                return Err(GribError::EncodeError(format!(
                    "{} bits per value not representable as a PNG plane",
                    n
                )))
            }
        };

        let mut plane = Vec::with_capacity(values.len() * bytes_per_point);
        for value in values {
            plane.extend_from_slice(&value.to_be_bytes()[4 - bytes_per_point..]);
        }

        let mut out = Vec::new();
        let mut encoder = png::Encoder::new(&mut out, width as u32, height as u32);
        encoder.set_color(color_type);
        encoder.set_depth(bit_depth);
        let mut writer = encoder
            .write_header()
            .map_err(|e| GribError::EncodeError(format!("png: {}", e)))?;
        writer
            .write_image_data(&plane)
            .map_err(|e| GribError::EncodeError(format!("png: {}", e)))?;
        writer
            .finish()
            .map_err(|e| GribError::EncodeError(format!("png: {}", e)))?;
        Ok(out)
    }

    fn decompress(&self, data: &[u8], _num_bits: usize, num_points: usize) -> Result<Vec<u32>> {
        let decoder = png::Decoder::new(data);
        let mut reader = decoder
            .read_info()
            .map_err(|e| GribError::DecodeError(format!("png: {}", e)))?;
        let mut plane = vec![0u8; reader.output_buffer_size()];
        let info = reader
            .next_frame(&mut plane)
            .map_err(|e| GribError::DecodeError(format!("png: {}", e)))?;

        let bytes_per_point = match (info.color_type, info.bit_depth) {
            (png::ColorType::Grayscale, png::BitDepth::Eight) => 1,
            (png::ColorType::Grayscale, png::BitDepth::Sixteen) => 2,
            (png::ColorType::Rgb, png::BitDepth::Eight) => 3,
            (png::ColorType::Rgba, png::BitDepth::Eight) => 4,
            (color, depth) => {
                return Err(GribError::DecodeError(format!(
                    "unexpected PNG plane {:?}/{:?}",
                    color, depth
                )))
            }
        };
        plane.truncate(info.buffer_size());

        let values: Vec<u32> = plane
            .chunks_exact(bytes_per_point)
            .map(|chunk| chunk.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b)))
            .collect();
        if values.len() != num_points {
            return Err(GribError::DecodeError(format!(
                "PNG plane holds {} values, field has {}",
                values.len(),
                num_points
            )));
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_codecs_are_reported() {
        let registry = CodecRegistry::empty();
        assert!(matches!(
            registry.jpeg2000(),
            Err(GribError::CodecUnavailable("jpeg2000"))
        ));
        assert!(matches!(
            registry.png(),
            Err(GribError::CodecUnavailable("png"))
        ));
    }

    #[cfg(feature = "png-codec")]
    #[test]
    fn png_plane_round_trips() {
        let codec = PngFieldCodec::default();
        for num_bits in [7usize, 12, 20, 30] {
            let values: Vec<u32> = (0u32..24)
                .map(|i| i.wrapping_mul(2654435761) & ((1u32 << num_bits) - 1))
                .collect();
            let payload = codec.compress(&values, num_bits, 6, 4).unwrap();
            let back = codec.decompress(&payload, num_bits, values.len()).unwrap();
            assert_eq!(back, values);
        }
    }
}
