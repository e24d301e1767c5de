use crate::codecs::{CodecRegistry, FieldCodec};
use crate::error::{GribError, Result};
use crate::sections::sect5::{Data, Data0, Data40, Data41, DataRepresentationDefinition};
use crate::sections::sect6::BitMap;
use crate::utils::is_missing;

pub(crate) mod complex;
pub(crate) mod complex_spacial_diff;
pub(crate) mod groups;
pub(crate) mod simple;

use complex::{GridPointDataComplexPackingDecoder, GridPointDataComplexPackingEncoder};
use complex_spacial_diff::{
    GridPointDataComplexPackingSpacialDiffDecoder, GridPointDataComplexPackingSpacialDiffEncoder,
};
use simple::{GridPointDataSimplePackingDecoder, GridPointDataSimplePackingEncoder, ScaleParams};

pub(crate) trait Grib2DataDecoder {
    fn decode(
        &self,
        data_repr_def: &DataRepresentationDefinition,
        slice: &[u8],
        missing: f64,
    ) -> Result<Box<[f64]>>;
}

/// How a field should be packed into Section 7.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackingSpec {
    /// Simple packing (template 5.0)
    Simple {
        decimal_scale_factor: i16,
        num_bits: usize,
    },
    /// Complex packing with group splitting (template 5.2)
    Complex { decimal_scale_factor: i16 },
    /// Complex packing with spatial differencing of the given order
    /// (template 5.3)
    ComplexSpacialDiff {
        decimal_scale_factor: i16,
        order: u8,
    },
    /// JPEG 2000 code stream (template 5.40), requires an injected codec
    Jpeg2000 {
        decimal_scale_factor: i16,
        num_bits: usize,
    },
    /// PNG (template 5.41), requires an injected codec
    Png {
        decimal_scale_factor: i16,
        num_bits: usize,
    },
}

/// Unpack a data section into the full grid-length value array, expanding
/// through the bit map when one is attached.
pub(crate) fn unpack(
    drs: &DataRepresentationDefinition,
    bitmap: &BitMap,
    slice: &[u8],
    grid_points: usize,
    codecs: &CodecRegistry,
    missing: f64,
) -> Result<Box<[f64]>> {
    let decoded = match &drs.data {
        Data::Data0(_) => GridPointDataSimplePackingDecoder {}.decode(drs, slice, missing)?,
        Data::Data2(_) => GridPointDataComplexPackingDecoder {}.decode(drs, slice, missing)?,
        Data::Data3(_) => {
            GridPointDataComplexPackingSpacialDiffDecoder {}.decode(drs, slice, missing)?
        }
        Data::Data40(d) => decode_external(
            codecs.jpeg2000()?,
            d.reference_value,
            d.binary_scale_factor,
            d.decimal_scale_factor,
            d.num_bits,
            slice,
            drs.num_points,
        )?,
        Data::Data41(d) => decode_external(
            codecs.png()?,
            d.reference_value,
            d.binary_scale_factor,
            d.decimal_scale_factor,
            d.num_bits,
            slice,
            drs.num_points,
        )?,
    };

    match bitmap.bitmap_indicator {
        255 => Ok(decoded),
        0 | 254 => bitmap.expand(&decoded, grid_points, missing),
        n => Err(GribError::DecodeError(format!(
            "unsupported bit-map indicator {}",
            n
        ))),
    }
}

fn decode_external(
    codec: &dyn FieldCodec,
    reference_value: f32,
    binary_scale_factor: i16,
    decimal_scale_factor: i16,
    num_bits: usize,
    slice: &[u8],
    num_points: usize,
) -> Result<Box<[f64]>> {
    let params = ScaleParams::new(reference_value, binary_scale_factor, decimal_scale_factor);
    if num_bits == 0 {
        return Ok(vec![params.apply(0.0); num_points].into_boxed_slice());
    }

    let ints = codec.decompress(slice, num_bits, num_points)?;
    if ints.len() != num_points {
        return Err(GribError::DecodeError(format!(
            "codec returned {} values for {} points",
            ints.len(),
            num_points
        )));
    }
    Ok(ints
        .iter()
        .map(|int| params.apply(f64::from(*int)))
        .collect())
}

/// Pack a field for Section 7. Points equal to the missing sentinel are
/// split off into a bit map; the packed stream holds present points only.
pub fn pack_values(
    spec: &PackingSpec,
    values: &[f64],
    missing: f64,
    codecs: &CodecRegistry,
) -> Result<(DataRepresentationDefinition, BitMap, Box<[u8]>)> {
    let has_missing = values.iter().any(|v| is_missing(*v, missing));
    let (bitmap, present) = if has_missing {
        BitMap::from_values(values, missing)
    } else {
        (BitMap::none(), values.to_vec())
    };

    if present.is_empty() {
        return Err(GribError::EncodeError(String::from(
            "no present data points to pack",
        )));
    }

    let (data, payload) = match spec {
        PackingSpec::Simple {
            decimal_scale_factor,
            num_bits,
        } => {
            let (data, payload) = GridPointDataSimplePackingEncoder {}.encode(
                &present,
                *decimal_scale_factor,
                *num_bits,
            )?;
            (Data::Data0(data), payload)
        }
        PackingSpec::Complex {
            decimal_scale_factor,
        } => {
            let (data, payload) =
                GridPointDataComplexPackingEncoder {}.encode(&present, *decimal_scale_factor)?;
            (Data::Data2(data), payload)
        }
        PackingSpec::ComplexSpacialDiff {
            decimal_scale_factor,
            order,
        } => {
            let (data, payload) = GridPointDataComplexPackingSpacialDiffEncoder {}.encode(
                &present,
                *decimal_scale_factor,
                *order,
            )?;
            (Data::Data3(data), payload)
        }
        PackingSpec::Jpeg2000 {
            decimal_scale_factor,
            num_bits,
        } => {
            let (data, payload) = encode_external(
                codecs.jpeg2000()?,
                &present,
                *decimal_scale_factor,
                *num_bits,
            )?;
            (
                Data::Data40(Data40 {
                    reference_value: data.reference_value,
                    binary_scale_factor: data.binary_scale_factor,
                    decimal_scale_factor: data.decimal_scale_factor,
                    num_bits: data.num_bits,
                    values_type: 0,
                    compression_type: 0,
                    compression_ratio: 255,
                }),
                payload,
            )
        }
        PackingSpec::Png {
            decimal_scale_factor,
            num_bits,
        } => {
            let (data, payload) =
                encode_external(codecs.png()?, &present, *decimal_scale_factor, *num_bits)?;
            (
                Data::Data41(Data41 {
                    reference_value: data.reference_value,
                    binary_scale_factor: data.binary_scale_factor,
                    decimal_scale_factor: data.decimal_scale_factor,
                    num_bits: data.num_bits,
                    values_type: 0,
                }),
                payload,
            )
        }
    };

    let template_number = data.template_number();
    Ok((
        DataRepresentationDefinition {
            num_points: present.len(),
            template_number,
            data,
        },
        bitmap,
        payload,
    ))
}

fn encode_external(
    codec: &dyn FieldCodec,
    values: &[f64],
    decimal_scale_factor: i16,
    num_bits: usize,
) -> Result<(Data0, Box<[u8]>)> {
    let q = quantize(values, decimal_scale_factor, num_bits)?;
    let data = Data0 {
        reference_value: q.reference_value,
        binary_scale_factor: q.binary_scale_factor,
        decimal_scale_factor,
        num_bits: q.num_bits,
        values_type: 0,
    };
    if q.num_bits == 0 {
        return Ok((data, Box::new([])));
    }

    let ints: Vec<u32> = q.ints.iter().map(|int| *int as u32).collect();
    let payload = codec.compress(&ints, q.num_bits, ints.len(), 1)?;
    Ok((data, payload.into_boxed_slice()))
}

pub(crate) struct Quantized {
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub num_bits: usize,
    pub ints: Vec<u64>,
}

/// Choose a reference value and binary scale so the scaled field fits
/// `num_bits`-wide integers. The reference is the field minimum; the binary
/// scale is the smallest power of two for which the range fits, sharpened
/// downwards while it keeps fitting.
pub(crate) fn quantize(
    values: &[f64],
    decimal_scale_factor: i16,
    num_bits: usize,
) -> Result<Quantized> {
    if num_bits > 31 {
        return Err(GribError::EncodeError(format!(
            "{} bits per value, maximum is 31",
            num_bits
        )));
    }
    let scaled = decimal_scaled(values, decimal_scale_factor)?;

    let rmin = scaled.iter().cloned().fold(f64::INFINITY, f64::min);
    let rmax = scaled.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    if num_bits == 0 || rmax == rmin {
        return Ok(Quantized {
            reference_value: rmin as f32,
            binary_scale_factor: 0,
            num_bits: 0,
            ints: Vec::new(),
        });
    }

    let max_int = ((1u64 << num_bits) - 1) as f64;
    let range = rmax - rmin;
    let mut e: i32 = 0;
    while range / 2f64.powi(e) > max_int {
        e += 1;
    }
    while e > -126 && range / 2f64.powi(e - 1) <= max_int {
        e -= 1;
    }

    let reference_value = rmin as f32;
    let binary_scale = 2f64.powi(e);
    let ints = scaled
        .iter()
        .map(|v| {
            let x = ((v - f64::from(reference_value)) / binary_scale).round();
            ((x.max(0.0)) as u64).min((1u64 << num_bits) - 1)
        })
        .collect();

    Ok(Quantized {
        reference_value,
        binary_scale_factor: e as i16,
        num_bits,
        ints,
    })
}

/// Scale to integers at full precision (binary scale 0) for the complex
/// packing paths, where per-group widths adapt to the data.
pub(crate) fn quantize_exact(
    values: &[f64],
    decimal_scale_factor: i16,
) -> Result<(f32, Vec<i64>)> {
    let scaled = decimal_scaled(values, decimal_scale_factor)?;
    let rmin = scaled.iter().cloned().fold(f64::INFINITY, f64::min);
    let rmax = scaled.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if rmax - rmin >= (1u64 << 28) as f64 {
        return Err(GribError::EncodeError(format!(
            "field range {} too wide for complex packing at this decimal scale",
            rmax - rmin
        )));
    }

    let mut reference_value = rmin as f32;
    let mut ints: Vec<i64> = scaled
        .iter()
        .map(|v| (v - f64::from(reference_value)).round() as i64)
        .collect();

    // f32 rounding of the reference can push the smallest value below zero;
    // shift the integers up and lower the reference to compensate
    let min_int = ints.iter().copied().min().unwrap_or(0);
    if min_int < 0 {
        reference_value = (f64::from(reference_value) + min_int as f64) as f32;
        for int in &mut ints {
            *int -= min_int;
        }
    }

    Ok((reference_value, ints))
}

fn decimal_scaled(values: &[f64], decimal_scale_factor: i16) -> Result<Vec<f64>> {
    if values.is_empty() {
        return Err(GribError::EncodeError(String::from("empty field")));
    }
    let dscale = 10f64.powi(decimal_scale_factor as i32);
    let scaled: Vec<f64> = values.iter().map(|v| v * dscale).collect();
    if scaled.iter().any(|v| !v.is_finite()) {
        return Err(GribError::EncodeError(String::from(
            "non-finite value in field; mask missing points with the sentinel",
        )));
    }
    Ok(scaled)
}
