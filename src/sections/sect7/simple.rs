use num::ToPrimitive;

use crate::error::{GribError, Result};
use crate::sections::sect5::{Data, Data0, DataRepresentationDefinition};
use crate::sections::sect7::{quantize, Grib2DataDecoder};
use crate::utils::{octet_length, BitWriter, BitwiseIterator};

/// The affine transform shared by every packing method:
/// `value = (R + X * 2^E) / 10^D`.
pub(crate) struct ScaleParams {
    reference: f64,
    binary_scale: f64,
    decimal_scale: f64,
}

impl ScaleParams {
    pub(crate) fn new(
        reference_value: f32,
        binary_scale_factor: i16,
        decimal_scale_factor: i16,
    ) -> Self {
        Self {
            reference: reference_value as f64,
            binary_scale: 2_f64.powi(binary_scale_factor as i32),
            decimal_scale: 10_f64.powi(-decimal_scale_factor as i32),
        }
    }

    pub(crate) fn apply(&self, x: f64) -> f64 {
        (self.reference + x * self.binary_scale) * self.decimal_scale
    }
}

pub(crate) struct GridPointDataSimplePackingDecoder {}

impl Grib2DataDecoder for GridPointDataSimplePackingDecoder {
    fn decode(
        &self,
        data_repr_def: &DataRepresentationDefinition,
        slice: &[u8],
        _missing: f64,
    ) -> Result<Box<[f64]>> {
        let data = match &data_repr_def.data {
            Data::Data0(data) => data,
            _ => {
                return Err(GribError::ParseError(String::from("Wrong decoder")));
            }
        };

        let params = ScaleParams::new(
            data.reference_value,
            data.binary_scale_factor,
            data.decimal_scale_factor,
        );

        if data.num_bits == 0 {
            let decoded = vec![params.apply(0.0); data_repr_def.num_points];
            return Ok(decoded.into_boxed_slice());
        }
        if data.num_bits > 31 {
            return Err(GribError::DecodeError(format!(
                "{} bits per value",
                data.num_bits
            )));
        }

        let decoder = SimpleDecoderIterator::new(
            BitwiseIterator::<u32>::new(slice, data.num_bits),
            params,
        );
        let decoded: Vec<f64> = decoder.take(data_repr_def.num_points).collect();

        if decoded.len() != data_repr_def.num_points {
            return Err(GribError::TruncatedMessage());
        }

        Ok(decoded.into_boxed_slice())
    }
}

pub(crate) struct SimpleDecoderIterator<I: Iterator<Item = N>, N: ToPrimitive> {
    bitwise_iter: I,
    params: ScaleParams,
}

impl<I: Iterator<Item = N>, N: ToPrimitive> SimpleDecoderIterator<I, N> {
    pub(crate) fn new(bitwise_iter: I, params: ScaleParams) -> Self {
        Self {
            bitwise_iter,
            params,
        }
    }
}

impl<I: Iterator<Item = N>, N: ToPrimitive> Iterator for SimpleDecoderIterator<I, N> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        match self.bitwise_iter.next() {
            Some(encoded) => Some(self.params.apply(encoded.to_f64()?)),
            _ => None,
        }
    }
}

pub(crate) struct GridPointDataSimplePackingEncoder {}

impl GridPointDataSimplePackingEncoder {
    pub(crate) fn encode(
        &self,
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

        let mut buf = vec![0u8; octet_length(q.num_bits, q.ints.len())];
        let mut writer = BitWriter::new(&mut buf);
        for int in &q.ints {
            writer.write_uint(*int, q.num_bits)?;
        }

        Ok((data, buf.into_boxed_slice()))
    }
}
