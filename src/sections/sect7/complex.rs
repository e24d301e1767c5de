use crate::error::{GribError, Result};
use crate::sections::sect5::{Data, Data2, DataRepresentationDefinition};
use crate::sections::sect7::simple::ScaleParams;
use crate::sections::sect7::{groups, quantize_exact, Grib2DataDecoder};
use crate::utils::BitwiseIterator;

/// Missing value management (Code Table 5.5), resolved against the group
/// reference width so all-missing groups can be recognized.
#[derive(Debug, Clone, Copy)]
pub(crate) enum MissingScheme {
    None,
    Primary { reference_missing: u64 },
    Secondary { reference_missing: u64 },
}

pub(crate) fn missing_scheme(missing_value: u8, num_bits: usize) -> Result<MissingScheme> {
    // with a zero-width reference stream no all-ones marker exists
    let reference_missing = if num_bits == 0 {
        u64::MAX
    } else {
        (1 << num_bits) - 1
    };
    match missing_value {
        0 => Ok(MissingScheme::None),
        1 => Ok(MissingScheme::Primary { reference_missing }),
        2 => Ok(MissingScheme::Secondary { reference_missing }),
        n => Err(GribError::DecodeError(format!(
            "unknown missing value management {}",
            n
        ))),
    }
}

pub(crate) struct GridPointDataComplexPackingDecoder {}

impl Grib2DataDecoder for GridPointDataComplexPackingDecoder {
    fn decode(
        &self,
        data_repr_def: &DataRepresentationDefinition,
        slice: &[u8],
        missing: f64,
    ) -> Result<Box<[f64]>> {
        let data = match &data_repr_def.data {
            Data::Data2(data) => data,
            _ => {
                return Err(GribError::ParseError(String::from("Wrong decoder")));
            }
        };

        let scheme = missing_scheme(data.missing_value, data.num_bits)?;
        let (group_table, groups_num_bytes) = groups::decode(data_repr_def, slice)?;
        let params = ScaleParams::new(
            data.reference_value,
            data.binary_scale_factor,
            data.decimal_scale_factor,
        );

        let decoded: Vec<f64> = ComplexPackingDecoderIterator::new(
            &slice[groups_num_bytes..],
            group_table.into_iter(),
            scheme,
        )
        .flatten()
        .take(data_repr_def.num_points)
        .map(|int| match int {
            Some(int) => params.apply(int as f64),
            None => missing,
        })
        .collect();

        if decoded.len() != data_repr_def.num_points {
            return Err(GribError::TruncatedMessage());
        }

        Ok(decoded.into_boxed_slice())
    }
}

/// Walks the packed group data, yielding each group's values with the group
/// reference added and missing substitutes mapped out.
pub(crate) struct ComplexPackingDecoderIterator<'a, I: Iterator<Item = (u64, usize, usize)>> {
    slice: &'a [u8],
    groups_iter: I,
    pos: usize,
    start_offset_num_bits: usize,
    scheme: MissingScheme,
}

impl<'a, I: Iterator<Item = (u64, usize, usize)>> ComplexPackingDecoderIterator<'a, I> {
    pub(crate) fn new(slice: &'a [u8], groups_iter: I, scheme: MissingScheme) -> Self {
        Self {
            slice,
            groups_iter,
            pos: 0,
            start_offset_num_bits: 0,
            scheme,
        }
    }
}

impl<'a, I: Iterator<Item = (u64, usize, usize)>> Iterator
    for ComplexPackingDecoderIterator<'a, I>
{
    type Item = Vec<Option<i64>>;

    fn next(&mut self) -> Option<Vec<Option<i64>>> {
        let (reference, width, length) = self.groups_iter.next()?;

        if width == 0 {
            // a zero-width group is constant, or wholly missing when its
            // reference carries the all-ones marker
            return match self.scheme {
                MissingScheme::Primary { reference_missing }
                | MissingScheme::Secondary { reference_missing }
                    if reference == reference_missing =>
                {
                    Some(vec![None; length])
                }
                _ => Some(vec![Some(reference as i64); length]),
            };
        }

        let total_num_bits = width * length + self.start_offset_num_bits;
        let (pos_end, offset_num_bits) = (self.pos + total_num_bits / 8, total_num_bits % 8);
        let offset_byte = if offset_num_bits > 0 { 1 } else { 0 };
        let window = self
            .slice
            .get(self.pos..(pos_end + offset_byte).min(self.slice.len()))
            .unwrap_or(&[]);

        let primary_missing = (1u64 << width) - 1;
        let scheme = self.scheme;
        let group_values = BitwiseIterator::<u64>::new(window, width)
            .with_offset(self.start_offset_num_bits)
            .take(length)
            .map(|v| match scheme {
                MissingScheme::None => Some(reference as i64 + v as i64),
                MissingScheme::Primary { .. } => {
                    if v == primary_missing {
                        None
                    } else {
                        Some(reference as i64 + v as i64)
                    }
                }
                MissingScheme::Secondary { .. } => {
                    if v == primary_missing || v + 1 == primary_missing {
                        None
                    } else {
                        Some(reference as i64 + v as i64)
                    }
                }
            })
            .collect::<Vec<Option<i64>>>();

        self.pos = pos_end;
        self.start_offset_num_bits = offset_num_bits;
        Some(group_values)
    }
}

pub(crate) struct GridPointDataComplexPackingEncoder {}

impl GridPointDataComplexPackingEncoder {
    pub(crate) fn encode(
        &self,
        values: &[f64],
        decimal_scale_factor: i16,
    ) -> Result<(Data2, Box<[u8]>)> {
        let (reference_value, ints) = quantize_exact(values, decimal_scale_factor)?;
        let encoded = groups::encode(&ints)?;

        Ok((
            Data2 {
                reference_value,
                binary_scale_factor: 0,
                decimal_scale_factor,
                num_bits: encoded.num_bits,
                values_type: 0,
                group_method: 1,
                missing_value: 0,
                missing_substitute_primary: 0,
                missing_substitute_secondary: 0,
                group_definition: encoded.group_definition,
            },
            encoded.bytes.into_boxed_slice(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(values: &[f64], decimal_scale_factor: i16) -> Vec<f64> {
        let (data, payload) = GridPointDataComplexPackingEncoder {}
            .encode(values, decimal_scale_factor)
            .unwrap();
        let drs = DataRepresentationDefinition {
            num_points: values.len(),
            template_number: 2,
            data: Data::Data2(data),
        };
        GridPointDataComplexPackingDecoder {}
            .decode(&drs, &payload, f64::NAN)
            .unwrap()
            .into_vec()
    }

    #[test]
    fn integer_field_round_trips_exactly() {
        let values: Vec<f64> = (0..100).map(|i| f64::from((i * 13) % 47)).collect();
        assert_eq!(round_trip(&values, 0), values);
    }

    #[test]
    fn smooth_field_round_trips_within_tolerance() {
        let values: Vec<f64> = (0..64)
            .map(|i| 1013.2 + 5.0 * (i as f64 / 10.0).sin())
            .collect();
        let decoded = round_trip(&values, 2);
        for (orig, back) in values.iter().zip(&decoded) {
            assert!((orig - back).abs() <= 1e-2, "{} vs {}", orig, back);
        }
    }

    #[test]
    fn primary_missing_substitution() {
        // one group of four 3-bit values, all-ones marks a missing point
        let data = Data2 {
            reference_value: 10.0,
            binary_scale_factor: 0,
            decimal_scale_factor: 0,
            num_bits: 5,
            values_type: 0,
            group_method: 1,
            missing_value: 1,
            missing_substitute_primary: 255,
            missing_substitute_secondary: 0,
            group_definition: crate::sections::sect5::GroupDefinition {
                num_groups: 1,
                group_widths_reference: 3,
                group_widths_num_bits: 0,
                group_lengths_reference: 4,
                group_lengths_increment: 1,
                group_lengths_last: 4,
                group_scaled_lengths_num_bits: 0,
            },
        };
        let drs = DataRepresentationDefinition {
            num_points: 4,
            template_number: 2,
            data: Data::Data2(data),
        };

        // reference stream: one 5-bit value (2) padded to a byte;
        // group data: 2, 7 (missing), 0, 5
        let payload = [
            0b00010_000,
            0b010_111_00,
            0b0_101_0000,
        ];
        let decoded = GridPointDataComplexPackingDecoder {}
            .decode(&drs, &payload, f64::NAN)
            .unwrap();
        assert_eq!(decoded[0], 14.0);
        assert!(decoded[1].is_nan());
        assert_eq!(decoded[2], 12.0);
        assert_eq!(decoded[3], 17.0);
    }
}
