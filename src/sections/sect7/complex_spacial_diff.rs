use crate::error::{GribError, Result};
use crate::sections::sect5::{Data, Data3, DataRepresentationDefinition};
use crate::sections::sect7::complex::{missing_scheme, ComplexPackingDecoderIterator};
use crate::sections::sect7::simple::ScaleParams;
use crate::sections::sect7::{groups, quantize_exact, Grib2DataDecoder};
use crate::utils::{bits_for, signed_from_raw, signed_to_raw, BitReader};

pub(crate) struct GridPointDataComplexPackingSpacialDiffDecoder {}

impl Grib2DataDecoder for GridPointDataComplexPackingSpacialDiffDecoder {
    fn decode(
        &self,
        data_repr_def: &DataRepresentationDefinition,
        slice: &[u8],
        missing: f64,
    ) -> Result<Box<[f64]>> {
        let data = match &data_repr_def.data {
            Data::Data3(data) => data,
            _ => {
                return Err(GribError::ParseError(String::from("Wrong decoder")));
            }
        };

        let order = data.spacial_difference_order as usize;
        if !(1..=2).contains(&order) {
            return Err(GribError::DecodeError(format!(
                "spatial differencing order {}",
                data.spacial_difference_order
            )));
        }
        let size = data.spacial_difference_size as usize;
        if !(1..=4).contains(&size) {
            return Err(GribError::DecodeError(format!(
                "spatial difference descriptor size {} octets",
                data.spacial_difference_size
            )));
        }

        // extra descriptors: the first value(s) of the field, undifferenced,
        // and the overall minimum of the differences
        let mut reader = BitReader::new(slice);
        let z1 = signed_from_raw(reader.read_uint(size * 8)?, size * 8);
        let z2 = if order == 2 {
            signed_from_raw(reader.read_uint(size * 8)?, size * 8)
        } else {
            0
        };
        let z_min = signed_from_raw(reader.read_uint(size * 8)?, size * 8);
        let descriptors_end = reader.position();

        let (group_table, groups_num_bytes) =
            groups::decode(data_repr_def, &slice[descriptors_end..])?;
        let scheme = missing_scheme(data.missing_value, data.num_bits)?;

        let mut ints: Vec<Option<i64>> = ComplexPackingDecoderIterator::new(
            &slice[descriptors_end + groups_num_bytes..],
            group_table.into_iter(),
            scheme,
        )
        .flatten()
        .take(data_repr_def.num_points)
        .collect();

        if ints.len() != data_repr_def.num_points {
            return Err(GribError::TruncatedMessage());
        }

        undifference(&mut ints, order, z1, z2, z_min);

        let params = ScaleParams::new(
            data.reference_value,
            data.binary_scale_factor,
            data.decimal_scale_factor,
        );
        Ok(ints
            .iter()
            .map(|int| match int {
                Some(int) => params.apply(*int as f64),
                None => missing,
            })
            .collect())
    }
}

/// Reverse the differencing by cumulative summation over the present
/// points. The first `order` present entries are the stored first values;
/// every later entry gets the overall minimum added back before the
/// recurrence is applied.
fn undifference(ints: &mut [Option<i64>], order: usize, z1: i64, z2: i64, z_min: i64) {
    let mut seen = 0usize;
    let (mut prev1, mut prev2) = (0i64, 0i64);
    for slot in ints.iter_mut() {
        if let Some(value) = slot {
            match seen {
                0 => *value = z1,
                1 if order == 2 => *value = z2,
                _ => {
                    *value += z_min
                        + if order == 2 {
                            2 * prev1 - prev2
                        } else {
                            prev1
                        }
                }
            }
            prev2 = prev1;
            prev1 = *value;
            seen += 1;
        }
    }
}

pub(crate) struct GridPointDataComplexPackingSpacialDiffEncoder {}

impl GridPointDataComplexPackingSpacialDiffEncoder {
    pub(crate) fn encode(
        &self,
        values: &[f64],
        decimal_scale_factor: i16,
        order: u8,
    ) -> Result<(Data3, Box<[u8]>)> {
        let order = order as usize;
        if !(1..=2).contains(&order) {
            return Err(GribError::EncodeError(format!(
                "spatial differencing order {}",
                order
            )));
        }

        let (reference_value, ints) = quantize_exact(values, decimal_scale_factor)?;
        if ints.len() <= order {
            return Err(GribError::EncodeError(String::from(
                "field too short for spatial differencing",
            )));
        }

        let mut diffs = vec![0i64; ints.len()];
        for j in order..ints.len() {
            diffs[j] = if order == 2 {
                ints[j] - 2 * ints[j - 1] + ints[j - 2]
            } else {
                ints[j] - ints[j - 1]
            };
        }
        let z1 = ints[0];
        let z2 = if order == 2 { ints[1] } else { 0 };
        let z_min = *diffs[order..].iter().min().unwrap();

        // leading entries pack as zero; decode overwrites them with the
        // stored first values
        let stream: Vec<i64> = diffs
            .iter()
            .enumerate()
            .map(|(j, d)| if j < order { 0 } else { d - z_min })
            .collect();
        let encoded = groups::encode(&stream)?;

        let magnitude = z1
            .unsigned_abs()
            .max(z2.unsigned_abs())
            .max(z_min.unsigned_abs());
        let size = (bits_for(magnitude) + 1 + 7) / 8;
        if size > 4 {
            return Err(GribError::EncodeError(String::from(
                "spatial difference descriptors exceed 4 octets",
            )));
        }
        let size = size.max(1);

        let mut payload = Vec::with_capacity((order + 1) * size + encoded.bytes.len());
        let descriptors = if order == 2 {
            vec![z1, z2, z_min]
        } else {
            vec![z1, z_min]
        };
        for descriptor in descriptors {
            let raw = signed_to_raw(descriptor, size * 8)?;
            payload.extend_from_slice(&raw.to_be_bytes()[8 - size..]);
        }
        payload.extend_from_slice(&encoded.bytes);

        Ok((
            Data3 {
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
                spacial_difference_order: order as u8,
                spacial_difference_size: size as u8,
            },
            payload.into_boxed_slice(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(values: &[f64], decimal_scale_factor: i16, order: u8) -> Vec<f64> {
        let (data, payload) = GridPointDataComplexPackingSpacialDiffEncoder {}
            .encode(values, decimal_scale_factor, order)
            .unwrap();
        let drs = DataRepresentationDefinition {
            num_points: values.len(),
            template_number: 3,
            data: Data::Data3(data),
        };
        GridPointDataComplexPackingSpacialDiffDecoder {}
            .decode(&drs, &payload, f64::NAN)
            .unwrap()
            .into_vec()
    }

    #[test]
    fn first_order_monotonic_round_trips_exactly() {
        let values: Vec<f64> = (0..200).map(|i| f64::from(i * 3 + 7)).collect();
        assert_eq!(round_trip(&values, 0, 1), values);
    }

    #[test]
    fn second_order_monotonic_round_trips_exactly() {
        let values: Vec<f64> = (0..200).map(|i| f64::from(i * i)).collect();
        assert_eq!(round_trip(&values, 0, 2), values);
    }

    #[test]
    fn oscillating_field_round_trips_exactly() {
        let values: Vec<f64> = (0..97)
            .map(|i| f64::from((i * 37) % 113) - 50.0)
            .collect();
        assert_eq!(round_trip(&values, 0, 2), values);
        assert_eq!(round_trip(&values, 0, 1), values);
    }

    #[test]
    fn undifference_special_cases_first_points() {
        // first order: stored firsts seed the cumulative sum
        let mut ints: Vec<Option<i64>> = vec![Some(0), Some(2), Some(3), Some(1)];
        undifference(&mut ints, 1, 10, 0, -2);
        // 10, then 10+(2-2)=10, 10+(3-2)=11, 11+(1-2)=10
        assert_eq!(ints, vec![Some(10), Some(10), Some(11), Some(10)]);

        // second order
        let mut ints: Vec<Option<i64>> = vec![Some(0), Some(0), Some(4), Some(4)];
        undifference(&mut ints, 2, 1, 3, -2);
        // 1, 3, then 4-2 + 2*3-1 = 7, 4-2 + 2*7-3 = 13
        assert_eq!(ints, vec![Some(1), Some(3), Some(7), Some(13)]);
    }

    #[test]
    fn missing_points_are_skipped_by_the_recurrence() {
        let mut ints: Vec<Option<i64>> = vec![Some(0), None, Some(2), None, Some(3)];
        undifference(&mut ints, 1, 5, 0, 0);
        assert_eq!(ints, vec![Some(5), None, Some(7), None, Some(10)]);
    }

    #[test]
    fn too_short_field_is_rejected() {
        assert!(matches!(
            GridPointDataComplexPackingSpacialDiffEncoder {}.encode(&[1.0, 2.0], 0, 2),
            Err(GribError::EncodeError(_))
        ));
    }
}
