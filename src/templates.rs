//! Template registry: maps (section number, template number) pairs to the
//! ordered field layout published in the WMO GRIB2 template tables.
//!
//! The tables are compile-time constants; lookups never allocate and the
//! registry is safe for concurrent reads. IEEE float fields (the reference
//! value in the section 5 templates) travel through the field walk as their
//! raw 32-bit pattern, the same way the original template arrays carry them.

use crate::error::{GribError, Result};
use crate::utils::{signed_from_raw, signed_to_raw, BitReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateField {
    pub name: &'static str,
    pub octets: u8,
    pub signed: bool,
}

macro_rules! fields {
    ($(($name:literal, $octets:expr, $signed:expr),)*) => {
        &[
            $(TemplateField { name: $name, octets: $octets, signed: $signed }),*
        ]
    };
}

/// Grid definition template 3.0: latitude/longitude (equidistant cylindrical).
const GRID_LATLON: &[TemplateField] = fields! {
    ("shape_of_earth", 1, false),
    ("earth_radius_scale", 1, false),
    ("earth_radius_value", 4, false),
    ("earth_major_axis_scale", 1, false),
    ("earth_major_axis_value", 4, false),
    ("earth_minor_axis_scale", 1, false),
    ("earth_minor_axis_value", 4, false),
    ("n_i", 4, false),
    ("n_j", 4, false),
    ("basic_angle", 4, false),
    ("basic_angle_subdivisions", 4, false),
    ("la1", 4, true),
    ("lo1", 4, true),
    ("resolution_and_component_flags", 1, false),
    ("la2", 4, true),
    ("lo2", 4, true),
    ("d_i", 4, false),
    ("d_j", 4, false),
    ("scanning_mode", 1, false),
};

/// Grid definition template 3.40: Gaussian latitude/longitude, regular or
/// reduced. Identical octet layout to 3.0 except Dj is replaced by N, the
/// number of parallels between a pole and the equator.
const GRID_GAUSSIAN: &[TemplateField] = fields! {
    ("shape_of_earth", 1, false),
    ("earth_radius_scale", 1, false),
    ("earth_radius_value", 4, false),
    ("earth_major_axis_scale", 1, false),
    ("earth_major_axis_value", 4, false),
    ("earth_minor_axis_scale", 1, false),
    ("earth_minor_axis_value", 4, false),
    ("n_i", 4, false),
    ("n_j", 4, false),
    ("basic_angle", 4, false),
    ("basic_angle_subdivisions", 4, false),
    ("la1", 4, true),
    ("lo1", 4, true),
    ("resolution_and_component_flags", 1, false),
    ("la2", 4, true),
    ("lo2", 4, true),
    ("d_i", 4, false),
    ("n_parallels", 4, false),
    ("scanning_mode", 1, false),
};

/// Product definition template 4.0: analysis or forecast at a horizontal
/// level or layer at a point in time.
const PRODUCT_HORIZONTAL: &[TemplateField] = fields! {
    ("parameter_category", 1, false),
    ("parameter_number", 1, false),
    ("process_type", 1, false),
    ("background_process", 1, false),
    ("analysis_process", 1, false),
    ("cutoff_hours", 2, false),
    ("cutoff_minutes", 1, false),
    ("time_unit", 1, false),
    ("forecast_time", 4, true),
    ("first_surface_type", 1, false),
    ("first_surface_scale_factor", 1, true),
    ("first_surface_scaled_value", 4, false),
    ("second_surface_type", 1, false),
    ("second_surface_scale_factor", 1, true),
    ("second_surface_scaled_value", 4, false),
};

/// Product definition template 4.1: individual ensemble forecast.
const PRODUCT_ENSEMBLE: &[TemplateField] = fields! {
    ("parameter_category", 1, false),
    ("parameter_number", 1, false),
    ("process_type", 1, false),
    ("background_process", 1, false),
    ("analysis_process", 1, false),
    ("cutoff_hours", 2, false),
    ("cutoff_minutes", 1, false),
    ("time_unit", 1, false),
    ("forecast_time", 4, true),
    ("first_surface_type", 1, false),
    ("first_surface_scale_factor", 1, true),
    ("first_surface_scaled_value", 4, false),
    ("second_surface_type", 1, false),
    ("second_surface_scale_factor", 1, true),
    ("second_surface_scaled_value", 4, false),
    ("ensemble_type", 1, false),
    ("perturbation_number", 1, false),
    ("num_ensemble_members", 1, false),
};

/// Product definition template 4.8: average/accumulation over a time
/// interval, with the single time-range specification that production
/// encoders emit.
const PRODUCT_STATISTICAL: &[TemplateField] = fields! {
    ("parameter_category", 1, false),
    ("parameter_number", 1, false),
    ("process_type", 1, false),
    ("background_process", 1, false),
    ("analysis_process", 1, false),
    ("cutoff_hours", 2, false),
    ("cutoff_minutes", 1, false),
    ("time_unit", 1, false),
    ("forecast_time", 4, true),
    ("first_surface_type", 1, false),
    ("first_surface_scale_factor", 1, true),
    ("first_surface_scaled_value", 4, false),
    ("second_surface_type", 1, false),
    ("second_surface_scale_factor", 1, true),
    ("second_surface_scaled_value", 4, false),
    ("end_of_interval_year", 2, false),
    ("end_of_interval_month", 1, false),
    ("end_of_interval_day", 1, false),
    ("end_of_interval_hour", 1, false),
    ("end_of_interval_minute", 1, false),
    ("end_of_interval_second", 1, false),
    ("num_time_ranges", 1, false),
    ("num_missing_values", 4, false),
    ("statistical_process", 1, false),
    ("time_increment_type", 1, false),
    ("range_time_unit", 1, false),
    ("range_length", 4, false),
    ("increment_time_unit", 1, false),
    ("time_increment", 4, false),
};

/// Data representation template 5.0: grid point data, simple packing.
const DRS_SIMPLE: &[TemplateField] = fields! {
    ("reference_value", 4, false),
    ("binary_scale_factor", 2, true),
    ("decimal_scale_factor", 2, true),
    ("num_bits", 1, false),
    ("values_type", 1, false),
};

/// Data representation template 5.2: grid point data, complex packing.
const DRS_COMPLEX: &[TemplateField] = fields! {
    ("reference_value", 4, false),
    ("binary_scale_factor", 2, true),
    ("decimal_scale_factor", 2, true),
    ("num_bits", 1, false),
    ("values_type", 1, false),
    ("group_method", 1, false),
    ("missing_value", 1, false),
    ("missing_substitute_primary", 4, false),
    ("missing_substitute_secondary", 4, false),
    ("num_groups", 4, false),
    ("group_widths_reference", 1, false),
    ("group_widths_num_bits", 1, false),
    ("group_lengths_reference", 4, false),
    ("group_lengths_increment", 1, false),
    ("group_lengths_last", 4, false),
    ("group_scaled_lengths_num_bits", 1, false),
};

/// Data representation template 5.3: complex packing and spatial differencing.
const DRS_COMPLEX_SPACIAL_DIFF: &[TemplateField] = fields! {
    ("reference_value", 4, false),
    ("binary_scale_factor", 2, true),
    ("decimal_scale_factor", 2, true),
    ("num_bits", 1, false),
    ("values_type", 1, false),
    ("group_method", 1, false),
    ("missing_value", 1, false),
    ("missing_substitute_primary", 4, false),
    ("missing_substitute_secondary", 4, false),
    ("num_groups", 4, false),
    ("group_widths_reference", 1, false),
    ("group_widths_num_bits", 1, false),
    ("group_lengths_reference", 4, false),
    ("group_lengths_increment", 1, false),
    ("group_lengths_last", 4, false),
    ("group_scaled_lengths_num_bits", 1, false),
    ("spacial_difference_order", 1, false),
    ("spacial_difference_size", 1, false),
};

/// Data representation template 5.40: JPEG 2000 code stream.
const DRS_JPEG2000: &[TemplateField] = fields! {
    ("reference_value", 4, false),
    ("binary_scale_factor", 2, true),
    ("decimal_scale_factor", 2, true),
    ("num_bits", 1, false),
    ("values_type", 1, false),
    ("compression_type", 1, false),
    ("compression_ratio", 1, false),
};

/// Data representation template 5.41: PNG.
const DRS_PNG: &[TemplateField] = fields! {
    ("reference_value", 4, false),
    ("binary_scale_factor", 2, true),
    ("decimal_scale_factor", 2, true),
    ("num_bits", 1, false),
    ("values_type", 1, false),
};

pub fn lookup(section: u8, template_number: u16) -> Result<&'static [TemplateField]> {
    match (section, template_number) {
        (3, 0) => Ok(GRID_LATLON),
        (3, 40) => Ok(GRID_GAUSSIAN),
        (4, 0) => Ok(PRODUCT_HORIZONTAL),
        (4, 1) => Ok(PRODUCT_ENSEMBLE),
        (4, 8) => Ok(PRODUCT_STATISTICAL),
        (5, 0) => Ok(DRS_SIMPLE),
        (5, 2) => Ok(DRS_COMPLEX),
        (5, 3) => Ok(DRS_COMPLEX_SPACIAL_DIFF),
        (5, 40) => Ok(DRS_JPEG2000),
        (5, 41) => Ok(DRS_PNG),
        _ => Err(GribError::UnknownTemplate {
            section,
            template: template_number,
        }),
    }
}

/// Total octets consumed by a field list.
pub fn octets(fields: &[TemplateField]) -> usize {
    fields.iter().map(|f| f.octets as usize).sum()
}

/// Walk a field list over the reader, decoding each field at its declared
/// octet width. Signed fields are sign-magnitude.
pub(crate) fn decode_fields(
    fields: &'static [TemplateField],
    reader: &mut BitReader<'_>,
) -> Result<Vec<i64>> {
    let mut values = Vec::with_capacity(fields.len());
    for field in fields {
        let nbits = field.octets as usize * 8;
        let raw = reader.read_uint(nbits)?;
        let value = if field.signed {
            signed_from_raw(raw, nbits)
        } else {
            raw as i64
        };
        values.push(value);
    }
    Ok(values)
}

/// Serialize values back through a field list, appending big-endian octets.
pub(crate) fn encode_fields(
    fields: &'static [TemplateField],
    values: &[i64],
    out: &mut Vec<u8>,
) -> Result<()> {
    if fields.len() != values.len() {
        return Err(GribError::EncodeError(format!(
            "template expects {} fields, got {}",
            fields.len(),
            values.len()
        )));
    }
    for (field, value) in fields.iter().zip(values) {
        let nbits = field.octets as usize * 8;
        let raw = if field.signed {
            signed_to_raw(*value, nbits)?
        } else {
            if nbits < 64 && *value as u64 >= 1u64 << nbits {
                return Err(GribError::EncodeError(format!(
                    "{} = {} does not fit in {} octets",
                    field.name, value, field.octets
                )));
            }
            *value as u64
        };
        out.extend_from_slice(&raw.to_be_bytes()[8 - field.octets as usize..]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_templates_resolve() {
        assert_eq!(octets(lookup(3, 0).unwrap()), 58);
        assert_eq!(octets(lookup(3, 40).unwrap()), 58);
        assert_eq!(octets(lookup(4, 0).unwrap()), 25);
        assert_eq!(octets(lookup(4, 1).unwrap()), 28);
        assert_eq!(octets(lookup(4, 8).unwrap()), 49);
        assert_eq!(octets(lookup(5, 0).unwrap()), 10);
        assert_eq!(octets(lookup(5, 2).unwrap()), 36);
        assert_eq!(octets(lookup(5, 3).unwrap()), 38);
        assert_eq!(octets(lookup(5, 40).unwrap()), 12);
        assert_eq!(octets(lookup(5, 41).unwrap()), 10);
    }

    #[test]
    fn unknown_template_is_reported() {
        assert!(matches!(
            lookup(5, 199),
            Err(GribError::UnknownTemplate {
                section: 5,
                template: 199
            })
        ));
        assert!(matches!(lookup(9, 0), Err(GribError::UnknownTemplate { .. })));
    }

    #[test]
    fn field_walk_round_trip() {
        let fields = lookup(5, 0).unwrap();
        let values = vec![0x42C80000, -3, 2, 12, 0];

        let mut buf = Vec::new();
        encode_fields(fields, &values, &mut buf).unwrap();
        assert_eq!(buf.len(), octets(fields));

        let mut reader = BitReader::new(&buf);
        let decoded = decode_fields(fields, &mut reader).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn oversized_field_value_rejected() {
        let fields = lookup(5, 0).unwrap();
        let values = vec![0x42C80000, -3, 2, 300, 0];
        let mut buf = Vec::new();
        assert!(matches!(
            encode_fields(fields, &values, &mut buf),
            Err(GribError::EncodeError(_))
        ));
    }
}
