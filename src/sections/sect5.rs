use crate::error::{GribError, Result};
use crate::read_as;
use crate::templates;
use crate::utils::BitReader;

#[derive(Debug, Clone, PartialEq)]
pub struct DataRepresentationDefinition {
    /// Number of data values encoded in Section 7
    pub num_points: usize,
    /// Data Representation Template Number
    pub template_number: u16,
    pub data: Data,
}

impl DataRepresentationDefinition {
    pub(crate) fn from_slice(body: &[u8]) -> Result<Self> {
        if body.len() < 6 {
            return Err(GribError::TruncatedMessage());
        }

        let num_points = read_as!(u32, body, 0) as usize;
        let template_number = read_as!(u16, body, 4);

        let fields = templates::lookup(5, template_number)?;
        let mut reader = BitReader::new(&body[6..]);
        let values = templates::decode_fields(fields, &mut reader)?;

        if reader.position() != body.len() - 6 {
            return Err(GribError::SectionLengthMismatch {
                section: 5,
                declared: body.len() + 5,
                consumed: 5 + 6 + reader.position(),
            });
        }

        Ok(DataRepresentationDefinition {
            num_points,
            template_number,
            data: Data::from_values(template_number, &values)?,
        })
    }

    pub(crate) fn write_body(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&(self.num_points as u32).to_be_bytes());
        let template_number = self.data.template_number();
        out.extend_from_slice(&template_number.to_be_bytes());

        let fields = templates::lookup(5, template_number)?;
        templates::encode_fields(fields, &self.data.to_values(), out)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    Data0(Data0),
    Data2(Data2),
    Data3(Data3),
    Data40(Data40),
    Data41(Data41),
}

impl Data {
    pub(crate) fn from_values(template_number: u16, v: &[i64]) -> Result<Self> {
        match template_number {
            0 => Ok(Data::Data0(Data0 {
                reference_value: f32::from_bits(v[0] as u32),
                binary_scale_factor: v[1] as i16,
                decimal_scale_factor: v[2] as i16,
                num_bits: v[3] as usize,
                values_type: v[4] as u8,
            })),
            2 => Ok(Data::Data2(Data2 {
                reference_value: f32::from_bits(v[0] as u32),
                binary_scale_factor: v[1] as i16,
                decimal_scale_factor: v[2] as i16,
                num_bits: v[3] as usize,
                values_type: v[4] as u8,
                group_method: v[5] as u8,
                missing_value: v[6] as u8,
                missing_substitute_primary: v[7] as u32,
                missing_substitute_secondary: v[8] as u32,
                group_definition: GroupDefinition::from_values(&v[9..16]),
            })),
            3 => Ok(Data::Data3(Data3 {
                reference_value: f32::from_bits(v[0] as u32),
                binary_scale_factor: v[1] as i16,
                decimal_scale_factor: v[2] as i16,
                num_bits: v[3] as usize,
                values_type: v[4] as u8,
                group_method: v[5] as u8,
                missing_value: v[6] as u8,
                missing_substitute_primary: v[7] as u32,
                missing_substitute_secondary: v[8] as u32,
                group_definition: GroupDefinition::from_values(&v[9..16]),
                spacial_difference_order: v[16] as u8,
                spacial_difference_size: v[17] as u8,
            })),
            40 => Ok(Data::Data40(Data40 {
                reference_value: f32::from_bits(v[0] as u32),
                binary_scale_factor: v[1] as i16,
                decimal_scale_factor: v[2] as i16,
                num_bits: v[3] as usize,
                values_type: v[4] as u8,
                compression_type: v[5] as u8,
                compression_ratio: v[6] as u8,
            })),
            41 => Ok(Data::Data41(Data41 {
                reference_value: f32::from_bits(v[0] as u32),
                binary_scale_factor: v[1] as i16,
                decimal_scale_factor: v[2] as i16,
                num_bits: v[3] as usize,
                values_type: v[4] as u8,
            })),
            n => Err(GribError::UnknownTemplate {
                section: 5,
                template: n,
            }),
        }
    }

    pub(crate) fn to_values(&self) -> Vec<i64> {
        match self {
            Data::Data0(d) => vec![
                d.reference_value.to_bits() as i64,
                d.binary_scale_factor as i64,
                d.decimal_scale_factor as i64,
                d.num_bits as i64,
                d.values_type as i64,
            ],
            Data::Data2(d) => {
                let mut v = vec![
                    d.reference_value.to_bits() as i64,
                    d.binary_scale_factor as i64,
                    d.decimal_scale_factor as i64,
                    d.num_bits as i64,
                    d.values_type as i64,
                    d.group_method as i64,
                    d.missing_value as i64,
                    d.missing_substitute_primary as i64,
                    d.missing_substitute_secondary as i64,
                ];
                d.group_definition.push_values(&mut v);
                v
            }
            Data::Data3(d) => {
                let mut v = vec![
                    d.reference_value.to_bits() as i64,
                    d.binary_scale_factor as i64,
                    d.decimal_scale_factor as i64,
                    d.num_bits as i64,
                    d.values_type as i64,
                    d.group_method as i64,
                    d.missing_value as i64,
                    d.missing_substitute_primary as i64,
                    d.missing_substitute_secondary as i64,
                ];
                d.group_definition.push_values(&mut v);
                v.push(d.spacial_difference_order as i64);
                v.push(d.spacial_difference_size as i64);
                v
            }
            Data::Data40(d) => vec![
                d.reference_value.to_bits() as i64,
                d.binary_scale_factor as i64,
                d.decimal_scale_factor as i64,
                d.num_bits as i64,
                d.values_type as i64,
                d.compression_type as i64,
                d.compression_ratio as i64,
            ],
            Data::Data41(d) => vec![
                d.reference_value.to_bits() as i64,
                d.binary_scale_factor as i64,
                d.decimal_scale_factor as i64,
                d.num_bits as i64,
                d.values_type as i64,
            ],
        }
    }

    pub fn template_number(&self) -> u16 {
        match self {
            Data::Data0(_) => 0,
            Data::Data2(_) => 2,
            Data::Data3(_) => 3,
            Data::Data40(_) => 40,
            Data::Data41(_) => 41,
        }
    }
}

/// Data Representation Template 5.0: grid point data, simple packing.
#[derive(Debug, Clone, PartialEq)]
pub struct Data0 {
    /// Reference value (R) (IEEE 32-bit floating-point value)
    pub reference_value: f32,
    /// Binary scale factor (E)
    pub binary_scale_factor: i16,
    /// Decimal scale factor (D)
    pub decimal_scale_factor: i16,
    pub num_bits: usize,
    /// Type of original field values (see Code Table 5.1)
    pub values_type: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDefinition {
    /// NG - number of groups the field is split into
    pub num_groups: usize,
    pub group_widths_reference: u8,
    pub group_widths_num_bits: usize,
    pub group_lengths_reference: u32,
    pub group_lengths_increment: u8,
    /// True length of the last group
    pub group_lengths_last: u32,
    pub group_scaled_lengths_num_bits: usize,
}

impl GroupDefinition {
    fn from_values(v: &[i64]) -> Self {
        GroupDefinition {
            num_groups: v[0] as usize,
            group_widths_reference: v[1] as u8,
            group_widths_num_bits: v[2] as usize,
            group_lengths_reference: v[3] as u32,
            group_lengths_increment: v[4] as u8,
            group_lengths_last: v[5] as u32,
            group_scaled_lengths_num_bits: v[6] as usize,
        }
    }

    fn push_values(&self, out: &mut Vec<i64>) {
        out.push(self.num_groups as i64);
        out.push(self.group_widths_reference as i64);
        out.push(self.group_widths_num_bits as i64);
        out.push(self.group_lengths_reference as i64);
        out.push(self.group_lengths_increment as i64);
        out.push(self.group_lengths_last as i64);
        out.push(self.group_scaled_lengths_num_bits as i64);
    }
}

/// Data Representation Template 5.2: grid point data, complex packing.
#[derive(Debug, Clone, PartialEq)]
pub struct Data2 {
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    /// Bits per group reference value
    pub num_bits: usize,
    pub values_type: u8,
    /// Group splitting method used (see Code Table 5.4)
    pub group_method: u8,
    /// Missing value management used (see Code Table 5.5)
    pub missing_value: u8,
    pub missing_substitute_primary: u32,
    pub missing_substitute_secondary: u32,
    pub group_definition: GroupDefinition,
}

/// Data Representation Template 5.3: grid point data, complex packing and
/// spatial differencing.
#[derive(Debug, Clone, PartialEq)]
pub struct Data3 {
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub num_bits: usize,
    pub values_type: u8,
    pub group_method: u8,
    pub missing_value: u8,
    pub missing_substitute_primary: u32,
    pub missing_substitute_secondary: u32,
    pub group_definition: GroupDefinition,
    /// Order of spatial differencing (see Code Table 5.6)
    pub spacial_difference_order: u8,
    /// Octets per extra descriptor at the start of the data section
    pub spacial_difference_size: u8,
}

/// Data Representation Template 5.40: grid point data, JPEG 2000 code stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Data40 {
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub num_bits: usize,
    pub values_type: u8,
    /// Type of compression (see Code Table 5.40)
    pub compression_type: u8,
    pub compression_ratio: u8,
}

/// Data Representation Template 5.41: grid point data, PNG.
#[derive(Debug, Clone, PartialEq)]
pub struct Data41 {
    pub reference_value: f32,
    pub binary_scale_factor: i16,
    pub decimal_scale_factor: i16,
    pub num_bits: usize,
    pub values_type: u8,
}
