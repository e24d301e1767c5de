use crate::error::{GribError, Result};
use crate::read_as;
use crate::templates;
use crate::utils::BitReader;

/// Value standing for "missing" in 4-octet grid template fields.
const MISSING_U32: i64 = 0xFFFF_FFFF;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GridDefinition {
    pub source: u8,
    /// Number of data points
    pub num_points: usize,
    /// Octets per entry of the optional list of numbers (octet 11); zero
    /// when no list is appended
    pub optional_list_entry_octets: u8,
    /// Interpretation of the optional list (see Code Table 3.11)
    pub optional_list_interpretation: u8,
    /// Grid Definition Template Number
    pub template_number: u16,
    pub grid: Grid,
    /// Points per latitude row of a reduced grid, decoded from the optional
    /// list when present
    pub points_per_row: Option<Box<[u32]>>,
}

/// The grid layout the data values are defined on.
#[derive(Debug, PartialEq, Eq)]
pub enum GridShape<'a> {
    Regular { nx: usize, ny: usize },
    Reduced { ny: usize, points_per_row: &'a [u32] },
}

impl GridDefinition {
    pub(crate) fn from_slice(body: &[u8]) -> Result<Self> {
        if body.len() < 9 {
            return Err(GribError::TruncatedMessage());
        }

        let source = body[0];
        let num_points = read_as!(u32, body, 1) as usize;
        let optional_list_entry_octets = body[5];
        let optional_list_interpretation = body[6];
        let template_number = read_as!(u16, body, 7);

        let fields = templates::lookup(3, template_number)?;
        let mut reader = BitReader::new(&body[9..]);
        let values = templates::decode_fields(fields, &mut reader)?;
        let grid = Grid::from_template(template_number, &values)?;

        let remaining = body.len() - 9 - reader.position();
        let points_per_row = if optional_list_entry_octets > 0 && remaining > 0 {
            let entry = optional_list_entry_octets as usize;
            if entry > 4 {
                return Err(GribError::ParseError(format!(
                    "optional list entry width {} octets",
                    entry
                )));
            }
            if remaining % entry != 0 {
                return Err(GribError::SectionLengthMismatch {
                    section: 3,
                    declared: body.len() + 5,
                    consumed: 5 + 9 + reader.position() + remaining / entry * entry,
                });
            }
            let count = remaining / entry;
            let mut rows = Vec::with_capacity(count);
            for _ in 0..count {
                rows.push(reader.read_uint(entry * 8)? as u32);
            }
            Some(rows.into_boxed_slice())
        } else {
            if remaining != 0 {
                return Err(GribError::SectionLengthMismatch {
                    section: 3,
                    declared: body.len() + 5,
                    consumed: 5 + 9 + reader.position(),
                });
            }
            None
        };

        Ok(GridDefinition {
            source,
            num_points,
            optional_list_entry_octets,
            optional_list_interpretation,
            template_number,
            grid,
            points_per_row,
        })
    }

    pub(crate) fn write_body(&self, out: &mut Vec<u8>) -> Result<()> {
        out.push(self.source);
        out.extend_from_slice(&(self.num_points as u32).to_be_bytes());
        out.push(self.optional_list_entry_octets);
        out.push(self.optional_list_interpretation);
        out.extend_from_slice(&self.template_number.to_be_bytes());

        let fields = templates::lookup(3, self.template_number)?;
        templates::encode_fields(fields, &self.grid.to_values(), out)?;

        if let Some(rows) = &self.points_per_row {
            let entry = self.optional_list_entry_octets as usize;
            if entry == 0 || entry > 4 {
                return Err(GribError::EncodeError(format!(
                    "reduced grid list entry width {} octets",
                    entry
                )));
            }
            for row in rows.iter() {
                if entry < 4 && u64::from(*row) >= 1 << (entry * 8) {
                    return Err(GribError::EncodeError(format!(
                        "row length {} does not fit in {} octets",
                        row, entry
                    )));
                }
                out.extend_from_slice(&row.to_be_bytes()[4 - entry..]);
            }
        }

        Ok(())
    }

    pub fn shape(&self) -> Result<GridShape<'_>> {
        match &self.grid {
            Grid::Grid0(grid) => Ok(GridShape::Regular {
                nx: grid.n_i as usize,
                ny: grid.n_j as usize,
            }),
            Grid::Grid40(grid) => match (grid.n_i, &self.points_per_row) {
                (Some(n_i), _) => Ok(GridShape::Regular {
                    nx: n_i as usize,
                    ny: grid.n_j as usize,
                }),
                (None, Some(rows)) => {
                    if rows.len() != grid.n_j as usize {
                        return Err(GribError::InvalidGridSpec(format!(
                            "{} rows in the points-per-row list, grid has {} parallels",
                            rows.len(),
                            grid.n_j
                        )));
                    }
                    Ok(GridShape::Reduced {
                        ny: grid.n_j as usize,
                        points_per_row: rows,
                    })
                }
                (None, None) => Err(GribError::InvalidGridSpec(String::from(
                    "reduced grid without a points-per-row list",
                ))),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Grid {
    Grid0(Grid0),
    Grid40(Grid40),
}

impl Grid {
    pub(crate) fn from_template(template_number: u16, values: &[i64]) -> Result<Self> {
        match template_number {
            0 => Ok(Grid::Grid0(Grid0::from_values(values))),
            40 => Ok(Grid::Grid40(Grid40::from_values(values))),
            n => Err(GribError::UnknownTemplate {
                section: 3,
                template: n,
            }),
        }
    }

    pub(crate) fn to_values(&self) -> Vec<i64> {
        match self {
            Grid::Grid0(grid) => grid.to_values(),
            Grid::Grid40(grid) => grid.to_values(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScaledValue {
    pub scale: u8,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BasicAngle {
    pub basic_angle: u32,
    pub basic_angle_sub: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GridHeader {
    pub earth_shape: u8,
    pub spherical_radius: ScaledValue,
    pub major_axis: ScaledValue,
    pub minor_axis: ScaledValue,
}

impl GridHeader {
    fn from_values(v: &[i64]) -> Self {
        GridHeader {
            earth_shape: v[0] as u8,
            spherical_radius: ScaledValue {
                scale: v[1] as u8,
                value: v[2] as u32,
            },
            major_axis: ScaledValue {
                scale: v[3] as u8,
                value: v[4] as u32,
            },
            minor_axis: ScaledValue {
                scale: v[5] as u8,
                value: v[6] as u32,
            },
        }
    }

    fn push_values(&self, out: &mut Vec<i64>) {
        out.push(self.earth_shape as i64);
        out.push(self.spherical_radius.scale as i64);
        out.push(self.spherical_radius.value as i64);
        out.push(self.major_axis.scale as i64);
        out.push(self.major_axis.value as i64);
        out.push(self.minor_axis.scale as i64);
        out.push(self.minor_axis.value as i64);
    }
}

/// Grid Definition Template 3.0: Latitude/longitude (or equidistant cylindrical, or Plate Carree)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid0 {
    pub header: GridHeader,
    pub n_i: u32,
    pub n_j: u32,
    pub initial_prod_basic_angle: BasicAngle,
    pub la1: i32,
    pub lo1: i32,
    pub resolution_and_component_flags: u8,
    pub la2: i32,
    pub lo2: i32,
    pub d_i: u32,
    pub d_j: u32,
    pub scanning_mode: u8,
}

impl Grid0 {
    fn from_values(v: &[i64]) -> Self {
        Grid0 {
            header: GridHeader::from_values(&v[..7]),
            n_i: v[7] as u32,
            n_j: v[8] as u32,
            initial_prod_basic_angle: BasicAngle {
                basic_angle: v[9] as u32,
                basic_angle_sub: v[10] as u32,
            },
            la1: v[11] as i32,
            lo1: v[12] as i32,
            resolution_and_component_flags: v[13] as u8,
            la2: v[14] as i32,
            lo2: v[15] as i32,
            d_i: v[16] as u32,
            d_j: v[17] as u32,
            scanning_mode: v[18] as u8,
        }
    }

    fn to_values(&self) -> Vec<i64> {
        let mut v = Vec::with_capacity(19);
        self.header.push_values(&mut v);
        v.push(self.n_i as i64);
        v.push(self.n_j as i64);
        v.push(self.initial_prod_basic_angle.basic_angle as i64);
        v.push(self.initial_prod_basic_angle.basic_angle_sub as i64);
        v.push(self.la1 as i64);
        v.push(self.lo1 as i64);
        v.push(self.resolution_and_component_flags as i64);
        v.push(self.la2 as i64);
        v.push(self.lo2 as i64);
        v.push(self.d_i as i64);
        v.push(self.d_j as i64);
        v.push(self.scanning_mode as i64);
        v
    }
}

/// Grid Definition Template 3.40: Gaussian latitude/longitude. `n_i` and
/// `d_i` are `None` on reduced grids, where the per-row point counts come
/// from the section's optional list instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid40 {
    pub header: GridHeader,
    pub n_i: Option<u32>,
    pub n_j: u32,
    pub initial_prod_basic_angle: BasicAngle,
    pub la1: i32,
    pub lo1: i32,
    pub resolution_and_component_flags: u8,
    pub la2: i32,
    pub lo2: i32,
    pub d_i: Option<u32>,
    /// N - number of parallels between a pole and the equator
    pub n_parallels: u32,
    pub scanning_mode: u8,
}

impl Grid40 {
    fn from_values(v: &[i64]) -> Self {
        Grid40 {
            header: GridHeader::from_values(&v[..7]),
            n_i: if v[7] == MISSING_U32 {
                None
            } else {
                Some(v[7] as u32)
            },
            n_j: v[8] as u32,
            initial_prod_basic_angle: BasicAngle {
                basic_angle: v[9] as u32,
                basic_angle_sub: v[10] as u32,
            },
            la1: v[11] as i32,
            lo1: v[12] as i32,
            resolution_and_component_flags: v[13] as u8,
            la2: v[14] as i32,
            lo2: v[15] as i32,
            d_i: if v[16] == MISSING_U32 {
                None
            } else {
                Some(v[16] as u32)
            },
            n_parallels: v[17] as u32,
            scanning_mode: v[18] as u8,
        }
    }

    fn to_values(&self) -> Vec<i64> {
        let mut v = Vec::with_capacity(19);
        self.header.push_values(&mut v);
        v.push(self.n_i.map(|n| n as i64).unwrap_or(MISSING_U32));
        v.push(self.n_j as i64);
        v.push(self.initial_prod_basic_angle.basic_angle as i64);
        v.push(self.initial_prod_basic_angle.basic_angle_sub as i64);
        v.push(self.la1 as i64);
        v.push(self.lo1 as i64);
        v.push(self.resolution_and_component_flags as i64);
        v.push(self.la2 as i64);
        v.push(self.lo2 as i64);
        v.push(self.d_i.map(|d| d as i64).unwrap_or(MISSING_U32));
        v.push(self.n_parallels as i64);
        v.push(self.scanning_mode as i64);
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gaussian_reduced(rows: &[u32]) -> GridDefinition {
        GridDefinition {
            source: 0,
            num_points: rows.iter().map(|n| *n as usize).sum(),
            optional_list_entry_octets: 2,
            optional_list_interpretation: 1,
            template_number: 40,
            grid: Grid::Grid40(Grid40 {
                header: GridHeader {
                    earth_shape: 6,
                    spherical_radius: ScaledValue { scale: 0, value: 0 },
                    major_axis: ScaledValue { scale: 0, value: 0 },
                    minor_axis: ScaledValue { scale: 0, value: 0 },
                },
                n_i: None,
                n_j: rows.len() as u32,
                initial_prod_basic_angle: BasicAngle {
                    basic_angle: 0,
                    basic_angle_sub: 0,
                },
                la1: 45_000_000,
                lo1: 0,
                resolution_and_component_flags: 48,
                la2: -45_000_000,
                lo2: 359_000_000,
                d_i: None,
                n_parallels: rows.len() as u32 / 2,
                scanning_mode: 0,
            }),
            points_per_row: Some(rows.to_vec().into_boxed_slice()),
        }
    }

    #[test]
    fn reduced_grid_round_trip() {
        let definition = gaussian_reduced(&[2, 4, 2]);

        let mut body = Vec::new();
        definition.write_body(&mut body).unwrap();
        // 9 header octets + 58 template octets + 3 list entries of 2 octets
        assert_eq!(body.len(), 9 + 58 + 6);

        let parsed = GridDefinition::from_slice(&body).unwrap();
        assert_eq!(parsed, definition);
        assert_eq!(
            parsed.shape().unwrap(),
            GridShape::Reduced {
                ny: 3,
                points_per_row: &[2, 4, 2]
            }
        );
    }

    #[test]
    fn unknown_grid_template_is_reported() {
        let mut body = vec![0u8; 9 + 58];
        body[7] = 0;
        body[8] = 90; // template 90, not registered
        assert!(matches!(
            GridDefinition::from_slice(&body),
            Err(GribError::UnknownTemplate {
                section: 3,
                template: 90
            })
        ));
    }

    #[test]
    fn trailing_bytes_without_list_are_rejected() {
        let definition = gaussian_reduced(&[2, 4, 2]);
        let mut body = Vec::new();
        definition.write_body(&mut body).unwrap();
        body[5] = 0; // claim no optional list while the entries remain
        assert!(matches!(
            GridDefinition::from_slice(&body),
            Err(GribError::SectionLengthMismatch { section: 3, .. })
        ));
    }

    #[test]
    fn reduced_grid_needs_row_list() {
        let mut definition = gaussian_reduced(&[2, 4, 2]);
        definition.points_per_row = None;
        assert!(matches!(
            definition.shape(),
            Err(GribError::InvalidGridSpec(_))
        ));
    }
}
