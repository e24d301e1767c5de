use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};

use crate::error::{GribError, Result};
use crate::read_as;
use crate::templates;
use crate::utils::BitReader;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDefinition {
    /// Number of coordinate values after Template
    pub num_coordinates: u16,
    /// Product Definition Template Number
    pub template_number: u16,
    pub product: Product,
    pub coordinates: Option<Box<[u8]>>,
}

impl ProductDefinition {
    pub(crate) fn from_slice(body: &[u8]) -> Result<Self> {
        if body.len() < 4 {
            return Err(GribError::TruncatedMessage());
        }

        let num_coordinates = read_as!(u16, body, 0);
        let template_number = read_as!(u16, body, 2);

        let fields = templates::lookup(4, template_number)?;
        let mut reader = BitReader::new(&body[4..]);
        let values = templates::decode_fields(fields, &mut reader)?;

        let coordinate_octets = 4 * num_coordinates as usize;
        let remaining = body.len() - 4 - reader.position();
        if remaining != coordinate_octets {
            return Err(GribError::SectionLengthMismatch {
                section: 4,
                declared: body.len() + 5,
                consumed: 5 + 4 + reader.position() + coordinate_octets,
            });
        }

        let coordinates = if coordinate_octets > 0 {
            Some(reader.read_octets(coordinate_octets)?.to_vec().into_boxed_slice())
        } else {
            None
        };

        Ok(ProductDefinition {
            num_coordinates,
            template_number,
            product: Product::from_values(template_number, &values)?,
            coordinates,
        })
    }

    pub(crate) fn write_body(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&self.num_coordinates.to_be_bytes());
        out.extend_from_slice(&self.template_number.to_be_bytes());

        let fields = templates::lookup(4, self.template_number)?;
        templates::encode_fields(fields, &self.product.to_values(), out)?;

        if let Some(coordinates) = &self.coordinates {
            out.extend_from_slice(coordinates);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Product {
    Product0(Product0),
    Product1(Product1),
    Product8(Product8),
}

impl Product {
    pub(crate) fn from_values(template_number: u16, values: &[i64]) -> Result<Self> {
        match template_number {
            0 => Ok(Product::Product0(Product0::from_values(values))),
            1 => Ok(Product::Product1(Product1 {
                base: Product0::from_values(&values[..15]),
                ensemble_type: values[15] as u8,
                perturbation_number: values[16] as u8,
                num_ensemble_members: values[17] as u8,
            })),
            8 => Ok(Product::Product8(Product8::from_values(values)?)),
            n => Err(GribError::UnknownTemplate {
                section: 4,
                template: n,
            }),
        }
    }

    pub(crate) fn to_values(&self) -> Vec<i64> {
        match self {
            Product::Product0(product) => product.to_values(),
            Product::Product1(product) => {
                let mut v = product.base.to_values();
                v.push(product.ensemble_type as i64);
                v.push(product.perturbation_number as i64);
                v.push(product.num_ensemble_members as i64);
                v
            }
            Product::Product8(product) => product.to_values(),
        }
    }
}

/// Product Definition Template 4.0: analysis or forecast at a horizontal
/// level or in a horizontal layer at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product0 {
    /// Parameter category (see Code Table 4.1)
    pub parameter_category: u8,
    /// Parameter number (see Code Table 4.2)
    pub parameter_number: u8,
    /// Type of generating process (see Code Table 4.3)
    pub process_type: u8,
    pub background_process: u8,
    pub analysis_process: u8,
    pub cutoff_hours: u16,
    pub cutoff_minutes: u8,
    /// Indicator of unit of time range (see Code Table 4.4)
    pub time_unit: u8,
    /// Forecast time in units defined by `time_unit`
    pub forecast_time_value: i32,
    pub first_surface: Surface,
    pub second_surface: Surface,
}

impl Product0 {
    fn from_values(v: &[i64]) -> Self {
        Product0 {
            parameter_category: v[0] as u8,
            parameter_number: v[1] as u8,
            process_type: v[2] as u8,
            background_process: v[3] as u8,
            analysis_process: v[4] as u8,
            cutoff_hours: v[5] as u16,
            cutoff_minutes: v[6] as u8,
            time_unit: v[7] as u8,
            forecast_time_value: v[8] as i32,
            first_surface: Surface {
                surface_type: v[9] as u8,
                scale_factor: v[10] as i8,
                scaled_value: v[11] as u32,
            },
            second_surface: Surface {
                surface_type: v[12] as u8,
                scale_factor: v[13] as i8,
                scaled_value: v[14] as u32,
            },
        }
    }

    fn to_values(&self) -> Vec<i64> {
        vec![
            self.parameter_category as i64,
            self.parameter_number as i64,
            self.process_type as i64,
            self.background_process as i64,
            self.analysis_process as i64,
            self.cutoff_hours as i64,
            self.cutoff_minutes as i64,
            self.time_unit as i64,
            self.forecast_time_value as i64,
            self.first_surface.surface_type as i64,
            self.first_surface.scale_factor as i64,
            self.first_surface.scaled_value as i64,
            self.second_surface.surface_type as i64,
            self.second_surface.scale_factor as i64,
            self.second_surface.scaled_value as i64,
        ]
    }

    /// Forecast time as a duration, resolved through the unit indicator.
    pub fn forecast_time(&self) -> Result<Duration> {
        let value = self.forecast_time_value as i64;
        match self.time_unit {
            0 => Ok(Duration::minutes(value)),
            1 => Ok(Duration::hours(value)),
            2 => Ok(Duration::days(value)),
            3 => Ok(Duration::days(30 * value)),
            4 => Ok(Duration::days(365 * value)),
            5 => Ok(Duration::days(10 * 365 * value)),
            6 => Ok(Duration::days(30 * 365 * value)),
            7 => Ok(Duration::days(100 * 365 * value)),
            10 => Ok(Duration::hours(3 * value)),
            11 => Ok(Duration::hours(6 * value)),
            12 => Ok(Duration::hours(12 * value)),
            13 => Ok(Duration::seconds(value)),
            n => Err(GribError::ParseError(format!(
                "Forecast Time Unit `{}` does not exist.",
                n
            ))),
        }
    }
}

/// Product Definition Template 4.1: individual ensemble forecast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product1 {
    pub base: Product0,
    /// Type of ensemble forecast (see Code Table 4.6)
    pub ensemble_type: u8,
    pub perturbation_number: u8,
    pub num_ensemble_members: u8,
}

/// Product Definition Template 4.8: average, accumulation or extreme over a
/// time interval, with a single time-range specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product8 {
    pub base: Product0,
    /// End of the overall time interval
    pub end_of_interval: DateTime<Utc>,
    pub num_time_ranges: u8,
    pub num_missing_values: u32,
    /// Statistical process (see Code Table 4.10)
    pub statistical_process: u8,
    /// Type of time increment between successive fields (see Code Table 4.11)
    pub time_increment_type: u8,
    pub range_time_unit: u8,
    pub range_length: u32,
    pub increment_time_unit: u8,
    pub time_increment: u32,
}

impl Product8 {
    fn from_values(v: &[i64]) -> Result<Self> {
        let end_of_interval =
            NaiveDate::from_ymd_opt(v[15] as i32, v[16] as u32, v[17] as u32)
                .and_then(|date| date.and_hms_opt(v[18] as u32, v[19] as u32, v[20] as u32))
                .ok_or_else(|| {
                    GribError::ParseError(format!(
                        "invalid end of interval {}-{:02}-{:02}",
                        v[15], v[16], v[17]
                    ))
                })?;

        Ok(Product8 {
            base: Product0::from_values(&v[..15]),
            end_of_interval: DateTime::<Utc>::from_naive_utc_and_offset(end_of_interval, Utc),
            num_time_ranges: v[21] as u8,
            num_missing_values: v[22] as u32,
            statistical_process: v[23] as u8,
            time_increment_type: v[24] as u8,
            range_time_unit: v[25] as u8,
            range_length: v[26] as u32,
            increment_time_unit: v[27] as u8,
            time_increment: v[28] as u32,
        })
    }

    fn to_values(&self) -> Vec<i64> {
        let mut v = self.base.to_values();
        v.push(self.end_of_interval.year() as i64);
        v.push(self.end_of_interval.month() as i64);
        v.push(self.end_of_interval.day() as i64);
        v.push(self.end_of_interval.hour() as i64);
        v.push(self.end_of_interval.minute() as i64);
        v.push(self.end_of_interval.second() as i64);
        v.push(self.num_time_ranges as i64);
        v.push(self.num_missing_values as i64);
        v.push(self.statistical_process as i64);
        v.push(self.time_increment_type as i64);
        v.push(self.range_time_unit as i64);
        v.push(self.range_length as i64);
        v.push(self.increment_time_unit as i64);
        v.push(self.time_increment as i64);
        v
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Surface {
    /// Type of fixed surface (see Code Table 4.5)
    pub surface_type: u8,
    pub scale_factor: i8,
    pub scaled_value: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forecast_product(hours: i32) -> ProductDefinition {
        ProductDefinition {
            num_coordinates: 0,
            template_number: 0,
            product: Product::Product0(Product0 {
                parameter_category: 2,
                parameter_number: 2,
                process_type: 2,
                background_process: 0,
                analysis_process: 96,
                cutoff_hours: 0,
                cutoff_minutes: 0,
                time_unit: 1,
                forecast_time_value: hours,
                first_surface: Surface {
                    surface_type: 103,
                    scale_factor: 0,
                    scaled_value: 10,
                },
                second_surface: Surface {
                    surface_type: 255,
                    scale_factor: 0,
                    scaled_value: 0,
                },
            }),
            coordinates: None,
        }
    }

    #[test]
    fn product_round_trip() {
        let definition = forecast_product(6);

        let mut body = Vec::new();
        definition.write_body(&mut body).unwrap();
        assert_eq!(body.len(), 4 + 25);

        let parsed = ProductDefinition::from_slice(&body).unwrap();
        assert_eq!(parsed, definition);
    }

    #[test]
    fn forecast_time_units() {
        let definition = forecast_product(6);
        let Product::Product0(product) = &definition.product else {
            unreachable!()
        };
        assert_eq!(product.forecast_time().unwrap(), Duration::hours(6));

        let mut minutes = product.clone();
        minutes.time_unit = 0;
        assert_eq!(minutes.forecast_time().unwrap(), Duration::minutes(6));

        let mut bogus = product.clone();
        bogus.time_unit = 200;
        assert!(matches!(
            bogus.forecast_time(),
            Err(GribError::ParseError(_))
        ));
    }

    #[test]
    fn coordinate_count_mismatch_is_reported() {
        let definition = forecast_product(6);
        let mut body = Vec::new();
        definition.write_body(&mut body).unwrap();
        body[1] = 2; // claim 2 coordinate values that are not there
        assert!(matches!(
            ProductDefinition::from_slice(&body),
            Err(GribError::SectionLengthMismatch { section: 4, .. })
        ));
    }
}
