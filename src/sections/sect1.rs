use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};

use crate::error::{GribError, Result};
use crate::read_as;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification {
    /// Identification of originating/generating centre (see Common Code Table C-1)
    pub centre_id: u16,
    /// Identification of originating/generating sub-centre (allocated by originating/ generating centre)
    pub subcentre_id: u16,
    /// GRIB Master Tables Version Number (see Code Table 1.0)
    pub master_table_version: u8,
    /// GRIB Local Tables Version Number (see Code Table 1.1)
    pub local_table_version: u8,
    /// Significance of Reference Time (see Code Table 1.2)
    pub ref_time_significance: u8,
    /// Reference time of data
    pub ref_time: DateTime<Utc>,
    /// Production status of processed data in this GRIB message
    /// (see Code Table 1.3)
    pub prod_status: u8,
    /// Type of processed data in this GRIB message (see Code Table 1.4)
    pub data_type: u8,
}

impl Identification {
    pub(crate) fn from_slice(body: &[u8]) -> Result<Self> {
        // octets 6-21; centres may append reserved octets, which are skipped
        if body.len() < 16 {
            return Err(GribError::TruncatedMessage());
        }

        let year = read_as!(u16, body, 7);
        let ref_time = NaiveDate::from_ymd_opt(year as i32, body[9] as u32, body[10] as u32)
            .and_then(|date| {
                date.and_hms_opt(body[11] as u32, body[12] as u32, body[13] as u32)
            })
            .ok_or_else(|| {
                GribError::ParseError(format!(
                    "invalid reference time {}-{:02}-{:02} {:02}:{:02}:{:02}",
                    year, body[9], body[10], body[11], body[12], body[13]
                ))
            })?;

        Ok(Identification {
            centre_id: read_as!(u16, body, 0),
            subcentre_id: read_as!(u16, body, 2),
            master_table_version: body[4],
            local_table_version: body[5],
            ref_time_significance: body[6],
            ref_time: DateTime::<Utc>::from_naive_utc_and_offset(ref_time, Utc),
            prod_status: body[14],
            data_type: body[15],
        })
    }

    pub(crate) fn write_body(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(&self.centre_id.to_be_bytes());
        out.extend_from_slice(&self.subcentre_id.to_be_bytes());
        out.push(self.master_table_version);
        out.push(self.local_table_version);
        out.push(self.ref_time_significance);
        out.extend_from_slice(&(self.ref_time.year() as u16).to_be_bytes());
        out.push(self.ref_time.month() as u8);
        out.push(self.ref_time.day() as u8);
        out.push(self.ref_time.hour() as u8);
        out.push(self.ref_time.minute() as u8);
        out.push(self.ref_time.second() as u8);
        out.push(self.prod_status);
        out.push(self.data_type);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn identification_round_trip() {
        let identification = Identification {
            centre_id: 7,
            subcentre_id: 0,
            master_table_version: 2,
            local_table_version: 1,
            ref_time_significance: 1,
            ref_time: Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
            prod_status: 0,
            data_type: 1,
        };

        let mut body = Vec::new();
        identification.write_body(&mut body).unwrap();
        assert_eq!(body.len(), 16);
        assert_eq!(Identification::from_slice(&body).unwrap(), identification);
    }

    #[test]
    fn invalid_date_is_reported() {
        let mut body = vec![0u8; 16];
        body[9] = 13; // month
        assert!(matches!(
            Identification::from_slice(&body),
            Err(GribError::ParseError(_))
        ));
    }
}
