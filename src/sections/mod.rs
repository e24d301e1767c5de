use crate::error::Result;
use crate::sections::sect1::Identification;
use crate::sections::sect3::GridDefinition;
use crate::sections::sect4::ProductDefinition;
use crate::sections::sect5::DataRepresentationDefinition;
use crate::sections::sect6::BitMap;

pub mod sect1;
pub mod sect3;
pub mod sect4;
pub mod sect5;
pub mod sect6;
pub mod sect7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    /// Discipline - GRIB Master Table Number (see Code Table 0.0)
    pub discipline: u8,
    /// Total length of GRIB message in octets (including Section 0)
    pub total_length: u64,
}

pub enum Section {
    Section0(Indicator),
    Section1(Identification),
    Section2(Box<[u8]>),
    Section3(GridDefinition),
    Section4(ProductDefinition),
    Section5(DataRepresentationDefinition),
    Section6(BitMap),
    Section7(Box<[u8]>),
    Section8,
}

/// Append a section with its 4-byte length and 1-byte number header. The
/// length is backpatched once the body closure has run.
pub(crate) fn write_section<F>(out: &mut Vec<u8>, number: u8, body: F) -> Result<()>
where
    F: FnOnce(&mut Vec<u8>) -> Result<()>,
{
    let start = out.len();
    out.extend_from_slice(&[0, 0, 0, 0, number]);
    body(out)?;
    let length = (out.len() - start) as u32;
    out[start..start + 4].copy_from_slice(&length.to_be_bytes());
    Ok(())
}
