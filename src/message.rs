use std::io::Read;

use log::{debug, warn};

use crate::codecs::CodecRegistry;
use crate::error::{GribError, Result};
use crate::read_as;
use crate::regrid;
use crate::sections::sect1::Identification;
use crate::sections::sect3::{GridDefinition, GridShape};
use crate::sections::sect4::ProductDefinition;
use crate::sections::sect5::DataRepresentationDefinition;
use crate::sections::sect6::BitMap;
use crate::sections::sect7::{self, PackingSpec};
use crate::sections::{write_section, Indicator, Section};

const SECT0_IS_MAGIC: &[u8] = b"GRIB";
const SECT0_IS_MAGIC_SIZE: usize = SECT0_IS_MAGIC.len();
const SECT0_IS_SIZE: usize = 16;
const SECT_HEADER_SIZE: usize = 5;
const SECT8_ES_MAGIC: &[u8] = b"7777";
const SECT8_ES_SIZE: usize = SECT8_ES_MAGIC.len();

pub struct Grib {
    pub messages: Vec<Message>,
}

impl Grib {
    /// Strict parse of a (possibly concatenated) GRIB2 stream: the first
    /// failing message aborts. Use [`Grib::scan`] to keep going past
    /// damaged messages.
    pub fn from_slice(buf: &[u8]) -> Result<Grib> {
        let mut messages = Vec::new();
        for message in Grib::scan(buf) {
            messages.push(message?);
        }
        Ok(Grib { messages })
    }

    /// Iterate the messages of a byte stream. Each damaged message is
    /// reported in place and the scan resumes at the next `GRIB` magic.
    pub fn scan(buf: &[u8]) -> MessageScan<'_> {
        MessageScan {
            buf,
            pos: 0,
            previous_bitmap: None,
        }
    }

    /// Read a whole stream into memory and parse it. The host I/O layer
    /// owns actual file handling; this is a convenience over it.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Grib> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Self::from_slice(&buf)
    }
}

pub struct MessageScan<'a> {
    buf: &'a [u8],
    pos: usize,
    previous_bitmap: Option<Box<[u8]>>,
}

impl<'a> Iterator for MessageScan<'a> {
    type Item = Result<Message>;

    fn next(&mut self) -> Option<Self::Item> {
        // hunt for the indicator magic; anything in between is padding or
        // wreckage from an earlier bad message
        loop {
            if self.pos + SECT0_IS_MAGIC_SIZE > self.buf.len() {
                return None;
            }
            if &self.buf[self.pos..self.pos + SECT0_IS_MAGIC_SIZE] == SECT0_IS_MAGIC {
                break;
            }
            self.pos += 1;
        }

        let start = self.pos;
        if start + SECT0_IS_SIZE > self.buf.len() {
            self.pos = self.buf.len();
            return Some(Err(GribError::TruncatedMessage()));
        }

        let total_length = read_as!(u64, self.buf, start + 8) as usize;
        if total_length < SECT0_IS_SIZE + SECT8_ES_SIZE
            || start + total_length > self.buf.len()
        {
            warn!(
                "message at offset {} declares {} octets, {} available",
                start,
                total_length,
                self.buf.len() - start
            );
            // the declared length is useless for resync, skip this magic
            self.pos = start + SECT0_IS_MAGIC_SIZE;
            return Some(Err(GribError::TruncatedMessage()));
        }

        let message = parse_message(
            &self.buf[start..start + total_length],
            &mut self.previous_bitmap,
        );
        self.pos = start + total_length;
        if let Err(e) = &message {
            warn!("skipping message at offset {} : {}", start, e);
        }
        Some(message)
    }
}

pub struct Message {
    pub indicator: Indicator,
    pub identification: Identification,
    pub local_use: Option<Box<[u8]>>,
    pub grid_definition: GridDefinition,
    pub product_definition: ProductDefinition,
    pub data_representation_definition: DataRepresentationDefinition,
    pub bitmap: BitMap,
    pub data: Box<[u8]>,
}

impl Message {
    /// Unpack the field with the codecs this build carries and NaN as the
    /// missing sentinel.
    pub fn decode(&self) -> Result<Box<[f64]>> {
        self.decode_with(&CodecRegistry::default(), f64::NAN)
    }

    /// Unpack the field through an explicit codec registry, filling points
    /// the bit map marks absent with `missing`.
    pub fn decode_with(&self, codecs: &CodecRegistry, missing: f64) -> Result<Box<[f64]>> {
        sect7::unpack(
            &self.data_representation_definition,
            &self.bitmap,
            &self.data,
            self.grid_definition.num_points,
            codecs,
            missing,
        )
    }

    /// Unpack and, when the grid is reduced, resample onto the full regular
    /// grid. Returns `(nx, ny, values)` in row-major order.
    pub fn decode_on_regular_grid(
        &self,
        codecs: &CodecRegistry,
        missing: f64,
    ) -> Result<(usize, usize, Box<[f64]>)> {
        let values = self.decode_with(codecs, missing)?;
        match self.grid_definition.shape()? {
            GridShape::Regular { nx, ny } => Ok((nx, ny, values)),
            GridShape::Reduced { ny, points_per_row } => {
                let nx_max = points_per_row
                    .iter()
                    .map(|n| *n as usize)
                    .max()
                    .unwrap_or(0);
                let regular =
                    regrid::reduced_to_regular(&values, points_per_row, nx_max, missing)?;
                Ok((nx_max, ny, regular.into_boxed_slice()))
            }
        }
    }

    /// Assemble a message around a packed field. Points equal to `missing`
    /// are carried through a bit map.
    #[allow(clippy::too_many_arguments)]
    pub fn pack(
        discipline: u8,
        identification: Identification,
        grid_definition: GridDefinition,
        product_definition: ProductDefinition,
        packing: &PackingSpec,
        values: &[f64],
        missing: f64,
        codecs: &CodecRegistry,
    ) -> Result<Message> {
        let expected = match grid_definition.shape()? {
            GridShape::Regular { nx, ny } => nx * ny,
            GridShape::Reduced { points_per_row, .. } => {
                points_per_row.iter().map(|n| *n as usize).sum()
            }
        };
        if expected != values.len() {
            return Err(GribError::InvalidGridSpec(format!(
                "grid holds {} points, field has {} values",
                expected,
                values.len()
            )));
        }
        if grid_definition.num_points != values.len() {
            return Err(GribError::InvalidGridSpec(format!(
                "grid definition declares {} points, field has {} values",
                grid_definition.num_points,
                values.len()
            )));
        }

        let (data_representation_definition, bitmap, data) =
            sect7::pack_values(packing, values, missing, codecs)?;

        Ok(Message {
            indicator: Indicator {
                discipline,
                total_length: 0, // computed on write
            },
            identification,
            local_use: None,
            grid_definition,
            product_definition,
            data_representation_definition,
            bitmap,
            data,
        })
    }

    /// Serialize the message, backpatching every section length and the
    /// total length in the indicator section.
    pub fn write_to_vec(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();

        out.extend_from_slice(SECT0_IS_MAGIC);
        out.extend_from_slice(&[0, 0]);
        out.push(self.indicator.discipline);
        out.push(2);
        out.extend_from_slice(&0u64.to_be_bytes());

        write_section(&mut out, 1, |out| self.identification.write_body(out))?;
        if let Some(local_use) = &self.local_use {
            write_section(&mut out, 2, |out| {
                out.extend_from_slice(local_use);
                Ok(())
            })?;
        }
        write_section(&mut out, 3, |out| self.grid_definition.write_body(out))?;
        write_section(&mut out, 4, |out| self.product_definition.write_body(out))?;
        write_section(&mut out, 5, |out| {
            self.data_representation_definition.write_body(out)
        })?;
        write_section(&mut out, 6, |out| self.bitmap.write_body(out))?;
        write_section(&mut out, 7, |out| {
            out.extend_from_slice(&self.data);
            Ok(())
        })?;
        out.extend_from_slice(SECT8_ES_MAGIC);

        let total_length = out.len() as u64;
        out[8..16].copy_from_slice(&total_length.to_be_bytes());
        Ok(out)
    }
}

fn parse_message(buf: &[u8], previous_bitmap: &mut Option<Box<[u8]>>) -> Result<Message> {
    if buf.len() < SECT0_IS_SIZE {
        return Err(GribError::TruncatedMessage());
    }
    if &buf[..SECT0_IS_MAGIC_SIZE] != SECT0_IS_MAGIC {
        return Err(GribError::NotGrib());
    }
    let version = buf[7];
    if version != 2 {
        return Err(GribError::EditionMismatch(version));
    }
    let indicator = Indicator {
        discipline: buf[6],
        total_length: read_as!(u64, buf, 8),
    };
    if indicator.total_length as usize != buf.len() {
        return Err(GribError::TruncatedMessage());
    }

    let mut sections = vec![Section::Section0(indicator.clone())];
    let mut pos = SECT0_IS_SIZE;
    loop {
        let remaining = buf.len() - pos;
        if remaining == SECT8_ES_SIZE {
            if &buf[pos..] != SECT8_ES_MAGIC {
                return Err(GribError::EndSectionMismatch());
            }
            sections.push(Section::Section8);
            break;
        }
        if remaining < SECT_HEADER_SIZE + SECT8_ES_SIZE {
            return Err(GribError::TruncatedMessage());
        }

        let size = read_as!(u32, buf, pos) as usize;
        let number = buf[pos + 4];
        debug!(
            "Read section {} : {}(-{} : {})",
            number,
            size,
            SECT_HEADER_SIZE,
            size.saturating_sub(SECT_HEADER_SIZE)
        );
        if size < SECT_HEADER_SIZE {
            return Err(GribError::ParseError(format!(
                "section {} declares {} octets",
                number, size
            )));
        }
        if pos + size > buf.len() - SECT8_ES_SIZE {
            return Err(GribError::TruncatedMessage());
        }

        let body = &buf[pos + SECT_HEADER_SIZE..pos + size];
        let section = match number {
            1 => Section::Section1(Identification::from_slice(body)?),
            2 => Section::Section2(body.to_vec().into_boxed_slice()),
            3 => Section::Section3(GridDefinition::from_slice(body)?),
            4 => Section::Section4(ProductDefinition::from_slice(body)?),
            5 => Section::Section5(DataRepresentationDefinition::from_slice(body)?),
            6 => Section::Section6(BitMap::from_slice(body)?),
            7 => Section::Section7(body.to_vec().into_boxed_slice()),
            n => {
                return Err(GribError::UnknownSection(n));
            }
        };
        sections.push(section);
        pos += size;
    }

    let mut indicator = None;
    let mut identification = None;
    let mut local_use = None;
    let mut grid_definition = None;
    let mut product_definition = None;
    let mut data_representation_definition = None;
    let mut bitmap = None;
    let mut data = None;

    for section in sections {
        match section {
            Section::Section0(section) => indicator = Some(section),
            Section::Section1(section) => identification = Some(section),
            Section::Section2(section) => local_use = Some(section),
            Section::Section3(section) => grid_definition = Some(section),
            Section::Section4(section) => product_definition = Some(section),
            Section::Section5(section) => data_representation_definition = Some(section),
            Section::Section6(section) => bitmap = Some(section),
            Section::Section7(section) => data = Some(section),
            Section::Section8 => {}
        }
    }

    let mut bitmap = bitmap.unwrap_or_else(BitMap::none);
    match bitmap.bitmap_indicator {
        0 => *previous_bitmap = Some(bitmap.bitmap.clone()),
        254 => {
            bitmap.bitmap = previous_bitmap.clone().ok_or_else(|| {
                GribError::DecodeError(String::from(
                    "no previously defined bit map in this stream",
                ))
            })?;
        }
        _ => {}
    }

    Ok(Message {
        indicator: indicator
            .ok_or_else(|| GribError::ParseError(String::from("Missing Section 0")))?,
        identification: identification
            .ok_or_else(|| GribError::ParseError(String::from("Missing Section 1")))?,
        local_use,
        grid_definition: grid_definition
            .ok_or_else(|| GribError::ParseError(String::from("Missing Section 3")))?,
        product_definition: product_definition
            .ok_or_else(|| GribError::ParseError(String::from("Missing Section 4")))?,
        data_representation_definition: data_representation_definition
            .ok_or_else(|| GribError::ParseError(String::from("Missing Section 5")))?,
        bitmap,
        data: data.ok_or_else(|| GribError::ParseError(String::from("Missing Section 7")))?,
    })
}
