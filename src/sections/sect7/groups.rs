//! The group sub-encoding shared by complex packing (7.2) and complex
//! packing with spatial differencing (7.3): per-group references, widths and
//! lengths are themselves bit-packed, each stream padded to a whole octet.

use crate::error::{GribError, Result};
use crate::sections::sect5::{Data, Data2, Data3, DataRepresentationDefinition, GroupDefinition};
use crate::utils::{bits_for, octet_length, BitWriter, BitwiseIterator};

/// Values per group chosen by the encoder. Any splitting is conformant;
/// fixed spans keep the scaled-length stream empty.
const GROUP_SPAN: usize = 20;

/// Decode the group headers preceding the packed group data. Returns the
/// `(reference, width, length)` triples and the octets they consumed.
pub(crate) fn decode(
    data_repr_def: &DataRepresentationDefinition,
    slice: &[u8],
) -> Result<(Vec<(u64, usize, usize)>, usize)> {
    let (num_bits, group_definition) = match &data_repr_def.data {
        Data::Data2(Data2 {
            num_bits,
            group_definition,
            ..
        }) => (*num_bits, group_definition),
        Data::Data3(Data3 {
            num_bits,
            group_definition,
            ..
        }) => (*num_bits, group_definition),
        _ => {
            return Err(GribError::ParseError(String::from("Wrong decoder")));
        }
    };

    let num_groups = group_definition.num_groups;

    for (what, width) in [
        ("group reference", num_bits),
        ("group width", group_definition.group_widths_num_bits),
        ("scaled group length", group_definition.group_scaled_lengths_num_bits),
    ] {
        if width > 32 {
            return Err(GribError::DecodeError(format!(
                "{} stream {} bits wide",
                what, width
            )));
        }
    }

    let unpack_stream = |start: usize, width: usize| -> Result<Vec<u64>> {
        if width == 0 {
            return Ok(vec![0; num_groups]);
        }
        let end = start + octet_length(width, num_groups);
        let region = slice
            .get(start..end)
            .ok_or(GribError::TruncatedMessage())?;
        let values: Vec<u64> = BitwiseIterator::<u64>::new(region, width)
            .take(num_groups)
            .collect();
        if values.len() != num_groups {
            return Err(GribError::TruncatedMessage());
        }
        Ok(values)
    };

    let references_end = octet_length(num_bits, num_groups);
    let references = unpack_stream(0, num_bits)?;

    let widths_end = references_end + octet_length(group_definition.group_widths_num_bits, num_groups);
    let widths = unpack_stream(references_end, group_definition.group_widths_num_bits)?;

    let lengths_end =
        widths_end + octet_length(group_definition.group_scaled_lengths_num_bits, num_groups);
    let scaled_lengths = unpack_stream(widths_end, group_definition.group_scaled_lengths_num_bits)?;

    let mut groups = Vec::with_capacity(num_groups);
    for index in 0..num_groups {
        let width = u64::from(group_definition.group_widths_reference) + widths[index];
        if width > 32 {
            return Err(GribError::DecodeError(format!(
                "group {} is {} bits wide",
                index, width
            )));
        }
        let length = if index + 1 == num_groups {
            // the packed stream carries an entry for the last group too, but
            // its true length lives in the template
            u64::from(group_definition.group_lengths_last)
        } else {
            u64::from(group_definition.group_lengths_reference)
                + u64::from(group_definition.group_lengths_increment) * scaled_lengths[index]
        };
        groups.push((references[index], width as usize, length as usize));
    }

    Ok((groups, lengths_end))
}

pub(crate) struct EncodedGroups {
    /// Bits per group reference
    pub num_bits: usize,
    pub group_definition: GroupDefinition,
    pub bytes: Vec<u8>,
}

/// Split non-negative integers into fixed-span groups and serialize the
/// reference/width/length streams followed by the packed group data.
pub(crate) fn encode(ints: &[i64]) -> Result<EncodedGroups> {
    if ints.is_empty() {
        return Err(GribError::EncodeError(String::from("empty field")));
    }
    debug_assert!(ints.iter().all(|int| *int >= 0));

    let chunks: Vec<&[i64]> = ints.chunks(GROUP_SPAN).collect();
    let num_groups = chunks.len();

    let mut references = Vec::with_capacity(num_groups);
    let mut widths = Vec::with_capacity(num_groups);
    for chunk in &chunks {
        let min = *chunk.iter().min().unwrap() as u64;
        let max = *chunk.iter().max().unwrap() as u64;
        references.push(min);
        widths.push(bits_for(max - min));
    }

    let num_bits = references.iter().map(|r| bits_for(*r)).max().unwrap();
    let widths_reference = *widths.iter().min().unwrap();
    let widths_num_bits = widths
        .iter()
        .map(|w| bits_for((w - widths_reference) as u64))
        .max()
        .unwrap();

    let data_bits: usize = widths
        .iter()
        .zip(&chunks)
        .map(|(width, chunk)| width * chunk.len())
        .sum();
    let total = octet_length(num_bits, num_groups)
        + octet_length(widths_num_bits, num_groups)
        + (data_bits + 7) / 8;

    let mut bytes = vec![0u8; total];
    let mut writer = BitWriter::new(&mut bytes);
    if num_bits > 0 {
        for reference in &references {
            writer.write_uint(*reference, num_bits)?;
        }
        writer.pad_to_octet();
    }
    if widths_num_bits > 0 {
        for width in &widths {
            writer.write_uint((width - widths_reference) as u64, widths_num_bits)?;
        }
        writer.pad_to_octet();
    }
    // the scaled-length stream is empty: every group but the last spans
    // exactly GROUP_SPAN values
    for ((chunk, reference), width) in chunks.iter().zip(&references).zip(&widths) {
        if *width == 0 {
            continue;
        }
        for int in *chunk {
            writer.write_uint(*int as u64 - reference, *width)?;
        }
    }

    Ok(EncodedGroups {
        num_bits,
        group_definition: GroupDefinition {
            num_groups,
            group_widths_reference: widths_reference as u8,
            group_widths_num_bits: widths_num_bits,
            group_lengths_reference: GROUP_SPAN as u32,
            group_lengths_increment: 1,
            group_lengths_last: chunks.last().unwrap().len() as u32,
            group_scaled_lengths_num_bits: 0,
        },
        bytes,
    })
}
