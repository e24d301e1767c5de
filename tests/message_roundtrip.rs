//! Whole-message encode/decode round trips over synthesized fields.

mod common;

use grib2_codec::codecs::{CodecRegistry, FieldCodec};
use grib2_codec::error::GribError;
use grib2_codec::{Grib, Message, PackingSpec, Result};

fn packed_message(packing: &PackingSpec, values: &[f64], nx: u32, ny: u32) -> Message {
    Message::pack(
        0,
        common::identification(),
        common::regular_latlon(nx, ny),
        common::temperature_at_2m(),
        packing,
        values,
        f64::NAN,
        &CodecRegistry::empty(),
    )
    .unwrap()
}

#[test]
fn simple_message_round_trips_exactly() {
    common::init_logging();

    let values: Vec<f64> = (1..=12).map(f64::from).collect();
    let message = packed_message(
        &PackingSpec::Simple {
            decimal_scale_factor: 0,
            num_bits: 4,
        },
        &values,
        4,
        3,
    );

    let buf = message.write_to_vec().unwrap();
    assert_eq!(&buf[..4], b"GRIB");
    assert_eq!(&buf[buf.len() - 4..], b"7777");
    assert_eq!(
        u64::from_be_bytes(buf[8..16].try_into().unwrap()) as usize,
        buf.len()
    );

    let grib = Grib::from_slice(&buf).unwrap();
    assert_eq!(grib.messages.len(), 1);
    let parsed = &grib.messages[0];
    assert_eq!(parsed.identification, common::identification());
    assert_eq!(parsed.grid_definition, common::regular_latlon(4, 3));
    assert_eq!(parsed.product_definition, common::temperature_at_2m());
    assert_eq!(parsed.data_representation_definition.template_number, 0);

    let decoded = parsed.decode().unwrap();
    assert_eq!(decoded.as_ref(), values.as_slice());
}

#[test]
fn complex_message_round_trips_within_tolerance() {
    let values: Vec<f64> = (0..60)
        .map(|i| 288.0 + 4.0 * (f64::from(i) / 7.0).sin())
        .collect();
    let message = packed_message(
        &PackingSpec::Complex {
            decimal_scale_factor: 2,
        },
        &values,
        10,
        6,
    );

    let buf = message.write_to_vec().unwrap();
    let grib = Grib::from_slice(&buf).unwrap();
    let decoded = grib.messages[0].decode().unwrap();

    assert_eq!(decoded.len(), values.len());
    for (orig, back) in values.iter().zip(decoded.iter()) {
        assert!((orig - back).abs() <= 1e-2, "{} vs {}", orig, back);
    }
}

#[test]
fn spacial_diff_message_round_trips_exactly() {
    let values: Vec<f64> = (0..48).map(|i| f64::from(i * i % 391)).collect();
    for order in [1u8, 2] {
        let message = packed_message(
            &PackingSpec::ComplexSpacialDiff {
                decimal_scale_factor: 0,
                order,
            },
            &values,
            8,
            6,
        );

        let buf = message.write_to_vec().unwrap();
        let grib = Grib::from_slice(&buf).unwrap();
        assert_eq!(
            grib.messages[0].data_representation_definition.template_number,
            3
        );
        let decoded = grib.messages[0].decode().unwrap();
        assert_eq!(decoded.as_ref(), values.as_slice(), "order {}", order);
    }
}

#[test]
fn bitmapped_field_round_trips() {
    let mut values: Vec<f64> = (1..=20).map(f64::from).collect();
    values[3] = f64::NAN;
    values[11] = f64::NAN;
    values[19] = f64::NAN;

    let message = packed_message(
        &PackingSpec::Simple {
            decimal_scale_factor: 0,
            num_bits: 8,
        },
        &values,
        5,
        4,
    );
    // only the 17 present points are packed
    assert_eq!(message.data_representation_definition.num_points, 17);
    assert_eq!(message.bitmap.bitmap_indicator, 0);

    let buf = message.write_to_vec().unwrap();
    let decoded = Grib::from_slice(&buf).unwrap().messages[0].decode().unwrap();

    assert_eq!(decoded.len(), 20);
    for (index, (orig, back)) in values.iter().zip(decoded.iter()).enumerate() {
        if orig.is_nan() {
            assert!(back.is_nan(), "index {}", index);
        } else {
            assert_eq!(orig, back, "index {}", index);
        }
    }
}

#[test]
fn reduced_grid_resamples_onto_regular() {
    let rows = [2u32, 4, 2];
    let values = [0.0, 2.0, 1.0, 2.0, 3.0, 4.0, 10.0, 30.0];
    let message = Message::pack(
        0,
        common::identification(),
        common::reduced_gaussian(&rows),
        common::temperature_at_2m(),
        &PackingSpec::Simple {
            decimal_scale_factor: 1,
            num_bits: 12,
        },
        &values,
        f64::NAN,
        &CodecRegistry::empty(),
    )
    .unwrap();

    let buf = message.write_to_vec().unwrap();
    let grib = Grib::from_slice(&buf).unwrap();

    let (nx, ny, regular) = grib.messages[0]
        .decode_on_regular_grid(&CodecRegistry::empty(), f64::NAN)
        .unwrap();
    assert_eq!((nx, ny), (4, 3));
    assert_eq!(regular.len(), 12);
    // the 2-point rows interpolate around the circle
    assert_eq!(&regular[0..4], &[0.0, 1.0, 2.0, 1.0]);
    assert_eq!(&regular[4..8], &[1.0, 2.0, 3.0, 4.0]);
    assert_eq!(&regular[8..12], &[10.0, 20.0, 30.0, 20.0]);
}

#[test]
fn local_use_section_round_trips() {
    let values: Vec<f64> = (1..=6).map(f64::from).collect();
    let mut message = packed_message(
        &PackingSpec::Simple {
            decimal_scale_factor: 0,
            num_bits: 8,
        },
        &values,
        3,
        2,
    );
    message.local_use = Some(b"experiment 42".to_vec().into_boxed_slice());

    let buf = message.write_to_vec().unwrap();
    let grib = Grib::from_slice(&buf).unwrap();
    assert_eq!(
        grib.messages[0].local_use.as_deref(),
        Some(b"experiment 42".as_slice())
    );
}

#[test]
fn concatenated_messages_all_parse() {
    let first: Vec<f64> = (1..=12).map(f64::from).collect();
    let second: Vec<f64> = (1..=12).map(|i| f64::from(i) * 0.5).collect();

    let mut buf = packed_message(
        &PackingSpec::Simple {
            decimal_scale_factor: 0,
            num_bits: 6,
        },
        &first,
        4,
        3,
    )
    .write_to_vec()
    .unwrap();
    buf.extend_from_slice(
        &packed_message(
            &PackingSpec::Simple {
                decimal_scale_factor: 1,
                num_bits: 8,
            },
            &second,
            4,
            3,
        )
        .write_to_vec()
        .unwrap(),
    );

    let grib = Grib::from_slice(&buf).unwrap();
    assert_eq!(grib.messages.len(), 2);
    assert_eq!(grib.messages[0].decode().unwrap().as_ref(), &first[..]);
    let decoded = grib.messages[1].decode().unwrap();
    for (orig, back) in second.iter().zip(decoded.iter()) {
        assert!((orig - back).abs() <= 1e-1);
    }
}

/// Stand-in external compressor: stores each integer as four raw octets.
struct RawPlaneCodec {}

impl FieldCodec for RawPlaneCodec {
    fn compress(
        &self,
        values: &[u32],
        _num_bits: usize,
        _width: usize,
        _height: usize,
    ) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(values.len() * 4);
        for value in values {
            out.extend_from_slice(&value.to_be_bytes());
        }
        Ok(out)
    }

    fn decompress(&self, data: &[u8], _num_bits: usize, num_points: usize) -> Result<Vec<u32>> {
        let values: Vec<u32> = data
            .chunks_exact(4)
            .map(|chunk| u32::from_be_bytes(chunk.try_into().unwrap()))
            .collect();
        assert_eq!(values.len(), num_points);
        Ok(values)
    }
}

#[test]
fn injected_codec_round_trips_and_absence_is_reported() {
    let values: Vec<f64> = (0..30).map(|i| 1000.0 + f64::from(i) * 0.25).collect();

    let mut codecs = CodecRegistry::empty();
    codecs.register_jpeg2000(Box::new(RawPlaneCodec {}));

    let message = Message::pack(
        0,
        common::identification(),
        common::regular_latlon(6, 5),
        common::temperature_at_2m(),
        &PackingSpec::Jpeg2000 {
            decimal_scale_factor: 2,
            num_bits: 16,
        },
        &values,
        f64::NAN,
        &codecs,
    )
    .unwrap();
    assert_eq!(message.data_representation_definition.template_number, 40);

    let buf = message.write_to_vec().unwrap();
    let grib = Grib::from_slice(&buf).unwrap();

    // without the codec the decode is a configuration error
    assert!(matches!(
        grib.messages[0].decode_with(&CodecRegistry::empty(), f64::NAN),
        Err(GribError::CodecUnavailable("jpeg2000"))
    ));

    let decoded = grib.messages[0].decode_with(&codecs, f64::NAN).unwrap();
    for (orig, back) in values.iter().zip(decoded.iter()) {
        assert!((orig - back).abs() <= 1e-2, "{} vs {}", orig, back);
    }
}

#[test]
fn packing_without_required_codec_is_reported() {
    let values = vec![1.0, 2.0, 3.0, 4.0];
    let result = Message::pack(
        0,
        common::identification(),
        common::regular_latlon(2, 2),
        common::temperature_at_2m(),
        &PackingSpec::Png {
            decimal_scale_factor: 0,
            num_bits: 8,
        },
        &values,
        f64::NAN,
        &CodecRegistry::empty(),
    );
    assert!(matches!(result, Err(GribError::CodecUnavailable("png"))));
}

#[cfg(feature = "png-codec")]
#[test]
fn png_packed_message_round_trips() {
    let values: Vec<f64> = (0..42).map(|i| 500.0 + f64::from(i) * 1.5).collect();
    let codecs = CodecRegistry::with_defaults();

    let message = Message::pack(
        0,
        common::identification(),
        common::regular_latlon(7, 6),
        common::temperature_at_2m(),
        &PackingSpec::Png {
            decimal_scale_factor: 1,
            num_bits: 12,
        },
        &values,
        f64::NAN,
        &codecs,
    )
    .unwrap();
    assert_eq!(message.data_representation_definition.template_number, 41);

    let buf = message.write_to_vec().unwrap();
    let decoded = Grib::from_slice(&buf).unwrap().messages[0]
        .decode_with(&codecs, f64::NAN)
        .unwrap();
    for (orig, back) in values.iter().zip(decoded.iter()) {
        assert!((orig - back).abs() <= 1e-1, "{} vs {}", orig, back);
    }
}

#[test]
fn grid_field_size_mismatch_is_reported() {
    let values = vec![1.0; 11];
    let result = Message::pack(
        0,
        common::identification(),
        common::regular_latlon(4, 3),
        common::temperature_at_2m(),
        &PackingSpec::Simple {
            decimal_scale_factor: 0,
            num_bits: 8,
        },
        &values,
        f64::NAN,
        &CodecRegistry::empty(),
    );
    assert!(matches!(result, Err(GribError::InvalidGridSpec(_))));
}
