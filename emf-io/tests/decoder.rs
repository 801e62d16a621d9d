mod builder;

use builder::{
    RecordBuilder, described_header_fields, eof_record, header_fields, header_record,
    info_header, rectangle, stream,
};
use emf_core::geometry::{PointL, RectL, SizeL};
use emf_core::record::{EMF_SIGNATURE, Record, record_type, text_options};
use emf_io::{
    DecodeError, DiagnosticKind, EmfFacade, IoError, MetafileLoader, decode_metafile,
    decode_record,
};

#[test]
fn minimal_stream_decodes_completely() {
    let bytes = stream(&[
        header_record([0, 0, 100, 100]),
        rectangle(10, 10, 50, 50),
        eof_record(),
    ]);
    let outcome = decode_metafile(&bytes).expect("解码失败");

    assert!(outcome.is_complete());
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    assert_eq!(outcome.metafile.header().bounds, RectL::new(0, 0, 100, 100));
    assert_eq!(outcome.metafile.header().header_size, 88);
    assert_eq!(
        outcome.metafile.records(),
        &[Record::Rectangle {
            bounds: RectL::new(10, 10, 50, 50)
        }]
    );
    assert_eq!(outcome.metafile.eof().map(|eof| eof.size_last), Some(20));
}

#[test]
fn consumed_bytes_follow_the_declared_size() {
    let padded = RecordBuilder::new(record_type::SETBKMODE)
        .u32(1)
        .pad_to(24)
        .build();
    let mut bytes = padded.clone();
    bytes.extend(rectangle(0, 0, 1, 1));

    let (record, consumed) = decode_record(&bytes).expect("解码失败");
    assert_eq!(record, Record::SetBkMode { mode: 1 });
    assert_eq!(consumed, 24);

    let (next, consumed) = decode_record(&bytes[24..]).expect("解码第二条记录失败");
    assert_eq!(next.record_type(), record_type::RECTANGLE);
    assert_eq!(consumed, 24);
}

#[test]
fn unknown_records_become_opaque_and_decoding_continues() {
    let bytes = stream(&[
        header_record([0, 0, 10, 10]),
        RecordBuilder::new(record_type::SAVEDC).build(),
        RecordBuilder::new(0x0200).u32(7).u32(9).build(),
        RecordBuilder::new(record_type::RESTOREDC).i32(-1).build(),
        eof_record(),
    ]);
    let outcome = decode_metafile(&bytes).expect("解码失败");

    assert_eq!(
        outcome.metafile.records(),
        &[
            Record::SaveDc,
            Record::Opaque {
                record_type: 0x0200,
                size: 16
            },
            Record::RestoreDc { saved_dc: -1 },
        ]
    );
    assert_eq!(outcome.diagnostics.len(), 1);
    let diagnostic = &outcome.diagnostics[0];
    assert_eq!(diagnostic.kind, DiagnosticKind::UnknownRecordType);
    assert_eq!(diagnostic.index, Some(1));
    assert_eq!(diagnostic.offset, 88 + 8);

    let json = serde_json::to_value(diagnostic).expect("序列化诊断失败");
    assert_eq!(json["kind"], "unknown_record_type");
    assert_eq!(json["record_type"], 0x0200);
}

#[test]
fn recognised_but_undecoded_records_are_skipped_quietly() {
    let bytes = stream(&[
        header_record([0, 0, 10, 10]),
        RecordBuilder::new(record_type::GRADIENTFILL)
            .rect(0, 0, 5, 5)
            .u32(0)
            .u32(0)
            .u32(0)
            .build(),
        eof_record(),
    ]);
    let outcome = decode_metafile(&bytes).expect("解码失败");
    assert!(outcome.metafile.records()[0].is_opaque());
    assert!(outcome.diagnostics.is_empty());
}

#[test]
fn truncated_stream_keeps_decoded_prefix() {
    let mut truncated = RecordBuilder::new(record_type::RECTANGLE)
        .rect(0, 0, 5, 5)
        .pad_to(40)
        .build();
    truncated.truncate(20);
    let bytes = stream(&[
        header_record([0, 0, 10, 10]),
        rectangle(1, 2, 3, 4),
        truncated,
    ]);
    let outcome = decode_metafile(&bytes).expect("头部应当解码成功");

    assert_eq!(outcome.metafile.len(), 1);
    assert!(!outcome.is_complete());
    assert_eq!(
        outcome.fatal,
        Some(DecodeError::StreamTruncated {
            offset: 88 + 24,
            declared: 40,
            available: 20,
        })
    );
}

#[test]
fn header_signature_is_verified() {
    let bytes = stream(&[header_fields([0, 0, 1, 1], 0x1234_5678).build(), eof_record()]);
    let err = decode_metafile(&bytes).expect_err("签名错误应当失败");
    assert_eq!(err, DecodeError::HeaderSignatureMismatch { found: 0x1234_5678 });
}

#[test]
fn stream_must_start_with_a_header() {
    let bytes = stream(&[rectangle(0, 0, 1, 1), eof_record()]);
    let err = decode_metafile(&bytes).expect_err("缺少头部应当失败");
    assert_eq!(
        err,
        DecodeError::MissingHeader {
            record_type: record_type::RECTANGLE
        }
    );
}

#[test]
fn undersized_header_is_fatal() {
    let bytes = RecordBuilder::new(record_type::HEADER)
        .rect(0, 0, 1, 1)
        .build();
    assert_eq!(
        decode_metafile(&bytes).expect_err("头部过短"),
        DecodeError::HeaderTooSmall { size: 24 }
    );
}

#[test]
fn record_size_below_the_frame_is_rejected() {
    let mut bytes = header_record([0, 0, 1, 1]);
    bytes.extend_from_slice(&record_type::SAVEDC.to_le_bytes());
    bytes.extend_from_slice(&4u32.to_le_bytes());
    let outcome = decode_metafile(&bytes).expect("头部应当解码成功");
    assert_eq!(
        outcome.fatal,
        Some(DecodeError::InvalidRecordSize { offset: 88, size: 4 })
    );
}

fn text_record(text: &str, string_offset: Option<u32>, with_dx: bool) -> Vec<u8> {
    let chars = text.encode_utf16().count() as u32;
    let string_at = 76u32;
    let string_bytes = chars * 2;
    let dx_at = (string_at + string_bytes).next_multiple_of(4);
    let mut record = RecordBuilder::new(record_type::EXTTEXTOUTW)
        .rect(0, 0, 100, 20)
        .u32(1)
        .f32(0.0)
        .f32(0.0)
        .point(5, 15)
        .u32(chars)
        .u32(string_offset.unwrap_or(string_at))
        .u32(0)
        .rect(0, 0, 100, 20)
        .u32(if with_dx { dx_at } else { 0 })
        .utf16(text)
        .pad_to(dx_at);
    if with_dx {
        for i in 0..chars {
            record = record.i32(10 + i as i32);
        }
    }
    record.build()
}

#[test]
fn ext_text_out_w_skips_alignment_padding() {
    let bytes = stream(&[
        header_record([0, 0, 100, 20]),
        text_record("Hi!", None, true),
        eof_record(),
    ]);
    let outcome = decode_metafile(&bytes).expect("解码失败");
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);

    let Record::ExtTextOutW(text) = &outcome.metafile.records()[0] else {
        panic!("期望 ExtTextOutW，实际为 {:?}", outcome.metafile.records()[0]);
    };
    assert_eq!(text.text(), "Hi!");
    assert_eq!(text.reference, PointL::new(5, 15));
    assert_eq!(text.dx, vec![10, 11, 12]);
    assert_eq!(text.rectangle, Some(RectL::new(0, 0, 100, 20)));
}

#[test]
fn text_without_rectangle_shifts_the_string_offset_field() {
    let record = RecordBuilder::new(record_type::EXTTEXTOUTW)
        .rect(0, 0, 10, 10)
        .u32(1)
        .f32(1.0)
        .f32(1.0)
        .point(0, 0)
        .u32(2)
        .u32(60)
        .u32(text_options::ETO_NO_RECT)
        .u32(0)
        .utf16("ok")
        .build();
    let (decoded, _) = decode_record(&record).expect("解码失败");
    let Record::ExtTextOutW(text) = decoded else {
        panic!("期望 ExtTextOutW");
    };
    assert_eq!(text.rectangle, None);
    assert_eq!(text.text(), "ok");
    assert!(text.dx.is_empty());
}

#[test]
fn malformed_string_offset_degrades_to_opaque() {
    let bytes = stream(&[
        header_record([0, 0, 100, 20]),
        text_record("Hi", Some(400), false),
        rectangle(0, 0, 2, 2),
        eof_record(),
    ]);
    let outcome = decode_metafile(&bytes).expect("解码失败");

    assert_eq!(outcome.metafile.len(), 2);
    assert!(outcome.metafile.records()[0].is_opaque());
    assert_eq!(
        outcome.metafile.records()[0].record_type(),
        record_type::EXTTEXTOUTW
    );
    assert!(matches!(
        outcome.diagnostics[0].kind,
        DiagnosticKind::MalformedOffset {
            field: "offString",
            offset: 400,
            ..
        }
    ));
    assert!(outcome.is_complete());
}

#[test]
fn header_extensions_are_located_by_offsets() {
    let description = "EMF\0Test\0\0";
    let units = description.encode_utf16().count() as u32;
    let header = described_header_fields([0, 0, 10, 10], EMF_SIGNATURE, units, 108)
        .u32(0)
        .u32(0)
        .u32(0)
        .point(320_000, 240_000)
        .utf16(description)
        .build();
    let bytes = stream(&[header, eof_record()]);
    let outcome = decode_metafile(&bytes).expect("解码失败");
    let header = outcome.metafile.header();

    assert_eq!(header.header_size, 108);
    assert!(header.pixel_format.is_some());
    assert_eq!(header.micrometers, Some(SizeL::new(320_000, 240_000)));
    assert_eq!(header.description.as_deref(), Some("EMF / Test"));
}

#[test]
fn description_right_after_extension_one_hides_extension_two() {
    let header = described_header_fields([0, 0, 10, 10], EMF_SIGNATURE, 2, 100)
        .u32(0)
        .u32(0)
        .u32(0)
        .utf16("ab")
        .build();
    let bytes = stream(&[header, eof_record()]);
    let outcome = decode_metafile(&bytes).expect("解码失败");
    let header = outcome.metafile.header();

    assert_eq!(header.header_size, 100);
    assert!(header.pixel_format.is_some());
    assert_eq!(header.micrometers, None);
    assert_eq!(header.description.as_deref(), Some("ab"));
}

#[test]
fn ext_create_pen_without_bitmap() {
    let record = RecordBuilder::new(record_type::EXTCREATEPEN)
        .u32(3)
        .u32(0)
        .u32(0)
        .u32(0)
        .u32(0)
        .u32(0x0001_0001)
        .u32(5)
        .u32(0)
        .u32(0x0000_00FF)
        .u32(0)
        .u32(0)
        .build();
    assert_eq!(record.len(), 52);
    let (decoded, consumed) = decode_record(&record).expect("解码失败");
    assert_eq!(consumed, 52);
    let Record::ExtCreatePen {
        handle,
        pen,
        bitmap,
    } = decoded
    else {
        panic!("期望 ExtCreatePen");
    };
    assert_eq!(handle, 3);
    assert_eq!(pen.width, 5);
    assert!(pen.is_geometric());
    assert_eq!(pen.color.red, 0xFF);
    assert!(bitmap.is_none());
}

#[test]
fn stretch_dibits_carries_its_bitmap() {
    let bmi = info_header(2, 1, 24);
    let bits = [0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00];
    let record = RecordBuilder::new(record_type::STRETCHDIBITS)
        .rect(0, 0, 3, 1)
        .point(0, 0)
        .point(0, 0)
        .point(2, 1)
        .u32(80)
        .u32(bmi.len() as u32)
        .u32(120)
        .u32(bits.len() as u32)
        .u32(0)
        .u32(0x00CC_0020)
        .point(4, 2)
        .bytes(&bmi)
        .bytes(&bits)
        .build();
    let (decoded, consumed) = decode_record(&record).expect("解码失败");
    assert_eq!(consumed, 128);
    let Record::StretchDiBits(blit) = decoded else {
        panic!("期望 StretchDiBits");
    };
    assert_eq!(blit.dest_size, SizeL::new(4, 2));
    assert_eq!(blit.rop, 0x00CC_0020);
    let dib = blit.bitmap.expect("位图缺失");
    assert_eq!((dib.header.width, dib.header.height), (2, 1));
    assert_eq!(dib.bits, bits);
}

#[test]
fn poly_poly_counts_must_match_point_total() {
    let record = RecordBuilder::new(record_type::POLYPOLYGON16)
        .rect(0, 0, 4, 4)
        .u32(1)
        .u32(3)
        .u32(4)
        .i16(0)
        .i16(0)
        .i16(4)
        .i16(0)
        .i16(4)
        .i16(4)
        .build();
    let bytes = stream(&[header_record([0, 0, 4, 4]), record, eof_record()]);
    let outcome = decode_metafile(&bytes).expect("解码失败");
    assert!(outcome.metafile.records()[0].is_opaque());
    assert!(matches!(
        outcome.diagnostics[0].kind,
        DiagnosticKind::MalformedRecord { .. }
    ));
}

#[test]
fn sixteen_bit_points_are_widened() {
    let record = RecordBuilder::new(record_type::POLYLINE16)
        .rect(-5, -5, 5, 5)
        .u32(2)
        .i16(-5)
        .i16(5)
        .i16(5)
        .i16(-5)
        .build();
    let (decoded, _) = decode_record(&record).expect("解码失败");
    let Record::Polyline16(poly) = decoded else {
        panic!("期望 Polyline16");
    };
    assert_eq!(poly.points, vec![PointL::new(-5, 5), PointL::new(5, -5)]);
}

#[test]
fn missing_eof_and_trailing_bytes_are_reported() {
    let without_eof = stream(&[header_record([0, 0, 1, 1]), rectangle(0, 0, 1, 1)]);
    let outcome = decode_metafile(&without_eof).expect("解码失败");
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::MissingEof);
    assert!(!outcome.is_complete());

    let with_tail = stream(&[header_record([0, 0, 1, 1]), eof_record(), vec![0; 12]]);
    let outcome = decode_metafile(&with_tail).expect("解码失败");
    assert!(outcome.is_complete());
    assert_eq!(
        outcome.diagnostics[0].kind,
        DiagnosticKind::TrailingData { bytes: 12 }
    );
}

#[test]
fn loader_reads_from_disk() {
    let bytes = stream(&[
        header_record([0, 0, 10, 10]),
        rectangle(1, 1, 9, 9),
        eof_record(),
    ]);
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let path = dir.path().join("shape.emf");
    std::fs::write(&path, &bytes).expect("写入测试文件失败");

    let outcome = EmfFacade::new().load(&path).expect("读取 EMF 失败");
    assert_eq!(outcome.metafile.len(), 1);

    let missing = EmfFacade::new().load(&dir.path().join("missing.emf"));
    assert!(matches!(missing, Err(IoError::ReadError { .. })));
}
