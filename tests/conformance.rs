// ABOUTME: Conformance suite for the BONJSON codec: wire scenarios and universal properties.
// ABOUTME: Uses a recording event sink to compare decoded event streams against expectations.

use bonjson_stream::{
    bonjson, decode_value, encode_value, BigNumber, Decoder, Encoder, Error, EventSink,
    Value, ValueBuilder,
};

/// Records every event as a short description, in order.
#[derive(Default)]
struct RecordingSink {
    events: Vec<String>,
    begins: usize,
    ends: usize,
}

impl EventSink for RecordingSink {
    fn on_null(&mut self) -> Result<(), Error> {
        self.events.push("N()".into());
        Ok(())
    }
    fn on_bool(&mut self, value: bool) -> Result<(), Error> {
        self.events.push(format!("B({value})"));
        Ok(())
    }
    fn on_signed(&mut self, value: i64) -> Result<(), Error> {
        self.events.push(format!("I({value})"));
        Ok(())
    }
    fn on_unsigned(&mut self, value: u64) -> Result<(), Error> {
        self.events.push(format!("U({value})"));
        Ok(())
    }
    fn on_float(&mut self, value: f64) -> Result<(), Error> {
        self.events.push(format!("F({value})"));
        Ok(())
    }
    fn on_big_number(&mut self, value: BigNumber) -> Result<(), Error> {
        self.events.push(format!("BIG({})", value.to_string_notation()));
        Ok(())
    }
    fn on_string(&mut self, chunk: &[u8], is_last: bool) -> Result<(), Error> {
        self.events.push(format!(
            "S({},{})",
            String::from_utf8_lossy(chunk),
            if is_last { "last" } else { "more" }
        ));
        Ok(())
    }
    fn on_begin_array(&mut self, count_hint: u64) -> Result<(), Error> {
        self.begins += 1;
        self.events.push(format!("A({count_hint})"));
        Ok(())
    }
    fn on_begin_object(&mut self, count_hint: u64) -> Result<(), Error> {
        self.begins += 1;
        self.events.push(format!("O({count_hint})"));
        Ok(())
    }
    fn on_end_container(&mut self) -> Result<(), Error> {
        self.ends += 1;
        self.events.push("E()".into());
        Ok(())
    }
    fn on_end_data(&mut self) -> Result<(), Error> {
        self.events.push("END".into());
        Ok(())
    }
}

/// A sink that rejects everything, for callback-abort behaviour.
struct RefusingSink;

impl EventSink for RefusingSink {
    fn on_null(&mut self) -> Result<(), Error> {
        Err(Error::Custom("refused".into()))
    }
    fn on_bool(&mut self, _: bool) -> Result<(), Error> {
        Err(Error::Custom("refused".into()))
    }
    fn on_signed(&mut self, _: i64) -> Result<(), Error> {
        Err(Error::Custom("refused".into()))
    }
    fn on_unsigned(&mut self, _: u64) -> Result<(), Error> {
        Err(Error::Custom("refused".into()))
    }
    fn on_float(&mut self, _: f64) -> Result<(), Error> {
        Err(Error::Custom("refused".into()))
    }
    fn on_big_number(&mut self, _: BigNumber) -> Result<(), Error> {
        Err(Error::Custom("refused".into()))
    }
    fn on_string(&mut self, _: &[u8], _: bool) -> Result<(), Error> {
        Err(Error::Custom("refused".into()))
    }
    fn on_begin_array(&mut self, _: u64) -> Result<(), Error> {
        Err(Error::Custom("refused".into()))
    }
    fn on_begin_object(&mut self, _: u64) -> Result<(), Error> {
        Err(Error::Custom("refused".into()))
    }
    fn on_end_container(&mut self) -> Result<(), Error> {
        Err(Error::Custom("refused".into()))
    }
    fn on_end_data(&mut self) -> Result<(), Error> {
        Err(Error::Custom("refused".into()))
    }
}

fn decode_events(data: &[u8]) -> Result<(Vec<String>, usize), Error> {
    let mut sink = RecordingSink::default();
    let consumed = Decoder::new(data).decode(&mut sink)?;
    assert_eq!(sink.begins, sink.ends, "container begin/end balance");
    Ok((sink.events, consumed))
}

/// Documents used by the property tests, all in canonical Value form.
fn corpus() -> Vec<Value> {
    vec![
        bonjson!(null),
        bonjson!(true),
        bonjson!(false),
        bonjson!(0),
        bonjson!(100),
        bonjson!(-100),
        bonjson!(101),
        bonjson!(-101),
        bonjson!(1000),
        bonjson!(-70000),
        Value::Int(i64::MIN),
        Value::Int(i64::MAX),
        Value::UInt(u64::MAX),
        bonjson!(1.5),
        bonjson!(-2.25),
        bonjson!(1e300),
        Value::BigNumber(BigNumber::new(1, 3, -1)),
        Value::BigNumber(BigNumber::new(-1, 123, 45)),
        bonjson!(""),
        bonjson!("hello"),
        bonjson!("héllo wörld 🎉"),
        Value::String("nul\0inside".into()),
        bonjson!([]),
        bonjson!([1, 2, 3]),
        bonjson!({}),
        bonjson!({"a": 1, "b": [true, null, (-2)]}),
        bonjson!({"deep": {"deeper": {"deepest": [1.5, "x"]}}}),
    ]
}

// =============================================================================
// Concrete wire scenarios
// =============================================================================

#[test]
fn s1_simple_object_document() {
    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf);
    enc.begin_object(2, false).unwrap();
    enc.add_string("a").unwrap();
    enc.add_signed(1).unwrap();
    enc.add_string("b").unwrap();
    enc.begin_array(3, false).unwrap();
    enc.add_bool(true).unwrap();
    enc.add_null().unwrap();
    enc.add_signed(-2).unwrap();
    enc.end_container().unwrap();
    enc.end_container().unwrap();
    enc.finish().unwrap();

    // object tag, pair count 2, then "a" as string tag + length 1 + 0x61
    assert_eq!(&buf[..5], &[0xde, 0x04, 0xdb, 0x01, 0x61]);

    let (events, consumed) = decode_events(&buf).unwrap();
    assert_eq!(consumed, buf.len());
    assert_eq!(
        events,
        vec![
            "O(2)", "S(a,last)", "I(1)", "S(b,last)", "A(3)", "B(true)", "N()", "I(-2)",
            "E()", "E()", "END"
        ]
    );
}

#[test]
fn s2_integral_float_collapses_to_integer() {
    let mut buf_float = Vec::new();
    let mut enc = Encoder::new(&mut buf_float);
    enc.add_float(3.0).unwrap();
    enc.finish().unwrap();

    let mut buf_int = Vec::new();
    let mut enc = Encoder::new(&mut buf_int);
    enc.add_signed(3).unwrap();
    enc.finish().unwrap();

    assert_eq!(buf_float, buf_int);
}

#[test]
fn s3_error_poisons_the_encoder() {
    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf);
    assert_eq!(enc.add_float(f64::NAN), Err(Error::InvalidFloat));
    assert_eq!(enc.add_null(), Err(Error::MisuseAfterError));
    assert_eq!(enc.add_signed(1), Err(Error::MisuseAfterError));
}

#[test]
fn s4_overwide_integer_rejected() {
    // The value 5 in an 8-byte signed form
    let data = [0xd8, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
    assert_eq!(decode_events(&data).unwrap_err(), Error::NotCanonical);
}

#[test]
fn s5_chunked_string_events() {
    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf);
    enc.chunk_string(b"he", false).unwrap();
    enc.chunk_string(b"ll", false).unwrap();
    enc.chunk_string(b"o", true).unwrap();
    enc.finish().unwrap();

    let (events, _) = decode_events(&buf).unwrap();
    assert_eq!(
        events,
        vec!["S(he,more)", "S(ll,more)", "S(o,last)", "END"]
    );
}

#[test]
fn s6_truncated_counted_array() {
    // Declared count 3, only two values present
    let data = [0xdd, 0x06, 0x65, 0x66];
    assert_eq!(decode_events(&data).unwrap_err(), Error::Truncated);
}

// =============================================================================
// Universal properties
// =============================================================================

#[test]
fn round_trip_preserves_values() {
    for value in corpus() {
        let bytes = encode_value(&value).unwrap();
        let decoded = decode_value(&bytes).unwrap();
        assert_eq!(decoded, value, "round trip of {value}");
    }
}

#[test]
fn reencode_is_idempotent() {
    for value in corpus() {
        let bytes = encode_value(&value).unwrap();
        let reencoded = encode_value(&decode_value(&bytes).unwrap()).unwrap();
        assert_eq!(reencoded, bytes, "re-encode of {value}");
    }
}

#[test]
fn canonical_encode_of_equal_values() {
    // Semantically equal numbers produce identical bytes
    assert_eq!(
        encode_value(&Value::Float(3.0)).unwrap(),
        encode_value(&Value::Int(3)).unwrap()
    );
    assert_eq!(
        encode_value(&Value::UInt(1000)).unwrap(),
        encode_value(&Value::Int(1000)).unwrap()
    );
    assert_eq!(
        encode_value(&Value::BigNumber(BigNumber::new(1, 42, 0))).unwrap(),
        encode_value(&Value::Int(42)).unwrap()
    );
    assert_eq!(
        encode_value(&Value::BigNumber(BigNumber::new(1, 15, -1))).unwrap(),
        encode_value(&Value::Float(1.5)).unwrap()
    );
}

#[test]
fn truncation_never_misbehaves() {
    for value in corpus() {
        let bytes = encode_value(&value).unwrap();
        for cut in 0..bytes.len() {
            let prefix = &bytes[..cut];
            let mut sink = RecordingSink::default();
            match Decoder::new(prefix).decode(&mut sink) {
                Ok(consumed) => assert!(consumed <= prefix.len()),
                Err(Error::Truncated) => {}
                Err(other) => panic!("prefix {cut} of {value}: unexpected error {other:?}"),
            }
        }
    }
}

#[test]
fn utf8_strictness() {
    let bad_payloads: &[&[u8]] = &[
        &[0x80],                   // bare continuation
        &[0xc3],                   // truncated two-byte sequence
        &[0xc0, 0xaf],             // overlong '/'
        &[0xe0, 0x80, 0x80],       // overlong NUL
        &[0xed, 0xa0, 0x80],       // surrogate U+D800
        &[0xf5, 0x80, 0x80, 0x80], // above U+10FFFF
        &[0x61, 0xff, 0x61],       // stray 0xFF
    ];
    for payload in bad_payloads {
        let mut data = vec![0xdb, payload.len() as u8];
        data.extend_from_slice(payload);
        assert_eq!(
            decode_events(&data).unwrap_err(),
            Error::InvalidUtf8,
            "payload {payload:x?}"
        );
    }
}

#[test]
fn key_discipline() {
    // Decoding: object with an integer in key position
    let data = [0xde, 0x02, 0x65];
    assert_eq!(decode_events(&data).unwrap_err(), Error::KeyMustBeString);

    // Encoding: same document refused symmetrically
    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf);
    enc.begin_object(1, false).unwrap();
    assert_eq!(enc.add_signed(1), Err(Error::KeyMustBeString));
}

#[test]
fn callback_error_aborts_decode() {
    let data = [0x65];
    let mut decoder = Decoder::new(&data);
    assert_eq!(
        decoder.decode(&mut RefusingSink),
        Err(Error::Custom("refused".into()))
    );
    // The context is poisoned afterwards
    assert_eq!(
        decoder.decode(&mut RecordingSink::default()),
        Err(Error::MisuseAfterError)
    );
}

// =============================================================================
// Containers and chunking
// =============================================================================

#[test]
fn open_containers_round_trip() {
    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf);
    enc.begin_array(2, true).unwrap();
    enc.add_signed(1).unwrap();
    enc.add_signed(2).unwrap();
    enc.add_signed(3).unwrap();
    enc.end_container().unwrap();
    enc.finish().unwrap();

    let (events, _) = decode_events(&buf).unwrap();
    assert_eq!(events, vec!["A(2)", "I(1)", "I(2)", "I(3)", "E()", "END"]);
}

#[test]
fn open_object_with_unknown_count() {
    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf);
    enc.begin_object(0, true).unwrap();
    enc.add_string("k").unwrap();
    enc.add_bool(false).unwrap();
    enc.end_container().unwrap();
    enc.finish().unwrap();

    let (events, _) = decode_events(&buf).unwrap();
    assert_eq!(
        events,
        vec!["O(0)", "S(k,last)", "B(false)", "E()", "END"]
    );
}

#[test]
fn chunked_string_as_object_key() {
    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf);
    enc.begin_object(1, false).unwrap();
    enc.chunk_string(b"ke", false).unwrap();
    enc.chunk_string(b"y", true).unwrap();
    enc.add_signed(7).unwrap();
    enc.end_container().unwrap();
    enc.finish().unwrap();

    let value = decode_value(&buf).unwrap();
    assert_eq!(value.get_key("key").and_then(Value::as_i64), Some(7));
}

#[test]
fn chunk_boundaries_may_split_code_points() {
    let emoji = "🎉".as_bytes(); // 4 bytes
    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf);
    enc.chunk_string(&emoji[..2], false).unwrap();
    enc.chunk_string(&emoji[2..], true).unwrap();
    enc.finish().unwrap();

    let value = decode_value(&buf).unwrap();
    assert_eq!(value.as_str(), Some("🎉"));
}

#[test]
fn spliced_documents() {
    let inner = encode_value(&bonjson!([1, 2])).unwrap();

    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf);
    enc.begin_object(1, false).unwrap();
    enc.add_string("spliced").unwrap();
    enc.add_encoded(&inner).unwrap();
    enc.end_container().unwrap();
    enc.finish().unwrap();

    let value = decode_value(&buf).unwrap();
    assert_eq!(value.get_key("spliced"), Some(&bonjson!([1, 2])));
}

#[test]
fn document_terminator_round_trips() {
    let mut buf = Vec::new();
    let mut enc = Encoder::new(&mut buf);
    enc.add_string("done").unwrap();
    enc.terminate().unwrap();
    enc.finish().unwrap();
    assert_eq!(*buf.last().unwrap(), 0xe3);

    let (events, consumed) = decode_events(&buf).unwrap();
    assert_eq!(consumed, buf.len());
    assert_eq!(events, vec!["S(done,last)", "END"]);
}

#[test]
fn deep_nesting_round_trips() {
    let mut value = bonjson!(1);
    for _ in 0..100 {
        value = Value::Array(vec![value]);
    }
    let bytes = encode_value(&value).unwrap();
    assert_eq!(decode_value(&bytes).unwrap(), value);
}

#[test]
fn nesting_past_the_stack_limit_rejected() {
    let mut data = Vec::new();
    for _ in 0..300 {
        data.extend_from_slice(&[0xdd, 0x01]);
    }
    let mut sink = RecordingSink::default();
    assert_eq!(
        Decoder::new(&data).decode(&mut sink),
        Err(Error::MaxDepthExceeded)
    );
}

// =============================================================================
// Numbers on the wire
// =============================================================================

#[test]
fn integer_width_boundaries() {
    // Each value decodes back to itself through the Value layer
    let boundaries: &[i64] = &[
        -100, -101, -128, -129, -32768, -32769, 100, 101, 255, 256, 65535, 65536,
        i64::MAX, i64::MIN,
    ];
    for &n in boundaries {
        let bytes = encode_value(&Value::Int(n)).unwrap();
        assert_eq!(decode_value(&bytes).unwrap(), Value::Int(n), "value {n}");
    }
}

#[test]
fn unsigned_above_i64_survives() {
    let bytes = encode_value(&Value::UInt(u64::MAX)).unwrap();
    assert_eq!(decode_value(&bytes).unwrap(), Value::UInt(u64::MAX));

    // 2^63 exactly: still unsigned territory
    let v = 1u64 << 63;
    let bytes = encode_value(&Value::UInt(v)).unwrap();
    assert_eq!(decode_value(&bytes).unwrap(), Value::UInt(v));
}

#[test]
fn negative_zero_stays_float() {
    let bytes = encode_value(&Value::Float(-0.0)).unwrap();
    match decode_value(&bytes).unwrap() {
        Value::Float(f) => {
            assert_eq!(f, 0.0);
            assert!(f.is_sign_negative());
        }
        other => panic!("expected float, got {other:?}"),
    }
}

#[test]
fn non_canonical_numbers_rejected() {
    // 1000 in a 4-byte unsigned form (2 bytes suffice)
    assert_eq!(
        decode_events(&[0xcc, 0xe8, 0x03, 0x00, 0x00]).unwrap_err(),
        Error::NotCanonical
    );
    // Float64 carrying 7.0
    let mut data = vec![0xd9];
    data.extend_from_slice(&7.0f64.to_le_bytes());
    assert_eq!(decode_events(&data).unwrap_err(), Error::NotCanonical);
    // Big number carrying plain 5
    assert_eq!(
        decode_events(&[0xda, 0x02, 0x05, 0x00]).unwrap_err(),
        Error::NotCanonical
    );
}

#[test]
fn big_number_round_trips_losslessly() {
    let bn = BigNumber::new(-1, 12_345_678_901_234_567, -30);
    let bytes = encode_value(&Value::BigNumber(bn)).unwrap();
    assert_eq!(decode_value(&bytes).unwrap(), Value::BigNumber(bn));
}
