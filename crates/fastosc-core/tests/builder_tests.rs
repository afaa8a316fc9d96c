//! Message builder tests

use fastosc_core::{
    decode, encode_message, infer_type, ArgType, ArgValue, Error, MessageBuilder, Packet, TypeTag,
};
use std::time::{Duration, SystemTime};

fn decode_args(bytes: &[u8]) -> Vec<ArgValue> {
    match decode(bytes).unwrap() {
        Packet::Message(m) => m.args,
        Packet::Bundle(_) => panic!("Expected message, got bundle"),
    }
}

#[test]
fn test_mixed_tags_in_order() {
    let mut builder = MessageBuilder::with_address("/x");
    builder
        .add_argument(true)
        .unwrap()
        .add_argument(1)
        .unwrap()
        .add_argument(1.5)
        .unwrap()
        .add_argument("hi")
        .unwrap()
        .add_argument(ArgValue::Nil)
        .unwrap();

    let frame = builder.build().unwrap();
    assert_eq!(frame.type_tags(), ",TifsN");

    // "/x" (4) + ",TifsN" (8) + int (4) + float (4) + "hi" (4); T and N add nothing
    assert_eq!(frame.len(), 24);

    let args = decode_args(frame.as_bytes());
    assert_eq!(
        args,
        vec![
            ArgValue::Bool(true),
            ArgValue::Int(1),
            ArgValue::Float(1.5),
            ArgValue::from("hi"),
            ArgValue::Nil,
        ]
    );
}

#[test]
fn test_integer_width_by_magnitude() {
    for i in [0i64, 1, -1, i32::MAX as i64, i32::MIN as i64] {
        assert_eq!(infer_type(&ArgValue::Int(i)), ArgType::Scalar(TypeTag::Int), "{}", i);
    }
    for i in [i32::MAX as i64 + 1, i32::MIN as i64 - 1, 1 << 40, i64::MIN] {
        assert_eq!(infer_type(&ArgValue::Int(i)), ArgType::Scalar(TypeTag::Long), "{}", i);
    }

    let frame = encode_message("/big", &[ArgValue::Int(1 << 40)]).unwrap();
    assert_eq!(frame.type_tags(), ",h");
    assert_eq!(decode_args(frame.as_bytes()), vec![ArgValue::Int(1 << 40)]);
}

#[test]
fn test_four_integer_tuple_is_midi() {
    let midi = ArgValue::Tuple(vec![0.into(), 144.into(), 60.into(), 100.into()]);
    assert_eq!(infer_type(&midi), ArgType::Scalar(TypeTag::Midi));

    let frame = encode_message("/note", &[midi.clone()]).unwrap();
    assert_eq!(frame.type_tags(), ",m");
    assert_eq!(decode_args(frame.as_bytes()), vec![midi]);
}

#[test]
fn test_four_element_tuple_with_float_is_nested() {
    let mixed = ArgValue::Tuple(vec![1.into(), 2.0.into(), 3.into(), 4.into()]);
    let frame = encode_message("/mixed", &[mixed]).unwrap();
    assert_eq!(frame.type_tags(), ",[ifii]");

    let tags: Vec<TypeTag> = frame.args().iter().map(|a| a.tag).collect();
    assert_eq!(tags.first(), Some(&TypeTag::ArrayStart));
    assert_eq!(tags.last(), Some(&TypeTag::ArrayStop));
    assert!(frame.args()[0].value.is_none());
}

#[test]
fn test_nested_arrays() {
    let nested = ArgValue::Array(vec![
        ArgValue::from("a"),
        ArgValue::Array(vec![1.into(), ArgValue::Nil]),
        false.into(),
    ]);
    let frame = encode_message("/nested", &[nested.clone(), 7.into()]).unwrap();
    assert_eq!(frame.type_tags(), ",[s[iN]F]i");
    assert_eq!(decode_args(frame.as_bytes()), vec![nested, ArgValue::Int(7)]);
}

#[test]
fn test_four_integer_list_is_nested() {
    let list = ArgValue::Array((1..=4).map(ArgValue::from).collect());
    let frame = encode_message("/list", &[list]).unwrap();
    assert_eq!(frame.type_tags(), ",[iiii]");
}

#[test]
fn test_no_arguments() {
    let frame = MessageBuilder::with_address("/ping").build().unwrap();
    assert_eq!(frame.type_tags(), ",");
    // "/ping" (8) + "," (4)
    assert_eq!(frame.len(), 12);
    assert!(decode_args(frame.as_bytes()).is_empty());
}

#[test]
fn test_missing_address() {
    let mut builder = MessageBuilder::new();
    builder.add_argument(1).unwrap();
    assert!(matches!(builder.build(), Err(Error::EmptyAddress)));
    assert!(matches!(
        MessageBuilder::with_address("").build(),
        Err(Error::EmptyAddress)
    ));
}

#[test]
fn test_explicit_type_rejected_when_added() {
    let mut builder = MessageBuilder::with_address("/a");
    let result = builder.add_typed_argument(1, ArgType::Scalar(TypeTag::ArrayStart));
    assert!(matches!(result, Err(Error::InvalidTypeTag(_))));

    assert!(matches!(ArgType::try_from('x'), Err(Error::InvalidTypeTag(_))));

    let bad_array = ArgType::Array(vec![
        ArgType::Scalar(TypeTag::Int),
        ArgType::Scalar(TypeTag::ArrayStop),
    ]);
    let result = builder.add_typed_argument(ArgValue::Array(vec![1.into(), 2.into()]), bad_array);
    assert!(result.is_err());
    assert!(builder.args().is_empty());
}

#[test]
fn test_explicit_double_and_rgba() {
    let mut builder = MessageBuilder::with_address("/color");
    builder
        .add_typed_argument(0.25, "d".parse().unwrap())
        .unwrap()
        .add_typed_argument(
            ArgValue::Tuple(vec![255.into(), 0.into(), 128.into(), 255.into()]),
            "r".parse().unwrap(),
        )
        .unwrap();

    let frame = builder.build().unwrap();
    assert_eq!(frame.type_tags(), ",dr");
    assert_eq!(
        decode_args(frame.as_bytes()),
        vec![
            ArgValue::Float(0.25),
            ArgValue::Tuple(vec![255.into(), 0.into(), 128.into(), 255.into()]),
        ]
    );
}

#[test]
fn test_explicit_array_type() {
    let mut builder = MessageBuilder::with_address("/arr");
    builder
        .add_typed_argument(ArgValue::Array(vec![1.into(), 2.into()]), "[hd]".parse().unwrap())
        .unwrap();
    let frame = builder.build().unwrap();
    assert_eq!(frame.type_tags(), ",[hd]");
}

#[test]
fn test_codec_failure_is_build_failure() {
    let mut builder = MessageBuilder::with_address("/a");
    builder
        .add_typed_argument(1i64 << 40, ArgType::Scalar(TypeTag::Int))
        .unwrap();
    assert!(matches!(builder.build(), Err(Error::Encode(_))));

    let mut builder = MessageBuilder::with_address("/a");
    builder
        .add_typed_argument("text", ArgType::Scalar(TypeTag::Blob))
        .unwrap();
    let err = builder.build().unwrap_err();
    assert!(err.to_string().starts_with("could not build the message"));
}

#[test]
fn test_timestamp() {
    let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    let frame = encode_message("/time", &[t.into()]).unwrap();
    assert_eq!(frame.type_tags(), ",t");

    match decode_args(frame.as_bytes()).as_slice() {
        [ArgValue::Time(decoded)] => {
            let delta = decoded
                .duration_since(t)
                .unwrap_or_else(|e| e.duration());
            assert!(delta < Duration::from_millis(1));
        }
        other => panic!("Expected a timetag, got {:?}", other),
    }
}

#[test]
fn test_blob() {
    let frame = encode_message("/blob", &[vec![1u8, 2, 3, 4, 5].into()]).unwrap();
    assert_eq!(frame.type_tags(), ",b");
    assert_eq!(
        decode_args(frame.as_bytes()),
        vec![ArgValue::Blob(vec![1, 2, 3, 4, 5])]
    );
}
