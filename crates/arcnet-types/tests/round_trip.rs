//! Round-trip laws for every descriptor family, in both plain and buffer
//! form.

use arcnet_protocol::{ObjectId, PlayerId, Value};
use arcnet_types::{
    BufferReader, BufferWriter, NetEnum, NetworkType, TypeError, decode_arguments,
    deserialize_arguments, encode_arguments, serialize_arguments,
};

fn assert_plain_round_trip(ty: &NetworkType, value: Value) {
    assert!(ty.validate(&value), "{} should accept {value:?}", ty.name());
    let wire = ty.serialize(&value).unwrap();
    assert_eq!(ty.deserialize(&wire).unwrap(), value, "plain {}", ty.name());
}

fn assert_buffer_round_trip(ty: &NetworkType, value: Value) {
    let bytes = ty.encode_to_vec(&value).unwrap();
    let mut r = BufferReader::new(&bytes);
    assert_eq!(ty.decode(&mut r).unwrap(), value, "buffer {}", ty.name());
    r.finish().unwrap();
}

fn assert_round_trip(ty: &NetworkType, value: Value) {
    assert_plain_round_trip(ty, value.clone());
    assert_buffer_round_trip(ty, value);
}

// =========================================================================
// Leaves
// =========================================================================

#[test]
fn test_primitives_round_trip() {
    assert_round_trip(&NetworkType::string(), Value::from("Hello, World!"));
    assert_round_trip(&NetworkType::string(), Value::from(""));
    assert_round_trip(&NetworkType::int8(), Value::from(-128));
    assert_round_trip(&NetworkType::int16(), Value::from(-32_000));
    assert_round_trip(&NetworkType::int32(), Value::from(i32::MIN));
    assert_round_trip(&NetworkType::uint8(), Value::from(255));
    assert_round_trip(&NetworkType::uint16(), Value::from(65_535));
    assert_round_trip(&NetworkType::uint32(), Value::from(u32::MAX));
    assert_round_trip(&NetworkType::float32(), Value::from(0.5_f32));
    assert_round_trip(&NetworkType::float64(), Value::from(std::f64::consts::PI));
    assert_round_trip(&NetworkType::boolean(), Value::from(false));
    assert_round_trip(&NetworkType::buffer(), Value::Buffer(vec![0, 1, 254, 255]));
}

#[test]
fn test_identity_types_round_trip_in_plain_mode() {
    assert_plain_round_trip(&NetworkType::player(), Value::Player(PlayerId(42)));
    assert_plain_round_trip(&NetworkType::object(), Value::Object(ObjectId(7)));
}

#[test]
fn test_unknown_passes_values_through() {
    let ty = NetworkType::unknown();
    let value = Value::record([("anything", Value::Buffer(vec![1]))]);
    assert_plain_round_trip(&ty, value);
}

// =========================================================================
// Compounds
// =========================================================================

#[test]
fn test_array_of_string_round_trip() {
    let ty = NetworkType::array(NetworkType::string());
    let value = Value::Array(vec![Value::from("a"), Value::from("bc"), Value::from("")]);
    assert_round_trip(&ty, value);
    assert_round_trip(&ty, Value::Array(vec![]));
}

#[test]
fn test_set_and_map_round_trip() {
    let set = NetworkType::set(NetworkType::int32());
    assert_round_trip(
        &set,
        Value::Set(vec![Value::from(3), Value::from(-1), Value::from(10)]),
    );

    let map = NetworkType::map(NetworkType::string(), NetworkType::boolean());
    assert_round_trip(
        &map,
        Value::Map(vec![
            (Value::from("z"), Value::from(true)),
            (Value::from("a"), Value::from(false)),
        ]),
    );
}

#[test]
fn test_set_of_players_round_trips_in_plain_mode() {
    let ty = NetworkType::set(NetworkType::player());
    assert_plain_round_trip(
        &ty,
        Value::Set(vec![Value::Player(PlayerId(1)), Value::Player(PlayerId(2))]),
    );
}

#[test]
fn test_tuple_and_optional_round_trip() {
    let ty = NetworkType::tuple([
        NetworkType::string(),
        NetworkType::optional(NetworkType::float64()),
    ])
    .unwrap();
    assert_round_trip(&ty, Value::Array(vec![Value::from("x"), Value::Nil]));
    assert_round_trip(&ty, Value::Array(vec![Value::from("x"), Value::from(2.5)]));
}

#[test]
fn test_literal_round_trip_and_ordinals() {
    let ty = NetworkType::literal(["A", "B", "C"]).unwrap();
    for (ordinal, name) in ["A", "B", "C"].into_iter().enumerate() {
        assert_eq!(
            ty.serialize(&Value::from(name)).unwrap(),
            Value::Number(ordinal as f64)
        );
        assert_eq!(
            ty.encode_to_vec(&Value::from(name)).unwrap(),
            vec![ordinal as u8]
        );
        assert_round_trip(&ty, Value::from(name));
    }
}

#[test]
fn test_mixed_literal_round_trip() {
    let ty = NetworkType::literal([Value::from(1), Value::from("one"), Value::from(true)]).unwrap();
    assert_round_trip(&ty, Value::from(true));
    assert_round_trip(&ty, Value::from("one"));
}

#[test]
fn test_enum_round_trip() {
    let team = NetEnum::strings("Team", [("Red", "red"), ("Blue", "blue")]).unwrap();
    assert_round_trip(&team.network_type(), Value::from("blue"));

    let level = NetEnum::ints("Level", [("Low", -1), ("High", 9)]).unwrap();
    assert_round_trip(&level.network_type(), Value::from(-1));
}

#[test]
fn test_variant_round_trip() {
    let ty = NetworkType::variant([
        (
            "Move",
            NetworkType::tuple([NetworkType::float32(), NetworkType::float32()]).unwrap(),
        ),
        ("Say", NetworkType::string()),
        ("Idle", NetworkType::optional(NetworkType::boolean())),
    ])
    .unwrap();
    assert_round_trip(
        &ty,
        Value::variant("Move", Value::Array(vec![Value::from(1.0_f32), Value::from(-2.0_f32)])),
    );
    assert_round_trip(&ty, Value::variant("Say", Value::from("hi")));
    assert_round_trip(&ty, Value::variant("Idle", Value::Nil));
}

#[test]
fn test_struct_round_trip() {
    let ty = NetworkType::structure([
        ("name", NetworkType::string()),
        ("level", NetworkType::uint8()),
        ("guild", NetworkType::optional(NetworkType::string())),
        ("tags", NetworkType::set(NetworkType::string())),
    ])
    .unwrap();
    assert_round_trip(
        &ty,
        Value::record([
            ("name", Value::from("ayla")),
            ("level", Value::from(12)),
            ("tags", Value::Set(vec![Value::from("mage"), Value::from("new")])),
        ]),
    );
    assert_round_trip(
        &ty,
        Value::record([
            ("name", Value::from("bo")),
            ("level", Value::from(1)),
            ("guild", Value::from("north")),
            ("tags", Value::Set(vec![])),
        ]),
    );
}

#[test]
fn test_struct_encodes_fields_in_hash_order() {
    let ty = NetworkType::structure([("b", NetworkType::uint8()), ("a", NetworkType::uint8())])
        .unwrap();
    let order = ty.field_order().unwrap();
    let bytes = ty
        .encode_to_vec(&Value::record([("a", Value::from(1)), ("b", Value::from(2))]))
        .unwrap();
    let expected: Vec<u8> = order.iter().map(|f| if *f == "a" { 1 } else { 2 }).collect();
    assert_eq!(bytes, expected);
}

#[test]
fn test_nested_compound_round_trip() {
    let ty = NetworkType::map(
        NetworkType::string(),
        NetworkType::array(NetworkType::optional(NetworkType::int16())),
    );
    assert_round_trip(
        &ty,
        Value::Map(vec![(
            Value::from("row"),
            Value::Array(vec![Value::from(1), Value::Nil, Value::from(-3)]),
        )]),
    );
}

// =========================================================================
// Custom types
// =========================================================================

fn stamp() -> NetworkType {
    NetworkType::custom("stamp", |v| v.as_str().is_some_and(|s| s.starts_with('#')))
        .serializer(
            |v| match v.as_str() {
                Some(s) => Ok(Value::from(s.trim_start_matches('#'))),
                None => Err(TypeError::Custom {
                    type_name: "stamp".into(),
                    message: "not a string".into(),
                }),
            },
            |v| match v.as_str() {
                Some(s) => Ok(Value::from(format!("#{s}"))),
                None => Err(TypeError::Custom {
                    type_name: "stamp".into(),
                    message: "not a string".into(),
                }),
            },
        )
        .codec(
            |v, w: &mut BufferWriter| match v.as_str() {
                Some(s) => w.write_str(s),
                None => Err(TypeError::NoCodec("stamp".into())),
            },
            |r| Ok(Value::from(r.read_string()?)),
        )
        .build()
}

#[test]
fn test_custom_type_round_trip() {
    let ty = stamp();
    assert_eq!(ty.serialize(&Value::from("#abc")).unwrap(), Value::from("abc"));
    assert_round_trip(&ty, Value::from("#abc"));
    assert!(!ty.validate(&Value::from("abc")));
}

// =========================================================================
// Argument lists
// =========================================================================

#[test]
fn test_argument_list_round_trip_in_both_modes() {
    let types = vec![
        NetworkType::string(),
        NetworkType::array(NetworkType::string()),
        NetworkType::literal(["on", "off"]).unwrap(),
    ];
    let args = vec![
        Value::from("tags"),
        Value::Array(vec![Value::from("x"), Value::from("y")]),
        Value::from("off"),
    ];

    let wire = serialize_arguments(&args, &types).unwrap();
    assert_eq!(wire[2], Value::from(1));
    assert_eq!(deserialize_arguments(&wire, &types).unwrap(), args);

    let bytes = encode_arguments(&args, &types).unwrap();
    assert_eq!(decode_arguments(&bytes, &types).unwrap(), args);
}

#[test]
fn test_truncated_buffer_fails() {
    let types = vec![NetworkType::string(), NetworkType::uint32()];
    let bytes = encode_arguments(&[Value::from("abc"), Value::from(5)], &types).unwrap();
    let err = decode_arguments(&bytes[..bytes.len() - 1], &types).unwrap_err();
    assert_eq!(err.index, 1);
    assert!(matches!(err.source, TypeError::UnexpectedEnd { .. }));
}

#[test]
fn test_oversized_count_of_zero_width_elements_fails() {
    // A marker type that carries no bytes on the wire.
    let marker = NetworkType::custom("marker", |v| v.is_nil())
        .codec(|_, _: &mut BufferWriter| Ok(()), |_| Ok(Value::Nil))
        .build();
    let types = vec![NetworkType::array(marker)];

    let err = decode_arguments(&u32::MAX.to_le_bytes(), &types).unwrap_err();
    assert_eq!(err.index, 0);
    assert_eq!(
        err.source,
        TypeError::CountExceedsBuffer {
            count: u32::MAX as usize,
            remaining: 0,
        }
    );

    let bytes = encode_arguments(&[Value::Array(vec![])], &types).unwrap();
    assert_eq!(decode_arguments(&bytes, &types).unwrap(), vec![Value::Array(vec![])]);
}
