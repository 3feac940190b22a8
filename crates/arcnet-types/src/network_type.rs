//! Network type descriptors.
//!
//! A [`NetworkType`] bundles everything the framework needs to know about
//! one argument shape:
//!
//! - a display **name** (error messages, struct field order),
//! - a **validator** over logical [`Value`]s,
//! - a logical⇄wire **conversion** ([`Conversion::Passthrough`] or
//!   [`Conversion::Serializable`]) used in plain mode,
//! - a binary **codec** used in buffer mode (absent for identity types).
//!
//! Descriptors are immutable and cheap to clone (`Arc` inside). Compound
//! descriptors are built by composing children and inherit their
//! properties: an `Array<Player>` is serializable because `Player` is, and
//! has no codec because `Player` has none.
//!
//! # Round-trip laws
//!
//! For every value `v` that `validate` accepts:
//!
//! ```text
//! decode(encode(v))       == v
//! deserialize(serialize(v)) == v
//! ```
//!
//! where `==` is [`Value`]'s observable equality.

use std::fmt;
use std::sync::Arc;

use arcnet_protocol::{ObjectId, PlayerId, Value};

use crate::TypeError;
use crate::buffer::{BufferReader, BufferWriter};
use crate::enums::{EnumKind, NetEnum};
use crate::hash::name_hash;

/// Produces a validation message for a rejected value.
pub type MessageFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;
/// Validates a value for a custom type.
pub type ValidateFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;
/// A logical⇄wire conversion for a custom type.
pub type ConvertFn = Arc<dyn Fn(&Value) -> Result<Value, TypeError> + Send + Sync>;
/// Writes a custom type into a buffer.
pub type EncodeFn = Arc<dyn Fn(&Value, &mut BufferWriter) -> Result<(), TypeError> + Send + Sync>;
/// Reads a custom type from a buffer.
pub type DecodeFn = Arc<dyn Fn(&mut BufferReader<'_>) -> Result<Value, TypeError> + Send + Sync>;
/// Decides what happens when a custom deserializer fails.
pub type DeserializeErrorFn = Arc<dyn Fn(&TypeError) -> DeserializeFailure + Send + Sync>;

static NIL: Value = Value::Nil;

/// Whether a type's wire form differs from its logical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// Logical and wire values are the same; `serialize` is the identity.
    Passthrough,
    /// `serialize`/`deserialize` rewrite the value.
    Serializable,
}

/// Outcome chosen by a deserialization error hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeserializeFailure {
    /// Swallow the error and deliver `Nil` for this value.
    Suppress,
    /// Fail the deserialization; the receiver drops the call.
    Propagate,
}

/// Fixed-width scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    String,
    Int8,
    Int16,
    Int32,
    UInt8,
    UInt16,
    UInt32,
    Float32,
    Float64,
    Boolean,
    Buffer,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Boolean => "boolean",
            Self::Buffer => "buffer",
        }
    }

    /// Inclusive range for integer kinds.
    fn int_range(self) -> Option<(f64, f64)> {
        match self {
            Self::Int8 => Some((f64::from(i8::MIN), f64::from(i8::MAX))),
            Self::Int16 => Some((f64::from(i16::MIN), f64::from(i16::MAX))),
            Self::Int32 => Some((f64::from(i32::MIN), f64::from(i32::MAX))),
            Self::UInt8 => Some((0.0, f64::from(u8::MAX))),
            Self::UInt16 => Some((0.0, f64::from(u16::MAX))),
            Self::UInt32 => Some((0.0, f64::from(u32::MAX))),
            _ => None,
        }
    }

    fn check(self, value: &Value) -> bool {
        match (self, value) {
            (Self::String, Value::String(_)) => true,
            (Self::Boolean, Value::Bool(_)) => true,
            (Self::Buffer, Value::Buffer(_)) => true,
            // JSON framing has no NaN or infinity.
            (_, Value::Number(n)) if !n.is_finite() => false,
            (Self::Float32 | Self::Float64, Value::Number(_)) => true,
            (p, Value::Number(n)) => match p.int_range() {
                Some((min, max)) => {
                    // Out-of-range integers are accepted and truncate on
                    // encode; the warning is the only signal.
                    if *n < min || *n > max || n.fract() != 0.0 {
                        tracing::warn!(
                            value = *n,
                            ty = p.name(),
                            "integer outside declared range, will truncate"
                        );
                    }
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    fn encode(self, value: &Value, w: &mut BufferWriter) -> Result<(), TypeError> {
        let mismatch = || TypeError::Mismatch {
            expected: self.name().to_owned(),
            found: value.type_name(),
        };
        match (self, value) {
            (Self::String, Value::String(s)) => w.write_str(s)?,
            (Self::Boolean, Value::Bool(b)) => w.write_bool(*b),
            (Self::Buffer, Value::Buffer(b)) => w.write_bytes(b)?,
            (Self::Int8, Value::Number(n)) => w.write_i8(*n as i8),
            (Self::Int16, Value::Number(n)) => w.write_i16(*n as i16),
            (Self::Int32, Value::Number(n)) => w.write_i32(*n as i32),
            (Self::UInt8, Value::Number(n)) => w.write_u8(*n as u8),
            (Self::UInt16, Value::Number(n)) => w.write_u16(*n as u16),
            (Self::UInt32, Value::Number(n)) => w.write_u32(*n as u32),
            (Self::Float32, Value::Number(n)) => w.write_f32(*n as f32),
            (Self::Float64, Value::Number(n)) => w.write_f64(*n),
            _ => return Err(mismatch()),
        }
        Ok(())
    }

    fn decode(self, r: &mut BufferReader<'_>) -> Result<Value, TypeError> {
        Ok(match self {
            Self::String => Value::String(r.read_string()?),
            Self::Boolean => Value::Bool(r.read_bool()?),
            Self::Buffer => Value::Buffer(r.read_bytes()?),
            Self::Int8 => Value::from(i32::from(r.read_i8()?)),
            Self::Int16 => Value::from(i32::from(r.read_i16()?)),
            Self::Int32 => Value::from(r.read_i32()?),
            Self::UInt8 => Value::from(u32::from(r.read_u8()?)),
            Self::UInt16 => Value::from(u32::from(r.read_u16()?)),
            Self::UInt32 => Value::from(r.read_u32()?),
            Self::Float32 => Value::from(r.read_f32()?),
            Self::Float64 => Value::Number(r.read_f64()?),
        })
    }
}

/// A named member of a closed set (variant case or struct field).
#[derive(Clone)]
struct Member {
    name: String,
    hash: u32,
    ty: NetworkType,
}

impl Member {
    fn new(name: String, ty: NetworkType) -> Self {
        Self {
            hash: name_hash(&name),
            name,
            ty,
        }
    }
}

/// A string enum member: the name is hashed, the value is what the
/// application passes around.
#[derive(Clone)]
pub(crate) struct StringMember {
    pub(crate) value: String,
    pub(crate) hash: u32,
}

/// Custom type hooks supplied through [`CustomTypeBuilder`].
#[derive(Clone)]
struct CustomType {
    validate: ValidateFn,
    conversion: Option<(ConvertFn, ConvertFn)>,
    codec: Option<(EncodeFn, DecodeFn)>,
    on_deserialize_error: Option<DeserializeErrorFn>,
}

#[derive(Clone)]
enum Shape {
    Primitive(Primitive),
    Unknown,
    Player,
    Object,
    Array(NetworkType),
    Set(NetworkType),
    Map(NetworkType, NetworkType),
    Tuple(Vec<NetworkType>),
    Optional(NetworkType),
    Literal(Vec<Value>),
    StringEnum(Vec<StringMember>),
    IntEnum { values: Vec<i64>, flags: bool },
    Variant(Vec<Member>),
    Struct(Vec<Member>),
    Custom(CustomType),
}

impl Shape {
    fn conversion(&self) -> Conversion {
        use Conversion::{Passthrough, Serializable};
        match self {
            Self::Primitive(_) | Self::Unknown | Self::IntEnum { .. } => Passthrough,
            Self::Player
            | Self::Object
            | Self::Set(_)
            | Self::Map(..)
            | Self::Literal(_)
            | Self::StringEnum(_)
            | Self::Variant(_)
            | Self::Struct(_) => Serializable,
            Self::Array(t) | Self::Optional(t) => t.conversion(),
            Self::Tuple(items) => {
                if items.iter().any(|t| t.conversion() == Serializable) {
                    Serializable
                } else {
                    Passthrough
                }
            }
            Self::Custom(c) => {
                if c.conversion.is_some() {
                    Serializable
                } else {
                    Passthrough
                }
            }
        }
    }

    fn has_codec(&self) -> bool {
        match self {
            Self::Primitive(_)
            | Self::Literal(_)
            | Self::StringEnum(_)
            | Self::IntEnum { .. } => true,
            Self::Unknown | Self::Player | Self::Object => false,
            Self::Array(t) | Self::Set(t) | Self::Optional(t) => t.has_codec(),
            Self::Map(k, v) => k.has_codec() && v.has_codec(),
            Self::Tuple(items) => items.iter().all(NetworkType::has_codec),
            Self::Variant(members) | Self::Struct(members) => {
                members.iter().all(|m| m.ty.has_codec())
            }
            Self::Custom(c) => c.codec.is_some(),
        }
    }
}

struct Inner {
    name: String,
    shape: Shape,
    conversion: Conversion,
    has_codec: bool,
    message: Option<MessageFn>,
}

/// An immutable, shareable descriptor for one value shape.
#[derive(Clone)]
pub struct NetworkType {
    inner: Arc<Inner>,
}

impl NetworkType {
    fn from_shape(name: String, shape: Shape) -> Self {
        let conversion = shape.conversion();
        let has_codec = shape.has_codec();
        Self {
            inner: Arc::new(Inner {
                name,
                shape,
                conversion,
                has_codec,
                message: None,
            }),
        }
    }

    // -----------------------------------------------------------------
    // Primitives
    // -----------------------------------------------------------------

    pub fn primitive(kind: Primitive) -> Self {
        Self::from_shape(kind.name().to_owned(), Shape::Primitive(kind))
    }

    pub fn string() -> Self {
        Self::primitive(Primitive::String)
    }

    pub fn int8() -> Self {
        Self::primitive(Primitive::Int8)
    }

    pub fn int16() -> Self {
        Self::primitive(Primitive::Int16)
    }

    pub fn int32() -> Self {
        Self::primitive(Primitive::Int32)
    }

    pub fn uint8() -> Self {
        Self::primitive(Primitive::UInt8)
    }

    pub fn uint16() -> Self {
        Self::primitive(Primitive::UInt16)
    }

    pub fn uint32() -> Self {
        Self::primitive(Primitive::UInt32)
    }

    pub fn float32() -> Self {
        Self::primitive(Primitive::Float32)
    }

    pub fn float64() -> Self {
        Self::primitive(Primitive::Float64)
    }

    pub fn boolean() -> Self {
        Self::primitive(Primitive::Boolean)
    }

    pub fn buffer() -> Self {
        Self::primitive(Primitive::Buffer)
    }

    /// Accepts any value. No codec, so it forces buffer mode off.
    pub fn unknown() -> Self {
        Self::from_shape("unknown".into(), Shape::Unknown)
    }

    /// A reference to a connected player. Serializes to the raw id; has no
    /// buffer codec.
    pub fn player() -> Self {
        Self::from_shape("Player".into(), Shape::Player)
    }

    /// A reference to an application object. Serializes to the raw id; has
    /// no buffer codec.
    pub fn object() -> Self {
        Self::from_shape("Object".into(), Shape::Object)
    }

    // -----------------------------------------------------------------
    // Compound constructors
    // -----------------------------------------------------------------

    pub fn array(item: NetworkType) -> Self {
        Self::from_shape(format!("Array<{}>", item.name()), Shape::Array(item))
    }

    pub fn set(item: NetworkType) -> Self {
        Self::from_shape(format!("Set<{}>", item.name()), Shape::Set(item))
    }

    pub fn map(key: NetworkType, value: NetworkType) -> Self {
        Self::from_shape(
            format!("Map<{}, {}>", key.name(), value.name()),
            Shape::Map(key, value),
        )
    }

    /// Fixed arity; logical value is an `Array` of exactly `items.len()`.
    ///
    /// An empty tuple would encode to zero bytes, so it is rejected.
    pub fn tuple(items: impl IntoIterator<Item = NetworkType>) -> Result<Self, TypeError> {
        let items: Vec<_> = items.into_iter().collect();
        if items.is_empty() {
            return Err(TypeError::InvalidDefinition("tuple has no items".into()));
        }
        let names: Vec<_> = items.iter().map(|t| t.name()).collect();
        let name = format!("({})", names.join(", "));
        Ok(Self::from_shape(name, Shape::Tuple(items)))
    }

    /// Accepts `Nil` or the inner type. Optional arguments don't count
    /// toward the required argument count.
    pub fn optional(inner: NetworkType) -> Self {
        Self::from_shape(format!("{}?", inner.name()), Shape::Optional(inner))
    }

    /// A closed set of scalar literals (strings, numbers, booleans).
    ///
    /// Serializes to the literal's ordinal and encodes it as one byte, so
    /// at most 256 literals are allowed.
    pub fn literal<V: Into<Value>>(
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self, TypeError> {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(TypeError::InvalidDefinition(
                "literal needs at least one value".into(),
            ));
        }
        if values.len() > usize::from(u8::MAX) + 1 {
            return Err(TypeError::InvalidDefinition(format!(
                "literal has {} values, at most 256 are allowed",
                values.len()
            )));
        }
        for (i, value) in values.iter().enumerate() {
            if !matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)) {
                return Err(TypeError::InvalidDefinition(format!(
                    "literal values must be scalars, got {}",
                    value.type_name()
                )));
            }
            if values[..i].contains(value) {
                return Err(TypeError::InvalidDefinition(format!(
                    "duplicate literal {value:?}"
                )));
            }
        }
        let names: Vec<_> = values.iter().map(literal_name).collect();
        Ok(Self::from_shape(names.join(" | "), Shape::Literal(values)))
    }

    /// A closed union tagged by the hash of the case name.
    pub fn variant<S: Into<String>>(
        cases: impl IntoIterator<Item = (S, NetworkType)>,
    ) -> Result<Self, TypeError> {
        let members = members(cases, "variant")?;
        if members.is_empty() {
            return Err(TypeError::InvalidDefinition(
                "variant needs at least one case".into(),
            ));
        }
        for (i, m) in members.iter().enumerate() {
            if let Some(other) = members[..i].iter().find(|o| o.hash == m.hash) {
                return Err(TypeError::InvalidDefinition(format!(
                    "variant cases {} and {} hash to the same tag",
                    other.name, m.name
                )));
            }
        }
        let names: Vec<_> = members
            .iter()
            .map(|m| format!("{}({})", m.name, m.ty.name()))
            .collect();
        Ok(Self::from_shape(names.join(" | "), Shape::Variant(members)))
    }

    /// A record with a fixed field set. Fields are ordered on the wire by
    /// the hash of their name (ties broken by name), computed once here.
    pub fn structure<S: Into<String>>(
        fields: impl IntoIterator<Item = (S, NetworkType)>,
    ) -> Result<Self, TypeError> {
        let mut members = members(fields, "struct")?;
        if members.is_empty() {
            return Err(TypeError::InvalidDefinition("struct has no fields".into()));
        }
        members.sort_by(|a, b| a.hash.cmp(&b.hash).then_with(|| a.name.cmp(&b.name)));
        let names: Vec<_> = members
            .iter()
            .map(|m| format!("{}: {}", m.name, m.ty.name()))
            .collect();
        Ok(Self::from_shape(
            format!("{{ {} }}", names.join(", ")),
            Shape::Struct(members),
        ))
    }

    pub(crate) fn from_string_members(name: String, members: Vec<StringMember>) -> Self {
        Self::from_shape(name, Shape::StringEnum(members))
    }

    pub(crate) fn from_int_values(name: String, values: Vec<i64>, flags: bool) -> Self {
        Self::from_shape(name, Shape::IntEnum { values, flags })
    }

    /// The descriptor of a string-valued [`NetEnum`]. Memoized inside the
    /// enum, so repeated calls share one descriptor.
    pub fn string_enum(net_enum: &NetEnum) -> Result<Self, TypeError> {
        match net_enum.kind() {
            EnumKind::Strings => Ok(net_enum.network_type()),
            _ => Err(TypeError::InvalidDefinition(format!(
                "{} is not a string enum",
                net_enum.name()
            ))),
        }
    }

    /// The descriptor of an integer-valued [`NetEnum`] (plain or flags).
    pub fn int_enum(net_enum: &NetEnum) -> Result<Self, TypeError> {
        match net_enum.kind() {
            EnumKind::Ints | EnumKind::Flags => Ok(net_enum.network_type()),
            EnumKind::Strings => Err(TypeError::InvalidDefinition(format!(
                "{} is not an integer enum",
                net_enum.name()
            ))),
        }
    }

    /// Starts a custom type with the given validator.
    pub fn custom(
        name: impl Into<String>,
        validate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> CustomTypeBuilder {
        CustomTypeBuilder {
            name: name.into(),
            custom: CustomType {
                validate: Arc::new(validate),
                conversion: None,
                codec: None,
                on_deserialize_error: None,
            },
            message: None,
        }
    }

    /// Returns a copy of this type that reports rejections with `message`.
    pub fn with_message(
        self,
        message: impl Fn(&Value) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: self.inner.name.clone(),
                shape: self.inner.shape.clone(),
                conversion: self.inner.conversion,
                has_codec: self.inner.has_codec,
                message: Some(Arc::new(message)),
            }),
        }
    }

    // -----------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn conversion(&self) -> Conversion {
        self.inner.conversion
    }

    pub fn has_codec(&self) -> bool {
        self.inner.has_codec
    }

    pub fn is_optional(&self) -> bool {
        matches!(self.inner.shape, Shape::Optional(_))
    }

    /// Wire order of a struct's fields, or `None` for other types.
    pub fn field_order(&self) -> Option<Vec<&str>> {
        match &self.inner.shape {
            Shape::Struct(fields) => Some(fields.iter().map(|f| f.name.as_str()).collect()),
            _ => None,
        }
    }

    // -----------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------

    pub fn validate(&self, value: &Value) -> bool {
        self.check(value).is_ok()
    }

    /// Validates `value`, returning a message describing the first
    /// problem found.
    pub fn check(&self, value: &Value) -> Result<(), String> {
        self.check_shape(value).map_err(|detail| match &self.inner.message {
            Some(message) => message(value),
            None => detail,
        })
    }

    fn expected(&self, value: &Value) -> String {
        format!("expected {}, got {}", self.name(), value.type_name())
    }

    fn check_shape(&self, value: &Value) -> Result<(), String> {
        match (&self.inner.shape, value) {
            (Shape::Primitive(_), Value::Number(n)) if !n.is_finite() => {
                Err(format!("{} must be finite, got {n}", self.name()))
            }
            (Shape::Primitive(p), v) => {
                if p.check(v) {
                    Ok(())
                } else {
                    Err(self.expected(v))
                }
            }
            (Shape::Unknown, _) => Ok(()),
            (Shape::Player, Value::Player(_)) => Ok(()),
            (Shape::Object, Value::Object(_)) => Ok(()),
            (Shape::Array(t), Value::Array(items)) | (Shape::Set(t), Value::Set(items)) => {
                for (i, item) in items.iter().enumerate() {
                    t.check(item).map_err(|e| format!("element {i}: {e}"))?;
                }
                Ok(())
            }
            (Shape::Map(k, v), Value::Map(entries)) => {
                for (i, (key, value)) in entries.iter().enumerate() {
                    k.check(key).map_err(|e| format!("key {i}: {e}"))?;
                    v.check(value).map_err(|e| format!("value {i}: {e}"))?;
                }
                Ok(())
            }
            (Shape::Tuple(types), Value::Array(items)) => {
                if items.len() != types.len() {
                    return Err(format!(
                        "expected {} with {} elements, got {}",
                        self.name(),
                        types.len(),
                        items.len()
                    ));
                }
                for (i, (t, item)) in types.iter().zip(items).enumerate() {
                    t.check(item).map_err(|e| format!("element {i}: {e}"))?;
                }
                Ok(())
            }
            (Shape::Optional(_), Value::Nil) => Ok(()),
            (Shape::Optional(t), v) => t.check(v),
            (Shape::Literal(values), v) => {
                if values.contains(v) {
                    Ok(())
                } else {
                    Err(format!("expected {}, got {v:?}", self.name()))
                }
            }
            (Shape::StringEnum(members), Value::String(s)) => {
                if members.iter().any(|m| m.value == *s) {
                    Ok(())
                } else {
                    Err(format!("{s:?} is not a member of {}", self.name()))
                }
            }
            (Shape::IntEnum { values, flags }, Value::Number(n)) => {
                let known = n.fract() == 0.0 && (*flags || values.contains(&(*n as i64)));
                if known {
                    Ok(())
                } else {
                    Err(format!("{n} is not a member of {}", self.name()))
                }
            }
            (Shape::Variant(cases), Value::Variant { tag, value }) => {
                let case = cases
                    .iter()
                    .find(|c| c.name == *tag)
                    .ok_or_else(|| format!("unknown case {tag:?} for {}", self.name()))?;
                case.ty.check(value).map_err(|e| format!("case {tag}: {e}"))
            }
            (Shape::Struct(fields), Value::Record(record)) => {
                for (key, value) in record {
                    if !value.is_nil() && !fields.iter().any(|f| f.name == *key) {
                        return Err(format!("unexpected field {key:?}"));
                    }
                }
                for field in fields {
                    let value = record.get(&field.name).unwrap_or(&NIL);
                    field
                        .ty
                        .check(value)
                        .map_err(|e| format!("field {}: {e}", field.name))?;
                }
                Ok(())
            }
            (Shape::Custom(c), v) => {
                if (c.validate)(v) {
                    Ok(())
                } else {
                    Err(self.expected(v))
                }
            }
            (_, v) => Err(self.expected(v)),
        }
    }

    // -----------------------------------------------------------------
    // Logical ⇄ wire conversion
    // -----------------------------------------------------------------

    fn mismatch(&self, value: &Value) -> TypeError {
        TypeError::Mismatch {
            expected: self.name().to_owned(),
            found: value.type_name(),
        }
    }

    /// Converts a logical value to its plain-mode wire form.
    pub fn serialize(&self, value: &Value) -> Result<Value, TypeError> {
        if self.inner.conversion == Conversion::Passthrough {
            return Ok(value.clone());
        }
        match (&self.inner.shape, value) {
            (Shape::Player, Value::Player(id)) => Ok(Value::Number(id.0 as f64)),
            (Shape::Object, Value::Object(id)) => Ok(Value::Number(id.0 as f64)),
            (Shape::Array(t), Value::Array(items)) => Ok(Value::Array(
                items.iter().map(|v| t.serialize(v)).collect::<Result<_, _>>()?,
            )),
            (Shape::Set(t), Value::Set(items)) => Ok(Value::Array(
                items.iter().map(|v| t.serialize(v)).collect::<Result<_, _>>()?,
            )),
            (Shape::Map(k, v), Value::Map(entries)) => Ok(Value::Array(
                entries
                    .iter()
                    .map(|(key, value)| {
                        Ok(Value::Array(vec![k.serialize(key)?, v.serialize(value)?]))
                    })
                    .collect::<Result<_, TypeError>>()?,
            )),
            (Shape::Tuple(types), Value::Array(items)) if items.len() == types.len() => {
                Ok(Value::Array(
                    types
                        .iter()
                        .zip(items)
                        .map(|(t, v)| t.serialize(v))
                        .collect::<Result<_, _>>()?,
                ))
            }
            (Shape::Optional(_), Value::Nil) => Ok(Value::Nil),
            (Shape::Optional(t), v) => t.serialize(v),
            (Shape::Literal(values), v) => values
                .iter()
                .position(|l| l == v)
                .map(|i| Value::Number(i as f64))
                .ok_or_else(|| self.mismatch(v)),
            (Shape::StringEnum(members), Value::String(s)) => members
                .iter()
                .find(|m| m.value == *s)
                .map(|m| Value::Number(f64::from(m.hash)))
                .ok_or_else(|| self.mismatch(value)),
            (Shape::Variant(cases), Value::Variant { tag, value: inner }) => {
                let case = cases
                    .iter()
                    .find(|c| c.name == *tag)
                    .ok_or_else(|| self.mismatch(value))?;
                Ok(Value::Array(vec![
                    Value::Number(f64::from(case.hash)),
                    case.ty.serialize(inner)?,
                ]))
            }
            (Shape::Struct(fields), Value::Record(record)) => Ok(Value::Array(
                fields
                    .iter()
                    .map(|f| f.ty.serialize(record.get(&f.name).unwrap_or(&NIL)))
                    .collect::<Result<_, _>>()?,
            )),
            (Shape::Custom(c), v) => match &c.conversion {
                Some((serialize, _)) => serialize(v),
                None => Ok(v.clone()),
            },
            (_, v) => Err(self.mismatch(v)),
        }
    }

    /// Converts a plain-mode wire value back to its logical form.
    pub fn deserialize(&self, value: &Value) -> Result<Value, TypeError> {
        if self.inner.conversion == Conversion::Passthrough {
            return Ok(value.clone());
        }
        match (&self.inner.shape, value) {
            (Shape::Player, Value::Number(n)) => Ok(Value::Player(PlayerId(self.id(*n)?))),
            (Shape::Object, Value::Number(n)) => Ok(Value::Object(ObjectId(self.id(*n)?))),
            (Shape::Array(t), Value::Array(items)) => Ok(Value::Array(
                items.iter().map(|v| t.deserialize(v)).collect::<Result<_, _>>()?,
            )),
            (Shape::Set(t), Value::Array(items)) => Ok(Value::Set(
                items.iter().map(|v| t.deserialize(v)).collect::<Result<_, _>>()?,
            )),
            (Shape::Map(k, v), Value::Array(pairs)) => Ok(Value::Map(
                pairs
                    .iter()
                    .map(|pair| match pair.as_array() {
                        Some([key, value]) => Ok((k.deserialize(key)?, v.deserialize(value)?)),
                        _ => Err(self.mismatch(pair)),
                    })
                    .collect::<Result<_, TypeError>>()?,
            )),
            (Shape::Tuple(types), Value::Array(items)) if items.len() == types.len() => {
                Ok(Value::Array(
                    types
                        .iter()
                        .zip(items)
                        .map(|(t, v)| t.deserialize(v))
                        .collect::<Result<_, _>>()?,
                ))
            }
            (Shape::Optional(_), Value::Nil) => Ok(Value::Nil),
            (Shape::Optional(t), v) => t.deserialize(v),
            (Shape::Literal(values), Value::Number(n)) => self.ordinal(values, *n),
            (Shape::StringEnum(members), Value::Number(n)) => {
                let hash = *n as u32;
                members
                    .iter()
                    .find(|m| f64::from(m.hash) == *n)
                    .map(|m| Value::String(m.value.clone()))
                    .ok_or_else(|| TypeError::UnknownTag {
                        type_name: self.name().to_owned(),
                        hash,
                    })
            }
            (Shape::Variant(cases), Value::Array(items)) => match items.as_slice() {
                [Value::Number(n), inner] => {
                    let case = cases
                        .iter()
                        .find(|c| f64::from(c.hash) == *n)
                        .ok_or_else(|| TypeError::UnknownTag {
                            type_name: self.name().to_owned(),
                            hash: *n as u32,
                        })?;
                    Ok(Value::variant(case.name.clone(), case.ty.deserialize(inner)?))
                }
                _ => Err(self.mismatch(value)),
            },
            (Shape::Struct(fields), Value::Array(items)) if items.len() == fields.len() => {
                let mut record = std::collections::BTreeMap::new();
                for (field, item) in fields.iter().zip(items) {
                    let value = field.ty.deserialize(item)?;
                    if !value.is_nil() {
                        record.insert(field.name.clone(), value);
                    }
                }
                Ok(Value::Record(record))
            }
            (Shape::Custom(c), v) => {
                let Some((_, deserialize)) = &c.conversion else {
                    return Ok(v.clone());
                };
                match deserialize(v) {
                    Ok(value) => Ok(value),
                    Err(e) => match c.on_deserialize_error.as_ref().map(|hook| hook(&e)) {
                        Some(DeserializeFailure::Suppress) => {
                            tracing::debug!(ty = self.name(), error = %e, "deserialize error suppressed");
                            Ok(Value::Nil)
                        }
                        Some(DeserializeFailure::Propagate) | None => Err(e),
                    },
                }
            }
            (_, v) => Err(self.mismatch(v)),
        }
    }

    fn id(&self, n: f64) -> Result<u64, TypeError> {
        if n >= 0.0 && n.fract() == 0.0 && n <= u64::MAX as f64 {
            Ok(n as u64)
        } else {
            Err(TypeError::Custom {
                type_name: self.name().to_owned(),
                message: format!("{n} is not a valid id"),
            })
        }
    }

    fn ordinal(&self, values: &[Value], n: f64) -> Result<Value, TypeError> {
        let unknown = || TypeError::UnknownOrdinal {
            type_name: self.name().to_owned(),
            ordinal: n as u64,
        };
        if n < 0.0 || n.fract() != 0.0 {
            return Err(unknown());
        }
        values.get(n as usize).cloned().ok_or_else(unknown)
    }

    // -----------------------------------------------------------------
    // Buffer codec
    // -----------------------------------------------------------------

    /// Writes a logical value with this type's binary codec.
    pub fn encode(&self, value: &Value, w: &mut BufferWriter) -> Result<(), TypeError> {
        match (&self.inner.shape, value) {
            (Shape::Primitive(p), v) => p.encode(v, w),
            (Shape::Unknown | Shape::Player | Shape::Object, _) => {
                Err(TypeError::NoCodec(self.name().to_owned()))
            }
            (Shape::Array(t), Value::Array(items)) => {
                w.write_len(items.len())?;
                items.iter().try_for_each(|item| t.encode(item, w))
            }
            (Shape::Set(t), Value::Set(items)) => {
                // Canonical order: sort elements by their encoded bytes so
                // the same set always produces the same buffer.
                let mut encoded = items
                    .iter()
                    .map(|item| t.encode_to_vec(item))
                    .collect::<Result<Vec<_>, _>>()?;
                encoded.sort_unstable();
                w.write_len(encoded.len())?;
                encoded.iter().for_each(|bytes| w.write_raw(bytes));
                Ok(())
            }
            (Shape::Map(k, v), Value::Map(entries)) => {
                let mut encoded = entries
                    .iter()
                    .map(|(key, value)| Ok((k.encode_to_vec(key)?, v.encode_to_vec(value)?)))
                    .collect::<Result<Vec<_>, TypeError>>()?;
                encoded.sort_unstable();
                w.write_len(encoded.len())?;
                for (key, value) in &encoded {
                    w.write_raw(key);
                    w.write_raw(value);
                }
                Ok(())
            }
            (Shape::Tuple(types), Value::Array(items)) if items.len() == types.len() => types
                .iter()
                .zip(items)
                .try_for_each(|(t, item)| t.encode(item, w)),
            (Shape::Optional(_), Value::Nil) => {
                w.write_bool(false);
                Ok(())
            }
            (Shape::Optional(t), v) => {
                w.write_bool(true);
                t.encode(v, w)
            }
            (Shape::Literal(values), v) => {
                let index = values
                    .iter()
                    .position(|l| l == v)
                    .ok_or_else(|| self.mismatch(v))?;
                w.write_u8(index as u8);
                Ok(())
            }
            (Shape::StringEnum(members), Value::String(s)) => {
                let member = members
                    .iter()
                    .find(|m| m.value == *s)
                    .ok_or_else(|| self.mismatch(value))?;
                w.write_u32(member.hash);
                Ok(())
            }
            (Shape::IntEnum { .. }, Value::Number(n)) => {
                w.write_i32(*n as i32);
                Ok(())
            }
            (Shape::Variant(cases), Value::Variant { tag, value: inner }) => {
                let case = cases
                    .iter()
                    .find(|c| c.name == *tag)
                    .ok_or_else(|| self.mismatch(value))?;
                w.write_u32(case.hash);
                case.ty.encode(inner, w)
            }
            (Shape::Struct(fields), Value::Record(record)) => fields
                .iter()
                .try_for_each(|f| f.ty.encode(record.get(&f.name).unwrap_or(&NIL), w)),
            (Shape::Custom(c), v) => match &c.codec {
                Some((encode, _)) => encode(v, w),
                None => Err(TypeError::NoCodec(self.name().to_owned())),
            },
            (_, v) => Err(self.mismatch(v)),
        }
    }

    /// Encodes a single value into a fresh byte vector.
    pub fn encode_to_vec(&self, value: &Value) -> Result<Vec<u8>, TypeError> {
        let mut w = BufferWriter::new();
        self.encode(value, &mut w)?;
        Ok(w.into_vec())
    }

    /// Reads a logical value with this type's binary codec.
    pub fn decode(&self, r: &mut BufferReader<'_>) -> Result<Value, TypeError> {
        match &self.inner.shape {
            Shape::Primitive(p) => p.decode(r),
            Shape::Unknown | Shape::Player | Shape::Object => {
                Err(TypeError::NoCodec(self.name().to_owned()))
            }
            Shape::Array(t) => Ok(Value::Array(decode_sequence(r, |r| t.decode(r))?)),
            Shape::Set(t) => Ok(Value::Set(decode_sequence(r, |r| t.decode(r))?)),
            Shape::Map(k, v) => Ok(Value::Map(decode_sequence(r, |r| {
                Ok((k.decode(r)?, v.decode(r)?))
            })?)),
            Shape::Tuple(types) => Ok(Value::Array(
                types.iter().map(|t| t.decode(r)).collect::<Result<_, _>>()?,
            )),
            Shape::Optional(t) => {
                if r.read_bool()? {
                    t.decode(r)
                } else {
                    Ok(Value::Nil)
                }
            }
            Shape::Literal(values) => {
                let ordinal = r.read_u8()?;
                values
                    .get(usize::from(ordinal))
                    .cloned()
                    .ok_or_else(|| TypeError::UnknownOrdinal {
                        type_name: self.name().to_owned(),
                        ordinal: u64::from(ordinal),
                    })
            }
            Shape::StringEnum(members) => {
                let hash = r.read_u32()?;
                members
                    .iter()
                    .find(|m| m.hash == hash)
                    .map(|m| Value::String(m.value.clone()))
                    .ok_or_else(|| TypeError::UnknownTag {
                        type_name: self.name().to_owned(),
                        hash,
                    })
            }
            Shape::IntEnum { .. } => Ok(Value::from(r.read_i32()?)),
            Shape::Variant(cases) => {
                let hash = r.read_u32()?;
                let case = cases.iter().find(|c| c.hash == hash).ok_or_else(|| {
                    TypeError::UnknownTag {
                        type_name: self.name().to_owned(),
                        hash,
                    }
                })?;
                Ok(Value::variant(case.name.clone(), case.ty.decode(r)?))
            }
            Shape::Struct(fields) => {
                let mut record = std::collections::BTreeMap::new();
                for field in fields {
                    let value = field.ty.decode(r)?;
                    if !value.is_nil() {
                        record.insert(field.name.clone(), value);
                    }
                }
                Ok(Value::Record(record))
            }
            Shape::Custom(c) => match &c.codec {
                Some((_, decode)) => decode(r),
                None => Err(TypeError::NoCodec(self.name().to_owned())),
            },
        }
    }
}

impl fmt::Debug for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NetworkType").field(&self.inner.name).finish()
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

fn literal_name(value: &Value) -> String {
    match value {
        Value::String(s) => format!("{s:?}"),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.type_name().to_owned(),
    }
}

fn members<S: Into<String>>(
    entries: impl IntoIterator<Item = (S, NetworkType)>,
    what: &str,
) -> Result<Vec<Member>, TypeError> {
    let mut members: Vec<Member> = Vec::new();
    for (name, ty) in entries {
        let name = name.into();
        if members.iter().any(|m| m.name == name) {
            return Err(TypeError::InvalidDefinition(format!(
                "duplicate {what} member {name:?}"
            )));
        }
        members.push(Member::new(name, ty));
    }
    Ok(members)
}

/// Reads a 32-bit count, then that many elements. Capacity is bounded by
/// the bytes left so a hostile count can't force a huge allocation.
///
/// A count larger than the bytes left is only satisfiable by elements that
/// encode to nothing; those are refused so the loop stays bounded by the
/// frame size.
fn decode_sequence<T>(
    r: &mut BufferReader<'_>,
    mut element: impl FnMut(&mut BufferReader<'_>) -> Result<T, TypeError>,
) -> Result<Vec<T>, TypeError> {
    let count = r.read_len()?;
    let available = r.remaining();
    let mut items = Vec::with_capacity(count.min(available));
    for _ in 0..count {
        let before = r.remaining();
        items.push(element(r)?);
        if count > available && r.remaining() == before {
            return Err(TypeError::CountExceedsBuffer { count, remaining: available });
        }
    }
    Ok(items)
}

// ---------------------------------------------------------------------------
// CustomTypeBuilder
// ---------------------------------------------------------------------------

/// Builder for application-defined network types.
///
/// ```rust
/// use arcnet_protocol::Value;
/// use arcnet_types::NetworkType;
///
/// let even = NetworkType::custom("even", |v| {
///     v.as_f64().is_some_and(|n| n % 2.0 == 0.0)
/// })
/// .message(|v| format!("{v:?} is odd"))
/// .build();
///
/// assert!(even.validate(&Value::from(4)));
/// assert_eq!(even.check(&Value::from(3)), Err("Number(3.0) is odd".to_string()));
/// ```
pub struct CustomTypeBuilder {
    name: String,
    custom: CustomType,
    message: Option<MessageFn>,
}

impl CustomTypeBuilder {
    /// Sets the rejection message producer.
    pub fn message(mut self, message: impl Fn(&Value) -> String + Send + Sync + 'static) -> Self {
        self.message = Some(Arc::new(message));
        self
    }

    /// Sets the logical⇄wire conversion pair. The type becomes
    /// [`Conversion::Serializable`].
    pub fn serializer(
        mut self,
        serialize: impl Fn(&Value) -> Result<Value, TypeError> + Send + Sync + 'static,
        deserialize: impl Fn(&Value) -> Result<Value, TypeError> + Send + Sync + 'static,
    ) -> Self {
        self.custom.conversion = Some((Arc::new(serialize), Arc::new(deserialize)));
        self
    }

    /// Sets the binary codec pair. Without one the type forces buffer mode
    /// off.
    pub fn codec(
        mut self,
        encode: impl Fn(&Value, &mut BufferWriter) -> Result<(), TypeError> + Send + Sync + 'static,
        decode: impl Fn(&mut BufferReader<'_>) -> Result<Value, TypeError> + Send + Sync + 'static,
    ) -> Self {
        self.custom.codec = Some((Arc::new(encode), Arc::new(decode)));
        self
    }

    /// Installs a hook consulted when the deserializer fails.
    pub fn on_deserialize_error(
        mut self,
        hook: impl Fn(&TypeError) -> DeserializeFailure + Send + Sync + 'static,
    ) -> Self {
        self.custom.on_deserialize_error = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> NetworkType {
        let ty = NetworkType::from_shape(self.name, Shape::Custom(self.custom));
        match self.message {
            Some(message) => ty.with_message(move |v| message(v)),
            None => ty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_names() {
        assert_eq!(NetworkType::string().name(), "string");
        assert_eq!(NetworkType::uint16().name(), "uint16");
        assert_eq!(NetworkType::boolean().to_string(), "boolean");
    }

    #[test]
    fn test_compound_names() {
        let t = NetworkType::map(NetworkType::string(), NetworkType::array(NetworkType::int32()));
        assert_eq!(t.name(), "Map<string, Array<int32>>");
        assert_eq!(NetworkType::optional(NetworkType::string()).name(), "string?");
        assert_eq!(
            NetworkType::tuple([NetworkType::string(), NetworkType::boolean()])
                .unwrap()
                .name(),
            "(string, boolean)"
        );
        assert_eq!(
            NetworkType::literal(["A", "B"]).unwrap().name(),
            "\"A\" | \"B\""
        );
    }

    #[test]
    fn test_integer_validator_accepts_out_of_range() {
        // Out-of-range integers only warn.
        assert!(NetworkType::uint8().validate(&Value::from(300)));
        assert!(NetworkType::int8().validate(&Value::from(-1)));
        assert!(!NetworkType::int8().validate(&Value::from("1")));
    }

    #[test]
    fn test_non_finite_numbers_are_rejected() {
        let t = NetworkType::float64();
        assert_eq!(t.check(&Value::from(f64::NAN)), Err("float64 must be finite, got NaN".to_string()));
        assert!(!t.validate(&Value::from(f64::INFINITY)));
        assert!(!NetworkType::int32().validate(&Value::from(f64::NEG_INFINITY)));
        assert!(t.validate(&Value::from(1.5)));
    }

    #[test]
    fn test_out_of_range_integer_truncates_on_encode() {
        let bytes = NetworkType::uint8().encode_to_vec(&Value::from(300)).unwrap();
        assert_eq!(bytes, vec![u8::MAX]);
    }

    #[test]
    fn test_conversion_is_inherited_from_children() {
        assert_eq!(NetworkType::array(NetworkType::string()).conversion(), Conversion::Passthrough);
        assert_eq!(NetworkType::array(NetworkType::player()).conversion(), Conversion::Serializable);
        assert_eq!(
            NetworkType::tuple([NetworkType::int32(), NetworkType::object()])
                .unwrap()
                .conversion(),
            Conversion::Serializable
        );
        assert_eq!(NetworkType::set(NetworkType::string()).conversion(), Conversion::Serializable);
    }

    #[test]
    fn test_identity_types_have_no_codec() {
        assert!(!NetworkType::player().has_codec());
        assert!(!NetworkType::array(NetworkType::object()).has_codec());
        assert!(!NetworkType::unknown().has_codec());
        assert!(NetworkType::array(NetworkType::string()).has_codec());
        assert_eq!(
            NetworkType::player().encode_to_vec(&Value::Player(PlayerId(1))),
            Err(TypeError::NoCodec("Player".into()))
        );
    }

    #[test]
    fn test_check_reports_nested_position() {
        let t = NetworkType::array(NetworkType::string());
        let err = t
            .check(&Value::Array(vec![Value::from("ok"), Value::from(1)]))
            .unwrap_err();
        assert_eq!(err, "element 1: expected string, got number");
    }

    #[test]
    fn test_with_message_overrides_rejection_text() {
        let t = NetworkType::string().with_message(|_| "names are strings".into());
        assert_eq!(t.check(&Value::from(1)), Err("names are strings".into()));
        assert!(t.validate(&Value::from("x")));
    }

    #[test]
    fn test_literal_ordinals() {
        let t = NetworkType::literal(["A", "B", "C"]).unwrap();
        assert_eq!(t.serialize(&Value::from("A")).unwrap(), Value::from(0));
        assert_eq!(t.serialize(&Value::from("B")).unwrap(), Value::from(1));
        assert_eq!(t.serialize(&Value::from("C")).unwrap(), Value::from(2));
        assert_eq!(t.deserialize(&Value::from(2)).unwrap(), Value::from("C"));
    }

    #[test]
    fn test_literal_fails_closed_on_unknown_ordinal() {
        let t = NetworkType::literal(["A", "B", "C"]).unwrap();
        assert!(matches!(
            t.deserialize(&Value::from(3)),
            Err(TypeError::UnknownOrdinal { ordinal: 3, .. })
        ));
        let mut r = BufferReader::new(&[7]);
        assert!(matches!(t.decode(&mut r), Err(TypeError::UnknownOrdinal { .. })));
    }

    #[test]
    fn test_literal_rejects_bad_definitions() {
        assert!(NetworkType::literal(Vec::<Value>::new()).is_err());
        assert!(NetworkType::literal(["A", "A"]).is_err());
        assert!(NetworkType::literal([Value::Array(vec![])]).is_err());
        assert!(NetworkType::literal((0..257).map(Value::from)).is_err());
        assert!(NetworkType::literal((0..256).map(Value::from)).is_ok());
    }

    #[test]
    fn test_variant_validation_requires_known_tag_and_valid_payload() {
        let t = NetworkType::variant([
            ("Hit", NetworkType::int32()),
            ("Miss", NetworkType::optional(NetworkType::string())),
        ])
        .unwrap();
        assert!(t.validate(&Value::variant("Hit", Value::from(5))));
        assert!(t.validate(&Value::variant("Miss", Value::Nil)));
        assert!(!t.validate(&Value::variant("Hit", Value::from("five"))));
        assert!(!t.validate(&Value::variant("Crit", Value::from(5))));
        assert!(!t.validate(&Value::from(5)));
    }

    #[test]
    fn test_variant_wire_form_is_tag_hash_and_payload() {
        let t = NetworkType::variant([("Hit", NetworkType::int32())]).unwrap();
        let wire = t.serialize(&Value::variant("Hit", Value::from(5))).unwrap();
        assert_eq!(
            wire,
            Value::Array(vec![Value::Number(f64::from(name_hash("Hit"))), Value::from(5)])
        );
    }

    #[test]
    fn test_struct_field_order_is_by_name_hash() {
        let t = NetworkType::structure([
            ("alpha", NetworkType::string()),
            ("beta", NetworkType::int32()),
            ("gamma", NetworkType::boolean()),
        ])
        .unwrap();

        let mut expected = vec!["alpha", "beta", "gamma"];
        expected.sort_by_key(|name| name_hash(name));
        assert_eq!(t.field_order().unwrap(), expected);
    }

    #[test]
    fn test_struct_rejects_unknown_and_missing_fields() {
        let t = NetworkType::structure([
            ("name", NetworkType::string()),
            ("nick", NetworkType::optional(NetworkType::string())),
        ])
        .unwrap();
        assert!(t.validate(&Value::record([("name", Value::from("a"))])));
        assert!(!t.validate(&Value::record([("nick", Value::from("a"))])));
        assert!(!t.validate(&Value::record([
            ("name", Value::from("a")),
            ("age", Value::from(3)),
        ])));
    }

    #[test]
    fn test_duplicate_members_are_rejected() {
        assert!(
            NetworkType::structure([("a", NetworkType::string()), ("a", NetworkType::string())])
                .is_err()
        );
        assert!(NetworkType::variant(Vec::<(String, NetworkType)>::new()).is_err());
    }

    #[test]
    fn test_zero_width_compounds_are_rejected() {
        assert!(NetworkType::tuple([]).is_err());
        assert!(NetworkType::structure(Vec::<(String, NetworkType)>::new()).is_err());
    }

    #[test]
    fn test_set_encoding_is_canonical() {
        let t = NetworkType::set(NetworkType::string());
        let a = t
            .encode_to_vec(&Value::Set(vec![Value::from("x"), Value::from("y"), Value::from("z")]))
            .unwrap();
        let b = t
            .encode_to_vec(&Value::Set(vec![Value::from("z"), Value::from("x"), Value::from("y")]))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_map_encoding_is_canonical() {
        let t = NetworkType::map(NetworkType::string(), NetworkType::uint8());
        let a = t
            .encode_to_vec(&Value::Map(vec![
                (Value::from("b"), Value::from(2)),
                (Value::from("a"), Value::from(1)),
            ]))
            .unwrap();
        let b = t
            .encode_to_vec(&Value::Map(vec![
                (Value::from("a"), Value::from(1)),
                (Value::from("b"), Value::from(2)),
            ]))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_optional_encoding_has_presence_byte() {
        let t = NetworkType::optional(NetworkType::uint8());
        assert_eq!(t.encode_to_vec(&Value::Nil).unwrap(), vec![0]);
        assert_eq!(t.encode_to_vec(&Value::from(9)).unwrap(), vec![1, 9]);
    }

    #[test]
    fn test_player_serializes_to_raw_id() {
        let t = NetworkType::player();
        let wire = t.serialize(&Value::Player(PlayerId(12))).unwrap();
        assert_eq!(wire, Value::from(12));
        assert_eq!(t.deserialize(&wire).unwrap(), Value::Player(PlayerId(12)));
        assert!(t.deserialize(&Value::from(-1)).is_err());
    }

    #[test]
    fn test_custom_deserialize_error_hook() {
        let failing = |_: &Value| -> Result<Value, TypeError> {
            Err(TypeError::Custom {
                type_name: "stamp".into(),
                message: "bad stamp".into(),
            })
        };
        let suppressing = NetworkType::custom("stamp", |_| true)
            .serializer(|v| Ok(v.clone()), failing)
            .on_deserialize_error(|_| DeserializeFailure::Suppress)
            .build();
        assert_eq!(suppressing.deserialize(&Value::from(1)).unwrap(), Value::Nil);

        let propagating = NetworkType::custom("stamp", |_| true)
            .serializer(|v| Ok(v.clone()), failing)
            .on_deserialize_error(|_| DeserializeFailure::Propagate)
            .build();
        assert!(propagating.deserialize(&Value::from(1)).is_err());
    }

    #[test]
    fn test_custom_without_codec_has_no_codec() {
        let t = NetworkType::custom("anything", |_| true).build();
        assert!(!t.has_codec());
        assert_eq!(t.conversion(), Conversion::Passthrough);
    }
}
