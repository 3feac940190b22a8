//! Network types for Arcnet.
//!
//! A remote's signature is a list of [`NetworkType`]s. Each one validates
//! values handed to it by application code, converts them to and from their
//! plain-mode wire form, and (in buffer mode) encodes them into a compact
//! little-endian binary form.
//!
//! ```rust
//! use arcnet_protocol::Value;
//! use arcnet_types::{NetworkType, encode_arguments, decode_arguments};
//!
//! let types = [NetworkType::string(), NetworkType::array(NetworkType::uint8())];
//! let args = vec![
//!     Value::from("scores"),
//!     Value::Array(vec![Value::from(3), Value::from(9)]),
//! ];
//!
//! let bytes = encode_arguments(&args, &types).unwrap();
//! assert_eq!(decode_arguments(&bytes, &types).unwrap(), args);
//! ```

mod args;
mod buffer;
mod enums;
mod error;
mod hash;
mod network_type;

pub use args::{
    ArgumentCheck, decode_arguments, deserialize_arguments, encode_arguments, required_count,
    serialize_arguments, validate_arguments,
};
pub use buffer::{BufferReader, BufferWriter};
pub use enums::{EnumKind, NetEnum};
pub use error::{ArgumentError, TypeError};
pub use hash::name_hash;
pub use network_type::{
    Conversion, ConvertFn, CustomTypeBuilder, DecodeFn, DeserializeErrorFn, DeserializeFailure,
    EncodeFn, MessageFn, NetworkType, Primitive, ValidateFn,
};
