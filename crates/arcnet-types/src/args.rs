//! Positional argument lists.
//!
//! Every remote carries an ordered list of [`NetworkType`]s. These helpers
//! apply the per-type operations across a whole argument list: arity and
//! validation checks, plain-mode conversion, and buffer-mode encoding.

use arcnet_protocol::Value;

use crate::buffer::{BufferReader, BufferWriter};
use crate::network_type::{Conversion, NetworkType};
use crate::{ArgumentError, TypeError};

/// Outcome of [`validate_arguments`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentCheck {
    Ok,
    /// Fewer arguments than required, or more than declared.
    ArgCountMismatch {
        arg_count: usize,
        expected_count: usize,
    },
    /// The argument at `index` was rejected by its type.
    ValidationError { index: usize, message: String },
}

impl ArgumentCheck {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Number of leading non-optional arguments a call must supply.
///
/// Optional arguments can only be omitted from the end, so the count stops
/// at the last required argument.
pub fn required_count(types: &[NetworkType]) -> usize {
    types
        .iter()
        .rposition(|t| !t.is_optional())
        .map_or(0, |i| i + 1)
}

/// Checks `args` against `types`.
///
/// The call must supply at least [`required_count`] arguments and at most
/// `types.len()`. With `skip_validation` only the arity is checked. Missing
/// trailing arguments are validated as `Nil`.
pub fn validate_arguments(
    args: &[Value],
    types: &[NetworkType],
    skip_validation: bool,
) -> ArgumentCheck {
    let required = required_count(types);
    if args.len() < required {
        return ArgumentCheck::ArgCountMismatch {
            arg_count: args.len(),
            expected_count: required,
        };
    }
    if args.len() > types.len() {
        return ArgumentCheck::ArgCountMismatch {
            arg_count: args.len(),
            expected_count: types.len(),
        };
    }
    if skip_validation {
        return ArgumentCheck::Ok;
    }

    let nil = Value::Nil;
    for (index, ty) in types.iter().enumerate() {
        let arg = args.get(index).unwrap_or(&nil);
        if let Err(message) = ty.check(arg) {
            return ArgumentCheck::ValidationError { index, message };
        }
    }
    ArgumentCheck::Ok
}

/// Converts logical arguments to their plain-mode wire form.
pub fn serialize_arguments(
    args: &[Value],
    types: &[NetworkType],
) -> Result<Vec<Value>, ArgumentError> {
    convert(args, types, NetworkType::serialize)
}

/// Converts plain-mode wire arguments back to their logical form.
pub fn deserialize_arguments(
    args: &[Value],
    types: &[NetworkType],
) -> Result<Vec<Value>, ArgumentError> {
    convert(args, types, NetworkType::deserialize)
}

fn convert(
    args: &[Value],
    types: &[NetworkType],
    op: fn(&NetworkType, &Value) -> Result<Value, TypeError>,
) -> Result<Vec<Value>, ArgumentError> {
    args.iter()
        .enumerate()
        .map(|(index, arg)| match types.get(index) {
            Some(ty) if ty.conversion() == Conversion::Serializable => {
                op(ty, arg).map_err(|e| ArgumentError::new(index, e))
            }
            // Passthrough types and excess arguments are left as they are.
            _ => Ok(arg.clone()),
        })
        .collect()
}

/// Encodes logical arguments with each type's codec.
///
/// Missing trailing arguments are encoded as `Nil`, so every declared type
/// is present in the buffer.
pub fn encode_arguments(args: &[Value], types: &[NetworkType]) -> Result<Vec<u8>, ArgumentError> {
    if let Some(index) = types.iter().position(|t| !t.has_codec()) {
        return Err(ArgumentError::new(
            index,
            TypeError::NoCodec(types[index].name().to_owned()),
        ));
    }
    if args.len() > types.len() {
        return Err(ArgumentError::new(
            types.len(),
            TypeError::TrailingBytes(args.len() - types.len()),
        ));
    }

    let nil = Value::Nil;
    let mut w = BufferWriter::new();
    for (index, ty) in types.iter().enumerate() {
        let arg = args.get(index).unwrap_or(&nil);
        ty.encode(arg, &mut w)
            .map_err(|e| ArgumentError::new(index, e))?;
    }
    Ok(w.into_vec())
}

/// Decodes a buffer produced by [`encode_arguments`]. Leftover bytes are an
/// error.
pub fn decode_arguments(bytes: &[u8], types: &[NetworkType]) -> Result<Vec<Value>, ArgumentError> {
    if let Some(index) = types.iter().position(|t| !t.has_codec()) {
        return Err(ArgumentError::new(
            index,
            TypeError::NoCodec(types[index].name().to_owned()),
        ));
    }

    let mut r = BufferReader::new(bytes);
    let mut args = Vec::with_capacity(types.len());
    for (index, ty) in types.iter().enumerate() {
        args.push(ty.decode(&mut r).map_err(|e| ArgumentError::new(index, e))?);
    }
    r.finish()
        .map_err(|e| ArgumentError::new(types.len(), e))?;

    // Trailing optional arguments that were absent decode as Nil; drop
    // them so the callback sees the call as it was made.
    let required = required_count(types);
    while args.len() > required && args.last().is_some_and(Value::is_nil) {
        args.pop();
    }
    Ok(args)
}
