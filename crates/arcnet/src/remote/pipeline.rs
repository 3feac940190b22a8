//! The per-call argument pipeline shared by every live remote.
//!
//! ```text
//! send:    invoke chain → arity → validate → serialize | encode → Payload
//! receive: Payload → deserialize | decode → arity → validate → callback chain
//! ```
//!
//! Send failures are returned to the caller. Receive failures are reported
//! to the sentinel (or logged) and the call is dropped.

use std::sync::Arc;

use arcnet_protocol::{Payload, Value};
use arcnet_types::{
    ArgumentCheck, BufferReader, NetworkType, decode_arguments, deserialize_arguments,
    encode_arguments, serialize_arguments, validate_arguments,
};

use crate::definitions::Declaration;
use crate::error::NetError;
use crate::flags::Flags;
use crate::middleware::{
    Callback, InvokeFn, RemoteInfo, Sender, compose_callback, compose_invoke,
};
use crate::sentinel::{Sentinel, SentinelEvent};

pub(crate) struct RemoteCore {
    info: RemoteInfo,
    declaration: Declaration,
    arguments: Arc<[NetworkType]>,
    invoke: InvokeFn,
}

impl RemoteCore {
    pub(crate) fn new(name: &str, declaration: Declaration, sentinel: Option<Sentinel>) -> Self {
        let info = RemoteInfo::new(name, declaration.kind(), declaration.side(), sentinel);
        let invoke = compose_invoke(declaration.invoke_middleware(), &info);
        Self {
            arguments: declaration.shared_arguments(),
            info,
            declaration,
            invoke,
        }
    }

    pub(crate) fn name(&self) -> &str {
        self.info.name()
    }

    pub(crate) fn declaration(&self) -> &Declaration {
        &self.declaration
    }

    pub(crate) fn info(&self) -> &RemoteInfo {
        &self.info
    }

    /// Wraps `inner` in the declaration's callback middleware.
    pub(crate) fn compose(&self, inner: Callback) -> Callback {
        compose_callback(self.declaration.callback_middleware(), inner, &self.info)
    }

    fn flag(&self, flag: Flags) -> bool {
        self.declaration.has_flag(flag)
    }

    // -----------------------------------------------------------------
    // Send path
    // -----------------------------------------------------------------

    /// Runs the invoke chain, checks and encodes `args`.
    pub(crate) fn outbound(&self, args: Vec<Value>) -> Result<Payload, NetError> {
        let mut args = (self.invoke)(args).map_err(|rejection| NetError::Rejected {
            remote: self.name().to_owned(),
            reason: rejection.reason,
        })?;

        let declared = self.arguments.len();
        if args.len() > declared && !self.flag(Flags::ENFORCE_ARGUMENT_COUNT) {
            tracing::warn!(
                remote = self.name(),
                arg_count = args.len(),
                expected_count = declared,
                "dropping extra arguments"
            );
            args.truncate(declared);
        }

        match validate_arguments(&args, &self.arguments, false) {
            ArgumentCheck::Ok => {}
            ArgumentCheck::ArgCountMismatch {
                arg_count,
                expected_count,
            } => {
                return Err(NetError::ArgumentCount {
                    remote: self.name().to_owned(),
                    arg_count,
                    expected_count,
                });
            }
            ArgumentCheck::ValidationError { index, message } => {
                return Err(NetError::Validation {
                    remote: self.name().to_owned(),
                    index,
                    message,
                });
            }
        }

        self.log("send", &args);
        let payload = if self.flag(Flags::USE_BUFFER_SERIALIZATION) {
            Payload::Buffer(encode_arguments(&args, &self.arguments)?)
        } else {
            Payload::Values(serialize_arguments(&args, &self.arguments)?)
        };
        Ok(payload)
    }

    // -----------------------------------------------------------------
    // Receive path
    // -----------------------------------------------------------------

    /// Decodes and checks an inbound argument list. `None` means the call
    /// was rejected and reported.
    pub(crate) fn inbound(&self, payload: Payload, sender: &Sender) -> Option<Vec<Value>> {
        let args = match payload {
            Payload::Buffer(bytes) => match decode_arguments(&bytes, &self.arguments) {
                Ok(args) => args,
                Err(e) => {
                    self.info.report(SentinelEvent::BufferDecodeError {
                        remote: self.name().to_owned(),
                        player: sender.player(),
                        index: e.index,
                        type_name: self.type_name(e.index),
                        message: e.source.to_string(),
                    });
                    return None;
                }
            },
            Payload::Values(mut values) => {
                let declared = self.arguments.len();
                if values.len() > declared && !self.flag(Flags::ENFORCE_ARGUMENT_COUNT) {
                    values.truncate(declared);
                }
                if let ArgumentCheck::ArgCountMismatch {
                    arg_count,
                    expected_count,
                } = validate_arguments(&values, &self.arguments, true)
                {
                    self.report_count(sender, arg_count, expected_count);
                    return None;
                }
                match deserialize_arguments(&values, &self.arguments) {
                    Ok(args) => args,
                    Err(e) => {
                        self.report_invalid(sender, e.index, e.source.to_string());
                        return None;
                    }
                }
            }
        };

        match validate_arguments(&args, &self.arguments, false) {
            ArgumentCheck::Ok => {}
            ArgumentCheck::ArgCountMismatch {
                arg_count,
                expected_count,
            } => {
                self.report_count(sender, arg_count, expected_count);
                return None;
            }
            ArgumentCheck::ValidationError { index, message } => {
                self.report_invalid(sender, index, message);
                return None;
            }
        }

        self.log("receive", &args);
        Some(args)
    }

    fn report_count(&self, sender: &Sender, arg_count: usize, expected_count: usize) {
        self.info.report(SentinelEvent::ArgumentCountMismatch {
            remote: self.name().to_owned(),
            player: sender.player(),
            arg_count,
            expected_count,
        });
    }

    fn report_invalid(&self, sender: &Sender, index: usize, message: String) {
        self.info.report(SentinelEvent::ValidationError {
            remote: self.name().to_owned(),
            player: sender.player(),
            index,
            type_name: self.type_name(index),
            message,
        });
    }

    /// The declared type at `index`. Past the last argument (trailing
    /// bytes) there is none.
    fn type_name(&self, index: usize) -> String {
        self.arguments
            .get(index)
            .map_or("unknown", NetworkType::name)
            .to_owned()
    }

    fn log(&self, direction: &'static str, args: &[Value]) {
        if self.flag(Flags::DEBUGGING) {
            tracing::debug!(remote = self.name(), direction, ?args, "remote traffic");
        } else if self.flag(Flags::LOGGING) {
            tracing::info!(remote = self.name(), direction, args = args.len(), "remote traffic");
        }
    }

    // -----------------------------------------------------------------
    // Return values
    // -----------------------------------------------------------------

    /// Checks and encodes a function's return value for the response.
    pub(crate) fn encode_return(&self, value: &Value) -> Result<Payload, String> {
        let Some(ty) = self.declaration.returns() else {
            return Ok(Payload::Values(vec![value.clone()]));
        };
        ty.check(value)?;
        let result = if self.flag(Flags::USE_BUFFER_SERIALIZATION) && ty.has_codec() {
            ty.encode_to_vec(value).map(Payload::Buffer)
        } else {
            ty.serialize(value).map(|wire| Payload::Values(vec![wire]))
        };
        result.map_err(|e| e.to_string())
    }

    /// Decodes and checks a response payload.
    pub(crate) fn decode_return(&self, payload: Payload) -> Result<Value, NetError> {
        let invalid = |message: String| NetError::InvalidReturn {
            remote: self.name().to_owned(),
            message,
        };
        let ty = self.declaration.returns();
        let value = match (payload, ty) {
            (Payload::Values(values), None) => values.into_iter().next().unwrap_or(Value::Nil),
            (Payload::Values(values), Some(ty)) => {
                let wire = values.into_iter().next().unwrap_or(Value::Nil);
                ty.deserialize(&wire).map_err(|e| invalid(e.to_string()))?
            }
            (Payload::Buffer(bytes), Some(ty)) => {
                let mut r = BufferReader::new(&bytes);
                let value = ty.decode(&mut r).map_err(|e| invalid(e.to_string()))?;
                r.finish().map_err(|e| invalid(e.to_string()))?;
                value
            }
            (Payload::Buffer(_), None) => {
                return Err(invalid("buffer response without a return type".into()));
            }
        };
        if let Some(ty) = ty {
            ty.check(&value).map_err(invalid)?;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetConfig;
    use crate::definitions::{DeclarationBuilder, EventBuilder, FunctionBuilder};
    use crate::middleware::InvokeFilter;
    use arcnet_protocol::PlayerId;

    fn greeting(builder: EventBuilder) -> RemoteCore {
        let decl = builder
            .arg(NetworkType::string())
            .arg(NetworkType::optional(NetworkType::uint8()))
            .on_server(&NetConfig::default())
            .unwrap();
        RemoteCore::new("Greet", decl, None)
    }

    fn player() -> Sender {
        Sender::Player(PlayerId(1))
    }

    #[test]
    fn test_plain_round_trip() {
        let core = greeting(EventBuilder::new());
        let args = vec![Value::from("hi"), Value::from(3)];
        let payload = core.outbound(args.clone()).unwrap();
        assert!(!payload.is_buffer());
        assert_eq!(core.inbound(payload, &player()), Some(args));
    }

    #[test]
    fn test_buffer_round_trip_with_missing_optional() {
        let core = greeting(EventBuilder::new().use_buffer(true));
        let args = vec![Value::from("hi")];
        let payload = core.outbound(args.clone()).unwrap();
        assert!(payload.is_buffer());
        assert_eq!(core.inbound(payload, &player()), Some(args));
    }

    #[test]
    fn test_send_rejects_bad_arguments() {
        let core = greeting(EventBuilder::new());
        assert!(matches!(
            core.outbound(vec![Value::from(1)]),
            Err(NetError::Validation { index: 0, .. })
        ));
        assert!(matches!(
            core.outbound(vec![]),
            Err(NetError::ArgumentCount {
                arg_count: 0,
                expected_count: 1,
                ..
            })
        ));
        assert!(matches!(
            core.outbound(vec![Value::from("a"), Value::from(1), Value::from(2)]),
            Err(NetError::ArgumentCount {
                arg_count: 3,
                expected_count: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_extra_arguments_dropped_when_not_enforced() {
        let core = greeting(EventBuilder::new().enforce_argument_count(false));
        let payload = core
            .outbound(vec![Value::from("a"), Value::from(1), Value::from(2)])
            .unwrap();
        assert_eq!(payload, Payload::Values(vec![Value::from("a"), Value::from(1)]));

        let inbound = Payload::Values(vec![Value::from("a"), Value::Nil, Value::from(true)]);
        assert_eq!(
            core.inbound(inbound, &player()),
            Some(vec![Value::from("a"), Value::Nil])
        );
    }

    #[tokio::test]
    async fn test_receive_failures_reach_sentinel() {
        let sentinel = Sentinel::new();
        sentinel.enable();
        let mut events = sentinel.subscribe();
        let decl = EventBuilder::new()
            .arg(NetworkType::string())
            .on_server(&NetConfig::default())
            .unwrap();
        let core = RemoteCore::new("Greet", decl, Some(sentinel));

        assert_eq!(core.inbound(Payload::Values(vec![Value::from(5)]), &player()), None);
        assert_eq!(
            events.recv().await.unwrap(),
            SentinelEvent::ValidationError {
                remote: "Greet".into(),
                player: Some(PlayerId(1)),
                index: 0,
                type_name: "string".into(),
                message: "expected string, got number".into(),
            }
        );

        assert_eq!(core.inbound(Payload::Buffer(vec![1, 2]), &player()), None);
        assert!(matches!(
            events.recv().await.unwrap(),
            SentinelEvent::BufferDecodeError { index: 0, type_name, .. } if type_name == "string"
        ));

        assert_eq!(core.inbound(Payload::Values(vec![]), &player()), None);
        assert!(matches!(
            events.recv().await.unwrap(),
            SentinelEvent::ArgumentCountMismatch {
                arg_count: 0,
                expected_count: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_invoke_middleware_vetoes_before_validation() {
        let decl = EventBuilder::new()
            .arg(NetworkType::string())
            .server_invoke_middleware(InvokeFilter::new(|_: &[Value]| false))
            .on_server(&NetConfig::default())
            .unwrap();
        let core = RemoteCore::new("Greet", decl, None);
        let err = core.outbound(vec![Value::from(1)]).unwrap_err();
        assert!(matches!(err, NetError::Rejected { .. }));
    }

    #[test]
    fn test_return_values_are_checked() {
        let decl = FunctionBuilder::new()
            .returns(NetworkType::uint32())
            .use_buffer(true)
            .on_server(&NetConfig::default())
            .unwrap();
        let core = RemoteCore::new("GetScore", decl, None);

        let payload = core.encode_return(&Value::from(42u32)).unwrap();
        assert!(payload.is_buffer());
        assert_eq!(core.decode_return(payload).unwrap(), Value::from(42u32));
        assert!(core.encode_return(&Value::from("nope")).is_err());
        assert!(matches!(
            core.decode_return(Payload::Values(vec![Value::from("nope")])),
            Err(NetError::InvalidReturn { .. })
        ));
    }
}
