// Copyright 2024 broker-client contributors
// SPDX-License-Identifier: Apache-2.0

//! The single-assignment completion handle a caller observes.
//!
//! A [`RequestController`](crate::controller::RequestController) is pooled
//! and re-armed with different handler/sink pairs over its lifetime, so the
//! decoded success type necessarily varies per arming. `ResultSink` is
//! therefore object-safe and completed with a type-erased
//! [`DecodedResponse`]; concrete sinks (like [`OneshotSink<T>`]) downcast
//! back to their expected `T` at the edge, the way the teacher's
//! `HandleResponse`/`HandleError` impls for `oneshot::Sender` take a
//! concrete response type and leave decoding to the caller.

use crate::error::ControllerError;
use crate::topology::Endpoint;
use std::any::Any;
use std::fmt;

/// A decoded success body, type-erased so the controller can be generic
/// over neither the command type nor its result.
pub trait DecodedResponse: Any + Send + fmt::Debug {
    /// Invoked by the controller with the endpoint that produced this
    /// response, for responses that want to bind to it (e.g. long-lived
    /// subscriptions). Default is a no-op: most results don't care.
    fn set_receiver(&mut self, _endpoint: Endpoint) {}

    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// Blanket impl for any concrete decoded type, so handler authors never
/// implement `DecodedResponse` by hand unless they need `set_receiver`.
#[macro_export]
macro_rules! impl_decoded_response {
    ($ty:ty) => {
        impl $crate::sink::DecodedResponse for $ty {
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
            fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
                self
            }
        }
    };
}

/// Downcast a type-erased decoded response back to its concrete type.
pub fn downcast<T: 'static>(value: Box<dyn DecodedResponse>) -> Result<T, Box<dyn DecodedResponse>> {
    match value.into_any().downcast::<T>() {
        Ok(boxed) => Ok(*boxed),
        Err(any) => {
            // Reconstructing the trait object from `Box<dyn Any>` is not possible
            // once downcasting fails, so callers that hit this arm only ever see
            // it as a logic error (wrong T requested) during development.
            let _ = any;
            Err(Box::new(DowncastFailed))
        }
    }
}

#[derive(Debug)]
struct DowncastFailed;
impl_decoded_response!(DowncastFailed);

/// A single-assignment completion handle.
///
/// `complete` and `complete_err` each consume `self`, making double
/// completion a compile-time impossibility for any single `Box<dyn
/// ResultSink>` — the single-completion invariant is enforced by the
/// controller only ever holding at most one boxed sink and taking it by
/// value exactly once.
pub trait ResultSink: Send {
    fn complete(self: Box<Self>, value: Box<dyn DecodedResponse>);
    fn complete_err(self: Box<Self>, error: ControllerError);
}

/// A sink backed by a one-shot channel, downcasting the decoded response to
/// the caller's expected `T` before handing it back.
pub struct OneshotSink<T> {
    sender: tokio::sync::oneshot::Sender<Result<T, ControllerError>>,
}

impl<T: 'static + Send> OneshotSink<T> {
    pub fn new(sender: tokio::sync::oneshot::Sender<Result<T, ControllerError>>) -> Self {
        Self { sender }
    }

    /// Convenience constructor pairing a sink with its receiver.
    pub fn channel() -> (Self, tokio::sync::oneshot::Receiver<Result<T, ControllerError>>) {
        let (tx, rx) = tokio::sync::oneshot::channel();
        (Self::new(tx), rx)
    }
}

impl<T: 'static + Send> ResultSink for OneshotSink<T> {
    fn complete(self: Box<Self>, value: Box<dyn DecodedResponse>) {
        let result = match downcast::<T>(value) {
            Ok(typed) => Ok(typed),
            Err(_) => Err(ControllerError::Unexpected(anyhow::anyhow!(
                "decoded response did not match the type expected by this sink"
            ))),
        };
        // A dropped receiver means the caller stopped caring; that's not the
        // controller's problem to surface anywhere.
        let _ = self.sender.send(result);
    }

    fn complete_err(self: Box<Self>, error: ControllerError) {
        let _ = self.sender.send(Err(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct Widget(u32);
    impl_decoded_response!(Widget);

    #[tokio::test]
    async fn oneshot_sink_completes_with_downcast_value() {
        let (sink, rx) = OneshotSink::<Widget>::channel();
        let boxed: Box<dyn DecodedResponse> = Box::new(Widget(7));
        Box::new(sink).complete(boxed);
        assert_eq!(rx.await.unwrap().unwrap(), Widget(7));
    }

    #[tokio::test]
    async fn oneshot_sink_completes_err_exactly_once() {
        let (sink, rx) = OneshotSink::<Widget>::channel();
        Box::new(sink).complete_err(ControllerError::CommandRejected {
            reason: "duplicate".into(),
        });
        let result = rx.await.unwrap();
        assert!(matches!(result, Err(ControllerError::CommandRejected { .. })));
    }

    #[tokio::test]
    async fn mismatched_type_surfaces_as_unexpected_error() {
        #[derive(Debug)]
        struct Other;
        impl_decoded_response!(Other);

        let (sink, rx) = OneshotSink::<Widget>::channel();
        Box::new(sink).complete(Box::new(Other));
        assert!(matches!(rx.await.unwrap(), Err(ControllerError::Unexpected(_))));
    }
}
