//! Response emission.
//!
//! The pipeline hands its final response to an [`Emit`] hook exactly once
//! per request, after backware and before afterware. What "emitting" means
//! (writing to a socket, a channel, a log) is up to the hook.

use tracing::info;

use crate::response::Response;

/// Delivers a finished response to its destination.
pub trait Emit: Send + Sync {
    fn emit(&self, response: &Response);
}

/// Any `Fn(&Response)` is an emitter.
impl<F> Emit for F
where
    F: Fn(&Response) + Send + Sync,
{
    fn emit(&self, response: &Response) {
        self(response)
    }
}

/// The default hook: records the response as a structured log event.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogEmitter;

impl Emit for LogEmitter {
    fn emit(&self, response: &Response) {
        info!(
            status = response.status().as_u16(),
            reason = response.reason(),
            headers = response.headers().len(),
            body_len = response.body().len(),
            exit = response.is_exit(),
            "response emitted"
        );
    }
}
