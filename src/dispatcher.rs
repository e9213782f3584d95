//! The dispatcher: registries, core handler and emission hook.
//!
//! Build it once at startup, then call [`Dispatcher::handle`] once per
//! request. Registration chains the way routes do:
//!
//! ```rust
//! use strata::{Dispatcher, Pipeline, Request, Response};
//!
//! let app = Dispatcher::new()
//!     .middle_fn(|req, next| {
//!         let res = next.run(req)?;
//!         Ok(res.with_body(format!("<b>{}</b>", res.body_text())))
//!     })
//!     .core(|_req: Request, res: Response, _: &Pipeline<'_>| res.with_body("hello"));
//!
//! let res = app.handle(Request::get("/")).unwrap();
//! assert_eq!(res.body_text(), "<b>hello</b>");
//! ```

use std::sync::Arc;

use http::StatusCode;
use tracing::debug_span;

use crate::emit::{Emit, LogEmitter};
use crate::error::{Error, Result};
use crate::handler::{BoxedCore, Core};
use crate::pipeline::{Entry, Next, Pipeline};
use crate::request::Request;
use crate::response::{ExitResponse, IntoResponse, Response};
use crate::stage::Stage;
use crate::ware::{
    Afterware, Backware, Beforeware, FnMiddleware, Frontware, Middleware, Ware, WareKind, Wares,
};

/// Sequences before, front, middle, core, back and after around one request.
///
/// A dispatcher holds configuration only. Every call to [`handle`](Self::handle)
/// runs in its own [`Pipeline`], so one dispatcher may serve overlapping
/// requests from several threads.
pub struct Dispatcher {
    pub(crate) wares: Wares,
    core: Option<BoxedCore>,
    emitter: Arc<dyn Emit>,
}

impl Dispatcher {
    /// An empty dispatcher that emits through [`LogEmitter`].
    pub fn new() -> Self {
        Self { wares: Wares::default(), core: None, emitter: Arc::new(LogEmitter) }
    }

    // ── Registration ─────────────────────────────────────────────────────────

    /// Sets the core handler. Returns `self` for chaining.
    pub fn core<F, R>(mut self, core: F) -> Self
    where
        F: Fn(Request, Response, &Pipeline<'_>) -> R + Send + Sync + 'static,
        R: IntoResponse,
    {
        self.register_core(core);
        self
    }

    /// Sets the core handler, replacing any previous one.
    pub fn register_core(&mut self, core: impl Core) {
        self.core = Some(core.into_boxed_core());
    }

    /// Replaces the emission hook.
    pub fn emitter(mut self, emitter: impl Emit + 'static) -> Self {
        self.emitter = Arc::new(emitter);
        self
    }

    pub fn before(mut self, ware: impl Beforeware) -> Self {
        self.wares.before.insert(Arc::new(ware));
        self
    }

    pub fn front(mut self, ware: impl Frontware) -> Self {
        self.wares.front.insert(Arc::new(ware));
        self
    }

    /// Appends a middleware layer. The first one registered is outermost.
    pub fn middle(mut self, ware: impl Middleware) -> Self {
        self.wares.middle.insert(Arc::new(ware));
        self
    }

    /// Appends a closure as a middleware layer.
    pub fn middle_fn<F>(self, f: F) -> Self
    where
        F: Fn(Request, &mut Next<'_, '_>) -> Result<Response> + Send + Sync + 'static,
    {
        self.middle(FnMiddleware::new(f))
    }

    pub fn back(mut self, ware: impl Backware) -> Self {
        self.wares.back.insert(Arc::new(ware));
        self
    }

    pub fn after(mut self, ware: impl Afterware) -> Self {
        self.wares.after.insert(Arc::new(ware));
        self
    }

    /// Registers `ware` with the stage matching its capability.
    ///
    /// Adding the same `Arc` twice is a no-op.
    pub fn add(&mut self, ware: Arc<dyn Ware>) -> Result<WareKind> {
        self.wares.add(ware)
    }

    /// Unregisters `ware`. Returns whether it was present.
    pub fn remove(&mut self, ware: Arc<dyn Ware>) -> Result<bool> {
        self.wares.remove(ware)
    }

    pub fn has_ware(&self, ware: Arc<dyn Ware>) -> Result<bool> {
        self.wares.contains(ware)
    }

    /// Number of wares registered for `stage`.
    pub fn ware_count(&self, stage: Stage) -> usize {
        self.wares.count(stage)
    }

    // ── Factories ────────────────────────────────────────────────────────────

    pub fn create_response(&self, status: StatusCode, reason: &str) -> Response {
        Response::new(status, reason)
    }

    pub fn create_exit_response(&self, status: StatusCode, reason: &str) -> ExitResponse {
        ExitResponse::new(status, reason)
    }

    // ── Dispatch ─────────────────────────────────────────────────────────────

    /// Runs `request` through every stage and returns the final response.
    ///
    /// The response is emitted through the configured hook after backware and
    /// before afterware. Any error aborts the request on the spot; nothing is
    /// rolled back and nothing is emitted if the failure came first.
    pub fn handle(&self, request: Request) -> Result<Response> {
        self.handle_with(request, &*self.emitter)
    }

    /// Like [`handle`](Self::handle), emitting through `emitter` instead of
    /// the configured hook.
    pub fn handle_with(&self, request: Request, emitter: &dyn Emit) -> Result<Response> {
        let core = self.core.as_ref().ok_or(Error::UndefinedStateAccess("core"))?;

        let span = debug_span!("pipeline", method = %request.method(), path = request.path());
        let _entered = span.enter();

        Pipeline::new(self, core).handle(request, Entry::TopLevel(emitter))
    }
}

impl Default for Dispatcher {
    fn default() -> Self { Self::new() }
}
