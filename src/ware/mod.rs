//! The five ware capabilities.
//!
//! A *ware* is a pluggable unit of behaviour attached to one stage of the
//! pipeline. Which stage is decided by which capability trait the type
//! implements, not by where it was registered:
//!
//! | Trait | Runs | May change |
//! |---|---|---|
//! | [`Beforeware`] | first, once per request | nothing (side effects only) |
//! | [`Frontware`]  | after beforeware | request, response, or exit early |
//! | [`Middleware`] | wrapped around the core, onion style | anything it returns |
//! | [`Backware`]   | after the core (or an exit) | the response |
//! | [`Afterware`]  | after the response was emitted | nothing (side effects only) |
//!
//! # Registering by capability
//!
//! [`Dispatcher::add`](crate::Dispatcher::add) takes any [`Ware`] and asks it
//! which capability it offers. A type opts in by returning itself from the
//! matching `into_*` method:
//!
//! ```rust
//! use std::sync::Arc;
//! use strata::{Dispatcher, Pipeline, Request, Result};
//! use strata::ware::{Beforeware, Ware};
//!
//! struct Audit;
//!
//! impl Beforeware for Audit {
//!     fn process(&self, req: &Request, _: &Pipeline<'_>) -> Result<()> {
//!         tracing::info!(path = req.path(), "audit");
//!         Ok(())
//!     }
//! }
//!
//! impl Ware for Audit {
//!     fn into_beforeware(self: Arc<Self>) -> Option<Arc<dyn Beforeware>> { Some(self) }
//! }
//!
//! let mut app = Dispatcher::new();
//! let audit = Arc::new(Audit);
//! app.add(audit.clone()).unwrap();
//! assert!(app.has_ware(audit).unwrap());
//! ```
//!
//! A type that offers no capability, or more than one, is rejected with
//! [`Error::UnrecognizedWareKind`](crate::Error::UnrecognizedWareKind).

mod registry;

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::pipeline::{Next, Pipeline};
use crate::request::Request;
use crate::response::{ExitResponse, Response};

pub use registry::{Registry, Wares};

// ── Capabilities ──────────────────────────────────────────────────────────────

/// Runs before anything else. Sees the request as it arrived.
pub trait Beforeware: Send + Sync + 'static {
    fn process(&self, request: &Request, pipeline: &Pipeline<'_>) -> Result<()>;
}

/// Runs after beforeware. May replace the request, the response, or both,
/// or end the front and middle stages early with an [`ExitResponse`].
pub trait Frontware: Send + Sync + 'static {
    fn process(
        &self,
        request: &Request,
        response: &Response,
        pipeline: &Pipeline<'_>,
    ) -> Result<Outcome>;
}

/// Onion-model middleware.
///
/// Call [`Next::run`] to get the response from every layer beneath this one,
/// then wrap or replace it. Not calling `next` at all skips the remaining
/// middleware and the core; the first-registered middleware is outermost.
pub trait Middleware: Send + Sync + 'static {
    fn process(&self, request: Request, next: &mut Next<'_, '_>) -> Result<Response>;
}

/// Runs once the core (or an exit) produced a response. Returns the
/// response to hand to the next backware.
pub trait Backware: Send + Sync + 'static {
    fn process(
        &self,
        request: &Request,
        response: Response,
        pipeline: &Pipeline<'_>,
    ) -> Result<Response>;
}

/// Runs after the response was emitted. Side effects only.
pub trait Afterware: Send + Sync + 'static {
    fn process(
        &self,
        request: &Request,
        response: &Response,
        pipeline: &Pipeline<'_>,
    ) -> Result<()>;
}

/// What a [`Frontware`] hands back.
#[derive(Clone, Debug)]
pub enum Outcome {
    /// Nothing changed.
    Pass,
    /// Continue with this request.
    Request(Request),
    /// Continue with this response.
    Response(Response),
    /// Stop the front stage, skip middleware and core.
    Exit(ExitResponse),
    /// Several of the above, applied in order. Cannot be nested.
    Many(Vec<Outcome>),
}

impl From<Request> for Outcome {
    fn from(req: Request) -> Self { Self::Request(req) }
}

impl From<Response> for Outcome {
    fn from(res: Response) -> Self { Self::Response(res) }
}

impl From<ExitResponse> for Outcome {
    fn from(exit: ExitResponse) -> Self { Self::Exit(exit) }
}

// ── Classification ────────────────────────────────────────────────────────────

/// Capability probe used by `add`, `remove` and `has_ware`.
///
/// Override exactly one `into_*` method to return `Some(self)`.
pub trait Ware: Send + Sync + 'static {
    fn into_beforeware(self: Arc<Self>) -> Option<Arc<dyn Beforeware>> { None }
    fn into_frontware(self: Arc<Self>) -> Option<Arc<dyn Frontware>> { None }
    fn into_middleware(self: Arc<Self>) -> Option<Arc<dyn Middleware>> { None }
    fn into_backware(self: Arc<Self>) -> Option<Arc<dyn Backware>> { None }
    fn into_afterware(self: Arc<Self>) -> Option<Arc<dyn Afterware>> { None }

    /// True for opaque callables whose stage cannot be told from their type.
    ///
    /// They are added as middleware, but `remove` and `has_ware` search every
    /// registry for them.
    fn is_callable(&self) -> bool { false }
}

/// The registry a ware was routed to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum WareKind {
    Before,
    Front,
    Middle,
    Back,
    After,
    /// An opaque callable, registered as middleware.
    Callable,
}

/// A ware resolved to its one capability.
pub(crate) enum Classified {
    Before(Arc<dyn Beforeware>),
    Front(Arc<dyn Frontware>),
    Middle(Arc<dyn Middleware>),
    Back(Arc<dyn Backware>),
    After(Arc<dyn Afterware>),
    Callable(Arc<dyn Middleware>),
}

impl Classified {
    pub(crate) fn kind(&self) -> WareKind {
        match self {
            Self::Before(_)   => WareKind::Before,
            Self::Front(_)    => WareKind::Front,
            Self::Middle(_)   => WareKind::Middle,
            Self::Back(_)     => WareKind::Back,
            Self::After(_)    => WareKind::After,
            Self::Callable(_) => WareKind::Callable,
        }
    }
}

pub(crate) fn classify(ware: &Arc<dyn Ware>) -> Result<Classified> {
    if ware.is_callable() {
        return Arc::clone(ware)
            .into_middleware()
            .map(Classified::Callable)
            .ok_or(Error::UnrecognizedWareKind("callable offers no middleware capability"));
    }

    let mut found = Vec::with_capacity(1);
    if let Some(w) = Arc::clone(ware).into_beforeware() { found.push(Classified::Before(w)); }
    if let Some(w) = Arc::clone(ware).into_frontware()  { found.push(Classified::Front(w)); }
    if let Some(w) = Arc::clone(ware).into_middleware() { found.push(Classified::Middle(w)); }
    if let Some(w) = Arc::clone(ware).into_backware()   { found.push(Classified::Back(w)); }
    if let Some(w) = Arc::clone(ware).into_afterware()  { found.push(Classified::After(w)); }

    let mut found = found.into_iter();
    match (found.next(), found.next()) {
        (Some(one), None) => Ok(one),
        (None, _)         => Err(Error::UnrecognizedWareKind("offers none of the five capabilities")),
        (Some(_), Some(_)) => Err(Error::UnrecognizedWareKind("offers more than one capability")),
    }
}

// ── Closures as middleware ────────────────────────────────────────────────────

/// A closure accepted as middleware.
///
/// Built by [`Dispatcher::middle_fn`](crate::Dispatcher::middle_fn) or
/// [`FnMiddleware::new`]. Classifies as [`WareKind::Callable`].
pub struct FnMiddleware<F>(F);

impl<F> FnMiddleware<F>
where
    F: Fn(Request, &mut Next<'_, '_>) -> Result<Response> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self { Self(f) }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(Request, &mut Next<'_, '_>) -> Result<Response> + Send + Sync + 'static,
{
    fn process(&self, request: Request, next: &mut Next<'_, '_>) -> Result<Response> {
        (self.0)(request, next)
    }
}

impl<F> Ware for FnMiddleware<F>
where
    F: Fn(Request, &mut Next<'_, '_>) -> Result<Response> + Send + Sync + 'static,
{
    fn into_middleware(self: Arc<Self>) -> Option<Arc<dyn Middleware>> { Some(self) }

    fn is_callable(&self) -> bool { true }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Front;
    impl Frontware for Front {
        fn process(&self, _: &Request, _: &Response, _: &Pipeline<'_>) -> Result<Outcome> {
            Ok(Outcome::Pass)
        }
    }
    impl Ware for Front {
        fn into_frontware(self: Arc<Self>) -> Option<Arc<dyn Frontware>> { Some(self) }
    }

    struct Nothing;
    impl Ware for Nothing {}

    struct Both;
    impl Backware for Both {
        fn process(&self, _: &Request, res: Response, _: &Pipeline<'_>) -> Result<Response> {
            Ok(res)
        }
    }
    impl Afterware for Both {
        fn process(&self, _: &Request, _: &Response, _: &Pipeline<'_>) -> Result<()> {
            Ok(())
        }
    }
    impl Ware for Both {
        fn into_backware(self: Arc<Self>) -> Option<Arc<dyn Backware>> { Some(self) }
        fn into_afterware(self: Arc<Self>) -> Option<Arc<dyn Afterware>> { Some(self) }
    }

    fn kind_of(ware: Arc<dyn Ware>) -> Result<WareKind> {
        classify(&ware).map(|c| c.kind())
    }

    #[test]
    fn single_capability_picks_its_registry() {
        assert_eq!(kind_of(Arc::new(Front)).unwrap(), WareKind::Front);
    }

    #[test]
    fn closures_classify_as_callable() {
        let mw = FnMiddleware::new(|req, next: &mut Next<'_, '_>| next.run(req));
        assert_eq!(kind_of(Arc::new(mw)).unwrap(), WareKind::Callable);
    }

    #[test]
    fn no_capability_is_rejected() {
        let err = kind_of(Arc::new(Nothing)).unwrap_err();
        assert!(matches!(err, Error::UnrecognizedWareKind(_)));
    }

    #[test]
    fn two_capabilities_are_rejected() {
        let err = kind_of(Arc::new(Both)).unwrap_err();
        assert!(matches!(err, Error::UnrecognizedWareKind(_)));
    }
}
