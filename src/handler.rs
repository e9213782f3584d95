//! Core handler trait and type erasure.
//!
//! # How the core is stored
//!
//! The dispatcher holds exactly one core handler, but its concrete type is
//! whatever closure or function the application registered. We hide it
//! behind a trait object so [`Dispatcher`](crate::Dispatcher) stays a single
//! non-generic type:
//!
//! ```text
//! fn app(req: Request, res: Response, p: &Pipeline) -> Response { … }   ← user writes this
//!        ↓ dispatcher.core(app)
//! app.into_boxed_core()                     ← Core blanket impl
//!        ↓
//! Arc::new(FnCore(app))                     ← heap-allocated wrapper
//!        ↓  stored as BoxedCore = Arc<dyn ErasedCore>
//! core.call(req, res, pipeline)             ← one vtable dispatch
//!        ↓
//! app(req, res, pipeline).into_response()
//! ```

use std::sync::Arc;

use crate::pipeline::Pipeline;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Core` trait's `into_boxed_core` method.
#[doc(hidden)]
pub trait ErasedCore {
    fn call(&self, req: Request, res: Response, pipeline: &Pipeline<'_>) -> Response;
}

#[doc(hidden)]
pub type BoxedCore = Arc<dyn ErasedCore + Send + Sync + 'static>;

/// Implemented for every valid core handler.
///
/// You never implement this yourself. It is satisfied by any function with
/// the signature:
///
/// ```text
/// fn name(req: Request, res: Response, pipeline: &Pipeline<'_>) -> impl IntoResponse
/// ```
///
/// `res` is the response as the front stage left it. The core cannot fail:
/// application errors are responses like any other.
///
/// The trait is **sealed**: only the blanket impl below can satisfy it.
pub trait Core: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_core(self) -> BoxedCore;
}

mod private {
    pub trait Sealed {}
}

impl<F, R> private::Sealed for F
where
    F: Fn(Request, Response, &Pipeline<'_>) -> R + Send + Sync + 'static,
    R: IntoResponse,
{
}

impl<F, R> Core for F
where
    F: Fn(Request, Response, &Pipeline<'_>) -> R + Send + Sync + 'static,
    R: IntoResponse,
{
    fn into_boxed_core(self) -> BoxedCore {
        Arc::new(FnCore(self))
    }
}

/// Newtype bridging a concrete core `F` to the trait-object world.
struct FnCore<F>(F);

impl<F, R> ErasedCore for FnCore<F>
where
    F: Fn(Request, Response, &Pipeline<'_>) -> R,
    R: IntoResponse,
{
    fn call(&self, req: Request, res: Response, pipeline: &Pipeline<'_>) -> Response {
        (self.0)(req, res, pipeline).into_response()
    }
}
