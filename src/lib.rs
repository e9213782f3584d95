//! # strata
//!
//! A six-stage request pipeline. One [`Dispatcher`] sequences pluggable
//! *wares* around a single core handler:
//!
//! ```text
//! before → front → middle (outer → inner) → core → middle (inner → outer) → back → emit → after
//! ```
//!
//! - **Beforeware** sees the request first, for side effects only.
//! - **Frontware** may replace the request or response, or short-circuit
//!   with an [`ExitResponse`] that skips straight to the back stage.
//! - **Middleware** wraps everything beneath it, onion style: each layer
//!   calls [`Next::run`] and then reshapes what comes back.
//! - The **core** is your application.
//! - **Backware** post-processes the response.
//! - The response is **emitted** (written to the client, logged, …).
//! - **Afterware** runs last, for side effects only.
//!
//! Requests and responses are immutable values. Every change is
//! "derive a copy and hand it on".
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strata::{Dispatcher, Pipeline, Request, Response, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Dispatcher::new()
//!         .middle_fn(|req, next| {
//!             let res = next.run(req.with_header("x-layer", "outer"))?;
//!             Ok(res.with_added_header("x-layer", "outer"))
//!         })
//!         .core(hello);
//!
//!     Server::bind("0.0.0.0:3000").serve(Arc::new(app)).await.unwrap();
//! }
//!
//! fn hello(req: Request, res: Response, _: &Pipeline<'_>) -> Response {
//!     res.with_body(format!("hello from {}", req.path()))
//! }
//! ```

mod dispatcher;
mod emit;
mod error;
mod handler;
mod pipeline;
mod request;
mod response;
mod server;
mod stage;

pub mod ware;

pub use dispatcher::Dispatcher;
pub use emit::{Emit, LogEmitter};
pub use error::{Error, Result};
pub use handler::Core;
pub use pipeline::{Next, Pipeline};
pub use request::Request;
pub use response::{ExitResponse, IntoResponse, Response};
pub use server::Server;
pub use stage::Stage;
pub use ware::{Outcome, WareKind};
