//! HTTP server and graceful shutdown.
//!
//! The server turns each incoming HTTP request into a [`Request`], runs it
//! through the dispatcher on tokio's blocking pool, and writes the response
//! back the moment it is emitted. The pipeline is synchronous, so it must
//! not occupy an async worker thread while wares run.
//!
//! Emission happens before afterware. The client therefore has its response
//! while afterware (audit logs, metrics flushes) is still running; failures
//! from that point on are logged, not sent.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Immediately stopping `listener.accept()`, so no new connections are made.
//! 2. Letting every in-flight connection task run to completion.
//! 3. Returning from [`Server::serve`], which lets `main` exit cleanly.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinError;
use tracing::{error, info, warn};

use crate::dispatcher::Dispatcher;
use crate::emit::Emit;
use crate::error::Result;
use crate::request::Request;
use crate::response::Response;

/// The HTTP server.
pub struct Server {
    addr: String,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust,no_run
    /// use strata::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// Starts accepting connections and dispatching them through `dispatcher`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, dispatcher: Arc<Dispatcher>) -> Result<()> {
        self.serve_with_shutdown(dispatcher, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), stopping when `shutdown` resolves.
    pub async fn serve_with_shutdown(
        self,
        dispatcher: Arc<Dispatcher>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<()> {
        let listener = TcpListener::bind(self.addr.as_str()).await?;
        info!(addr = %listener.local_addr()?, "strata listening");

        // one entry per open connection; drained before serve returns
        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // shutdown wins ties with a pending accept
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let dispatcher = Arc::clone(&dispatcher);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // each request on this connection gets its own pipeline
                        let svc = service_fn(move |req| {
                            let dispatcher = Arc::clone(&dispatcher);
                            async move { dispatch(dispatcher, req, remote_addr).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // closed connections leave the set here, not only at shutdown
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("strata stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Forwards the emitted response to the connection task waiting on it.
struct ChannelEmitter(Mutex<Option<oneshot::Sender<Response>>>);

impl Emit for ChannelEmitter {
    fn emit(&self, response: &Response) {
        let sender = match self.0.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(tx) = sender {
            // the receiver is gone only if the client hung up
            let _ = tx.send(response.clone());
        }
    }
}

/// Runs one HTTP request through a fresh pipeline.
///
/// The error type is [`Infallible`]: pipeline failures become `500`, unreadable
/// bodies `400`, so hyper never sees an error.
async fn dispatch(
    dispatcher: Arc<Dispatcher>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(Response::new(StatusCode::BAD_REQUEST, "").into_http());
        }
    };

    let request = Request::from_http(parts, body);
    let (tx, rx) = oneshot::channel();
    let emitter = ChannelEmitter(Mutex::new(Some(tx)));
    let task = tokio::task::spawn_blocking(move || dispatcher.handle_with(request, &emitter));

    let response = match rx.await {
        Ok(response) => {
            // afterware may still be running
            tokio::spawn(async move { report(task.await, remote_addr) });
            response
        }
        Err(_) => {
            // dropped without emitting: the pipeline failed before the back stage finished
            report(task.await, remote_addr);
            Response::new(StatusCode::INTERNAL_SERVER_ERROR, "")
        }
    };

    Ok(response.into_http())
}

fn report(outcome: Result<Result<Response>, JoinError>, peer: SocketAddr) {
    match outcome {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => error!(peer = %peer, "pipeline failed: {e}"),
        Err(e) => error!(peer = %peer, "pipeline panicked: {e}"),
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On Windows only Ctrl-C is available. A handler that cannot be installed
/// is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
