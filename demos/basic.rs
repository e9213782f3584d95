//! Minimal strata demo: every stage wired up, served over HTTP.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/hello
//!   curl -i http://localhost:3000/hello -H 'x-exit: 1'      # front-stage exit
//!   curl -i http://localhost:3000/admin                     # middleware exit

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use http::StatusCode;
use strata::ware::{Afterware, Backware, Beforeware, Frontware};
use strata::{Dispatcher, Next, Outcome, Pipeline, Request, Response, Result, Server};
use tracing::info;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = Dispatcher::new()
        .before(AccessLog)
        .front(RequestId)
        .middle_fn(timing)
        .middle_fn(admin_gate)
        .back(PoweredBy)
        .after(Audit)
        .core(hello);

    if let Err(e) = Server::bind("0.0.0.0:3000").serve(Arc::new(app)).await {
        eprintln!("server error: {e}");
    }
}

// The application itself.
fn hello(req: Request, res: Response, _: &Pipeline<'_>) -> Response {
    let id = req.header("x-request-id").unwrap_or("unknown");
    res.with_header("content-type", "text/plain; charset=utf-8")
        .with_body(format!("hello {} (request {id})\n", req.path()))
}

struct AccessLog;

impl Beforeware for AccessLog {
    fn process(&self, req: &Request, _: &Pipeline<'_>) -> Result<()> {
        info!(method = %req.method(), path = req.path(), "incoming");
        Ok(())
    }
}

/// Tags request and response with an id, or exits early on `x-exit`.
struct RequestId;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl Frontware for RequestId {
    fn process(&self, req: &Request, res: &Response, pipeline: &Pipeline<'_>) -> Result<Outcome> {
        if req.header("x-exit").is_some() {
            let exit = pipeline
                .create_exit_response(StatusCode::ACCEPTED, "")
                .with_header("exit_at", "frontware")
                .with_body("exited at frontware\n");
            return Ok(exit.into());
        }
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed).to_string();
        Ok(Outcome::Many(vec![
            req.with_header("x-request-id", id.clone()).into(),
            res.with_header("x-request-id", id).into(),
        ]))
    }
}

// Outermost layer: times everything beneath it.
fn timing(req: Request, next: &mut Next<'_, '_>) -> Result<Response> {
    let start = Instant::now();
    let res = next.run(req)?;
    Ok(res.with_header("x-elapsed-us", start.elapsed().as_micros().to_string()))
}

fn admin_gate(req: Request, next: &mut Next<'_, '_>) -> Result<Response> {
    if req.path().starts_with("/admin") {
        return Ok(next.create_exit_response(StatusCode::FORBIDDEN, "").into());
    }
    next.run(req)
}

struct PoweredBy;

impl Backware for PoweredBy {
    fn process(&self, _: &Request, res: Response, _: &Pipeline<'_>) -> Result<Response> {
        Ok(res.with_header("x-powered-by", "strata"))
    }
}

struct Audit;

impl Afterware for Audit {
    fn process(&self, req: &Request, res: &Response, _: &Pipeline<'_>) -> Result<()> {
        info!(path = req.path(), status = res.status().as_u16(), exit = res.is_exit(), "audited");
        Ok(())
    }
}
