//! Shared test wares. Each one records what it saw into a [`Journal`].

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use http::StatusCode;
use strata::ware::{Afterware, Backware, Beforeware, Frontware, Middleware, Ware};
use strata::{Next, Outcome, Pipeline, Request, Response, Result};

/// Ordered record of everything the pipeline did.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.0.lock().unwrap().iter().any(|e| e == entry)
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// ── before ────────────────────────────────────────────────────────────────────

pub struct Before {
    pub name: &'static str,
    pub journal: Journal,
}

impl Beforeware for Before {
    fn process(&self, _: &Request, pipeline: &Pipeline<'_>) -> Result<()> {
        self.journal.push(format!("before:{}@{}", self.name, pipeline.stage()));
        Ok(())
    }
}

impl Ware for Before {
    fn into_beforeware(self: Arc<Self>) -> Option<Arc<dyn Beforeware>> { Some(self) }
}

// ── front ─────────────────────────────────────────────────────────────────────

pub struct Front {
    pub name: &'static str,
    pub exit: bool,
    pub journal: Journal,
}

impl Frontware for Front {
    fn process(&self, req: &Request, res: &Response, pipeline: &Pipeline<'_>) -> Result<Outcome> {
        self.journal.push(format!("front:{}@{}", self.name, pipeline.stage()));
        if self.exit {
            let exit = pipeline
                .create_exit_response(StatusCode::OK, "Exiting at frontware")
                .with_header("exit_at", "frontware");
            return Ok(exit.into());
        }
        Ok(Outcome::Many(vec![
            req.with_header("frontware", "1").into(),
            res.with_header("frontware", "1").into(),
        ]))
    }
}

impl Ware for Front {
    fn into_frontware(self: Arc<Self>) -> Option<Arc<dyn Frontware>> { Some(self) }
}

// ── middle ────────────────────────────────────────────────────────────────────

/// Wraps the body beneath it as `wrapN{…}wrapN` and tags request and response.
pub struct Wrap {
    pub id: u32,
    pub exit: bool,
    pub journal: Journal,
}

impl Wrap {
    pub fn new(id: u32, journal: &Journal) -> Self {
        Self { id, exit: false, journal: journal.clone() }
    }

    pub fn exiting(id: u32, journal: &Journal) -> Self {
        Self { id, exit: true, journal: journal.clone() }
    }
}

impl Middleware for Wrap {
    fn process(&self, req: Request, next: &mut Next<'_, '_>) -> Result<Response> {
        let id = self.id;
        if self.exit {
            self.journal.push(format!("middle-exit:{id}"));
            let exit = next
                .create_exit_response(StatusCode::OK, "exited in middleware")
                .with_header("exit_at", format!("middleware id {id}"))
                .with_body("exited");
            return Ok(exit.into());
        }

        self.journal.push(format!("middle-in:{id}@{}", next.stage()));
        let res = next.run(req.with_added_header("middleware", id.to_string()))?;
        self.journal.push(format!("middle-out:{id}"));

        let res = res.with_body(format!("wrap{id}{{{}}}wrap{id}", res.body_text()));
        Ok(res.with_added_header("middleware", id.to_string()))
    }
}

impl Ware for Wrap {
    fn into_middleware(self: Arc<Self>) -> Option<Arc<dyn Middleware>> { Some(self) }
}

// ── back ──────────────────────────────────────────────────────────────────────

pub struct Back {
    pub name: &'static str,
    pub journal: Journal,
}

impl Backware for Back {
    fn process(&self, req: &Request, res: Response, pipeline: &Pipeline<'_>) -> Result<Response> {
        self.journal.push(format!("back:{}@{}", self.name, pipeline.stage()));
        if let Some(exit_at) = res.header("exit_at") {
            self.journal.push(format!("back-saw-exit:{exit_at}"));
        }
        let seen: Vec<_> = req.header_values("middleware").collect();
        self.journal.push(format!("back-request-middleware:{}", seen.join(",")));
        Ok(res.with_header("backware", "1"))
    }
}

impl Ware for Back {
    fn into_backware(self: Arc<Self>) -> Option<Arc<dyn Backware>> { Some(self) }
}

// ── after ─────────────────────────────────────────────────────────────────────

pub struct After {
    pub name: &'static str,
    pub journal: Journal,
}

impl Afterware for After {
    fn process(&self, _: &Request, res: &Response, pipeline: &Pipeline<'_>) -> Result<()> {
        self.journal.push(format!("after:{}@{}:{}", self.name, pipeline.stage(), res.body_text()));
        Ok(())
    }
}

impl Ware for After {
    fn into_afterware(self: Arc<Self>) -> Option<Arc<dyn Afterware>> { Some(self) }
}

// ── core ──────────────────────────────────────────────────────────────────────

/// A core that answers `core` and records the stage and front header it saw.
pub fn recording_core(
    journal: &Journal,
) -> impl Fn(Request, Response, &Pipeline<'_>) -> Response + Send + Sync + 'static {
    let journal = journal.clone();
    move |_req: Request, res: Response, pipeline: &Pipeline<'_>| {
        journal.push(format!(
            "core@{}:frontware={}",
            pipeline.stage(),
            res.header("frontware").unwrap_or("-"),
        ));
        res.with_body("core")
    }
}

/// An emitter that records the body it was handed.
pub fn recording_emitter(journal: &Journal) -> impl Fn(&Response) + Send + Sync + 'static {
    let journal = journal.clone();
    move |res: &Response| journal.push(format!("emit:{}", res.body_text()))
}
