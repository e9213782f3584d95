//! The per-request state machine.
//!
//! # Why a separate object
//!
//! Onion middleware needs "the next handler" to be callable from inside each
//! layer, so the dispatcher's entry point is re-entered once per middleware
//! layer. Across those nested calls we have to remember which stage we are
//! in, how far down the middleware list we got, the response the front stage
//! finished with, and the request the deepest layer passed down.
//!
//! All of that lives in a [`Pipeline`], created fresh by every top-level
//! [`Dispatcher::handle`](crate::Dispatcher::handle). Nothing is carried over
//! between requests, and a shared dispatcher can serve overlapping requests
//! because each one owns its own pipeline.
//!
//! ```text
//! handle(req)                                   Entry::TopLevel
//!   before* → front*                            stage Before → Front → Middle
//!   M1.process(req, next) ─┐
//!                          next.run(req')       Entry::Nested
//!                          M2.process(req', next) ─┐
//!                                                  next.run(req'')   Entry::Nested
//!                                                  core(req'', outer_response)   → Back
//!                          ◄── M2 wraps ───────────┘
//!   ◄── M1 wraps ──────────┘
//!   request = req''                             deepest request wins
//!   back* → emit → after*                       stage Back → After
//! ```

use std::sync::Arc;

use http::StatusCode;
use tracing::{debug, trace};

use crate::dispatcher::Dispatcher;
use crate::emit::Emit;
use crate::error::{Error, Result};
use crate::handler::BoxedCore;
use crate::request::Request;
use crate::response::{ExitResponse, Response};
use crate::stage::Stage;
use crate::ware::{Outcome, Ware};

/// How `handle` was entered.
pub(crate) enum Entry<'e> {
    /// A fresh request from outside. Carries the hook to emit through.
    TopLevel(&'e dyn Emit),
    /// A middleware asking for the response of the layers beneath it.
    Nested,
}

/// State of one request as it moves through the stages.
///
/// Wares receive a shared reference to it; only the pipeline itself advances
/// it.
pub struct Pipeline<'d> {
    dispatcher: &'d Dispatcher,
    core: &'d BoxedCore,
    stage: Stage,
    outer_response: Response,
    inner_request: Option<Request>,
    // next middleware to run; shared by every nesting level
    cursor: usize,
}

impl<'d> Pipeline<'d> {
    pub(crate) fn new(dispatcher: &'d Dispatcher, core: &'d BoxedCore) -> Self {
        Self {
            dispatcher,
            core,
            stage: Stage::Before,
            outer_response: Response::default(),
            inner_request: None,
            cursor: 0,
        }
    }

    /// The stage currently executing.
    pub fn stage(&self) -> Stage { self.stage }

    pub fn dispatcher(&self) -> &'d Dispatcher { self.dispatcher }

    /// The response as the front stage left it. This is what the core receives.
    pub fn outer_response(&self) -> &Response { &self.outer_response }

    /// The request as the deepest middleware layer passed it down, once
    /// middleware has started.
    pub fn inner_request(&self) -> Option<&Request> { self.inner_request.as_ref() }

    pub fn create_response(&self, status: StatusCode, reason: &str) -> Response {
        self.dispatcher.create_response(status, reason)
    }

    pub fn create_exit_response(&self, status: StatusCode, reason: &str) -> ExitResponse {
        self.dispatcher.create_exit_response(status, reason)
    }

    pub fn has_ware(&self, ware: Arc<dyn Ware>) -> Result<bool> {
        self.dispatcher.has_ware(ware)
    }

    fn advance(&mut self, to: Stage) {
        debug_assert!(to >= self.stage, "stage moved backwards: {} -> {to}", self.stage);
        debug!(from = %self.stage, to = %to, "stage");
        self.stage = to;
    }

    /// The single re-entrant entry point.
    ///
    /// Top-level entries run every stage and emit. Nested entries only ever
    /// happen during the middle stage and return the response of the layers
    /// beneath the caller.
    pub(crate) fn handle(&mut self, mut request: Request, entry: Entry<'_>) -> Result<Response> {
        let emitter = match entry {
            Entry::TopLevel(emitter) => emitter,
            Entry::Nested if self.stage == Stage::Middle => return self.descend(request),
            Entry::Nested => return Err(Error::InvalidReentry { stage: self.stage }),
        };
        let dispatcher = self.dispatcher;

        // ── before ──
        if self.stage == Stage::Before {
            self.outer_response = Response::default();
            self.inner_request = None;
            self.cursor = 0;

            for (index, ware) in dispatcher.wares.before.iter().enumerate() {
                trace!(stage = %self.stage, index, "running ware");
                ware.process(&request, self)?;
            }
            self.advance(Stage::Front);
        }

        // ── front ──
        let mut response = self.outer_response.clone();
        if self.stage == Stage::Front {
            let mut exited = false;
            for (index, ware) in dispatcher.wares.front.iter().enumerate() {
                trace!(stage = %self.stage, index, "running ware");
                let outcome = ware.process(&request, &response, self)?;
                if apply(outcome, &mut request, &mut response, false)? {
                    debug!(index, "frontware exit, skipping middle and core");
                    exited = true;
                    break;
                }
            }
            self.outer_response = response.clone();
            self.advance(if exited { Stage::Back } else { Stage::Middle });
        }

        // ── middle + core ──
        if self.stage == Stage::Middle {
            // the initiating entry: descend, and by the time this returns every
            // layer has unwound back to the top
            response = self.descend(request.clone())?;
            self.advance(Stage::Back);
        }

        if let Some(inner) = &self.inner_request {
            request = inner.clone();
        }

        // ── back ──
        if self.stage == Stage::Back {
            for (index, ware) in dispatcher.wares.back.iter().enumerate() {
                trace!(stage = %self.stage, index, "running ware");
                response = ware.process(&request, response, self)?;
            }
            self.advance(Stage::After);
        }

        emitter.emit(&response);

        // ── after ──
        for (index, ware) in dispatcher.wares.after.iter().enumerate() {
            trace!(stage = %self.stage, index, "running ware");
            ware.process(&request, &response, self)?;
        }

        Ok(response)
    }

    /// One layer of the middle stage: run the next unconsumed middleware, or
    /// the core once they are exhausted.
    fn descend(&mut self, request: Request) -> Result<Response> {
        self.inner_request = Some(request.clone());

        let dispatcher = self.dispatcher;
        let Some(ware) = dispatcher.wares.middle.get(self.cursor) else {
            self.advance(Stage::Core);
            let core = self.core;
            let response = core.call(request, self.outer_response.clone(), self);
            self.advance(Stage::Back);
            return Ok(response);
        };

        trace!(stage = %self.stage, index = self.cursor, "running ware");
        self.cursor += 1;
        ware.process(request, &mut Next { pipeline: self, used: false })
    }
}

/// Applies one frontware outcome. Returns `true` when it was an exit.
fn apply(
    outcome: Outcome,
    request: &mut Request,
    response: &mut Response,
    nested: bool,
) -> Result<bool> {
    match outcome {
        Outcome::Pass => Ok(false),
        Outcome::Request(next) => {
            *request = next;
            Ok(false)
        }
        Outcome::Response(next) => {
            *response = next;
            Ok(false)
        }
        Outcome::Exit(exit) => {
            *response = exit.into_response();
            Ok(true)
        }
        Outcome::Many(_) if nested => {
            Err(Error::UnrecognizedWareResult("outcome lists cannot be nested"))
        }
        Outcome::Many(outcomes) => {
            for outcome in outcomes {
                if apply(outcome, request, response, true)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

// ── Next ──────────────────────────────────────────────────────────────────────

/// The pipeline presented to a middleware as "the next handler".
pub struct Next<'p, 'd> {
    pipeline: &'p mut Pipeline<'d>,
    // a layer gets one pass through the layers beneath it
    used: bool,
}

impl<'d> Next<'_, 'd> {
    /// Runs every layer beneath the calling middleware and returns their response.
    ///
    /// Fails with [`Error::InvalidReentry`] on the second call, whether or not
    /// the layers beneath ran to the core the first time.
    pub fn run(&mut self, request: Request) -> Result<Response> {
        if self.used {
            return Err(Error::InvalidReentry { stage: self.pipeline.stage });
        }
        self.used = true;
        self.pipeline.handle(request, Entry::Nested)
    }

    pub fn stage(&self) -> Stage { self.pipeline.stage }

    pub fn pipeline(&self) -> &Pipeline<'d> { &*self.pipeline }

    pub fn create_response(&self, status: StatusCode, reason: &str) -> Response {
        self.pipeline.create_response(status, reason)
    }

    pub fn create_exit_response(&self, status: StatusCode, reason: &str) -> ExitResponse {
        self.pipeline.create_exit_response(status, reason)
    }
}
