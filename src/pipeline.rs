//! Request Pipeline
//!
//! In-process request handling with ordered middleware stages. Stages pass
//! values to each other only through the request's [`Scope`]:
//!
//! - outer stages attach values before calling inward ([`Key`], [`DefaultingKey`]),
//! - inner stages publish results outward through a slot the outer stage
//!   installed beforehand ([`BoxedKey`]).
//!
//! [`Supervisor::dispatch`] is the top of every call path. It converts
//! [`KeyError`]s, whether returned or raised by a `must_*` accessor, into a
//! 500 response so one broken request never takes the process down.

use crate::boxed::BoxedKey;
use crate::compose::ScopeOp;
use crate::config::PipelineConfig;
use crate::error::KeyError;
use crate::key::{DefaultingKey, Key};
use crate::scope::Scope;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const STATUS_OK: u16 = 200;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// Incoming request and the scope that travels with it
#[derive(Debug, Clone)]
pub struct Request {
    pub path: String,
    pub scope: Scope,
}

impl Request {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            scope: Scope::background(),
        }
    }

    /// Same request carrying a different scope
    pub fn with_scope(self, scope: Scope) -> Self {
        Self {
            path: self.path,
            scope,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: STATUS_OK,
            body: body.into(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: STATUS_NOT_FOUND,
            body: "not found\n".to_string(),
        }
    }

    pub fn internal_error() -> Self {
        Self {
            status: STATUS_INTERNAL_ERROR,
            body: "internal error\n".to_string(),
        }
    }
}

/// One unit of request handling
pub trait Handler: Send + Sync {
    fn handle(&self, req: Request) -> Result<Response, KeyError>;
}

/// Handler backed by a closure; see [`handler_fn`]
pub struct HandlerFn<F>(F);

/// Wrap a closure as a [`Handler`]
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(Request) -> Result<Response, KeyError> + Send + Sync,
{
    HandlerFn(f)
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(Request) -> Result<Response, KeyError> + Send + Sync,
{
    fn handle(&self, req: Request) -> Result<Response, KeyError> {
        (self.0)(req)
    }
}

/// Stage that wraps an inner handler
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler>;
}

impl<F> Middleware for F
where
    F: Fn(Arc<dyn Handler>) -> Arc<dyn Handler> + Send + Sync,
{
    fn wrap(&self, next: Arc<dyn Handler>) -> Arc<dyn Handler> {
        self(next)
    }
}

/// Ordered middleware stack. The first stage added is the outermost.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Middleware>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage<M>(mut self, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        self.stages.push(Box::new(middleware));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Wrap `endpoint` in every stage
    pub fn build(self, endpoint: Arc<dyn Handler>) -> Arc<dyn Handler> {
        self.stages
            .iter()
            .rev()
            .fold(endpoint, |next, stage| stage.wrap(next))
    }
}

/// Exact-path dispatch to endpoint handlers
#[derive(Default)]
pub struct Router {
    routes: HashMap<String, Arc<dyn Handler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, path: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        self.routes.insert(path.into(), handler);
        self
    }
}

impl Handler for Router {
    fn handle(&self, req: Request) -> Result<Response, KeyError> {
        match self.routes.get(&req.path) {
            Some(handler) => handler.handle(req),
            None => Ok(Response::not_found()),
        }
    }
}

/// Top-level supervisor for a request's call path
pub struct Supervisor;

impl Supervisor {
    /// Run `handler`, turning key failures and panics into a 500
    pub fn dispatch(handler: &dyn Handler, req: Request) -> Response {
        let path = req.path.clone();
        match catch_unwind(AssertUnwindSafe(|| handler.handle(req))) {
            Ok(Ok(resp)) => resp,
            Ok(Err(err)) => {
                error!(path = %path, key = %err.key(), error = %err, "request failed");
                Response::internal_error()
            }
            Err(payload) => {
                match payload.downcast_ref::<KeyError>() {
                    Some(err) => {
                        error!(path = %path, key = %err.key(), error = %err, "request aborted")
                    }
                    None => error!(path = %path, "request handler panicked"),
                }
                Response::internal_error()
            }
        }
    }
}

/// User attached by the authorization stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedUser {
    pub id: u64,
    pub name: String,
}

impl From<&PipelineConfig> for AuthorizedUser {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            id: config.user_id,
            name: config.user_name.clone(),
        }
    }
}

/// Logging handle carried in the scope.
///
/// The empty value (no component) is never valid, so stages read it with
/// [`DefaultingKey::require_non_empty`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLogger {
    component: String,
    request_id: Option<u64>,
}

impl RequestLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            request_id: None,
        }
    }

    pub fn for_request(&self, request_id: u64) -> Self {
        Self {
            component: self.component.clone(),
            request_id: Some(request_id),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn request_id(&self) -> Option<u64> {
        self.request_id
    }

    /// Span that tags events with this logger's fields
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            component = %self.component,
            request_id = ?self.request_id
        )
    }
}

/// Keys shared by the reference stages
pub struct RequestKeys {
    pub user: Key<AuthorizedUser>,
    pub logger: DefaultingKey<RequestLogger>,
    pub bytes_written: BoxedKey<usize>,
}

impl RequestKeys {
    pub fn new() -> Self {
        Self {
            user: Key::new(),
            logger: DefaultingKey::new(RequestLogger::new("ctxkey")),
            bytes_written: BoxedKey::new(0),
        }
    }
}

impl Default for RequestKeys {
    fn default() -> Self {
        Self::new()
    }
}

/// Stage that applies a scope operation before calling inward
pub fn attach(op: ScopeOp) -> impl Middleware {
    move |next: Arc<dyn Handler>| -> Arc<dyn Handler> {
        let op = op.clone();
        Arc::new(handler_fn(move |req: Request| {
            let scope = op.apply(req.scope.clone());
            next.handle(req.with_scope(scope))
        }))
    }
}

/// Stage that gives each request its own numbered logger
pub fn request_logging(keys: Arc<RequestKeys>) -> impl Middleware {
    let counter = Arc::new(AtomicU64::new(1));
    move |next: Arc<dyn Handler>| -> Arc<dyn Handler> {
        let keys = keys.clone();
        let counter = counter.clone();
        Arc::new(handler_fn(move |req: Request| {
            let base = keys.logger.require_non_empty(&req.scope)?;
            let logger = base.for_request(counter.fetch_add(1, Ordering::Relaxed));
            let scope = keys.logger.set(&req.scope, logger);
            next.handle(req.with_scope(scope))
        }))
    }
}

/// Stage that attaches the authorized user
pub fn authorize_user(keys: Arc<RequestKeys>, user: AuthorizedUser) -> impl Middleware {
    move |next: Arc<dyn Handler>| -> Arc<dyn Handler> {
        let keys = keys.clone();
        let user = user.clone();
        Arc::new(handler_fn(move |req: Request| {
            let logger = keys.logger.require_non_empty(&req.scope)?;
            logger.span().in_scope(|| info!(name = %user.name, "authorizing user"));

            let scope = keys.user.set(&req.scope, user.clone());
            next.handle(req.with_scope(scope))
        }))
    }
}

/// Stage that reports how many bytes the inner handler wrote.
///
/// Installs the slot before calling inward; the endpoint fills it.
pub fn bytes_written_logging(keys: Arc<RequestKeys>) -> impl Middleware {
    move |next: Arc<dyn Handler>| -> Arc<dyn Handler> {
        let keys = keys.clone();
        Arc::new(handler_fn(move |req: Request| {
            let scope = keys.bytes_written.set_box(&req.scope);
            let resp = next.handle(req.with_scope(scope.clone()))?;

            let bytes = keys.bytes_written.value(&scope);
            let logger = keys.logger.require_non_empty(&scope)?;
            logger.span().in_scope(|| {
                if bytes == 0 && resp.status == STATUS_OK {
                    warn!(status = resp.status, "response reported no bytes written");
                }
                info!(bytes, status = resp.status, "wrote response");
            });
            Ok(resp)
        }))
    }
}

/// Endpoint greeting the authorized user.
///
/// A missing user means the authorization stage was not installed; that
/// aborts the request.
pub fn hello(keys: Arc<RequestKeys>) -> impl Handler {
    handler_fn(move |req: Request| {
        let user = keys.user.must_value(&req.scope);
        let body = format!("hello {}\n", user.name);
        keys.bytes_written.set(&req.scope, body.len());
        Ok(Response::ok(body))
    })
}

/// The full reference stack: logging, authorization, byte accounting, `/hello`
pub fn reference_pipeline(keys: Arc<RequestKeys>, config: &PipelineConfig) -> Arc<dyn Handler> {
    let router = Router::new().route("/hello", Arc::new(hello(keys.clone())));
    Pipeline::new()
        .stage(request_logging(keys.clone()))
        .stage(authorize_user(keys.clone(), AuthorizedUser::from(config)))
        .stage(bytes_written_logging(keys))
        .build(Arc::new(router))
}
