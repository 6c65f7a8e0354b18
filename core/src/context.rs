//! Per-request capture of session side effects.
//!
//! A [`RequestContext`] is opened by the request handler for exactly one inbound
//! request. Code running inside [`RequestContext::scope`] can reach it through
//! [`current_context`] without it being threaded through any signature, across
//! every `.await` and timer in that task.
//!
//! # Task boundaries
//!
//! The scope follows the task, not the thread. Work handed to `tokio::spawn`
//! starts without a current context; wrap it in [`propagate_context`] to carry
//! the caller's context along:
//!
//! ```ignore
//! let handle = tokio::spawn(propagate_context(async move {
//!     api.get("/session/refresh").send().await
//! }));
//! ```
//!
//! # Isolation
//!
//! Each context owns its own buffer. Two requests rendered concurrently never
//! share one, so a cookie captured for one user can never be attached to
//! another user's response.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::futures::TaskLocalFuture;

tokio::task_local! {
    static CURRENT: RequestContext;
}

/// Cookies and headers captured from nested outbound calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedEffects {
    /// Raw `Set-Cookie` values in capture order, deduplicated by exact value.
    pub cookies: Vec<String>,
    /// Response headers to forward (last write wins).
    pub headers: BTreeMap<String, String>,
}

impl CapturedEffects {
    /// Record a `Set-Cookie` value unless the identical value was already captured.
    ///
    /// Returns `true` if the cookie was new.
    pub fn push_cookie(&mut self, cookie: impl Into<String>) -> bool {
        let cookie = cookie.into();
        if self.cookies.contains(&cookie) {
            return false;
        }
        self.cookies.push(cookie);
        true
    }

    /// Record a header, replacing any earlier value under the same name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    /// Whether nothing has been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.headers.is_empty()
    }
}

/// Handle to the side-effect buffer of one inbound request.
///
/// Cloning the handle is cheap and every clone refers to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    inner: Arc<Mutex<CapturedEffects>>,
}

impl RequestContext {
    /// Create a new, empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `future` with this context installed as the current one.
    pub fn scope<F: Future>(&self, future: F) -> TaskLocalFuture<Self, F> {
        CURRENT.scope(self.clone(), future)
    }

    /// See [`CapturedEffects::push_cookie`].
    pub fn push_cookie(&self, cookie: impl Into<String>) -> bool {
        self.with_effects(|effects| effects.push_cookie(cookie))
    }

    /// See [`CapturedEffects::set_header`].
    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) {
        self.with_effects(|effects| effects.set_header(name, value));
    }

    /// Copy of everything captured so far.
    #[must_use]
    pub fn snapshot(&self) -> CapturedEffects {
        self.with_effects(|effects| CapturedEffects::clone(effects))
    }

    /// Drain everything captured so far, leaving the context empty.
    #[must_use]
    pub fn take(&self) -> CapturedEffects {
        self.with_effects(std::mem::take)
    }

    /// Whether both handles refer to the same request.
    #[must_use]
    pub fn same_request(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn with_effects<R>(&self, f: impl FnOnce(&mut CapturedEffects) -> R) -> R {
        // The buffer holds plain data; a poisoned lock still holds a usable value.
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

/// Run the future produced by `f` inside a fresh context.
///
/// Returns the future's output together with everything captured while it ran.
pub async fn with_context<F, Fut>(f: F) -> (Fut::Output, CapturedEffects)
where
    F: FnOnce(RequestContext) -> Fut,
    Fut: Future,
{
    let context = RequestContext::new();
    let output = context.scope(f(context.clone())).await;
    (output, context.take())
}

/// The context of the request the calling task is serving, if any.
#[must_use]
pub fn current_context() -> Option<RequestContext> {
    CURRENT.try_with(RequestContext::clone).ok()
}

/// Capture the caller's current context so `future` runs inside it even when
/// polled from another task.
pub fn propagate_context<F: Future>(future: F) -> impl Future<Output = F::Output> {
    let context = current_context();
    async move {
        match context {
            Some(context) => context.scope(future).await,
            None => future.await,
        }
    }
}
