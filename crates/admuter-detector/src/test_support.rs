//! Scripted authority channel for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use admuter_protocols::{AuthorityChannel, ChannelError, Request, Response};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Records every request and answers like a healthy authority unless an
/// action has been told to fail.
pub(crate) struct ScriptedChannel {
    requests: Mutex<Vec<Request>>,
    failures: Mutex<HashMap<&'static str, ChannelError>>,
    replies: Mutex<HashMap<&'static str, Response>>,
    enabled: AtomicBool,
    available: AtomicBool,
}

impl ScriptedChannel {
    pub(crate) fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            replies: Mutex::new(HashMap::new()),
            enabled: AtomicBool::new(true),
            available: AtomicBool::new(true),
        }
    }

    pub(crate) fn disabled() -> Self {
        let channel = Self::new();
        channel.enabled.store(false, Ordering::SeqCst);
        channel
    }

    /// Fail `action` with `error` until healed.
    pub(crate) fn fail(&self, action: &'static str, error: ChannelError) {
        self.failures.lock().insert(action, error);
    }

    pub(crate) fn heal(&self, action: &'static str) {
        self.failures.lock().remove(action);
    }

    /// Answer `action` with `response` instead of the default.
    pub(crate) fn reply_with(&self, action: &'static str, response: Response) {
        self.replies.lock().insert(action, response);
    }

    pub(crate) fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub(crate) fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    /// Actions sent so far, in order.
    pub(crate) fn actions(&self) -> Vec<&'static str> {
        self.requests.lock().iter().map(Request::action).collect()
    }

    pub(crate) fn count(&self, action: &str) -> usize {
        self.actions().iter().filter(|a| **a == action).count()
    }
}

#[async_trait]
impl AuthorityChannel for ScriptedChannel {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn send(&self, request: Request) -> Result<Response, ChannelError> {
        let action = request.action();
        self.requests.lock().push(request);

        if let Some(error) = self.failures.lock().get(action) {
            return Err(error.clone());
        }
        if let Some(response) = self.replies.lock().get(action) {
            return Ok(response.clone());
        }
        Ok(match action {
            "getAdMuterState" => Response::state(self.enabled.load(Ordering::SeqCst)),
            "getMetrics" => Response::metrics(0, "0s"),
            _ => Response::ok(),
        })
    }
}
