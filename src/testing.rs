//! Scripted control plane used by the unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::network::{ControlPlane, Endpoint};
use crate::status::{Action, ElectionStatus};

/// One scripted answer to a status query
#[derive(Debug, Clone)]
pub enum Reply {
    Status(ElectionStatus),
    Fail(&'static str),
}

fn remote_error(endpoint: &str, message: &str) -> Error {
    Error::Request {
        endpoint: endpoint.to_string(),
        status: 503,
        body: message.to_string(),
    }
}

/// In-memory control plane with scripted answers.
///
/// Status queries pop the script front; once the script is exhausted the
/// idle status is returned forever.
pub struct ScriptedPlane {
    replies: Mutex<VecDeque<Reply>>,
    idle: ElectionStatus,
    failing_actions: Mutex<HashSet<Action>>,
    failing_proxies: HashSet<String>,
    init_delays: HashMap<String, Duration>,
    update_delays: HashMap<Action, Duration>,
    pub updates: Mutex<Vec<(Endpoint, Action)>>,
    pub inits: Mutex<Vec<(String, String)>>,
    status_calls: AtomicUsize,
}

impl ScriptedPlane {
    pub fn new(idle: ElectionStatus) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            idle,
            failing_actions: Mutex::new(HashSet::new()),
            failing_proxies: HashSet::new(),
            init_delays: HashMap::new(),
            update_delays: HashMap::new(),
            updates: Mutex::new(Vec::new()),
            inits: Mutex::new(Vec::new()),
            status_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_replies(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.replies.lock().unwrap().extend(replies);
        self
    }

    pub fn failing_action(self, action: Action) -> Self {
        self.failing_actions.lock().unwrap().insert(action);
        self
    }

    pub fn failing_proxy(mut self, proxy: &str) -> Self {
        self.failing_proxies.insert(proxy.to_string());
        self
    }

    pub fn init_delay(mut self, proxy: &str, delay: Duration) -> Self {
        self.init_delays.insert(proxy.to_string(), delay);
        self
    }

    pub fn update_delay(mut self, action: Action, delay: Duration) -> Self {
        self.update_delays.insert(action, delay);
        self
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }
}

#[async_trait]
impl ControlPlane for ScriptedPlane {
    async fn update(&self, endpoint: &Endpoint, action: Action) -> Result<()> {
        self.updates.lock().unwrap().push((endpoint.clone(), action));

        if let Some(delay) = self.update_delays.get(&action) {
            tokio::time::sleep(*delay).await;
        }

        if self.failing_actions.lock().unwrap().contains(&action) {
            return Err(remote_error(&endpoint.path(), "command rejected"));
        }
        Ok(())
    }

    async fn initialize_node(&self, election_id: &str, proxy_address: &str) -> Result<()> {
        self.inits
            .lock()
            .unwrap()
            .push((election_id.to_string(), proxy_address.to_string()));

        if let Some(delay) = self.init_delays.get(proxy_address) {
            tokio::time::sleep(*delay).await;
        }

        if self.failing_proxies.contains(proxy_address) {
            return Err(remote_error(proxy_address, "node unreachable"));
        }
        Ok(())
    }

    async fn status(&self, endpoint: &Endpoint) -> Result<ElectionStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Status(status)) => Ok(status),
            Some(Reply::Fail(message)) => Err(remote_error(&endpoint.path(), message)),
            None => Ok(self.idle),
        }
    }
}
