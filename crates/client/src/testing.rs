// Mock collaborators shared by the unit tests: a scripted socket and a
// scripted metadata fetcher.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use pagesync_common::protocol::{CommitData, RequestEnvelope};
use pagesync_common::types::{Line, PageSnapshot};

use crate::client::Client;
use crate::error::Error;
use crate::fetch::{FetchError, PageFetcher};
use crate::transport::{ServerEvent, SocketConnector, SocketTransport};

pub(crate) const USER: &str = "5f4db4a1e51c2b0f00a1b2c3";

pub(crate) fn line(id: &str, text: &str) -> Line {
    Line {
        id: id.to_string(),
        text: text.to_string(),
        user_id: USER.to_string(),
        created: 1_700_000_000,
        updated: 1_700_000_000,
    }
}

pub(crate) fn page(commit_id: &str, persistent: bool, lines: Vec<Line>) -> PageSnapshot {
    PageSnapshot { id: "page-1".to_string(), commit_id: commit_id.to_string(), lines, persistent }
}

pub(crate) fn client_with(socket: &Arc<MockSocket>, fetcher: &Arc<MockFetcher>) -> Client {
    let connector = Arc::new(MockConnector { socket: Arc::clone(socket) });
    Client::new(Arc::clone(fetcher) as Arc<dyn PageFetcher>, connector)
}

// ── Socket ──────────────────────────────────────────────────────────

/// Records every request and answers commits from a scripted reply queue
/// (acking with a generated commit id when the queue is empty).
pub(crate) struct MockSocket {
    requests: StdMutex<Vec<RequestEnvelope>>,
    commit_replies: StdMutex<VecDeque<Result<Value, String>>>,
    commit_seq: AtomicU64,
    events: StdMutex<Option<broadcast::Sender<ServerEvent>>>,
    disconnected: AtomicBool,
}

impl MockSocket {
    pub(crate) fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(32);
        Arc::new(Self {
            requests: StdMutex::new(Vec::new()),
            commit_replies: StdMutex::new(VecDeque::new()),
            commit_seq: AtomicU64::new(1),
            events: StdMutex::new(Some(events)),
            disconnected: AtomicBool::new(false),
        })
    }

    pub(crate) fn reject_next_commit(&self, reason: &str) {
        self.commit_replies
            .lock()
            .expect("commit reply lock")
            .push_back(Err(reason.to_string()));
    }

    pub(crate) fn ack_next_commit(&self, commit_id: &str) {
        self.commit_replies
            .lock()
            .expect("commit reply lock")
            .push_back(Ok(json!({ "commitId": commit_id })));
    }

    pub(crate) fn emit(&self, event: &str, payload: Value) {
        if let Some(sender) = self.events.lock().expect("event lock").as_ref() {
            let _ = sender.send(ServerEvent { event: event.to_string(), payload });
        }
    }

    /// Simulates the server closing the event feed.
    pub(crate) fn close_feed(&self) {
        self.events.lock().expect("event lock").take();
    }

    pub(crate) fn sent(&self) -> Vec<RequestEnvelope> {
        self.requests.lock().expect("request lock").clone()
    }

    pub(crate) fn commits_sent(&self) -> Vec<CommitData> {
        self.sent()
            .into_iter()
            .filter_map(|envelope| match envelope {
                RequestEnvelope::Commit(data) => Some(data),
                RequestEnvelope::RoomJoin(_) => None,
            })
            .collect()
    }

    pub(crate) fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SocketTransport for MockSocket {
    async fn request(&self, envelope: RequestEnvelope) -> Result<Value, Error> {
        self.requests.lock().expect("request lock").push(envelope.clone());
        match envelope {
            RequestEnvelope::RoomJoin(_) => Ok(json!({})),
            RequestEnvelope::Commit(_) => {
                let scripted = self.commit_replies.lock().expect("commit reply lock").pop_front();
                match scripted {
                    Some(Ok(value)) => Ok(value),
                    Some(Err(reason)) => Err(Error::Transport(reason)),
                    None => {
                        let seq = self.commit_seq.fetch_add(1, Ordering::SeqCst);
                        Ok(json!({ "commitId": format!("ffff{seq:020x}") }))
                    }
                }
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        match self.events.lock().expect("event lock").as_ref() {
            Some(sender) => sender.subscribe(),
            None => {
                // Feed already closed: hand out a receiver that ends at once.
                let (sender, receiver) = broadcast::channel(1);
                drop(sender);
                receiver
            }
        }
    }

    fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
        self.close_feed();
    }
}

pub(crate) struct MockConnector {
    pub(crate) socket: Arc<MockSocket>,
}

#[async_trait]
impl SocketConnector for MockConnector {
    async fn connect(&self) -> Result<Arc<dyn SocketTransport>, Error> {
        Ok(Arc::clone(&self.socket) as Arc<dyn SocketTransport>)
    }
}

// ── Fetcher ─────────────────────────────────────────────────────────

/// Serves page heads from a queue; once the queue drains, the last served
/// head sticks so refetch-heavy retry tests stay short.
pub(crate) struct MockFetcher {
    project_id: String,
    user: Result<String, FetchError>,
    heads: StdMutex<VecDeque<Result<PageSnapshot, FetchError>>>,
    last_served: StdMutex<Option<Result<PageSnapshot, FetchError>>>,
}

impl MockFetcher {
    pub(crate) fn new(head: PageSnapshot) -> Arc<Self> {
        Self::build(Ok(USER.to_string()), Ok(head))
    }

    pub(crate) fn guest(head: PageSnapshot) -> Arc<Self> {
        Self::build(Err(FetchError::NotLoggedIn), Ok(head))
    }

    pub(crate) fn forbidden() -> Arc<Self> {
        Self::build(Ok(USER.to_string()), Err(FetchError::NotEditable))
    }

    fn build(user: Result<String, FetchError>, head: Result<PageSnapshot, FetchError>) -> Arc<Self> {
        Arc::new(Self {
            project_id: "project-1".to_string(),
            user,
            heads: StdMutex::new(VecDeque::from([head])),
            last_served: StdMutex::new(None),
        })
    }

    pub(crate) fn queue_head(&self, head: PageSnapshot) {
        self.heads.lock().expect("head lock").push_back(Ok(head));
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn page(&self, _project: &str, _title: &str) -> Result<PageSnapshot, FetchError> {
        if let Some(next) = self.heads.lock().expect("head lock").pop_front() {
            *self.last_served.lock().expect("last head lock") = Some(next.clone());
            return next;
        }
        self.last_served
            .lock()
            .expect("last head lock")
            .clone()
            .unwrap_or_else(|| Err(FetchError::Transport("no page head scripted".to_string())))
    }

    async fn project_id(&self, _project: &str) -> Result<String, FetchError> {
        Ok(self.project_id.clone())
    }

    async fn user_id(&self) -> Result<String, FetchError> {
        self.user.clone()
    }
}
