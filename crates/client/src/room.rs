// A page's editing room: owns the line mirror, the ordered commit pipeline
// with pull-then-retry conflict handling, and the live-commit consumer.
//
// The mirror lives in a single async mutex held across each push
// round-trip, so mutating methods serialize and a remote commit racing a
// push loses at the server and drives the retry loop. A separate closed
// flag makes every post-cleanup call fail `RoomClosed`, including in-flight
// requests cut off by the disconnect.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use pagesync_common::apply::apply_commit;
use pagesync_common::change::Change;
use pagesync_common::diff::diff_to_changes;
use pagesync_common::id::{new_line_id, now_unix, time_of};
use pagesync_common::protocol::{
    CommitAck, CommitData, CommitNotification, RequestEnvelope, PAGE_COMMIT_EVENT,
};
use pagesync_common::types::{Line, PageSnapshot};

use crate::error::Error;
use crate::fetch::{ensure_editable_page, PageFetcher};
use crate::transport::{ServerEvent, SocketTransport};

/// Heads the mirror already reflects via a push ack or a conflict pull;
/// their notifications must not be applied twice.
const ABSORBED_HEADS_KEPT: usize = 8;

/// Tunables for a joined room.
#[derive(Debug, Clone)]
pub struct RoomOptions {
    /// Conflict retries before a push gives up.
    pub push_retries: u32,
    /// Buffered commit notifications per `listen_page_update` subscriber.
    pub event_buffer: usize,
}

impl Default for RoomOptions {
    fn default() -> Self {
        Self { push_retries: 3, event_buffer: 64 }
    }
}

impl RoomOptions {
    pub fn with_push_retries(mut self, retries: u32) -> Self {
        self.push_retries = retries;
        self
    }

    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }
}

/// Mirror of the page at the commit the room believes is head.
#[derive(Debug)]
struct Mirror {
    parent_id: String,
    lines: Vec<Line>,
    /// False until the page is first materialized server-side; forces a
    /// title op onto the first successful push.
    created: bool,
    absorbed: VecDeque<String>,
}

impl Mirror {
    fn note_absorbed(&mut self, commit_id: &str) {
        if self.absorbed.len() == ABSORBED_HEADS_KEPT {
            self.absorbed.pop_front();
        }
        self.absorbed.push_back(commit_id.to_string());
    }

    fn is_absorbed(&self, commit_id: &str) -> bool {
        self.parent_id == commit_id || self.absorbed.iter().any(|id| id == commit_id)
    }
}

/// Everything `Client::join` resolved before the room can start.
pub(crate) struct RoomSeed {
    pub(crate) project: String,
    pub(crate) title: String,
    pub(crate) project_id: String,
    pub(crate) user_id: String,
    pub(crate) page: PageSnapshot,
}

/// An exclusive handle on a page's editing room.
///
/// Dropping the room disconnects its socket.
impl std::fmt::Debug for PageRoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRoom")
            .field("project", &self.project)
            .field("title", &self.title)
            .field("project_id", &self.project_id)
            .field("page_id", &self.page_id)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

pub struct PageRoom {
    project: String,
    title: String,
    project_id: String,
    page_id: String,
    user_id: String,
    fetcher: Arc<dyn PageFetcher>,
    socket: Arc<dyn SocketTransport>,
    mirror: Arc<Mutex<Mirror>>,
    closed: Arc<AtomicBool>,
    commits: broadcast::Sender<CommitNotification>,
    options: RoomOptions,
    consumer: JoinHandle<()>,
}

impl PageRoom {
    pub(crate) fn start(
        seed: RoomSeed,
        fetcher: Arc<dyn PageFetcher>,
        socket: Arc<dyn SocketTransport>,
        events: broadcast::Receiver<ServerEvent>,
        options: RoomOptions,
    ) -> Self {
        let mirror = Arc::new(Mutex::new(Mirror {
            parent_id: seed.page.commit_id,
            lines: seed.page.lines,
            created: seed.page.persistent,
            absorbed: VecDeque::new(),
        }));
        let closed = Arc::new(AtomicBool::new(false));
        let (commits, _) = broadcast::channel(options.event_buffer);

        let consumer = tokio::spawn(consume_commits(
            events,
            Arc::clone(&mirror),
            Arc::clone(&closed),
            commits.clone(),
            seed.page.id.clone(),
        ));

        Self {
            project: seed.project,
            title: seed.title,
            project_id: seed.project_id,
            page_id: seed.page.id,
            user_id: seed.user_id,
            fetcher,
            socket,
            mirror,
            closed,
            commits,
            options,
            consumer,
        }
    }

    /// Inserts `text` before the line `before_id`, or appends when the
    /// anchor is [`pagesync_common::types::END_ANCHOR`].
    ///
    /// Multi-line text becomes one insert per line, in order, all at the
    /// same anchor.
    pub async fn insert(&self, text: &str, before_id: &str) -> Result<(), Error> {
        let changes: Vec<Change> = text
            .replace("\r\n", "\n")
            .split('\n')
            .map(|line| Change::insert(before_id, new_line_id(&self.user_id), line))
            .collect();
        self.push_with(|_| {
            let changes = changes.clone();
            async move { Ok(changes) }
        })
        .await
    }

    /// Deletes the line `line_id`.
    pub async fn remove(&self, line_id: &str) -> Result<(), Error> {
        let change = Change::delete(line_id);
        self.push_with(|_| {
            let change = change.clone();
            async move { Ok(vec![change]) }
        })
        .await
    }

    /// Replaces the text of the line `line_id`.
    pub async fn update(&self, text: &str, line_id: &str) -> Result<(), Error> {
        let change = Change::update(line_id, text);
        self.push_with(|_| {
            let change = change.clone();
            async move { Ok(vec![change]) }
        })
        .await
    }

    /// Rewrites the whole page.
    ///
    /// `rewrite` maps the current lines to the new text lines; when a
    /// conflict forces a pull it is re-invoked on the refreshed head, so
    /// callers get consistent-read semantics.
    pub async fn patch<F, Fut>(&self, mut rewrite: F) -> Result<(), Error>
    where
        F: FnMut(Vec<Line>) -> Fut,
        Fut: Future<Output = Vec<String>>,
    {
        let user_id = self.user_id.clone();
        self.push_with(|lines| {
            let rewritten = rewrite(lines.clone());
            let user_id = user_id.clone();
            async move {
                let new_texts = rewritten.await;
                diff_to_changes(&lines, &new_texts, &user_id).map_err(Error::from)
            }
        })
        .await
    }

    /// Subscribes to the room's commit feed.
    ///
    /// Every subscriber sees every commit notification the socket delivers.
    pub fn listen_page_update(&self) -> Result<PageUpdates, Error> {
        self.ensure_open()?;
        Ok(PageUpdates { receiver: self.commits.subscribe() })
    }

    /// Snapshot of the mirrored lines.
    pub async fn lines(&self) -> Result<Vec<Line>, Error> {
        self.ensure_open()?;
        Ok(self.mirror.lock().await.lines.clone())
    }

    /// The commit id the room currently believes is head.
    pub async fn parent_id(&self) -> Result<String, Error> {
        self.ensure_open()?;
        Ok(self.mirror.lock().await.parent_id.clone())
    }

    /// Leaves the room: disconnects the socket and stops the live
    /// consumer. Every later call on this room fails [`Error::RoomClosed`].
    pub fn cleanup(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.socket.disconnect();
        self.consumer.abort();
        info!(page_id = %self.page_id, "left page room");
    }

    /// Builds a candidate batch, derives metadata deltas, and submits it,
    /// pulling the head and rebuilding on every version conflict.
    async fn push_with<F, Fut>(&self, mut produce: F) -> Result<(), Error>
    where
        F: FnMut(Vec<Line>) -> Fut,
        Fut: Future<Output = Result<Vec<Change>, Error>>,
    {
        self.ensure_open()?;
        let mut guard = self.mirror.lock().await;

        for attempt in 0..=self.options.push_retries {
            if attempt > 0 {
                // Pull the fresh head so anchors and parentId match it.
                let head =
                    ensure_editable_page(self.fetcher.as_ref(), &self.project, &self.title).await?;
                guard.parent_id = head.commit_id.clone();
                guard.lines = head.lines;
                guard.created = head.persistent;
                guard.note_absorbed(&head.commit_id);
            }

            let mut changes = produce(guard.lines.clone()).await?;
            let changed_lines = apply_commit(&guard.lines, &changes, now_unix(), &self.user_id)?;
            append_metadata_changes(&mut changes, &guard.lines, guard.created, &changed_lines);
            if changes.is_empty() {
                return Ok(());
            }

            let envelope = RequestEnvelope::Commit(CommitData::page(
                self.project_id.clone(),
                guard.parent_id.clone(),
                self.page_id.clone(),
                self.user_id.clone(),
                changes,
            ));

            match self.socket.request(envelope).await {
                Ok(value) => {
                    let ack: CommitAck = serde_json::from_value(value)
                        .map_err(|err| Error::Transport(format!("malformed commit ack: {err}")))?;
                    guard.parent_id = ack.commit_id;
                    guard.created = true;
                    guard.lines = changed_lines;
                    let parent_id = guard.parent_id.clone();
                    guard.note_absorbed(&parent_id);
                    debug!(page_id = %self.page_id, %parent_id, "commit acknowledged");
                    return Ok(());
                }
                Err(Error::Transport(reason)) => {
                    if self.closed.load(Ordering::SeqCst) {
                        return Err(Error::RoomClosed);
                    }
                    warn!(
                        %reason,
                        attempt,
                        page_id = %self.page_id,
                        "commit rejected, pulling head and retrying"
                    );
                }
                Err(other) => return Err(other),
            }
        }

        Err(Error::PushExhausted { attempts: self.options.push_retries })
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.closed.load(Ordering::SeqCst) {
            Err(Error::RoomClosed)
        } else {
            Ok(())
        }
    }
}

impl Drop for PageRoom {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Derives the title and descriptions ops a batch must carry.
///
/// The title op also fires on a page that has never been materialized, so
/// the first successful push names the page.
fn append_metadata_changes(
    changes: &mut Vec<Change>,
    before: &[Line],
    created: bool,
    after: &[Line],
) {
    let Some(new_title) = after.first().map(|line| line.text.clone()) else {
        return;
    };
    let old_title = before.first().map(|line| line.text.as_str());
    if old_title != Some(new_title.as_str()) || !created {
        changes.push(Change::title(new_title));
    }

    let old_descriptions = description_lines(before);
    let new_descriptions = description_lines(after);
    if old_descriptions.join("\n") != new_descriptions.join("\n") {
        changes.push(Change::descriptions(new_descriptions));
    }
}

/// Lines 2..6 feed the page's description snapshot.
fn description_lines(lines: &[Line]) -> Vec<String> {
    lines.iter().skip(1).take(5).map(|line| line.text.clone()).collect()
}

/// Reads commit notifications for the joined page and keeps the mirror on
/// the authoritative head.
///
/// Malformed payloads are skipped; an apply failure or a lagged feed means
/// the mirror diverged, which marks the room unusable and exits.
async fn consume_commits(
    mut events: broadcast::Receiver<ServerEvent>,
    mirror: Arc<Mutex<Mirror>>,
    closed: Arc<AtomicBool>,
    commits: broadcast::Sender<CommitNotification>,
    page_id: String,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Closed) => break,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                error!(skipped, %page_id, "commit feed lagged, mirror lost the head");
                closed.store(true, Ordering::SeqCst);
                break;
            }
        };
        if event.event != PAGE_COMMIT_EVENT {
            continue;
        }

        let notification: CommitNotification = match serde_json::from_value(event.payload) {
            Ok(notification) => notification,
            Err(err) => {
                warn!(%err, %page_id, "skipping malformed commit notification");
                continue;
            }
        };

        let mut guard = mirror.lock().await;
        if guard.is_absorbed(&notification.id) {
            // Already reflected via a push ack or a conflict pull.
            drop(guard);
            let _ = commits.send(notification);
            continue;
        }

        let updated = time_of(&notification.id).unwrap_or_else(now_unix);
        guard.parent_id = notification.id.clone();
        match apply_commit(&guard.lines, &notification.changes, updated, &notification.user_id) {
            Ok(lines) => guard.lines = lines,
            Err(err) => {
                error!(%err, %page_id, "commit did not apply, mirror diverged from head");
                closed.store(true, Ordering::SeqCst);
                break;
            }
        }
        drop(guard);

        let _ = commits.send(notification);
    }
}

/// Live feed of commits observed in the room.
pub struct PageUpdates {
    receiver: broadcast::Receiver<CommitNotification>,
}

impl PageUpdates {
    /// Next observed commit, or `None` once the feed ends.
    pub async fn next(&mut self) -> Option<CommitNotification> {
        loop {
            match self.receiver.recv().await {
                Ok(notification) => return Some(notification),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "page update subscriber lagged, skipping");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
