// Entry points of the page-editing core: join a page room, patch or delete
// a page in one shot, subscribe to a project's update stream.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use pagesync_common::change::Change;
use pagesync_common::protocol::{
    CommitData, RequestEnvelope, RoomJoinData, PROJECT_COMMIT_STREAM, PROJECT_EVENT_STREAM,
};
use pagesync_common::types::Line;

use crate::error::Error;
use crate::fetch::{ensure_editable_page, PageFetcher};
use crate::room::{PageRoom, RoomOptions, RoomSeed};
use crate::stream::EventStream;
use crate::transport::SocketConnector;

/// Handle bundling the collaborators every operation needs.
#[derive(Clone)]
pub struct Client {
    fetcher: Arc<dyn PageFetcher>,
    connector: Arc<dyn SocketConnector>,
}

impl Client {
    pub fn new(fetcher: Arc<dyn PageFetcher>, connector: Arc<dyn SocketConnector>) -> Self {
        Self { fetcher, connector }
    }

    /// Joins the editing room of `title` in `project`.
    pub async fn join(&self, project: &str, title: &str) -> Result<PageRoom, Error> {
        self.join_with_options(project, title, RoomOptions::default()).await
    }

    pub async fn join_with_options(
        &self,
        project: &str,
        title: &str,
        options: RoomOptions,
    ) -> Result<PageRoom, Error> {
        let fetcher = self.fetcher.as_ref();
        let (project_id, user_id, page) = tokio::try_join!(
            async { fetcher.project_id(project).await.map_err(Error::from) },
            async { fetcher.user_id().await.map_err(Error::from) },
            ensure_editable_page(fetcher, project, title),
        )?;

        let socket = self.connector.connect().await?;
        // Subscribe before joining so no commit slips through the gap.
        let events = socket.subscribe();
        socket
            .request(RequestEnvelope::RoomJoin(RoomJoinData {
                project_id: project_id.clone(),
                page_id: Some(page.id.clone()),
                project_updates_stream: false,
            }))
            .await?;

        info!(%project_id, page_id = %page.id, title, "joined page room");

        let seed = RoomSeed {
            project: project.to_string(),
            title: title.to_string(),
            project_id,
            user_id,
            page,
        };
        Ok(PageRoom::start(seed, Arc::clone(&self.fetcher), socket, events, options))
    }

    /// Rewrites `title` in one shot: join, patch, leave.
    pub async fn patch_page<F, Fut>(
        &self,
        project: &str,
        title: &str,
        rewrite: F,
    ) -> Result<(), Error>
    where
        F: FnMut(Vec<Line>) -> Fut,
        Fut: Future<Output = Vec<String>>,
    {
        let room = self.join(project, title).await?;
        let result = room.patch(rewrite).await;
        room.cleanup();
        result
    }

    /// Deletes `title` from the server. A page that was never materialized
    /// has nothing to delete and returns immediately.
    pub async fn delete_page(&self, project: &str, title: &str) -> Result<(), Error> {
        self.delete_page_with_options(project, title, RoomOptions::default()).await
    }

    pub async fn delete_page_with_options(
        &self,
        project: &str,
        title: &str,
        options: RoomOptions,
    ) -> Result<(), Error> {
        let fetcher = self.fetcher.as_ref();
        let (project_id, user_id, page) = tokio::try_join!(
            async { fetcher.project_id(project).await.map_err(Error::from) },
            async { fetcher.user_id().await.map_err(Error::from) },
            ensure_editable_page(fetcher, project, title),
        )?;
        if !page.persistent {
            return Ok(());
        }

        let socket = self.connector.connect().await?;
        socket
            .request(RequestEnvelope::RoomJoin(RoomJoinData {
                project_id: project_id.clone(),
                page_id: Some(page.id.clone()),
                project_updates_stream: false,
            }))
            .await?;

        let mut parent_id = page.commit_id;
        let mut outcome = Err(Error::PushExhausted { attempts: options.push_retries });
        for attempt in 0..=options.push_retries {
            let envelope = RequestEnvelope::Commit(CommitData::page(
                project_id.clone(),
                parent_id.clone(),
                page.id.clone(),
                user_id.clone(),
                vec![Change::deleted()],
            ));
            match socket.request(envelope).await {
                Ok(_) => {
                    info!(%project_id, page_id = %page.id, title, "page deleted");
                    outcome = Ok(());
                    break;
                }
                Err(Error::Transport(reason)) => {
                    warn!(%reason, attempt, title, "delete rejected, pulling head");
                    if attempt == options.push_retries {
                        break;
                    }
                    match ensure_editable_page(fetcher, project, title).await {
                        Ok(head) if !head.persistent => {
                            // Someone else already deleted it.
                            outcome = Ok(());
                            break;
                        }
                        Ok(head) => parent_id = head.commit_id,
                        Err(err) => {
                            outcome = Err(err);
                            break;
                        }
                    }
                }
                Err(other) => {
                    outcome = Err(other);
                    break;
                }
            }
        }

        socket.disconnect();
        outcome
    }

    /// Subscribes to a project's update stream.
    ///
    /// `events` filters the yielded channels; leave it empty to receive
    /// both `projectUpdatesStream:*` channels.
    pub async fn listen_stream(&self, project: &str, events: &[&str]) -> Result<EventStream, Error> {
        let project_id = self.fetcher.project_id(project).await.map_err(Error::from)?;

        let socket = self.connector.connect().await?;
        let receiver = socket.subscribe();
        socket
            .request(RequestEnvelope::RoomJoin(RoomJoinData {
                project_id: project_id.clone(),
                page_id: None,
                project_updates_stream: true,
            }))
            .await?;

        info!(%project_id, project, "joined project update stream");

        let channels = if events.is_empty() {
            vec![PROJECT_EVENT_STREAM.to_string(), PROJECT_COMMIT_STREAM.to_string()]
        } else {
            events.iter().map(|name| name.to_string()).collect()
        };
        Ok(EventStream::new(socket, receiver, channels))
    }
}
