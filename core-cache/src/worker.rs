//! # Cache Worker
//!
//! Runs a [`CacheManager`] on its own task. Pages reach it only through a
//! cloneable [`WorkerHandle`]: every request is a message on an mpsc queue
//! with a oneshot reply. Messages, pushes, clicks and sync run on the loop
//! in arrival order; each fetch gets its own task so a slow download never
//! holds up the rest. The worker installs and activates before it takes
//! the first request off the queue.
//!
//! [`WorkerHandle`] implements [`HttpClient`], so handing it to the catalog
//! or the audio loader routes their fetches through the cache.

use crate::error::{CacheError, Result};
use crate::manager::{CacheManager, ClientMessage, LifecycleState, VersionReply};
use crate::notification::{ClickOutcome, NotificationClick};
use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{HttpClient, HttpRequest, HttpResponse, NotificationOptions};
use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// A request queued for the worker task.
#[derive(Debug)]
pub enum WorkerRequest {
    Fetch {
        request: HttpRequest,
        reply: oneshot::Sender<BridgeResult<HttpResponse>>,
    },
    Message {
        message: Value,
        reply: Option<oneshot::Sender<Option<VersionReply>>>,
    },
    Push {
        payload: Option<Bytes>,
        reply: oneshot::Sender<NotificationOptions>,
    },
    NotificationClick {
        click: NotificationClick,
        reply: oneshot::Sender<ClickOutcome>,
    },
    Sync {
        tag: String,
        reply: oneshot::Sender<bool>,
    },
    State {
        reply: oneshot::Sender<LifecycleState>,
    },
    Flush {
        reply: oneshot::Sender<()>,
    },
}

pub struct CacheWorker {
    manager: Arc<CacheManager>,
    requests: mpsc::Receiver<WorkerRequest>,
    shutdown: CancellationToken,
    /// In-flight fetches
    fetches: TaskTracker,
}

impl CacheWorker {
    /// Spawn the worker task. The returned handle is the only way in.
    pub fn spawn(manager: CacheManager) -> (WorkerHandle, JoinHandle<()>) {
        let (sender, requests) = mpsc::channel(manager.config.request_buffer);
        let shutdown = CancellationToken::new();

        let worker = CacheWorker {
            manager: Arc::new(manager),
            requests,
            shutdown: shutdown.clone(),
            fetches: TaskTracker::new(),
        };
        let task = tokio::spawn(worker.run());

        (WorkerHandle { sender, shutdown }, task)
    }

    async fn run(mut self) {
        self.manager.start().await;
        info!(
            version = %self.manager.version(),
            state = %self.manager.state(),
            "Cache worker running"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                request = self.requests.recv() => match request {
                    Some(request) => self.handle(request).await,
                    None => break,
                },
            }
        }

        self.fetches.close();
        self.fetches.wait().await;
        self.manager.flush_pending_writes().await;
        info!("Cache worker stopped");
    }

    async fn handle(&self, request: WorkerRequest) {
        match request {
            WorkerRequest::Fetch { request, reply } => {
                let manager = Arc::clone(&self.manager);
                self.fetches.spawn(async move {
                    let response = manager.fetch(request).await;
                    let _ = reply.send(response);
                });
            }
            WorkerRequest::Message { message, reply } => {
                let answer = self.manager.handle_message(&message).await;
                match reply {
                    Some(reply) => {
                        let _ = reply.send(answer);
                    }
                    None if answer.is_some() => {
                        debug!("Message reply dropped, no reply port");
                    }
                    None => {}
                }
            }
            WorkerRequest::Push { payload, reply } => {
                let options = self.manager.handle_push(payload.as_deref()).await;
                let _ = reply.send(options);
            }
            WorkerRequest::NotificationClick { click, reply } => {
                let outcome = self.manager.handle_notification_click(click).await;
                let _ = reply.send(outcome);
            }
            WorkerRequest::Sync { tag, reply } => {
                let handled = self.manager.handle_sync(&tag).await;
                let _ = reply.send(handled);
            }
            WorkerRequest::State { reply } => {
                let _ = reply.send(self.manager.state());
            }
            WorkerRequest::Flush { reply } => {
                self.manager.flush_pending_writes().await;
                let _ = reply.send(());
            }
        }
    }
}

/// Cloneable page-side handle to a running [`CacheWorker`].
#[derive(Clone)]
pub struct WorkerHandle {
    sender: mpsc::Sender<WorkerRequest>,
    shutdown: CancellationToken,
}

impl WorkerHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> WorkerRequest,
    ) -> Result<T> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(build(reply))
            .await
            .map_err(|_| CacheError::WorkerClosed)?;
        receiver.await.map_err(|_| CacheError::WorkerClosed)
    }

    /// Post a message without waiting for a reply.
    pub async fn post_message(&self, message: Value) -> Result<()> {
        self.sender
            .send(WorkerRequest::Message {
                message,
                reply: None,
            })
            .await
            .map_err(|_| CacheError::WorkerClosed)
    }

    /// Post a message over a reply channel.
    pub async fn send_message(&self, message: Value) -> Result<Option<VersionReply>> {
        self.request(|reply| WorkerRequest::Message {
            message,
            reply: Some(reply),
        })
        .await
    }

    /// Ask the worker for its cache version tag.
    pub async fn get_version(&self) -> Result<String> {
        let message = serde_json::to_value(ClientMessage::GetVersion)?;
        match self.send_message(message).await? {
            Some(reply) => Ok(reply.version),
            None => Err(CacheError::MalformedMessage(
                "no reply to GET_VERSION".to_string(),
            )),
        }
    }

    /// Activate a waiting worker.
    pub async fn skip_waiting(&self) -> Result<()> {
        let message = serde_json::to_value(ClientMessage::SkipWaiting)?;
        self.send_message(message).await.map(|_| ())
    }

    pub async fn push(&self, payload: Option<Bytes>) -> Result<NotificationOptions> {
        self.request(|reply| WorkerRequest::Push { payload, reply })
            .await
    }

    pub async fn notification_click(&self, click: NotificationClick) -> Result<ClickOutcome> {
        self.request(|reply| WorkerRequest::NotificationClick { click, reply })
            .await
    }

    pub async fn sync(&self, tag: impl Into<String>) -> Result<bool> {
        let tag = tag.into();
        self.request(|reply| WorkerRequest::Sync { tag, reply }).await
    }

    pub async fn state(&self) -> Result<LifecycleState> {
        self.request(|reply| WorkerRequest::State { reply }).await
    }

    /// Wait until background cache writes have landed.
    pub async fn flush(&self) -> Result<()> {
        self.request(|reply| WorkerRequest::Flush { reply }).await
    }

    /// Stop the worker once the request on the loop and any in-flight
    /// fetches are done.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

#[async_trait]
impl HttpClient for WorkerHandle {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        match self
            .request(|reply| WorkerRequest::Fetch { request, reply })
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Fetch not handled by cache worker");
                Err(e.into())
            }
        }
    }
}
