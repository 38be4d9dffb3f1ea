//! Request/response transport between a page and the background service.
//!
//! [`LocalChannel`] talks to an in-process actor; [`HttpChannel`] posts to the
//! `/message` route served by the `rating-cache` binary.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::protocol::{PageId, Request, Response};
use crate::service::BackgroundService;

#[async_trait]
pub trait MessageChannel: Send + Sync + 'static {
    async fn send(&self, request: Request) -> Result<Response>;
}

struct Envelope {
    origin: PageId,
    request: Request,
    reply: oneshot::Sender<Response>,
}

/// Handle to the background actor; hands out per-page channels.
pub struct BackgroundHandle {
    tx: mpsc::Sender<Envelope>,
    task: JoinHandle<()>,
}

/// Spawn the actor owning `service`. Each request is served on its own task,
/// so a slow fetch never blocks other pages.
pub fn spawn_background(service: Arc<BackgroundService>, capacity: usize) -> BackgroundHandle {
    let (tx, mut rx) = mpsc::channel::<Envelope>(capacity.max(1));
    let task = tokio::spawn(async move {
        while let Some(env) = rx.recv().await {
            let svc = service.clone();
            tokio::spawn(async move {
                let resp = svc.handle(env.origin, env.request).await;
                // The page may have navigated away meanwhile.
                let _ = env.reply.send(resp);
            });
        }
        tracing::debug!(target: "service", "background actor stopped");
    });
    BackgroundHandle { tx, task }
}

impl BackgroundHandle {
    pub fn channel_for(&self, page: PageId) -> LocalChannel {
        LocalChannel {
            page,
            tx: self.tx.clone(),
        }
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}

#[derive(Clone)]
pub struct LocalChannel {
    page: PageId,
    tx: mpsc::Sender<Envelope>,
}

#[async_trait]
impl MessageChannel for LocalChannel {
    async fn send(&self, request: Request) -> Result<Response> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                origin: self.page,
                request,
                reply,
            })
            .await
            .map_err(|_| anyhow!("background service is gone"))?;
        rx.await.context("background service dropped the reply")
    }
}

pub struct HttpChannel {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpChannel {
    /// `base` is the service root, e.g. `http://127.0.0.1:8787`.
    pub fn new(base: &str, page: PageId) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .timeout(Duration::from_secs(15))
            .build()
            .context("building http channel client")?;
        Ok(Self {
            http,
            endpoint: format!("{}/message?page={}", base.trim_end_matches('/'), page.0),
        })
    }
}

#[async_trait]
impl MessageChannel for HttpChannel {
    async fn send(&self, request: Request) -> Result<Response> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .context("post /message")?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("/message returned status {status}");
        }
        resp.json::<Response>()
            .await
            .context("parse /message response")
    }
}
