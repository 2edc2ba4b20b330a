use std::{future::Future, net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::{
    http,
    hub::{ChatHub, HubOptions},
};

pub struct Server {
    listener: TcpListener,
    hub: Arc<ChatHub>,
}

impl Server {
    pub fn new(listener: TcpListener, options: HubOptions) -> Self {
        Self {
            listener,
            hub: Arc::new(ChatHub::new(options)),
        }
    }

    pub async fn bind(addr: SocketAddr, options: HubOptions) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        Ok(Self::new(listener, options))
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Server { listener, hub } = self;
        let app = http::router(hub);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("relay shutting down");
            })
            .await
            .context("relay server failed")
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = ?err, "failed to install ctrl-c handler");
            }
        })
        .await
    }
}
