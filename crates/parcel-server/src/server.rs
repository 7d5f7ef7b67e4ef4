use std::future::{Future, IntoFuture};
use std::sync::Arc;

use axum::Router;
use parcel_protocol::TrackerClient;
use parcel_store::NodeStore;
use parcel_sync::{AnnouncementScheduler, HttpAppNotifier, SyncEngine};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use crate::config::NodeConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::NodeState;
use crate::router::{admin_router, notify_router};

/// A running subscriber node: both listeners over one store and engine.
pub struct NodeServer {
    config: NodeConfig,
    state: NodeState,
}

impl NodeServer {
    pub fn new(config: NodeConfig, store: Arc<dyn NodeStore>) -> ServerResult<Self> {
        let tracker = TrackerClient::new(config.tracker_url.clone(), config.request_timeout())
            .map_err(|e| ServerError::Config(format!("tracker client: {e}")))?
            .with_address(config.advertised_address());
        let notifier = HttpAppNotifier::new(config.request_timeout())
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        let engine = Arc::new(SyncEngine::new(
            store.clone(),
            Arc::new(tracker),
            Arc::new(notifier),
        ));
        let scheduler = AnnouncementScheduler::new(engine, config.announce_delay());

        Ok(Self {
            config,
            state: NodeState { store, scheduler },
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn notify_router(&self) -> Router {
        notify_router(self.state.clone())
    }

    pub fn admin_router(&self) -> Router {
        admin_router(self.state.clone())
    }

    /// Serve both listeners until `shutdown` completes, then drain them and
    /// flush the store.
    pub async fn serve<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send,
    {
        let notify_listener = TcpListener::bind(self.config.notify_bind).await?;
        let admin_listener = TcpListener::bind(self.config.admin_bind).await?;
        info!(
            notify = %notify_listener.local_addr()?,
            admin = %admin_listener.local_addr()?,
            tracker = %self.config.tracker_url,
            "node listening"
        );

        let (stop, stopped) = watch::channel(());
        let notify = tokio::spawn(
            axum::serve(notify_listener, self.notify_router())
                .with_graceful_shutdown(wait_for(stopped.clone()))
                .into_future(),
        );
        let admin = tokio::spawn(
            axum::serve(admin_listener, self.admin_router())
                .with_graceful_shutdown(wait_for(stopped))
                .into_future(),
        );

        shutdown.await;
        info!("shutting down");
        let _ = stop.send(());

        for listener in [notify, admin] {
            listener
                .await
                .map_err(|e| ServerError::Internal(e.to_string()))??;
        }
        self.state.store.flush()?;
        info!("store flushed");
        Ok(())
    }
}

async fn wait_for(mut stopped: watch::Receiver<()>) {
    let _ = stopped.changed().await;
}

/// Resolves on Ctrl-C.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl-C");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcel_store::InMemoryNodeStore;
    use std::net::SocketAddr;

    fn ephemeral() -> NodeConfig {
        NodeConfig {
            notify_bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            admin_bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            ..NodeConfig::default()
        }
    }

    #[test]
    fn server_construction() {
        let server = NodeServer::new(NodeConfig::default(), Arc::new(InMemoryNodeStore::new())).unwrap();
        assert_eq!(server.config().notify_bind.port(), 8083);
        let _notify = server.notify_router();
        let _admin = server.admin_router();
    }

    #[tokio::test]
    async fn serve_stops_on_shutdown() {
        let server = NodeServer::new(ephemeral(), Arc::new(InMemoryNodeStore::new())).unwrap();
        server.serve(async {}).await.unwrap();
    }

    #[tokio::test]
    async fn bind_failure_is_io_error() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let config = NodeConfig {
            admin_bind: taken.local_addr().unwrap(),
            ..ephemeral()
        };
        let server = NodeServer::new(config, Arc::new(InMemoryNodeStore::new())).unwrap();
        let err = server.serve(async {}).await.unwrap_err();
        assert!(matches!(err, ServerError::Io(_)));
    }
}
