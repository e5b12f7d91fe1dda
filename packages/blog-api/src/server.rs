//! Hyper server setup and request handling.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming as IncomingBody};
use hyper::{Request, Response};
use hyper_util::rt::TokioExecutor;
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder as ConnectionBuilder;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};

use crate::router::Router;

/// HTTP server for the blog API.
pub struct Server {
    listener: TcpListener,
    router: Arc<Router>,
}

impl Server {
    /// Binds a listener. Port 0 picks a free port; see [`Server::local_addr`].
    pub async fn bind(addr: SocketAddr, router: Router) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            router: Arc::new(router),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Serves until the process exits.
    pub async fn serve(self) -> Result<(), std::io::Error> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Serves until `signal` resolves, then stops accepting and closes open connections.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send,
    {
        let addr = self.local_addr()?;
        tracing::info!("Server listening on http://{}", addr);

        let mut connections = JoinSet::new();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                _ = &mut signal => break,
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(err) => {
                            tracing::warn!("Failed to accept connection: {}", err);
                            continue;
                        }
                    };
                    let io = TokioIo::new(stream);
                    let router = Arc::clone(&self.router);

                    connections.spawn(async move {
                        let builder = ConnectionBuilder::new(TokioExecutor::new());
                        if let Err(err) = builder
                            .serve_connection(
                                io,
                                hyper::service::service_fn(move |req| {
                                    handle_request(req, router.clone())
                                }),
                            )
                            .await
                        {
                            tracing::debug!("Error serving connection from {}: {}", peer, err);
                        }
                    });
                }
            }

            while connections.try_join_next().is_some() {}
        }

        drop(self.listener);
        let open = connections.len();
        connections.shutdown().await;
        tracing::info!("Server on {} stopped ({} open connection(s) closed)", addr, open);
        Ok(())
    }

    /// Starts serving on a background task.
    pub fn spawn(self) -> Result<RunningServer, std::io::Error> {
        let addr = self.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(self.serve_with_shutdown(async move {
            let _ = shutdown_rx.await;
        }));
        Ok(RunningServer {
            addr,
            shutdown_tx,
            handle,
        })
    }
}

/// A server running on a background task.
pub struct RunningServer {
    addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), std::io::Error>>,
}

impl RunningServer {
    /// Address the server listens on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL, e.g. `http://127.0.0.1:40123`.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// True once the serving task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signals shutdown and waits for the serving task to finish.
    pub async fn shutdown(self) -> Result<(), std::io::Error> {
        let _ = self.shutdown_tx.send(());
        self.handle
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
    }
}

/// Handles an incoming HTTP request.
async fn handle_request(
    req: Request<IncomingBody>,
    router: Arc<Router>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let response = match router.route(req).await {
        Ok(response) => response,
        Err(err) => {
            if err.status() >= 500 {
                tracing::error!("Error handling {} {}: {}", method, path, err);
            } else {
                tracing::debug!("Rejected {} {}: {}", method, path, err);
            }
            Response::from(err)
        }
    };
    Ok(response.map(Full::new))
}
