//! Loopback callback listener and operator-facing navigator
//!
//! The coordinator expects a page context; on a workstation the "page" is
//! the operator's browser plus a loopback HTTP listener. [`CliNavigator`]
//! prints redirect URLs for the operator to open, and [`CallbackListener`]
//! receives the provider's redirect back and hands its query string to the
//! run.

use std::net::SocketAddr;
use std::sync::Mutex;

use auth_session::Navigator;
use axum::Router;
use axum::extract::{RawQuery, State};
use axum::response::Html;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;

/// Navigator backed by the operator's terminal. Redirects are printed
/// instead of followed; the callback query is delivered by the listener.
#[derive(Default)]
pub struct CliNavigator {
    fragment: Mutex<Option<String>>,
    query: Mutex<Option<String>>,
}

impl CliNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand the provider callback's query string to the navigator, as if
    /// the page had loaded with it.
    pub fn deliver_query(&self, query: &str) {
        *self.query.lock().expect("navigator lock") = Some(query.to_owned());
    }
}

impl Navigator for CliNavigator {
    fn fragment(&self) -> Option<String> {
        self.fragment.lock().expect("navigator lock").clone()
    }

    fn set_fragment(&self, fragment: &str) {
        *self.fragment.lock().expect("navigator lock") = Some(fragment.to_owned());
    }

    fn query(&self) -> Option<String> {
        self.query.lock().expect("navigator lock").clone()
    }

    fn redirect(&self, url: &str) {
        info!(url, "navigation requested");
        println!("\nOpen this URL in your browser:\n\n    {url}\n");
    }

    fn strip_query(&self) {
        *self.query.lock().expect("navigator lock") = None;
    }
}

/// Loopback HTTP listener for the provider's redirect back.
pub struct CallbackListener {
    receiver: mpsc::Receiver<String>,
    handle: tokio::task::JoinHandle<()>,
}

impl CallbackListener {
    /// Bind the listener and start serving `/callback` and `/logged-out`.
    pub async fn bind(addr: SocketAddr) -> anyhow::Result<Self> {
        let (sender, receiver) = mpsc::channel::<String>(4);

        let app = Router::new()
            .route("/callback", get(callback_handler))
            .route(
                "/logged-out",
                get(|| async { Html("<html><body>Logged out. You can close this window.</body></html>") }),
            )
            .with_state(sender);

        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "callback listener bound");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "callback listener failed");
            }
        });

        Ok(Self { receiver, handle })
    }

    /// Wait for the next callback's raw query string.
    pub async fn next_query(&mut self) -> Option<String> {
        self.receiver.recv().await
    }

    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

async fn callback_handler(
    State(sender): State<mpsc::Sender<String>>,
    RawQuery(query): RawQuery,
) -> Html<&'static str> {
    let query = query.unwrap_or_default();
    info!("provider callback received");
    let _ = sender.send(query).await;
    Html("<html><body>Login received. You can close this window and return to the terminal.</body></html>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listener_delivers_callback_query() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        // Bind on an ephemeral port by probing: bind a listener directly
        let tcp = TcpListener::bind(addr).await.unwrap();
        let bound = tcp.local_addr().unwrap();
        drop(tcp);

        let mut listener = CallbackListener::bind(bound).await.unwrap();

        let url = format!("http://{bound}/callback?code=abc&state=st-1");
        let body = http_get(&url).await;
        assert!(body.contains("Login received"), "got: {body}");

        let query = listener.next_query().await.unwrap();
        assert_eq!(query, "code=abc&state=st-1");
        listener.shutdown();
    }

    #[tokio::test]
    async fn cli_navigator_tracks_state() {
        let nav = CliNavigator::new();
        nav.deliver_query("code=1&state=2");
        assert_eq!(nav.query().as_deref(), Some("code=1&state=2"));
        nav.strip_query();
        assert!(nav.query().is_none());
        nav.set_fragment("/");
        assert_eq!(nav.fragment().as_deref(), Some("/"));
    }

    /// Minimal GET over a raw socket; this crate has no HTTP client
    /// dependency of its own.
    async fn http_get(url: &str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (host, rest) = url.strip_prefix("http://").unwrap().split_once('/').unwrap();
        let mut stream = tokio::net::TcpStream::connect(host).await.unwrap();
        let request = format!("GET /{rest} HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }
}
