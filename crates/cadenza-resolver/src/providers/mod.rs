//! Provider adapters, in default registry order.

mod http;
pub mod innertube;
pub mod savetube;
pub mod vreden;
pub mod ytdlp;

pub use innertube::InnerTubeProvider;
pub use savetube::SaveTubeProvider;
pub use vreden::VredenProvider;
pub use ytdlp::YtDlpProvider;

/// Serve `router` on an ephemeral local port and return its base URL.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) async fn serve_stub(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
