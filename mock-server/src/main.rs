use tokio::net::TcpListener;

/// Serve the fixture endpoints for manual testing against a host build.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = std::env::var("MOCK_PORT").unwrap_or_else(|_| "8089".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    println!(
        "mock endpoints on http://{addr} \
         (/ok /empty /lines /missing /status/{{code}} /echo /slow/{{ms}} /large/{{kib}})"
    );
    mock_server::run(listener).await
}
