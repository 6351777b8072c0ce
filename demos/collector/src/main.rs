//! Collector stub
//!
//! Answers every request on its single ingest endpoint with 200 OK,
//! delayed according to `COLLECTOR_RESPONSE_MODE` (`fast`, `slow`, or
//! unset for fast). The harness uses the delay to simulate a congested
//! collector; the payload is read and discarded.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
const SLOW_DELAY: Duration = Duration::from_secs(5);

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::io::Result<()> {
    let slow = matches!(
        std::env::var("COLLECTOR_RESPONSE_MODE").as_deref(),
        Ok("slow")
    );
    let listener = TcpListener::bind("0.0.0.0:4040").await?;
    loop {
        let (mut stream, _) = listener.accept().await?;
        tokio::spawn(async move {
            let mut sink = [0_u8; 4096];
            // Drain whatever the agent pushed; the stub never parses it.
            let _ = stream.read(&mut sink).await;
            if slow {
                tokio::time::sleep(SLOW_DELAY).await;
            }
            let _ = stream.write_all(RESPONSE).await;
        });
    }
}
