//! Liveness endpoint for the split worker.

use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

/// HTTP response naming the action the worker claims files from.
pub fn response(split_action: &str) -> Vec<u8> {
    let body = format!("OK action={split_action}\n");
    format!(
        "HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    )
    .into_bytes()
}

/// Answer every connection on `listener` with [`response`]. Runs until the
/// task is dropped.
pub async fn serve(listener: TcpListener, split_action: String) {
    let reply = response(&split_action);
    loop {
        match listener.accept().await {
            Ok((mut stream, _)) => {
                if let Err(e) = stream.write_all(&reply).await {
                    tracing::debug!(error = %e, "health probe disconnected early");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to accept health connection"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_response_reports_action() {
        let reply = String::from_utf8(response("split")).unwrap();
        assert!(reply.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(reply.contains("Content-Length: 16\r\n"));
        assert!(reply.ends_with("\r\n\r\nOK action=split\n"));
    }

    #[tokio::test]
    async fn test_serve_answers_connections() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve(listener, "mail-split".into()));

        for _ in 0..2 {
            let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
            let mut reply = String::new();
            stream.read_to_string(&mut reply).await.unwrap();
            assert!(reply.ends_with("OK action=mail-split\n"));
        }

        server.abort();
    }
}
