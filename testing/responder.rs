//! Scripted local HTTP responder shared by the wire-level test targets.
#![allow(dead_code)]

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Answers each incoming connection with the next scripted `(status, body)` pair
/// and hands back the raw requests in arrival order.
pub async fn serve(script: Vec<(&str, String)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let script: Vec<(String, String)> = script
        .into_iter()
        .map(|(status, body)| (status.to_string(), body))
        .collect();

    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for (status, body) in script {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 8192];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if request_complete(&buf) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            requests.push(String::from_utf8_lossy(&buf).into_owned());
        }
        requests
    });

    (format!("http://{addr}"), handle)
}

/// Serves exactly one response.
pub async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
    let (base_url, server) = serve(vec![(status, body.to_string())]).await;
    let handle = tokio::spawn(async move { server.await.unwrap().remove(0) });
    (base_url, handle)
}

fn request_complete(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    let Some(head_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let length = text[..head_end]
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    buf.len() >= head_end + 4 + length
}
