use std::net::SocketAddr;
use std::time::Duration;

use futures_util::StreamExt;
use gprovider::{
    AuthStyle, Message, ModelProvider, ModelRequest, OpenAiCompatibleFactory, ProviderBinding,
    ProviderConfig, ProviderErrorKind, ProviderFactory, Role, StreamEvent,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Serves one chat-completions stream, sleeping `gaps[i]` before token `i`.
async fn serve_tokens(gaps: Vec<Duration>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        read_request(&mut socket).await;

        let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n";
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        for (n, gap) in gaps.into_iter().enumerate() {
            tokio::time::sleep(gap).await;
            let event = format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"tok{n} \"}}}}]}}\n\n");
            if write_chunk(&mut socket, &event).await.is_err() {
                return;
            }
        }
        let _ = write_chunk(&mut socket, "data: [DONE]\n\n").await;
        let _ = socket.write_all(b"0\r\n\r\n").await;
    });

    addr
}

async fn read_request(socket: &mut TcpStream) {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];
    let header_end = loop {
        let read = socket.read(&mut chunk).await.expect("read request");
        assert!(read > 0, "client closed before sending headers");
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(pos) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_ascii_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buffer.len() - header_end < content_length {
        let read = socket.read(&mut chunk).await.expect("read body");
        assert!(read > 0, "client closed mid-body");
        buffer.extend_from_slice(&chunk[..read]);
    }
}

async fn write_chunk(socket: &mut TcpStream, data: &str) -> std::io::Result<()> {
    let frame = format!("{:x}\r\n{data}\r\n", data.len());
    socket.write_all(frame.as_bytes()).await?;
    socket.flush().await
}

fn local_provider(addr: SocketAddr, timeout: Duration) -> std::sync::Arc<dyn ModelProvider> {
    let factory = OpenAiCompatibleFactory::with_timeout(timeout).expect("http client should build");
    let config = ProviderConfig::new("Local", "LOCAL_API_KEY", format!("http://{addr}/v1"), "local-model")
        .with_auth_style(AuthStyle::None);

    factory
        .build(ProviderBinding {
            base_url: format!("http://{addr}/v1"),
            config,
            credential: None,
        })
        .expect("provider")
}

fn hello() -> ModelRequest {
    ModelRequest::new("local-model", vec![Message::new(Role::User, "hello")])
}

#[tokio::test]
async fn slow_stream_outlives_the_timeout_while_tokens_keep_arriving() {
    let gaps = vec![Duration::from_millis(200); 4];
    let addr = serve_tokens(gaps).await;
    let provider = local_provider(addr, Duration::from_millis(500));

    let mut events = provider.stream(hello()).await.expect("stream opens");
    let mut text = String::new();
    let mut completed = false;
    while let Some(event) = events.next().await {
        match event.expect("no mid-stream error") {
            StreamEvent::TextDelta(delta) => text.push_str(&delta),
            StreamEvent::ResponseComplete(response) => {
                assert_eq!(response.provider, "Local");
                completed = true;
            }
            StreamEvent::ToolCallDelta(_) | StreamEvent::MessageComplete(_) => {}
        }
    }

    assert_eq!(text, "tok0 tok1 tok2 tok3 ");
    assert!(completed);
}

#[tokio::test]
async fn stalled_stream_fails_once_idle_past_the_timeout() {
    let gaps = vec![Duration::ZERO, Duration::from_secs(3)];
    let addr = serve_tokens(gaps).await;
    let provider = local_provider(addr, Duration::from_millis(300));

    let mut events = provider.stream(hello()).await.expect("stream opens");
    let first = events.next().await.expect("first event").expect("first token");
    assert!(matches!(first, StreamEvent::TextDelta(ref delta) if delta == "tok0 "));

    let err = loop {
        match events.next().await {
            Some(Ok(StreamEvent::TextDelta(delta))) => panic!("unexpected token {delta:?}"),
            Some(Ok(_)) => {}
            Some(Err(err)) => break err,
            None => panic!("stream ended without an error"),
        }
    };
    assert!(
        matches!(err.kind, ProviderErrorKind::Timeout | ProviderErrorKind::Transport),
        "unexpected error kind: {err:?}"
    );
}
