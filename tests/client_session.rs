//! End-to-end sessions against a scripted server on a loopback socket.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use base64::{Engine, engine::general_purpose::STANDARD};
use test_util::{Event, MockServer, RecordingHandler, Step, close_frame, server_frame};
use tokio::net::{TcpListener, TcpStream};
use wsclient::{
    Client,
    ClientConfig,
    ClientError,
    Masking,
    Opcode,
    PeerIdentity,
    auth::{AuthError, AuthScheme, AuthStep, SecurityProvider},
    handshake::HandshakeError,
    transport::TransportError,
};

const WAIT: Duration = Duration::from_secs(5);

fn local(port: u16, path: &str) -> ClientConfig {
    ClientConfig::new("127.0.0.1", port, path).with_close_timeout(Duration::from_millis(500))
}

/// Provider answering round `n` with the token `round-n`.
#[derive(Clone, Default)]
struct CountingProvider {
    services: Arc<Mutex<Vec<Option<String>>>>,
}

impl SecurityProvider for CountingProvider {
    type Credential = ();
    type Context = usize;

    fn acquire_credentials(&self, _scheme: AuthScheme) -> Result<Self::Credential, AuthError> {
        Ok(())
    }

    fn step(
        &self,
        _credential: &Self::Credential,
        context: Option<Self::Context>,
        _challenge: &[u8],
        service_name: Option<&str>,
    ) -> Result<AuthStep<Self::Context>, AuthError> {
        self.services
            .lock()
            .expect("services lock")
            .push(service_name.map(str::to_owned));
        let round = context.unwrap_or(0) + 1;
        Ok(AuthStep {
            context: round,
            token: format!("round-{round}").into_bytes(),
            complete: round > 1,
        })
    }
}

#[tokio::test]
async fn upgrade_request_names_the_endpoint() {
    let server = MockServer::start(vec![
        Step::ReadRequest,
        Step::Accept,
        Step::ReadFrame,
        Step::AwaitClose,
    ])
    .await
    .expect("server");
    let (handler, _events) = RecordingHandler::new();
    let client = Client::connect(local(server.port(), "/chat?room=1"), handler)
        .await
        .expect("connect");
    client.send_text("hi").await.expect("send");
    client.close().await;

    let transcript = server.finish().await.expect("transcript");
    let request = transcript.requests.first().expect("request");
    assert_eq!(request.request_line(), "GET /chat?room=1 HTTP/1.1");
    assert_eq!(request.header("Upgrade"), Some("websocket"));
    assert_eq!(request.header("Connection"), Some("Upgrade"));
    assert_eq!(request.header("Sec-WebSocket-Version"), Some("13"));
    assert!(request.header("Authorization").is_none());

    let frame = transcript.frames.first().expect("frame");
    assert!(frame.fin);
    assert!(frame.masked);
    assert_eq!(frame.opcode, Opcode::Text);
    assert_eq!(&frame.payload[..], b"hi");
}

#[tokio::test]
async fn host_header_carries_configured_port() {
    let server = MockServer::start(vec![Step::ReadRequest, Step::Accept, Step::AwaitClose])
        .await
        .expect("server");
    let port = server.port();
    let (handler, _events) = RecordingHandler::new();
    let client = Client::connect(local(port, "/"), handler)
        .await
        .expect("connect");
    assert_eq!(client.connection().peer().addr.map(|addr| addr.port()), Some(port));
    client.close().await;

    let transcript = server.finish().await.expect("transcript");
    let expected = format!("127.0.0.1:{port}");
    let request = transcript.requests.first().expect("request");
    assert_eq!(request.header("Host"), Some(expected.as_str()));
}

#[tokio::test]
async fn server_messages_reach_the_handler() {
    let mut fragments = server_frame(false, Opcode::Binary, b"ABC");
    fragments.extend(server_frame(true, Opcode::Continuation, b"DEF"));
    let server = MockServer::start(vec![
        Step::ReadRequest,
        Step::Accept,
        Step::Raw(server_frame(true, Opcode::Text, b"hello")),
        Step::Raw(fragments),
        Step::Raw(close_frame()),
        Step::AwaitClose,
    ])
    .await
    .expect("server");
    let (handler, mut events) = RecordingHandler::new();
    let client = Client::connect(local(server.port(), "/"), handler)
        .await
        .expect("connect");

    let Event::Message(first) = events.next(WAIT).await else {
        panic!("expected text message");
    };
    assert_eq!(first.as_text(), Some("hello"));
    let Event::Message(second) = events.next(WAIT).await else {
        panic!("expected binary message");
    };
    assert_eq!(second.opcode, Opcode::Binary);
    assert_eq!(&second.payload[..], b"ABCDEF");
    assert!(matches!(events.next(WAIT).await, Event::Disconnect(None)));
    assert!(!client.is_open());

    client.close().await;
    server.finish().await.expect("transcript");
}

#[tokio::test]
async fn pings_are_answered_with_matching_pongs() {
    let server = MockServer::start(vec![
        Step::ReadRequest,
        Step::Accept,
        Step::Raw(server_frame(true, Opcode::Ping, b"beat")),
        Step::ReadFrame,
        Step::AwaitClose,
    ])
    .await
    .expect("server");
    let (handler, mut events) = RecordingHandler::new();
    let client = Client::connect(local(server.port(), "/").with_masking(Masking::Random), handler)
        .await
        .expect("connect");

    let Event::Message(ping) = events.next(WAIT).await else {
        panic!("expected ping");
    };
    assert_eq!(ping.opcode, Opcode::Ping);
    client.close().await;

    let transcript = server.finish().await.expect("transcript");
    let pong = transcript.frames.first().expect("pong");
    assert_eq!(pong.opcode, Opcode::Pong);
    assert_eq!(&pong.payload[..], b"beat");
}

#[tokio::test]
async fn ntlm_challenges_are_answered_until_upgrade() {
    let challenge = format!("NTLM {}", STANDARD.encode(b"server-nonce"));
    let server = MockServer::start(vec![
        Step::ReadRequest,
        Step::Challenge("NTLM".to_owned()),
        Step::ReadRequest,
        Step::Challenge(challenge),
        Step::ReadRequest,
        Step::Accept,
        Step::AwaitClose,
    ])
    .await
    .expect("server");
    let provider = CountingProvider::default();
    let services = Arc::clone(&provider.services);
    let (handler, _events) = RecordingHandler::new();
    let client = Client::builder(local(server.port(), "/secure"))
        .security_provider(provider)
        .connect(handler)
        .await
        .expect("connect");
    assert!(client.is_open());
    client.close().await;

    let transcript = server.finish().await.expect("transcript");
    let authorizations: Vec<_> = transcript
        .requests
        .iter()
        .map(|request| request.header("Authorization").map(str::to_owned))
        .collect();
    assert_eq!(
        authorizations,
        vec![
            None,
            Some(format!("NTLM {}", STANDARD.encode(b"round-1"))),
            Some(format!("NTLM {}", STANDARD.encode(b"round-2"))),
        ]
    );
    assert_eq!(*services.lock().expect("services lock"), vec![None, None]);
}

#[tokio::test]
async fn negotiate_targets_the_canonical_peer_name() {
    let server = MockServer::start(vec![
        Step::ReadRequest,
        Step::Challenge("Negotiate".to_owned()),
        Step::ReadRequest,
        Step::Accept,
        Step::AwaitClose,
    ])
    .await
    .expect("server");
    let stream = TcpStream::connect(server.addr()).await.expect("tcp");
    let peer = PeerIdentity {
        host: "127.0.0.1".to_owned(),
        port: server.port(),
        path: "/".to_owned(),
        addr: Some(server.addr()),
        canonical_name: Some("gateway.example.test".to_owned()),
    };
    let provider = CountingProvider::default();
    let services = Arc::clone(&provider.services);
    let (handler, _events) = RecordingHandler::new();
    let client = Client::builder(local(server.port(), "/"))
        .security_provider(provider)
        .connect_stream(stream, peer, handler)
        .await
        .expect("connect");
    client.close().await;

    server.finish().await.expect("transcript");
    assert_eq!(
        *services.lock().expect("services lock"),
        vec![Some("HTTP/gateway.example.test".to_owned())]
    );
}

#[tokio::test]
async fn negotiate_without_peer_name_fails() {
    let server = MockServer::start(vec![
        Step::ReadRequest,
        Step::Challenge("Negotiate".to_owned()),
        Step::AwaitClose,
    ])
    .await
    .expect("server");
    let stream = TcpStream::connect(server.addr()).await.expect("tcp");
    let (handler, _events) = RecordingHandler::new();
    let err = Client::builder(local(server.port(), "/"))
        .security_provider(CountingProvider::default())
        .connect_stream(stream, PeerIdentity::default(), handler)
        .await
        .expect_err("no principal");
    assert!(matches!(
        err,
        ClientError::Handshake(HandshakeError::NoServicePrincipalName)
    ));
    server.finish().await.expect("transcript");
}

#[tokio::test]
async fn challenge_without_provider_is_unsupported() {
    let server = MockServer::start(vec![
        Step::ReadRequest,
        Step::Challenge("NTLM".to_owned()),
        Step::AwaitClose,
    ])
    .await
    .expect("server");
    let (handler, _events) = RecordingHandler::new();
    let err = Client::connect(local(server.port(), "/"), handler)
        .await
        .expect_err("unsupported");
    assert!(matches!(
        err,
        ClientError::Handshake(HandshakeError::UnsupportedAuthScheme(ref scheme)) if scheme == "NTLM"
    ));
    server.finish().await.expect("transcript");
}

#[tokio::test]
async fn silent_server_trips_the_handshake_timeout() {
    let server = MockServer::start(vec![Step::ReadRequest, Step::Sleep(Duration::from_millis(500))])
        .await
        .expect("server");
    let (handler, _events) = RecordingHandler::new();
    let config = local(server.port(), "/").with_handshake_timeout(Duration::from_millis(100));
    let err = Client::connect(config, handler)
        .await
        .expect_err("timeout");
    assert!(matches!(
        err,
        ClientError::Handshake(HandshakeError::TimedOut(limit)) if limit == Duration::from_millis(100)
    ));
    server.finish().await.expect("transcript");
}

#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    let (handler, _events) = RecordingHandler::new();
    let err = Client::connect(local(port, "/"), handler)
        .await
        .expect_err("refused");
    assert!(matches!(
        err,
        ClientError::Transport(TransportError::Connect { port: p, .. }) if p == port
    ));
}
