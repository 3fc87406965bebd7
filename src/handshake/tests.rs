//! Engine tests against an in-memory peer.

use rstest::rstest;
use tokio::io::{AsyncWriteExt, duplex};

use super::*;
use crate::{
    auth::{AuthError, NoAuthenticator},
    test_helpers::capture_events,
    transport::{self, BoxedReader, BoxedWriter},
};

const KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";
const ACCEPT: &str = "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=";

/// Answers NTLM challenges with a numbered token.
#[derive(Default)]
struct CountingAuth {
    calls: usize,
}

impl Authenticate for CountingAuth {
    fn supports(&self, scheme: &str) -> bool { scheme == "NTLM" }

    fn respond(&mut self, _challenge: &Challenge, _peer_name: Option<&str>) -> Result<String, AuthError> {
        self.calls += 1;
        Ok(format!("NTLM dG9r{}", self.calls))
    }
}

fn upgrade_response(accept: &str) -> String {
    format!(
        "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: \
         Upgrade\r\nSec-WebSocket-Accept: {accept}\r\n\r\n"
    )
}

async fn run(
    replies: Vec<String>,
    authenticator: &mut dyn Authenticate,
) -> (Result<HttpResponse, HandshakeError>, Vec<String>) {
    let (client, server) = duplex(8192);
    let (mut reader, mut writer) = transport::split(client);
    let (server_reader, server_writer) = transport::split(server);
    let peer = serve(server_reader, server_writer, replies);
    let request = UpgradeRequest::with_key("example.com", 80, "/ws", KEY.to_owned());
    let result = perform(
        &mut reader,
        &mut writer,
        &request,
        authenticator,
        &HandshakeOptions::default(),
    )
    .await;
    drop(writer);
    (result, peer.await.expect("join"))
}

/// Peer that reads one request per scripted reply and answers it; an empty
/// reply closes the connection instead.
fn serve(
    mut reader: transport::TransportReader<BoxedReader>,
    mut writer: transport::TransportWriter<BoxedWriter>,
    replies: Vec<String>,
) -> tokio::task::JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        let mut seen = Vec::new();
        for reply in replies {
            let Ok(Some(request)) = reader.recv_until_blank_line(4096).await else {
                break;
            };
            seen.push(String::from_utf8_lossy(&request).into_owned());
            if reply.is_empty() || writer.send(reply.as_bytes(), None).await.is_err() {
                break;
            }
        }
        writer.shutdown().await.ok();
        seen
    })
}

#[tokio::test]
async fn accepts_valid_upgrade() {
    let (result, requests) = run(vec![upgrade_response(ACCEPT)], &mut NoAuthenticator).await;
    let response = result.expect("handshake");
    assert_eq!(response.status(), 101);
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with("GET /ws HTTP/1.1\r\nHost: example.com:80\r\n"));
}

#[tokio::test]
async fn bytes_after_header_block_stay_buffered() {
    let (client, mut server) = duplex(8192);
    let (mut reader, mut writer) = transport::split(client);
    let request = UpgradeRequest::with_key("h", 80, "/", KEY.to_owned());
    let peer = tokio::spawn(async move {
        let mut reply = upgrade_response(ACCEPT).into_bytes();
        reply.extend_from_slice(b"\x81\x02hi");
        server.write_all(&reply).await.expect("write");
        server
    });
    perform(
        &mut reader,
        &mut writer,
        &request,
        &mut NoAuthenticator,
        &HandshakeOptions::default(),
    )
    .await
    .expect("handshake");
    let frame = reader.recv_exact(4).await.expect("read").expect("bytes");
    assert_eq!(&frame[..], b"\x81\x02hi");
    drop(peer.await.expect("join"));
}

#[rstest]
#[case("HTTP/1.1 200 OK\r\n\r\n".to_owned(), 200)]
#[case("HTTP/1.1 401 Unauthorized\r\n\r\n".to_owned(), 401)]
#[case("HTTP/1.1 403 Forbidden\r\n\r\n".to_owned(), 403)]
#[tokio::test]
async fn rejects_unexpected_status(#[case] reply: String, #[case] status: u16) {
    let (result, _) = run(vec![reply], &mut NoAuthenticator).await;
    assert!(matches!(result, Err(HandshakeError::UnexpectedStatus(s)) if s == status));
}

#[rstest]
#[case("HTTP/1.1 101 OK\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n")]
#[case("HTTP/1.1 101 OK\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: x\r\n\r\n")]
#[case("HTTP/1.1 101 OK\r\nUpgrade: WebSocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: x\r\n\r\n")]
#[case("HTTP/1.1 101 OK\r\nUpgrade: websocket\r\nConnection: upgrade\r\nSec-WebSocket-Accept: x\r\n\r\n")]
#[tokio::test]
async fn rejects_malformed_upgrade(#[case] reply: &str) {
    let (result, _) = run(vec![reply.to_owned()], &mut NoAuthenticator).await;
    assert!(matches!(result, Err(HandshakeError::MalformedResponse(_))));
}

#[tokio::test]
async fn rejects_wrong_accept() {
    let (result, _) = run(vec![upgrade_response("AAAA")], &mut NoAuthenticator).await;
    assert!(matches!(result, Err(HandshakeError::InvalidAccept)));
}

#[tokio::test]
async fn unsupported_scheme_fails() {
    let reply = "HTTP/1.1 401 Unauthorized\r\nWWW-Authenticate: Basic realm\r\n\r\n".to_owned();
    let (result, requests) = run(vec![reply], &mut CountingAuth::default()).await;
    assert!(matches!(result, Err(HandshakeError::UnsupportedAuthScheme(s)) if s == "Basic"));
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn answers_challenges_until_upgrade() {
    let challenge = |token: &str| {
        format!("HTTP/1.1 401 Unauthorized\r\nWWW-Authenticate: NTLM{token}\r\n\r\n")
    };
    let replies = vec![
        challenge(""),
        challenge(" Y2hhbGxlbmdl"),
        upgrade_response(ACCEPT),
    ];
    let mut auth = CountingAuth::default();
    let (result, requests) = run(replies, &mut auth).await;
    result.expect("handshake");
    assert_eq!(auth.calls, 2);
    assert_eq!(requests.len(), 3);
    assert!(!requests[0].contains("Authorization"));
    assert!(requests[1].ends_with("Authorization: NTLM dG9r1\r\n\r\n"));
    assert!(requests[2].ends_with("Authorization: NTLM dG9r2\r\n\r\n"));
    assert!(requests.iter().all(|r| r.contains(&format!("Sec-WebSocket-Key: {KEY}\r\n"))));
}

#[tokio::test]
async fn endless_challenges_hit_round_limit() {
    let reply = "HTTP/1.1 401 Unauthorized\r\nWWW-Authenticate: NTLM\r\n\r\n".to_owned();
    let replies = vec![reply; DEFAULT_MAX_AUTH_ROUNDS + 1];
    let (result, _) = run(replies, &mut CountingAuth::default()).await;
    assert!(matches!(
        result,
        Err(HandshakeError::TooManyAuthRounds(DEFAULT_MAX_AUTH_ROUNDS))
    ));
}

#[tokio::test]
async fn closure_before_response_is_reported() {
    let (result, _) = run(vec![String::new()], &mut NoAuthenticator).await;
    assert!(matches!(result, Err(HandshakeError::ClosedDuringHandshake)));
}

#[test]
fn auth_errors_map_onto_handshake_errors() {
    assert!(matches!(
        HandshakeError::from(AuthError::NoServicePrincipalName),
        HandshakeError::NoServicePrincipalName
    ));
    assert!(matches!(
        HandshakeError::from(AuthError::EmptyToken),
        HandshakeError::Auth(AuthError::EmptyToken)
    ));
}

#[tokio::test]
async fn challenge_rounds_are_traced() {
    let replies = vec![
        "HTTP/1.1 401 Unauthorized\r\nWWW-Authenticate: NTLM\r\n\r\n".to_owned(),
        upgrade_response(ACCEPT),
    ];
    let mut auth = CountingAuth::default();
    let ((result, _), events) = capture_events(run(replies, &mut auth)).await;
    result.expect("handshake");
    let round = events
        .iter()
        .find(|event| event.message() == Some("answering challenge"))
        .expect("challenge event");
    assert_eq!(round.level(), tracing::Level::DEBUG);
    assert_eq!(round.field("scheme"), Some("NTLM"));
    assert_eq!(round.field("round"), Some("1"));
}
