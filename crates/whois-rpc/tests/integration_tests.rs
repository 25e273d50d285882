//! Integration tests for the whois-rpc HTTP transport.
//!
//! Most tests run the server in-process on an ephemeral port with a fake
//! lookup provider and talk to it over real HTTP. The signal test spawns the
//! compiled binary.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use serde_json::{json, Value};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use whois_core::{ServerSettings, WhoisProvider};
use whois_rpc::{start_server, RunningServer};

// =============================================================================
// Fixtures
// =============================================================================

/// Provider that echoes its input and counts calls.
#[derive(Default)]
struct FakeProvider {
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl FakeProvider {
    fn slow(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Some(delay),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn respond(&self, payload: Value) -> whois_core::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(payload)
    }
}

#[async_trait]
impl WhoisProvider for FakeProvider {
    async fn lookup_domain(&self, domain: &str) -> whois_core::Result<Value> {
        self.respond(json!({"ldhName": domain, "status": ["active"]}))
            .await
    }
    async fn lookup_tld(&self, tld: &str) -> whois_core::Result<Value> {
        self.respond(json!({"ldhName": tld})).await
    }
    async fn lookup_ip(&self, ip: IpAddr) -> whois_core::Result<Value> {
        self.respond(json!({"startAddress": ip.to_string()})).await
    }
    async fn lookup_asn(&self, asn: u32) -> whois_core::Result<Value> {
        self.respond(json!({"startAutnum": asn})).await
    }
}

fn test_settings() -> ServerSettings {
    ServerSettings {
        port: 0,
        ..ServerSettings::default()
    }
}

async fn spawn_server(settings: ServerSettings, provider: Arc<FakeProvider>) -> (RunningServer, String) {
    let server = start_server(settings, provider)
        .await
        .expect("server should start");
    let base = format!("http://{}", server.addr());
    (server, base)
}

// =============================================================================
// HTTP helpers
// =============================================================================

#[derive(Debug, Default)]
struct SseEvent {
    event: String,
    data: String,
}

/// Minimal Server-Sent Events reader over a reqwest body stream.
struct SseClient {
    stream: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    buffer: String,
}

impl SseClient {
    async fn connect(base: &str, token: Option<&str>) -> Result<Self, reqwest::StatusCode> {
        let mut request = reqwest::Client::new().get(format!("{}/sse", base));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.expect("request should reach server");
        if !response.status().is_success() {
            return Err(response.status());
        }
        Ok(Self {
            stream: response
                .bytes_stream()
                .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                .boxed(),
            buffer: String::new(),
        })
    }

    /// Connect and consume the endpoint announcement; returns the session id.
    async fn open(base: &str) -> (Self, String) {
        let mut client = Self::connect(base, None).await.expect("stream admitted");
        let session_id = client.session_id().await;
        (client, session_id)
    }

    async fn session_id(&mut self) -> String {
        let event = self.next_event().await.expect("endpoint event");
        assert_eq!(event.event, "endpoint");
        assert!(event.data.starts_with("/message?sessionId="));
        event
            .data
            .split("sessionId=")
            .nth(1)
            .map(String::from)
            .expect("session id in endpoint")
    }

    /// Next non-comment event, or `None` if the stream ends or stalls.
    async fn next_event(&mut self) -> Option<SseEvent> {
        loop {
            if let Some(pos) = self.buffer.find("\n\n") {
                let raw: String = self.buffer.drain(..pos + 2).collect();
                let mut event = SseEvent::default();
                for line in raw.lines() {
                    if let Some(value) = line.strip_prefix("event:") {
                        event.event = value.trim().to_string();
                    } else if let Some(value) = line.strip_prefix("data:") {
                        if !event.data.is_empty() {
                            event.data.push('\n');
                        }
                        event.data.push_str(value.strip_prefix(' ').unwrap_or(value));
                    }
                }
                if event.event.is_empty() && event.data.is_empty() {
                    continue;
                }
                return Some(event);
            }

            match tokio::time::timeout(Duration::from_secs(5), self.stream.next()).await {
                Ok(Some(Ok(chunk))) => self.buffer.push_str(&String::from_utf8_lossy(&chunk)),
                _ => return None,
            }
        }
    }

    async fn next_message(&mut self) -> Value {
        let event = self.next_event().await.expect("message event");
        assert_eq!(event.event, "message");
        serde_json::from_str(&event.data).expect("reply is JSON")
    }

    /// True if the server ends the stream within a few seconds.
    async fn wait_closed(&mut self) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            match tokio::time::timeout_at(deadline, self.stream.next()).await {
                Ok(None) | Ok(Some(Err(_))) => return true,
                Ok(Some(Ok(_))) => continue,
                Err(_) => return false,
            }
        }
    }
}

async fn post_message(base: &str, session_id: Option<&str>, body: &str) -> reqwest::StatusCode {
    let url = match session_id {
        Some(id) => format!("{}/message?sessionId={}", base, id),
        None => format!("{}/message", base),
    };
    reqwest::Client::new()
        .post(url)
        .header("content-type", "application/json")
        .body(body.to_string())
        .timeout(Duration::from_secs(10))
        .send()
        .await
        .expect("request should reach server")
        .status()
}

async fn post_rpc(base: &str, session_id: &str, message: Value) -> reqwest::StatusCode {
    post_message(base, Some(session_id), &message.to_string()).await
}

async fn get_json(base: &str, path: &str) -> Value {
    reqwest::Client::new()
        .get(format!("{}{}", base, path))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("request should reach server")
        .json()
        .await
        .expect("JSON body")
}

async fn active_sessions(base: &str) -> u64 {
    get_json(base, "/").await["activeSessions"]
        .as_u64()
        .expect("activeSessions")
}

/// Poll the status endpoint until the active session count matches.
async fn wait_for_sessions(base: &str, expected: u64) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while tokio::time::Instant::now() < deadline {
        if active_sessions(base).await == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

fn call_tool(id: u64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

// =============================================================================
// Status
// =============================================================================

#[tokio::test]
async fn test_health_and_status() {
    let (_server, base) = spawn_server(test_settings(), Arc::new(FakeProvider::default())).await;

    assert_eq!(get_json(&base, "/health").await, json!({"status": "ok"}));

    let status = get_json(&base, "/").await;
    assert_eq!(status["name"], "Whois MCP Server");
    assert_eq!(status["status"], "running");
    assert_eq!(status["activeSessions"], 0);
    assert_eq!(status["maxSessions"], 100);
    assert_eq!(status["endpoints"]["sse"], "/sse");
    assert_eq!(status["endpoints"]["message"], "/message");
}

// =============================================================================
// Streaming sessions
// =============================================================================

#[tokio::test]
async fn test_domain_lookup_round_trip() {
    let provider = Arc::new(FakeProvider::default());
    let (_server, base) = spawn_server(test_settings(), provider.clone()).await;
    let (mut client, session_id) = SseClient::open(&base).await;

    let status = post_rpc(
        &base,
        &session_id,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "test", "version": "0.0.0"}
            }
        }),
    )
    .await;
    assert_eq!(status, reqwest::StatusCode::ACCEPTED);

    let init = client.next_message().await;
    assert_eq!(init["id"], 1);
    assert_eq!(init["result"]["serverInfo"]["name"], "whois");
    assert_eq!(init["result"]["protocolVersion"], "2024-11-05");

    let status = post_rpc(
        &base,
        &session_id,
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    )
    .await;
    assert_eq!(status, reqwest::StatusCode::ACCEPTED);

    let status = post_rpc(
        &base,
        &session_id,
        call_tool(2, "whois_domain", json!({"domain": "Example.COM"})),
    )
    .await;
    assert_eq!(status, reqwest::StatusCode::ACCEPTED);

    // The notification produced no event; the next one answers id 2.
    let reply = client.next_message().await;
    assert_eq!(reply["id"], 2);
    let result = &reply["result"];
    assert!(result.get("isError").is_none());
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("Domain whois lookup for: \n"));
    let payload: Value = serde_json::from_str(&text["Domain whois lookup for: \n".len()..]).unwrap();
    assert_eq!(payload["ldhName"], "example.com");
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_replies_follow_command_order() {
    let (_server, base) = spawn_server(test_settings(), Arc::new(FakeProvider::default())).await;
    let (mut client, session_id) = SseClient::open(&base).await;

    for id in 1..=5u64 {
        let status = post_rpc(
            &base,
            &session_id,
            call_tool(id, "whois_as", json!({"asn": format!("AS{}", 64495 + id)})),
        )
        .await;
        assert_eq!(status, reqwest::StatusCode::ACCEPTED);
    }

    for id in 1..=5u64 {
        let reply = client.next_message().await;
        assert_eq!(reply["id"], id);
    }
}

#[tokio::test]
async fn test_invalid_arguments_never_reach_provider() {
    let provider = Arc::new(FakeProvider::default());
    let (_server, base) = spawn_server(test_settings(), provider.clone()).await;
    let (mut client, session_id) = SseClient::open(&base).await;

    post_rpc(&base, &session_id, call_tool(1, "whois_ip", json!({"ip": "not-an-ip"}))).await;
    post_rpc(&base, &session_id, call_tool(2, "whois_as", json!({"asn": "13335"}))).await;
    post_rpc(&base, &session_id, call_tool(3, "whois_tld", json!({"tld": "c"}))).await;

    for id in 1..=3u64 {
        let reply = client.next_message().await;
        assert_eq!(reply["id"], id);
        assert_eq!(reply["result"]["isError"], true);
        let text = reply["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Error: "), "unexpected text {text}");
    }
    assert_eq!(provider.calls(), 0);

    // The session survives operation errors.
    post_rpc(&base, &session_id, json!({"jsonrpc": "2.0", "id": 4, "method": "ping"})).await;
    assert_eq!(client.next_message().await["result"], json!({}));
}

#[tokio::test]
async fn test_lookup_timeout_is_tool_error() {
    let settings = ServerSettings {
        lookup_timeout: Duration::from_millis(100),
        ..test_settings()
    };
    let provider = Arc::new(FakeProvider::slow(Duration::from_secs(30)));
    let (_server, base) = spawn_server(settings, provider).await;
    let (mut client, session_id) = SseClient::open(&base).await;

    let started = tokio::time::Instant::now();
    post_rpc(&base, &session_id, call_tool(1, "whois_domain", json!({"domain": "slow.example"}))).await;
    let reply = client.next_message().await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(reply["result"]["isError"], true);
    assert_eq!(
        reply["result"]["content"][0]["text"],
        "Error: WHOIS lookup timed out after 100ms"
    );
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let (_server, base) = spawn_server(test_settings(), Arc::new(FakeProvider::default())).await;
    let (mut a, a_id) = SseClient::open(&base).await;
    let (mut b, b_id) = SseClient::open(&base).await;
    assert_ne!(a_id, b_id);

    post_rpc(&base, &b_id, json!({"jsonrpc": "2.0", "id": "for-b", "method": "ping"})).await;
    post_rpc(&base, &a_id, json!({"jsonrpc": "2.0", "id": "for-a", "method": "ping"})).await;

    assert_eq!(a.next_message().await["id"], "for-a");
    assert_eq!(b.next_message().await["id"], "for-b");
}

#[tokio::test]
async fn test_client_disconnect_releases_session() {
    let (_server, base) = spawn_server(test_settings(), Arc::new(FakeProvider::default())).await;
    let (client, session_id) = SseClient::open(&base).await;
    assert_eq!(active_sessions(&base).await, 1);

    drop(client);
    assert!(wait_for_sessions(&base, 0).await);

    let status = post_rpc(&base, &session_id, json!({"jsonrpc": "2.0", "id": 1, "method": "ping"})).await;
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
}

// =============================================================================
// Command routing
// =============================================================================

#[tokio::test]
async fn test_message_routing_errors() {
    let (_server, base) = spawn_server(test_settings(), Arc::new(FakeProvider::default())).await;
    let (_client, session_id) = SseClient::open(&base).await;
    let ping = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}).to_string();

    assert_eq!(
        post_message(&base, None, &ping).await,
        reqwest::StatusCode::BAD_REQUEST
    );
    assert_eq!(
        post_message(&base, Some(""), &ping).await,
        reqwest::StatusCode::BAD_REQUEST
    );
    assert_eq!(
        post_message(&base, Some("no-such-session"), &ping).await,
        reqwest::StatusCode::NOT_FOUND
    );
    assert_eq!(
        post_message(&base, Some(session_id.as_str()), "{not json").await,
        reqwest::StatusCode::BAD_REQUEST
    );

    // None of the failures disturbed the live session.
    assert_eq!(active_sessions(&base).await, 1);
    assert_eq!(
        post_message(&base, Some(session_id.as_str()), &ping).await,
        reqwest::StatusCode::ACCEPTED
    );
}

#[tokio::test]
async fn test_protocol_errors_delivered_on_stream() {
    let (_server, base) = spawn_server(test_settings(), Arc::new(FakeProvider::default())).await;
    let (mut client, session_id) = SseClient::open(&base).await;

    post_rpc(&base, &session_id, json!({"jsonrpc": "2.0", "id": 1, "method": "resources/list"})).await;
    post_rpc(&base, &session_id, call_tool(2, "whois_everything", json!({}))).await;

    assert_eq!(client.next_message().await["error"]["code"], -32601);
    assert_eq!(client.next_message().await["error"]["code"], -32602);
}

// =============================================================================
// Admission
// =============================================================================

#[tokio::test]
async fn test_capacity_limit() {
    let settings = ServerSettings {
        max_sessions: 2,
        ..test_settings()
    };
    let (_server, base) = spawn_server(settings, Arc::new(FakeProvider::default())).await;

    let (first, _) = SseClient::open(&base).await;
    let (_second, _) = SseClient::open(&base).await;

    let rejected = SseClient::connect(&base, None).await;
    assert_eq!(rejected.err(), Some(reqwest::StatusCode::SERVICE_UNAVAILABLE));
    assert_eq!(active_sessions(&base).await, 2);

    drop(first);
    assert!(wait_for_sessions(&base, 1).await);
    let (_third, _) = SseClient::open(&base).await;
    assert_eq!(active_sessions(&base).await, 2);
}

#[tokio::test]
async fn test_wrong_api_key_rejected_before_admission() {
    let settings = ServerSettings {
        api_key: Some("secret".into()),
        ..test_settings()
    };
    let (_server, base) = spawn_server(settings, Arc::new(FakeProvider::default())).await;

    let rejected = SseClient::connect(&base, Some("wrong")).await;
    assert_eq!(rejected.err(), Some(reqwest::StatusCode::UNAUTHORIZED));
    let rejected = SseClient::connect(&base, None).await;
    assert_eq!(rejected.err(), Some(reqwest::StatusCode::UNAUTHORIZED));
    assert_eq!(active_sessions(&base).await, 0);

    let mut client = SseClient::connect(&base, Some("secret")).await.expect("admitted");
    let session_id = client.session_id().await;

    // Command submission is guarded as well.
    let ping = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}).to_string();
    assert_eq!(
        post_message(&base, Some(session_id.as_str()), &ping).await,
        reqwest::StatusCode::UNAUTHORIZED
    );
    let status = reqwest::Client::new()
        .post(format!("{}/message?sessionId={}", base, session_id))
        .bearer_auth("secret")
        .body(ping)
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, reqwest::StatusCode::ACCEPTED);
    assert_eq!(client.next_message().await["id"], 1);
}

#[tokio::test]
async fn test_origin_allow_list() {
    let settings = ServerSettings {
        allowed_origins: vec!["https://app.example".into()],
        ..test_settings()
    };
    let (_server, base) = spawn_server(settings, Arc::new(FakeProvider::default())).await;

    let status = reqwest::Client::new()
        .get(format!("{}/sse", base))
        .header("origin", "https://evil.example")
        .send()
        .await
        .unwrap()
        .status();
    assert_eq!(status, reqwest::StatusCode::FORBIDDEN);

    let response = reqwest::Client::new()
        .get(format!("{}/sse", base))
        .header("origin", "https://app.example")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("https://app.example")
    );
}

// =============================================================================
// Shutdown
// =============================================================================

#[tokio::test]
async fn test_double_shutdown_closes_every_stream_once() {
    let (server, base) = spawn_server(test_settings(), Arc::new(FakeProvider::default())).await;
    let (mut a, _) = SseClient::open(&base).await;
    let (mut b, _) = SseClient::open(&base).await;

    let coordinator = server.coordinator();
    assert_eq!(coordinator.shutdown(), 2);
    assert_eq!(coordinator.shutdown(), 0);

    assert!(a.wait_closed().await);
    assert!(b.wait_closed().await);
    assert!(server.state().table().is_empty());

    tokio::time::timeout(
        Duration::from_secs(5),
        server.run_until_shutdown(Duration::from_secs(2)),
    )
    .await
    .expect("listener should stop within the grace period")
    .expect("clean shutdown");
}

#[tokio::test]
async fn test_shutdown_closes_stream_with_unread_backlog() {
    let (server, base) = spawn_server(test_settings(), Arc::new(FakeProvider::default())).await;
    let (mut client, session_id) = SseClient::open(&base).await;

    // The client stops reading while commands keep arriving.
    let posts: Vec<_> = (0..96u64)
        .map(|id| {
            let base = base.clone();
            let session_id = session_id.clone();
            tokio::spawn(async move {
                // Late posts may be refused outright once the listener stops.
                reqwest::Client::new()
                    .post(format!("{}/message?sessionId={}", base, session_id))
                    .json(&json!({"jsonrpc": "2.0", "id": id, "method": "ping"}))
                    .send()
                    .await
                    .map(|response| response.status())
            })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(server.coordinator().shutdown(), 1);

    for post in posts {
        tokio::time::timeout(Duration::from_secs(5), post)
            .await
            .expect("pending post should be released")
            .expect("post task");
    }
    assert!(client.wait_closed().await);
    assert!(server.state().table().is_empty());
}

/// Locate the compiled binary, as cargo exposes it to integration tests.
#[cfg(unix)]
fn binary_path() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_BIN_EXE_whois-rpc"))
}

#[cfg(unix)]
#[tokio::test]
async fn test_binary_exits_cleanly_on_repeated_sigterm() {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    use std::process::Stdio;
    use tokio::io::AsyncBufReadExt;

    let mut child = tokio::process::Command::new(binary_path())
        .args(["--host", "127.0.0.1", "--port", "0", "--shutdown-grace", "2000"])
        .env_remove("API_KEY")
        .env_remove("ALLOWED_ORIGINS")
        .env_remove("MAX_SESSIONS")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .expect("failed to spawn whois-rpc");

    let stdout = child.stdout.take().expect("stdout captured");
    let mut lines = tokio::io::BufReader::new(stdout).lines();

    let mut port: Option<u16> = None;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
    while tokio::time::Instant::now() < deadline {
        match tokio::time::timeout(Duration::from_millis(250), lines.next_line()).await {
            Ok(Ok(Some(line))) => {
                if let Some(value) = line.strip_prefix("MCP_PORT=") {
                    port = value.trim().parse().ok();
                    break;
                }
            }
            Ok(Ok(None)) | Ok(Err(_)) => break,
            Err(_) => continue,
        }
    }
    let port = port.expect("MCP_PORT line not emitted by whois-rpc");
    let base = format!("http://127.0.0.1:{}", port);

    let (mut a, _) = SseClient::open(&base).await;
    let (mut b, _) = SseClient::open(&base).await;

    let pid = Pid::from_raw(child.id().expect("child running") as i32);
    kill(pid, Signal::SIGTERM).expect("first SIGTERM");
    // The process may already be gone by the second signal.
    let _ = kill(pid, Signal::SIGTERM);

    assert!(a.wait_closed().await);
    assert!(b.wait_closed().await);

    let status = tokio::time::timeout(Duration::from_secs(10), child.wait())
        .await
        .expect("process should exit within the grace period")
        .expect("wait on child");
    assert!(status.success(), "exit status {:?}", status);
}
