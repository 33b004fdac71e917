//! Polling fallback and REST client integration tests against a
//! minimal in-process HTTP server.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use tradedesk_core::config::api::ApiConfig;
use tradedesk_core::config::notifications::NotificationsConfig;
use tradedesk_core::types::auth::Credentials;
use tradedesk_core::types::user::UserType;
use tradedesk_core::AppResult;

use tradedesk_notify::capability::{CapabilityProbe, NotifyPlatform, PermissionState};
use tradedesk_notify::dispatch::NotificationHub;
use tradedesk_notify::push::subscription::PushSubscription;
use tradedesk_notify::push::BackgroundDelivery;
use tradedesk_notify::record::NotificationRecord;
use tradedesk_notify::{ApiClient, PollingFallback};

#[derive(Debug)]
struct HeadlessPlatform;

#[async_trait]
impl NotifyPlatform for HeadlessPlatform {
    fn is_interactive(&self) -> bool {
        false
    }

    fn supports_display(&self) -> bool {
        false
    }

    async fn request_permission(&self) -> PermissionState {
        PermissionState::Denied
    }

    async fn show(&self, _title: &str, _body: &str) -> AppResult<()> {
        Ok(())
    }
}

/// Scripted one-request-per-connection HTTP server. Captures every
/// request (head plus body) and serves the queued responses in order,
/// repeating the last one when the queue runs dry.
struct FakeServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeServer {
    async fn spawn(responses: Vec<(u16, &str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let requests: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let queue: Arc<Mutex<VecDeque<(u16, String)>>> = Arc::new(Mutex::new(
            responses
                .into_iter()
                .map(|(status, body)| (status, body.to_string()))
                .collect(),
        ));

        let captured = Arc::clone(&requests);
        tokio::spawn(async move {
            let mut last = (200u16, String::from("{}"));
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };

                let request = match read_request(&mut stream).await {
                    Some(r) => r,
                    None => continue,
                };
                captured.lock().unwrap().push(request);

                let (status, body) = {
                    let mut queue = queue.lock().unwrap();
                    match queue.pop_front() {
                        Some(next) => {
                            last = next.clone();
                            next
                        }
                        None => last.clone(),
                    }
                };

                let reason = if status < 400 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self { addr, requests }
    }

    fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Read one HTTP/1.1 request: head, then exactly Content-Length body
/// bytes if present.
async fn read_request(stream: &mut tokio::net::TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let head_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(String::from_utf8_lossy(&buf).to_string())
}

fn api_for(server: &FakeServer) -> Arc<ApiClient> {
    let config = ApiConfig {
        base_url: server.base_url(),
        ..Default::default()
    };
    let api = Arc::new(ApiClient::new(&config).expect("api client"));
    api.set_credentials(Some(Credentials {
        token: "tok-1".to_string(),
        user_type: UserType::Manager,
        user_id: "u-1".to_string(),
    }));
    api
}

fn hub_for(api: &Arc<ApiClient>) -> Arc<NotificationHub> {
    let api_config = ApiConfig::default();
    let probe = Arc::new(CapabilityProbe::new(
        Arc::new(HeadlessPlatform),
        &NotificationsConfig::default(),
        &api_config,
    ));
    let push = Arc::new(BackgroundDelivery::new(probe, Arc::clone(api), None));
    Arc::new(NotificationHub::new(Arc::clone(api), push))
}

fn stored_order(id: &str) -> serde_json::Value {
    json!({
        "_id": id,
        "type": "new_order",
        "title": "",
        "message": "",
        "createdAt": "2024-01-01T00:00:00Z",
        "read_by": []
    })
}

#[tokio::test]
async fn failed_tick_does_not_stop_polling() {
    let body = json!([stored_order("n-1")]).to_string();
    let server = FakeServer::spawn(vec![(500, "{}"), (200, body.as_str()), (200, body.as_str())]).await;
    let api = api_for(&server);
    let hub = hub_for(&api);

    let received: Arc<Mutex<Vec<NotificationRecord>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let _guard = hub.subscribe(move |record| sink.lock().unwrap().push(record.clone()));

    let poller = PollingFallback::new(Arc::clone(&api), hub, &NotificationsConfig::default());

    // Server error on the first tick: logged, nothing delivered.
    poller.tick().await;
    assert!(received.lock().unwrap().is_empty());

    // Next tick recovers and delivers.
    poller.tick().await;
    {
        let records = received.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "n-1");
        assert_eq!(records[0].title, "New Order Received");
    }

    // Re-served rows are not re-published.
    poller.tick().await;
    assert_eq!(received.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn tick_without_credential_makes_no_request() {
    let server = FakeServer::spawn(vec![(200, "[]")]).await;
    let api = api_for(&server);
    api.set_credentials(None);
    let hub = hub_for(&api);

    let poller = PollingFallback::new(Arc::clone(&api), hub, &NotificationsConfig::default());
    poller.tick().await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn first_tick_waits_one_full_interval() {
    let server = FakeServer::spawn(vec![(200, "[]")]).await;
    let api = api_for(&server);
    let hub = hub_for(&api);

    let config = NotificationsConfig {
        poll_interval_seconds: 1,
        ..Default::default()
    };
    let poller = Arc::new(PollingFallback::new(Arc::clone(&api), hub, &config));
    poller.start();

    // Well inside the first interval: no fetch yet.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(server.requests().is_empty());

    // Past the first interval boundary: the tick has fired.
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert!(!server.requests().is_empty());
    poller.disconnect();
}

#[tokio::test]
async fn disconnect_clears_listeners() {
    let server = FakeServer::spawn(vec![(200, "[]")]).await;
    let api = api_for(&server);
    let hub = hub_for(&api);
    let _guard = hub.subscribe(|_| {});
    assert_eq!(hub.listener_count(), 1);

    let poller = Arc::new(PollingFallback::new(
        Arc::clone(&api),
        Arc::clone(&hub),
        &NotificationsConfig::default(),
    ));
    poller.start();
    poller.disconnect();
    assert_eq!(hub.listener_count(), 0);
}

#[tokio::test]
async fn recent_request_shape() {
    let server = FakeServer::spawn(vec![(200, "[]")]).await;
    let api = api_for(&server);

    let items = api.recent(50).await.expect("recent");
    assert!(items.is_empty());

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = requests[0].to_lowercase();
    assert!(request.starts_with("get /api/notifications/recent?limit=50 http/1.1"));
    assert!(request.contains("authorization: bearer tok-1"));
}

#[tokio::test]
async fn mark_read_request_shape() {
    let server = FakeServer::spawn(vec![(200, "{}")]).await;
    let api = api_for(&server);

    api.mark_read("n-1").await.expect("mark read");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0]
        .to_lowercase()
        .starts_with("post /api/notifications/n-1/read http/1.1"));
}

#[tokio::test]
async fn push_subscribe_request_carries_key_material() {
    let server = FakeServer::spawn(vec![(200, "{}")]).await;
    let api = api_for(&server);

    let subscription = PushSubscription::generate("server-key");
    api.subscribe_push(&subscription).await.expect("subscribe");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert!(request
        .to_lowercase()
        .starts_with("post /api/notifications/subscribe http/1.1"));
    assert!(request.contains(&subscription.endpoint));
    assert!(request.contains(&subscription.keys.p256dh));
    assert!(request.contains(&subscription.keys.auth));
}
