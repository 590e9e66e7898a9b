//! Test helpers for integration tests
//!
//! In-process mock tracker and storage servers speaking the binary frame
//! protocol, bound on `127.0.0.1:0`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fdfs_client::config::Config;
use fdfs_client::protocol::{
    FrameHeader, GROUP_NAME_MAX_LEN, HEADER_LEN, IP_ADDRESS_LEN, codes, encode_header,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const GROUP: &str = "group1";

/// Read one request: header plus its whole body
pub async fn read_request(stream: &mut TcpStream) -> std::io::Result<(FrameHeader, Vec<u8>)> {
    let mut buf = [0u8; HEADER_LEN];
    stream.read_exact(&mut buf).await?;
    let header = FrameHeader::decode(&buf);
    let mut body = vec![0u8; header.body_len as usize];
    stream.read_exact(&mut body).await?;
    Ok((header, body))
}

/// Write one response frame
pub async fn write_response(stream: &mut TcpStream, status: u8, body: &[u8]) -> std::io::Result<()> {
    stream
        .write_all(&encode_header(codes::RESP, status, body.len() as u64))
        .await?;
    stream.write_all(body).await
}

fn put_fixed(buf: &mut Vec<u8>, value: &str, width: usize) {
    buf.extend_from_slice(value.as_bytes());
    buf.resize(buf.len() + width - value.len(), 0);
}

/// Tracker reply body: group, ip, port and, for store queries, path index
pub fn encode_target(ip: &str, port: u16, group: &str, store_path_index: Option<u8>) -> Vec<u8> {
    let mut body = Vec::new();
    put_fixed(&mut body, group, GROUP_NAME_MAX_LEN);
    put_fixed(&mut body, ip, IP_ADDRESS_LEN);
    body.extend_from_slice(&u64::from(port).to_be_bytes());
    if let Some(index) = store_path_index {
        body.push(index);
    }
    body
}

fn fixed_str(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

fn be_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_be_bytes(buf)
}

/// Counters and knobs shared by both mock server kinds
#[derive(Debug, Default)]
pub struct MockState {
    /// Connections accepted so far
    pub accepted: AtomicUsize,
    /// Requests other than active tests served so far
    pub requests: AtomicUsize,
    /// Status returned to every request other than active tests (0 = normal)
    pub fail_status: AtomicU8,
    /// Status returned to active tests (0 = healthy)
    pub active_test_status: AtomicU8,
    /// Drop the last byte of every successful reply body
    pub short_reply: AtomicBool,
}

impl MockState {
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn set_fail_status(&self, status: u8) {
        self.fail_status.store(status, Ordering::SeqCst);
    }

    pub fn set_active_test_status(&self, status: u8) {
        self.active_test_status.store(status, Ordering::SeqCst);
    }

    pub fn set_short_reply(&self, short: bool) {
        self.short_reply.store(short, Ordering::SeqCst);
    }
}

fn spawn_server<F, Fut>(listener: TcpListener, state: Arc<MockState>, handler: F) -> JoinHandle<()>
where
    F: Fn(FrameHeader, Vec<u8>) -> Fut + Clone + Send + Sync + 'static,
    Fut: std::future::Future<Output = (u8, Vec<u8>)> + Send,
{
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            state.accepted.fetch_add(1, Ordering::SeqCst);
            let state = state.clone();
            let handler = handler.clone();
            tokio::spawn(async move {
                while let Ok((header, body)) = read_request(&mut stream).await {
                    let (status, mut reply) = if header.command == codes::ACTIVE_TEST {
                        (state.active_test_status.load(Ordering::SeqCst), Vec::new())
                    } else {
                        state.requests.fetch_add(1, Ordering::SeqCst);
                        match state.fail_status.load(Ordering::SeqCst) {
                            0 => handler(header, body).await,
                            status => (status, Vec::new()),
                        }
                    };
                    if status == 0 && state.short_reply.load(Ordering::SeqCst) {
                        reply.pop();
                    }
                    if write_response(&mut stream, status, &reply).await.is_err() {
                        break;
                    }
                }
            });
        }
    })
}

/// Mock storage node keeping uploaded files in memory
pub struct MockStorage {
    pub addr: String,
    pub state: Arc<MockState>,
    pub files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    /// Store path index of the most recent upload
    pub last_path_index: Arc<AtomicU8>,
    handle: JoinHandle<()>,
}

impl MockStorage {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let state = Arc::new(MockState::default());
        let files: Arc<Mutex<HashMap<String, Vec<u8>>>> = Arc::default();
        let last_path_index = Arc::new(AtomicU8::new(0));
        let next_id = Arc::new(AtomicUsize::new(0));

        let handler = {
            let files = files.clone();
            let last_path_index = last_path_index.clone();
            move |header: FrameHeader, body: Vec<u8>| {
                let files = files.clone();
                let last_path_index = last_path_index.clone();
                let next_id = next_id.clone();
                async move {
                    match header.command {
                        codes::UPLOAD_FILE => {
                            let path_index = body[0];
                            let size = be_u64(&body[1..9]) as usize;
                            let ext = fixed_str(&body[9..15]);
                            let content = body[15..].to_vec();
                            assert_eq!(size, content.len(), "declared size mismatch");

                            last_path_index.store(path_index, Ordering::SeqCst);
                            let n = next_id.fetch_add(1, Ordering::SeqCst);
                            let remote = if ext.is_empty() {
                                format!("M{path_index:02}/00/00/file{n}")
                            } else {
                                format!("M{path_index:02}/00/00/file{n}.{ext}")
                            };
                            files
                                .lock()
                                .unwrap()
                                .insert(format!("{GROUP}/{remote}"), content);

                            let mut reply = vec![0u8; GROUP_NAME_MAX_LEN];
                            reply[..GROUP.len()].copy_from_slice(GROUP.as_bytes());
                            reply.extend_from_slice(remote.as_bytes());
                            (0, reply)
                        }
                        codes::DOWNLOAD_FILE => {
                            let offset = be_u64(&body[0..8]) as usize;
                            let count = be_u64(&body[8..16]) as usize;
                            let group = fixed_str(&body[16..32]);
                            let remote = String::from_utf8_lossy(&body[32..]).into_owned();
                            let files = files.lock().unwrap();
                            match files.get(&format!("{group}/{remote}")) {
                                Some(content) if offset <= content.len() => {
                                    let end = if count == 0 {
                                        content.len()
                                    } else {
                                        (offset + count).min(content.len())
                                    };
                                    (0, content[offset..end].to_vec())
                                }
                                Some(_) => (22, Vec::new()),
                                None => (2, Vec::new()),
                            }
                        }
                        codes::DELETE_FILE => {
                            let group = fixed_str(&body[..16]);
                            let remote = String::from_utf8_lossy(&body[16..]).into_owned();
                            match files.lock().unwrap().remove(&format!("{group}/{remote}")) {
                                Some(_) => (0, Vec::new()),
                                None => (2, Vec::new()),
                            }
                        }
                        _ => (22, Vec::new()),
                    }
                }
            }
        };

        let handle = spawn_server(listener, state.clone(), handler);
        Self {
            addr,
            state,
            files,
            last_path_index,
            handle,
        }
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    /// Stop accepting; established connections keep being served
    pub async fn stop_accepting(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}

/// Mock tracker pointing every query at one storage address
pub struct MockTracker {
    pub addr: String,
    pub state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockTracker {
    pub async fn spawn(storage_addr: &str, store_path_index: u8) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let state = Arc::new(MockState::default());

        let (ip, port) = storage_addr.rsplit_once(':').unwrap();
        let ip = ip.to_string();
        let port: u16 = port.parse().unwrap();

        let handler = move |header: FrameHeader, _body: Vec<u8>| {
            let reply = match header.command {
                codes::QUERY_STORE_WITHOUT_GROUP_ONE => {
                    Some((0, encode_target(&ip, port, GROUP, Some(store_path_index))))
                }
                codes::QUERY_FETCH_ONE => Some((0, encode_target(&ip, port, GROUP, None))),
                _ => None,
            };
            async move { reply.unwrap_or((22, Vec::new())) }
        };

        let handle = spawn_server(listener, state.clone(), handler);
        Self {
            addr,
            state,
            handle,
        }
    }
}

impl Drop for MockTracker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Tracker and storage wired together
pub struct MockCluster {
    pub tracker: MockTracker,
    pub storage: MockStorage,
}

impl MockCluster {
    pub async fn spawn() -> Self {
        Self::spawn_with_path_index(0).await
    }

    pub async fn spawn_with_path_index(store_path_index: u8) -> Self {
        let storage = MockStorage::spawn().await;
        let tracker = MockTracker::spawn(&storage.addr, store_path_index).await;
        Self { tracker, storage }
    }

    pub fn config(&self) -> Config {
        test_config(vec![self.tracker.addr.clone()])
    }
}

/// Config with the smallest allowed pools and short timeouts
pub fn test_config(tracker_addrs: Vec<String>) -> Config {
    let mut config = Config::new(tracker_addrs);
    config.max_connections = 5;
    config.dial_timeout = Duration::from_secs(2);
    config.network_timeout = Duration::from_secs(2);
    // Sweeps stay out of the way unless a test asks for them
    config.health_check_interval = Duration::from_secs(3600);
    config
}

/// An address nothing listens on
pub async fn unused_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);
    addr
}
