//! Local WHOIS servers for unit tests

use crate::zone::{TldRegistry, Zone, ZoneDataset};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::time::sleep;

/// A listener on 127.0.0.1 answering each request line with `reply(request)`
pub struct LocalServer {
    pub port: u16,
    pub requests: Arc<Mutex<Vec<String>>>,
    pub accepted: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl LocalServer {
    pub async fn start<F>(reply: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self::holding(reply, Duration::ZERO).await
    }

    /// Like [`LocalServer::start`], keeping every connection open for
    /// `hold` before answering
    pub async fn holding<F>(reply: F, hold: Duration) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = Self {
            port,
            requests: Arc::new(Mutex::new(Vec::new())),
            accepted: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        };
        let reply = Arc::new(reply);

        let seen = Arc::clone(&server.requests);
        let count = Arc::clone(&server.accepted);
        let in_flight = Arc::clone(&server.in_flight);
        let peak = Arc::clone(&server.peak);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                count.fetch_add(1, Ordering::SeqCst);
                let open = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(open, Ordering::SeqCst);

                let seen = Arc::clone(&seen);
                let reply = Arc::clone(&reply);
                let in_flight = Arc::clone(&in_flight);
                tokio::spawn(async move {
                    let mut reader = BufReader::new(stream);
                    let mut line = String::new();
                    if reader.read_line(&mut line).await.is_err() {
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        return;
                    }
                    let request = line.trim_end().to_string();
                    seen.lock().push(request.clone());
                    if !hold.is_zero() {
                        sleep(hold).await;
                    }
                    let mut stream = reader.into_inner();
                    let _ = stream.write_all(reply(&request).as_bytes()).await;
                    // the client only sees EOF after the gauge drops
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    let _ = stream.shutdown().await;
                });
            }
        });

        server
    }

    /// A listener that accepts connections and never answers
    pub async fn hung() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accepted = Arc::new(AtomicUsize::new(0));

        let count = Arc::clone(&accepted);
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                count.fetch_add(1, Ordering::SeqCst);
                held.push(stream);
            }
        });

        Self {
            port,
            requests: Arc::new(Mutex::new(Vec::new())),
            accepted,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Most connections that were open at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

/// Registry whose zones all point at `server`
pub fn registry_for(server: &str, zones: &[&str]) -> Arc<TldRegistry> {
    let zones = zones
        .iter()
        .map(|domain| Zone {
            domain: domain.to_string(),
            whois_server: Some(server.to_string()),
            name_servers: vec![format!("a.nic.{}", domain)],
            ..Default::default()
        })
        .collect();
    Arc::new(TldRegistry::from_dataset(ZoneDataset::new("test", zones)))
}
