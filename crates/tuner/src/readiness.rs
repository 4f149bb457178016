//! Mount readiness polling.
//!
//! A probe is one ranged GET against the mount; any outcome other than a
//! 200/206 response within the attempt timeout counts as "not ready".

use std::sync::Arc;
use std::time::{Duration, Instant};

/// Single-shot mount check.
pub trait MountProbe: Send + Sync {
    /// `true` iff the mount answered 200 or 206 within `timeout`.
    fn probe_once(&self, timeout: Duration) -> bool;
}

/// Probes the mount over HTTP, asking for the first byte only.
#[derive(Clone, Debug)]
pub struct HttpMountProbe {
    url: String,
}

impl HttpMountProbe {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl MountProbe for HttpMountProbe {
    fn probe_once(&self, timeout: Duration) -> bool {
        let result = ureq::get(&self.url)
            .header("Range", "bytes=0-0")
            .config()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .call();
        // The body is an endless stream; the response is dropped unread.
        match result {
            Ok(resp) => {
                let status = resp.status().as_u16();
                tracing::trace!(url = %self.url, status, "mount probe");
                matches!(status, 200 | 206)
            }
            Err(e) => {
                tracing::trace!(url = %self.url, error = %e, "mount probe failed");
                false
            }
        }
    }
}

/// Repeats a probe until it succeeds or a deadline passes.
#[derive(Clone)]
pub struct ReadinessPoller {
    probe: Arc<dyn MountProbe>,
    attempt_timeout: Duration,
}

impl ReadinessPoller {
    pub fn new(probe: Arc<dyn MountProbe>, attempt_timeout: Duration) -> Self {
        Self {
            probe,
            attempt_timeout,
        }
    }

    /// One probe with an explicit timeout.
    pub fn probe_once(&self, timeout: Duration) -> bool {
        self.probe.probe_once(timeout)
    }

    /// One probe with the configured per-attempt timeout.
    pub fn probe(&self) -> bool {
        self.probe.probe_once(self.attempt_timeout)
    }

    /// Poll every `poll_interval` until the mount is up or `total_timeout` elapses.
    ///
    /// Attempt timeouts and sleeps are clamped to the remaining time, so a
    /// failed wait returns within one interval of the deadline.
    pub fn wait_until_ready(&self, total_timeout: Duration, poll_interval: Duration) -> bool {
        let start = Instant::now();
        let deadline = start + total_timeout;
        let mut attempts: u32 = 0;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            attempts += 1;
            let budget = self.attempt_timeout.min(deadline - now);
            if self.probe.probe_once(budget) {
                tracing::debug!(
                    attempts,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "mount ready"
                );
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            std::thread::sleep(poll_interval.min(remaining));
        }
        tracing::debug!(
            attempts,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "mount not ready before deadline"
        );
        false
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicU32, Ordering};

    use actix_web::{App, HttpResponse, HttpServer, web};

    /// Probe that starts succeeding at a fixed instant.
    pub(crate) struct ReadyAt {
        pub(crate) at: Option<Instant>,
        pub(crate) calls: AtomicU32,
    }

    impl ReadyAt {
        pub(crate) fn after(delay: Duration) -> Self {
            Self {
                at: Some(Instant::now() + delay),
                calls: AtomicU32::new(0),
            }
        }

        pub(crate) fn never() -> Self {
            Self {
                at: None,
                calls: AtomicU32::new(0),
            }
        }
    }

    impl MountProbe for ReadyAt {
        fn probe_once(&self, _timeout: Duration) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.at.is_some_and(|at| Instant::now() >= at)
        }
    }

    /// Serve `status` (after `delay`) at `/mount` on an ephemeral port.
    /// A 206 mount answers 400 unless the request asked for `bytes=0-0`.
    fn spawn_mount(status: u16, delay: Duration) -> SocketAddr {
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let _ = actix_web::rt::System::new().block_on(async move {
                let server = HttpServer::new(move || {
                    App::new().route(
                        "/mount",
                        web::get().to(move |req: actix_web::HttpRequest| async move {
                            actix_web::rt::time::sleep(delay).await;
                            let range = req.headers().get("Range").and_then(|v| v.to_str().ok());
                            // partial content only for the single-byte range
                            let status = if status == 206 && range != Some("bytes=0-0") {
                                400
                            } else {
                                status
                            };
                            let code = actix_web::http::StatusCode::from_u16(status).unwrap();
                            HttpResponse::build(code).body("x")
                        }),
                    )
                })
                .workers(1)
                .bind(("127.0.0.1", 0))
                .unwrap();
                tx.send(server.addrs()[0]).unwrap();
                server.run().await
            });
        });
        rx.recv().unwrap()
    }

    fn closed_port() -> SocketAddr {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr
    }

    fn probe_for(addr: SocketAddr) -> HttpMountProbe {
        HttpMountProbe::new(format!("http://{addr}/mount"))
    }

    #[test]
    fn partial_and_full_content_are_ready() {
        let partial = spawn_mount(206, Duration::ZERO);
        let full = spawn_mount(200, Duration::ZERO);
        assert!(probe_for(partial).probe_once(Duration::from_secs(2)));
        assert!(probe_for(full).probe_once(Duration::from_secs(2)));
    }

    #[test]
    fn error_statuses_are_not_ready() {
        for status in [404, 500, 503] {
            let addr = spawn_mount(status, Duration::ZERO);
            assert!(!probe_for(addr).probe_once(Duration::from_secs(2)), "status {status}");
        }
    }

    #[test]
    fn refused_connection_is_not_ready() {
        assert!(!probe_for(closed_port()).probe_once(Duration::from_millis(500)));
    }

    #[test]
    fn slow_mount_times_out_as_not_ready() {
        let addr = spawn_mount(206, Duration::from_secs(3));
        let start = Instant::now();
        assert!(!probe_for(addr).probe_once(Duration::from_millis(200)));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn wait_returns_true_within_one_interval_of_availability() {
        let t = Duration::from_millis(300);
        let interval = Duration::from_millis(50);
        let start = Instant::now();
        let poller = ReadinessPoller::new(Arc::new(ReadyAt::after(t)), Duration::from_millis(100));
        assert!(poller.wait_until_ready(Duration::from_secs(5), interval));
        let elapsed = start.elapsed();
        assert!(elapsed >= t, "elapsed {elapsed:?}");
        // one interval plus scheduling slack
        assert!(elapsed <= t + interval + Duration::from_millis(250), "elapsed {elapsed:?}");
    }

    #[test]
    fn wait_gives_up_within_one_interval_of_deadline() {
        let total = Duration::from_millis(400);
        let interval = Duration::from_millis(100);
        let probe = Arc::new(ReadyAt::never());
        let poller = ReadinessPoller::new(probe.clone(), Duration::from_millis(100));

        let start = Instant::now();
        assert!(!poller.wait_until_ready(total, interval));
        let elapsed = start.elapsed();
        assert!(elapsed >= total, "elapsed {elapsed:?}");
        assert!(elapsed <= total + interval + Duration::from_millis(250), "elapsed {elapsed:?}");
        assert!(probe.calls.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn zero_deadline_never_probes() {
        let probe = Arc::new(ReadyAt::after(Duration::ZERO));
        let poller = ReadinessPoller::new(probe.clone(), Duration::from_millis(100));
        assert!(!poller.wait_until_ready(Duration::ZERO, Duration::from_millis(10)));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn wait_against_http_mount() {
        let addr = spawn_mount(206, Duration::ZERO);
        let poller = ReadinessPoller::new(Arc::new(probe_for(addr)), Duration::from_secs(1));
        assert!(poller.wait_until_ready(Duration::from_secs(3), Duration::from_millis(50)));
    }
}
