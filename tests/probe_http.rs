//! HttpProbe against a local stub server

use std::sync::Arc;
use std::time::{Duration, Instant};

use nick_forge::{Candidate, HttpProbe, NickProbe, ProbeConfig, ProbeVerdict};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve `(status, delay)` answers chosen by request path. Returns the base URL.
async fn spawn_stub<F>(handler: F) -> String
where
    F: Fn(&str) -> (u16, Duration) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                while read < buf.len() {
                    let n = socket.read(&mut buf[read..]).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    read += n;
                    if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }

                let request = String::from_utf8_lossy(&buf[..read]).to_string();
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, delay) = handler(&path);
                tokio::time::sleep(delay).await;

                let response = format!(
                    "HTTP/1.1 {} Stub\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                    status
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}

/// Avatar: `taken*` exists, `slow*` hangs, everything else 404.
/// Profile: `throttled*` 429, `ghost*` 200, everything else 404.
fn route(path: &str) -> (u16, Duration) {
    let name = path.rsplit('/').next().unwrap_or("");
    if path.starts_with("/avatar/") {
        if name.starts_with("taken") {
            (200, Duration::ZERO)
        } else if name.starts_with("slow") {
            (404, Duration::from_secs(5))
        } else {
            (404, Duration::ZERO)
        }
    } else if name.starts_with("throttled") {
        (429, Duration::ZERO)
    } else if name.starts_with("ghost") {
        (200, Duration::ZERO)
    } else {
        (404, Duration::ZERO)
    }
}

fn probe_config(base: &str, confirm: bool) -> ProbeConfig {
    ProbeConfig {
        avatar_url: format!("{}/avatar/{{name}}", base),
        profile_url: confirm.then(|| format!("{}/profile/{{name}}", base)),
        avatar_timeout: Duration::from_millis(300),
        profile_timeout: Duration::from_millis(300),
        ..ProbeConfig::default()
    }
}

#[tokio::test]
async fn test_free_name_is_available() {
    let base = spawn_stub(route).await;
    let probe = HttpProbe::with_config(probe_config(&base, true));
    assert_eq!(probe.probe(&Candidate::new("freebie")).await, ProbeVerdict::Available);
}

#[tokio::test]
async fn test_existing_avatar_is_taken() {
    let base = spawn_stub(route).await;
    let probe = HttpProbe::with_config(probe_config(&base, true));
    assert_eq!(probe.probe(&Candidate::new("takenx")).await, ProbeVerdict::Taken);
}

#[tokio::test]
async fn test_profile_overrules_avatar() {
    let base = spawn_stub(route).await;
    let probe = HttpProbe::with_config(probe_config(&base, true));
    assert_eq!(probe.probe(&Candidate::new("ghost1")).await, ProbeVerdict::Taken);

    // Without confirmation the avatar check decides alone
    let probe = HttpProbe::with_config(probe_config(&base, false));
    assert_eq!(probe.probe(&Candidate::new("ghost1")).await, ProbeVerdict::Available);
}

#[tokio::test]
async fn test_profile_rate_limit_is_reported() {
    let base = spawn_stub(route).await;
    let probe = HttpProbe::with_config(probe_config(&base, true));
    assert_eq!(
        probe.probe(&Candidate::new("throttled")).await,
        ProbeVerdict::RateLimited
    );
}

#[tokio::test]
async fn test_slow_avatar_times_out_as_taken() {
    let base = spawn_stub(route).await;
    let probe = HttpProbe::with_config(probe_config(&base, true));

    let start = Instant::now();
    assert_eq!(probe.probe(&Candidate::new("slowpoke")).await, ProbeVerdict::Taken);
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_unreachable_service_is_taken() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let probe = HttpProbe::with_config(probe_config(&format!("http://{}", addr), true));
    assert_eq!(probe.probe(&Candidate::new("nobody")).await, ProbeVerdict::Taken);
}
