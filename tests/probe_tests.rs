use javactl::config::Config;
use javactl::server::{Prober, TcpProber, is_running};
use std::net::TcpListener;

/// Binds a listener on an ephemeral port and returns it with its port.
fn bind_ephemeral() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// Returns a port with (very probably) nothing listening on it.
fn free_port() -> u16 {
    let (listener, port) = bind_ephemeral();
    drop(listener);
    port
}

#[tokio::test]
async fn test_probe_unbound_port_is_false() {
    let prober = TcpProber;
    assert!(!prober.probe(free_port()).await);
}

#[tokio::test]
async fn test_probe_bound_port_is_true() {
    let (_listener, port) = bind_ephemeral();
    let prober = TcpProber;
    assert!(prober.probe(port).await);
}

#[tokio::test]
async fn test_is_running_false_when_nothing_listens() {
    let mut config = Config::new("/tmp");
    config.http_port = free_port();

    assert!(!is_running(&TcpProber, &config).await);
}

#[tokio::test]
async fn test_is_running_true_on_primary_port() {
    let (_listener, port) = bind_ephemeral();
    let mut config = Config::new("/tmp");
    config.http_port = port;

    assert!(is_running(&TcpProber, &config).await);
}

#[tokio::test]
async fn test_is_running_true_on_debug_port_only() {
    // Occupy only the secondary listener at httpPort + 1000
    let (_listener, port) = bind_ephemeral();
    if port <= 1000 {
        // Ephemeral range starts well above 1000 everywhere we run, but
        // don't let an exotic allocation invalidate the test.
        return;
    }

    let mut config = Config::new("/tmp");
    config.http_port = port - 1000;
    assert_eq!(config.debug_port(), Some(port));

    assert!(is_running(&TcpProber, &config).await);
}

#[tokio::test]
async fn test_is_running_handles_debug_port_overflow() {
    let mut config = Config::new("/tmp");
    // No u16 room for +1000; only the primary port can count
    config.http_port = 65000;
    assert_eq!(config.debug_port(), None);

    assert!(!is_running(&TcpProber, &config).await);
}
