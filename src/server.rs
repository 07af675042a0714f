use std::{future::Future, sync::Arc};

use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::{
    chat_log::ChatLog, client_listener::run_session, context::ServerContext,
    registry::NicknameRegistry, result::Result,
};

pub async fn bind(address: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(address).await?;
    info!("Chat server listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Accepts connections until `shutdown` resolves, one task per session.
pub async fn run_server<F>(
    listener: TcpListener,
    context: Arc<ServerContext>,
    registry: Arc<NicknameRegistry>,
    log: ChatLog,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let accepted = tokio::select! {
            accepted = listener.accept() => accepted,
            _ = &mut shutdown => {
                if registry.is_empty() {
                    info!("Shutting down");
                } else {
                    info!("Shutting down, {} sessions still connected", registry.len());
                }
                return Ok(());
            }
        };

        let (stream, addr) = match accepted {
            Ok(a) => a,
            Err(e) => {
                warn!("Error accepting connection {:?}", e);
                continue;
            }
        };

        debug!("Accepted connection from {}", addr);
        let registry = registry.clone();
        let log = log.clone();
        let context = context.clone();
        tokio::spawn(async move {
            let (read_half, write_half) = stream.into_split();
            let session = run_session(read_half, write_half, Some(addr), registry, log, context);
            if let Err(e) = session.await {
                warn!("Session from {} ended with error {}", addr, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Framing;
    use std::{net::SocketAddr, time::Duration};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpStream,
        sync::oneshot,
        time::timeout,
    };

    struct TestServer {
        addr: SocketAddr,
        registry: Arc<NicknameRegistry>,
        _shutdown: oneshot::Sender<()>,
    }

    async fn start_server(framing: Framing) -> TestServer {
        start_server_with_idle_timeout(framing, None).await
    }

    async fn start_server_with_idle_timeout(
        framing: Framing,
        idle_timeout: Option<Duration>,
    ) -> TestServer {
        let listener = bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let context = Arc::new(ServerContext {
            framing,
            read_buffer_size: 1024,
            idle_timeout,
        });
        let registry = Arc::new(NicknameRegistry::new());
        let (log_writer, _log_reader) = tokio::io::duplex(64 * 1024);
        let log = ChatLog::spawn(log_writer);
        let (shutdown_sender, shutdown_receiver) = oneshot::channel::<()>();

        let server_registry = registry.clone();
        tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_receiver.await;
            };
            // keep the log reader alive for as long as the server runs
            let _log_reader = _log_reader;
            run_server(listener, context, server_registry, log, shutdown)
                .await
                .unwrap();
        });

        TestServer {
            addr,
            registry,
            _shutdown: shutdown_sender,
        }
    }

    struct TestClient {
        stream: TcpStream,
        received: String,
    }

    impl TestClient {
        async fn connect(addr: SocketAddr, nick: &str) -> TestClient {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(nick.as_bytes()).await.unwrap();
            TestClient {
                stream,
                received: String::new(),
            }
        }

        async fn send(&mut self, line: &str) {
            self.stream.write_all(line.as_bytes()).await.unwrap();
        }

        /// Waits until `needle` has arrived and consumes everything up to it.
        async fn expect(&mut self, needle: &str) -> String {
            let mut buf = [0u8; 1024];
            loop {
                if let Some(i) = self.received.find(needle) {
                    let end = i + needle.len();
                    let consumed: String = self.received.drain(..end).collect();
                    return consumed;
                }

                let n = timeout(Duration::from_secs(5), self.stream.read(&mut buf))
                    .await
                    .unwrap_or_else(|_| {
                        panic!("timed out waiting for {:?}, got {:?}", needle, self.received)
                    })
                    .unwrap();
                assert!(n > 0, "connection closed waiting for {:?}", needle);
                self.received.push_str(&String::from_utf8_lossy(&buf[..n]));
            }
        }

        /// Asserts nothing else arrives within a short window.
        async fn expect_silence(&mut self) {
            let mut buf = [0u8; 1024];
            match timeout(Duration::from_millis(200), self.stream.read(&mut buf)).await {
                Err(_) => assert!(self.received.is_empty(), "unexpected {:?}", self.received),
                Ok(Ok(n)) => panic!(
                    "unexpected data {:?}",
                    String::from_utf8_lossy(&buf[..n])
                ),
                Ok(Err(e)) => panic!("read failed {:?}", e),
            }
        }

        async fn expect_closed(&mut self) {
            let mut buf = [0u8; 1024];
            loop {
                let n = timeout(Duration::from_secs(5), self.stream.read(&mut buf))
                    .await
                    .expect("timed out waiting for close")
                    .unwrap_or(0);
                if n == 0 {
                    return;
                }
            }
        }
    }

    async fn wait_for_sessions(registry: &NicknameRegistry, count: usize) {
        for _ in 0..100 {
            if registry.len() == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} sessions, found {}", count, registry.len());
    }

    #[tokio::test]
    async fn duplicate_nick_pm_and_exit_scenario() {
        let server = start_server(Framing::Lines).await;

        let mut a = TestClient::connect(server.addr, "alice\n").await;
        a.expect("*** alice joined the chat ***\n").await;

        let mut b = TestClient::connect(server.addr, "alice\n").await;
        b.expect("*** alice1 joined the chat ***\n").await;
        a.expect("*** alice1 joined the chat ***\n").await;

        a.send("/pm alice1 hi\n").await;
        let to_a = a.expect("(PM) alice → alice1: hi\n").await;
        let to_b = b.expect("(PM) alice → alice1: hi\n").await;
        assert_eq!(to_a, to_b);
        assert!(to_a.starts_with('['));

        b.send("exit\n").await;
        a.expect("*** alice1 left the chat ***\n").await;
        b.expect_closed().await;

        wait_for_sessions(&server.registry, 1).await;
        a.expect_silence().await;
    }

    #[tokio::test]
    async fn queued_replies_are_flushed_before_close() {
        let server = start_server(Framing::Lines).await;

        let mut a = TestClient::connect(server.addr, "alice\n").await;
        a.expect("*** alice joined the chat ***\n").await;

        // handshake, message and exit all arrive in one read
        let mut b = TestClient::connect(server.addr, "bob\n/pm alice hi\nexit\n").await;
        let mut to_b = String::new();
        timeout(Duration::from_secs(5), b.stream.read_to_string(&mut to_b))
            .await
            .expect("timed out waiting for close")
            .unwrap();

        assert!(to_b.starts_with("*** bob joined the chat ***\n["), "got {:?}", to_b);
        assert!(to_b.ends_with("] (PM) bob → alice: hi\n"), "got {:?}", to_b);
        assert_eq!(2, to_b.lines().count());

        a.expect("*** bob joined the chat ***\n").await;
        a.expect("] (PM) bob → alice: hi\n").await;
        a.expect("*** bob left the chat ***\n").await;
        wait_for_sessions(&server.registry, 1).await;
    }

    #[tokio::test]
    async fn idle_session_is_closed_and_unregistered() {
        let server =
            start_server_with_idle_timeout(Framing::Lines, Some(Duration::from_millis(300))).await;

        let mut a = TestClient::connect(server.addr, "alice\n").await;
        a.expect("*** alice joined the chat ***\n").await;
        a.expect_closed().await;

        wait_for_sessions(&server.registry, 0).await;
        assert!(server.registry.is_empty());
        assert!(server.registry.lookup("alice").is_none());
    }

    #[tokio::test]
    async fn broadcast_reaches_every_session_identically() {
        let server = start_server(Framing::Lines).await;

        let mut a = TestClient::connect(server.addr, "alice\n").await;
        a.expect("alice joined").await;
        let mut b = TestClient::connect(server.addr, "bob\n").await;
        b.expect("bob joined").await;
        a.expect("bob joined the chat ***\n").await;
        let mut c = TestClient::connect(server.addr, "carol\n").await;
        c.expect("carol joined the chat ***\n").await;
        a.expect("carol joined the chat ***\n").await;
        b.expect("carol joined the chat ***\n").await;

        b.send("hello room\n").await;

        let line_a = a.expect("bob: hello room\n").await;
        let line_b = b.expect("bob: hello room\n").await;
        let line_c = c.expect("bob: hello room\n").await;
        assert_eq!(line_a, line_b);
        assert_eq!(line_a, line_c);
    }

    #[tokio::test]
    async fn pm_to_offline_user_only_answers_sender() {
        let server = start_server(Framing::Lines).await;

        let mut a = TestClient::connect(server.addr, "alice\n").await;
        a.expect("alice joined the chat ***\n").await;
        let mut b = TestClient::connect(server.addr, "bob\n").await;
        b.expect("bob joined the chat ***\n").await;
        a.expect("bob joined the chat ***\n").await;

        a.send("@ghost: anyone?\n").await;
        a.expect("User 'ghost' is offline.\n").await;
        b.expect_silence().await;
    }

    #[tokio::test]
    async fn closed_socket_frees_nick_and_notifies_once() {
        let server = start_server(Framing::PerRead).await;

        let mut a = TestClient::connect(server.addr, "alice").await;
        a.expect("*** alice joined the chat ***").await;
        let mut b = TestClient::connect(server.addr, "bob").await;
        b.expect("*** bob joined the chat ***").await;
        a.expect("*** bob joined the chat ***").await;

        drop(b);
        a.expect("*** bob left the chat ***").await;
        wait_for_sessions(&server.registry, 1).await;

        let mut b = TestClient::connect(server.addr, "bob").await;
        b.expect("*** bob joined the chat ***").await;
        a.expect("*** bob joined the chat ***").await;
        a.expect_silence().await;
    }

    #[tokio::test]
    async fn empty_nick_is_dropped_without_notice() {
        let server = start_server(Framing::PerRead).await;

        let mut a = TestClient::connect(server.addr, "alice").await;
        a.expect("*** alice joined the chat ***").await;

        let mut anonymous = TestClient::connect(server.addr, "   ").await;
        anonymous.expect_closed().await;

        a.expect_silence().await;
        assert_eq!(1, server.registry.len());
    }

    #[tokio::test]
    async fn relay_marked_nick_is_registered_without_marker() {
        let server = start_server(Framing::PerRead).await;

        let mut a = TestClient::connect(server.addr, "*alice").await;
        a.expect("*** alice joined the chat ***").await;

        assert!(server.registry.lookup("alice").is_some());
    }
}
