//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it
//! with a tokio-tungstenite client.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use paddock_transport::{
        CloseReason, Connection, Transport, TransportError, UpgradePolicy,
        WebSocketTransport,
    };
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;
    use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Helper: binds a transport on a random port and returns it with its
    /// address.
    async fn bind(policy: UpgradePolicy) -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0", policy)
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have addr").to_string();
        (transport, addr)
    }

    async fn connect_client(url: &str) -> ClientWs {
        let (ws, _) = tokio_tungstenite::connect_async(url)
            .await
            .expect("client should connect");
        ws
    }

    // =========================================================================
    // Frame exchange
    // =========================================================================

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (mut transport, addr) = bind(UpgradePolicy::default()).await;

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let mut client_ws = connect_client(&format!("ws://{addr}/ws")).await;
        let server_conn = server_handle.await.expect("task should complete");
        assert!(server_conn.id().into_inner() > 0);

        server_conn
            .send(br#"{"protocol":"CONNECT"}"#)
            .await
            .expect("send should succeed");

        // UTF-8 payloads go out as text frames.
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_text().unwrap().as_str(), r#"{"protocol":"CONNECT"}"#);

        client_ws
            .send(Message::text(r#"{"protocol":"GET_LOBBY_LIST"}"#))
            .await
            .unwrap();

        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"protocol":"GET_LOBBY_LIST"}"#);
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_pending_does_not_block() {
        let (mut transport, addr) = bind(UpgradePolicy::default()).await;
        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });
        let mut client_ws = connect_client(&format!("ws://{addr}/ws")).await;
        let server_conn =
            std::sync::Arc::new(server_handle.await.expect("task should complete"));

        let reader = {
            let conn = server_conn.clone();
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::task::yield_now().await;

        tokio::time::timeout(
            std::time::Duration::from_secs(2),
            server_conn.send(b"ping"),
        )
        .await
        .expect("send must not wait for recv")
        .expect("send should succeed");

        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"ping");

        client_ws.send(Message::Close(None)).await.unwrap();
        let result = reader.await.unwrap().expect("recv should not error");
        assert!(result.is_none());
    }

    // =========================================================================
    // Close handling
    // =========================================================================

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (mut transport, addr) = bind(UpgradePolicy::default()).await;
        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let mut client_ws = connect_client(&format!("ws://{addr}/ws")).await;
        let server_conn = server_handle.await.unwrap();

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_close_sends_code_and_reason() {
        let (mut transport, addr) = bind(UpgradePolicy::default()).await;
        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let mut client_ws = connect_client(&format!("ws://{addr}/ws")).await;
        let server_conn = server_handle.await.unwrap();

        server_conn
            .close(Some(CloseReason::new(1008, "Reconnect failed")))
            .await
            .expect("close should succeed");

        let msg = client_ws.next().await.unwrap().unwrap();
        match msg {
            Message::Close(Some(frame)) => {
                assert_eq!(u16::from(frame.code), 1008);
                assert_eq!(frame.reason.as_str(), "Reconnect failed");
            }
            other => panic!("expected close frame, got {other:?}"),
        }
    }

    // =========================================================================
    // Upgrade policy
    // =========================================================================

    #[tokio::test]
    async fn test_websocket_wrong_path_is_refused_with_404() {
        let (mut transport, addr) = bind(UpgradePolicy::default()).await;
        let server_handle = tokio::spawn(async move { transport.accept().await });

        let result =
            tokio_tungstenite::connect_async(format!("ws://{addr}/nope")).await;
        match result {
            Err(tokio_tungstenite::tungstenite::Error::Http(resp)) => {
                assert_eq!(resp.status(), StatusCode::NOT_FOUND);
            }
            Err(e) => panic!("expected HTTP refusal, got {e}"),
            Ok(_) => panic!("upgrade should have been refused"),
        }

        let accepted = server_handle.await.unwrap();
        assert!(matches!(accepted, Err(TransportError::UpgradeRejected(_))));
    }

    #[tokio::test]
    async fn test_websocket_disallowed_origin_is_refused_with_403() {
        let policy = UpgradePolicy {
            allowed_origins: vec!["https://game.example".to_string()],
            ..UpgradePolicy::default()
        };
        let (mut transport, addr) = bind(policy).await;
        let server_handle = tokio::spawn(async move { transport.accept().await });

        let mut request = format!("ws://{addr}/ws").into_client_request().unwrap();
        request
            .headers_mut()
            .insert("Origin", HeaderValue::from_static("https://evil.example"));

        let result = tokio_tungstenite::connect_async(request).await;
        match result {
            Err(tokio_tungstenite::tungstenite::Error::Http(resp)) => {
                assert_eq!(resp.status(), StatusCode::FORBIDDEN);
            }
            Err(e) => panic!("expected HTTP refusal, got {e}"),
            Ok(_) => panic!("upgrade should have been refused"),
        }

        let accepted = server_handle.await.unwrap();
        assert!(matches!(accepted, Err(TransportError::UpgradeRejected(_))));
    }

    #[tokio::test]
    async fn test_websocket_allowed_origin_is_accepted() {
        let policy = UpgradePolicy {
            allowed_origins: vec!["https://game.example".to_string()],
            ..UpgradePolicy::default()
        };
        let (mut transport, addr) = bind(policy).await;
        let server_handle = tokio::spawn(async move { transport.accept().await });

        let mut request = format!("ws://{addr}/ws").into_client_request().unwrap();
        request
            .headers_mut()
            .insert("Origin", HeaderValue::from_static("https://game.example"));

        let (_client_ws, _) = tokio_tungstenite::connect_async(request)
            .await
            .expect("allowed origin should connect");

        assert!(server_handle.await.unwrap().is_ok());
    }

    // =========================================================================
    // Deferred upgrade
    // =========================================================================

    #[tokio::test]
    async fn test_accept_pending_returns_before_upgrade_completes() {
        let (mut transport, addr) = bind(UpgradePolicy::default()).await;

        // A peer that opens TCP and never sends the HTTP request.
        let stalled = tokio::net::TcpStream::connect(&addr).await.unwrap();
        let stalled_pending = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            transport.accept_pending(),
        )
        .await
        .expect("TCP accept should not wait for the upgrade")
        .expect("should accept");
        assert_eq!(stalled_pending.peer_addr(), stalled.local_addr().unwrap());

        // A well-behaved peer behind it still gets through.
        let client = tokio::spawn({
            let url = format!("ws://{addr}/ws");
            async move { connect_client(&url).await }
        });
        let pending = transport.accept_pending().await.expect("should accept");
        let conn = tokio::time::timeout(std::time::Duration::from_secs(1), pending.upgrade())
            .await
            .expect("upgrade should not wait on the stalled peer")
            .expect("upgrade should succeed");
        let _client_ws = client.await.unwrap();
        assert_eq!(conn.peer_addr().ip().to_string(), "127.0.0.1");
    }
}
