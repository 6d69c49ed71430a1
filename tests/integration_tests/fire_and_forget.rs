use bytes::Bytes;
use corpc_client_rs::{call::CallOutcome, client::client::Client, method::MethodDescriptor};
use tokio::time::{Duration, timeout};

use crate::integration_tests::common::{bind_ephemeral, read_request, test_config};

#[tokio::test]
async fn fire_and_forget_resolves_once_the_request_is_on_the_wire() {
    let (listener, addr) = bind_ephemeral().await;
    let (notify_tx, notify_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let req = read_request(&mut stream).await.expect("read request");
        assert_eq!(req.body, b"notify");
        let _ = notify_tx.send(());
        // Deliberately never reply: the server just keeps the socket open.
        std::future::pending::<()>().await;
    });

    let client = Client::new(test_config(addr.port(), 1));
    let channel = client.register_channel("127.0.0.1", addr.port(), 1);

    let method = MethodDescriptor::fire_and_forget(1, 2);
    let outcome = timeout(Duration::from_secs(2), client.call(&channel, method, Bytes::from_static(b"notify")))
        .await
        .expect("call should not hang")
        .expect("call should succeed");

    assert!(matches!(outcome, CallOutcome::NoResponse));
    notify_rx.await.expect("server should have observed the request");
}
