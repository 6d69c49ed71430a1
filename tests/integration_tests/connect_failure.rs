use bytes::Bytes;
use corpc_client_rs::{client::client::Client, method::MethodDescriptor};
use tokio::net::TcpListener;

use crate::integration_tests::common::test_config;

/// Scenario B (§8): the connect attempt itself fails — nothing is listening
/// on the target port — and every call queued against it must resolve to
/// `Err` with the engine's own "Connect fail" text, not hang or panic.
#[tokio::test]
async fn call_against_a_refused_port_fails_with_connect_fail() {
    // Bind, grab the ephemeral port, then drop the listener so the port is
    // refused rather than merely unassigned — this is what "connect fails"
    // looks like on a loopback address.
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    drop(listener);

    let client = Client::new(test_config(addr.port(), 1));
    let channel = client.register_channel("127.0.0.1", addr.port(), 1);
    let method = MethodDescriptor::new(1, 1);

    let result = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        client.call(&channel, method, Bytes::from_static(b"hello")),
    )
    .await
    .expect("call should not hang");

    let err = result.expect_err("connect to a refused port must fail the call");
    assert_eq!(err.to_string(), "Connect fail");
}

/// A second call submitted while the first connect attempt is still being
/// retried (reconnect_delay applies after the first failure) must also fail,
/// rather than being silently dropped or left pending forever.
#[tokio::test]
async fn repeated_calls_against_a_refused_port_each_fail_independently() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    drop(listener);

    let client = Client::new(test_config(addr.port(), 1));
    let channel = client.register_channel("127.0.0.1", addr.port(), 1);
    let method = MethodDescriptor::new(1, 1);

    for _ in 0..2 {
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            client.call(&channel, method, Bytes::from_static(b"hello")),
        )
        .await
        .expect("call should not hang");

        let err = result.expect_err("connect to a refused port must fail the call");
        assert_eq!(err.to_string(), "Connect fail");
    }
}
