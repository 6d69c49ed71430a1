use bytes::Bytes;
use corpc_client_rs::{client::client::Client, method::MethodDescriptor};
use tokio::time::{Duration, timeout};

use crate::integration_tests::common::{bind_ephemeral, read_request, test_config};

#[tokio::test]
async fn peer_close_fails_the_in_flight_call() {
    let (listener, addr) = bind_ephemeral().await;

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let _req = read_request(&mut stream).await.expect("read request");
        // Drop the socket instead of replying.
        drop(stream);
    });

    let client = Client::new(test_config(addr.port(), 1));
    let channel = client.register_channel("127.0.0.1", addr.port(), 1);

    let method = MethodDescriptor::new(9, 9);
    let result = timeout(Duration::from_secs(2), client.call(&channel, method, Bytes::from_static(b"doomed")))
        .await
        .expect("call should not hang");

    assert!(result.is_err(), "a dropped connection must fail the in-flight call");
}
