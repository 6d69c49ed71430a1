use bytes::Bytes;
use corpc_client_rs::{call::CallOutcome, client::client::Client, method::MethodDescriptor, reactor::TokioReactor};

use crate::integration_tests::common::{bind_ephemeral, read_request, test_config, write_response};

/// `Client::with_reactor` is the host-supplied-reactor seam (§1, §6); a host
/// swapping in its own `Reactor` impl should see the same call semantics as
/// `Client::new`. Here the "custom" reactor is just `TokioReactor` again,
/// built through the closure instead of internally, to prove the seam is
/// wired correctly without needing a second reactor implementation.
#[tokio::test]
async fn with_reactor_accepts_a_host_supplied_reactor_constructor() {
    let (listener, addr) = bind_ephemeral().await;

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let req = read_request(&mut stream).await.expect("read request");
        write_response(&mut stream, req.call_id, &req.body).await.expect("write response");
    });

    let client = Client::with_reactor(
        test_config(addr.port(), 1),
        |max_response_body, write_chunk_size, connect_tx, router| {
            std::sync::Arc::new(TokioReactor::new(max_response_body, write_chunk_size, connect_tx, router))
        },
    );
    let channel = client.register_channel("127.0.0.1", addr.port(), 1);

    let method = MethodDescriptor::new(2, 2);
    let outcome = client
        .call(&channel, method, Bytes::from_static(b"via-custom-reactor"))
        .await
        .expect("call should succeed");

    match outcome {
        CallOutcome::Response(body) => assert_eq!(&body[..], b"via-custom-reactor"),
        other => panic!("expected Response, got {other:?}"),
    }
}
