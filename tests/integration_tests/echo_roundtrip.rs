use bytes::Bytes;
use corpc_client_rs::{call::CallOutcome, client::client::Client, method::MethodDescriptor};

use crate::integration_tests::common::{bind_ephemeral, read_request, test_config, write_response};

#[tokio::test]
async fn single_call_demultiplexes_its_own_response() {
    let (listener, addr) = bind_ephemeral().await;

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let req = read_request(&mut stream).await.expect("read request");
        assert_eq!(req.body, b"ping");
        write_response(&mut stream, req.call_id, b"pong").await.expect("write response");
    });

    let client = Client::new(test_config(addr.port(), 1));
    let channel = client.register_channel("127.0.0.1", addr.port(), 1);

    let method = MethodDescriptor::new(1, 1);
    let outcome = client
        .call(&channel, method, Bytes::from_static(b"ping"))
        .await
        .expect("call should succeed");

    match outcome {
        CallOutcome::Response(body) => assert_eq!(&body[..], b"pong"),
        other => panic!("expected Response, got {other:?}"),
    }
}

#[tokio::test]
async fn call_typed_decodes_the_response_body() {
    let (listener, addr) = bind_ephemeral().await;

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let req = read_request(&mut stream).await.expect("read request");
        write_response(&mut stream, req.call_id, &req.body).await.expect("write response");
    });

    let client = Client::new(test_config(addr.port(), 1));
    let channel = client.register_channel("127.0.0.1", addr.port(), 1);

    let method = MethodDescriptor::new(1, 1);
    let request = Bytes::from_static(b"typed-echo");
    let response: Option<Bytes> =
        client.call_typed(&channel, method, &request).await.expect("call_typed should succeed");

    assert_eq!(response, Some(Bytes::from_static(b"typed-echo")));
}
