use std::collections::HashSet;

use bytes::Bytes;
use corpc_client_rs::{call::CallOutcome, client::client::Client, method::MethodDescriptor};

use crate::integration_tests::common::{bind_ephemeral, read_request, test_config, write_response};

#[tokio::test]
async fn calls_spread_across_more_than_one_connection() {
    let (listener, addr) = bind_ephemeral().await;

    tokio::spawn(async move {
        let mut next_tag: u32 = 0;
        loop {
            let Ok((mut stream, _)) = listener.accept().await else { break };
            let tag = next_tag;
            next_tag += 1;
            tokio::spawn(async move {
                while let Ok(req) = read_request(&mut stream).await {
                    if write_response(&mut stream, req.call_id, &tag.to_be_bytes()).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    let client = Client::new(test_config(addr.port(), 3));
    let channel = client.register_channel("127.0.0.1", addr.port(), 3);
    let method = MethodDescriptor::new(4, 4);

    let mut handles = Vec::new();
    for _ in 0..6 {
        let client = client.clone();
        let channel = channel.clone();
        handles.push(tokio::spawn(async move { client.call(&channel, method, Bytes::from_static(b"x")).await }));
    }

    let mut tags = HashSet::new();
    for h in handles {
        let outcome = h.await.expect("task join").expect("call should succeed");
        if let CallOutcome::Response(body) = outcome {
            let tag = u32::from_be_bytes(body[..].try_into().expect("4-byte tag"));
            tags.insert(tag);
        } else {
            panic!("expected Response");
        }
    }

    assert!(tags.len() > 1, "calls should fan out across more than one connection, got tags {tags:?}");
}
