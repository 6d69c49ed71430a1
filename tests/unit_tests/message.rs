use bytes::{Bytes, BytesMut};
use corpc_client_rs::codec::message::RpcMessage;

#[test]
fn bytes_round_trip_through_rpc_message() {
    let body = Bytes::from_static(b"hello rpc");
    let mut buf = BytesMut::with_capacity(body.encoded_len());
    body.encode_into(&mut buf).expect("encode");
    let decoded = Bytes::decode(&buf).expect("decode");
    assert_eq!(decoded, body);
}

#[test]
fn vec_u8_round_trip_through_rpc_message() {
    let body: Vec<u8> = vec![1, 2, 3, 4, 5];
    let mut buf = BytesMut::with_capacity(body.encoded_len());
    body.encode_into(&mut buf).expect("encode");
    let decoded = Vec::<u8>::decode(&buf).expect("decode");
    assert_eq!(decoded, body);
}
