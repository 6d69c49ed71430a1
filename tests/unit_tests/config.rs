use corpc_client_rs::cfg::config::Config;

const YAML: &str = r#"
channels:
  - host: "10.0.0.5"
    port: 9000
  - host: "0.0.0.0"
    port: 9001
    connect_num: 4

runtime:
  ConnectTimeout: 5
  ReconnectDelay: 1
  WriteChunkSize: 8192
  MaxResponseBody: 1048576
"#;

#[test]
fn parses_and_validates_a_full_document() {
    let mut cfg: Config = serde_yaml::from_str(YAML).expect("parse");
    cfg.validate_and_normalize().expect("validate");

    assert_eq!(cfg.channels.len(), 2);
    assert_eq!(cfg.channels[0].connect_num, 1, "default connect_num is 1");
    assert_eq!(cfg.channels[1].connect_num, 4);
    assert_eq!(cfg.runtime.write_chunk_size, 8192);
}

#[test]
fn rejects_missing_channels_key() {
    let err = serde_yaml::from_str::<Config>("runtime:\n  ConnectTimeout: 1\n  ReconnectDelay: 1\n  WriteChunkSize: 64\n  MaxResponseBody: 1\n");
    assert!(err.is_err());
}
