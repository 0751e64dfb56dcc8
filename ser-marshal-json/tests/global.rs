use ser_marshal_json::{decode_str, encode_to_string, global, install, record, Json};

mod common;
use common::SerdeJsonHost;

#[derive(Debug, Default, PartialEq)]
struct Greeting {
    text: String,
    bytes: Vec<u8>,
}
record!(Greeting { text, bytes });

#[test]
fn installed_bridge_serves_free_functions() {
    install(Json::builder().bridge(SerdeJsonHost).build()).unwrap();
    let rejected = install(Json::new()).unwrap_err();
    assert_eq!(rejected.engine_name(), "native");
    assert_eq!(global().engine_name(), "bridge");

    let greeting = Greeting { text: "hi".into(), bytes: b"AB".to_vec() };
    let text = encode_to_string(&greeting).unwrap();
    assert_eq!(text, r#"{"text":"hi","bytes":"AB"}"#);
    let mut back = Greeting::default();
    decode_str(&text, &mut back).unwrap();
    assert_eq!(back, greeting);
}
