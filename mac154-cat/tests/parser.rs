use mac154_cat::FrameParser;

fn parse_plain(input: &str) -> String {
    let output = FrameParser::parse_hex(input).unwrap();
    String::from_utf8(strip_ansi_escapes::strip(output)).unwrap()
}

#[test]
fn parse_data_frame() {
    let output = parse_plain("61887acdab0200010026c8");

    assert!(output.contains("frame type: Data"));
    assert!(output.contains("sequence number: 122"));
    assert!(output.contains("dst pan id: abcd"));
    assert!(output.contains("pan id compression: 1"));
}

#[test]
fn parse_data_request_command() {
    // MAC command frame carrying a data request.
    let output = parse_plain("6388b1cdab0000020004");

    assert!(output.contains("frame type: MacCommand"));
    assert!(output.contains("command: DataRequest"));
}

#[test]
fn rejects_garbage() {
    assert!(FrameParser::parse_hex("zz").is_err());
    assert!(FrameParser::parse_hex("61").is_err());
}
