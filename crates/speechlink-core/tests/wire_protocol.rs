//! Integration tests exercising the codec and the message layer together,
//! the way the receiver task uses them: raw TLS chunks go into the codec,
//! every extracted frame goes through the parser.

use speechlink_core::protocol::codec::LineCodec;
use speechlink_core::protocol::messages::{parse_server_message, ClientMessage, ServerMessage};
use speechlink_core::ShortcutSpec;

/// Every frame in a `frame1\nframe2\r\n…\nframeK\n` stream yields exactly one
/// parser invocation, in order, regardless of how the bytes were chunked.
#[test]
fn test_chunked_stream_yields_every_frame_exactly_once() {
    let stream = concat!(
        "{\"type\":\"channel_joined\"}\n",
        "{\"type\":\"speak\",\"sequence\":[\"one\"]}\r\n",
        "{\"type\":\"tone\",\"hz\":440,\"length\":60}\n",
        "{\"type\":\"cancel\"}\n",
    )
    .as_bytes();

    // Deliver in awkward 7-byte chunks to force partial-frame buffering.
    let mut codec = LineCodec::new();
    let mut parsed = Vec::new();
    for chunk in stream.chunks(7) {
        codec.push(chunk);
        for frame in codec.drain_frames() {
            parsed.push(parse_server_message(&frame).expect("frame must parse"));
        }
    }

    assert_eq!(
        parsed,
        vec![
            ServerMessage::ChannelJoined,
            ServerMessage::Speak { text: Some("one".to_string()) },
            ServerMessage::Tone { hz: 440, duration_ms: 60 },
            ServerMessage::Cancel,
        ]
    );
    assert_eq!(codec.pending_len(), 0);
}

/// The three handshake messages encode to the exact wire lines the relay
/// expects, newline-terminated.
#[test]
fn test_handshake_messages_encode_to_canonical_wire_lines() {
    let lines: Vec<Vec<u8>> = [
        ClientMessage::protocol_version(),
        ClientMessage::join("secret"),
        ClientMessage::braille_info(),
    ]
    .iter()
    .map(|msg| LineCodec::encode(&msg.to_json().expect("encode")))
    .collect();

    assert_eq!(lines[0], b"{\"type\":\"protocol_version\",\"version\":2}\n");
    assert_eq!(
        lines[1],
        b"{\"type\":\"join\",\"channel\":\"secret\",\"connection_type\":\"master\"}\n"
    );
    assert_eq!(
        lines[2],
        b"{\"type\":\"set_braille_info\",\"name\":\"noBraille\",\"numCells\":0}\n"
    );
}

/// A malformed frame in the middle of the stream is isolated; neighbours
/// still parse.
#[test]
fn test_malformed_frame_does_not_poison_neighbours() {
    let mut codec = LineCodec::new();
    codec.push(b"{\"type\":\"cancel\"}\n{{{garbage\n{\"type\":\"channel_joined\"}\n");

    let frames = codec.drain_frames();
    assert_eq!(frames.len(), 3);
    assert!(parse_server_message(&frames[0]).is_ok());
    assert!(parse_server_message(&frames[1]).is_err());
    assert!(parse_server_message(&frames[2]).is_ok());
}

/// Parse → Display → parse of a shortcut specification is stable.
#[test]
fn test_shortcut_parse_display_round_trip() {
    for canonical in ["ctrl+win+f11", "alt+shift+space", "ctrl+pause", "win+9"] {
        let spec = ShortcutSpec::parse(canonical);
        assert_eq!(spec.to_string(), canonical, "canonical form must re-stringify unchanged");
        assert_eq!(ShortcutSpec::parse(&spec.to_string()), spec);
    }
}
