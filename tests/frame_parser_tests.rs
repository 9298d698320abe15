use gazel::api::stream::{decode_frame, FrameParser};
use gazel::types::StreamEvent;

#[test]
fn test_fragmented_frames() {
    let mut parser = FrameParser::new();

    let chunk1 = b"event: message\ndata: {\"text\":\"Hel";
    let frames1 = parser.push(chunk1);
    assert_eq!(frames1.len(), 0);

    let chunk2 = b"lo\"}\n\nevent: message\ndata: {\"text\":\" there\"}\n\n";
    let frames2 = parser.push(chunk2);
    assert_eq!(frames2.len(), 2);

    assert_eq!(
        decode_frame(&frames2[0]),
        StreamEvent::TextDelta("Hello".to_string())
    );
    assert_eq!(
        decode_frame(&frames2[1]),
        StreamEvent::TextDelta(" there".to_string())
    );
}

#[test]
fn test_delimiter_split_across_chunks() {
    let mut parser = FrameParser::new();

    let frames1 = parser.push(b"data: {\"text\":\"x\"}\n");
    assert_eq!(frames1.len(), 0);
    let frames2 = parser.push(b"\n");
    assert_eq!(frames2.len(), 1);
    assert_eq!(
        decode_frame(&frames2[0]),
        StreamEvent::TextDelta("x".to_string())
    );
}

#[test]
fn test_residual_frame_flush_at_end_of_stream() {
    let mut parser = FrameParser::new();

    let frames = parser.push(b"data: {\"text\":\"tail\"}");
    assert_eq!(frames.len(), 0);

    let residual = parser.finish().expect("residual frame should flush");
    assert_eq!(
        decode_frame(&residual),
        StreamEvent::TextDelta("tail".to_string())
    );
    assert_eq!(parser.finish(), None);
}

#[test]
fn test_malformed_json_is_skipped_not_fatal() {
    let mut parser = FrameParser::new();

    let frames = parser.push(b"data: {invalid json}\n\ndata: {\"text\":\"ok\"}\n\n");
    assert_eq!(frames.len(), 2);
    assert_eq!(decode_frame(&frames[0]), StreamEvent::Unknown);
    assert_eq!(
        decode_frame(&frames[1]),
        StreamEvent::TextDelta("ok".to_string())
    );
}

#[test]
fn test_done_event_terminates_regardless_of_data() {
    assert_eq!(decode_frame("event: done\ndata: {}"), StreamEvent::Done);
    assert_eq!(decode_frame("event: done"), StreamEvent::Done);
}

#[test]
fn test_error_payload_prefers_message_field() {
    let frame = "data: {\"error\":true,\"message\":\"model overloaded\",\"detail\":\"d\"}";
    assert_eq!(
        decode_frame(frame),
        StreamEvent::ApplicationError("model overloaded".to_string())
    );

    let frame = "data: {\"error\":true,\"detail\":\"upstream timeout\"}";
    assert_eq!(
        decode_frame(frame),
        StreamEvent::ApplicationError("upstream timeout".to_string())
    );

    let frame = "data: {\"error\":true}";
    assert_eq!(
        decode_frame(frame),
        StreamEvent::ApplicationError("stream error".to_string())
    );
}

#[test]
fn test_crlf_delimited_stream() {
    let mut parser = FrameParser::new();

    let frames = parser.push(b"event: message\r\ndata: {\"text\":\"hi\"}\r\n\r\n");
    assert_eq!(frames.len(), 1);
    assert_eq!(
        decode_frame(&frames[0]),
        StreamEvent::TextDelta("hi".to_string())
    );
}
