//! Tokio codecs for HTTP/1.1 message framing.
//!
//! Two codecs cover the two ends of a link:
//! - [`AgentCodec`]: decodes [`HttpRequest`]s and encodes [`HttpResponse`]s
//!   (device side).
//! - [`LinkCodec`]: encodes [`HttpRequest`]s and decodes [`HttpResponse`]s
//!   (controller side).
//!
//! # Framing
//!
//! ```text
//! <start line>\r\n
//! <name>: <value>\r\n ...
//! \r\n
//! <body: Content-Length bytes>
//! ```
//!
//! A request without `Content-Length` takes the bytes buffered after the
//! head as its body (empty when none arrived with it). A response without
//! `Content-Length` extends to the end of the stream, which is only known in
//! [`Decoder::decode_eof`].
//!
//! # Usage with Tokio Framed
//!
//! ```rust,no_run
//! use futures::{SinkExt, StreamExt};
//! use tokio::net::TcpStream;
//! use tokio_util::codec::Framed;
//! use parklink_protocol::{HttpRequest, LinkCodec};
//!
//! # async fn example() -> parklink_core::Result<()> {
//! let stream = TcpStream::connect("192.168.1.119:8080").await?;
//! let mut framed = Framed::new(stream, LinkCodec::new());
//!
//! framed.send(HttpRequest::status_query("192.168.1.119:8080")).await?;
//! if let Some(Ok(response)) = framed.next().await {
//!     println!("{} {}", response.status, response.body_text());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # DoS Protection
//!
//! Head plus body may not exceed the maximum frame size (default 64 KB). The
//! check runs before the body is buffered, so an oversized `Content-Length`
//! is rejected immediately.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::http::{HttpRequest, HttpResponse, Method, reason_phrase};
use parklink_core::{Error, Result, constants::MAX_FRAME_SIZE};

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Parsed start line and headers plus the head's length in bytes
/// (terminator included).
#[derive(Debug)]
struct Head {
    start_line: String,
    headers: Vec<(String, String)>,
    len: usize,
}

impl Head {
    fn content_length(&self) -> Result<Option<usize>> {
        let Some((_, value)) = self
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        else {
            return Ok(None);
        };

        value
            .parse::<usize>()
            .map(Some)
            .map_err(|_| Error::InvalidMessageFormat(format!("invalid Content-Length: {value}")))
    }
}

fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(HEAD_TERMINATOR.len())
        .position(|window| window == HEAD_TERMINATOR)
}

/// Parse the head if it is complete.
fn parse_head(src: &BytesMut, max_frame_size: usize) -> Result<Option<Head>> {
    let Some(pos) = find_terminator(src) else {
        if src.len() > max_frame_size {
            return Err(Error::FrameTooLarge {
                size: src.len(),
                max_size: max_frame_size,
            });
        }
        return Ok(None);
    };

    let len = pos + HEAD_TERMINATOR.len();
    if len > max_frame_size {
        return Err(Error::FrameTooLarge {
            size: len,
            max_size: max_frame_size,
        });
    }

    let text = std::str::from_utf8(&src[..pos])
        .map_err(|_| Error::InvalidMessageFormat("head is not valid UTF-8".to_string()))?;

    let mut lines = text.split("\r\n").skip_while(|line| line.is_empty());
    let start_line = lines
        .next()
        .ok_or_else(|| Error::InvalidMessageFormat("empty message head".to_string()))?
        .to_string();

    let mut headers = Vec::new();
    for line in lines.filter(|line| !line.is_empty()) {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::InvalidMessageFormat(format!("malformed header: {line}")))?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    Ok(Some(Head {
        start_line,
        headers,
        len,
    }))
}

fn check_frame_size(size: usize, max_size: usize) -> Result<()> {
    if size > max_size {
        return Err(Error::FrameTooLarge { size, max_size });
    }
    Ok(())
}

/// Write headers, skipping the ones the encoder owns.
fn write_headers(dst: &mut BytesMut, headers: &[(String, String)], body_len: usize) {
    for (name, value) in headers {
        if name.eq_ignore_ascii_case("content-length") || name.eq_ignore_ascii_case("connection")
        {
            continue;
        }
        dst.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
    }
    dst.extend_from_slice(format!("Content-Length: {body_len}\r\n").as_bytes());
    dst.extend_from_slice(b"Connection: close\r\n\r\n");
}

/// Device-side codec: requests in, responses out.
#[derive(Debug)]
pub struct AgentCodec {
    max_frame_size: usize,
}

impl AgentCodec {
    pub fn new() -> Self {
        Self::with_max_frame_size(MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for AgentCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for AgentCodec {
    type Item = HttpRequest;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<HttpRequest>> {
        let Some(head) = parse_head(src, self.max_frame_size)? else {
            return Ok(None);
        };

        // Without Content-Length the body is whatever arrived with the head.
        let body_len = match head.content_length()? {
            Some(len) => len,
            None => src.len() - head.len,
        };
        let total = head.len + body_len;
        check_frame_size(total, self.max_frame_size)?;

        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut parts = head.start_line.split_whitespace();
        let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
            return Err(Error::InvalidMessageFormat(format!(
                "malformed request line: {}",
                head.start_line
            )));
        };
        let path = target.split('?').next().unwrap_or(target).to_string();
        let method = Method::from(method);

        src.advance(head.len);
        let body = src.split_to(body_len).freeze();

        Ok(Some(HttpRequest {
            method,
            path,
            headers: head.headers,
            body,
        }))
    }
}

impl Encoder<HttpResponse> for AgentCodec {
    type Error = Error;

    fn encode(&mut self, item: HttpResponse, dst: &mut BytesMut) -> Result<()> {
        let status_line = format!(
            "HTTP/1.1 {} {}\r\n",
            item.status,
            reason_phrase(item.status)
        );

        let start = dst.len();
        dst.extend_from_slice(status_line.as_bytes());
        write_headers(dst, &item.headers, item.body.len());
        dst.extend_from_slice(&item.body);

        if let Err(e) = check_frame_size(dst.len() - start, self.max_frame_size) {
            dst.truncate(start);
            return Err(e);
        }
        Ok(())
    }
}

/// Controller-side codec: requests out, responses in.
#[derive(Debug)]
pub struct LinkCodec {
    max_frame_size: usize,
}

impl LinkCodec {
    pub fn new() -> Self {
        Self::with_max_frame_size(MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    fn parse_status(head: &Head) -> Result<u16> {
        let mut parts = head.start_line.split_whitespace();
        let version = parts.next().unwrap_or_default();
        if !version.starts_with("HTTP/") {
            return Err(Error::InvalidMessageFormat(format!(
                "malformed status line: {}",
                head.start_line
            )));
        }
        parts
            .next()
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or_else(|| {
                Error::InvalidMessageFormat(format!("malformed status line: {}", head.start_line))
            })
    }
}

impl Default for LinkCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LinkCodec {
    type Item = HttpResponse;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<HttpResponse>> {
        let Some(head) = parse_head(src, self.max_frame_size)? else {
            return Ok(None);
        };
        let status = Self::parse_status(&head)?;

        let Some(body_len) = head.content_length()? else {
            // Body runs to end of stream.
            check_frame_size(src.len(), self.max_frame_size)?;
            return Ok(None);
        };

        let total = head.len + body_len;
        check_frame_size(total, self.max_frame_size)?;

        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(head.len);
        let body = src.split_to(body_len).freeze();

        Ok(Some(HttpResponse {
            status,
            headers: head.headers,
            body,
        }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<HttpResponse>> {
        if let Some(response) = self.decode(src)? {
            return Ok(Some(response));
        }
        if src.is_empty() {
            return Ok(None);
        }

        match parse_head(src, self.max_frame_size)? {
            Some(head) if head.content_length()?.is_none() => {
                let status = Self::parse_status(&head)?;
                src.advance(head.len);
                let body = src.split().freeze();
                Ok(Some(HttpResponse {
                    status,
                    headers: head.headers,
                    body,
                }))
            }
            _ => Err(Error::InvalidMessageFormat(format!(
                "connection closed with {} bytes of incomplete response",
                src.len()
            ))),
        }
    }
}

impl Encoder<HttpRequest> for LinkCodec {
    type Error = Error;

    fn encode(&mut self, item: HttpRequest, dst: &mut BytesMut) -> Result<()> {
        let request_line = format!("{} {} HTTP/1.1\r\n", item.method, item.path);

        let start = dst.len();
        dst.extend_from_slice(request_line.as_bytes());
        write_headers(dst, &item.headers, item.body.len());
        dst.extend_from_slice(&item.body);

        if let Err(e) = check_frame_size(dst.len() - start, self.max_frame_size) {
            dst.truncate(start);
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_defaults() {
        assert_eq!(AgentCodec::new().max_frame_size(), MAX_FRAME_SIZE);
        assert_eq!(LinkCodec::default().max_frame_size(), MAX_FRAME_SIZE);
        assert_eq!(AgentCodec::with_max_frame_size(128).max_frame_size(), 128);
    }

    #[test]
    fn test_decode_get_request() {
        let mut codec = AgentCodec::new();
        let mut buffer = BytesMut::from(&b"GET /estado?x=1 HTTP/1.1\r\nHost: pico\r\n\r\n"[..]);

        let req = codec.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.path, "/estado");
        assert_eq!(req.header_value("host"), Some("pico"));
        assert!(req.body.is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_decode_post_request_in_pieces() {
        let mut codec = AgentCodec::new();
        let body = br#"{"accion":"toggle_aguja"}"#;
        let head = format!(
            "POST /comando HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
            body.len()
        );

        let mut buffer = BytesMut::from(head.as_bytes());
        assert!(codec.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(&body[..10]);
        assert!(codec.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(&body[10..]);
        let req = codec.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(req.method, Method::Post);
        assert_eq!(&req.body[..], body);
    }

    #[test]
    fn test_decode_post_without_content_length() {
        let mut codec = AgentCodec::new();
        let mut buffer = BytesMut::from(
            &b"POST /comando HTTP/1.1\r\nHost: x\r\n\r\n{\"accion\":\"toggle_aguja\"}"[..],
        );

        let req = codec.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(req.method, Method::Post);
        assert_eq!(&req.body[..], br#"{"accion":"toggle_aguja"}"#);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_decode_partial_head() {
        let mut codec = AgentCodec::new();
        let mut buffer = BytesMut::from(&b"GET /estado HTTP/1.1\r\nHost"[..]);
        assert!(codec.decode(&mut buffer).unwrap().is_none());
    }

    #[test]
    fn test_decode_malformed_request_line() {
        let mut codec = AgentCodec::new();
        let mut buffer = BytesMut::from(&b"GARBAGE\r\n\r\n"[..]);
        assert!(matches!(
            codec.decode(&mut buffer),
            Err(Error::InvalidMessageFormat(_))
        ));
    }

    #[test]
    fn test_decode_invalid_content_length() {
        let mut codec = AgentCodec::new();
        let mut buffer =
            BytesMut::from(&b"POST /comando HTTP/1.1\r\nContent-Length: lots\r\n\r\n"[..]);
        assert!(matches!(
            codec.decode(&mut buffer),
            Err(Error::InvalidMessageFormat(_))
        ));
    }

    #[test]
    fn test_decode_frame_too_large() {
        let mut codec = AgentCodec::with_max_frame_size(64);
        let mut buffer =
            BytesMut::from(&b"POST /comando HTTP/1.1\r\nContent-Length: 4096\r\n\r\n"[..]);

        match codec.decode(&mut buffer) {
            Err(Error::FrameTooLarge { size, max_size }) => {
                assert_eq!(max_size, 64);
                assert!(size > max_size);
            }
            other => panic!("Expected FrameTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_unterminated_head_too_large() {
        let mut codec = AgentCodec::with_max_frame_size(16);
        let mut buffer = BytesMut::from("A".repeat(32).as_bytes());
        assert!(matches!(
            codec.decode(&mut buffer),
            Err(Error::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn test_encode_response() {
        let mut codec = AgentCodec::new();
        let mut buffer = BytesMut::new();

        let resp = HttpResponse::new(200, &b"{}"[..]).header("Content-Type", "application/json");
        codec.encode(resp, &mut buffer).unwrap();

        assert_eq!(
            &buffer[..],
            &b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}"[..]
        );
    }

    #[test]
    fn test_encode_response_too_large() {
        let mut codec = AgentCodec::with_max_frame_size(32);
        let mut buffer = BytesMut::new();

        let resp = HttpResponse::new(200, vec![b'x'; 100]);
        assert!(matches!(
            codec.encode(resp, &mut buffer),
            Err(Error::FrameTooLarge { .. })
        ));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_encode_request_overrides_length() {
        let mut codec = LinkCodec::new();
        let mut buffer = BytesMut::new();

        let req = HttpRequest::command("pico:8080", b"{}".to_vec()).header("Content-Length", "999");
        codec.encode(req, &mut buffer).unwrap();

        let text = String::from_utf8(buffer.to_vec()).unwrap();
        assert!(text.starts_with("POST /comando HTTP/1.1\r\n"));
        assert!(text.contains("Content-Length: 2\r\n"));
        assert!(!text.contains("999"));
        assert!(text.ends_with("\r\n\r\n{}"));
    }

    #[test]
    fn test_decode_response() {
        let mut codec = LinkCodec::new();
        let mut buffer = BytesMut::from(
            &b"HTTP/1.1 400 Bad Request\r\nContent-Length: 18\r\n\r\n{\"status\":\"error\"}"[..],
        );

        let resp = codec.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(resp.status, 400);
        assert_eq!(resp.body_text(), r#"{"status":"error"}"#);
    }

    #[test]
    fn test_decode_response_until_eof() {
        let mut codec = LinkCodec::new();
        let mut buffer = BytesMut::from(&b"HTTP/1.0 200 OK\r\n\r\nplain text"[..]);

        assert!(codec.decode(&mut buffer).unwrap().is_none());
        let resp = codec.decode_eof(&mut buffer).unwrap().unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body_text(), "plain text");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_decode_eof_truncated_body() {
        let mut codec = LinkCodec::new();
        let mut buffer = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc"[..]);
        assert!(matches!(
            codec.decode_eof(&mut buffer),
            Err(Error::InvalidMessageFormat(_))
        ));
    }

    #[test]
    fn test_decode_eof_empty() {
        let mut codec = LinkCodec::new();
        let mut buffer = BytesMut::new();
        assert!(codec.decode_eof(&mut buffer).unwrap().is_none());
    }

    #[test]
    fn test_decode_bad_status_line() {
        let mut codec = LinkCodec::new();
        let mut buffer = BytesMut::from(&b"HTTP/1.1 abc\r\nContent-Length: 0\r\n\r\n"[..]);
        assert!(matches!(
            codec.decode(&mut buffer),
            Err(Error::InvalidMessageFormat(_))
        ));
    }

    #[test]
    fn test_request_response_through_both_codecs() {
        let mut link = LinkCodec::new();
        let mut agent = AgentCodec::new();

        let mut wire = BytesMut::new();
        link.encode(
            HttpRequest::command("pico", br#"{"accion":"ocupar","espacio":1}"#.to_vec()),
            &mut wire,
        )
        .unwrap();
        let req = agent.decode(&mut wire).unwrap().unwrap();
        assert_eq!(req.path, "/comando");
        assert_eq!(&req.body[..], br#"{"accion":"ocupar","espacio":1}"#);

        let mut wire = BytesMut::new();
        agent
            .encode(HttpResponse::new(200, &b"{\"status\":\"ok\"}"[..]), &mut wire)
            .unwrap();
        let resp = link.decode(&mut wire).unwrap().unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.header_value("connection"), Some("close"));
    }
}
