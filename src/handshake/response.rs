//! HTTP response header block parsing.

use std::collections::HashMap;

use super::HandshakeError;

/// Status and headers of one HTTP response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
    status: u16,
    headers: HashMap<String, String>,
}

impl HttpResponse {
    /// Numeric status code; zero when the status line had none.
    #[must_use]
    pub const fn status(&self) -> u16 { self.status }

    /// Value of header `name`, matched case-sensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> { self.headers.get(name).map(String::as_str) }

    /// All parsed headers.
    #[must_use]
    pub const fn headers(&self) -> &HashMap<String, String> { &self.headers }
}

/// Parse a header block terminated by a blank line.
///
/// The status is the second space-separated token of the first line. Each
/// later line splits at the first `": "`; lines without one are skipped and
/// a repeated header keeps its first value.
///
/// # Errors
/// Returns [`HandshakeError::InvalidStatusLine`] when the status token is
/// not a number.
pub fn parse_response(block: &[u8]) -> Result<HttpResponse, HandshakeError> {
    let text = String::from_utf8_lossy(block);
    let mut lines = text.split("\r\n");
    let status = parse_status(lines.next().unwrap_or_default())?;
    let mut headers = HashMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(": ") {
            headers
                .entry(name.to_owned())
                .or_insert_with(|| value.to_owned());
        }
    }
    Ok(HttpResponse { status, headers })
}

fn parse_status(line: &str) -> Result<u16, HandshakeError> {
    match line.split(' ').nth(1) {
        None => Ok(0),
        Some(token) => token
            .parse()
            .map_err(|_| HandshakeError::InvalidStatusLine(line.to_owned())),
    }
}
