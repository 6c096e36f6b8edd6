//! Parsed response head.

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode, Version};

/// Status line and headers of the final response.
///
/// The header buffer holds every header block of a transfer (interim
/// `1xx` responses, redirects); only the last block is parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
}

impl ResponseHead {
    /// Parse the last header block in `raw`. `None` without a status line.
    pub fn parse(raw: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(raw);
        let mut head: Option<ResponseHead> = None;

        for line in text.split("\r\n").flat_map(|l| l.split('\n')) {
            if line.starts_with("HTTP/") {
                if let Some((version, status)) = parse_status_line(line) {
                    head = Some(ResponseHead {
                        status,
                        version,
                        headers: HeaderMap::new(),
                    });
                }
                continue;
            }
            let (Some(current), Some((name, value))) = (head.as_mut(), line.split_once(':'))
            else {
                continue;
            };
            let Ok(name) = HeaderName::from_bytes(name.trim().as_bytes()) else {
                continue;
            };
            if let Ok(value) = HeaderValue::from_str(value.trim()) {
                current.headers.append(name, value);
            }
        }
        head
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Value of `name` as text, if present and visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

fn parse_status_line(line: &str) -> Option<(Version, StatusCode)> {
    let mut parts = line.splitn(3, ' ');
    let version = match parts.next()? {
        "HTTP/0.9" => Version::HTTP_09,
        "HTTP/1.0" => Version::HTTP_10,
        "HTTP/1.1" => Version::HTTP_11,
        "HTTP/2" | "HTTP/2.0" => Version::HTTP_2,
        "HTTP/3" | "HTTP/3.0" => Version::HTTP_3,
        _ => return None,
    };
    let status = StatusCode::from_bytes(parts.next()?.as_bytes()).ok()?;
    Some((version, status))
}
