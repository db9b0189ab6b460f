use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};

/// Parse a header string in format "Name: Value" and add it to the HeaderMap
pub fn parse_and_add_header(headers: &mut HeaderMap, raw: &str) {
    let Some((name, value)) = raw.split_once(':') else {
        warn!("Ignoring header '{raw}': expected 'Name: Value'");
        return;
    };
    let (name, value) = (name.trim(), value.trim());

    match (
        HeaderName::from_bytes(name.as_bytes()),
        HeaderValue::from_str(value),
    ) {
        (Ok(name), Ok(value)) => {
            debug!(name = %name, "Adding request header");
            headers.insert(name, value);
        }
        (Err(_), _) => warn!("Ignoring invalid header name '{name}'"),
        (_, Err(_)) => warn!("Ignoring invalid header value for '{name}'"),
    }
}

/// Parse a collection of header strings and return a HeaderMap
pub fn parse_headers(header_strings: &[String]) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for header_str in header_strings {
        parse_and_add_header(&mut headers, header_str);
    }

    headers
}
