use crate::credentials::Credentials;
use reqwest::header::{HeaderMap, SET_COOKIE};
use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::debug;

/// Credentials plus the sticky session cookies handed out by the service.
///
/// Shared by every download worker. Requests read the cookie header when they
/// are built; responses merge their `Set-Cookie` values under the write lock, so
/// concurrent updates from different workers are never lost.
#[derive(Debug)]
pub struct SessionState {
    credentials: Credentials,
    cookies: RwLock<BTreeMap<String, String>>,
}

impl SessionState {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            cookies: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// `Cookie` header value for the next request, if any token was received.
    pub fn cookie_header(&self) -> Option<String> {
        let cookies = self.cookies.read().unwrap_or_else(|e| e.into_inner());
        if cookies.is_empty() {
            return None;
        }

        Some(
            cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Merge any `Set-Cookie` headers from a response. Returns true if the
    /// stored token changed.
    pub fn absorb(&self, headers: &HeaderMap) -> bool {
        let values = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok());
        self.absorb_set_cookies(values)
    }

    pub fn absorb_set_cookies<'a>(&self, values: impl IntoIterator<Item = &'a str>) -> bool {
        let parsed: Vec<(String, String)> = values.into_iter().filter_map(parse_set_cookie).collect();
        if parsed.is_empty() {
            return false;
        }

        let mut cookies = self.cookies.write().unwrap_or_else(|e| e.into_inner());
        let mut changed = false;
        for (name, value) in parsed {
            if cookies.get(&name) != Some(&value) {
                debug!(cookie = %name, "Session token updated");
                cookies.insert(name, value);
                changed = true;
            }
        }
        changed
    }
}

/// `name=value; Path=/; ...` -> `(name, value)`; attributes are dropped.
fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let pair = header.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use std::sync::Arc;

    fn session() -> SessionState {
        SessionState::new(Credentials::new("id", "key"))
    }

    #[test]
    fn test_no_cookie_until_first_token() {
        assert_eq!(session().cookie_header(), None);
    }

    #[test]
    fn test_attributes_are_stripped() {
        let session = session();
        assert!(session.absorb_set_cookies(["AWSALB=abc123; Expires=Tue, 01 Jan 2030 00:00:00 GMT; Path=/"]));
        assert_eq!(session.cookie_header().as_deref(), Some("AWSALB=abc123"));
    }

    #[test]
    fn test_newer_token_replaces_older() {
        let session = session();
        session.absorb_set_cookies(["AWSALB=first; Path=/", "JSESSIONID=j1"]);
        assert!(session.absorb_set_cookies(["AWSALB=second"]));
        assert_eq!(
            session.cookie_header().as_deref(),
            Some("AWSALB=second; JSESSIONID=j1")
        );
    }

    #[test]
    fn test_same_token_is_not_a_change() {
        let session = session();
        session.absorb_set_cookies(["AWSALB=abc"]);
        assert!(!session.absorb_set_cookies(["AWSALB=abc; Path=/"]));
        assert!(!session.absorb_set_cookies(["garbage-without-equals"]));
    }

    #[test]
    fn test_absorb_reads_every_set_cookie_header() {
        let session = session();
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));

        assert!(session.absorb(&headers));
        assert_eq!(session.cookie_header().as_deref(), Some("a=1; b=2"));
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let session = Arc::new(session());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let session = session.clone();
                std::thread::spawn(move || {
                    let cookie = format!("worker{}=token{}", i, i);
                    session.absorb_set_cookies([cookie.as_str()]);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let header = session.cookie_header().unwrap();
        for i in 0..8 {
            assert!(header.contains(&format!("worker{}=token{}", i, i)));
        }
    }
}
