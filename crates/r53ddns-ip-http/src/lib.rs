// # HTTP Address Source
//
// This crate asks an external echo service for the host's public IPv4
// address. Use it when the host sits behind NAT and the local address is not
// the one the world sees.
//
// ## Contract
//
// - One GET per discovery; the plain-text body (whitespace trimmed) must be
//   an IPv4 address
// - A timeout is reported as `Discovery::TimedOut`
// - Every other failure (transport, non-2xx status, unparsable body) is an
//   `Error::AddressSource`: an unreachable echo service must not make the
//   updater delete the A record

use async_trait::async_trait;
use r53ddns_core::traits::{AddressFamily, AddressSource, Discovery};
use r53ddns_core::{Error, Result};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Name used in errors and logs
const SOURCE_NAME: &str = "http";

/// Public IPv4 address source backed by an echo service
#[derive(Debug, Clone)]
pub struct HttpAddressSource {
    /// URL answering with the caller's address as plain text
    url: String,

    /// Upper bound for the whole request
    timeout: Duration,

    client: reqwest::Client,
}

impl HttpAddressSource {
    /// Create a new HTTP address source
    ///
    /// # Parameters
    ///
    /// - `url`: echo service URL (e.g. "https://ipv4.myexternalip.com/raw")
    /// - `timeout`: bound for connecting, sending and reading the response
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("r53ddns/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            timeout,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> std::result::Result<String, reqwest::Error> {
        self.client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl AddressSource for HttpAddressSource {
    async fn discover(&self) -> Result<Discovery> {
        tracing::debug!("Asking {} for our public IPv4 address", self.url);

        let body = match self.fetch().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => {
                return Ok(Discovery::TimedOut {
                    after: self.timeout,
                });
            }
            Err(e) => {
                return Err(Error::address_source(
                    SOURCE_NAME,
                    format!("Request to {} failed: {}", self.url, e),
                ));
            }
        };

        let text = body.trim();
        let ip: Ipv4Addr = text.parse().map_err(|_| {
            Error::address_source(
                SOURCE_NAME,
                format!("{} did not return an IPv4 address: {:?}", self.url, text),
            )
        })?;

        Ok(Discovery::Found(IpAddr::V4(ip)))
    }

    fn family(&self) -> AddressFamily {
        AddressFamily::V4
    }

    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn server_answering(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/raw"))
            .respond_with(template)
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    fn source(server: &MockServer) -> HttpAddressSource {
        HttpAddressSource::new(format!("{}/raw", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_trimmed_body_is_parsed() {
        let server =
            server_answering(ResponseTemplate::new(200).set_body_string("  203.0.113.7\n")).await;

        let discovery = source(&server).discover().await.unwrap();
        assert_eq!(discovery, Discovery::Found("203.0.113.7".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_ipv6_body_is_rejected() {
        let server =
            server_answering(ResponseTemplate::new(200).set_body_string("2001:db8::7")).await;

        let result = source(&server).discover().await;
        assert!(matches!(result, Err(Error::AddressSource { .. })));
    }

    #[tokio::test]
    async fn test_garbage_body_is_rejected() {
        let server =
            server_answering(ResponseTemplate::new(200).set_body_string("<html>busy</html>")).await;

        let result = source(&server).discover().await;
        assert!(matches!(result, Err(Error::AddressSource { .. })));
    }

    #[tokio::test]
    async fn test_server_error_is_fatal_not_absence() {
        let server = server_answering(ResponseTemplate::new(503)).await;

        let result = source(&server).discover().await;
        match result {
            Err(Error::AddressSource {
                source_name,
                message,
            }) => {
                assert_eq!(source_name, "http");
                assert!(message.contains("503"));
            }
            other => panic!("expected AddressSource error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_service_times_out() {
        let server = server_answering(
            ResponseTemplate::new(200)
                .set_body_string("203.0.113.7")
                .set_delay(Duration::from_secs(2)),
        )
        .await;

        let source =
            HttpAddressSource::new(format!("{}/raw", server.uri()), Duration::from_millis(100))
                .unwrap();

        let discovery = source.discover().await.unwrap();
        assert_eq!(
            discovery,
            Discovery::TimedOut {
                after: Duration::from_millis(100)
            }
        );
    }

    #[test]
    fn test_family_is_ipv4() {
        let source =
            HttpAddressSource::new("https://ipv4.myexternalip.com/raw", Duration::from_secs(5))
                .unwrap();
        assert_eq!(source.family(), AddressFamily::V4);
        assert_eq!(source.source_name(), "http");
        assert_eq!(source.url(), "https://ipv4.myexternalip.com/raw");
    }
}
