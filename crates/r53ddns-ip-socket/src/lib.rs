// # Socket Address Source
//
// This crate discovers the host's own address for one family by "connecting"
// a UDP socket to a well-known public resolver and reading back the local
// address the kernel picked for the route. No packet is sent.
//
// ## Source Address Preference (Linux)
//
// For IPv6 the kernel may pick a temporary (RFC 4941) or a public address.
// On Linux the preference is set with the RFC 5014 `IPV6_ADDR_PREFERENCES`
// socket option before connecting. Elsewhere the kernel default applies.
//
// ## Absence
//
// Any failure (no route, no address of the family, socket errors) means the
// host has no address of that family, which the updater turns into a
// deletion of the record. It is reported as `Discovery::Unavailable`, never
// as an error.

use async_trait::async_trait;
use r53ddns_core::traits::{AddressFamily, AddressSource, Discovery};
use r53ddns_core::Result;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;

/// Public resolver used to select the IPv4 route
pub const DEFAULT_V4_TARGET: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 53);

/// Public resolver used to select the IPv6 route
pub const DEFAULT_V6_TARGET: SocketAddr = SocketAddr::new(
    IpAddr::V6(Ipv6Addr::new(0x2001, 0x4860, 0x4860, 0, 0, 0, 0, 0x8888)),
    53,
);

#[cfg(target_os = "linux")]
mod sockopt {
    //! RFC 5014 constants, not exported by libc

    pub const IPV6_ADDR_PREFERENCES: libc::c_int = 72;
    pub const IPV6_PREFER_SRC_TMP: libc::c_int = 0x1;
    pub const IPV6_PREFER_SRC_PUBLIC: libc::c_int = 0x2;
}

/// Which IPv6 source address the kernel should prefer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourcePreference {
    /// Stable, publicly advertised address
    Public,
    /// Temporary privacy address (RFC 4941)
    Temporary,
}

/// Local address source based on the UDP connect trick
#[derive(Debug, Clone)]
pub struct SocketAddressSource {
    family: AddressFamily,
    target: SocketAddr,
    preference: Option<SourcePreference>,
}

impl SocketAddressSource {
    /// IPv4 source probing the route towards [`DEFAULT_V4_TARGET`]
    pub fn v4() -> Self {
        Self {
            family: AddressFamily::V4,
            target: DEFAULT_V4_TARGET,
            preference: None,
        }
    }

    /// IPv6 source probing the route towards [`DEFAULT_V6_TARGET`]
    pub fn v6(prefer_temporary: bool) -> Self {
        let preference = if prefer_temporary {
            SourcePreference::Temporary
        } else {
            SourcePreference::Public
        };
        Self {
            family: AddressFamily::V6,
            target: DEFAULT_V6_TARGET,
            preference: Some(preference),
        }
    }

    /// Resolve the route towards another target of the same family
    pub fn with_target(mut self, target: SocketAddr) -> Self {
        self.target = target;
        self
    }

    async fn local_address(&self) -> io::Result<IpAddr> {
        let bind_addr: SocketAddr = match self.family {
            AddressFamily::V4 => (Ipv4Addr::UNSPECIFIED, 0).into(),
            AddressFamily::V6 => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };

        let socket = UdpSocket::bind(bind_addr).await?;

        if let Some(preference) = self.preference
            && let Err(e) = set_source_preference(&socket, preference)
        {
            tracing::warn!(
                "Could not set IPv6 source preference {:?}, using kernel default: {}",
                preference,
                e
            );
        }

        socket.connect(self.target).await?;
        Ok(socket.local_addr()?.ip())
    }
}

#[async_trait]
impl AddressSource for SocketAddressSource {
    async fn discover(&self) -> Result<Discovery> {
        match self.local_address().await {
            Ok(ip) if ip.is_unspecified() => Ok(Discovery::unavailable(format!(
                "no local {} address routes to {}",
                self.family, self.target
            ))),
            Ok(ip) => {
                tracing::debug!("Route to {} uses local address {}", self.target, ip);
                Ok(Discovery::Found(ip))
            }
            Err(e) => {
                tracing::debug!("{} route lookup towards {} failed: {}", self.family, self.target, e);
                Ok(Discovery::unavailable(e.to_string()))
            }
        }
    }

    fn family(&self) -> AddressFamily {
        self.family
    }

    fn source_name(&self) -> &'static str {
        "socket"
    }
}

#[cfg(target_os = "linux")]
fn set_source_preference(socket: &UdpSocket, preference: SourcePreference) -> io::Result<()> {
    use std::os::fd::AsRawFd;

    let value: libc::c_int = match preference {
        SourcePreference::Public => sockopt::IPV6_PREFER_SRC_PUBLIC,
        SourcePreference::Temporary => sockopt::IPV6_PREFER_SRC_TMP,
    };

    // SAFETY: the descriptor is owned by `socket` and stays open for the
    // call; `value` outlives the call and its size is passed alongside.
    let rc = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::IPPROTO_IPV6,
            sockopt::IPV6_ADDR_PREFERENCES,
            &value as *const libc::c_int as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };

    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(target_os = "linux"))]
fn set_source_preference(_socket: &UdpSocket, preference: SourcePreference) -> io::Result<()> {
    match preference {
        // Kernel default everywhere we know of
        SourcePreference::Public => Ok(()),
        SourcePreference::Temporary => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "IPv6 source address preference is only supported on Linux",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let v4 = SocketAddressSource::v4();
        assert_eq!(v4.family(), AddressFamily::V4);
        assert_eq!(v4.target, DEFAULT_V4_TARGET);
        assert_eq!(v4.preference, None);

        let v6 = SocketAddressSource::v6(true);
        assert_eq!(v6.family(), AddressFamily::V6);
        assert_eq!(v6.target.to_string(), "[2001:4860:4860::8888]:53");
        assert_eq!(v6.preference, Some(SourcePreference::Temporary));

        assert_eq!(
            SocketAddressSource::v6(false).preference,
            Some(SourcePreference::Public)
        );
    }

    #[tokio::test]
    async fn test_loopback_route_yields_loopback_address() {
        let source = SocketAddressSource::v4().with_target("127.0.0.1:53".parse().unwrap());

        let discovery = source.discover().await.unwrap();
        assert_eq!(discovery, Discovery::Found(IpAddr::V4(Ipv4Addr::LOCALHOST)));
    }

    #[tokio::test]
    async fn test_mismatched_target_is_unavailable_not_error() {
        // An IPv4 socket cannot connect to an IPv6 destination
        let source = SocketAddressSource::v4().with_target("[::1]:53".parse().unwrap());

        let discovery = source.discover().await.unwrap();
        assert!(matches!(discovery, Discovery::Unavailable { .. }));
    }
}
