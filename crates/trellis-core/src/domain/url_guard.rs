//! Download target gating.
//!
//! A schema must not be able to make the engine reach internal hosts, so
//! every URL is checked before a fetch is attempted:
//!
//! - HTTPS only
//! - no loopback, private, link-local, CGNAT, broadcast or unspecified IPs
//!   (IPv4, IPv6 and IPv4-mapped IPv6)
//! - no `localhost`, `*.local`, `*.internal` names
//! - no hostnames embedding a non-public IPv4 (`10.0.0.5.attacker.com`)
//! - no wildcard-DNS rebinding services (`nip.io`, `sslip.io`, ...)

use std::net::{Ipv4Addr, Ipv6Addr};

use url::{Host, Url};

use super::error::DomainError;

const REBINDING_DOMAINS: &[&str] = &[
    "nip.io",
    "sslip.io",
    "xip.io",
    "localtest.me",
    "lvh.me",
    "vcap.me",
    "lacolhost.com",
    "1u.ms",
    "rbndr.us",
];

const INTERNAL_SUFFIXES: &[&str] = &[".localhost", ".local", ".internal", ".localdomain"];

/// Parse and vet a download URL.
pub fn validate_download_url(raw: &str) -> Result<Url, DomainError> {
    let url = Url::parse(raw.trim()).map_err(|e| DomainError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    let unsafe_url = |reason: &str| DomainError::UnsafeUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    if url.scheme() != "https" {
        return Err(unsafe_url("only HTTPS URLs are allowed"));
    }

    match url.host() {
        None => Err(unsafe_url("URL has no host")),
        Some(Host::Ipv4(ip)) => match ipv4_block_reason(ip) {
            Some(reason) => Err(unsafe_url(reason)),
            None => Ok(url),
        },
        Some(Host::Ipv6(ip)) => match ipv6_block_reason(ip) {
            Some(reason) => Err(unsafe_url(reason)),
            None => Ok(url),
        },
        Some(Host::Domain(domain)) => match domain_block_reason(domain) {
            Some(reason) => Err(unsafe_url(&reason)),
            None => Ok(url),
        },
    }
}

fn ipv4_block_reason(ip: Ipv4Addr) -> Option<&'static str> {
    let [a, b, ..] = ip.octets();
    if ip.is_loopback() {
        Some("loopback addresses are not allowed")
    } else if ip.is_private() {
        Some("private network addresses are not allowed")
    } else if ip.is_link_local() {
        Some("link-local addresses are not allowed")
    } else if ip.is_broadcast() || ip.is_multicast() {
        Some("broadcast and multicast addresses are not allowed")
    } else if ip.is_unspecified() || a == 0 {
        Some("unspecified addresses are not allowed")
    } else if a == 100 && (64..128).contains(&b) {
        Some("carrier-grade NAT addresses are not allowed")
    } else {
        None
    }
}

fn ipv6_block_reason(ip: Ipv6Addr) -> Option<&'static str> {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return ipv4_block_reason(v4);
    }
    let first = ip.segments()[0];
    if ip.is_loopback() {
        Some("loopback addresses are not allowed")
    } else if ip.is_unspecified() {
        Some("unspecified addresses are not allowed")
    } else if first & 0xfe00 == 0xfc00 {
        Some("unique local addresses are not allowed")
    } else if first & 0xffc0 == 0xfe80 {
        Some("link-local addresses are not allowed")
    } else if ip.is_multicast() {
        Some("multicast addresses are not allowed")
    } else {
        None
    }
}

fn domain_block_reason(domain: &str) -> Option<String> {
    let domain = domain.trim_end_matches('.').to_ascii_lowercase();

    if domain == "localhost" || INTERNAL_SUFFIXES.iter().any(|s| domain.ends_with(s)) {
        return Some("internal host names are not allowed".into());
    }
    if let Some(service) = REBINDING_DOMAINS
        .iter()
        .find(|d| domain == **d || domain.ends_with(&format!(".{d}")))
    {
        return Some(format!("DNS rebinding service '{service}' is not allowed"));
    }
    if let Some(ip) = embedded_ipv4(&domain) {
        if let Some(reason) = ipv4_block_reason(ip) {
            return Some(format!("host name embeds {ip}: {reason}"));
        }
    }
    None
}

/// Find an IPv4 address spelled inside a host name, either as four dotted
/// numeric labels (`10.0.0.5.evil.com`) or one dashed label
/// (`10-0-0-5.evil.com`).
fn embedded_ipv4(domain: &str) -> Option<Ipv4Addr> {
    let labels: Vec<&str> = domain.split('.').collect();
    let dotted = labels.windows(4).find_map(|w| w.join(".").parse::<Ipv4Addr>().ok());
    dotted.or_else(|| {
        labels
            .iter()
            .find_map(|label| label.replace('-', ".").parse::<Ipv4Addr>().ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(url: &str) -> bool {
        validate_download_url(url).is_err()
    }

    #[test]
    fn accepts_public_https() {
        let url = validate_download_url("https://example.com/file.docx").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert!(validate_download_url("https://8.8.8.8/x").is_ok());
    }

    #[test]
    fn rejects_plain_http() {
        assert!(matches!(
            validate_download_url("http://example.com/file"),
            Err(DomainError::UnsafeUrl { .. })
        ));
    }

    #[test]
    fn rejects_internal_ipv4() {
        for url in [
            "https://127.0.0.1/",
            "https://192.168.1.1/",
            "https://10.0.0.5/",
            "https://172.16.0.1/",
            "https://169.254.169.254/latest/meta-data",
            "https://100.64.0.1/",
            "https://0.0.0.0/",
            "https://255.255.255.255/",
            "https://0x7f000001/",
        ] {
            assert!(rejected(url), "accepted {url}");
        }
        assert!(!rejected("https://100.128.0.1/"));
    }

    #[test]
    fn rejects_internal_ipv6() {
        for url in [
            "https://[::1]/",
            "https://[fd00::1]/",
            "https://[fe80::1]/",
            "https://[::ffff:127.0.0.1]/",
        ] {
            assert!(rejected(url), "accepted {url}");
        }
    }

    #[test]
    fn rejects_internal_names() {
        assert!(rejected("https://localhost/"));
        assert!(rejected("https://printer.local/"));
        assert!(rejected("https://db.internal/"));
    }

    #[test]
    fn rejects_embedded_private_ips() {
        assert!(rejected("https://10.0.0.5.attacker.com/"));
        assert!(rejected("https://127-0-0-1.attacker.com/"));
        assert!(!rejected("https://8.8.8.8.dns.example.com/"));
    }

    #[test]
    fn rejects_rebinding_services() {
        assert!(rejected("https://foo.nip.io/"));
        assert!(rejected("https://sslip.io/"));
        assert!(rejected("https://a.b.xip.io/"));
    }

    #[test]
    fn malformed_urls_are_invalid_not_unsafe() {
        assert!(matches!(
            validate_download_url("not a url"),
            Err(DomainError::InvalidUrl { .. })
        ));
    }
}
