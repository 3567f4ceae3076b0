use crate::error::ProxyError;
use std::net::IpAddr;
use url::{Host, Url};

/// Validate a user-supplied `url`/`variant` target before fetching it.
///
/// Accepts only absolute `http://`/`https://` URLs whose host is not a
/// private or reserved IP literal (SSRF guard). Hostnames are accepted
/// without DNS resolution; DNS rebinding is a known limitation here.
/// `allow_private` disables the IP-literal check for deployments that
/// proxy origins on their own network (and for test harnesses).
///
/// # Errors
/// Returns [`ProxyError::BadRequest`] for relative or malformed URLs,
/// non-HTTP(S) schemes, and loopback/link-local/private address literals.
pub fn validate_target_url(url: &str, allow_private: bool) -> Result<(), ProxyError> {
    let parsed =
        Url::parse(url).map_err(|_| ProxyError::BadRequest(format!("Invalid URL: {url}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(ProxyError::BadRequest(format!(
                "Scheme '{scheme}' not allowed, only http/https"
            )));
        }
    }

    let host = parsed
        .host()
        .ok_or_else(|| ProxyError::BadRequest(format!("No host in URL: {url}")))?;

    if allow_private {
        return Ok(());
    }

    // Hostnames are accepted without resolving; only IP literals are checked.
    let blocked: Option<IpAddr> = match host {
        Host::Ipv4(ip)
            if ip.is_private()
                || ip.is_loopback()
                || ip.is_link_local()
                || ip.octets()[0] == 0 =>
        {
            Some(ip.into())
        }
        Host::Ipv6(ip)
            if ip.is_loopback()
                // fe80::/10 link-local, fc00::/7 unique-local
                || (ip.segments()[0] & 0xffc0) == 0xfe80
                || (ip.segments()[0] & 0xfe00) == 0xfc00 =>
        {
            Some(ip.into())
        }
        _ => None,
    };

    if let Some(ip) = blocked {
        return Err(ProxyError::BadRequest(format!(
            "Private or reserved address not allowed: {ip}"
        )));
    }

    Ok(())
}
