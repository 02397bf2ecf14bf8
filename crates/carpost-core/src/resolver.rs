//! # Identifier Resolution
//!
//! Pure functions that turn identifiers into content-addressing URIs and
//! rewrite those URIs into HTTP(S) URLs served by a gateway.
//!
//! ## URI Shapes
//!
//! | Input | Output |
//! |-------|--------|
//! | [`to_uri`]`(cid)` | `ipfs://<cid>/` |
//! | `ipfs://<cid>/<path>` through a gateway `host` | `https://<host>/ipfs/<cid>/<path>` |
//! | `http(s)://...` through any gateway | unchanged |
//!
//! The gateway argument is a bare host (`w3s.link`) or a base URL with a
//! scheme (`http://127.0.0.1:8080`); the latter is how local gateways are
//! addressed.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::ParseError;
use crate::identifier::Identifier;

/// URI scheme for content-addressed references.
pub const IPFS_SCHEME: &str = "ipfs";

const IPFS_PREFIX: &str = "ipfs://";

/// A content-addressing URI: an identifier plus a path inside its DAG.
///
/// The path always starts with `/`; the bare root is `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentUri {
    cid: Identifier,
    path: String,
}

impl ContentUri {
    /// The root identifier this URI addresses.
    pub fn cid(&self) -> &Identifier {
        &self.cid
    }

    /// The path inside the DAG, starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Append a relative path segment.
    pub fn join(&self, segment: &str) -> Self {
        let mut path = self.path.clone();
        if !path.ends_with('/') {
            path.push('/');
        }
        path.push_str(segment.trim_start_matches('/'));
        Self {
            cid: self.cid,
            path,
        }
    }
}

impl fmt::Display for ContentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{IPFS_PREFIX}{}{}", self.cid, self.path)
    }
}

impl FromStr for ContentUri {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix(IPFS_PREFIX).ok_or_else(|| ParseError::InvalidUri {
            input: s.to_string(),
            reason: "expected ipfs:// scheme".into(),
        })?;
        let (cid_text, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };
        let cid = cid_text.parse().map_err(|e: ParseError| ParseError::InvalidUri {
            input: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            cid,
            path: path.to_string(),
        })
    }
}

/// Canonical content-addressing URI for an identifier: `ipfs://<cid>/`.
pub fn to_uri(cid: &Identifier) -> ContentUri {
    ContentUri {
        cid: *cid,
        path: "/".into(),
    }
}

/// Rewrite a content URI into a path-style gateway URL.
pub fn to_gateway_url(uri: &ContentUri, gateway: &str) -> Result<Url, ParseError> {
    let base = gateway_base(gateway)?;
    let raw = format!(
        "{}/ipfs/{}{}",
        base.as_str().trim_end_matches('/'),
        uri.cid,
        uri.path
    );
    Url::parse(&raw).map_err(|e| ParseError::InvalidUri {
        input: raw,
        reason: e.to_string(),
    })
}

/// Resolve an arbitrary image/metadata reference to a fetchable URL.
///
/// `ipfs://` references go through the gateway, `http(s)` URLs pass through
/// unchanged, and anything else is rejected.
pub fn gatewayize(reference: &str, gateway: &str) -> Result<Url, ParseError> {
    if reference.starts_with(IPFS_PREFIX) {
        return to_gateway_url(&reference.parse()?, gateway);
    }
    let url = Url::parse(reference).map_err(|e| ParseError::InvalidUri {
        input: reference.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ParseError::UnsupportedScheme(other.to_string())),
    }
}

fn gateway_base(gateway: &str) -> Result<Url, ParseError> {
    let raw = if gateway.contains("://") {
        gateway.to_string()
    } else {
        format!("https://{gateway}")
    };
    let url = Url::parse(&raw).map_err(|e| ParseError::InvalidUri {
        input: gateway.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        "http" | "https" => Err(ParseError::InvalidUri {
            input: gateway.to_string(),
            reason: "gateway has no host".into(),
        }),
        other => Err(ParseError::UnsupportedScheme(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Codec;

    const CID: &str = "bafkreifzjut3te2nhyekklss27nh3k72ysco7y32koao5eei66wof36n5e";

    fn cid() -> Identifier {
        CID.parse().unwrap()
    }

    #[test]
    fn to_uri_has_trailing_slash() {
        assert_eq!(to_uri(&cid()).to_string(), format!("ipfs://{CID}/"));
    }

    #[test]
    fn gateway_url_for_bare_host() {
        let url = to_gateway_url(&to_uri(&cid()), "example.com").unwrap();
        assert_eq!(url.as_str(), format!("https://example.com/ipfs/{CID}/"));
    }

    #[test]
    fn gateway_url_keeps_path() {
        let uri = to_uri(&cid()).join("metadata.json");
        assert_eq!(uri.to_string(), format!("ipfs://{CID}/metadata.json"));
        let url = to_gateway_url(&uri, "w3s.link").unwrap();
        assert_eq!(url.as_str(), format!("https://w3s.link/ipfs/{CID}/metadata.json"));
    }

    #[test]
    fn gateway_with_scheme_and_port() {
        let url = to_gateway_url(&to_uri(&cid()).join("cat.png"), "http://127.0.0.1:8080/").unwrap();
        assert_eq!(url.as_str(), format!("http://127.0.0.1:8080/ipfs/{CID}/cat.png"));
    }

    #[test]
    fn content_uri_round_trip() {
        let text = format!("ipfs://{CID}/dir/cat.png");
        let uri: ContentUri = text.parse().unwrap();
        assert_eq!(uri.cid(), &cid());
        assert_eq!(uri.path(), "/dir/cat.png");
        assert_eq!(uri.to_string(), text);
    }

    #[test]
    fn content_uri_without_path_is_root() {
        let uri: ContentUri = format!("ipfs://{CID}").parse().unwrap();
        assert_eq!(uri.path(), "/");
    }

    #[test]
    fn content_uri_rejects_other_schemes_and_bad_cids() {
        assert!("https://example.com/x".parse::<ContentUri>().is_err());
        assert!("ipfs://abc/x.png".parse::<ContentUri>().is_err());
    }

    #[test]
    fn gatewayize_passes_http_through() {
        let url = gatewayize("https://cdn.example.org/cat.png", "w3s.link").unwrap();
        assert_eq!(url.as_str(), "https://cdn.example.org/cat.png");
    }

    #[test]
    fn gatewayize_rewrites_ipfs() {
        let id = Identifier::compute(Codec::DagCbor, b"dir");
        let url = gatewayize(&format!("ipfs://{id}/cat.png"), "w3s.link").unwrap();
        assert_eq!(url.as_str(), format!("https://w3s.link/ipfs/{id}/cat.png"));
    }

    #[test]
    fn gatewayize_rejects_unknown_scheme() {
        assert_eq!(
            gatewayize("ftp://example.com/cat.png", "w3s.link"),
            Err(ParseError::UnsupportedScheme("ftp".into()))
        );
    }

    #[test]
    fn rejects_gateway_without_host() {
        assert!(to_gateway_url(&to_uri(&cid()), "ftp://example.com").is_err());
        assert!(to_gateway_url(&to_uri(&cid()), "").is_err());
    }
}
