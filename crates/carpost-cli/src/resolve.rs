//! # Resolve Subcommand
//!
//! Turns a bare identifier, an `ipfs://` URI or an HTTP(S) URL into the URL
//! a browser can fetch. Works offline.

use anyhow::{Context, Result};
use clap::Args;

use carpost_client::config::DEFAULT_GATEWAY;
use carpost_core::{gatewayize, to_uri, Identifier};

/// Arguments for the `carpost resolve` subcommand.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Identifier, `ipfs://<cid>/<path>` URI or HTTP(S) URL.
    #[arg(value_name = "REFERENCE")]
    pub reference: String,

    /// Gateway host or URL.
    #[arg(long, env = "CARPOST_GATEWAY", default_value = DEFAULT_GATEWAY)]
    pub gateway: String,
}

/// Execute the resolve subcommand.
pub fn run_resolve(args: &ResolveArgs) -> Result<u8> {
    println!("{}", resolve_reference(&args.reference, &args.gateway)?);
    Ok(0)
}

/// Resolve `reference` through `gateway`. Bare identifiers address the root
/// of their DAG.
pub fn resolve_reference(reference: &str, gateway: &str) -> Result<String> {
    let reference = match reference.trim().parse::<Identifier>() {
        Ok(cid) => to_uri(&cid).to_string(),
        Err(_) => reference.trim().to_string(),
    };
    let url = gatewayize(&reference, gateway).with_context(|| format!("cannot resolve {reference}"))?;
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CID: &str = "bafkreifzjut3te2nhyekklss27nh3k72ysco7y32koao5eei66wof36n5e";

    #[test]
    fn bare_identifier_resolves_to_root() {
        assert_eq!(
            resolve_reference(CID, "w3s.link").unwrap(),
            format!("https://w3s.link/ipfs/{CID}/")
        );
    }

    #[test]
    fn content_uri_keeps_its_path() {
        let uri = format!("ipfs://{CID}/cat.png");
        assert_eq!(
            resolve_reference(&uri, "https://gateway.example.org").unwrap(),
            format!("https://gateway.example.org/ipfs/{CID}/cat.png")
        );
    }

    #[test]
    fn http_url_passes_through() {
        assert_eq!(
            resolve_reference("https://cdn.example.org/cat.png", "w3s.link").unwrap(),
            "https://cdn.example.org/cat.png"
        );
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        assert!(resolve_reference("ftp://example.org/cat.png", "w3s.link").is_err());
        assert!(resolve_reference("not a reference", "w3s.link").is_err());
    }
}
