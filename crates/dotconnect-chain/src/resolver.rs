//! Candidate endpoint resolution.
//!
//! The resolved order is the failover priority order: the `default` source
//! comes first (best known endpoint first), then `public`, then WebSocket
//! URLs that network configuration filed under the `http` transport.

use dotconnect_core::NetworkDescriptor;

/// True when the URL uses a WebSocket scheme.
pub fn is_websocket_url(url: &str) -> bool {
    let url = url.trim().to_ascii_lowercase();
    url.starts_with("wss://") || url.starts_with("ws://")
}

/// Resolve the ordered, de-duplicated list of WebSocket endpoints for a network.
///
/// An empty list is a valid result.
pub fn resolve_endpoints(network: &NetworkDescriptor) -> Vec<String> {
    let default = &network.rpc_urls.default;
    let public = network.rpc_urls.public.as_ref();

    let mut endpoints = Vec::new();

    push_all(&mut endpoints, &default.web_socket, |_| true);
    if let Some(public) = public {
        push_all(&mut endpoints, &public.web_socket, |_| true);
    }

    for set in std::iter::once(default).chain(public) {
        push_all(&mut endpoints, &set.http, is_websocket_url);
    }

    endpoints
}

fn push_all(out: &mut Vec<String>, urls: &[String], accept: impl Fn(&str) -> bool) {
    for url in urls {
        let url = url.trim();
        if url.is_empty() || !accept(url) {
            continue;
        }
        if !out.iter().any(|e| e == url) {
            out.push(url.to_string());
        }
    }
}
