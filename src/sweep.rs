use crate::probe::{check_reachable, Reachability};
use crate::proxy::ProxyTarget;
use log::{info, warn};
use serde::Serialize;
use std::thread;
use std::time::Duration;

/// Status of a single proxy as reported to the console.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProxyStatus {
    pub status: Reachability,
    pub proxy_id: u32,
    pub proxy_name: String,
    pub ip_address: String,
}

impl ProxyStatus {
    pub fn check(proxy: &ProxyTarget, timeout: Duration) -> Self {
        Self {
            status: check_reachable(&proxy.address, proxy.port, timeout),
            proxy_id: proxy.id,
            proxy_name: proxy.name.clone(),
            ip_address: proxy.address.clone(),
        }
    }
}

/// Probes every proxy, or only `proxy_id` when given, on one thread each.
/// Results keep the order of `proxies`.
pub fn sweep(
    proxies: &[ProxyTarget],
    proxy_id: Option<u32>,
    timeout: Duration,
) -> Vec<ProxyStatus> {
    let selected: Vec<&ProxyTarget> = proxies
        .iter()
        .filter(|p| proxy_id.map_or(true, |id| p.id == id))
        .collect();

    let statuses: Vec<ProxyStatus> = thread::scope(|s| {
        let handles: Vec<_> = selected
            .iter()
            .map(|proxy| {
                info!("Checking proxy: {}", proxy.name);
                s.spawn(move || ProxyStatus::check(proxy, timeout))
            })
            .collect();
        handles
            .into_iter()
            .zip(&selected)
            .map(|(handle, proxy)| {
                handle.join().unwrap_or_else(|_| ProxyStatus {
                    status: Reachability::Offline,
                    proxy_id: proxy.id,
                    proxy_name: proxy.name.clone(),
                    ip_address: proxy.address.clone(),
                })
            })
            .collect()
    });

    for status in &statuses {
        match status.status {
            Reachability::Online => info!("Proxy {} is online", status.proxy_name),
            Reachability::Offline => warn!("Proxy {} is OFFLINE", status.proxy_name),
        }
    }
    statuses
}
