// src/middleware/rate_limit.rs
//
// Limite de requisições em janela fixa, em memória e por processo. Com várias
// instâncias o limite efetivo é multiplicado pelo número de réplicas.

use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::{common::error::AppError, config::AppState};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub scope: &'static str,
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    /// Login, cadastro e troca de senha.
    pub const AUTH: Self = Self { scope: "auth", max_requests: 5, window: Duration::from_secs(15 * 60) };
    pub const PASSWORD_RESET: Self = Self { scope: "password-reset", max_requests: 3, window: Duration::from_secs(60 * 60) };
    pub const GUEST: Self = Self { scope: "guest", max_requests: 5, window: Duration::from_secs(15 * 60) };
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: u64, reset_at: i64 },
}

#[derive(Clone, Default)]
pub struct RateLimiter {
    windows: Arc<DashMap<(&'static str, String), Window>>,
    trusted_proxies: Arc<[IpAddr]>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Só os proxies listados podem informar o IP do cliente via cabeçalho.
    pub fn with_trusted_proxies(trusted_proxies: Vec<IpAddr>) -> Self {
        Self {
            windows: Arc::default(),
            trusted_proxies: trusted_proxies.into(),
        }
    }

    pub fn client_ip(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        client_ip(headers, peer, &self.trusted_proxies)
    }

    pub fn check(&self, policy: RateLimitPolicy, client: &str) -> RateLimitDecision {
        self.check_at(policy, client, Utc::now())
    }

    fn check_at(&self, policy: RateLimitPolicy, client: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let window_len = chrono::Duration::from_std(policy.window).unwrap_or(chrono::Duration::zero());

        let mut entry = self
            .windows
            .entry((policy.scope, client.to_string()))
            .or_insert(Window { count: 0, reset_at: now + window_len });

        if entry.reset_at <= now {
            *entry = Window { count: 0, reset_at: now + window_len };
        }

        if entry.count >= policy.max_requests {
            let retry_after = (entry.reset_at - now).num_seconds().max(1) as u64;
            return RateLimitDecision::Limited { retry_after, reset_at: entry.reset_at.timestamp() };
        }

        entry.count += 1;
        RateLimitDecision::Allowed { remaining: policy.max_requests - entry.count }
    }

    /// Remove janelas expiradas. Retorna quantas foram removidas.
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Utc::now())
    }

    fn cleanup_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| window.reset_at > now);
        before - self.windows.len()
    }

    pub fn spawn_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                let removed = limiter.cleanup();
                if removed > 0 {
                    tracing::debug!(removed, "Janelas de rate limit expiradas removidas");
                }
            }
        })
    }
}

/// IP do cliente. Por padrão é o endereço do socket; cabeçalhos de proxy só
/// valem quando o socket é um proxy confiável, e então vale o salto mais à
/// direita do X-Forwarded-For que não seja outro proxy confiável.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trusted_proxies: &[IpAddr]) -> String {
    let Some(peer) = peer.map(|addr| addr.ip()) else {
        return "unknown".to_string();
    };
    if !trusted_proxies.contains(&peer) {
        return peer.to_string();
    }

    let mut hops = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .collect::<Vec<_>>();
    hops.reverse();

    for hop in hops {
        match hop.parse::<IpAddr>() {
            Ok(ip) if trusted_proxies.contains(&ip) => continue,
            Ok(ip) => return ip.to_string(),
            // Salto ilegível: não dá para confiar no que vem antes dele.
            Err(_) => return peer.to_string(),
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<IpAddr>().ok())
        .unwrap_or(peer)
        .to_string()
}

/// Extrator com o IP do cliente, para handlers públicos que registram origem.
pub struct ClientIp(pub String);

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientIp(state.rate_limiter.client_ip(&parts.headers, peer)))
    }
}

async fn enforce(
    limiter: &RateLimiter,
    policy: RateLimitPolicy,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = limiter.client_ip(request.headers(), peer);

    match limiter.check(policy, &client) {
        RateLimitDecision::Allowed { remaining } => {
            let mut response = next.run(request).await;
            response
                .headers_mut()
                .insert("x-ratelimit-remaining", HeaderValue::from(remaining));
            Ok(response)
        }
        RateLimitDecision::Limited { retry_after, reset_at } => {
            tracing::warn!(scope = policy.scope, client = %client, "⚠️ Rate limit excedido");
            Err(AppError::RateLimited { retry_after, reset_at })
        }
    }
}

pub async fn limit_auth(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, AppError> {
    enforce(&state.rate_limiter, RateLimitPolicy::AUTH, request, next).await
}

pub async fn limit_password_reset(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    enforce(&state.rate_limiter, RateLimitPolicy::PASSWORD_RESET, request, next).await
}

pub async fn limit_guest(State(state): State<AppState>, request: Request, next: Next) -> Result<Response, AppError> {
    enforce(&state.rate_limiter, RateLimitPolicy::GUEST, request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_budget_until_window_resets() {
        let limiter = RateLimiter::new();
        let policy = RateLimitPolicy::PASSWORD_RESET;
        let now = Utc::now();

        for expected in [2, 1, 0] {
            assert_eq!(
                limiter.check_at(policy, "10.0.0.1", now),
                RateLimitDecision::Allowed { remaining: expected }
            );
        }

        let later = now + chrono::Duration::minutes(10);
        match limiter.check_at(policy, "10.0.0.1", later) {
            RateLimitDecision::Limited { retry_after, .. } => assert_eq!(retry_after, 50 * 60),
            other => panic!("esperava bloqueio, veio {:?}", other),
        }

        // Outro cliente e outro escopo têm orçamento próprio
        assert!(matches!(limiter.check_at(policy, "10.0.0.2", later), RateLimitDecision::Allowed { .. }));
        assert!(matches!(
            limiter.check_at(RateLimitPolicy::AUTH, "10.0.0.1", later),
            RateLimitDecision::Allowed { remaining: 4 }
        ));

        let after_window = now + chrono::Duration::minutes(61);
        assert_eq!(
            limiter.check_at(policy, "10.0.0.1", after_window),
            RateLimitDecision::Allowed { remaining: 2 }
        );
    }

    #[test]
    fn cleanup_drops_only_expired_windows() {
        let limiter = RateLimiter::new();
        let now = Utc::now();
        limiter.check_at(RateLimitPolicy::AUTH, "a", now);
        limiter.check_at(RateLimitPolicy::PASSWORD_RESET, "a", now);

        assert_eq!(limiter.cleanup_at(now + chrono::Duration::minutes(20)), 1);
        assert_eq!(limiter.cleanup_at(now + chrono::Duration::minutes(61)), 1);
        assert_eq!(limiter.cleanup_at(now + chrono::Duration::minutes(62)), 0);
    }

    #[test]
    fn forwarded_headers_are_ignored_from_untrusted_peers() {
        let peer: SocketAddr = "192.168.0.9:5000".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some(peer), &[]), "192.168.0.9");
        assert_eq!(client_ip(&headers, None, &[]), "unknown");

        headers.insert("x-real-ip", "172.16.0.4".parse().unwrap());
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers, Some(peer), &[]), "192.168.0.9");
    }

    #[test]
    fn trusted_proxy_yields_rightmost_untrusted_hop() {
        let proxy: SocketAddr = "10.0.0.2:443".parse().unwrap();
        let trusted: Vec<IpAddr> = vec!["10.0.0.2".parse().unwrap(), "10.0.0.1".parse().unwrap()];
        let mut headers = HeaderMap::new();

        headers.insert("x-real-ip", "172.16.0.4".parse().unwrap());
        assert_eq!(client_ip(&headers, Some(proxy), &trusted), "172.16.0.4");

        // O primeiro valor é do cliente e pode ser forjado; vale o que o proxy anexou.
        headers.insert("x-forwarded-for", "1.2.3.4, 203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers, Some(proxy), &trusted), "203.0.113.7");

        headers.insert("x-forwarded-for", "lixo, 10.0.0.1".parse().unwrap());
        assert_eq!(client_ip(&headers, Some(proxy), &trusted), "10.0.0.2");
    }

    #[test]
    fn rotating_forwarded_for_from_one_peer_is_still_limited() {
        let limiter = RateLimiter::new();
        let peer: SocketAddr = "198.51.100.1:40000".parse().unwrap();
        let now = Utc::now();

        let limited = (0..50)
            .filter(|i| {
                let mut headers = HeaderMap::new();
                headers.insert("x-forwarded-for", format!("203.0.113.{}", i).parse().unwrap());
                let client = limiter.client_ip(&headers, Some(peer));
                matches!(
                    limiter.check_at(RateLimitPolicy::AUTH, &client, now),
                    RateLimitDecision::Limited { .. }
                )
            })
            .count();

        assert_eq!(limited, 45);
    }
}
