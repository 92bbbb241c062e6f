/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - routes: RouteTable, verifier: TokenVerifier, proxy: ProxyClient
 * - 起動時に一度だけ組み立て、以後は read-only (Clone cheap, lock 不要)
 */
use std::sync::Arc;

use crate::config::Config;
use crate::services::{
    auth::TokenVerifier,
    gateway::{ProxyClient, RouteTable},
};

#[derive(Clone, Debug)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub verifier: Arc<TokenVerifier>,
    pub proxy: ProxyClient,
}

impl AppState {
    pub fn new(routes: Arc<RouteTable>, verifier: Arc<TokenVerifier>, proxy: ProxyClient) -> Self {
        Self {
            routes,
            verifier,
            proxy,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let routes = Arc::new(RouteTable::from_backends(&config.backends));
        let verifier = Arc::new(TokenVerifier::new(
            &config.jwt_secret,
            config.jwt_leeway_seconds,
        ));
        let proxy = ProxyClient::new(config.proxy_timeout, config.body_limit_bytes)?;

        Ok(Self::new(routes, verifier, proxy))
    }
}
