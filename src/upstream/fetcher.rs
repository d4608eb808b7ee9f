//! Outbound requests to the target URL.
//!
//! # Responsibilities
//! - Hold one client that follows redirects and one that returns them
//! - Drop request bodies for GET and HEAD
//! - Stream other request bodies upstream unchanged
//!
//! # Design Decisions
//! - No retries: a failed fetch surfaces immediately
//! - Redirect following uses the library's standard limit
//! - Dropping the returned future abandons the request

use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Method};
use reqwest::redirect::Policy;
use url::Url;

use crate::config::{TimeoutConfig, UpstreamConfig};

/// Issues sanitized requests to arbitrary http(s) targets.
#[derive(Debug, Clone)]
pub struct UpstreamFetcher {
    following: reqwest::Client,
    manual: reqwest::Client,
}

impl UpstreamFetcher {
    pub fn new(config: &UpstreamConfig, timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            following: build_client(config, timeouts, Policy::default())?,
            manual: build_client(config, timeouts, Policy::none())?,
        })
    }

    /// Send one request.
    ///
    /// With `follow_redirects` unset a 3xx is returned as-is, `Location` included.
    pub async fn fetch(
        &self,
        url: &Url,
        method: Method,
        headers: HeaderMap,
        body: Body,
        follow_redirects: bool,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let client = if follow_redirects {
            &self.following
        } else {
            &self.manual
        };

        let carries_body = !(method == Method::GET || method == Method::HEAD);
        let mut request = client.request(method, url.clone()).headers(headers);
        if carries_body {
            request = request.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        request.send().await
    }
}

fn build_client(
    config: &UpstreamConfig,
    timeouts: &TimeoutConfig,
    redirect: Policy,
) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder()
        .redirect(redirect)
        .connect_timeout(Duration::from_secs(timeouts.connect_secs));
    if !config.use_system_proxy {
        builder = builder.no_proxy();
    }
    if let Some(user_agent) = &config.user_agent {
        builder = builder.user_agent(user_agent.clone());
    }
    builder.build()
}
