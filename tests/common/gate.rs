//! Gate harness wired to the stub servers.

use std::net::SocketAddr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use sharegate::config::{
    Config, OidcConfig, ServerConfig, SessionConfig, TokensConfig, UpstreamConfig,
};
use sharegate::http::{AppState, build_router};
use sharegate::security::SessionStore;
use sharegate_token::{ShareLink, TokenGenerator};

use super::idp::TestIdp;
use super::upstream::TestUpstream;

pub const SESSION_COOKIE: &str = "sharegate_session";
pub const CLIENT_ID: &str = "gate-test";

const TOKEN_KEY: [u8; 32] = [0x5a; 32];

/// A gate running on its own listener, configured against stub servers.
pub struct TestGate {
    pub base_url: String,
    pub client: reqwest::Client,
    config: Config,
}

impl TestGate {
    pub async fn spawn(idp: &TestIdp, upstream: &TestUpstream) -> Self {
        Self::spawn_with_domain(idp, upstream, None).await
    }

    pub async fn spawn_with_domain(
        idp: &TestIdp,
        upstream: &TestUpstream,
        allowed_domain: Option<&str>,
    ) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}");

        let config = Config {
            server: ServerConfig {
                listen: addr,
                public_url: base_url.clone(),
                metrics_port: Some(0),
                protected_roots: vec!["album".to_string()],
            },
            upstream: UpstreamConfig {
                url: upstream.base_url.clone(),
            },
            oidc: OidcConfig {
                issuer_url: idp.base_url.clone(),
                client_id: CLIENT_ID.to_string(),
                client_secret: "test-client-secret".to_string(),
                scopes: vec!["openid".to_string(), "email".to_string()],
                allowed_domain: allowed_domain.unwrap_or_default().to_string(),
                http_timeout_secs: 5,
            },
            session: SessionConfig {
                authentication_key: STANDARD.encode([0x41u8; 32]),
                encryption_key: STANDARD.encode([0x42u8; 32]),
                cookie_name: SESSION_COOKIE.to_string(),
                cookie_max_age_secs: 3600,
                secure_cookies: false,
            },
            tokens: TokensConfig {
                authentication_key: STANDARD.encode(TOKEN_KEY),
                per_album_validity_days: 15,
                global_validity_days: 7,
            },
        };

        let state = AppState::from_config(config.clone())
            .await
            .expect("gate assembly against stub servers");
        let app = build_router(state);
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            base_url,
            client,
            config,
        }
    }

    /// Mint a share link against this gate's token key, dated now.
    pub fn mint_link(&self, subject: &str, entitlement: &str) -> String {
        self.mint_link_at(subject, entitlement, Utc::now())
    }

    /// Mint a share link with a chosen generation time.
    pub fn mint_link_at(
        &self,
        subject: &str,
        entitlement: &str,
        when: DateTime<Utc>,
    ) -> String {
        let generator = TokenGenerator::new(&TOKEN_KEY);
        ShareLink::mint(
            &generator,
            &self.config.server.public_url,
            subject,
            entitlement,
            when,
        )
        .to_url()
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.get_url(&format!("{}{path}", self.base_url)).await
    }

    pub async fn get_url(&self, url: &str) -> reqwest::Response {
        self.client.get(url).send().await.unwrap()
    }

    pub async fn get_with_cookie(&self, path: &str, cookie: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{path}", self.base_url))
            .header("cookie", format!("{SESSION_COOKIE}={cookie}"))
            .send()
            .await
            .unwrap()
    }

    /// A session store sharing this gate's keys, for crafting cookies.
    pub fn session_store(&self) -> SessionStore {
        SessionStore::from_config(&self.config.session).unwrap()
    }
}

/// Extract the bare value from an issued `Set-Cookie` header.
pub fn cookie_value(header: &http::HeaderValue) -> String {
    let raw = header.to_str().unwrap();
    let pair = raw.split(';').next().unwrap_or(raw);
    pair.split_once('=')
        .map(|(_, value)| value.to_string())
        .unwrap_or_default()
}

/// Pull the gate's session cookie value out of a response, if it set one.
pub fn session_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| {
            v.strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
                .map(|rest| rest.split(';').next().unwrap_or(rest).to_string())
        })
}

/// Pull one query parameter out of an absolute URL.
pub fn query_value(url: &str, name: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key == name {
            return Some(urlencoding::decode(value).ok()?.into_owned());
        }
    }
    None
}
