//! HTTP client for a running pald
//!
//! ```no_run
//! # async fn demo() -> pald_core::Result<()> {
//! use pald_core::PaldClient;
//!
//! let client = PaldClient::new("localhost", 49200);
//! let port = client.set("web").await?;
//! assert_eq!(client.get("web").await?, port);
//! client.del(port).await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;

use crate::errors::{PaldError, Result};

#[derive(Clone)]
pub struct PaldClient {
    server: String,
    port: u16,
    http: reqwest::Client,
}

impl fmt::Debug for PaldClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaldClient")
            .field("server", &self.server)
            .field("port", &self.port)
            .finish()
    }
}

impl PaldClient {
    pub fn new(server: impl Into<String>, port: u16) -> Self {
        PaldClient {
            server: server.into(),
            port,
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.server, self.port)
    }

    /// Port registered for `name`
    pub async fn get(&self, name: &str) -> Result<u16> {
        let body = self.call("get", &[("service", name.to_string())]).await?;
        parse_port(&body)
    }

    /// Allocate a port from the daemon's pool
    pub async fn set(&self, name: &str) -> Result<u16> {
        self.set_with_addresses(name, &[]).await
    }

    pub async fn set_with_addresses(&self, name: &str, addresses: &[&str]) -> Result<u16> {
        let mut query = vec![("service", name.to_string())];
        if !addresses.is_empty() {
            query.push(("addr", addresses.join(",")));
        }
        let body = self.call("set", &query).await?;
        parse_port(&body)
    }

    /// Register `name` on a specific port
    pub async fn fix(&self, name: &str, port: u16) -> Result<()> {
        self.fix_with_addresses(name, port, &[]).await
    }

    pub async fn fix_with_addresses(&self, name: &str, port: u16, addresses: &[&str]) -> Result<()> {
        let mut query = vec![("service", name.to_string()), ("port", port.to_string())];
        if !addresses.is_empty() {
            query.push(("addr", addresses.join(",")));
        }
        self.call("set", &query).await.map(|_| ())
    }

    /// Release a port; succeeds whether or not it was registered
    pub async fn del(&self, port: u16) -> Result<()> {
        self.call("del", &[("port", port.to_string())]).await.map(|_| ())
    }

    async fn call(&self, verb: &str, query: &[(&str, String)]) -> Result<String> {
        let url = format!("{}/{}", self.base_url(), verb);
        tracing::debug!(%url, ?query, "pald request");

        let response = self.http.get(&url).query(query).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(PaldError::Server {
                server: self.server.clone(),
                port: self.port,
                status: status.as_u16(),
                message: body.trim_end().to_string(),
            });
        }
        Ok(body)
    }
}

fn parse_port(body: &str) -> Result<u16> {
    body.trim()
        .parse::<u16>()
        .map_err(|_| PaldError::InvalidResponse(format!("expected a port, got {:?}", body)))
}
