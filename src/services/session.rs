// src/services/session.rs

//! Session/auth gateway for a booking portal.
//!
//! `Transport` is the raw HTTP capability (cookies persist across calls);
//! `SessionGateway` logs in once and issues date-scoped availability calls
//! with the resulting context.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Facility, PortalConfig};

/// Login identifier and secret. The secret never appears in `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"***")
            .finish()
    }
}

/// Status and body of one upstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Proof of a completed login, shared read-only by every call of a run.
#[derive(Debug, Clone)]
pub struct AuthContext {
    identifier: String,
    authenticated_at: DateTime<Utc>,
}

impl AuthContext {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            authenticated_at: Utc::now(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn authenticated_at(&self) -> DateTime<Utc> {
        self.authenticated_at
    }
}

/// One date-scoped availability query.
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityRequest<'a> {
    pub facility: &'a Facility,
    pub date: NaiveDate,
}

impl AvailabilityRequest<'_> {
    /// `"{facility_id} {date}"`, used in logs and errors.
    pub fn context(&self) -> String {
        format!("{} {}", self.facility.id, self.date)
    }
}

/// Raw HTTP capability with a persistent cookie jar.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<RawResponse>;

    async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        headers: &BTreeMap<String, String>,
    ) -> Result<RawResponse>;
}

/// `reqwest`-backed transport. Build the client with
/// [`crate::utils::http::create_client`] so cookies are kept.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<RawResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::transport(url, e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::transport(url, e))?;
        Ok(RawResponse::new(status, body))
    }

    async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
        headers: &BTreeMap<String, String>,
    ) -> Result<RawResponse> {
        let mut request = self.client.post(url).form(form);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request
            .send()
            .await
            .map_err(|e| AppError::transport(url, e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::transport(url, e))?;
        Ok(RawResponse::new(status, body))
    }
}

/// Authenticated access to a portal.
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// Log in. Failure is fatal to the run.
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthContext>;

    /// Issue one availability query. Non-2xx answers are transport errors.
    async fn call(
        &self,
        context: &AuthContext,
        request: &AvailabilityRequest<'_>,
    ) -> Result<RawResponse>;
}

/// Decide whether a login response means success.
///
/// The portal gives no reliable signal, so this is a heuristic: the status
/// must be accepted, and the body must carry none of the configured failure
/// fields (JSON) or failure markers (text). Returns the reason on failure.
pub fn check_login(portal: &PortalConfig, response: &RawResponse) -> std::result::Result<(), String> {
    if !portal.accepted_statuses.contains(&response.status) {
        return Err(format!("HTTP {}", response.status));
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&response.body) {
        for key in &portal.failure_fields {
            if let Some(value) = map.get(key).filter(|v| !v.is_null()) {
                return Err(format!("{key}: {value}"));
            }
        }
        return Ok(());
    }

    let body = response.body.to_lowercase();
    match portal
        .failure_markers
        .iter()
        .find(|marker| body.contains(&marker.to_lowercase()))
    {
        Some(marker) => Err(format!("response contains '{marker}'")),
        None => Ok(()),
    }
}

/// Gateway for a portal described by `PortalConfig`.
pub struct PortalGateway<T: Transport> {
    transport: T,
    portal: PortalConfig,
    landing_url: Option<Url>,
    login_url: Url,
    availability_url: Url,
}

impl<T: Transport> PortalGateway<T> {
    pub fn new(transport: T, portal: PortalConfig) -> Result<Self> {
        let base = Url::parse(&portal.base_url)?;
        let landing_url = portal
            .landing_path
            .as_deref()
            .map(|path| base.join(path))
            .transpose()?;
        let login_url = base.join(&portal.login_path)?;
        let availability_url = base.join(&portal.availability_path)?;
        Ok(Self {
            transport,
            portal,
            landing_url,
            login_url,
            availability_url,
        })
    }

    /// Form body of an availability query.
    fn query_form(&self, request: &AvailabilityRequest<'_>) -> Vec<(String, String)> {
        let mut form = vec![
            (
                self.portal.facility_field.clone(),
                request.facility.id.clone(),
            ),
            (
                self.portal.date_field.clone(),
                request.date.format(&self.portal.date_format).to_string(),
            ),
        ];
        form.extend(
            self.portal
                .extra_form
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        form
    }
}

#[async_trait]
impl<T: Transport> SessionGateway for PortalGateway<T> {
    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthContext> {
        if let Some(landing) = &self.landing_url {
            let page = self
                .transport
                .get(landing.as_str())
                .await
                .map_err(|e| AppError::auth(format!("landing page failed: {e}")))?;
            log::debug!("Landing page {} answered HTTP {}", landing, page.status);
        }

        let form = vec![
            (
                self.portal.id_field.clone(),
                credentials.identifier.clone(),
            ),
            (self.portal.secret_field.clone(), credentials.secret.clone()),
        ];

        let response = self
            .transport
            .post_form(self.login_url.as_str(), &form, &self.portal.headers)
            .await
            .map_err(|e| AppError::auth(format!("login request failed: {e}")))?;

        check_login(&self.portal, &response).map_err(AppError::auth)?;
        log::info!("Logged in to {} as {}", self.login_url, credentials.identifier);
        Ok(AuthContext::new(credentials.identifier.clone()))
    }

    async fn call(
        &self,
        _context: &AuthContext,
        request: &AvailabilityRequest<'_>,
    ) -> Result<RawResponse> {
        let response = self
            .transport
            .post_form(
                self.availability_url.as_str(),
                &self.query_form(request),
                &self.portal.headers,
            )
            .await?;

        if !response.is_success() {
            return Err(AppError::transport(
                request.context(),
                format!("HTTP {}", response.status),
            ));
        }
        Ok(response)
    }
}
