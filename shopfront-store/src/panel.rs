use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shopfront_core::{InboundSource, Provisioner, ProvisioningFault, RepoResult};
use shopfront_shared::pii::Masked;
use shopfront_shared::{Inbound, Order, ProvisionedAccount};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::app_config::PanelConfig;

const BYTES_PER_GB: i64 = 1024 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    #[error("panel request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("panel returned HTTP {0}")]
    Status(u16),
    #[error("panel refused the request: {0}")]
    Rejected(String),
    #[error("panel login failed: {0}")]
    Login(Box<PanelError>),
    #[error("no inbound to provision into")]
    NoInbound,
    #[error("allotment out of range: {0}")]
    Allotment(String),
    #[error("could not encode client settings: {0}")]
    Encode(#[from] serde_json::Error),
}

impl PanelError {
    /// Whether the panel may have acted on the request that failed this way.
    ///
    /// Anything after the request could have left the client is unknown,
    /// except an answer that says it was refused. A duplicate email means an
    /// earlier attempt for the same order got through.
    pub fn may_have_applied(&self) -> bool {
        match self {
            PanelError::Network(e) => !e.is_connect() && !e.is_builder(),
            PanelError::Status(code) => *code >= 500,
            PanelError::Rejected(msg) => msg.to_ascii_lowercase().contains("duplicate email"),
            PanelError::Login(_)
            | PanelError::NoInbound
            | PanelError::Allotment(_)
            | PanelError::Encode(_) => false,
        }
    }
}

/// Envelope of every panel API answer
#[derive(Debug, Deserialize)]
struct PanelResponse<T> {
    success: bool,
    #[serde(default)]
    msg: String,
    obj: Option<T>,
}

#[derive(Debug, Deserialize)]
struct PanelInbound {
    id: i64,
    #[serde(default)]
    remark: String,
    #[serde(default)]
    protocol: String,
    #[serde(default)]
    port: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientSettings {
    id: String,
    email: String,
    enable: bool,
    flow: String,
    limit_ip: i64,
    #[serde(rename = "totalGB")]
    total_gb: i64,
    expiry_time: i64,
    tg_id: i64,
    sub_id: String,
    reset: i64,
}

/// The panel identifies clients by email, so it is derived from the order id.
/// A second provisioning attempt for the same order is refused by the panel.
pub fn account_email(order_id: i64) -> String {
    format!("shop-order-{}", order_id)
}

/// Quota in bytes and expiry in epoch milliseconds for an order's allotment
fn allotment(order: &Order, now: DateTime<Utc>) -> Result<(i64, i64), PanelError> {
    let total_bytes = order
        .data_gb
        .checked_mul(BYTES_PER_GB)
        .ok_or_else(|| PanelError::Allotment(format!("{} GB", order.data_gb)))?;

    let expiry = TimeDelta::try_days(order.days)
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| PanelError::Allotment(format!("{} days", order.days)))?;

    Ok((total_bytes, expiry.timestamp_millis()))
}

fn client_settings(
    order: &Order,
    account: &ProvisionedAccount,
    now: DateTime<Utc>,
) -> Result<String, PanelError> {
    let (total_gb, expiry_time) = allotment(order, now)?;

    let settings = serde_json::json!({
        "clients": [ClientSettings {
            id: account.client_id.clone(),
            email: account.email.clone(),
            enable: true,
            flow: String::new(),
            limit_ip: 0,
            total_gb,
            expiry_time,
            tg_id: order.customer_id,
            sub_id: account.sub_id.clone(),
            reset: 0,
        }]
    });

    Ok(serde_json::to_string(&settings)?)
}

/// Client for the proxy panel's HTTP API.
///
/// Holds a cookie session and logs in again when the panel stops accepting it.
pub struct PanelClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    logged_in: Mutex<bool>,
}

impl PanelClient {
    pub fn new(config: &PanelConfig) -> Result<Self, PanelError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            logged_in: Mutex::new(false),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self) -> Result<(), PanelError> {
        let response = self
            .http
            .post(self.url("/login"))
            .form(&[("username", self.username.as_str()), ("password", self.password.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PanelError::Status(response.status().as_u16()));
        }

        let body: PanelResponse<serde_json::Value> = response.json().await?;
        if !body.success {
            return Err(PanelError::Rejected(body.msg));
        }

        debug!("Logged in to panel at {}", self.base_url);
        Ok(())
    }

    async fn ensure_session(&self, force: bool) -> Result<(), PanelError> {
        let mut logged_in = self.logged_in.lock().await;
        if force || !*logged_in {
            *logged_in = false;
            self.login().await?;
            *logged_in = true;
        }
        Ok(())
    }

    /// Send an API request, logging in first if needed.
    ///
    /// The panel answers an expired session with 401 or 404 before doing any
    /// work, so the request is sent once more after a fresh login.
    async fn call<T, F>(&self, request: F) -> Result<Option<T>, PanelError>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        self.ensure_session(false)
            .await
            .map_err(|e| PanelError::Login(Box::new(e)))?;
        let mut response = request(&self.http).send().await?;

        if matches!(response.status(), StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND) {
            self.ensure_session(true)
                .await
                .map_err(|e| PanelError::Login(Box::new(e)))?;
            response = request(&self.http).send().await?;
        }

        if !response.status().is_success() {
            return Err(PanelError::Status(response.status().as_u16()));
        }

        let body: PanelResponse<T> = response.json().await?;
        if !body.success {
            return Err(PanelError::Rejected(body.msg));
        }

        Ok(body.obj)
    }

    pub async fn inbounds(&self) -> Result<Vec<Inbound>, PanelError> {
        let url = self.url("/panel/api/inbounds/list");
        let inbounds: Vec<PanelInbound> = self
            .call(|http| http.get(&url))
            .await?
            .unwrap_or_default();

        Ok(inbounds
            .into_iter()
            .map(|inbound| Inbound {
                id: inbound.id,
                remark: inbound.remark,
                protocol: inbound.protocol,
                port: inbound.port,
            })
            .collect())
    }

    /// Create a client for `order` on the lowest enabled inbound
    pub async fn add_client(
        &self,
        order: &Order,
        inbound_ids: &[i64],
    ) -> Result<ProvisionedAccount, PanelError> {
        let inbound_id = inbound_ids.iter().copied().min().ok_or(PanelError::NoInbound)?;

        let account = ProvisionedAccount {
            email: account_email(order.id),
            client_id: Uuid::new_v4().to_string(),
            sub_id: Uuid::new_v4().simple().to_string()[..16].to_string(),
        };
        let settings = client_settings(order, &account, Utc::now())?;

        let url = self.url("/panel/api/inbounds/addClient");
        let body = serde_json::json!({ "id": inbound_id, "settings": settings });
        self.call::<serde_json::Value, _>(|http| http.post(&url).json(&body))
            .await?;

        info!(
            "Panel client {} created on inbound {} for order {}",
            Masked(account.email.as_str()),
            inbound_id,
            order.id
        );
        Ok(account)
    }
}

#[async_trait]
impl InboundSource for PanelClient {
    async fn list_inbounds(&self) -> RepoResult<Vec<Inbound>> {
        Ok(self.inbounds().await?)
    }
}

#[async_trait]
impl Provisioner for PanelClient {
    async fn provision(
        &self,
        order: &Order,
        inbound_ids: &[i64],
    ) -> Result<ProvisionedAccount, ProvisioningFault> {
        self.add_client(order, inbound_ids).await.map_err(|e| {
            if e.may_have_applied() {
                ProvisioningFault::indeterminate(e)
            } else {
                ProvisioningFault::refused(e)
            }
        })
    }
}
