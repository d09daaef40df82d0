//! Authenticated Huobi spot account: free balances and market orders.
//!
//! Private endpoints take signature version 2: the method, host, path and
//! sorted query are signed with HMAC-SHA256 under the secret key, and the
//! base64 digest is appended as the `Signature` parameter. Order placement
//! is sent once and never retried.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::form_urlencoded;

use trendpilot_core::domain::{
    round_cost_down, step_from_decimal_places, Balances, MarketConstraints, OrderRecord,
    OrderRequest, OrderSide, TradingPair,
};
use trendpilot_core::{AccountSource, DataError, OrderSink, SubmissionError};

use super::huobi::{market_symbol, Envelope, HuobiMarketData};
use crate::config::{Credentials, ExchangeConfig};

type HmacSha256 = Hmac<Sha256>;

/// Decimal places of the quote spend sent with a market buy.
const COST_DECIMALS: u32 = 8;

#[derive(Debug, Error)]
enum RequestError {
    #[error("{0}")]
    Unreachable(String),

    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Format(String),
}

impl From<RequestError> for DataError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Unreachable(msg) => DataError::NetworkUnreachable(msg),
            RequestError::Rejected(msg) => DataError::Rejected(msg),
            RequestError::Format(msg) => DataError::ResponseFormatChanged(msg),
        }
    }
}

impl From<RequestError> for SubmissionError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Unreachable(msg) => SubmissionError::Unreachable(msg),
            RequestError::Rejected(msg) => SubmissionError::Rejected(msg),
            RequestError::Format(msg) => {
                SubmissionError::Rejected(format!("unreadable order response: {msg}"))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    id: u64,
    #[serde(rename = "type")]
    kind: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct AccountBalance {
    list: Vec<BalanceEntry>,
}

#[derive(Debug, Deserialize)]
struct BalanceEntry {
    currency: String,
    /// `trade` (free) or `frozen` (locked in open orders).
    #[serde(rename = "type")]
    kind: String,
    /// Decimal string.
    balance: String,
}

pub struct HuobiAccount {
    client: reqwest::blocking::Client,
    base_url: String,
    host: String,
    credentials: Credentials,
    market: HuobiMarketData,
    account_id: OnceLock<u64>,
}

impl HuobiAccount {
    pub fn new(config: &ExchangeConfig, credentials: Credentials) -> Result<Self, DataError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let host = reqwest::Url::parse(&base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .ok_or_else(|| DataError::Other(format!("invalid exchange url '{}'", config.base_url)))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("trendpilot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            host,
            credentials,
            market: HuobiMarketData::new(config)?,
            account_id: OnceLock::new(),
        })
    }

    /// Id of the working spot account, looked up once.
    fn account_id(&self) -> Result<u64, RequestError> {
        if let Some(id) = self.account_id.get() {
            return Ok(*id);
        }
        let raw = self.signed(Method::GET, "/v1/account/accounts", &[], None)?;
        let id = spot_account_id(&payload::<Vec<AccountInfo>>(raw)?)?;
        debug!(account_id = id, "spot account resolved");
        Ok(*self.account_id.get_or_init(|| id))
    }

    fn signed(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Value, RequestError> {
        let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string();
        let query = signed_query(
            method.as_str(),
            &self.host,
            path,
            params,
            &self.credentials,
            &timestamp,
        )?;
        let url = format!("{}{path}?{query}", self.base_url);

        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let resp = request
            .send()
            .map_err(|e| RequestError::Unreachable(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RequestError::Rejected(format!("HTTP {status} for {path}")));
        }
        resp.json()
            .map_err(|e| RequestError::Format(format!("failed to parse {path} response: {e}")))
    }
}

impl AccountSource for HuobiAccount {
    fn fetch_free_balances(&self) -> Result<Balances, DataError> {
        let id = self.account_id()?;
        let path = format!("/v1/account/accounts/{id}/balance");
        let raw = self.signed(Method::GET, &path, &[], None)?;
        Ok(free_balances(&payload(raw)?)?)
    }

    fn fetch_market_constraints(&self, pair: &TradingPair) -> Result<MarketConstraints, DataError> {
        self.market.market_constraints(pair)
    }
}

impl OrderSink for HuobiAccount {
    fn submit_order(&self, order: &OrderRequest) -> Result<OrderRecord, SubmissionError> {
        let body = order_body(self.account_id()?, order)?;
        let raw = self.signed(Method::POST, "/v1/order/orders/place", &[], Some(&body))?;
        let id: String = payload(raw.clone())?;
        info!(order_id = %id, side = %order.side, amount = order.amount, price = order.price, "order placed");
        Ok(OrderRecord { id, raw })
    }
}

/// Query string for a private endpoint, `Signature` last.
fn signed_query(
    method: &str,
    host: &str,
    path: &str,
    params: &[(&str, String)],
    credentials: &Credentials,
    timestamp: &str,
) -> Result<String, RequestError> {
    let mut pairs: Vec<(&str, &str)> = vec![
        ("AccessKeyId", credentials.api_key.expose()),
        ("SignatureMethod", "HmacSHA256"),
        ("SignatureVersion", "2"),
        ("Timestamp", timestamp),
    ];
    pairs.extend(params.iter().map(|(k, v)| (*k, v.as_str())));
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let query = pairs
        .iter()
        .map(|(k, v)| format!("{k}={}", encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let prehash = format!("{method}\n{host}\n{path}\n{query}");

    let mut mac = HmacSha256::new_from_slice(credentials.secret_key.expose().as_bytes())
        .map_err(|_| RequestError::Rejected("invalid secret key".into()))?;
    mac.update(prehash.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());
    Ok(format!("{query}&Signature={}", encode(&signature)))
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Data of an ok response, or the exchange's error as a rejection.
fn payload<T: DeserializeOwned>(raw: Value) -> Result<T, RequestError> {
    let envelope: Envelope<T> =
        serde_json::from_value(raw).map_err(|e| RequestError::Format(e.to_string()))?;
    if envelope.status != "ok" {
        return Err(RequestError::Rejected(envelope.error_text()));
    }
    envelope
        .data
        .ok_or_else(|| RequestError::Format("status ok without data".into()))
}

fn spot_account_id(accounts: &[AccountInfo]) -> Result<u64, RequestError> {
    accounts
        .iter()
        .find(|a| a.kind == "spot" && a.state == "working")
        .map(|a| a.id)
        .ok_or_else(|| RequestError::Rejected("no working spot account".into()))
}

fn free_balances(balance: &AccountBalance) -> Result<Balances, RequestError> {
    let mut balances = Balances::new();
    for entry in balance.list.iter().filter(|e| e.kind == "trade") {
        let amount: f64 = entry.balance.parse().map_err(|_| {
            RequestError::Format(format!(
                "balance '{}' of {} is not a number",
                entry.balance, entry.currency
            ))
        })?;
        if amount > 0.0 {
            balances.set(&entry.currency, amount);
        }
    }
    Ok(balances)
}

/// Market buys are sized by quote spend, market sells by base amount.
fn order_body(account_id: u64, order: &OrderRequest) -> Result<Value, SubmissionError> {
    let (kind, amount) = match order.side {
        OrderSide::Buy => {
            let cost = round_cost_down(
                order.amount,
                order.price,
                step_from_decimal_places(COST_DECIMALS),
            )
            .map_err(|e| SubmissionError::Rejected(e.to_string()))?;
            ("buy-market", cost)
        }
        OrderSide::Sell => ("sell-market", order.amount),
    };
    Ok(json!({
        "account-id": account_id.to_string(),
        "symbol": market_symbol(&order.pair),
        "type": kind,
        "amount": amount.to_string(),
        "source": "spot-api",
    }))
}
