//! Bybit v5 unified trading API client.
//!
//! Plain pass-through to the REST API (linear category) — no business logic.
//!
//! # Authentication
//!
//! Private endpoints are signed per the v5 scheme: the signature is
//! HMAC-SHA256 over `timestamp + api_key + recv_window + payload`, where the
//! payload is the query string for GET requests and the raw JSON body for
//! POST requests. The signature travels in the `X-BAPI-SIGN` header.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::debug;

use impulse_common::config::ExchangeConfig;
use impulse_common::{Error, Result};

use super::{Candle, Exchange, Order, OrderSide, Position, Ticker};

const MAINNET_URL: &str = "https://api.bybit.com";
const TESTNET_URL: &str = "https://api-testnet.bybit.com";

/// All requests use the linear (USDT perpetual) category.
const CATEGORY: &str = "linear";

type HmacSha256 = Hmac<Sha256>;

/// Bybit v5 REST client.
pub struct BybitClient {
    api_key: String,
    api_secret: String,
    base_url: String,
    recv_window: String,
    http: reqwest::Client,
}

impl BybitClient {
    /// Create a new client from exchange configuration.
    pub fn new(config: &ExchangeConfig) -> Self {
        let base_url = if config.testnet {
            TESTNET_URL.to_string()
        } else {
            MAINNET_URL.to_string()
        };

        Self {
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            base_url,
            recv_window: "5000".to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Base URL in use (mainnet or testnet).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sign a request payload with the account secret.
    fn sign(&self, timestamp: &str, payload: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|_| Error::Exchange("invalid API secret".to_string()))?;
        mac.update(timestamp.as_bytes());
        mac.update(self.api_key.as_bytes());
        mac.update(self.recv_window.as_bytes());
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn get_public(&self, path: &str, query: &str) -> Result<Value> {
        let url = format!("{}{}?{}", self.base_url, path, query);
        debug!(url = %url, "Bybit GET");

        let response: ApiResponse = self.http.get(&url).send().await?.json().await?;
        unwrap_envelope(response)
    }

    async fn get_private(&self, path: &str, query: &str) -> Result<Value> {
        let url = format!("{}{}?{}", self.base_url, path, query);
        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = self.sign(&timestamp, query)?;
        debug!(url = %url, "Bybit signed GET");

        let response: ApiResponse = self
            .http
            .get(&url)
            .header("X-BAPI-API-KEY", &self.api_key)
            .header("X-BAPI-TIMESTAMP", &timestamp)
            .header("X-BAPI-RECV-WINDOW", &self.recv_window)
            .header("X-BAPI-SIGN", &signature)
            .send()
            .await?
            .json()
            .await?;
        unwrap_envelope(response)
    }

    async fn post_private(&self, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let raw_body = serde_json::to_string(&body)?;
        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = self.sign(&timestamp, &raw_body)?;
        debug!(url = %url, "Bybit signed POST");

        let response: ApiResponse = self
            .http
            .post(&url)
            .header("X-BAPI-API-KEY", &self.api_key)
            .header("X-BAPI-TIMESTAMP", &timestamp)
            .header("X-BAPI-RECV-WINDOW", &self.recv_window)
            .header("X-BAPI-SIGN", &signature)
            .header("Content-Type", "application/json")
            .body(raw_body)
            .send()
            .await?
            .json()
            .await?;
        unwrap_envelope(response)
    }

    /// Place a market order.
    async fn place_order(
        &self,
        symbol: &str,
        side: OrderSide,
        qty: &str,
        reduce_only: bool,
    ) -> Result<Order> {
        let mut body = json!({
            "category": CATEGORY,
            "symbol": symbol,
            "side": side.as_str(),
            "orderType": "Market",
            "qty": qty,
            "orderLinkId": uuid::Uuid::new_v4().to_string(),
        });
        if reduce_only {
            body["reduceOnly"] = json!(true);
        }

        let result = self.post_private("/v5/order/create", body).await?;
        let order_id = result
            .get("orderId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(Order {
            order_id,
            symbol: symbol.to_string(),
            side,
            qty: qty.to_string(),
            status: "created".to_string(),
        })
    }
}

#[async_trait::async_trait]
impl Exchange for BybitClient {
    fn name(&self) -> &'static str {
        "Bybit"
    }

    async fn get_ticker(&self, symbol: &str) -> Result<Ticker> {
        let query = format!("category={}&symbol={}", CATEGORY, symbol);
        let result = self.get_public("/v5/market/tickers", &query).await?;
        ticker_from_result(&result, symbol)
    }

    async fn get_klines(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Candle>> {
        let query = format!(
            "category={}&symbol={}&interval={}&limit={}",
            CATEGORY, symbol, interval, limit
        );
        let result = self.get_public("/v5/market/kline", &query).await?;
        candles_from_result(&result)
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<()> {
        let body = json!({
            "category": CATEGORY,
            "symbol": symbol,
            "buyLeverage": leverage.to_string(),
            "sellLeverage": leverage.to_string(),
        });
        self.post_private("/v5/position/set-leverage", body).await?;
        Ok(())
    }

    async fn buy(&self, symbol: &str, qty: &str) -> Result<Order> {
        self.place_order(symbol, OrderSide::Buy, qty, false).await
    }

    async fn sell(&self, symbol: &str, qty: &str) -> Result<Order> {
        self.place_order(symbol, OrderSide::Sell, qty, false).await
    }

    async fn get_positions(&self, symbol: &str) -> Result<Vec<Position>> {
        let query = format!("category={}&symbol={}", CATEGORY, symbol);
        let result = self.get_private("/v5/position/list", &query).await?;
        positions_from_result(&result, symbol)
    }

    async fn close_position(&self, symbol: &str) -> Result<Option<Order>> {
        let positions = self.get_positions(symbol).await?;

        let Some(position) = positions.first() else {
            return Ok(None);
        };

        let close_side = position.side.opposite();
        let qty = format_qty(position.size);
        let order = self.place_order(symbol, close_side, &qty, true).await?;
        Ok(Some(order))
    }

    async fn set_stop_loss(&self, symbol: &str, price: f64) -> Result<()> {
        let body = json!({
            "category": CATEGORY,
            "symbol": symbol,
            "stopLoss": format_price(price),
            "positionIdx": 0,
        });
        self.post_private("/v5/position/trading-stop", body).await?;
        Ok(())
    }

    async fn set_take_profit(&self, symbol: &str, price: f64) -> Result<()> {
        let body = json!({
            "category": CATEGORY,
            "symbol": symbol,
            "takeProfit": format_price(price),
            "positionIdx": 0,
        });
        self.post_private("/v5/position/trading-stop", body).await?;
        Ok(())
    }
}

// ============================================================================
// Response Parsing
// ============================================================================

/// Common v5 response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(rename = "retCode")]
    ret_code: i64,
    #[serde(rename = "retMsg", default)]
    ret_msg: String,
    #[serde(default)]
    result: Value,
}

fn unwrap_envelope(response: ApiResponse) -> Result<Value> {
    if response.ret_code != 0 {
        return Err(Error::Api {
            code: response.ret_code,
            message: response.ret_msg,
        });
    }
    Ok(response.result)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTicker {
    #[serde(default)]
    last_price: String,
    #[serde(default)]
    bid1_price: String,
    #[serde(default)]
    ask1_price: String,
    #[serde(default)]
    volume_24h: String,
}

fn ticker_from_result(result: &Value, symbol: &str) -> Result<Ticker> {
    let list = result.get("list").cloned().unwrap_or(Value::Null);
    let tickers: Vec<RawTicker> = serde_json::from_value(list).unwrap_or_default();
    let raw = tickers
        .into_iter()
        .next()
        .ok_or_else(|| Error::Exchange(format!("no ticker returned for {symbol}")))?;

    Ok(Ticker {
        symbol: symbol.to_string(),
        last_price: parse_f64(&raw.last_price),
        bid: parse_f64(&raw.bid1_price),
        ask: parse_f64(&raw.ask1_price),
        volume_24h: parse_f64(&raw.volume_24h),
    })
}

fn candles_from_result(result: &Value) -> Result<Vec<Candle>> {
    let list = result.get("list").cloned().unwrap_or(Value::Null);
    // Rows are [startTime, open, high, low, close, volume, turnover], newest first
    let rows: Vec<Vec<String>> = serde_json::from_value(list).unwrap_or_default();

    let mut candles: Vec<Candle> = rows
        .iter()
        .map(|row| {
            let field = |i: usize| row.get(i).map(String::as_str).unwrap_or("0");
            Candle {
                timestamp: chrono::DateTime::from_timestamp_millis(
                    field(0).parse::<i64>().unwrap_or(0),
                )
                .unwrap_or_default(),
                open: parse_f64(field(1)),
                high: parse_f64(field(2)),
                low: parse_f64(field(3)),
                close: parse_f64(field(4)),
                volume: parse_f64(field(5)),
            }
        })
        .collect();

    // Oldest first for the callers
    candles.reverse();
    Ok(candles)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPosition {
    #[serde(default)]
    side: String,
    #[serde(default)]
    size: String,
    #[serde(default)]
    avg_price: String,
    #[serde(default)]
    unrealised_pnl: String,
    #[serde(default)]
    leverage: String,
    #[serde(default)]
    stop_loss: String,
    #[serde(default)]
    take_profit: String,
}

fn positions_from_result(result: &Value, symbol: &str) -> Result<Vec<Position>> {
    let list = result.get("list").cloned().unwrap_or(Value::Null);
    let raw_positions: Vec<RawPosition> = serde_json::from_value(list).unwrap_or_default();

    let positions = raw_positions
        .into_iter()
        .filter_map(|raw| {
            let size = parse_f64(&raw.size);
            if size <= 0.0 {
                return None;
            }
            let side = match raw.side.as_str() {
                "Buy" => OrderSide::Buy,
                "Sell" => OrderSide::Sell,
                _ => return None,
            };
            Some(Position {
                symbol: symbol.to_string(),
                side,
                size,
                entry_price: parse_f64(&raw.avg_price),
                unrealized_pnl: parse_f64(&raw.unrealised_pnl),
                leverage: parse_f64(&raw.leverage) as u32,
                stop_loss: non_zero(parse_f64(&raw.stop_loss)),
                take_profit: non_zero(parse_f64(&raw.take_profit)),
            })
        })
        .collect();

    Ok(positions)
}

fn parse_f64(s: &str) -> f64 {
    s.parse().unwrap_or(0.0)
}

fn non_zero(value: f64) -> Option<f64> {
    (value != 0.0).then_some(value)
}

fn format_qty(qty: f64) -> String {
    format!("{:.3}", qty)
}

fn format_price(price: f64) -> String {
    format!("{:.2}", price)
}

// ============================================================================
// Tests
// ============================================================================
