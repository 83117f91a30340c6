//! 공포탐욕 지수 어댑터.
//!
//! 1차 제공자(CoinMarketCap)와 폴백(alternative.me)의 서로 다른 응답 형식을
//! [`SentimentReading`]으로 정규화합니다.

use chrono::DateTime;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use pulse_core::{SentimentReading, SharedClock};

use super::fetch::{ResilientClient, Tier};
use super::{parse_body, required_number, string_at, Endpoint};
use crate::error::{FetchError, FetchResult};

/// 공포탐욕 지수 어댑터.
pub struct SentimentAdapter {
    client: Arc<ResilientClient>,
    primary: Endpoint,
    fallback: Option<Endpoint>,
    clock: SharedClock,
}

impl SentimentAdapter {
    /// 어댑터 생성. 자격 증명이 없으면 [`FetchError::Precondition`].
    pub fn new(
        client: Arc<ResilientClient>,
        primary: Endpoint,
        fallback: Option<Endpoint>,
        clock: SharedClock,
    ) -> FetchResult<Self> {
        primary.require_credential()?;
        if let Some(endpoint) = &fallback {
            endpoint.require_credential()?;
        }

        Ok(Self {
            client,
            primary,
            fallback,
            clock,
        })
    }

    /// 최신 지수 조회.
    pub async fn fetch(&self) -> FetchResult<SentimentReading> {
        let primary = Tier::new(
            self.primary.request("fear_greed", "/v3/fear-and-greed/latest"),
            decode_cmc_fear_greed,
        );
        let fallback = self.fallback.as_ref().map(|endpoint| {
            Tier::new(
                endpoint.request("fng", "/fng/").query("limit", "1"),
                decode_alternative_fng,
            )
        });

        let mut reading = self.client.fetch_tiered(primary, fallback).await?;
        if reading.timestamp == 0 {
            reading.timestamp = self.clock.now().timestamp();
        }

        info!(
            value = reading.value,
            classification = %reading.classification,
            "Fear & greed fetched"
        );
        Ok(reading)
    }
}

fn index_value(target: &str, node: &Value) -> FetchResult<u8> {
    let value = required_number(target, node, &["value"])?;
    if !(0.0..=100.0).contains(&value) {
        return Err(FetchError::malformed(
            target,
            format!("value {} out of range", value),
        ));
    }
    Ok(value.round() as u8)
}

fn classification(node: &Value, value: u8) -> String {
    string_at(node, &["value_classification"])
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| SentimentReading::classify(value).to_string())
}

/// `{"data": {"value": 45, "value_classification": "Fear", "update_time": "..."}}`
fn decode_cmc_fear_greed(target: &str, body: &str) -> FetchResult<SentimentReading> {
    let root = parse_body(target, body)?;
    let data = root
        .get("data")
        .filter(|d| d.is_object())
        .ok_or_else(|| FetchError::malformed(target, "missing data object"))?;

    let value = index_value(target, data)?;
    let timestamp = string_at(data, &["update_time"])
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.timestamp())
        .unwrap_or(0);

    Ok(SentimentReading {
        value,
        classification: classification(data, value),
        timestamp,
        time_until_update: None,
    })
}

/// `{"data": [{"value": "45", "value_classification": "Fear", "timestamp": "1704067200", "time_until_update": "3600"}]}`
fn decode_alternative_fng(target: &str, body: &str) -> FetchResult<SentimentReading> {
    let root = parse_body(target, body)?;
    let entry = root
        .get("data")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .ok_or_else(|| FetchError::malformed(target, "missing data entry"))?;

    let value = index_value(target, entry)?;
    let parse_i64 = |field: &str| string_at(entry, &[field]).and_then(|s| s.trim().parse::<i64>().ok());

    Ok(SentimentReading {
        value,
        classification: classification(entry, value),
        timestamp: parse_i64("timestamp").unwrap_or(0),
        time_until_update: parse_i64("time_until_update"),
    })
}
