//! Exchange rate lookup.
//!
//! Rates are "units of the quoted currency per 1 unit of the reference
//! currency", the same convention as the stored currency setting.

use std::{collections::HashMap, str::FromStr, time::Duration};

use async_trait::async_trait;
use engine::CurrencyCode;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum RateError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("rate provider answered {0}")]
    Provider(String),
    #[error("malformed rate for {code}: {value}")]
    Malformed { code: String, value: String },
}

#[async_trait]
pub trait RateLookup: Send + Sync {
    /// Every rate quoted against `reference`.
    async fn get_rates(
        &self,
        reference: &CurrencyCode,
    ) -> Result<HashMap<String, Decimal>, RateError>;

    /// Rate of `code` against `reference`, `None` if the code is not quoted.
    async fn get_rate(
        &self,
        reference: &CurrencyCode,
        code: &CurrencyCode,
    ) -> Result<Option<Decimal>, RateError> {
        let rates = self.get_rates(reference).await?;
        Ok(rates.get(code.code()).copied())
    }
}

/// Body of an `open.er-api.com`/`exchangerate-api.com` style answer.
#[derive(Debug, Deserialize)]
struct RatesBody {
    result: Option<String>,
    #[serde(alias = "conversion_rates")]
    rates: Option<HashMap<String, serde_json::Number>>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
}

/// [`RateLookup`] over HTTP: `GET {url}/{reference}`.
#[derive(Clone, Debug)]
pub struct HttpRateLookup {
    client: Client,
    url: String,
}

impl HttpRateLookup {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, RateError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RateLookup for HttpRateLookup {
    async fn get_rates(
        &self,
        reference: &CurrencyCode,
    ) -> Result<HashMap<String, Decimal>, RateError> {
        let url = format!("{}/{}", self.url, reference.code());
        tracing::debug!(%url, "fetching exchange rates");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RateError::Provider(status.to_string()));
        }
        let body = response.json::<RatesBody>().await?;
        if body.result.as_deref().is_some_and(|r| r != "success") {
            return Err(RateError::Provider(
                body.error_type.unwrap_or_else(|| "error".to_string()),
            ));
        }
        let rates = body
            .rates
            .ok_or_else(|| RateError::Provider("missing rates".to_string()))?;

        rates
            .into_iter()
            .map(|(code, value)| {
                let rate = parse_rate(&value.to_string()).ok_or_else(|| RateError::Malformed {
                    code: code.clone(),
                    value: value.to_string(),
                })?;
                Ok((code.to_ascii_uppercase(), rate))
            })
            .collect()
    }
}

fn parse_rate(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
        .filter(|rate| *rate > Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_body_accepts_both_field_names() {
        let body: RatesBody = serde_json::from_str(
            r#"{"result":"success","base_code":"SGD","rates":{"SGD":1,"EUR":0.6812}}"#,
        )
        .unwrap();
        assert_eq!(body.rates.unwrap().len(), 2);

        let body: RatesBody =
            serde_json::from_str(r#"{"result":"success","conversion_rates":{"USD":0.74}}"#)
                .unwrap();
        assert!(body.rates.unwrap().contains_key("USD"));
    }

    #[test]
    fn rates_parse_plain_and_scientific() {
        assert_eq!(parse_rate("0.75"), Some(Decimal::new(75, 2)));
        assert_eq!(parse_rate("1.5e-3"), Some(Decimal::new(15, 4)));
        assert_eq!(parse_rate("0"), None);
        assert_eq!(parse_rate("abc"), None);
    }
}
