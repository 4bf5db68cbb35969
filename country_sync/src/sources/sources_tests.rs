//! Tests for the country and exchange rate fetchers.

use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

fn test_config(server: &MockServer) -> SourceConfig {
    SourceConfig {
        countries_url: format!("{}/countries", server.uri()),
        rates_url: format!("{}/rates", server.uri()),
        timeout: Duration::from_secs(5),
    }
}

fn countries_json() -> serde_json::Value {
    serde_json::json!([
        {
            "name": "Germany",
            "capital": "Berlin",
            "region": "Europe",
            "population": 83240525,
            "flag": "https://flagcdn.com/de.svg",
            "currencies": [{ "code": "EUR", "name": "Euro", "symbol": "€" }]
        },
        {
            "name": "Antarctica",
            "region": "Polar",
            "population": 1000
        }
    ])
}

// ── Deserialization ──────────────────────────────────────────────────

#[test]
fn country_entry_reads_first_currency_code() {
    let entry: CountryEntry = serde_json::from_value(serde_json::json!({
        "name": "Panama",
        "population": 4314768,
        "currencies": [
            { "code": "PAB", "name": "Panamanian balboa" },
            { "code": "USD", "name": "United States dollar" }
        ]
    }))
    .unwrap();

    assert_eq!(entry.primary_currency_code(), Some("PAB"));
}

#[test]
fn country_entry_without_currency_code() {
    let entry: CountryEntry = serde_json::from_value(serde_json::json!({
        "name": "Nowhere",
        "population": 10,
        "currencies": [{ "name": "Shells" }]
    }))
    .unwrap();
    assert_eq!(entry.primary_currency_code(), None);

    let empty: CountryEntry = serde_json::from_value(serde_json::json!({
        "name": "Nowhere",
        "currencies": []
    }))
    .unwrap();
    assert_eq!(empty.primary_currency_code(), None);
    assert!(empty.population.is_none());
}

#[test]
fn rate_table_drops_unusable_rates() {
    let mut rates = std::collections::HashMap::new();
    rates.insert("EUR".to_string(), 0.92);
    rates.insert("XXX".to_string(), 0.0);
    rates.insert("YYY".to_string(), -1.5);

    let table = RateTable::from_rates(rates, Some("USD".to_string()));
    assert_eq!(table.len(), 1);
    assert_eq!(table.get("EUR"), Some(0.92));
    assert_eq!(table.get("XXX"), None);
    assert_eq!(table.base_code(), Some("USD"));
}

// ── fetch_countries ──────────────────────────────────────────────────

#[tokio::test]
async fn fetch_countries_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/countries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(countries_json()))
        .mount(&server)
        .await;

    let config = test_config(&server);
    let client = config.client().unwrap();
    let entries = fetch_countries(&client, &config.countries_url).await.unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name.as_deref(), Some("Germany"));
    assert_eq!(entries[0].primary_currency_code(), Some("EUR"));
    assert!(entries[1].currencies.is_none());
}

#[tokio::test]
async fn fetch_countries_http_error_is_upstream_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = test_config(&server);
    let client = config.client().unwrap();
    let err = fetch_countries(&client, &config.countries_url)
        .await
        .unwrap_err();

    match err {
        CountryError::Upstream { upstream, reason } => {
            assert_eq!(upstream, Upstream::Countries);
            assert!(reason.contains("500"), "unexpected reason: {reason}");
        }
        other => panic!("Expected CountryError::Upstream, got: {other:?}"),
    }
}

#[tokio::test]
async fn fetch_countries_malformed_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{ not json"))
        .mount(&server)
        .await;

    let config = test_config(&server);
    let client = config.client().unwrap();
    let err = fetch_countries(&client, &config.countries_url)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CountryError::Upstream {
            upstream: Upstream::Countries,
            ..
        }
    ));
}

#[tokio::test]
async fn fetch_countries_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(countries_json())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut config = test_config(&server);
    config.timeout = Duration::from_millis(200);
    let client = config.client().unwrap();
    let result = fetch_countries(&client, &config.countries_url).await;

    assert!(matches!(result, Err(CountryError::Upstream { .. })));
}

// ── fetch_rates ──────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_rates_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": "success",
            "base_code": "USD",
            "time_last_update_utc": "Sat, 17 Oct 2026 00:02:31 +0000",
            "rates": { "USD": 1, "EUR": 0.92, "NGN": 1600.5 }
        })))
        .mount(&server)
        .await;

    let config = test_config(&server);
    let client = config.client().unwrap();
    let table = fetch_rates(&client, &config.rates_url).await.unwrap();

    assert_eq!(table.len(), 3);
    assert_eq!(table.get("USD"), Some(1.0));
    assert_eq!(table.get("NGN"), Some(1600.5));
    assert_eq!(table.base_code(), Some("USD"));
}

#[tokio::test]
async fn fetch_rates_error_result_is_upstream_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": "error",
            "error-type": "unsupported-code",
            "rates": {}
        })))
        .mount(&server)
        .await;

    let config = test_config(&server);
    let client = config.client().unwrap();
    let err = fetch_rates(&client, &config.rates_url).await.unwrap_err();

    assert!(matches!(
        err,
        CountryError::Upstream {
            upstream: Upstream::ExchangeRates,
            ..
        }
    ));
}

#[tokio::test]
async fn fetch_rates_missing_rates_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": "success"
        })))
        .mount(&server)
        .await;

    let config = test_config(&server);
    let client = config.client().unwrap();
    let result = fetch_rates(&client, &config.rates_url).await;

    assert!(matches!(
        result,
        Err(CountryError::Upstream {
            upstream: Upstream::ExchangeRates,
            ..
        })
    ));
}
