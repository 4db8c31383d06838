//! Direct-answer providers for time, weather, currency and news queries

use super::intent::{extract_location, extract_news_topic, parse_currency_query, Intent};
use super::sources::fetch_hn_stories;
use super::{SearchError, SearchResult};
use crate::config::SourceEndpoints;
use crate::http::{HttpClient, RequestOptions};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// City names mapped to IANA zones
const CITY_ZONES: &[(&str, &str)] = &[
    ("tokyo", "Asia/Tokyo"),
    ("osaka", "Asia/Tokyo"),
    ("seoul", "Asia/Seoul"),
    ("beijing", "Asia/Shanghai"),
    ("shanghai", "Asia/Shanghai"),
    ("hong kong", "Asia/Hong_Kong"),
    ("singapore", "Asia/Singapore"),
    ("bangkok", "Asia/Bangkok"),
    ("delhi", "Asia/Kolkata"),
    ("new delhi", "Asia/Kolkata"),
    ("mumbai", "Asia/Kolkata"),
    ("dubai", "Asia/Dubai"),
    ("istanbul", "Europe/Istanbul"),
    ("moscow", "Europe/Moscow"),
    ("saint petersburg", "Europe/Moscow"),
    ("kyiv", "Europe/Kyiv"),
    ("kiev", "Europe/Kyiv"),
    ("minsk", "Europe/Minsk"),
    ("warsaw", "Europe/Warsaw"),
    ("berlin", "Europe/Berlin"),
    ("paris", "Europe/Paris"),
    ("madrid", "Europe/Madrid"),
    ("rome", "Europe/Rome"),
    ("amsterdam", "Europe/Amsterdam"),
    ("london", "Europe/London"),
    ("dublin", "Europe/Dublin"),
    ("new york", "America/New_York"),
    ("washington", "America/New_York"),
    ("toronto", "America/Toronto"),
    ("chicago", "America/Chicago"),
    ("denver", "America/Denver"),
    ("los angeles", "America/Los_Angeles"),
    ("san francisco", "America/Los_Angeles"),
    ("seattle", "America/Los_Angeles"),
    ("mexico city", "America/Mexico_City"),
    ("sao paulo", "America/Sao_Paulo"),
    ("buenos aires", "America/Argentina/Buenos_Aires"),
    ("sydney", "Australia/Sydney"),
    ("melbourne", "Australia/Melbourne"),
    ("auckland", "Pacific/Auckland"),
    ("cairo", "Africa/Cairo"),
    ("johannesburg", "Africa/Johannesburg"),
    ("almaty", "Asia/Almaty"),
    ("tashkent", "Asia/Tashkent"),
];

/// Zone used when the query names no known place
pub const DEFAULT_ZONE: &str = "Etc/UTC";

/// IANA zone for a place name, falling back to UTC
pub fn zone_for_location(location: Option<&str>) -> &'static str {
    location
        .map(|l| l.trim().to_lowercase())
        .and_then(|l| {
            CITY_ZONES
                .iter()
                .find(|(city, _)| *city == l)
                .map(|(_, zone)| *zone)
        })
        .unwrap_or(DEFAULT_ZONE)
}

/// Providers that answer a classified query without a general search
#[derive(Clone)]
pub struct DirectAnswers {
    http: HttpClient,
    endpoints: SourceEndpoints,
    timeout: Duration,
}

impl DirectAnswers {
    pub fn new(http: HttpClient, endpoints: SourceEndpoints, timeout: Duration) -> Self {
        Self {
            http,
            endpoints,
            timeout,
        }
    }

    /// Answer `query` for `intent`.
    ///
    /// An empty list means the provider had nothing; plain searches always
    /// return one.
    pub async fn answer(
        &self,
        intent: Intent,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        match intent {
            Intent::Time => self.time(query).await.map(|r| vec![r]),
            Intent::Weather => self.weather(query).await.map(|r| vec![r]),
            Intent::Currency => self.currency(query).await.map(|r| vec![r]),
            Intent::News => self.news(query, limit).await,
            Intent::Search => Ok(Vec::new()),
        }
    }

    fn options(&self) -> RequestOptions {
        RequestOptions::new(self.timeout)
    }

    async fn time(&self, query: &str) -> Result<SearchResult, SearchError> {
        let location = extract_location(query);
        let zone = zone_for_location(location.as_deref());
        let url = format!(
            "{}/timezone/{}",
            self.endpoints.world_time.trim_end_matches('/'),
            zone
        );

        let json: Value = self.http.get_json(&url, &self.options()).await?;
        let datetime = json
            .get("datetime")
            .and_then(Value::as_str)
            .ok_or_else(|| SearchError::parse("worldtime", "missing datetime"))?;
        let offset = json.get("utc_offset").and_then(Value::as_str).unwrap_or("+00:00");

        let (date, time) = datetime.split_once('T').unwrap_or((datetime, ""));
        let time: String = time.chars().take(8).collect();
        let place = location.unwrap_or_else(|| "UTC".to_string());

        Ok(SearchResult::new(
            format!("Current time in {}", place),
            url,
            format!("{} {} ({}, UTC{})", date, time, zone, offset),
            "worldtime",
        ))
    }

    async fn weather(&self, query: &str) -> Result<SearchResult, SearchError> {
        let location = extract_location(query).unwrap_or_default();
        let path: String = url::form_urlencoded::byte_serialize(location.as_bytes()).collect();
        let page = format!("{}/{}", self.endpoints.weather.trim_end_matches('/'), path);
        let url = format!("{}?format=j1&m", page);

        let json: Value = self.http.get_json(&url, &self.options()).await?;
        let current = json
            .pointer("/current_condition/0")
            .ok_or_else(|| SearchError::parse("wttr.in", "missing current_condition"))?;

        let field = |key: &str| current.get(key).and_then(Value::as_str).unwrap_or("?");
        let description = current
            .pointer("/weatherDesc/0/value")
            .and_then(Value::as_str)
            .unwrap_or("Unknown");

        let area = json.pointer("/nearest_area/0");
        let area_name = area
            .and_then(|a| a.pointer("/areaName/0/value"))
            .and_then(Value::as_str)
            .unwrap_or(location.as_str());
        let country = area
            .and_then(|a| a.pointer("/country/0/value"))
            .and_then(Value::as_str);
        let place = match country {
            Some(country) if !area_name.is_empty() => format!("{}, {}", area_name, country),
            Some(country) => country.to_string(),
            None => area_name.to_string(),
        };

        Ok(SearchResult::new(
            format!("Weather in {}", place),
            page,
            format!(
                "{}, {}°C (feels like {}°C), humidity {}%, wind {} km/h",
                description,
                field("temp_C"),
                field("FeelsLikeC"),
                field("humidity"),
                field("windspeedKmph")
            ),
            "wttr.in",
        ))
    }

    async fn currency(&self, query: &str) -> Result<SearchResult, SearchError> {
        let request = parse_currency_query(query)
            .ok_or_else(|| SearchError::Unanswerable("no currency pair in query".to_string()))?;

        let url = format!(
            "{}/latest/{}",
            self.endpoints.exchange_rates.trim_end_matches('/'),
            request.from
        );
        let json: Value = self.http.get_json(&url, &self.options()).await?;
        let rate = json
            .pointer(&format!("/rates/{}", request.to))
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                SearchError::parse("exchangerate", format!("no rate for {}", request.to))
            })?;

        debug!("{} -> {} rate {}", request.from, request.to, rate);
        Ok(SearchResult::new(
            format!("{} to {}", request.from, request.to),
            url,
            format!(
                "{} {} = {:.2} {}",
                request.amount,
                request.from,
                request.amount * rate,
                request.to
            ),
            "exchangerate",
        ))
    }

    async fn news(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
        let topic = extract_news_topic(query);
        fetch_hn_stories(
            &self.http,
            &self.endpoints.tech_news,
            topic.as_deref(),
            limit,
            self.timeout,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_lookup() {
        assert_eq!(zone_for_location(Some("Tokyo")), "Asia/Tokyo");
        assert_eq!(zone_for_location(Some("new york")), "America/New_York");
        assert_eq!(zone_for_location(Some("Atlantis")), DEFAULT_ZONE);
        assert_eq!(zone_for_location(None), DEFAULT_ZONE);
    }
}
