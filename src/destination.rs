//! Destination discovery through OpenStreetMap Nominatim and the Wikipedia
//! action API. Every lookup is best-effort: failures are logged and come
//! back as an empty list or `None`.

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::LookupConfig;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Request failed with status {0}")]
    Status(u16),
    #[error("Unexpected response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    City,
    Region,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "type")]
    pub kind: DestinationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceSummary {
    pub title: String,
    pub summary: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sight {
    pub id: u64,
    pub title: String,
    pub distance: f64,
    pub lat: f64,
    pub lon: f64,
    pub image_url: Option<String>,
}

/// Read-only destination lookups. Implementations swallow their own errors.
pub trait DestinationLookup {
    /// Places matching `query`; empty for queries shorter than two characters
    fn search_destinations(&self, query: &str, limit: usize) -> Vec<Destination>;
    fn get_destination_image(&self, name: &str) -> Option<String>;
    fn get_place_summary(&self, name: &str) -> Option<PlaceSummary>;
    fn get_nearby_sights(&self, lat: f64, lon: f64, radius_meters: u32, limit: usize) -> Vec<Sight>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct NominatimPlace {
    pub place_id: u64,
    pub display_name: String,
    pub lat: String,
    pub lon: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub address: Option<NominatimAddress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NominatimAddress {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub state: Option<String>,
    pub county: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
}

const SETTLEMENT_TYPES: [&str; 4] = ["city", "town", "village", "administrative"];

/// Keep settlements and administrative areas and map them to destinations.
/// Entries with unparseable coordinates are dropped.
pub fn destinations_from_nominatim(places: Vec<NominatimPlace>) -> Vec<Destination> {
    places
        .into_iter()
        .filter(|p| SETTLEMENT_TYPES.contains(&p.kind.as_str()))
        .filter_map(|p| {
            let latitude = p.lat.trim().parse::<f64>().ok()?;
            let longitude = p.lon.trim().parse::<f64>().ok()?;
            let address = p.address.unwrap_or_default();
            let name = address
                .city
                .or(address.town)
                .or(address.village)
                .unwrap_or_else(|| {
                    p.display_name
                        .split(',')
                        .next()
                        .unwrap_or_default()
                        .to_string()
                });
            let kind = if p.kind == "administrative" {
                DestinationKind::Region
            } else {
                DestinationKind::City
            };
            Some(Destination {
                id: p.place_id.to_string(),
                name,
                country: address.country,
                country_code: address.country_code.map(|c| c.to_uppercase()),
                latitude,
                longitude,
                kind,
                image_url: None,
            })
        })
        .collect()
}

/// First title of an opensearch response: `[query, [titles], [descriptions], [urls]]`
pub fn opensearch_best_title(response: &Value) -> Option<String> {
    response
        .get(1)?
        .get(0)?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Pages of a `query.pages` response, ordered by numeric page id
pub fn pages_in_order(response: &Value) -> Vec<&Value> {
    let Some(pages) = response
        .get("query")
        .and_then(|q| q.get("pages"))
        .and_then(Value::as_object)
    else {
        return Vec::new();
    };
    let mut entries: Vec<(&String, &Value)> = pages.iter().collect();
    entries.sort_by_key(|(k, _)| k.parse::<i64>().unwrap_or(i64::MAX));
    entries.into_iter().map(|(_, v)| v).collect()
}

pub fn page_thumbnail(page: &Value) -> Option<String> {
    page.get("thumbnail")?
        .get("source")?
        .as_str()
        .map(str::to_string)
}

pub fn page_extract(page: &Value) -> Option<String> {
    page.get("extract")?.as_str().map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeoHit {
    pub pageid: u64,
    pub title: String,
    pub dist: f64,
    pub lat: f64,
    pub lon: f64,
}

pub fn geosearch_hits(response: &Value) -> Result<Vec<GeoHit>, LookupError> {
    match response.get("query").and_then(|q| q.get("geosearch")) {
        Some(hits) => serde_json::from_value(hits.clone())
            .map_err(|e| LookupError::Decode(format!("geosearch: {}", e))),
        None => Ok(Vec::new()),
    }
}

/// Attach thumbnails from a `pageids` lookup to geosearch hits
pub fn sights_with_images(hits: Vec<GeoHit>, pages_response: &Value) -> Vec<Sight> {
    let pages = pages_response.get("query").and_then(|q| q.get("pages"));
    hits.into_iter()
        .map(|hit| {
            let image_url = pages
                .and_then(|p| p.get(hit.pageid.to_string()))
                .and_then(page_thumbnail);
            Sight {
                id: hit.pageid,
                title: hit.title,
                distance: hit.dist,
                lat: hit.lat,
                lon: hit.lon,
                image_url,
            }
        })
        .collect()
}

/// HTTP-backed lookups against Nominatim and Wikipedia
pub struct WikiLookup {
    client: Client,
    nominatim_url: String,
    wikipedia_api_url: String,
}

impl WikiLookup {
    pub fn new(config: &LookupConfig) -> Result<Self, LookupError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            nominatim_url: config.nominatim_url.clone(),
            wikipedia_api_url: config.wikipedia_api_url.clone(),
        })
    }

    fn fetch_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, LookupError> {
        let resp = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .query(query)
            .send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }
        Ok(resp.json::<Value>()?)
    }

    fn wiki(&self, params: &[(&str, String)]) -> Result<Value, LookupError> {
        let mut query: Vec<(&str, String)> = params.to_vec();
        query.push(("format", "json".to_string()));
        query.push(("origin", "*".to_string()));
        self.fetch_json(&self.wikipedia_api_url, &query)
    }

    fn best_title(&self, name: &str) -> Result<Option<String>, LookupError> {
        let search = self.wiki(&[
            ("action", "opensearch".to_string()),
            ("search", name.to_string()),
            ("limit", "1".to_string()),
            ("namespace", "0".to_string()),
        ])?;
        Ok(opensearch_best_title(&search))
    }

    fn try_search(&self, query: &str, limit: usize) -> Result<Vec<Destination>, LookupError> {
        let raw = self.fetch_json(
            &self.nominatim_url,
            &[
                ("q", query.to_string()),
                ("format", "json".to_string()),
                ("addressdetails", "1".to_string()),
                ("limit", limit.to_string()),
                ("accept-language", "en".to_string()),
                ("featuretype", "city".to_string()),
                ("extratags", "1".to_string()),
            ],
        )?;
        let places: Vec<NominatimPlace> = serde_json::from_value(raw)
            .map_err(|e| LookupError::Decode(format!("nominatim: {}", e)))?;
        Ok(destinations_from_nominatim(places))
    }

    fn try_image(&self, name: &str) -> Result<Option<String>, LookupError> {
        let title = self.best_title(name)?.unwrap_or_else(|| name.to_string());
        let page = self.wiki(&[
            ("action", "query".to_string()),
            ("titles", title),
            ("prop", "pageimages".to_string()),
            ("pithumbsize", "600".to_string()),
        ])?;
        if let Some(thumb) = pages_in_order(&page).first().and_then(|p| page_thumbnail(p)) {
            return Ok(Some(thumb));
        }

        // Some titles expose no page image; fall back to a search generator
        let generated = self.wiki(&[
            ("action", "query".to_string()),
            ("generator", "search".to_string()),
            ("gsrsearch", format!("{} city", name)),
            ("gsrlimit", "5".to_string()),
            ("prop", "pageimages".to_string()),
            ("piprop", "thumbnail".to_string()),
            ("pithumbsize", "600".to_string()),
        ])?;
        Ok(pages_in_order(&generated)
            .into_iter()
            .find_map(page_thumbnail))
    }

    fn try_summary(&self, name: &str) -> Result<PlaceSummary, LookupError> {
        let title = self.best_title(name)?.unwrap_or_else(|| name.to_string());
        let page = self.wiki(&[
            ("action", "query".to_string()),
            ("titles", title.clone()),
            ("prop", "pageimages|extracts".to_string()),
            ("pithumbsize", "800".to_string()),
            ("exintro", "1".to_string()),
            ("explaintext", "1".to_string()),
        ])?;
        let first = pages_in_order(&page).first().copied();
        Ok(PlaceSummary {
            title,
            summary: first.and_then(page_extract),
            image_url: first.and_then(page_thumbnail),
        })
    }

    fn try_nearby(&self, lat: f64, lon: f64, radius_meters: u32, limit: usize) -> Result<Vec<Sight>, LookupError> {
        let geo = self.wiki(&[
            ("action", "query".to_string()),
            ("list", "geosearch".to_string()),
            ("gscoord", format!("{}|{}", lat, lon)),
            ("gsradius", radius_meters.to_string()),
            ("gslimit", limit.to_string()),
        ])?;
        let hits = geosearch_hits(&geo)?;
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let page_ids = hits
            .iter()
            .map(|h| h.pageid.to_string())
            .collect::<Vec<_>>()
            .join("|");
        let pages = self.wiki(&[
            ("action", "query".to_string()),
            ("pageids", page_ids),
            ("prop", "pageimages|extracts".to_string()),
            ("pithumbsize", "300".to_string()),
            ("exintro", "1".to_string()),
            ("explaintext", "1".to_string()),
        ])?;
        Ok(sights_with_images(hits, &pages))
    }
}

impl DestinationLookup for WikiLookup {
    fn search_destinations(&self, query: &str, limit: usize) -> Vec<Destination> {
        if query.trim().chars().count() < 2 {
            return Vec::new();
        }
        let destinations = match self.try_search(query, limit) {
            Ok(found) => found,
            Err(e) => {
                warn!(query = %query, error = %e, "destination search failed");
                return Vec::new();
            }
        };
        debug!(query = %query, count = destinations.len(), "destination search");

        // One image request at a time to stay polite to the public APIs
        destinations
            .into_iter()
            .map(|mut d| {
                d.image_url = self.get_destination_image(&d.name);
                d
            })
            .collect()
    }

    fn get_destination_image(&self, name: &str) -> Option<String> {
        self.try_image(name).unwrap_or_else(|e| {
            warn!(name = %name, error = %e, "destination image lookup failed");
            None
        })
    }

    fn get_place_summary(&self, name: &str) -> Option<PlaceSummary> {
        match self.try_summary(name) {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!(name = %name, error = %e, "place summary lookup failed");
                None
            }
        }
    }

    fn get_nearby_sights(&self, lat: f64, lon: f64, radius_meters: u32, limit: usize) -> Vec<Sight> {
        self.try_nearby(lat, lon, radius_meters, limit)
            .unwrap_or_else(|e| {
                warn!(lat, lon, error = %e, "nearby sights lookup failed");
                Vec::new()
            })
    }
}
