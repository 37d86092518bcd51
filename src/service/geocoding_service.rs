// service/geocoding_service.rs
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::utils::geo::GeoPoint;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeocodeError {
    #[error("geocoder did not answer within {0}s")]
    Timeout(u64),

    #[error("geocoder request failed: {0}")]
    Request(String),

    #[error("no match for address: {0}")]
    NoMatch(String),

    #[error("unreadable geocoder response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub point: GeoPoint,
    pub display_name: String,
}

#[async_trait]
pub trait Geocoder: Send + Sync + std::fmt::Debug {
    async fn geocode(&self, address: &str) -> Result<GeocodedPlace, GeocodeError>;
}

/// Nominatim search response row
#[derive(Debug, Deserialize)]
struct NominatimResponse {
    lat: String,
    lon: String,
    display_name: String,
}

/// Geocoder backed by a Nominatim-compatible `/search` endpoint.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeocodedPlace, GeocodeError> {
        let query = address.trim();
        if query.is_empty() {
            return Err(GeocodeError::NoMatch(String::new()));
        }

        let url = format!(
            "{}?q={}&format=json&limit=1",
            self.base_url,
            urlencoding::encode(query)
        );

        let timeout_secs = self.timeout.as_secs();
        let response = self
            .client
            .get(&url)
            .header("User-Agent", "oddjobs/0.1 (job board)")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    tracing::warn!("Geocoding timed out for {:?}", query);
                    GeocodeError::Timeout(timeout_secs)
                } else {
                    tracing::error!("Geocoding request failed for {:?}: {}", query, e);
                    GeocodeError::Request(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(GeocodeError::Request(format!(
                "geocoder returned {}",
                response.status()
            )));
        }

        let rows: Vec<NominatimResponse> = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GeocodeError::Timeout(timeout_secs)
            } else {
                GeocodeError::InvalidResponse(e.to_string())
            }
        })?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::NoMatch(query.to_string()))?;

        parse_place(row)
    }
}

fn parse_place(row: NominatimResponse) -> Result<GeocodedPlace, GeocodeError> {
    let lat: f64 = row
        .lat
        .parse()
        .map_err(|e| GeocodeError::InvalidResponse(format!("latitude: {}", e)))?;
    let lon: f64 = row
        .lon
        .parse()
        .map_err(|e| GeocodeError::InvalidResponse(format!("longitude: {}", e)))?;

    let point = GeoPoint::new(lat, lon);
    if !point.is_valid() {
        return Err(GeocodeError::InvalidResponse(format!(
            "coordinates out of range: {}, {}",
            lat, lon
        )));
    }

    Ok(GeocodedPlace {
        point,
        display_name: row.display_name,
    })
}

/// A place ready to be stored as a location.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlace {
    pub point: GeoPoint,
    pub address: String,
    pub verified: bool,
}

/// Turn user input into a storable place.
///
/// With coordinates, the geocoder only verifies the address and its failure
/// leaves the place unverified. Without coordinates the geocoder is the only
/// source of a point, so its failure is returned.
pub async fn resolve_place(
    geocoder: &dyn Geocoder,
    address: &str,
    point: Option<GeoPoint>,
) -> Result<ResolvedPlace, GeocodeError> {
    match point {
        Some(point) => match geocoder.geocode(address).await {
            Ok(place) => Ok(ResolvedPlace {
                point,
                address: place.display_name,
                verified: true,
            }),
            Err(e) => {
                tracing::warn!("Keeping unverified address {:?}: {}", address, e);
                Ok(ResolvedPlace {
                    point,
                    address: address.trim().to_string(),
                    verified: false,
                })
            }
        },
        None => {
            let place = geocoder.geocode(address).await?;
            Ok(ResolvedPlace {
                point: place.point,
                address: place.display_name,
                verified: true,
            })
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Answers every query with a fixed result.
    #[derive(Debug)]
    pub struct StaticGeocoder(pub Result<GeocodedPlace, GeocodeError>);

    #[async_trait]
    impl Geocoder for StaticGeocoder {
        async fn geocode(&self, _address: &str) -> Result<GeocodedPlace, GeocodeError> {
            self.0.clone()
        }
    }

    fn place() -> GeocodedPlace {
        GeocodedPlace {
            point: GeoPoint::new(44.9778, -93.2650),
            display_name: "Minneapolis, Hennepin County, Minnesota".to_string(),
        }
    }

    #[test]
    fn test_parse_place() {
        let parsed = parse_place(NominatimResponse {
            lat: "44.9778".into(),
            lon: "-93.2650".into(),
            display_name: "Minneapolis".into(),
        })
        .unwrap();
        assert_eq!(parsed.point, GeoPoint::new(44.9778, -93.2650));

        let bad = parse_place(NominatimResponse {
            lat: "north".into(),
            lon: "0".into(),
            display_name: "?".into(),
        });
        assert!(matches!(bad, Err(GeocodeError::InvalidResponse(_))));

        let out_of_range = parse_place(NominatimResponse {
            lat: "120".into(),
            lon: "0".into(),
            display_name: "?".into(),
        });
        assert!(matches!(out_of_range, Err(GeocodeError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_resolve_without_coordinates_uses_geocoder() {
        let geocoder = StaticGeocoder(Ok(place()));
        let resolved = resolve_place(&geocoder, "Minneapolis", None).await.unwrap();
        assert!(resolved.verified);
        assert_eq!(resolved.point, place().point);
        assert_eq!(resolved.address, place().display_name);

        let failing = StaticGeocoder(Err(GeocodeError::Timeout(5)));
        let err = resolve_place(&failing, "Minneapolis", None).await.unwrap_err();
        assert_eq!(err, GeocodeError::Timeout(5));
    }

    #[tokio::test]
    async fn test_resolve_with_coordinates_degrades_to_unverified() {
        let given = GeoPoint::new(45.0, -93.0);
        let failing = StaticGeocoder(Err(GeocodeError::Request("connection refused".into())));

        let resolved = resolve_place(&failing, "  12 Elm St ", Some(given)).await.unwrap();
        assert!(!resolved.verified);
        assert_eq!(resolved.point, given);
        assert_eq!(resolved.address, "12 Elm St");
    }
}
