//! Cycling directions over HTTP (Mapbox Directions API compatible).
//!
//! One request asks for alternatives, turn-by-turn steps, the full GeoJSON overview and
//! per-segment speed annotations. Every returned route becomes a [`RouteDraft`] with
//! turn-like count and high-speed ratio derived from the response, then the set is scored.
//!
//! Rate limited responses (429) are retried with exponential backoff.

use std::time::{Duration, Instant};

use futures::future::{BoxFuture, FutureExt};
use log::{debug, info, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::provider::{RouteProvider, RouteRequest, RouteResult};
use crate::scorer::{score_candidates, RouteDraft, RoutingPreference};
use crate::{Coordinate, NavError, Result, RouteGeometry, RouteStep, RouteSummary};

const MAX_RETRIES: u32 = 3;

/// Directions endpoint settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionsConfig {
    /// Default: "https://api.mapbox.com/directions/v5/mapbox"
    pub base_url: String,
    /// Default: "cycling"
    pub profile: String,
    /// Instruction language. Default: "en"
    pub language: String,
    /// Per-request timeout. Default: 15 s
    pub timeout: Duration,
}

impl Default for DirectionsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mapbox.com/directions/v5/mapbox".to_string(),
            profile: "cycling".to_string(),
            language: "en".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<ApiRoute>,
}

#[derive(Debug, Deserialize)]
struct ApiRoute {
    distance: f64,
    duration: f64,
    geometry: ApiGeometry,
    #[serde(default)]
    legs: Vec<ApiLeg>,
}

#[derive(Debug, Deserialize)]
struct ApiGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct ApiLeg {
    #[serde(default)]
    steps: Vec<ApiStep>,
    #[serde(default)]
    annotation: Option<ApiAnnotation>,
}

#[derive(Debug, Deserialize)]
struct ApiStep {
    distance: f64,
    duration: f64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    maneuver: Option<ApiManeuver>,
}

#[derive(Debug, Deserialize)]
struct ApiManeuver {
    #[serde(default)]
    instruction: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    modifier: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiAnnotation {
    #[serde(default)]
    speed: Vec<f64>,
}

fn flatten_steps(legs: &[ApiLeg]) -> Vec<RouteStep> {
    legs.iter()
        .flat_map(|leg| leg.steps.iter())
        .map(|s| {
            let maneuver = s.maneuver.as_ref();
            let name = s.name.clone().filter(|n| !n.is_empty());
            let instruction = maneuver
                .and_then(|m| m.instruction.clone())
                .unwrap_or_else(|| match &name {
                    Some(n) => format!("Follow {}", n),
                    None => "Continue".to_string(),
                });

            RouteStep {
                instruction,
                name,
                distance_meters: s.distance,
                duration_seconds: s.duration,
                maneuver_type: maneuver.and_then(|m| m.kind.clone()),
                maneuver_modifier: maneuver.and_then(|m| m.modifier.clone()),
            }
        })
        .collect()
}

/// Turn a directions response body into ranked candidates.
pub fn parse_directions(body: &[u8], preference: &RoutingPreference) -> Result<RouteResult> {
    let data: DirectionsResponse = serde_json::from_slice(body)
        .map_err(|e| NavError::InvalidResponse(format!("JSON parse error: {}", e)))?;

    if data.routes.is_empty() {
        let reason = data
            .message
            .or(data.code)
            .unwrap_or_else(|| "no routes returned".to_string());
        return Err(NavError::NoRoute(reason));
    }

    let drafts: Vec<RouteDraft> = data
        .routes
        .into_iter()
        .enumerate()
        .map(|(i, route)| {
            let steps = flatten_steps(&route.legs);
            let speeds: Vec<f64> = route
                .legs
                .iter()
                .filter_map(|leg| leg.annotation.as_ref())
                .flat_map(|a| a.speed.iter().copied())
                .collect();
            let summary = RouteSummary::from_steps(route.distance, route.duration, &steps, &speeds);
            let geometry = RouteGeometry::from_lng_lat(&route.geometry.coordinates);

            RouteDraft::new(&format!("route_{}", i), geometry, steps, summary)
        })
        .collect();

    RouteResult::from_scored(score_candidates(drafts, preference))
}

/// HTTP route provider. Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct DirectionsClient {
    client: Client,
    access_token: String,
    config: DirectionsConfig,
}

impl DirectionsClient {
    pub fn new(access_token: &str, config: DirectionsConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .tcp_keepalive(Duration::from_secs(30))
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            access_token: access_token.to_string(),
            config,
        })
    }

    fn url(&self, stops: &[Coordinate]) -> String {
        let coordinates: Vec<String> = stops
            .iter()
            .map(|c| format!("{},{}", c.longitude, c.latitude))
            .collect();
        format!(
            "{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile,
            coordinates.join(";")
        )
    }

    /// Calculate and score routes for `request`.
    pub async fn fetch(&self, request: &RouteRequest) -> Result<RouteResult> {
        request.validate()?;
        let url = self.url(&request.stops());
        let start = Instant::now();
        let mut retries = 0;

        loop {
            let response = self
                .client
                .get(&url)
                .query(&[
                    ("access_token", self.access_token.as_str()),
                    ("geometries", "geojson"),
                    ("overview", "full"),
                    ("steps", "true"),
                    ("alternatives", "true"),
                    ("annotations", "distance,duration,speed"),
                    ("language", self.config.language.as_str()),
                ])
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RETRIES {
                retries += 1;
                let backoff = Duration::from_millis(500 * (1 << retries));
                warn!("[Directions] 429 Too Many Requests, retry {} after {:?}", retries, backoff);
                tokio::time::sleep(backoff).await;
                continue;
            }

            let body = response.bytes().await?;
            if !status.is_success() {
                let message = serde_json::from_slice::<DirectionsResponse>(&body)
                    .ok()
                    .and_then(|d| d.message)
                    .unwrap_or_default();
                return Err(NavError::Provider(format!("HTTP {} {}", status, message).trim_end().to_string()));
            }

            let result = parse_directions(&body, &request.preference)?;
            info!(
                "[Directions] {} candidates in {:?} ({:.1}KB), best '{}' safety {}",
                result.alternatives.len() + 1,
                start.elapsed(),
                body.len() as f64 / 1024.0,
                result.best.id,
                result.best.safety_score
            );
            for candidate in result.all() {
                debug!(
                    "[Directions] {}: {:.0}m {:.0}s turns={} high_speed={:.2} -> {}",
                    candidate.id,
                    candidate.summary.distance_meters,
                    candidate.summary.duration_seconds,
                    candidate.summary.turn_like_count,
                    candidate.summary.high_speed_ratio,
                    candidate.safety_score
                );
            }
            return Ok(result);
        }
    }
}

impl RouteProvider for DirectionsClient {
    fn calculate(&self, request: RouteRequest) -> BoxFuture<'static, Result<RouteResult>> {
        let client = self.clone();
        async move { client.fetch(&request).await }.boxed()
    }
}
