use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use url::Url;

/// Client for the georef `ubicacion` reverse-geocoding endpoint.
#[derive(Clone)]
pub struct GeoClient {
    http: Client,
    base_url: Url,
}

impl GeoClient {
    /// Creates a new geocoding client against the provided base URL.
    ///
    /// The caller supplies the `reqwest::Client`, which is where request
    /// timeouts are configured.
    pub fn new(base_url: Url, http: Client) -> Self {
        Self { http, base_url }
    }

    /// Resolves a coordinate pair into province and municipality names.
    ///
    /// Issues a single GET; no retries, no caching. Coordinates outside any
    /// known region come back from the upstream service with the location
    /// fields absent, which surfaces here as a decode failure.
    pub async fn resolve(&self, lat: f64, lon: f64) -> Result<GeoLocation, GeoError> {
        let mut url = self.base_url.join("ubicacion")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("lat", &lat.to_string());
            query.append_pair("lon", &lon.to_string());
            query.append_pair("aplanar", "true");
            query.append_pair("campos", "provincia.nombre,municipio.nombre");
        }

        let response = self.http.get(url).send().await?;

        parse_json::<UbicacionResponse>(response)
            .await
            .map(GeoLocation::from)
    }
}

/// Province and municipality names as returned by the upstream service,
/// passed through without normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoLocation {
    pub provincia: String,
    pub ciudad: String,
}

impl From<UbicacionResponse> for GeoLocation {
    fn from(value: UbicacionResponse) -> Self {
        Self {
            provincia: value.ubicacion.provincia_nombre,
            ciudad: value.ubicacion.municipio_nombre,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct UbicacionResponse {
    ubicacion: Ubicacion,
}

#[derive(Debug, Clone, Deserialize)]
struct Ubicacion {
    provincia_nombre: String,
    municipio_nombre: String,
}

/// Errors produced by the geocoding client.
#[derive(Debug, Error)]
pub enum GeoError {
    #[error("failed to build url: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
}

async fn parse_json<T>(response: Response) -> Result<T, GeoError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<unavailable>"));
        return Err(GeoError::Status { status, body });
    }

    Ok(response.json().await?)
}
