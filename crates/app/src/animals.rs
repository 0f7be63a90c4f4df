use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info, warn};

use refugio_core::{AnimalSubmission, CoordinateError, Coordinates, ValidationError};
use refugio_geo::GeoError;
use refugio_storage::{AnimalStoreError, NewAnimal, StoredAnimal};

use crate::error::ApiError;
use crate::router::AppState;

const MISSING_FIELDS_MESSAGE: &str = "All fields are required.";
const INVALID_COORDINATES_MESSAGE: &str = "Invalid latLong coordinates.";
const PROCESSING_ERROR_MESSAGE: &str = "Error processing the animal data";

/// One failed run of the submission pipeline.
#[derive(Debug, Error)]
enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Coordinates(#[from] CoordinateError),
    #[error("geocoding lookup failed: {0}")]
    Geo(#[from] GeoError),
    #[error(transparent)]
    Store(#[from] AnimalStoreError),
}

/// POST /api/animals. Runs validate, parse, geocode, persist; each stage's
/// failure is terminal. No side effect happens before the geocode stage.
pub async fn create(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    match submit(&state, &body).await {
        Ok(stored) => {
            counter!("animals_created_total").increment(1);
            counter!("api_animals_requests_total", "method" => "post", "result" => "created")
                .increment(1);
            info!(
                stage = "pipeline",
                id = stored.id,
                provincia = %stored.provincia,
                ciudad = %stored.ciudad,
                "animal added"
            );
            created_response(&stored)
        }
        Err(err) => {
            counter!("api_animals_requests_total", "method" => "post", "result" => "error")
                .increment(1);
            rejection_response(err)
        }
    }
}

async fn submit(state: &AppState, body: &Value) -> Result<StoredAnimal, SubmissionError> {
    let submission = AnimalSubmission::from_value(body)?;
    let coords = Coordinates::parse(&submission.lat_long)?;

    let location = state.geo().resolve(coords.lat, coords.lon).await?;

    let stored = state
        .storage()
        .animals()
        .insert(&NewAnimal {
            name: &submission.name,
            age: &submission.age,
            size: &submission.size,
            species: &submission.species,
            image_url: &submission.image_url,
            description: &submission.description,
            phone_number: &submission.phone_number,
            lat_long: &submission.lat_long,
            provincia: &location.provincia,
            ciudad: &location.ciudad,
        })
        .await?;

    Ok(stored)
}

fn created_response(stored: &StoredAnimal) -> Response {
    (
        StatusCode::CREATED,
        Json(json!({
            "message": "Animal added successfully",
            "animal": stored,
        })),
    )
        .into_response()
}

/// Maps pipeline failures to HTTP outcomes. Client mistakes become 400s with
/// a stable message; geocode and store failures become a generic 500, with
/// the underlying detail logged server-side only.
fn rejection_response(err: SubmissionError) -> Response {
    match err {
        SubmissionError::Validation(err) => {
            warn!(stage = "pipeline", %err, "submission rejected");
            counter!("animals_rejected_total", "reason" => "missing_field").increment(1);
            ApiError::new(StatusCode::BAD_REQUEST, MISSING_FIELDS_MESSAGE).into_response()
        }
        SubmissionError::Coordinates(err) => {
            warn!(stage = "pipeline", %err, "submission rejected");
            counter!("animals_rejected_total", "reason" => "bad_coordinates").increment(1);
            ApiError::new(StatusCode::BAD_REQUEST, INVALID_COORDINATES_MESSAGE).into_response()
        }
        SubmissionError::Geo(err) => {
            error!(stage = "pipeline", %err, "reverse geocoding failed");
            counter!("geo_lookup_failures_total").increment(1);
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_ERROR_MESSAGE)
                .into_response()
        }
        SubmissionError::Store(err) => {
            error!(stage = "pipeline", %err, "failed to store animal record");
            counter!("animal_store_failures_total", "op" => "insert").increment(1);
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, PROCESSING_ERROR_MESSAGE)
                .into_response()
        }
    }
}

/// GET /api/animals. Reads every stored record; bypasses validation and
/// geocoding entirely.
pub async fn list(State(state): State<AppState>) -> Response {
    match state.storage().animals().list_all().await {
        Ok(rows) => {
            counter!("api_animals_requests_total", "method" => "get", "result" => "ok")
                .increment(1);
            info!(stage = "pipeline", count = rows.len(), "animals listed");
            Json(rows).into_response()
        }
        Err(err) => {
            counter!("api_animals_requests_total", "method" => "get", "result" => "error")
                .increment(1);
            counter!("animal_store_failures_total", "op" => "select").increment(1);
            error!(stage = "pipeline", %err, "failed to list animal records");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{app_router, AppState};
    use crate::telemetry;
    use axum::{
        body::Body,
        http::{header, Request},
        Router,
    };
    use http_body_util::BodyExt;
    use httpmock::prelude::*;
    use refugio_geo::GeoClient;
    use refugio_storage::Database;
    use reqwest::Client;
    use tower::ServiceExt;
    use url::Url;

    async fn setup_state(db_name: &str, geo_base: &str) -> AppState {
        let metrics = telemetry::init_metrics().expect("metrics init");

        let database = Database::connect(&format!(
            "sqlite:file:{db_name}?mode=memory&cache=shared"
        ))
        .await
        .expect("connect");
        database.ensure_schema().await.expect("schema");

        let geo = GeoClient::new(Url::parse(geo_base).expect("url"), Client::new());

        AppState::new(metrics, database, geo)
    }

    fn geo_base(server: &MockServer) -> String {
        server.url("/georef/api/")
    }

    async fn mock_geo_success(server: &MockServer) -> httpmock::Mock<'_> {
        server
            .mock_async(|when, then| {
                when.method(GET).path("/georef/api/ubicacion");
                then.status(200).json_body(serde_json::json!({
                    "ubicacion": {
                        "provincia_nombre": "Buenos Aires",
                        "municipio_nombre": "CABA"
                    }
                }));
            })
            .await
    }

    fn rex_body() -> Value {
        json!({
            "name": "Rex",
            "age": "2",
            "size": "medium",
            "species": "dog",
            "imageUrl": "http://x/y.png",
            "description": "friendly",
            "phoneNumber": "555-1234",
            "latLong": "-34.6,-58.4"
        })
    }

    fn post_request(body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/animals")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request() -> Request<Body> {
        Request::builder()
            .uri("/api/animals")
            .body(Body::empty())
            .unwrap()
    }

    async fn response_json(response: axum::response::Response) -> Value {
        let collected = response
            .into_body()
            .collect()
            .await
            .expect("body should read");
        serde_json::from_slice(&collected.to_bytes()).expect("valid json body")
    }

    async fn row_count(state: &AppState) -> i64 {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM animals")
            .fetch_one(state.storage().pool())
            .await
            .expect("count rows");
        count.0
    }

    async fn post_json(app: &Router, body: &Value) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(post_request(body))
            .await
            .expect("handler should respond");
        let status = response.status();
        (status, response_json(response).await)
    }

    #[tokio::test]
    async fn valid_submission_is_stored_with_derived_location() {
        let server = MockServer::start_async().await;
        let mock = mock_geo_success(&server).await;
        let state = setup_state("animals-valid", &geo_base(&server)).await;
        let app = app_router(state);

        let (status, body) = post_json(&app, &rex_body()).await;

        mock.assert_async().await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Animal added successfully");
        assert_eq!(body["animal"]["provincia"], "Buenos Aires");
        assert_eq!(body["animal"]["ciudad"], "CABA");
        assert!(body["animal"]["id"].as_i64().expect("integer id") > 0);
    }

    #[tokio::test]
    async fn missing_field_is_rejected_without_side_effects() {
        let server = MockServer::start_async().await;
        let geo_mock = mock_geo_success(&server).await;
        let state = setup_state("animals-missing-field", &geo_base(&server)).await;
        let app = app_router(state.clone());

        let mut body = rex_body();
        body.as_object_mut().expect("object").remove("species");

        let (status, response) = post_json(&app, &body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], MISSING_FIELDS_MESSAGE);
        assert_eq!(row_count(&state).await, 0);
        assert_eq!(geo_mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn every_required_field_is_enforced() {
        let server = MockServer::start_async().await;
        let state = setup_state("animals-each-field", &geo_base(&server)).await;
        let app = app_router(state.clone());

        for field in refugio_core::submission::REQUIRED_FIELDS {
            let mut body = rex_body();
            body.as_object_mut().expect("object").remove(field);

            let (status, response) = post_json(&app, &body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "field: {field}");
            assert_eq!(response["error"], MISSING_FIELDS_MESSAGE, "field: {field}");
        }

        assert_eq!(row_count(&state).await, 0);
    }

    #[tokio::test]
    async fn malformed_coordinates_are_rejected_before_geocoding() {
        let server = MockServer::start_async().await;
        let geo_mock = mock_geo_success(&server).await;
        let state = setup_state("animals-bad-coords", &geo_base(&server)).await;
        let app = app_router(state.clone());

        let mut body = rex_body();
        body["latLong"] = json!("somewhere in the pampas");

        let (status, response) = post_json(&app, &body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], INVALID_COORDINATES_MESSAGE);
        assert_eq!(row_count(&state).await, 0);
        assert_eq!(geo_mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn geocoding_failure_returns_generic_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/georef/api/ubicacion");
                then.status(503).body("georef unavailable");
            })
            .await;
        let state = setup_state("animals-geo-down", &geo_base(&server)).await;
        let app = app_router(state.clone());

        let (status, response) = post_json(&app, &rex_body()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response["error"], PROCESSING_ERROR_MESSAGE);
        assert_eq!(row_count(&state).await, 0);
    }

    #[tokio::test]
    async fn store_failure_never_returns_created() {
        let server = MockServer::start_async().await;
        mock_geo_success(&server).await;

        // A connection without schema setup stands in for a broken store.
        let metrics = telemetry::init_metrics().expect("metrics init");
        let database = Database::connect("sqlite:file:animals-no-table?mode=memory&cache=shared")
            .await
            .expect("connect");
        let geo = GeoClient::new(
            Url::parse(&geo_base(&server)).expect("url"),
            Client::new(),
        );
        let app = app_router(AppState::new(metrics, database, geo));

        let (status, response) = post_json(&app, &rex_body()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response["error"], PROCESSING_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn listing_failure_exposes_store_error_message() {
        // A connection without schema setup stands in for a broken store.
        let metrics = telemetry::init_metrics().expect("metrics init");
        let database =
            Database::connect("sqlite:file:animals-list-no-table?mode=memory&cache=shared")
                .await
                .expect("connect");
        let geo = GeoClient::new(
            Url::parse("http://127.0.0.1:1/georef/api/").expect("url"),
            Client::new(),
        );
        let app = app_router(AppState::new(metrics, database, geo));

        let response = app
            .oneshot(get_request())
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response_json(response).await;
        let message = body["error"].as_str().expect("error message");
        assert!(message.contains("failed to list animal records"));
    }

    #[tokio::test]
    async fn listing_empty_table_returns_empty_array() {
        let server = MockServer::start_async().await;
        let state = setup_state("animals-list-empty", &geo_base(&server)).await;
        let app = app_router(state);

        let response = app
            .oneshot(get_request())
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn created_records_round_trip_through_listing() {
        let server = MockServer::start_async().await;
        mock_geo_success(&server).await;
        let state = setup_state("animals-round-trip", &geo_base(&server)).await;
        let app = app_router(state);

        let mut second = rex_body();
        second["name"] = json!("Luna");
        second["species"] = json!("cat");

        let (first_status, first) = post_json(&app, &rex_body()).await;
        let (second_status, _) = post_json(&app, &second).await;
        assert_eq!(first_status, StatusCode::CREATED);
        assert_eq!(second_status, StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(get_request())
            .await
            .expect("handler should respond");
        assert_eq!(response.status(), StatusCode::OK);

        let listed = response_json(response).await;
        let listed = listed.as_array().expect("array body");
        assert_eq!(listed.len(), 2);

        // User-supplied fields come back byte-identical; provincia/ciudad
        // are derived.
        let rex = &listed[0];
        assert_eq!(rex["name"], "Rex");
        assert_eq!(rex["age"], "2");
        assert_eq!(rex["size"], "medium");
        assert_eq!(rex["type"], "dog");
        assert_eq!(rex["imageUrl"], "http://x/y.png");
        assert_eq!(rex["description"], "friendly");
        assert_eq!(rex["phoneNumber"], "555-1234");
        assert_eq!(rex["latLong"], "-34.6,-58.4");
        assert_eq!(rex["provincia"], "Buenos Aires");
        assert_eq!(rex["ciudad"], "CABA");
        assert_eq!(rex["id"], first["animal"]["id"]);

        assert_eq!(listed[1]["name"], "Luna");
        assert_eq!(listed[1]["type"], "cat");
    }
}
