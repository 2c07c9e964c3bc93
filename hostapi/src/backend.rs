//! Backend adapter — how guest sub-requests reach an HTTP handler.
//!
//! The embedder supplies a [`BackendResolver`] mapping backend names to
//! handlers. A handler is invoked synchronously with the outbound request and
//! returns a buffered response, the in-process equivalent of an origin
//! server. The default resolver answers every name with 502 Bad Gateway; the
//! reserved name `geolocation` is answered by the host itself with a canned
//! JSON document for the downstream client address.

use std::net::IpAddr;

use http::{Request, Response, StatusCode};
use serde::Serialize;

/// A synchronous HTTP handler over buffered bodies.
pub type Handler = Box<dyn Fn(Request<Vec<u8>>) -> Response<Vec<u8>> + Send + Sync>;

/// Maps a backend name to the handler that will serve its sub-requests.
pub trait BackendResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Handler;
}

impl<F> BackendResolver for F
where
    F: Fn(&str) -> Handler + Send + Sync,
{
    fn resolve(&self, name: &str) -> Handler {
        self(name)
    }
}

/// The default resolver: every backend is a 502.
pub struct DefaultBackends;

impl BackendResolver for DefaultBackends {
    fn resolve(&self, name: &str) -> Handler {
        tracing::debug!(backend = name, "no handler for backend, using 502");
        bad_gateway()
    }
}

/// A handler producing 502 Bad Gateway with an empty body.
pub fn bad_gateway() -> Handler {
    Box::new(|_req| {
        let mut resp = Response::new(Vec::new());
        *resp.status_mut() = StatusCode::BAD_GATEWAY;
        resp
    })
}

#[derive(Serialize)]
struct Geolocation {
    as_name: &'static str,
    as_number: u32,
    area_code: u32,
    city: &'static str,
    conn_speed: &'static str,
    conn_type: &'static str,
    continent: &'static str,
    country_code: &'static str,
    country_code3: &'static str,
    country_name: &'static str,
    ip: String,
    latitude: f64,
    longitude: f64,
    metro_code: u32,
    postal_code: &'static str,
    region: &'static str,
    utc_offset: i32,
}

/// The built-in `geolocation` backend: a canned JSON document describing the
/// downstream client address.
pub fn geolocation(client: IpAddr) -> Handler {
    Box::new(move |_req| {
        let geo = Geolocation {
            as_name: "fastlike",
            as_number: 64496,
            area_code: 0,
            city: "localhost",
            conn_speed: "broadband",
            conn_type: "wired",
            continent: "NA",
            country_code: "US",
            country_code3: "USA",
            country_name: "united states",
            ip: client.to_string(),
            latitude: 0.0,
            longitude: 0.0,
            metro_code: 0,
            postal_code: "00000",
            region: "unknown",
            utc_offset: 0,
        };
        let payload = match serde_json::to_vec(&geo) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!(error = %err, "geolocation payload failed to serialize");
                let mut resp = Response::new(Vec::new());
                *resp.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                return resp;
            }
        };
        let mut resp = Response::new(payload);
        resp.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        resp
    })
}
