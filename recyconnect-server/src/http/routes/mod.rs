//! Route handlers organized by resource

pub mod concerns;
pub mod dashboard;
pub mod donated;
pub mod flags;
pub mod health;
pub mod items;
pub mod messages;
pub mod reported;
pub mod users;

#[cfg(test)]
pub(crate) mod testing {
    //! Drive the full router without a network listener.

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::http::server::{build_router, tests::lazy_state};

    /// Send one request and return status plus JSON body (`Null` if empty).
    pub(crate) async fn send(method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let tmp = tempfile::tempdir().unwrap();
        let app = build_router(lazy_state(tmp.path()), false);

        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}
