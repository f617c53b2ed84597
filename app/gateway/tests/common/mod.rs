//! An in-process generation API for gateway tests.

#![allow(dead_code)]

use easel_gateway::{Gateway, IdGenerator, SessionRouter, UuidGenerator};
use jobs::{Deadlines, PollPolicy, Studio};
use parking_lot::Mutex;
use provider::{Method, Provider, ProviderError};
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};

/// Submissions get a job id picked from the prompt:
///
/// - `"explode"` → `bad`, a job that fails
/// - `"stall"` → `slow`, a job that never finishes
/// - anything else → `j1`, which succeeds with outputs `a1` and `a2`
#[derive(Default)]
pub struct FakeApi {
    calls: Mutex<Vec<(Method, String)>>,
    bodies: Mutex<Vec<Value>>,
}

impl FakeApi {
    pub fn calls(&self) -> Vec<(Method, String)> {
        self.calls.lock().clone()
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(_, path)| path.starts_with(prefix))
            .count()
    }
}

impl Provider for FakeApi {
    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ProviderError> {
        self.calls.lock().push((method.clone(), path.to_owned()));

        if method == Method::POST {
            let body = body.cloned().unwrap_or(Value::Null);
            self.bodies.lock().push(body.clone());
            let job_id = match body.get("prompt").and_then(Value::as_str) {
                Some("explode") => "bad",
                Some("stall") => "slow",
                _ => "j1",
            };
            return Ok(json!({ "job": { "jobId": job_id } }));
        }

        match path {
            "/jobs/j1" => Ok(json!({
                "job": {
                    "jobId": "j1",
                    "status": "success",
                    "metadata": { "assetIds": ["a1", "a2"] }
                }
            })),
            "/jobs/bad" => Ok(json!({
                "job": {
                    "jobId": "bad",
                    "status": "failed",
                    "metadata": { "assetIds": [], "error": "content rejected" }
                }
            })),
            "/jobs/slow" => Ok(json!({
                "job": { "jobId": "slow", "status": "in-progress", "metadata": {} }
            })),
            "/assets/a1" | "/assets/a2" => {
                let id = &path["/assets/".len()..];
                Ok(json!({
                    "asset": {
                        "id": id,
                        "url": format!("https://cdn.test/{id}.png"),
                        "properties": { "width": 1024, "height": 1024 }
                    }
                }))
            }
            p if p.starts_with("/models") => Ok(json!({
                "models": [{ "id": "m1", "name": "Sketch", "type": "sd-xl", "privacy": "private" }],
                "nextPaginationToken": "next"
            })),
            p if p.starts_with("/assets?") => Ok(json!({
                "assets": [{ "id": "a9", "url": "https://cdn.test/a9.png" }]
            })),
            _ => Err(ProviderError::Status {
                status: 404,
                body: "not found".to_owned(),
            }),
        }
    }
}

/// A gateway over `api` polling every second with a 10 second deadline.
pub fn gateway(api: Arc<FakeApi>) -> Gateway<FakeApi> {
    gateway_with(api, Arc::new(UuidGenerator), None)
}

pub fn gateway_with(
    api: Arc<FakeApi>,
    ids: Arc<dyn IdGenerator>,
    idle: Option<Duration>,
) -> Gateway<FakeApi> {
    let studio = Studio::new(
        api,
        PollPolicy {
            interval: Duration::from_secs(1),
            transport_retries: 0,
        },
        Deadlines {
            standard: Duration::from_secs(10),
            heavy: Duration::from_secs(20),
        },
    );
    Gateway::new(studio, SessionRouter::new(ids, idle))
}
