//! Scripted in-process provider shared by the pipeline tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use provider::{Method, Provider, ProviderError};
use serde_json::{Value, json};
use std::{
    collections::{HashMap, VecDeque},
    time::Duration,
};

/// One recorded call.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// A provider answering from scripts.
///
/// Job reads pop the status script front to back; the last entry repeats
/// forever, after an optional delay. Asset reads look up a per-id reply
/// and optional delay.
pub struct FakeProvider {
    submit: Mutex<Result<Value, ProviderError>>,
    jobs: Mutex<VecDeque<Result<Value, ProviderError>>>,
    job_delay: Mutex<Duration>,
    jobs_hang: Mutex<bool>,
    assets: Mutex<HashMap<String, (Duration, Result<Value, ProviderError>)>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeProvider {
    pub fn new(job_id: &str) -> Self {
        Self {
            submit: Mutex::new(Ok(json!({ "job": { "jobId": job_id } }))),
            jobs: Mutex::new(VecDeque::new()),
            job_delay: Mutex::new(Duration::ZERO),
            jobs_hang: Mutex::new(false),
            assets: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_submit_error(self, error: ProviderError) -> Self {
        *self.submit.lock() = Err(error);
        self
    }

    /// Append job reads, one status each. The final status carries
    /// `asset_ids`.
    pub fn with_statuses(self, job_id: &str, statuses: &[&str], asset_ids: &[&str]) -> Self {
        {
            let mut jobs = self.jobs.lock();
            for (i, status) in statuses.iter().enumerate() {
                let ids: &[&str] = if i + 1 == statuses.len() { asset_ids } else { &[] };
                jobs.push_back(Ok(job(job_id, status, ids)));
            }
        }
        self
    }

    pub fn with_job_reply(self, reply: Result<Value, ProviderError>) -> Self {
        self.jobs.lock().push_back(reply);
        self
    }

    /// Every job read takes `delay` before answering.
    pub fn with_job_delay(self, delay: Duration) -> Self {
        *self.job_delay.lock() = delay;
        self
    }

    /// Job reads are recorded but never answer.
    pub fn with_hung_jobs(self) -> Self {
        *self.jobs_hang.lock() = true;
        self
    }

    pub fn with_asset(self, id: &str, width: u32, height: u32, delay: Duration) -> Self {
        self.assets
            .lock()
            .insert(id.to_owned(), (delay, Ok(asset(id, width, height))));
        self
    }

    pub fn with_asset_error(self, id: &str, error: ProviderError, delay: Duration) -> Self {
        self.assets.lock().insert(id.to_owned(), (delay, Err(error)));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.path.starts_with(prefix))
            .count()
    }
}

impl Provider for FakeProvider {
    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ProviderError> {
        self.calls.lock().push(Call {
            method: method.clone(),
            path: path.to_owned(),
            body: body.cloned(),
        });

        if method == Method::POST {
            return self.submit.lock().clone();
        }
        if path.starts_with("/jobs/") {
            if *self.jobs_hang.lock() {
                return std::future::pending().await;
            }
            let delay = *self.job_delay.lock();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let mut jobs = self.jobs.lock();
            return match jobs.len() {
                0 => Err(not_found()),
                1 => jobs[0].clone(),
                _ => jobs.pop_front().unwrap_or_else(|| Err(not_found())),
            };
        }
        if let Some(id) = path.strip_prefix("/assets/") {
            let (delay, reply) = self
                .assets
                .lock()
                .get(id)
                .cloned()
                .unwrap_or((Duration::ZERO, Err(not_found())));
            tokio::time::sleep(delay).await;
            return reply;
        }
        Ok(json!({
            "models": [{ "id": "m1", "name": "Watercolor", "privacy": "private" }],
            "assets": [{ "id": "a9", "url": "https://x/a9.png" }],
            "nextPaginationToken": "next",
        }))
    }
}

pub fn job(job_id: &str, status: &str, asset_ids: &[&str]) -> Value {
    json!({
        "job": {
            "jobId": job_id,
            "status": status,
            "metadata": { "assetIds": asset_ids },
        }
    })
}

pub fn asset(id: &str, width: u32, height: u32) -> Value {
    json!({
        "asset": {
            "id": id,
            "url": format!("https://x/{id}.png"),
            "properties": { "width": width, "height": height },
        }
    })
}

pub fn not_found() -> ProviderError {
    ProviderError::Status {
        status: 404,
        body: "not found".to_owned(),
    }
}
