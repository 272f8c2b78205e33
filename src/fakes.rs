//! In-memory stand-ins for the network and the clock, shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::GenerationError;
use crate::poller::Sleeper;
use crate::replicate::{RawResponse, Transport};

type Scripted = Result<RawResponse, String>;

#[derive(Default)]
pub struct FakeTransport {
    creates: Mutex<VecDeque<Scripted>>,
    fetches: Mutex<VecDeque<Scripted>>,
    submitted: Mutex<Vec<(String, Value)>>,
    fetched: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_create(&self, status: u16, body: &str) {
        self.creates.lock().push_back(Ok(RawResponse { status, body: body.to_string() }));
    }

    pub fn on_create_error(&self, message: &str) {
        self.creates.lock().push_back(Err(message.to_string()));
    }

    pub fn on_fetch(&self, status: u16, body: &str) {
        self.fetches.lock().push_back(Ok(RawResponse { status, body: body.to_string() }));
    }

    pub fn on_fetch_error(&self, message: &str) {
        self.fetches.lock().push_back(Err(message.to_string()));
    }

    pub fn on_fetch_status(&self, status: &str, times: usize) {
        for _ in 0..times {
            self.on_fetch(200, &format!(r#"{{"id": "p", "status": "{status}", "output": null}}"#));
        }
    }

    pub fn create_calls(&self) -> usize {
        self.submitted.lock().len()
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetched.lock().len()
    }

    /// Highest number of submissions that were awaiting a response together.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<(String, Value)> {
        self.submitted.lock().clone()
    }

    fn next(queue: &Mutex<VecDeque<Scripted>>) -> Result<RawResponse, GenerationError> {
        match queue.lock().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(GenerationError::transport(message)),
            None => Err(GenerationError::transport("fake transport: no scripted response")),
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn create_prediction(&self, token: &str, payload: &Value) -> Result<RawResponse, GenerationError> {
        self.submitted.lock().push((token.to_string(), payload.clone()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        // Yield once so concurrently driven submissions overlap.
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Self::next(&self.creates)
    }

    async fn fetch_prediction(&self, _token: &str, id: &str) -> Result<RawResponse, GenerationError> {
        self.fetched.lock().push(id.to_string());
        Self::next(&self.fetches)
    }
}

/// Records requested waits instead of sleeping.
#[derive(Default)]
pub struct FakeSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl FakeSleeper {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().clone()
    }

    pub fn total(&self) -> Duration {
        self.waits.lock().iter().sum()
    }
}

#[async_trait]
impl Sleeper for FakeSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().push(duration);
    }
}
