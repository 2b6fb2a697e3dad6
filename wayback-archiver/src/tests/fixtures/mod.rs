use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{ArchiveError, Result};
use crate::fetch::{FetchedPage, Fetcher};
use crate::index::{parse_index, IndexRecord};

/// Load an index fixture by name
pub fn load_index_fixture(fixture_name: &str) -> Vec<IndexRecord> {
    let path = Path::new("src/tests/fixtures").join(format!("{}.json", fixture_name));
    let json = fs::read_to_string(path)
        .unwrap_or_else(|_| panic!("Failed to load test fixture: {}", fixture_name));
    parse_index(&json).unwrap_or_else(|e| panic!("Invalid fixture {}: {}", fixture_name, e))
}

#[derive(Debug, Clone)]
pub enum StubResponse {
    Page(u16, &'static str),
    Status(u16),
    NetworkDown,
}

/// In-memory fetcher. Each URL answers from its queue; the last queued
/// response repeats. Unknown URLs get a 404.
#[derive(Default)]
pub struct StubFetcher {
    responses: Mutex<HashMap<String, VecDeque<StubResponse>>>,
    requests: Mutex<Vec<String>>,
    cancel_after: Option<(usize, Arc<AtomicBool>)>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, url: &str, response: StubResponse) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Raise `flag` once `count` requests have been served.
    pub fn cancel_after(mut self, count: usize, flag: Arc<AtomicBool>) -> Self {
        self.cancel_after = Some((count, flag));
        self
    }
}

impl Fetcher for StubFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let served = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(url.to_string());
            requests.len()
        };
        if let Some((count, flag)) = &self.cancel_after {
            if served >= *count {
                flag.store(true, Ordering::SeqCst);
            }
        }

        let response = {
            let mut responses = self.responses.lock().unwrap();
            match responses.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match response.unwrap_or(StubResponse::Status(404)) {
            StubResponse::Page(status, body) => Ok(FetchedPage {
                status,
                body: body.to_string(),
            }),
            StubResponse::Status(status) => Err(ArchiveError::HttpStatus { status }),
            StubResponse::NetworkDown => {
                Err(ArchiveError::Network("connection reset by peer".to_string()))
            }
        }
    }
}
