//! Scripted in-memory remote client for unit tests

use crate::client::{ClientResult, RemoteClient, RemoteSnapshot, SnapshotRequest, SnapshotState};
use crate::error::ClientError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Replays queued responses; the last `find` response repeats once the queue drains
pub(crate) struct ScriptedClient {
    create: Mutex<ClientResult<RemoteSnapshot>>,
    finds: Mutex<VecDeque<ClientResult<RemoteSnapshot>>>,
    last_find: Mutex<Option<ClientResult<RemoteSnapshot>>>,
    delete: Mutex<ClientResult<()>>,
    pub requests: Mutex<Vec<(String, SnapshotRequest)>>,
    pub find_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            create: Mutex::new(Ok(snapshot("snap-1", SnapshotState::Pending))),
            finds: Mutex::new(VecDeque::new()),
            last_find: Mutex::new(None),
            delete: Mutex::new(Ok(())),
            requests: Mutex::new(Vec::new()),
            find_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    pub fn on_create(self, result: ClientResult<RemoteSnapshot>) -> Self {
        *self.create.lock().unwrap() = result;
        self
    }

    pub fn on_find(self, result: ClientResult<RemoteSnapshot>) -> Self {
        self.finds.lock().unwrap().push_back(result);
        self
    }

    pub fn on_delete(self, result: ClientResult<()>) -> Self {
        *self.delete.lock().unwrap() = result;
        self
    }

    pub fn finds(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn create(&self, name: &str, request: &SnapshotRequest) -> ClientResult<RemoteSnapshot> {
        self.requests
            .lock()
            .unwrap()
            .push((name.to_string(), request.clone()));
        self.create.lock().unwrap().clone()
    }

    async fn find(&self, id: &str) -> ClientResult<RemoteSnapshot> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.finds.lock().unwrap().pop_front();
        let mut last = self.last_find.lock().unwrap();
        match next {
            Some(result) => {
                *last = Some(result.clone());
                result
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(ClientError::NotFound(id.to_string()))),
        }
    }

    async fn delete(&self, _id: &str) -> ClientResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.delete.lock().unwrap().clone()
    }
}

pub(crate) fn snapshot(id: &str, state: SnapshotState) -> RemoteSnapshot {
    RemoteSnapshot {
        id: id.to_string(),
        name: "db-snap".to_string(),
        instance_id: "i-123".to_string(),
        region: "LON1".to_string(),
        state,
        ..Default::default()
    }
}
