//! Shared test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use steerable_aqp::source::{Block, BlockSource, SourceError, SourceResult};

/// One scripted reply
#[derive(Debug, Clone)]
pub enum Reply {
    Rows(Vec<f64>),
    Fail(SourceError),
}

/// Source that replays a fixed script and records every request
pub struct ScriptedSource {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<(Option<String>, u64, u64)>>,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Convenience: every reply is a successful block
    pub fn blocks(blocks: Vec<Vec<f64>>) -> Self {
        Self::new(blocks.into_iter().map(Reply::Rows).collect())
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// `(column, offset, limit)` of every fetch, in order
    pub fn requests(&self) -> Vec<(Option<String>, u64, u64)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlockSource for ScriptedSource {
    async fn fetch(&self, column: Option<&str>, offset: u64, limit: u64) -> SourceResult<Block> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((column.map(str::to_string), offset, limit));

        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Rows(values)) if column.is_none() => Ok(Block::rows_only(values.len() as u64)),
            Some(Reply::Rows(values)) => Ok(Block::from_values(values)),
            Some(Reply::Fail(err)) => Err(err),
            None => Ok(Block::empty()),
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

/// Repeating 10/20 pattern, stationary mean 15
pub fn stationary_blocks(blocks: usize, block_size: usize) -> Vec<Vec<f64>> {
    (0..blocks)
        .map(|b| {
            (0..block_size)
                .map(|i| if (b * block_size + i) % 2 == 0 { 10.0 } else { 20.0 })
                .collect()
        })
        .collect()
}
