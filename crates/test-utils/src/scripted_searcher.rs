use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use ldapwatch::search::{Entry, Query, SearchError, SearchFuture, Searcher};

pub type Reply = Result<Vec<Entry>, SearchError>;

#[derive(Default)]
struct Script {
    replies: VecDeque<Reply>,
    last: Option<Reply>,
}

/// A fake searcher that:
/// - answers per query filter from a script, one reply per call
/// - repeats the last scripted reply once the script runs out
/// - answers unknown filters with zero entries
/// - counts calls per filter
#[derive(Default)]
pub struct ScriptedSearcher {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
    hang: bool,
}

impl ScriptedSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replies for queries whose filter equals `filter`, in call order.
    pub fn script<I>(self, filter: &str, replies: I) -> Self
    where
        I: IntoIterator<Item = Reply>,
    {
        self.scripts
            .lock()
            .unwrap()
            .entry(filter.to_string())
            .or_default()
            .replies
            .extend(replies);
        self
    }

    /// Sleep this long before every reply.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Never reply at all.
    pub fn hang(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn calls(&self, filter: &str) -> usize {
        self.calls.lock().unwrap().get(filter).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn next_reply(&self, filter: &str) -> Reply {
        *self.calls.lock().unwrap().entry(filter.to_string()).or_default() += 1;

        let mut scripts = self.scripts.lock().unwrap();
        let Some(script) = scripts.get_mut(filter) else {
            return Ok(Vec::new());
        };
        match script.replies.pop_front() {
            Some(reply) => {
                script.last = Some(reply.clone());
                reply
            }
            None => script.last.clone().unwrap_or_else(|| Ok(Vec::new())),
        }
    }
}

impl Searcher for ScriptedSearcher {
    fn search<'a>(&'a self, query: &'a Query) -> SearchFuture<'a> {
        Box::pin(async move {
            if self.hang {
                std::future::pending::<()>().await;
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.next_reply(&query.filter)
        })
    }
}
