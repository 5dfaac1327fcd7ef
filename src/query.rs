//! Async handles for the front end: reads as `Query`, writes as `Mutation`.
//!
//! Inspired by TanStack Query. A `Query<T, E>` runs a read and settles into
//! loading, success or error; a `Mutation<P, T, E>` does the same for a
//! write triggered with parameters. Work runs on spawned tasks so several can
//! be in flight at once.
//!
//! # Example
//!
//! ```ignore
//! let items = item_client.clone();
//! let mut best = Query::new(move || {
//!     let items = items.clone();
//!     let user = user.clone();
//!     async move { items.best_used_items(&user).await }
//! });
//!
//! best.fetch();
//! match best.settle().await {
//!     QueryState::Success(items) => print(items),
//!     QueryState::Error(e) => eprintln!("{e}"),
//!     _ => {}
//! }
//! ```

use futures::future;
use std::future::Future;
use tokio::sync::mpsc;

/// The state of a query or mutation
#[derive(Debug, Clone)]
pub enum QueryState<T, E> {
  /// Not started
  Idle,
  /// Request in flight
  Loading,
  /// Completed successfully
  Success(T),
  /// Completed with an error
  Error(E),
  /// The task ended without reporting back
  Cancelled,
}

impl<T, E> QueryState<T, E> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }
}

type BoxFuture<T, E> = future::BoxFuture<'static, Result<T, E>>;

/// Receives the outcome of a spawned task and folds it into a state.
struct Pending<T, E> {
  receiver: Option<mpsc::UnboundedReceiver<Result<T, E>>>,
}

impl<T: Send + 'static, E: Send + 'static> Pending<T, E> {
  fn new() -> Self {
    Self { receiver: None }
  }

  fn start(&mut self, future: BoxFuture<T, E>) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }

  /// Wait for the running task. `None` when nothing is pending.
  async fn wait(&mut self) -> Option<QueryState<T, E>> {
    let receiver = self.receiver.as_mut()?;
    let state = match receiver.recv().await {
      Some(Ok(data)) => QueryState::Success(data),
      Some(Err(error)) => QueryState::Error(error),
      None => QueryState::Cancelled,
    };
    self.receiver = None;
    Some(state)
  }
}

/// A factory function that creates futures for fetching data
type FetcherFn<T, E> = Box<dyn Fn() -> BoxFuture<T, E> + Send + Sync>;

/// Async read with loading/success/error state.
pub struct Query<T, E> {
  state: QueryState<T, E>,
  fetcher: FetcherFn<T, E>,
  pending: Pending<T, E>,
}

impl<T: Send + 'static, E: Send + 'static> Query<T, E> {
  /// Create a new query. The fetcher runs on every `fetch()`.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move || -> BoxFuture<T, E> { Box::pin(fetcher()) }),
      pending: Pending::new(),
    }
  }

  pub fn into_state(self) -> QueryState<T, E> {
    self.state
  }

  /// Start fetching. No-op while already loading.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.state = QueryState::Loading;
    self.pending.start((self.fetcher)());
  }

  /// Wait until the pending fetch (if any) completes.
  pub async fn settle(&mut self) -> &QueryState<T, E> {
    if let Some(state) = self.pending.wait().await {
      self.state = state;
    }
    &self.state
  }
}

impl<T: std::fmt::Debug, E: std::fmt::Debug> std::fmt::Debug for Query<T, E> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}

type RunnerFn<P, T, E> = Box<dyn Fn(P) -> BoxFuture<T, E> + Send + Sync>;

/// Async write with pending/success/error state.
pub struct Mutation<P, T, E> {
  state: QueryState<T, E>,
  runner: RunnerFn<P, T, E>,
  pending: Pending<T, E>,
}

impl<P: 'static, T: Send + 'static, E: Send + 'static> Mutation<P, T, E> {
  pub fn new<F, Fut>(runner: F) -> Self
  where
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      runner: Box::new(move |params| -> BoxFuture<T, E> { Box::pin(runner(params)) }),
      pending: Pending::new(),
    }
  }

  pub fn into_state(self) -> QueryState<T, E> {
    self.state
  }

  /// Trigger the write. Unlike queries, every call runs.
  pub fn mutate(&mut self, params: P) {
    self.state = QueryState::Loading;
    self.pending.start((self.runner)(params));
  }

  pub async fn settle(&mut self) -> &QueryState<T, E> {
    if let Some(state) = self.pending.wait().await {
      self.state = state;
    }
    &self.state
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  #[tokio::test]
  async fn test_query_success() {
    let mut query = Query::new(|| async { Ok::<_, String>(vec![1, 2, 3]) });

    query.fetch();
    assert!(matches!(query.settle().await, QueryState::Success(v) if v == &vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: Query<i32, String> =
      Query::new(|| async { Err("Something went wrong".to_string()) });

    query.fetch();
    assert!(matches!(query.settle().await, QueryState::Error(e) if e == "Something went wrong"));
  }

  #[tokio::test]
  async fn test_settle_without_fetch_is_idle() {
    let mut query = Query::new(|| async { Ok::<_, String>(1) });
    assert!(matches!(query.settle().await, QueryState::Idle));
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let mut query = Query::new(move || {
      let counter = counter.clone();
      async move {
        counter.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, String>(42)
      }
    });

    query.fetch();
    query.fetch();
    query.settle().await;

    assert!(matches!(query.into_state(), QueryState::Success(42)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_fetch_after_settle_runs_again() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let mut query = Query::new(move || {
      let n = counter.fetch_add(1, Ordering::SeqCst);
      async move { Ok::<_, String>(n) }
    });

    query.fetch();
    query.settle().await;
    query.fetch();
    assert!(matches!(query.settle().await, QueryState::Success(1)));
  }

  #[tokio::test(start_paused = true)]
  async fn test_queries_run_concurrently() {
    let make = |ms: u64| {
      Query::new(move || async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok::<_, String>(ms)
      })
    };
    let mut a = make(60);
    let mut b = make(60);

    let started = tokio::time::Instant::now();
    a.fetch();
    b.fetch();
    a.settle().await;
    b.settle().await;

    assert!(matches!(a.into_state(), QueryState::Success(60)));
    assert!(matches!(b.into_state(), QueryState::Success(60)));
    // Sequential runs would take 120ms of virtual time
    assert!(started.elapsed() < Duration::from_millis(120));
  }

  #[tokio::test]
  async fn test_panicking_fetch_is_cancelled() {
    let mut query: Query<i32, String> = Query::new(|| async {
      if true {
        panic!("boom");
      }
      Ok(1)
    });
    query.fetch();
    assert!(matches!(query.settle().await, QueryState::Cancelled));
  }

  #[tokio::test]
  async fn test_mutation_runs_every_trigger() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let mut mutation = Mutation::new(move |n: u32| {
      let counter = counter.clone();
      async move {
        counter.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
          Err("zero".to_string())
        } else {
          Ok(n * 2)
        }
      }
    });

    assert!(matches!(mutation.settle().await, QueryState::Idle));
    mutation.mutate(2);
    assert!(matches!(mutation.settle().await, QueryState::Success(4)));

    mutation.mutate(0);
    assert!(matches!(mutation.settle().await, QueryState::Error(e) if e == "zero"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }
}
