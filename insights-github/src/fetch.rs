//! Lazy pagination on top of the retry policy

use std::future::Future;

use tracing::{debug, info, warn};

use crate::retry::RetryPolicy;
use crate::{Error, Result};

/// Items collected from a paginated resource, with the error that cut the
/// listing short if there was one
#[derive(Debug)]
pub struct Fetched<T> {
    pub items: Vec<T>,
    pub error: Option<Error>,
}

impl<T> Fetched<T> {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Walks a paginated listing one page at a time
///
/// Pages are requested in order starting at 1 and each request goes through
/// the [`RetryPolicy`]. The listing ends at the first empty page. After an
/// error the paginator is finished and yields nothing more.
#[derive(Debug)]
pub struct Paginator<'p> {
    policy: &'p RetryPolicy,
    resource: String,
    per_page: u8,
    next_page: u32,
    done: bool,
}

impl<'p> Paginator<'p> {
    pub fn new(policy: &'p RetryPolicy, resource: impl Into<String>, per_page: u8) -> Self {
        Self {
            policy,
            resource: resource.into(),
            per_page,
            next_page: 1,
            done: false,
        }
    }

    /// Fetch the next non-empty batch; `Ok(None)` once the listing is exhausted
    pub async fn next_batch<T, F, Fut>(&mut self, mut fetch: F) -> Result<Option<Vec<T>>>
    where
        F: FnMut(u32, u8) -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        if self.done {
            return Ok(None);
        }

        let page = self.next_page;
        let per_page = self.per_page;
        let label = format!("{} page {}", self.resource, page);

        match self.policy.run(&label, || fetch(page, per_page)).await {
            Ok(items) if items.is_empty() => {
                debug!(resource = %self.resource, page, "Reached empty page");
                self.done = true;
                Ok(None)
            }
            Ok(items) => {
                debug!(resource = %self.resource, page, count = items.len(), "Fetched page");
                self.next_page += 1;
                Ok(Some(items))
            }
            Err(err) => {
                self.done = true;
                Err(err)
            }
        }
    }

    /// Drain every page, keeping what was fetched before any failure
    pub async fn collect<T, F, Fut>(mut self, mut fetch: F) -> Fetched<T>
    where
        F: FnMut(u32, u8) -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        let mut items = Vec::new();

        loop {
            match self.next_batch(&mut fetch).await {
                Ok(Some(batch)) => items.extend(batch),
                Ok(None) => {
                    info!(resource = %self.resource, count = items.len(), "Fetched all pages");
                    return Fetched { items, error: None };
                }
                Err(err) => {
                    warn!(
                        resource = %self.resource,
                        kept = items.len(),
                        error = %err,
                        "Listing aborted, keeping partial results"
                    );
                    return Fetched {
                        items,
                        error: Some(err),
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            backoff: Duration::from_millis(10),
            rate_limit_fallback: Duration::from_secs(1),
            max_rate_limit_waits: 10,
            throttle: Duration::ZERO,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_until_empty_page() {
        let policy = policy();
        let requested = Mutex::new(Vec::new());
        let requested_ref = &requested;

        let fetched = Paginator::new(&policy, "issues", 2)
            .collect(move |page, per_page| async move {
                requested_ref.lock().unwrap().push((page, per_page));
                Ok(match page {
                    1 => vec![1, 2],
                    2 => vec![3],
                    _ => vec![],
                })
            })
            .await;

        assert!(fetched.is_complete());
        assert_eq!(fetched.items, vec![1, 2, 3]);
        assert_eq!(*requested.lock().unwrap(), vec![(1, 2), (2, 2), (3, 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_keeps_partial_results() {
        let policy = policy();

        let fetched: Fetched<u32> = Paginator::new(&policy, "releases", 100)
            .collect(|page, _| async move {
                if page == 1 {
                    Ok(vec![10, 11])
                } else {
                    Err(Error::Transient("connection refused".into()))
                }
            })
            .await;

        assert_eq!(fetched.items, vec![10, 11]);
        assert!(matches!(
            fetched.error,
            Some(Error::RetriesExhausted { attempts: 2, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_error_aborts_listing() {
        let policy = policy();
        let mut pages = Paginator::new(&policy, "issues", 100);

        let first = pages
            .next_batch(|_, _| async { Ok(vec!["a"]) })
            .await
            .unwrap();
        assert_eq!(first, Some(vec!["a"]));

        let second = pages
            .next_batch(|_, _| async {
                Err::<Vec<&str>, _>(Error::Status {
                    status: 500,
                    body: "oops".into(),
                })
            })
            .await;
        assert!(matches!(second, Err(Error::Status { status: 500, .. })));

        let third = pages
            .next_batch(|_, _| async { Ok(vec!["never"]) })
            .await
            .unwrap();
        assert_eq!(third, None);
    }
}
