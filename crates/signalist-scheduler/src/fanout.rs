//! Per-item fan-out: one isolated async transform per item, all awaited
//! together, results returned in input order with one slot per item.
//!
//! A transform that returns `Err` or panics only marks its own slot as
//! failed. Nothing escapes the `fan_out` call.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::future::join_all;
use signalist_core::error::Result;

/// Why a single item produced no output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub message: String,
    pub panicked: bool,
}

impl std::fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.panicked {
            write!(f, "panicked: {}", self.message)
        } else {
            f.write_str(&self.message)
        }
    }
}

/// Result slot for one input item.
#[derive(Debug, Clone)]
pub struct ItemOutcome<T, R> {
    pub index: usize,
    pub item: T,
    pub result: std::result::Result<R, ItemFailure>,
}

impl<T, R> ItemOutcome<T, R> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Run `transform` once per item concurrently and collect every outcome.
///
/// The returned vector has exactly `items.len()` entries, in input order,
/// regardless of how many transforms fail.
pub async fn fan_out<T, R, F, Fut>(items: Vec<T>, transform: F) -> Vec<ItemOutcome<T, R>>
where
    T: Clone,
    F: Fn(usize, T) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let transform = &transform;
    let branches = items.into_iter().enumerate().map(|(index, item)| {
        let input = item.clone();
        async move {
            let result = AssertUnwindSafe(async move { transform(index, input).await })
                .catch_unwind()
                .await;
            let result = match result {
                Ok(Ok(output)) => Ok(output),
                Ok(Err(e)) => Err(ItemFailure {
                    message: e.to_string(),
                    panicked: false,
                }),
                Err(payload) => Err(ItemFailure {
                    message: panic_message(payload.as_ref()),
                    panicked: true,
                }),
            };
            if let Err(failure) = &result {
                tracing::debug!("fan-out item {} failed: {}", index, failure);
            }
            ItemOutcome {
                index,
                item,
                result,
            }
        }
    });

    join_all(branches).await
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
