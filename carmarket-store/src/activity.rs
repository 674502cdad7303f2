use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use carmarket_shared::AppError;

/// Loading/error snapshot exposed by holders that talk to a backend.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct HolderStatus {
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Tracks in-flight backend calls and the last failure message.
#[derive(Clone, Default)]
pub(crate) struct Activity {
    in_flight: Arc<AtomicUsize>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl Activity {
    /// Marks one backend call as in flight until the guard drops.
    pub fn begin(&self) -> ActivityGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        ActivityGuard {
            in_flight: self.in_flight.clone(),
        }
    }

    /// Records the outcome of a backend call and passes it through.
    pub fn track<T>(&self, result: Result<T, AppError>) -> Result<T, AppError> {
        let mut last = self.last_error.lock().unwrap_or_else(PoisonError::into_inner);
        match &result {
            Ok(_) => *last = None,
            Err(e) => *last = Some(e.to_string()),
        }
        result
    }

    pub fn clear_error(&self) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn status(&self) -> HolderStatus {
        HolderStatus {
            is_loading: self.in_flight.load(Ordering::SeqCst) > 0,
            error: self
                .last_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}

pub(crate) struct ActivityGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carmarket_shared::ErrorCode;

    #[test]
    fn guard_toggles_loading() {
        let activity = Activity::default();
        assert!(!activity.status().is_loading);

        let guard = activity.begin();
        assert!(activity.status().is_loading);
        drop(guard);
        assert!(!activity.status().is_loading);
    }

    #[test]
    fn failure_is_recorded_until_cleared() {
        let activity = Activity::default();
        let result: Result<(), _> =
            activity.track(Err(AppError::new(ErrorCode::ServiceUnavailable, "backend offline")));
        assert!(result.is_err());
        assert_eq!(activity.status().error.as_deref(), Some("backend offline"));

        activity.clear_error();
        assert_eq!(activity.status(), HolderStatus::default());
    }

    #[test]
    fn success_clears_previous_error() {
        let activity = Activity::default();
        let _ = activity.track::<()>(Err(AppError::internal("boom")));
        let _ = activity.track(Ok(()));
        assert!(activity.status().error.is_none());
    }
}
