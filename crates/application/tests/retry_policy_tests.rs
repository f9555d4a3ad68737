use application::connection::ConnectionManager;
use application::printer::{DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES, RetryPolicy};
use domain::{InitializationState, PrintError};
use infrastructure::printer::MockPrinterDriver;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

fn setup() -> (MockPrinterDriver, Arc<ConnectionManager>, RetryPolicy) {
    let driver = MockPrinterDriver::new();
    let manager = Arc::new(ConnectionManager::new(Arc::new(driver.clone()), None));
    let policy = RetryPolicy::new(manager.clone(), DEFAULT_BASE_DELAY);
    (driver, manager, policy)
}

#[tokio::test(start_paused = true)] // always_transient_operation_runs_max_retries_plus_one_times
async fn always_transient_operation_runs_max_retries_plus_one_times() {
    let (_, _, policy) = setup();
    let calls = &AtomicUsize::new(0);

    let err = policy
        .run(DEFAULT_MAX_RETRIES, "print receipt", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(PrintError::OpenFailed("failed to open device: busy".to_string()))
        })
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert!(matches!(err, PrintError::RetriesExhausted { retries: 3, .. }));
    let message = err.to_string();
    assert!(message.contains("3 retries"), "{message}");
    assert!(message.contains("failed to open device: busy"), "{message}");
}

#[tokio::test(start_paused = true)] // permanent_error_short_circuits
async fn permanent_error_short_circuits() {
    let (_, _, policy) = setup();
    let calls = &AtomicUsize::new(0);

    let err = policy
        .run(DEFAULT_MAX_RETRIES, "print receipt", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(PrintError::NoDeviceFound)
        })
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(err, PrintError::NoDeviceFound);
}

#[tokio::test(start_paused = true)] // permanent_emission_error_is_not_retried
async fn permanent_emission_error_is_not_retried() {
    let (_, _, policy) = setup();
    let calls = &AtomicUsize::new(0);

    let err = policy
        .run(DEFAULT_MAX_RETRIES, "print receipt", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(PrintError::EmissionFailed("paper out".to_string()))
        })
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(err, PrintError::EmissionFailed("paper out".to_string()));
}

#[tokio::test(start_paused = true)] // backoff_doubles_between_attempts
async fn backoff_doubles_between_attempts() {
    let (_, _, policy) = setup();
    let start = Instant::now();
    let attempts = Mutex::new(Vec::new());
    let recorded = &attempts;

    let _ = policy
        .run(3, "print receipt", || async move {
            recorded.lock().await.push(start.elapsed());
            Err::<(), _>(PrintError::Timeout(Duration::from_secs(15)))
        })
        .await;

    let attempts = attempts.into_inner();
    assert_eq!(
        attempts,
        vec![
            Duration::ZERO,
            Duration::from_millis(1000),
            Duration::from_millis(3000),
            Duration::from_millis(7000),
        ]
    );
}

#[tokio::test(start_paused = true)] // succeeds_after_transient_failures
async fn succeeds_after_transient_failures() {
    let (_, _, policy) = setup();
    let calls = &AtomicUsize::new(0);

    let value = policy
        .run(DEFAULT_MAX_RETRIES, "print receipt", || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(PrintError::EmissionFailed("write: I/O error: EAGAIN".to_string()))
            } else {
                Ok("printed")
            }
        })
        .await
        .unwrap();

    assert_eq!(value, "printed");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)] // manager_reset_before_each_retry
async fn manager_reset_before_each_retry() {
    let (driver, manager, policy) = setup();
    let manager = &manager;
    let calls = &AtomicUsize::new(0);

    let _ = policy
        .run(2, "print receipt", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            // Each attempt finds the handle cleared by the preceding reset
            assert_eq!(manager.state().await, InitializationState::Uninitialized);
            manager.acquire().await?;
            Err::<(), _>(PrintError::Timeout(Duration::from_secs(1)))
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(driver.discover_calls(), 3);
}
