pub mod builders;
pub mod failing_db;
pub mod fake_executor;

use std::sync::Arc;
use std::sync::Once;

use bootqueue::db::{Database, MemDb};
use bootqueue::state::{Scheduler, SchedulerOptions};
use tracing_subscriber::{fmt, EnvFilter};

pub use builders::{Ledger, TestJob, TestParser};
pub use failing_db::FailingDb;
pub use fake_executor::RecordingExecutor;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Scheduler over `db` with default options and no metrics registry.
pub fn open_scheduler(db: Arc<dyn Database>, ledger: &Ledger) -> Scheduler<TestParser> {
    Scheduler::open(
        db,
        TestParser::new(ledger.clone()),
        &SchedulerOptions::default(),
        None,
    )
    .expect("failed to open scheduler")
}

/// Fresh in-memory store plus a scheduler over it.
///
/// The returned `MemDb` shares state with the scheduler, so a second
/// [`open_scheduler`] on it behaves like a restart.
pub fn mem_scheduler(ledger: &Ledger) -> (MemDb, Scheduler<TestParser>) {
    let db = MemDb::new();
    let scheduler = open_scheduler(Arc::new(db.clone()), ledger);
    (db, scheduler)
}
