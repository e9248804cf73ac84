mod recording_session;
mod test_federation;

pub use recording_session::RecordingSession;
pub use test_federation::{attrs, federates, interval, time, TestFederation};

use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes env_logger once per test binary; safe to call from every test.
pub fn init_logger() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}
