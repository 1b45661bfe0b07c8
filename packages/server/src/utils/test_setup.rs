use dotenvy::dotenv;
use std::sync::Once;
use std::time::Duration;

use crate::models::config::GameConfig;

static INIT: Once = Once::new();

/// Loads `.env` if present and routes tracing output through the test harness.
pub fn setup_test_env() {
    INIT.call_once(|| {
        dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// Short, fixed-seed timings for tests driven by paused tokio time.
pub fn test_config() -> GameConfig {
    GameConfig {
        night_duration: Duration::from_secs(20),
        day_duration: Duration::from_secs(30),
        reveal_delay: Duration::from_secs(5),
        role_seed: Some(7),
        channel_capacity: 64,
    }
}
