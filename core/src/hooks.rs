use async_trait::async_trait;
use tracing::info;

/// Result of a game-lifecycle hook. Hooks never fail an operation; a
/// failure outcome is surfaced to the user as a warning.
#[derive(Debug, Clone)]
pub struct HookOutcome {
    pub ok: bool,
    pub message: String,
}

impl HookOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Optional pre/post hooks around backup and restore: drive the game back
/// to its menu so it flushes its save files, or make it reload them
/// afterwards. Implementations live outside the engine (window focusing,
/// key simulation).
#[async_trait]
pub trait GameLifecycle: Send + Sync {
    async fn exit_game(&self) -> HookOutcome;
    async fn load_game(&self) -> HookOutcome;
}

/// Lifecycle for headless use: every hook trivially succeeds.
pub struct NoopLifecycle;

#[async_trait]
impl GameLifecycle for NoopLifecycle {
    async fn exit_game(&self) -> HookOutcome {
        HookOutcome::success("no game lifecycle configured")
    }

    async fn load_game(&self) -> HookOutcome {
        HookOutcome::success("no game lifecycle configured")
    }
}

/// One-way sink for user-facing progress and result text.
pub trait StatusSink: Send + Sync {
    fn report(&self, message: &str);
}

/// Routes status text through the logging pipeline.
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn report(&self, message: &str) {
        info!("{message}");
    }
}
