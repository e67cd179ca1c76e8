//! Platform abstraction.
//!
//! The runtime never talks to an OS launcher, keyboard, or UI directly; it
//! goes through this trait. Real implementations live per platform outside
//! this crate. `StubPlatform` backs the CLI's dry-run mode and the tests,
//! recording every call it receives.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::config::Config;
use crate::error::ZapResult;

/// An external launcher record, selected either by explicit advanced arg or
/// by auto-detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launcher {
    pub id: String,
    pub system_id: Option<String>,
    pub name: String,
}

/// One entry offered by the UI picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerItem {
    pub label: String,
    /// ZapScript executed when the entry is chosen.
    pub zapscript: String,
}

#[async_trait]
pub trait Platform: Send + Sync {
    /// Stable platform identifier, also sent as `Zaparoo-Platform` on
    /// remote requests.
    fn id(&self) -> &str;

    fn launchers(&self, cfg: &Config) -> Vec<Launcher>;

    async fn launch_media(
        &self,
        cfg: &Config,
        path: &str,
        launcher: Option<&Launcher>,
    ) -> ZapResult<()>;

    async fn launch_system(&self, cfg: &Config, system_id: &str) -> ZapResult<()>;

    async fn stop_active_launcher(&self) -> ZapResult<()>;

    async fn return_to_menu(&self) -> ZapResult<()>;

    async fn keyboard_press(&self, key: &str) -> ZapResult<()>;

    async fn gamepad_press(&self, key: &str) -> ZapResult<()>;

    async fn show_picker(&self, cfg: &Config, items: &[PickerItem]) -> ZapResult<()>;

    /// Root directories walked when a relative launch path is resolved.
    fn root_dirs(&self, cfg: &Config) -> Vec<PathBuf>;

    fn temp_dir(&self) -> PathBuf;
}

/// Recording no-op platform.
#[derive(Debug, Default)]
pub struct StubPlatform {
    launchers: Vec<Launcher>,
    events: Mutex<Vec<String>>,
}

impl StubPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_launchers(launchers: Vec<Launcher>) -> Self {
        Self {
            launchers,
            events: Mutex::new(Vec::new()),
        }
    }

    /// Everything this platform was asked to do, in order.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: String) {
        info!(event = %event, "platform stub");
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl Platform for StubPlatform {
    fn id(&self) -> &str {
        "stub"
    }

    fn launchers(&self, _cfg: &Config) -> Vec<Launcher> {
        self.launchers.clone()
    }

    async fn launch_media(
        &self,
        _cfg: &Config,
        path: &str,
        launcher: Option<&Launcher>,
    ) -> ZapResult<()> {
        match launcher {
            Some(l) => self.record(format!("launch_media:{path}:{}", l.id)),
            None => self.record(format!("launch_media:{path}")),
        }
        Ok(())
    }

    async fn launch_system(&self, _cfg: &Config, system_id: &str) -> ZapResult<()> {
        self.record(format!("launch_system:{system_id}"));
        Ok(())
    }

    async fn stop_active_launcher(&self) -> ZapResult<()> {
        self.record("stop_active_launcher".into());
        Ok(())
    }

    async fn return_to_menu(&self) -> ZapResult<()> {
        self.record("return_to_menu".into());
        Ok(())
    }

    async fn keyboard_press(&self, key: &str) -> ZapResult<()> {
        self.record(format!("keyboard_press:{key}"));
        Ok(())
    }

    async fn gamepad_press(&self, key: &str) -> ZapResult<()> {
        self.record(format!("gamepad_press:{key}"));
        Ok(())
    }

    async fn show_picker(&self, _cfg: &Config, items: &[PickerItem]) -> ZapResult<()> {
        self.record(format!("show_picker:{}", items.len()));
        Ok(())
    }

    fn root_dirs(&self, cfg: &Config) -> Vec<PathBuf> {
        cfg.root_dirs.iter().map(PathBuf::from).collect()
    }

    fn temp_dir(&self) -> PathBuf {
        std::env::temp_dir()
    }
}
