//! Command dispatcher.
//!
//! One script runs on one task: commands execute strictly in order, each
//! completing (including persistent side effects) before the next starts.
//! Cross-cutting gates run before any handler: the playtime-limit gate
//! rejects media-launching commands, the unsafe-source gate rejects input
//! injection and arbitrary execution from remote scans.

pub mod commands;
pub mod playlist;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::database_ops::{db::Db, media};
use crate::error::{ZapError, ZapResult};
use crate::normalization::{parse_adv_tags, slugify};
use crate::platform::{Launcher, PickerItem, Platform};
use crate::resolver::{self, might_be_title};
use crate::systems;
use crate::zaplink;
use crate::zapscript::{parse_script, Command, Script};
use commands::CommandKind;
use playlist::{parse_items, PlaylistState};

/// Sleep between injected key events.
const KEY_EVENT_DELAY: Duration = Duration::from_millis(100);
/// Deadline owned by each fire-and-forget HTTP task.
const FIRE_AND_FORGET_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a command handler can reach.
pub struct CmdEnv {
    pub cfg: Arc<Config>,
    pub media_db: Db,
    pub user_db: Db,
    pub platform: Arc<dyn Platform>,
    pub http: Client,
    /// The single active playlist, owned by the dispatcher.
    pub playlist: Option<PlaylistState>,
    /// Script came from a remote scan; input injection is refused.
    pub unsafe_source: bool,
    /// Playtime-limit gate; media-launching commands are refused while set.
    pub media_launch_blocked: bool,
    /// External cancellation: checked between commands.
    pub cancelled: Arc<AtomicBool>,
    pub current_index: usize,
    pub total_commands: usize,
}

impl CmdEnv {
    pub fn new(cfg: Arc<Config>, media_db: Db, user_db: Db, platform: Arc<dyn Platform>) -> Self {
        Self {
            cfg,
            media_db,
            user_db,
            platform,
            http: Client::new(),
            playlist: None,
            unsafe_source: false,
            media_launch_blocked: false,
            cancelled: Arc::new(AtomicBool::new(false)),
            current_index: 0,
            total_commands: 0,
        }
    }
}

/// Outcome of one command (or one script, folded).
#[derive(Debug, Clone, Default)]
pub struct CmdResult {
    pub media_changed: bool,
    pub playlist_changed: bool,
    pub playlist: Option<PlaylistState>,
    /// Resolver strategy that produced a launched title, when one did.
    pub strategy: Option<String>,
}

impl CmdResult {
    fn media() -> Self {
        Self {
            media_changed: true,
            ..Self::default()
        }
    }

    fn merge(&mut self, other: CmdResult) {
        self.media_changed |= other.media_changed;
        self.playlist_changed |= other.playlist_changed;
        if other.playlist.is_some() {
            self.playlist = other.playlist;
        }
        if other.strategy.is_some() {
            self.strategy = other.strategy;
        }
    }
}

/// Run a script's commands in order. Stops before the next command when the
/// cancellation flag is set; the first command error aborts the rest.
pub async fn run_script(env: &mut CmdEnv, script: &Script) -> ZapResult<CmdResult> {
    let mut summary = CmdResult::default();
    env.total_commands = script.commands.len();
    for (index, cmd) in script.commands.iter().enumerate() {
        if env.cancelled.load(Ordering::Relaxed) {
            info!(index, "script cancelled; stopping before next command");
            break;
        }
        env.current_index = index;
        debug!(index, command = %cmd.name, "dispatching");
        summary.merge(dispatch(env, cmd.clone(), true).await?);
    }
    summary.playlist = env.playlist.clone();
    Ok(summary)
}

/// Dispatch a single command through the gates to its handler.
///
/// `allow_link` permits zap-link resolution of launch arguments; it is off
/// for commands spliced in from a fetched remote script, so a remote script
/// cannot chain to another remote script.
pub fn dispatch(
    env: &mut CmdEnv,
    cmd: Command,
    allow_link: bool,
) -> BoxFuture<'_, ZapResult<CmdResult>> {
    async move {
        let kind = CommandKind::from_name(&cmd.name)
            .ok_or_else(|| ZapError::InvalidCommand(cmd.name.clone()))?;

        if env.media_launch_blocked && kind.is_media_launching() {
            return Err(ZapError::MediaLaunchBlocked);
        }
        if env.unsafe_source && kind.is_unsafe_gated() {
            return Err(ZapError::UnsafeSource(cmd.name.clone()));
        }

        match kind {
            CommandKind::Launch => launch(env, &cmd, allow_link).await,
            CommandKind::LaunchTitle => launch_title(env, &cmd).await,
            CommandKind::LaunchSystem => launch_system(env, &cmd).await,
            CommandKind::LaunchRandom => launch_random(env, &cmd).await,
            CommandKind::LaunchSearch => launch_search(env, &cmd).await,
            CommandKind::PlaylistLoad => playlist_load(env, &cmd, false).await,
            CommandKind::PlaylistOpen => playlist_load(env, &cmd, true).await,
            CommandKind::PlaylistPlay => playlist_play(env).await,
            CommandKind::PlaylistStop => playlist_stop(env).await,
            CommandKind::PlaylistPause => playlist_pause(env),
            CommandKind::PlaylistNext => playlist_step(env, true).await,
            CommandKind::PlaylistPrevious => playlist_step(env, false).await,
            CommandKind::PlaylistGoto => playlist_goto(env, &cmd).await,
            CommandKind::InputKeyboard => input_keys(env, &cmd, false).await,
            CommandKind::InputGamepad => input_keys(env, &cmd, true).await,
            CommandKind::InputCoinP1 => input_coin(env, &cmd, "5").await,
            CommandKind::InputCoinP2 => input_coin(env, &cmd, "6").await,
            CommandKind::HttpGet => http_get(env, &cmd),
            CommandKind::HttpPost => http_post(env, &cmd),
            CommandKind::Execute => execute(&cmd).await,
            CommandKind::Delay => delay(&cmd).await,
            CommandKind::Stop => stop(env).await,
            CommandKind::Echo => echo(&cmd),
            CommandKind::Evaluate => evaluate(env, &cmd).await,
            CommandKind::UiNotice => ui_notice(&cmd),
            CommandKind::UiPicker => ui_picker(env, &cmd).await,
            CommandKind::MisterMgl | CommandKind::MisterCore | CommandKind::MisterIni
            | CommandKind::MisterScript => mister(env, &cmd, kind).await,
        }
    }
    .boxed()
}

fn require_one_arg(cmd: &Command) -> ZapResult<&str> {
    if cmd.args.len() != 1 {
        return Err(ZapError::ArgCount {
            expected: 1,
            got: cmd.args.len(),
        });
    }
    let arg = cmd.args[0].trim();
    if arg.is_empty() {
        return Err(ZapError::RequiredArgs);
    }
    Ok(arg)
}

fn first_arg(cmd: &Command) -> ZapResult<&str> {
    let arg = cmd
        .args
        .first()
        .ok_or(ZapError::ArgCount {
            expected: 1,
            got: 0,
        })?
        .trim();
    if arg.is_empty() {
        return Err(ZapError::RequiredArgs);
    }
    Ok(arg)
}

/// Resolve the `launcher=` / `system=` advanced args to a launcher.
///
/// An unknown `launcher=` id is always fatal. An unknown `system=` is fatal
/// only when the caller says so: `launch.title` treats it as a validation
/// error, generic `launch` logs and falls back to auto-detect.
fn select_launcher(env: &CmdEnv, cmd: &Command, system_fatal: bool) -> ZapResult<Option<Launcher>> {
    if let Some(id) = cmd.adv_args.get("launcher") {
        return env
            .platform
            .launchers(&env.cfg)
            .into_iter()
            .find(|l| l.id == *id)
            .map(Some)
            .ok_or_else(|| ZapError::LauncherNotFound(id.clone()));
    }

    if let Some(raw) = cmd.adv_args.get("system") {
        match systems::lookup(raw) {
            Some(sys) => {
                if let Some(default_id) = sys.default_launcher {
                    let found = env
                        .platform
                        .launchers(&env.cfg)
                        .into_iter()
                        .find(|l| l.id == default_id);
                    if found.is_none() {
                        warn!(launcher = %default_id, system = %sys.id, "system default launcher not available");
                    }
                    return Ok(found);
                }
            }
            None if system_fatal => return Err(ZapError::SystemNotFound(raw.clone())),
            None => {
                warn!(system = %raw, "unknown system in advanced arg; falling back to auto-detect")
            }
        }
    }
    Ok(None)
}

async fn launch(env: &mut CmdEnv, cmd: &Command, allow_link: bool) -> ZapResult<CmdResult> {
    let arg = require_one_arg(cmd)?.to_string();

    if allow_link {
        let platform_id = env.platform.id().to_string();
        if let Some(body) =
            zaplink::check_zap_link(&env.user_db, &env.http, &platform_id, &arg).await?
        {
            let script = parse_script(&body)?;
            info!(commands = script.commands.len(), url = %arg, "running fetched zap-link script");
            let mut summary = CmdResult::default();
            for sub in script.commands {
                summary.merge(dispatch(env, sub, false).await?);
            }
            return Ok(summary);
        }
    }

    let launcher = select_launcher(env, cmd, false)?;

    // URIs and absolute paths launch directly.
    if arg.contains("://") || arg.starts_with('/') {
        env.platform
            .launch_media(&env.cfg, &arg, launcher.as_ref())
            .await?;
        return Ok(CmdResult::media());
    }

    // Relative path: launcher folder walk.
    for root in env.platform.root_dirs(&env.cfg) {
        let candidate = root.join(&arg);
        if candidate.exists() {
            env.platform
                .launch_media(&env.cfg, &candidate.to_string_lossy(), launcher.as_ref())
                .await?;
            return Ok(CmdResult::media());
        }
    }

    if might_be_title(&arg) {
        return launch_resolved_title(env, &arg, cmd, launcher).await;
    }
    Err(ZapError::FileNotFound(arg))
}

async fn launch_title(env: &mut CmdEnv, cmd: &Command) -> ZapResult<CmdResult> {
    let arg = require_one_arg(cmd)?.to_string();
    let launcher = select_launcher(env, cmd, true)?;
    launch_resolved_title(env, &arg, cmd, launcher).await
}

async fn launch_resolved_title(
    env: &mut CmdEnv,
    arg: &str,
    cmd: &Command,
    launcher: Option<Launcher>,
) -> ZapResult<CmdResult> {
    let adv_tags = cmd
        .adv_args
        .get("tags")
        .map(|raw| parse_adv_tags(raw))
        .unwrap_or_default();
    let resolved = resolver::resolve_title(&env.media_db, &env.cfg, arg, &adv_tags).await?;
    env.platform
        .launch_media(&env.cfg, &resolved.media.path, launcher.as_ref())
        .await?;
    Ok(CmdResult {
        media_changed: true,
        strategy: Some(resolved.strategy),
        ..CmdResult::default()
    })
}

async fn launch_system(env: &mut CmdEnv, cmd: &Command) -> ZapResult<CmdResult> {
    let arg = require_one_arg(cmd)?;
    let system =
        systems::lookup(arg).ok_or_else(|| ZapError::SystemNotFound(arg.to_string()))?;
    env.platform.launch_system(&env.cfg, system.id).await?;
    Ok(CmdResult::media())
}

async fn launch_random(env: &mut CmdEnv, cmd: &Command) -> ZapResult<CmdResult> {
    let arg = require_one_arg(cmd)?;
    let system =
        systems::lookup(arg).ok_or_else(|| ZapError::SystemNotFound(arg.to_string()))?;
    let entry = media::random_media(&env.media_db, system.id)
        .await?
        .ok_or_else(|| ZapError::NoResults {
            system: system.id.to_string(),
            query: "<random>".to_string(),
        })?;
    let launcher = select_launcher(env, cmd, false)?;
    env.platform
        .launch_media(&env.cfg, &entry.path, launcher.as_ref())
        .await?;
    Ok(CmdResult::media())
}

async fn launch_search(env: &mut CmdEnv, cmd: &Command) -> ZapResult<CmdResult> {
    let arg = require_one_arg(cmd)?;
    let Some((system_raw, query)) = arg.split_once('/') else {
        return Err(ZapError::InvalidFormat(arg.to_string()));
    };
    if system_raw.trim().is_empty() || query.trim().is_empty() {
        return Err(ZapError::InvalidFormat(arg.to_string()));
    }
    let system = systems::lookup(system_raw)
        .ok_or_else(|| ZapError::SystemNotFound(system_raw.to_string()))?;

    let matches =
        media::search_media_by_slug_prefix(&env.media_db, system.id, &slugify(query)).await?;
    match matches.len() {
        0 => Err(ZapError::NoResults {
            system: system.id.to_string(),
            query: query.trim().to_string(),
        }),
        1 => {
            let launcher = select_launcher(env, cmd, false)?;
            env.platform
                .launch_media(&env.cfg, &matches[0].path, launcher.as_ref())
                .await?;
            Ok(CmdResult::media())
        }
        _ => {
            let items: Vec<PickerItem> = matches
                .iter()
                .map(|m| PickerItem {
                    label: format!("{} ({})", m.name, m.base_filename()),
                    zapscript: format!("**launch:{}", m.path),
                })
                .collect();
            env.platform.show_picker(&env.cfg, &items).await?;
            Ok(CmdResult::default())
        }
    }
}

async fn playlist_load(env: &mut CmdEnv, cmd: &Command, open: bool) -> ZapResult<CmdResult> {
    let arg = require_one_arg(cmd)?.to_string();
    let source = if Path::new(&arg).is_file() {
        tokio::fs::read_to_string(&arg).await?
    } else {
        arg.clone()
    };
    let items = parse_items(&source);
    if items.is_empty() {
        return Err(ZapError::InvalidFormat(arg));
    }

    let mut state = PlaylistState::new(&arg, items);
    state.playing = open;
    let first = state.current().map(|item| item.path.clone());
    env.playlist = Some(state);

    let mut result = CmdResult {
        playlist_changed: true,
        playlist: env.playlist.clone(),
        ..CmdResult::default()
    };
    if open {
        if let Some(path) = first {
            result.merge(dispatch(env, Command::new("launch", vec![path]), false).await?);
        }
    }
    Ok(result)
}

async fn launch_current_item(env: &mut CmdEnv) -> ZapResult<CmdResult> {
    let Some(path) = env
        .playlist
        .as_ref()
        .and_then(|p| p.current())
        .map(|item| item.path.clone())
    else {
        return Ok(CmdResult::default());
    };
    dispatch(env, Command::new("launch", vec![path]), false).await
}

async fn playlist_play(env: &mut CmdEnv) -> ZapResult<CmdResult> {
    let Some(state) = env.playlist.as_mut() else {
        warn!("playlist.play with no active playlist");
        return Ok(CmdResult::default());
    };
    state.playing = true;
    let mut result = launch_current_item(env).await?;
    result.playlist_changed = true;
    result.playlist = env.playlist.clone();
    Ok(result)
}

async fn playlist_stop(env: &mut CmdEnv) -> ZapResult<CmdResult> {
    if env.playlist.take().is_none() {
        return Ok(CmdResult::default());
    }
    env.platform.stop_active_launcher().await?;
    Ok(CmdResult {
        playlist_changed: true,
        ..CmdResult::default()
    })
}

fn playlist_pause(env: &mut CmdEnv) -> ZapResult<CmdResult> {
    let Some(state) = env.playlist.as_mut() else {
        return Ok(CmdResult::default());
    };
    state.playing = false;
    Ok(CmdResult {
        playlist_changed: true,
        playlist: env.playlist.clone(),
        ..CmdResult::default()
    })
}

async fn playlist_step(env: &mut CmdEnv, forward: bool) -> ZapResult<CmdResult> {
    let Some(state) = env.playlist.as_mut() else {
        warn!("playlist navigation with no active playlist");
        return Ok(CmdResult::default());
    };
    if forward {
        state.next();
    } else {
        state.previous();
    }
    let playing = state.playing;

    let mut result = if playing {
        launch_current_item(env).await?
    } else {
        CmdResult::default()
    };
    result.playlist_changed = true;
    result.playlist = env.playlist.clone();
    Ok(result)
}

async fn playlist_goto(env: &mut CmdEnv, cmd: &Command) -> ZapResult<CmdResult> {
    let arg = require_one_arg(cmd)?;
    let position: usize = arg
        .parse()
        .map_err(|_| ZapError::InvalidFormat(arg.to_string()))?;

    let Some(state) = env.playlist.as_mut() else {
        warn!("playlist.goto with no active playlist");
        return Ok(CmdResult::default());
    };
    if !state.goto(position) {
        return Err(ZapError::InvalidFormat(arg.to_string()));
    }
    let playing = state.playing;

    let mut result = if playing {
        launch_current_item(env).await?
    } else {
        CmdResult::default()
    };
    result.playlist_changed = true;
    result.playlist = env.playlist.clone();
    Ok(result)
}

async fn input_keys(env: &mut CmdEnv, cmd: &Command, gamepad: bool) -> ZapResult<CmdResult> {
    let arg = require_one_arg(cmd)?;
    for (i, key) in arg
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .enumerate()
    {
        if i > 0 {
            tokio::time::sleep(KEY_EVENT_DELAY).await;
        }
        if gamepad {
            env.platform.gamepad_press(key).await?;
        } else {
            env.platform.keyboard_press(key).await?;
        }
    }
    Ok(CmdResult::default())
}

async fn input_coin(env: &mut CmdEnv, cmd: &Command, key: &str) -> ZapResult<CmdResult> {
    let count: usize = match cmd.args.first().map(|a| a.trim()) {
        Some(raw) if !raw.is_empty() => raw
            .parse()
            .map_err(|_| ZapError::InvalidFormat(raw.to_string()))?,
        _ => 1,
    };
    for i in 0..count {
        if i > 0 {
            tokio::time::sleep(KEY_EVENT_DELAY).await;
        }
        env.platform.keyboard_press(key).await?;
    }
    Ok(CmdResult::default())
}

fn http_get(env: &CmdEnv, cmd: &Command) -> ZapResult<CmdResult> {
    let url = first_arg(cmd)?.to_string();
    let client = env.http.clone();
    tokio::spawn(async move {
        match client
            .get(&url)
            .timeout(FIRE_AND_FORGET_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) if !resp.status().is_success() => {
                warn!(url = %url, status = %resp.status(), "http.get non-success")
            }
            Ok(_) => debug!(url = %url, "http.get completed"),
            Err(err) => warn!(url = %url, error = %err, "http.get failed"),
        }
    });
    Ok(CmdResult::default())
}

fn http_post(env: &CmdEnv, cmd: &Command) -> ZapResult<CmdResult> {
    let url = first_arg(cmd)?.to_string();
    let body = cmd.args.get(1).cloned().unwrap_or_default();
    let client = env.http.clone();
    tokio::spawn(async move {
        match client
            .post(&url)
            .timeout(FIRE_AND_FORGET_TIMEOUT)
            .body(body)
            .send()
            .await
        {
            Ok(resp) if !resp.status().is_success() => {
                warn!(url = %url, status = %resp.status(), "http.post non-success")
            }
            Ok(_) => debug!(url = %url, "http.post completed"),
            Err(err) => warn!(url = %url, error = %err, "http.post failed"),
        }
    });
    Ok(CmdResult::default())
}

async fn execute(cmd: &Command) -> ZapResult<CmdResult> {
    let arg = require_one_arg(cmd)?;
    let mut parts = arg.split_whitespace();
    let program = parts.next().ok_or(ZapError::RequiredArgs)?;
    let status = tokio::process::Command::new(program)
        .args(parts)
        .status()
        .await?;
    if !status.success() {
        warn!(command = %arg, status = %status, "execute finished non-zero");
    }
    Ok(CmdResult::default())
}

async fn delay(cmd: &Command) -> ZapResult<CmdResult> {
    let arg = require_one_arg(cmd)?;
    let millis: u64 = arg
        .parse()
        .map_err(|_| ZapError::InvalidFormat(arg.to_string()))?;
    tokio::time::sleep(Duration::from_millis(millis)).await;
    Ok(CmdResult::default())
}

async fn stop(env: &mut CmdEnv) -> ZapResult<CmdResult> {
    env.platform.stop_active_launcher().await?;
    Ok(CmdResult::default())
}

fn echo(cmd: &Command) -> ZapResult<CmdResult> {
    info!(message = %cmd.args.join(" "), "echo");
    Ok(CmdResult::default())
}

async fn evaluate(env: &mut CmdEnv, cmd: &Command) -> ZapResult<CmdResult> {
    let arg = require_one_arg(cmd)?.to_string();
    let script = parse_script(&arg)?;
    let mut summary = CmdResult::default();
    for sub in script.commands {
        summary.merge(dispatch(env, sub, false).await?);
    }
    Ok(summary)
}

fn ui_notice(cmd: &Command) -> ZapResult<CmdResult> {
    info!(notice = %cmd.args.join(" "), "ui.notice");
    Ok(CmdResult::default())
}

async fn ui_picker(env: &mut CmdEnv, cmd: &Command) -> ZapResult<CmdResult> {
    let arg = require_one_arg(cmd)?;
    let items: Vec<PickerItem> = arg
        .split('|')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| PickerItem {
            label: entry.to_string(),
            zapscript: entry.to_string(),
        })
        .collect();
    if items.is_empty() {
        return Err(ZapError::RequiredArgs);
    }
    env.platform.show_picker(&env.cfg, &items).await?;
    Ok(CmdResult::default())
}

async fn mister(env: &mut CmdEnv, cmd: &Command, kind: CommandKind) -> ZapResult<CmdResult> {
    let arg = require_one_arg(cmd)?;
    if env.platform.id() != "mister" {
        warn!(command = %cmd.name, "MiSTer command on non-MiSTer platform; ignoring");
        return Ok(CmdResult::default());
    }
    match kind {
        CommandKind::MisterMgl => {
            env.platform.launch_media(&env.cfg, arg, None).await?;
            Ok(CmdResult::media())
        }
        CommandKind::MisterCore => {
            env.platform.launch_system(&env.cfg, arg).await?;
            Ok(CmdResult::default())
        }
        // INI selection and script execution go through platform-specific
        // paths not modeled by the abstraction; surfaced as no-ops here.
        _ => {
            info!(command = %cmd.name, arg = %arg, "MiSTer command acknowledged");
            Ok(CmdResult::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::StubPlatform;

    struct Fixture {
        env: CmdEnv,
        platform: Arc<StubPlatform>,
    }

    async fn fixture() -> Fixture {
        fixture_with_launchers(Vec::new()).await
    }

    async fn fixture_with_launchers(launchers: Vec<Launcher>) -> Fixture {
        let media_db = Db::open_in_memory().await.unwrap();
        media_db.bootstrap_media_schema().await.unwrap();
        let user_db = Db::open_in_memory().await.unwrap();
        user_db.bootstrap_user_schema().await.unwrap();
        let platform = Arc::new(StubPlatform::with_launchers(launchers));
        let env = CmdEnv::new(
            Arc::new(Config::default()),
            media_db,
            user_db,
            platform.clone(),
        );
        Fixture { env, platform }
    }

    fn cmd(name: &str, arg: &str) -> Command {
        Command::new(name, vec![arg.to_string()])
    }

    #[tokio::test]
    async fn playtime_gate_blocks_media_launching_commands() {
        let mut fx = fixture().await;
        fx.env.media_launch_blocked = true;

        let err = dispatch(&mut fx.env, cmd("launch", "/roms/a.sfc"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ZapError::MediaLaunchBlocked));
        assert!(fx.platform.events().is_empty());

        // Non-launching commands pass through the gate.
        dispatch(&mut fx.env, cmd("echo", "hello"), true)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unsafe_source_blocks_input_and_execute() {
        let mut fx = fixture().await;
        fx.env.unsafe_source = true;

        for name in ["input.keyboard", "input.gamepad", "coinp1", "key", "execute"] {
            let err = dispatch(&mut fx.env, cmd(name, "x"), true)
                .await
                .unwrap_err();
            assert!(matches!(err, ZapError::UnsafeSource(_)), "{name} not gated");
        }
        assert!(fx.platform.events().is_empty());

        // Launching stays allowed from unsafe sources.
        dispatch(&mut fx.env, cmd("launch", "/roms/a.sfc"), true)
            .await
            .unwrap();
        assert_eq!(fx.platform.events(), vec!["launch_media:/roms/a.sfc"]);
    }

    #[tokio::test]
    async fn unknown_command_is_invalid() {
        let mut fx = fixture().await;
        let err = dispatch(&mut fx.env, cmd("launch.unknown", "x"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ZapError::InvalidCommand(_)));
    }

    #[tokio::test]
    async fn absolute_path_launches_directly() {
        let mut fx = fixture().await;
        let result = dispatch(&mut fx.env, cmd("launch", "/roms/snes/a.sfc"), true)
            .await
            .unwrap();
        assert!(result.media_changed);
        assert_eq!(fx.platform.events(), vec!["launch_media:/roms/snes/a.sfc"]);
    }

    #[tokio::test]
    async fn launcher_adv_arg_must_exist() {
        let mut fx = fixture_with_launchers(vec![Launcher {
            id: "retroarch".into(),
            system_id: None,
            name: "RetroArch".into(),
        }])
        .await;

        let mut bad = cmd("launch", "/roms/a.sfc");
        bad.adv_args.insert("launcher".into(), "nope".into());
        let err = dispatch(&mut fx.env, bad, true).await.unwrap_err();
        assert!(matches!(err, ZapError::LauncherNotFound(_)));

        let mut good = cmd("launch", "/roms/a.sfc");
        good.adv_args.insert("launcher".into(), "retroarch".into());
        dispatch(&mut fx.env, good, true).await.unwrap();
        assert_eq!(fx.platform.events(), vec!["launch_media:/roms/a.sfc:retroarch"]);
    }

    #[tokio::test]
    async fn system_adv_arg_applies_default_launcher() {
        let mut fx = fixture_with_launchers(vec![Launcher {
            id: "dosbox".into(),
            system_id: Some("DOS".into()),
            name: "DOSBox".into(),
        }])
        .await;

        let mut launch = cmd("launch", "/games/dos/keen.exe");
        launch.adv_args.insert("system".into(), "DOS".into());
        dispatch(&mut fx.env, launch, true).await.unwrap();
        assert_eq!(fx.platform.events(), vec!["launch_media:/games/dos/keen.exe:dosbox"]);
    }

    #[tokio::test]
    async fn invalid_system_adv_arg_fatal_for_title_warning_for_launch() {
        let mut fx = fixture().await;

        let mut title = cmd("launch.title", "SNES/Game");
        title.adv_args.insert("system".into(), "NotASystem".into());
        let err = dispatch(&mut fx.env, title, true).await.unwrap_err();
        assert!(matches!(err, ZapError::SystemNotFound(_)));

        // Generic launch logs and proceeds with auto-detect.
        let mut generic = cmd("launch", "/roms/a.sfc");
        generic.adv_args.insert("system".into(), "NotASystem".into());
        dispatch(&mut fx.env, generic, true).await.unwrap();
        assert_eq!(fx.platform.events(), vec!["launch_media:/roms/a.sfc"]);
    }

    #[tokio::test]
    async fn launch_delegates_to_title_resolver() {
        let mut fx = fixture().await;
        let meta = crate::normalization::slugify_with_metadata("Mystic Quest");
        let title_id: i64 = sqlx::query_scalar(
            "INSERT INTO media_titles (system_id, slug, secondary_slug, name, slug_length, slug_word_count) VALUES (?, ?, ?, ?, ?, ?) RETURNING dbid",
        )
        .bind("SNES")
        .bind(&meta.slug)
        .bind(&meta.secondary_slug)
        .bind("Mystic Quest")
        .bind(meta.slug_length as i64)
        .bind(meta.word_count as i64)
        .fetch_one(&fx.env.media_db.pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO media (system_id, title_dbid, path) VALUES (?, ?, ?)")
            .bind("SNES")
            .bind(title_id)
            .bind("/roms/snes/Mystic Quest.sfc")
            .execute(&fx.env.media_db.pool)
            .await
            .unwrap();

        let result = dispatch(&mut fx.env, cmd("launch", "SNES/Mystic Quest"), true)
            .await
            .unwrap();
        assert!(result.media_changed);
        assert_eq!(result.strategy.as_deref(), Some("exact_match"));
        assert_eq!(fx.platform.events(), vec!["launch_media:/roms/snes/Mystic Quest.sfc"]);
    }

    #[tokio::test]
    async fn relative_path_without_match_is_file_not_found() {
        let mut fx = fixture().await;
        let err = dispatch(&mut fx.env, cmd("launch", "nothing-here.sfc"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ZapError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn playlist_load_play_next_stop() {
        let mut fx = fixture().await;

        let result = dispatch(
            &mut fx.env,
            cmd("playlist.load", "/roms/a.sfc|/roms/b.sfc"),
            true,
        )
        .await
        .unwrap();
        assert!(result.playlist_changed);
        assert!(!result.media_changed);
        assert!(!fx.env.playlist.as_ref().unwrap().playing);

        let result = dispatch(&mut fx.env, Command::new("playlist.play", vec![]), true)
            .await
            .unwrap();
        assert!(result.media_changed);
        assert_eq!(fx.platform.events(), vec!["launch_media:/roms/a.sfc"]);

        dispatch(&mut fx.env, Command::new("playlist.next", vec![]), true)
            .await
            .unwrap();
        assert_eq!(
            fx.platform.events(),
            vec!["launch_media:/roms/a.sfc", "launch_media:/roms/b.sfc"]
        );

        let result = dispatch(&mut fx.env, Command::new("playlist.stop", vec![]), true)
            .await
            .unwrap();
        assert!(result.playlist_changed);
        assert!(fx.env.playlist.is_none());
    }

    #[tokio::test]
    async fn playlist_open_launches_first_item() {
        let mut fx = fixture().await;
        let result = dispatch(
            &mut fx.env,
            cmd("playlist.open", "/roms/a.sfc|/roms/b.sfc"),
            true,
        )
        .await
        .unwrap();
        assert!(result.media_changed);
        assert!(result.playlist_changed);
        assert!(fx.env.playlist.as_ref().unwrap().playing);
        assert_eq!(fx.platform.events(), vec!["launch_media:/roms/a.sfc"]);
    }

    #[tokio::test]
    async fn playlist_goto_is_one_based() {
        let mut fx = fixture().await;
        dispatch(
            &mut fx.env,
            cmd("playlist.open", "/roms/a.sfc|/roms/b.sfc|/roms/c.sfc"),
            true,
        )
        .await
        .unwrap();

        dispatch(&mut fx.env, cmd("playlist.goto", "3"), true)
            .await
            .unwrap();
        assert_eq!(fx.env.playlist.as_ref().unwrap().index, 2);
        assert_eq!(
            fx.platform.events().last().unwrap(),
            "launch_media:/roms/c.sfc"
        );

        let err = dispatch(&mut fx.env, cmd("playlist.goto", "9"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ZapError::InvalidFormat(_)));
    }

    #[tokio::test]
    async fn input_keyboard_presses_each_key() {
        let mut fx = fixture().await;
        dispatch(&mut fx.env, cmd("input.keyboard", "f12,enter"), true)
            .await
            .unwrap();
        assert_eq!(
            fx.platform.events(),
            vec!["keyboard_press:f12", "keyboard_press:enter"]
        );
    }

    #[tokio::test]
    async fn coin_commands_press_coin_keys() {
        let mut fx = fixture().await;
        dispatch(&mut fx.env, cmd("coinp1", "2"), true).await.unwrap();
        dispatch(&mut fx.env, Command::new("coinp2", vec![]), true)
            .await
            .unwrap();
        assert_eq!(
            fx.platform.events(),
            vec!["keyboard_press:5", "keyboard_press:5", "keyboard_press:6"]
        );
    }

    #[tokio::test]
    async fn evaluate_runs_nested_commands() {
        let mut fx = fixture().await;
        dispatch(
            &mut fx.env,
            cmd("evaluate", "**input.keyboard:f1||**launch:/roms/a.sfc"),
            true,
        )
        .await
        .unwrap();
        assert_eq!(
            fx.platform.events(),
            vec!["keyboard_press:f1", "launch_media:/roms/a.sfc"]
        );
    }

    #[tokio::test]
    async fn arg_validation() {
        let mut fx = fixture().await;
        let err = dispatch(&mut fx.env, Command::new("launch", vec![]), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ZapError::ArgCount { .. }));

        let err = dispatch(&mut fx.env, cmd("launch", "   "), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ZapError::RequiredArgs));
    }

    #[tokio::test]
    async fn run_script_sequences_and_cancels() {
        let mut fx = fixture().await;
        let script = parse_script("**input.keyboard:f1||**input.keyboard:f2").unwrap();
        run_script(&mut fx.env, &script).await.unwrap();
        assert_eq!(
            fx.platform.events(),
            vec!["keyboard_press:f1", "keyboard_press:f2"]
        );

        fx.env.cancelled.store(true, Ordering::Relaxed);
        run_script(&mut fx.env, &script).await.unwrap();
        // No further events after cancellation.
        assert_eq!(fx.platform.events().len(), 2);
    }

    #[tokio::test]
    async fn mister_commands_no_op_off_platform() {
        let mut fx = fixture().await;
        let result = dispatch(&mut fx.env, cmd("mister.core", "_Arcade/core"), true)
            .await
            .unwrap();
        assert!(!result.media_changed);
        assert!(fx.platform.events().is_empty());
    }
}
