//! Closed command-name registry.
//!
//! Every recognized ZapScript command name (including the deprecated
//! aliases) maps to one `CommandKind`; unknown names are rejected by the
//! dispatcher before any gate runs.

/// Every command the dispatcher routes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Launch,
    LaunchSystem,
    LaunchRandom,
    LaunchSearch,
    LaunchTitle,
    PlaylistPlay,
    PlaylistStop,
    PlaylistPause,
    PlaylistNext,
    PlaylistPrevious,
    PlaylistGoto,
    PlaylistLoad,
    PlaylistOpen,
    MisterMgl,
    MisterCore,
    MisterIni,
    MisterScript,
    Execute,
    Delay,
    Stop,
    Echo,
    Evaluate,
    HttpGet,
    HttpPost,
    InputKeyboard,
    InputGamepad,
    InputCoinP1,
    InputCoinP2,
    UiNotice,
    UiPicker,
}

impl CommandKind {
    /// Registry lookup, including legacy aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        use CommandKind::*;
        Some(match name {
            "launch" => Launch,
            "launch.system" | "system" => LaunchSystem,
            "launch.random" | "random" => LaunchRandom,
            "launch.search" => LaunchSearch,
            "launch.title" => LaunchTitle,
            "playlist.play" => PlaylistPlay,
            "playlist.stop" => PlaylistStop,
            "playlist.pause" => PlaylistPause,
            "playlist.next" => PlaylistNext,
            "playlist.previous" => PlaylistPrevious,
            "playlist.goto" => PlaylistGoto,
            "playlist.load" => PlaylistLoad,
            "playlist.open" => PlaylistOpen,
            "mister.mgl" => MisterMgl,
            "mister.core" => MisterCore,
            "mister.ini" | "ini" => MisterIni,
            "mister.script" => MisterScript,
            "execute" | "shell" | "command" => Execute,
            "delay" => Delay,
            "stop" => Stop,
            "echo" => Echo,
            "evaluate" => Evaluate,
            "http.get" | "get" => HttpGet,
            "http.post" => HttpPost,
            "input.keyboard" | "input.key" | "key" => InputKeyboard,
            "input.gamepad" => InputGamepad,
            "input.coinp1" | "coinp1" => InputCoinP1,
            "input.coinp2" | "coinp2" => InputCoinP2,
            "ui.notice" => UiNotice,
            "ui.picker" => UiPicker,
            _ => return None,
        })
    }

    /// Does this command start (or switch) media? The playtime-limit gate
    /// consults this.
    pub fn is_media_launching(self) -> bool {
        use CommandKind::*;
        matches!(
            self,
            Launch
                | LaunchSystem
                | LaunchRandom
                | LaunchSearch
                | LaunchTitle
                | PlaylistPlay
                | PlaylistNext
                | PlaylistPrevious
                | PlaylistGoto
                | PlaylistLoad
                | PlaylistOpen
                | MisterMgl
        )
    }

    /// Does this command inject keyboard/gamepad input?
    pub fn is_input_injection(self) -> bool {
        use CommandKind::*;
        matches!(self, InputKeyboard | InputGamepad | InputCoinP1 | InputCoinP2)
    }

    /// Commands refused from an unsafe (remote-scan) source: input
    /// injection and arbitrary command execution.
    pub fn is_unsafe_gated(self) -> bool {
        self.is_input_injection() || self == CommandKind::Execute
    }
}

/// Name-level predicate used by the media-launch gate. Unknown names are
/// never media-launching.
pub fn is_media_launching_command(name: &str) -> bool {
    CommandKind::from_name(name).is_some_and(CommandKind::is_media_launching)
}
