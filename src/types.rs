//! Type definitions for gridhunt

use serde::{Deserialize, Serialize};

/// Room lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Lobby,
    Entry,
    Play,
    Finished,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Lobby => "lobby",
            Phase::Entry => "entry",
            Phase::Play => "play",
            Phase::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Per-room game settings. Out-of-range values are clamped, not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSettings {
    /// Word-entry timer in seconds, clamped to [5, 30]
    pub timer_duration: u64,
    /// Words each player may contribute, clamped to [3, 4]
    pub words_per_player: usize,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            timer_duration: 15,
            words_per_player: 3,
        }
    }
}

impl RoomSettings {
    /// Apply a partial update, clamping each field into its legal range.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(t) = patch.timer_duration {
            self.timer_duration = t.clamp(5, 30);
        }
        if let Some(w) = patch.words_per_player {
            self.words_per_player = w.clamp(3, 4);
        }
    }
}

/// Partial settings update sent by the host.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub words_per_player: Option<usize>,
}

/// A player as seen by the room roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
    pub id: String,
    pub username: String,
}

/// A player's personal word contributions for the round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerWords {
    pub player: String,
    pub words: Vec<String>,
}

/// One chat line, append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub player: String,
    pub username: String,
    pub text: String,
    pub time: u64,
}

/// A cell on the letter grid, carried with claims for highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

/// The authoritative per-room record, owned by the session registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSession {
    pub code: String,
    /// Player id of the host; always a roster member.
    pub host: String,
    pub players: Vec<PlayerRef>,
    pub players_ready: Vec<String>,
    pub phase: Phase,
    /// Entry-phase deadline in ms since the epoch; `Some` iff phase is Entry.
    pub phase_end: Option<u64>,
    pub settings: RoomSettings,
    /// Deduplicated union of all contributed words, case-preserved.
    pub word_pool: Vec<String>,
    pub player_words: Vec<PlayerWords>,
    /// Players who have locked in their word entry.
    pub submissions: Vec<String>,
    pub chat_log: Vec<ChatMessage>,
}

impl RoomSession {
    pub fn new(code: impl Into<String>, host: &crate::identity::Identity) -> Self {
        Self {
            code: code.into(),
            host: host.id.clone(),
            players: vec![PlayerRef {
                id: host.id.clone(),
                username: host.username.clone(),
            }],
            players_ready: Vec::new(),
            phase: Phase::Lobby,
            phase_end: None,
            settings: RoomSettings::default(),
            word_pool: Vec::new(),
            player_words: Vec::new(),
            submissions: Vec::new(),
            chat_log: Vec::new(),
        }
    }

    pub fn contains_player(&self, id: &str) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    /// Add a player to the roster if absent. Returns true if added.
    pub fn add_player(&mut self, id: &str, username: &str) -> bool {
        if self.contains_player(id) {
            return false;
        }
        self.players.push(PlayerRef {
            id: id.to_string(),
            username: username.to_string(),
        });
        true
    }

    pub fn all_ready(&self) -> bool {
        !self.players.is_empty() && self.players_ready.len() == self.players.len()
    }

    pub fn all_submitted(&self) -> bool {
        !self.players.is_empty() && self.submissions.len() >= self.players.len()
    }

    pub fn words_for(&self, player: &str) -> &[String] {
        self.player_words
            .iter()
            .find(|pw| pw.player == player)
            .map(|pw| pw.words.as_slice())
            .unwrap_or(&[])
    }

    /// Full-state notice for a newly joined connection.
    pub fn snapshot(&self) -> Notice {
        Notice::Sync {
            phase: self.phase,
            phase_end: self.phase_end,
            words: self.word_pool.clone(),
            players: self.players.clone(),
            players_ready: self.players_ready.clone(),
            submissions: self.submissions.clone(),
            player_words: self.player_words.clone(),
            settings: self.settings,
            chat: self.chat_log.clone(),
        }
    }
}

/// One player's cumulative score for a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub player: String,
    pub username: String,
    pub score: i64,
}

/// One claim attempt, valid or not, in the audit ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEntry {
    pub player: String,
    /// Normalized (trimmed, uppercased) form of the claimed word.
    pub word: String,
    pub valid: bool,
    pub points: i64,
    pub time: u64,
}

/// Scoring state for one round, created lazily on the first claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Code of the room this record belongs to.
    pub room: String,
    pub scores: Vec<ScoreEntry>,
    pub moves: Vec<MoveEntry>,
}

impl GameRecord {
    pub fn new(room: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            scores: Vec::new(),
            moves: Vec::new(),
        }
    }
}

/// Winners and final scores produced by finalize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalSummary {
    pub top_score: i64,
    /// Player ids holding the top score; ties allowed.
    pub winners: Vec<String>,
    pub scores: Vec<ScoreEntry>,
}

// Inbound commands and outbound notices

/// A room-scoped action from a connected client. The acting identity is
/// attached at dispatch, not carried in the payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    Join,
    StartGame,
    UpdateSettings {
        settings: SettingsPatch,
    },
    ToggleReady,
    WordInput {
        words: Vec<String>,
        #[serde(default)]
        just_add: bool,
        #[serde(default)]
        submit: bool,
    },
    Drag {
        tile_id: String,
        x: f64,
        y: f64,
    },
    ClaimWord {
        word: String,
        #[serde(default)]
        path: Vec<CellRef>,
    },
    ResetGame,
    CheckPhase,
    Chat {
        text: String,
    },
}

/// A room-scoped notification fanned out to subscribed connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    /// Full snapshot, sent directly to a newly joined connection.
    Sync {
        phase: Phase,
        phase_end: Option<u64>,
        words: Vec<String>,
        players: Vec<PlayerRef>,
        players_ready: Vec<String>,
        submissions: Vec<String>,
        player_words: Vec<PlayerWords>,
        settings: RoomSettings,
        chat: Vec<ChatMessage>,
    },
    PlayerUpdate {
        players: Vec<PlayerRef>,
    },
    WordsUpdate {
        words: Vec<String>,
        submissions: Vec<String>,
        player_words: Vec<PlayerWords>,
    },
    PhaseChange {
        phase: Phase,
        phase_end: Option<u64>,
    },
    SettingsUpdated {
        settings: RoomSettings,
    },
    ReadyUpdated {
        players_ready: Vec<String>,
        total_players: usize,
        all_ready: bool,
    },
    ChatMessage {
        message: ChatMessage,
    },
    FindResult {
        player: String,
        word: String,
        valid: bool,
        points: i64,
        duplicate: bool,
        path: Vec<CellRef>,
    },
    ScoreUpdate {
        scores: Vec<ScoreEntry>,
    },
    Reset {
        phase: Phase,
    },
    Drag {
        tile_id: String,
        x: f64,
        y: f64,
        from: String,
    },
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Length of generated room codes (default: 6)
    pub code_length: usize,
    /// Per-room broadcast channel capacity (default: 64)
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            channel_capacity: 64,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn code_length(mut self, len: usize) -> Self {
        self.code_length = len;
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

/// Room-code alphabet; ambiguous characters (I, O, 0, 1) are left out.
const CODE_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generate a human-shareable room code.
pub fn generate_room_code(len: usize) -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CODE_CHARS[rng.gen_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Current time in milliseconds
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
