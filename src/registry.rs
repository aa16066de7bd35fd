//! Session registry
//!
//! The single owner of mutable room state. Every action follows the same
//! shape: take the room's serialization lock, load, validate and mutate,
//! persist, then fan out notices through the broadcast gateway. Timer
//! expiry goes through the identical path, so concurrent actions on one
//! room can never lose each other's updates; unrelated rooms stay fully
//! concurrent.

use crate::broadcast::BroadcastGateway;
use crate::error::{EngineError, Reject, Result};
use crate::identity::{Identity, TokenVerifier};
use crate::ledger;
use crate::phase;
use crate::store::Store;
use crate::timers::TimerManager;
use crate::types::{
    CellRef, ChatMessage, Command, EngineConfig, FinalSummary, GameRecord, Notice, Phase,
    RoomSession, SettingsPatch, generate_room_code, now_ms,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tokio::time::Duration;
use tracing::{debug, info, warn};

pub struct SessionRegistry<S: Store> {
    store: S,
    gateway: BroadcastGateway,
    timers: TimerManager,
    /// Per-room serialization locks; never a global lock.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    config: EngineConfig,
}

impl<S: Store> SessionRegistry<S> {
    pub fn new(store: S, config: EngineConfig) -> Arc<Self> {
        Arc::new(Self {
            gateway: BroadcastGateway::new(config.channel_capacity),
            timers: TimerManager::new(),
            locks: Mutex::new(HashMap::new()),
            store,
            config,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn gateway(&self) -> &BroadcastGateway {
        &self.gateway
    }

    pub fn timers(&self) -> &TimerManager {
        &self.timers
    }

    /// Subscribe a connection to a room's notice stream.
    pub async fn subscribe(&self, code: &str) -> broadcast::Receiver<Notice> {
        self.gateway.subscribe(code).await
    }

    // =========================================================================
    // Room Management
    // =========================================================================

    /// Create a room with a fresh unused code; the host is its first player.
    pub async fn create_room(&self, host: &Identity) -> Result<RoomSession> {
        let code = loop {
            let candidate = generate_room_code(self.config.code_length);
            if self.store.load_room(&candidate).await?.is_none() {
                break candidate;
            }
        };
        let room = RoomSession::new(code, host);
        self.store.save_room(&room).await?;
        info!(code = %room.code, host = %host.id, "room created");
        Ok(room)
    }

    /// Add a player to a room's roster by code. Idempotent for players
    /// already on the roster.
    pub async fn join_by_code(&self, code: &str, identity: &Identity) -> Result<RoomSession> {
        let lock = self.room_lock(code).await;
        let _guard = lock.lock().await;

        let mut room = self.load(code).await?;
        if room.add_player(&identity.id, &identity.username) {
            self.store.save_room(&room).await?;
            self.gateway
                .emit(code, Notice::PlayerUpdate { players: room.players.clone() })
                .await;
            info!(code, player = %identity.id, "player joined roster");
        }
        Ok(room)
    }

    /// Current room record, for out-of-band snapshot fetches.
    pub async fn room_snapshot(&self, code: &str) -> Result<RoomSession> {
        self.load(code).await
    }

    /// Replace the room's word pool before play starts (lobby or entry).
    pub async fn set_word_list(&self, code: &str, words: &[String]) -> Result<()> {
        let lock = self.room_lock(code).await;
        let _guard = lock.lock().await;

        let mut room = self.load(code).await?;
        if room.phase != Phase::Lobby && room.phase != Phase::Entry {
            return Err(Reject::WrongPhase { actual: room.phase }.into());
        }

        room.word_pool.clear();
        for word in words {
            let word = word.trim();
            if word.is_empty() {
                continue;
            }
            if !room
                .word_pool
                .iter()
                .any(|held| held.eq_ignore_ascii_case(word))
            {
                room.word_pool.push(word.to_string());
            }
        }
        self.store.save_room(&room).await?;
        Ok(())
    }

    /// Close out the round: lock the room, credit lifetime stats, and
    /// report winners. Guarded against double application by the finished
    /// phase, since crediting twice would double-count.
    pub async fn finalize(&self, code: &str) -> Result<FinalSummary> {
        let lock = self.room_lock(code).await;
        let _guard = lock.lock().await;

        let mut room = self.load(code).await?;
        phase::finish(&mut room)?;
        let game = self
            .store
            .load_game(code)
            .await?
            .ok_or(EngineError::Reject(Reject::NoGame))?;

        self.timers.cancel(code).await;
        self.store.save_room(&room).await?;

        let summary = ledger::finalize_summary(&game);
        for entry in &summary.scores {
            let win = summary.winners.iter().any(|w| w == &entry.player);
            self.store.credit_player(&entry.player, entry.score, win).await?;
        }

        self.gateway
            .emit(code, Notice::PhaseChange { phase: Phase::Finished, phase_end: None })
            .await;
        info!(code, top_score = summary.top_score, winners = summary.winners.len(), "round finalized");
        Ok(summary)
    }

    // =========================================================================
    // Command Dispatch
    // =========================================================================

    /// Verify a token, then apply the command under the resolved identity.
    pub async fn apply_token<V: TokenVerifier>(
        self: &Arc<Self>,
        verifier: &V,
        token: &str,
        code: &str,
        command: Command,
    ) -> Result<Option<Notice>> {
        let identity = verifier.verify(token)?;
        self.apply(&identity, code, command).await
    }

    /// Apply a room-scoped command. The returned notice, if any, goes to
    /// the requesting connection only (currently the join snapshot);
    /// everything else fans out through the gateway. An unknown room code
    /// is logged and ignored, since the room may have been reset or
    /// deleted concurrently.
    pub async fn apply(
        self: &Arc<Self>,
        identity: &Identity,
        code: &str,
        command: Command,
    ) -> Result<Option<Notice>> {
        match self.dispatch(identity, code, command).await {
            Err(EngineError::RoomNotFound) => {
                warn!(code, player = %identity.id, "action on unknown room ignored");
                Ok(None)
            }
            other => other,
        }
    }

    async fn dispatch(
        self: &Arc<Self>,
        identity: &Identity,
        code: &str,
        command: Command,
    ) -> Result<Option<Notice>> {
        match command {
            Command::Join => self.handle_join(identity, code).await,
            Command::StartGame => self.handle_start(identity, code).await,
            Command::UpdateSettings { settings } => {
                self.handle_update_settings(identity, code, settings).await
            }
            Command::ToggleReady => self.handle_toggle_ready(identity, code).await,
            Command::WordInput {
                words,
                just_add: _,
                submit,
            } => self.handle_word_input(identity, code, words, submit).await,
            Command::Drag { tile_id, x, y } => {
                // Ephemeral cursor relay; touches no state at all.
                self.gateway
                    .emit(
                        code,
                        Notice::Drag {
                            tile_id,
                            x,
                            y,
                            from: identity.id.clone(),
                        },
                    )
                    .await;
                Ok(None)
            }
            Command::ClaimWord { word, path } => {
                self.handle_claim(identity, code, &word, path).await
            }
            Command::ResetGame => self.handle_reset(code).await,
            Command::CheckPhase => self.handle_check_phase(code).await,
            Command::Chat { text } => self.handle_chat(identity, code, &text).await,
        }
    }

    // =========================================================================
    // Handlers
    // =========================================================================

    async fn handle_join(self: &Arc<Self>, identity: &Identity, code: &str) -> Result<Option<Notice>> {
        let lock = self.room_lock(code).await;
        let _guard = lock.lock().await;

        let mut room = self.load(code).await?;
        room.add_player(&identity.id, &identity.username);

        // A rejoin during word entry may find the deadline stale (or never
        // scheduled, after a restart). Re-derive it and rearm the timer.
        if room.phase == Phase::Entry {
            let now = now_ms();
            let deadline = match room.phase_end {
                Some(end) if end > now => end,
                _ => {
                    let end = now + room.settings.timer_duration * 1000;
                    room.phase_end = Some(end);
                    info!(code, deadline = end, "recomputed stale entry deadline on join");
                    end
                }
            };
            self.schedule_expiry(code, deadline - now).await;
        }

        self.store.save_room(&room).await?;
        self.gateway
            .emit(code, Notice::PlayerUpdate { players: room.players.clone() })
            .await;
        debug!(code, player = %identity.id, "connection joined");
        Ok(Some(room.snapshot()))
    }

    async fn handle_start(self: &Arc<Self>, identity: &Identity, code: &str) -> Result<Option<Notice>> {
        let lock = self.room_lock(code).await;
        let _guard = lock.lock().await;

        let mut room = self.load(code).await?;
        phase::start(&mut room, &identity.id, now_ms())?;
        self.store.save_room(&room).await?;

        self.schedule_expiry(code, room.settings.timer_duration * 1000).await;
        self.gateway
            .emit(
                code,
                Notice::PhaseChange {
                    phase: Phase::Entry,
                    phase_end: room.phase_end,
                },
            )
            .await;
        Ok(None)
    }

    async fn handle_update_settings(
        &self,
        identity: &Identity,
        code: &str,
        patch: SettingsPatch,
    ) -> Result<Option<Notice>> {
        let lock = self.room_lock(code).await;
        let _guard = lock.lock().await;

        let mut room = self.load(code).await?;
        if room.host != identity.id {
            return Err(Reject::NotHost.into());
        }
        if room.phase != Phase::Lobby {
            return Err(Reject::WrongPhase { actual: room.phase }.into());
        }

        room.settings.apply(&patch);
        self.store.save_room(&room).await?;
        info!(code, settings = ?room.settings, "settings updated");
        self.gateway
            .emit(code, Notice::SettingsUpdated { settings: room.settings })
            .await;
        Ok(None)
    }

    async fn handle_toggle_ready(&self, identity: &Identity, code: &str) -> Result<Option<Notice>> {
        let lock = self.room_lock(code).await;
        let _guard = lock.lock().await;

        let mut room = self.load(code).await?;
        if room.phase != Phase::Lobby {
            return Err(Reject::WrongPhase { actual: room.phase }.into());
        }
        if !room.contains_player(&identity.id) {
            return Err(Reject::NotInRoom.into());
        }

        match room.players_ready.iter().position(|p| p == &identity.id) {
            Some(i) => {
                room.players_ready.remove(i);
            }
            None => room.players_ready.push(identity.id.clone()),
        }
        self.store.save_room(&room).await?;

        self.gateway
            .emit(
                code,
                Notice::ReadyUpdated {
                    players_ready: room.players_ready.clone(),
                    total_players: room.players.len(),
                    all_ready: room.all_ready(),
                },
            )
            .await;
        Ok(None)
    }

    async fn handle_word_input(
        &self,
        identity: &Identity,
        code: &str,
        words: Vec<String>,
        submit: bool,
    ) -> Result<Option<Notice>> {
        let lock = self.room_lock(code).await;
        let _guard = lock.lock().await;

        let mut room = self.load(code).await?;
        if room.phase != Phase::Entry {
            return Err(Reject::WrongPhase { actual: room.phase }.into());
        }
        if !room.contains_player(&identity.id) {
            return Err(Reject::NotInRoom.into());
        }

        if !words.is_empty() {
            ledger::add_words(&mut room, &identity.id, &words)?;
        }
        if submit && ledger::mark_submitted(&mut room, &identity.id) {
            debug!(code, player = %identity.id, "word entry locked in");
        }
        self.store.save_room(&room).await?;

        self.gateway
            .emit(
                code,
                Notice::WordsUpdate {
                    words: room.word_pool.clone(),
                    submissions: room.submissions.clone(),
                    player_words: room.player_words.clone(),
                },
            )
            .await;

        // Everyone in: no need to wait for the deadline.
        if room.all_submitted() {
            self.timers.cancel(code).await;
            if phase::try_advance(&mut room, now_ms()) {
                self.store.save_room(&room).await?;
                self.gateway
                    .emit(code, Notice::PhaseChange { phase: Phase::Play, phase_end: None })
                    .await;
            }
        }
        Ok(None)
    }

    async fn handle_claim(
        &self,
        identity: &Identity,
        code: &str,
        word: &str,
        path: Vec<CellRef>,
    ) -> Result<Option<Notice>> {
        let lock = self.room_lock(code).await;
        let _guard = lock.lock().await;

        let room = self.load(code).await?;
        let mut game = match self.store.load_game(code).await? {
            Some(game) => game,
            None => GameRecord::new(code),
        };

        let outcome = ledger::claim(&room, &mut game, &identity.id, &identity.username, word);
        self.store.save_game(&game).await?;

        if outcome.valid {
            info!(code, player = %identity.id, word = %outcome.word, "word found");
        }
        self.gateway
            .emit(
                code,
                Notice::FindResult {
                    player: identity.id.clone(),
                    word: outcome.word.clone(),
                    valid: outcome.valid,
                    points: outcome.points,
                    duplicate: outcome.duplicate,
                    path,
                },
            )
            .await;
        if outcome.valid {
            self.gateway
                .emit(code, Notice::ScoreUpdate { scores: game.scores.clone() })
                .await;
        }
        Ok(None)
    }

    async fn handle_reset(&self, code: &str) -> Result<Option<Notice>> {
        let lock = self.room_lock(code).await;
        let _guard = lock.lock().await;

        let mut room = self.load(code).await?;
        self.timers.cancel(code).await;
        phase::reset(&mut room);
        self.store.save_room(&room).await?;
        self.store.delete_game(code).await?;

        self.gateway
            .emit(code, Notice::Reset { phase: Phase::Lobby })
            .await;
        Ok(None)
    }

    /// Idempotent safety re-evaluation: re-derives the entry deadline
    /// decision from stored state, never trusting an assumed timer.
    async fn handle_check_phase(&self, code: &str) -> Result<Option<Notice>> {
        let lock = self.room_lock(code).await;
        let _guard = lock.lock().await;

        let mut room = self.load(code).await?;
        if phase::try_advance(&mut room, now_ms()) {
            self.timers.cancel(code).await;
            self.store.save_room(&room).await?;
            self.gateway
                .emit(code, Notice::PhaseChange { phase: Phase::Play, phase_end: None })
                .await;
        }
        Ok(None)
    }

    async fn handle_chat(&self, identity: &Identity, code: &str, text: &str) -> Result<Option<Notice>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::InvalidPayload("empty chat message".to_string()));
        }

        let lock = self.room_lock(code).await;
        let _guard = lock.lock().await;

        let mut room = self.load(code).await?;
        let message = ChatMessage {
            player: identity.id.clone(),
            username: identity.username.clone(),
            text: text.to_string(),
            time: now_ms(),
        };
        room.chat_log.push(message.clone());
        self.store.save_room(&room).await?;

        self.gateway
            .emit(code, Notice::ChatMessage { message })
            .await;
        Ok(None)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn load(&self, code: &str) -> Result<RoomSession> {
        self.store
            .load_room(code)
            .await?
            .ok_or(EngineError::RoomNotFound)
    }

    async fn room_lock(&self, code: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(code.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn schedule_expiry(self: &Arc<Self>, code: &str, delay_ms: u64) {
        let registry = Arc::clone(self);
        let room_code = code.to_string();
        self.timers
            .schedule(code, Duration::from_millis(delay_ms), async move {
                registry.expire_entry(&room_code).await;
            })
            .await;
    }

    /// Deadline callback. Re-checks the phase under the room lock before
    /// mutating: a submission-triggered transition may have raced ahead.
    async fn expire_entry(&self, code: &str) {
        let lock = self.room_lock(code).await;
        let _guard = lock.lock().await;

        let mut room = match self.store.load_room(code).await {
            Ok(Some(room)) => room,
            Ok(None) => {
                warn!(code, "timer fired for unknown room");
                return;
            }
            Err(e) => {
                warn!(code, error = %e, "timer could not load room");
                return;
            }
        };

        if !phase::force_advance(&mut room) {
            debug!(code, phase = %room.phase, "timer expiry was a no-op");
            return;
        }
        if let Err(e) = self.store.save_room(&room).await {
            warn!(code, error = %e, "failed to persist timer-driven phase change");
            return;
        }
        info!(code, "entry deadline expired");
        self.gateway
            .emit(code, Notice::PhaseChange { phase: Phase::Play, phase_end: None })
            .await;
    }
}
