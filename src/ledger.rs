//! Word ledger and scoring engine
//!
//! Pure mutations over [`RoomSession`] and [`GameRecord`]: word
//! contribution with per-player caps, submission lock-in, claim scoring
//! with duplicate suppression, and the finalize summary.

use crate::error::Reject;
use crate::types::{
    FinalSummary, GameRecord, MoveEntry, PlayerWords, RoomSession, ScoreEntry, now_ms,
};
use tracing::debug;

/// Points awarded per found word.
const POINTS_PER_WORD: i64 = 1;

/// Outcome of a single claim, mirrored to clients as a find-result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindOutcome {
    /// Normalized form of the claimed word.
    pub word: String,
    /// True iff the claim scored (valid and not previously claimed).
    pub valid: bool,
    pub duplicate: bool,
    pub points: i64,
}

/// Add words to a player's personal contribution and the shared pool.
///
/// Candidates are trimmed and empties dropped. Once the player's personal
/// count reaches `words_per_player` further candidates are refused; a
/// batch that partially fits is truncated silently. Accepted words merge
/// into the pool with case-insensitive deduplication.
///
/// Returns the words actually accepted for this player.
pub fn add_words(
    room: &mut RoomSession,
    player: &str,
    raw: &[String],
) -> Result<Vec<String>, Reject> {
    let clean: Vec<String> = raw
        .iter()
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty())
        .collect();
    if clean.is_empty() {
        return Ok(Vec::new());
    }

    let max_words = room.settings.words_per_player;
    let idx = match room.player_words.iter().position(|pw| pw.player == player) {
        Some(i) => i,
        None => {
            room.player_words.push(PlayerWords {
                player: player.to_string(),
                words: Vec::new(),
            });
            room.player_words.len() - 1
        }
    };
    let entry = &mut room.player_words[idx];

    let remaining = max_words.saturating_sub(entry.words.len());
    if remaining == 0 {
        debug!(player, max_words, "word limit reached");
        return Err(Reject::WordLimitReached);
    }

    let accepted: Vec<String> = clean.into_iter().take(remaining).collect();
    entry.words.extend(accepted.iter().cloned());

    for word in &accepted {
        if !room
            .word_pool
            .iter()
            .any(|held| held.eq_ignore_ascii_case(word))
        {
            room.word_pool.push(word.clone());
        }
    }

    debug!(
        player,
        added = accepted.len(),
        total = entry.words.len(),
        "words accepted"
    );
    Ok(accepted)
}

/// Mark a player as having locked in their word entry.
///
/// Set semantics: a repeated submit is a no-op. Returns true if newly
/// recorded.
pub fn mark_submitted(room: &mut RoomSession, player: &str) -> bool {
    if room.submissions.iter().any(|p| p == player) {
        return false;
    }
    room.submissions.push(player.to_string());
    true
}

/// Score a claimed word against the room's pool.
///
/// The claim is valid iff the normalized word or its reversal appears in
/// the pool (case-insensitive). A valid first-time claim by this player
/// scores a flat point and is appended to the move ledger; a repeat of an
/// already-claimed word (in either direction) is reported as a duplicate
/// and suppressed from the ledger; an invalid claim is recorded with zero
/// points. The path a client selected never affects validity, because the
/// authoritative state holds no grid: each client renders its own.
pub fn claim(
    room: &RoomSession,
    game: &mut GameRecord,
    player: &str,
    username: &str,
    raw_word: &str,
) -> FindOutcome {
    let normalized = raw_word.trim().to_uppercase();
    let reversed: String = normalized.chars().rev().collect();

    let valid = room.word_pool.iter().any(|held| {
        let held = held.to_uppercase();
        held == normalized || held == reversed
    });

    // A word and its reversal are the same find.
    let duplicate = valid
        && game.moves.iter().any(|m| {
            m.player == player && m.valid && (m.word == normalized || m.word == reversed)
        });

    if valid && !duplicate {
        match game.scores.iter_mut().find(|s| s.player == player) {
            Some(entry) => entry.score += POINTS_PER_WORD,
            None => game.scores.push(ScoreEntry {
                player: player.to_string(),
                username: username.to_string(),
                score: POINTS_PER_WORD,
            }),
        }
        game.moves.push(MoveEntry {
            player: player.to_string(),
            word: normalized.clone(),
            valid: true,
            points: POINTS_PER_WORD,
            time: now_ms(),
        });
        FindOutcome {
            word: normalized,
            valid: true,
            duplicate: false,
            points: POINTS_PER_WORD,
        }
    } else if !valid {
        game.moves.push(MoveEntry {
            player: player.to_string(),
            word: normalized.clone(),
            valid: false,
            points: 0,
            time: now_ms(),
        });
        FindOutcome {
            word: normalized,
            valid: false,
            duplicate: false,
            points: 0,
        }
    } else {
        debug!(player, word = %normalized, "duplicate claim suppressed");
        FindOutcome {
            word: normalized,
            valid: false,
            duplicate: true,
            points: 0,
        }
    }
}

/// Compute the top score and winners for a finished round.
///
/// The top score floors at zero, so a round where nobody scored has no
/// winners rather than negative ones.
pub fn finalize_summary(game: &GameRecord) -> FinalSummary {
    let top_score = game.scores.iter().map(|s| s.score).max().unwrap_or(0).max(0);
    let winners = game
        .scores
        .iter()
        .filter(|s| s.score == top_score)
        .map(|s| s.player.clone())
        .collect();
    FinalSummary {
        top_score,
        winners,
        scores: game.scores.clone(),
    }
}
