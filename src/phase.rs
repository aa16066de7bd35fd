//! Phase state machine
//!
//! Pure transitions over [`RoomSession`]. Phases only move forward
//! (`lobby -> entry -> play -> finished`) except through an explicit
//! reset, and every transition here is idempotent under replay.

use crate::error::Reject;
use crate::types::{Phase, RoomSession};
use tracing::info;

/// Start the round: `lobby -> entry`.
///
/// Guards: requester is the host, the roster is non-empty, and every
/// player has readied up. Sets the entry deadline from the room's timer
/// setting.
pub fn start(room: &mut RoomSession, requester: &str, now: u64) -> Result<(), Reject> {
    if room.host != requester {
        return Err(Reject::NotHost);
    }
    if room.phase != Phase::Lobby {
        return Err(Reject::WrongPhase { actual: room.phase });
    }
    if !room.all_ready() {
        return Err(Reject::NotAllReady);
    }

    room.phase = Phase::Entry;
    room.phase_end = Some(now + room.settings.timer_duration * 1000);
    info!(code = %room.code, deadline = ?room.phase_end, "round started, entering word entry");
    Ok(())
}

/// Advance `entry -> play` if every player has submitted or the deadline
/// has passed. Returns whether the phase changed; a no-op on any other
/// phase, so replaying a satisfied transition never fires twice.
pub fn try_advance(room: &mut RoomSession, now: u64) -> bool {
    if room.phase != Phase::Entry {
        return false;
    }
    let expired = room.phase_end.is_some_and(|end| now >= end);
    if room.all_submitted() || expired {
        advance_to_play(room);
        return true;
    }
    false
}

/// Force `entry -> play`, used by the timer expiry callback after it has
/// re-checked the phase under the room lock. Returns whether it advanced.
pub fn force_advance(room: &mut RoomSession) -> bool {
    if room.phase != Phase::Entry {
        return false;
    }
    advance_to_play(room);
    true
}

fn advance_to_play(room: &mut RoomSession) {
    room.phase = Phase::Play;
    // The deadline exists only while the entry phase does.
    room.phase_end = None;
    info!(code = %room.code, "advanced to play phase");
}

/// Lock the room as finished. Refused if already finished, which is what
/// keeps finalize from crediting lifetime stats twice.
pub fn finish(room: &mut RoomSession) -> Result<(), Reject> {
    if room.phase == Phase::Finished {
        return Err(Reject::AlreadyFinished);
    }
    room.phase = Phase::Finished;
    room.phase_end = None;
    info!(code = %room.code, "room finished");
    Ok(())
}

/// Reset the room to lobby defaults, clearing all transient round state.
pub fn reset(room: &mut RoomSession) {
    room.phase = Phase::Lobby;
    room.phase_end = None;
    room.word_pool.clear();
    room.player_words.clear();
    room.submissions.clear();
    room.players_ready.clear();
    room.chat_log.clear();
    info!(code = %room.code, "room reset to lobby");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::types::ChatMessage;

    fn lobby_room() -> RoomSession {
        let host = Identity {
            id: "host".into(),
            username: "host".into(),
        };
        let mut room = RoomSession::new("ROOM42", &host);
        room.add_player("p2", "p2");
        room
    }

    #[test]
    fn start_requires_host() {
        let mut room = lobby_room();
        room.players_ready = vec!["host".into(), "p2".into()];
        assert_eq!(start(&mut room, "p2", 0), Err(Reject::NotHost));
        assert_eq!(room.phase, Phase::Lobby);
    }

    #[test]
    fn start_requires_all_ready() {
        let mut room = lobby_room();
        room.players_ready = vec!["host".into()];
        assert_eq!(start(&mut room, "host", 0), Err(Reject::NotAllReady));
        assert_eq!(room.phase, Phase::Lobby);
        assert_eq!(room.phase_end, None);
    }

    #[test]
    fn start_sets_deadline_from_settings() {
        let mut room = lobby_room();
        room.players_ready = vec!["host".into(), "p2".into()];
        room.settings.timer_duration = 5;
        start(&mut room, "host", 1_000).unwrap();
        assert_eq!(room.phase, Phase::Entry);
        assert_eq!(room.phase_end, Some(6_000));
    }

    #[test]
    fn start_is_rejected_outside_lobby() {
        let mut room = lobby_room();
        room.players_ready = vec!["host".into(), "p2".into()];
        start(&mut room, "host", 0).unwrap();
        assert_eq!(
            start(&mut room, "host", 0),
            Err(Reject::WrongPhase { actual: Phase::Entry })
        );
    }

    #[test]
    fn advance_fires_on_all_submitted() {
        let mut room = lobby_room();
        room.phase = Phase::Entry;
        room.phase_end = Some(10_000);
        room.submissions = vec!["host".into(), "p2".into()];
        assert!(try_advance(&mut room, 0));
        assert_eq!(room.phase, Phase::Play);
        assert_eq!(room.phase_end, None);
    }

    #[test]
    fn advance_fires_on_expiry() {
        let mut room = lobby_room();
        room.phase = Phase::Entry;
        room.phase_end = Some(10_000);
        assert!(!try_advance(&mut room, 9_999));
        assert!(try_advance(&mut room, 10_000));
        assert_eq!(room.phase, Phase::Play);
    }

    #[test]
    fn advance_is_idempotent_under_replay() {
        let mut room = lobby_room();
        room.phase = Phase::Entry;
        room.phase_end = Some(10_000);
        assert!(try_advance(&mut room, 20_000));
        assert!(!try_advance(&mut room, 20_000));
        assert!(!force_advance(&mut room));
        assert_eq!(room.phase, Phase::Play);
    }

    #[test]
    fn phase_never_regresses_without_reset() {
        let mut room = lobby_room();
        room.phase = Phase::Play;
        assert!(!try_advance(&mut room, u64::MAX));
        assert!(start(&mut room, "host", 0).is_err());
        assert_eq!(room.phase, Phase::Play);
    }

    #[test]
    fn finish_refuses_a_second_application() {
        let mut room = lobby_room();
        room.phase = Phase::Play;
        finish(&mut room).unwrap();
        assert_eq!(room.phase, Phase::Finished);
        assert_eq!(finish(&mut room), Err(Reject::AlreadyFinished));
    }

    #[test]
    fn reset_clears_transient_state() {
        let mut room = lobby_room();
        room.phase = Phase::Play;
        room.word_pool = vec!["CAT".into()];
        room.submissions = vec!["host".into()];
        room.players_ready = vec!["host".into()];
        room.chat_log.push(ChatMessage {
            player: "host".into(),
            username: "host".into(),
            text: "gg".into(),
            time: 0,
        });

        reset(&mut room);

        assert_eq!(room.phase, Phase::Lobby);
        assert_eq!(room.phase_end, None);
        assert!(room.word_pool.is_empty());
        assert!(room.submissions.is_empty());
        assert!(room.players_ready.is_empty());
        assert!(room.chat_log.is_empty());
        // The roster survives a reset.
        assert_eq!(room.players.len(), 2);
    }
}
