//! Integration tests for the lobby engine over in-memory connections.
//!
//! Timer-driven tests run with paused time: the runtime jumps the clock
//! forward whenever every task is idle, so a 30-tick window takes no real
//! time.

use std::sync::Arc;

use trivia_lobby::{LobbyConfig, LobbyError, LobbyHandle, LobbyPhase, SessionDirectory};
use trivia_protocol::{
    CategoryInfo, ClientMessage, PlayerId, Question, RosterEntry, ServerMessage, SessionId,
};
use trivia_questions::{QuestionError, QuestionSource};
use trivia_session::PlayerSession;
use trivia_transport::{MemoryClient, MemoryConnection};

// =========================================================================
// Question sources
// =========================================================================

/// Always returns the same question for "General".
struct FixedSource {
    answer: f64,
}

impl QuestionSource for FixedSource {
    async fn question(&self, category: &str) -> Result<Question, QuestionError> {
        if category != "General" {
            return Err(QuestionError::UnknownCategory(category.to_owned()));
        }
        Ok(Question {
            prompt: "How many?".into(),
            answer: self.answer,
            unit: "things".into(),
            source: "tests".into(),
        })
    }

    fn categories(&self) -> Vec<CategoryInfo> {
        vec![CategoryInfo {
            name: "General".into(),
            description: "Test questions".into(),
        }]
    }
}

/// Advertises "General" but never has a question.
struct EmptySource;

impl QuestionSource for EmptySource {
    async fn question(&self, category: &str) -> Result<Question, QuestionError> {
        Err(QuestionError::EmptyCategory(category.to_owned()))
    }

    fn categories(&self) -> Vec<CategoryInfo> {
        vec![CategoryInfo {
            name: "General".into(),
            description: String::new(),
        }]
    }
}

// =========================================================================
// Helpers
// =========================================================================

type Directory<Q> = SessionDirectory<MemoryConnection, Q>;
type Handle = LobbyHandle<MemoryConnection>;

fn directory<Q: QuestionSource>(source: Q) -> Directory<Q> {
    SessionDirectory::new(Arc::new(source), LobbyConfig::default())
}

fn general_lobby(answer: f64) -> (Directory<FixedSource>, Handle) {
    general_lobby_with(answer, LobbyConfig::default())
}

fn general_lobby_with(answer: f64, config: LobbyConfig) -> (Directory<FixedSource>, Handle) {
    let mut dir = SessionDirectory::new(Arc::new(FixedSource { answer }), config);
    let handle = dir.create_lobby("General").unwrap();
    (dir, handle)
}

/// Connects a player, starts its receive loop, and admits it.
async fn join(handle: &Handle, id: &str, name: &str) -> MemoryClient {
    let (conn, client) = MemoryConnection::pair();
    let session = Arc::new(PlayerSession::new(PlayerId::new(id), name, conn));
    tokio::spawn(Arc::clone(&session).run(handle.clone()));
    handle.admit(session).await.unwrap();
    client
}

async fn next(client: &mut MemoryClient) -> ServerMessage {
    let raw = client.recv().await.expect("connection closed early");
    serde_json::from_str(&raw).unwrap()
}

/// Reads until a message matches, returning it.
async fn next_matching(
    client: &mut MemoryClient,
    pred: impl Fn(&ServerMessage) -> bool,
) -> ServerMessage {
    loop {
        let msg = next(client).await;
        if pred(&msg) {
            return msg;
        }
    }
}

/// Discards everything already delivered.
fn drain(client: &mut MemoryClient) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Some(raw) = client.try_recv() {
        out.push(serde_json::from_str(&raw).unwrap());
    }
    out
}

fn send(client: &MemoryClient, msg: ClientMessage) {
    let frame = serde_json::to_string(&msg.into_envelope()).unwrap();
    client.send(frame).unwrap();
}

fn entry(id: &str, name: &str, ready: bool, score: u32) -> RosterEntry {
    RosterEntry {
        id: PlayerId::new(id),
        name: name.into(),
        ready,
        score,
    }
}

fn is_question(msg: &ServerMessage) -> bool {
    matches!(msg, ServerMessage::Question(_))
}

fn is_reveal(msg: &ServerMessage) -> bool {
    matches!(msg, ServerMessage::ScoreReveal(_))
}

// =========================================================================
// Admit / Remove
// =========================================================================

#[tokio::test]
async fn test_admit_sends_session_id_then_player_id_then_roster() {
    let (_dir, handle) = general_lobby(50.0);
    let mut p1 = join(&handle, "p1", "Ann").await;

    assert_eq!(
        next(&mut p1).await,
        ServerMessage::SessionAssigned(handle.session_id().clone())
    );
    assert_eq!(
        next(&mut p1).await,
        ServerMessage::PlayerIdAssigned(PlayerId::new("p1"))
    );
    assert_eq!(
        next(&mut p1).await,
        ServerMessage::RosterUpdate(vec![entry("p1", "Ann", false, 0)])
    );

    let info = handle.info().await.unwrap();
    assert_eq!(info.host, Some(PlayerId::new("p1")));
    assert_eq!(info.phase, LobbyPhase::Waiting);
    assert_eq!(info.round, 0);
    assert_eq!(info.category, "General");
}

#[tokio::test]
async fn test_admit_broadcasts_roster_in_join_order() {
    let (_dir, handle) = general_lobby(50.0);
    let mut p1 = join(&handle, "p1", "Ann").await;
    let _p2 = join(&handle, "p2", "Bob").await;
    handle.info().await.unwrap();

    let last = drain(&mut p1).pop().unwrap();
    assert_eq!(
        last,
        ServerMessage::RosterUpdate(vec![
            entry("p1", "Ann", false, 0),
            entry("p2", "Bob", false, 0),
        ])
    );
    // The host does not move when someone else joins.
    let info = handle.info().await.unwrap();
    assert_eq!(info.host, Some(PlayerId::new("p1")));
}

#[tokio::test]
async fn test_admit_duplicate_player_id_is_rejected() {
    let (_dir, handle) = general_lobby(50.0);
    let _p1 = join(&handle, "p1", "Ann").await;

    let (conn, _client) = MemoryConnection::pair();
    let dup = Arc::new(PlayerSession::new(PlayerId::new("p1"), "Imposter", conn));
    let err = handle.admit(dup).await.unwrap_err();
    assert!(matches!(err, LobbyError::AlreadyInLobby(ref id) if id.as_str() == "p1"));
    assert_eq!(handle.info().await.unwrap().roster.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_admit_after_game_over_is_rejected() {
    let config = LobbyConfig {
        rounds: 1,
        ..LobbyConfig::default()
    };
    let (_dir, handle) = general_lobby_with(50.0, config);
    let mut p1 = join(&handle, "p1", "Ann").await;
    send(&p1, ClientMessage::Ready { status: true });
    next_matching(&mut p1, |m| *m == ServerMessage::game_over()).await;

    let (conn, mut late_client) = MemoryConnection::pair();
    let late = Arc::new(PlayerSession::new(PlayerId::new("p2"), "Bob", conn));
    assert!(matches!(handle.admit(late).await, Err(LobbyError::Closed(_))));
    assert!(late_client.try_recv().is_none());

    let info = handle.info().await.unwrap();
    assert_eq!(info.phase, LobbyPhase::GameOver);
    assert_eq!(info.roster.len(), 1);
    assert!(drain(&mut p1).is_empty());
}

#[tokio::test]
async fn test_broadcast_skips_failed_recipient() {
    let (_dir, handle) = general_lobby(50.0);
    let mut p1 = join(&handle, "p1", "Ann").await;

    // Admitted with its client already gone and no receive loop to remove it.
    let (conn, client) = MemoryConnection::pair();
    drop(client);
    let dead = Arc::new(PlayerSession::new(PlayerId::new("p2"), "Bob", conn));
    handle.admit(dead).await.unwrap();

    let mut p3 = join(&handle, "p3", "Cid").await;
    handle.info().await.unwrap();
    drain(&mut p1);
    drain(&mut p3);

    handle.set_ready(PlayerId::new("p1"), true).await.unwrap();
    handle.info().await.unwrap();

    let expected = ServerMessage::RosterUpdate(vec![
        entry("p1", "Ann", true, 0),
        entry("p2", "Bob", false, 0),
        entry("p3", "Cid", false, 0),
    ]);
    for client in [&mut p1, &mut p3] {
        assert_eq!(drain(client), vec![expected.clone()]);
    }
    assert_eq!(handle.info().await.unwrap().roster.len(), 3);
}

#[tokio::test]
async fn test_roster_broadcast_twice_is_identical() {
    let (_dir, handle) = general_lobby(50.0);
    let mut p1 = join(&handle, "p1", "Ann").await;
    let _p2 = join(&handle, "p2", "Bob").await;
    handle.info().await.unwrap();
    drain(&mut p1);

    handle.set_ready(PlayerId::new("p1"), false).await.unwrap();
    handle.set_ready(PlayerId::new("p1"), false).await.unwrap();
    handle.info().await.unwrap();

    let msgs = drain(&mut p1);
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[0], msgs[1]);
}

#[tokio::test]
async fn test_non_host_remove_rebroadcasts_roster() {
    let (_dir, handle) = general_lobby(50.0);
    let mut p1 = join(&handle, "p1", "Ann").await;
    let mut p2 = join(&handle, "p2", "Bob").await;
    handle.info().await.unwrap();
    drain(&mut p1);

    p2.close();
    let msg = next_matching(&mut p1, |m| matches!(m, ServerMessage::RosterUpdate(_))).await;
    assert_eq!(
        msg,
        ServerMessage::RosterUpdate(vec![entry("p1", "Ann", false, 0)])
    );
    assert_eq!(handle.info().await.unwrap().roster.len(), 1);
}

#[tokio::test]
async fn test_host_remove_ends_session_for_everyone() {
    let (mut dir, handle) = general_lobby(50.0);
    let mut p1 = join(&handle, "p1", "Ann").await;
    let mut p2 = join(&handle, "p2", "Bob").await;
    let mut p3 = join(&handle, "p3", "Cid").await;
    handle.info().await.unwrap();
    drain(&mut p2);
    drain(&mut p3);

    p1.close();

    for client in [&mut p2, &mut p3] {
        assert_eq!(next(client).await, ServerMessage::session_ended());
        // Their connections are closed right after the notice.
        assert_eq!(client.recv().await, None);
    }

    let err = handle.info().await.unwrap_err();
    assert!(matches!(err, LobbyError::Closed(_)));

    let (conn, _client) = MemoryConnection::pair();
    let late = Arc::new(PlayerSession::new(PlayerId::new("p4"), "Dee", conn));
    assert!(matches!(handle.admit(late).await, Err(LobbyError::Closed(_))));

    assert!(matches!(
        dir.lookup(handle.session_id()),
        Err(LobbyError::NotFound(_))
    ));
    assert_eq!(dir.lobby_count(), 0);
}

// =========================================================================
// Ready gate and countdown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_all_ready_starts_countdown() {
    let (_dir, handle) = general_lobby(50.0);
    let mut p1 = join(&handle, "p1", "Ann").await;
    let p2 = join(&handle, "p2", "Bob").await;

    send(&p1, ClientMessage::Ready { status: true });
    send(&p2, ClientMessage::Ready { status: true });

    let tick = next_matching(&mut p1, |m| matches!(m, ServerMessage::CountdownTick(_))).await;
    assert_eq!(tick, ServerMessage::countdown(5));
    assert_eq!(handle.info().await.unwrap().phase, LobbyPhase::Countdown);

    for n in (1..5).rev() {
        assert_eq!(next(&mut p1).await, ServerMessage::countdown(n));
    }
    assert!(is_question(&next(&mut p1).await));
    assert_eq!(next(&mut p1).await, ServerMessage::timer(30));

    let info = handle.info().await.unwrap();
    assert_eq!(info.phase, LobbyPhase::RoundActive);
    assert_eq!(info.round, 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_tick_phases_last_one_tick() {
    let config = LobbyConfig {
        countdown_ticks: 0,
        guess_window_ticks: 0,
        reveal_ticks: 0,
        ..LobbyConfig::default()
    };
    let (_dir, handle) = general_lobby_with(50.0, config);
    let mut p1 = join(&handle, "p1", "Ann").await;
    send(&p1, ClientMessage::Ready { status: true });

    let tick = next_matching(&mut p1, |m| matches!(m, ServerMessage::CountdownTick(_))).await;
    assert_eq!(tick, ServerMessage::countdown(1));
    assert!(is_question(&next(&mut p1).await));
    assert_eq!(next(&mut p1).await, ServerMessage::timer(1));
    assert!(is_reveal(&next(&mut p1).await));
    assert_eq!(next(&mut p1).await, ServerMessage::timer(1));
}

#[tokio::test(start_paused = true)]
async fn test_not_ready_during_countdown_aborts_to_waiting() {
    let (_dir, handle) = general_lobby(50.0);
    let mut p1 = join(&handle, "p1", "Ann").await;
    let mut p2 = join(&handle, "p2", "Bob").await;

    handle.set_ready(PlayerId::new("p1"), true).await.unwrap();
    handle.set_ready(PlayerId::new("p2"), true).await.unwrap();
    next_matching(&mut p2, |m| *m == ServerMessage::countdown(5)).await;

    handle.set_ready(PlayerId::new("p2"), false).await.unwrap();

    for client in [&mut p1, &mut p2] {
        next_matching(client, |m| *m == ServerMessage::waiting()).await;
    }
    let info = handle.info().await.unwrap();
    assert_eq!(info.phase, LobbyPhase::Waiting);
    assert_eq!(info.round, 0);
}

#[tokio::test(start_paused = true)]
async fn test_late_joiner_aborts_countdown_on_next_tick() {
    let (_dir, handle) = general_lobby(50.0);
    let mut p1 = join(&handle, "p1", "Ann").await;
    handle.set_ready(PlayerId::new("p1"), true).await.unwrap();
    next_matching(&mut p1, |m| *m == ServerMessage::countdown(5)).await;

    let _p2 = join(&handle, "p2", "Bob").await;

    let msg = next_matching(&mut p1, |m| matches!(m, ServerMessage::CountdownTick(_))).await;
    assert_eq!(msg, ServerMessage::waiting());
    assert_eq!(handle.info().await.unwrap().phase, LobbyPhase::Waiting);
}

#[tokio::test(start_paused = true)]
async fn test_last_unready_player_leaving_starts_countdown() {
    let (_dir, handle) = general_lobby(50.0);
    let mut p1 = join(&handle, "p1", "Ann").await;
    let mut p2 = join(&handle, "p2", "Bob").await;
    handle.set_ready(PlayerId::new("p1"), true).await.unwrap();
    handle.info().await.unwrap();
    drain(&mut p1);

    p2.close();

    assert!(matches!(next(&mut p1).await, ServerMessage::RosterUpdate(_)));
    assert_eq!(next(&mut p1).await, ServerMessage::countdown(5));
}

#[tokio::test(start_paused = true)]
async fn test_guess_outside_round_is_ignored() {
    let (_dir, handle) = general_lobby(50.0);
    let mut p1 = join(&handle, "p1", "Ann").await;
    handle.info().await.unwrap();
    drain(&mut p1);

    handle.submit_guess(PlayerId::new("p1"), 10.0).await.unwrap();
    handle.info().await.unwrap();
    assert!(drain(&mut p1).is_empty());
}

// =========================================================================
// Rounds and scoring
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_round_scores_qualifiers_by_rank() {
    let (_dir, handle) = general_lobby(50.0);
    let mut clients = Vec::new();
    for (id, name) in [("p1", "Ann"), ("p2", "Bob"), ("p3", "Cid"), ("p4", "Dee")] {
        clients.push(join(&handle, id, name).await);
    }
    for id in ["p1", "p2", "p3", "p4"] {
        handle.set_ready(PlayerId::new(id), true).await.unwrap();
    }
    next_matching(&mut clients[0], is_question).await;

    for (client, guess) in clients.iter().zip([40.0, 45.0, 60.0, 10.0]) {
        send(client, ClientMessage::Guess { value: guess });
    }

    let ServerMessage::ScoreReveal(entries) = next_matching(&mut clients[0], is_reveal).await
    else {
        unreachable!()
    };
    let summary: Vec<(&str, f64, u32, u32)> = entries
        .iter()
        .map(|e| (e.id.as_str(), e.guess, e.delta, e.score))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("p1", 40.0, 10, 10),
            ("p2", 45.0, 15, 15),
            ("p3", 60.0, 0, 0),
            ("p4", 10.0, 5, 5),
        ]
    );

    // Reveal pause follows, then round two.
    assert_eq!(next(&mut clients[0]).await, ServerMessage::timer(8));
    let info = handle.info().await.unwrap();
    assert_eq!(info.phase, LobbyPhase::RoundReveal);
    let scores: Vec<u32> = info.roster.iter().map(|e| e.score).collect();
    assert_eq!(scores, vec![10, 15, 0, 5]);
}

#[tokio::test(start_paused = true)]
async fn test_full_game_reaches_game_over_after_five_rounds() {
    let (_dir, handle) = general_lobby(50.0);
    let mut clients = Vec::new();
    for (id, name) in [("p1", "Ann"), ("p2", "Bob"), ("p3", "Cid")] {
        clients.push(join(&handle, id, name).await);
    }
    for client in &clients {
        send(client, ClientMessage::Ready { status: true });
    }

    // Round one: real guesses.
    next_matching(&mut clients[0], is_question).await;
    for (client, guess) in clients.iter().zip([40.0, 45.0, 60.0]) {
        send(client, ClientMessage::Guess { value: guess });
    }

    let mut reveals = Vec::new();
    for _ in 0..5 {
        if let ServerMessage::ScoreReveal(entries) =
            next_matching(&mut clients[0], is_reveal).await
        {
            reveals.push(entries.iter().map(|e| e.delta).collect::<Vec<_>>());
        }
    }
    assert_eq!(reveals[0], vec![5, 10, 0]);
    // Later rounds get no guesses: everyone sits at zero, join order breaks ties.
    for deltas in &reveals[1..] {
        assert_eq!(deltas, &vec![5, 10, 15]);
    }

    for client in &mut clients {
        next_matching(client, |m| *m == ServerMessage::game_over()).await;
    }

    let info = handle.info().await.unwrap();
    assert_eq!(info.phase, LobbyPhase::GameOver);
    assert_eq!(info.round, 5);
    let scores: Vec<u32> = info.roster.iter().map(|e| e.score).collect();
    assert_eq!(scores, vec![25, 50, 60]);
}

#[tokio::test(start_paused = true)]
async fn test_question_is_delivered_to_every_member() {
    let (_dir, handle) = general_lobby(8.0);
    let mut p1 = join(&handle, "p1", "Ann").await;
    let mut p2 = join(&handle, "p2", "Bob").await;
    handle.set_ready(PlayerId::new("p1"), true).await.unwrap();
    handle.set_ready(PlayerId::new("p2"), true).await.unwrap();

    for client in [&mut p1, &mut p2] {
        let ServerMessage::Question(q) = next_matching(client, is_question).await else {
            unreachable!()
        };
        // Answers are not redacted.
        assert_eq!(q.answer, 8.0);
        assert_eq!(q.unit, "things");
    }
}

// =========================================================================
// Session-ending paths
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_host_disconnect_mid_round_ends_session() {
    let (_dir, handle) = general_lobby(50.0);
    let mut p1 = join(&handle, "p1", "Ann").await;
    let mut p2 = join(&handle, "p2", "Bob").await;
    let mut p3 = join(&handle, "p3", "Cid").await;
    for id in ["p1", "p2", "p3"] {
        handle.set_ready(PlayerId::new(id), true).await.unwrap();
    }
    next_matching(&mut p1, is_question).await;
    next_matching(&mut p2, is_question).await;
    next_matching(&mut p3, is_question).await;

    p1.close();

    for client in [&mut p2, &mut p3] {
        next_matching(client, |m| *m == ServerMessage::session_ended()).await;
        assert_eq!(client.recv().await, None);
    }
    assert!(matches!(handle.info().await, Err(LobbyError::Closed(_))));
}

#[tokio::test(start_paused = true)]
async fn test_question_source_failure_ends_session() {
    let mut dir = directory(EmptySource);
    let handle = dir.create_lobby("General").unwrap();
    let mut p1 = join(&handle, "p1", "Ann").await;
    let mut p2 = join(&handle, "p2", "Bob").await;
    handle.set_ready(PlayerId::new("p1"), true).await.unwrap();
    handle.set_ready(PlayerId::new("p2"), true).await.unwrap();

    for client in [&mut p1, &mut p2] {
        next_matching(client, |m| *m == ServerMessage::session_ended()).await;
        assert_eq!(client.recv().await, None);
    }
    assert!(matches!(handle.info().await, Err(LobbyError::Closed(_))));
    assert!(!dir.exists(handle.session_id()));
}

// =========================================================================
// Directory
// =========================================================================

#[tokio::test]
async fn test_directory_rejects_unknown_category() {
    let mut dir = directory(FixedSource { answer: 1.0 });
    let err = dir.create_lobby("Sports").err().unwrap();
    assert!(matches!(err, LobbyError::UnknownCategory(ref c) if c == "Sports"));
    assert_eq!(dir.lobby_count(), 0);
}

#[tokio::test]
async fn test_directory_lookup_unknown_session() {
    let mut dir = directory(FixedSource { answer: 1.0 });
    let missing = SessionId::new("ZZZZZ");
    assert!(matches!(dir.lookup(&missing), Err(LobbyError::NotFound(_))));
    assert!(!dir.exists(&missing));
}

#[tokio::test]
async fn test_directory_creates_distinct_five_char_sessions() {
    let mut dir = directory(FixedSource { answer: 1.0 });
    let a = dir.create_lobby("General").unwrap();
    let b = dir.create_lobby("General").unwrap();

    assert_ne!(a.session_id(), b.session_id());
    assert_eq!(a.session_id().as_str().len(), 5);
    assert!(dir.exists(a.session_id()));
    assert_eq!(dir.lobby_count(), 2);
    assert_eq!(dir.categories()[0].name, "General");

    let found = dir.lookup(b.session_id()).unwrap();
    assert_eq!(found.session_id(), b.session_id());
}

#[tokio::test]
async fn test_directory_remove_forgets_lobby() {
    let mut dir = directory(FixedSource { answer: 1.0 });
    let handle = dir.create_lobby("General").unwrap();
    assert!(dir.remove(handle.session_id()).is_some());
    assert!(!dir.exists(handle.session_id()));
    assert_eq!(dir.prune_closed(), 0);
}
