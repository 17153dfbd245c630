//! Maps inbound client intents onto engine calls and fans the results
//! back out. Engine and store work is blocking (rusqlite underneath), so
//! every mutating call runs under `spawn_blocking`.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use anyhow::anyhow;
use arena_engine::{Error, JoinOutcome, MoveOutcome};
use arena_types::events::{GatewayCommand, GatewayEvent, Room};
use arena_types::models::MatchStatus;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::Gateway;
use crate::lobby;

pub type RoomSet = Arc<RwLock<HashSet<Room>>>;

async fn run_blocking<T, F>(f: F) -> arena_engine::Result<T>
where
    F: FnOnce() -> arena_engine::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Storage(anyhow!("engine task join error: {}", e)))?
}

pub async fn handle_command(
    gateway: &Gateway,
    player_id: Uuid,
    name: &str,
    conn_id: Uuid,
    cmd: GatewayCommand,
    rooms: &RoomSet,
) {
    match cmd {
        GatewayCommand::Identify { .. } => {} // Already handled

        GatewayCommand::JoinLobby => {
            info!("{} ({}) joined the lobby", name, player_id);
            rooms.write().expect("room lock poisoned").insert(Room::Lobby);
            gateway
                .dispatcher
                .join_lobby(conn_id, player_id, name.to_string())
                .await;
            lobby::refresh(&gateway.registry, &gateway.dispatcher).await;
        }

        GatewayCommand::LeaveLobby => {
            info!("{} ({}) left the lobby", name, player_id);
            rooms.write().expect("room lock poisoned").remove(&Room::Lobby);
            gateway.dispatcher.leave_lobby(conn_id).await;
            lobby::refresh(&gateway.registry, &gateway.dispatcher).await;
        }

        GatewayCommand::CreateMatch { title } => {
            let registry = gateway.registry.clone();
            match run_blocking(move || registry.create_match(&title)).await {
                Ok(state) => {
                    info!("{} ({}) created match {}", name, player_id, state.id);
                    gateway
                        .dispatcher
                        .send_to_player(player_id, GatewayEvent::MatchCreated { state })
                        .await;
                    lobby::refresh(&gateway.registry, &gateway.dispatcher).await;
                }
                Err(e) => {
                    report_error(gateway, player_id, &e).await;
                }
            }
        }

        GatewayCommand::JoinMatch { match_id } => {
            // Subscribe before the join so this connection sees the
            // broadcasts its own join produces.
            rooms
                .write()
                .expect("room lock poisoned")
                .insert(Room::Match(match_id));

            let registry = gateway.registry.clone();
            let player_name = name.to_string();
            let joined = run_blocking(move || {
                let session = registry.get_or_create(match_id)?;
                session.join(player_id, &player_name)
            })
            .await;

            match joined {
                Ok(JoinOutcome { state, mark, already_seated, started }) => {
                    info!(
                        "{} ({}) joined match {} as {}",
                        name, player_id, match_id, mark
                    );
                    gateway
                        .dispatcher
                        .send_to_player(
                            player_id,
                            GatewayEvent::JoinSuccess { state: state.clone(), mark },
                        )
                        .await;

                    if !already_seated {
                        gateway.dispatcher.broadcast(GatewayEvent::PlayerJoined {
                            match_id,
                            player_id,
                            name: name.to_string(),
                        });
                        gateway
                            .dispatcher
                            .broadcast(GatewayEvent::MatchUpdate { state: state.clone() });
                    }
                    // A reconciled rejoin can still be the one that
                    // activates the match.
                    if started {
                        gateway
                            .dispatcher
                            .broadcast(GatewayEvent::MatchStarted { state });
                    }
                    if !already_seated || started {
                        lobby::refresh(&gateway.registry, &gateway.dispatcher).await;
                    }
                }
                Err(e) => {
                    rooms
                        .write()
                        .expect("room lock poisoned")
                        .remove(&Room::Match(match_id));
                    report_error(gateway, player_id, &e).await;
                }
            }
        }

        GatewayCommand::MakeMove { match_id, cell } => {
            let registry = gateway.registry.clone();
            let moved = run_blocking(move || {
                let session = registry.get_or_create(match_id)?;
                let outcome = session.make_move(player_id, cell)?;
                if outcome.finished {
                    // Terminal state is flushed; drop the live session.
                    registry.retire(match_id);
                }
                Ok(outcome)
            })
            .await;

            match moved {
                Ok(MoveOutcome { state, mv, winning_line, finished, is_draw }) => {
                    let winner_id = state.winner;
                    gateway.dispatcher.broadcast(GatewayEvent::MoveMade {
                        state,
                        mv,
                        winning_line,
                    });

                    if finished {
                        info!(
                            "match {} finished (winner: {:?}, draw: {})",
                            match_id, winner_id, is_draw
                        );
                        gateway.dispatcher.broadcast(GatewayEvent::MatchFinished {
                            match_id,
                            winner_id,
                            is_draw,
                            winning_line,
                        });
                        lobby::refresh(&gateway.registry, &gateway.dispatcher).await;
                        lobby::refresh_ranking(&gateway.registry, &gateway.dispatcher).await;
                    }
                }
                Err(e) => {
                    // Rejections go to the acting connection only; match
                    // state is untouched so nothing is broadcast.
                    warn!("{} ({}) move rejected: {}", name, player_id, e);
                    gateway
                        .dispatcher
                        .send_to_player(
                            player_id,
                            GatewayEvent::MoveError { message: e.to_string(), cell },
                        )
                        .await;
                }
            }
        }

        GatewayCommand::LeaveMatch { match_id } => {
            rooms
                .write()
                .expect("room lock poisoned")
                .remove(&Room::Match(match_id));

            // A seat holder walking out of a live game abandons it; both
            // players still get their participation points.
            let registry = gateway.registry.clone();
            let abandoned = run_blocking(move || {
                let session = registry.get_or_create(match_id)?;
                let snapshot = session.snapshot();
                if snapshot.status == MatchStatus::Active
                    && snapshot.seat_of(player_id).is_some()
                {
                    let state = session.end(None, false)?;
                    registry.retire(match_id);
                    return Ok(Some(state));
                }
                Ok(None)
            })
            .await;

            gateway.dispatcher.broadcast(GatewayEvent::PlayerLeft {
                match_id,
                player_id,
                name: name.to_string(),
            });

            match abandoned {
                Ok(Some(_)) => {
                    info!("{} ({}) abandoned match {}", name, player_id, match_id);
                    gateway.dispatcher.broadcast(GatewayEvent::MatchFinished {
                        match_id,
                        winner_id: None,
                        is_draw: false,
                        winning_line: None,
                    });
                    lobby::refresh_ranking(&gateway.registry, &gateway.dispatcher).await;
                }
                Ok(None) => {}
                Err(e) => warn!("leave of match {} failed: {}", match_id, e),
            }
            lobby::refresh(&gateway.registry, &gateway.dispatcher).await;
        }

        GatewayCommand::Chat { match_id, message } => {
            gateway.dispatcher.broadcast(GatewayEvent::Chat {
                match_id,
                player_id,
                name: name.to_string(),
                message,
                timestamp: Utc::now(),
            });
        }

        GatewayCommand::GetLobby => {
            match lobby::snapshot(&gateway.registry, &gateway.dispatcher).await {
                Ok(event) => gateway.dispatcher.send_to_player(player_id, event).await,
                Err(e) => warn!("lobby snapshot failed: {}", e),
            }
        }

        GatewayCommand::GetRanking => {
            lobby::refresh_ranking(&gateway.registry, &gateway.dispatcher).await;
        }
    }
}

async fn report_error(gateway: &Gateway, player_id: Uuid, error: &Error) {
    if matches!(error, Error::Storage(_)) {
        warn!("storage failure serving {}: {:#}", player_id, error);
    }
    gateway
        .dispatcher
        .send_to_player(player_id, GatewayEvent::Error { message: error.to_string() })
        .await;
}
