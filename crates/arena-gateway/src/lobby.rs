//! Lobby view assembly: open/active match summaries plus connected
//! presence, recomputed after every state change that the lobby can see.

use std::sync::Arc;

use arena_engine::SessionRegistry;
use arena_types::events::GatewayEvent;
use tracing::warn;

use crate::dispatcher::Dispatcher;

/// Build a fresh lobby snapshot. The match list is store-backed and runs
/// off the async runtime; presence comes straight from the dispatcher.
pub async fn snapshot(
    registry: &Arc<SessionRegistry>,
    dispatcher: &Dispatcher,
) -> anyhow::Result<GatewayEvent> {
    let reg = registry.clone();
    let matches = tokio::task::spawn_blocking(move || reg.list_lobby())
        .await
        .map_err(|e| anyhow::anyhow!("lobby task join error: {}", e))?
        .map_err(|e| anyhow::anyhow!("lobby listing failed: {}", e))?;
    let presence = dispatcher.presence().await;
    Ok(GatewayEvent::LobbyUpdate { matches, presence })
}

/// Recompute and broadcast the lobby view. Failures are logged, never
/// propagated: a stale lobby is preferable to dropping the triggering
/// operation.
pub async fn refresh(registry: &Arc<SessionRegistry>, dispatcher: &Dispatcher) {
    match snapshot(registry, dispatcher).await {
        Ok(event) => dispatcher.broadcast(event),
        Err(e) => warn!("lobby refresh failed: {}", e),
    }
}

/// Recompute and broadcast the ranking to the lobby.
pub async fn refresh_ranking(registry: &Arc<SessionRegistry>, dispatcher: &Dispatcher) {
    let reg = registry.clone();
    let entries = tokio::task::spawn_blocking(move || reg.store().ranking(10)).await;
    match entries {
        Ok(Ok(entries)) => dispatcher.broadcast(GatewayEvent::RankingUpdate { entries }),
        Ok(Err(e)) => warn!("ranking query failed: {}", e),
        Err(e) => warn!("ranking task join error: {}", e),
    }
}
