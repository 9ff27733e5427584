//! JSON-lines driver: one game, commands on stdin, results on stdout.
//!
//! Each input line is one of
//! `{"player":0,"action":{...}}`, `{"join":{"seat":0,"name":"x"}}`,
//! `{"start":true}`, `{"force_end_turn":true}` or `{"snapshot":true}`.

use crate::host::GameHost;
use serde::Deserialize;
use serde_json::{json, Value};
use settlers_core::{GameAction, PlayerId};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub seat: PlayerId,
    pub name: String,
    #[serde(default)]
    pub robot: bool,
}

/// One input line
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DriverLine {
    Action { player: PlayerId, action: GameAction },
    Join { join: JoinRequest },
    Start { start: bool },
    ForceEndTurn { force_end_turn: bool },
    Snapshot { snapshot: bool },
}

/// Run one command against the host and describe the outcome as JSON.
pub async fn handle_line(host: &GameHost, line: &str) -> Value {
    let parsed: DriverLine = match serde_json::from_str(line) {
        Ok(parsed) => parsed,
        Err(e) => return json!({ "ok": false, "error": format!("Malformed input: {}", e) }),
    };
    debug!(?parsed, "driver command");

    let outcome = match parsed {
        DriverLine::Action { player, action } => host
            .apply(player, action)
            .await
            .map(|events| json!({ "ok": true, "events": events })),
        DriverLine::Join { join } => {
            let joined = match host.join(join.seat, join.name).await {
                Ok(()) if join.robot => host.set_robot(join.seat, true).await,
                other => other,
            };
            joined.map(|()| json!({ "ok": true }))
        }
        DriverLine::Start { start: false }
        | DriverLine::ForceEndTurn {
            force_end_turn: false,
        }
        | DriverLine::Snapshot { snapshot: false } => Ok(json!({ "ok": true })),
        DriverLine::Start { start: true } => host.start().await.map(|()| json!({ "ok": true })),
        DriverLine::ForceEndTurn {
            force_end_turn: true,
        } => host
            .force_end_turn()
            .await
            .map(|events| json!({ "ok": true, "events": events })),
        DriverLine::Snapshot { snapshot: true } => host
            .snapshot()
            .await
            .map(|game| json!({ "ok": true, "game": game })),
    };

    outcome.unwrap_or_else(|e| json!({ "ok": false, "error": e.to_string() }))
}

/// Read stdin to the end, writing one JSON result line per input line.
pub async fn run(host: GameHost) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let result = handle_line(&host, line).await;
        if result["ok"] == false {
            warn!(input = line, error = %result["error"], "command rejected");
        }
        let mut text = serde_json::to_string(&result)?;
        text.push('\n');
        stdout.write_all(text.as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use settlers_core::{Game, GameOptions};

    fn host() -> GameHost {
        GameHost::spawn(Game::new("stdio", GameOptions::default(), 42))
    }

    #[tokio::test]
    async fn test_join_and_start() {
        let host = host();
        let out = handle_line(&host, r#"{"join":{"seat":0,"name":"ann"}}"#).await;
        assert_eq!(out, json!({ "ok": true }));
        handle_line(&host, r#"{"join":{"seat":1,"name":"bot","robot":true}}"#).await;
        let out = handle_line(&host, r#"{"start":true}"#).await;
        assert_eq!(out, json!({ "ok": true }));

        let game = host.snapshot().await.unwrap();
        assert!(game.player(1).unwrap().robot);
        assert!(game.state().is_initial_placement());
    }

    #[tokio::test]
    async fn test_rejections_are_reported() {
        let host = host();
        let out = handle_line(&host, "not json").await;
        assert_eq!(out["ok"], false);

        let out = handle_line(&host, r#"{"player":0,"action":{"type":"RollDice"}}"#).await;
        assert_eq!(out, json!({ "ok": false, "error": "Not your turn" }));
    }

    #[tokio::test]
    async fn test_action_events_are_returned() {
        let host = host();
        handle_line(&host, r#"{"join":{"seat":0,"name":"ann"}}"#).await;
        handle_line(&host, r#"{"start":true}"#).await;
        let game = host.snapshot().await.unwrap();
        let node = *game.player(0).unwrap().potential_settlements().iter().next().unwrap();

        let line = format!(
            r#"{{"player":0,"action":{{"type":"PlaceSettlement","node":{}}}}}"#,
            node
        );
        let out = handle_line(&host, &line).await;
        assert_eq!(out["ok"], true);
        assert_eq!(out["events"][0]["type"], "PieceBuilt");
    }
}
