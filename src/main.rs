// Draft engine demo driver.
//
// Startup sequence:
// 1. Initialize tracing
// 2. Load config
// 3. Seed a demo league into an in-memory store
// 4. Spawn the turn sweeper
// 5. Start the draft and play it out, leaving one turn to time out so the
//    sweeper's auto-pick path runs
// 6. Print the final status snapshot

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tracing::info;

use classdraft::config::{self, Config};
use classdraft::draft::engine::DraftEngine;
use classdraft::draft::guard::PickGuard;
use classdraft::draft::sweeper::TurnSweeper;
use classdraft::league::{
    DraftSettings, DraftState, League, LeagueId, LeagueStatus, Participant, PlayerId, Team, UserId,
};
use classdraft::store::{LeagueStore, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("classdraft demo starting up");

    // 2. Load config
    let config = config::load_config(None).context("failed to load configuration")?;
    info!(
        "Config loaded: {} participants, {} players per team, {:?} draft, {}s per pick",
        config.demo.participants,
        config.demo.max_players_per_team,
        config.demo.draft_type,
        config.demo.time_limit_per_pick
    );

    // 3. Seed a demo league
    let store = MemoryStore::new();
    let league = demo_league(&config);
    let league_id = league.id.clone();
    let teacher = league.created_by.clone();
    let seats: Vec<UserId> = league.participants.iter().map(|p| p.user.clone()).collect();
    store.put(league).await;

    // 4. Spawn the turn sweeper
    let guard = PickGuard::new();
    let engine = Arc::new(DraftEngine::new(store.clone(), guard));
    let sweeper = TurnSweeper::new(
        store.clone(),
        engine.clone(),
        Duration::from_secs(config.sweeper.interval_secs),
        Duration::from_secs(config.sweeper.grace_secs),
    );
    let sweeper_handle = tokio::spawn(sweeper.run());

    // 5. Start the draft and play it out
    let started = engine
        .start_draft(&league_id, &teacher)
        .await
        .context("failed to start draft")?;
    info!(
        "Draft started; order: {:?}",
        started
            .draft_state
            .draft_order
            .iter()
            .map(|u| u.0.as_str())
            .collect::<Vec<_>>()
    );

    // The third pick is deliberately left to the sweeper.
    let skipped_slot = 3;
    loop {
        let status = engine.draft_status(&league_id, &seats[0]).await?;
        if status.is_draft_complete {
            break;
        }
        let picks_so_far = status.pick_history.len();

        if picks_so_far + 1 == skipped_slot {
            info!("letting the turn time out; the sweeper will auto-pick");
            wait_for_pick(&engine, &league_id, &seats[0], picks_so_far).await?;
            continue;
        }

        let holder = status
            .current_turn_user
            .clone()
            .context("draft active with no turn-holder")?;
        let player = status
            .available_players
            .first()
            .cloned()
            .context("draft active with empty pool")?;
        let outcome = engine.submit_pick(&league_id, &holder, Some(player)).await?;
        let record = outcome.pick.context("manual pick recorded no entry")?;
        info!(
            "{} drafted {} (R{} P{})",
            record.user, record.player, record.round, record.pick
        );
    }

    // 6. Print the final status snapshot
    let final_status = engine.draft_status(&league_id, &seats[0]).await?;
    println!("{}", serde_json::to_string_pretty(&final_status)?);
    info!(
        "Draft complete after {} picks at {}",
        final_status.pick_history.len(),
        Utc::now()
    );

    sweeper_handle.abort();
    Ok(())
}

/// Poll until the pick count moves past `seen`, i.e. the sweeper has forced
/// the auto-pick for the skipped turn.
async fn wait_for_pick(
    engine: &DraftEngine,
    league_id: &LeagueId,
    as_user: &UserId,
    seen: usize,
) -> anyhow::Result<()> {
    loop {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let status = engine.draft_status(league_id, as_user).await?;
        if status.pick_history.len() > seen || status.is_draft_complete {
            return Ok(());
        }
    }
}

/// Build the demo league described by the `[demo]` config table.
fn demo_league(config: &Config) -> League {
    League {
        id: LeagueId::from("demo-league"),
        name: "Period 3 Fantasy League".into(),
        created_by: UserId::from("teacher"),
        status: LeagueStatus::Open,
        max_participants: config.demo.participants,
        max_players_per_team: config.demo.max_players_per_team,
        draft_settings: DraftSettings {
            draft_type: config.demo.draft_type,
            time_limit_per_pick: config.demo.time_limit_per_pick,
        },
        draft_state: DraftState::default(),
        draft_pool: (1..=config.demo.pool_size)
            .map(|i| PlayerId(format!("student-{i:02}")))
            .collect(),
        participants: (1..=config.demo.participants)
            .map(|i| Participant {
                user: UserId(format!("seat-{i}")),
                team: Team::new(format!("Team {i}")),
                is_active: true,
            })
            .collect(),
    }
}

/// Initialize tracing to stderr, filtered by `RUST_LOG` when set.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("classdraft=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
