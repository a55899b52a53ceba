use broom_core::{
    CoreResult, GameStore, Participant, ParticipantId, RollData, RollEvaluator, RollEvent, RollId,
    StoreMeta, UserId,
};
use broom_table::{
    Authority, ClientId, Notice, RequestId, SpendPolicy, Table, TableClient, TableEvent,
};
use colored::Colorize;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Every formula comes up as a seeded uniform roll.
struct SeededDice(StdRng);

impl RollEvaluator for SeededDice {
    fn evaluate(&mut self, _formula: &str, _data: &RollData) -> CoreResult<i64> {
        Ok(self.0.random_range(2..=24))
    }
}

#[derive(Default)]
struct Stats {
    applied: u32,
    forwarded: u32,
    rejected: u32,
    approved: u32,
    denied: u32,
    broadcasts: u32,
    warnings: u32,
}

pub fn run(seed: u64, actions: u32) -> Result<(), String> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut dice = SeededDice(StdRng::seed_from_u64(seed.wrapping_add(1)));

    let users = [UserId::new(), UserId::new()];
    let mut store = GameStore::new(StoreMeta::new("Simulated Table"));
    let participants = [
        store.add_participant(
            Participant::new("Billy")
                .with_controller(users[0])
                .with_tokens(4),
        ),
        store.add_participant(
            Participant::new("Hazel")
                .with_controller(users[1])
                .with_tokens(4),
        ),
    ];

    let policy = SpendPolicy::default();
    let mut table = Table::new(Authority::new(store.clone(), policy));
    let clients = [
        table.join(TableClient::new(users[0], participants[0], store.clone(), policy)),
        table.join(TableClient::new(users[1], participants[1], store, policy)),
    ];

    let mut rolls: Vec<RollId> = Vec::new();
    let mut prompts: Vec<RequestId> = Vec::new();
    let mut stats = Stats::default();

    for owner in participants {
        post_roll(&mut table, &mut dice, owner, &mut rolls)?;
    }

    for _ in 0..actions {
        match rng.random_range(0..6u8) {
            0 => {
                let client = clients[rng.random_range(0..2usize)];
                let roll = rolls[rng.random_range(0..rolls.len())];
                let queued = table.queued_requests();
                tally(table.claim(client, roll), queued, &table, &mut stats);
                collect(&mut table, &mut prompts, &mut stats);
            }
            1 | 2 => {
                let client = clients[rng.random_range(0..2usize)];
                let roll = rolls[rng.random_range(0..rolls.len())];
                let amount = rng.random_range(-1..4i64);
                let queued = table.queued_requests();
                tally(table.spend(client, roll, amount), queued, &table, &mut stats);
                collect(&mut table, &mut prompts, &mut stats);
            }
            3 => {
                table.pump().map_err(|e| e.to_string())?;
                collect(&mut table, &mut prompts, &mut stats);
            }
            4 => {
                if let Some(request_id) = prompts.pop() {
                    let approve = rng.random_bool(0.7);
                    resolve(&mut table, request_id, approve, &mut stats)?;
                    collect(&mut table, &mut prompts, &mut stats);
                }
            }
            _ => {
                if rolls.len() < 6 {
                    let owner = participants[rng.random_range(0..2usize)];
                    post_roll(&mut table, &mut dice, owner, &mut rolls)?;
                }
            }
        }
    }

    // Flush everything still in flight, resolving prompts as they surface.
    loop {
        table.pump().map_err(|e| e.to_string())?;
        collect(&mut table, &mut prompts, &mut stats);
        let Some(request_id) = prompts.pop() else {
            break;
        };
        let approve = rng.random_bool(0.7);
        resolve(&mut table, request_id, approve, &mut stats)?;
    }

    println!(
        "  {} {}",
        "Simulation".bold(),
        format!("({actions} actions, seed={seed})").dimmed()
    );
    println!(
        "  {} applied locally, {} forwarded, {} rejected at the replica",
        stats.applied, stats.forwarded, stats.rejected
    );
    println!(
        "  {} spends approved, {} denied; {} broadcasts, {} warnings",
        stats.approved, stats.denied, stats.broadcasts, stats.warnings
    );
    println!();
    println!("{}", super::balances_table(table.authority().store()));
    println!();

    check_convergence(&table, clients, participants, &rolls)?;
    println!("  {}", "all replicas agree with ground truth".green());

    Ok(())
}

fn post_roll(
    table: &mut Table,
    dice: &mut SeededDice,
    owner: ParticipantId,
    rolls: &mut Vec<RollId>,
) -> Result<(), String> {
    let base = dice
        .evaluate("2d20", &RollData::new())
        .map_err(|e| e.to_string())?;
    let id = table
        .post_roll(RollEvent::new(owner, "Broom Check", base))
        .map_err(|e| e.to_string())?;
    rolls.push(id);
    Ok(())
}

fn tally(
    result: Result<(), broom_table::TableError>,
    queued_before: usize,
    table: &Table,
    stats: &mut Stats,
) {
    match result {
        Ok(()) if table.queued_requests() > queued_before => stats.forwarded += 1,
        Ok(()) => stats.applied += 1,
        Err(_) => stats.rejected += 1,
    }
}

fn resolve(
    table: &mut Table,
    request_id: RequestId,
    approve: bool,
    stats: &mut Stats,
) -> Result<(), String> {
    if approve {
        table.approve(request_id).map_err(|e| e.to_string())?;
        stats.approved += 1;
    } else {
        table.deny(request_id).map_err(|e| e.to_string())?;
        stats.denied += 1;
    }
    Ok(())
}

fn collect(table: &mut Table, prompts: &mut Vec<RequestId>, stats: &mut Stats) {
    for event in table.drain_events() {
        match event {
            TableEvent::Display(_) => stats.broadcasts += 1,
            TableEvent::Notice { notice, .. } => {
                if matches!(notice, Notice::Warn(_)) {
                    stats.warnings += 1;
                }
            }
            TableEvent::Prompt(prompt) => prompts.push(prompt.request_id),
        }
    }
}

fn check_convergence(
    table: &Table,
    clients: [ClientId; 2],
    participants: [ParticipantId; 2],
    rolls: &[RollId],
) -> Result<(), String> {
    let truth = table.authority().store();
    for client_id in clients {
        let replica = table.client(client_id).store();
        for participant in participants {
            let expect = truth
                .participant(participant)
                .map_err(|e| e.to_string())?
                .ledger
                .balance();
            let got = replica
                .participant(participant)
                .map_err(|e| e.to_string())?
                .ledger
                .balance();
            if got != expect {
                return Err(format!(
                    "replica diverged: {participant} holds {got} tokens, ground truth says {expect}"
                ));
            }
        }
        for &roll_id in rolls {
            let expect = truth.display(roll_id).map_err(|e| e.to_string())?;
            let got = replica.display(roll_id).map_err(|e| e.to_string())?;
            if got != expect {
                return Err(format!("replica diverged on roll {roll_id}: {got} vs {expect}"));
            }
        }
    }
    Ok(())
}
