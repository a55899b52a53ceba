use broom_core::{GameStore, Participant, RollEvent, StoreMeta, UserId};
use broom_table::{Authority, RequestId, SpendPolicy, Table, TableClient, TableEvent};
use colored::Colorize;

pub fn run() -> Result<(), String> {
    let billy_user = UserId::new();
    let hazel_user = UserId::new();
    let gm_user = UserId::new();

    let mut store = GameStore::new(StoreMeta::new("Brooms Night"));
    let billy = store.add_participant(
        Participant::new("Billy")
            .with_controller(billy_user)
            .with_tokens(3),
    );
    let hazel = store.add_participant(
        Participant::new("Hazel")
            .with_controller(hazel_user)
            .with_tokens(5),
    );
    let fish = store.add_participant(
        Participant::new("Mr. Fish")
            .with_controller(gm_user)
            .with_tokens(2),
    );

    let policy = SpendPolicy::default();
    let mut table = Table::new(Authority::new(store.clone(), policy));
    let c_billy = table.join(TableClient::new(billy_user, billy, store.clone(), policy));
    let c_hazel = table.join(TableClient::new(hazel_user, hazel, store, policy));

    println!(
        "  {} {}",
        "Brooms Night".bold(),
        format!(
            "(three seats, cross-participant spends cost {}x)",
            policy.cost_multiplier()
        )
        .dimmed()
    );
    println!();

    step("Billy fumbles a Flight check and takes the adversity token");
    let flight = table
        .post_roll(RollEvent::new(billy, "Flight", 4))
        .map_err(|e| e.to_string())?;
    table.claim(c_billy, flight).map_err(|e| e.to_string())?;
    super::print_events(&table.drain_events());

    step("Billy spends 2 of his own tokens to push the same roll");
    table.spend(c_billy, flight, 2).map_err(|e| e.to_string())?;
    super::print_events(&table.drain_events());

    step("Hazel boosts Billy's roll by 1; the game master approves the cost");
    table.spend(c_hazel, flight, 1).map_err(|e| e.to_string())?;
    table.pump().map_err(|e| e.to_string())?;
    let events = table.drain_events();
    super::print_events(&events);
    table
        .approve(prompt_id(&events)?)
        .map_err(|e| e.to_string())?;
    super::print_events(&table.drain_events());

    step("Hazel tries again; this time the game master says no");
    table.spend(c_hazel, flight, 1).map_err(|e| e.to_string())?;
    table.pump().map_err(|e| e.to_string())?;
    let events = table.drain_events();
    super::print_events(&events);
    table.deny(prompt_id(&events)?).map_err(|e| e.to_string())?;
    super::print_events(&table.drain_events());

    step("The token for a roll can only be taken once");
    match table.claim(c_billy, flight) {
        Err(e) => println!("    {}", e.to_string().yellow()),
        Ok(()) => return Err("second claim unexpectedly succeeded".into()),
    }

    step("Mr. Fish botches a Guts roll; the game master claims for him");
    let guts = table
        .post_roll(RollEvent::new(fish, "Guts", 7))
        .map_err(|e| e.to_string())?;
    table
        .moderator_claim(guts, gm_user)
        .map_err(|e| e.to_string())?;
    super::print_events(&table.drain_events());

    println!();
    println!("{}", super::balances_table(table.authority().store()));

    Ok(())
}

fn step(text: &str) {
    println!("  {} {text}", "»".cyan());
}

fn prompt_id(events: &[TableEvent]) -> Result<RequestId, String> {
    events
        .iter()
        .find_map(|e| match e {
            TableEvent::Prompt(p) => Some(p.request_id),
            _ => None,
        })
        .ok_or_else(|| "expected a confirmation prompt".to_string())
}
