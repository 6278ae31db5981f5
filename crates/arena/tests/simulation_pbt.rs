use arena::entity::CellType;
use arena::{Command, Config, Game};
use glam::Vec2;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Aim(usize, Vec2),
    Split(usize),
    Eject(usize),
    Wait(u8),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0usize..4, -1500.0f32..1500.0, -1500.0f32..1500.0).prop_map(|(p, x, y)| Op::Aim(p, Vec2::new(x, y))),
        1 => (0usize..4).prop_map(Op::Split),
        1 => (0usize..4).prop_map(Op::Eject),
        2 => (1u8..20).prop_map(Op::Wait),
    ]
}

/// A small closed world: nothing spawns after setup and nothing decays.
fn closed_config(seed: u64) -> Config {
    let mut config = Config::default();
    config.server.seed = Some(seed);
    config.border.width = 3000.0;
    config.border.height = 3000.0;
    config.food.min_amount = 0;
    config.food.max_amount = 0;
    config.virus.min_amount = 0;
    config.player.decay_rate = 0.0;
    config.player.start_size = 120.0;
    config
}

fn total_size_sq(game: &Game) -> f64 {
    game.world
        .iter_cells()
        .map(|(_, c)| {
            let size = c.data().size() as f64;
            size * size
        })
        .sum()
}

fn check_world(game: &Game) -> Result<(), TestCaseError> {
    prop_assert!(game.is_consistent(), "index out of sync at tick {}", game.tick());

    let border = game.world.border;
    for (&id, cell) in game.world.iter_cells() {
        let data = cell.data();
        prop_assert!(data.position.is_finite(), "cell {} at {:?}", id, data.position);
        prop_assert!(data.size().is_finite() && data.size() > 0.0);
        prop_assert!(data.position.x >= border.min_x && data.position.x <= border.max_x);
        prop_assert!(data.position.y >= border.min_y && data.position.y <= border.max_y);

        if let Some(owner) = data.owner_id {
            prop_assert_eq!(data.cell_type, CellType::Player);
            let player = game.player(owner);
            prop_assert!(player.is_some_and(|p| p.cells.contains(&id)), "orphan cell {}", id);
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_closed_world_never_gains_mass(
        seed in any::<u64>(),
        viruses in 0usize..6,
        ops in prop::collection::vec(arb_op(), 1..60)
    ) {
        let mut config = closed_config(seed);
        config.virus.min_amount = viruses;
        let mut game = Game::new(config);
        game.populate();

        let players: Vec<u32> = (0..4).map(|i| game.add_player(format!("p{}", i))).collect();
        for &id in &players {
            game.spawn_player(id);
        }
        let sender = game.command_sender();
        check_world(&game)?;

        // Spawning is over: from here on mass only moves or is lost.
        game.config.virus.min_amount = 0;
        let mut budget = total_size_sq(&game);

        for op in ops {
            let steps = match op {
                Op::Aim(p, target) => {
                    sender.set_target(players[p], target).unwrap();
                    1
                }
                Op::Split(p) => {
                    sender.split(players[p]).unwrap();
                    1
                }
                Op::Eject(p) => {
                    sender.send(Command::Eject { player_id: players[p] }).unwrap();
                    1
                }
                Op::Wait(n) => n,
            };
            for _ in 0..steps {
                game.step();
                let total = total_size_sq(&game);
                prop_assert!(total <= budget * (1.0 + 1e-4), "mass grew from {} to {}", budget, total);
                budget = total;
            }
            check_world(&game)?;
        }
    }
}

#[test]
fn test_long_run_with_spawning_stays_consistent() {
    let mut config = Config::default();
    config.server.seed = Some(42);
    config.border.width = 4000.0;
    config.border.height = 4000.0;
    config.food.min_amount = 300;
    config.food.max_amount = 400;
    config.virus.min_amount = 10;
    config.virus.max_amount = 20;
    let mut game = Game::new(config);
    game.populate();

    let sender = game.command_sender();
    let players: Vec<u32> = (0..6).map(|i| game.add_player(format!("bot{}", i))).collect();
    for &id in &players {
        game.spawn_player(id);
    }

    for tick in 0..1500u32 {
        for (i, &id) in players.iter().enumerate() {
            let angle = (tick as f32 * 0.01) + i as f32;
            sender.set_target(id, Vec2::new(angle.sin(), angle.cos()) * 1500.0).unwrap();
            if tick % 97 == i as u32 {
                sender.split(id).unwrap();
            }
            if tick % 31 == i as u32 {
                sender.eject(id).unwrap();
            }
            if game.player(id).is_some_and(|p| !p.is_alive()) {
                sender.respawn(id).unwrap();
            }
        }
        game.step();
        assert!(game.is_consistent(), "inconsistent at tick {}", game.tick());
    }

    let stats = game.stats();
    assert_eq!(stats.tick, 1500);
    assert!(stats.food <= 400);
    assert!(stats.viruses <= 20);
    assert_eq!(stats.players, 6);
}

type Snapshot = Vec<(u32, CellType, Vec2, f32, Option<u32>)>;

fn snapshot(game: &Game) -> Snapshot {
    let mut cells: Snapshot = game
        .world
        .iter_cells()
        .map(|(&id, c)| {
            let data = c.data();
            (id, data.cell_type, data.position, data.size(), data.owner_id)
        })
        .collect();
    cells.sort_unstable_by_key(|c| c.0);
    cells
}

/// Run a scripted match and record the world after every tick.
fn replay(seed: u64) -> Vec<Snapshot> {
    let mut config = Config::default();
    config.server.seed = Some(seed);
    config.border.width = 3000.0;
    config.border.height = 3000.0;
    config.food.min_amount = 150;
    config.food.max_amount = 200;
    config.virus.min_amount = 6;
    config.virus.max_amount = 10;
    config.eject.spawn_percent = 0.5;
    let mut game = Game::new(config);
    game.populate();

    let sender = game.command_sender();
    let players: Vec<u32> = (0..4).map(|i| game.add_player(format!("r{}", i))).collect();
    for &id in &players {
        game.spawn_player(id);
    }

    let mut history = Vec::new();
    for tick in 0..400u32 {
        for (i, &id) in players.iter().enumerate() {
            let angle = tick as f32 * 0.02 + i as f32 * 1.7;
            sender.set_target(id, Vec2::new(angle.sin(), angle.cos()) * 1200.0).unwrap();
            if tick % 53 == i as u32 {
                sender.split(id).unwrap();
            }
            if tick % 7 == i as u32 {
                sender.eject(id).unwrap();
            }
            if tick == 250 && i == 3 {
                sender.disconnect(id).unwrap();
            } else if game.player(id).is_some_and(|p| !p.is_alive()) {
                sender.respawn(id).unwrap();
            }
        }
        game.step();
        history.push(snapshot(&game));
    }
    history
}

#[test]
fn test_same_seed_and_commands_replay_identically() {
    let first = replay(7);
    let second = replay(7);
    assert_eq!(first.len(), second.len());
    for (tick, (a, b)) in first.iter().zip(&second).enumerate() {
        assert_eq!(a, b, "worlds diverged at tick {}", tick + 1);
    }
    assert_ne!(first.last(), replay(8).last());
}
