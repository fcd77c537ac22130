use hexloc::compute::grid;
use hexloc::{Config, Direction, HexError, JoinOutcome, MemoryStore, PresenceBuilder, PresenceIndex};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

const TIMES_SQUARE: (f64, f64) = (40.7580, -73.9855);

fn index() -> PresenceIndex {
    let _ = env_logger::builder().is_test(true).try_init();
    PresenceBuilder::new().build().expect("Failed to build index")
}

#[test]
fn test_times_square_join() {
    let index = index();

    let first = index
        .join("alice", TIMES_SQUARE.0, TIMES_SQUARE.1, 8)
        .expect("First join failed");
    assert_eq!(first.outcome, JoinOutcome::Created);
    assert_eq!(first.cell.boundary.len(), 6);
    assert_eq!(first.cell.record.resolution, 8);
    assert_eq!(first.cell.record.active_users, 1);
    assert_eq!(first.position.lat, TIMES_SQUARE.0);
    assert_eq!(first.position.lon, TIMES_SQUARE.1);
    assert_eq!(
        first.cell.record.display_name.as_deref(),
        Some("Neighborhood Chat")
    );

    let second = index
        .join("bob", TIMES_SQUARE.0, TIMES_SQUARE.1, 8)
        .expect("Second join failed");
    assert_eq!(second.cell.record.id, first.cell.record.id);
    assert_eq!(second.cell.record.active_users, 2);
}

#[test]
fn test_double_join_counts_once() {
    let index = index();
    let start = SystemTime::now();

    let first = index
        .join_at("alice", TIMES_SQUARE.0, TIMES_SQUARE.1, 8, start)
        .unwrap();
    let second = index
        .join_at(
            "alice",
            TIMES_SQUARE.0,
            TIMES_SQUARE.1,
            8,
            start + Duration::from_secs(30),
        )
        .unwrap();

    assert_eq!(second.outcome, JoinOutcome::Refreshed);
    assert_eq!(second.cell.record.active_users, first.cell.record.active_users);
    assert_eq!(
        second.cell.record.last_activity,
        start + Duration::from_secs(30)
    );
}

#[test]
fn test_join_at_other_resolution_is_separate_cell() {
    let index = index();
    let fine = index.join("alice", TIMES_SQUARE.0, TIMES_SQUARE.1, 9).unwrap();
    let coarse = index.join("alice", TIMES_SQUARE.0, TIMES_SQUARE.1, 7).unwrap();

    assert_ne!(fine.cell.record.id, coarse.cell.record.id);
    assert!(grid::is_descendant(fine.cell.record.id, coarse.cell.record.id));
    assert_eq!(index.cells_for_user("alice").unwrap().len(), 2);
}

#[test]
fn test_active_neighbors_exclude_self_and_idle() {
    let index = index();
    let joined = index.join("alice", TIMES_SQUARE.0, TIMES_SQUARE.1, 8).unwrap();
    let home = joined.cell.record.id;

    let ring = grid::neighbors(home, 1);
    assert_eq!(ring.len(), 6);

    // Two active neighbors and one idle one
    for (i, cell) in ring.iter().take(2).enumerate() {
        let center = grid::cell_center(*cell);
        index
            .join(&format!("user_{}", i), center.lat, center.lon, 8)
            .unwrap();
    }
    let idle = grid::cell_center(ring[2]);
    index.ensure_cell(idle.lat, idle.lon, 8).unwrap();

    let neighbors = index.active_neighbors(home, 1).unwrap();
    assert_eq!(neighbors.len(), 2);
    assert!(neighbors.iter().all(|n| n.cell != home));
    assert!(neighbors.iter().all(|n| n.cell != ring[2]));
    assert!(neighbors.iter().all(|n| n.active_users == 1));
    assert!(
        neighbors
            .windows(2)
            .all(|w| w[0].distance_km <= w[1].distance_km)
    );

    // Resolution 8 cells are under a kilometre apart
    for neighbor in &neighbors {
        assert!(neighbor.distance_km > 0.1 && neighbor.distance_km < 1.5);
        let expected = hexloc::compute::cardinal_direction(
            &grid::cell_center(home),
            &grid::cell_center(neighbor.cell),
        );
        assert_eq!(neighbor.direction, expected);
    }

    // The home cell shows up from the neighbor's side
    let back = index.active_neighbors(ring[0], 1).unwrap();
    assert!(back.iter().any(|n| n.cell == home));
}

#[test]
fn test_join_reports_neighbors() {
    let index = index();
    let first = index.join("alice", TIMES_SQUARE.0, TIMES_SQUARE.1, 8).unwrap();
    assert!(first.neighbors.is_empty());

    let next = grid::neighbors(first.cell.record.id, 1)[0];
    let center = grid::cell_center(next);
    let second = index.join("bob", center.lat, center.lon, 8).unwrap();

    assert_eq!(second.neighbors.len(), 1);
    assert_eq!(second.neighbors[0].cell, first.cell.record.id);
    assert_eq!(second.neighbors[0].name, "Neighborhood Chat");
}

#[test]
fn test_wider_rings_without_cache() {
    let config = Config::default().with_precompute_neighbors(false);
    let index = PresenceBuilder::new().config(config).build().unwrap();
    let home = index.join("alice", TIMES_SQUARE.0, TIMES_SQUARE.1, 8).unwrap();

    let two_away = grid::neighbors(home.cell.record.id, 2)
        .into_iter()
        .find(|c| !grid::neighbors(home.cell.record.id, 1).contains(c))
        .unwrap();
    let center = grid::cell_center(two_away);
    index.join("bob", center.lat, center.lon, 8).unwrap();

    assert!(index.active_neighbors(home.cell.record.id, 1).unwrap().is_empty());
    assert_eq!(index.active_neighbors(home.cell.record.id, 2).unwrap().len(), 1);
}

#[test]
fn test_directions_are_cardinal() {
    let index = index();
    let origin = index.join("alice", 0.0, 0.0, 6).unwrap();
    let north = index.join("bob", 0.3, 0.0, 6).unwrap();
    let east = index.join("carol", 0.0, 0.3, 6).unwrap();

    let neighbors = index.active_neighbors(origin.cell.record.id, 10).unwrap();
    let direction_of = |cell| {
        neighbors
            .iter()
            .find(|n| n.cell == cell)
            .map(|n| n.direction)
    };
    assert_eq!(direction_of(north.cell.record.id), Some(Direction::North));
    assert_eq!(direction_of(east.cell.record.id), Some(Direction::East));
}

#[test]
fn test_neighbor_query_beyond_limit_rejected() {
    let index = index();
    let origin = index.join("alice", 0.0, 0.0, 6).unwrap();

    let result = index.active_neighbors(origin.cell.record.id, 1_000_000);
    assert!(matches!(result, Err(HexError::InvalidInput(_))));
}

#[test]
fn test_expire_inactive_is_idempotent() {
    let index = index();
    let start = SystemTime::now();

    let joined = index
        .join_at("alice", TIMES_SQUARE.0, TIMES_SQUARE.1, 8, start)
        .unwrap();
    index
        .join_at(
            "bob",
            TIMES_SQUARE.0,
            TIMES_SQUARE.1,
            8,
            start + Duration::from_secs(600),
        )
        .unwrap();

    let now = start + Duration::from_secs(700);
    let first = index
        .expire_inactive_at(Duration::from_secs(300), now)
        .unwrap();
    assert_eq!(first.removed_occupancies, 1);
    assert_eq!(first.cells_touched(), 1);
    assert_eq!(first.evictions[0].active_users, 1);

    let second = index
        .expire_inactive_at(Duration::from_secs(300), now)
        .unwrap();
    assert_eq!(second.removed_occupancies, 0);

    let cell = index.cell(joined.cell.record.id).unwrap();
    assert_eq!(cell.record.active_users, 1);
    assert!(index.cells_for_user("alice").unwrap().is_empty());
}

#[test]
fn test_expire_keeps_cell_records() {
    let index = index();
    let start = SystemTime::now();
    let joined = index
        .join_at("alice", TIMES_SQUARE.0, TIMES_SQUARE.1, 8, start)
        .unwrap();

    index
        .expire_inactive_at(Duration::from_secs(60), start + Duration::from_secs(3600))
        .unwrap();

    let cell = index.cell(joined.cell.record.id).unwrap();
    assert_eq!(cell.record.active_users, 0);
    assert!(index.active_neighbors(cell.record.id, 1).unwrap().is_empty());
}

#[test]
fn test_leave_recounts() {
    let index = index();
    let joined = index.join("alice", TIMES_SQUARE.0, TIMES_SQUARE.1, 8).unwrap();
    index.join("bob", TIMES_SQUARE.0, TIMES_SQUARE.1, 8).unwrap();
    let cell = joined.cell.record.id;

    assert!(index.leave("alice", cell).unwrap());
    assert!(!index.leave("alice", cell).unwrap());
    assert_eq!(index.cell(cell).unwrap().record.active_users, 1);
}

#[test]
fn test_multi_presence() {
    let index = index();
    let nyc = index.join("alice", TIMES_SQUARE.0, TIMES_SQUARE.1, 8).unwrap();
    let la = index.join("alice", 34.0522, -118.2437, 8).unwrap();

    let cells: Vec<_> = index
        .cells_for_user("alice")
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(cells.len(), 2);
    assert!(cells.contains(&nyc.cell.record.id));
    assert!(cells.contains(&la.cell.record.id));

    // Joining LA did not evict the NYC presence
    assert_eq!(index.cell(nyc.cell.record.id).unwrap().record.active_users, 1);
}

#[test]
fn test_unknown_cell_not_found() {
    let index = index();
    let cell = index.resolve_cell(TIMES_SQUARE.0, TIMES_SQUARE.1, 8).unwrap();
    assert!(matches!(index.cell(cell), Err(HexError::NotFound(_))));
}

#[test]
fn test_parse_cell_id_round_trip() {
    let index = index();
    let cell = index.resolve_cell(TIMES_SQUARE.0, TIMES_SQUARE.1, 8).unwrap();
    assert_eq!(index.parse_cell_id(&cell.to_string()).unwrap(), cell);
    assert!(matches!(
        index.parse_cell_id("not-a-cell"),
        Err(HexError::InvalidCellId(_))
    ));
}

#[test]
fn test_resolution_catalog() {
    let index = index();
    let levels: Vec<u8> = index.resolutions().iter().map(|r| r.level).collect();
    assert_eq!(levels, vec![6, 7, 8, 9, 10]);
    assert_eq!(hexloc::DEFAULT_RESOLUTION, 8);
}

#[test]
fn test_join_result_serializes() {
    let index = index();
    let joined = index.join("alice", TIMES_SQUARE.0, TIMES_SQUARE.1, 8).unwrap();
    let json = serde_json::to_value(&joined).unwrap();

    assert_eq!(json["outcome"], "created");
    assert_eq!(json["cell"]["active_users"], 1);
    assert_eq!(json["cell"]["boundary"].as_array().unwrap().len(), 6);
}

#[test]
fn test_concurrent_joins() {
    let index = Arc::new(index());
    let threads = 8;
    let users_per_thread = 50;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                for i in 0..users_per_thread {
                    let user = format!("user_{}_{}", t, i);
                    index
                        .join(&user, TIMES_SQUARE.0, TIMES_SQUARE.1, 8)
                        .unwrap();
                    // Refresh must not change the count
                    index
                        .join(&user, TIMES_SQUARE.0, TIMES_SQUARE.1, 8)
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let cell = index.resolve_cell(TIMES_SQUARE.0, TIMES_SQUARE.1, 8).unwrap();
    assert_eq!(
        index.cell(cell).unwrap().record.active_users,
        (threads * users_per_thread) as u32
    );
}

#[test]
fn test_concurrent_sweep_and_refresh_stay_consistent() {
    let index: Arc<PresenceIndex<MemoryStore>> = Arc::new(index());
    let start = SystemTime::now();
    let later = start + Duration::from_secs(1000);

    for i in 0..100 {
        index
            .join_at(&format!("user_{}", i), TIMES_SQUARE.0, TIMES_SQUARE.1, 8, start)
            .unwrap();
    }

    let refresher = {
        let index = Arc::clone(&index);
        thread::spawn(move || {
            for i in 0..100 {
                index
                    .join_at(&format!("user_{}", i), TIMES_SQUARE.0, TIMES_SQUARE.1, 8, later)
                    .unwrap();
            }
        })
    };
    let sweeper = {
        let index = Arc::clone(&index);
        thread::spawn(move || {
            for _ in 0..20 {
                index
                    .expire_inactive_at(Duration::from_secs(500), later)
                    .unwrap();
            }
        })
    };

    refresher.join().unwrap();
    sweeper.join().unwrap();

    let cell = index.resolve_cell(TIMES_SQUARE.0, TIMES_SQUARE.1, 8).unwrap();
    let active = index.cell(cell).unwrap().record.active_users;
    let stats = index.stats().unwrap();
    assert_eq!(active as usize, stats.occupancy_count);
    assert_eq!(stats.cell_count, 1);
}
