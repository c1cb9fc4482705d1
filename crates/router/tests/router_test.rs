//! End-to-end tests for the server router.
//!
//! Time is driven by a `ManualClock`; the background sweep uses the default
//! 30s interval so it never fires during these tests unless a test asks for
//! a short interval explicitly.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use corelib::ring::{HashRing, MAX_VIRTUAL_NODES};
use router::{Error, FailoverStrategy, ManualClock, NodeId, RouterConfig, ServerRouter};

fn router_with_clock() -> (ServerRouter, ManualClock) {
    let clock = ManualClock::new();
    let router = ServerRouter::with_clock(RouterConfig::default(), Arc::new(clock.clone()))
        .expect("router should start");
    (router, clock)
}

fn abc_router() -> (ServerRouter, ManualClock) {
    let (router, clock) = router_with_clock();
    router.add_server("A", 1.0).unwrap();
    router.add_server("B", 1.0).unwrap();
    router.add_server("C", 2.0).unwrap();
    (router, clock)
}

fn keys(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("user:{i}")).collect()
}

fn id(s: &str) -> NodeId {
    NodeId::from(s)
}

// ============================================================================
// Routing
// ============================================================================

#[test]
fn test_routes_are_deterministic() {
    let (router, _clock) = abc_router();
    for key in keys(500) {
        let first = router.get_route(&key);
        assert!(first.is_some());
        assert_eq!(router.get_route(&key), first);
        assert_eq!(first, router.ring().get_node(&key));
    }
}

#[test]
fn test_weighted_scenario() {
    let (router, _clock) = abc_router();
    assert!(router.get_route("user:42").is_some());
    assert!(router.get_route("user:43").is_some());

    router.set_server_health("A", false).unwrap();
    let route = router.get_route("user:42").unwrap();
    assert!(route == id("B") || route == id("C"), "got {route}");

    // Every key A owned now lands on B or C
    for key in keys(2_000) {
        let route = router.get_route(&key).unwrap();
        assert_ne!(route, id("A"));
    }

    // Back to full health, then drop C: only C's keys move
    router.set_server_health("A", true).unwrap();
    let sample = keys(5_000);
    let before: Vec<NodeId> = sample.iter().map(|k| router.get_route(k).unwrap()).collect();
    router.remove_server("C").unwrap();

    let mut moved = 0;
    for (key, previous) in sample.iter().zip(&before) {
        let now = router.get_route(key).unwrap();
        if *previous == id("C") {
            assert!(now == id("A") || now == id("B"));
            moved += 1;
        } else {
            assert_eq!(&now, previous, "{key} moved off a surviving server");
        }
    }
    // C holds about half the ring
    let ratio = moved as f64 / sample.len() as f64;
    assert!(ratio > 0.3 && ratio < 0.7, "moved {ratio:.3}");
}

#[test]
fn test_failover_stays_within_candidates() {
    let (router, _clock) = router_with_clock();
    for i in 0..6 {
        router.add_server(format!("server-{i}"), 1.0).unwrap();
    }

    for key in keys(300) {
        let primary = router.ring().get_node(&key).unwrap();
        router.set_server_health(primary.as_str(), false).unwrap();

        let candidates = router.route_candidates(&key);
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0], primary);

        let route = router.get_route(&key).unwrap();
        assert_ne!(route, primary);
        assert!(candidates.contains(&route));
        // The nearest healthy candidate wins
        assert_eq!(route, candidates[1]);
        assert!(router.server_health(route.as_str()).unwrap().healthy);

        router.set_server_health(primary.as_str(), true).unwrap();
    }
}

#[test]
fn test_failover_is_bounded_by_fanout() {
    let (router, _clock) = router_with_clock();
    for i in 0..4 {
        router.add_server(format!("server-{i}"), 1.0).unwrap();
    }

    let key = "session:7";
    let candidates = router.route_candidates(key);
    for candidate in &candidates {
        router.set_server_health(candidate.as_str(), false).unwrap();
    }

    // One server is still healthy, but it is outside the candidate list
    assert_eq!(router.get_healthy_servers().len(), 1);
    assert_eq!(router.get_route(key), None);
}

#[test]
fn test_no_route_when_all_unhealthy() {
    let (router, _clock) = abc_router();
    for server in ["A", "B", "C"] {
        router.set_server_health(server, false).unwrap();
    }
    for key in keys(200) {
        assert_eq!(router.get_route(&key), None);
    }
    assert!(router.get_healthy_servers().is_empty());
}

#[test]
fn test_no_route_on_empty_router() {
    let (router, _clock) = router_with_clock();
    assert_eq!(router.get_route("anything"), None);
    assert!(router.route_candidates("anything").is_empty());
}

#[test]
fn test_custom_strategy() {
    struct Fixed(Vec<NodeId>);

    impl FailoverStrategy for Fixed {
        fn candidates(&self, _ring: &HashRing, _key: &str) -> Vec<NodeId> {
            self.0.clone()
        }

        fn name(&self) -> &'static str {
            "Fixed"
        }
    }

    let clock = Arc::new(ManualClock::new());
    let router = ServerRouter::with_strategy(
        RouterConfig::default(),
        clock,
        Box::new(Fixed(vec![id("standby")])),
    )
    .unwrap();
    router.add_server("main", 1.0).unwrap();
    router.add_server("standby", 1.0).unwrap();
    router.set_server_health("main", false).unwrap();
    router.set_server_health("standby", true).unwrap();

    for key in keys(50) {
        assert_eq!(router.get_route(&key), Some(id("standby")));
    }
}

// ============================================================================
// Membership and errors
// ============================================================================

#[test]
fn test_duplicate_and_unknown_servers_are_reported() {
    let (router, _clock) = abc_router();

    assert_eq!(router.add_server("A", 1.0), Err(Error::AlreadyExists(id("A"))));
    assert_eq!(router.remove_server("Z"), Err(Error::NotFound(id("Z"))));
    assert_eq!(
        router.set_server_health("Z", true),
        Err(Error::NotFound(id("Z")))
    );
    assert!(matches!(
        router.add_server("D", 0.0),
        Err(Error::InvalidWeight { .. })
    ));

    // Nothing changed
    assert_eq!(router.get_stats().total_servers, 3);
    assert!(router.server_health("Z").is_none());
    assert!(router.server_health("D").is_none());
}

#[test]
fn test_remove_drops_health_record() {
    let (router, _clock) = abc_router();
    router.set_server_health("B", false).unwrap();
    router.remove_server("B").unwrap();
    assert!(router.server_health("B").is_none());

    // Re-registering starts healthy again
    router.add_server("B", 1.0).unwrap();
    assert!(router.server_health("B").unwrap().healthy);
}

#[test]
fn test_stats() {
    let (router, _clock) = abc_router();
    router.set_server_health("B", false).unwrap();

    let stats = router.get_stats();
    assert_eq!(stats.total_servers, 3);
    assert_eq!(stats.healthy_servers, 2);
    assert_eq!(stats.virtual_nodes, 150 + 150 + 300);
    // Population std dev of [150, 150, 300]
    assert!((stats.distribution_std_dev - 70.710_678).abs() < 1e-5);

    assert_eq!(router.get_healthy_servers(), vec![id("A"), id("C")]);
}

#[test]
fn test_oversized_weight_is_rejected() {
    let (router, _clock) = router_with_clock();
    for weight in [1e6, 1e30, f64::MAX] {
        assert!(matches!(
            router.add_server("huge", weight),
            Err(Error::InvalidWeight { .. })
        ));
    }
    assert!(router.server_health("huge").is_none());
    assert_eq!(router.get_stats().total_servers, 0);

    // The largest weight the default base allows still registers
    let heaviest = MAX_VIRTUAL_NODES as f64 / 150.0;
    router.add_server("big", heaviest).unwrap();
    assert_eq!(router.get_stats().virtual_nodes, MAX_VIRTUAL_NODES);
}

#[test]
fn test_concurrent_membership_changes_keep_records_in_step() {
    let config = RouterConfig::default().with_virtual_nodes(8);
    let router = Arc::new(ServerRouter::with_clock(config, Arc::new(ManualClock::new())).unwrap());
    let rounds = 5_000;

    let adder = {
        let router = Arc::clone(&router);
        thread::spawn(move || {
            for _ in 0..rounds {
                let _ = router.add_server("X", 1.0);
            }
        })
    };
    let remover = {
        let router = Arc::clone(&router);
        thread::spawn(move || {
            for _ in 0..rounds {
                let _ = router.remove_server("X");
            }
        })
    };
    let observer = {
        let router = Arc::clone(&router);
        thread::spawn(move || {
            for _ in 0..rounds {
                let stats = router.get_stats();
                assert!(
                    stats.healthy_servers <= stats.total_servers,
                    "health record without a ring node: {stats:?}"
                );
            }
        })
    };

    adder.join().unwrap();
    remover.join().unwrap();
    observer.join().unwrap();

    assert_eq!(router.server_health("X").is_some(), router.ring().contains("X"));
    let stats = router.get_stats();
    assert_eq!(stats.healthy_servers, stats.total_servers);
}

#[test]
fn test_destroy_racing_add_leaves_no_orphans() {
    let config = RouterConfig::default().with_virtual_nodes(8);
    let router = Arc::new(ServerRouter::with_clock(config, Arc::new(ManualClock::new())).unwrap());

    let adder = {
        let router = Arc::clone(&router);
        thread::spawn(move || {
            for i in 0..500 {
                let _ = router.add_server(format!("server-{i}"), 1.0);
            }
        })
    };
    for _ in 0..50 {
        router.destroy();
    }
    adder.join().unwrap();

    let stats = router.get_stats();
    assert_eq!(stats.healthy_servers, stats.total_servers);
    assert_eq!(router.get_healthy_servers(), router.ring().node_ids());
}

// ============================================================================
// Staleness sweep
// ============================================================================

#[test]
fn test_sweep_marks_silent_servers_unhealthy() {
    let (router, clock) = abc_router();

    clock.advance(Duration::from_secs(40));
    router.set_server_health("A", true).unwrap();

    clock.advance(Duration::from_secs(30));
    // B and C are 70s old, A only 30s
    assert_eq!(router.sweep_stale(), vec![id("B"), id("C")]);
    assert_eq!(router.get_healthy_servers(), vec![id("A")]);

    // Sticky until explicitly marked healthy
    clock.advance(Duration::from_secs(5));
    assert!(router.sweep_stale().is_empty());
    assert!(!router.server_health("B").unwrap().healthy);

    router.set_server_health("B", true).unwrap();
    assert!(router.server_health("B").unwrap().healthy);
    assert!(router.sweep_stale().is_empty());
    assert_eq!(router.get_healthy_servers(), vec![id("A"), id("B")]);
}

#[test]
fn test_sweep_respects_threshold() {
    let (router, clock) = abc_router();
    clock.advance(Duration::from_secs(60));
    assert!(router.sweep_stale().is_empty());
    clock.advance(Duration::from_millis(1));
    assert_eq!(router.sweep_stale().len(), 3);
}

#[test]
fn test_stale_primary_fails_over() {
    let (router, clock) = abc_router();
    let key = "user:42";
    let primary = router.get_route(key).unwrap();

    clock.advance(Duration::from_secs(45));
    for server in ["A", "B", "C"] {
        if server != primary.as_str() {
            router.set_server_health(server, true).unwrap();
        }
    }
    clock.advance(Duration::from_secs(20));
    assert_eq!(router.sweep_stale(), vec![primary.clone()]);

    let route = router.get_route(key).unwrap();
    assert_ne!(route, primary);
}

#[test]
fn test_background_sweep_runs() {
    let clock = ManualClock::new();
    let config = RouterConfig::default()
        .with_sweep_interval(Duration::from_millis(10))
        .with_stale_after(Duration::from_secs(1));
    let router = ServerRouter::with_clock(config, Arc::new(clock.clone())).unwrap();
    router.add_server("A", 1.0).unwrap();
    assert!(router.is_sweeping());

    clock.advance(Duration::from_secs(2));
    let deadline = Instant::now() + Duration::from_secs(5);
    while router.server_health("A").unwrap().healthy && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(!router.server_health("A").unwrap().healthy);

    router.destroy();
    assert!(!router.is_sweeping());
}

// ============================================================================
// Lifecycle and concurrency
// ============================================================================

#[test]
fn test_destroy_is_idempotent() {
    let (router, _clock) = abc_router();
    assert!(router.is_sweeping());

    router.destroy();
    assert!(!router.is_sweeping());
    assert_eq!(router.get_route("user:42"), None);
    assert_eq!(router.get_stats().total_servers, 0);
    assert_eq!(router.get_stats().virtual_nodes, 0);
    assert!(router.get_healthy_servers().is_empty());

    router.destroy();
    assert!(!router.is_sweeping());
}

#[test]
fn test_independent_routers() {
    let (first, _c1) = abc_router();
    let (second, _c2) = router_with_clock();
    second.add_server("X", 1.0).unwrap();

    assert_eq!(second.get_route("user:42"), Some(id("X")));
    assert_ne!(first.get_route("user:42"), Some(id("X")));
}

#[test]
fn test_invalid_config_rejected() {
    let config = RouterConfig::default().with_virtual_nodes(0);
    assert!(matches!(
        ServerRouter::new(config),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn test_concurrent_routing_and_health_updates() {
    let (router, _clock) = abc_router();
    let router = Arc::new(router);
    let servers: HashSet<NodeId> = ["A", "B", "C"].into_iter().map(id).collect();

    let writer = {
        let router = Arc::clone(&router);
        thread::spawn(move || {
            for i in 0..500 {
                let server = ["A", "B", "C"][i % 3];
                router.set_server_health(server, i % 2 == 0).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let router = Arc::clone(&router);
            let servers = servers.clone();
            thread::spawn(move || {
                for key in keys(500) {
                    if let Some(route) = router.get_route(&key) {
                        assert!(servers.contains(&route));
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    router.destroy();
}
