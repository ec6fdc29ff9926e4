use campus_viewer::config::ResilienceConfig;
use campus_viewer::resilience::{
    FixedProbe, HeapUsage, MemorySample, RecoveryActions, ReloadReason, ResilienceMonitor, ResilienceState,
};
use std::time::Duration;

fn monitor() -> ResilienceMonitor {
    ResilienceMonitor::new(ResilienceConfig::default())
}

#[test]
fn fifth_consecutive_loss_schedules_reload_but_fourth_does_not() {
    let mut monitor = monitor();
    for _ in 0..4 {
        let actions = monitor.on_context_lost();
        assert!(!actions.contains(RecoveryActions::SCHEDULE_RELOAD));
    }
    let actions = monitor.on_context_lost();
    assert!(actions.contains(RecoveryActions::SCHEDULE_RELOAD));
    let reload = monitor.scheduled_reload().expect("reload scheduled");
    assert_eq!(reload.reason, ReloadReason::RepeatedContextLoss);
    assert_eq!(reload.delay, Duration::from_secs(3));
    assert_eq!(monitor.state(), ResilienceState::ReloadScheduled);

    assert!(monitor.on_context_lost().is_empty());
    assert!(monitor.on_context_restored().is_empty());
}

#[test]
fn restore_resets_streak_and_third_loss_requests_low_graphics() {
    let mut monitor = monitor();
    for round in 1..=3u32 {
        monitor.on_context_lost();
        let restored = monitor.on_context_restored();
        assert!(restored.contains(RecoveryActions::RESUME_RENDERING));
        assert_eq!(restored.contains(RecoveryActions::ENTER_LOW_GRAPHICS), round >= 3);
        assert_eq!(monitor.consecutive_losses(), 0);
    }
    assert_eq!(monitor.total_losses(), 3);
}

#[test]
fn memory_poll_waits_for_initial_delay_then_interval() {
    let mut monitor = monitor();
    let heavy = MemorySample { heap: Some(HeapUsage { used_bytes: 85, limit_bytes: 100 }), ..Default::default() };
    let mut probe = FixedProbe(heavy);

    assert!(monitor.tick(4.0, &mut probe).is_empty());
    let first = monitor.tick(1.5, &mut probe);
    assert!(first.contains(RecoveryActions::ENTER_LOW_GRAPHICS));
    assert!(monitor.tick(10.0, &mut probe).is_empty());
    assert!(monitor.tick(5.0, &mut probe).contains(RecoveryActions::CLEAR_CACHES));
}

#[test]
fn emergency_memory_disposes_scene_and_reloads_after_delay() {
    let mut monitor = monitor();
    let actions = monitor.evaluate_memory(MemorySample {
        heap: Some(HeapUsage { used_bytes: 97, limit_bytes: 100 }),
        textures: 0,
        geometries: 0,
    });
    assert!(actions.contains(RecoveryActions::DISPOSE_SCENE | RecoveryActions::SCHEDULE_RELOAD));
    let mut probe = FixedProbe::default();
    monitor.tick(1.0, &mut probe);
    assert!(!monitor.reload_due());
    monitor.tick(1.5, &mut probe);
    assert!(monitor.reload_due());
}

#[test]
fn resource_counts_trigger_cleanup_without_heap_data() {
    let mut monitor = monitor();
    let actions = monitor.evaluate_memory(MemorySample { heap: None, textures: 101, geometries: 10 });
    assert_eq!(actions, RecoveryActions::CLEAR_CACHES);
    assert!(monitor.evaluate_memory(MemorySample { heap: None, textures: 100, geometries: 500 }).is_empty());
}
