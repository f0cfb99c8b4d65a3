//! Process-wide force stop
//!
//! Lives in its own test binary: `force_stop_all` reaches every controller in
//! the process, so it must not run alongside unrelated controller tests.

mod helpers;

use bgmusic::audio::{force_stop_all, SessionPhase};

use helpers::{settle, unlocked_controller, TestController};

#[tokio::test(start_paused = true)]
async fn force_stop_all_silences_every_live_controller() {
    let (menu, _menu_loader, menu_factory) = unlocked_controller();
    let (level, _level_loader, level_factory) = unlocked_controller();
    menu.play_track("birds", false).await;
    level.play_track("savannah", false).await;

    // A dropped controller must not keep the registry from working
    {
        let (gone, _loader, _factory) = unlocked_controller();
        gone.play_track("insects", false).await;
    }

    force_stop_all();

    assert!(menu_factory.handle(0).is_disposed());
    assert!(level_factory.handle(0).is_disposed());
    assert_eq!(menu.phase(), SessionPhase::Idle);
    assert_eq!(level.phase(), SessionPhase::Idle);

    // Controllers stay usable afterwards
    level.play_track("savannah", false).await;
    assert_eq!(level_factory.created(), 2);
    assert_eq!(level.phase(), SessionPhase::Playing);

    TestController::force_stop_all();
    settle().await;
    assert!(level_factory.handle(1).is_disposed());
    assert_eq!(menu_factory.audible() + level_factory.audible(), 0);
}
