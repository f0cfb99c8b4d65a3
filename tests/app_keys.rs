//! Terminal front-end key handling against fake audio collaborators

mod helpers;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::runtime::Handle;

use bgmusic::app::App;
use bgmusic::audio::{SessionPhase, SessionSettings, TrackKey};

use helpers::{controller_with, settle, FakeFactory, FakeLoader};

fn press(app: &mut App<FakeLoader, FakeFactory>, code: KeyCode) -> bool {
    app.on_key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn app() -> (App<FakeLoader, FakeFactory>, FakeFactory) {
    let (controller, _loader, factory) = controller_with(SessionSettings::default());
    let tracks = ["farm", "ocean", "forest"]
        .into_iter()
        .filter_map(TrackKey::parse)
        .collect();
    (App::new(controller, Handle::current(), tracks), factory)
}

#[tokio::test(start_paused = true)]
async fn first_track_waits_for_a_key_press() {
    let (mut app, factory) = app();
    settle().await;
    assert_eq!(app.controller.phase(), SessionPhase::AwaitingInteraction);
    assert_eq!(factory.created(), 0);

    press(&mut app, KeyCode::Down);
    settle().await;

    assert_eq!(app.selected, 1);
    assert_eq!(app.controller.current_track(), TrackKey::parse("farm"));
    assert_eq!(app.controller.phase(), SessionPhase::Playing);
}

#[tokio::test(start_paused = true)]
async fn enter_plays_the_selected_track() {
    let (mut app, factory) = app();
    press(&mut app, KeyCode::Down);
    press(&mut app, KeyCode::Down);
    press(&mut app, KeyCode::Enter);
    settle().await;

    assert_eq!(app.controller.current_track(), TrackKey::parse("forest"));
    assert_eq!(factory.audible(), 1);
    assert_eq!(factory.violations(), 0);
}

#[tokio::test(start_paused = true)]
async fn restart_key_rebuilds_the_active_track() {
    let (mut app, factory) = app();
    press(&mut app, KeyCode::Enter);
    settle().await;
    let before = factory.created();

    press(&mut app, KeyCode::Char('r'));
    settle().await;

    assert_eq!(factory.created(), before + 1);
    assert_eq!(factory.audible(), 1);
}

#[tokio::test(start_paused = true)]
async fn space_toggles_pause() {
    let (mut app, _factory) = app();
    press(&mut app, KeyCode::Enter);
    settle().await;

    press(&mut app, KeyCode::Char(' '));
    assert_eq!(app.controller.phase(), SessionPhase::Paused);

    press(&mut app, KeyCode::Char(' '));
    settle().await;
    assert_eq!(app.controller.phase(), SessionPhase::Playing);
}

#[tokio::test(start_paused = true)]
async fn mute_duck_and_volume_keys() {
    let (mut app, _factory) = app();
    press(&mut app, KeyCode::Enter);
    settle().await;

    press(&mut app, KeyCode::Char('m'));
    assert!(app.controller.is_muted());
    press(&mut app, KeyCode::Char('m'));
    settle().await;
    assert!(!app.controller.is_muted());
    assert_eq!(app.controller.phase(), SessionPhase::Playing);

    press(&mut app, KeyCode::Char('d'));
    assert!(app.controller.is_ducked());
    press(&mut app, KeyCode::Char('d'));
    assert!(!app.controller.is_ducked());

    press(&mut app, KeyCode::Char('-'));
    assert!((app.controller.global_volume() - 0.9).abs() < 1e-6);
    press(&mut app, KeyCode::Char('+'));
    press(&mut app, KeyCode::Char('+'));
    assert_eq!(app.controller.global_volume(), 1.0);
}

#[tokio::test(start_paused = true)]
async fn preload_key_caches_every_track() {
    let (mut app, _factory) = app();
    press(&mut app, KeyCode::Char('p'));
    settle().await;

    assert_eq!(app.controller.cached_tracks().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn quit_cleans_up() {
    let (mut app, factory) = app();
    press(&mut app, KeyCode::Enter);
    settle().await;

    assert!(press(&mut app, KeyCode::Char('q')));
    assert!(factory.handle(0).is_disposed());
    assert_eq!(app.controller.phase(), SessionPhase::Idle);
}
