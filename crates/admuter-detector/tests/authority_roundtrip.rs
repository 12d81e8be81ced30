//! Detectors driven by their run loop against a real in-process authority.

use std::sync::Arc;
use std::time::Duration;

use admuter_authority::{Authority, LocalChannel, MemoryStore, MemoryTabs, SettingsStore};
use admuter_detector::sites::{HuluProfile, TwitchProfile};
use admuter_detector::{Detector, DetectorSettings, Lifecycle, MemoryPage};
use admuter_protocols::{AuthorityChannel, ElementSnapshot, Request, Response, TabId};
use tokio::time;

const TWITCH_AD: &str = "[data-a-target=\"video-ad-label\"]";

struct World {
    authority: Arc<Authority>,
    store: Arc<MemoryStore>,
    tabs: Arc<MemoryTabs>,
}

fn world() -> World {
    let store = Arc::new(MemoryStore::new());
    let tabs = Arc::new(MemoryTabs::new());
    let authority = Arc::new(Authority::new(store.clone(), tabs.clone()));
    World {
        authority,
        store,
        tabs,
    }
}

fn twitch_page() -> Arc<MemoryPage> {
    Arc::new(MemoryPage::new().with_element(".video-player", ElementSnapshot::new()))
}

#[tokio::test(start_paused = true)]
async fn test_ad_is_muted_and_credited() {
    let w = world();
    let (channel, inbox) = w.authority.connect(TabId(1));
    let page = twitch_page();
    let detector = Detector::new(
        TwitchProfile::new(),
        page.clone(),
        Arc::new(channel),
        DetectorSettings::default(),
    );
    let mut state = detector.watch_state();
    let task = tokio::spawn(detector.run(inbox));

    state
        .wait_for(|s| s.lifecycle == Lifecycle::Running)
        .await
        .unwrap();

    page.insert(TWITCH_AD, ElementSnapshot::new());
    state.wait_for(|s| s.muted).await.unwrap();
    assert!(w.tabs.is_muted(TabId(1)));

    time::sleep(Duration::from_millis(15_400)).await;
    page.remove(TWITCH_AD);
    state.wait_for(|s| !s.ad_playing && !s.muted).await.unwrap();
    assert!(!w.tabs.is_muted(TabId(1)));

    let settings = w.store.load().await.unwrap();
    assert_eq!(settings.ads_muted, 1);
    assert_eq!(settings.seconds_saved, 15);

    let ui = LocalChannel::new(w.authority.clone(), None);
    assert_eq!(
        ui.send(Request::GetMetrics).await.unwrap(),
        Response::metrics(1, "15s")
    );

    assert!(w.authority.unregister(TabId(1)));
    let last = task.await.unwrap();
    assert_eq!(last.lifecycle, Lifecycle::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_disable_from_settings_ends_active_ad() {
    let w = world();
    let (channel, inbox) = w.authority.connect(TabId(2));
    let page = twitch_page();
    let detector = Detector::new(
        TwitchProfile::new(),
        page.clone(),
        Arc::new(channel),
        DetectorSettings::default(),
    );
    let mut state = detector.watch_state();
    let task = tokio::spawn(detector.run(inbox));

    state
        .wait_for(|s| s.lifecycle == Lifecycle::Running)
        .await
        .unwrap();
    page.insert(TWITCH_AD, ElementSnapshot::new());
    state.wait_for(|s| s.muted).await.unwrap();
    time::sleep(Duration::from_secs(7)).await;

    let ui = LocalChannel::new(w.authority.clone(), None);
    let response = ui
        .send(Request::SetAdMuterState { enabled: false })
        .await
        .unwrap();
    assert_eq!(response, Response::ok());

    // The push is answered only after the detector has released the ad
    let snapshot = state.borrow().clone();
    assert_eq!(snapshot.lifecycle, Lifecycle::Disabled);
    assert!(!snapshot.muted);
    assert!(!w.tabs.is_muted(TabId(2)));
    let settings = w.store.load().await.unwrap();
    assert!(!settings.ad_muter_enabled);
    assert_eq!(settings.ads_muted, 1);
    assert_eq!(settings.seconds_saved, 7);

    // Still disabled: nothing is muted however long the ad stays up
    time::sleep(Duration::from_secs(5)).await;
    assert!(!w.tabs.is_muted(TabId(2)));

    ui.send(Request::SetAdMuterState { enabled: true })
        .await
        .unwrap();
    state.wait_for(|s| s.muted).await.unwrap();
    assert!(w.tabs.is_muted(TabId(2)));

    w.authority.unregister(TabId(2));
    let last = task.await.unwrap();
    assert!(!last.muted);
    assert!(!w.tabs.is_muted(TabId(2)));
}

#[tokio::test(start_paused = true)]
async fn test_refused_unmute_on_disable_is_retried() {
    let w = world();
    let (channel, inbox) = w.authority.connect(TabId(4));
    let page = twitch_page();
    let detector = Detector::new(
        TwitchProfile::new(),
        page.clone(),
        Arc::new(channel),
        DetectorSettings::default(),
    );
    let mut state = detector.watch_state();
    let task = tokio::spawn(detector.run(inbox));

    state
        .wait_for(|s| s.lifecycle == Lifecycle::Running)
        .await
        .unwrap();
    page.insert(TWITCH_AD, ElementSnapshot::new());
    state.wait_for(|s| s.muted).await.unwrap();
    time::sleep(Duration::from_secs(5)).await;

    w.tabs.refuse(TabId(4));
    let ui = LocalChannel::new(w.authority.clone(), None);
    ui.send(Request::SetAdMuterState { enabled: false })
        .await
        .unwrap();
    let snapshot = state.borrow().clone();
    assert_eq!(snapshot.lifecycle, Lifecycle::Disabled);
    assert!(snapshot.muted);
    assert!(w.tabs.is_muted(TabId(4)));

    w.tabs.allow(TabId(4));
    state.wait_for(|s| !s.muted).await.unwrap();
    assert!(!w.tabs.is_muted(TabId(4)));
    assert_eq!(state.borrow().lifecycle, Lifecycle::Disabled);
    let settings = w.store.load().await.unwrap();
    assert_eq!(settings.ads_muted, 1);
    assert_eq!(settings.seconds_saved, 5);

    w.authority.unregister(TabId(4));
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_invalidated_context_recovers() {
    let w = world();
    let (channel, inbox) = w.authority.connect(TabId(3));
    let channel = Arc::new(channel);
    let page = twitch_page();
    let detector = Detector::new(
        TwitchProfile::new(),
        page.clone(),
        channel.clone(),
        DetectorSettings::default(),
    );
    let mut state = detector.watch_state();
    let task = tokio::spawn(detector.run(inbox));

    state
        .wait_for(|s| s.lifecycle == Lifecycle::Running)
        .await
        .unwrap();

    channel.invalidate();
    page.insert(TWITCH_AD, ElementSnapshot::new());
    state
        .wait_for(|s| s.lifecycle == Lifecycle::CoolingDown)
        .await
        .unwrap();
    assert!(!w.tabs.is_muted(TabId(3)));

    channel.restore();
    state
        .wait_for(|s| s.lifecycle == Lifecycle::Running && s.muted)
        .await
        .unwrap();
    assert!(w.tabs.is_muted(TabId(3)));

    w.authority.unregister(TabId(3));
    task.await.unwrap();
    assert!(!w.tabs.is_muted(TabId(3)));
}

#[tokio::test(start_paused = true)]
async fn test_tabs_are_independent() {
    let w = world();

    let (twitch_channel, twitch_inbox) = w.authority.connect(TabId(10));
    let twitch_page = twitch_page();
    let twitch = Detector::new(
        TwitchProfile::new(),
        twitch_page.clone(),
        Arc::new(twitch_channel),
        DetectorSettings::default(),
    );
    let mut twitch_state = twitch.watch_state();

    let (hulu_channel, hulu_inbox) = w.authority.connect(TabId(11));
    let hulu_page = Arc::new(
        MemoryPage::new().with_element("#content-video-player", ElementSnapshot::new()),
    );
    let hulu = Detector::new(
        HuluProfile::new(),
        hulu_page.clone(),
        Arc::new(hulu_channel),
        DetectorSettings::default(),
    );
    let mut hulu_state = hulu.watch_state();

    let twitch_task = tokio::spawn(twitch.run(twitch_inbox));
    let hulu_task = tokio::spawn(hulu.run(hulu_inbox));
    twitch_state
        .wait_for(|s| s.lifecycle == Lifecycle::Running)
        .await
        .unwrap();
    hulu_state
        .wait_for(|s| s.lifecycle == Lifecycle::Running)
        .await
        .unwrap();

    twitch_page.insert(TWITCH_AD, ElementSnapshot::new());
    twitch_state.wait_for(|s| s.muted).await.unwrap();
    assert!(w.tabs.is_muted(TabId(10)));
    assert!(!w.tabs.is_muted(TabId(11)));
    assert!(!hulu_state.borrow().ad_playing);

    w.authority.unregister(TabId(10));
    w.authority.unregister(TabId(11));
    twitch_task.await.unwrap();
    hulu_task.await.unwrap();

    // Shutdown released the Twitch ad and credited it
    assert_eq!(w.store.load().await.unwrap().ads_muted, 1);
}
