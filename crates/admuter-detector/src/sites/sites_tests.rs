//! Tests for the built-in site rules.

use super::*;
use crate::memory_page::MemoryPage;
use crate::profile::ConfirmationPolicy;
use admuter_protocols::{ElementSnapshot, ObserveOptions, VideoState};
use std::time::Duration;

fn el() -> ElementSnapshot {
    ElementSnapshot::new()
}

fn detected(profile: &mut dyn SiteProfile, page: &MemoryPage) -> bool {
    profile.evaluate(page).unwrap().is_detected()
}

// ========================================================================
// Registry
// ========================================================================

#[test]
fn test_profile_for_every_site() {
    for site in Site::ALL {
        assert_eq!(profile_for(site).site(), site);
    }
}

#[test]
fn test_profile_constants() {
    let cases = [
        (Site::YouTube, "#player-container", 1000, 1),
        (Site::Hulu, "#content-video-player", 1000, 3),
        (Site::HboMax, ".video-player", 500, 3),
        (Site::Paramount, "#video-player", 250, 2),
        (Site::Peacock, "html", 500, 1),
        (Site::Twitch, ".video-player", 500, 1),
    ];
    for (site, container, interval_ms, threshold) in cases {
        let profile = profile_for(site);
        assert_eq!(profile.player_selector(), container, "{site}");
        assert_eq!(
            profile.periodic_interval(),
            Duration::from_millis(interval_ms),
            "{site}"
        );
        assert_eq!(profile.confirmation().threshold, threshold, "{site}");
        assert_eq!(profile.confirmation().release_threshold, 1, "{site}");
    }
}

#[test]
fn test_observe_options_per_site() {
    assert_eq!(profile_for(Site::YouTube).observe_options(), ObserveOptions::TREE);
    assert_eq!(
        profile_for(Site::Peacock).observe_options(),
        ObserveOptions::TREE_AND_ATTRIBUTES
    );
    assert_eq!(profile_for(Site::Hulu).observe_options(), ObserveOptions::ALL);
    assert_eq!(profile_for(Site::Peacock).container_fallback(), None);
    assert_eq!(profile_for(Site::Twitch).container_fallback(), Some("body"));
}

#[test]
fn test_tuned_profile_reads_site_table() {
    let config = admuter_config::ConfigLoader::load_str(
        r#"
[sites.hulu]
confirmation_threshold = 5
"#,
    )
    .unwrap();
    let profile = tuned_profile(Site::Hulu, &config);
    assert_eq!(profile.confirmation(), ConfirmationPolicy::confirmed(5));

    let untouched = tuned_profile(Site::Twitch, &config);
    assert_eq!(untouched.confirmation(), ConfirmationPolicy::IMMEDIATE);
}

// ========================================================================
// YouTube
// ========================================================================

#[test]
fn test_youtube_overlay_alone_is_not_an_ad() {
    let page = MemoryPage::new().with_element(".ytp-ad-player-overlay", el());
    assert!(!detected(&mut YouTubeProfile::new(), &page));
}

#[test]
fn test_youtube_overlay_with_corroboration() {
    let mut profile = YouTubeProfile::new();

    for corroborating in [".ytp-ad-skip-button-modern", ".ytp-ad-preview-text", ".ad-showing"] {
        let page = MemoryPage::new()
            .with_element(".video-ads.ytp-ad-module", el())
            .with_element(corroborating, el());
        assert!(detected(&mut profile, &page), "{corroborating}");
    }
}

#[test]
fn test_youtube_corroboration_without_overlay() {
    let page = MemoryPage::new()
        .with_element(".ad-showing", el())
        .with_element(".ytp-ad-text", el());
    assert!(!detected(&mut YouTubeProfile::new(), &page));
}

#[test]
fn test_youtube_skip_target_must_be_rendered() {
    let profile = YouTubeProfile::new();
    let page = MemoryPage::new().with_element(".ytp-ad-skip-button", el().hidden());
    assert_eq!(profile.skip_target(&page).unwrap(), None);

    page.insert(".ytp-ad-skip-button-modern", el());
    assert_eq!(
        profile.skip_target(&page).unwrap(),
        Some(".ytp-ad-skip-button-modern")
    );
}

// ========================================================================
// Hulu
// ========================================================================

#[test]
fn test_hulu_marker() {
    let page = MemoryPage::new().with_element("[data-ad-break-start]", el());
    let signal = HuluProfile::new().evaluate(&page).unwrap();
    assert!(signal.is_detected());
    assert!(signal.get_flag("ad_marker"));
    assert!(!signal.get_flag("playhead_discontinuity"));
}

#[test]
fn test_hulu_playhead_discontinuity() {
    let page = MemoryPage::new();
    let mut profile = HuluProfile::new();

    page.set_video(Some(VideoState {
        current_time: 600.0,
        duration: 2400.0,
    }));
    assert!(!detected(&mut profile, &page));

    page.set_video(Some(VideoState {
        current_time: 0.0,
        duration: 30.0,
    }));
    assert!(detected(&mut profile, &page));
}

#[test]
fn test_hulu_reset_forgets_baseline() {
    let page = MemoryPage::new();
    let mut profile = HuluProfile::new();
    page.set_video(Some(VideoState {
        current_time: 600.0,
        duration: 2400.0,
    }));
    detected(&mut profile, &page);

    profile.reset();
    page.set_video(Some(VideoState {
        current_time: 0.0,
        duration: 30.0,
    }));
    assert!(!detected(&mut profile, &page));
}

// ========================================================================
// HBO Max / Twitch
// ========================================================================

#[test]
fn test_hbomax_markers() {
    let mut profile = HboMaxProfile::new();
    assert!(!detected(&mut profile, &MemoryPage::new()));
    let page = MemoryPage::new().with_element(".ad-pause-card", el());
    assert!(detected(&mut profile, &page));
}

#[test]
fn test_twitch_markers() {
    let mut profile = TwitchProfile::new();
    let page = MemoryPage::new().with_element("[data-a-target=\"video-ad-label\"]", el());
    assert!(detected(&mut profile, &page));
    let page = MemoryPage::new().with_element("[aria-label=\"Advertisement\"]", el());
    assert!(!detected(&mut profile, &page));
}

// ========================================================================
// Paramount+
// ========================================================================

#[test]
fn test_paramount_iframe_must_be_shown() {
    let mut profile = ParamountProfile::new();
    let iframe = "iframe[src*=\"imasdk.googleapis.com\"]";

    let page = MemoryPage::new().with_element(iframe, el().with_visibility("hidden"));
    assert!(!detected(&mut profile, &page));

    let page = MemoryPage::new().with_element(iframe, el());
    assert!(detected(&mut profile, &page));
}

#[test]
fn test_paramount_container_needs_content() {
    let mut profile = ParamountProfile::new();
    let container = "[data-role=\"adContainer\"]";

    let page = MemoryPage::new().with_element(container, el().with_inner_html("   "));
    assert!(!detected(&mut profile, &page));

    let page = MemoryPage::new().with_element(
        container,
        el().with_visibility("hidden").with_inner_html("<video></video>"),
    );
    assert!(detected(&mut profile, &page));
}

#[test]
fn test_paramount_countdown_needs_marker() {
    let mut profile = ParamountProfile::new();
    let countdown = ".ad-info-manager-circular-loader-copy";

    let page = MemoryPage::new().with_element(countdown, el().with_text("12"));
    let signal = profile.evaluate(&page).unwrap();
    assert!(!signal.is_detected());
    assert!(signal.get_flag("ad_countdown"));
    assert_eq!(signal.get_number("countdown_seconds"), Some(12.0));

    page.insert(".ad-ui-view", el().with_inner_html("<span>Ad</span>"));
    assert!(detected(&mut profile, &page));
}

#[test]
fn test_paramount_zero_countdown_is_no_evidence() {
    let mut profile = ParamountProfile::new();
    let page = MemoryPage::new()
        .with_element(".ad-info-manager-circular-loader-copy", el().with_text("0"))
        .with_element(".ad-ui-view", el().with_inner_html("<span>Ad</span>"));
    let signal = profile.evaluate(&page).unwrap();
    assert!(!signal.is_detected());
    assert!(!signal.get_flag("ad_countdown"));
}

#[test]
fn test_paramount_unrendered_countdown_is_no_evidence() {
    let mut profile = ParamountProfile::new();
    let page = MemoryPage::new()
        .with_element(
            ".ad-info-manager-circular-loader-copy",
            el().hidden().with_text("9"),
        )
        .with_element(".ad-ui-view", el().with_inner_html("<span>Ad</span>"));
    assert!(!detected(&mut profile, &page));
}

// ========================================================================
// Peacock
// ========================================================================

#[test]
fn test_peacock_requires_ring_and_container() {
    let mut profile = PeacockProfile::new();
    let page = MemoryPage::new().with_element(".countdown__foreground-ring", el());
    assert!(!detected(&mut profile, &page));

    page.insert(".countdown-container.ad-countdown__container", el());
    assert!(detected(&mut profile, &page));
}

#[test]
fn test_peacock_remaining_time_is_informational() {
    let mut profile = PeacockProfile::new();
    let page = MemoryPage::new()
        .with_element(".countdown__foreground-ring", el())
        .with_element(".countdown-container.ad-countdown__container", el())
        .with_element(
            ".countdown-container.ad-countdown__container .countdown__remaining-time",
            el().with_text("27"),
        );
    let signal = profile.evaluate(&page).unwrap();
    assert!(signal.is_detected());
    assert_eq!(signal.get_number("remaining_seconds"), Some(27.0));
}
