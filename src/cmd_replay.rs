//! Offline replay of a recorded page timeline.
//!
//! The detector runs on a virtual clock, so a ten-minute recording replays
//! instantly while every timer still fires at its recorded offset.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use admuter_authority::{Authority, MemoryStore, MemoryTabs};
use admuter_config::Config;
use admuter_detector::{
    Detector, DetectorEvent, DetectorSettings, InstanceSnapshot, MemoryPage, PageTimeline,
    tuned_profile,
};
use admuter_protocols::{MetricsReply, Request, Response, Site, TabId};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{self, Instant};
use tracing::{info, warn};

const REPLAY_TAB: TabId = TabId(1);

/// What a replay produced.
struct ReplayReport {
    last: InstanceSnapshot,
    metrics: Option<MetricsReply>,
}

pub(crate) async fn handle_replay(
    config: Config,
    site: Option<Site>,
    timeline_path: PathBuf,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let timeline = PageTimeline::load(&timeline_path).await?;
    let site = site
        .or(timeline.site)
        .ok_or("timeline names no site; pass --site")?;
    if !config.is_site_enabled(site.key()) {
        return Err(format!("{} is disabled in the configuration", site.display_name()).into());
    }

    info!(
        "Replaying {} ({} frames, {} ms) as {}",
        timeline_path.display(),
        timeline.frames.len(),
        timeline.total_ms(),
        site.display_name()
    );

    // Replays run on their own paused runtime so sleeps complete instantly
    let report = tokio::task::spawn_blocking(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()?;
        Ok::<_, std::io::Error>(runtime.block_on(replay(&config, site, &timeline, json)))
    })
    .await??;

    let last = &report.last;
    println!();
    println!(
        "Final state: {:?}, ad playing: {}, muted: {}",
        last.lifecycle, last.ad_playing, last.muted
    );
    match &report.metrics {
        Some(metrics) => println!(
            "Ads muted: {}, time saved: {}",
            metrics.ads_muted, metrics.time_saved
        ),
        None => warn!("Authority returned no metrics"),
    }
    Ok(())
}

async fn replay(config: &Config, site: Site, timeline: &PageTimeline, json: bool) -> ReplayReport {
    let authority = Arc::new(Authority::new(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryTabs::new()),
    ));
    let (channel, inbox) = authority.connect(REPLAY_TAB);
    let page = Arc::new(MemoryPage::new());

    let detector = Detector::new(
        tuned_profile(site, config),
        page.clone(),
        Arc::new(channel),
        DetectorSettings::from(config),
    );
    let start = Instant::now();
    let mut events = detector.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_event(start.elapsed(), &event, json),
                Err(RecvError::Lagged(skipped)) => warn!("Dropped {} events", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });
    let task = tokio::spawn(detector.run(inbox));

    for frame in &timeline.frames {
        time::sleep_until(start + Duration::from_millis(frame.at_ms)).await;
        page.apply(frame);
    }
    time::sleep_until(start + Duration::from_millis(timeline.total_ms())).await;

    // Closing the inbox unloads the detector and releases any active ad
    authority.unregister(REPLAY_TAB);
    let last = match task.await {
        Ok(last) => last,
        Err(e) => {
            warn!("Detector task failed: {}", e);
            empty_snapshot(site)
        }
    };
    let _ = printer.await;

    let metrics = match authority.handle(None, Request::GetMetrics).await {
        Response::Metrics(metrics) => Some(metrics),
        _ => None,
    };
    ReplayReport { last, metrics }
}

fn empty_snapshot(site: Site) -> InstanceSnapshot {
    InstanceSnapshot {
        site,
        lifecycle: admuter_detector::Lifecycle::Idle,
        enabled: false,
        ad_playing: false,
        muted: false,
        consecutive_confirmations: 0,
        ad_started_at: None,
        error_count: 0,
        reconnect_attempts: 0,
    }
}

fn print_event(elapsed: Duration, event: &DetectorEvent, json: bool) {
    if json {
        if let Ok(line) = serde_json::to_string(event) {
            println!("{}", line);
        }
        return;
    }
    println!("[{:>9.3}s] {}", elapsed.as_secs_f64(), describe(event));
}

fn describe(event: &DetectorEvent) -> String {
    match event {
        DetectorEvent::DetectionStarted { site } => format!("{} detection started", site.display_name()),
        DetectorEvent::DetectionStopped { reason, .. } => format!("detection stopped ({:?})", reason),
        DetectorEvent::AdStarted { .. } => "ad started".to_string(),
        DetectorEvent::AdEnded { duration_secs, .. } => format!("ad ended after {}s", duration_secs),
        DetectorEvent::Muted { .. } => "tab muted".to_string(),
        DetectorEvent::Unmuted { ad_duration, .. } => format!("tab unmuted ({}s)", ad_duration),
        DetectorEvent::SkipAttempted { attempt, .. } => format!("skip attempt {}", attempt),
        DetectorEvent::Fault { kind, message, .. } => format!("{} fault: {}", kind, message),
        DetectorEvent::Reconnecting { attempt, delay_ms, .. } => {
            format!("reconnect attempt {} in {}ms", attempt, delay_ms)
        }
        DetectorEvent::Exhausted { attempts, .. } => {
            format!("gave up after {} reconnect attempts", attempts)
        }
    }
}
