//! Demo that annotates a synthetic page end to end: in-memory document,
//! fixture ratings, in-process background service.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use thumbnail_rating_bar::cache::FixtureRatingProvider;
use thumbnail_rating_bar::dom::{MemoryDom, PageDom};
use thumbnail_rating_bar::protocol::PageId;
use thumbnail_rating_bar::service::RecordingStyleInjector;
use thumbnail_rating_bar::{spawn_background, Annotator, BackgroundService, RatingCache, UserSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(true).init();

    let provider = FixtureRatingProvider::new()
        .with_latency(Duration::from_millis(30))
        .with_rating("dQw4w9WgXcQ", 15_200, 480)
        .with_rating("jNQXAC9IVRw", 0, 0)
        .with_rating("9bZkp7q19f0", 1_234, 2_345);
    let styles = Arc::new(RecordingStyleInjector::new());
    let service = Arc::new(BackgroundService::new(
        RatingCache::new(Arc::new(provider), Duration::from_secs(600)),
        styles.clone(),
    ));
    let background = spawn_background(service, 64);

    let mut page = MemoryDom::new();
    let feed = page.observe();
    let root = page.root();
    page.set_root_style_property("--yt-spec-general-background-a", " #181818");
    let grid = page.append(root, "div", &[("id", "items")]);
    for id in ["dQw4w9WgXcQ", "jNQXAC9IVRw", "9bZkp7q19f0"] {
        let item = page.append(grid, "ytd-grid-video-renderer", &[("class", "style-scope ytd-grid-renderer")]);
        let href = format!("/watch?v={id}");
        page.append(item, "a", &[("id", "thumbnail"), ("href", href.as_str())]);
        let line = page.append(item, "div", &[("id", "metadata-line")]);
        page.append(line, "span", &[]);
    }
    // A channel link is skipped: no content id.
    page.append(grid, "a", &[("id", "thumbnail"), ("href", "/channel/UC38IQsAvIsxxjztdMZQtwHA")]);

    let dom = Arc::new(Mutex::new(page));
    let settings = UserSettings {
        show_percentage: true,
        ..UserSettings::default()
    };
    let annotator = Annotator::new(
        dom.clone(),
        Arc::new(background.channel_for(PageId(1))),
        settings,
    );
    let _observer = annotator.observe(feed);

    annotator.start().await?.settle().await;
    // Let the mutation-triggered follow-up cycles run out.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let outline = dom.lock().expect("page dom mutex poisoned").outline();
    println!("{outline}");
    println!("stylesheets: {:?}", styles.inserted());
    println!("stats: {:?}", annotator.stats());

    background.abort();
    Ok(())
}
