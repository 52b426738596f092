mod support;

use cover_tint_player::{
    ColorSource, Colorizer, CoverGallery, FallbackPalette, KMeansExtractor, Player, Playlist,
    PrecacheSchedule, Rgb, Track,
};
use futures::executor::block_on;
use image::{Rgba, RgbaImage};
use std::{
    path::Path,
    thread,
    time::{Duration, Instant},
};
use support::{
    colorizer, gallery, player, player_with, CountingExtractor, StubEngine, StubView, ViewCall,
    FADE,
};

const EXTRACTED: Rgb = Rgb::new(120, 80, 200);

#[test]
fn second_call_hits_cache_without_extracting_again() {
    let extractor = CountingExtractor::returning(EXTRACTED);
    let mut colorizer = colorizer(extractor.clone());
    let covers = gallery(2, &[1]);

    let first = colorizer.apply_background(Some(1), &covers);
    let second = colorizer.apply_background(Some(1), &covers);

    assert_eq!(first.source, ColorSource::Extracted);
    assert_eq!(second.source, ColorSource::Cached);
    assert_eq!(first.color, EXTRACTED);
    assert_eq!(second.color, EXTRACTED);
    assert_eq!(extractor.count(), 1);
    assert_eq!(colorizer.cached(1), Some(EXTRACTED));
}

#[test]
fn unloaded_cover_uses_palette_by_remainder() {
    let extractor = CountingExtractor::returning(EXTRACTED);
    let mut colorizer = colorizer(extractor.clone());
    let covers = gallery(6, &[]);
    let palette = FallbackPalette::default();

    for k in 0..6 {
        let backdrop = colorizer.apply_background(Some(k), &covers);
        assert_eq!(backdrop.source, ColorSource::Fallback);
        assert_eq!(backdrop.color, palette.pick(Some(k % 4)));
    }
    assert_eq!(extractor.count(), 0);
    assert_eq!(colorizer.cache_len(), 0);
}

#[test]
fn index_without_cover_slot_uses_palette() {
    let mut colorizer = colorizer(CountingExtractor::returning(EXTRACTED));
    let backdrop = colorizer.apply_background(Some(7), &CoverGallery::new());
    assert_eq!(backdrop.color, Rgb::new(255, 184, 0));
}

#[test]
fn unspecified_index_uses_first_palette_color() {
    let extractor = CountingExtractor::returning(EXTRACTED);
    let mut colorizer = colorizer(extractor.clone());

    let backdrop = colorizer.apply_background(None, &gallery(1, &[0]));

    assert_eq!(backdrop.color, Rgb::new(30, 215, 96));
    assert_eq!(extractor.count(), 0);
}

#[test]
fn extraction_failure_recovers_with_first_palette_color() {
    let extractor = CountingExtractor::failing();
    let mut colorizer = colorizer(extractor.clone());
    let covers = gallery(3, &[2]);

    let backdrop = colorizer.apply_background(Some(2), &covers);

    assert_eq!(backdrop.source, ColorSource::Recovered);
    assert_eq!(backdrop.color, Rgb::new(30, 215, 96));
    assert_eq!(
        backdrop.dynamic_bg.to_css(),
        "linear-gradient(80deg, rgba(30,215,96,0.9),#0a0a0a)"
    );
    assert_eq!(
        backdrop.playback.to_css(),
        "linear-gradient(95deg, rgba(30,215,96,0.7),#0a0a0a)"
    );
    assert_eq!(colorizer.cached(2), None);

    colorizer.apply_background(Some(2), &covers);
    assert_eq!(extractor.count(), 2);
}

#[test]
fn extracted_color_flows_into_both_gradients() {
    let mut colorizer = colorizer(CountingExtractor::returning(EXTRACTED));
    let backdrop = colorizer.apply_background(Some(0), &gallery(1, &[0]));
    assert_eq!(
        backdrop.dynamic_bg.to_css(),
        "linear-gradient(80deg, rgba(120,80,200,0.9),#0a0a0a)"
    );
    assert_eq!(
        backdrop.playback.to_css(),
        "linear-gradient(95deg, rgba(120,80,200,0.7),#0a0a0a)"
    );
}

#[test]
fn precache_fills_cache_for_later_navigation() {
    let extractor = CountingExtractor::returning(EXTRACTED);
    let mut colorizer = colorizer(extractor.clone());
    let covers = gallery(2, &[1]);

    assert_eq!(colorizer.precache(1, &covers), Some(EXTRACTED));
    let backdrop = colorizer.apply_background(Some(1), &covers);

    assert_eq!(backdrop.source, ColorSource::Cached);
    assert_eq!(extractor.count(), 1);
}

#[test]
fn precache_skips_unloaded_cover() {
    let extractor = CountingExtractor::returning(EXTRACTED);
    let mut colorizer = colorizer(extractor.clone());

    assert_eq!(colorizer.precache(1, &gallery(2, &[])), None);
    assert_eq!(extractor.count(), 0);
    assert_eq!(colorizer.cached(1), None);
}

#[test]
fn player_writes_backdrop_to_view() {
    let mut player = player(2, StubEngine::default());
    let backdrop = player.apply_background(Some(1));
    assert_eq!(player.view().last_backdrop(), Some(backdrop));
    assert_eq!(backdrop.color, Rgb::new(75, 145, 239));
}

fn write_solid_png(path: &Path, color: [u8; 3]) {
    let [r, g, b] = color;
    RgbaImage::from_pixel(8, 8, Rgba([r, g, b, 255]))
        .save(path)
        .expect("save png");
}

fn decoding_player(tracks: Vec<Track>) -> TestPlayer {
    let colorizer = Colorizer::new(
        Box::new(KMeansExtractor::default()),
        FallbackPalette::default(),
        FADE,
    );
    Player::new(
        Playlist::new(tracks),
        StubEngine::default(),
        StubView::default(),
        colorizer,
    )
}

type TestPlayer = Player<StubEngine, StubView>;

fn tick_until(player: &mut TestPlayer, done: impl Fn(&TestPlayer) -> bool) {
    for _ in 0..500 {
        block_on(player.tick());
        if done(player) {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn startup_background_follows_cover_once_decoded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cover = dir.path().join("cover.png");
    write_solid_png(&cover, [200, 40, 60]);

    let mut player = decoding_player(vec![Track::new("Song", "Artist", "song.mp3", &cover)]);
    player.start();
    let initial = player.view().last_backdrop().expect("initial backdrop");
    assert_eq!(initial.source, ColorSource::Fallback);

    tick_until(&mut player, |p| {
        p.view()
            .last_backdrop()
            .is_some_and(|b| b.source == ColorSource::Extracted)
    });

    let backdrop = player.view().last_backdrop().expect("backdrop");
    assert_eq!(backdrop.source, ColorSource::Extracted);
    assert_eq!(backdrop.color, Rgb::new(200, 40, 60));
    assert_eq!(player.colorizer().cached(0), Some(Rgb::new(200, 40, 60)));
}

#[test]
fn cover_for_another_track_leaves_background_alone() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cover = dir.path().join("second.png");
    write_solid_png(&cover, [10, 200, 10]);

    let mut player = decoding_player(vec![
        Track::new("One", "A", "one.mp3", dir.path().join("missing.png")),
        Track::new("Two", "B", "two.mp3", &cover),
    ]);
    player.start();

    tick_until(&mut player, |p| {
        p.covers().get(0).is_some_and(|c| c.is_complete())
            && p.covers().get(1).is_some_and(|c| c.is_ready())
    });

    assert!(player.covers().get(1).is_some_and(|c| c.is_ready()));
    let backdrops = player
        .view()
        .calls
        .iter()
        .filter(|call| matches!(call, ViewCall::Backdrop(_)))
        .count();
    assert_eq!(backdrops, 1);
    assert_eq!(player.colorizer().cached(1), None);
}

#[test]
fn precache_waits_for_its_deadline() {
    let extractor = CountingExtractor::returning(EXTRACTED);
    let mut player = player_with(3, extractor.clone(), gallery(3, &[1]));
    let started = Instant::now();
    let mut schedule = PrecacheSchedule::new(started, Duration::from_millis(1000));

    assert_eq!(
        player.poll_precache(&mut schedule, started + Duration::from_millis(500)),
        None
    );
    assert!(schedule.is_pending());
    assert_eq!(extractor.count(), 0);

    assert_eq!(
        player.poll_precache(&mut schedule, started + Duration::from_millis(1000)),
        Some(EXTRACTED)
    );
    assert!(!schedule.is_pending());
    assert_eq!(extractor.count(), 1);
    assert_eq!(player.colorizer().cached(1), Some(EXTRACTED));
}

#[test]
fn precache_runs_only_once() {
    let extractor = CountingExtractor::returning(EXTRACTED);
    let mut player = player_with(2, extractor.clone(), gallery(2, &[1]));
    let started = Instant::now();
    let mut schedule = PrecacheSchedule::new(started, Duration::ZERO);

    assert_eq!(player.poll_precache(&mut schedule, started), Some(EXTRACTED));
    assert_eq!(
        player.poll_precache(&mut schedule, started + Duration::from_secs(5)),
        None
    );
    assert_eq!(extractor.count(), 1);
}

#[test]
fn precache_is_spent_on_single_track_playlist() {
    let extractor = CountingExtractor::returning(EXTRACTED);
    let mut player = player_with(1, extractor.clone(), gallery(1, &[0]));
    let started = Instant::now();
    let mut schedule = PrecacheSchedule::new(started, Duration::from_millis(10));

    assert_eq!(
        player.poll_precache(&mut schedule, started + Duration::from_secs(1)),
        None
    );
    assert!(!schedule.is_pending());
    assert_eq!(extractor.count(), 0);
}
