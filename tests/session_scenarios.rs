use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{Rgba, RgbaImage};
use rand::{SeedableRng, rngs::StdRng};

use photo_collage::config::{Configuration, GestureOptions};
use photo_collage::events::{ContactEvent, SessionCommand};
use photo_collage::feedback::CountingFeedback;
use photo_collage::geometry::{PixelRect, PixelSize, Point, Rect, ViewportGeometry};
use photo_collage::input::gesture::ResizeGestureController;
use photo_collage::mapper::ScaleFactors;
use photo_collage::processing::compositor::{Perturbation, StampPlacement};
use photo_collage::processing::sampler::RegionSampler;
use photo_collage::session::CollageSession;
use photo_collage::settings::{PerturbationRanges, StampSettings};
use photo_collage::source::{AlbumSource, MemorySource};

fn quiet_config() -> Configuration {
    let mut cfg = Configuration::default();
    cfg.seed = Some(5);
    cfg.perturbation.rotation = false;
    cfg.perturbation.offset = false;
    cfg.perturbation.shadow_color = [0, 0, 0, 0];
    cfg
}

fn down(id: u32, x: f32, y: f32) -> SessionCommand {
    SessionCommand::Contact(ContactEvent::Down {
        id,
        point: Point::new(x, y),
    })
}

fn up(id: u32) -> SessionCommand {
    SessionCommand::Contact(ContactEvent::Up { id })
}

#[test]
fn phone_viewport_scenario() {
    let source = MemorySource::new(RgbaImage::new(64, 64));
    let mut session = CollageSession::new(
        Configuration::default(),
        Box::new(source),
        Arc::new(CountingFeedback::default()),
    );
    let outcome = session
        .resize(ViewportGeometry::new(390.0, 844.0, 3.0))
        .unwrap();
    assert_eq!(outcome.size, PixelSize::new(998, 2160));
    let scale = session.mapper().scale().unwrap();
    assert!((scale.x - 2.56).abs() < 0.01);

    let again = session
        .resize(ViewportGeometry::new(390.0, 844.0, 3.0))
        .unwrap();
    assert!(!again.changed && !again.resampled);
    assert_eq!(session.mapper().scale().unwrap(), scale);
}

#[test]
fn two_finger_rectangle_scenario() {
    let mut gesture = ResizeGestureController::new(GestureOptions::default(), 30.0, 2160);
    gesture.begin(
        Point::new(100.0, 300.0),
        Point::new(250.0, 420.0),
        ViewportGeometry::new(390.0, 844.0, 3.0),
        ScaleFactors { x: 1.0, y: 1.0 },
    );
    let state = gesture.state().unwrap();
    assert_eq!(state.rect, Rect::new(100.0, 270.0, 150.0, 120.0));
}

#[test]
fn unperturbed_stamp_lands_on_the_footprint() {
    let mut rng = StdRng::seed_from_u64(3);
    let perturbation = Perturbation::draw(&PerturbationRanges::none(), &mut rng);
    let footprint = StampSettings::from_reference(300.0, 300.0, 1.0);
    let placement = StampPlacement::plan(Point::new(640.0, 480.0), &footprint, &perturbation);
    assert_eq!(placement.dest, Rect::new(490.0, 330.0, 300.0, 300.0));
    assert_eq!(placement.rotation_radians, 0.0);
}

#[test]
fn sampling_beyond_the_frame_stays_inside() {
    let source = MemorySource::new(RgbaImage::new(320, 240));
    let mut sampler = RegionSampler::new();
    for requested in [
        Rect::new(-50.0, -50.0, 100.0, 100.0),
        Rect::new(300.0, 200.0, 100.0, 100.0),
        Rect::new(-10.0, 100.0, 400.0, 20.0),
    ] {
        let sample = sampler.sample(&source, requested).unwrap();
        let got = sample.source_rect;
        assert!(got.fits_within(PixelSize::new(320, 240)), "{requested:?} -> {got:?}");
        assert!(got.width <= requested.width.ceil() as u32);
        assert!(got.height <= requested.height.ceil() as u32);
    }
    let sample = sampler
        .sample(&source, Rect::new(-50.0, -50.0, 100.0, 100.0))
        .unwrap();
    assert_eq!(sample.source_rect, PixelRect::new(0, 0, 50, 50));
}

#[test]
fn drag_stamps_are_throttled_and_exported() {
    let feedback = Arc::new(CountingFeedback::default());
    let source = MemorySource::new(RgbaImage::from_pixel(400, 400, Rgba([250, 120, 0, 255])));
    let mut session = CollageSession::new(quiet_config(), Box::new(source), feedback.clone());
    let t0 = Instant::now();
    session.handle(SessionCommand::Resize(ViewportGeometry::new(400.0, 400.0, 1.0)), t0);

    session.handle(down(1, 50.0, 100.0), t0);
    for step in 1..=10u64 {
        let at = t0 + Duration::from_millis(step * 30);
        session.handle(
            SessionCommand::Contact(ContactEvent::Move {
                id: 1,
                point: Point::new(50.0 + step as f32 * 30.0, 100.0),
            }),
            at,
        );
        session.on_frame();
    }
    session.handle(up(1), t0 + Duration::from_millis(400));
    session.on_frame();

    // Moves every 30ms for 300ms: stamps at 0, 120 and 240ms only.
    assert_eq!(session.stamps_drawn(), 3);
    assert_eq!(feedback.count(), 3);
    assert!(!session.hold_timer_armed());

    let png = session.export_png().unwrap();
    let decoded = image::load_from_memory(&png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (400, 400));
}

#[test]
fn footprint_survives_source_change() {
    let dir = tempfile::tempdir().unwrap();
    RgbaImage::from_pixel(300, 200, Rgba([255, 0, 0, 255]))
        .save(dir.path().join("01.png"))
        .unwrap();
    RgbaImage::from_pixel(90, 160, Rgba([0, 0, 255, 255]))
        .save(dir.path().join("02.png"))
        .unwrap();
    let album = AlbumSource::scan(dir.path()).unwrap();

    let mut session = CollageSession::new(
        quiet_config(),
        Box::new(album),
        Arc::new(CountingFeedback::default()),
    );
    let t0 = Instant::now();
    session.handle(SessionCommand::Resize(ViewportGeometry::new(300.0, 300.0, 1.0)), t0);
    session.handle(down(1, 100.0, 130.0), t0);
    session.handle(down(2, 160.0, 230.0), t0);
    session.handle(up(2), t0);
    session.handle(up(1), t0);
    let committed = session.stamp_settings();
    assert_eq!((committed.width, committed.height), (60, 100));

    session.handle(SessionCommand::NextSource, t0);
    assert_eq!(session.stamp_settings(), committed);

    session.handle(down(3, 150.0, 180.0), t0 + Duration::from_secs(1));
    session.on_frame();
    let px = session.canvas().image().get_pixel(150, 150).0;
    assert!(px[2] >= 254 && px[0] <= 1, "{px:?}");
}

#[test]
fn stamps_before_the_first_resize_are_dropped() {
    let feedback = Arc::new(CountingFeedback::default());
    let source = MemorySource::new(RgbaImage::new(32, 32));
    let mut session = CollageSession::new(quiet_config(), Box::new(source), feedback.clone());
    session.handle(down(1, 10.0, 10.0), Instant::now());
    session.on_frame();
    assert_eq!(session.stamps_drawn(), 0);
    assert_eq!(feedback.count(), 0);
    assert!(!session.canvas().has_content());
}
