use std::sync::Arc;

use image::{Rgba, RgbaImage};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use photo_collage::config::Configuration;
use photo_collage::feedback::{ChannelFeedback, Cue};
use photo_collage::geometry::PixelSize;
use photo_collage::script::Script;
use photo_collage::session::CollageSession;
use photo_collage::source::MemorySource;
use photo_collage::tasks;

const SCRIPT: &str = r#"
- at: 0ms
  kind: resize
  width: 320
  height: 240
  dpr: 2
- at: 10ms
  kind: down
  id: 1
  x: 80
  y: 150
- at: 400ms
  kind: up
  id: 1
- at: 450ms
  kind: down
  id: 1
  x: 100
  y: 150
- at: 460ms
  kind: down
  id: 2
  x: 200
  y: 230
- at: 600ms
  kind: move
  id: 2
  x: 220
  y: 250
- at: 700ms
  kind: cancel
- at: 800ms
  kind: resize
  width: 480
  height: 360
  dpr: 1
"#;

#[tokio::test(start_paused = true)]
async fn scripted_session_stamps_and_keeps_content_across_resize() {
    let mut cfg = Configuration::default();
    cfg.seed = Some(11);
    let source = MemorySource::new(RgbaImage::from_pixel(640, 480, Rgba([20, 200, 120, 255])));

    let (cue_tx, mut cue_rx) = mpsc::channel::<Cue>(64);
    let session = CollageSession::new(cfg, Box::new(source), Arc::new(ChannelFeedback::new(cue_tx)));
    let stamp_before = session.stamp_settings();

    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();
    let session_task = tokio::spawn(tasks::session::run(session, cmd_rx, cancel.clone()));

    let script = Script::from_yaml_str(SCRIPT).unwrap();
    let sent = tasks::replay::run(script, cmd_tx, cancel).await.unwrap();
    assert_eq!(sent, 8);

    let session = session_task.await.unwrap().unwrap();
    // Held from 10ms to 400ms at 120ms: stamps at 10, 130, 250 and 370ms. The
    // second press at 450ms is still inside the interval and hands over to the
    // gesture before its first tick.
    assert_eq!(session.stamps_drawn(), 4);
    assert!(!session.gesture_active());
    assert!(!session.hold_timer_armed());
    // The cancelled gesture committed nothing; only the resize rescaled the footprint.
    let stamp = session.stamp_settings();
    assert_ne!(stamp, stamp_before);
    assert_eq!(stamp.width, 75);

    assert_eq!(session.canvas().size(), PixelSize::new(480, 360));
    assert!(session.canvas().has_content());
    drop(session);

    let mut cues = 0;
    while cue_rx.recv().await.is_some() {
        cues += 1;
    }
    assert_eq!(cues, 4);
}

#[tokio::test]
async fn replay_script_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.yaml");
    std::fs::write(&path, "- kind: clear\n- at: 5ms\n  kind: next-source\n").unwrap();
    let script = Script::from_yaml_file(&path).unwrap();

    let (tx, mut rx) = mpsc::channel(4);
    let sent = tasks::replay::run(script, tx, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(sent, 2);
    let mut received = 0;
    while rx.recv().await.is_some() {
        received += 1;
    }
    assert_eq!(received, 2);
}
