use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::Write;
use touchmacro_core::Action;
use touchmacro_recorder::{
    CoordinateSpace, Decoder, DecoderConfig, MacroStorage, Schema, ScreenSize,
};

const MMOR: &str = r#"{
  "name": "daily quest",
  "resolution": "1920x1080",
  "actions": [
    {"type": "touch", "data": "press_rel:(0.5,0.5)", "timing": 0, "extra1": "0"},
    {"type": "touch", "data": "release", "timing": 100, "extra1": "0"},
    {"type": "touch", "data": "press_rel:(0.25,1.5)", "timing": 900, "extra1": "1"},
    {"type": "touch", "data": "release", "timing": 80, "extra1": "1"}
  ]
}"#;

fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(bytes).unwrap();
    enc.finish().unwrap()
}

#[test]
fn gzipped_recording_imports_into_storage() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("daily.mmor");
    fs::write(&file, gzip(MMOR.as_bytes())).unwrap();

    let result = Decoder::default().decode_file(&file);
    assert!(result.success, "{:?}", result.error_message);
    assert_eq!(result.schema, Some(Schema::Fixed));
    assert_eq!(result.resolution.as_deref(), Some("1920x1080"));
    assert_eq!(
        result.actions,
        vec![Action::tap(540, 540), Action::delay(980), Action::tap(1620, 270)]
    );

    let storage = MacroStorage::with_dir(dir.path().join("store")).unwrap();
    let imported = result.into_macro("daily").unwrap();
    storage.insert(imported.clone()).unwrap();

    let library = storage.load().unwrap();
    assert_eq!(library.len(), 1);
    let stored = library.get(imported.id()).unwrap();
    assert_eq!(stored.name(), "daily quest");
    assert_eq!(stored.commands(), "tap,540,540\ndelay,980\ntap,1620,270");
}

#[test]
fn per_axis_portrait_target() {
    let config = DecoderConfig::default()
        .with_screen(ScreenSize::new(1080, 2400))
        .with_space(CoordinateSpace::PerAxis);
    let result = Decoder::new(config).decode(MMOR.as_bytes());
    assert_eq!(result.actions[0], Action::tap(540, 1200));
    // 1.5 of the height is off-screen and clamps
    assert_eq!(result.actions[2], Action::tap(270, 2399));
}

#[test]
fn plain_text_recording_falls_through_json_attempts() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("manual.txt");
    fs::write(&file, "name: manual\ntap,100,200\ndelay,500\nswipe,0,0,100,100,300\n").unwrap();

    let result = Decoder::default().decode_file(&file);
    assert_eq!(result.schema, Some(Schema::Text));
    assert_eq!(result.name.as_deref(), Some("manual"));
    assert_eq!(result.converted_actions, 3);
}

#[test]
fn recognized_but_empty_recording_explains_itself() {
    let result = Decoder::default().decode(
        br#"{"actions":[{"type":"key","timing":10},{"type":"touch","data":"release","timing":5}]}"#,
    );
    assert!(!result.success);
    assert_eq!(result.total_events, 2);
    assert_eq!(result.touch_events, 1);
    assert!(result.error_message.unwrap().contains("touch events: 1"));
}
