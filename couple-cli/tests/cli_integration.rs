//! # CLI Integration Tests
//!
//! Runs each `couple` command against files in a temp directory.

use couple_cli::{layout_text, normalize, paste, render, write_preview, CliArgs, CliConfig};
use couple_core::{EditorMode, MappingSlot};
use clap::Parser;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

const EXPORT: &str = r##"{
    "version": "1.0",
    "mode": "Advanced",
    "regions": [
        {"id": 1, "x1": 0.0, "y1": 0.0, "x2": 0.5, "y2": 1.0, "weight": 1.0, "prompt": "a", "color": "#ff0000"},
        {"id": 2, "x1": 0.5, "y1": 0.0, "x2": 1.0, "y2": 1.0, "weight": 2.0, "prompt": "b", "color": "#00ff00"}
    ],
    "timestamp": 1760000000000
}"##;

#[test]
fn test_layout_command() {
    assert_eq!(
        layout_text(2),
        "[[0.0,0.5,0.0,1.0,1.0],[0.5,1.0,0.0,1.0,1.0]]"
    );
    assert_eq!(layout_text(0), layout_text(2));
}

#[test]
fn test_paste_command_picks_slot() {
    let params = "a cat\nSteps: 20, forge_couple_mapping: [[0.0, 1.0, 0.0, 0.5, 1.0]]";
    let report = paste(params, "img2img").expect("paste");
    assert_eq!(report.slot, MappingSlot::Secondary);
    assert_eq!(report.mapping, vec![[0.0, 1.0, 0.0, 0.5, 1.0]]);

    assert!(paste(params, "extras").is_err());
    assert!(paste("Steps: 20", "txt2img").is_err());
}

#[test]
fn test_normalize_command() {
    let prompts = vec![String::from("left"), String::from("right")];
    let document = normalize(EXPORT, &prompts).expect("normalize");
    assert_eq!(document.regions.len(), 2);
    assert_eq!(document.regions[1].prompt, "right");
    assert_eq!(document.regions[1].color, "#00ff00");

    let messy = r#"{"regions": [{"x1": 0.9, "y1": 0.0, "x2": 0.1, "y2": 1.0, "weight": 12}]}"#;
    let document = normalize(messy, &[]).expect("normalize");
    let region = &document.regions[0];
    assert!(region.x1 < region.x2);
    assert!((region.weight - 5.0).abs() < f64::EPSILON);

    assert!(normalize("[1, 2]", &[]).is_err());
}

#[test]
fn test_preview_command_writes_png() {
    let dir = tempfile::tempdir().expect("temp dir");
    let out = dir.path().join("preview.png");
    write_preview(
        EditorMode::Advanced,
        (1216, 832),
        "[[0.0, 0.5, 0.0, 1.0, 1.0], [0.5, 1.0, 0.0, 1.0, 1.0]]",
        &out,
    )
    .expect("preview");
    let bytes = std::fs::read(&out).expect("read");
    assert_eq!(bytes[..8], PNG_SIGNATURE);

    let skipped = dir.path().join("skipped.png");
    assert!(write_preview(EditorMode::Basic, (1024, 1024), "[]", &skipped).is_err());
    assert!(!skipped.exists());
    assert!(write_preview(EditorMode::Advanced, (1024, 1024), "[[0,", &skipped).is_err());
}

#[tokio::test]
async fn test_render_command_draws_surface() {
    let dir = tempfile::tempdir().expect("temp dir");
    let out = dir.path().join("surface.png");
    let args = CliArgs::try_parse_from(["couple", "layout", "1"]).expect("parse");
    let config = CliConfig::from(&args);

    let mapping = render(&config, EXPORT, (1024, 768), None, Some(1), &out).expect("render");
    assert_eq!(mapping, "[[0.0,0.5,0.0,1.0,1.0],[0.5,1.0,0.0,1.0,2.0]]");
    let bytes = std::fs::read(&out).expect("read");
    assert_eq!(bytes[..8], PNG_SIGNATURE);

    assert!(render(&config, "{}", (1024, 768), None, None, &out).is_err());
    assert!(render(&config, EXPORT, (1024, 768), None, Some(9), &out).is_err());
}
