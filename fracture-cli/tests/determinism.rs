//! End-to-end tests verifying deterministic fracture output.
//!
//! These tests ensure that given the same seed, the library and the CLI
//! produce identical patterns across runs.

use std::path::PathBuf;
use std::process::Command;

use fracture_core::{fracture, EngineKind, FractureConfig, FracturePattern, Point, Rect};

fn fortune_config(seed: u64) -> FractureConfig {
    FractureConfig {
        seed,
        site_count: 40,
        bounds: Rect::new(-5.0, -3.0, 5.0, 3.0),
        relax_iterations: 3,
        ..Default::default()
    }
}

fn jump_flood_config(seed: u64) -> FractureConfig {
    FractureConfig {
        seed,
        site_count: 25,
        engine: EngineKind::JumpFlood,
        grid_width: 96,
        grid_height: 64,
        ..Default::default()
    }
}

fn run_cli(args: &[&str]) -> Vec<u8> {
    let output = Command::new(env!("CARGO_BIN_EXE_fracture"))
        .args(args)
        .output()
        .expect("Failed to run fracture binary");
    assert!(
        output.status.success(),
        "fracture {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    output.stdout
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("fracture-{}-{}", std::process::id(), name))
}

fn assert_patterns_equal(expected: &FracturePattern, actual: &FracturePattern, name: &str) {
    assert_eq!(
        expected.polygons.len(),
        actual.polygons.len(),
        "{}: polygon count mismatch",
        name
    );
    assert_eq!(expected, actual, "{}: pattern mismatch", name);
}

#[test]
fn test_fortune_is_deterministic() {
    let config = fortune_config(11);
    let a = fracture(&config).expect("Fracture failed");
    let b = fracture(&config).expect("Fracture failed");
    assert_patterns_equal(&a, &b, "fortune");
    assert!(!a.polygons.is_empty());
}

#[test]
fn test_jump_flood_is_deterministic() {
    let config = jump_flood_config(5);
    let a = fracture(&config).expect("Fracture failed");
    let b = fracture(&config).expect("Fracture failed");
    assert_patterns_equal(&a, &b, "jump_flood");
}

#[test]
fn test_different_seeds_differ() {
    let a = fracture(&fortune_config(1)).expect("Fracture failed");
    let b = fracture(&fortune_config(2)).expect("Fracture failed");
    assert_ne!(a, b, "seeds 1 and 2 produced the same pattern");

    let a = fracture(&jump_flood_config(1)).expect("Fracture failed");
    let b = fracture(&jump_flood_config(2)).expect("Fracture failed");
    assert_ne!(a, b, "raster seeds 1 and 2 produced the same pattern");
}

#[test]
fn test_impact_pulls_sites_closer() {
    let impact = Point::new(2.0, 1.0);
    let uniform = FractureConfig { site_count: 200, ..Default::default() };
    let focused = FractureConfig { impact: Some(impact), impact_closeness: 0.5, ..uniform };
    let mean_dist = |pattern: &FracturePattern| {
        let total: f64 = pattern.polygons.iter().map(|p| p.site.dist(&impact)).sum();
        total / pattern.polygons.len() as f64
    };
    let a = fracture(&uniform).expect("Fracture failed");
    let b = fracture(&focused).expect("Fracture failed");
    assert!(mean_dist(&b) < mean_dist(&a));
}

#[test]
fn test_cli_yaml_matches_library() {
    let config = fortune_config(42);
    let expected = serde_yaml::to_string(&fracture(&config).expect("Fracture failed"))
        .expect("Serialize failed");
    let stdout = run_cli(&[
        "--seed", "42", "--sites", "40", "--bounds", "-5,-3,5,3", "--relax", "3",
    ]);
    assert_eq!(String::from_utf8_lossy(&stdout), expected);
}

#[test]
fn test_cli_repeated_runs_match() {
    let args = ["--seed", "9", "--sites", "30", "--engine", "jump-flood", "--grid", "80x60"];
    let first = run_cli(&args);
    let second = run_cli(&args);
    assert!(!first.is_empty());
    assert_eq!(first, second);

    let expected = serde_yaml::to_string(
        &fracture(&FractureConfig {
            seed: 9,
            site_count: 30,
            engine: EngineKind::JumpFlood,
            grid_width: 80,
            grid_height: 60,
            ..Default::default()
        })
        .expect("Fracture failed"),
    )
    .expect("Serialize failed");
    assert_eq!(String::from_utf8_lossy(&first), expected);
}

#[test]
fn test_cli_reads_config_file() {
    let config_path = temp_path("config.yaml");
    std::fs::write(&config_path, "seed: 3\nsite_count: 12\nrelax_iterations: 1\n")
        .expect("Failed to write config");
    let stdout = run_cli(&["--config", config_path.to_str().expect("utf-8 path")]);
    let _ = std::fs::remove_file(&config_path);

    let config = FractureConfig { seed: 3, site_count: 12, relax_iterations: 1, ..Default::default() };
    let expected = serde_yaml::to_string(&fracture(&config).expect("Fracture failed"))
        .expect("Serialize failed");
    assert_eq!(String::from_utf8_lossy(&stdout), expected);
}

#[test]
fn test_cli_png_preview() {
    let png = temp_path("preview.png");
    run_cli(&[
        "--engine", "jump-flood", "--grid", "64x48", "-o", png.to_str().expect("utf-8 path"),
    ]);
    let image = image::open(&png).expect("Failed to load preview").to_rgb8();
    let _ = std::fs::remove_file(&png);
    assert_eq!(image.dimensions(), (64, 48));
}

#[test]
fn test_cli_rejects_bad_config() {
    let output = Command::new(env!("CARGO_BIN_EXE_fracture"))
        .args(["--sites", "0"])
        .output()
        .expect("Failed to run fracture binary");
    assert!(!output.status.success());
}
