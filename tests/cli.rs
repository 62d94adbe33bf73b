//! End-to-end tests against the built `imginfo` binary.
//!
//! Every test works in its own temp directory and passes relative paths so
//! the `name` column is predictable.

use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn imginfo(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_imginfo"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .unwrap()
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

/// Last whitespace-separated field of each report row (the `name` column).
fn row_names(lines: &[String]) -> Vec<&str> {
    lines
        .iter()
        .skip(1)
        .filter_map(|l| l.split_whitespace().last())
        .collect()
}

/// ok1.png is 10x10 (area 100), ok2.png is 10x5 (area 50), broken.dat is junk.
fn scenario() -> TempDir {
    let tmp = TempDir::new().unwrap();
    RgbaImage::from_pixel(10, 10, Rgba([1, 2, 3, 255]))
        .save(tmp.path().join("ok1.png"))
        .unwrap();
    RgbImage::from_pixel(10, 5, Rgb([4, 5, 6]))
        .save(tmp.path().join("ok2.png"))
        .unwrap();
    std::fs::write(tmp.path().join("broken.dat"), b"definitely not an image").unwrap();
    tmp
}

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn help_exits_zero() {
    let tmp = TempDir::new().unwrap();
    let out = imginfo(tmp.path(), &["--help"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("--dest-dir"));
}

#[test]
fn missing_files_is_usage_error() {
    let tmp = TempDir::new().unwrap();
    let out = imginfo(tmp.path(), &[]);
    assert_eq!(out.status.code(), Some(2));
    assert!(out.stdout.is_empty());
}

#[test]
fn unknown_flag_is_usage_error() {
    let tmp = scenario();
    let out = imginfo(tmp.path(), &["--frobnicate", "ok1.png"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn crop_without_dest_dir_touches_nothing() {
    let tmp = scenario();
    let before = entries(tmp.path());

    let out = imginfo(tmp.path(), &["--crop", "ok1.png", "ok2.png"]);

    assert_eq!(out.status.code(), Some(2));
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("--dest-dir"));
    assert_eq!(entries(tmp.path()), before);
}

#[test]
fn crop_from_config_without_dest_dir_is_usage_error() {
    let tmp = scenario();
    std::fs::write(tmp.path().join("cfg.toml"), "[pipeline]\ncrop = true\n").unwrap();

    let out = imginfo(tmp.path(), &["--config", "cfg.toml", "ok1.png"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn broken_file_is_dropped_and_order_kept() {
    let tmp = scenario();
    let out = imginfo(tmp.path(), &["ok1.png", "broken.dat", "ok2.png"]);

    assert!(out.status.success());
    let lines = stdout_lines(&out);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].trim_start().starts_with("w "));
    assert!(lines[0].ends_with(" name"));
    assert_eq!(row_names(&lines), vec!["ok1.png", "ok2.png"]);
}

#[test]
fn sort_orders_by_area() {
    let tmp = scenario();
    let out = imginfo(tmp.path(), &["--sort", "ok1.png", "broken.dat", "ok2.png"]);

    assert!(out.status.success());
    assert_eq!(row_names(&stdout_lines(&out)), vec!["ok2.png", "ok1.png"]);
}

#[test]
fn debug_reports_decode_failures_before_report() {
    let tmp = scenario();
    let out = imginfo(tmp.path(), &["-d", "ok1.png", "broken.dat"]);

    assert!(out.status.success());
    let lines = stdout_lines(&out);
    assert!(lines[0].starts_with("broken.dat: "), "got {lines:?}");
    assert!(lines[1].trim_start().starts_with("w "));
    assert_eq!(lines.len(), 3);
}

#[test]
fn geometry_columns() {
    let tmp = scenario();
    let out = imginfo(
        tmp.path(),
        &["--columns", "w,h,pitch,pixfmt,name", "ok1.png", "ok2.png"],
    );

    let lines = stdout_lines(&out);
    assert_eq!(lines[0], "    w     h pitch           pixfmt name");
    assert_eq!(lines[1], "   10    10    40         ABGR8888 ok1.png");
    assert_eq!(lines[2], "   10     5    32            RGB24 ok2.png");
}

#[test]
fn normalize_reports_canonical_format() {
    let tmp = scenario();
    let out = imginfo(tmp.path(), &["-n", "--columns", "pixfmt,name", "ok2.png"]);

    let lines = stdout_lines(&out);
    assert_eq!(lines[1], "        ABGR8888 ok2.png");
}

#[test]
fn export_writes_png_named_after_source() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir(tmp.path().join("in")).unwrap();
    RgbImage::from_pixel(3, 2, Rgb([9, 9, 9]))
        .save(tmp.path().join("in/photo.jpg"))
        .unwrap();

    let out = imginfo(tmp.path(), &["--dest-dir", "out", "in/photo.jpg"]);

    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let exported = image::open(tmp.path().join("out/photo.png")).unwrap();
    assert_eq!((exported.width(), exported.height()), (3, 2));
}

#[test]
fn export_failure_still_prints_report_and_exits_one() {
    let tmp = scenario();
    std::fs::create_dir_all(tmp.path().join("out/ok1.png")).unwrap();

    let out = imginfo(tmp.path(), &["-o", "out", "ok1.png", "ok2.png"]);

    assert_eq!(out.status.code(), Some(1));
    let lines = stdout_lines(&out);
    assert_eq!(lines.len(), 3);
    assert_eq!(row_names(&lines), vec!["ok1.png", "ok2.png"]);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("ok1.png: export to out/ok1.png failed"),
        "got {stderr}"
    );
    assert!(tmp.path().join("out/ok2.png").is_file());
}

#[test]
fn duplicate_stems_are_not_overwritten() {
    let tmp = TempDir::new().unwrap();
    for dir in ["a", "b"] {
        std::fs::create_dir(tmp.path().join(dir)).unwrap();
    }
    RgbImage::from_pixel(3, 2, Rgb([1, 1, 1]))
        .save(tmp.path().join("a/photo.png"))
        .unwrap();
    RgbImage::from_pixel(5, 4, Rgb([2, 2, 2]))
        .save(tmp.path().join("b/photo.png"))
        .unwrap();

    let out = imginfo(tmp.path(), &["-o", "out", "a/photo.png", "b/photo.png"]);

    assert_eq!(out.status.code(), Some(1));
    assert_eq!(stdout_lines(&out).len(), 3);
    assert!(String::from_utf8_lossy(&out.stderr).contains("b/photo.png: export to"));
    let exported = image::open(tmp.path().join("out/photo.png")).unwrap();
    assert_eq!((exported.width(), exported.height()), (3, 2));
}

#[test]
fn crop_trims_transparent_border_on_export() {
    let tmp = TempDir::new().unwrap();
    RgbaImage::from_fn(8, 6, |x, y| {
        if (2..5).contains(&x) && (1..3).contains(&y) {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
    .save(tmp.path().join("sprite.png"))
    .unwrap();

    let out = imginfo(
        tmp.path(),
        &["-c", "-o", "out", "--columns", "w,h,name", "sprite.png"],
    );

    assert!(out.status.success());
    assert_eq!(stdout_lines(&out)[1], "    3     2 sprite.png");
    let exported = image::open(tmp.path().join("out/sprite.png")).unwrap();
    assert_eq!((exported.width(), exported.height()), (3, 2));
}

#[test]
fn json_report() {
    let tmp = scenario();
    let out = imginfo(tmp.path(), &["--format", "json", "ok1.png", "ok2.png"]);

    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let rows = value.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], "ok1.png");
    assert_eq!(rows[1]["area"], 50);
}

#[test]
fn config_file_presets_options() {
    let tmp = scenario();
    std::fs::write(
        tmp.path().join("cfg.toml"),
        "[pipeline]\nsort = true\n\n[report]\ncolumns = [\"name\"]\n",
    )
    .unwrap();

    let out = imginfo(tmp.path(), &["--config", "cfg.toml", "ok1.png", "ok2.png"]);

    assert!(out.status.success());
    assert_eq!(stdout_lines(&out), vec!["name", "ok2.png", "ok1.png"]);
}

#[test]
fn invalid_config_fails() {
    let tmp = scenario();
    std::fs::write(tmp.path().join("cfg.toml"), "[pipeline]\nshuffle = true\n").unwrap();

    let out = imginfo(tmp.path(), &["--config", "cfg.toml", "ok1.png"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn gen_config_prints_stock_file() {
    let tmp = TempDir::new().unwrap();
    let out = imginfo(tmp.path(), &["--gen-config"]);

    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains("[pipeline]"));
    assert!(text.contains("[report]"));
}
