// tests/transform_units.rs

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use assetdag::errors::UnitError;
use assetdag::fs::mock::MockFileSystem;
use assetdag::fs::FileSystem;
use assetdag::transform::clean::CleanUnit;
use assetdag::transform::images::{is_newer_than, optimize, ImageUnit};
use assetdag::transform::markup::{HtmlMinifier, MarkupUnit};
use assetdag::transform::pathspec::glob_base;
use assetdag::transform::{human_size, write_if_changed, PathSpec, TransformUnit};

const ROOT: &str = "/proj";

fn spec(src: &[&str], dest: &str) -> PathSpec {
    let src: Vec<String> = src.iter().map(|s| s.to_string()).collect();
    PathSpec::new(Path::new(ROOT), &src, &[], Path::new(dest)).unwrap()
}

fn at(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

#[test]
fn glob_base_is_the_literal_prefix() {
    assert_eq!(glob_base("src/*.html"), PathBuf::from("src"));
    assert_eq!(glob_base("src/styles/**/*.scss"), PathBuf::from("src/styles"));
    assert_eq!(glob_base("src/img/**"), PathBuf::from("src/img"));
    assert_eq!(glob_base("src/robots.txt"), PathBuf::from("src"));
    assert_eq!(glob_base("*.html"), PathBuf::new());
}

#[test]
fn sources_keep_paths_relative_to_the_pattern_base() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/img/logo.png", "png");
    fs.add_file("/proj/src/img/icons/close.svg", "svg");

    let sources = spec(&["src/img/**"], "public/img").sources(&fs).unwrap();
    let rels: Vec<PathBuf> = sources.into_iter().map(|s| s.rel).collect();
    assert_eq!(
        rels,
        vec![PathBuf::from("icons/close.svg"), PathBuf::from("logo.png")]
    );
}

#[test]
fn html_whitespace_is_collapsed() {
    let minifier = HtmlMinifier::new().unwrap();
    let html = "<!DOCTYPE html>\n<html>\n  <body>\n    <p>hello    world</p>\n    <div>\n      <span>a</span>  <span>b</span>\n    </div>\n  </body>\n</html>\n";

    assert_eq!(
        minifier.minify(html),
        "<!DOCTYPE html><html><body><p>hello world</p><div><span>a</span> <span>b</span></div></body></html>"
    );
}

#[test]
fn preformatted_content_is_untouched() {
    let minifier = HtmlMinifier::new().unwrap();
    let html = "<div>\n  <pre>  keep\n    this  </pre>\n</div>";

    assert_eq!(
        minifier.minify(html),
        "<div><pre>  keep\n    this  </pre></div>"
    );
}

#[test]
fn markup_unit_writes_minified_copies() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/index.html", "<p>\n  a   b\n</p>\n");
    fs.add_file("/proj/src/about.html", "<div>  x </div>");
    fs.add_file("/proj/src/pages/nested.html", "<p>not matched</p>");

    let unit = MarkupUnit::new("html", spec(&["src/*.html"], "public")).unwrap();
    let report = unit.run(&fs).unwrap();

    assert_eq!(report.files, 2);
    assert_eq!(
        fs.read_to_string(Path::new("/proj/public/index.html")).unwrap(),
        "<p>a b</p>"
    );
    assert_eq!(
        fs.read_to_string(Path::new("/proj/public/about.html")).unwrap(),
        "<div>x</div>"
    );
    assert!(!fs.exists(Path::new("/proj/public/pages/nested.html")));
}

#[test]
fn second_run_rewrites_nothing() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/index.html", "<p>a</p>");

    let unit = MarkupUnit::new("html", spec(&["src/*.html"], "public")).unwrap();
    unit.run(&fs).unwrap();
    let first = fs.modified(Path::new("/proj/public/index.html"));

    let report = unit.run(&fs).unwrap();
    assert_eq!(report.files, 0);
    assert_eq!(report.skipped, 1);
    assert_eq!(fs.modified(Path::new("/proj/public/index.html")), first);
}

#[test]
fn invalid_utf8_is_a_source_error() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/index.html", vec![0xff, 0xfe, 0x00]);
    fs.add_file("/proj/public/index.html", "<p>old</p>");

    let unit = MarkupUnit::new("html", spec(&["src/*.html"], "public")).unwrap();
    let err = unit.run(&fs).unwrap_err();

    assert!(matches!(err, UnitError::Source { .. }), "got {err:?}");
    assert_eq!(
        fs.read_to_string(Path::new("/proj/public/index.html")).unwrap(),
        "<p>old</p>"
    );
}

#[test]
fn missing_source_directory_is_a_filesystem_error() {
    let fs = MockFileSystem::new();
    let unit = MarkupUnit::new("html", spec(&["src/*.html"], "public")).unwrap();

    let err = unit.run(&fs).unwrap_err();
    assert!(matches!(err, UnitError::Fs(_)), "got {err:?}");
}

#[test]
fn clean_keeps_preserved_paths() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/public/index.html", "x");
    fs.add_file("/proj/public/css/main.min.css", "x");
    fs.add_file("/proj/public/img/logo.png", "x");
    fs.add_file("/proj/public/assets/fonts/a.woff2", "x");
    fs.add_file("/proj/public/assets/site.css", "x");

    let unit = CleanUnit::new(
        "clean",
        PathBuf::from("/proj/public"),
        vec![PathBuf::from("img"), PathBuf::from("assets/fonts")],
    );
    let report = unit.run(&fs).unwrap();

    assert_eq!(
        fs.files(),
        vec![
            PathBuf::from("/proj/public/assets/fonts/a.woff2"),
            PathBuf::from("/proj/public/img/logo.png"),
        ]
    );
    // index.html, the css/ directory and assets/site.css
    assert_eq!(report.files, 3);
    assert!(fs.is_dir(Path::new("/proj/public")));
}

#[test]
fn clean_without_output_is_a_no_op() {
    let fs = MockFileSystem::new();
    let unit = CleanUnit::new("clean", PathBuf::from("/proj/public"), Vec::new());
    let report = unit.run(&fs).unwrap();
    assert_eq!(report.files, 0);
}

#[test]
fn newer_output_is_not_reprocessed() {
    let fs = MockFileSystem::new();
    fs.add_file_at("/proj/src/img/a.svg", "<svg v1/>", at(100));
    fs.add_file_at("/proj/public/img/a.svg", "<svg old/>", at(200));

    let unit = ImageUnit::new("img", spec(&["src/img/**"], "public/img"));
    let report = unit.run(&fs).unwrap();

    assert_eq!(report.files, 0);
    assert_eq!(report.skipped, 1);
    assert_eq!(
        fs.read_to_string(Path::new("/proj/public/img/a.svg")).unwrap(),
        "<svg old/>"
    );
}

#[test]
fn stale_output_is_replaced() {
    let fs = MockFileSystem::new();
    fs.add_file_at("/proj/src/img/a.svg", "<svg v2/>", at(300));
    fs.add_file_at("/proj/public/img/a.svg", "<svg old/>", at(200));
    fs.add_file_at("/proj/src/img/b.svg", "<svg b/>", at(300));

    let unit = ImageUnit::new("img", spec(&["src/img/**"], "public/img"));
    let report = unit.run(&fs).unwrap();

    assert_eq!(report.files, 2);
    assert_eq!(
        fs.read_to_string(Path::new("/proj/public/img/a.svg")).unwrap(),
        "<svg v2/>"
    );
    assert_eq!(
        fs.read_to_string(Path::new("/proj/public/img/b.svg")).unwrap(),
        "<svg b/>"
    );
}

#[test]
fn equal_timestamps_count_as_stale() {
    let fs = MockFileSystem::new();
    fs.add_file_at("/proj/src/img/a.svg", "s", at(100));
    fs.add_file_at("/proj/public/img/a.svg", "o", at(100));

    assert!(!is_newer_than(
        &fs,
        Path::new("/proj/public/img/a.svg"),
        Path::new("/proj/src/img/a.svg")
    ));
    assert!(!is_newer_than(
        &fs,
        Path::new("/proj/public/img/missing.svg"),
        Path::new("/proj/src/img/a.svg")
    ));
}

#[test]
fn png_is_reencoded_losslessly() {
    let img = image::RgbaImage::from_pixel(32, 32, image::Rgba([200, 40, 40, 255]));
    let mut original = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut original, image::ImageFormat::Png)
        .unwrap();
    let original = original.into_inner();

    let optimized = optimize(&original, Path::new("logo.png")).unwrap();
    assert!(optimized.len() <= original.len());

    let decoded = image::load_from_memory(&optimized).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (32, 32));
    assert_eq!(decoded.get_pixel(5, 5), &image::Rgba([200, 40, 40, 255]));
}

#[test]
fn corrupt_image_is_a_source_error() {
    let err = optimize(b"definitely not a png", Path::new("broken.png")).unwrap_err();
    assert!(matches!(err, UnitError::Source { .. }), "got {err:?}");
}

#[test]
fn unknown_formats_are_copied() {
    let bytes = b"<svg xmlns=\"http://www.w3.org/2000/svg\"/>";
    assert_eq!(optimize(bytes, Path::new("icon.svg")).unwrap(), bytes.to_vec());
}

#[test]
fn write_if_changed_skips_identical_bytes() {
    let fs = MockFileSystem::new();
    let path = Path::new("/proj/public/a.txt");

    assert!(write_if_changed(&fs, path, b"one").unwrap());
    assert!(!write_if_changed(&fs, path, b"one").unwrap());
    assert!(write_if_changed(&fs, path, b"two").unwrap());
}

#[test]
fn sizes_are_human_readable() {
    assert_eq!(human_size(512), "512 B");
    assert_eq!(human_size(1_500), "1.50 kB");
    assert_eq!(human_size(2_000_000), "2.00 MB");
}
