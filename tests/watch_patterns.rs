// tests/watch_patterns.rs

use std::path::{Path, PathBuf};

use assetdag::fs::mock::MockFileSystem;
use assetdag::types::UnitKind;
use assetdag::watch::path_utils::relative_str;
use assetdag::watch::{build_profiles_from_config, collect_matching_files, UnitWatchProfile};
use assetdag_test_utils::builders::{ConfigFileBuilder, UnitConfigBuilder};

fn pats(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn exclude_wins_over_watch() {
    let profile = UnitWatchProfile::new(
        "scripts",
        &pats(&["src/scripts/**/*.js"]),
        &pats(&["src/scripts/vendor/**"]),
    )
    .unwrap();

    assert!(profile.matches("src/scripts/app.js"));
    assert!(profile.matches("src/scripts/lib/util.js"));
    assert!(!profile.matches("src/scripts/vendor/jquery.js"));
    assert!(!profile.matches("src/scripts/app.ts"));
    assert_eq!(profile.name(), "scripts");
}

#[test]
fn unwatched_units_have_no_profile() {
    let cfg = ConfigFileBuilder::new()
        .with_unit("clean", UnitConfigBuilder::new(UnitKind::Clean, "public").build())
        .with_unit(
            "html",
            UnitConfigBuilder::new(UnitKind::Markup, "public")
                .src("src/*.html")
                .build(),
        )
        .with_unit(
            "pug",
            UnitConfigBuilder::new(UnitKind::Templates, "public")
                .src("src/*.pug")
                .renderer("pug")
                .watch(false)
                .build(),
        )
        .build();

    let bindings = build_profiles_from_config(&cfg).unwrap();
    let names: Vec<&str> = bindings.units.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["html"]);
    assert!(bindings.output.is_none());
    assert!(!bindings.is_output("public/index.html"));
}

#[test]
fn overlapping_patterns_trigger_every_matching_unit() {
    let cfg = ConfigFileBuilder::new()
        .with_unit(
            "html",
            UnitConfigBuilder::new(UnitKind::Markup, "public")
                .src("src/*.html")
                .build(),
        )
        .with_unit(
            "copy",
            UnitConfigBuilder::new(UnitKind::Images, "public/raw")
                .src("src/**")
                .build(),
        )
        .with_reload_watch("public/*.html")
        .build();

    let bindings = build_profiles_from_config(&cfg).unwrap();
    assert_eq!(bindings.units_for("src/index.html"), vec!["copy", "html"]);
    assert_eq!(bindings.units_for("src/img/a.png"), vec!["copy"]);
    assert!(bindings.is_output("public/index.html"));
    assert!(!bindings.is_output("public/css/main.min.css"));
}

#[test]
fn collect_matching_files_walks_the_tree() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/styles/a.scss", "a{}");
    fs.add_file("/proj/src/styles/nested/b.scss", "b{}");
    fs.add_file("/proj/src/styles/notes.txt", "x");
    fs.add_file("/proj/src/index.html", "<p></p>");

    let profile = UnitWatchProfile::new("styles", &pats(&["src/styles/**/*.scss"]), &[]).unwrap();
    let files = collect_matching_files(&fs, Path::new("/proj"), &profile).unwrap();

    assert_eq!(
        files,
        vec![
            PathBuf::from("/proj/src/styles/a.scss"),
            PathBuf::from("/proj/src/styles/nested/b.scss"),
        ]
    );
}

#[test]
fn relative_paths_use_forward_slashes() {
    let root = Path::new("/proj");
    assert_eq!(
        relative_str(root, Path::new("/proj/src/styles/a.scss")).as_deref(),
        Some("src/styles/a.scss")
    );
}

#[test]
fn relative_path_survives_a_different_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let canonical_root = dir.path().canonicalize().unwrap();
    std::fs::create_dir_all(canonical_root.join("src")).unwrap();
    std::fs::write(canonical_root.join("src/index.html"), "<p></p>").unwrap();

    // Same directory reached through `..`.
    let detour = canonical_root.join("src").join("..");
    let rel = relative_str(&detour, &canonical_root.join("src/index.html"));
    assert_eq!(rel.as_deref(), Some("src/index.html"));

    // Removed files still relativize through their parent.
    let gone = canonical_root.join("src/deleted.html");
    assert_eq!(
        relative_str(&detour, &gone).as_deref(),
        Some("src/deleted.html")
    );
}
