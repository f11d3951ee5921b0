// tests/config_errors.rs

use assetdag::config::{load_default, load_from_str};
use assetdag::errors::AssetdagError;
use assetdag::types::{NotifyKind, UnitKind};
use assetdag_test_utils::builders::{unit, ConfigFileBuilder};

#[test]
fn built_in_pipeline_is_valid() {
    let cfg = load_default().expect("built-in pipeline must validate");

    assert_eq!(
        cfg.build_units(),
        vec!["clean", "html", "img", "scripts", "styles"]
    );
    assert_eq!(cfg.units_of_kind(UnitKind::Templates), vec!["pug"]);

    let styles = cfg.unit("styles").unwrap();
    assert_eq!(styles.after, vec!["html"]);
    assert_eq!(styles.effective_notify(), Some(NotifyKind::Inject));
    assert_eq!(styles.bundle_name(), "main.min.css");

    let pug = cfg.unit("pug").unwrap();
    assert!(!pug.effective_watch());
    assert!(!cfg.unit("clean").unwrap().effective_watch());
    assert_eq!(cfg.server().port, 3000);
}

#[test]
fn cycle_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_unit("a", unit(UnitKind::Markup).after("b").build())
        .with_unit("b", unit(UnitKind::Markup).after("a").build())
        .try_build()
        .unwrap_err();

    assert!(matches!(err, AssetdagError::DagCycle(_)), "got {err:?}");
}

#[test]
fn unknown_dependency_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_unit("html", unit(UnitKind::Markup).after("missing").build())
        .try_build()
        .unwrap_err();

    match err {
        AssetdagError::ConfigError(msg) => assert!(msg.contains("missing"), "{msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn self_dependency_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_unit("html", unit(UnitKind::Markup).after("html").build())
        .try_build()
        .unwrap_err();

    assert!(matches!(err, AssetdagError::ConfigError(_)), "got {err:?}");
}

#[test]
fn build_unit_cannot_wait_on_non_build_unit() {
    let err = ConfigFileBuilder::new()
        .with_unit("pug", unit(UnitKind::Templates).build_graph(false).build())
        .with_unit("html", unit(UnitKind::Markup).after("pug").build())
        .try_build()
        .unwrap_err();

    assert!(matches!(err, AssetdagError::ConfigError(_)), "got {err:?}");
}

#[test]
fn zero_queue_length_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_queue_length(0)
        .with_unit("html", unit(UnitKind::Markup).build())
        .try_build()
        .unwrap_err();

    assert!(matches!(err, AssetdagError::ConfigError(_)), "got {err:?}");
}

#[test]
fn empty_config_is_rejected() {
    let err = ConfigFileBuilder::new().try_build().unwrap_err();
    assert!(matches!(err, AssetdagError::ConfigError(_)), "got {err:?}");
}

#[test]
fn unit_without_sources_is_rejected() {
    let err = load_from_str(
        r#"
        [unit.styles]
        kind = "styles"
        dest = "public/css"
        "#,
    )
    .unwrap_err();

    assert!(matches!(err, AssetdagError::ConfigError(_)), "got {err:?}");
}

#[test]
fn templates_need_a_renderer() {
    let err = load_from_str(
        r#"
        [unit.pug]
        kind = "templates"
        src = ["src/*.pug"]
        dest = "public"
        "#,
    )
    .unwrap_err();

    match err {
        AssetdagError::ConfigError(msg) => assert!(msg.contains("renderer"), "{msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn compiler_for_unlisted_language_is_rejected() {
    let err = load_from_str(
        r#"
        [unit.styles]
        kind = "styles"
        src = ["src/styles/**"]
        dest = "public/css"
        languages = ["css"]

        [unit.styles.compilers]
        less = "lessc -"
        "#,
    )
    .unwrap_err();

    assert!(matches!(err, AssetdagError::ConfigError(_)), "got {err:?}");
}

#[test]
fn bundle_name_must_be_a_file_name() {
    let err = load_from_str(
        r#"
        [unit.scripts]
        kind = "scripts"
        src = ["src/scripts/**/*.js"]
        dest = "public/js"
        bundle = "nested/main.js"
        "#,
    )
    .unwrap_err();

    assert!(matches!(err, AssetdagError::ConfigError(_)), "got {err:?}");
}

#[test]
fn invalid_glob_is_rejected() {
    let err = load_from_str(
        r#"
        [unit.html]
        kind = "markup"
        src = ["src/[*.html"]
        dest = "public"
        "#,
    )
    .unwrap_err();

    assert!(matches!(err, AssetdagError::ConfigError(_)), "got {err:?}");
}

#[test]
fn unknown_kind_is_a_toml_error() {
    let err = load_from_str(
        r#"
        [unit.html]
        kind = "markdown"
        src = ["src/*.md"]
        dest = "public"
        "#,
    )
    .unwrap_err();

    assert!(matches!(err, AssetdagError::TomlError(_)), "got {err:?}");
}

#[test]
fn notify_override_and_defaults() {
    let cfg = load_from_str(
        r#"
        [reload]
        watch = ["public/*.html"]

        [unit.scripts]
        kind = "scripts"
        src = ["src/scripts/**/*.js"]
        dest = "public/js"
        notify = "none"

        [unit.img]
        kind = "images"
        src = ["src/img/**"]
        dest = "public/img"
        notify = "reload"
        "#,
    )
    .unwrap();

    assert_eq!(cfg.unit("scripts").unwrap().effective_notify(), None);
    assert_eq!(
        cfg.unit("img").unwrap().effective_notify(),
        Some(NotifyKind::Reload)
    );
    assert_eq!(cfg.unit("scripts").unwrap().bundle_name(), "main.min.js");
    assert_eq!(cfg.reload().watch, vec!["public/*.html"]);
}
