// tests/pipeline_scenario.rs

use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use assetdag::cli::{CliArgs, Command};
use assetdag::config::{load_and_validate, ConfigFile};
use assetdag::dag::Scheduler;
use assetdag::engine::{CoreRuntime, NoWatch, Runtime, RuntimeEvent, RuntimeOptions};
use assetdag::errors::AssetdagError;
use assetdag::exec::RealExecutorBackend;
use assetdag::fs::RealFileSystem;
use assetdag::transform::UnitRegistry;
use assetdag::{initial_units, load_config};
use assetdag_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const SITE_CONFIG: &str = r#"
[server]
enabled = false

[reload]
watch = ["public/*.html"]

[unit.clean]
kind = "clean"
dest = "public"
preserve = ["img"]

[unit.html]
kind = "markup"
src = ["src/*.html"]
dest = "public"
after = ["clean"]

[unit.styles]
kind = "styles"
src = ["src/styles/**/*.scss"]
dest = "public/css"
after = ["html"]
languages = ["scss"]

[unit.scripts]
kind = "scripts"
src = ["src/scripts/**/*.js"]
dest = "public/js"
after = ["html"]

[unit.img]
kind = "images"
src = ["src/img/**"]
dest = "public/img"
after = ["html"]

[unit.pug]
kind = "templates"
src = ["src/*.pug"]
dest = "public"
renderer = "cat"
build = false
watch = false
"#;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn site(root: &Path) -> ConfigFile {
    write(root, "assetdag.toml", SITE_CONFIG);
    write(root, "src/index.html", "<html>\n  <body>\n    <h1>Hi</h1>\n  </body>\n</html>\n");
    write(root, "src/styles/a.scss", "a {\n  color: red;\n}\n");
    write(root, "src/styles/b.scss", ".box {\n  display: flex;\n}\n");
    write(root, "src/styles/_vars.scss", "this is not css {{{");
    write(root, "src/scripts/app.js", "var answer = 40 + 2;\nconsole.log(answer);\n");
    write(root, "src/img/logo.svg", "<svg xmlns=\"http://www.w3.org/2000/svg\"/>");
    write(root, "src/page.pug", "<p>rendered</p>");
    write(root, "public/stale.html", "old");
    write(root, "public/img/kept.svg", "<svg/>");
    load_and_validate(root.join("assetdag.toml")).unwrap()
}

async fn build_once(
    cfg: &ConfigFile,
    root: &Path,
    roots: Vec<String>,
) -> assetdag::errors::Result<()> {
    let registry = UnitRegistry::from_config(cfg, root)?;
    let scheduler = Scheduler::from_config(cfg);
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let executor = RealExecutorBackend::new(rt_tx, registry, Arc::new(RealFileSystem));

    let core = CoreRuntime::new(
        scheduler,
        cfg.config().triggered_while_running_behaviour,
        cfg.config().queue_length,
        RuntimeOptions { exit_when_idle: true },
    );
    Runtime::new(core, rt_rx, executor, NoWatch).run(roots).await
}

#[tokio::test]
async fn full_build_produces_the_output_tree() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    let cfg = site(root);

    with_timeout(build_once(&cfg, root, cfg.build_units())).await?;

    assert!(!root.join("public/stale.html").exists(), "clean ran");
    assert!(root.join("public/img/kept.svg").exists(), "preserved");
    assert!(root.join("public/img/logo.svg").exists());

    let html = fs::read_to_string(root.join("public/index.html"))?;
    assert_eq!(html, "<html><body><h1>Hi</h1></body></html>");

    let css = fs::read_to_string(root.join("public/css/main.min.css"))?;
    assert!(css.contains("a{color:red}"), "{css}");
    assert!(css.contains(".box{display:flex}"), "{css}");
    assert!(css.ends_with("/*# sourceMappingURL=main.min.css.map */\n"), "{css}");

    let css_map: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(root.join("public/css/main.min.css.map"))?)?;
    assert_eq!(css_map["version"], 3);
    let sources: Vec<&str> = css_map["sources"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|s| s.as_str())
        .collect();
    assert_eq!(sources, vec!["../../src/styles/a.scss", "../../src/styles/b.scss"]);

    let js = fs::read_to_string(root.join("public/js/main.min.js"))?;
    assert!(js.contains("console.log"), "{js}");
    assert!(!js.contains("answer = 40 + 2"), "not minified: {js}");
    assert!(js.ends_with("//# sourceMappingURL=main.min.js.map\n"), "{js}");
    let js_map: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(root.join("public/js/main.min.js.map"))?)?;
    assert_eq!(js_map["version"], 3);

    // Templates are not part of the build graph.
    assert!(!root.join("public/page.html").exists());
    Ok(())
}

#[tokio::test]
async fn source_error_keeps_previous_output_and_build_succeeds() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    let cfg = site(root);

    with_timeout(build_once(&cfg, root, cfg.build_units())).await?;
    let before = fs::read_to_string(root.join("public/js/main.min.js"))?;

    write(root, "src/scripts/app.js", "function (");
    with_timeout(build_once(&cfg, root, vec!["scripts".to_string()])).await?;

    let after = fs::read_to_string(root.join("public/js/main.min.js"))?;
    assert_eq!(before, after);
    Ok(())
}

#[tokio::test]
async fn missing_source_directory_fails_the_build() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    let cfg = site(root);
    fs::remove_dir_all(root.join("src/img"))?;

    let result = with_timeout(build_once(&cfg, root, cfg.build_units())).await;
    match result {
        Err(AssetdagError::BuildFailed(units)) => assert_eq!(units, vec!["img"]),
        other => panic!("expected BuildFailed, got {other:?}"),
    }
    // Independent branches still finished.
    assert!(root.join("public/css/main.min.css").exists());
    Ok(())
}

#[tokio::test]
async fn templates_command_renders_pages() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    let cfg = site(root);

    let roots = initial_units(&cfg, Command::Templates)?;
    assert_eq!(roots, vec!["pug"]);
    with_timeout(build_once(&cfg, root, roots)).await?;

    assert_eq!(
        fs::read_to_string(root.join("public/page.html"))?,
        "<p>rendered</p>"
    );
    // Nothing else ran.
    assert!(root.join("public/stale.html").exists());
    Ok(())
}

#[tokio::test]
async fn failing_renderer_is_a_source_error() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    site(root);
    let cfg_text = SITE_CONFIG.replace("renderer = \"cat\"", "renderer = \"exit 3\"");
    write(root, "assetdag.toml", &cfg_text);
    let cfg = load_and_validate(root.join("assetdag.toml"))?;

    with_timeout(build_once(&cfg, root, vec!["pug".to_string()])).await?;
    assert!(!root.join("public/page.html").exists());
    Ok(())
}

#[test]
fn config_path_sets_the_project_root() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    site(root);

    let (cfg, found_root) = load_config(Some(&root.join("assetdag.toml")))?;
    assert_eq!(found_root, root);
    assert!(cfg.unit("styles").is_some());
    Ok(())
}

#[tokio::test]
async fn dry_run_does_not_touch_the_tree() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    site(root);

    let args = CliArgs {
        command: None,
        config: Some(root.join("assetdag.toml")),
        once: true,
        log_level: None,
        dry_run: true,
    };
    assetdag::run(args).await?;

    assert!(root.join("public/stale.html").exists());
    assert!(!root.join("public/index.html").exists());
    Ok(())
}

#[tokio::test]
async fn single_style_and_script_scenario() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    let cfg = site(root);
    fs::remove_dir_all(root.join("src/styles"))?;
    fs::remove_dir_all(root.join("src/scripts"))?;
    write(root, "src/styles/a.scss", "body{color:red}");
    write(root, "src/scripts/b.js", "let x=1");

    with_timeout(build_once(&cfg, root, cfg.build_units())).await?;

    let mut css_files: Vec<_> = fs::read_dir(root.join("public/css"))?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    css_files.sort();
    assert_eq!(css_files, vec!["main.min.css", "main.min.css.map"]);
    let css = fs::read_to_string(root.join("public/css/main.min.css"))?;
    assert!(css.starts_with("body{color:red}"), "{css}");

    let mut js_files: Vec<_> = fs::read_dir(root.join("public/js"))?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    js_files.sort();
    assert_eq!(js_files, vec!["main.min.js", "main.min.js.map"]);
    let js = fs::read_to_string(root.join("public/js/main.min.js"))?;
    assert!(js.ends_with("//# sourceMappingURL=main.min.js.map\n"), "{js}");
    Ok(())
}

#[tokio::test]
async fn rebuilding_an_unchanged_tree_is_byte_identical() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    let cfg = site(root);

    let outputs = [
        "public/index.html",
        "public/css/main.min.css",
        "public/css/main.min.css.map",
        "public/js/main.min.js",
        "public/js/main.min.js.map",
        "public/img/logo.svg",
    ];

    with_timeout(build_once(&cfg, root, cfg.build_units())).await?;
    let first: Vec<Vec<u8>> = outputs
        .iter()
        .map(|p| fs::read(root.join(p)))
        .collect::<Result<_, _>>()?;

    with_timeout(build_once(&cfg, root, cfg.build_units())).await?;
    let second: Vec<Vec<u8>> = outputs
        .iter()
        .map(|p| fs::read(root.join(p)))
        .collect::<Result<_, _>>()?;

    assert_eq!(first, second);
    Ok(())
}

#[test]
fn default_pipeline_compiles_both_style_languages() {
    let cfg = assetdag::config::load_default().unwrap();
    let styles = cfg.unit("styles").unwrap();
    for lang in ["scss", "sass"] {
        assert!(
            styles.compilers.get(lang).is_some_and(|cmd| cmd.starts_with("sass ")),
            "{lang} has no sass compiler"
        );
    }
}

fn sass_available() -> bool {
    std::process::Command::new("sass")
        .arg("--version")
        .output()
        .is_ok_and(|out| out.status.success())
}

#[test]
fn default_pipeline_builds_scss_with_variables_and_nesting() -> TestResult {
    if !sass_available() {
        eprintln!("sass not installed; skipping");
        return Ok(());
    }
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write(
        root,
        "src/styles/a.scss",
        "$c: red;\nbody {\n  color: $c;\n  a { color: blue; }\n}\n",
    );

    let cfg = assetdag::config::load_default()?;
    let registry = UnitRegistry::from_config(&cfg, root)?;
    let styles = registry.get("styles").unwrap();
    styles.run(&RealFileSystem)?;

    let css = fs::read_to_string(root.join("public/css/main.min.css"))?;
    assert!(css.contains("body{color:red}"), "{css}");
    assert!(css.contains("body a{color:#00f}"), "{css}");
    assert!(root.join("public/css/main.min.css.map").exists());
    Ok(())
}
