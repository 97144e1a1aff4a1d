//! End-to-end behavior of the `Engine` facade.

use std::fs;
use std::path::Path;

use serde_json::json;
use serial_test::serial;
use tempfile::TempDir;
use templar::render::engines::Simple;
use templar::render::{CandidatePackage, RenderError};
use templar::{Engine, FrontMatter, Middleware, Options, Processed, Registry, TemplarError};

fn in_dir(dir: &Path) -> Options {
    Options::new().basedir(dir)
}

/// Uppercases the whole source.
struct Shout;

impl Middleware for Shout {
    fn name(&self) -> &str {
        "shout"
    }

    fn process(&self, source: &str) -> templar::Result<Processed> {
        Ok(Processed {
            content: source.to_uppercase(),
            data: json!({"shouted": true}),
        })
    }
}

#[test]
fn test_render_file_resolves_engine_from_extension() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("header.hbs"), "<h1>{{title}}</h1>").unwrap();
    fs::write(dir.path().join("page.hbs"), "{{> header}} <p>{{body}}</p>\n").unwrap();

    let engine = Engine::builtin().unwrap();
    let template = engine
        .compile_file(&dir.path().join("page.hbs"), &Options::new())
        .unwrap();
    assert_eq!(template.implementation(), "handlebars");

    let out = template.render(&json!({"title": "T", "body": "B"})).unwrap();
    assert_eq!(out, "<h1>T</h1> <p>B</p>");
}

#[test]
fn test_explicit_engine_skips_resolution() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::builtin().unwrap();

    // `.hbs` would resolve to handlebars; tera syntax proves the override.
    let options = Options::new()
        .filename(dir.path().join("card.hbs"))
        .engine("tera");
    let out = engine
        .render("{{ items | length }} items", &json!({"items": [1, 2, 3]}), &options)
        .unwrap();
    assert_eq!(out, "3 items");
}

#[test]
fn test_unknown_engine() {
    let engine = Engine::builtin().unwrap();
    let err = engine
        .compile("x", &Options::new().engine("pug"))
        .unwrap_err();
    assert!(matches!(err, TemplarError::UnknownEngine(ref name) if name == "pug"));
}

#[test]
fn test_no_implementation_for_filename() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::builtin().unwrap();
    let err = engine
        .compile("x", &Options::new().filename(dir.path().join("page.unrecognizable")))
        .unwrap_err();
    assert!(matches!(
        err,
        TemplarError::Render(RenderError::NoImplementation { filename: Some(_) })
    ));
}

#[test]
fn test_no_filename_uses_first_candidate() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::builtin().unwrap();
    let template = engine.compile("{{ 1 + 1 }}", &in_dir(dir.path())).unwrap();
    assert_eq!(template.implementation(), "minijinja");
    assert_eq!(template.render(&json!({})).unwrap(), "2");
}

#[test]
fn test_data_directory_wins_over_locals() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("data/nav")).unwrap();
    fs::write(dir.path().join("data/site.json"), r#"{"name": "Docs"}"#).unwrap();
    fs::write(dir.path().join("data/nav/index.json"), r#"{"home": "/"}"#).unwrap();

    let engine = Engine::builtin().unwrap();
    let options = in_dir(dir.path()).data_dir("data").engine("tera");
    let template = engine
        .compile("{{ site.name }} at {{ nav.home }} for {{ user }}", &options)
        .unwrap();

    let out = template
        .render(&json!({"site": {"name": "Local"}, "user": "ann"}))
        .unwrap();
    insta::assert_snapshot!(out, @"Docs at / for ann");
}

#[test]
fn test_inline_data_merges_deeply_with_locals() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::builtin().unwrap();
    let options = in_dir(dir.path())
        .engine("simple")
        .data(json!({"site": {"name": "Docs"}}));

    let template = engine.compile("{site.name}/{site.lang}", &options).unwrap();
    let out = template.render(&json!({"site": {"lang": "en"}})).unwrap();
    assert_eq!(out, "Docs/en");
    insta::assert_json_snapshot!(template.data(), @r#"
    {
      "site": {
        "name": "Docs"
      }
    }
    "#);
}

#[test]
fn test_front_matter_middleware() {
    let dir = TempDir::new().unwrap();
    let mut engine = Engine::builtin().unwrap();
    engine.configure(in_dir(dir.path()).engine("tera"));
    engine.use_middleware(FrontMatter);

    let source = "---\ntitle: Home\ntags: [a, b]\n---\n{{ title }}: {{ tags | join(sep=\",\") }}\n";
    let out = engine.render(source, &json!({"title": "x"}), &Options::new()).unwrap();
    assert_eq!(out, "Home: a,b");
}

#[test]
fn test_middleware_run_in_order() {
    let dir = TempDir::new().unwrap();
    let mut engine = Engine::builtin().unwrap();
    engine.use_middleware(Shout);

    let options = in_dir(dir.path())
        .engine("simple")
        .middleware("frontmatter")
        .middleware("shout")
        .middleware("frontmatter");
    let template = engine
        .compile("---\nwho: ann\n---\nhi {who}", &options)
        .unwrap();

    // The front matter is gone before `shout` sees the source.
    assert_eq!(template.render(&json!({"WHO": "ANN"})).unwrap(), "HI ANN");
    assert_eq!(template.data(), &json!({"who": "ann", "shouted": true}));
}

#[test]
fn test_unknown_middleware() {
    let engine = Engine::builtin().unwrap();
    let err = engine
        .compile("x", &Options::new().engine("simple").middleware("toml"))
        .unwrap_err();
    assert!(matches!(err, TemplarError::UnknownMiddleware(ref name) if name == "toml"));
}

#[test]
fn test_per_call_options_win_over_defaults() {
    let dir = TempDir::new().unwrap();
    let mut engine = Engine::builtin().unwrap();
    engine.configure(in_dir(dir.path()).engine("handlebars"));

    let out = engine
        .render("{x}", &json!({"x": 1}), &Options::new().engine("simple"))
        .unwrap();
    assert_eq!(out, "1");
}

#[test]
fn test_configure_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("templar.yaml");
    fs::write(&config, "engine: simple\ndata:\n  greeting: Hi\n").unwrap();

    let mut engine = Engine::builtin().unwrap();
    engine.configure_file(&config).unwrap();
    let out = engine
        .render("{greeting} {name}", &json!({"name": "Ann"}), &in_dir(dir.path()))
        .unwrap();
    assert_eq!(out, "Hi Ann");
}

#[test]
fn test_configure_file_missing() {
    let dir = TempDir::new().unwrap();
    let mut engine = Engine::builtin().unwrap();
    let err = engine
        .configure_file(&dir.path().join("absent.yaml"))
        .unwrap_err();
    assert!(matches!(err, TemplarError::Io { .. }));
}

#[test]
fn test_custom_registry_and_manifests() {
    let dir = TempDir::new().unwrap();
    let mut registry = Registry::new();
    registry.register_implementation(Simple::new()).unwrap();

    let manifests = vec![
        CandidatePackage::new("handlebars", "templating", &["template"]),
        CandidatePackage::new("simple", "simple template substitution", &["template"]),
    ];
    let engine = Engine::new(registry, manifests);

    // handlebars is described but not registered, so only simple qualifies.
    let template = engine
        .compile("{a}", &Options::new().filename(dir.path().join("x.txt")))
        .unwrap();
    assert_eq!(template.implementation(), "simple");
    assert_eq!(template.render(&json!({"a": "ok"})).unwrap(), "ok");
}

#[test]
#[serial]
fn test_relative_file_resolves_against_current_directory() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("views")).unwrap();
    fs::write(dir.path().join("views/header.j2"), "== {{ title }} ==").unwrap();
    fs::write(
        dir.path().join("views/page.j2"),
        "{% include \"header.j2\" %}\n{{ body }}\n",
    )
    .unwrap();

    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(dir.path()).unwrap();
    let engine = Engine::builtin().unwrap();
    let result = engine.render_file(
        Path::new("views/page.j2"),
        &json!({"title": "T", "body": "B"}),
        &Options::new(),
    );
    std::env::set_current_dir(previous).unwrap();

    assert_eq!(result.unwrap(), "== T ==\nB");
}
