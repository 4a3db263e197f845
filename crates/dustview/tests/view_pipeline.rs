//! End-to-end tests: filesystem sources through the full view pipeline.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use dustview::{
    DustView, DustViewError, EngineSettings, FileSystemLoader, LibrarySource, Model,
    PresenceSourceCache, SourceCache, SourceMode, View, ViewConfig, ViewRequest, ViewResponse,
};
use serde_json::{json, Value};
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn markup_config() -> ViewConfig {
    ViewConfig {
        source_mode: SourceMode::Markup,
        ..ViewConfig::default()
    }
}

fn fixture_view(config: ViewConfig) -> DustView {
    init_tracing();
    let view = DustView::builder(config)
        .source_loader(Arc::new(FileSystemLoader::new(fixtures())))
        .build()
        .unwrap();
    view.initialize().unwrap();
    view
}

fn model(value: Value) -> Model {
    match value {
        Value::Object(map) => map,
        other => panic!("model must be an object, got {other}"),
    }
}

fn render(view: &DustView, input: Value, request: &ViewRequest) -> Result<Model, DustViewError> {
    view.render(&model(input), request, &mut ViewResponse::new())
}

#[test]
fn test_directory_batch_renders_master_with_partials() {
    let view = fixture_view(ViewConfig {
        multi_load: true,
        ..markup_config()
    });

    let output = render(
        &view,
        json!({
            "_TEMPLATE_KEY": "master",
            "_VIEW_FILE_PATH": "/template/multiple",
            "_CONTENT_KEY": {"name": "chanwook", "items": ["a", "b"]},
        }),
        &ViewRequest::new(),
    )
    .unwrap();

    assert_eq!(
        output["_view"],
        "Master[chanwook][partial1 chanwook][partial2:ab]"
    );
    assert_eq!(
        view.engine().registered_keys(),
        vec!["master", "partial1", "partial2"]
    );
}

#[test]
fn test_request_attribute_enables_multi_load() {
    let view = fixture_view(markup_config());
    let request = ViewRequest::new().with_attribute("_MULTI_LOAD_REQUEST", true);

    let output = render(
        &view,
        json!({
            "_TEMPLATE_KEY": "master",
            "_VIEW_FILE_PATH": "/template/multiple/",
            "_CONTENT_KEY": {"name": "x"},
        }),
        &request,
    )
    .unwrap();

    assert_eq!(output["_view"], "Master[x][partial1 x][partial2]");
}

#[test]
fn test_multi_load_falls_back_to_single_file() {
    let view = fixture_view(ViewConfig {
        multi_load: true,
        prefix: "/template".into(),
        suffix: ".html".into(),
        ..markup_config()
    });

    let output = render(
        &view,
        json!({
            "_TEMPLATE_KEY": "solo",
            "_VIEW_FILE_PATH": "/multiple/partial1",
            "_CONTENT_KEY": {"name": "one"},
        }),
        &ViewRequest::new(),
    )
    .unwrap();

    assert_eq!(output["_view"], "[partial1 one]");
    assert_eq!(view.engine().registered_keys(), vec!["solo"]);
}

#[test]
fn test_common_view_path_is_preloaded() {
    let view = fixture_view(ViewConfig {
        common_view_path: Some("/template/common".into()),
        engine: EngineSettings {
            helper_library: Some(LibrarySource::Path(fixtures().join("library/helper.yaml"))),
            ..EngineSettings::default()
        },
        ..markup_config()
    });

    assert_eq!(view.engine().registered_keys(), vec!["footer", "header"]);

    let output = render(
        &view,
        json!({
            "_TEMPLATE_KEY": "commontest",
            "_VIEW_FILE_PATH": "/template/commontest.html",
            "_CONTENT_KEY": {"title": "Orders", "body": "none yet"},
        }),
        &ViewRequest::new(),
    )
    .unwrap();

    assert_eq!(
        output["_view"],
        "<header>Orders (core)</header><p>none yet</p><footer>Acme Views</footer>"
    );
}

#[test]
fn test_refresh_parameter_reloads_changed_source() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("page.html");
    fs::write(&path, "v1 {n}").unwrap();

    let view = DustView::builder(markup_config())
        .source_loader(Arc::new(FileSystemLoader::new(dir.path())))
        .build()
        .unwrap();
    view.initialize().unwrap();

    let input = json!({
        "_TEMPLATE_KEY": "page",
        "_VIEW_FILE_PATH": "/page.html",
        "_CONTENT_KEY": {"n": 1},
    });

    let first = render(&view, input.clone(), &ViewRequest::new()).unwrap();
    assert_eq!(first["_view"], "v1 1");

    fs::write(&path, "v2 {n}").unwrap();
    let cached = render(&view, input.clone(), &ViewRequest::new()).unwrap();
    assert_eq!(cached["_view"], "v1 1");

    let refreshed = render(&view, input.clone(), &ViewRequest::new().with_param("_refresh", "y")).unwrap();
    assert_eq!(refreshed["_view"], "v2 1");

    let after = render(&view, input, &ViewRequest::new()).unwrap();
    assert_eq!(after["_view"], "v2 1");
}

#[test]
fn test_disabled_cache_reads_every_time() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("page.html");
    fs::write(&path, "first").unwrap();

    let view = DustView::builder(ViewConfig {
        cache_enabled: false,
        ..markup_config()
    })
    .source_loader(Arc::new(FileSystemLoader::new(dir.path())))
    .build()
    .unwrap();
    view.initialize().unwrap();

    let input = json!({"_TEMPLATE_KEY": "p", "_VIEW_FILE_PATH": "/page.html", "_CONTENT_KEY": {}});
    assert_eq!(render(&view, input.clone(), &ViewRequest::new()).unwrap()["_view"], "first");

    fs::write(&path, "second").unwrap();
    assert_eq!(render(&view, input, &ViewRequest::new()).unwrap()["_view"], "second");
    assert!(view.loader().cache().is_empty());
}

#[test]
fn test_presence_cache_keeps_first_registration() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("page.html");
    fs::write(&path, "first").unwrap();

    let view = DustView::builder(markup_config())
        .source_loader(Arc::new(FileSystemLoader::new(dir.path())))
        .cache(Arc::new(PresenceSourceCache::new()))
        .build()
        .unwrap();
    view.initialize().unwrap();

    let input = json!({"_TEMPLATE_KEY": "p", "_VIEW_FILE_PATH": "/page.html", "_CONTENT_KEY": {}});
    assert_eq!(render(&view, input.clone(), &ViewRequest::new()).unwrap()["_view"], "first");

    fs::write(&path, "second").unwrap();
    assert_eq!(render(&view, input.clone(), &ViewRequest::new()).unwrap()["_view"], "first");

    let refresh = ViewRequest::new().with_param("_refresh", "Y");
    assert_eq!(render(&view, input, &refresh).unwrap()["_view"], "second");
}

#[test]
fn test_failed_batch_keeps_earlier_templates() {
    let dir = TempDir::new().unwrap();
    let batch = dir.path().join("batch");
    fs::create_dir(&batch).unwrap();
    fs::write(batch.join("a.html"), "A").unwrap();
    fs::write(batch.join("b.html"), "{#unclosed}").unwrap();
    fs::write(batch.join("c.html"), "C").unwrap();

    let view = DustView::builder(ViewConfig {
        multi_load: true,
        ..markup_config()
    })
    .source_loader(Arc::new(FileSystemLoader::new(dir.path())))
    .build()
    .unwrap();
    view.initialize().unwrap();

    let mut response = ViewResponse::new();
    let err = view
        .render(
            &model(json!({"_TEMPLATE_KEY": "a", "_VIEW_FILE_PATH": "/batch", "_CONTENT_KEY": {}})),
            &ViewRequest::new(),
            &mut response,
        )
        .unwrap_err();

    assert!(matches!(err, DustViewError::Compile { ref template_key, .. } if template_key == "b"));
    assert!(view.engine().is_registered("a"));
    assert!(!view.engine().is_registered("c"));
    assert_eq!(response, ViewResponse::new());
}

#[test]
fn test_missing_template_file_is_load_error() {
    let view = fixture_view(markup_config());
    let err = render(
        &view,
        json!({"_TEMPLATE_KEY": "gone", "_VIEW_FILE_PATH": "/template/gone.html", "_CONTENT_KEY": {}}),
        &ViewRequest::new(),
    )
    .unwrap_err();

    match err {
        DustViewError::TemplateLoad {
            template_key, path, ..
        } => {
            assert_eq!(template_key, "gone");
            assert_eq!(path, "/template/gone.html");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_engine_reinitialize_then_cached_render_recovers() {
    let view = fixture_view(markup_config());
    let input = json!({
        "_TEMPLATE_KEY": "p1",
        "_VIEW_FILE_PATH": "/template/multiple/partial1.html",
        "_CONTENT_KEY": {"name": "n"},
    });

    render(&view, input.clone(), &ViewRequest::new()).unwrap();
    view.initialize().unwrap();
    assert!(!view.engine().is_registered("p1"));

    let output = render(&view, input, &ViewRequest::new()).unwrap();
    assert_eq!(output["_view"], "[partial1 n]");
}

#[test]
fn test_concurrent_renders() {
    let view = Arc::new(fixture_view(markup_config()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let view = Arc::clone(&view);
            std::thread::spawn(move || {
                let output = render(
                    &view,
                    json!({
                        "_TEMPLATE_KEY": "p1",
                        "_VIEW_FILE_PATH": "/template/multiple/partial1.html",
                        "_CONTENT_KEY": {"name": i},
                    }),
                    &ViewRequest::new(),
                )
                .unwrap();
                output["_view"].as_str().unwrap().to_string()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), format!("[partial1 {i}]"));
    }
}
