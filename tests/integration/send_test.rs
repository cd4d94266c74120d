//! Send-side integration tests: caching, invalidation, failure isolation,
//! cancellation and concurrency through a [`DocumentSession`].

mod helpers;

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use connector_cache::NullConversionCache;
use connector_cache::memory::MemoryConversionCache;
use connector_core::config::PipelineConfig;
use connector_core::graph::{Collection, GraphNode, ProxyValue, keys};
use connector_core::traits::ConversionCache;
use connector_core::types::{ApplicationId, ProjectId, Transform};
use connector_pipeline::builder::{RESULT_TYPE_INSTANCE, RESULT_TYPE_REFERENCE};
use connector_pipeline::{
    BuildError, BuildProgress, BuildRequest, BuildState, ConversionResult, InstanceDeduplicator,
    RootObjectUnpacker,
};

use helpers::{TestConverter, TestHost, TestObject, chair, session, session_with_config};

fn memory_cache() -> Arc<dyn ConversionCache> {
    Arc::new(MemoryConversionCache::default())
}

fn request() -> BuildRequest {
    BuildRequest::new("project-1", "card-1").with_setting("sendNormals", true)
}

fn id(value: &str) -> ApplicationId {
    ApplicationId::new(value)
}

#[tokio::test]
async fn test_unchanged_object_is_reused_from_cache() {
    let host = Arc::new(TestHost::new(vec![TestObject::atomic("wall", "Walls")]));
    let converter = Arc::new(TestConverter::new());
    let session = session(host, converter.clone(), memory_cache());

    let first = session
        .send(&request(), &CancellationToken::new(), &())
        .await
        .expect("first send")
        .into_completed()
        .expect("completed");
    let second = session
        .send(&request(), &CancellationToken::new(), &())
        .await
        .expect("second send")
        .into_completed()
        .expect("completed");

    assert_eq!(converter.calls(), 1);
    assert_eq!(second.cache_hits, 1);

    let ConversionResult::Success { result_id: first_id, .. } = &first.results[0] else {
        panic!("first send failed");
    };
    match &second.results[0] {
        ConversionResult::Success {
            result_id,
            result_type,
            from_cache,
            ..
        } => {
            assert_eq!(result_id, first_id);
            assert_eq!(result_type, RESULT_TYPE_REFERENCE);
            assert!(from_cache);
        }
        other => panic!("unexpected result {other:?}"),
    }

    let walls = second.root.child("Walls").expect("Walls collection");
    assert!(matches!(
        walls.elements[0],
        GraphNode::Reference(ref reference) if reference.referenced_id == *first_id
    ));
}

#[tokio::test]
async fn test_cache_is_scoped_by_project() {
    let host = Arc::new(TestHost::new(vec![TestObject::atomic("wall", "Walls")]));
    let converter = Arc::new(TestConverter::new());
    let session = session(host, converter.clone(), memory_cache());

    session
        .send(&request(), &CancellationToken::new(), &())
        .await
        .expect("project-1");
    session
        .send(
            &BuildRequest::new("project-2", "card-1").with_setting("sendNormals", true),
            &CancellationToken::new(),
            &(),
        )
        .await
        .expect("project-2");

    assert_eq!(converter.calls(), 2);
}

#[tokio::test]
async fn test_setting_change_evicts_and_reconverts() {
    let host = Arc::new(TestHost::new(vec![
        TestObject::atomic("a", "L1"),
        TestObject::atomic("b", "L1"),
    ]));
    let converter = Arc::new(TestConverter::new());
    let cache = memory_cache();
    let session = session(host, converter.clone(), cache.clone());

    session
        .send(&request(), &CancellationToken::new(), &())
        .await
        .expect("first send");
    assert!(cache.try_get(&ProjectId::new("project-1"), &id("a")).await.is_some());

    let changed = BuildRequest::new("project-1", "card-1").with_setting("sendNormals", false);
    let build = session
        .send(&changed, &CancellationToken::new(), &())
        .await
        .expect("second send")
        .into_completed()
        .expect("completed");

    assert_eq!(converter.calls(), 4);
    assert_eq!(build.cache_hits, 0);
    assert_eq!(session.metrics().entries_invalidated, 2);

    // Repopulated after the rebuild.
    assert!(cache.try_get(&ProjectId::new("project-1"), &id("a")).await.is_some());
}

#[tokio::test]
async fn test_dropped_setting_forces_reconversion() {
    let host = Arc::new(TestHost::new(vec![TestObject::atomic("a", "L1")]));
    let converter = Arc::new(TestConverter::new());
    let session = session(host, converter.clone(), memory_cache());

    let with_setting = BuildRequest::new("project-1", "card-1").with_setting("meshesToBreps", true);
    session
        .send(&with_setting, &CancellationToken::new(), &())
        .await
        .expect("first send");

    let build = session
        .send(
            &BuildRequest::new("project-1", "card-1"),
            &CancellationToken::new(),
            &(),
        )
        .await
        .expect("second send")
        .into_completed()
        .expect("completed");

    assert_eq!(converter.calls(), 2);
    assert_eq!(build.cache_hits, 0);
}

#[tokio::test]
async fn test_pre_cancelled_send_returns_cancelled_outcome() {
    let host = Arc::new(TestHost::new(vec![TestObject::atomic("a", "L1")]));
    let converter = Arc::new(TestConverter::new());
    let session = session(host, converter.clone(), memory_cache());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = session
        .send(&request(), &cancel, &())
        .await
        .expect("cancellation is an outcome");

    assert!(outcome.is_cancelled());
    assert!(outcome.results().is_empty());
    assert_eq!(converter.calls(), 0);
}

#[tokio::test]
async fn test_setting_change_leaves_unselected_entries() {
    let host = Arc::new(TestHost::new(vec![
        TestObject::atomic("a", "L1"),
        TestObject::atomic("b", "L1"),
    ]));
    let converter = Arc::new(TestConverter::new());
    let cache = memory_cache();
    let session = session(host.clone(), converter.clone(), cache.clone());

    session
        .send(&request(), &CancellationToken::new(), &())
        .await
        .expect("first send");

    host.select(vec![TestObject::atomic("a", "L1")]);
    let changed = BuildRequest::new("project-1", "card-1").with_setting("sendNormals", false);
    session
        .send(&changed, &CancellationToken::new(), &())
        .await
        .expect("second send");

    assert_eq!(converter.calls(), 3);
    assert!(cache.try_get(&ProjectId::new("project-1"), &id("b")).await.is_some());
}

#[tokio::test]
async fn test_partial_failure_keeps_one_result_per_object() {
    let host = Arc::new(TestHost::new(vec![
        TestObject::atomic("ok-1", "L1"),
        TestObject::atomic("bad", "L1").failing(),
        TestObject::atomic("ok-2", "L2"),
        TestObject::atomic("crash", "L2").panicking(),
    ]));
    let converter = Arc::new(TestConverter::new());
    let cache = memory_cache();
    let session = session(host, converter.clone(), cache.clone());

    let build = session
        .send(&request(), &CancellationToken::new(), &())
        .await
        .expect("send")
        .into_completed()
        .expect("completed");

    assert_eq!(build.results.len(), 4);
    assert_eq!(build.success_count(), 2);
    assert_eq!(build.error_count(), 2);

    let ids: Vec<_> = build.results.iter().map(|r| r.application_id().clone()).collect();
    assert_eq!(ids, [id("ok-1"), id("bad"), id("ok-2"), id("crash")]);

    match &build.results[3] {
        ConversionResult::Error { error, .. } => {
            assert!(error.to_string().contains("converter panicked"));
        }
        other => panic!("expected panic to be reported, got {other:?}"),
    }

    let placed = placed_ids(&build.root);
    assert_eq!(placed, [id("ok-1"), id("ok-2")]);

    let project = ProjectId::new("project-1");
    assert!(cache.try_get(&project, &id("ok-1")).await.is_some());
    assert!(cache.try_get(&project, &id("bad")).await.is_none());
}

#[tokio::test]
async fn test_every_object_failing_is_total_failure() {
    let host = Arc::new(TestHost::new(vec![
        TestObject::atomic("a", "L1").failing(),
        TestObject::atomic("b", "L1").failing(),
    ]));
    let converter = Arc::new(TestConverter::new());
    let cache = memory_cache();
    let session = session(host, converter, cache.clone());

    let err = session
        .send(&request(), &CancellationToken::new(), &())
        .await
        .unwrap_err();

    match err {
        BuildError::TotalFailure { failed, results } => {
            assert_eq!(failed, 2);
            assert!(results.iter().all(|r| !r.is_success()));
        }
        other => panic!("expected total failure, got {other:?}"),
    }
    assert_eq!(session.metrics().builds_failed, 1);
}

#[tokio::test]
async fn test_empty_selection_is_rejected() {
    let host = Arc::new(TestHost::new(Vec::new()));
    let session = session(host, Arc::new(TestConverter::new()), memory_cache());

    let err = session
        .send(&request(), &CancellationToken::new(), &())
        .await
        .unwrap_err();
    assert!(matches!(err, BuildError::EmptySelection));
}

#[tokio::test]
async fn test_layers_become_nested_collections() {
    // ObjA and ObjB on L1, an instance of ObjA's geometry on L2.
    let host = Arc::new(TestHost::new(vec![
        TestObject::atomic("ObjA", "L1").with_vertices(chair()),
        TestObject::atomic("ObjB", "L1"),
        TestObject::instance("ObjC", "L2", chair(), Transform::translation(5.0, 0.0, 0.0)),
    ]));
    let converter = Arc::new(TestConverter::new());
    let session = session(host, converter.clone(), memory_cache());

    let build = session
        .send(&request(), &CancellationToken::new(), &())
        .await
        .expect("send")
        .into_completed()
        .expect("completed");

    assert_eq!(build.results.len(), 3);
    assert_eq!(build.success_count(), 3);

    let names: Vec<_> = build.root.children().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["L1", "L2"]);

    let l1 = build.root.child("L1").expect("L1");
    let l1_ids: Vec<_> = l1.objects().filter_map(GraphNode::application_id).cloned().collect();
    assert_eq!(l1_ids, [id("ObjA"), id("ObjB")]);

    let definition_id = InstanceDeduplicator::compute_content_hash(&chair());
    let l2 = build.root.child("L2").expect("L2");
    match &l2.elements[..] {
        [GraphNode::Instance(proxy)] => {
            assert_eq!(proxy.application_id, id("ObjC"));
            assert_eq!(proxy.definition_id, definition_id);
        }
        other => panic!("unexpected L2 contents {other:?}"),
    }

    let definitions = build
        .root
        .proxy_table(keys::INSTANCE_DEFINITION_PROXIES)
        .expect("definitions table");
    assert_eq!(definitions.len(), 1);
    assert_eq!(definitions[0].objects(), [id("ObjC")]);

    // The instance is placed, never converted.
    assert_eq!(converter.calls(), 2);
    assert!(matches!(
        &build.results[2],
        ConversionResult::Success { result_type, .. } if result_type == RESULT_TYPE_INSTANCE
    ));
}

#[tokio::test]
async fn test_instances_with_same_geometry_share_definition() {
    let host = Arc::new(TestHost::new(vec![
        TestObject::instance("i1", "Furniture", chair(), Transform::IDENTITY),
        TestObject::instance("i2", "Furniture", chair(), Transform::translation(1.0, 0.0, 0.0)),
        TestObject::instance("i3", "Furniture", vec![9.0, 9.0, 9.0], Transform::IDENTITY),
    ]));
    let session = session(host, Arc::new(TestConverter::new()), memory_cache());

    let build = session
        .send(&request(), &CancellationToken::new(), &())
        .await
        .expect("send")
        .into_completed()
        .expect("completed");

    let definitions = build
        .root
        .proxy_table(keys::INSTANCE_DEFINITION_PROXIES)
        .expect("definitions table");
    assert_eq!(definitions.len(), 2);
    assert_eq!(definitions[0].objects(), [id("i1"), id("i2")]);
    assert_eq!(session.metrics().instances_placed, 3);
}

#[tokio::test]
async fn test_shared_values_become_root_proxies() {
    let host = Arc::new(TestHost::new(vec![
        TestObject::atomic("a", "L1").with_color(0xFFFF0000).with_material("steel").in_group("g1"),
        TestObject::atomic("b", "L1").with_color(0xFFFF0000).with_material("steel"),
        TestObject::atomic("c", "L2").with_color(0xFF00FF00).in_group("g1"),
    ]));
    let session = session(host, Arc::new(TestConverter::new()), memory_cache());

    let build = session
        .send(&request(), &CancellationToken::new(), &())
        .await
        .expect("send")
        .into_completed()
        .expect("completed");

    let colors = build.root.proxy_table(keys::COLOR_PROXIES).expect("colors");
    assert_eq!(colors.len(), 2);
    assert_eq!(colors[0].objects(), [id("a"), id("b")]);

    let materials = build
        .root
        .proxy_table(keys::RENDER_MATERIAL_PROXIES)
        .expect("materials");
    assert_eq!(materials.len(), 1);

    let groups = build.root.proxy_table(keys::GROUP_PROXIES).expect("groups");
    assert!(matches!(
        &groups[..],
        [ProxyValue::Group(group)] if group.objects == [id("a"), id("c")]
    ));

    // Nested collections carry no tables.
    assert!(build.root.child("L1").expect("L1").proxies.is_empty());
}

#[tokio::test]
async fn test_failed_objects_are_pruned_from_proxies() {
    let host = Arc::new(TestHost::new(vec![
        TestObject::atomic("a", "L1").with_color(0xFFFF0000),
        TestObject::atomic("b", "L1").with_color(0xFF0000FF).failing(),
    ]));
    let session = session(host, Arc::new(TestConverter::new()), memory_cache());

    let build = session
        .send(&request(), &CancellationToken::new(), &())
        .await
        .expect("send")
        .into_completed()
        .expect("completed");

    let colors = build.root.proxy_table(keys::COLOR_PROXIES).expect("colors");
    assert_eq!(colors.len(), 1);
    assert_eq!(colors[0].objects(), [id("a")]);
}

#[tokio::test]
async fn test_cancellation_stops_build_without_caching() {
    let cancel = CancellationToken::new();
    let host = Arc::new(TestHost::new(
        (0..5).map(|i| TestObject::atomic(&format!("obj-{i}"), "L1")).collect(),
    ));
    let converter = Arc::new(TestConverter::cancelling_after(2, cancel.clone()));
    let cache = memory_cache();
    let session = session(host, converter.clone(), cache.clone());

    let outcome = session
        .send(&request(), &cancel, &())
        .await
        .expect("cancelled outcome");

    assert!(outcome.is_cancelled());
    assert_eq!(outcome.results().len(), 2);
    assert_eq!(converter.calls(), 2);
    assert!(cache.try_get(&ProjectId::new("project-1"), &id("obj-0")).await.is_none());
    assert_eq!(session.metrics().builds_cancelled, 1);
}

#[tokio::test]
async fn test_null_cache_always_reconverts() {
    let host = Arc::new(TestHost::new(vec![TestObject::atomic("a", "L1")]));
    let converter = Arc::new(TestConverter::new());
    let session = session(host, converter.clone(), Arc::new(NullConversionCache));

    for _ in 0..3 {
        let build = session
            .send(&request(), &CancellationToken::new(), &())
            .await
            .expect("send")
            .into_completed()
            .expect("completed");
        assert_eq!(build.cache_hits, 0);
    }
    assert_eq!(converter.calls(), 3);
}

#[tokio::test]
async fn test_reentrant_converter_keeps_selection_order() {
    let selection: Vec<_> = (0..16)
        .map(|i| TestObject::atomic(&format!("obj-{i:02}"), if i % 2 == 0 { "Even" } else { "Odd" }))
        .collect();
    let expected: Vec<_> = selection.iter().map(|o| o.id.clone()).collect();

    let host = Arc::new(TestHost::new(selection));
    let converter = Arc::new(TestConverter::reentrant());
    let config = PipelineConfig {
        concurrency: 4,
        ..Default::default()
    };
    let session = session_with_config(host, converter.clone(), memory_cache(), config);

    let build = session
        .send(&request(), &CancellationToken::new(), &())
        .await
        .expect("send")
        .into_completed()
        .expect("completed");

    let ids: Vec<_> = build.results.iter().map(|r| r.application_id().clone()).collect();
    assert_eq!(ids, expected);
    assert_eq!(converter.calls(), 16);

    let even = build.root.child("Even").expect("Even");
    let even_ids: Vec<_> = even.objects().filter_map(GraphNode::application_id).cloned().collect();
    assert_eq!(even_ids.first(), Some(&id("obj-00")));
    assert_eq!(even_ids.last(), Some(&id("obj-14")));
}

#[tokio::test]
async fn test_progress_reports_phases_in_order() {
    let host = Arc::new(TestHost::new(vec![
        TestObject::atomic("a", "L1"),
        TestObject::atomic("b", "L1"),
    ]));
    let session = session(host, Arc::new(TestConverter::new()), memory_cache());

    let reports = Mutex::new(Vec::new());
    let reporter = |progress: BuildProgress| reports.lock().expect("reports").push(progress);
    session
        .send(&request(), &CancellationToken::new(), &reporter)
        .await
        .expect("send");

    let reports = reports.into_inner().expect("reports");
    let states: Vec<_> = reports.iter().map(|p| p.state).collect();
    assert_eq!(
        states,
        [
            BuildState::Unpacking,
            BuildState::Converting,
            BuildState::Converting,
            BuildState::Finalizing,
            BuildState::Completed,
        ]
    );
    assert_eq!(reports[2].current, 2);
    assert_eq!(reports[2].total, 2);
}

/// Application ids of every object placed under `root`, depth-first.
fn placed_ids(root: &Collection) -> Vec<ApplicationId> {
    RootObjectUnpacker::objects_to_convert(root)
        .filter_map(|ctx| ctx.node.application_id().cloned())
        .collect()
}
