mod support;

use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::json;

use streaming_agent::{
    AbsentTeardown, ConnectionState, ControllerRef, Direction, DomainError, FaultMessage,
    InternalConnectOptions, InternalPipeOptions, PublishOptions, PublishReply, SessionStatus,
    SubscribeOptions,
};
use support::{bounded, loopback, test_config, wait_for, Harness};

fn controller() -> ControllerRef {
    ControllerRef::new("session-agent@node-1")
}

fn rtsp_source() -> PublishOptions {
    PublishOptions::from_json(
        "streaming",
        json!({
            "media": {"audio": true, "video": true},
            "connection": {"type": "rtsp", "url": "rtsp://camera:8554/cam1", "transportProtocol": "tcp"}
        }),
    )
    .unwrap()
}

fn file_sink(path: &str) -> SubscribeOptions {
    SubscribeOptions::from_json(
        "streaming",
        json!({
            "media": {"video": true},
            "connection": {"protocol": "file", "url": path}
        }),
    )
    .unwrap()
}

fn peer() -> InternalConnectOptions {
    InternalConnectOptions {
        ip: loopback(),
        port: 46000,
    }
}

#[tokio::test]
async fn test_publish_twice_rejects_duplicate() {
    let h = Harness::new();

    let reply = h.agent.publish("cam-1", controller(), rtsp_source()).await.unwrap();
    assert_eq!(reply, PublishReply::Published);

    let err = h
        .agent
        .publish("cam-1", controller(), rtsp_source())
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::DuplicateConnection("cam-1".to_string()));
    assert_eq!(h.agent.connection_count(), 1);
    assert_eq!(h.transports.ingress_urls(), vec!["rtsp://camera:8554/cam1".to_string()]);
}

#[tokio::test]
async fn test_concurrent_publish_same_id_yields_one_entry() {
    let h = Harness::new();
    let gate = h.transports.hold();

    let first = {
        let agent = h.agent.clone();
        tokio::spawn(async move { agent.publish("cam-1", controller(), rtsp_source()).await })
    };
    assert!(wait_for(|| h.agent.connection_state("cam-1") == ConnectionState::Creating).await);

    let second = h.agent.publish("cam-1", controller(), rtsp_source()).await;
    assert!(matches!(second, Err(DomainError::DuplicateConnection(_))));

    gate.notify_one();
    bounded(first).await.unwrap().unwrap();
    assert_eq!(h.agent.connection_state("cam-1"), ConnectionState::Active);
    assert_eq!(h.transports.ingress_urls().len(), 1);
}

#[tokio::test]
async fn test_unpublish_then_republish() {
    let h = Harness::new();

    h.agent.publish("cam-1", controller(), rtsp_source()).await.unwrap();
    h.agent.unpublish("cam-1").await.unwrap();
    assert_eq!(h.agent.connection_state("cam-1"), ConnectionState::Absent);
    assert_eq!(h.transports.closed(), 1);

    h.agent.publish("cam-1", controller(), rtsp_source()).await.unwrap();
    assert_eq!(h.agent.connection_state("cam-1"), ConnectionState::Active);
}

#[tokio::test]
async fn test_unsubscribe_then_resubscribe() {
    let h = Harness::new();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.ts");
    let target = target.to_str().unwrap();

    h.agent.subscribe("out-1", controller(), file_sink(target)).await.unwrap();
    h.agent.unsubscribe("out-1").await.unwrap();
    h.agent.subscribe("out-1", controller(), file_sink(target)).await.unwrap();

    assert_eq!(h.agent.connection_count(), 1);
    assert_eq!(h.transports.closed(), 1);
}

#[tokio::test]
async fn test_failed_ingress_leaves_no_entry() {
    let h = Harness::new();
    h.transports.fail_ingress.store(true, Ordering::SeqCst);

    let err = h
        .agent
        .publish("cam-1", controller(), rtsp_source())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::TransportCreationFailed(_)));
    assert_eq!(h.agent.connection_state("cam-1"), ConnectionState::Absent);

    h.transports.fail_ingress.store(false, Ordering::SeqCst);
    assert!(h.agent.publish("cam-1", controller(), rtsp_source()).await.is_ok());
}

#[tokio::test]
async fn test_ingress_construction_times_out() {
    let h = Harness::with_config(test_config().with_initialize_timeout(Duration::from_millis(50)));
    let _gate = h.transports.hold();

    let err = bounded(h.agent.publish("cam-1", controller(), rtsp_source()))
        .await
        .unwrap_err();
    match err {
        DomainError::TransportCreationFailed(reason) => assert!(reason.contains("timed out")),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(h.agent.connection_state("cam-1"), ConnectionState::Absent);
}

#[tokio::test]
async fn test_streaming_publish_requires_url() {
    let h = Harness::new();
    let options = PublishOptions::from_json(
        "streaming",
        json!({"connection": {"type": "rtmp"}}),
    )
    .unwrap();

    let err = h.agent.publish("cam-1", controller(), options).await.unwrap_err();
    assert!(matches!(err, DomainError::InvalidOptions(_)));
    assert_eq!(h.agent.connection_count(), 0);
}

#[tokio::test]
async fn test_close_empties_registry_and_is_idempotent() {
    let h = Harness::new();
    let dir = tempfile::tempdir().unwrap();

    for i in 0..3 {
        h.agent
            .publish(&format!("cam-{}", i), controller(), rtsp_source())
            .await
            .unwrap();
    }
    let target = dir.path().join("out.ts");
    h.agent
        .subscribe("out-1", controller(), file_sink(target.to_str().unwrap()))
        .await
        .unwrap();
    h.agent
        .create_internal_connection("pipe-1", Direction::In, InternalPipeOptions::default())
        .await
        .unwrap();
    h.agent
        .publish("pipe-1", controller(), PublishOptions::Internal(peer()))
        .await
        .unwrap();
    h.agent
        .create_internal_connection("spare", Direction::Out, InternalPipeOptions::default())
        .await
        .unwrap();
    assert_eq!(h.agent.connection_count(), 5);

    h.agent.close().await;
    assert_eq!(h.agent.connection_count(), 0);
    assert_eq!(h.transports.closed(), 4);
    assert_eq!(h.agent.internal_ports_leased(), 0);
    assert_eq!(h.endpoints.open_count(), 0);

    h.agent.close().await;
    assert_eq!(h.transports.closed(), 4);
}

#[tokio::test]
async fn test_fault_for_one_connection_leaves_others_untouched() {
    let h = Harness::new();
    h.agent.publish("x", ControllerRef::new("ctl-x"), rtsp_source()).await.unwrap();
    h.agent.publish("y", ControllerRef::new("ctl-y"), rtsp_source()).await.unwrap();

    let count = h
        .agent
        .on_fault_detected(&FaultMessage::new("x", Some("decoder crashed".to_string())));

    assert_eq!(count, 1);
    assert_eq!(
        h.notifier.statuses("x"),
        vec![SessionStatus::failed("fault detected on x: decoder crashed")]
    );
    assert!(h.notifier.statuses("y").is_empty());
    assert_eq!(h.agent.connection_state("x"), ConnectionState::Active);
    assert_eq!(h.agent.connection_state("y"), ConnectionState::Active);
}

#[tokio::test]
async fn test_fault_reaches_linked_subscribers() {
    let h = Harness::new();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.ts");

    h.agent.publish("cam", controller(), rtsp_source()).await.unwrap();
    h.agent
        .subscribe("out", ControllerRef::new("ctl-out"), file_sink(target.to_str().unwrap()))
        .await
        .unwrap();
    h.agent.linkup("out", Some("cam"), Some("cam")).await.unwrap();

    assert_eq!(h.agent.on_fault_detected(&FaultMessage::new("cam", None)), 2);
    assert!(h
        .notifier
        .statuses("out")
        .contains(&SessionStatus::failed("fault detected on cam")));
}

#[tokio::test]
async fn test_absent_teardown_acknowledged_by_default() {
    let h = Harness::new();

    assert!(h.agent.unpublish("ghost").await.is_ok());
    assert!(h.agent.unsubscribe("ghost").await.is_ok());
    assert!(h
        .agent
        .destroy_internal_connection("ghost", Direction::In)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_absent_teardown_reports_not_found_when_strict() {
    let h = Harness::with_config(test_config().with_absent_teardown(AbsentTeardown::NotFound));

    assert_eq!(
        h.agent.unpublish("ghost").await.unwrap_err(),
        DomainError::NotFound("ghost".to_string())
    );
    assert_eq!(
        h.agent
            .destroy_internal_connection("ghost", Direction::Out)
            .await
            .unwrap_err(),
        DomainError::NotFound("ghost".to_string())
    );
}

#[tokio::test]
async fn test_subscribe_rejects_existing_segment_target() {
    let h = Harness::new();
    let dir = tempfile::tempdir().unwrap();
    let options = SubscribeOptions::from_json(
        "streaming",
        json!({"connection": {"protocol": "hls", "url": dir.path().to_str().unwrap()}}),
    )
    .unwrap();

    let err = h.agent.subscribe("out-1", controller(), options).await.unwrap_err();
    assert!(matches!(err, DomainError::TargetAlreadyExists(_)));
    assert_eq!(h.agent.connection_state("out-1"), ConnectionState::Absent);
    assert!(h.transports.egress_params.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_egress_initialization_reported_as_ready() {
    let h = Harness::new();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.ts");
    let target = target.to_str().unwrap().to_string();

    h.agent.subscribe("out-1", controller(), file_sink(&target)).await.unwrap();

    assert!(wait_for(|| !h.notifier.statuses("out-1").is_empty()).await);
    assert_eq!(
        h.notifier.statuses("out-1"),
        vec![SessionStatus::Ready { info: Some(target) }]
    );

    let params = h.transports.egress_params.lock().unwrap();
    assert!(params[0].require_video);
    assert!(!params[0].require_audio);
}

#[tokio::test]
async fn test_egress_initialization_failure_keeps_entry() {
    let h = Harness::new();
    *h.transports.egress_outcome.lock().unwrap() = Some(Err("sink refused caps".to_string()));

    h.agent
        .subscribe("out-1", controller(), file_sink("/nonexistent/out.ts"))
        .await
        .unwrap();

    assert!(wait_for(|| !h.notifier.statuses("out-1").is_empty()).await);
    assert_eq!(
        h.notifier.statuses("out-1"),
        vec![SessionStatus::failed("sink refused caps")]
    );
    assert_eq!(h.agent.connection_state("out-1"), ConnectionState::Active);
    assert_eq!(h.notifier.all()[0].direction, Direction::Out);
}

#[tokio::test]
async fn test_fatal_error_after_subscribe_is_forwarded_and_entry_kept() {
    let h = Harness::new();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.ts");
    let target = target.to_str().unwrap().to_string();

    h.agent.subscribe("out-1", controller(), file_sink(&target)).await.unwrap();
    assert!(wait_for(|| !h.notifier.statuses("out-1").is_empty()).await);

    let sink = h.transports.sink("out-1").unwrap();
    sink.fatal("sink element lost its file descriptor");

    assert_eq!(
        h.notifier.statuses("out-1"),
        vec![
            SessionStatus::Ready { info: Some(target) },
            SessionStatus::failed("transport fatal error: sink element lost its file descriptor"),
        ]
    );
    assert_eq!(h.agent.connection_state("out-1"), ConnectionState::Active);
    assert_eq!(h.notifier.all()[1].controller, controller());
}

#[tokio::test]
async fn test_internal_publish_requires_created_endpoint() {
    let h = Harness::new();

    let err = h
        .agent
        .publish("pipe-1", controller(), PublishOptions::Internal(peer()))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::TransportCreationFailed(_)));
    assert_eq!(h.agent.connection_state("pipe-1"), ConnectionState::Absent);

    let info = h
        .agent
        .create_internal_connection("pipe-1", Direction::In, InternalPipeOptions::default())
        .await
        .unwrap();
    assert_eq!(info.ip, loopback());
    assert_eq!(info.port, 9000);

    h.agent
        .publish("pipe-1", controller(), PublishOptions::Internal(peer()))
        .await
        .unwrap();
    let endpoint = h.endpoints.opened.lock().unwrap()[0].clone();
    assert_eq!(*endpoint.connected.lock().unwrap(), Some(peer()));
}

#[tokio::test]
async fn test_internal_subscribe_uses_outbound_endpoint() {
    let h = Harness::new();
    h.agent
        .create_internal_connection("pipe-1", Direction::In, InternalPipeOptions::default())
        .await
        .unwrap();

    let err = h
        .agent
        .subscribe("pipe-1", controller(), SubscribeOptions::Internal(peer()))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::TransportCreationFailed(_)));

    h.agent
        .create_internal_connection("pipe-1", Direction::Out, InternalPipeOptions::default())
        .await
        .unwrap();
    h.agent
        .subscribe("pipe-1", controller(), SubscribeOptions::Internal(peer()))
        .await
        .unwrap();
    assert_eq!(h.agent.get_connection("pipe-1").unwrap().port, Some(9001));
}

#[tokio::test]
async fn test_internal_port_released_is_reused() {
    let h = Harness::new();
    let options = InternalPipeOptions::default();

    for id in ["a", "b", "c"] {
        h.agent
            .create_internal_connection(id, Direction::In, options)
            .await
            .unwrap();
    }
    assert!(matches!(
        h.agent
            .create_internal_connection("d", Direction::In, options)
            .await
            .unwrap_err(),
        DomainError::PortExhausted { min: 9000, max: 9002 }
    ));

    h.agent
        .destroy_internal_connection("b", Direction::In)
        .await
        .unwrap();
    let info = h
        .agent
        .create_internal_connection("d", Direction::In, options)
        .await
        .unwrap();
    assert_eq!(info.port, 9001);
}

#[tokio::test]
async fn test_linkup_and_cutoff() {
    let h = Harness::new();
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.ts");

    h.agent.publish("cam", controller(), rtsp_source()).await.unwrap();
    h.agent
        .subscribe("out", controller(), file_sink(target.to_str().unwrap()))
        .await
        .unwrap();

    assert!(matches!(
        h.agent.linkup("cam", None, Some("out")).await.unwrap_err(),
        DomainError::InvalidLink(_)
    ));
    h.agent.linkup("out", None, Some("cam")).await.unwrap();
    let feed = h.agent.get_connection("out").unwrap().feed;
    assert_eq!(feed.video_from.as_deref(), Some("cam"));
    assert!(feed.audio_from.is_none());

    h.agent.cutoff("out").await.unwrap();
    assert!(h.agent.get_connection("out").unwrap().feed.is_empty());

    h.agent.linkup("out", Some("cam"), None).await.unwrap();
    h.agent.unpublish("cam").await.unwrap();
    assert!(h.agent.get_connection("out").unwrap().feed.is_empty());
}

#[tokio::test]
async fn test_invalid_connection_type_is_rejected_without_mutation() {
    let h = Harness::new();

    let err = PublishOptions::from_json("webrtc", json!({"connection": {}})).unwrap_err();
    assert_eq!(err, DomainError::InvalidConnectionType("webrtc".to_string()));
    let err = SubscribeOptions::from_json("", json!({})).unwrap_err();
    assert!(matches!(err, DomainError::InvalidConnectionType(_)));

    assert_eq!(h.agent.connection_count(), 0);
    assert!(h.transports.ingress_urls().is_empty());
}
