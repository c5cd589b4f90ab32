#![cfg(unix)]

mod harness;

use std::time::{Duration, Instant};

use harness::{reference_parameters, Behavior, FakeDaemon};
use model_bootstrap::{BootstrapError, Orchestrator, Phase, Shutdown};

const REFERENCE_MODELFILE: &str = "FROM llama3:8b\nPARAMETER temperature 0.3\nPARAMETER num_ctx 4096\n";

#[tokio::test]
async fn registers_model_then_exits_with_daemon_code() {
    let daemon = FakeDaemon::new(Behavior::default().not_ready_for(2));
    let orchestrator = Orchestrator::new(reference_parameters(), daemon.settings(), Shutdown::new());
    let board = orchestrator.status_board();

    let code = orchestrator.run().await.expect("bootstrap succeeds");

    // the fake daemon exits 1 once the model is created
    assert_eq!(code, 1);
    assert_eq!(daemon.list_calls(), 3);
    assert_eq!(
        std::fs::read_to_string(daemon.modelfile_path()).unwrap(),
        REFERENCE_MODELFILE
    );
    assert_eq!(daemon.state("created-custom-model").unwrap(), REFERENCE_MODELFILE);

    let status = board.snapshot().await;
    assert_eq!(status.phase, Phase::Terminated);
    assert_eq!(status.ready_attempts, 3);
    assert!(status.registered);
    assert_eq!(status.exit_code, Some(1));
}

#[tokio::test]
async fn configured_model_name_is_used() {
    let daemon = FakeDaemon::new(Behavior::default());
    let mut settings = daemon.settings();
    settings.model_name = "research-model".to_string();

    Orchestrator::new(reference_parameters(), settings, Shutdown::new())
        .run()
        .await
        .unwrap();

    let calls = daemon.state("create-calls").unwrap();
    assert!(calls.starts_with("research-model -f "), "create called with: {calls}");
    assert!(daemon.state("created-research-model").is_some());
}

#[tokio::test]
async fn never_ready_fails_with_daemon_not_ready() {
    let daemon = FakeDaemon::new(Behavior {
        serve: "exec sleep 30".to_string(),
        list: "exit 1".to_string(),
        ..Behavior::default()
    });
    let mut settings = daemon.settings();
    settings.ready_timeout = Duration::from_millis(300);
    let orchestrator = Orchestrator::new(reference_parameters(), settings, Shutdown::new());
    let board = orchestrator.status_board();

    let started = Instant::now();
    let err = orchestrator.run().await.unwrap_err();

    assert!(matches!(err, BootstrapError::DaemonNotReady { .. }), "got {err:?}");
    assert_eq!(err.exit_code(), 1);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(daemon.state("create-calls").is_none());
    assert!(!daemon.modelfile_path().exists());
    assert_eq!(board.snapshot().await.phase, Phase::Terminated);
}

#[tokio::test]
async fn daemon_dying_during_startup_is_launch_failure() {
    let daemon = FakeDaemon::new(Behavior {
        serve: "echo 'Error: listen tcp 127.0.0.1:11434: bind: address already in use' >&2\nexit 3"
            .to_string(),
        list: "exit 1".to_string(),
        ..Behavior::default()
    });

    let err = Orchestrator::new(reference_parameters(), daemon.settings(), Shutdown::new())
        .run()
        .await
        .unwrap_err();

    match err {
        BootstrapError::DaemonLaunchFailed(detail) => assert!(detail.contains("code 3"), "{detail}"),
        other => panic!("expected DaemonLaunchFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_daemon_binary_is_launch_failure() {
    let daemon = FakeDaemon::new(Behavior::default());
    let mut settings = daemon.settings();
    settings.daemon = model_bootstrap::DaemonCommand::new(daemon.path().join("no-such-daemon"));

    let err = Orchestrator::new(reference_parameters(), settings, Shutdown::new())
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, BootstrapError::DaemonLaunchFailed(_)));
}

#[tokio::test]
async fn rejected_registration_stops_daemon_and_fails() {
    let daemon = FakeDaemon::new(Behavior {
        serve: "exec sleep 30".to_string(),
        create: "echo 'Error: pull model manifest: file does not exist' >&2\nexit 1".to_string(),
        ..Behavior::default()
    });
    let orchestrator = Orchestrator::new(reference_parameters(), daemon.settings(), Shutdown::new());
    let board = orchestrator.status_board();

    let started = Instant::now();
    let err = orchestrator.run().await.unwrap_err();

    match &err {
        BootstrapError::ModelRegistrationFailed { model, diagnostics } => {
            assert_eq!(model, "custom-model");
            assert!(diagnostics.contains("file does not exist"), "{diagnostics}");
        }
        other => panic!("expected ModelRegistrationFailed, got {other:?}"),
    }
    // daemon was SIGTERMed, not waited out
    assert!(started.elapsed() < Duration::from_secs(20));
    let status = board.snapshot().await;
    assert!(!status.registered);
    assert_eq!(status.exit_code, Some(1));
}

#[tokio::test]
async fn keep_serving_after_rejected_registration() {
    let daemon = FakeDaemon::new(Behavior {
        serve: "while [ ! -f \"$STATE/create-calls\" ]; do sleep 0.05; done\nexit 0".to_string(),
        create: "echo 'Error: invalid model name' >&2\nexit 1".to_string(),
        ..Behavior::default()
    });
    let mut settings = daemon.settings();
    settings.keep_serving_on_registration_failure = true;
    let orchestrator = Orchestrator::new(reference_parameters(), settings, Shutdown::new());
    let board = orchestrator.status_board();

    let code = orchestrator.run().await.expect("supervision continues");

    assert_eq!(code, 0);
    assert!(!board.snapshot().await.registered);
}

#[tokio::test]
async fn shutdown_signal_during_supervision_stops_daemon() {
    let daemon = FakeDaemon::new(Behavior {
        serve: "exec sleep 30".to_string(),
        ..Behavior::default()
    });
    let shutdown = Shutdown::new();
    let orchestrator = Orchestrator::new(reference_parameters(), daemon.settings(), shutdown.clone());
    let board = orchestrator.status_board();
    let run = tokio::spawn(orchestrator.run());

    let deadline = Instant::now() + Duration::from_secs(10);
    while board.snapshot().await.phase != Phase::Supervising {
        assert!(Instant::now() < deadline, "never reached SUPERVISING");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    shutdown.trigger(Some(15));

    let err = run.await.unwrap().unwrap_err();
    assert!(matches!(err, BootstrapError::SupervisorInterrupted { signal: Some(15) }));
    assert_eq!(err.exit_code(), 143);
    assert_eq!(board.snapshot().await.phase, Phase::Terminated);
}

#[tokio::test]
async fn shutdown_while_polling_is_interrupt() {
    let daemon = FakeDaemon::new(Behavior {
        serve: "exec sleep 30".to_string(),
        list: "exit 1".to_string(),
        ..Behavior::default()
    });
    let shutdown = Shutdown::new();
    let orchestrator = Orchestrator::new(reference_parameters(), daemon.settings(), shutdown.clone());
    let run = tokio::spawn(orchestrator.run());

    tokio::time::sleep(Duration::from_millis(150)).await;
    shutdown.trigger(Some(2));

    let err = run.await.unwrap().unwrap_err();
    assert!(matches!(err, BootstrapError::SupervisorInterrupted { signal: Some(2) }));
    assert_eq!(err.exit_code(), 130);
}

#[tokio::test]
async fn shutdown_while_registering_does_not_wait_for_create() {
    let daemon = FakeDaemon::new(Behavior {
        serve: "exec sleep 30".to_string(),
        create: "exec sleep 30".to_string(),
        ..Behavior::default()
    });
    let shutdown = Shutdown::new();
    let orchestrator = Orchestrator::new(reference_parameters(), daemon.settings(), shutdown.clone());
    let board = orchestrator.status_board();
    let run = tokio::spawn(orchestrator.run());

    let deadline = Instant::now() + Duration::from_secs(10);
    while board.snapshot().await.phase != Phase::Registering {
        assert!(Instant::now() < deadline, "never reached REGISTERING");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    shutdown.trigger(Some(15));

    let err = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("create still blocking shutdown")
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, BootstrapError::SupervisorInterrupted { signal: Some(15) }));
    assert_eq!(err.exit_code(), 143);
    assert_eq!(board.snapshot().await.phase, Phase::Terminated);
    assert!(!board.snapshot().await.registered);
}
