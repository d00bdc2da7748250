// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Retry orchestration driven by a scripted transport.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use spinnaker_http::{
    ApiRequest, ApiResponse, AttemptLog, AttemptOutcome, BuildError, ClientError, Method, Result,
    RetryPolicy, ServiceError, Transport, TransportError, build_request, execute_with_retry,
    execute_with_retry_logged,
};

const BASE: &str = "https://gate.example.com";
const UNIT: Duration = Duration::from_millis(10);

/// Transport that replays a fixed list of statuses and counts requests.
struct ScriptedTransport {
    script: Mutex<VecDeque<u16>>,
    calls: AtomicUsize,
}

impl ScriptedTransport {
    fn new(statuses: &[u16]) -> Self {
        Self {
            script: Mutex::new(statuses.iter().copied().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, _request: &ApiRequest) -> Result<ApiResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let status = self.script.lock().unwrap().pop_front().unwrap_or(200);
        if (200..300).contains(&status) {
            return Ok(ApiResponse {
                status,
                body: br#"{"ok":true}"#.to_vec(),
            });
        }
        Err(ClientError::Service(ServiceError {
            status,
            message: format!("rejected with {status}"),
            error: None,
            http_status: status,
            fields: Default::default(),
        }))
    }
}

/// Transport that always fails at the network level.
struct UnreachableTransport {
    calls: AtomicUsize,
}

impl Transport for UnreachableTransport {
    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Network {
            url: request.url.to_string(),
            message: "connection refused".to_string(),
        }
        .into())
    }
}

fn policy() -> RetryPolicy {
    RetryPolicy::default().with_backoff_unit(UNIT)
}

fn factory() -> std::result::Result<ApiRequest, BuildError> {
    build_request::<()>(BASE, Method::Get, "/applications", None)
}

#[test]
fn test_success_on_first_attempt() {
    let transport = ScriptedTransport::new(&[200]);
    let response = execute_with_retry(&transport, &policy(), factory).unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(transport.calls(), 1);
}

#[test]
fn test_two_400s_then_success() {
    let transport = ScriptedTransport::new(&[400, 400, 200]);
    let started = Instant::now();
    let mut log = AttemptLog::new();

    let response = execute_with_retry_logged(&transport, &policy(), factory, &mut log).unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(transport.calls(), 3);
    // 0 + 1 + 4 units waited.
    assert!(started.elapsed() >= UNIT * 5);
    let delays: Vec<Duration> = log.records().iter().map(|r| r.delay).collect();
    assert_eq!(delays, vec![Duration::ZERO, UNIT, UNIT * 4]);
    assert!(matches!(
        log.records()[0].outcome,
        AttemptOutcome::Failed { retryable: true, .. }
    ));
}

#[test]
fn test_non_400_is_returned_immediately() {
    for status in [401, 403, 404, 409, 500, 503] {
        let transport = ScriptedTransport::new(&[status, 200]);
        let err = execute_with_retry(&transport, &policy(), factory).unwrap_err();
        assert_eq!(err.status(), Some(status));
        assert_eq!(transport.calls(), 1, "status {status} must not be retried");
    }
}

#[test]
fn test_network_error_is_not_retried() {
    let transport = UnreachableTransport {
        calls: AtomicUsize::new(0),
    };
    let err = execute_with_retry(&transport, &policy(), factory).unwrap_err();
    assert!(matches!(err, ClientError::Transport(TransportError::Network { .. })));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_exhaustion_returns_last_error() {
    let transport = ScriptedTransport::new(&[400, 400, 400, 400, 400, 200]);
    let mut log = AttemptLog::new();

    let err = execute_with_retry_logged(&transport, &policy(), factory, &mut log).unwrap_err();

    assert_eq!(transport.calls(), 5);
    assert_eq!(err.status(), Some(400));
    assert_eq!(log.attempts(), 5);
    // 0 + 1 + 4 + 9 + 16 units.
    assert_eq!(log.total_delay(), UNIT * 30);
}

#[test]
fn test_lower_attempt_ceiling() {
    let transport = ScriptedTransport::new(&[400, 400, 200]);
    let policy = policy().with_max_attempts(2);
    let err = execute_with_retry(&transport, &policy, factory).unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(transport.calls(), 2);
}

#[test]
fn test_factory_invoked_per_attempt() {
    let transport = ScriptedTransport::new(&[400, 200]);
    let mut built = 0;
    execute_with_retry(&transport, &policy(), || {
        built += 1;
        factory()
    })
    .unwrap();
    assert_eq!(built, 2);
}

#[test]
fn test_factory_failure_aborts() {
    let transport = ScriptedTransport::new(&[400, 400, 200]);
    let mut built = 0;
    let err = execute_with_retry(&transport, &policy(), || {
        built += 1;
        if built == 2 {
            build_request::<()>("not a url", Method::Get, "/applications", None)
        } else {
            factory()
        }
    })
    .unwrap_err();

    assert!(matches!(err, ClientError::Build(BuildError::InvalidUrl { .. })));
    assert_eq!(transport.calls(), 1);
}

#[test]
fn test_concurrent_sequences_are_independent() {
    let transport = ScriptedTransport::new(&[400, 400, 400, 400]);

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| execute_with_retry(&transport, &policy(), factory)))
            .collect();
        for handle in handles {
            let response = handle.join().unwrap().unwrap();
            assert_eq!(response.status, 200);
        }
    });

    // Four rejections shared out between the sequences, plus one success each.
    assert_eq!(transport.calls(), 8);
}
