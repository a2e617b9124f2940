use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hibp_checker::{CheckOptions, Checker, Error, LoadOptions, Progress, ResultSink};
use hibp_range_client::{Error as RangeError, HttpRangeClient, Prefix, RangeSource};
use tempfile::NamedTempFile;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Responses keyed by prefix; prefixes listed in `failing` return a 503.
#[derive(Default)]
struct StaticRange {
    bodies: HashMap<&'static str, &'static str>,
    failing: Vec<&'static str>,
    calls: Mutex<Vec<String>>,
}

impl RangeSource for StaticRange {
    async fn query_prefix(&self, prefix: &Prefix) -> Result<String, RangeError> {
        self.calls.lock().unwrap().push(prefix.to_string());
        if self.failing.iter().any(|p| *p == prefix.as_str()) {
            return Err(RangeError::HttpStatus { prefix: prefix.to_string(), status: 503 });
        }
        Ok(self.bodies.get(prefix.as_str()).copied().unwrap_or_default().to_string())
    }
}

#[derive(Default)]
struct FailureLog {
    prefixes: Mutex<Vec<String>>,
}

impl Progress for FailureLog {
    fn query_failed(&self, prefix: &Prefix, _error: &RangeError) {
        self.prefixes.lock().unwrap().push(prefix.to_string());
    }
}

fn input(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file
}

fn options(workers: usize) -> CheckOptions {
    CheckOptions { workers, ..Default::default() }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exposed_accounts_are_streamed_to_output() {
    let file = input(&[
        "account:hash",
        "alice:AAAAA1111122223333444455556666AAAA",
        "bob:bbbbb0000111122223333444455556666",
        "carol:BBBBB0000111122223333444455556666",
        "PC01$:AAAAA1111122223333444455556666AAAA",
        "dave:",
        "erin:CCCCC9999888877776666555544443333",
        "not a record",
    ]);
    let out_dir = tempfile::tempdir().unwrap();
    let out_path = out_dir.path().join("exposed.txt");

    let client = Arc::new(StaticRange {
        bodies: HashMap::from([
            ("AAAAA", "0000000000000000000000000000000:1\r\n1111122223333444455556666AAAA:3\r\n"),
            ("BBBBB", "0000111122223333444455556666:10\r\n"),
            ("CCCCC", "1234123412341234123412341234:2\r\n"),
        ]),
        ..Default::default()
    });
    let sink = Arc::new(ResultSink::create(&out_path).unwrap());
    let options = CheckOptions {
        load: LoadOptions { skip_header: true, ..Default::default() },
        ..options(3)
    };

    let report = Checker::from_arc(client.clone())
        .check_file(file.path(), &options, Arc::clone(&sink))
        .await
        .unwrap();

    assert_eq!(report.records, 6);
    assert_eq!(report.indexed, 4);
    assert_eq!(report.prefixes, 3);
    assert_eq!(report.exposed, 3);
    assert_eq!(report.written, 3);
    assert_eq!(report.pool.completed, 3);
    assert_eq!(client.calls.lock().unwrap().len(), 3);

    let mut written: Vec<String> =
        std::fs::read_to_string(&out_path).unwrap().lines().map(str::to_string).collect();
    written.sort();
    assert_eq!(written, ["alice", "bob", "carol"]);
}

#[tokio::test]
async fn failed_prefix_does_not_abort_run() {
    let file = input(&[
        "alice:AAAAA1111122223333444455556666AAAA",
        "bob:BBBBB0000111122223333444455556666",
    ]);
    let client = StaticRange {
        bodies: HashMap::from([
            ("AAAAA", "1111122223333444455556666AAAA:3"),
            ("BBBBB", "0000111122223333444455556666:10"),
        ]),
        failing: vec!["BBBBB"],
        ..Default::default()
    };
    let failures = Arc::new(FailureLog::default());

    let report = Checker::new(client)
        .with_progress(failures.clone())
        .check_file(file.path(), &options(2), Arc::new(ResultSink::disabled()))
        .await
        .unwrap();

    assert_eq!(report.exposed, 1);
    assert_eq!(report.pool.failed, 1);
    assert_eq!(*failures.prefixes.lock().unwrap(), ["BBBBB"]);
}

#[tokio::test]
async fn limit_truncates_checked_accounts() {
    let file = input(&[
        "alice:AAAAA1111122223333444455556666AAAA",
        "bob:BBBBB0000111122223333444455556666",
    ]);
    let client = StaticRange {
        bodies: HashMap::from([("BBBBB", "0000111122223333444455556666:10")]),
        ..Default::default()
    };
    let options = CheckOptions { load: LoadOptions { limit: Some(1), ..Default::default() }, ..options(2) };

    let report = Checker::new(client)
        .check_file(file.path(), &options, Arc::new(ResultSink::disabled()))
        .await
        .unwrap();

    assert_eq!(report.records, 1);
    assert_eq!(report.exposed, 0);
}

#[tokio::test]
async fn missing_input_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let err = Checker::new(StaticRange::default())
        .check_file(&dir.path().join("missing.txt"), &options(1), Arc::new(ResultSink::disabled()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::OpenInput { .. }), "{err}");
}

/// Minimal range API: `GET /range/<PREFIX>?mode=ntlm`. Prefixes not in
/// `bodies` get a 500. Requests for a prefix in `hanging` are never answered.
async fn serve_range(
    bodies: HashMap<&'static str, &'static str>,
    hanging: &'static [&'static str],
) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let bodies = bodies.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let mut read = 0;
                while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf[read..]).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => read += n,
                    }
                }
                let request = String::from_utf8_lossy(&buf[..read]).to_string();
                let path = request.split_whitespace().nth(1).unwrap_or_default().to_string();
                let prefix = path
                    .strip_prefix("/range/")
                    .and_then(|rest| rest.strip_suffix("?mode=ntlm"))
                    .unwrap_or_default();

                if hanging.iter().any(|p| *p == prefix) {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    return;
                }

                let (status, body) = match bodies.get(prefix) {
                    Some(body) => (200, *body),
                    None => (500, "error"),
                };
                let response = format!(
                    "HTTP/1.1 {status} X\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}/range")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn end_to_end_over_http() {
    let base_url = serve_range(
        HashMap::from([
            ("AAAAA", "1111122223333444455556666AAAA:3\r\nFFFF:1\r\n"),
            ("BBBBB", "0000111122223333444455556666:10\r\n"),
        ]),
        &[],
    )
    .await;
    let file = input(&[
        "alice:aaaaa1111122223333444455556666aaaa",
        "bob:BBBBB0000111122223333444455556666",
        "carol:BBBBB0000111122223333444455556666",
        "erin:DDDDD0000111122223333444455556666",
    ]);
    let client = HttpRangeClient::builder().base_url(base_url).build().unwrap();

    let report = Checker::new(client)
        .check_file(file.path(), &options(4), Arc::new(ResultSink::disabled()))
        .await
        .unwrap();

    assert_eq!(report.prefixes, 3);
    assert_eq!(report.exposed, 3);
    assert_eq!(report.written, 3);
    assert_eq!(report.pool.failed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unresponsive_prefix_times_out_and_is_counted_failed() {
    let base_url = serve_range(
        HashMap::from([
            ("AAAAA", "1111122223333444455556666AAAA:3\r\n"),
            ("CCCCC", "9999888877776666555544443333:2\r\n"),
        ]),
        &["BBBBB"],
    )
    .await;
    let file = input(&[
        "alice:AAAAA1111122223333444455556666AAAA",
        "bob:BBBBB0000111122223333444455556666",
        "erin:CCCCC9999888877776666555544443333",
    ]);
    let client = HttpRangeClient::builder()
        .base_url(base_url)
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap();
    let failures = Arc::new(FailureLog::default());

    let report = tokio::time::timeout(
        Duration::from_secs(10),
        Checker::new(client)
            .with_progress(failures.clone())
            .check_file(file.path(), &options(3), Arc::new(ResultSink::disabled())),
    )
    .await
    .expect("a hanging prefix must not stall the run")
    .unwrap();

    assert_eq!(report.exposed, 2);
    assert_eq!(report.pool.completed, 3);
    assert_eq!(report.pool.failed, 1);
    assert_eq!(*failures.prefixes.lock().unwrap(), ["BBBBB"]);
}
