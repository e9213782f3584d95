//! The HTTP transport: one pipeline per request, emitted before afterware.

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use strata::{Dispatcher, Error, Pipeline, Request, Response, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

mod common;

use common::{After, Journal, Wrap};

async fn start(addr: &'static str, app: Dispatcher) -> (oneshot::Sender<()>, tokio::task::JoinHandle<strata::Result<()>>) {
    common::init_tracing();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        Server::bind(addr)
            .serve_with_shutdown(Arc::new(app), async {
                let _ = stopped.await;
            })
            .await
    });

    for _ in 0..50 {
        if TcpStream::connect(addr).await.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    (stop, server)
}

async fn send(addr: &str, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("server unreachable");
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    String::from_utf8_lossy(&buf).into_owned()
}

#[tokio::test]
async fn serves_the_pipeline_response() {
    const ADDR: &str = "127.0.0.1:28391";
    let journal = Journal::default();
    let app = Dispatcher::new()
        .middle(Wrap::new(1, &journal))
        .after(After { name: "A1", journal: journal.clone() })
        .core(|req: Request, res: Response, _: &Pipeline<'_>| {
            let name = String::from_utf8_lossy(req.body()).into_owned();
            res.with_header("x-method", req.method().as_str())
                .with_body(format!("hello {name}"))
        });

    let (stop, server) = start(ADDR, app).await;

    let raw = send(
        ADDR,
        "POST /greet HTTP/1.1\r\nhost: localhost\r\ncontent-length: 5\r\nconnection: close\r\n\r\nalice",
    )
    .await;

    assert!(raw.starts_with("HTTP/1.1 200 OK"), "{raw}");
    assert!(raw.contains("x-method: POST"), "{raw}");
    assert!(raw.contains("middleware: 1"), "{raw}");
    assert!(raw.ends_with("wrap1{hello alice}wrap1"), "{raw}");

    // afterware finishes on the blocking pool after the response went out
    for _ in 0..50 {
        if journal.contains("after:A1@after:wrap1{hello alice}wrap1") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(journal.contains("after:A1@after:wrap1{hello alice}wrap1"));

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn pipeline_failures_become_500() {
    const ADDR: &str = "127.0.0.1:28392";
    let app = Dispatcher::new()
        .middle_fn(|_, _| Err(Error::ware("backend down")))
        .core(|_: Request, _: Response, _: &Pipeline<'_>| StatusCode::OK);

    let (stop, server) = start(ADDR, app).await;

    let raw = send(ADDR, "GET / HTTP/1.1\r\nhost: localhost\r\nconnection: close\r\n\r\n").await;
    assert!(raw.starts_with("HTTP/1.1 500 Internal Server Error"), "{raw}");

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn bind_failures_surface_as_io_errors() {
    let app = Arc::new(Dispatcher::new());
    let err = Server::bind("not-an-address")
        .serve_with_shutdown(app, async {})
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
