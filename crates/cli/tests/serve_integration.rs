//! Integration tests for the `chamados serve` HTTP API.
//!
//! Each test starts the server as a child process on a unique port,
//! makes HTTP requests over a raw socket, and verifies the responses.

use std::io::Read;
use std::net::TcpStream;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use serde_json::{json, Value};

/// Base port is derived from the process ID so separate test binaries
/// don't collide on the same range.
static NEXT_PORT: AtomicU16 = AtomicU16::new(0);
static PORT_INIT: std::sync::Once = std::sync::Once::new();

fn next_port() -> u16 {
    PORT_INIT.call_once(|| {
        let base = 20000 + (std::process::id() as u16 % 20000);
        NEXT_PORT.store(base, Ordering::SeqCst);
    });
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

/// Kills the server when a test ends, pass or fail.
struct Server {
    child: Child,
    port: u16,
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn start_server(extra_args: &[&str]) -> Server {
    let port = next_port();
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_chamados"));
    cmd.args(["serve", "--host", "127.0.0.1", "--port"])
        .arg(port.to_string())
        .args(extra_args)
        .env_remove("CHAMADOS_CONFIG")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null());

    let child = cmd.spawn().expect("failed to start chamados serve");
    for _ in 0..50 {
        if TcpStream::connect(("127.0.0.1", port)).is_ok() {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    Server { child, port }
}

/// Send one request with `Connection: close` and return (status, headers, body).
fn http_request(
    port: u16,
    method: &str,
    path: &str,
    body: Option<&Value>,
    extra_headers: &[(&str, &str)],
) -> (u16, String, String) {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).expect("failed to connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();

    let mut header_lines = String::new();
    for (name, value) in extra_headers {
        header_lines.push_str(&format!("{}: {}\r\n", name, value));
    }
    let payload = body.map(|b| b.to_string()).unwrap_or_default();
    if body.is_some() {
        header_lines.push_str("Content-Type: application/json\r\n");
    }

    let request = format!(
        "{} {} HTTP/1.1\r\nHost: localhost:{}\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        method,
        path,
        port,
        header_lines,
        payload.len(),
        payload
    );
    std::io::Write::write_all(&mut stream, request.as_bytes()).expect("failed to write");

    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);
    parse_http_response_full(&response)
}

fn http_json(port: u16, method: &str, path: &str, body: Option<Value>) -> (u16, Value) {
    let (status, _, body) = http_request(port, method, path, body.as_ref(), &[]);
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&body).unwrap_or_else(|e| panic!("bad JSON ({e}): {body}"))
    };
    (status, json)
}

fn extract_header<'a>(headers: &'a str, name: &str) -> Option<&'a str> {
    headers.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim())
    })
}

/// Parse an HTTP response into (status_code, headers_string, body).
fn parse_http_response_full(response: &str) -> (u16, String, String) {
    let (headers, body) = response.split_once("\r\n\r\n").unwrap_or((response, ""));

    let status = headers
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);

    let body = match extract_header(headers, "transfer-encoding") {
        Some(te) if te.eq_ignore_ascii_case("chunked") => decode_chunked(body),
        _ => body.to_string(),
    };

    (status, headers.to_string(), body)
}

fn decode_chunked(data: &str) -> String {
    let mut result = String::new();
    let mut remaining = data;

    while let Some(line_end) = remaining.find("\r\n") {
        let size = match usize::from_str_radix(remaining[..line_end].trim(), 16) {
            Ok(s) => s,
            Err(_) => break,
        };
        if size == 0 {
            break;
        }
        let chunk_start = line_end + 2;
        let chunk_end = chunk_start + size;
        if chunk_end > remaining.len() {
            result.push_str(&remaining[chunk_start..]);
            break;
        }
        result.push_str(&remaining[chunk_start..chunk_end]);
        remaining = remaining.get(chunk_end + 2..).unwrap_or("");
    }

    result
}

fn ticket_body(titulo: &str) -> Value {
    json!({
        "titulo": titulo,
        "problemaDescricao": "Tela de login não carrega",
        "sistema": "Portal",
        "naoConsegue": "Entrar no portal",
        "replicacao": "Abrir o portal no Chrome",
        "frequencia": "Às vezes",
        "impedimento": "Atendimento parado",
        "criticidade": "C1",
        "solicitanteNome": "William",
        "solicitanteSobrenome": "Santana",
    })
}

#[test]
fn health_returns_200_with_version() {
    let server = start_server(&[]);
    let (status, body) = http_json(server.port, "GET", "/health", None);
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn tickets_are_numbered_in_creation_order() {
    let server = start_server(&[]);
    for (i, titulo) in ["Login", "Relatório", "Impressora"].iter().enumerate() {
        let (status, ticket) = http_json(
            server.port,
            "POST",
            "/api/tickets",
            Some(ticket_body(titulo)),
        );
        assert_eq!(status, 200, "{ticket}");
        assert_eq!(ticket["ticketNumber"], (i + 1) as u64);
    }
    let (status, list) = http_json(server.port, "GET", "/api/tickets", None);
    assert_eq!(status, 200);
    let numbers: Vec<u64> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["ticketNumber"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, vec![1, 2, 3]);
}

#[test]
fn ticket_lifecycle_over_http() {
    let server = start_server(&[]);
    let port = server.port;
    let (_, ticket) = http_json(port, "POST", "/api/tickets", Some(ticket_body("Login")));
    let id = ticket["id"].as_str().unwrap().to_string();

    let (status, _) = http_json(
        port,
        "PATCH",
        &format!("/api/tickets/{id}/priority"),
        Some(json!({"prioridade": "Urgente", "author": "Raildo"})),
    );
    assert_eq!(status, 200);

    let (status, _) = http_json(
        port,
        "POST",
        &format!("/api/tickets/{id}/comments"),
        Some(json!({"author": "William Santana", "content": "Ainda acontece"})),
    );
    assert_eq!(status, 200);

    let (status, done) = http_json(
        port,
        "PATCH",
        &format!("/api/tickets/{id}/status"),
        Some(json!({"status": "Finalizados", "author": "Raildo"})),
    );
    assert_eq!(status, 200);
    assert!(done["finalizadoEm"].is_string());

    let (status, archived) = http_json(port, "POST", &format!("/api/tickets/{id}/archive"), None);
    assert_eq!(status, 200);
    assert_eq!(archived["arquivado"], true);

    let (_, active) = http_json(port, "GET", "/api/tickets", None);
    assert_eq!(active, json!([]));
    let (_, archived_list) = http_json(port, "GET", "/api/tickets-archived", None);
    assert_eq!(archived_list.as_array().unwrap().len(), 1);

    let (_, history) = http_json(port, "GET", &format!("/api/tickets/{id}/history"), None);
    let actions: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(
        actions,
        vec![
            "ticket_archived",
            "status_changed",
            "comment_added",
            "priority_changed"
        ]
    );
}

#[test]
fn unknown_ticket_returns_fixed_404() {
    let server = start_server(&[]);
    let (status, body) = http_json(server.port, "GET", "/api/tickets/missing", None);
    assert_eq!(status, 404);
    assert_eq!(body, json!({"error": "Ticket not found"}));
}

#[test]
fn malformed_json_is_400() {
    let server = start_server(&[]);
    let port = server.port;
    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let payload = "{\"titulo\": ";
    let request = format!(
        "POST /api/tickets HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        payload.len(),
        payload
    );
    std::io::Write::write_all(&mut stream, request.as_bytes()).unwrap();
    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);
    let (status, _, body) = parse_http_response_full(&response);
    assert_eq!(status, 400);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert!(body["error"].is_string());
}

#[test]
fn delete_without_body_is_accepted() {
    let server = start_server(&[]);
    let port = server.port;
    let (_, ticket) = http_json(port, "POST", "/api/tickets", Some(ticket_body("Login")));
    let id = ticket["id"].as_str().unwrap();
    http_json(
        port,
        "POST",
        &format!("/api/tickets/{id}/etiquetas"),
        Some(json!({"etiqueta": "portal"})),
    );
    let (status, updated) = http_json(
        port,
        "DELETE",
        &format!("/api/tickets/{id}/etiquetas/portal"),
        None,
    );
    assert_eq!(status, 200);
    assert_eq!(updated["etiquetas"], json!([]));
}

#[test]
fn share_link_honors_forwarded_proto() {
    let server = start_server(&[]);
    let port = server.port;
    let (_, ticket) = http_json(port, "POST", "/api/tickets", Some(ticket_body("Login")));
    let id = ticket["id"].as_str().unwrap();
    let (status, _, body) = http_request(
        port,
        "GET",
        &format!("/api/tickets/{id}/share"),
        None,
        &[("X-Forwarded-Proto", "https")],
    );
    assert_eq!(status, 200);
    let link: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(
        link["shareUrl"],
        format!("https://localhost:{port}/kanban?ticket={id}")
    );
}

#[test]
fn cors_preflight_allows_patch() {
    let server = start_server(&[]);
    let (status, headers, _) = http_request(
        server.port,
        "OPTIONS",
        "/api/tickets/abc/status",
        None,
        &[
            ("Origin", "http://board.example"),
            ("Access-Control-Request-Method", "PATCH"),
        ],
    );
    assert_eq!(status, 200);
    let allowed = extract_header(&headers, "access-control-allow-methods").unwrap_or("");
    assert!(allowed.contains("PATCH"), "{headers}");
    assert_eq!(
        extract_header(&headers, "access-control-allow-origin"),
        Some("*")
    );
}

#[test]
fn unmatched_route_returns_json_404() {
    let server = start_server(&[]);
    let (status, body) = http_json(server.port, "GET", "/nowhere", None);
    assert_eq!(status, 404);
    assert_eq!(body["error"], "not found");
}

#[test]
fn config_file_retention_is_accepted() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("chamados.toml");
    std::fs::write(
        &path,
        "[archive]\nretention_days = 30\nsweep_interval_secs = 60\n",
    )
    .unwrap();
    let server = start_server(&["--config", path.to_str().unwrap()]);
    let (status, _) = http_json(server.port, "GET", "/health", None);
    assert_eq!(status, 200);
}
