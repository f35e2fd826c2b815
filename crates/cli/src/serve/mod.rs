//! `chamados serve` -- HTTP JSON API for the ticket board.
//!
//! Serves the ticket store over `axum` + `tokio`. State is in memory and
//! lost on restart.
//!
//! Endpoints (all JSON):
//! - GET    /health
//! - POST   /api/tickets                         - File a ticket
//! - GET    /api/tickets                         - Active tickets (runs the archival sweep)
//! - GET    /api/tickets/{id}
//! - PATCH  /api/tickets/{id}                    - Generic field patch
//! - PATCH  /api/tickets/{id}/status
//! - PATCH  /api/tickets/{id}/priority
//! - PATCH  /api/tickets/{id}/assignee
//! - PATCH  /api/tickets/{id}/evidencias
//! - POST   /api/tickets/{id}/etiquetas
//! - DELETE /api/tickets/{id}/etiquetas/{etiqueta}
//! - POST   /api/tickets/{id}/seguir
//! - DELETE /api/tickets/{id}/seguir/{seguidor}
//! - GET    /api/tickets/{id}/share              - Deep link into the board
//! - POST   /api/tickets/{id}/archive
//! - GET    /api/tickets-archived
//! - POST   /api/tickets/{id}/comments
//! - GET    /api/tickets/{id}/comments
//! - GET    /api/tickets/{id}/history            - Newest first

mod error;
mod handlers;
mod middleware;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post};
use axum::{middleware as axum_middleware, Json, Router};
use chamados_storage::{ArchivePolicy, MemoryStorage, TicketStorage};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::cors::{Any, CorsLayer};

use self::handlers::{
    handle_add_comment, handle_add_etiqueta, handle_add_seguidor, handle_archive,
    handle_create_ticket, handle_get_ticket, handle_health, handle_list_archived,
    handle_list_comments, handle_list_history, handle_list_tickets, handle_not_found,
    handle_remove_etiqueta, handle_remove_seguidor, handle_share, handle_update_assignee,
    handle_update_evidencias, handle_update_fields, handle_update_priority, handle_update_status,
};
use self::middleware::trace_requests;
use self::state::AppState;
use crate::config::ServeConfig;

/// Maximum request body size: 1 MB.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// How long HTTPS connections get to finish after a shutdown signal.
#[cfg(feature = "tls")]
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Build the application router around a shared store.
pub(crate) fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    let api = Router::new()
        .route(
            "/tickets",
            get(handle_list_tickets).post(handle_create_ticket),
        )
        .route(
            "/tickets/{id}",
            get(handle_get_ticket).patch(handle_update_fields),
        )
        .route("/tickets/{id}/status", patch(handle_update_status))
        .route("/tickets/{id}/priority", patch(handle_update_priority))
        .route("/tickets/{id}/assignee", patch(handle_update_assignee))
        .route("/tickets/{id}/evidencias", patch(handle_update_evidencias))
        .route("/tickets/{id}/etiquetas", post(handle_add_etiqueta))
        .route(
            "/tickets/{id}/etiquetas/{etiqueta}",
            delete(handle_remove_etiqueta),
        )
        .route("/tickets/{id}/seguir", post(handle_add_seguidor))
        .route(
            "/tickets/{id}/seguir/{seguidor}",
            delete(handle_remove_seguidor),
        )
        .route("/tickets/{id}/share", get(handle_share))
        .route("/tickets/{id}/archive", post(handle_archive))
        .route(
            "/tickets/{id}/comments",
            get(handle_list_comments).post(handle_add_comment),
        )
        .route("/tickets/{id}/history", get(handle_list_history))
        .route("/tickets-archived", get(handle_list_archived));

    Router::new()
        .route("/health", get(handle_health))
        .nest("/api", api)
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn(trace_requests))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Start the HTTP server and run until a shutdown signal arrives.
///
/// When TLS cert/key paths are configured, the server listens over HTTPS
/// using `axum-server` with rustls (requires the `tls` feature). Either way
/// in-flight requests drain on SIGINT/SIGTERM before the background sweeper
/// is stopped.
pub async fn start_server(config: ServeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let memory = MemoryStorage::new().with_policy(ArchivePolicy::new(config.retention));
    let retention_days = memory.policy().retention().whole_days();
    let store: Arc<dyn TicketStorage> = Arc::new(memory);

    let sweeper = config
        .sweep_interval
        .map(|every| spawn_sweeper(store.clone(), every));

    let app = build_router(Arc::new(AppState::new(store)));
    let addr = config.addr();

    let served = match &config.tls {
        Some((cert_path, key_path)) => {
            serve_tls(app, &addr, cert_path, key_path, retention_days).await
        }
        None => serve_plain(app, &addr, retention_days).await,
    };

    if let Some(handle) = sweeper {
        handle.abort();
    }
    served?;
    tracing::info!("server shut down");
    Ok(())
}

async fn serve_plain(
    app: Router,
    addr: &str,
    retention_days: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, retention_days, "chamados listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[cfg(feature = "tls")]
async fn serve_tls(
    app: Router,
    addr: &str,
    cert_path: &std::path::Path,
    key_path: &std::path::Path,
    retention_days: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert_path, key_path).await?;
    let socket_addr: std::net::SocketAddr = addr.parse()?;

    let handle = axum_server::Handle::new();
    let signal_handle = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    tracing::info!(%addr, retention_days, "chamados listening on https://{addr}");
    axum_server::bind_rustls(socket_addr, tls)
        .handle(handle)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

#[cfg(not(feature = "tls"))]
async fn serve_tls(
    _app: Router,
    _addr: &str,
    _cert_path: &std::path::Path,
    _key_path: &std::path::Path,
    _retention_days: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    Err("TLS requires chamados to be built with the `tls` feature".into())
}

/// Periodically archive stale tickets even when nobody lists the board.
/// Listing stays authoritative; this only keeps the archive current.
fn spawn_sweeper(store: Arc<dyn TicketStorage>, every: Duration) -> JoinHandle<()> {
    tracing::info!(interval_secs = every.as_secs(), "background archive sweep enabled");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match store.sweep_archive().await {
                Ok(0) => {}
                Ok(archived) => tracing::info!(archived, "background archive sweep"),
                Err(e) => tracing::warn!(error = %e, "background archive sweep failed"),
            }
        }
    })
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not register SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use chamados_storage::ManualClock;
    use serde_json::{json, Value};
    use time::macros::datetime;
    use tower::ServiceExt;

    fn test_app() -> (Router, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(datetime!(2026-03-02 08:30 UTC)));
        let store: Arc<dyn TicketStorage> = Arc::new(MemoryStorage::with_clock(clock.clone()));
        (build_router(Arc::new(AppState::new(store))), clock)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::HOST, "board.local:8080");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let body = match body {
            Some(v) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        send(app, Method::GET, uri, None, &[]).await
    }

    fn ticket_body() -> Value {
        json!({
            "titulo": "Nota fiscal não emite",
            "problemaDescricao": "Erro 500 ao emitir nota",
            "sistema": "Faturamento",
            "naoConsegue": "Emitir nota fiscal",
            "replicacao": "Vendas > Faturar > Emitir",
            "frequencia": "Frequentemente",
            "impedimento": "Cliente sem nota",
            "criticidade": "C1",
            "solicitanteNome": "Vitoria",
            "solicitanteSobrenome": "Regina",
        })
    }

    async fn create(app: &Router) -> Value {
        let (status, ticket) = send(app, Method::POST, "/api/tickets", Some(ticket_body()), &[]).await;
        assert_eq!(status, StatusCode::OK, "{ticket}");
        ticket
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _) = test_app();
        let (status, body) = get_json(&app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body.get("version").is_some());
    }

    #[tokio::test]
    async fn created_ticket_carries_server_defaults() {
        let (app, _) = test_app();
        let ticket = create(&app).await;
        assert_eq!(ticket["ticketNumber"], 1);
        assert_eq!(ticket["status"], "Chamados abertos");
        assert_eq!(ticket["prioridade"], "Média");
        assert_eq!(ticket["categoria"], "Melhoria");
        assert_eq!(ticket["responsavel"], Value::Null);
        assert_eq!(ticket["etiquetas"], json!([]));
        assert_eq!(ticket["seguidores"], json!([]));
        assert_eq!(ticket["arquivado"], false);
        assert_eq!(ticket["finalizadoEm"], Value::Null);
        assert_eq!(ticket["createdAt"], "2026-03-02T08:30:00Z");

        let id = ticket["id"].as_str().unwrap();
        let (status, fetched) = get_json(&app, &format!("/api/tickets/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, ticket);

        let (_, listed) = get_json(&app, "/api/tickets").await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (_, history) = get_json(&app, &format!("/api/tickets/{id}/history")).await;
        assert_eq!(history, json!([]));
    }

    #[tokio::test]
    async fn invalid_creation_payloads_are_400() {
        let (app, _) = test_app();

        let mut missing = ticket_body();
        missing.as_object_mut().unwrap().remove("titulo");
        let (status, body) = send(&app, Method::POST, "/api/tickets", Some(missing), &[]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("titulo"), "{body}");

        let mut blank = ticket_body();
        blank["sistema"] = json!("   ");
        let (status, body) = send(&app, Method::POST, "/api/tickets", Some(blank), &[]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "field 'sistema' is required");

        let mut bad_freq = ticket_body();
        bad_freq["frequencia"] = json!("Sempre");
        let (status, _) = send(&app, Method::POST, "/api/tickets", Some(bad_freq), &[]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::POST, "/api/tickets", None, &[]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, listed) = get_json(&app, "/api/tickets").await;
        assert_eq!(listed, json!([]));
    }

    #[tokio::test]
    async fn server_assigned_fields_in_creation_are_ignored() {
        let (app, _) = test_app();
        let mut body = ticket_body();
        body["status"] = json!("Finalizados");
        body["ticketNumber"] = json!(99);
        let (status, ticket) = send(&app, Method::POST, "/api/tickets", Some(body), &[]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ticket["status"], "Chamados abertos");
        assert_eq!(ticket["ticketNumber"], 1);
    }

    #[tokio::test]
    async fn unknown_ticket_is_404_everywhere() {
        let (app, _) = test_app();
        let not_found = json!({"error": "Ticket not found"});
        let cases = [
            (Method::GET, "/api/tickets/nope", None),
            (
                Method::PATCH,
                "/api/tickets/nope/status",
                Some(json!({"status": "Finalizados"})),
            ),
            (
                Method::PATCH,
                "/api/tickets/nope",
                Some(json!({"titulo": "x"})),
            ),
            (
                Method::POST,
                "/api/tickets/nope/etiquetas",
                Some(json!({"etiqueta": "x"})),
            ),
            (Method::DELETE, "/api/tickets/nope/seguir/ana", None),
            (Method::GET, "/api/tickets/nope/share", None),
            (Method::POST, "/api/tickets/nope/archive", None),
            (
                Method::POST,
                "/api/tickets/nope/comments",
                Some(json!({"author": "Ana", "content": "oi"})),
            ),
            (Method::GET, "/api/tickets/nope/comments", None),
            (Method::GET, "/api/tickets/nope/history", None),
        ];
        for (method, uri, body) in cases {
            let (status, response) = send(&app, method.clone(), uri, body, &[]).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
            assert_eq!(response, not_found, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn finalized_ticket_is_archived_after_sixteen_days() {
        let (app, clock) = test_app();
        let ticket = create(&app).await;
        let id = ticket["id"].as_str().unwrap().to_string();

        let (status, updated) = send(
            &app,
            Method::PATCH,
            &format!("/api/tickets/{id}/status"),
            Some(json!({"status": "Finalizados", "author": "Lucas Dewes"})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "Finalizados");
        assert_eq!(updated["finalizadoEm"], "2026-03-02T08:30:00Z");

        let (_, history) = get_json(&app, &format!("/api/tickets/{id}/history")).await;
        assert_eq!(history[0]["action"], "status_changed");
        assert_eq!(history[0]["field"], "status");
        assert_eq!(history[0]["oldValue"], "Chamados abertos");
        assert_eq!(history[0]["newValue"], "Finalizados");
        assert_eq!(history[0]["author"], "Lucas Dewes");

        clock.advance(time::Duration::days(16));

        let (_, active) = get_json(&app, "/api/tickets").await;
        assert_eq!(active, json!([]));

        let (_, archived) = get_json(&app, "/api/tickets-archived").await;
        let archived = archived.as_array().unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0]["id"], id.as_str());
        assert_eq!(archived[0]["arquivado"], true);
        assert_eq!(archived[0]["arquivadoEm"], "2026-03-18T08:30:00Z");

        let (_, history) = get_json(&app, &format!("/api/tickets/{id}/history")).await;
        assert_eq!(history[0]["action"], "ticket_archived");
        assert_eq!(history[0]["author"], "Sistema");
    }

    #[tokio::test]
    async fn unknown_status_is_rejected() {
        let (app, _) = test_app();
        let ticket = create(&app).await;
        let id = ticket["id"].as_str().unwrap();
        let (status, body) = send(
            &app,
            Method::PATCH,
            &format!("/api/tickets/{id}/status"),
            Some(json!({"status": "Pausado"})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn generic_patch_records_one_entry_per_key() {
        let (app, _) = test_app();
        let ticket = create(&app).await;
        let id = ticket["id"].as_str().unwrap();

        let (status, updated) = send(
            &app,
            Method::PATCH,
            &format!("/api/tickets/{id}"),
            Some(json!({
                "author": "Raildo",
                "titulo": "NF-e não emite",
                "categoria": "Bug",
            })),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["titulo"], "NF-e não emite");
        assert_eq!(updated["categoria"], "Bug");

        let (_, history) = get_json(&app, &format!("/api/tickets/{id}/history")).await;
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert!(history
            .iter()
            .all(|e| e["action"] == "field_updated" && e["author"] == "Raildo"));

        let (status, _) = send(
            &app,
            Method::PATCH,
            &format!("/api/tickets/{id}"),
            Some(json!({"status": "Finalizados"})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn assignee_can_be_set_and_cleared() {
        let (app, _) = test_app();
        let ticket = create(&app).await;
        let id = ticket["id"].as_str().unwrap();
        let uri = format!("/api/tickets/{id}/assignee");

        let (_, assigned) = send(
            &app,
            Method::PATCH,
            &uri,
            Some(json!({"responsavel": "Nicolas Souza"})),
            &[],
        )
        .await;
        assert_eq!(assigned["responsavel"], "Nicolas Souza");

        let (_, cleared) = send(
            &app,
            Method::PATCH,
            &uri,
            Some(json!({"responsavel": null, "author": "William Santana"})),
            &[],
        )
        .await;
        assert_eq!(cleared["responsavel"], Value::Null);

        let (_, history) = get_json(&app, &format!("/api/tickets/{id}/history")).await;
        assert_eq!(history[0]["action"], "assignee_changed");
        assert_eq!(history[0]["oldValue"], "Nicolas Souza");
        assert_eq!(history[0]["newValue"], "");
        assert_eq!(history[1]["oldValue"], "");
        assert_eq!(history[1]["author"], "Sistema");
    }

    #[tokio::test]
    async fn labels_and_followers_round_trip() {
        let (app, _) = test_app();
        let ticket = create(&app).await;
        let id = ticket["id"].as_str().unwrap();
        let tags = format!("/api/tickets/{id}/etiquetas");

        for _ in 0..2 {
            let (status, updated) = send(
                &app,
                Method::POST,
                &tags,
                Some(json!({"etiqueta": "fiscal", "author": "Raildo"})),
                &[],
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(updated["etiquetas"], json!(["fiscal"]));
        }
        let (_, history) = get_json(&app, &format!("/api/tickets/{id}/history")).await;
        assert_eq!(history.as_array().unwrap().len(), 1);

        let (status, updated) = send(
            &app,
            Method::DELETE,
            &format!("{tags}/fiscal"),
            None,
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["etiquetas"], json!([]));

        let (status, _) = send(&app, Method::POST, &tags, Some(json!({"etiqueta": " "})), &[]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, followed) = send(
            &app,
            Method::POST,
            &format!("/api/tickets/{id}/seguir"),
            Some(json!({"seguidor": "Joan Reis Santos"})),
            &[],
        )
        .await;
        assert_eq!(followed["seguidores"], json!(["Joan Reis Santos"]));

        let (_, unfollowed) = send(
            &app,
            Method::DELETE,
            &format!("/api/tickets/{id}/seguir/Joan%20Reis%20Santos"),
            Some(json!({"author": "Joan Reis Santos"})),
            &[],
        )
        .await;
        assert_eq!(unfollowed["seguidores"], json!([]));

        let (_, history) = get_json(&app, &format!("/api/tickets/{id}/history")).await;
        assert_eq!(history[0]["field"], "seguidores");
        assert_eq!(history[0]["author"], "Joan Reis Santos");
        assert_eq!(history[2]["field"], "etiquetas");
        assert_eq!(history[2]["author"], "Sistema");
    }

    #[tokio::test]
    async fn evidencias_replace_the_list() {
        let (app, _) = test_app();
        let ticket = create(&app).await;
        let id = ticket["id"].as_str().unwrap();
        let (status, updated) = send(
            &app,
            Method::PATCH,
            &format!("/api/tickets/{id}/evidencias"),
            Some(json!({"evidencias": ["https://files.local/a.png", "https://files.local/b.png"]})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["evidencias"].as_array().unwrap().len(), 2);

        for bad in [
            json!(["", "https://files.local/c.png"]),
            json!(["https://files.local/a,b.png"]),
        ] {
            let (status, body) = send(
                &app,
                Method::PATCH,
                &format!("/api/tickets/{id}/evidencias"),
                Some(json!({"evidencias": bad})),
                &[],
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{bad}");
            assert!(body["error"].as_str().unwrap().contains("evidencias"), "{body}");
        }

        let (_, history) = get_json(&app, &format!("/api/tickets/{id}/history")).await;
        assert_eq!(history.as_array().unwrap().len(), 1);
        assert_eq!(history[0]["action"], "evidencias_updated");
        assert_eq!(history[0]["oldValue"], "");
        assert_eq!(
            history[0]["newValue"],
            "https://files.local/a.png,https://files.local/b.png"
        );
    }

    #[tokio::test]
    async fn share_link_uses_request_host() {
        let (app, _) = test_app();
        let ticket = create(&app).await;
        let id = ticket["id"].as_str().unwrap();
        let uri = format!("/api/tickets/{id}/share");

        let (status, link) = get_json(&app, &uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            link["shareUrl"],
            format!("http://board.local:8080/kanban?ticket={id}")
        );
        assert_eq!(link["ticketNumber"], 1);

        let (_, link) = send(
            &app,
            Method::GET,
            &uri,
            None,
            &[("x-forwarded-proto", "https")],
        )
        .await;
        assert_eq!(
            link["shareUrl"],
            format!("https://board.local:8080/kanban?ticket={id}")
        );
    }

    #[tokio::test]
    async fn manual_archive_needs_a_finalized_ticket() {
        let (app, _) = test_app();
        let ticket = create(&app).await;
        let id = ticket["id"].as_str().unwrap();
        let uri = format!("/api/tickets/{id}/archive");

        let (status, _) = send(&app, Method::POST, &uri, None, &[]).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        send(
            &app,
            Method::PATCH,
            &format!("/api/tickets/{id}/status"),
            Some(json!({"status": "Finalizados"})),
            &[],
        )
        .await;
        let (status, archived) = send(&app, Method::POST, &uri, None, &[]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(archived["arquivado"], true);

        let (_, active) = get_json(&app, "/api/tickets").await;
        assert_eq!(active, json!([]));
    }

    #[tokio::test]
    async fn comments_are_listed_in_order_with_history() {
        let (app, clock) = test_app();
        let ticket = create(&app).await;
        let id = ticket["id"].as_str().unwrap();
        let uri = format!("/api/tickets/{id}/comments");

        let (status, first) = send(
            &app,
            Method::POST,
            &uri,
            Some(json!({"author": "Lucas Dewes", "content": "Qual o número da nota?"})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["ticketId"], id);
        clock.advance(time::Duration::minutes(3));
        send(
            &app,
            Method::POST,
            &uri,
            Some(json!({
                "author": "Vitoria Regina",
                "content": "NF 1234",
                "mentions": ["Lucas Dewes"],
            })),
            &[],
        )
        .await;

        let (_, comments) = get_json(&app, &uri).await;
        let comments = comments.as_array().unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0]["content"], "Qual o número da nota?");
        assert_eq!(comments[1]["mentions"], json!(["Lucas Dewes"]));

        let (_, history) = get_json(&app, &format!("/api/tickets/{id}/history")).await;
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|e| e["action"] == "comment_added"));
        assert_eq!(history[0]["author"], "Vitoria Regina");

        let (status, _) = send(
            &app,
            Method::POST,
            &uri,
            Some(json!({"author": "Ana", "content": ""})),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unmatched_route_is_json_404() {
        let (app, _) = test_app();
        let (status, body) = get_json(&app, "/api/nothing-here").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "not found"}));
    }
}
