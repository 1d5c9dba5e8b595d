use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{categories, transactions, transfers, user, wallets};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
}

async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Email.eq(auth_header.username().to_ascii_lowercase()))
        .filter(user::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/wallets", get(wallets::list).post(wallets::create))
        .route(
            "/wallets/{id}",
            get(wallets::get)
                .patch(wallets::update)
                .delete(wallets::delete),
        )
        .route("/wallets/reorder", post(wallets::reorder))
        .route("/wallets/recalculate", post(wallets::recalculate))
        .route(
            "/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route(
            "/transactions/{id}",
            get(transactions::get)
                .patch(transactions::update)
                .delete(transactions::delete),
        )
        .route("/transfers", post(transfers::create))
        .route(
            "/transfers/{id}",
            patch(transfers::update).delete(transfers::delete),
        )
        .route(
            "/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/categories/{id}",
            patch(categories::update).delete(categories::delete),
        )
        .route("/categories/apply", post(categories::apply_suggestions))
        .route("/user/profile", get(user::profile))
        .route("/user/preferences", patch(user::update_preferences))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .route("/signup", post(user::signup))
        .with_state(state)
}

pub async fn run(engine: Engine, db: DatabaseConnection) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, db, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request as HttpRequest, header};
    use base64::Engine as _;
    use http_body_util::BodyExt;
    use migration::MigratorTrait;
    use sea_orm::Database;
    use tower::ServiceExt;

    async fn app() -> Router {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Engine::builder().database(db.clone()).build();
        router(ServerState {
            engine: Arc::new(engine),
            db,
        })
    }

    fn basic(email: &str, password: &str) -> String {
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{email}:{password}"));
        format!("Basic {encoded}")
    }

    async fn signup(app: &Router, email: &str, password: &str) {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "currency": "EUR",
        });
        let response = app
            .clone()
            .oneshot(
                HttpRequest::post("/signup")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn signup_then_list_wallets() {
        let app = app().await;
        signup(&app, "alice@example.com", "password").await;

        let response = app
            .clone()
            .oneshot(
                HttpRequest::get("/wallets")
                    .header(header::AUTHORIZATION, basic("alice@example.com", "password"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let wallets = json["wallets"].as_array().unwrap();
        assert_eq!(wallets.len(), 1);
        assert_eq!(wallets[0]["name"], "Cash");
        assert_eq!(wallets[0]["balance_minor"], 0);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let app = app().await;
        signup(&app, "alice@example.com", "password").await;

        let response = app
            .clone()
            .oneshot(
                HttpRequest::get("/wallets")
                    .header(header::AUTHORIZATION, basic("alice@example.com", "nope"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn transaction_lifecycle_over_http() {
        let app = app().await;
        signup(&app, "alice@example.com", "password").await;
        let auth = basic("alice@example.com", "password");

        let response = app
            .clone()
            .oneshot(
                HttpRequest::get("/wallets")
                    .header(header::AUTHORIZATION, auth.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let wallet_id = json["wallets"][0]["id"].as_str().unwrap().to_string();

        let body = serde_json::json!({
            "wallet_id": wallet_id,
            "kind": "expense",
            "amount_minor": 1250,
            "occurred_at": "2026-08-01T12:00:00+00:00",
        });
        let response = app
            .clone()
            .oneshot(
                HttpRequest::post("/transactions")
                    .header(header::AUTHORIZATION, auth.clone())
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .clone()
            .oneshot(
                HttpRequest::get("/wallets")
                    .header(header::AUTHORIZATION, auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["wallets"][0]["balance_minor"], -1250);
    }

    #[tokio::test]
    async fn missing_wallet_maps_to_not_found() {
        let app = app().await;
        signup(&app, "alice@example.com", "password").await;

        let response = app
            .clone()
            .oneshot(
                HttpRequest::get(format!("/wallets/{}", uuid::Uuid::new_v4()))
                    .header(header::AUTHORIZATION, basic("alice@example.com", "password"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
