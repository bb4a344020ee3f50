use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use chrono::Duration;

use fraudwatch::{
    client::{
        ApiError, HttpReadAccessApi, MemoryStorage, ReadAccessApi, SessionController,
        SessionState,
    },
    clock::{ManualClock, SystemClock},
    config::{auth::JwtService, routes::routes},
    state::AppState,
    store::MemoryStore,
};

#[actix_web::test]
async fn test_session_against_live_server() {
    let state = web::Data::new(AppState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(SystemClock),
        JwtService::new("test-secret", 60),
    ));
    state
        .otp_service
        .create(Some("123456".into()), Some("Lahore".into()))
        .await
        .unwrap();

    let data = state.clone();
    let server = HttpServer::new(move || App::new().app_data(data.clone()).configure(routes))
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    let api = Arc::new(HttpReadAccessApi::new(format!("http://{addr}")));

    assert!(matches!(
        api.validate_otp("654321").await,
        Err(ApiError::Unauthorized(_))
    ));
    assert!(matches!(
        api.update_read_time("123456", -1.0).await,
        Err(ApiError::Rejected(_))
    ));

    let clock = Arc::new(ManualClock::default());
    let mut session = SessionController::new(api.clone(), MemoryStorage::new(), clock.clone());
    assert_eq!(session.submit_otp("123456").await.unwrap(), "Lahore");

    let page = session.fetch_reports(None, 1, 10).await.unwrap();
    assert_eq!(page.city, "Lahore");
    assert_eq!(page.remaining_time, 30.0);

    clock.advance(Duration::minutes(31));
    session.on_hidden();
    session.join_pending_flush().await;
    session.on_visible();
    assert_eq!(session.state(), SessionState::Active);

    match session.fetch_reports(None, 1, 10).await {
        Err(ApiError::TimeLimitExceeded { remaining }) => assert_eq!(remaining, 0.0),
        other => panic!("expected time limit, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Terminated);

    handle.stop(true).await;
}
