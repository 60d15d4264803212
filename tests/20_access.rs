mod common;

use std::time::Duration;

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::Utc;
use serde_json::json;
use tower::ServiceExt;

use common::{login, send, spawn_app, PASSWORD, SECRET};
use ward_api::auth::{Role, TokenCodec, TokenSubject};

fn nurse_subject() -> TokenSubject {
    TokenSubject {
        subject_id: 3,
        display_name: "Joy".to_string(),
        role: Role::Nurse,
    }
}

#[tokio::test]
async fn nurse_scenario() -> Result<()> {
    let app = spawn_app()?;
    let token = login(&app, "nurse.joy").await?;

    let (status, body) = send(&app, Method::GET, "/api/records/patients", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    let (status, body) = send(&app, Method::GET, "/api/admin/access-rules", Some(&token), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, body) = send(&app, Method::GET, "/api/admin/access-rules", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let preflight = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/admin/access-rules")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
        .body(Body::empty())?;
    let response = app.router.clone().oneshot(preflight).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    Ok(())
}

#[tokio::test]
async fn preflight_never_needs_identity() -> Result<()> {
    let app = spawn_app()?;

    for path in ["/api/records/patients/1", "/api/audit/patients/1", "/no/such/route"] {
        let preflight = Request::builder()
            .method(Method::OPTIONS)
            .uri(path)
            .header(header::ORIGIN, "https://ward.example")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
            .body(Body::empty())?;
        let response = app.router.clone().oneshot(preflight).await?;
        assert_eq!(response.status(), StatusCode::OK, "preflight for {}", path);
    }
    Ok(())
}

#[tokio::test]
async fn seniority_grants_nothing() -> Result<()> {
    let app = spawn_app()?;
    let admin = login(&app, "ada.admin").await?;

    let (status, _) = send(&app, Method::GET, "/api/records/patients", Some(&admin), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, "/api/admin/access-rules", Some(&admin), None).await?;
    assert_eq!(status, StatusCode::OK);
    let rules = body["data"].as_array().cloned().unwrap_or_default();
    assert!(!rules.is_empty());
    assert_eq!(rules[0]["order"], 0);
    assert_eq!(rules[0]["path"], "/api/auth/login");
    Ok(())
}

#[tokio::test]
async fn clinical_writes_are_narrower_than_reads() -> Result<()> {
    let app = spawn_app()?;
    let nurse = login(&app, "nurse.joy").await?;
    let desk = login(&app, "rita.desk").await?;
    let doctor = login(&app, "dr.grey").await?;

    let observation = json!({ "fields": { "patient_id": 1, "pulse_bpm": 72 } });
    let (status, _) = send(&app, Method::POST, "/api/records/observations", Some(&desk), Some(observation.clone())).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::POST, "/api/records/observations", Some(&nurse), Some(observation)).await?;
    assert_eq!(status, StatusCode::CREATED);

    let patient = json!({ "fields": { "full_name": "Ada Lovelace" } });
    let (status, _) = send(&app, Method::POST, "/api/records/patients", Some(&nurse), Some(patient.clone())).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&app, Method::POST, "/api/records/patients", Some(&desk), Some(patient)).await?;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_i64().unwrap_or_default();

    // everyone clinical can read it back
    for token in [&nurse, &desk, &doctor] {
        let (status, body) = send(&app, Method::GET, &format!("/api/records/patients/{}", id), Some(token), None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["fields"]["full_name"], "Ada Lovelace");
    }

    // encounters are not for the front desk
    let (status, _) = send(&app, Method::GET, "/api/records/encounters", Some(&desk), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn encoded_collection_names_do_not_widen_access() -> Result<()> {
    let app = spawn_app()?;
    let desk = login(&app, "rita.desk").await?;
    let doctor = login(&app, "dr.grey").await?;

    let (status, _) = send(&app, Method::GET, "/api/records/%65ncounters", Some(&desk), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let observation = json!({ "fields": { "patient_id": 1, "pulse_bpm": 72 } });
    let (status, _) = send(&app, Method::POST, "/api/records/%6fbservations", Some(&doctor), Some(observation)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::GET, "/api/records/%65ncounters", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // nothing slipped through to the store
    let (status, body) = send(&app, Method::GET, "/api/records/observations", Some(&doctor), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    Ok(())
}

#[tokio::test]
async fn shifts_are_readable_by_any_role_but_admin_managed() -> Result<()> {
    let app = spawn_app()?;
    let admin = login(&app, "ada.admin").await?;
    let doctor = login(&app, "dr.grey").await?;

    let shift = json!({ "fields": { "staff_id": 2, "ward": "ICU", "shift_type": "night" } });
    let (status, _) = send(&app, Method::POST, "/api/records/shifts", Some(&doctor), Some(shift.clone())).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::POST, "/api/records/shifts", Some(&admin), Some(shift)).await?;
    assert_eq!(status, StatusCode::CREATED);

    for token in [&admin, &doctor] {
        let (status, body) = send(&app, Method::GET, "/api/records/shifts", Some(token), None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    }
    Ok(())
}

#[tokio::test]
async fn public_routes_need_no_token() -> Result<()> {
    let app = spawn_app()?;

    for path in ["/", "/health", "/docs", "/docs/auth"] {
        let (status, body) = send(&app, Method::GET, path, None, None).await?;
        assert_eq!(status, StatusCode::OK, "GET {}", path);
        assert_eq!(body["success"], true);
    }

    let (status, _) = send(&app, Method::GET, "/docs/nothing-here", None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn public_routes_ignore_bad_tokens() -> Result<()> {
    let app = spawn_app()?;
    let codec = TokenCodec::new(SECRET.as_bytes())?;
    let expired = codec
        .issue_at(&nurse_subject(), Duration::from_secs(60), Utc::now() - chrono::Duration::hours(2))?
        .token;
    let foreign = TokenCodec::new(b"some-other-deployment-signing-key!!!")?
        .issue(&nurse_subject(), Duration::from_secs(60))?
        .token;
    let mut tampered = login(&app, "nurse.joy").await?.into_bytes();
    let last = tampered.len() - 1;
    tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered)?;

    for token in [expired.as_str(), foreign.as_str(), tampered.as_str(), "not-a-token"] {
        for path in ["/", "/health", "/docs", "/docs/auth"] {
            let (status, _) = send(&app, Method::GET, path, Some(token), None).await?;
            assert_eq!(status, StatusCode::OK, "GET {}", path);
        }

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            Some(token),
            Some(json!({ "username": "nurse.joy", "password": PASSWORD })),
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["access_token"].is_string());

        // the same token is still refused where identity matters
        let (status, _) = send(&app, Method::GET, "/api/auth/whoami", Some(token), None).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
    Ok(())
}

#[tokio::test]
async fn unlisted_routes_require_authentication() -> Result<()> {
    let app = spawn_app()?;
    let token = login(&app, "rita.desk").await?;

    let (status, _) = send(&app, Method::GET, "/api/unlisted", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/unlisted", Some(&token), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn dot_segments_are_refused() -> Result<()> {
    let app = spawn_app()?;
    let token = login(&app, "dr.grey").await?;

    let (status, _) = send(&app, Method::GET, "/api/records/../admin/access-rules", Some(&token), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // without a token the caller is told to authenticate first
    let (status, body) = send(&app, Method::GET, "/api/./admin", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    Ok(())
}
