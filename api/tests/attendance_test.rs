mod helpers;

use axum::http::StatusCode;
use chrono::Duration;
use helpers::app::attendance_form;
use helpers::{Form, make_test_app};
use serde_json::json;
use services::test_utils::StubEmbedder;

#[tokio::test]
async fn checkin_is_accepted_then_committed_by_the_worker() {
    let app = make_test_app().await;
    let ayu = app.enrolled_user("Ayu").await;
    let office = app.office().await;

    let (status, json) = app
        .post_form("/api/absensi/checkin", attendance_form(ayu.id, office.id, 50.0, "Ayu"))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED, "{json}");
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["mode"], "checkin");
    assert_eq!(json["data"]["face"]["match"], true);
    let task_id = json["data"]["task_id"].as_str().unwrap().to_owned();

    let (_, json) = app.get(&format!("/api/absensi/status?user_id={}", ayu.id)).await;
    assert_eq!(json["data"]["state"], "NONE");
    assert_eq!(json["data"]["latest_task"]["status"], "queued");

    assert_eq!(app.drain().await, 1);

    let (status, json) = app.get(&format!("/api/absensi/status?user_id={}", ayu.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["state"], "CHECKED_IN");
    assert_eq!(json["data"]["check_in_at"], "2025-03-03T07:55:00");
    assert_eq!(json["data"]["check_in_status"], "tepat");

    let (status, json) = app.get(&format!("/api/tasks/{task_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "succeeded");
    assert_eq!(json["data"]["result"]["outcome"], "applied");
}

#[tokio::test]
async fn geofence_violation_reports_distance_and_radius() {
    let app = make_test_app().await;
    let ayu = app.enrolled_user("Ayu").await;
    let office = app.office().await;

    let (status, json) = app
        .post_form("/api/absensi/checkin", attendance_form(ayu.id, office.id, 150.0, "Ayu"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["data"]["code"], "OUTSIDE_GEOFENCE");
    let distance = json["data"]["distance_m"].as_f64().unwrap();
    assert!((distance - 150.0).abs() < 1.0, "distance {distance}");
    assert_eq!(json["data"]["radius_m"], json!(100.0));
}

#[tokio::test]
async fn someone_elses_face_is_rejected_with_400() {
    let app = make_test_app().await;
    let ayu = app.enrolled_user("Ayu").await;
    let office = app.office().await;

    let (status, json) = app
        .post_form("/api/absensi/checkin", attendance_form(ayu.id, office.id, 50.0, "Budi"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["data"]["code"], "FACE_MISMATCH");
    assert!(json["data"]["score"].as_f64().unwrap() < 0.45);
}

#[tokio::test]
async fn photo_without_a_face_is_a_clean_failure() {
    let app = make_test_app().await;
    let ayu = app.enrolled_user("Ayu").await;
    let office = app.office().await;

    let p = helpers::app::OFFICE;
    let form = Form::new()
        .text("user_id", ayu.id)
        .text("location_id", office.id)
        .text("lat", p.lat)
        .text("lng", p.lng)
        .file("image", "wall.jpg", b"just a wall".to_vec());
    let (status, json) = app.post_form("/api/absensi/checkin", form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["data"]["code"], "FACE_VERIFICATION_FAILED");
}

#[tokio::test]
async fn missing_and_malformed_fields_are_400() {
    let app = make_test_app().await;

    let form = Form::new().file("image", "selfie.jpg", StubEmbedder::image_of("Ayu"));
    let (status, json) = app.post_form("/api/absensi/checkin", form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["data"]["code"], "INVALID_INPUT");
    assert!(json["message"].as_str().unwrap().contains("user_id is required"));

    let form = Form::new().text("user_id", 1).text("lat", "north").text("lng", 115.2);
    let (status, json) = app.post_form("/api/absensi/checkin", form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].as_str().unwrap().contains("lat"));

    let form = Form::new().text("user_id", 1).text("lat", -8.67).text("lng", 115.2);
    let (status, json) = app.post_form("/api/absensi/checkin", form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "image is required");
}

#[tokio::test]
async fn unknown_location_is_404() {
    let app = make_test_app().await;
    let ayu = app.enrolled_user("Ayu").await;

    let (status, json) = app
        .post_form("/api/absensi/checkin", attendance_form(ayu.id, 404, 0.0, "Ayu"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["data"]["code"], "LOCATION_NOT_FOUND");
}

#[tokio::test]
async fn second_checkin_conflicts_before_and_after_commit() {
    let app = make_test_app().await;
    let ayu = app.enrolled_user("Ayu").await;
    let office = app.office().await;

    let (status, first) = app
        .post_form("/api/absensi/checkin", attendance_form(ayu.id, office.id, 10.0, "Ayu"))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, json) = app
        .post_form("/api/absensi/checkin", attendance_form(ayu.id, office.id, 10.0, "Ayu"))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["data"]["code"], "CHECKIN_IN_PROGRESS");
    assert_eq!(json["data"]["task_id"], first["data"]["task_id"]);

    app.drain().await;

    let (status, json) = app
        .post_form("/api/absensi/checkin", attendance_form(ayu.id, office.id, 10.0, "Ayu"))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["data"]["code"], "DUPLICATE_CHECKIN");
}

#[tokio::test]
async fn full_day_checkin_then_checkout() {
    let app = make_test_app().await;
    let ayu = app.enrolled_user("Ayu").await;
    let office = app.office().await;

    let (status, json) = app
        .post_form("/api/absensi/checkout", attendance_form(ayu.id, office.id, 10.0, "Ayu"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["data"]["code"], "NOT_CHECKED_IN");

    let form = attendance_form(ayu.id, office.id, 10.0, "Ayu")
        .text("deskripsi_catatan", "Opened the store")
        .text("lampiran_url", "");
    app.post_form("/api/absensi/checkin", form).await;
    app.drain().await;

    app.clock.advance(Duration::hours(8) + Duration::minutes(30));
    let (status, json) = app
        .post_form("/api/absensi/checkout", attendance_form(ayu.id, office.id, 30.0, "Ayu"))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED, "{json}");
    assert_eq!(json["data"]["mode"], "checkout");
    let task_id = json["data"]["task_id"].as_str().unwrap().to_owned();
    app.drain().await;

    let (_, json) = app.get(&format!("/api/absensi/status?user_id={}", ayu.id)).await;
    assert_eq!(json["data"]["state"], "CHECKED_OUT");
    assert_eq!(json["data"]["check_out_at"], "2025-03-03T16:25:00");

    let (_, json) = app.get(&format!("/api/tasks/{task_id}")).await;
    assert_eq!(json["data"]["result"]["work_duration_seconds"], 8 * 3600 + 30 * 60);
    let notes = json["data"]["result"]["notes"].as_array().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["description"], "Opened the store");

    let (status, json) = app
        .post_form("/api/absensi/checkout", attendance_form(ayu.id, office.id, 30.0, "Ayu"))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["data"]["code"], "ALREADY_CHECKED_OUT");
}

#[tokio::test]
async fn agenda_and_recipient_lists_are_shaped_before_queueing() {
    let app = make_test_app().await;
    let ayu = app.enrolled_user("Ayu").await;
    let hr = app.user("Sari", db::models::user::Role::Hr).await;
    let office = app.office().await;
    let agenda = db::models::agenda_item::Model::create(&app.db, ayu.id, "Visit client")
        .await
        .unwrap();

    let form = attendance_form(ayu.id, office.id, 10.0, "Ayu")
        .text("agenda_kerja_id[]", agenda.id)
        .text("agenda_kerja_id[]", format!(" {} ", agenda.id))
        .text("agenda_kerja_id[]", "")
        .text("recipient", hr.id)
        .text("recipient", hr.id);
    let (_, json) = app.post_form("/api/absensi/checkin", form).await;
    let task_id = json["data"]["task_id"].as_str().unwrap().to_owned();
    app.drain().await;

    let (_, json) = app.get(&format!("/api/tasks/{task_id}")).await;
    assert_eq!(json["data"]["result"]["agendas_linked"], json!([agenda.id]));
    assert_eq!(json["data"]["result"]["recipients_added"], json!([hr.id]));

    let form = attendance_form(ayu.id, office.id, 10.0, "Ayu").text("recipient", "abc");
    let (status, json) = app.post_form("/api/absensi/checkout", form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["data"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn status_and_task_lookups_validate_their_inputs() {
    let app = make_test_app().await;

    let (status, json) = app.get("/api/absensi/status").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "user_id is required");

    let (status, json) = app.get("/api/absensi/status?user_id=999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["data"]["code"], "USER_NOT_FOUND");

    let (status, json) = app.get("/api/tasks/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["data"]["code"], "TASK_NOT_FOUND");
}

#[tokio::test]
async fn committed_checkin_is_pushed_to_registered_devices() {
    let app = make_test_app().await;
    let ayu = app.enrolled_user("Ayu").await;
    let office = app.office().await;

    let (status, _) = app
        .post_json("/api/notifications", json!({ "user_id": ayu.id, "token": "device-1" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    app.post_form("/api/absensi/checkin", attendance_form(ayu.id, office.id, 10.0, "Ayu"))
        .await;
    assert!(app.push.sent().is_empty());

    app.drain().await;
    let sent = app.push.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, vec!["device-1".to_owned()]);
    assert_eq!(sent[0].1.title, "Check-in recorded");
    assert!(sent[0].1.body.contains("Ayu"));
}
