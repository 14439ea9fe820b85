mod helpers;

use axum::http::StatusCode;
use db::models::{location, user};
use helpers::app::OFFICE;
use helpers::make_test_app;
use util::geo::offset_north;

#[tokio::test]
async fn list_is_paged_and_searchable() {
    let app = make_test_app().await;
    for name in ["Kantor Denpasar", "Gudang Badung", "Kantor Ubud"] {
        location::Model::create(&app.db, name, OFFICE.lat, OFFICE.lng, None)
            .await
            .unwrap();
    }

    let (status, json) = app.get("/api/location").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["total"], 3);
    assert_eq!(json["data"]["page"], 1);
    assert_eq!(json["data"]["locations"][0]["name"], "Gudang Badung");

    let (_, json) = app.get("/api/location?q=Kantor&page_size=1&page=2").await;
    assert_eq!(json["data"]["total"], 2);
    let page = json["data"]["locations"].as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["name"], "Kantor Ubud");

    let (_, json) = app.get("/api/location?page_size=5000").await;
    assert_eq!(json["data"]["page_size"], 100);

    let (status, _) = app.get("/api/location?page=first").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn single_location_lookup() {
    let app = make_test_app().await;
    let office = app.office().await;

    let (status, json) = app.get(&format!("/api/location/{}", office.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["name"], "Kantor Denpasar");
    assert_eq!(json["data"]["radius"], 100);

    let (status, json) = app.get("/api/location/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["data"]["code"], "LOCATION_NOT_FOUND");
}

#[tokio::test]
async fn nearest_orders_by_distance_and_honours_radius() {
    let app = make_test_app().await;
    let far = offset_north(OFFICE, 2_000.0);
    let near = offset_north(OFFICE, 300.0);
    location::Model::create(&app.db, "Far", far.lat, far.lng, None).await.unwrap();
    location::Model::create(&app.db, "Near", near.lat, near.lng, None).await.unwrap();
    app.office().await;

    let uri = format!("/api/location/nearest?lat={}&lng={}", OFFICE.lat, OFFICE.lng);
    let (status, json) = app.get(&uri).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(names, ["Kantor Denpasar", "Near", "Far"]);
    assert!(json["data"][1]["distance_m"].as_f64().unwrap() > 299.0);

    let (_, json) = app.get(&format!("{uri}&radius_m=500&limit=1")).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let (status, json) = app.get("/api/location/nearest?lat=-8.67").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "lng is required");
}

#[tokio::test]
async fn my_location_follows_the_users_assignment() {
    let app = make_test_app().await;
    let office = app.office().await;
    let assigned = user::Model::create(&app.db, "Ayu", "ayu@example.com", user::Role::Karyawan, Some(office.id))
        .await
        .unwrap();
    let roaming = app.user("Budi", user::Role::Karyawan).await;

    let (status, json) = app.get(&format!("/api/location/my?user_id={}", assigned.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["id"], office.id);

    let (status, json) = app.get(&format!("/api/location/my?user_id={}", roaming.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["data"].is_null());

    let (status, json) = app.get("/api/location/my?user_id=777").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["data"]["code"], "USER_NOT_FOUND");
}
