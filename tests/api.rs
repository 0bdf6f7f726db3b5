use actix_web::{
    http::{header::AUTHORIZATION, StatusCode},
    test, web, App,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::json;
use std::{collections::BTreeMap, sync::Arc};

use splitzz::{
    auth::SessionClaims,
    routes::{self, AppState, ErrorBody},
    settings::Auth,
    store::MemoryStore,
    Event, Group, Member, Payable, Split, Summary,
};

const SERVICE_TOKEN: &str = "service-token";
const SESSION_SECRET: &str = "session-secret";

#[derive(Debug, Deserialize)]
struct SettlementBody {
    payables: Vec<Payable>,
    net_balances: BTreeMap<String, Decimal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryBody {
    total_amount: Decimal,
    total_owed: Decimal,
    total_paid: Decimal,
}

fn state() -> web::Data<AppState> {
    web::Data::new(AppState::new(
        Arc::new(MemoryStore::default()),
        Auth {
            service_token: SERVICE_TOKEN.to_string(),
            session_secret: SESSION_SECRET.to_string(),
        },
        2,
    ))
}

fn member_session(group_id: &str, member_id: &str) -> String {
    let claims = SessionClaims::sign(group_id, member_id, "1700000000", SESSION_SECRET);
    serde_json::to_string(&claims).unwrap()
}

fn payable(from: &str, to: &str, amount: Decimal) -> Payable {
    Payable {
        from: from.to_string(),
        to: to.to_string(),
        amount,
    }
}

fn create_trip() -> actix_http::Request {
    test::TestRequest::put()
        .uri("/groups/trip")
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .set_json(json!({
            "name": "Goa Trip",
            "description": "Expenses of Goa trip",
            "members": [
                { "id": "a", "name": "Ana", "email": "ana@example.com", "phone": "1" },
                { "id": "b", "name": "Ben" },
                { "id": "c", "name": "Cid" }
            ]
        }))
        .to_request()
}

#[actix_web::test]
async fn equal_expense_produces_payables_and_summary() {
    let app = test::init_service(App::new().app_data(state()).configure(routes::configure)).await;
    let response = test::call_service(&app, create_trip()).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let request = test::TestRequest::post()
        .uri("/groups/trip/events")
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .set_json(json!({
            "title": "Hotel Booking",
            "category": "Accommodation",
            "amount": "300",
            "payer": "a",
            "split": { "type": "equal" }
        }))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let event: Event = test::read_body_json(response).await;
    assert_eq!(event.split_between["b"], dec!(100));

    let request = test::TestRequest::get()
        .uri("/groups/trip/settlement")
        .insert_header((AUTHORIZATION, member_session("trip", "b")))
        .to_request();
    let settlement: SettlementBody = test::call_and_read_body_json(&app, request).await;
    assert_eq!(settlement.net_balances["a"], dec!(200));
    assert_eq!(settlement.net_balances["b"], dec!(-100));
    assert_eq!(
        settlement.payables,
        vec![payable("b", "a", dec!(100)), payable("c", "a", dec!(100))]
    );

    let request = test::TestRequest::get()
        .uri("/groups/trip/summary")
        .insert_header((AUTHORIZATION, member_session("trip", "a")))
        .to_request();
    let summary: SummaryBody = test::call_and_read_body_json(&app, request).await;
    assert_eq!(summary.total_amount, dec!(300));
    assert_eq!(summary.total_owed, dec!(200));
    assert_eq!(summary.total_paid, dec!(300));

    let request = test::TestRequest::get()
        .uri("/groups/trip")
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .to_request();
    let group: Group = test::call_and_read_body_json(&app, request).await;
    assert_eq!(group.payable.len(), 2);
}

#[actix_web::test]
async fn invalid_percentages_are_rejected_without_changes() {
    let app = test::init_service(App::new().app_data(state()).configure(routes::configure)).await;
    let response = test::call_service(&app, create_trip()).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let request = test::TestRequest::post()
        .uri("/groups/trip/events")
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .set_json(json!({
            "title": "Dinner",
            "amount": "250",
            "payer": "a",
            "split": {
                "type": "percentage",
                "weights": [
                    { "member": "a", "percent": "50" },
                    { "member": "b", "percent": "30" },
                    { "member": "c", "percent": "19" }
                ]
            }
        }))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorBody = test::read_body_json(response).await;
    assert_eq!(body.error, "invalid_split_total");

    let request = test::TestRequest::get()
        .uri("/groups/trip")
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .to_request();
    let group: Group = test::call_and_read_body_json(&app, request).await;
    assert!(group.events.is_empty());
}

#[actix_web::test]
async fn events_can_be_edited_and_deleted() {
    let app = test::init_service(App::new().app_data(state()).configure(routes::configure)).await;
    let response = test::call_service(&app, create_trip()).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let request = test::TestRequest::post()
        .uri("/groups/trip/events")
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .set_json(json!({
            "title": "Dinner",
            "amount": "250",
            "payer": "a",
            "split": {
                "type": "percentage",
                "weights": [
                    { "member": "a", "percent": "50" },
                    { "member": "b", "percent": "30" },
                    { "member": "c", "percent": "20" }
                ]
            }
        }))
        .to_request();
    let event: Event = test::call_and_read_body_json(&app, request).await;
    assert_eq!(event.split_between["a"], dec!(125));
    assert_eq!(event.split_between["b"], dec!(75));
    assert_eq!(event.split_between["c"], dec!(50));

    let request = test::TestRequest::put()
        .uri(&format!("/groups/trip/events/{}", event.id))
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .set_json(json!({
            "title": "Dinner",
            "amount": "40",
            "payer": "b",
            "split": { "type": "equal", "members": ["a", "b"] }
        }))
        .to_request();
    let edited: Event = test::call_and_read_body_json(&app, request).await;
    assert_eq!(edited.id, event.id);
    assert_eq!(edited.timestamp, event.timestamp);

    let request = test::TestRequest::get()
        .uri("/groups/trip/settlement")
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .to_request();
    let settlement: SettlementBody = test::call_and_read_body_json(&app, request).await;
    assert_eq!(settlement.payables, vec![payable("a", "b", dec!(20))]);

    let request = test::TestRequest::delete()
        .uri(&format!("/groups/trip/events/{}", event.id))
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .to_request();
    assert_eq!(test::call_service(&app, request).await.status(), StatusCode::OK);

    let request = test::TestRequest::delete()
        .uri(&format!("/groups/trip/events/{}", event.id))
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .to_request();
    assert_eq!(
        test::call_service(&app, request).await.status(),
        StatusCode::NOT_FOUND
    );

    let request = test::TestRequest::get()
        .uri("/groups/trip")
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .to_request();
    let group: Group = test::call_and_read_body_json(&app, request).await;
    assert!(group.events.is_empty());
    assert!(group.payable.is_empty());
}

#[actix_web::test]
async fn membership_changes() {
    let app = test::init_service(App::new().app_data(state()).configure(routes::configure)).await;
    let response = test::call_service(&app, create_trip()).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let request = test::TestRequest::post()
        .uri("/groups/trip/members")
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .set_json(json!({ "id": "d", "name": "Dee" }))
        .to_request();
    let group: Group = test::call_and_read_body_json(&app, request).await;
    assert_eq!(group.member_ids(), vec!["a", "b", "c", "d"]);

    let request = test::TestRequest::post()
        .uri("/groups/trip/members")
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .set_json(json!({ "id": "d", "name": "Dee again" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, request).await.status(),
        StatusCode::CONFLICT
    );

    let request = test::TestRequest::post()
        .uri("/groups/trip/events")
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .set_json(json!({
            "title": "Taxi",
            "amount": "12",
            "payer": "d",
            "split": { "type": "equal", "members": ["c", "d"] }
        }))
        .to_request();
    assert_eq!(
        test::call_service(&app, request).await.status(),
        StatusCode::CREATED
    );

    let request = test::TestRequest::delete()
        .uri("/groups/trip/members/d")
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .to_request();
    assert_eq!(
        test::call_service(&app, request).await.status(),
        StatusCode::CONFLICT
    );

    let request = test::TestRequest::delete()
        .uri("/groups/trip/members/b")
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .to_request();
    let removed: Member = test::call_and_read_body_json(&app, request).await;
    assert_eq!(removed.name, "Ben");
}

#[actix_web::test]
async fn split_previews_do_not_touch_the_group() {
    let app = test::init_service(App::new().app_data(state()).configure(routes::configure)).await;
    let response = test::call_service(&app, create_trip()).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let request = test::TestRequest::post()
        .uri("/split/equal")
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .set_json(json!({ "group_id": "trip", "amount": "100", "payer": "c" }))
        .to_request();
    let split: Split = test::call_and_read_body_json(&app, request).await;
    assert_eq!(split["c"], dec!(33.34));
    assert_eq!(split["a"], dec!(33.33));

    let request = test::TestRequest::post()
        .uri("/split/weighted")
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .set_json(json!({
            "group_id": "trip",
            "amount": "10",
            "weights": [
                { "member": "a", "percent": "50" },
                { "member": "z", "percent": "50" }
            ]
        }))
        .to_request();
    let response = test::call_service(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorBody = test::read_body_json(response).await;
    assert_eq!(body.error, "invalid_weight");
}

#[actix_web::test]
async fn sessions_are_scoped_to_their_group() {
    let app = test::init_service(App::new().app_data(state()).configure(routes::configure)).await;
    let response = test::call_service(&app, create_trip()).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let request = test::TestRequest::get().uri("/groups/trip").to_request();
    assert_eq!(
        test::call_service(&app, request).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let request = test::TestRequest::get()
        .uri("/groups/trip")
        .insert_header((AUTHORIZATION, member_session("family", "a")))
        .to_request();
    assert_eq!(
        test::call_service(&app, request).await.status(),
        StatusCode::FORBIDDEN
    );

    let request = test::TestRequest::get()
        .uri("/groups")
        .insert_header((AUTHORIZATION, member_session("trip", "a")))
        .to_request();
    assert_eq!(
        test::call_service(&app, request).await.status(),
        StatusCode::FORBIDDEN
    );

    let request = test::TestRequest::get()
        .uri("/groups/trip/summary")
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .to_request();
    assert_eq!(
        test::call_service(&app, request).await.status(),
        StatusCode::BAD_REQUEST
    );

    let request = test::TestRequest::get()
        .uri("/groups/trip/summary?member=b")
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .to_request();
    let summary: SummaryBody = test::call_and_read_body_json(&app, request).await;
    assert_eq!(summary.total_paid, Decimal::ZERO);
}

#[actix_web::test]
async fn groups_can_be_renamed_and_deleted() {
    let app = test::init_service(App::new().app_data(state()).configure(routes::configure)).await;
    let response = test::call_service(&app, create_trip()).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let request = test::TestRequest::patch()
        .uri("/groups/trip")
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .set_json(json!({ "name": "Goa 2024" }))
        .to_request();
    let group: Group = test::call_and_read_body_json(&app, request).await;
    assert_eq!(group.name, "Goa 2024");
    assert_eq!(group.description, "Expenses of Goa trip");

    let request = test::TestRequest::put()
        .uri("/groups/trip")
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .set_json(json!({ "name": "Duplicate" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, request).await.status(),
        StatusCode::CONFLICT
    );

    let request = test::TestRequest::delete()
        .uri("/groups/trip")
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .to_request();
    assert_eq!(
        test::call_service(&app, request).await.status(),
        StatusCode::NO_CONTENT
    );

    let request = test::TestRequest::get()
        .uri("/groups")
        .insert_header((AUTHORIZATION, SERVICE_TOKEN))
        .to_request();
    let groups: Vec<Group> = test::call_and_read_body_json(&app, request).await;
    assert!(groups.is_empty());
}

#[::core::prelude::v1::test]
fn summary_serializes_in_camel_case() {
    let body = serde_json::to_value(Summary::default()).unwrap();
    assert!(body.get("totalAmount").is_some());
    assert!(body.get("totalOwed").is_some());
    assert!(body.get("totalPaid").is_some());
}
