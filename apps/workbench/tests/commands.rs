//! JSON-line command handling against an in-memory database.

use serde_json::{json, Value};

use atelier_db::{Database, DbConfig};
use atelier_workbench::{handle_line, Session, Workbench, WorkbenchConfig};

async fn setup() -> (Workbench, Session) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let wb = Workbench::new(db, WorkbenchConfig::default());
    let session = wb.default_session();
    (wb, session)
}

async fn send(wb: &Workbench, session: &Session, request: Value) -> Value {
    let reply = handle_line(wb, session, &request.to_string()).await;
    serde_json::from_str(&reply).unwrap()
}

/// Sends `command` and returns `data`, failing on an error reply.
async fn ok(wb: &Workbench, session: &Session, command: Value) -> Value {
    let reply = send(wb, session, json!({ "command": command })).await;
    assert_eq!(reply["ok"], true, "unexpected error: {}", reply);
    reply["data"].clone()
}

async fn ok_as_admin(wb: &Workbench, session: &Session, command: Value) -> Value {
    let reply = send(wb, session, json!({ "user": admin(), "command": command })).await;
    assert_eq!(reply["ok"], true, "unexpected error: {}", reply);
    reply["data"].clone()
}

async fn error_code(wb: &Workbench, session: &Session, request: Value) -> String {
    let reply = send(wb, session, request).await;
    assert_eq!(reply["ok"], false, "expected an error: {}", reply);
    reply["error"]["code"].as_str().unwrap().to_string()
}

fn admin() -> Value {
    json!({ "id": "admin-1", "fullName": "Ana Admin", "role": "admin" })
}

async fn client(wb: &Workbench, session: &Session, name: &str) -> String {
    let data = ok(wb, session, json!({ "type": "CreateClient", "payload": { "name": name } })).await;
    data["id"].as_str().unwrap().to_string()
}

async fn seed_catalog(wb: &Workbench, session: &Session) {
    ok(
        wb,
        session,
        json!({
            "type": "CreateProduct",
            "payload": { "reference": "POL-001", "modelName": "Polo Classic", "price": 500 }
        }),
    )
    .await;
}

async fn entry(wb: &Workbench, session: &Session, client_id: &str) -> Value {
    ok(
        wb,
        session,
        json!({
            "type": "CreateEntry",
            "payload": {
                "date": "2024-06-03",
                "clientId": client_id,
                "items": [{ "productRef": "pol-001", "sizeQuantities": { "S": 10, "M": 10 } }]
            }
        }),
    )
    .await
}

async fn deliver_all(wb: &Workbench, session: &Session, entry: &Value) -> Value {
    ok(
        wb,
        session,
        json!({
            "type": "RecordDelivery",
            "payload": {
                "entryId": entry["id"],
                "items": [{ "entryItemId": entry["items"][0]["id"], "sizeQuantities": { "S": 10, "M": 10 } }]
            }
        }),
    )
    .await
}

fn invoice(entry_ids: &[&Value]) -> Value {
    json!({
        "type": "GenerateInvoice",
        "payload": { "documentType": "Factura", "entryIds": entry_ids }
    })
}

#[tokio::test]
async fn test_full_cycle_through_commands() {
    let (wb, session) = setup().await;
    let client_id = client(&wb, &session, "Textiles Norte S.L.").await;
    seed_catalog(&wb, &session).await;

    let created = entry(&wb, &session, &client_id).await;
    assert_eq!(created["code"], "1");
    assert_eq!(created["status"], "received");
    assert_eq!(created["whoInput"], "Workbench");

    let outcome = deliver_all(&wb, &session, &created).await;
    assert_eq!(outcome["entry"]["status"], "delivered");
    assert_eq!(outcome["delivery"]["whoDelivered"], "Workbench");

    let draft = ok(
        &wb,
        &session,
        json!({
            "type": "PreviewInvoice",
            "payload": { "documentType": "Factura", "entryIds": [created["id"]] }
        }),
    )
    .await;
    assert_eq!(draft["totals"]["subtotal"], 10000);
    assert_eq!(draft["totals"]["total"], 12100);

    let document = ok_as_admin(&wb, &session, invoice(&[&created["id"]])).await;
    assert_eq!(document["documentNumber"], "FA-0001");
    assert_eq!(document["total"], 12100);

    let details = ok(&wb, &session, json!({ "type": "EntryDetails", "payload": { "id": created["id"] } })).await;
    assert_eq!(details["entry"]["status"], "invoiced");
    assert_eq!(details["entry"]["invoiceId"], document["id"]);

    let paid = ok_as_admin(
        &wb,
        &session,
        json!({
            "type": "AddPayment",
            "payload": { "documentId": document["id"], "amount": 12100, "method": "transfer" }
        }),
    )
    .await;
    assert_eq!(paid["paymentStatus"], "Paid");

    let history = ok(&wb, &session, json!({ "type": "ListDocuments", "payload": {} })).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["derivedStatus"], "Paid");
    assert_eq!(history[0]["amountDue"], 0);

    let report = ok_as_admin(
        &wb,
        &session,
        json!({ "type": "DeleteDocument", "payload": { "id": document["id"] } }),
    )
    .await;
    assert_eq!(report["documentNumber"], "FA-0001");
    assert_eq!(report["resets"][0]["to"], "delivered");

    let details = ok(&wb, &session, json!({ "type": "EntryDetails", "payload": { "id": created["id"] } })).await;
    assert_eq!(details["entry"]["status"], "delivered");
    assert_eq!(details["entry"]["invoiceId"], Value::Null);
}

#[tokio::test]
async fn test_role_gates() {
    let (wb, session) = setup().await;
    let client_id = client(&wb, &session, "Textiles Norte S.L.").await;
    seed_catalog(&wb, &session).await;
    let created = entry(&wb, &session, &client_id).await;
    deliver_all(&wb, &session, &created).await;

    let code = error_code(&wb, &session, json!({ "command": invoice(&[&created["id"]]) })).await;
    assert_eq!(code, "FORBIDDEN");

    let code = error_code(
        &wb,
        &session,
        json!({ "command": { "type": "DeleteDocuments", "payload": { "ids": ["x"] } } }),
    )
    .await;
    assert_eq!(code, "FORBIDDEN");

    // Manual status override is admin-only as well
    let code = error_code(
        &wb,
        &session,
        json!({
            "command": {
                "type": "UpdateEntry",
                "payload": { "id": created["id"], "changes": { "status": "received" } }
            }
        }),
    )
    .await;
    assert_eq!(code, "FORBIDDEN");
}

#[tokio::test]
async fn test_rule_violations_map_to_codes() {
    let (wb, session) = setup().await;
    let norte = client(&wb, &session, "Textiles Norte S.L.").await;
    let club = client(&wb, &session, "Club Deportivo Sur").await;
    seed_catalog(&wb, &session).await;

    let first = entry(&wb, &session, &norte).await;
    let second = entry(&wb, &session, &club).await;
    deliver_all(&wb, &session, &first).await;
    deliver_all(&wb, &session, &second).await;

    let code = error_code(
        &wb,
        &session,
        json!({ "user": admin(), "command": invoice(&[&first["id"], &second["id"]]) }),
    )
    .await;
    assert_eq!(code, "MIXED_CLIENTS");

    ok_as_admin(&wb, &session, invoice(&[&first["id"]])).await;

    let code = error_code(
        &wb,
        &session,
        json!({ "user": admin(), "command": invoice(&[&first["id"]]) }),
    )
    .await;
    assert_eq!(code, "CONFLICT");

    // Locked by its invoice
    let code = error_code(
        &wb,
        &session,
        json!({
            "command": {
                "type": "RecordDelivery",
                "payload": {
                    "entryId": first["id"],
                    "items": [{ "entryItemId": first["items"][0]["id"], "sizeQuantities": { "S": 1 } }]
                }
            }
        }),
    )
    .await;
    assert_eq!(code, "BUSINESS_LOGIC");

    let code = error_code(
        &wb,
        &session,
        json!({ "command": { "type": "EntryDetails", "payload": { "id": "missing" } } }),
    )
    .await;
    assert_eq!(code, "NOT_FOUND");
}

#[tokio::test]
async fn test_over_delivery_is_rejected() {
    let (wb, session) = setup().await;
    let client_id = client(&wb, &session, "Textiles Norte S.L.").await;
    seed_catalog(&wb, &session).await;
    let created = entry(&wb, &session, &client_id).await;

    let code = error_code(
        &wb,
        &session,
        json!({
            "command": {
                "type": "RecordDelivery",
                "payload": {
                    "entryId": created["id"],
                    "items": [{ "entryItemId": created["items"][0]["id"], "sizeQuantities": { "S": 11 } }]
                }
            }
        }),
    )
    .await;
    assert_eq!(code, "BUSINESS_LOGIC");

    let pending = ok(&wb, &session, json!({ "type": "ListEntries", "payload": { "group": "pending" } })).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);
    assert_eq!(pending[0]["status"], "received");
}

#[tokio::test]
async fn test_invoiceable_listing_and_bulk_delete() {
    let (wb, session) = setup().await;
    let client_id = client(&wb, &session, "Textiles Norte S.L.").await;
    seed_catalog(&wb, &session).await;

    let first = entry(&wb, &session, &client_id).await;
    let second = entry(&wb, &session, &client_id).await;
    deliver_all(&wb, &session, &first).await;
    deliver_all(&wb, &session, &second).await;

    let invoiceable = ok(
        &wb,
        &session,
        json!({
            "type": "ListInvoiceable",
            "payload": { "clientId": client_id, "from": "2024-06-01", "to": "2024-06-30" }
        }),
    )
    .await;
    assert_eq!(invoiceable.as_array().unwrap().len(), 2);

    let code = error_code(
        &wb,
        &session,
        json!({
            "command": {
                "type": "ListInvoiceable",
                "payload": { "clientId": client_id, "from": "2024-07-01", "to": "2024-06-01" }
            }
        }),
    )
    .await;
    assert_eq!(code, "VALIDATION_ERROR");

    let document = ok_as_admin(&wb, &session, invoice(&[&first["id"]])).await;

    let invoiceable = ok(
        &wb,
        &session,
        json!({ "type": "ListInvoiceable", "payload": { "clientId": client_id } }),
    )
    .await;
    assert_eq!(invoiceable.as_array().unwrap().len(), 1);
    assert_eq!(invoiceable[0]["id"], second["id"]);

    let report = ok_as_admin(
        &wb,
        &session,
        json!({ "type": "DeleteDocuments", "payload": { "ids": [document["id"], "missing"] } }),
    )
    .await;
    assert_eq!(report["deleted"].as_array().unwrap().len(), 1);
    assert_eq!(report["failed"][0]["documentId"], "missing");
}

#[tokio::test]
async fn test_envelope() {
    let (wb, session) = setup().await;

    let reply = send(&wb, &session, json!({ "id": 42, "command": { "type": "ListClients" } })).await;
    assert_eq!(reply["id"], 42);
    assert_eq!(reply["ok"], true);
    assert_eq!(reply["data"], json!([]));
    assert!(reply.get("error").is_none());

    let raw = handle_line(&wb, &session, "not json").await;
    let reply: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(reply["ok"], false);
    assert_eq!(reply["id"], Value::Null);
    assert_eq!(reply["error"]["code"], "VALIDATION_ERROR");

    let code = error_code(&wb, &session, json!({ "command": { "type": "Launch" } })).await;
    assert_eq!(code, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_request_user_replaces_default_session() {
    let (wb, session) = setup().await;
    let client_id = client(&wb, &session, "Textiles Norte S.L.").await;
    seed_catalog(&wb, &session).await;

    let created = ok_as_admin(
        &wb,
        &session,
        json!({
            "type": "CreateEntry",
            "payload": {
                "date": "2024-06-03",
                "clientId": client_id,
                "items": [{ "productRef": "POL-001", "sizeQuantities": { "S": 1 } }]
            }
        }),
    )
    .await;
    assert_eq!(created["whoInput"], "Ana Admin");

    // The same command without a user runs as the configured default
    let created = entry(&wb, &session, &client_id).await;
    assert_eq!(created["whoInput"], "Workbench");
}

#[tokio::test]
async fn test_invoiced_entry_status_cannot_be_overridden() {
    let (wb, session) = setup().await;
    let client_id = client(&wb, &session, "Textiles Norte S.L.").await;
    seed_catalog(&wb, &session).await;
    let created = entry(&wb, &session, &client_id).await;
    deliver_all(&wb, &session, &created).await;
    let document = ok_as_admin(&wb, &session, invoice(&[&created["id"]])).await;

    for status in ["delivered", "pre_invoiced"] {
        let code = error_code(
            &wb,
            &session,
            json!({
                "user": admin(),
                "command": {
                    "type": "UpdateEntry",
                    "payload": { "id": created["id"], "changes": { "status": status } }
                }
            }),
        )
        .await;
        assert_eq!(code, "BUSINESS_LOGIC");
    }

    let details = ok(&wb, &session, json!({ "type": "EntryDetails", "payload": { "id": created["id"] } })).await;
    assert_eq!(details["entry"]["status"], "invoiced");
    assert_eq!(details["entry"]["invoiceId"], document["id"]);
}

#[tokio::test]
async fn test_extreme_quantities_are_rejected() {
    let (wb, session) = setup().await;
    let client_id = client(&wb, &session, "Textiles Norte S.L.").await;
    seed_catalog(&wb, &session).await;

    let code = error_code(
        &wb,
        &session,
        json!({
            "command": {
                "type": "CreateEntry",
                "payload": {
                    "date": "2024-06-03",
                    "clientId": client_id,
                    "items": [{ "productRef": "POL-001", "sizeQuantities": { "S": i64::MAX, "M": 1 } }]
                }
            }
        }),
    )
    .await;
    assert_eq!(code, "VALIDATION_ERROR");

    // The loop keeps serving after the rejection
    let pending = ok(&wb, &session, json!({ "type": "ListEntries", "payload": { "group": "pending" } })).await;
    assert_eq!(pending, json!([]));
}
