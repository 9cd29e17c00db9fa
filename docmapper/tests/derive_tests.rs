use docmapper::{memory::InMemoryStore, prelude::*, serde_json::json};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Record)]
struct User {
    #[record(id)]
    id: String,
    username: String,
    #[record(omit_empty)]
    #[serde(default)]
    email: Option<String>,
    #[serde(rename = "dateOfBirth", default)]
    date_of_birth: Option<String>,
    #[serde(default)]
    active: bool,
    #[serde(skip)]
    cached: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Record)]
#[serde(rename_all = "camelCase")]
struct Order {
    #[record(id)]
    order_id: String,
    customer_name: String,
    amount: i64,
    #[record(version)]
    #[serde(default)]
    revision: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Record)]
struct BadKey {
    #[record(id)]
    id: u64,
}

#[test]
fn derive_builds_descriptor_table() {
    assert_eq!(
        User::fields(),
        &[
            FieldDescriptor::new("id", FieldKind::String).identifier(),
            FieldDescriptor::new("username", FieldKind::String),
            FieldDescriptor::new("email", FieldKind::Optional).omit_empty(),
            FieldDescriptor::new("date_of_birth", FieldKind::Optional).key("dateOfBirth"),
            FieldDescriptor::new("active", FieldKind::Bool),
        ]
    );
    assert_eq!(User::type_name(), "User");
}

#[test]
fn derive_applies_rename_all_and_version() {
    let map = FieldMap::build::<Order>(&FieldMapOptions::default()).unwrap();

    assert_eq!(map.id_key(), "orderId");
    assert_eq!(map.version_key(), Some("revision"));
    assert_eq!(map.resolve_key("customer_name"), Some("customerName"));
}

#[test]
fn non_string_identifier_is_rejected() {
    let err = Repository::<_, BadKey>::new(InMemoryStore::new(), "bad").unwrap_err();

    assert!(matches!(err, DocumentStoreError::InvalidShape(_)));
}

#[tokio::test]
async fn derived_records_round_trip_through_repository() {
    let store = DocumentStore::new(InMemoryStore::builder().build().await.unwrap());
    let users = store.repository::<User>("users").unwrap();

    let user = User {
        id: "u1".to_string(),
        username: "tony".to_string(),
        date_of_birth: Some("1970-05-29".to_string()),
        active: true,
        ..Default::default()
    };

    assert_eq!(users.create(&user).await.unwrap(), Outcome(1));
    assert_eq!(users.load("u1").await.unwrap(), Some(user));

    store.shutdown().await.unwrap();
}

#[tokio::test]
async fn versioned_records_search_by_wire_key() {
    let orders = Repository::<_, Order>::new(InMemoryStore::new(), "orders")
        .unwrap()
        .into_search(
            |name: &String| json!({ "term": { "customerName": name } }),
            |_: &String| "-amount,order_id".to_string(),
        );

    for (id, customer, amount) in [("o1", "tony", 10), ("o2", "pepper", 20), ("o3", "tony", 30)] {
        let order = Order {
            order_id: id.to_string(),
            customer_name: customer.to_string(),
            amount,
            revision: 0,
        };
        orders.create(&order).await.unwrap();
    }

    let page = orders.search(&"tony".to_string(), 10, 0).await.unwrap();
    let ids: Vec<_> = page.items.iter().map(|order| order.order_id.as_str()).collect();

    assert_eq!(page.total, 2);
    assert_eq!(ids, vec!["o3", "o1"]);
    assert!(page.items.iter().all(|order| order.revision == 1));
}
