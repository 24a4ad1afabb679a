//! Postgres adapter round trips against a real database.
//!
//! Run with: MODREG_TEST_DATABASE_URL="postgresql:///modreg_test" cargo test -p modreg_postgres -- --ignored

use modreg_core::error::RegistryError;
use modreg_core::field::{FieldDescriptor, FieldType, SelectOption};
use modreg_core::module::ModuleDefinition;
use modreg_core::ports::{ModuleStore, RecordStore};
use modreg_postgres::PgStores;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

async fn pool() -> PgPool {
    let url = std::env::var("MODREG_TEST_DATABASE_URL")
        .expect("MODREG_TEST_DATABASE_URL must be set for integration tests");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("failed to connect to test database");
    PgStores::migrate(&pool).await.expect("migration failed");
    pool
}

fn unique_key(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore] // requires MODREG_TEST_DATABASE_URL
async fn module_fields_round_trip_and_version_guard() {
    let stores = PgStores::new(pool().await);
    let key = unique_key("bill");
    let mut relation = FieldDescriptor::new("retailer", FieldType::relation("retailer", false));
    if let FieldType::Relation(spec) = &mut relation.field_type {
        spec.options = vec![SelectOption::new("Acme", "R1")];
    }
    let module = ModuleDefinition::new(
        &key,
        "Bill",
        vec![
            relation,
            FieldDescriptor::new(
                "mode",
                FieldType::dropdown(vec![SelectOption::new("Cash", "cash")]),
            ),
        ],
    );
    stores.modules.insert(&module).await.unwrap();

    let loaded = stores.modules.get(&key).await.unwrap();
    assert_eq!(loaded.id, module.id);
    assert!(loaded.fields[0].options().is_empty(), "hydrated options must not persist");
    assert_eq!(loaded.fields[1].options(), [SelectOption::new("Cash", "cash")]);

    let updated = stores
        .modules
        .replace_fields(module.id, &loaded.fields[..1], 1)
        .await
        .unwrap();
    assert_eq!(updated.version, 2);
    assert_eq!(updated.fields.len(), 1);

    let err = stores
        .modules
        .replace_fields(module.id, &loaded.fields, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::Conflict(_)));

    let dup = stores.modules.insert(&ModuleDefinition::new(&key, "Again", vec![])).await;
    assert!(matches!(dup, Err(RegistryError::Conflict(_))));
}

#[tokio::test]
#[ignore] // requires MODREG_TEST_DATABASE_URL
async fn record_crud_is_scoped_by_module() {
    let stores = PgStores::new(pool().await);
    let key = unique_key("retailer");
    let data = json!({"shopName": "Acme"}).as_object().cloned().unwrap();

    let created = stores.records.create(&key, data).await.unwrap();
    assert_eq!(stores.records.list(&key).await.unwrap().len(), 1);
    assert_eq!(created.display_label(), "Acme");

    let changed = json!({"shopName": "Acme Shop"}).as_object().cloned().unwrap();
    let updated = stores.records.update(&key, &created.id, changed).await.unwrap();
    assert_eq!(updated.data["shopName"], "Acme Shop");

    assert!(matches!(
        stores.records.get("elsewhere", &created.id).await,
        Err(RegistryError::NotFound(_))
    ));

    stores.records.delete(&key, &created.id).await.unwrap();
    assert!(matches!(
        stores.records.delete(&key, &created.id).await,
        Err(RegistryError::NotFound(_))
    ));
}
