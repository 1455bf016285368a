use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DbBackend, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::{
    field_value, merge_patch, CasOutcome, Collection, Filter, Record, RecordStore,
    CREATED_AT_FIELD, ID_FIELD, UPDATED_AT_FIELD,
};
use crate::{entities::record, errors::ServiceError};

/// Attempts before a versioned write gives up under contention.
const MAX_WRITE_ATTEMPTS: usize = 8;

/// Record store over a single `records` table.
///
/// Writes are optimistic: a row is read, patched in memory and written back
/// with `WHERE version = <read version>`. Zero affected rows means another
/// writer got there first, so the row is re-read and the write retried.
#[derive(Clone)]
pub struct SqlRecordStore {
    db: Arc<DatabaseConnection>,
}

impl SqlRecordStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn load(
        &self,
        collection: Collection,
        id: i64,
    ) -> Result<Option<record::Model>, ServiceError> {
        record::Entity::find_by_id(id)
            .filter(record::Column::Collection.eq(collection.as_ref()))
            .one(&*self.db)
            .await
            .map_err(|e| {
                error!(%collection, id, "Failed to load record: {}", e);
                ServiceError::DatabaseError(e)
            })
    }

    /// Writes `data` if the row is still at `model.version`.
    async fn write_versioned(
        &self,
        model: &record::Model,
        data: Record,
    ) -> Result<Option<Record>, ServiceError> {
        let now = Utc::now();
        let result = record::Entity::update_many()
            .col_expr(record::Column::Data, Expr::value(Value::Object(data.clone())))
            .col_expr(record::Column::Version, Expr::value(model.version + 1))
            .col_expr(record::Column::UpdatedAt, Expr::value(now))
            .filter(record::Column::Id.eq(model.id))
            .filter(record::Column::Version.eq(model.version))
            .exec(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        let mut updated = data;
        stamp(&mut updated, model.id, model.created_at.to_rfc3339(), now.to_rfc3339());
        Ok(Some(updated))
    }
}

fn stamp(record: &mut Record, id: i64, created_at: String, updated_at: String) {
    record.insert(ID_FIELD.to_string(), Value::from(id));
    record.insert(CREATED_AT_FIELD.to_string(), Value::String(created_at));
    record.insert(UPDATED_AT_FIELD.to_string(), Value::String(updated_at));
}

fn payload(model: &record::Model) -> Record {
    match &model.data {
        Value::Object(map) => map.clone(),
        _ => Record::new(),
    }
}

fn into_record(model: record::Model) -> Record {
    let mut record = payload(&model);
    stamp(
        &mut record,
        model.id,
        model.created_at.to_rfc3339(),
        model.updated_at.to_rfc3339(),
    );
    record
}

/// SQL form of one equality condition on the JSON payload, compared as text.
///
/// Only string and integer values on plain field names are pushed down. Rows
/// coming back are still checked with [`Filter::matches`], which is what
/// treats an absent field as `null`.
fn payload_condition(backend: DbBackend, field: &str, value: &Value) -> Option<SimpleExpr> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
        _ => return None,
    };
    match backend {
        DbBackend::Sqlite => Some(Expr::cust_with_values(
            r#"CAST(json_extract("data", ?) AS TEXT) = ?"#,
            [format!("$.{}", field), text],
        )),
        DbBackend::Postgres => Some(Expr::cust_with_values(
            r#"("data" ->> ?) = ?"#,
            [field.to_string(), text],
        )),
        _ => None,
    }
}

fn strip_stamps(mut record: Record) -> Record {
    record.remove(ID_FIELD);
    record.remove(CREATED_AT_FIELD);
    record.remove(UPDATED_AT_FIELD);
    record
}

#[async_trait]
impl RecordStore for SqlRecordStore {
    async fn fetch(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Record>, ServiceError> {
        let backend = self.db.get_database_backend();
        let mut query =
            record::Entity::find().filter(record::Column::Collection.eq(collection.as_ref()));
        for (field, value) in &filter.conditions {
            if let Some(condition) = payload_condition(backend, field, value) {
                query = query.filter(condition);
            }
        }

        let rows = query
            .order_by_asc(record::Column::Id)
            .all(&*self.db)
            .await
            .map_err(|e| {
                error!(%collection, "Failed to fetch records: {}", e);
                ServiceError::DatabaseError(e)
            })?;

        Ok(rows
            .into_iter()
            .map(into_record)
            .filter(|record| filter.matches(record))
            .collect())
    }

    async fn get(&self, collection: Collection, id: i64) -> Result<Option<Record>, ServiceError> {
        Ok(self.load(collection, id).await?.map(into_record))
    }

    async fn insert(&self, collection: Collection, record: Record) -> Result<Record, ServiceError> {
        let now = Utc::now();
        let active = record::ActiveModel {
            id: NotSet,
            collection: Set(collection.as_ref().to_string()),
            data: Set(Value::Object(strip_stamps(record))),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active.insert(&*self.db).await.map_err(|e| {
            error!(%collection, "Failed to insert record: {}", e);
            ServiceError::DatabaseError(e)
        })?;
        debug!(%collection, id = model.id, "record inserted");
        Ok(into_record(model))
    }

    async fn update(
        &self,
        collection: Collection,
        id: i64,
        patch: Record,
    ) -> Result<Option<Record>, ServiceError> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let Some(model) = self.load(collection, id).await? else {
                return Ok(None);
            };
            let mut data = payload(&model);
            merge_patch(&mut data, strip_stamps(patch.clone()));

            if let Some(updated) = self.write_versioned(&model, data).await? {
                return Ok(Some(updated));
            }
            warn!(%collection, id, "version conflict on update, retrying");
        }

        Err(ServiceError::ConcurrentModification(format!(
            "{} record {} kept changing during update",
            collection, id
        )))
    }

    async fn delete(&self, collection: Collection, id: i64) -> Result<bool, ServiceError> {
        let result = record::Entity::delete_many()
            .filter(record::Column::Id.eq(id))
            .filter(record::Column::Collection.eq(collection.as_ref()))
            .exec(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)?;
        Ok(result.rows_affected > 0)
    }

    async fn compare_and_update(
        &self,
        collection: Collection,
        id: i64,
        field: &str,
        expected: &Value,
        patch: Record,
    ) -> Result<CasOutcome, ServiceError> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let Some(model) = self.load(collection, id).await? else {
                return Ok(CasOutcome::Missing);
            };
            let mut data = payload(&model);
            if field_value(&data, field) != expected {
                return Ok(CasOutcome::Mismatch(into_record(model)));
            }
            merge_patch(&mut data, strip_stamps(patch.clone()));

            if let Some(updated) = self.write_versioned(&model, data).await? {
                return Ok(CasOutcome::Updated(updated));
            }
            debug!(%collection, id, field, "version conflict on compare-and-update, re-checking");
        }

        Err(ServiceError::ConcurrentModification(format!(
            "{} record {} kept changing while checking {}",
            collection, id, field
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_text_and_integer_conditions_are_pushed_down() {
        for backend in [DbBackend::Sqlite, DbBackend::Postgres] {
            assert!(payload_condition(backend, "status", &json!("ordered")).is_some());
            assert!(payload_condition(backend, "sales_order_id", &json!(7)).is_some());
            assert!(payload_condition(backend, "breakdown_item_id", &Value::Null).is_none());
            assert!(payload_condition(backend, "approved_for_shipment", &json!(true)).is_none());
            assert!(payload_condition(backend, "status') OR 1=1 --", &json!("x")).is_none());
        }
        assert!(payload_condition(DbBackend::MySql, "status", &json!("ordered")).is_none());
    }
}
