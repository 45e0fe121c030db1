//! Session-scoped persist/merge/get/remove over one mapped table.

use super::{Session, SqlEntity, SqlValue};
use crate::db::data_access_error;
use crate::error::{StoreError, StoreResult};
use crate::model::entity::EntityId;
use log::debug;
use rusqlite::params_from_iter;
use std::marker::PhantomData;
use uuid::Uuid;

/// Generic relational store for `T`, bound to the session that created it.
pub struct RelationalStore<'s, T> {
    session: &'s Session<'s>,
    _marker: PhantomData<fn() -> T>,
}

impl<'s, T: SqlEntity> RelationalStore<'s, T> {
    pub fn new(session: &'s Session<'s>) -> Self {
        Self {
            session,
            _marker: PhantomData,
        }
    }

    pub fn session(&self) -> &'s Session<'s> {
        self.session
    }

    /// Inserts a new row under a fresh UUID and returns it.
    pub fn persist(&self, entity: &T) -> StoreResult<EntityId> {
        if let Some(existing) = entity.id() {
            return Err(StoreError::InvalidIdentifier {
                entity: T::NAME,
                value: existing.to_string(),
            });
        }

        let id = Uuid::new_v4().to_string();
        let placeholders = (1..=T::COLUMNS.len() + 1)
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} (id, {}) VALUES ({placeholders});",
            T::TABLE,
            T::COLUMNS.join(", ")
        );

        let mut values = Vec::with_capacity(T::COLUMNS.len() + 1);
        values.push(SqlValue::Text(id.clone()));
        values.extend(entity.column_values());

        self.session
            .conn()
            .execute(&sql, params_from_iter(values))
            .map_err(|err| data_access_error(T::NAME, "persist", err))?;
        debug!(
            "event=sql_persist module=relational status=ok entity={} span_id={}",
            T::NAME,
            self.session.span_id()
        );
        Ok(id)
    }

    /// Overwrites the row carrying the entity's identifier.
    pub fn merge(&self, entity: &T) -> StoreResult<()> {
        let id = entity.id().ok_or_else(|| StoreError::InvalidIdentifier {
            entity: T::NAME,
            value: String::new(),
        })?;
        validate_id::<T>(id)?;

        let assignments = T::COLUMNS
            .iter()
            .enumerate()
            .map(|(index, column)| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE id = ?{};",
            T::TABLE,
            T::COLUMNS.len() + 1
        );

        let mut values = entity.column_values();
        values.push(SqlValue::Text(id.to_string()));

        let changed = self
            .session
            .conn()
            .execute(&sql, params_from_iter(values))
            .map_err(|err| data_access_error(T::NAME, "merge", err))?;
        if changed == 0 {
            return Err(StoreError::not_found(T::NAME, id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> StoreResult<Option<T>> {
        validate_id::<T>(id)?;
        let mut rows = self.select_where("find_by_id", "id", SqlValue::Text(id.to_string()))?;
        Ok(rows.pop())
    }

    /// Every row, in insertion order.
    pub fn find_all(&self) -> StoreResult<Vec<T>> {
        self.select("find_all", "", Vec::new())
    }

    /// Rows whose `column` equals `value`, in insertion order.
    pub fn find_where(&self, column: &str, value: SqlValue) -> StoreResult<Vec<T>> {
        if !T::COLUMNS.iter().any(|known| *known == column) {
            return Err(StoreError::mapping(
                T::NAME,
                format!("unknown column `{column}` for table {}", T::TABLE),
            ));
        }
        self.select_where("find_where", column, value)
    }

    /// Removes the row with `id`. Returns `false` when nothing matched.
    pub fn delete_by_id(&self, id: &str) -> StoreResult<bool> {
        validate_id::<T>(id)?;
        let changed = self
            .session
            .conn()
            .execute(&format!("DELETE FROM {} WHERE id = ?1;", T::TABLE), [id])
            .map_err(|err| data_access_error(T::NAME, "delete_by_id", err))?;
        Ok(changed > 0)
    }

    fn select_where(
        &self,
        operation: &'static str,
        column: &str,
        value: SqlValue,
    ) -> StoreResult<Vec<T>> {
        self.select(operation, &format!("WHERE {column} = ?1"), vec![value])
    }

    pub(crate) fn select(
        &self,
        operation: &'static str,
        clause: &str,
        values: Vec<SqlValue>,
    ) -> StoreResult<Vec<T>> {
        let sql = format!(
            "SELECT id, {} FROM {} {clause} ORDER BY rowid ASC;",
            T::COLUMNS.join(", "),
            T::TABLE
        );
        let conn = self.session.conn();
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|err| data_access_error(T::NAME, operation, err))?;
        let mut rows = stmt
            .query(params_from_iter(values))
            .map_err(|err| data_access_error(T::NAME, operation, err))?;

        let mut items = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|err| data_access_error(T::NAME, operation, err))?
        {
            items.push(T::from_row(row).map_err(|message| StoreError::mapping(T::NAME, message))?);
        }
        Ok(items)
    }
}

fn validate_id<T: SqlEntity>(id: &str) -> StoreResult<()> {
    Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| StoreError::InvalidIdentifier {
            entity: T::NAME,
            value: id.to_string(),
        })
}
