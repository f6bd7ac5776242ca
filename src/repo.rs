use std::marker::PhantomData;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::errors::{map_db_err, AppError};

/// A persisted row type the generic repository can operate on.
pub trait Entity: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin {
    /// Table the entity lives in.
    const TABLE: &'static str;
    /// Select list returned by every operation.
    const COLUMNS: &'static str;
    /// Human-readable name used in error messages.
    const NAME: &'static str;

    fn id(&self) -> i32;
}

/// A value that can be bound into a dynamically built query.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i32),
    Text(String),
    Bool(bool),
}

impl SqlValue {
    fn push_bind_to(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        match self {
            SqlValue::Int(v) => qb.push_bind(*v),
            SqlValue::Text(v) => qb.push_bind(v.clone()),
            SqlValue::Bool(v) => qb.push_bind(*v),
        };
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

/// Equality filter on a column. Column names are compile-time literals from
/// this crate, never request input.
pub type Filter = (&'static str, SqlValue);

/// Mapping from an input shape to the columns it sets.
///
/// Create shapes emit every column; update shapes emit only the fields that
/// are present, which is what gives `update` its partial-merge semantics.
pub trait Columns {
    fn columns(&self) -> Vec<(&'static str, SqlValue)>;
}

fn push_filters(qb: &mut QueryBuilder<'static, Postgres>, filters: &[Filter]) {
    for (i, (col, val)) in filters.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        qb.push(*col);
        qb.push(" = ");
        val.push_bind_to(qb);
    }
}

fn select_query<E: Entity>(filters: &[Filter]) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM {}", E::COLUMNS, E::TABLE));
    push_filters(&mut qb, filters);
    qb.push(" LIMIT 1");
    qb
}

fn list_query<E: Entity>(skip: i64, limit: i64) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {} FROM {} ORDER BY id LIMIT ",
        E::COLUMNS,
        E::TABLE
    ));
    qb.push_bind(limit);
    qb.push(" OFFSET ");
    qb.push_bind(skip);
    qb
}

fn insert_query<E: Entity>(cols: &[(&'static str, SqlValue)]) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("INSERT INTO {} (", E::TABLE));
    for (i, (col, _)) in cols.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(*col);
    }
    qb.push(") VALUES (");
    for (i, (_, val)) in cols.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        val.push_bind_to(&mut qb);
    }
    qb.push(format!(") RETURNING {}", E::COLUMNS));
    qb
}

fn update_query<E: Entity>(
    id: i32,
    cols: &[(&'static str, SqlValue)],
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", E::TABLE));
    for (i, (col, val)) in cols.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(*col);
        qb.push(" = ");
        val.push_bind_to(&mut qb);
    }
    qb.push(" WHERE id = ");
    qb.push_bind(id);
    qb.push(format!(" RETURNING {}", E::COLUMNS));
    qb
}

fn delete_query<E: Entity>(id: i32) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("DELETE FROM {} WHERE id = ", E::TABLE));
    qb.push_bind(id);
    qb
}

/// Uniform create/read/update/delete over one entity type.
///
/// Every call takes the pool explicitly; there is no shared session and every
/// mutating operation is a single auto-committed statement. Callers that need
/// multi-entity atomicity do not get it here.
pub struct CrudRepo<E: Entity> {
    _entity: PhantomData<E>,
}

impl<E: Entity> CrudRepo<E> {
    pub const fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }

    /// First row matching the conjunction of equality filters, or `None`.
    /// A miss is not an error.
    pub async fn get(&self, db: &PgPool, filters: &[Filter]) -> Result<Option<E>, AppError> {
        let mut qb = select_query::<E>(filters);
        let row = qb.build_query_as::<E>().fetch_optional(db).await?;
        Ok(row)
    }

    /// Page of rows ordered by id ascending.
    pub async fn list(&self, db: &PgPool, skip: i64, limit: i64) -> Result<Vec<E>, AppError> {
        let mut qb = list_query::<E>(skip, limit);
        let rows = qb.build_query_as::<E>().fetch_all(db).await?;
        Ok(rows)
    }

    /// Insert a new row and return it with generated fields applied.
    /// A unique-index violation surfaces as [`AppError::Conflict`].
    pub async fn create<C: Columns>(&self, db: &PgPool, input: &C) -> Result<E, AppError> {
        let cols = input.columns();
        let mut qb = insert_query::<E>(&cols);
        qb.build_query_as::<E>().fetch_one(db).await.map_err(map_db_err)
    }

    /// Overwrite exactly the columns `changes` carries and return the
    /// refreshed row. Columns absent from `changes` keep their prior values.
    pub async fn update<C: Columns>(
        &self,
        db: &PgPool,
        existing: &E,
        changes: &C,
    ) -> Result<E, AppError> {
        let cols = changes.columns();
        if cols.is_empty() {
            let mut qb = select_query::<E>(&[("id", SqlValue::Int(existing.id()))]);
            let row = qb.build_query_as::<E>().fetch_one(db).await?;
            return Ok(row);
        }
        let mut qb = update_query::<E>(existing.id(), &cols);
        qb.build_query_as::<E>().fetch_one(db).await.map_err(map_db_err)
    }

    /// Look up, delete, and return the pre-delete snapshot.
    /// A missing row is [`AppError::NotFound`]; a foreign-key violation on
    /// the delete surfaces as [`AppError::Conflict`].
    pub async fn remove(&self, db: &PgPool, filters: &[Filter]) -> Result<E, AppError> {
        let found = self
            .get(db, filters)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} not found", E::NAME)))?;
        let mut qb = delete_query::<E>(found.id());
        qb.build().execute(db).await.map_err(map_db_err)?;
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, sqlx::FromRow)]
    struct Widget {
        id: i32,
        #[allow(dead_code)]
        name: String,
    }

    impl Entity for Widget {
        const TABLE: &'static str = "widgets";
        const COLUMNS: &'static str = "id, name";
        const NAME: &'static str = "Widget";

        fn id(&self) -> i32 {
            self.id
        }
    }

    #[test]
    fn select_renders_filter_conjunction() {
        let qb = select_query::<Widget>(&[
            ("id", SqlValue::Int(7)),
            ("name", SqlValue::Text("bar".into())),
        ]);
        assert_eq!(
            qb.sql(),
            "SELECT id, name FROM widgets WHERE id = $1 AND name = $2 LIMIT 1"
        );
    }

    #[test]
    fn select_without_filters_has_no_where_clause() {
        let qb = select_query::<Widget>(&[]);
        assert_eq!(qb.sql(), "SELECT id, name FROM widgets LIMIT 1");
    }

    #[test]
    fn list_orders_by_id_and_paginates() {
        let qb = list_query::<Widget>(20, 10);
        assert_eq!(
            qb.sql(),
            "SELECT id, name FROM widgets ORDER BY id LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn insert_aligns_columns_and_placeholders() {
        let qb = insert_query::<Widget>(&[
            ("name", SqlValue::Text("foo".into())),
        ]);
        assert_eq!(
            qb.sql(),
            "INSERT INTO widgets (name) VALUES ($1) RETURNING id, name"
        );
    }

    #[test]
    fn update_sets_only_supplied_columns() {
        let qb = update_query::<Widget>(
            3,
            &[("name", SqlValue::Text("foo".into()))],
        );
        assert_eq!(
            qb.sql(),
            "UPDATE widgets SET name = $1 WHERE id = $2 RETURNING id, name"
        );
    }

    #[test]
    fn delete_targets_single_row() {
        let qb = delete_query::<Widget>(3);
        assert_eq!(qb.sql(), "DELETE FROM widgets WHERE id = $1");
    }

    #[test]
    fn sql_value_conversions() {
        assert_eq!(SqlValue::from(5), SqlValue::Int(5));
        assert_eq!(SqlValue::from("x"), SqlValue::Text("x".into()));
        assert_eq!(SqlValue::from(true), SqlValue::Bool(true));
    }
}
