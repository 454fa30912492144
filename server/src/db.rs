// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Database abstraction in terms of the operations needed by the server.
//!
//! Every entity lives in its own table, which is described by an implementation of `Table`.  The
//! operations in this module are generic over that description so that all entities share the
//! same queries.

use crate::model::{Entity, EntityId};
#[cfg(feature = "postgres")]
use hospital_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use hospital_core::db::sqlite;
use hospital_core::db::{DbError, DbResult, Executor};
use hospital_core::model::Direction;
use sqlx::Row;
#[cfg(feature = "postgres")]
use sqlx::postgres::{PgArguments, PgRow, Postgres};
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use time::OffsetDateTime;

mod tables;

/// Type of the values stored in a column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Kind {
    /// Free-form text.
    Text,

    /// 32-bit signed integer.
    Int,

    /// Identifier of another entity.
    Id,

    /// Point in time with a time zone.
    Timestamp,
}

/// Description of a column in a table, other than the `id` primary key.
#[derive(Debug)]
pub(crate) struct Column {
    /// Name of the property that exposes the column in the API.
    pub(crate) property: &'static str,

    /// Name of the column in the database.
    pub(crate) name: &'static str,

    /// Type of the column.
    pub(crate) kind: Kind,
}

/// Value of a column.  All columns are nullable.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Value {
    /// Value of a `Kind::Text` column.
    Text(Option<String>),

    /// Value of a `Kind::Int` column.
    Int(Option<i32>),

    /// Value of a `Kind::Id` column.
    Id(Option<EntityId>),

    /// Value of a `Kind::Timestamp` column.
    Timestamp(Option<OffsetDateTime>),
}

/// Builds the error for a value that does not match the `kind` of its column.
fn type_mismatch(kind: Kind, value: Option<Value>) -> DbError {
    DbError::DataIntegrityError(format!("Expected {:?} value but got {:?}", kind, value))
}

/// Sequential reader over the values of a row, in the order of the columns of its table.
pub(crate) struct Values(std::vec::IntoIter<Value>);

impl Values {
    /// Creates a reader over `values`.
    fn new(values: Vec<Value>) -> Self {
        Self(values.into_iter())
    }

    /// Reads the next value, which must be text.
    pub(crate) fn text(&mut self) -> DbResult<Option<String>> {
        match self.0.next() {
            Some(Value::Text(v)) => Ok(v),
            v => Err(type_mismatch(Kind::Text, v)),
        }
    }

    /// Reads the next value, which must be an integer.
    pub(crate) fn int(&mut self) -> DbResult<Option<i32>> {
        match self.0.next() {
            Some(Value::Int(v)) => Ok(v),
            v => Err(type_mismatch(Kind::Int, v)),
        }
    }

    /// Reads the next value, which must be an identifier.
    pub(crate) fn id(&mut self) -> DbResult<Option<EntityId>> {
        match self.0.next() {
            Some(Value::Id(v)) => Ok(v),
            v => Err(type_mismatch(Kind::Id, v)),
        }
    }

    /// Reads the next value, which must be a timestamp.
    pub(crate) fn timestamp(&mut self) -> DbResult<Option<OffsetDateTime>> {
        match self.0.next() {
            Some(Value::Timestamp(v)) => Ok(v),
            v => Err(type_mismatch(Kind::Timestamp, v)),
        }
    }
}

/// Mapping between the fields of an entity and the table that stores them.
pub(crate) trait Table: Sized {
    /// Name of the table, which is also the name of the entity it stores.
    const NAME: &'static str;

    /// Columns of the table other than the `id` primary key.
    const COLUMNS: &'static [Column];

    /// Returns the values of the fields, in the same order as `COLUMNS`.
    fn to_values(&self) -> Vec<Value>;

    /// Builds the fields from `values`, which come in the same order as `COLUMNS`.
    fn from_values(values: &mut Values) -> DbResult<Self>;
}

/// A sort order on a column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Order {
    /// Name of the column to sort by.  Must be `id` or one of the table's columns.
    column: &'static str,

    /// Direction of the sort.
    direction: Direction,
}

impl Order {
    /// Creates a new sort order on `column`.
    pub(crate) fn new(column: &'static str, direction: Direction) -> Self {
        Self { column, direction }
    }

    /// Formats the order as an `ORDER BY` term.
    fn to_sql(self) -> String {
        match self.direction {
            Direction::Asc => format!("{} ASC", self.column),
            Direction::Desc => format!("{} DESC", self.column),
        }
    }
}

/// Syntax differences between the supported database systems.
#[derive(Clone, Copy)]
enum Dialect {
    /// PostgreSQL syntax.
    #[cfg_attr(not(feature = "postgres"), allow(unused))]
    Postgres,

    /// SQLite syntax.
    #[cfg_attr(not(any(feature = "sqlite", test)), allow(unused))]
    Sqlite,
}

impl Dialect {
    /// Returns the placeholder for the query parameter at the 1-based `position`.
    fn placeholder(self, position: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", position),
            Dialect::Sqlite => format!("?{}", position),
        }
    }

    /// Returns `count` placeholders starting at the 1-based `first` position.
    fn placeholders(self, first: usize, count: usize) -> Vec<String> {
        (first..first + count).map(|i| self.placeholder(i)).collect()
    }
}

/// Returns the names of all columns of `T`, including the `id`.
fn all_columns<T: Table>() -> Vec<&'static str> {
    let mut columns = vec!["id"];
    columns.extend(T::COLUMNS.iter().map(|c| c.name));
    columns
}

/// Generates the query to read entities of type `T`.
fn select_sql<T: Table>() -> String {
    format!("SELECT {} FROM {}", all_columns::<T>().join(", "), T::NAME)
}

/// Generates the query to read one entity of type `T` given its `id`.
fn get_sql<T: Table>(dialect: Dialect) -> String {
    format!("{} WHERE id = {}", select_sql::<T>(), dialect.placeholder(1))
}

/// Generates the query to delete one entity of type `T` given its `id`.
fn delete_sql<T: Table>(dialect: Dialect) -> String {
    format!("DELETE FROM {} WHERE id = {}", T::NAME, dialect.placeholder(1))
}

/// Generates the query to insert an entity of type `T`.  The store assigns the `id`.
fn insert_sql<T: Table>(dialect: Dialect) -> String {
    let columns = T::COLUMNS.iter().map(|c| c.name).collect::<Vec<&str>>();
    format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING id",
        T::NAME,
        columns.join(", "),
        dialect.placeholders(1, columns.len()).join(", ")
    )
}

/// Generates the query to replace the fields of an entity of type `T`.  The `id` goes last.
fn update_sql<T: Table>(dialect: Dialect) -> String {
    let assignments = T::COLUMNS
        .iter()
        .zip(dialect.placeholders(1, T::COLUMNS.len()))
        .map(|(c, p)| format!("{} = {}", c.name, p))
        .collect::<Vec<String>>();
    format!(
        "UPDATE {} SET {} WHERE id = {}",
        T::NAME,
        assignments.join(", "),
        dialect.placeholder(T::COLUMNS.len() + 1)
    )
}

/// Generates the query to read a page of entities of type `T` sorted by `orders`.  The limit and
/// the offset are the two query parameters.
fn list_sql<T: Table>(dialect: Dialect, orders: &[Order]) -> String {
    let mut sql = select_sql::<T>();
    if !orders.is_empty() {
        let terms = orders.iter().map(|o| o.to_sql()).collect::<Vec<String>>();
        sql.push_str(&format!(" ORDER BY {}", terms.join(", ")));
    }
    sql.push_str(&format!(
        " LIMIT {} OFFSET {}",
        dialect.placeholder(1),
        dialect.placeholder(2)
    ));
    sql
}

/// Converts a page bound into the type the databases use for `LIMIT` and `OFFSET`.
fn to_sql_bound(name: &str, value: u64) -> DbResult<i64> {
    i64::try_from(value).map_err(|e| DbError::BackendError(format!("Invalid {}: {}", name, e)))
}

/// Type of the queries issued against PostgreSQL.
#[cfg(feature = "postgres")]
type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// Binds `value` as the next parameter of the PostgreSQL `query`.
#[cfg(feature = "postgres")]
fn bind_pg(query: PgQuery<'_>, value: Value) -> PgQuery<'_> {
    match value {
        Value::Text(v) => query.bind(v),
        Value::Int(v) => query.bind(v),
        Value::Id(v) => query.bind(v.map(EntityId::as_i64)),
        Value::Timestamp(v) => query.bind(v),
    }
}

/// Converts a PostgreSQL `row` read with `select_sql` into an entity.
#[cfg(feature = "postgres")]
fn decode_pg_row<T: Table>(row: PgRow) -> DbResult<Entity<T>> {
    let id: i64 = row.try_get("id").map_err(postgres::map_sqlx_error)?;

    let mut values = Vec::with_capacity(T::COLUMNS.len());
    for column in T::COLUMNS {
        let name = column.name;
        let value = match column.kind {
            Kind::Text => Value::Text(row.try_get(name).map_err(postgres::map_sqlx_error)?),
            Kind::Int => Value::Int(row.try_get(name).map_err(postgres::map_sqlx_error)?),
            Kind::Id => {
                let id: Option<i64> = row.try_get(name).map_err(postgres::map_sqlx_error)?;
                Value::Id(id.map(EntityId::new))
            }
            Kind::Timestamp => {
                Value::Timestamp(row.try_get(name).map_err(postgres::map_sqlx_error)?)
            }
        };
        values.push(value);
    }

    let fields = T::from_values(&mut Values::new(values))?;
    Ok(Entity::saved(EntityId::new(id), fields))
}

/// Type of the queries issued against SQLite.
#[cfg(any(feature = "sqlite", test))]
type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Binds `value` as the next parameter of the SQLite `query`.
#[cfg(any(feature = "sqlite", test))]
fn bind_sqlite(query: SqliteQuery<'_>, value: Value) -> SqliteQuery<'_> {
    match value {
        Value::Text(v) => query.bind(v),
        Value::Int(v) => query.bind(v),
        Value::Id(v) => query.bind(v.map(EntityId::as_i64)),
        Value::Timestamp(v) => query.bind(v),
    }
}

/// Converts an SQLite `row` read with `select_sql` into an entity.
#[cfg(any(feature = "sqlite", test))]
fn decode_sqlite_row<T: Table>(row: SqliteRow) -> DbResult<Entity<T>> {
    let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;

    let mut values = Vec::with_capacity(T::COLUMNS.len());
    for column in T::COLUMNS {
        let name = column.name;
        let value = match column.kind {
            Kind::Text => Value::Text(row.try_get(name).map_err(sqlite::map_sqlx_error)?),
            Kind::Int => Value::Int(row.try_get(name).map_err(sqlite::map_sqlx_error)?),
            Kind::Id => {
                let id: Option<i64> = row.try_get(name).map_err(sqlite::map_sqlx_error)?;
                Value::Id(id.map(EntityId::new))
            }
            Kind::Timestamp => {
                Value::Timestamp(row.try_get(name).map_err(sqlite::map_sqlx_error)?)
            }
        };
        values.push(value);
    }

    let fields = T::from_values(&mut Values::new(values))?;
    Ok(Entity::saved(EntityId::new(id), fields))
}

/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("db/postgres.sql")).await,

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("db/sqlite.sql")).await,

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Stores `fields` as a new entity of type `T` and returns the identifier assigned to it.
pub(crate) async fn insert<T: Table>(ex: &mut Executor, fields: &T) -> DbResult<EntityId> {
    let values = fields.to_values();
    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let sql = insert_sql::<T>(Dialect::Postgres);
            let query = values.into_iter().fold(sqlx::query(&sql), bind_pg);
            let row = query.fetch_one(ex.conn()).await.map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let sql = insert_sql::<T>(Dialect::Sqlite);
            let query = values.into_iter().fold(sqlx::query(&sql), bind_sqlite);
            let row = query.fetch_one(ex.conn()).await.map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(EntityId::new(id))
}

/// Replaces the fields of the entity of type `T` identified by `id`.
///
/// Returns false if there is no such entity.
pub(crate) async fn update<T: Table>(
    ex: &mut Executor,
    id: EntityId,
    fields: &T,
) -> DbResult<bool> {
    let mut values = fields.to_values();
    values.push(Value::Id(Some(id)));
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let sql = update_sql::<T>(Dialect::Postgres);
            let query = values.into_iter().fold(sqlx::query(&sql), bind_pg);
            let done = query.execute(ex.conn()).await.map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let sql = update_sql::<T>(Dialect::Sqlite);
            let query = values.into_iter().fold(sqlx::query(&sql), bind_sqlite);
            let done = query.execute(ex.conn()).await.map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(rows_affected > 0)
}

/// Gets the entity of type `T` identified by `id`.
pub(crate) async fn get<T: Table>(ex: &mut Executor, id: EntityId) -> DbResult<Entity<T>> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let sql = get_sql::<T>(Dialect::Postgres);
            let row = sqlx::query(&sql)
                .bind(id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            decode_pg_row::<T>(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let sql = get_sql::<T>(Dialect::Sqlite);
            let row = sqlx::query(&sql)
                .bind(id.as_i64())
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            decode_sqlite_row::<T>(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Counts all entities of type `T`.
pub(crate) async fn count<T: Table>(ex: &mut Executor) -> DbResult<u64> {
    let sql = format!("SELECT COUNT(*) AS count FROM {}", T::NAME);
    let count: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let row =
                sqlx::query(&sql).fetch_one(ex.conn()).await.map_err(postgres::map_sqlx_error)?;
            row.try_get("count").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let row =
                sqlx::query(&sql).fetch_one(ex.conn()).await.map_err(sqlite::map_sqlx_error)?;
            row.try_get("count").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    u64::try_from(count)
        .map_err(|e| DbError::DataIntegrityError(format!("Invalid count {}: {}", count, e)))
}

/// Gets up to `limit` entities of type `T` sorted by `orders`, skipping the first `offset`.
pub(crate) async fn list<T: Table>(
    ex: &mut Executor,
    orders: &[Order],
    limit: u64,
    offset: u64,
) -> DbResult<Vec<Entity<T>>> {
    let limit = to_sql_bound("limit", limit)?;
    let offset = to_sql_bound("offset", offset)?;
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let sql = list_sql::<T>(Dialect::Postgres, orders);
            let rows = sqlx::query(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.into_iter().map(decode_pg_row::<T>).collect()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let sql = list_sql::<T>(Dialect::Sqlite, orders);
            let rows = sqlx::query(&sql)
                .bind(limit)
                .bind(offset)
                .fetch_all(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            rows.into_iter().map(decode_sqlite_row::<T>).collect()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Deletes the entity of type `T` identified by `id`.
pub(crate) async fn delete<T: Table>(ex: &mut Executor, id: EntityId) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let sql = delete_sql::<T>(Dialect::Postgres);
            let done = sqlx::query(&sql)
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let sql = delete_sql::<T>(Dialect::Sqlite);
            let done = sqlx::query(&sql)
                .bind(id.as_i64())
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    if rows_affected == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
