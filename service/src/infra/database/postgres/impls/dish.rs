//! [`Dish`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Select, Update};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{dish, Dish},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Columns of the `dishes` table, in the order [`from_row()`] expects.
const COLUMNS: &str = "\
    id, name, description, price, image_url, \
    category_id, created_at, updated_at";

/// Reads a [`Dish`] from the provided [`Row`].
fn from_row(row: &Row) -> Dish {
    Dish {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        price: row.get("price"),
        image_url: row.get("image_url"),
        category_id: row.get("category_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl<C> Database<Select<By<Option<Dish>, dish::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Dish>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Dish>, dish::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!("SELECT {COLUMNS} FROM dishes WHERE id = $1::UUID");
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Dish>, dish::Filter>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Dish>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Dish>, dish::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let dish::Filter { category_id } = by.into_inner();

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM dishes \
             WHERE $1::INT4 IS NULL OR category_id = $1::INT4 \
             ORDER BY category_id, name, id",
        );
        Ok(self
            .query(&sql, &[&category_id])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Dish>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(dish): Insert<Dish>,
    ) -> Result<Self::Ok, Self::Err> {
        let Dish {
            id,
            name,
            description,
            price,
            image_url,
            category_id,
            created_at,
            updated_at,
        } = dish;

        const SQL: &str = "\
            INSERT INTO dishes (\
                id, name, description, price, image_url, \
                category_id, created_at, updated_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, $3::TEXT, $4::NUMERIC, $5::VARCHAR, \
                $6::INT4, $7::TIMESTAMPTZ, $8::TIMESTAMPTZ\
            )";
        self.exec(
            SQL,
            &[
                &id,
                &name,
                &description,
                &price,
                &image_url,
                &category_id,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Update<Dish>> for Postgres<C>
where
    C: Connection,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(dish): Update<Dish>,
    ) -> Result<Self::Ok, Self::Err> {
        let Dish {
            id,
            name,
            description,
            price,
            image_url,
            category_id,
            created_at: _,
            updated_at,
        } = dish;

        const SQL: &str = "\
            UPDATE dishes \
            SET name = $2::VARCHAR, \
                description = $3::TEXT, \
                price = $4::NUMERIC, \
                image_url = $5::VARCHAR, \
                category_id = $6::INT4, \
                updated_at = $7::TIMESTAMPTZ \
            WHERE id = $1::UUID";
        self.exec(
            SQL,
            &[
                &id,
                &name,
                &description,
                &price,
                &image_url,
                &category_id,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(|affected| affected > 0)
    }
}

impl<C> Database<Delete<By<Dish, dish::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Dish, dish::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "DELETE FROM dishes WHERE id = $1::UUID";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(|affected| affected > 0)
    }
}
