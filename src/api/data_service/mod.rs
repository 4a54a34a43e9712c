use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DbErr, Order};

use crate::api::{
    db::{self, SchoolFilter},
    dto,
};

#[cfg(test)]
pub(crate) mod memory;

/// Persistence seam of the directory.
#[async_trait]
pub(crate) trait SchoolStore: Sync + Send {
    async fn count(&self, filter: &SchoolFilter) -> Result<u64, DbErr>;
    /// `order` applies to the creation time, ties are broken by id.
    async fn find(
        &self,
        filter: &SchoolFilter,
        skip: u64,
        take: u64,
        order: Order,
    ) -> Result<Vec<dto::School>, DbErr>;
    async fn insert(&self, school: dto::NewSchool) -> Result<i32, DbErr>;
    async fn facets(&self) -> Result<dto::SchoolFacets, DbErr>;
}

pub(crate) struct SchoolDataService {
    db: DatabaseConnection,
}

impl SchoolDataService {
    pub(crate) fn new(db: &DatabaseConnection) -> Self {
        Self { db: db.clone() }
    }
}

#[async_trait]
impl SchoolStore for SchoolDataService {
    async fn count(&self, filter: &SchoolFilter) -> Result<u64, DbErr> {
        db::count_schools(&self.db, filter).await
    }

    async fn find(
        &self,
        filter: &SchoolFilter,
        skip: u64,
        take: u64,
        order: Order,
    ) -> Result<Vec<dto::School>, DbErr> {
        Ok(db::find_schools(&self.db, filter, skip, take, order)
            .await?
            .into_iter()
            .map(dto::School::from)
            .collect())
    }

    async fn insert(&self, school: dto::NewSchool) -> Result<i32, DbErr> {
        db::insert_school(&self.db, school).await
    }

    async fn facets(&self) -> Result<dto::SchoolFacets, DbErr> {
        db::school_facets(&self.db).await
    }
}
