use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, Order, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, QueryTrait,
};
use sea_query::{Expr, Func, LikeExpr};
use tracing::debug;

use entity::school::{Column as SchoolColumn, Entity as Schools};

use super::dto::{self, SchoolFacets};

/// Columns a free-text search looks into.
pub(crate) const SEARCH_COLUMNS: [SchoolColumn; 4] = [
    SchoolColumn::Name,
    SchoolColumn::Address,
    SchoolColumn::City,
    SchoolColumn::State,
];

const LIKE_ESCAPE: char = '\\';

/// Normalized listing filter. Blank inputs are dropped, so the default
/// value matches every school.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SchoolFilter {
    search: Option<String>,
    city: Option<String>,
    state: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl SchoolFilter {
    pub(crate) fn new(search: Option<&str>, city: Option<&str>, state: Option<&str>) -> Self {
        Self {
            search: non_blank(search),
            city: non_blank(city),
            state: non_blank(state),
        }
    }

    pub(crate) fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub(crate) fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    pub(crate) fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub(crate) fn is_match_all(&self) -> bool {
        self.search.is_none() && self.city.is_none() && self.state.is_none()
    }

    /// Search term as a case-insensitive, literal `LIKE` pattern.
    fn search_pattern(&self) -> Option<String> {
        self.search
            .as_ref()
            .map(|term| format!("%{}%", escape_like(&term.to_lowercase())))
    }

    /// `None` for a match-all filter, so no `WHERE` clause is rendered.
    pub(crate) fn condition(&self) -> Option<Condition> {
        if self.is_match_all() {
            return None;
        }
        let mut condition = Condition::all();
        if let Some(pattern) = self.search_pattern() {
            condition = condition.add(SEARCH_COLUMNS.iter().fold(
                Condition::any(),
                |any, column| {
                    any.add(
                        Expr::expr(Func::lower(Expr::col(*column)))
                            .like(LikeExpr::new(pattern.as_str()).escape(LIKE_ESCAPE)),
                    )
                },
            ));
        }
        if let Some(ref city) = self.city {
            condition = condition.add(SchoolColumn::City.eq(city.as_str()));
        }
        if let Some(ref state) = self.state {
            condition = condition.add(SchoolColumn::State.eq(state.as_str()));
        }
        Some(condition)
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

pub(crate) async fn count_schools<C: ConnectionTrait>(
    db: &C,
    filter: &SchoolFilter,
) -> Result<u64, sea_orm::DbErr> {
    Schools::find()
        .apply_if(filter.condition(), |query, condition| query.filter(condition))
        .count(db)
        .await
}

/// One page of schools, sorted by creation time and then by id.
pub(crate) async fn find_schools<C: ConnectionTrait>(
    db: &C,
    filter: &SchoolFilter,
    skip: u64,
    take: u64,
    order: Order,
) -> Result<Vec<entity::school::Model>, sea_orm::DbErr> {
    Schools::find()
        .apply_if(filter.condition(), |query, condition| query.filter(condition))
        .order_by(SchoolColumn::CreatedAt, order.clone())
        .order_by(SchoolColumn::Id, order)
        .offset(skip)
        .limit(take)
        .all(db)
        .await
}

pub(crate) async fn insert_school<C: ConnectionTrait>(
    db: &C,
    school: dto::NewSchool,
) -> Result<i32, sea_orm::DbErr> {
    let result = Schools::insert(entity::school::ActiveModel {
        id: NotSet,
        name: Set(school.name),
        address: Set(school.address),
        city: Set(school.city),
        state: Set(school.state),
        contact: Set(school.contact),
        image: Set(school.image),
        email_id: Set(school.email_id),
        created_at: NotSet,
    })
    .exec(db)
    .await?;
    debug!("Inserted school {}", result.last_insert_id);
    Ok(result.last_insert_id)
}

async fn distinct_values<C: ConnectionTrait>(
    db: &C,
    column: SchoolColumn,
) -> Result<Vec<String>, sea_orm::DbErr> {
    Schools::find()
        .select_only()
        .column(column)
        .distinct()
        .order_by_asc(column)
        .into_tuple()
        .all(db)
        .await
}

pub(crate) async fn school_facets<C: ConnectionTrait>(
    db: &C,
) -> Result<SchoolFacets, sea_orm::DbErr> {
    Ok(SchoolFacets {
        cities: distinct_values(db, SchoolColumn::City).await?,
        states: distinct_values(db, SchoolColumn::State).await?,
    })
}
