use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use entity::school::Column as SchoolColumn;
use sea_orm::{DbErr, Order};

use super::SchoolStore;
use crate::api::{
    db::{SchoolFilter, SEARCH_COLUMNS},
    dto,
};

/// In-memory store mirroring the SQL semantics of [`SchoolFilter`].
#[derive(Default)]
pub(crate) struct MemorySchoolStore {
    schools: Mutex<Vec<dto::School>>,
    unavailable: bool,
}

impl MemorySchoolStore {
    pub(crate) fn with_schools(schools: Vec<dto::School>) -> Self {
        Self {
            schools: Mutex::new(schools),
            unavailable: false,
        }
    }

    /// Every operation fails as if the database was down.
    pub(crate) fn unavailable() -> Self {
        Self {
            schools: Mutex::default(),
            unavailable: true,
        }
    }

    pub(crate) fn schools(&self) -> Vec<dto::School> {
        self.schools.lock().unwrap().clone()
    }

    fn check_available(&self) -> Result<(), DbErr> {
        if self.unavailable {
            Err(DbErr::Custom("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

fn column_value(school: &dto::School, column: SchoolColumn) -> &str {
    match column {
        SchoolColumn::Name => &school.name,
        SchoolColumn::Address => &school.address,
        SchoolColumn::City => &school.city,
        SchoolColumn::State => &school.state,
        SchoolColumn::Contact => &school.contact,
        SchoolColumn::Image => &school.image,
        SchoolColumn::EmailId => &school.email_id,
        SchoolColumn::Id | SchoolColumn::CreatedAt => "",
    }
}

fn matches(filter: &SchoolFilter, school: &dto::School) -> bool {
    let search_matches = filter.search().map_or(true, |term| {
        let term = term.to_lowercase();
        SEARCH_COLUMNS
            .iter()
            .any(|column| column_value(school, *column).to_lowercase().contains(&term))
    });
    search_matches
        && filter.city().map_or(true, |city| school.city == city)
        && filter.state().map_or(true, |state| school.state == state)
}

#[async_trait]
impl SchoolStore for MemorySchoolStore {
    async fn count(&self, filter: &SchoolFilter) -> Result<u64, DbErr> {
        self.check_available()?;
        let schools = self.schools.lock().unwrap();
        Ok(schools.iter().filter(|s| matches(filter, s)).count() as u64)
    }

    async fn find(
        &self,
        filter: &SchoolFilter,
        skip: u64,
        take: u64,
        order: Order,
    ) -> Result<Vec<dto::School>, DbErr> {
        self.check_available()?;
        let mut found: Vec<dto::School> = self
            .schools
            .lock()
            .unwrap()
            .iter()
            .filter(|s| matches(filter, s))
            .cloned()
            .collect();
        found.sort_by_key(|s| (s.created_at, s.id));
        if !matches!(order, Order::Asc) {
            found.reverse();
        }
        Ok(found
            .into_iter()
            .skip(skip as usize)
            .take(take as usize)
            .collect())
    }

    async fn insert(&self, school: dto::NewSchool) -> Result<i32, DbErr> {
        self.check_available()?;
        let mut schools = self.schools.lock().unwrap();
        let id = schools.iter().map(|s| s.id).max().unwrap_or_default() + 1;
        schools.push(dto::School {
            id,
            name: school.name,
            address: school.address,
            city: school.city,
            state: school.state,
            contact: school.contact,
            image: school.image,
            email_id: school.email_id,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn facets(&self) -> Result<dto::SchoolFacets, DbErr> {
        self.check_available()?;
        let schools = self.schools.lock().unwrap();
        let mut cities: Vec<String> = schools.iter().map(|s| s.city.clone()).collect();
        let mut states: Vec<String> = schools.iter().map(|s| s.state.clone()).collect();
        cities.sort();
        cities.dedup();
        states.sort();
        states.dedup();
        Ok(dto::SchoolFacets { cities, states })
    }
}

/// `count` schools created one minute apart, school 1 being the oldest.
///
/// Schools 8, 16 and 24 are in Pune, Maharashtra; all others in Jaipur,
/// Rajasthan.
pub(crate) fn sample_schools(count: i32) -> Vec<dto::School> {
    let start = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
    (1..=count)
        .map(|i| {
            let (city, state) = if i % 8 == 0 {
                ("Pune", "Maharashtra")
            } else {
                ("Jaipur", "Rajasthan")
            };
            dto::School {
                id: i,
                name: format!("Sample School {i}"),
                address: format!("{i} Station Road"),
                city: city.to_string(),
                state: state.to_string(),
                contact: format!("98765{i:05}"),
                image: String::new(),
                email_id: format!("school{i}@example.org"),
                created_at: start + Duration::minutes(i64::from(i)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn find_returns_newest_first() {
        let store = MemorySchoolStore::with_schools(sample_schools(5));

        let found = store
            .find(&SchoolFilter::default(), 1, 2, Order::Desc)
            .await
            .unwrap();

        assert_eq!(found.iter().map(|s| s.id).collect::<Vec<_>>(), vec![4, 3]);
    }

    #[tokio::test]
    async fn facets_are_distinct_and_sorted() {
        let store = MemorySchoolStore::with_schools(sample_schools(25));

        let facets = store.facets().await.unwrap();

        assert_eq!(facets.cities, vec!["Jaipur", "Pune"]);
        assert_eq!(facets.states, vec!["Maharashtra", "Rajasthan"]);
    }
}
