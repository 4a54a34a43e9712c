use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use validator::Validate;

use super::types::PaginationMeta;

lazy_static! {
    static ref RE_EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref RE_CONTACT: Regex = Regex::new(r"^[\+]?[1-9][\d]{0,15}$").unwrap();
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct School {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "Delhi Public School")]
    pub name: String,
    #[schema(example = "12 Mathura Road")]
    pub address: String,
    #[schema(example = "New Delhi")]
    pub city: String,
    #[schema(example = "Delhi")]
    pub state: String,
    #[schema(example = "+919876543210")]
    pub contact: String,
    /// Public path of the school photo, empty when none was uploaded
    #[schema(example = "/schoolImages/1735725600000_front.jpg")]
    pub image: String,
    #[schema(example = "office@dps.example")]
    pub email_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<entity::school::Model> for School {
    fn from(model: entity::school::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            address: model.address,
            city: model.city,
            state: model.state,
            contact: model.contact,
            image: model.image,
            email_id: model.email_id,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

/// A school about to be registered.
#[derive(Clone, Debug, Eq, PartialEq, TypedBuilder, Validate)]
#[builder(field_defaults(setter(into)))]
pub struct NewSchool {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    #[validate(regex(path = *RE_CONTACT, message = "Invalid contact number"))]
    pub contact: String,
    #[validate(regex(path = *RE_EMAIL, message = "Invalid email format"))]
    pub email_id: String,
    #[builder(default)]
    pub image: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, utoipa::ToSchema)]
pub struct SchoolsPage {
    pub schools: Vec<School>,
    pub pagination: PaginationMeta,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SchoolCreated {
    #[schema(example = "School added successfully")]
    pub message: String,
    #[serde(rename = "schoolId")]
    #[schema(example = 42)]
    pub school_id: i32,
}

impl SchoolCreated {
    pub fn new(school_id: i32) -> Self {
        Self {
            message: "School added successfully".to_string(),
            school_id,
        }
    }
}

/// Distinct values offered as listing filters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SchoolFacets {
    pub cities: Vec<String>,
    pub states: Vec<String>,
}
