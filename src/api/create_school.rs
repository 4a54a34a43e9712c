use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use axum_macros::debug_handler;
use tracing::{debug, error, info};
use validator::Validate;

use super::{
    dto::{NewSchool, SchoolCreated},
    ApiContext, ApiErrors, ErrorBody,
};

/// Multipart form accepted by the create endpoint.
///
/// Only describes the request body in the OpenAPI document; the handler
/// reads the fields through [`SchoolForm`].
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub(crate) struct SchoolUpload {
    name: String,
    address: String,
    city: String,
    state: String,
    /// Optional leading `+`, first digit 1-9, up to 15 more digits
    contact: String,
    email_id: String,
    #[schema(value_type = Option<String>, format = Binary)]
    image: Option<Vec<u8>>,
}

struct UploadedImage {
    file_name: String,
    bytes: Bytes,
}

#[derive(Default)]
struct SchoolForm {
    name: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    contact: Option<String>,
    email_id: Option<String>,
    image: Option<UploadedImage>,
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiErrors {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiErrors::PayloadTooLarge(err.body_text());
    }
    ApiErrors::BadRequest(format!("Invalid multipart payload: {}", err.body_text()))
}

impl SchoolForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiErrors> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(field_name) = field.name().map(str::to_owned) else {
                continue;
            };
            if field_name == "image" {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if !bytes.is_empty() {
                    form.image = Some(UploadedImage { file_name, bytes });
                }
                continue;
            }

            let slot = match field_name.as_str() {
                "name" => &mut form.name,
                "address" => &mut form.address,
                "city" => &mut form.city,
                "state" => &mut form.state,
                "contact" => &mut form.contact,
                "email_id" => &mut form.email_id,
                other => {
                    debug!("Ignoring form field {other}");
                    continue;
                }
            };
            *slot = Some(field.text().await.map_err(multipart_error)?);
        }
        Ok(form)
    }

    /// Splits the form into the school and its optional image, requiring
    /// every text field to be present and non-blank.
    fn into_parts(self) -> Result<(NewSchool, Option<UploadedImage>), ApiErrors> {
        fn required(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        match (
            required(self.name),
            required(self.address),
            required(self.city),
            required(self.state),
            required(self.contact),
            required(self.email_id),
        ) {
            (Some(name), Some(address), Some(city), Some(state), Some(contact), Some(email_id)) => {
                Ok((
                    NewSchool::builder()
                        .name(name)
                        .address(address)
                        .city(city)
                        .state(state)
                        .contact(contact)
                        .email_id(email_id)
                        .build(),
                    self.image,
                ))
            }
            _ => Err(ApiErrors::BadRequest("All fields are required".to_string())),
        }
    }
}

/// Add school
///
/// Register a school, optionally with a photo.
#[debug_handler]
#[utoipa::path(
    post,
    path = "/api/schools",
    operation_id = "createSchool",
    request_body(content = SchoolUpload, content_type = "multipart/form-data"),
    responses(
        (status = CREATED, description = "School added", body = SchoolCreated),
        (status = BAD_REQUEST, description = "Missing or malformed field", body = ErrorBody),
        (status = PAYLOAD_TOO_LARGE, description = "Upload exceeds the size limit", body = ErrorBody),
        (status = INTERNAL_SERVER_ERROR, description = "Internal server error", body = ErrorBody),
    ),
    tag = super::TAG_SCHOOLS,
)]
pub(crate) async fn api_create_school(
    State(ctx): State<ApiContext>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SchoolCreated>), ApiErrors> {
    let (mut new_school, image) = SchoolForm::read(multipart).await?.into_parts()?;
    new_school.validate().map_err(ApiErrors::from)?;

    let stored = match image {
        Some(image) => {
            let asset = ctx
                .assets
                .save(&image.file_name, &image.bytes)
                .await
                .map_err(|e| {
                    error!("Storing school image failed: {:?}", e);
                    ApiErrors::InternalServerError(Some(e.to_string()))
                })?;
            new_school.image = asset.public_path().to_string();
            Some(asset)
        }
        None => None,
    };

    let school_id = match ctx.store.insert(new_school).await {
        Ok(id) => id,
        Err(err) => {
            if let Some(asset) = stored {
                ctx.assets.remove(&asset).await;
            }
            return Err(err.into());
        }
    };

    info!("School {} added", school_id);
    Ok((StatusCode::CREATED, Json(SchoolCreated::new(school_id))))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, Request},
        response::Response,
        Router,
    };
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;
    use crate::api::{
        data_service::memory::MemorySchoolStore,
        testing::{json_body, test_router, TEST_UPLOAD_LIMIT},
    };

    const BOUNDARY: &str = "school-form-boundary";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, file_name, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn valid_fields() -> Vec<Part<'static>> {
        vec![
            Part::Text("name", "Delhi Public School"),
            Part::Text("address", "Mathura Road"),
            Part::Text("city", "New Delhi"),
            Part::Text("state", "Delhi"),
            Part::Text("contact", "+919876543210"),
            Part::Text("email_id", "office@dps.example"),
        ]
    }

    fn with_field<'a>(parts: Vec<Part<'a>>, name: &'a str, value: &'a str) -> Vec<Part<'a>> {
        parts
            .into_iter()
            .map(|part| match part {
                Part::Text(n, _) if n == name => Part::Text(n, value),
                other => other,
            })
            .collect()
    }

    async fn post(router: Router, parts: &[Part<'_>]) -> Response {
        router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/schools")
                    .header(
                        CONTENT_TYPE,
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(Body::from(multipart_body(parts)))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn creates_school_with_image() {
        // Arrange
        let store = Arc::new(MemorySchoolStore::default());
        let (router, uploads) = test_router(store.clone());
        let mut parts = valid_fields();
        parts.push(Part::File("image", "front gate.png", b"\x89PNG"));

        // Act
        let response = post(router, &parts).await;

        // Assert
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"message": "School added successfully", "schoolId": 1})
        );
        let schools = store.schools();
        assert_eq!(schools.len(), 1);
        let school = &schools[0];
        assert_eq!(school.name, "Delhi Public School");
        assert_eq!(school.email_id, "office@dps.example");
        assert!(school.image.starts_with("/schoolImages/"), "{}", school.image);
        assert!(school.image.ends_with("_front_gate.png"), "{}", school.image);

        let file_name = school.image.trim_start_matches("/schoolImages/");
        assert_eq!(
            std::fs::read(uploads.path().join(file_name)).unwrap(),
            b"\x89PNG"
        );
    }

    #[tokio::test]
    async fn creates_school_without_image() {
        let store = Arc::new(MemorySchoolStore::default());
        let (router, uploads) = test_router(store.clone());
        let mut parts = valid_fields();
        parts.push(Part::File("image", "", b""));

        let response = post(router, &parts).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(store.schools()[0].image, "");
        assert_eq!(std::fs::read_dir(uploads.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn trims_text_fields() {
        let store = Arc::new(MemorySchoolStore::default());
        let (router, _uploads) = test_router(store.clone());
        let parts = with_field(valid_fields(), "city", "  New Delhi ");

        let response = post(router, &parts).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(store.schools()[0].city, "New Delhi");
    }

    #[tokio::test]
    async fn rejects_missing_or_blank_fields() {
        for missing in ["name", "address", "city", "state", "contact", "email_id"] {
            let store = Arc::new(MemorySchoolStore::default());
            let (router, _uploads) = test_router(store.clone());
            let parts: Vec<Part> = valid_fields()
                .into_iter()
                .filter(|p| !matches!(p, Part::Text(n, _) if *n == missing))
                .collect();

            let response = post(router, &parts).await;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{missing}");
            assert_eq!(
                json_body(response).await,
                serde_json::json!({"error": "All fields are required"})
            );
            assert!(store.schools().is_empty());
        }

        let (router, _uploads) = test_router(Arc::new(MemorySchoolStore::default()));
        let response = post(router, &with_field(valid_fields(), "name", "   ")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_invalid_email() {
        let (router, _uploads) = test_router(Arc::new(MemorySchoolStore::default()));

        let response = post(router, &with_field(valid_fields(), "email_id", "dps.example")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"error": "Invalid email format"})
        );
    }

    #[tokio::test]
    async fn rejects_invalid_contact_before_storing_image() {
        // Arrange
        let store = Arc::new(MemorySchoolStore::default());
        let (router, uploads) = test_router(store.clone());
        let mut parts = with_field(valid_fields(), "contact", "0987");
        parts.push(Part::File("image", "logo.png", b"png"));

        // Act
        let response = post(router, &parts).await;

        // Assert
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"error": "Invalid contact number"})
        );
        assert_eq!(std::fs::read_dir(uploads.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn removes_image_when_insert_fails() {
        // Arrange
        let (router, uploads) = test_router(Arc::new(MemorySchoolStore::unavailable()));
        let mut parts = valid_fields();
        parts.push(Part::File("image", "logo.png", b"png"));

        // Act
        let response = post(router, &parts).await;

        // Assert
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(std::fs::read_dir(uploads.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn ignores_unknown_fields() {
        let store = Arc::new(MemorySchoolStore::default());
        let (router, _uploads) = test_router(store.clone());
        let mut parts = valid_fields();
        parts.push(Part::Text("website", "https://dps.example"));

        let response = post(router, &parts).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(store.schools().len(), 1);
    }

    #[tokio::test]
    async fn rejects_oversized_upload() {
        // Arrange
        let store = Arc::new(MemorySchoolStore::default());
        let (router, uploads) = test_router(store.clone());
        let image = vec![0u8; TEST_UPLOAD_LIMIT + 1];
        let mut parts = valid_fields();
        parts.push(Part::File("image", "huge.png", &image));

        // Act
        let response = post(router, &parts).await;

        // Assert
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(json_body(response).await["error"].is_string());
        assert!(store.schools().is_empty());
        assert_eq!(std::fs::read_dir(uploads.path()).unwrap().count(), 0);
    }
}
