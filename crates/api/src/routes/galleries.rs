//! Gallery admin: albums, uploads and image ordering.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::album::{
    AlbumWithImages, AlbumImageView, CreateAlbumRequest, DisplayTemplate, ReorderImagesRequest,
    UpdateAlbumRequest, UpdateImageTitleRequest,
};
use domain::models::security_log::event_types;
use domain::models::{Album, AlbumImage, Severity};
use domain::services::SecurityEventBuilder;
use persistence::repositories::{AlbumInput, AlbumRepository, NewAlbumImage};
use serde::Serialize;
use serde_json::{json, Value};
use shared::pagination::{PageRequest, Paginated};
use tracing::{info, warn};
use validator::Validate;

use crate::app::AppState;
use crate::error::{created, ApiError, ApiResponse, ApiResult};
use crate::extractors::{AuthUser, ClientInfo};
use crate::middleware::metrics::record_images_uploaded;
use crate::routes::csrf_for;
use crate::services::StorageError;

/// Multipart field names accepted for image files.
const IMAGE_FIELDS: &[&str] = &["images", "images[]", "image", "file"];

#[derive(Debug, Serialize)]
pub struct AlbumForm {
    pub csrf_token: String,
    pub display_templates: [DisplayTemplate; 4],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<Album>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub uploaded: usize,
    pub images: Vec<AlbumImageView>,
}

fn templates() -> [DisplayTemplate; 4] {
    [
        DisplayTemplate::Grid,
        DisplayTemplate::Masonry,
        DisplayTemplate::Carousel,
        DisplayTemplate::List,
    ]
}

fn image_views(state: &AppState, images: Vec<AlbumImage>) -> Vec<AlbumImageView> {
    let prefix = &state.config.storage.public_url_prefix;
    images
        .into_iter()
        .map(|image| AlbumImageView::new(image, prefix))
        .collect()
}

async fn ensure_slug_free(repo: &AlbumRepository, slug: &str, except: Option<i64>) -> Result<(), ApiError> {
    if repo.slug_taken(slug, except).await? {
        return Err(ApiError::Conflict(format!("Slug '{}' is already in use", slug)));
    }
    Ok(())
}

async fn find_album(repo: &AlbumRepository, id: i64) -> Result<Album, ApiError> {
    repo.find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Gallery not found".into()))
}

/// GET /admin/galleries
pub async fn index(
    State(state): State<AppState>,
    Query(page): Query<PageRequest>,
) -> ApiResult<Paginated<Album>> {
    let albums = AlbumRepository::new(state.pool.clone()).list(&page).await?;
    Ok(ApiResponse::ok(albums))
}

/// GET /admin/galleries/create
pub async fn create_form(State(state): State<AppState>, user: AuthUser) -> ApiResult<AlbumForm> {
    Ok(ApiResponse::ok(AlbumForm {
        csrf_token: csrf_for(&state, &user),
        display_templates: templates(),
        album: None,
    }))
}

/// Creates an album. Name is required and the slug must be unique.
///
/// POST /admin/galleries
pub async fn store(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateAlbumRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Album>>), ApiError> {
    request.validate()?;
    let input = AlbumInput::from(&request);
    shared::validation::validate_slug(&input.slug)
        .map_err(|_| ApiError::field("slug", "Slug may only contain lowercase letters, digits and single dashes"))?;

    let repo = AlbumRepository::new(state.pool.clone());
    ensure_slug_free(&repo, &input.slug, None).await?;
    let album = repo.create(&input).await?;

    info!(album_id = album.id, slug = %album.slug, user_id = user.id(), "Gallery created");
    Ok(created(album))
}

/// GET /admin/galleries/:id/edit
pub async fn edit(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<AlbumForm> {
    let album = find_album(&AlbumRepository::new(state.pool.clone()), id).await?;
    Ok(ApiResponse::ok(AlbumForm {
        csrf_token: csrf_for(&state, &user),
        display_templates: templates(),
        album: Some(album),
    }))
}

/// POST /admin/galleries/:id
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateAlbumRequest>,
) -> ApiResult<Album> {
    request.validate()?;
    let input = AlbumInput::from(&request);
    shared::validation::validate_slug(&input.slug)
        .map_err(|_| ApiError::field("slug", "Slug may only contain lowercase letters, digits and single dashes"))?;

    let repo = AlbumRepository::new(state.pool.clone());
    find_album(&repo, id).await?;
    ensure_slug_free(&repo, &input.slug, Some(id)).await?;
    let album = repo.update(id, &input).await?;

    info!(album_id = id, user_id = user.id(), "Gallery updated");
    Ok(ApiResponse::ok(album))
}

/// Deletes the album rows in one transaction, then its files best effort.
///
/// POST /admin/galleries/:id/delete
pub async fn destroy(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Value> {
    let filenames = AlbumRepository::new(state.pool.clone())
        .delete(id)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => ApiError::NotFound("Gallery not found".into()),
            other => other.into(),
        })?;
    state.storage.delete_album_dir(id, &filenames).await;

    info!(album_id = id, files = filenames.len(), user_id = user.id(), "Gallery deleted");
    Ok(ApiResponse::ok(json!({ "id": id, "deleted_files": filenames.len() })))
}

/// GET /admin/galleries/:id/images
pub async fn images(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<AlbumWithImages> {
    let repo = AlbumRepository::new(state.pool.clone());
    let album = find_album(&repo, id).await?;
    let images = repo.images(id).await?;
    Ok(ApiResponse::ok(AlbumWithImages {
        album,
        images: image_views(&state, images),
    }))
}

struct PendingUpload {
    name: String,
    bytes: Vec<u8>,
}

/// Uploads one or more images.
///
/// Every file is checked against the extension whitelist and size limit
/// before anything is written. Rows are inserted in one transaction; if that
/// fails the written files are removed again.
///
/// POST /admin/galleries/:id/upload
pub async fn upload(
    State(state): State<AppState>,
    user: AuthUser,
    client: ClientInfo,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<UploadResponse>>), ApiError> {
    let repo = AlbumRepository::new(state.pool.clone());
    find_album(&repo, id).await?;

    let mut pending = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid upload: {}", e)))?
    {
        if !field.name().is_some_and(|n| IMAGE_FIELDS.contains(&n)) {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        if name.is_empty() {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("Invalid upload: {}", e)))?;

        if let Err(e) = state.storage.check_upload(&name, bytes.len()) {
            if matches!(e, StorageError::ExtensionNotAllowed(_)) {
                state
                    .security_log
                    .record(
                        SecurityEventBuilder::new(event_types::UPLOAD_REJECTED)
                            .severity(Severity::Warning)
                            .user(user.id())
                            .ip(client.ip_string())
                            .details(format!("Rejected upload '{}' for gallery {}", name, id))
                            .build(),
                    )
                    .await;
            }
            return Err(e.into());
        }
        pending.push(PendingUpload {
            name,
            bytes: bytes.to_vec(),
        });
    }

    if pending.is_empty() {
        return Err(ApiError::field("images", "Select at least one image to upload"));
    }

    let mut saved = Vec::with_capacity(pending.len());
    for upload in &pending {
        match state.storage.save_album_image(id, &upload.name, &upload.bytes).await {
            Ok(file) => saved.push(file),
            Err(e) => {
                for file in &saved {
                    state.storage.delete_album_image(id, &file.filename).await;
                }
                return Err(e.into());
            }
        }
    }

    let rows: Vec<NewAlbumImage> = saved
        .iter()
        .map(|file| NewAlbumImage {
            filename: file.filename.clone(),
            original_name: file.original_name.clone(),
            mime_type: file.mime_type.clone(),
            file_size: file.size,
        })
        .collect();

    let stored = match repo.add_images(id, &rows).await {
        Ok(stored) => stored,
        Err(e) => {
            warn!(album_id = id, error = %e, "Upload rolled back, removing written files");
            for file in &saved {
                state.storage.delete_album_image(id, &file.filename).await;
            }
            return Err(e.into());
        }
    };

    record_images_uploaded(stored.len());
    info!(album_id = id, count = stored.len(), user_id = user.id(), "Images uploaded");

    Ok(created(UploadResponse {
        uploaded: stored.len(),
        images: image_views(&state, stored),
    }))
}

/// POST /admin/galleries/:id/reorder
pub async fn reorder(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<ReorderImagesRequest>,
) -> ApiResult<Value> {
    request.validate()?;
    AlbumRepository::new(state.pool.clone())
        .reorder(id, &request.order)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => ApiError::field("order", "Order contains images outside this gallery"),
            other => other.into(),
        })?;
    Ok(ApiResponse::ok(json!({ "reordered": request.order.len() })))
}

/// POST /admin/galleries/:id/images/:image_id/title
pub async fn update_image_title(
    State(state): State<AppState>,
    Path((id, image_id)): Path<(i64, i64)>,
    Json(request): Json<UpdateImageTitleRequest>,
) -> ApiResult<Value> {
    request.validate()?;
    let title = request
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let updated = AlbumRepository::new(state.pool.clone())
        .update_image_title(id, image_id, title)
        .await?;
    if !updated {
        return Err(ApiError::NotFound("Image not found".into()));
    }
    Ok(ApiResponse::ok(json!({ "id": image_id, "title": title })))
}

/// POST /admin/galleries/:id/images/:image_id/delete
pub async fn delete_image(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, image_id)): Path<(i64, i64)>,
) -> ApiResult<Value> {
    let filename = AlbumRepository::new(state.pool.clone())
        .delete_image(id, image_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Image not found".into()))?;
    state.storage.delete_album_image(id, &filename).await;

    info!(album_id = id, image_id, user_id = user.id(), "Image deleted");
    Ok(ApiResponse::ok(json!({ "id": image_id })))
}
