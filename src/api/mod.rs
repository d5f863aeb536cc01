//! HTTP surface of the catalog.
//!
//! Handlers translate requests into catalog operations and wrap results in
//! the `{status, message, count?, data}` envelope. The catalog itself is
//! synchronous, so each call runs on the blocking pool.

pub mod upload;

use actix_multipart::Multipart;
use actix_web::error::ErrorInternalServerError;
use actix_web::http::{header, StatusCode};
use actix_web::{web, Error, HttpResponse, ResponseError};
use log::{debug, info};
use serde::Serialize;

use crate::app_state::AppState;
use crate::error::{CatalogError, CatalogResult};
use crate::metadata::BookFilter;
use crate::api::upload::UploadForm;

/// Response envelope shared by every JSON endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            status: true,
            message: message.to_string(),
            count: None,
            data: Some(data),
        }
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    pub fn listing(message: &str, data: Vec<T>) -> Self {
        Self {
            status: true,
            message: message.to_string(),
            count: Some(data.len()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn empty(status: bool, message: &str) -> Self {
        Self {
            status,
            message: message.to_string(),
            count: None,
            data: None,
        }
    }
}

impl ResponseError for CatalogError {
    fn status_code(&self) -> StatusCode {
        match self {
            CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
            CatalogError::Gone(_) => StatusCode::GONE,
            CatalogError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CatalogError::Unreadable(_) | CatalogError::Io(_) | CatalogError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            CatalogError::NotFound(_) => "Book not found".to_string(),
            CatalogError::Gone(_) => "File missing".to_string(),
            CatalogError::Validation(message) => message.clone(),
            CatalogError::Unreadable(_) | CatalogError::Io(_) | CatalogError::Serialization(_) => {
                "Storage error".to_string()
            }
        };
        HttpResponse::build(self.status_code()).json(ApiResponse::empty(false, &message))
    }
}

/// MDC key carrying the book a log line belongs to
pub const BOOK_ID_KEY: &str = "book_id";

/// Run a catalog call off the async workers. `book_id` is visible to the
/// call's log lines and cleared from the pool thread afterwards.
async fn run_blocking<F, T>(book_id: Option<String>, f: F) -> Result<T, Error>
where
    F: FnOnce() -> CatalogResult<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || {
        let _mdc = book_id.map(|id| log_mdc::insert_scoped(BOOK_ID_KEY, id));
        f()
    })
    .await
    .map_err(ErrorInternalServerError)?;
    result.map_err(Error::from)
}

pub async fn list_books(query: web::Query<BookFilter>, app_state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let filter = query.into_inner();
    debug!("Listing books with filter {:?}", filter);

    let catalog = app_state.catalog.clone();
    let books = run_blocking(None, move || Ok(catalog.list(&filter))).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::listing("Books fetched successfully", books)))
}

pub async fn show_book(path: web::Path<String>, app_state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let id = path.into_inner();
    let catalog = app_state.catalog.clone();
    let book = run_blocking(Some(id.clone()), move || catalog.get(&id)).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Book details retrieved", book)))
}

pub async fn download_book(path: web::Path<String>, app_state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let id = path.into_inner();
    let catalog = app_state.catalog.clone();
    let file = run_blocking(Some(id.clone()), move || catalog.download(&id)).await?;
    let etag = hex::encode(md5::compute(&file.content).0);
    info!("Serving {} ({} bytes)", file.path.display(), file.content.len());

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file.record.filename),
        ))
        .insert_header((header::ETAG, format!("\"{}\"", etag)))
        .body(file.content))
}

pub async fn store_book(payload: Multipart, app_state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let max_upload_size = app_state.config.storage.max_upload_size;
    let form = UploadForm::read(payload, max_upload_size).await?;
    let (book, content) = form.into_new_book(max_upload_size)?;

    let catalog = app_state.catalog.clone();
    let record = run_blocking(None, move || catalog.create(book, &content)).await?;
    info!("Stored book {}", record.id);

    Ok(HttpResponse::Created().json(ApiResponse::success("Book uploaded successfully", record)))
}

pub async fn update_book(
    path: web::Path<String>,
    payload: Multipart,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();
    let max_upload_size = app_state.config.storage.max_upload_size;
    let form = UploadForm::read(payload, max_upload_size).await?;
    let (changes, content) = form.into_changes(max_upload_size)?;

    let catalog = app_state.catalog.clone();
    let record = run_blocking(Some(id.clone()), move || catalog.update(&id, changes, content.as_deref())).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Book updated successfully", record)))
}

pub async fn destroy_book(path: web::Path<String>, app_state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let id = path.into_inner();
    let catalog = app_state.catalog.clone();
    run_blocking(Some(id.clone()), move || catalog.delete(&id)).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::empty(true, "Book deleted successfully")))
}

/// Register the `/api/books` routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/books")
            .service(web::resource("").route(web::get().to(list_books)))
            .service(web::resource("/store").route(web::post().to(store_book)))
            .service(web::resource("/{id}/download").route(web::get().to(download_book)))
            .service(
                web::resource("/{id}")
                    .route(web::get().to(show_book))
                    .route(web::put().to(update_book))
                    .route(web::patch().to(update_book))
                    .route(web::delete().to(destroy_book)),
            ),
    );
}
