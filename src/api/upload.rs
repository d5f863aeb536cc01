//! Multipart form parsing and request validation for create and update.

use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::Error;
use bytes::BytesMut;
use futures::StreamExt;
use log::debug;

use crate::error::{CatalogError, CatalogResult};
use crate::metadata::{BookChanges, NewBook};

pub const PDF_FIELD: &str = "pdf";
const MAX_TEXT_LEN: usize = 255;
const PDF_MAGIC: &[u8] = b"%PDF";

/// File part of an upload
#[derive(Debug, Clone, Default)]
pub struct UploadedPdf {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub content: Vec<u8>,
}

/// Raw multipart form: trimmed text parts plus the optional PDF part
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub pdf: Option<UploadedPdf>,
}

impl UploadForm {
    /// Drain a multipart payload. Any part larger than `max_part_size`
    /// is rejected while it streams in.
    pub async fn read(mut payload: Multipart, max_part_size: usize) -> Result<Self, Error> {
        let mut form = UploadForm::default();

        while let Some(item) = payload.next().await {
            let mut field = item?;
            let name = field.name().unwrap_or_default().to_string();
            let filename = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_string);
            let content_type = field.content_type().map(|m| m.essence_str().to_string());

            let mut bytes = BytesMut::new();
            while let Some(chunk) = field.next().await {
                let chunk = chunk?;
                if bytes.len() + chunk.len() > max_part_size {
                    return Err(CatalogError::Validation(too_large_message(&name, max_part_size)).into());
                }
                bytes.extend_from_slice(&chunk);
            }
            debug!("Received form part {} ({} bytes)", name, bytes.len());

            if name == PDF_FIELD {
                form.pdf = Some(UploadedPdf {
                    filename,
                    content_type,
                    content: bytes.to_vec(),
                });
            } else {
                let value = String::from_utf8(bytes.to_vec())
                    .map_err(|_| CatalogError::Validation(format!("The {} field must be a string.", name)))?;
                form.fields.insert(name, value.trim().to_string());
            }
        }

        Ok(form)
    }

    /// Validate as a create request
    pub fn into_new_book(mut self, max_upload_size: usize) -> CatalogResult<(NewBook, Vec<u8>)> {
        let title = required(&mut self.fields, "title")?;
        let class = required(&mut self.fields, "class")?;
        let category = required(&mut self.fields, "category")?;
        let author = nullable(&mut self.fields, "author")?.flatten();

        let pdf = self
            .pdf
            .ok_or_else(|| CatalogError::Validation(format!("The {} field is required.", PDF_FIELD)))?;
        validate_pdf(&pdf, max_upload_size)?;

        Ok((NewBook { title, class, category, author }, pdf.content))
    }

    /// Validate as an update request; every part is optional
    pub fn into_changes(mut self, max_upload_size: usize) -> CatalogResult<(BookChanges, Option<Vec<u8>>)> {
        let changes = BookChanges {
            title: sometimes(&mut self.fields, "title")?,
            class: sometimes(&mut self.fields, "class")?,
            category: sometimes(&mut self.fields, "category")?,
            author: nullable(&mut self.fields, "author")?,
        };

        let content = match self.pdf {
            Some(pdf) => {
                validate_pdf(&pdf, max_upload_size)?;
                Some(pdf.content)
            }
            None => None,
        };

        Ok((changes, content))
    }
}

fn too_large_message(field: &str, limit: usize) -> String {
    format!("The {} field must not be greater than {} kilobytes.", field, limit / 1024)
}

fn check_length(name: &str, value: &str) -> CatalogResult<()> {
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(CatalogError::Validation(format!(
            "The {} field must not be greater than {} characters.",
            name, MAX_TEXT_LEN
        )));
    }
    Ok(())
}

/// Present and non-empty
fn required(fields: &mut HashMap<String, String>, name: &str) -> CatalogResult<String> {
    match fields.remove(name) {
        Some(value) if !value.is_empty() => {
            check_length(name, &value)?;
            Ok(value)
        }
        _ => Err(CatalogError::Validation(format!("The {} field is required.", name))),
    }
}

/// Optional, but non-empty when present
fn sometimes(fields: &mut HashMap<String, String>, name: &str) -> CatalogResult<Option<String>> {
    match fields.remove(name) {
        None => Ok(None),
        Some(value) if value.is_empty() => {
            Err(CatalogError::Validation(format!("The {} field must not be empty.", name)))
        }
        Some(value) => {
            check_length(name, &value)?;
            Ok(Some(value))
        }
    }
}

/// Optional; an empty part means an explicit null
fn nullable(fields: &mut HashMap<String, String>, name: &str) -> CatalogResult<Option<Option<String>>> {
    match fields.remove(name) {
        None => Ok(None),
        Some(value) if value.is_empty() => Ok(Some(None)),
        Some(value) => {
            check_length(name, &value)?;
            Ok(Some(Some(value)))
        }
    }
}

fn validate_pdf(pdf: &UploadedPdf, max_upload_size: usize) -> CatalogResult<()> {
    if pdf.content.is_empty() {
        return Err(CatalogError::Validation(format!("The {} field must be a file.", PDF_FIELD)));
    }
    if pdf.content.len() > max_upload_size {
        return Err(CatalogError::Validation(too_large_message(PDF_FIELD, max_upload_size)));
    }

    let declared_pdf = pdf.content_type.as_deref() == Some("application/pdf")
        || pdf
            .filename
            .as_deref()
            .map(|name| name.to_lowercase().ends_with(".pdf"))
            .unwrap_or(false);
    if !declared_pdf || !pdf.content.starts_with(PDF_MAGIC) {
        return Err(CatalogError::Validation(format!(
            "The {} field must be a file of type: pdf.",
            PDF_FIELD
        )));
    }
    Ok(())
}
