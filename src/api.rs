use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::{get, post, put, web, HttpResponse};
use futures::TryStreamExt;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::donation::DonationJson;
use crate::error::{Error, Result};
use crate::schemas::RecipientForm;
use crate::service::RecipientService;
use crate::uploads::PhotoUpload;

const PHOTO_FIELD: &str = "photo";

/// Registers the recipient routes and the `/uploads` file server.
pub fn configure(cfg: &mut web::ServiceConfig, service: web::Data<RecipientService>) {
    let upload_dir = service.photos().dir().to_path_buf();
    cfg.app_data(service)
        .service(list_recipients)
        .service(get_recipient)
        .service(create_recipient)
        .service(donate)
        .service(Files::new("/uploads", upload_dir));
}

#[get("/recipients")]
async fn list_recipients(service: web::Data<RecipientService>) -> HttpResponse {
    match service.list().await {
        Ok(recipients) => HttpResponse::Ok().json(recipients),
        Err(err) => failure(err, "Error fetching recipients"),
    }
}

#[get("/recipients/{id}")]
async fn get_recipient(
    service: web::Data<RecipientService>,
    id: web::Path<String>,
) -> HttpResponse {
    match service.get(&id).await {
        Ok(recipient) => HttpResponse::Ok().json(recipient),
        Err(err) => failure(err, "Error fetching recipient"),
    }
}

#[post("/recipients")]
async fn create_recipient(
    service: web::Data<RecipientService>,
    payload: Multipart,
) -> HttpResponse {
    let (form, photo) = match read_form(payload).await {
        Ok(parts) => parts,
        Err(err) => return failure(err, "Error creating recipient"),
    };
    match service.create(form, photo).await {
        Ok(recipient) => HttpResponse::Created().json(recipient),
        Err(err) => failure(err, "Error creating recipient"),
    }
}

#[put("/recipients/{id}/donate")]
async fn donate(
    service: web::Data<RecipientService>,
    id: web::Path<String>,
    body: web::Bytes,
) -> HttpResponse {
    // An unreadable body is treated as a missing amount so the id is still
    // checked first.
    let amount = serde_json::from_slice::<DonationJson>(&body)
        .map(|donation| donation.amount)
        .unwrap_or(Value::Null);
    match service.donate(&id, &amount).await {
        Ok(recipient) => HttpResponse::Ok().json(recipient),
        Err(err) => failure(err, "Error processing donation"),
    }
}

/// Splits a multipart body into the text fields and the optional photo.
/// Files under any other field name are skipped.
async fn read_form(mut payload: Multipart) -> Result<(RecipientForm, Option<PhotoUpload>)> {
    let mut form = RecipientForm::default();
    let mut photo = None;

    while let Some(mut field) = payload.try_next().await? {
        let disposition = field.content_disposition();
        let name = disposition.get_name().unwrap_or_default().to_string();
        let file_name = disposition.get_filename().map(str::to_string);

        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            data.extend_from_slice(&chunk);
        }

        match file_name {
            Some(file_name) if name == PHOTO_FIELD && !file_name.is_empty() => {
                photo = Some(PhotoUpload { file_name, data });
            }
            Some(_) => {}
            None => {
                form.set(&name, String::from_utf8_lossy(&data).into_owned());
            }
        }
    }

    Ok((form, photo))
}

fn failure(err: Error, context: &'static str) -> HttpResponse {
    match err {
        Error::NotFound => {
            HttpResponse::NotFound().json(json!({ "message": "Recipient not found" }))
        }
        Error::InvalidAmount(reason) => {
            warn!("{context}: rejected donation amount: {reason}");
            HttpResponse::InternalServerError().json(json!({ "message": context }))
        }
        err => {
            error!("{context}: {err}");
            HttpResponse::InternalServerError().json(json!({ "message": context }))
        }
    }
}
