use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tracing::{error, info, warn};

use ekzaria::config::StoreKind;
use ekzaria::store::{MemoryRecipientStore, MongoRecipientStore, RecipientStore};
use ekzaria::uploads::PhotoStore;
use ekzaria::{api, init_logging, Config, RecipientService};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_logging(config.log_format);

    let photos = PhotoStore::new(&config.upload_dir);
    photos.ensure_dir().await?;

    let store: Arc<dyn RecipientStore> = match config.store {
        StoreKind::Mongo => {
            let store = Arc::new(MongoRecipientStore::connect(&config.mongodb_uri).await);
            // The server starts whether or not the database answers.
            let probe = store.clone();
            actix_web::rt::spawn(async move {
                match probe.ping().await {
                    Ok(()) => info!("MongoDB connected"),
                    Err(err) => error!("MongoDB connection error: {err}"),
                }
            });
            store
        }
        StoreKind::Memory => {
            warn!("using the in-memory store, recipients are lost on exit");
            Arc::new(MemoryRecipientStore::new())
        }
    };

    let service = web::Data::new(RecipientService::new(store, photos));

    let server = HttpServer::new(move || {
        let service = service.clone();
        App::new()
            .wrap(Cors::permissive())
            .configure(|cfg| api::configure(cfg, service))
    })
    .bind((config.bind_address.as_str(), config.port))?;

    info!("Server running on port {}", config.port);
    server.run().await?;
    Ok(())
}
