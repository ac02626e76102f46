use sqlx::{Pool, Sqlite};
use std::sync::Arc;
use crate::{card::CardProvisioner, config::Config, shortener::UrlShortener};

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Sqlite>,
    pub config: Arc<Config>,
    pub provisioner: Arc<CardProvisioner>,
    pub shortener: Arc<dyn UrlShortener>,
}
