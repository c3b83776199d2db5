use std::sync::Arc;

use axum::extract::FromRef;
use tutor_classroom::Tutor;

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub tutor: Arc<Tutor>,
}
