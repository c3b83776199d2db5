mod auth;
mod classrooms;
mod db;
mod notes;
mod services;
mod util;

use std::sync::Arc;

pub use auth::*;
pub use classrooms::*;
pub use db::*;
pub use notes::*;
pub use services::*;

use reqwest::Client;
use tutor_core::Config;

/// The tutor system, tying persistence, authentication and the external services together.
pub struct Tutor {
    pub config: Arc<Config>,
    pub database: SharedDatabase,

    pub auth: Auth,
    pub classrooms: Classrooms,
    pub notes: Notes,
    pub documents: DocumentService,
    pub tutorbot: Tutorbot,
    pub rag: RagService,
}

impl Tutor {
    pub fn new(config: Config, database: SharedDatabase) -> Self {
        Self::with_provider(OAuthProvider::google(&config), config, database)
    }

    /// Creates the tutor system with a custom OAuth provider
    pub fn with_provider(
        provider: OAuthProvider,
        config: Config,
        database: SharedDatabase,
    ) -> Self {
        let client = Client::new();
        let tutorbot = Tutorbot::new(&client, &config.tutorbot_url);

        let classrooms = Classrooms::new(
            &database,
            tutorbot.clone(),
            ResourceSearcher::new(&client, &config.resources_url),
            YouTube::new(&client, config.youtube_api_key.clone()),
        );

        Self {
            auth: Auth::new(&database, &client, provider, config.session_days),
            notes: Notes::new(&database),
            documents: DocumentService::new(
                &client,
                &config.documents_url,
                &config.documents_ws_url(),
            ),
            rag: RagService::new(&client, &config.rag_url),
            tutorbot,
            classrooms,
            database,
            config: Arc::new(config),
        }
    }
}
