//! Wiring of every service from one configuration.

use std::sync::Arc;

use soundshelf_cloud::cdn::{CdnSigner, CloudFrontSigner};
use soundshelf_cloud::identity::{CognitoIdentityProvider, IdentityProvider};
use soundshelf_cloud::search::{HttpSearchClient, SearchIndex};
use soundshelf_cloud::storage::{ObjectStorage, S3ObjectStorage};
use soundshelf_core::error::CoreError;
use soundshelf_db::store::{ItemStore, PgItemStore};

use crate::admin::AdminService;
use crate::album::AlbumService;
use crate::artist::ArtistService;
use crate::config::LibraryConfig;
use crate::follow::FollowService;
use crate::license::LicenseService;
use crate::paging::Pager;
use crate::playlist::PlaylistService;
use crate::rights::RightsService;
use crate::tag::TagService;
use crate::track::TrackService;
use crate::upload::UploadService;
use crate::user::UserService;
use crate::visibility::VisibilityService;
use crate::external;

/// Shared collaborators handed to each service constructor.
#[derive(Clone)]
pub struct Library {
    pub config: LibraryConfig,
    pub store: Arc<dyn ItemStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub storage: Arc<dyn ObjectStorage>,
    pub cdn: Option<Arc<dyn CdnSigner>>,
    pub search: Arc<dyn SearchIndex>,
    pager: Pager,
}

impl Library {
    pub fn new(
        config: LibraryConfig,
        store: Arc<dyn ItemStore>,
        identity: Arc<dyn IdentityProvider>,
        storage: Arc<dyn ObjectStorage>,
        search: Arc<dyn SearchIndex>,
    ) -> Self {
        let pager = Pager::from_config(&config);
        Self {
            config,
            store,
            identity,
            storage,
            cdn: None,
            search,
            pager,
        }
    }

    pub fn with_cdn(mut self, cdn: Arc<dyn CdnSigner>) -> Self {
        self.cdn = Some(cdn);
        self
    }

    /// Connect the production collaborators described by `config`.
    pub async fn connect(config: LibraryConfig) -> Result<Self, CoreError> {
        let pool = soundshelf_db::create_pool(&config.database_url, config.database_max_connections)
            .await
            .map_err(|e| CoreError::Storage(e.to_string()))?;
        soundshelf_db::health_check(&pool)
            .await
            .map_err(|e| CoreError::Storage(e.to_string()))?;
        tracing::info!("Database connection established");

        let identity = CognitoIdentityProvider::from_env(config.identity_user_pool_id.clone())
            .await
            .map_err(|e| external("identity", e))?;
        let storage = S3ObjectStorage::from_env(config.media_bucket.clone()).await;
        let search = HttpSearchClient::new(config.search_url.clone());

        let cdn = config
            .cdn
            .as_ref()
            .map(|c| CloudFrontSigner::new(&c.domain, &c.key_pair_id, &c.private_key_pem))
            .transpose()
            .map_err(|e| external("cdn", e))?;

        let mut library = Self::new(
            config,
            Arc::new(PgItemStore::new(pool)),
            Arc::new(identity),
            Arc::new(storage),
            Arc::new(search),
        );
        if let Some(cdn) = cdn {
            library = library.with_cdn(Arc::new(cdn));
        }
        Ok(library)
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn tracks(&self) -> TrackService {
        TrackService::new(
            self.store.clone(),
            self.storage.clone(),
            self.cdn.clone(),
            self.search.clone(),
            self.pager.clone(),
            self.config.presign_ttl,
        )
    }

    pub fn albums(&self) -> AlbumService {
        AlbumService::new(self.store.clone(), self.pager.clone())
    }

    pub fn artists(&self) -> ArtistService {
        ArtistService::new(self.store.clone(), self.pager.clone())
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.store.clone())
    }

    pub fn admin(&self) -> AdminService {
        AdminService::new(
            self.store.clone(),
            self.identity.clone(),
            self.config.identity_timeout,
        )
    }

    pub fn playlists(&self) -> PlaylistService {
        PlaylistService::new(self.store.clone(), self.pager.clone())
    }

    pub fn visibility(&self) -> VisibilityService {
        VisibilityService::new(self.store.clone(), self.search.clone(), self.pager.clone())
    }

    pub fn follows(&self) -> FollowService {
        FollowService::new(self.store.clone(), self.pager.clone())
    }

    pub fn tags(&self) -> TagService {
        TagService::new(self.store.clone(), self.pager.clone())
    }

    pub fn uploads(&self) -> UploadService {
        UploadService::new(
            self.store.clone(),
            self.storage.clone(),
            self.pager.clone(),
            self.config.presign_ttl,
        )
    }

    pub fn rights(&self) -> RightsService {
        RightsService::new(self.store.clone(), self.pager.clone())
    }

    pub fn licenses(&self) -> LicenseService {
        LicenseService::new(self.store.clone(), self.pager.clone())
    }
}
