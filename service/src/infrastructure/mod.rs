use marquee_common::clock::Clock;
use marquee_common::session::CredentialVerifier;
use marquee_common::store::ArticleStore;

use crate::domain::AppState;
use crate::domain::catalog::ArticleCatalog;
use crate::domain::verifications::Verifications;
use crate::domain::views::FunnelViews;

pub mod auth;
pub mod http;
pub mod persistence;
pub mod settings;

#[derive(Clone)]
pub struct AppStateImpl<S: ArticleStore, V: CredentialVerifier + Clone, C: Clock + Clone> {
    catalog: ArticleCatalog<S>,
    views: FunnelViews,
    verifications: Verifications,
    verifier: V,
    clock: C,
    page_size: usize,
}

impl<S, V, C> AppStateImpl<S, V, C>
where
    S: ArticleStore,
    V: CredentialVerifier + Clone,
    C: Clock + Clone,
{
    pub fn new(
        catalog: ArticleCatalog<S>,
        views: FunnelViews,
        verifications: Verifications,
        verifier: V,
        clock: C,
        page_size: usize,
    ) -> Self {
        Self {
            catalog,
            views,
            verifications,
            verifier,
            clock,
            page_size,
        }
    }
}

impl<S, V, C> AppState for AppStateImpl<S, V, C>
where
    S: ArticleStore,
    V: CredentialVerifier + Clone,
    C: Clock + Clone,
{
    type S = S;
    type V = V;
    type C = C;

    fn catalog(&self) -> &ArticleCatalog<Self::S> {
        &self.catalog
    }

    fn views(&self) -> &FunnelViews {
        &self.views
    }

    fn verifications(&self) -> &Verifications {
        &self.verifications
    }

    fn verifier(&self) -> &Self::V {
        &self.verifier
    }

    fn clock(&self) -> &Self::C {
        &self.clock
    }

    fn page_size(&self) -> usize {
        self.page_size
    }
}
