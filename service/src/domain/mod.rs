use marquee_common::clock::Clock;
use marquee_common::session::{CredentialVerifier, Role};
use marquee_common::store::ArticleStore;

use crate::domain::catalog::ArticleCatalog;
use crate::domain::verifications::Verifications;
use crate::domain::views::FunnelViews;

pub mod catalog;
pub mod refresh;
pub mod social_proof;
pub mod verifications;
pub mod views;

/// The global application state shared between all request handlers.
pub trait AppState: Clone + Send + Sync + 'static {
    type S: ArticleStore;
    type V: CredentialVerifier;
    type C: Clock;

    fn catalog(&self) -> &ArticleCatalog<Self::S>;
    fn views(&self) -> &FunnelViews;
    fn verifications(&self) -> &Verifications;
    fn verifier(&self) -> &Self::V;
    fn clock(&self) -> &Self::C;
    /// Grid articles per home page.
    fn page_size(&self) -> usize;
}

/// Admin operations with role requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminOperation {
    /// List, create and edit articles.
    EditArticles,
    DeleteArticles,
    /// Ad slots, section order, the friendly-site network, social-proof
    /// notices and the silent refresh switch.
    EditLayout,
}

pub fn is_permitted(role: Role, operation: AdminOperation) -> bool {
    match (role, operation) {
        (Role::Elevated, _) => true,
        (Role::Restricted, AdminOperation::EditArticles) => true,
        (Role::Restricted, AdminOperation::DeleteArticles | AdminOperation::EditLayout) => false,
    }
}
