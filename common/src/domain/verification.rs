//! Intermediate verification step of two-stage routing.
//!
//! Runs its own fixed countdown, independent of the article funnel, and only
//! then exposes the stored target URL.

use crate::domain::article::Article;
use crate::domain::countdown::{Countdown, Ticking};
use crate::domain::{ArticleId, ArticleTitle, TargetUrl};

/// Length of the verification countdown. Not configurable per article.
pub const VERIFICATION_SECONDS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    NotFound,
    Pending(PendingVerification),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVerification {
    article_id: ArticleId,
    title: ArticleTitle,
    target_url: TargetUrl,
    countdown: Countdown,
}

impl Verification {
    /// Open the verification step for the article fetched by id, if any.
    pub fn open(article: Option<&Article>) -> Self {
        match article {
            Some(article) => Self::Pending(PendingVerification {
                article_id: article.id.clone(),
                title: article.details.title.clone(),
                target_url: article.details.target_url.clone(),
                countdown: Countdown::new(VERIFICATION_SECONDS),
            }),
            None => Self::NotFound,
        }
    }

    pub fn pending(&self) -> Option<&PendingVerification> {
        match self {
            Verification::Pending(pending) => Some(pending),
            Verification::NotFound => None,
        }
    }

    /// The final action. `None` until the countdown has fully elapsed.
    pub fn final_action(&self) -> Option<&TargetUrl> {
        self.pending()
            .filter(|pending| pending.countdown.is_elapsed())
            .map(|pending| &pending.target_url)
    }
}

impl PendingVerification {
    pub fn article_id(&self) -> &ArticleId {
        &self.article_id
    }

    pub fn title(&self) -> &ArticleTitle {
        &self.title
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }
}

impl Ticking for Verification {
    fn tick(&mut self) {
        if let Verification::Pending(pending) = self {
            pending.countdown.tick();
        }
    }

    fn is_ticking(&self) -> bool {
        self.pending()
            .is_some_and(|pending| !pending.countdown.is_elapsed())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, Utc};

    use super::*;
    use crate::domain::countdown::Paced;
    use crate::test_utils::ArticleBuilder;

    #[test]
    fn final_action_is_unreachable_for_the_whole_countdown() {
        let article = ArticleBuilder::new("a1").target("https://example.com/final").build();
        let mut verification = Verification::open(Some(&article));

        for _ in 0..VERIFICATION_SECONDS - 1 {
            verification.tick();
            assert!(verification.final_action().is_none());
        }
        verification.tick();

        assert_eq!(verification.final_action().map(|url| url.as_ref()), Some("https://example.com/final"));
        assert!(!verification.is_ticking());
    }

    #[test]
    fn final_action_appears_at_exactly_five_seconds() {
        let article = ArticleBuilder::new("a1").build();
        let start = Utc::now();
        let mut paced = Paced::start(Verification::open(Some(&article)), start);

        let just_before = start + TimeDelta::milliseconds(4_999);
        assert!(paced.advance_to(just_before).final_action().is_none());

        let at_five = start + TimeDelta::seconds(5);
        assert!(paced.advance_to(at_five).final_action().is_some());
    }

    #[test]
    fn missing_article_never_exposes_an_action() {
        let mut verification = Verification::open(None);
        for _ in 0..10 {
            verification.tick();
        }

        assert_eq!(verification, Verification::NotFound);
        assert!(verification.final_action().is_none());
        assert!(!verification.is_ticking());
    }
}
