//! Visitor funnel for a single article view.
//!
//! `Entry -> [EmailCapture] -> Counting -> Ready`, or straight to `NotFound`
//! when the article does not resolve. Stages only ever move forward. Time
//! enters exclusively through [`Ticking::tick`], one call per elapsed second;
//! pair the funnel with [`crate::domain::countdown::Paced`] to drive it from a clock.

use std::fmt;

use rand::Rng;

use crate::domain::article::{Article, CounterMode, TrafficRouting};
use crate::domain::countdown::{Countdown, Ticking};
use crate::domain::{ArticleId, TargetUrl};

/// Wall-clock delay before a random-number counter unlocks the redirect.
pub const RANDOM_COUNTER_DELAY_SECS: u32 = 3;

/// The slice of an article's configuration the funnel consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunnelConfig {
    pub article_id: ArticleId,
    pub email_capture: bool,
    pub counter: CounterMode,
    pub routing: TrafficRouting,
    pub target_url: TargetUrl,
}

impl From<&Article> for FunnelConfig {
    fn from(article: &Article) -> Self {
        let details = &article.details;
        Self {
            article_id: article.id.clone(),
            email_capture: details.requires_email_capture(),
            counter: details.counter,
            routing: details.traffic_routing,
            target_url: details.target_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    EmailCapture,
    Counting(Counter),
    Ready(Redirect),
    NotFound,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::EmailCapture => "email-capture",
            Stage::Counting(_) => "counting",
            Stage::Ready(_) => "ready",
            Stage::NotFound => "not-found",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Counter {
    /// Seconds left, decremented every tick.
    Countdown(Countdown),
    /// A drawn figure that never changes, plus the fixed unlock delay.
    ActiveUsers { shown: u32, delay: Countdown },
}

/// Where the redirect action points once the funnel is ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    Direct(TargetUrl),
    /// Through the intermediate verification countdown for this article.
    Verification(ArticleId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunnelError {
    /// The event does not apply to the current stage.
    OutOfOrder { stage: &'static str },
    InvalidEmail,
}

impl fmt::Display for FunnelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunnelError::OutOfOrder { stage } => write!(f, "not accepted in stage {stage}"),
            FunnelError::InvalidEmail => f.write_str("email address is not valid"),
        }
    }
}

impl std::error::Error for FunnelError {}

#[derive(Debug, Clone)]
pub struct Funnel {
    config: Option<FunnelConfig>,
    stage: Stage,
}

impl Funnel {
    /// Enter the funnel on first render. `gate_cleared` tells whether this
    /// visitor already passed email capture for the article.
    pub fn enter(config: FunnelConfig, gate_cleared: bool, rng: &mut impl Rng) -> Self {
        let stage = if config.email_capture && !gate_cleared {
            Stage::EmailCapture
        } else {
            begin_counting(&config, rng)
        };
        tracing::debug!(article = %config.article_id, stage = stage.name(), "funnel entered");
        Self {
            config: Some(config),
            stage,
        }
    }

    /// Terminal funnel for an id that did not resolve.
    pub fn not_found() -> Self {
        Self {
            config: None,
            stage: Stage::NotFound,
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn config(&self) -> Option<&FunnelConfig> {
        self.config.as_ref()
    }

    /// The redirect action, available only in `Ready`.
    pub fn redirect(&self) -> Option<&Redirect> {
        match &self.stage {
            Stage::Ready(redirect) => Some(redirect),
            _ => None,
        }
    }

    /// True once email capture is behind this funnel (or was never needed).
    pub fn gate_cleared(&self) -> bool {
        !matches!(self.stage, Stage::EmailCapture | Stage::NotFound)
    }

    /// Accept the captured email and move on to `Counting`. The address is
    /// only checked, never retained.
    pub fn submit_email(&mut self, email: &str, rng: &mut impl Rng) -> Result<(), FunnelError> {
        let out_of_order = FunnelError::OutOfOrder {
            stage: self.stage.name(),
        };
        let (Stage::EmailCapture, Some(config)) = (&self.stage, &self.config) else {
            return Err(out_of_order);
        };
        if !is_plausible_email(email) {
            return Err(FunnelError::InvalidEmail);
        }
        self.stage = begin_counting(config, rng);
        tracing::debug!(article = %config.article_id, stage = self.stage.name(), "email gate cleared");
        Ok(())
    }
}

impl Ticking for Funnel {
    fn tick(&mut self) {
        let finished = match &mut self.stage {
            Stage::Counting(Counter::Countdown(countdown)) => {
                countdown.tick();
                countdown.is_elapsed()
            }
            Stage::Counting(Counter::ActiveUsers { delay, .. }) => {
                delay.tick();
                delay.is_elapsed()
            }
            _ => return,
        };
        if finished {
            if let Some(config) = &self.config {
                self.stage = ready(config);
                tracing::debug!(article = %config.article_id, "funnel ready");
            }
        }
    }

    fn is_ticking(&self) -> bool {
        matches!(self.stage, Stage::Counting(_))
    }
}

fn begin_counting(config: &FunnelConfig, rng: &mut impl Rng) -> Stage {
    match config.counter {
        CounterMode::FixedCountdown { seconds } if seconds > 0 => {
            Stage::Counting(Counter::Countdown(Countdown::new(seconds)))
        }
        CounterMode::FixedCountdown { .. } => ready(config),
        CounterMode::RandomNumber { min, max } => {
            let (low, high) = (min.min(max), min.max(max));
            Stage::Counting(Counter::ActiveUsers {
                shown: rng.gen_range(low..=high),
                delay: Countdown::new(RANDOM_COUNTER_DELAY_SECS),
            })
        }
        CounterMode::Hidden => ready(config),
    }
}

fn ready(config: &FunnelConfig) -> Stage {
    let redirect = match config.routing {
        TrafficRouting::Direct => Redirect::Direct(config.target_url.clone()),
        TrafficRouting::TwoStageVerification => Redirect::Verification(config.article_id.clone()),
    };
    Stage::Ready(redirect)
}

fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}
