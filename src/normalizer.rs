//! Provider-independent decision core.
//!
//! Every provider reduces its reply to an ordered list of [`Qualifier`]s plus a
//! list of classification signals. A [`RuleTable`] maps signals to deny effects
//! and [`normalize`] turns the decision into a [`VerificationOutcome`].
//!
//! The rules are data, not control flow: each provider declares a static
//! `&[Rule]` and compiles it once at construction.

use crate::errors::AppError;
use crate::models::{Finality, Status, VerificationOutcome};
use regex::Regex;

/// One atomic provider signal about the identity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Qualifier {
    /// Provider code, used for classification.
    pub key: String,
    /// Human-readable text, projected into the outcome reasons.
    pub message: String,
}

impl Qualifier {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// What a matching signal does to the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// External watchlist or legally mandated refusal.
    HardDeny,
    /// Compliance rule derived from applicant attributes (e.g., age).
    SoftDeny,
    Neutral,
}

/// A declarative classification rule: anchored regex over a signal key.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub pattern: &'static str,
    pub effect: Effect,
}

/// Signal that forced a denial, kept for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub signal: String,
    pub effect: Effect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub status: Status,
    pub trigger: Option<Trigger>,
}

/// Compiled rule table. The first matching rule wins; unmatched signals are neutral.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<(Regex, Effect)>,
}

impl RuleTable {
    /// Compiles the rules, failing on the first invalid pattern.
    pub fn compile(rules: &[Rule]) -> Result<Self, AppError> {
        let rules = rules
            .iter()
            .map(|rule| {
                Regex::new(rule.pattern)
                    .map(|re| (re, rule.effect))
                    .map_err(|e| {
                        AppError::InternalError(format!(
                            "Invalid rule pattern '{}': {}",
                            rule.pattern, e
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules })
    }

    pub fn classify(&self, signal: &str) -> Effect {
        self.rules
            .iter()
            .find(|(re, _)| re.is_match(signal))
            .map(|(_, effect)| *effect)
            .unwrap_or(Effect::Neutral)
    }

    /// Decides Approved or Denied from the signals.
    ///
    /// Hard-deny signals are checked before soft-deny ones, so the trigger
    /// names the watchlist hit when both kinds are present.
    pub fn decide<'a, I>(&self, signals: I) -> Decision
    where
        I: IntoIterator<Item = &'a str>,
    {
        let classified: Vec<(&str, Effect)> = signals
            .into_iter()
            .map(|signal| (signal, self.classify(signal)))
            .collect();

        let trigger = [Effect::HardDeny, Effect::SoftDeny]
            .into_iter()
            .find_map(|wanted| {
                classified
                    .iter()
                    .find(|(_, effect)| *effect == wanted)
                    .map(|(signal, effect)| Trigger {
                        signal: signal.to_string(),
                        effect: *effect,
                    })
            });

        let status = if trigger.is_some() {
            Status::Denied
        } else {
            Status::Approved
        };

        Decision { status, trigger }
    }
}

/// Builds the outcome for a successfully classified subject.
///
/// Reasons are the qualifier messages verbatim and in order; finality is
/// `Final` only when the provider sent an explicit marker.
pub fn normalize(
    decision: &Decision,
    explicit_final: bool,
    qualifiers: Vec<Qualifier>,
) -> VerificationOutcome {
    let finality = if explicit_final {
        Finality::Final
    } else {
        Finality::Unknown
    };
    let reasons: Vec<String> = qualifiers.into_iter().map(|q| q.message).collect();

    match decision.status {
        Status::Denied => VerificationOutcome::denied(finality, reasons),
        _ => VerificationOutcome::approved(finality, reasons),
    }
}

/// Logs qualifiers whose classification was never confirmed against live data.
pub fn warn_unverified(provider: &str, qualifiers: &[Qualifier], unverified: &[&str]) {
    for qualifier in qualifiers {
        if unverified.contains(&qualifier.key.as_str()) {
            tracing::warn!(
                "{}: qualifier '{}' ({}) is treated as neutral but unverified",
                provider,
                qualifier.key,
                qualifier.message
            );
        }
    }
}
