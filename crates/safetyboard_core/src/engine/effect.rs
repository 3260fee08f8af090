//! Effect label shown at the head of the cause-and-effect diagram.
//!
//! Keyword matching is a replaceable heuristic behind [`EffectClassifier`];
//! nothing in the deadline or risk paths depends on it.

use crate::model::card::{Card, CardType, Severity};
use crate::model::session::ToolSession;
use once_cell::sync::Lazy;
use regex::Regex;

/// Maps free text to a short adverse-event phrase.
pub trait EffectClassifier {
    fn classify(&self, text: &str) -> Option<&'static str>;
}

/// Ordered keyword patterns; the first match wins.
static EFFECT_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)\bfall|\bfell\b", "Patient fall"),
        (r"(?i)sclerotherap", "Neurological deficit after sclerotherapy"),
        (r"(?i)\bdose\b|\bdosing\b|overdose", "Medication dose error"),
        (r"(?i)medicat|\bdrug", "Medication-related event"),
        (r"(?i)infect", "Healthcare-associated infection"),
        (r"(?i)surg", "Surgical procedure complication"),
        (r"(?i)\bdelay", "Delay in care or process"),
        (r"(?i)\bfail", "Care process failure"),
    ]
    .into_iter()
    .map(|(pattern, label)| {
        (
            Regex::new(pattern).expect("effect pattern must compile"),
            label,
        )
    })
    .collect()
});

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordEffectClassifier;

impl EffectClassifier for KeywordEffectClassifier {
    fn classify(&self, text: &str) -> Option<&'static str> {
        EFFECT_PATTERNS
            .iter()
            .find(|(pattern, _)| pattern.is_match(text))
            .map(|(_, label)| *label)
    }
}

fn custom_effect(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn or_placeholder<'a>(title: &'a str, placeholder: &'a str) -> &'a str {
    if title.trim().is_empty() {
        placeholder
    } else {
        title.trim()
    }
}

/// Effect label for a card's diagram. A custom label always wins.
pub fn diagram_effect<C: EffectClassifier + ?Sized>(card: &Card, classifier: &C) -> String {
    if let Some(custom) = custom_effect(card.ishikawa_effect.as_deref()) {
        return custom;
    }

    match card.kind {
        CardType::Event => {
            let severity = (card.severity != Severity::Unclassified)
                .then(|| card.severity.label().to_lowercase());
            let unit = card.unit.trim();
            let text = format!("{} {}", card.title, card.desc);

            let mut phrase = match classifier.classify(&text) {
                Some(label) => {
                    let mut phrase = label.to_string();
                    if let Some(severity) = &severity {
                        phrase.push_str(&format!(" with {severity}"));
                    }
                    phrase
                }
                None => match &severity {
                    Some(severity) => format!("Adverse event ({severity})"),
                    None => "Adverse event".to_string(),
                },
            };
            if !unit.is_empty() {
                phrase.push_str(&format!(" in {unit}"));
            }
            phrase
        }
        CardType::Task => format!(
            "Management task: {}",
            or_placeholder(&card.title, "internal activity")
        ),
        CardType::Project => format!(
            "Improvement project: {}",
            or_placeholder(&card.title, "improvement project")
        ),
    }
}

/// Effect label for a standalone canvas session.
pub fn session_effect(session: &ToolSession) -> String {
    if let Some(custom) = custom_effect(session.ishikawa_effect.as_deref()) {
        return custom;
    }
    format!(
        "{}: {}",
        session.tool_type.label(),
        or_placeholder(&session.title, "Risk analysis")
    )
}
