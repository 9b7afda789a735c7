//! Scenario catalog.
//!
//! Remote scenarios are fetched once per session. Three compliance
//! conversations are built in and stay available when the remote source is
//! down.

use tracing::{info, warn};

use crate::client::ScenarioSource;
use crate::domain::{
    Conversation, Message, Result, Scenario, ScenarioCategory, ScoreOp, ScorePredicate,
    TestbenchError,
};
use crate::obs;

/// Size of the quick-test grid.
pub const QUICK_SCENARIO_COUNT: usize = 6;

/// Scenarios available for one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScenarioCatalog {
    emotion: Vec<Scenario>,
    compliance: Vec<Scenario>,
}

impl ScenarioCatalog {
    /// Fetch one category from the source.
    ///
    /// Fails with [`TestbenchError::CatalogUnavailable`] when the source
    /// cannot be reached or replies unsuccessfully.
    pub async fn load_category(
        source: &dyn ScenarioSource,
        category: ScenarioCategory,
    ) -> Result<Vec<Scenario>> {
        source
            .scenarios(category)
            .await
            .map_err(|e| TestbenchError::CatalogUnavailable(format!("{category}: {e}")))
    }

    /// Load both categories, degrading each failure to an empty list.
    pub async fn load(source: &dyn ScenarioSource) -> Self {
        let emotion = Self::load_or_empty(source, ScenarioCategory::Emotion).await;
        let compliance = Self::load_or_empty(source, ScenarioCategory::Compliance).await;
        info!(
            emotion = emotion.len(),
            compliance = compliance.len(),
            "scenario catalog loaded"
        );
        Self {
            emotion,
            compliance,
        }
    }

    async fn load_or_empty(
        source: &dyn ScenarioSource,
        category: ScenarioCategory,
    ) -> Vec<Scenario> {
        match Self::load_category(source, category).await {
            Ok(scenarios) => scenarios,
            Err(e) => {
                obs::emit_catalog_degraded(category.as_str(), &e);
                Vec::new()
            }
        }
    }

    /// Build a catalog from already-known scenarios, split by category.
    pub fn from_scenarios(scenarios: impl IntoIterator<Item = Scenario>) -> Self {
        let (emotion, compliance) = scenarios
            .into_iter()
            .partition(|s| s.category == ScenarioCategory::Emotion);
        Self {
            emotion,
            compliance,
        }
    }

    pub fn emotion(&self) -> &[Scenario] {
        &self.emotion
    }

    /// Remote compliance scenarios only.
    pub fn remote_compliance(&self) -> &[Scenario] {
        &self.compliance
    }

    /// Built-in compliance conversations followed by the remote ones.
    pub fn compliance(&self) -> Vec<Scenario> {
        let mut all = builtin_compliance();
        all.extend(self.compliance.iter().cloned());
        all
    }

    pub fn category(&self, category: ScenarioCategory) -> Vec<Scenario> {
        match category {
            ScenarioCategory::Emotion => self.emotion.clone(),
            ScenarioCategory::Compliance => self.compliance(),
        }
    }

    /// The first six emotion scenarios.
    pub fn quick_scenarios(&self) -> &[Scenario] {
        let n = self.emotion.len().min(QUICK_SCENARIO_COUNT);
        &self.emotion[..n]
    }

    /// Resolve a scenario by exact id, then by case-insensitive name.
    pub fn find(&self, key: &str) -> Option<Scenario> {
        let key = key.trim();
        let all: Vec<Scenario> = self
            .emotion
            .iter()
            .cloned()
            .chain(self.compliance())
            .collect();

        all.iter()
            .find(|s| s.id == key)
            .or_else(|| all.iter().find(|s| s.name.eq_ignore_ascii_case(key)))
            .cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.emotion.is_empty() && self.compliance.is_empty()
    }
}

/// Resolve a built-in compliance scenario by zero-based index or name.
pub fn find_builtin(key: &str) -> Option<Scenario> {
    let builtins = builtin_compliance();
    let key = key.trim();
    if let Ok(index) = key.parse::<usize>() {
        return builtins.into_iter().nth(index);
    }
    let found = builtins
        .into_iter()
        .find(|s| s.name.eq_ignore_ascii_case(key) || s.id == key);
    if found.is_none() {
        warn!(key = %key, "no built-in compliance scenario matches");
    }
    found
}

/// The hand-authored compliance conversations.
pub fn builtin_compliance() -> Vec<Scenario> {
    vec![
        Scenario::compliance(
            "builtin-perfect-compliance",
            "Perfect Compliance",
            Conversation::new(
                vec![
                    Message::agent(
                        "Hello! Thank you for calling TechSupport. My name is Sarah. \
                         How can I help you today?",
                    ),
                    Message::customer("Hi Sarah, I'm frustrated because my service isn't working!"),
                    Message::agent(
                        "I'm so sorry to hear about that, Mr. Johnson. Let me fix this right away.",
                    ),
                    Message::customer("Thank you, I appreciate your help."),
                    Message::agent(
                        "I've resolved the issue, Mr. Johnson. \
                         Everything should be working perfectly now.",
                    ),
                ],
                "Mr. Johnson",
                "Sarah",
            ),
            Some(ScorePredicate::new(ScoreOp::Gt, 90.0)),
        ),
        Scenario::compliance(
            "builtin-poor-compliance",
            "Poor Compliance",
            Conversation::new(
                vec![
                    Message::agent("Yeah, what do you want?"),
                    Message::customer("I'm really angry! This service is terrible!"),
                    Message::agent("Not my problem. I'll transfer you."),
                    Message::customer("This is ridiculous!"),
                    Message::agent("Whatever."),
                ],
                "Customer",
                "Agent",
            ),
            Some(ScorePredicate::new(ScoreOp::Lt, 30.0)),
        ),
        Scenario::compliance(
            "builtin-emotion-handling",
            "Emotion Handling Test",
            Conversation::new(
                vec![
                    Message::agent("Good morning! How can I assist you today?"),
                    Message::customer("I'm terrified that my account has been hacked!"),
                    Message::agent(
                        "I understand your concern and I'm here to help. \
                         Let me immediately check your account security.",
                    ),
                    Message::customer("Oh wow, thank you for taking this so seriously!"),
                    Message::agent(
                        "Your account is secure. \
                         I've added extra security measures for your peace of mind.",
                    ),
                ],
                "Valued Customer",
                "Support Agent",
            ),
            Some(ScorePredicate::new(ScoreOp::Gt, 80.0)),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Emotion;

    fn emotion_scenarios(n: usize) -> Vec<Scenario> {
        (0..n)
            .map(|i| {
                Scenario::emotion(
                    format!("e{i}"),
                    format!("Scenario {i}"),
                    "hello",
                    Some(Emotion::Joy),
                )
            })
            .collect()
    }

    #[test]
    fn test_builtins_have_five_turns_and_predicates() {
        let builtins = builtin_compliance();
        assert_eq!(builtins.len(), 3);
        for s in &builtins {
            assert_eq!(s.conversation().len(), 5);
            assert!(s.score_predicate().is_some());
        }
        assert_eq!(
            builtins[0].score_predicate().map(|p| p.to_string()),
            Some("> 90".to_string())
        );
        assert_eq!(
            builtins[1].score_predicate().map(|p| p.to_string()),
            Some("< 30".to_string())
        );
    }

    #[test]
    fn test_quick_scenarios_caps_at_six() {
        let catalog = ScenarioCatalog::from_scenarios(emotion_scenarios(9));
        assert_eq!(catalog.quick_scenarios().len(), 6);
        assert_eq!(catalog.quick_scenarios()[5].id, "e5");

        let small = ScenarioCatalog::from_scenarios(emotion_scenarios(2));
        assert_eq!(small.quick_scenarios().len(), 2);
    }

    #[test]
    fn test_find_by_id_then_name() {
        let catalog = ScenarioCatalog::from_scenarios(emotion_scenarios(3));
        assert_eq!(
            catalog.find("e1").map(|s| s.name),
            Some("Scenario 1".to_string())
        );
        assert_eq!(
            catalog.find("scenario 2").map(|s| s.id),
            Some("e2".to_string())
        );
        assert_eq!(
            catalog.find("poor compliance").map(|s| s.id),
            Some("builtin-poor-compliance".to_string())
        );
        assert!(catalog.find("missing").is_none());
    }

    #[test]
    fn test_find_builtin_by_index_or_name() {
        assert_eq!(
            find_builtin("0").map(|s| s.name),
            Some("Perfect Compliance".to_string())
        );
        assert_eq!(
            find_builtin("emotion handling test").map(|s| s.id),
            Some("builtin-emotion-handling".to_string())
        );
        assert!(find_builtin("7").is_none());
    }

    #[test]
    fn test_compliance_lists_builtins_first() {
        let remote = Scenario::compliance(
            "remote-1",
            "Remote",
            Conversation::single_customer("hi"),
            None,
        );
        let catalog = ScenarioCatalog::from_scenarios(vec![remote]);
        let all = catalog.compliance();
        assert_eq!(all.len(), 4);
        assert_eq!(all[3].id, "remote-1");
        assert_eq!(catalog.remote_compliance().len(), 1);
    }
}
