//! Alert rule editor.
//!
//! The backend stores rules as one list: every local mutation is followed by
//! exactly one bulk save of the whole list. There is no rollback, so a failed
//! save leaves local and server state apart until the next [`AlertRuleEditor::load`].

use tracing::{info, warn};

use crate::api::{DataSource, MaintenanceApi, SharedApi};
use crate::error::{ValidationError, ViewError};
use crate::models::{AlertRule, SensorReading};

pub struct AlertRuleEditor<A> {
    api: SharedApi<A>,
    rules: Vec<AlertRule>,
    source: DataSource,
    last_error: Option<String>,
}

impl<A: MaintenanceApi> AlertRuleEditor<A> {
    pub fn new(api: SharedApi<A>) -> Self {
        Self { api, rules: Vec::new(), source: DataSource::Live, last_error: None }
    }

    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// Bannière de la dernière sauvegarde échouée
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub async fn load(&mut self) -> Result<(), ViewError> {
        let fetched = self.api.get_alert_rules().await?;
        self.rules = fetched.data;
        self.source = fetched.source;
        self.last_error = None;
        Ok(())
    }

    /// Ajoute la règle (id v4 si absent) puis sauvegarde la liste
    pub async fn add(&mut self, mut rule: AlertRule) -> Result<String, ViewError> {
        validate(&rule)?;
        if rule.id.trim().is_empty() {
            rule.id = uuid::Uuid::new_v4().to_string();
        }
        let id = rule.id.clone();
        self.rules.push(rule);
        self.save().await?;
        Ok(id)
    }

    pub async fn edit(&mut self, rule: AlertRule) -> Result<(), ViewError> {
        validate(&rule)?;
        let slot = self.position(&rule.id)?;
        self.rules[slot] = rule;
        self.save().await
    }

    pub async fn delete(&mut self, id: &str) -> Result<(), ViewError> {
        let slot = self.position(id)?;
        self.rules.remove(slot);
        self.save().await
    }

    /// Renvoie le nouvel état `enabled`
    pub async fn toggle(&mut self, id: &str) -> Result<bool, ViewError> {
        let slot = self.position(id)?;
        let enabled = !self.rules[slot].enabled;
        self.rules[slot].enabled = enabled;
        self.save().await?;
        Ok(enabled)
    }

    /// Règles déclenchées par une lecture
    pub fn triggered<'a>(&'a self, reading: &'a SensorReading) -> impl Iterator<Item = &'a AlertRule> + 'a {
        self.rules.iter().filter(move |r| r.evaluate(reading))
    }

    fn position(&self, id: &str) -> Result<usize, ViewError> {
        self.rules
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| ViewError::NotFound { kind: "alert rule", id: id.to_string() })
    }

    async fn save(&mut self) -> Result<(), ViewError> {
        match self.api.save_alert_rules(&self.rules).await {
            Ok(()) => {
                info!("[alerts] saved {} rules", self.rules.len());
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                warn!("[alerts] save failed, local list kept: {e}");
                self.last_error = Some(format!("Failed to save alert rules: {e}"));
                Err(e.into())
            }
        }
    }
}

pub fn validate(rule: &AlertRule) -> Result<(), ValidationError> {
    if rule.equipment_id.trim().is_empty() {
        return Err(ValidationError::MissingField("equipment_id".into()));
    }
    if !rule.threshold.is_finite() {
        return Err(ValidationError::InvalidRule("threshold must be a finite number".into()));
    }
    if rule.notify_via.is_empty() {
        return Err(ValidationError::InvalidRule("at least one notification channel is required".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedApi;
    use crate::api::{Endpoint, FallbackApi};
    use crate::models::{Condition, NotifyChannel, SensorMetric, Severity, ALL_EQUIPMENT};
    use std::sync::Arc;

    fn rule(id: &str) -> AlertRule {
        AlertRule {
            id: id.into(),
            equipment_id: "PUMP001".into(),
            parameter: SensorMetric::Pressure,
            condition: Condition::AtLeast,
            threshold: 120.0,
            severity: Severity::Warning,
            notify_via: vec![NotifyChannel::Sms],
            enabled: true,
            notification_message: "Pressure high".into(),
        }
    }

    async fn editor(api: ScriptedApi) -> AlertRuleEditor<ScriptedApi> {
        let mut editor = AlertRuleEditor::new(Arc::new(FallbackApi::new(api)));
        editor.load().await.unwrap();
        editor
    }

    fn saves(editor: &AlertRuleEditor<ScriptedApi>) -> usize {
        editor.api.inner().calls(Endpoint::SaveAlertRules)
    }

    #[tokio::test]
    async fn test_each_mutation_saves_once_with_expected_delta() {
        let mut editor = editor(ScriptedApi::new()).await;
        let start = editor.rules().len();

        let id = editor.add(rule("")).await.unwrap();
        assert!(!id.is_empty());
        assert_eq!(editor.rules().len(), start + 1);
        assert_eq!(saves(&editor), 1);

        let mut edited = editor.rules().last().unwrap().clone();
        edited.threshold = 150.0;
        editor.edit(edited).await.unwrap();
        assert_eq!(editor.rules().len(), start + 1);
        assert_eq!(saves(&editor), 2);

        assert!(!editor.toggle(&id).await.unwrap());
        assert_eq!(editor.rules().len(), start + 1);
        assert_eq!(saves(&editor), 3);

        editor.delete(&id).await.unwrap();
        assert_eq!(editor.rules().len(), start);
        assert_eq!(saves(&editor), 4);

        let batches = editor.api.inner().saved_rule_batches();
        assert_eq!(batches.last().unwrap(), &editor.rules().to_vec(), "full list sent each time");
    }

    #[tokio::test]
    async fn test_unknown_rule_issues_no_save() {
        let mut editor = editor(ScriptedApi::new()).await;
        assert!(matches!(editor.toggle("missing").await, Err(ViewError::NotFound { .. })));
        assert!(matches!(editor.delete("missing").await, Err(ViewError::NotFound { .. })));
        assert!(matches!(editor.edit(rule("missing")).await, Err(ViewError::NotFound { .. })));
        assert_eq!(saves(&editor), 0);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_local_mutation() {
        let api = ScriptedApi::new();
        api.fail(Endpoint::SaveAlertRules);
        let mut editor = editor(api).await;
        let start = editor.rules().len();

        assert!(editor.add(rule("r-new")).await.is_err());
        assert_eq!(editor.rules().len(), start + 1, "no rollback");
        assert!(editor.last_error().unwrap().starts_with("Failed to save alert rules"));

        editor.load().await.unwrap();
        assert_eq!(editor.rules().len(), start);
        assert_eq!(editor.last_error(), None);
    }

    #[tokio::test]
    async fn test_invalid_rule_rejected_before_save() {
        let mut editor = editor(ScriptedApi::new()).await;
        let mut bad = rule("");
        bad.notify_via.clear();
        assert!(matches!(editor.add(bad).await, Err(ViewError::Validation(_))));
        let mut bad = rule("");
        bad.threshold = f64::NAN;
        assert!(editor.add(bad).await.is_err());
        assert_eq!(saves(&editor), 0);
    }

    #[tokio::test]
    async fn test_triggered_rules() {
        let mut editor = editor(ScriptedApi::new()).await;
        let mut reading = crate::mock::mock_readings("PUMP001", 1, chrono::Utc::now().naive_utc()).remove(0);
        reading.temperature = Some(95.0);
        reading.vibration = Some(1.0);
        let hits: Vec<_> = editor.triggered(&reading).map(|r| r.id.clone()).collect();
        assert_eq!(hits, vec!["rule-temperature-high".to_string()]);

        editor.rules.iter_mut().for_each(|r| r.equipment_id = ALL_EQUIPMENT.into());
        reading.oil_level = Some(5.0);
        // règle huile désactivée dans le jeu par défaut
        assert_eq!(editor.triggered(&reading).count(), 1);
    }
}
