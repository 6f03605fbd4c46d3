//! Reading and activating the engagement formula.

use engagedb_core::FormulaSetting;

use crate::error::{EngineError, StorageError, ValidationError};
use crate::formula::{Formula, DEFAULT_FORMULA};
use crate::store::EngagementStore;

/// The formula currently in force. `setting` is `None` when nothing has
/// been activated yet and the built-in default applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveFormula {
    pub setting: Option<FormulaSetting>,
}

impl ActiveFormula {
    #[must_use]
    pub fn text(&self) -> &str {
        self.setting
            .as_ref()
            .map_or(DEFAULT_FORMULA, |s| s.engagement_formula.as_str())
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.setting.is_none()
    }
}

/// # Errors
///
/// Returns [`StorageError`] if the store cannot be read.
pub async fn active_formula<S: EngagementStore>(store: &S) -> Result<ActiveFormula, StorageError> {
    let setting = store.active_formula().await?;
    Ok(ActiveFormula { setting })
}

/// Validate `text` and make it the active formula under `name`.
///
/// The previous formula stays in the history. Nothing is written when the
/// text does not parse.
///
/// # Errors
///
/// Returns [`EngineError::Validation`] for a blank name,
/// [`EngineError::Formula`] when the text does not parse, or
/// [`EngineError::Storage`] if the write fails.
pub async fn activate_formula<S: EngagementStore>(
    store: &S,
    name: &str,
    text: &str,
) -> Result<FormulaSetting, EngineError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyFormulaName.into());
    }
    let formula = Formula::parse(text)?;
    let setting = store.persist_formula(name, formula.source()).await?;
    tracing::info!(formula_id = setting.id, name, formula = %formula, "activated engagement formula");
    Ok(setting)
}
