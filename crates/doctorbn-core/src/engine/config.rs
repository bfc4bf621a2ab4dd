//! Policy knobs for one advisor call, grouped per engine stage.

use crate::engine::errors::ExecError;
use crate::engine::explanation::ExplanationConfig;
use crate::engine::ranking::RankingConfig;
use crate::engine::relevance::RelevanceConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AdvisorConfig {
    pub ranking: RankingConfig,
    pub relevance: RelevanceConfig,
    pub explanation: ExplanationConfig,
}

impl AdvisorConfig {
    pub fn validate(self) -> Result<Self, ExecError> {
        Ok(Self {
            ranking: self.ranking.validate()?,
            relevance: self.relevance.validate()?,
            explanation: self.explanation.validate()?,
        })
    }
}
