//! Archive listing and case report export.
//!
//! # Invariants
//! - Only archived cards are listed; newest archival first.
//! - Reports are built from stored tool records, never from UI state.

use super::ToolServiceError;
use crate::engine::board::SeverityFilter;
use crate::model::card::{Card, CardType};
use crate::model::session::ToolOwner;
use crate::report::{build_case_report, CaseReport, ReportExporter, ReportInputs};
use crate::repo::analysis_repo::AnalysisRepository;
use crate::repo::card_repo::{ArchiveScope, CardListQuery, CardRepository};
use log::info;

pub type ArchiveResult<T> = Result<T, ToolServiceError>;

/// Archive screen filter. Search covers title, description and unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveFilter {
    pub search_term: String,
    pub severity: SeverityFilter,
}

impl ArchiveFilter {
    pub fn matches(&self, card: &Card) -> bool {
        let severity_ok = match self.severity {
            SeverityFilter::All => true,
            chip => card.kind == CardType::Event && chip.admits(card.severity),
        };
        if !severity_ok {
            return false;
        }
        let term = self.search_term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        [&card.title, &card.desc, &card.unit]
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
    }
}

pub struct ArchiveService<C: CardRepository, A: AnalysisRepository> {
    cards: C,
    analysis: A,
}

impl<C: CardRepository, A: AnalysisRepository> ArchiveService<C, A> {
    pub fn new(cards: C, analysis: A) -> Self {
        Self { cards, analysis }
    }

    pub fn list_archived(&self, filter: &ArchiveFilter) -> ArchiveResult<Vec<Card>> {
        let mut cards: Vec<Card> = self
            .cards
            .list_cards(&CardListQuery {
                scope: ArchiveScope::Archived,
                kind: None,
            })?
            .into_iter()
            .filter(|card| filter.matches(card))
            .collect();
        cards.sort_by(|a, b| {
            let key = |card: &Card| card.archived_at.clone().or_else(|| card.created_at.clone());
            key(b).cmp(&key(a))
        });
        Ok(cards)
    }

    /// Assembles the case report of `card_id` from its stored tools.
    pub fn build_report(&self, card_id: &str) -> ArchiveResult<CaseReport> {
        let card = self
            .cards
            .get_card(card_id)?
            .ok_or_else(|| ToolServiceError::NotFound {
                entity: "card",
                id: card_id.to_string(),
            })?;
        let owner = ToolOwner::Card(card.id.clone());
        let causes = self.analysis.list_causes(&owner)?;
        let failure_modes = self.analysis.list_failure_modes(&owner)?;
        let actions = self.analysis.list_action_items(&owner)?;
        let pdca = self.analysis.get_pdca(&owner)?;

        Ok(build_case_report(ReportInputs {
            card: &card,
            causes: &causes,
            failure_modes: &failure_modes,
            actions: &actions,
            pdca: pdca.as_ref(),
        }))
    }

    pub fn export_report<E: ReportExporter>(
        &self,
        card_id: &str,
        exporter: &E,
    ) -> ArchiveResult<(CaseReport, E::Output)> {
        let report = self.build_report(card_id)?;
        let output = exporter
            .export(&report)
            .map_err(|err| ToolServiceError::Export(err.to_string()))?;
        info!(
            "event=report_export module=archive status=ok card_id={card_id} file_stem={}",
            report.file_stem
        );
        Ok((report, output))
    }
}
