//! The externally consumed result of an analysis run

use crate::context::{ContextStore, StageOutput};
use crate::stage::StageId;
use serde::ser::{Serialize, SerializeMap, SerializeStruct, Serializer};

/// Stage outputs keyed by stage identity, in execution order.
///
/// Serializes as `{"individual_analyses": {"Researcher": ..., ...}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    individual_analyses: Vec<(StageId, StageOutput)>,
}

impl Report {
    pub fn get(&self, stage: StageId) -> Option<&StageOutput> {
        self.individual_analyses
            .iter()
            .find(|(id, _)| *id == stage)
            .map(|(_, output)| output)
    }

    pub fn stage_ids(&self) -> Vec<StageId> {
        self.individual_analyses.iter().map(|(id, _)| *id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StageId, &StageOutput)> {
        self.individual_analyses.iter().map(|(id, output)| (*id, output))
    }

    pub fn len(&self) -> usize {
        self.individual_analyses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individual_analyses.is_empty()
    }
}

struct Analyses<'a>(&'a [(StageId, StageOutput)]);

impl Serialize for Analyses<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, output) in self.0 {
            map.serialize_entry(id.as_str(), output)?;
        }
        map.end()
    }
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut report = serializer.serialize_struct("Report", 1)?;
        report.serialize_field("individual_analyses", &Analyses(&self.individual_analyses))?;
        report.end()
    }
}

/// Turns the final context store into a [`Report`]
pub struct ReportAssembler;

impl ReportAssembler {
    /// Copies every entry as recorded, in order, without touching content
    pub fn assemble(store: ContextStore) -> Report {
        Report {
            individual_analyses: store.into_entries(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> ContextStore {
        let mut store = ContextStore::new();
        store
            .record(StageId::Researcher, StageOutput::Text("research".into()))
            .unwrap();
        store
            .record(
                StageId::SentimentAnalyst,
                StageOutput::Structured(json!({ "score": 0.4 })),
            )
            .unwrap();
        store
    }

    #[test]
    fn assemble_preserves_order_and_type() {
        let report = ReportAssembler::assemble(store());
        assert_eq!(
            report.stage_ids(),
            [StageId::Researcher, StageId::SentimentAnalyst]
        );
        assert_eq!(
            report.get(StageId::Researcher),
            Some(&StageOutput::Text("research".into()))
        );
        assert!(report.get(StageId::SentimentAnalyst).is_some_and(StageOutput::is_structured));
        assert_eq!(report.get(StageId::InvestmentStrategist), None);
    }

    #[test]
    fn serializes_under_individual_analyses() {
        let report = ReportAssembler::assemble(store());
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            json!({
                "individual_analyses": {
                    "Researcher": "research",
                    "SentimentAnalyst": { "score": 0.4 }
                }
            })
        );

        let text = serde_json::to_string(&report).unwrap();
        assert!(text.find("Researcher") < text.find("SentimentAnalyst"));
    }
}
