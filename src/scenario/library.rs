//! Scenario source: built-in teaching templates and externally authored timelines
//! Location: src/scenario/library.rs

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use super::keyframe::Keyframe;
use super::timeline::ScenarioTimeline;
use crate::error::ScenarioError;
use crate::physiology::{ConditionPatch, RhythmType, VitalKey};

/// Named timelines keyed by id
#[derive(Debug, Clone, Default)]
pub struct ScenarioLibrary {
    timelines: BTreeMap<String, ScenarioTimeline>,
}

/// A file may hold one timeline or a list of them
#[derive(Deserialize)]
#[serde(untagged)]
enum TimelineDocument {
    Many(Vec<ScenarioTimeline>),
    One(ScenarioTimeline),
}

impl ScenarioLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library preloaded with the built-in templates
    pub fn built_in() -> Self {
        let mut library = Self::new();
        for timeline in built_in_templates() {
            library.insert(timeline);
        }
        library
    }

    /// Add or replace a timeline
    pub fn insert(&mut self, timeline: ScenarioTimeline) -> Option<ScenarioTimeline> {
        debug!(id = %timeline.id, keyframes = timeline.keyframes.len(), "registering scenario");
        self.timelines.insert(timeline.id.clone(), timeline)
    }

    pub fn get(&self, id: &str) -> Result<&ScenarioTimeline, ScenarioError> {
        self.timelines
            .get(id)
            .ok_or_else(|| ScenarioError::UnknownTimeline(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.timelines.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScenarioTimeline> {
        self.timelines.values()
    }

    pub fn len(&self) -> usize {
        self.timelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timelines.is_empty()
    }

    /// Parse timelines from JSON and add them; returns the ids loaded
    pub fn load_json_str(&mut self, json: &str) -> Result<Vec<String>, ScenarioError> {
        let timelines = match serde_json::from_str::<TimelineDocument>(json)? {
            TimelineDocument::Many(many) => many,
            TimelineDocument::One(one) => vec![one],
        };
        let ids = timelines.iter().map(|t| t.id.clone()).collect();
        for timeline in timelines {
            self.insert(timeline);
        }
        Ok(ids)
    }

    /// Load timelines from a JSON case file
    pub fn load_json_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Vec<String>, ScenarioError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let ids = self.load_json_str(&content)?;
        info!(path = %path.display(), count = ids.len(), "loaded scenario file");
        Ok(ids)
    }
}

fn built_in_templates() -> Vec<ScenarioTimeline> {
    vec![
        ScenarioTimeline::new(
            "septic_shock",
            "Septic shock progression",
            "Fever and tachycardia progressing to hypotension over five minutes",
            vec![
                Keyframe::at(0.0)
                    .vital(VitalKey::HeartRate, 96.0)
                    .vital(VitalKey::Temperature, 38.4)
                    .vital(VitalKey::SystolicBp, 112.0)
                    .vital(VitalKey::DiastolicBp, 70.0)
                    .vital(VitalKey::RespRate, 20.0)
                    .label("Early sepsis"),
                Keyframe::at(120.0)
                    .vital(VitalKey::HeartRate, 124.0)
                    .vital(VitalKey::Temperature, 39.2)
                    .vital(VitalKey::SystolicBp, 88.0)
                    .vital(VitalKey::DiastolicBp, 52.0)
                    .vital(VitalKey::RespRate, 26.0)
                    .vital(VitalKey::Spo2, 94.0)
                    .label("Hypotension"),
                Keyframe::at(300.0)
                    .vital(VitalKey::HeartRate, 142.0)
                    .vital(VitalKey::SystolicBp, 72.0)
                    .vital(VitalKey::DiastolicBp, 40.0)
                    .vital(VitalKey::Spo2, 90.0)
                    .vital(VitalKey::EtCo2, 28.0)
                    .label("Septic shock"),
            ],
        ),
        ScenarioTimeline::new(
            "vt_arrest",
            "VT arrest",
            "Pulsed ventricular tachycardia degenerating to VF then asystole",
            vec![
                Keyframe::at(0.0)
                    .rhythm(RhythmType::VentricularTachycardia)
                    .vital(VitalKey::HeartRate, 180.0)
                    .vital(VitalKey::SystolicBp, 82.0)
                    .vital(VitalKey::DiastolicBp, 50.0)
                    .conditions(ConditionPatch {
                        qrs_widened: Some(true),
                        ..Default::default()
                    })
                    .label("Pulsed VT"),
                Keyframe::at(60.0)
                    .rhythm(RhythmType::VentricularFibrillation)
                    .vital(VitalKey::HeartRate, 0.0)
                    .label("VF arrest"),
                Keyframe::at(180.0).rhythm(RhythmType::Asystole).label("Asystole"),
            ],
        ),
        ScenarioTimeline::new(
            "inferior_stemi",
            "Inferior STEMI",
            "Evolving ST elevation with ectopy and reactive tachycardia",
            vec![
                Keyframe::at(0.0)
                    .vital(VitalKey::HeartRate, 88.0)
                    .conditions(ConditionPatch {
                        st_deviation_mm: Some(0.0),
                        ectopic_enabled: Some(false),
                        t_wave_inverted: Some(false),
                        ..Default::default()
                    })
                    .label("Chest pain onset"),
                Keyframe::at(90.0)
                    .vital(VitalKey::HeartRate, 104.0)
                    .vital(VitalKey::SystolicBp, 146.0)
                    .conditions(ConditionPatch {
                        st_deviation_mm: Some(2.5),
                        ectopic_enabled: Some(true),
                        ..Default::default()
                    })
                    .label("ST elevation"),
                Keyframe::at(240.0)
                    .vital(VitalKey::HeartRate, 112.0)
                    .vital(VitalKey::SystolicBp, 104.0)
                    .conditions(ConditionPatch {
                        st_deviation_mm: Some(3.0),
                        t_wave_inverted: Some(true),
                        ..Default::default()
                    })
                    .label("Established infarct"),
            ],
        ),
        ScenarioTimeline::new(
            "hypoxic_respiratory_failure",
            "Hypoxic respiratory failure",
            "Progressive desaturation with tachypnoea and CO2 retention",
            vec![
                Keyframe::at(0.0)
                    .vital(VitalKey::Spo2, 95.0)
                    .vital(VitalKey::RespRate, 22.0)
                    .vital(VitalKey::EtCo2, 40.0)
                    .label("Dyspnoea"),
                Keyframe::at(150.0)
                    .vital(VitalKey::Spo2, 86.0)
                    .vital(VitalKey::RespRate, 32.0)
                    .vital(VitalKey::HeartRate, 118.0)
                    .vital(VitalKey::EtCo2, 48.0)
                    .label("Desaturation"),
                Keyframe::at(300.0)
                    .vital(VitalKey::Spo2, 78.0)
                    .vital(VitalKey::RespRate, 8.0)
                    .vital(VitalKey::HeartRate, 54.0)
                    .vital(VitalKey::EtCo2, 62.0)
                    .conditions(ConditionPatch {
                        noise_level: Some(2),
                        ..Default::default()
                    })
                    .label("Peri-arrest"),
            ],
        ),
        ScenarioTimeline::new(
            "rapid_af",
            "Rapid atrial fibrillation",
            "New-onset AF with a fast ventricular response",
            vec![
                Keyframe::at(0.0).rhythm(RhythmType::NormalSinus).label("Sinus"),
                Keyframe::at(30.0)
                    .rhythm(RhythmType::AtrialFibrillation)
                    .vital(VitalKey::HeartRate, 148.0)
                    .vital(VitalKey::SystolicBp, 98.0)
                    .label("AF with RVR"),
            ],
        ),
    ]
}
