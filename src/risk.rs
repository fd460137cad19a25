//! Risk aggregator — turn one tick's signals into alert drafts and a
//! risk level
//!
//! The trigger table below is closed data: every alert the aggregator
//! can emit is a row here, matched against the canonical signal kinds
//! the adapter produces. `assess` is pure and deterministic — identical
//! signal sets always yield identical drafts and the identical risk
//! bucket, in table order regardless of input order within a modality
//! sweep. No randomness, no hidden state.

use crate::signal::kind;
use crate::types::{Modality, RiskLevel, Severity, Signal};

/// Default confidence floor for identity verification
///
/// An identity-match signal below this confidence triggers a
/// `face_verification_failed` alert. Overridable through
/// [`crate::hub::HubConfig::verification_threshold`].
pub const DEFAULT_VERIFICATION_THRESHOLD: f64 = 0.6;

/// One row of the trigger table
struct Trigger {
    modality: Modality,
    kind: &'static str,

    /// Required value of `Signal::detected`
    on_detected: bool,

    /// When set, the signal additionally triggers only if its
    /// confidence is below the verification threshold
    below_threshold: bool,

    alert_type: &'static str,
    severity: Severity,

    /// Numeric risk weight contributed to the tick mean
    weight: f64,

    description: &'static str,
}

const TRIGGERS: &[Trigger] = &[
    Trigger {
        modality: Modality::Face,
        kind: kind::FACE_PRESENCE,
        on_detected: false,
        below_threshold: false,
        alert_type: "face_not_detected",
        severity: Severity::Medium,
        weight: 0.3,
        description: "No face detected - the student may not be present",
    },
    Trigger {
        modality: Modality::Face,
        kind: kind::MULTIPLE_FACES,
        on_detected: true,
        below_threshold: false,
        alert_type: "multiple_faces",
        severity: Severity::High,
        weight: 0.8,
        description: "Multiple faces detected - an unauthorized person may be present",
    },
    Trigger {
        modality: Modality::Face,
        kind: kind::IDENTITY_MATCH,
        on_detected: true,
        below_threshold: true,
        alert_type: "face_verification_failed",
        severity: Severity::High,
        weight: 0.7,
        description: "Identity verification failed - confidence below threshold",
    },
    Trigger {
        modality: Modality::Gaze,
        kind: kind::GAZE_OFF_SCREEN,
        on_detected: true,
        below_threshold: false,
        alert_type: "gaze_away",
        severity: Severity::Medium,
        weight: 0.4,
        description: "Gaze directed away from the screen",
    },
    Trigger {
        modality: Modality::Object,
        kind: kind::SUSPICIOUS_OBJECT_HIGH,
        on_detected: true,
        below_threshold: false,
        alert_type: "suspicious_objects",
        severity: Severity::Critical,
        weight: 0.9,
        description: "High-risk object detected in view",
    },
    Trigger {
        modality: Modality::Object,
        kind: kind::SUSPICIOUS_OBJECT_MEDIUM,
        on_detected: true,
        below_threshold: false,
        alert_type: "suspicious_objects",
        severity: Severity::High,
        weight: 0.7,
        description: "Suspicious object detected in view",
    },
    Trigger {
        modality: Modality::Audio,
        kind: kind::SUSPICIOUS_AUDIO,
        on_detected: true,
        below_threshold: false,
        alert_type: "suspicious_audio",
        severity: Severity::Medium,
        weight: 0.5,
        description: "Suspicious sounds detected in the environment",
    },
];

/// An alert draft produced by a triggering signal
///
/// Drafts have no id or timestamp — those are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDraft {
    pub alert_type: String,
    pub severity: Severity,
    pub description: String,
}

/// Aggregated outcome of one tick's signals
#[derive(Debug, Clone, PartialEq)]
pub struct TickAssessment {
    pub drafts: Vec<AlertDraft>,
    pub risk: RiskLevel,
}

impl TickAssessment {
    fn none() -> Self {
        Self {
            drafts: Vec::new(),
            risk: RiskLevel::None,
        }
    }
}

/// Assess one tick's signals with the default verification threshold
pub fn assess(signals: &[Signal]) -> TickAssessment {
    assess_with_threshold(signals, DEFAULT_VERIFICATION_THRESHOLD)
}

/// Assess one tick's signals
///
/// One draft per triggering signal. The tick risk is the arithmetic
/// mean of the triggered weights, bucketed; `RiskLevel::None` iff no
/// signal triggered. Absent or quiet signals contribute nothing —
/// absence of detection is never evidence of violation.
pub fn assess_with_threshold(signals: &[Signal], verification_threshold: f64) -> TickAssessment {
    let mut drafts = Vec::new();
    let mut weights = Vec::new();

    for trigger in TRIGGERS {
        for signal in signals {
            if signal.modality != trigger.modality || signal.kind != trigger.kind {
                continue;
            }
            if signal.detected != trigger.on_detected {
                continue;
            }
            if trigger.below_threshold && signal.confidence >= verification_threshold {
                continue;
            }

            drafts.push(AlertDraft {
                alert_type: trigger.alert_type.to_string(),
                severity: trigger.severity,
                description: trigger.description.to_string(),
            });
            weights.push(trigger.weight);
        }
    }

    if drafts.is_empty() {
        return TickAssessment::none();
    }

    let mean = weights.iter().sum::<f64>() / weights.len() as f64;
    TickAssessment {
        drafts,
        risk: bucket(mean),
    }
}

/// Bucket a mean risk weight into a level
///
/// Callers must reserve `None` for the zero-trigger case themselves;
/// this maps any positive mean to at least `Low`.
fn bucket(mean: f64) -> RiskLevel {
    if mean >= 0.7 {
        RiskLevel::Critical
    } else if mean >= 0.5 {
        RiskLevel::High
    } else if mean >= 0.3 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Modality;

    fn face_absent() -> Signal {
        Signal::new(Modality::Face, kind::FACE_PRESENCE, 0.0, false)
    }

    fn face_present() -> Signal {
        Signal::new(Modality::Face, kind::FACE_PRESENCE, 0.95, true)
    }

    fn multiple_faces() -> Signal {
        Signal::new(Modality::Face, kind::MULTIPLE_FACES, 0.9, true)
    }

    fn object_high() -> Signal {
        Signal::new(Modality::Object, kind::SUSPICIOUS_OBJECT_HIGH, 0.85, true)
    }

    #[test]
    fn test_no_signals_yields_none() {
        let assessment = assess(&[]);
        assert!(assessment.drafts.is_empty());
        assert_eq!(assessment.risk, RiskLevel::None);
    }

    #[test]
    fn test_non_triggering_signals_yield_none() {
        let signals = vec![
            face_present(),
            Signal::new(Modality::Gaze, kind::GAZE_OFF_SCREEN, 0.9, false),
            Signal::new(Modality::Object, kind::OBJECT_SCAN, 0.5, true),
            Signal::new(Modality::Audio, kind::SUSPICIOUS_AUDIO, 0.2, false),
        ];

        let assessment = assess(&signals);
        assert!(assessment.drafts.is_empty());
        assert_eq!(assessment.risk, RiskLevel::None);
    }

    #[test]
    fn test_quiet_signal_never_triggers() {
        let signals = vec![
            Signal::quiet(Modality::Face),
            Signal::quiet(Modality::Object),
            Signal::quiet(Modality::Audio),
            Signal::quiet(Modality::Gaze),
        ];

        let assessment = assess(&signals);
        assert!(assessment.drafts.is_empty());
        assert_eq!(assessment.risk, RiskLevel::None);
    }

    #[test]
    fn test_face_absent_triggers_medium() {
        let assessment = assess(&[face_absent()]);
        assert_eq!(assessment.drafts.len(), 1);
        assert_eq!(assessment.drafts[0].alert_type, "face_not_detected");
        assert_eq!(assessment.drafts[0].severity, Severity::Medium);
        // Single 0.3 weight buckets to medium
        assert_eq!(assessment.risk, RiskLevel::Medium);
    }

    #[test]
    fn test_multiple_faces_triggers_high() {
        let assessment = assess(&[multiple_faces()]);
        assert_eq!(assessment.drafts.len(), 1);
        assert_eq!(assessment.drafts[0].alert_type, "multiple_faces");
        assert_eq!(assessment.drafts[0].severity, Severity::High);
        // 0.8 mean buckets to critical
        assert_eq!(assessment.risk, RiskLevel::Critical);
    }

    #[test]
    fn test_single_critical_trigger_is_critical_despite_bystanders() {
        // Non-triggering signals in the same tick must not dilute the mean
        let signals = vec![face_present(), object_high()];
        let assessment = assess(&signals);
        assert_eq!(assessment.drafts.len(), 1);
        assert_eq!(assessment.drafts[0].severity, Severity::Critical);
        assert_eq!(assessment.risk, RiskLevel::Critical);
    }

    #[test]
    fn test_identity_below_threshold_triggers() {
        let weak = Signal::new(Modality::Face, kind::IDENTITY_MATCH, 0.45, true);
        let assessment = assess(&[weak]);
        assert_eq!(assessment.drafts.len(), 1);
        assert_eq!(assessment.drafts[0].alert_type, "face_verification_failed");
        assert_eq!(assessment.drafts[0].severity, Severity::High);
    }

    #[test]
    fn test_identity_above_threshold_is_silent() {
        let strong = Signal::new(Modality::Face, kind::IDENTITY_MATCH, 0.93, true);
        let assessment = assess(&[strong]);
        assert!(assessment.drafts.is_empty());
        assert_eq!(assessment.risk, RiskLevel::None);
    }

    #[test]
    fn test_custom_verification_threshold() {
        let signal = Signal::new(Modality::Face, kind::IDENTITY_MATCH, 0.7, true);

        assert!(assess_with_threshold(&[signal.clone()], 0.6).drafts.is_empty());
        assert_eq!(assess_with_threshold(&[signal], 0.8).drafts.len(), 1);
    }

    #[test]
    fn test_mean_bucketing_across_mixed_triggers() {
        // face absent (0.3) + gaze away (0.4) -> mean 0.35 -> medium
        let signals = vec![
            face_absent(),
            Signal::new(Modality::Gaze, kind::GAZE_OFF_SCREEN, 0.9, true),
        ];
        assert_eq!(assess(&signals).risk, RiskLevel::Medium);

        // multiple faces (0.8) + audio (0.5) -> mean 0.65 -> high
        let signals = vec![
            multiple_faces(),
            Signal::new(Modality::Audio, kind::SUSPICIOUS_AUDIO, 0.9, true),
        ];
        let assessment = assess(&signals);
        assert_eq!(assessment.drafts.len(), 2);
        assert_eq!(assessment.risk, RiskLevel::High);

        // object high (0.9) + multiple faces (0.8) -> mean 0.85 -> critical
        let signals = vec![object_high(), multiple_faces()];
        assert_eq!(assess(&signals).risk, RiskLevel::Critical);
    }

    #[test]
    fn test_object_medium_triggers_high_alert() {
        let signal = Signal::new(Modality::Object, kind::SUSPICIOUS_OBJECT_MEDIUM, 0.8, true);
        let assessment = assess(&[signal]);
        assert_eq!(assessment.drafts[0].alert_type, "suspicious_objects");
        assert_eq!(assessment.drafts[0].severity, Severity::High);
        assert_eq!(assessment.risk, RiskLevel::Critical);
    }

    #[test]
    fn test_assessment_is_deterministic() {
        let signals = vec![
            face_absent(),
            multiple_faces(),
            Signal::new(Modality::Audio, kind::SUSPICIOUS_AUDIO, 0.6, true),
        ];

        let first = assess(&signals);
        let second = assess(&signals);
        assert_eq!(first, second);
    }

    #[test]
    fn test_draft_order_follows_table_not_input() {
        let signals = vec![
            Signal::new(Modality::Audio, kind::SUSPICIOUS_AUDIO, 0.6, true),
            face_absent(),
        ];

        let assessment = assess(&signals);
        assert_eq!(assessment.drafts[0].alert_type, "face_not_detected");
        assert_eq!(assessment.drafts[1].alert_type, "suspicious_audio");
    }
}
