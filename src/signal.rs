//! Signal adapter — normalize raw detector output into [`Signal`]s
//!
//! Detectors are opaque collaborators: they hand the core a structured
//! JSON payload per invocation (face analysis, identity verification,
//! object scan, audio probe, gaze tracking). The adapter is a total
//! function over those payloads — a malformed or unrecognized payload
//! becomes a quiet signal (`detected: false, confidence: 0.0`) rather
//! than an error, so one crashed detector never aborts alerting for the
//! other modalities.
//!
//! Quiet signals carry the reserved [`kind::UNAVAILABLE`] kind, which
//! matches no trigger: "the detector didn't look" is never treated as
//! evidence of a violation.

use crate::types::{Modality, Signal};
use serde_json::Value;

/// Canonical classifier kinds emitted by the adapter
///
/// The risk aggregator's trigger table matches on these exact strings.
pub mod kind {
    /// Reserved kind for malformed/unrecognized detector output
    pub const UNAVAILABLE: &str = "unavailable";

    /// Face presence sweep; `detected: false` means no face in frame
    pub const FACE_PRESENCE: &str = "face_presence";

    /// More than one face in frame
    pub const MULTIPLE_FACES: &str = "multiple_faces";

    /// Identity comparison against the reference image
    pub const IDENTITY_MATCH: &str = "identity_match";

    /// Gaze directed away from the screen
    pub const GAZE_OFF_SCREEN: &str = "gaze_off_screen";

    /// Classifier rated a detected object class high-severity
    pub const SUSPICIOUS_OBJECT_HIGH: &str = "suspicious_object_high";

    /// Classifier rated a detected object class medium-severity
    pub const SUSPICIOUS_OBJECT_MEDIUM: &str = "suspicious_object_medium";

    /// Object sweep with nothing alarming
    pub const OBJECT_SCAN: &str = "object_scan";

    /// Suspicious sounds flagged by the audio detector
    pub const SUSPICIOUS_AUDIO: &str = "suspicious_audio";
}

impl Signal {
    /// The no-evidence signal for a modality
    pub fn quiet(modality: Modality) -> Self {
        Signal::new(modality, kind::UNAVAILABLE, 0.0, false)
    }
}

/// Normalize one detector invocation's raw output into a [`Signal`]
///
/// Total per modality: any payload the adapter cannot read maps to the
/// quiet signal for that modality.
pub fn normalize(modality: Modality, raw: &Value) -> Signal {
    match modality {
        // Identity verification and face analysis share the modality;
        // the payload shape tells them apart.
        Modality::Face if has_field(raw, &["verified"]) => identity_signal(raw),
        Modality::Face => face_signal(raw),
        Modality::Gaze => gaze_signal(raw),
        Modality::Object => object_signal(raw),
        Modality::Audio => audio_signal(raw),
    }
}

/// Read a face-analysis payload: face count and multiple-face flag
pub fn face_signal(raw: &Value) -> Signal {
    let faces = match int_field(raw, &["facesDetected", "faces_detected"]) {
        Some(n) => n,
        None => return Signal::quiet(Modality::Face),
    };
    let multiple = bool_field(raw, &["multipleFaces", "multiple_faces"]).unwrap_or(faces > 1);
    let confidence = float_field(raw, &["confidence"]).unwrap_or(if faces > 0 { 1.0 } else { 0.0 });

    if faces > 1 || multiple {
        Signal::new(Modality::Face, kind::MULTIPLE_FACES, confidence, true)
    } else {
        Signal::new(Modality::Face, kind::FACE_PRESENCE, confidence, faces >= 1)
    }
}

/// Read an identity-verification payload: match confidence against the
/// reference image
pub fn identity_signal(raw: &Value) -> Signal {
    let verified = match bool_field(raw, &["verified"]) {
        Some(v) => v,
        None => return Signal::quiet(Modality::Face),
    };
    let confidence =
        float_field(raw, &["confidence"]).unwrap_or(if verified { 1.0 } else { 0.0 });

    Signal::new(Modality::Face, kind::IDENTITY_MATCH, confidence, true)
}

/// Read a gaze-tracking payload; `detected` means the gaze is off-screen
pub fn gaze_signal(raw: &Value) -> Signal {
    let looking = match bool_field(raw, &["lookingAtScreen", "looking_at_screen"]) {
        Some(v) => v,
        None => return Signal::quiet(Modality::Gaze),
    };
    let confidence = float_field(raw, &["confidence"]).unwrap_or(1.0);

    Signal::new(Modality::Gaze, kind::GAZE_OFF_SCREEN, confidence, !looking)
}

/// Read an object-scan payload: the classifier's own alert level decides
/// the kind
///
/// The classifier rates each detected class itself (phones/tablets are
/// high-severity, laptops/headphones medium); its aggregate `alertLevel`
/// is `critical` when a high-severity class is in view and `high` when
/// medium-severity classes are.
pub fn object_signal(raw: &Value) -> Signal {
    let level = match str_field(raw, &["alertLevel", "alert_level"]) {
        Some(l) => l,
        None => return Signal::quiet(Modality::Object),
    };
    let count = int_field(raw, &["objectsDetected", "objects_detected"]).unwrap_or(0);
    let confidence = float_field(raw, &["confidence"]).unwrap_or(1.0);

    match level.as_str() {
        "critical" => Signal::new(Modality::Object, kind::SUSPICIOUS_OBJECT_HIGH, confidence, true),
        "high" => Signal::new(Modality::Object, kind::SUSPICIOUS_OBJECT_MEDIUM, confidence, true),
        _ => Signal::new(Modality::Object, kind::OBJECT_SCAN, confidence, count > 0),
    }
}

/// Read an audio-probe payload
///
/// The adapter only consumes the detector's own `suspiciousSounds`
/// verdict; it never synthesizes one.
pub fn audio_signal(raw: &Value) -> Signal {
    let suspicious = match bool_field(raw, &["suspiciousSounds", "suspicious_sounds"]) {
        Some(v) => v,
        None => return Signal::quiet(Modality::Audio),
    };
    let confidence = float_field(raw, &["noiseLevel", "noise_level"]).unwrap_or(1.0);

    Signal::new(Modality::Audio, kind::SUSPICIOUS_AUDIO, confidence, suspicious)
}

fn has_field(raw: &Value, names: &[&str]) -> bool {
    names.iter().any(|n| raw.get(n).is_some())
}

fn bool_field(raw: &Value, names: &[&str]) -> Option<bool> {
    names.iter().find_map(|n| raw.get(n).and_then(Value::as_bool))
}

fn int_field(raw: &Value, names: &[&str]) -> Option<u64> {
    names.iter().find_map(|n| raw.get(n).and_then(Value::as_u64))
}

fn float_field(raw: &Value, names: &[&str]) -> Option<f64> {
    names.iter().find_map(|n| raw.get(n).and_then(Value::as_f64))
}

fn str_field(raw: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|n| raw.get(n).and_then(Value::as_str).map(str::to_string))
}
